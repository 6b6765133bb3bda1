//! Application configuration with layered loading.
//!
//! This module provides configuration management using figment for layered
//! configuration loading from multiple sources:
//!
//! 1. Environment variables (SHELLCACHE_*)
//! 2. TOML config file (if SHELLCACHE_CONFIG_FILE set)
//! 3. Built-in defaults
//!
//! List fields can be set from the environment with figment's array syntax,
//! e.g. `SHELLCACHE_STATIC_ASSETS='["/", "/index.html"]'`.

use std::path::PathBuf;
use std::time::Duration;

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use url::Url;

use crate::cache::Partitions;
use crate::router::{DEFAULT_CACHE_FIRST, DEFAULT_NETWORK_FIRST, PatternTable};

mod validation;

pub use validation::ConfigError;

/// `db_path` value selecting the in-memory store.
pub const MEMORY_DB_PATH: &str = ":memory:";

/// Application configuration with layered loading.
///
/// Loading precedence (highest wins):
/// 1. Environment variables (SHELLCACHE_*)
/// 2. TOML config file (if SHELLCACHE_CONFIG_FILE set)
/// 3. Built-in defaults
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Origin whose GET requests are intercepted; everything else passes through.
    ///
    /// Set via SHELLCACHE_ORIGIN environment variable.
    #[serde(default = "default_origin")]
    pub origin: String,

    /// Path to SQLite cache database, or `:memory:`.
    ///
    /// Set via SHELLCACHE_DB_PATH environment variable.
    #[serde(default = "default_db_path")]
    pub db_path: PathBuf,

    /// Version suffix of the partition names (`static-<v>`, `dynamic-<v>`).
    ///
    /// Bumping it orphans the previous partitions, which are deleted on
    /// the next activation.
    #[serde(default = "default_cache_version")]
    pub cache_version: String,

    /// Paths pre-cached at install time.
    #[serde(default = "default_static_assets")]
    pub static_assets: Vec<String>,

    /// Path regexes routed network-first.
    #[serde(default = "default_network_first_patterns")]
    pub network_first_patterns: Vec<String>,

    /// Path regexes routed cache-first.
    #[serde(default = "default_cache_first_patterns")]
    pub cache_first_patterns: Vec<String>,

    /// Document served to offline navigations with no cached copy.
    #[serde(default = "default_offline_shell")]
    pub offline_shell: String,

    /// User-Agent string for HTTP requests.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// HTTP request timeout in milliseconds.
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,

    /// Maximum bytes to fetch per request.
    #[serde(default = "default_max_bytes")]
    pub max_bytes: usize,

    /// Maximum redirects followed per request.
    #[serde(default = "default_max_redirects")]
    pub max_redirects: usize,

    /// Send the skip-waiting signal as soon as install succeeds.
    #[serde(default = "default_true")]
    pub skip_waiting_on_install: bool,

    /// Number of request timings kept for `sw_status`.
    #[serde(default = "default_perf_log_capacity")]
    pub perf_log_capacity: usize,
}

fn default_origin() -> String {
    "http://localhost:8080".into()
}

fn default_db_path() -> PathBuf {
    PathBuf::from("./shellcache.sqlite")
}

fn default_cache_version() -> String {
    "v1.0.0".into()
}

fn default_static_assets() -> Vec<String> {
    [
        "/",
        "/index.html",
        "/css/style.css",
        "/js/main.js",
        "/manifest.json",
        "/images/logo.png",
        "/images/favicon.ico",
    ]
    .into_iter()
    .map(String::from)
    .collect()
}

fn default_network_first_patterns() -> Vec<String> {
    DEFAULT_NETWORK_FIRST.iter().map(|p| p.to_string()).collect()
}

fn default_cache_first_patterns() -> Vec<String> {
    DEFAULT_CACHE_FIRST.iter().map(|p| p.to_string()).collect()
}

fn default_offline_shell() -> String {
    "/index.html".into()
}

fn default_user_agent() -> String {
    "shellcache/0.1".into()
}

fn default_timeout_ms() -> u64 {
    20_000
}

fn default_max_bytes() -> usize {
    5_242_880 // 5MB
}

fn default_max_redirects() -> usize {
    5
}

fn default_true() -> bool {
    true
}

fn default_perf_log_capacity() -> usize {
    100
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            origin: default_origin(),
            db_path: default_db_path(),
            cache_version: default_cache_version(),
            static_assets: default_static_assets(),
            network_first_patterns: default_network_first_patterns(),
            cache_first_patterns: default_cache_first_patterns(),
            offline_shell: default_offline_shell(),
            user_agent: default_user_agent(),
            timeout_ms: default_timeout_ms(),
            max_bytes: default_max_bytes(),
            max_redirects: default_max_redirects(),
            skip_waiting_on_install: true,
            perf_log_capacity: default_perf_log_capacity(),
        }
    }
}

impl AppConfig {
    /// Timeout as Duration for use with reqwest/tokio.
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// Load configuration from all sources with layered precedence.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if the file or environment cannot be parsed or
    /// validation fails after loading.
    pub fn load() -> Result<Self, ConfigError> {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));

        if let Ok(config_path) = std::env::var("SHELLCACHE_CONFIG_FILE") {
            figment = figment.merge(Toml::file(&config_path));
        }

        figment = figment.merge(
            Env::prefixed("SHELLCACHE_")
                .ignore(&["CONFIG_FILE"])
                .map(|key| key.as_str().to_lowercase().into())
                .split("__"),
        );

        let config: Self = figment.extract().map_err(|e| ConfigError::LoadFailed(e.to_string()))?;

        config.validate()?;

        Ok(config)
    }

    pub fn uses_memory_store(&self) -> bool {
        self.db_path.as_os_str() == MEMORY_DB_PATH
    }

    pub fn partitions(&self) -> Partitions {
        Partitions::for_version(&self.cache_version)
    }

    pub fn origin_url(&self) -> Result<Url, ConfigError> {
        Url::parse(&self.origin)
            .map_err(|e| ConfigError::Invalid { field: "origin".into(), reason: e.to_string() })
    }

    /// Resolve a site-relative path against the origin.
    pub fn resolve(&self, field: &str, path: &str) -> Result<Url, ConfigError> {
        self.origin_url()?
            .join(path)
            .map_err(|e| ConfigError::Invalid { field: field.into(), reason: format!("{path}: {e}") })
    }

    /// Install manifest as absolute URLs.
    pub fn manifest_urls(&self) -> Result<Vec<Url>, ConfigError> {
        self.static_assets
            .iter()
            .map(|asset| self.resolve("static_assets", asset))
            .collect()
    }

    pub fn offline_shell_url(&self) -> Result<Url, ConfigError> {
        self.resolve("offline_shell", &self.offline_shell)
    }

    pub fn pattern_table(&self) -> Result<PatternTable, ConfigError> {
        PatternTable::new(self.network_first_patterns.as_slice(), self.cache_first_patterns.as_slice())
            .map_err(|e| ConfigError::Invalid { field: "patterns".into(), reason: e.to_string() })
    }
}
