//! Worker lifecycle around a [`CacheRouter`].
//!
//! `installing → waiting → activating → active`, with `redundant` for a
//! version whose install failed. Requests are routed through the caches once
//! the worker is active, or earlier if caches from a previous run are still
//! in the store (that version keeps serving until this one takes over).
//! Otherwise, and for any non-GET or cross-origin request, they go straight
//! to the network.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, PoisonError, RwLock};
use std::time::Instant;

use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use url::Url;

use crate::Error;
use crate::cache::CacheStore;
use crate::config::{AppConfig, ConfigError};
use crate::http::{Request, Response, Transport};
use crate::perf::{PerfEntry, PerfLog};
use crate::router::{CacheRouter, CacheUsage, Strategy, UpdateReport};

/// Lifecycle state of one worker version.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, schemars::JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum WorkerState {
    Installing,
    Waiting,
    Activating,
    Active,
    /// Install failed; this version never activates.
    Redundant,
}

/// A response plus how the worker produced it.
#[derive(Debug, Clone)]
pub struct FetchOutcome {
    pub response: Response,
    /// Strategy used, or `None` if the request bypassed the caches.
    pub strategy: Option<Strategy>,
}

/// A cache router plus the lifecycle that gates it.
pub struct ServiceWorker {
    router: CacheRouter,
    origin: Url,
    manifest: Vec<Url>,
    state: RwLock<WorkerState>,
    skip_waiting: AtomicBool,
    /// Caches left by an earlier run serve requests until this version is active.
    previous_controls: AtomicBool,
    /// Serializes lifecycle transitions; fetches never take it.
    transition: Mutex<()>,
    perf: PerfLog,
}

impl ServiceWorker {
    pub fn new(router: CacheRouter, origin: Url, manifest: Vec<Url>, skip_waiting: bool, perf: PerfLog) -> Self {
        Self {
            router,
            origin,
            manifest,
            state: RwLock::new(WorkerState::Installing),
            skip_waiting: AtomicBool::new(skip_waiting),
            previous_controls: AtomicBool::new(false),
            transition: Mutex::new(()),
            perf,
        }
    }

    /// Build a worker from validated configuration.
    pub fn from_config(
        config: &AppConfig, store: Arc<dyn CacheStore>, transport: Arc<dyn Transport>,
    ) -> Result<Self, ConfigError> {
        let router = CacheRouter::new(
            store,
            transport,
            config.pattern_table()?,
            config.partitions(),
            config.offline_shell_url()?,
        );

        Ok(Self::new(
            router,
            config.origin_url()?,
            config.manifest_urls()?,
            config.skip_waiting_on_install,
            PerfLog::new(config.perf_log_capacity),
        ))
    }

    pub fn state(&self) -> WorkerState {
        *self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn set_state(&self, next: WorkerState) {
        let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);
        tracing::info!(from = ?*state, to = ?next, "worker state change");
        *state = next;
    }

    pub fn router(&self) -> &CacheRouter {
        &self.router
    }

    pub fn origin(&self) -> &Url {
        &self.origin
    }

    pub fn manifest(&self) -> &[Url] {
        &self.manifest
    }

    /// Resume from an earlier run, installing only if needed.
    ///
    /// Used at startup against a persistent store.
    pub async fn start(&self) -> Result<WorkerState, Error> {
        match self.resume().await? {
            WorkerState::Installing => self.install().await,
            state => Ok(state),
        }
    }

    /// Inspect the store for caches left by an earlier run.
    ///
    /// If this version's manifest is already cached, the worker skips the
    /// fetch and moves on as a successful install would. Otherwise any
    /// surviving partitions keep serving while this version installs, and
    /// after a failed install.
    pub async fn resume(&self) -> Result<WorkerState, Error> {
        let _transition = self.transition.lock().await;

        if self.state() != WorkerState::Installing {
            return Err(Error::InvalidState(format!("cannot resume from {:?}", self.state())));
        }

        if self.router.has_caches().await? {
            tracing::info!("caches from an earlier run found, serving from them");
            self.previous_controls.store(true, Ordering::SeqCst);
        }

        if self.router.is_installed(&self.manifest).await? {
            tracing::info!(partition = %self.router.partitions().static_name, "version already installed");
            self.set_state(WorkerState::Waiting);
            if self.skip_waiting.load(Ordering::SeqCst) {
                self.activate_locked().await?;
            }
        }

        Ok(self.state())
    }

    /// Pre-cache the manifest and move to `waiting`.
    ///
    /// Continues straight on to activation if skip-waiting was signalled.
    /// On failure the worker becomes `redundant`; caches found by `resume`
    /// keep serving.
    pub async fn install(&self) -> Result<WorkerState, Error> {
        let _transition = self.transition.lock().await;

        if self.state() != WorkerState::Installing {
            return Err(Error::InvalidState(format!("cannot install from {:?}", self.state())));
        }

        match self.router.on_install(&self.manifest).await {
            Ok(_) => self.set_state(WorkerState::Waiting),
            Err(e) => {
                tracing::error!(error = %e, "error caching static assets");
                self.set_state(WorkerState::Redundant);
                return Err(e);
            }
        }

        if self.skip_waiting.load(Ordering::SeqCst) {
            self.activate_locked().await?;
        }

        Ok(self.state())
    }

    /// Skip-waiting signal.
    ///
    /// Activates immediately from `waiting` (or retries a failed
    /// activation); while installing, it is remembered and applied once
    /// install succeeds.
    pub async fn skip_waiting(&self) -> Result<WorkerState, Error> {
        self.skip_waiting.store(true, Ordering::SeqCst);
        let _transition = self.transition.lock().await;

        match self.state() {
            WorkerState::Waiting | WorkerState::Activating => self.activate_locked().await?,
            WorkerState::Installing | WorkerState::Active => {}
            WorkerState::Redundant => {
                return Err(Error::InvalidState("worker is redundant after a failed install".into()));
            }
        }

        Ok(self.state())
    }

    async fn activate_locked(&self) -> Result<(), Error> {
        self.set_state(WorkerState::Activating);
        let deleted = self.router.on_activate().await?;
        tracing::info!(deleted = deleted.len(), "old caches cleaned up");
        self.set_state(WorkerState::Active);
        Ok(())
    }

    /// Whether `handle_fetch` would route this request through the caches.
    pub fn intercepts(&self, request: &Request) -> bool {
        let controlled = self.state() == WorkerState::Active || self.previous_controls.load(Ordering::SeqCst);
        controlled && request.is_get() && request.is_same_origin(&self.origin)
    }

    /// Handle one request, through the caches when intercepted.
    pub async fn handle_fetch(&self, request: &Request) -> Result<Response, Error> {
        self.handle(request).await.map(|outcome| outcome.response)
    }

    /// Like `handle_fetch`, also reporting the routing decision.
    pub async fn handle(&self, request: &Request) -> Result<FetchOutcome, Error> {
        if !self.intercepts(request) {
            tracing::debug!(method = %request.method, url = %request.url, "passing request through");
            let response = self.router.passthrough(request).await?;
            return Ok(FetchOutcome { response, strategy: None });
        }

        let strategy = self.router.strategy_for(request);
        let start = Instant::now();
        let response = self.router.route(request).await?;

        self.perf.record(PerfEntry {
            url: request.url.to_string(),
            method: request.method.clone(),
            strategy,
            duration_ms: start.elapsed().as_secs_f64() * 1000.0,
            timestamp: chrono::Utc::now().to_rfc3339(),
            from_cache: response.from_cache(),
        });

        Ok(FetchOutcome { response, strategy: Some(strategy) })
    }

    pub fn perf_entries(&self) -> Vec<PerfEntry> {
        self.perf.entries()
    }

    pub async fn cache_size(&self) -> Result<CacheUsage, Error> {
        self.router.cache_size().await
    }

    pub async fn clear_all_caches(&self) -> Result<Vec<String>, Error> {
        self.router.clear_all().await
    }

    pub async fn update_static_assets(&self) -> UpdateReport {
        self.router.update_static_assets(&self.manifest).await
    }
}
