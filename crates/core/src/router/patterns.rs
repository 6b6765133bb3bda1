//! URL-path pattern tables that select a caching strategy.

use std::fmt;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::Error;

/// API calls and form endpoints want fresh data first.
pub const DEFAULT_NETWORK_FIRST: &[&str] = &[r"/api/", r"/contact", r"/form"];

/// Images, stylesheets, scripts, and fonts rarely change between deploys.
pub const DEFAULT_CACHE_FIRST: &[&str] = &[r"\.(?:png|jpg|jpeg|svg|gif|webp)$", r"\.(?:css|js)$", r"/fonts/"];

/// Caching policy applied to one request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, schemars::JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum Strategy {
    NetworkFirst,
    CacheFirst,
    StaleWhileRevalidate,
}

impl Strategy {
    pub fn as_str(&self) -> &'static str {
        match self {
            Strategy::NetworkFirst => "network_first",
            Strategy::CacheFirst => "cache_first",
            Strategy::StaleWhileRevalidate => "stale_while_revalidate",
        }
    }
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Ordered rule tables.
///
/// The network-first list is checked before the cache-first list; a path
/// matching neither gets stale-while-revalidate.
#[derive(Debug, Clone)]
pub struct PatternTable {
    network_first: Vec<Regex>,
    cache_first: Vec<Regex>,
}

impl PatternTable {
    pub fn new<S: AsRef<str>>(network_first: &[S], cache_first: &[S]) -> Result<Self, Error> {
        Ok(Self { network_first: compile(network_first)?, cache_first: compile(cache_first)? })
    }

    /// Pick the strategy for a URL path.
    pub fn select(&self, path: &str) -> Strategy {
        if self.network_first.iter().any(|re| re.is_match(path)) {
            Strategy::NetworkFirst
        } else if self.cache_first.iter().any(|re| re.is_match(path)) {
            Strategy::CacheFirst
        } else {
            Strategy::StaleWhileRevalidate
        }
    }
}

fn compile<S: AsRef<str>>(patterns: &[S]) -> Result<Vec<Regex>, Error> {
    patterns
        .iter()
        .map(|p| {
            Regex::new(p.as_ref())
                .map_err(|e| Error::InvalidPattern { pattern: p.as_ref().to_string(), reason: e.to_string() })
        })
        .collect()
}
