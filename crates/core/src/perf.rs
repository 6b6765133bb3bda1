//! Bounded log of recently handled requests.

use std::collections::VecDeque;
use std::sync::{Mutex, PoisonError};

use serde::{Deserialize, Serialize};

use crate::router::Strategy;

/// Timing record for one intercepted request.
#[derive(Debug, Clone, Serialize, Deserialize, schemars::JsonSchema)]
pub struct PerfEntry {
    pub url: String,
    pub method: String,
    pub strategy: Strategy,
    pub duration_ms: f64,
    /// RFC 3339 timestamp of completion.
    pub timestamp: String,
    pub from_cache: bool,
}

/// Ring buffer keeping the newest `capacity` entries.
#[derive(Debug)]
pub struct PerfLog {
    capacity: usize,
    entries: Mutex<VecDeque<PerfEntry>>,
}

impl PerfLog {
    pub fn new(capacity: usize) -> Self {
        Self { capacity, entries: Mutex::new(VecDeque::with_capacity(capacity)) }
    }

    pub fn record(&self, entry: PerfEntry) {
        if self.capacity == 0 {
            return;
        }
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        while entries.len() >= self.capacity {
            entries.pop_front();
        }
        entries.push_back(entry);
    }

    /// Entries oldest first.
    pub fn entries(&self) -> Vec<PerfEntry> {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .cloned()
            .collect()
    }
}
