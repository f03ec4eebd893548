//! In-process activity counters
//!
//! Created at startup and held in `AppState`. Nothing here is persisted;
//! a restart starts the label tally from zero.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicI64, Ordering};

use parking_lot::RwLock;
use serde::Serialize;

#[derive(Debug, Default)]
pub struct ActivityStats {
    users: AtomicI64,
    labels: RwLock<BTreeMap<String, u64>>,
}

/// `/api/stats` payload
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StatsSnapshot {
    pub total_users: i64,
    pub total_predictions: u64,
    pub prediction_types: BTreeMap<String, u64>,
    pub active_sessions: usize,
}

impl ActivityStats {
    /// Seed the user count from the store
    pub fn new(existing_users: i64) -> Self {
        Self {
            users: AtomicI64::new(existing_users),
            labels: RwLock::default(),
        }
    }

    pub fn user_created(&self) {
        self.users.fetch_add(1, Ordering::Relaxed);
    }

    pub fn user_deleted(&self) {
        self.users.fetch_sub(1, Ordering::Relaxed);
    }

    /// Count one classification under its label
    pub fn record_prediction(&self, label: &str) {
        *self.labels.write().entry(label.to_string()).or_insert(0) += 1;
    }

    pub fn tally(&self) -> BTreeMap<String, u64> {
        self.labels.read().clone()
    }

    pub fn snapshot(&self, active_sessions: usize) -> StatsSnapshot {
        let prediction_types = self.tally();
        StatsSnapshot {
            total_users: self.users.load(Ordering::Relaxed).max(0),
            total_predictions: prediction_types.values().sum(),
            prediction_types,
            active_sessions,
        }
    }
}
