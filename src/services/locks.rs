use std::sync::Arc;

use chrono::NaiveDate;
use dashmap::DashMap;
use tokio::sync::{Mutex, OwnedMutexGuard};

const PRUNE_THRESHOLD: usize = 1024;

/// Async mutexes keyed by string, created on first use.
#[derive(Default)]
pub struct KeyedLocks {
    locks: DashMap<String, Arc<Mutex<()>>>,
}

impl KeyedLocks {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn booking_key(tenant: &str, booking_id: &str) -> String {
        format!("booking:{tenant}:{booking_id}")
    }

    pub fn slots_key(tenant: &str, date: NaiveDate) -> String {
        format!("slots:{tenant}:{date}")
    }

    pub async fn lock(&self, key: String) -> OwnedMutexGuard<()> {
        if self.locks.len() > PRUNE_THRESHOLD {
            self.prune();
        }
        // clone out of the shard before awaiting
        let mutex = self.locks.entry(key).or_default().clone();
        mutex.lock_owned().await
    }

    /// Drops entries nobody holds or waits on.
    fn prune(&self) {
        self.locks.retain(|_, m| Arc::strong_count(m) > 1);
    }

    pub fn len(&self) -> usize {
        self.locks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.locks.is_empty()
    }
}
