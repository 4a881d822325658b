//! Advisory in-process serialization.
//!
//! The store offers no transactions, so multi-key updates are serialized
//! through three named lock maps: per topic (publish vs. topic/subscription
//! lifecycle), per subscription (pull/ack/modify/delete on one
//! subscription), and per message (remaining-subscription updates across
//! subscriptions). Acquisition order is topic → subscription → message;
//! the locks are not reentrant.

use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::{Mutex, OwnedMutexGuard};

#[derive(Default)]
struct LockMap {
    locks: DashMap<String, Arc<Mutex<()>>>,
}

impl LockMap {
    async fn acquire(&self, name: &str) -> OwnedMutexGuard<()> {
        let lock = {
            let entry = self.locks.entry(name.to_owned()).or_default();
            Arc::clone(entry.value())
        };
        lock.lock_owned().await
    }
}

#[derive(Default)]
pub struct Guard {
    topics: LockMap,
    subscriptions: LockMap,
    messages: LockMap,
}

impl Guard {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn topic(&self, name: &str) -> OwnedMutexGuard<()> {
        self.topics.acquire(name).await
    }

    pub async fn subscription(&self, name: &str) -> OwnedMutexGuard<()> {
        self.subscriptions.acquire(name).await
    }

    pub async fn message(&self, id: &str) -> OwnedMutexGuard<()> {
        self.messages.acquire(id).await
    }
}
