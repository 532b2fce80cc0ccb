//! In-process per-order mutation locks.
//!
//! Row locks (`SELECT ... FOR UPDATE`) serialise writers across processes.
//! This registry additionally queues writers inside one process so they do not
//! pile up on the database lock.

use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::{Mutex, OwnedMutexGuard};

use kasa_shared::types::OrderId;

/// Registry of one async mutex per order.
#[derive(Debug, Clone, Default)]
pub struct OrderLocks {
    locks: Arc<DashMap<OrderId, Arc<Mutex<()>>>>,
}

impl OrderLocks {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Waits for exclusive access to `order_id`.
    pub async fn acquire(&self, order_id: OrderId) -> OwnedMutexGuard<()> {
        let lock = self
            .locks
            .entry(order_id)
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone();
        lock.lock_owned().await
    }

    /// Drops the lock of a deleted order once nobody else holds or awaits it.
    pub fn forget(&self, order_id: OrderId) {
        self.locks
            .remove_if(&order_id, |_, lock| Arc::strong_count(lock) <= 2);
    }

    /// Number of tracked orders.
    #[must_use]
    pub fn len(&self) -> usize {
        self.locks.len()
    }

    /// Returns true if no order is tracked.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.locks.is_empty()
    }
}
