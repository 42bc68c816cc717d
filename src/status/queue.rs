// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Single-key work queue serialising status syncs.
//!
//! Every trigger uses the same key, so triggers arriving while one is already
//! pending are absorbed. A single consumer takes them one at a time, so at
//! most one sync runs per process.

use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::Notify;
use tracing::debug;

#[derive(Debug, Default)]
pub struct SyncQueue {
    pending: AtomicBool,
    shutting_down: AtomicBool,
    notify: Notify,
}

impl SyncQueue {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Request a sync. Returns `false` once the queue is shutting down.
    pub fn enqueue(&self, key: &str) -> bool {
        if self.is_shutting_down() {
            return false;
        }

        if self.pending.swap(true, Ordering::SeqCst) {
            debug!(key = %key, "sync already pending");
        } else {
            self.notify.notify_one();
        }
        true
    }

    /// Wait for the next pending sync.
    ///
    /// Returns `false` when the queue has been shut down.
    pub async fn next(&self) -> bool {
        loop {
            if self.is_shutting_down() {
                return false;
            }
            if self.pending.swap(false, Ordering::SeqCst) {
                return true;
            }
            self.notify.notified().await;
        }
    }

    /// Stop handing out work. A sync already running is not interrupted.
    pub fn shutdown(&self) {
        self.shutting_down.store(true, Ordering::SeqCst);
        self.notify.notify_one();
    }

    #[must_use]
    pub fn is_shutting_down(&self) -> bool {
        self.shutting_down.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn test_triggers_are_coalesced() {
        let queue = SyncQueue::new();

        assert!(queue.enqueue("sync status"));
        assert!(queue.enqueue("sync status"));
        assert!(queue.enqueue("sync status"));

        assert!(queue.next().await);
        let second = tokio::time::timeout(Duration::from_millis(50), queue.next()).await;
        assert!(second.is_err(), "repeated triggers must collapse into one");
    }

    #[tokio::test]
    async fn test_enqueue_wakes_waiting_consumer() {
        let queue = std::sync::Arc::new(SyncQueue::new());
        let consumer = {
            let queue = queue.clone();
            tokio::spawn(async move { queue.next().await })
        };

        tokio::task::yield_now().await;
        queue.enqueue("sync status");

        assert!(consumer.await.unwrap());
    }

    #[tokio::test]
    async fn test_shutdown_stops_consumer() {
        let queue = std::sync::Arc::new(SyncQueue::new());
        let consumer = {
            let queue = queue.clone();
            tokio::spawn(async move { queue.next().await })
        };

        tokio::task::yield_now().await;
        queue.shutdown();

        assert!(!consumer.await.unwrap());
        assert!(queue.is_shutting_down());
        assert!(!queue.enqueue("sync status"));
    }

    #[tokio::test]
    async fn test_pending_trigger_dropped_on_shutdown() {
        let queue = SyncQueue::new();

        queue.enqueue("sync status");
        queue.shutdown();

        assert!(!queue.next().await);
    }
}
