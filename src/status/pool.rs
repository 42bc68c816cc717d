// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Bounded worker pool for per-Ingress status updates.

use futures::stream::{self, StreamExt};
use std::future::Future;
use tokio_util::sync::CancellationToken;

/// Handle given to each unit of work.
///
/// A unit must check [`WorkUnit::is_cancelled`] before any externally visible
/// effect and return without a result when it is set.
#[derive(Debug, Clone)]
pub struct WorkUnit {
    token: CancellationToken,
}

impl WorkUnit {
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }
}

/// Runs batches of work with at most `width` units in flight.
#[derive(Debug, Clone, Copy)]
pub struct WorkerPool {
    width: usize,
}

impl WorkerPool {
    #[must_use]
    pub fn new(width: usize) -> Self {
        Self {
            width: width.max(1),
        }
    }

    #[must_use]
    pub fn width(&self) -> usize {
        self.width
    }

    /// Run `work` over every item and wait for all of them.
    ///
    /// Units report `None` when they did nothing (e.g. cancelled). Results come
    /// back in completion order.
    pub async fn run_batch<T, O, F, Fut>(
        &self,
        token: &CancellationToken,
        items: impl IntoIterator<Item = T>,
        work: F,
    ) -> Vec<O>
    where
        F: Fn(WorkUnit, T) -> Fut,
        Fut: Future<Output = Option<O>>,
    {
        stream::iter(items)
            .map(|item| {
                let unit = WorkUnit {
                    token: token.child_token(),
                };
                work(unit, item)
            })
            .buffer_unordered(self.width)
            .filter_map(|result| async move { result })
            .collect()
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    #[tokio::test]
    async fn test_all_units_complete() {
        let pool = WorkerPool::new(10);
        let token = CancellationToken::new();

        let mut results = pool
            .run_batch(&token, 0..25, |_, i| async move { Some(i * 2) })
            .await;
        results.sort_unstable();

        assert_eq!(results, (0..25).map(|i| i * 2).collect::<Vec<_>>());
    }

    #[tokio::test]
    async fn test_width_bounds_concurrency() {
        let pool = WorkerPool::new(3);
        let token = CancellationToken::new();
        let running = &AtomicUsize::new(0);
        let peak = &AtomicUsize::new(0);

        pool.run_batch(&token, 0..12, |_, _| async move {
            let now = running.fetch_add(1, Ordering::SeqCst) + 1;
            peak.fetch_max(now, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(5)).await;
            running.fetch_sub(1, Ordering::SeqCst);
            Some(())
        })
        .await;

        assert_eq!(peak.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_cancelled_units_report_nothing() {
        let pool = WorkerPool::new(10);
        let token = CancellationToken::new();
        token.cancel();

        let results: Vec<i32> = pool
            .run_batch(&token, 0..5, |unit, i| async move {
                if unit.is_cancelled() {
                    return None;
                }
                Some(i)
            })
            .await;

        assert!(results.is_empty());
    }

    #[test]
    fn test_width_is_at_least_one() {
        assert_eq!(WorkerPool::new(0).width(), 1);
    }
}
