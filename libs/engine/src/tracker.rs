use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use tokio_util::task::TaskTracker;

/// Counting join over spawned dispatch tasks.
///
/// Every launch bumps the outstanding count, every finished task drops it
/// (a panicking task counts as finished), and `drain` suspends until it
/// returns to zero. No bound on how many tasks are in flight and no
/// ordering between completions.
#[derive(Clone, Default)]
pub struct CompletionTracker {
    tasks: TaskTracker,
    launched: Arc<AtomicU64>,
    completed: Arc<AtomicU64>,
}

impl CompletionTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Spawn `fut` on the current runtime without waiting for it.
    pub fn launch<F>(&self, fut: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let completed = self.completed.clone();
        self.launched.fetch_add(1, Ordering::Relaxed);
        self.tasks.spawn(async move {
            fut.await;
            completed.fetch_add(1, Ordering::Relaxed);
        });
    }

    /// Tasks launched and not yet finished.
    pub fn outstanding(&self) -> usize {
        self.tasks.len()
    }

    pub fn launched(&self) -> u64 {
        self.launched.load(Ordering::Relaxed)
    }

    /// Tasks that ran to completion (panicked tasks are not counted).
    pub fn completed(&self) -> u64 {
        self.completed.load(Ordering::Relaxed)
    }

    /// Wait until every launched task has finished.
    pub async fn drain(&self) {
        self.tasks.close();
        self.tasks.wait().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test(start_paused = true)]
    async fn drain_waits_for_every_task() {
        let tracker = CompletionTracker::new();
        for i in 0..50u64 {
            tracker.launch(async move {
                tokio::time::sleep(Duration::from_millis(50 - i)).await;
            });
        }
        assert_eq!(tracker.launched(), 50);
        assert!(tracker.outstanding() > 0);

        tracker.drain().await;
        assert_eq!(tracker.outstanding(), 0);
        assert_eq!(tracker.completed(), 50);
    }

    #[tokio::test]
    async fn drain_on_empty_returns() {
        let tracker = CompletionTracker::new();
        tracker.drain().await;
        assert_eq!(tracker.launched(), 0);
    }

    #[tokio::test]
    async fn panicking_task_still_finishes() {
        let tracker = CompletionTracker::new();
        tracker.launch(async { panic!("sink blew up") });
        tracker.launch(async {});
        tracker.drain().await;
        assert_eq!(tracker.outstanding(), 0);
        assert_eq!(tracker.completed(), 1);
    }
}
