//! Ownership of running watcher tasks.

use std::future::Future;

use tokio::task::JoinHandle;

/// Task registry for watchers.
///
/// Dropping the registry detaches the tasks; they keep running until their
/// shutdown token fires.
#[derive(Debug, Default)]
pub struct WatchRegistry {
    tasks: Vec<JoinHandle<()>>,
}

impl WatchRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn spawn<F>(&mut self, task: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        self.tasks.push(tokio::spawn(task));
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    /// Number of tasks that have not exited yet.
    pub fn running(&self) -> usize {
        self.tasks.iter().filter(|task| !task.is_finished()).count()
    }

    /// Wait for every task to exit.
    pub async fn join_all(&mut self) {
        for task in self.tasks.drain(..) {
            if let Err(e) = task.await {
                tracing::error!(error = %e, "Watcher task failed");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[tokio::test]
    async fn test_join_all_waits_for_tasks() {
        let done = Arc::new(AtomicUsize::new(0));
        let mut registry = WatchRegistry::new();
        for _ in 0..3 {
            let done = Arc::clone(&done);
            registry.spawn(async move {
                tokio::task::yield_now().await;
                done.fetch_add(1, Ordering::SeqCst);
            });
        }
        assert_eq!(registry.len(), 3);

        registry.join_all().await;
        assert_eq!(done.load(Ordering::SeqCst), 3);
        assert!(registry.is_empty());
        assert_eq!(registry.running(), 0);
    }
}
