use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{broadcast, watch};
use tokio::task::JoinHandle;

use taskboard_atoms as atoms;
use taskboard_shared::{AppState, ChangeSignal};

use atoms::employees::Employee;
use atoms::error::StoreError;
use atoms::tasks::Task;

/// How often a watcher reloads when no change signal arrives. Snapshots
/// are full replacements, so a spurious reload is harmless.
pub const POLL_INTERVAL: Duration = Duration::from_secs(30);

/// Live view over one collection. Holds the latest full snapshot; the
/// background loop replaces it whole on every change, and consumers
/// re-render from it without merging. Cancel (or drop) to stop the loop.
pub struct Subscription<T> {
    rx: watch::Receiver<Vec<T>>,
    task: JoinHandle<()>,
}

impl<T: Clone> Subscription<T> {
    /// Latest snapshot. Empty until the first load completes.
    pub fn snapshot(&self) -> Vec<T> {
        self.rx.borrow().clone()
    }

    /// Wait until a new snapshot replaces the current one, then return it.
    pub async fn changed(&mut self) -> Vec<T> {
        // the sender lives in our own loop task, which only exits after
        // cancel; a closed channel just means the last snapshot is final
        let _ = self.rx.changed().await;
        self.rx.borrow_and_update().clone()
    }
}

impl<T> Subscription<T> {
    /// Tear the subscription down. Without this (or drop) the reload loop
    /// would outlive the consuming view.
    pub fn cancel(self) {}
}

impl<T> Drop for Subscription<T> {
    fn drop(&mut self) {
        self.task.abort();
    }
}

/// Spawn a snapshot loop: load once immediately, then reload whenever the
/// change signal fires or the poll interval lapses.
pub fn subscribe<T, L, Fut>(signal: &ChangeSignal, load: L) -> Subscription<T>
where
    T: Clone + Send + Sync + 'static,
    L: Fn() -> Fut + Send + 'static,
    Fut: Future<Output = Result<Vec<T>, StoreError>> + Send,
{
    let (tx, rx) = watch::channel(Vec::new());
    let mut changes = signal.subscribe();

    let task = tokio::spawn(async move {
        loop {
            match load().await {
                Ok(snapshot) => {
                    if tx.send(snapshot).is_err() {
                        return; // every receiver is gone
                    }
                }
                // serve the stale snapshot until the next tick succeeds
                Err(e) => tracing::warn!("snapshot reload failed: {}", e),
            }

            tokio::select! {
                recv = changes.recv() => {
                    match recv {
                        Ok(()) => {}
                        // Lagged just means signals were coalesced; the
                        // reload reads current state anyway
                        Err(broadcast::error::RecvError::Lagged(_)) => {}
                        Err(broadcast::error::RecvError::Closed) => return,
                    }
                }
                _ = tokio::time::sleep(POLL_INTERVAL) => {}
            }
        }
    });

    Subscription { rx, task }
}

/// Live task feed: newest-first with attachments resolved, mirroring the
/// list endpoint.
pub fn watch_tasks(state: Arc<AppState>) -> Subscription<Task> {
    let signal = state.changes.clone();
    subscribe(&signal, move || {
        let state = Arc::clone(&state);
        async move {
            super::tasks::load_tasks_with_attachments(&state.dynamo_client, &state.table_name)
                .await
        }
    })
}

/// Live employee feed, ordered by name.
pub fn watch_employees(state: Arc<AppState>) -> Subscription<Employee> {
    let signal = state.changes.clone();
    subscribe(&signal, move || {
        let state = Arc::clone(&state);
        async move {
            atoms::employees::service::list_employees(&state.dynamo_client, &state.table_name)
                .await
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[derive(Default)]
    struct FakeDirectory {
        names: Mutex<Vec<String>>,
    }

    impl FakeDirectory {
        fn push(&self, name: &str) {
            self.names.lock().unwrap().push(name.to_string());
        }

        fn load(&self) -> Vec<String> {
            self.names.lock().unwrap().clone()
        }
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn snapshots_replace_wholesale_on_signal() {
        let signal = ChangeSignal::new();
        let directory = Arc::new(FakeDirectory::default());
        directory.push("Ann");

        let loader_dir = Arc::clone(&directory);
        let mut sub = subscribe(&signal, move || {
            let dir = Arc::clone(&loader_dir);
            async move { Ok(dir.load()) }
        });

        let first = sub.changed().await;
        assert_eq!(first, vec!["Ann".to_string()]);

        directory.push("Ben");
        signal.publish();

        let second = sub.changed().await;
        assert_eq!(second, vec!["Ann".to_string(), "Ben".to_string()]);
        assert_eq!(sub.snapshot(), second);

        sub.cancel();
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn failed_reload_keeps_the_previous_snapshot() {
        let signal = ChangeSignal::new();
        let calls = Arc::new(Mutex::new(0u32));

        let loader_calls = Arc::clone(&calls);
        let mut sub = subscribe(&signal, move || {
            let calls = Arc::clone(&loader_calls);
            async move {
                let mut calls = calls.lock().unwrap();
                *calls += 1;
                if *calls == 2 {
                    Err(StoreError::Storage("transient outage".to_string()))
                } else {
                    Ok(vec![*calls])
                }
            }
        });

        let first = sub.changed().await;
        assert_eq!(first, vec![1]);

        // this reload fails; the snapshot must stay at the previous value
        signal.publish();
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(sub.snapshot(), vec![1]);

        // the next one recovers
        signal.publish();
        let recovered = sub.changed().await;
        assert_eq!(recovered, vec![3]);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn cancel_stops_the_reload_loop() {
        let signal = ChangeSignal::new();
        let calls = Arc::new(Mutex::new(0u32));

        let loader_calls = Arc::clone(&calls);
        let mut sub = subscribe(&signal, move || {
            let calls = Arc::clone(&loader_calls);
            async move {
                *calls.lock().unwrap() += 1;
                Ok(Vec::<u32>::new())
            }
        });

        sub.changed().await;
        sub.cancel();
        tokio::time::sleep(Duration::from_millis(20)).await;

        let after_cancel = *calls.lock().unwrap();
        signal.publish();
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(*calls.lock().unwrap(), after_cancel);
    }
}
