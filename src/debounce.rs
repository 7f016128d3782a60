use std::collections::HashMap;
use std::future::Future;
use std::hash::Hash;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

struct Pending {
    ticket: u64,
    token: CancellationToken,
}

/// Per-key delayed tasks where a newer task for the same key replaces the older one.
///
/// A scheduled task runs after `delay` unless another task is scheduled for
/// the same key first, so a burst of edits produces a single write carrying
/// the last value.
pub struct Debouncer<K> {
    delay: Duration,
    pending: Arc<Mutex<HashMap<K, Pending>>>,
    next_ticket: AtomicU64,
}

impl<K> Debouncer<K>
where
    K: Eq + Hash + Clone + Send + 'static,
{
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            pending: Arc::new(Mutex::new(HashMap::new())),
            next_ticket: AtomicU64::new(0),
        }
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// Schedule `task` for `key`, cancelling whatever was pending for it.
    ///
    /// Must be called from within a tokio runtime. The returned handle
    /// completes when the task has run or was cancelled.
    pub fn schedule<F>(&self, key: K, task: F) -> JoinHandle<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let ticket = self.next_ticket.fetch_add(1, Ordering::Relaxed);
        let token = CancellationToken::new();

        let replaced = lock(&self.pending).insert(
            key.clone(),
            Pending {
                ticket,
                token: token.clone(),
            },
        );
        if let Some(previous) = replaced {
            previous.token.cancel();
        }

        let pending = Arc::clone(&self.pending);
        let delay = self.delay;
        tokio::spawn(async move {
            tokio::select! {
                _ = token.cancelled() => return,
                _ = tokio::time::sleep(delay) => {}
            }

            {
                let mut pending = lock(&pending);
                match pending.get(&key) {
                    Some(current) if current.ticket == ticket => {
                        pending.remove(&key);
                    }
                    // superseded between the timer firing and this check
                    _ => return,
                }
            }

            task.await;
        })
    }

    /// Cancel the pending task for `key`; returns whether one was pending.
    pub fn cancel(&self, key: &K) -> bool {
        match lock(&self.pending).remove(key) {
            Some(previous) => {
                previous.token.cancel();
                true
            }
            None => false,
        }
    }

    /// Number of keys with a task waiting for its delay to elapse
    pub fn pending(&self) -> usize {
        lock(&self.pending).len()
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
