//! Tracked background revalidation tasks.
//!
//! A cache-first hit answers immediately and refreshes the entry in the
//! background. Those refreshes are owned here rather than detached, so the
//! host can wait for them before shutting down.

use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use tokio::sync::{Mutex, Notify};
use tokio::task::{JoinError, JoinSet};

/// Set of outstanding background refreshes.
///
/// Tasks stay owned by the set until they finish; waiting for them never
/// takes them out, so a cancelled wait aborts nothing.
#[derive(Default)]
pub struct Revalidations {
    tasks: Mutex<JoinSet<()>>,
    active: Arc<AtomicUsize>,
    idle: Arc<Notify>,
}

/// Counts one running refresh. Dropped when the task ends, panics included.
struct InFlight {
    active: Arc<AtomicUsize>,
    idle: Arc<Notify>,
}

impl Drop for InFlight {
    fn drop(&mut self) {
        if self.active.fetch_sub(1, Ordering::AcqRel) == 1 {
            self.idle.notify_waiters();
        }
    }
}

impl Revalidations {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a refresh. Returns once it is registered, not once it finishes.
    pub async fn spawn<F>(&self, task: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let mut tasks = self.tasks.lock().await;
        reap(&mut tasks);

        self.active.fetch_add(1, Ordering::AcqRel);
        let in_flight = InFlight { active: Arc::clone(&self.active), idle: Arc::clone(&self.idle) };
        tasks.spawn(async move {
            let _in_flight = in_flight;
            task.await;
        });
    }

    /// Number of refreshes still running.
    pub async fn pending(&self) -> usize {
        reap(&mut *self.tasks.lock().await);
        self.active.load(Ordering::Acquire)
    }

    /// Wait until every refresh, including ones spawned while waiting, has settled.
    pub async fn wait_idle(&self) {
        loop {
            let notified = self.idle.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();
            if self.active.load(Ordering::Acquire) == 0 {
                break;
            }
            notified.await;
        }
        reap(&mut *self.tasks.lock().await);
    }
}

fn reap(tasks: &mut JoinSet<()>) {
    while let Some(done) = tasks.try_join_next() {
        log_join(done);
    }
}

fn log_join(result: Result<(), JoinError>) {
    if let Err(e) = result
        && e.is_panic()
    {
        tracing::warn!(error = %e, "revalidation task panicked");
    }
}
