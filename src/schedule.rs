//! Cancellable scheduled tasks.
//!
//! Every delay in the engine (settling before auto-login, reload after a
//! token change, inter-character typing) runs under a scheduler bound to the
//! lifetime of its owning realm. Tearing the realm down cancels everything
//! still pending — no timer outlives its context.

use std::future::Future;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// Task scheduler tied to one owning context.
pub struct Scheduler {
    token: CancellationToken,
}

impl Scheduler {
    pub fn new() -> Self {
        Self {
            token: CancellationToken::new(),
        }
    }

    /// A scheduler that is cancelled when this one is, but can also be
    /// cancelled on its own.
    pub fn child(&self) -> Scheduler {
        Scheduler {
            token: self.token.child_token(),
        }
    }

    /// Spawn a task that is aborted at the next await point once the owning
    /// context shuts down.
    pub fn spawn<F>(&self, future: F) -> JoinHandle<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let token = self.token.clone();
        tokio::spawn(async move {
            tokio::select! {
                _ = token.cancelled() => {}
                _ = future => {}
            }
        })
    }

    /// Spawn a task that waits `delay` first. Cancellation during the wait
    /// means the task body never runs.
    pub fn spawn_after<F>(&self, delay: Duration, future: F) -> JoinHandle<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        self.spawn(async move {
            tokio::time::sleep(delay).await;
            future.await;
        })
    }

    /// Cancel every outstanding task spawned from this scheduler.
    pub fn cancel(&self) {
        self.token.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }
}

impl Default for Scheduler {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for Scheduler {
    fn drop(&mut self) {
        self.token.cancel();
    }
}
