//! Cooperative-cancellation task spawning, in the spirit of Lighthouse's own
//! `task_executor` crate: every long-running worker gets a clone of the same
//! shutdown signal instead of rolling its own `ctrl_c` handling.
//!
//! Lighthouse's historical `task_executor` paired a `tokio::runtime::Handle`
//! with an `exit-future::Exit`. `exit-future` has had no release in years, so
//! this rebuild uses a `tokio::sync::watch<bool>` for the same "cheaply
//! cloneable, broadcast-once" shape without the extra dependency.

use slog::{debug, Logger};
use std::future::Future;
use tokio::runtime::Handle;
use tokio::sync::watch;

/// Handed out once at start-up; call `shutdown()` to signal every task
/// spawned through the paired `TaskExecutor` to exit at its next suspension
/// point.
#[derive(Clone)]
pub struct ShutdownSender(watch::Sender<bool>);

impl ShutdownSender {
    pub fn shutdown(&self) {
        // An error here means every receiver has already been dropped, i.e.
        // every task has already exited: nothing to signal.
        let _ = self.0.send(true);
    }
}

/// Creates a fresh shutdown signal pair. Clone the returned `TaskExecutor`
/// into every component that spawns its own tasks.
pub fn shutdown_signal(handle: Handle, log: Logger) -> (TaskExecutor, ShutdownSender) {
    let (tx, rx) = watch::channel(false);
    (TaskExecutor { handle, exit: rx, log }, ShutdownSender(tx))
}

#[derive(Clone)]
pub struct TaskExecutor {
    handle: Handle,
    exit: watch::Receiver<bool>,
    log: Logger,
}

impl TaskExecutor {
    pub fn handle(&self) -> &Handle {
        &self.handle
    }

    pub fn log(&self) -> &Logger {
        &self.log
    }

    pub fn is_shutdown(&self) -> bool {
        *self.exit.borrow()
    }

    /// Returns a future that resolves once shutdown has been signalled.
    /// Workers with their own suspension points (channel recv, ticker)
    /// should race this with `tokio::select!` instead of calling `spawn`.
    pub async fn exit(&self) {
        let mut exit = self.exit.clone();
        if *exit.borrow() {
            return;
        }
        // Only `changed()` can observe a value transition; a closed sender
        // (process already tearing down) is equivalent to "shutdown now".
        let _ = exit.changed().await;
    }

    /// Spawns `future` on the runtime, wrapped so that it is dropped at the
    /// executor's next suspension point after shutdown is signalled.
    pub fn spawn<F>(&self, future: F, name: &'static str)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let log = self.log.clone();
        let mut exit = self.exit.clone();
        self.handle.spawn(async move {
            tokio::select! {
                () = future => {}
                _ = exit.changed() => {
                    debug!(log, "Task shut down"; "task" => name);
                }
            }
        });
    }

    /// Spawns a future that has no natural suspension point of its own
    /// (e.g. a tight computation) and should simply run to completion;
    /// shutdown is only checked before spawning.
    pub fn spawn_ignore_exit<F>(&self, future: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        if !self.is_shutdown() {
            self.handle.spawn(future);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use slog::{o, Drain};
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;
    use std::time::Duration;

    fn null_log() -> Logger {
        Logger::root(slog::Discard.fuse(), o!())
    }

    #[tokio::test]
    async fn spawned_task_is_cancelled_on_shutdown() {
        let handle = Handle::current();
        let (executor, shutdown) = shutdown_signal(handle, null_log());
        let completed = Arc::new(AtomicBool::new(false));
        let completed2 = completed.clone();

        executor.spawn(
            async move {
                tokio::time::sleep(Duration::from_secs(60)).await;
                completed2.store(true, Ordering::SeqCst);
            },
            "sleeper",
        );

        tokio::time::sleep(Duration::from_millis(10)).await;
        shutdown.shutdown();
        tokio::time::sleep(Duration::from_millis(10)).await;

        assert!(!completed.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn exit_resolves_after_shutdown() {
        let handle = Handle::current();
        let (executor, shutdown) = shutdown_signal(handle, null_log());
        assert!(!executor.is_shutdown());
        shutdown.shutdown();
        executor.exit().await;
        assert!(executor.is_shutdown());
    }
}
