//! Periodic sweep tasks.
//!
//! Each stateful component exposes a synchronous [`Sweep`] pass that takes
//! the component's own lock. [`Sweeper::spawn`] runs that pass on a tokio
//! interval until the returned handle is shut down or dropped.

use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

/// A component with time-based cleanup.
pub trait Sweep: Send + Sync + 'static {
    /// Run one cleanup pass. Returns the number of entries removed.
    fn sweep(&self) -> usize;

    /// Name used in logs.
    fn name(&self) -> &'static str;
}

/// Spawns periodic sweep tasks.
pub struct Sweeper;

impl Sweeper {
    /// Start sweeping `target` every `interval`.
    ///
    /// Must be called from within a tokio runtime. The first pass runs one
    /// full `interval` after spawning.
    pub fn spawn(target: Arc<dyn Sweep>, interval: Duration) -> SweeperHandle {
        let name = target.name();
        let interval = interval.max(Duration::from_millis(1));
        let (shutdown_tx, mut shutdown_rx) = watch::channel(false);

        let task = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            // The first tick completes immediately
            ticker.tick().await;

            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        let removed = target.sweep();
                        if removed > 0 {
                            tracing::debug!(sweeper = name, removed, "Periodic sweep");
                        }
                    }
                    changed = shutdown_rx.changed() => {
                        if changed.is_err() || *shutdown_rx.borrow() {
                            break;
                        }
                    }
                }
            }
            tracing::debug!(sweeper = name, "Sweeper stopped");
        });

        tracing::debug!(sweeper = name, interval_ms = interval.as_millis() as u64, "Sweeper started");
        SweeperHandle {
            name,
            shutdown_tx,
            task: Some(task),
        }
    }
}

/// Owns a running sweep task. Dropping the handle stops the task.
pub struct SweeperHandle {
    name: &'static str,
    shutdown_tx: watch::Sender<bool>,
    task: Option<JoinHandle<()>>,
}

impl SweeperHandle {
    /// Name of the component being swept.
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Stop the task and wait for it to finish.
    pub async fn shutdown(mut self) {
        let _ = self.shutdown_tx.send(true);
        if let Some(task) = self.task.take() {
            if let Err(e) = task.await {
                tracing::warn!(sweeper = self.name, error = %e, "Sweeper task ended abnormally");
            }
        }
    }
}

impl Drop for SweeperHandle {
    fn drop(&mut self) {
        let _ = self.shutdown_tx.send(true);
    }
}
