//! Shutdown coordination for long-running tasks.
//!
//! ```text
//! Running ──(parent cancelled | signal)──▶ ShuttingDown ──▶ Drained
//!                                                       └──▶ TimedOut
//! ```
//!
//! Tasks receive a child of the caller's cancellation token. Once a trigger
//! wins the race the child is cancelled and the orchestrator waits, bounded
//! by the drain timeout, for every task to return.

use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::{Duration, Instant};

use futures_util::FutureExt;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;

use crate::config::ShutdownConfig;
use crate::lifecycle::errors::{ErrorSet, JoinedError, TaskError};
use crate::lifecycle::signals::{Signal, TerminationSource};
use crate::lifecycle::task::Task;
use crate::observability::metrics;

/// Orchestrator lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Tasks are running; no trigger has been observed.
    Running,
    /// Cancellation was issued and tasks are draining.
    ShuttingDown,
    /// Every task returned within the drain timeout.
    Drained,
    /// The drain timeout elapsed with tasks still outstanding.
    TimedOut,
}

/// What ended the `Running` phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Trigger {
    /// The parent token was cancelled.
    Parent,
    /// A termination signal arrived.
    Signal(Signal),
}

/// How the drain ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// Every task returned before the deadline.
    Drained,
    /// The deadline passed; `outstanding` tasks were still running.
    TimedOut { outstanding: usize },
}

/// Full account of a shutdown.
#[derive(Debug)]
pub struct ShutdownReport {
    /// What started the shutdown.
    pub trigger: Trigger,
    pub outcome: Outcome,
    /// Time from cancellation to the end of the drain.
    pub drain_duration: Duration,
    /// Failures reported by tasks that returned before the deadline.
    pub errors: Result<(), JoinedError>,
}

impl ShutdownReport {
    /// Drained in time with no task failures.
    pub fn is_clean(&self) -> bool {
        self.outcome == Outcome::Drained && self.errors.is_ok()
    }
}

/// Shared state between the orchestrator and its registrars.
struct Inner {
    token: CancellationToken,
    outstanding: watch::Sender<usize>,
    phase: watch::Sender<Phase>,
    errors: ErrorSet,
}

/// Graceful shutdown orchestrator.
///
/// Single-use: [`Graceful::wait`] consumes it.
pub struct Graceful {
    parent: CancellationToken,
    drain_timeout: Duration,
    inner: Arc<Inner>,
}

impl Graceful {
    /// Create an orchestrator whose tasks run under a child of `parent`.
    pub fn new(parent: &CancellationToken, drain_timeout: Duration) -> Self {
        let (outstanding, _) = watch::channel(0);
        let (phase, _) = watch::channel(Phase::Running);

        Self {
            parent: parent.clone(),
            drain_timeout,
            inner: Arc::new(Inner {
                token: parent.child_token(),
                outstanding,
                phase,
                errors: ErrorSet::new(),
            }),
        }
    }

    /// Create an orchestrator with the drain timeout from `config`.
    pub fn from_config(parent: &CancellationToken, config: &ShutdownConfig) -> Self {
        Self::new(parent, config.drain_timeout())
    }

    /// Handle for registering tasks from elsewhere, including while `wait` runs.
    pub fn registrar(&self) -> Registrar {
        Registrar {
            inner: Arc::clone(&self.inner),
        }
    }

    /// Start every task concurrently under the orchestrator's token.
    ///
    /// # Panics
    ///
    /// Must be called from within a Tokio runtime; each task is spawned.
    pub fn register<I>(&self, tasks: I)
    where
        I: IntoIterator<Item = Arc<dyn Task>>,
    {
        self.inner.register(tasks);
    }

    /// Start a single task. Same runtime requirement as [`Graceful::register`].
    pub fn register_task<T: Task>(&self, task: T) {
        self.inner.register([Arc::new(task) as Arc<dyn Task>]);
    }

    /// The token handed to registered tasks.
    pub fn token(&self) -> CancellationToken {
        self.inner.token.clone()
    }

    /// Upper bound on the wait after cancellation.
    pub fn drain_timeout(&self) -> Duration {
        self.drain_timeout
    }

    /// Block until the parent is cancelled or `source` fires, cancel every
    /// task and wait at most the drain timeout for them to return.
    ///
    /// The result is the same whether the drain completed or timed out; use
    /// [`Graceful::wait_with_report`] to tell the two apart.
    pub async fn wait<S: TerminationSource>(self, source: S) -> Result<(), JoinedError> {
        self.wait_with_report(source).await.errors
    }

    /// Like [`Graceful::wait`], but also reports what triggered the shutdown
    /// and whether the drain finished in time.
    pub async fn wait_with_report<S: TerminationSource>(self, source: S) -> ShutdownReport {
        let signal = source.subscribe();

        let trigger = tokio::select! {
            _ = self.parent.cancelled() => Trigger::Parent,
            signal = signal => Trigger::Signal(signal),
        };

        match trigger {
            Trigger::Parent => tracing::info!("Parent scope ended, shutting down"),
            Trigger::Signal(signal) => tracing::info!(signal = %signal, "Shutdown signal received"),
        }

        self.inner.phase.send_replace(Phase::ShuttingDown);
        self.inner.token.cancel();
        let started = Instant::now();

        tracing::debug!(
            outstanding = *self.inner.outstanding.borrow(),
            drain_timeout = ?self.drain_timeout,
            "Cancellation issued, draining tasks"
        );

        let mut outstanding = self.inner.outstanding.subscribe();
        let drained = tokio::time::timeout(self.drain_timeout, async move {
            // The sender lives in `inner`, so the channel cannot close here.
            let _ = outstanding.wait_for(|n| *n == 0).await;
        })
        .await;

        let outcome = match drained {
            Ok(()) => Outcome::Drained,
            Err(_) => Outcome::TimedOut {
                outstanding: *self.inner.outstanding.borrow(),
            },
        };
        let drain_duration = started.elapsed();

        match outcome {
            Outcome::Drained => {
                self.inner.phase.send_replace(Phase::Drained);
                tracing::info!(duration = ?drain_duration, "All tasks drained");
            }
            Outcome::TimedOut { outstanding } => {
                self.inner.phase.send_replace(Phase::TimedOut);
                tracing::warn!(
                    outstanding,
                    drain_timeout = ?self.drain_timeout,
                    "Drain timeout elapsed, abandoning remaining tasks"
                );
            }
        }
        metrics::record_shutdown(&outcome, drain_duration);

        ShutdownReport {
            trigger,
            outcome,
            drain_duration,
            errors: self.inner.errors.materialize(),
        }
    }
}

/// Cloneable registration handle for a [`Graceful`].
#[derive(Clone)]
pub struct Registrar {
    inner: Arc<Inner>,
}

impl Registrar {
    /// Start every task under the orchestrator's token.
    ///
    /// # Panics
    ///
    /// Must be called from within a Tokio runtime; each task is spawned.
    pub fn register<I>(&self, tasks: I)
    where
        I: IntoIterator<Item = Arc<dyn Task>>,
    {
        self.inner.register(tasks);
    }

    /// Start a single task. Same runtime requirement as [`Registrar::register`].
    pub fn register_task<T: Task>(&self, task: T) {
        self.inner.register([Arc::new(task) as Arc<dyn Task>]);
    }

    /// The token handed to registered tasks.
    pub fn token(&self) -> CancellationToken {
        self.inner.token.clone()
    }

    /// Current phase.
    pub fn phase(&self) -> Phase {
        *self.inner.phase.borrow()
    }

    /// Receiver for phase transitions.
    pub fn watch_phase(&self) -> watch::Receiver<Phase> {
        self.inner.phase.subscribe()
    }

    /// Number of tasks started and not yet returned.
    pub fn outstanding(&self) -> usize {
        *self.inner.outstanding.borrow()
    }
}

impl Inner {
    fn register<I>(self: &Arc<Self>, tasks: I)
    where
        I: IntoIterator<Item = Arc<dyn Task>>,
    {
        for task in tasks {
            // Counted before the spawn so a drain can never see zero early.
            let guard = self.track();
            let token = self.token.clone();
            let errors = self.errors.clone();

            tokio::spawn(async move {
                let _guard = guard;
                match AssertUnwindSafe(task.run(token)).catch_unwind().await {
                    Ok(Ok(())) => {}
                    Ok(Err(e)) => {
                        tracing::warn!(error = %e, "Task returned an error");
                        metrics::record_task_failure();
                        errors.add(e);
                    }
                    Err(panic) => {
                        let message = panic_message(panic.as_ref());
                        tracing::error!(panic = %message, "Task panicked");
                        metrics::record_task_failure();
                        errors.add(Box::new(TaskError::Panicked(message)));
                    }
                }
            });
        }
    }

    fn track(self: &Arc<Self>) -> TaskGuard {
        self.outstanding.send_modify(|n| *n += 1);
        metrics::record_task_started(*self.outstanding.borrow());
        TaskGuard {
            inner: Arc::clone(self),
        }
    }
}

/// Marks one task outstanding until dropped.
struct TaskGuard {
    inner: Arc<Inner>,
}

impl Drop for TaskGuard {
    fn drop(&mut self) {
        self.inner.outstanding.send_modify(|n| *n = n.saturating_sub(1));
        metrics::record_outstanding(*self.inner.outstanding.borrow());
    }
}

fn panic_message(panic: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic payload".to_string()
    }
}
