//! The unit of work the shutdown orchestrator runs.

use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

/// Error a task may report when it stops.
pub type TaskFailure = Box<dyn std::error::Error + Send + Sync>;

/// A long-lived unit of work driven by a cancellation token.
///
/// `run` is started once per registration and should return soon after
/// `shutdown` is cancelled. A task that never returns is abandoned once the
/// drain timeout elapses.
#[async_trait]
pub trait Task: Send + Sync + 'static {
    async fn run(&self, shutdown: CancellationToken) -> Result<(), TaskFailure>;
}

#[async_trait]
impl<T: Task + ?Sized> Task for Arc<T> {
    async fn run(&self, shutdown: CancellationToken) -> Result<(), TaskFailure> {
        (**self).run(shutdown).await
    }
}

/// Task backed by a closure.
pub struct FnTask<F>(F);

/// Wrap a closure as a [`Task`].
///
/// ```no_run
/// use graceful::lifecycle::task_fn;
///
/// let task = task_fn(|shutdown| async move {
///     shutdown.cancelled().await;
///     Ok::<(), graceful::TaskFailure>(())
/// });
/// ```
pub fn task_fn<F, Fut>(f: F) -> FnTask<F>
where
    F: Fn(CancellationToken) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<(), TaskFailure>> + Send + 'static,
{
    FnTask(f)
}

#[async_trait]
impl<F, Fut> Task for FnTask<F>
where
    F: Fn(CancellationToken) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<(), TaskFailure>> + Send + 'static,
{
    async fn run(&self, shutdown: CancellationToken) -> Result<(), TaskFailure> {
        (self.0)(shutdown).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn fn_task_observes_token() {
        let task = task_fn(|shutdown| async move {
            shutdown.cancelled().await;
            Err::<(), TaskFailure>("stopped".into())
        });

        let token = CancellationToken::new();
        token.cancel();
        let err = task.run(token).await.unwrap_err();
        assert_eq!(err.to_string(), "stopped");
    }

    #[tokio::test]
    async fn arc_task_delegates() {
        let task: Arc<dyn Task> = Arc::new(task_fn(|_| async { Ok::<(), TaskFailure>(()) }));
        assert!(task.run(CancellationToken::new()).await.is_ok());
    }
}
