//! Polling client task.

use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Request, StatusCode, Uri};
use tokio::sync::mpsc;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tower::ServiceExt;

use crate::config::{ClientConfig, SecurityConfig};
use crate::http::client::{build_client, ClientError, OutboundClient};
use crate::lifecycle::{Task, TaskFailure};

/// Sends `GET target` on an interval and reports each status observed.
///
/// Delivery waits for room in the status channel, so a slow reader slows the
/// polling down instead of losing statuses. The wait ends on shutdown. The
/// status channel is closed when the task stops.
pub struct Poller {
    target: Uri,
    interval: Duration,
    state: Mutex<Option<PollerState>>,
}

struct PollerState {
    client: OutboundClient,
    statuses: mpsc::Sender<StatusCode>,
}

impl Poller {
    pub fn new(
        client: OutboundClient,
        target: Uri,
        interval: Duration,
        statuses: mpsc::Sender<StatusCode>,
    ) -> Self {
        Self {
            target,
            interval,
            state: Mutex::new(Some(PollerState { client, statuses })),
        }
    }

    pub fn from_config(
        config: &ClientConfig,
        security: &SecurityConfig,
        statuses: mpsc::Sender<StatusCode>,
    ) -> Result<Self, ClientError> {
        let client = build_client(config, security)?;
        let target: Uri = config.target.parse()?;
        Ok(Self::new(client, target, config.poll_interval(), statuses))
    }
}

#[async_trait]
impl Task for Poller {
    async fn run(&self, shutdown: CancellationToken) -> Result<(), TaskFailure> {
        let PollerState { client, statuses } = self
            .state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
            .ok_or(ClientError::AlreadyRan)?;

        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        tracing::info!(target = %self.target, interval = ?self.interval, "Client started");

        loop {
            tokio::select! {
                biased;
                _ = shutdown.cancelled() => break,
                _ = ticker.tick() => {}
            }

            let request = Request::get(self.target.clone())
                .body(Body::empty())
                .map_err(ClientError::from)?;

            let result = tokio::select! {
                biased;
                _ = shutdown.cancelled() => break,
                result = client.clone().oneshot(request) => result,
            };

            match result {
                Ok(response) => {
                    let status = response.status();
                    tracing::debug!(status = %status, "Poll completed");
                    tokio::select! {
                        biased;
                        _ = shutdown.cancelled() => break,
                        sent = statuses.send(status) => {
                            if sent.is_err() {
                                tracing::debug!(status = %status, "Status reader gone");
                            }
                        }
                    }
                }
                Err(e) => tracing::warn!(target = %self.target, error = %e, "Poll failed"),
            }
        }

        tracing::info!("Client exited");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU16, Ordering};
    use std::sync::Arc;

    use axum::http::Response;
    use tower::util::BoxCloneService;
    use tower::{service_fn, BoxError};

    fn fixed(status: StatusCode) -> OutboundClient {
        BoxCloneService::new(service_fn(move |_request: Request<Body>| async move {
            Ok::<_, BoxError>(Response::builder().status(status).body(Body::empty()).unwrap())
        }))
    }

    #[tokio::test]
    async fn reports_statuses_until_cancelled() {
        let (tx, mut rx) = mpsc::channel(16);
        let poller = Poller::new(
            fixed(StatusCode::ACCEPTED),
            "http://upstream/".parse().unwrap(),
            Duration::from_millis(10),
            tx,
        );

        let token = CancellationToken::new();
        let run = tokio::spawn({
            let token = token.clone();
            async move { poller.run(token).await.map_err(|e| e.to_string()) }
        });

        assert_eq!(rx.recv().await, Some(StatusCode::ACCEPTED));
        token.cancel();
        assert_eq!(run.await.unwrap(), Ok(()));

        // Sender dropped on exit.
        while rx.recv().await.is_some() {}
    }

    fn counting() -> OutboundClient {
        let next = Arc::new(AtomicU16::new(200));
        BoxCloneService::new(service_fn(move |_request: Request<Body>| {
            let code = next.fetch_add(1, Ordering::SeqCst);
            async move {
                let status = StatusCode::from_u16(code)?;
                Ok::<_, BoxError>(Response::builder().status(status).body(Body::empty())?)
            }
        }))
    }

    #[tokio::test]
    async fn slow_reader_loses_no_statuses() {
        let (tx, mut rx) = mpsc::channel(1);
        let poller = Poller::new(
            counting(),
            "http://upstream/".parse().unwrap(),
            Duration::from_millis(5),
            tx,
        );

        let token = CancellationToken::new();
        let run = tokio::spawn({
            let token = token.clone();
            async move { poller.run(token).await.map_err(|e| e.to_string()) }
        });

        // Many ticks pass while the one-slot channel is full.
        tokio::time::sleep(Duration::from_millis(100)).await;
        for expected in 200..204u16 {
            assert_eq!(rx.recv().await.map(|s| s.as_u16()), Some(expected));
        }

        token.cancel();
        assert_eq!(run.await.unwrap(), Ok(()));
    }

    #[tokio::test]
    async fn full_channel_does_not_block_shutdown() {
        let (tx, _rx) = mpsc::channel(1);
        let poller = Poller::new(
            fixed(StatusCode::OK),
            "http://upstream/".parse().unwrap(),
            Duration::from_millis(5),
            tx,
        );

        let token = CancellationToken::new();
        let run = tokio::spawn({
            let token = token.clone();
            async move { poller.run(token).await.map_err(|e| e.to_string()) }
        });

        tokio::time::sleep(Duration::from_millis(50)).await;
        token.cancel();
        let result = tokio::time::timeout(Duration::from_secs(1), run).await;
        assert_eq!(result.unwrap().unwrap(), Ok(()));
    }

    #[tokio::test]
    async fn runs_only_once() {
        let (tx, _rx) = mpsc::channel(1);
        let poller = Poller::new(
            fixed(StatusCode::OK),
            "http://upstream/".parse().unwrap(),
            Duration::from_millis(10),
            tx,
        );

        let token = CancellationToken::new();
        token.cancel();
        assert!(poller.run(token.clone()).await.is_ok());

        let err = poller.run(token).await.unwrap_err();
        assert_eq!(err.to_string(), "poller has already run");
    }

    #[tokio::test]
    async fn invalid_target_is_rejected() {
        let (tx, _rx) = mpsc::channel(1);
        let config = ClientConfig {
            target: "http://bad uri".into(),
            ..ClientConfig::default()
        };
        let err = Poller::from_config(&config, &SecurityConfig::default(), tx).err().unwrap();
        assert!(matches!(err, ClientError::InvalidTarget(_)));
    }
}
