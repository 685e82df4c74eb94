//! Shared utilities for integration tests.

use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use graceful::lifecycle::{task_fn, Task, TaskFailure};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;

/// Error with a recognizable name, for decomposing joined errors.
#[allow(dead_code)]
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
#[error("{0}")]
pub struct Named(pub String);

/// A task that waits for cancellation and then returns `Ok`.
#[allow(dead_code)]
pub fn stops_cleanly() -> Arc<dyn Task> {
    Arc::new(task_fn(|shutdown| async move {
        shutdown.cancelled().await;
        Ok::<(), TaskFailure>(())
    }))
}

/// A task that waits for cancellation and then fails with `name`.
#[allow(dead_code)]
pub fn fails_on_stop(name: &str) -> Arc<dyn Task> {
    let name = name.to_string();
    Arc::new(task_fn(move |shutdown| {
        let name = name.clone();
        async move {
            shutdown.cancelled().await;
            Err::<(), TaskFailure>(Box::new(Named(name)))
        }
    }))
}

/// A task that ignores cancellation and sleeps for `duration`.
#[allow(dead_code)]
pub fn ignores_cancel(duration: Duration) -> Arc<dyn Task> {
    Arc::new(task_fn(move |_shutdown| async move {
        tokio::time::sleep(duration).await;
        Ok::<(), TaskFailure>(())
    }))
}

/// A task that counts how often its cleanup ran.
#[allow(dead_code)]
pub fn counts_cleanup(cleanups: Arc<AtomicUsize>) -> Arc<dyn Task> {
    Arc::new(task_fn(move |shutdown| {
        let cleanups = cleanups.clone();
        async move {
            shutdown.cancelled().await;
            cleanups.fetch_add(1, Ordering::SeqCst);
            Ok::<(), TaskFailure>(())
        }
    }))
}

/// Start a backend that answers every request with `status` and `body`.
#[allow(dead_code)]
pub async fn start_status_backend(addr: SocketAddr, status: u16, body: &'static str) {
    let listener = TcpListener::bind(addr).await.unwrap();

    tokio::spawn(async move {
        loop {
            match listener.accept().await {
                Ok((mut socket, _)) => {
                    tokio::spawn(async move {
                        let mut buf = [0u8; 4096];
                        let _ = socket.read(&mut buf).await;

                        let status_text = match status {
                            200 => "200 OK",
                            404 => "404 Not Found",
                            500 => "500 Internal Server Error",
                            503 => "503 Service Unavailable",
                            _ => "200 OK",
                        };
                        let response = format!(
                            "HTTP/1.1 {}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                            status_text,
                            body.len(),
                            body
                        );
                        let _ = socket.write_all(response.as_bytes()).await;
                        let _ = socket.shutdown().await;
                    });
                }
                Err(_) => break,
            }
        }
    });
}
