//! HTTP subsystem.
//!
//! # Data Flow
//! ```text
//! Inbound:
//!     TCP connection
//!     → server.rs (Axum setup, graceful stop on cancellation)
//!     → middleware/ (access log, content type, signature, body replay)
//!     → handler
//!
//! Outbound:
//!     client/poller.rs (periodic GET)
//!     → client/ (log, timeout, gzip, sign)
//!     → upstream
//! ```

pub mod body;
pub mod client;
pub mod middleware;
pub mod server;

pub use client::{build_client, ClientError, OutboundClient, Poller};
pub use server::{HttpServer, ServerError};
