//! Graceful shutdown orchestration for long-running Tokio tasks.
//!
//! [`Graceful`] runs a set of [`Task`]s under one cancellation token, waits
//! for a termination signal or for its parent token to end, cancels the
//! tasks and gives them a bounded time to return. The `http` and `security`
//! modules provide server and client tasks with their request transforms.

pub mod config;
pub mod http;
pub mod lifecycle;
pub mod observability;
pub mod security;

pub use config::GracefulConfig;
pub use lifecycle::{Graceful, JoinedError, Signal, Signals, Task, TaskFailure};
