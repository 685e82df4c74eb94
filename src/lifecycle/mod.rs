//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Register (shutdown.rs):
//!     Task → counter +1 → spawned with child token
//!
//! Wait (shutdown.rs):
//!     parent cancelled | signal (signals.rs) → cancel child token
//!     → drain outstanding tasks (bounded) → joined errors (errors.rs)
//! ```
//!
//! # Design Decisions
//! - Cancellation is a token passed to every task, never a global flag
//! - Task failures are collected, not propagated, until `wait` returns
//! - The drain has a timeout; tasks that ignore cancellation are abandoned

pub mod errors;
pub mod shutdown;
pub mod signals;
pub mod task;

pub use errors::{ErrorSet, JoinedError, TaskError};
pub use shutdown::{Graceful, Outcome, Phase, Registrar, ShutdownReport, Trigger};
pub use signals::{ManualTrigger, Never, Signal, Signals, TerminationSource, TriggerHandle};
pub use task::{task_fn, FnTask, Task, TaskFailure};
