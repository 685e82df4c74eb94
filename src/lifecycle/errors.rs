//! Error aggregation for registered tasks.
//!
//! Every task's failure is joined into one value; nothing is overwritten and
//! arrival order carries no meaning.

use std::fmt;
use std::sync::{Arc, Mutex, PoisonError};

use thiserror::Error;

use crate::lifecycle::task::TaskFailure;

/// Failures the orchestrator itself attributes to a task.
#[derive(Debug, Error)]
pub enum TaskError {
    /// The task panicked instead of returning.
    #[error("task panicked: {0}")]
    Panicked(String),
}

/// Thread-safe accumulator shared by every task's completion handler.
#[derive(Clone, Default)]
pub struct ErrorSet {
    inner: Arc<Mutex<Vec<TaskFailure>>>,
}

impl ErrorSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Join another failure into the set.
    pub fn add(&self, err: TaskFailure) {
        self.inner
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(err);
    }

    pub fn len(&self) -> usize {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Take everything collected so far.
    ///
    /// Returns `Ok(())` when no task failed. Failures added after this call
    /// are kept for the next one.
    pub fn materialize(&self) -> Result<(), JoinedError> {
        let errors = std::mem::take(&mut *self.inner.lock().unwrap_or_else(PoisonError::into_inner));
        if errors.is_empty() {
            Ok(())
        } else {
            Err(JoinedError { errors })
        }
    }
}

impl fmt::Debug for ErrorSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ErrorSet").field("len", &self.len()).finish()
    }
}

/// The combined failures of every task that reported one.
///
/// Displays like a newline-separated join of its members.
#[derive(Debug)]
pub struct JoinedError {
    errors: Vec<TaskFailure>,
}

impl JoinedError {
    pub fn len(&self) -> usize {
        self.errors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &(dyn std::error::Error + Send + Sync + 'static)> {
        self.errors.iter().map(|e| &**e as &(dyn std::error::Error + Send + Sync + 'static))
    }

    pub fn into_inner(self) -> Vec<TaskFailure> {
        self.errors
    }
}

impl fmt::Display for JoinedError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, err) in self.errors.iter().enumerate() {
            if i > 0 {
                writeln!(f)?;
            }
            write!(f, "{}", err)?;
        }
        Ok(())
    }
}

impl std::error::Error for JoinedError {}

impl<'a> IntoIterator for &'a JoinedError {
    type Item = &'a TaskFailure;
    type IntoIter = std::slice::Iter<'a, TaskFailure>;

    fn into_iter(self) -> Self::IntoIter {
        self.errors.iter()
    }
}
