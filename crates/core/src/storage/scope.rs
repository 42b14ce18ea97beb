//! Deadline and cancellation for a single repository call.

use std::future::Future;
use std::time::Duration;

use tokio::sync::broadcast::{self, error::RecvError};

use super::{RepositoryError, Result};

/// Bounds one repository call by a deadline and an optional shutdown signal.
///
/// Dropping the future returned by [`CallScope::run`] drops the inner call.
/// That stops the caller from waiting, but work a backend has already handed
/// to its own thread (a queued SQLite statement) still runs to completion.
#[derive(Debug)]
pub struct CallScope {
    deadline: Duration,
    shutdown: Option<broadcast::Receiver<()>>,
}

impl CallScope {
    /// Creates a scope with only a deadline.
    pub fn new(deadline: Duration) -> Self {
        Self {
            deadline,
            shutdown: None,
        }
    }

    /// Cancels the call when a value is broadcast on `shutdown`.
    pub fn with_shutdown(mut self, shutdown: broadcast::Receiver<()>) -> Self {
        self.shutdown = Some(shutdown);
        self
    }

    /// Runs `call` to completion, or fails with `Timeout` / `Cancelled`.
    pub async fn run<T, F>(mut self, call: F) -> Result<T>
    where
        F: Future<Output = Result<T>>,
    {
        let deadline = self.deadline;
        let cancelled = async {
            match self.shutdown.as_mut() {
                // A closed channel can never fire; only an explicit send cancels.
                Some(rx) => match rx.recv().await {
                    Err(RecvError::Closed) => std::future::pending::<()>().await,
                    Ok(()) | Err(RecvError::Lagged(_)) => {}
                },
                None => std::future::pending::<()>().await,
            }
        };

        tokio::select! {
            result = tokio::time::timeout(deadline, call) => {
                result.map_err(|_| RepositoryError::Timeout(deadline))?
            }
            () = cancelled => Err(RepositoryError::Cancelled),
        }
    }
}
