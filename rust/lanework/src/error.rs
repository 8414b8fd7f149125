//! The terminal error of a lane execution.

use thiserror::Error;

/// The single error surfaced by an execution.
///
/// Processing callbacks return `Result<(), Error<E>>`, where `E` is the
/// caller's own failure type. Thanks to the blanket `From<E>` conversion a
/// callback can use `?` directly on its own fallible calls.
///
/// Exactly one `Error` is returned per failed execution: whichever lane
/// claims the first-error slot first. Errors produced by other lanes after
/// that point are discarded.
#[derive(Debug, Error)]
pub enum Error<E> {
    /// The execution was asked to stop before every item was processed,
    /// either through a [`CancellationToken`](crate::CancellationToken), an
    /// expired deadline, or a callback reporting cancellation itself.
    #[error("execution cancelled")]
    Cancelled,

    /// A processing callback reported a failure.
    #[error("item processing failed: {0}")]
    Failed(#[source] E),

    /// A processing callback panicked on the given lane.
    #[error("lane {lane} panicked: {message}")]
    Panicked { lane: usize, message: String },
}

impl<E> Error<E> {
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Error::Cancelled)
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, Error::Failed(_))
    }

    /// Returns the underlying cause of a [`Error::Failed`].
    pub fn cause(&self) -> Option<&E> {
        match self {
            Error::Failed(cause) => Some(cause),
            _ => None,
        }
    }

    pub fn into_cause(self) -> Option<E> {
        match self {
            Error::Failed(cause) => Some(cause),
            _ => None,
        }
    }

    pub(crate) fn label(&self) -> &'static str {
        match self {
            Error::Cancelled => "cancellation",
            Error::Failed(_) => "failure",
            Error::Panicked { .. } => "panic",
        }
    }

    /// Maps the failure cause, leaving `Cancelled` and `Panicked` intact.
    pub fn map_cause<U>(self, f: impl FnOnce(E) -> U) -> Error<U> {
        match self {
            Error::Cancelled => Error::Cancelled,
            Error::Failed(cause) => Error::Failed(f(cause)),
            Error::Panicked { lane, message } => Error::Panicked { lane, message },
        }
    }
}

impl<E> From<E> for Error<E> {
    fn from(cause: E) -> Self {
        Error::Failed(cause)
    }
}
