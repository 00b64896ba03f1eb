//! Error types for the dispatcher.
//!
//! [`DispatchError`] covers everything the registry and the dispatcher can
//! report. [`ExecuteError`] is what a handler returns when it decides a call
//! failed; the dispatcher recovers it and never lets it escape `dispatch`.

use crate::modality::Modality;
use thiserror::Error;
use tracing::debug;

type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Main error type for the dispatcher.
#[derive(Debug, Error)]
pub enum DispatchError {
    // Resolution errors
    #[error("Action is not defined")]
    ActionNotDefined,

    #[error("Handler {key} is not loaded")]
    HandlerNotLoaded { key: String },

    #[error("Handler registry is shut down")]
    RegistryClosed,

    // Contract errors
    #[error("{operation} is not supported by {modality} handlers")]
    Unsupported {
        operation: &'static str,
        modality: Modality,
    },

    // Execution errors
    #[error(transparent)]
    Execute(#[from] ExecuteError),

    // Serialization errors
    #[error("JSON error: {message}")]
    Json {
        message: String,
        #[source]
        source: Option<serde_json::Error>,
    },
}

/// Result type alias for dispatcher operations.
pub type Result<T> = std::result::Result<T, DispatchError>;

impl From<serde_json::Error> for DispatchError {
    fn from(err: serde_json::Error) -> Self {
        DispatchError::Json {
            message: err.to_string(),
            source: Some(err),
        }
    }
}

impl DispatchError {
    /// Build the error a handler reports when called through the wrong
    /// entry point.
    pub fn unsupported(operation: &'static str, modality: Modality) -> Self {
        DispatchError::Unsupported {
            operation,
            modality,
        }
    }

    /// Check if this error means no handler could be found for a request.
    pub fn is_resolution(&self) -> bool {
        matches!(
            self,
            DispatchError::ActionNotDefined
                | DispatchError::HandlerNotLoaded { .. }
                | DispatchError::RegistryClosed
        )
    }

    /// Check if this error is a modality mismatch.
    pub fn is_unsupported(&self) -> bool {
        matches!(self, DispatchError::Unsupported { .. })
    }
}

/// Failure reported by a handler while executing a call.
///
/// Only the message is ever shown to clients. The cause, when kept, is
/// available to logs through [`std::error::Error::source`].
#[derive(Debug, Error)]
#[error("{message}")]
pub struct ExecuteError {
    message: String,
    #[source]
    source: Option<BoxError>,
}

impl ExecuteError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            source: None,
        }
    }

    /// Keep `cause` as the error source.
    pub fn with_cause(message: impl Into<String>, cause: impl Into<BoxError>) -> Self {
        Self {
            message: message.into(),
            source: Some(cause.into()),
        }
    }

    /// Log `cause` at debug level and drop it, keeping only `message`.
    pub fn logged(message: impl Into<String>, cause: &dyn std::error::Error) -> Self {
        let message = message.into();
        debug!("{}: {}", message, cause);
        Self::new(message)
    }

    /// Wrap a cause, using its own text as the message.
    pub fn from_cause(cause: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self {
            message: cause.to_string(),
            source: Some(Box::new(cause)),
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error as _;

    #[test]
    fn test_resolution_classification() {
        assert!(DispatchError::ActionNotDefined.is_resolution());
        assert!(DispatchError::HandlerNotLoaded {
            key: "core.Missing".into()
        }
        .is_resolution());
        assert!(DispatchError::RegistryClosed.is_resolution());
        assert!(!DispatchError::unsupported("process_raw", Modality::Text).is_resolution());
        assert!(!DispatchError::from(ExecuteError::new("boom")).is_resolution());
    }

    #[test]
    fn test_unsupported_message() {
        let err = DispatchError::unsupported("content_type", Modality::Raw);
        assert!(err.is_unsupported());
        assert_eq!(err.to_string(), "content_type is not supported by RAW handlers");
    }

    #[test]
    fn test_handler_not_loaded_message() {
        let err = DispatchError::HandlerNotLoaded {
            key: "core.Echo".into(),
        };
        assert_eq!(err.to_string(), "Handler core.Echo is not loaded");
    }

    #[test]
    fn test_execute_error_keeps_cause() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "missing file");
        let err = ExecuteError::with_cause("Could not read template", io);
        assert_eq!(err.message(), "Could not read template");
        assert_eq!(err.source().unwrap().to_string(), "missing file");
    }

    #[test]
    fn test_execute_error_logged_drops_cause() {
        let io = std::io::Error::new(std::io::ErrorKind::Other, "socket closed");
        let err = ExecuteError::logged("Upstream unavailable", &io);
        assert_eq!(err.to_string(), "Upstream unavailable");
        assert!(err.source().is_none());
    }

    #[test]
    fn test_execute_error_is_transparent_in_dispatch_error() {
        let err: DispatchError = ExecuteError::new("bad input").into();
        assert_eq!(err.to_string(), "bad input");
    }
}
