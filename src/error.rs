//! Central error types for the overlay engine.
//!
//! Configuration and payload errors are surfaced here but the engine turns
//! them into diagnostics instead of aborting a render tick. The only error a
//! caller should treat as fatal is a malformed shipped grouping document at
//! startup.

use serde::Serialize;
use thiserror::Error;

/// Main error type for overlay operations.
#[derive(Error, Debug)]
pub enum HudError {
    /// Filesystem access failed
    #[error("Storage error: {0}")]
    StorageError(#[from] std::io::Error),

    /// JSON serialization/deserialization failed
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    /// A grouping document could not be parsed or has the wrong shape
    #[error("Malformed grouping document {path}: {reason}")]
    MalformedDocument { path: String, reason: String },

    /// A write through the registration or configuration API was rejected
    #[error("Invalid registration: {0}")]
    InvalidRegistration(String),

    /// No user-override document is configured, so tool writes have nowhere to go
    #[error("No user-override grouping document is configured")]
    UserStoreUnavailable,

    /// Inbound payload message is unusable
    #[error("Malformed payload: {0}")]
    MalformedPayload(String),

    /// Vector payload with too few points to draw
    #[error("Vector payload {id} has {count} point(s); at least 2 are required")]
    InsufficientVectorPoints { id: String, count: usize },

    /// Clear referenced an id the registry does not hold
    #[error("Unknown payload id: {0}")]
    UnknownPayload(String),

    /// Render surface reported a size that cannot be scaled to
    #[error("Invalid surface size {width}x{height}")]
    InvalidSurface { width: f64, height: f64 },

    /// Generic error with message
    #[error("{0}")]
    Other(String),
}

/// Errors cross into the surrounding system as plain message strings.
impl Serialize for HudError {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

impl From<String> for HudError {
    fn from(msg: String) -> Self {
        HudError::Other(msg)
    }
}

impl From<&str> for HudError {
    fn from(msg: &str) -> Self {
        HudError::Other(msg.to_string())
    }
}

/// Extension trait for adding context to Results.
pub trait ResultExt<T> {
    /// Add context to an error, converting it to HudError::Other.
    fn context(self, msg: &str) -> HudResult<T>;

    /// Add context lazily (only evaluated on error).
    fn with_context<F: FnOnce() -> String>(self, f: F) -> HudResult<T>;
}

impl<T, E: std::fmt::Display> ResultExt<T> for Result<T, E> {
    fn context(self, msg: &str) -> HudResult<T> {
        self.map_err(|e| HudError::Other(format!("{}: {}", msg, e)))
    }

    fn with_context<F: FnOnce() -> String>(self, f: F) -> HudResult<T> {
        self.map_err(|e| HudError::Other(format!("{}: {}", f(), e)))
    }
}

/// Type alias for Results using HudError.
pub type HudResult<T> = Result<T, HudError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = HudError::InsufficientVectorPoints {
            id: "route-1".to_string(),
            count: 1,
        };
        assert_eq!(
            err.to_string(),
            "Vector payload route-1 has 1 point(s); at least 2 are required"
        );
    }

    #[test]
    fn test_error_serialization() {
        let err = HudError::UserStoreUnavailable;
        let json = serde_json::to_string(&err).unwrap();
        assert!(json.contains("user-override"));
    }

    #[test]
    fn test_from_io_error() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err: HudError = io_err.into();
        assert!(matches!(err, HudError::StorageError(_)));
    }

    #[test]
    fn test_from_string() {
        let err: HudError = "test error".into();
        assert!(matches!(err, HudError::Other(_)));
    }

    #[test]
    fn test_result_ext_with_context() {
        let result: Result<(), &str> = Err("inner");
        let with_context = result.with_context(|| format!("ctx-{}", 42));

        let msg = with_context.unwrap_err().to_string();
        assert!(msg.contains("ctx-42"));
        assert!(msg.contains("inner"));
    }

    #[test]
    fn test_result_ext_ok_passthrough() {
        let result: Result<i32, &str> = Ok(42);
        assert_eq!(result.context("should not appear").unwrap(), 42);
    }
}
