//! Central error types for DeskPeek.
//!
//! Nothing in the hover pipeline surfaces these to the interaction thread:
//! public entry points log the reason and degrade to "no data this cycle".
//! Internal helpers return `DeskPeekResult` so the reason is never lost.

use serde::Serialize;
use thiserror::Error;

/// Main error type for DeskPeek operations.
#[derive(Error, Debug)]
pub enum DeskPeekError {
    /// The shell window hierarchy did not contain the desktop list-control
    #[error("Desktop list control not found: {0}")]
    ListControlNotFound(String),

    /// The list-control exists but reports no items
    #[error("Desktop list control reports no items")]
    EmptyListControl,

    /// The shell process could not be opened with VM access rights
    #[error("Cannot open process {pid} for memory access")]
    ProcessAccessDenied { pid: u32 },

    /// Every item failed to resolve to a filesystem path
    #[error("No desktop items matched a filesystem path ({count} reported)")]
    NoItemsMatched { count: usize },

    /// VirtualAllocEx (or equivalent) failed in the target process
    #[error("Remote allocation of {size} bytes failed")]
    RemoteAllocFailed { size: usize },

    /// Cross-process read or write failed
    #[error("Remote memory {op} failed at offset {offset} ({len} bytes)")]
    RemoteIo {
        op: &'static str,
        offset: usize,
        len: usize,
    },

    /// List-control query answered with zero / failure
    #[error("List control query {message:#x} failed for item {index}")]
    QueryFailed { message: u32, index: i32 },

    /// Hover event consumer went away
    #[error("Event channel closed")]
    ChannelClosed,

    /// Filesystem operation failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization failed
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Icon bitmap conversion failed
    #[error("Image error: {0}")]
    Image(String),

    /// Logger could not be installed
    #[error("Logging error: {0}")]
    Logging(String),

    /// Generic error with message
    #[error("{0}")]
    Other(String),
}

/// Serialized as the error message string so events and diagnostics can be
/// forwarded to a JSON consumer.
impl Serialize for DeskPeekError {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

impl From<log::SetLoggerError> for DeskPeekError {
    fn from(err: log::SetLoggerError) -> Self {
        DeskPeekError::Logging(err.to_string())
    }
}

impl From<String> for DeskPeekError {
    fn from(msg: String) -> Self {
        DeskPeekError::Other(msg)
    }
}

impl From<&str> for DeskPeekError {
    fn from(msg: &str) -> Self {
        DeskPeekError::Other(msg.to_string())
    }
}

/// Extension trait for adding context to Option types.
pub trait OptionExt<T> {
    /// Convert None to DeskPeekError::Other with the given message.
    fn context(self, msg: &str) -> DeskPeekResult<T>;

    /// Convert None to DeskPeekError::Other with a lazily evaluated message.
    fn with_context<F: FnOnce() -> String>(self, f: F) -> DeskPeekResult<T>;
}

impl<T> OptionExt<T> for Option<T> {
    fn context(self, msg: &str) -> DeskPeekResult<T> {
        self.ok_or_else(|| DeskPeekError::Other(msg.to_string()))
    }

    fn with_context<F: FnOnce() -> String>(self, f: F) -> DeskPeekResult<T> {
        self.ok_or_else(|| DeskPeekError::Other(f()))
    }
}

/// Type alias for Results using DeskPeekError.
pub type DeskPeekResult<T> = Result<T, DeskPeekError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = DeskPeekError::ProcessAccessDenied { pid: 4242 };
        assert_eq!(err.to_string(), "Cannot open process 4242 for memory access");
    }

    #[test]
    fn test_query_failed_formats_message_as_hex() {
        let err = DeskPeekError::QueryFailed {
            message: 0x100E,
            index: 3,
        };
        assert_eq!(err.to_string(), "List control query 0x100e failed for item 3");
    }

    #[test]
    fn test_error_serialization() {
        let err = DeskPeekError::EmptyListControl;
        let json = serde_json::to_string(&err).unwrap();
        assert!(json.contains("reports no items"));
    }

    #[test]
    fn test_from_io_error() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err: DeskPeekError = io_err.into();
        assert!(matches!(err, DeskPeekError::Io(_)));
    }

    #[test]
    fn test_from_string() {
        let err: DeskPeekError = "test error".into();
        assert!(matches!(err, DeskPeekError::Other(_)));
    }

    #[test]
    fn test_option_ext_context() {
        let opt: Option<i32> = None;
        let result = opt.context("value was missing");
        assert!(result
            .unwrap_err()
            .to_string()
            .contains("value was missing"));
    }

    #[test]
    fn test_option_ext_with_context() {
        let opt: Option<i32> = None;
        let result = opt.with_context(|| format!("missing value at index {}", 5));
        assert!(result
            .unwrap_err()
            .to_string()
            .contains("missing value at index 5"));
    }
}
