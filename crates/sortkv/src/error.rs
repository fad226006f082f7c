//! Error taxonomy for the client binding.

use sortkv_engine::{sortkv_errormsg, SortKvStatus};
use std::ffi::CStr;
use thiserror::Error;

/// Result type for binding operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors surfaced by the binding.
///
/// Recoverable, local conditions (a missing key, a count of zero, an
/// empty range) are ordinary return values, never errors. Everything
/// here is either a caller mistake or a hard engine failure; the
/// binding never retries.
#[derive(Debug, Error)]
pub enum Error {
    /// Allocating a native engine object returned null.
    #[error("allocating a native engine object failed")]
    Alloc,

    /// A configuration document was malformed or carried a mistyped
    /// recognized option.
    #[error("creating a config from JSON failed: {0}")]
    ConfigParse(String),

    /// Opening an engine failed. Carries the engine-supplied message
    /// when one was delivered, otherwise a generic fallback.
    #[error("{0}")]
    Open(String),

    /// The engine rejected an argument (an option name/type
    /// combination, or a malformed key).
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// The engine does not support the requested operation.
    #[error("operation not supported by this engine")]
    NotSupported,

    /// A lookup reported a hard failure, distinct from "not found".
    #[error("engine get failed")]
    Get,

    /// A write reported a hard failure (for example, out of space).
    #[error("engine put failed")]
    Put,

    /// A removal reported a hard failure, distinct from "not found".
    #[error("engine remove failed")]
    Remove,

    /// A counted or iterating range query reported a hard failure.
    #[error("engine iteration failed")]
    Iteration,

    /// The operation was attempted on a stopped handle. Detected
    /// locally; nothing reaches the native layer.
    #[error("engine is stopped")]
    Closed,

    /// Fixed-capacity marshaling only: the value does not fit the
    /// scratch buffer. The binding never truncates.
    #[error("value of {needed} bytes exceeds buffer capacity {capacity}")]
    CapacityExceeded {
        /// Bytes the value actually occupies.
        needed: usize,
        /// Capacity of the scratch buffer.
        capacity: usize,
    },
}

/// Drains the engine's thread-local error message, if one is set.
pub(crate) fn engine_message() -> Option<String> {
    let ptr = sortkv_errormsg();
    if ptr.is_null() {
        return None;
    }
    // Valid until the next engine call on this thread; copied immediately.
    let msg = unsafe { CStr::from_ptr(ptr) };
    Some(msg.to_string_lossy().into_owned())
}

/// Maps a non-OK engine status onto the taxonomy, using `failed` for
/// the operation-specific hard-failure kind.
pub(crate) fn op_error(status: SortKvStatus, failed: Error) -> Error {
    match status {
        SortKvStatus::NotSupported => Error::NotSupported,
        SortKvStatus::InvalidArgument => Error::InvalidArgument(
            engine_message().unwrap_or_else(|| "invalid argument".to_string()),
        ),
        _ => failed,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_strings() {
        assert_eq!(Error::Closed.to_string(), "engine is stopped");
        assert_eq!(
            Error::Open("unknown engine name: x".to_string()).to_string(),
            "unknown engine name: x"
        );
        assert_eq!(
            Error::CapacityExceeded {
                needed: 100,
                capacity: 16
            }
            .to_string(),
            "value of 100 bytes exceeds buffer capacity 16"
        );
    }

    #[test]
    fn status_mapping() {
        assert!(matches!(
            op_error(SortKvStatus::Failed, Error::Put),
            Error::Put
        ));
        assert!(matches!(
            op_error(SortKvStatus::NotSupported, Error::Put),
            Error::NotSupported
        ));
        assert!(matches!(
            op_error(SortKvStatus::InvalidArgument, Error::Get),
            Error::InvalidArgument(_)
        ));
    }
}
