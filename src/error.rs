//! Error types for dataref operations.
//!
//! Every contract violation a handle can detect has a [`DatarefError`]
//! variant. The `try_*` methods on the handles return them; the plain
//! methods hand them to [`trap`], which logs and aborts the calling code
//! path, because they indicate a bug in the plugin rather than a runtime
//! condition to recover from.
//!
//! A dataref that simply does not exist is not an error: it is reported by
//! [`FindDataref::found`](crate::FindDataref::found).

use thiserror::Error;

use crate::host::HostTypes;
use crate::kind::ValueKind;

/// Result type alias for dataref operations.
pub type Result<T> = std::result::Result<T, DatarefError>;

/// Contract violations detected by dataref handles.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DatarefError {
    /// Dataref names must not be empty
    #[error("Dataref name is empty")]
    EmptyName,

    /// Dataref names must not contain whitespace or NUL bytes
    #[error("Dataref name '{name}' can't contain whitespace or NUL bytes")]
    InvalidName { name: String },

    /// Value access on a handle whose lookup did not succeed
    #[error("Dataref '{name}' not valid (not found)")]
    NotFound { name: String },

    /// The host reported no type at all for an existing dataref
    #[error("Unknown dataref type for '{name}'")]
    UnknownType { name: String },

    /// Declared value type does not match what the host reports
    #[error("Data type mismatch for '{name}': expected {expected} but instead got: {actual}")]
    TypeMismatch {
        name: String,
        expected: ValueKind,
        actual: HostTypes,
    },

    /// Write attempted on a read-only dataref
    #[error("Dataref '{name}' not writable")]
    NotWritable { name: String },

    /// Array index past the current length
    #[error("Array index {index} is out of bounds for '{name}' (length {len})")]
    IndexOutOfBounds {
        name: String,
        index: usize,
        len: usize,
    },

    /// The host passed a negative offset to an accessor callback
    #[error("Negative offset {offset} passed to a dataref accessor")]
    NegativeOffset { offset: i32 },

    /// Array datarefs need at least one element
    #[error("Array dataref '{name}' needs a capacity greater than zero")]
    ZeroCapacity { name: String },

    /// More values than the fixed array capacity
    #[error("{len} values don't fit array dataref '{name}' (capacity {capacity})")]
    CapacityExceeded {
        name: String,
        len: usize,
        capacity: usize,
    },

    /// Division of a dataref value by zero
    #[error("Division by zero on dataref '{name}'")]
    DivisionByZero { name: String },

    /// The host refused to register an accessor
    #[error("Failed to register dataref '{name}'")]
    RegistrationFailed { name: String },

    /// Host accessed from a thread other than its owner
    #[error("Dataref API called from thread {actual}, owner is {owner}")]
    WrongThread { owner: String, actual: String },

    /// Log subscriber could not be installed
    #[error("Logging setup failed: {message}")]
    Logging { message: String },
}

impl DatarefError {
    /// Check if this is a "not found" error.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    /// Check if this error rejects a dataref name.
    pub fn is_invalid_name(&self) -> bool {
        matches!(self, Self::EmptyName | Self::InvalidName { .. })
    }

    /// Check if this is a type mismatch (including an unknown host type).
    pub fn is_type_error(&self) -> bool {
        matches!(self, Self::TypeMismatch { .. } | Self::UnknownType { .. })
    }
}

/// Abort on a contract violation.
///
/// The error is logged through `tracing` first so it lands in the host log
/// even when the panic message is lost.
#[cold]
#[track_caller]
#[allow(clippy::panic)]
pub fn trap(err: DatarefError) -> ! {
    tracing::error!(error = %err, "dataref contract violation");
    panic!("{}", err);
}

/// Unwrap a result, trapping on error.
#[track_caller]
pub(crate) fn check<T>(result: Result<T>) -> T {
    match result {
        Ok(value) => value,
        Err(err) => trap(err),
    }
}

/// Validate a dataref name: non-empty, no whitespace, no NUL bytes.
pub fn verify_name(name: &str) -> Result<()> {
    if name.is_empty() {
        return Err(DatarefError::EmptyName);
    }

    if name.chars().any(|c| c.is_whitespace() || c == '\0') {
        return Err(DatarefError::InvalidName {
            name: name.to_string(),
        });
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = DatarefError::IndexOutOfBounds {
            name: "sim/test".to_string(),
            index: 25,
            len: 25,
        };
        assert!(err.to_string().contains("25"));
        assert!(err.to_string().contains("sim/test"));

        let err = DatarefError::TypeMismatch {
            name: "sim/test".to_string(),
            expected: ValueKind::Int32,
            actual: HostTypes::FLOAT,
        };
        assert_eq!(
            err.to_string(),
            "Data type mismatch for 'sim/test': expected xplmType_Int but instead got: xplmType_Float"
        );
    }

    #[test]
    fn test_verify_name() {
        assert!(verify_name("sim/cockpit/radios/com1_freq_hz").is_ok());
        assert_eq!(verify_name(""), Err(DatarefError::EmptyName));
        assert!(verify_name("sim/with space").unwrap_err().is_invalid_name());
        assert!(verify_name("sim/with\ttab").unwrap_err().is_invalid_name());
        assert!(verify_name("sim/nul\0byte").unwrap_err().is_invalid_name());
    }

    #[test]
    fn test_error_predicates() {
        let not_found = DatarefError::NotFound {
            name: "a".to_string(),
        };
        assert!(not_found.is_not_found());
        assert!(!not_found.is_type_error());
        assert!(DatarefError::UnknownType {
            name: "a".to_string()
        }
        .is_type_error());
    }

    #[test]
    #[should_panic(expected = "not writable")]
    fn test_trap_panics_with_message() {
        trap(DatarefError::NotWritable {
            name: "sim/test".to_string(),
        });
    }
}
