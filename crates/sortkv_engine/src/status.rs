//! Status codes returned across the C ABI.

/// Result code for the length-prefixed C ABI.
///
/// This is the closed set of codes the engine may return; bindings are
/// expected to normalize these into their own error taxonomy.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortKvStatus {
    /// Operation succeeded (for `exists`/`remove`: the record was present).
    Ok = 0,
    /// Hard engine failure, distinct from "not found".
    Failed = 1,
    /// The requested record does not exist.
    NotFound = 2,
    /// The engine does not support the requested operation.
    NotSupported = 3,
    /// An argument (pointer, option name/type combination) was rejected.
    InvalidArgument = 4,
    /// A configuration document could not be parsed.
    ConfigParsingError = 5,
}

impl SortKvStatus {
    /// Returns true if the status indicates success.
    pub fn is_ok(self) -> bool {
        self == SortKvStatus::Ok
    }

    /// Returns true if the status indicates any non-OK condition.
    pub fn is_err(self) -> bool {
        self != SortKvStatus::Ok
    }
}

impl From<SortKvStatus> for i32 {
    fn from(status: SortKvStatus) -> Self {
        status as i32
    }
}

impl From<i32> for SortKvStatus {
    fn from(code: i32) -> Self {
        match code {
            0 => SortKvStatus::Ok,
            2 => SortKvStatus::NotFound,
            3 => SortKvStatus::NotSupported,
            4 => SortKvStatus::InvalidArgument,
            5 => SortKvStatus::ConfigParsingError,
            _ => SortKvStatus::Failed,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_codes() {
        assert_eq!(SortKvStatus::Ok as i32, 0);
        assert_eq!(SortKvStatus::Failed as i32, 1);
        assert_eq!(SortKvStatus::NotFound as i32, 2);
        assert_eq!(SortKvStatus::ConfigParsingError as i32, 5);
        assert!(SortKvStatus::Ok.is_ok());
        assert!(SortKvStatus::NotFound.is_err());
    }

    #[test]
    fn code_conversion() {
        let code: i32 = SortKvStatus::NotFound.into();
        assert_eq!(code, 2);
        assert_eq!(SortKvStatus::from(code), SortKvStatus::NotFound);
        // Unknown codes collapse to Failed.
        assert_eq!(SortKvStatus::from(99), SortKvStatus::Failed);
    }
}
