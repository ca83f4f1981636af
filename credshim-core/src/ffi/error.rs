//! Error type exported to Swift and Kotlin.

use crate::error::CredentialError as CoreError;
use crate::status::OsStatus;

/// Failure of a credential operation, as seen by foreign callers.
#[derive(Debug, Clone, PartialEq, Eq, uniffi::Error, thiserror::Error)]
pub enum CredentialError {
    /// No credential exists for the service and user.
    #[error("credential_not_found")]
    NotFound,

    /// The credential exists but is not valid UTF-8.
    #[error("not_string: {} bytes", bytes.len())]
    NotString {
        /// The stored bytes, exactly as the backing store returned them.
        bytes: Vec<u8>,
    },

    /// The backing store failed.
    #[error("storage_failure: {code}")]
    StorageFailure {
        /// Raw status reported by the store.
        code: OsStatus,
    },
}

impl From<CoreError> for CredentialError {
    fn from(error: CoreError) -> Self {
        match error {
            CoreError::NotFound => Self::NotFound,
            CoreError::NotString(bytes) => Self::NotString { bytes },
            CoreError::StorageFailure(status) => Self::StorageFailure { code: status.raw() },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::status::{StatusCode, ERR_SEC_DATA_TOO_LARGE};

    #[test]
    fn test_storage_failure_carries_raw_code() {
        let err = CredentialError::from(CoreError::StorageFailure(StatusCode::DataTooLarge));
        assert_eq!(err, CredentialError::StorageFailure { code: ERR_SEC_DATA_TOO_LARGE });
        assert_eq!(err.to_string(), "storage_failure: -25302");
    }

    #[test]
    fn test_not_string_keeps_bytes() {
        let err = CredentialError::from(CoreError::NotString(vec![0xc3, 0x28]));
        assert_eq!(err, CredentialError::NotString { bytes: vec![0xc3, 0x28] });
        assert_eq!(err.to_string(), "not_string: 2 bytes");
    }
}
