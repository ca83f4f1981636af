use std::fmt;

use thiserror::Error;

use crate::status::StatusCode;

/// Result type for credential operations.
pub type CredentialResult<T> = Result<T, CredentialError>;

/// Error outputs from the credential shim.
///
/// These are the only failures `set`, `get` and `delete` surface, whichever
/// convention is used to talk to the backing store.
#[derive(Error, Clone, PartialEq, Eq)]
pub enum CredentialError {
    /// The lookup found no credential for the service and user.
    #[error("credential_not_found")]
    NotFound,
    /// The store returned the credential but its bytes are not UTF-8.
    #[error("not_string: {len} bytes are not valid UTF-8", len = .0.len())]
    NotString(Vec<u8>),
    /// The backing store reported a failure status.
    #[error("storage_failure: {0}")]
    StorageFailure(StatusCode),
}

impl fmt::Debug for CredentialError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotFound => f.write_str("NotFound"),
            // the payload is secret material, only its size is printed
            Self::NotString(bytes) => f
                .debug_struct("NotString")
                .field("len", &bytes.len())
                .finish_non_exhaustive(),
            Self::StorageFailure(code) => f.debug_tuple("StorageFailure").field(code).finish(),
        }
    }
}

/// Which shim operation produced a status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display)]
#[strum(serialize_all = "lowercase")]
pub enum Operation {
    /// `set` / `set_bytes`.
    Set,
    /// `get` / `get_bytes`.
    Get,
    /// `delete`.
    Delete,
}

impl CredentialError {
    /// Maps a failed backing-store status into the shim taxonomy.
    ///
    /// Item-not-found is only a lookup miss for `get`; for `delete` it is a
    /// reportable storage failure. Buffer-too-small on retrieval is reported
    /// as data-too-large so the outcome does not depend on the convention.
    /// A named status wrapped in [`StatusCode::Other`] is classified by its
    /// raw value.
    #[must_use]
    pub const fn from_status(operation: Operation, status: StatusCode) -> Self {
        match (operation, StatusCode::from_raw(status.raw())) {
            (Operation::Get, StatusCode::ItemNotFound) => Self::NotFound,
            (Operation::Get, StatusCode::BufferTooSmall) => {
                Self::StorageFailure(StatusCode::DataTooLarge)
            }
            // an error path never carries success
            (_, StatusCode::Success) => Self::StorageFailure(StatusCode::internal()),
            (_, status) => Self::StorageFailure(status),
        }
    }

    /// Returns the backing-store status for storage failures.
    #[must_use]
    pub const fn status(&self) -> Option<StatusCode> {
        match self {
            Self::StorageFailure(status) => Some(*status),
            Self::NotFound | Self::NotString(_) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::status::{ERR_SEC_ITEM_NOT_FOUND, ERR_SEC_SUCCESS};

    #[test]
    fn test_get_not_found_is_lookup_miss() {
        let err = CredentialError::from_status(Operation::Get, StatusCode::ItemNotFound);
        assert_eq!(err, CredentialError::NotFound);
    }

    #[test]
    fn test_delete_not_found_is_storage_failure() {
        let err = CredentialError::from_status(Operation::Delete, StatusCode::ItemNotFound);
        assert_eq!(err, CredentialError::StorageFailure(StatusCode::ItemNotFound));
    }

    #[test]
    fn test_buffer_too_small_remapped_on_get() {
        let err = CredentialError::from_status(Operation::Get, StatusCode::BufferTooSmall);
        assert_eq!(err, CredentialError::StorageFailure(StatusCode::DataTooLarge));
    }

    #[test]
    fn test_other_status_kept() {
        let err = CredentialError::from_status(Operation::Set, StatusCode::Other(-34018));
        assert_eq!(err.status(), Some(StatusCode::Other(-34018)));
    }

    #[test]
    fn test_success_is_never_a_failure_code() {
        for status in [StatusCode::Success, StatusCode::Other(ERR_SEC_SUCCESS)] {
            let err = CredentialError::from_status(Operation::Delete, status);
            assert_eq!(err, CredentialError::StorageFailure(StatusCode::internal()));
            assert_ne!(err.status().map(StatusCode::raw), Some(ERR_SEC_SUCCESS));
        }
    }

    #[test]
    fn test_unnormalized_status_is_classified() {
        let err =
            CredentialError::from_status(Operation::Get, StatusCode::Other(ERR_SEC_ITEM_NOT_FOUND));
        assert_eq!(err, CredentialError::NotFound);
    }

    #[test]
    fn test_not_string_redacts_bytes() {
        let err = CredentialError::NotString(vec![0xff, 0xfe, 0x41]);
        assert_eq!(format!("{err}"), "not_string: 3 bytes are not valid UTF-8");
        let debug = format!("{err:?}");
        assert!(debug.contains("len: 3"));
        assert!(!debug.contains("255"));
    }
}
