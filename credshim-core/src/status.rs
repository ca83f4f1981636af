//! Status codes reported by the secure-storage component.
//!
//! Every call across the storage boundary yields one raw [`OsStatus`]. The raw
//! value is classified here and nowhere else; the rest of the crate only sees
//! [`StatusCode`].

use std::fmt;

/// Raw status value as it crosses the C boundary.
pub type OsStatus = i32;

/// The call completed.
pub const ERR_SEC_SUCCESS: OsStatus = 0;
/// One or more parameters were invalid (empty or non-UTF-8 names).
pub const ERR_SEC_PARAM: OsStatus = -50;
/// The component could not allocate memory.
pub const ERR_SEC_ALLOCATE: OsStatus = -108;
/// A required pointer argument was null.
pub const ERR_SEC_BAD_REQ: OsStatus = -909;
/// The component reached a state its contract rules out.
pub const ERR_SEC_INTERNAL_COMPONENT: OsStatus = -2070;
/// No item exists for the requested service and user.
pub const ERR_SEC_ITEM_NOT_FOUND: OsStatus = -25300;
/// The caller supplied buffer cannot hold the item.
pub const ERR_SEC_BUFFER_TOO_SMALL: OsStatus = -25301;
/// The item is larger than the caller can accept.
pub const ERR_SEC_DATA_TOO_LARGE: OsStatus = -25302;

/// Classified backing-store status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StatusCode {
    /// The call completed.
    Success,
    /// No item exists for the key.
    ItemNotFound,
    /// The fixed output buffer was too small for the item.
    BufferTooSmall,
    /// The item exceeds the size the caller can handle.
    DataTooLarge,
    /// Any other platform status, kept verbatim for diagnostics.
    Other(OsStatus),
}

impl StatusCode {
    /// Classifies a raw status.
    #[must_use]
    pub const fn from_raw(raw: OsStatus) -> Self {
        match raw {
            ERR_SEC_SUCCESS => Self::Success,
            ERR_SEC_ITEM_NOT_FOUND => Self::ItemNotFound,
            ERR_SEC_BUFFER_TOO_SMALL => Self::BufferTooSmall,
            ERR_SEC_DATA_TOO_LARGE => Self::DataTooLarge,
            other => Self::Other(other),
        }
    }

    /// Returns the raw wire value.
    #[must_use]
    pub const fn raw(self) -> OsStatus {
        match self {
            Self::Success => ERR_SEC_SUCCESS,
            Self::ItemNotFound => ERR_SEC_ITEM_NOT_FOUND,
            Self::BufferTooSmall => ERR_SEC_BUFFER_TOO_SMALL,
            Self::DataTooLarge => ERR_SEC_DATA_TOO_LARGE,
            Self::Other(raw) => raw,
        }
    }

    /// Returns `true` for [`StatusCode::Success`].
    #[must_use]
    pub const fn is_success(self) -> bool {
        matches!(self, Self::Success)
    }

    /// Status used when a store violates its own contract.
    #[must_use]
    pub const fn internal() -> Self {
        Self::Other(ERR_SEC_INTERNAL_COMPONENT)
    }

    /// Status used for arguments that cannot be passed to the store.
    #[must_use]
    pub const fn param() -> Self {
        Self::Other(ERR_SEC_PARAM)
    }
}

impl fmt::Display for StatusCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Success => "success",
            Self::ItemNotFound => "item_not_found",
            Self::BufferTooSmall => "buffer_too_small",
            Self::DataTooLarge => "data_too_large",
            Self::Other(_) => "platform_failure",
        };
        write!(f, "{name} ({})", self.raw())
    }
}

impl From<OsStatus> for StatusCode {
    fn from(raw: OsStatus) -> Self {
        Self::from_raw(raw)
    }
}

/// Converts a raw status into a `Result`, classifying any failure.
///
/// # Errors
///
/// Returns the classified status for every value other than success.
pub const fn check(raw: OsStatus) -> Result<(), StatusCode> {
    match StatusCode::from_raw(raw) {
        StatusCode::Success => Ok(()),
        failure => Err(failure),
    }
}
