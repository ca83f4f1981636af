//! Backing-store conventions.
//!
//! The shim talks to its backing store through one of three calling
//! conventions. Each one is an adapter implementing [`BackingStore`] over a
//! shared [`ForeignStore`], so the shim itself never knows which convention is
//! active:
//!
//! - [`ObjectHandleStore`]: secrets travel as reference-counted data objects
//!   and retrieval hands over an owned reference.
//! - [`BorrowedHandleStore`]: as above, but retrieval returns a borrowed
//!   reference that must be retained before it is used.
//! - [`FixedBufferStore`]: retrieval fills a caller-owned buffer of fixed
//!   capacity and reports the item length separately.
//!
//! Adapters return raw [`StatusCode`]s. Turning them into
//! [`CredentialError`](crate::CredentialError)s is done in one place by the
//! shim.

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};
use zeroize::Zeroizing;

use crate::status::StatusCode;

mod borrowed;
mod fixed;
mod foreign;
mod object;


pub use borrowed::BorrowedHandleStore;
pub use fixed::{FixedBufferStore, DEFAULT_BUFFER_CAPACITY, MAX_BUFFER_CAPACITY};
pub use foreign::{ForeignStore, StoreVTable};
pub use object::ObjectHandleStore;

/// Result of a single backing-store call.
pub type StoreResult<T> = Result<T, StatusCode>;

/// Calling convention used to exchange secret bytes with the backing store.
#[derive(
    Debug,
    Default,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    EnumString,
    Display,
    Serialize,
    Deserialize,
    uniffi::Enum,
)]
#[strum(serialize_all = "kebab-case")]
#[serde(rename_all = "kebab-case")]
pub enum Convention {
    /// Owned reference-counted data objects.
    #[default]
    ObjectHandle,
    /// Borrowed data objects the caller retains.
    BorrowedHandle,
    /// Caller-owned buffer plus a length cell.
    FixedBuffer,
}

impl Convention {
    /// Every convention, in declaration order.
    pub const ALL: [Self; 3] = [Self::ObjectHandle, Self::BorrowedHandle, Self::FixedBuffer];
}

/// A backing store reached through one calling convention.
///
/// Each call is a single request/response with the store. Implementations
/// report the store's status unchanged, except for failures they detect
/// themselves at the boundary (null handles, impossible lengths, names that
/// cannot be encoded).
pub trait BackingStore: Send + Sync {
    /// The convention this store speaks.
    fn convention(&self) -> Convention;

    /// Creates or overwrites the item for (`service`, `user`).
    ///
    /// # Errors
    ///
    /// Returns the non-success status reported by the store.
    fn store_set(&self, service: &str, user: &str, secret: &[u8]) -> StoreResult<()>;

    /// Reads the item for (`service`, `user`).
    ///
    /// # Errors
    ///
    /// Returns the non-success status reported by the store.
    fn store_get(&self, service: &str, user: &str) -> StoreResult<Zeroizing<Vec<u8>>>;

    /// Removes the item for (`service`, `user`).
    ///
    /// # Errors
    ///
    /// Returns the non-success status reported by the store, including
    /// item-not-found for a missing item.
    fn store_delete(&self, service: &str, user: &str) -> StoreResult<()>;
}
