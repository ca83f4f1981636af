//! Platform secure storage behind the native component.
//!
//! The shim never talks to these types directly: they sit on the far side of
//! the C boundary and are driven by [`crate::native`]. Each platform provides
//! one implementation of [`SecureStorage`]:
//!
//! ## iOS / macOS
//! - [`KeychainStorage`]: generic password items in Keychain Services
//!   (feature `platform-apple`)
//!
//! ## Everywhere else, and tests
//! - [`MemoryStorage`]: process-local map, gone when the process exits

use std::sync::Arc;
#[cfg(not(all(feature = "platform-apple", target_vendor = "apple")))]
use std::sync::OnceLock;

use crate::status::StatusCode;

pub mod memory;

#[cfg(all(feature = "platform-apple", target_vendor = "apple"))]
mod keychain;

pub use memory::MemoryStorage;

#[cfg(all(feature = "platform-apple", target_vendor = "apple"))]
pub use keychain::KeychainStorage;

/// Result type for platform storage calls.
pub type PlatformResult<T> = Result<T, StatusCode>;

/// A secure store keyed by `(service, user)`.
///
/// Implementations are a black box to the shim: each call is one atomic
/// request that either succeeds or reports a status. They must serialize
/// their own state per key.
pub trait SecureStorage: Send + Sync {
    /// Creates or overwrites the item for `service` and `user`.
    ///
    /// # Errors
    ///
    /// Returns the platform status when the item cannot be written.
    fn set(&self, service: &str, user: &str, secret: &[u8]) -> PlatformResult<()>;

    /// Returns a copy of the item bytes.
    ///
    /// # Errors
    ///
    /// Returns [`StatusCode::ItemNotFound`] when no item exists, or the
    /// platform status for any other failure.
    fn get(&self, service: &str, user: &str) -> PlatformResult<Vec<u8>>;

    /// Removes the item.
    ///
    /// # Errors
    ///
    /// Returns [`StatusCode::ItemNotFound`] when no item exists, or the
    /// platform status for any other failure.
    fn delete(&self, service: &str, user: &str) -> PlatformResult<()>;
}

/// Returns the secure storage for the current platform.
///
/// With the `platform-apple` feature on an Apple target this is the
/// keychain; otherwise it is an in-memory store shared by the whole process,
/// so every shim sees the same items as it would with the keychain.
#[must_use]
pub fn default_storage() -> Arc<dyn SecureStorage> {
    #[cfg(all(feature = "platform-apple", target_vendor = "apple"))]
    {
        Arc::new(KeychainStorage::new())
    }
    #[cfg(not(all(feature = "platform-apple", target_vendor = "apple")))]
    {
        static SHARED: OnceLock<Arc<MemoryStorage>> = OnceLock::new();
        let storage = SHARED.get_or_init(|| {
            log::debug!("no platform keychain available, using in-memory storage");
            Arc::new(MemoryStorage::new())
        });
        Arc::clone(storage) as Arc<dyn SecureStorage>
    }
}
