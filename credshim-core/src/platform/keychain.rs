//! Keychain Services implementation of [`SecureStorage`].
//!
//! Items are generic passwords keyed by `kSecAttrService` and
//! `kSecAttrAccount`. Statuses from Security.framework are passed through
//! unchanged so the shim can classify them.

use security_framework::passwords::{
    delete_generic_password, get_generic_password, set_generic_password,
};

use super::{PlatformResult, SecureStorage};
use crate::status::StatusCode;

/// Generic password storage in the platform keychain.
///
/// Keychain operations are synchronized by the system, so the type carries no
/// state of its own.
#[derive(Debug, Default, Clone, Copy)]
pub struct KeychainStorage;

impl KeychainStorage {
    /// Creates a keychain-backed store.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

fn status(err: &security_framework::base::Error) -> StatusCode {
    StatusCode::from_raw(err.code())
}

impl SecureStorage for KeychainStorage {
    fn set(&self, service: &str, user: &str, secret: &[u8]) -> PlatformResult<()> {
        // add-or-update: an existing item is overwritten in place
        set_generic_password(service, user, secret).map_err(|e| status(&e))
    }

    fn get(&self, service: &str, user: &str) -> PlatformResult<Vec<u8>> {
        get_generic_password(service, user).map_err(|e| status(&e))
    }

    fn delete(&self, service: &str, user: &str) -> PlatformResult<()> {
        delete_generic_password(service, user).map_err(|e| status(&e))
    }
}
