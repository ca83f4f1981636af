//! Credential manager object exported to Swift and Kotlin.

use std::sync::Arc;

use super::error::CredentialError;
use crate::backend::{Convention, DEFAULT_BUFFER_CAPACITY};
use crate::config::{ConfigError, ShimConfig};
use crate::shim::CredentialShim;

type Result<T, E = CredentialError> = std::result::Result<T, E>;

/// Stores, retrieves and deletes credentials in the platform's secure
/// storage.
///
/// # Example (Swift)
///
/// ```swift
/// let manager = CredentialManager(convention: .fixedBuffer)
/// try manager.setCredential(service: "com.example.app", user: "alice", secret: "hunter2")
/// let secret = try manager.getCredential(service: "com.example.app", user: "alice")
/// ```
#[derive(Debug, uniffi::Object)]
pub struct CredentialManager {
    shim: CredentialShim,
}

#[uniffi::export]
impl CredentialManager {
    /// Creates a manager speaking `convention` to the platform storage, with
    /// the default fixed-buffer capacity.
    #[uniffi::constructor]
    #[must_use]
    pub fn new(convention: Convention) -> Arc<Self> {
        Arc::new(Self {
            shim: CredentialShim::on_platform(convention, DEFAULT_BUFFER_CAPACITY),
        })
    }

    /// Creates a manager with an explicit fixed-buffer capacity in bytes.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::CapacityOutOfRange`] when the capacity is zero
    /// or above the supported maximum.
    #[uniffi::constructor]
    pub fn with_capacity(
        convention: Convention,
        buffer_capacity: u32,
    ) -> Result<Arc<Self>, ConfigError> {
        let config = ShimConfig {
            convention,
            buffer_capacity: usize::try_from(buffer_capacity).unwrap_or(usize::MAX),
        };
        Ok(Arc::new(Self {
            shim: CredentialShim::from_config(&config)?,
        }))
    }

    /// The convention used to reach the backing store.
    #[must_use]
    pub fn convention(&self) -> Convention {
        self.shim.convention()
    }

    /// Stores `secret`, replacing any existing value.
    ///
    /// # Errors
    ///
    /// Returns [`CredentialError::StorageFailure`] when the store rejects the
    /// write.
    pub fn set_credential(&self, service: &str, user: &str, secret: &str) -> Result<()> {
        Ok(self.shim.set(service, user, secret)?)
    }

    /// Retrieves the secret as text.
    ///
    /// # Errors
    ///
    /// Returns [`CredentialError::NotFound`], [`CredentialError::NotString`] or
    /// [`CredentialError::StorageFailure`].
    pub fn get_credential(&self, service: &str, user: &str) -> Result<String> {
        Ok(self.shim.get(service, user)?)
    }

    /// Deletes the credential.
    ///
    /// # Errors
    ///
    /// Returns [`CredentialError::StorageFailure`], also when the credential
    /// does not exist.
    pub fn delete_credential(&self, service: &str, user: &str) -> Result<()> {
        Ok(self.shim.delete(service, user)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_manager_round_trip() {
        let manager =
            CredentialManager::with_capacity(Convention::FixedBuffer, 32).expect("manager");
        assert_eq!(manager.convention(), Convention::FixedBuffer);

        let service = format!("credshim.test.{}", rand::random::<u64>());
        assert_eq!(
            manager.get_credential(&service, "alice"),
            Err(CredentialError::NotFound)
        );
        manager
            .set_credential(&service, "alice", "correct horse")
            .expect("set");
        assert_eq!(
            manager.get_credential(&service, "alice").expect("get"),
            "correct horse"
        );
        manager.delete_credential(&service, "alice").expect("delete");
    }

    #[test]
    fn test_zero_capacity_is_rejected() {
        let result = CredentialManager::with_capacity(Convention::FixedBuffer, 0);
        assert_eq!(result.map(|_| ()), Err(ConfigError::CapacityOutOfRange(0)));
    }

    #[test]
    fn test_default_capacity_manager() {
        let manager = CredentialManager::new(Convention::ObjectHandle);
        assert_eq!(manager.convention(), Convention::ObjectHandle);
    }
}
