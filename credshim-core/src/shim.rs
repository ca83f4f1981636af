//! The credential shim: `set`, `get` and `delete` for a secret keyed by
//! (service, user), over whichever backing-store convention is configured.

use std::sync::{Arc, OnceLock};

use secrecy::SecretString;

use crate::backend::{
    BackingStore, BorrowedHandleStore, Convention, FixedBufferStore, ForeignStore,
    ObjectHandleStore, StoreResult, DEFAULT_BUFFER_CAPACITY,
};
use crate::config::{ConfigError, ShimConfig};
use crate::error::{CredentialError, CredentialResult, Operation};
use crate::platform::default_storage;

/// Stores, retrieves and deletes credentials through one [`BackingStore`].
///
/// Every backing-store status is classified by [`CredentialError::from_status`]
/// right here, so callers see the same errors whichever convention is active.
pub struct CredentialShim {
    store: Box<dyn BackingStore>,
}

impl std::fmt::Debug for CredentialShim {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CredentialShim")
            .field("convention", &self.store.convention())
            .finish_non_exhaustive()
    }
}

impl CredentialShim {
    /// Creates a shim over an existing backing store.
    #[must_use]
    pub fn new(store: Box<dyn BackingStore>) -> Self {
        Self { store }
    }

    /// Creates a shim speaking `convention` to `foreign`.
    ///
    /// `capacity` sizes the retrieval buffer and is only used by
    /// [`Convention::FixedBuffer`]. It is not validated here; an out-of-range
    /// value is clamped to `1..=MAX_BUFFER_CAPACITY`. Use
    /// [`CredentialShim::from_config`] to reject it instead.
    #[must_use]
    pub fn with_convention(
        convention: Convention,
        foreign: Arc<ForeignStore>,
        capacity: usize,
    ) -> Self {
        let store: Box<dyn BackingStore> = match convention {
            Convention::ObjectHandle => Box::new(ObjectHandleStore::new(foreign)),
            Convention::BorrowedHandle => Box::new(BorrowedHandleStore::new(foreign)),
            Convention::FixedBuffer => Box::new(FixedBufferStore::new(foreign, capacity)),
        };
        Self::new(store)
    }

    /// Creates a shim over the platform's default secure storage.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] when `config` fails
    /// [`ShimConfig::validate`].
    pub fn from_config(config: &ShimConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self::on_platform(config.convention, config.buffer_capacity))
    }

    pub(crate) fn on_platform(convention: Convention, capacity: usize) -> Self {
        let foreign = Arc::new(ForeignStore::native(default_storage()));
        Self::with_convention(convention, foreign, capacity)
    }

    /// The convention used to reach the backing store.
    #[must_use]
    pub fn convention(&self) -> Convention {
        self.store.convention()
    }

    /// Stores `secret` for (`service`, `user`), replacing any existing value.
    ///
    /// # Errors
    ///
    /// Returns [`CredentialError::StorageFailure`] when the store rejects the
    /// write, including a secret too large for the fixed buffer.
    pub fn set(&self, service: &str, user: &str, secret: &str) -> CredentialResult<()> {
        self.set_bytes(service, user, secret.as_bytes())
    }

    /// Stores raw bytes for (`service`, `user`).
    ///
    /// # Errors
    ///
    /// As for [`CredentialShim::set`].
    pub fn set_bytes(&self, service: &str, user: &str, secret: &[u8]) -> CredentialResult<()> {
        log::debug!("set credential for service {service} via {}", self.convention());
        classify(Operation::Set, self.store.store_set(service, user, secret))
    }

    /// Retrieves the secret for (`service`, `user`) as text.
    ///
    /// # Errors
    ///
    /// Returns [`CredentialError::NotFound`] when there is no such credential,
    /// [`CredentialError::NotString`] with the exact stored bytes when they are
    /// not UTF-8, and [`CredentialError::StorageFailure`] otherwise.
    pub fn get(&self, service: &str, user: &str) -> CredentialResult<String> {
        let bytes = self.get_bytes(service, user)?;
        String::from_utf8(bytes).map_err(|err| CredentialError::NotString(err.into_bytes()))
    }

    /// Retrieves the raw bytes for (`service`, `user`) without decoding.
    ///
    /// # Errors
    ///
    /// As for [`CredentialShim::get`], except that no bytes are rejected as
    /// non-text.
    pub fn get_bytes(&self, service: &str, user: &str) -> CredentialResult<Vec<u8>> {
        log::debug!("get credential for service {service} via {}", self.convention());
        let bytes = classify(Operation::Get, self.store.store_get(service, user))?;
        Ok(bytes.to_vec())
    }

    /// Retrieves the secret as a [`SecretString`], which is zeroized on drop
    /// and redacted in debug output.
    ///
    /// # Errors
    ///
    /// As for [`CredentialShim::get`].
    pub fn get_secret(&self, service: &str, user: &str) -> CredentialResult<SecretString> {
        self.get(service, user).map(SecretString::from)
    }

    /// Deletes the credential for (`service`, `user`).
    ///
    /// # Errors
    ///
    /// Returns [`CredentialError::StorageFailure`] on any store failure,
    /// including an item that does not exist.
    pub fn delete(&self, service: &str, user: &str) -> CredentialResult<()> {
        log::debug!("delete credential for service {service} via {}", self.convention());
        classify(Operation::Delete, self.store.store_delete(service, user))
    }
}

fn classify<T>(operation: Operation, result: StoreResult<T>) -> CredentialResult<T> {
    result.map_err(|status| {
        let err = CredentialError::from_status(operation, status);
        if !matches!(err, CredentialError::NotFound) {
            log::debug!("{operation} failed with {status}");
        }
        err
    })
}

fn default_shim() -> &'static CredentialShim {
    static DEFAULT: OnceLock<CredentialShim> = OnceLock::new();
    DEFAULT.get_or_init(|| {
        ShimConfig::from_env()
            .and_then(|config| CredentialShim::from_config(&config))
            .unwrap_or_else(|err| {
                log::warn!("ignoring credential shim environment: {err}");
                CredentialShim::on_platform(Convention::default(), DEFAULT_BUFFER_CAPACITY)
            })
    })
}

/// Stores `secret` through the process-wide default shim.
///
/// The default shim is built on first use from [`ShimConfig::from_env`].
///
/// # Errors
///
/// As for [`CredentialShim::set`].
pub fn set_credential(service: &str, user: &str, secret: &str) -> CredentialResult<()> {
    default_shim().set(service, user, secret)
}

/// Retrieves a secret through the process-wide default shim.
///
/// # Errors
///
/// As for [`CredentialShim::get`].
pub fn get_credential(service: &str, user: &str) -> CredentialResult<String> {
    default_shim().get(service, user)
}

/// Deletes a secret through the process-wide default shim.
///
/// # Errors
///
/// As for [`CredentialShim::delete`].
pub fn delete_credential(service: &str, user: &str) -> CredentialResult<()> {
    default_shim().delete(service, user)
}
