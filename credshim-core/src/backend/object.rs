use std::sync::Arc;

use zeroize::Zeroizing;

use super::foreign::{CKey, ForeignStore};
use super::{BackingStore, Convention, StoreResult};
use crate::native::OwnedData;
use crate::status::StatusCode;

/// Object-handle convention: retrieval hands over an owned data reference.
///
/// The reference is adopted into an [`OwnedData`] the moment the store
/// returns, so it is released exactly once whatever happens next.
#[derive(Debug, Clone)]
pub struct ObjectHandleStore {
    foreign: Arc<ForeignStore>,
}

impl ObjectHandleStore {
    /// Creates the adapter over `foreign`.
    #[must_use]
    pub const fn new(foreign: Arc<ForeignStore>) -> Self {
        Self { foreign }
    }
}

impl BackingStore for ObjectHandleStore {
    fn convention(&self) -> Convention {
        Convention::ObjectHandle
    }

    fn store_set(&self, service: &str, user: &str, secret: &[u8]) -> StoreResult<()> {
        let key = CKey::new(service, user)?;
        let data = OwnedData::new(secret);
        self.foreign.set_data(&key, &data)
    }

    fn store_get(&self, service: &str, user: &str) -> StoreResult<Zeroizing<Vec<u8>>> {
        let key = CKey::new(service, user)?;
        handle_bytes(self.foreign.copy_data(&key)?)
    }

    fn store_delete(&self, service: &str, user: &str) -> StoreResult<()> {
        self.foreign.delete(&CKey::new(service, user)?)
    }
}

/// Copies the bytes out of a handle returned alongside a success status.
///
/// The store guarantees a handle on success, so a missing one is an
/// internal-component failure rather than an empty secret.
pub(super) fn handle_bytes(handle: Option<OwnedData>) -> StoreResult<Zeroizing<Vec<u8>>> {
    let Some(data) = handle else {
        log::warn!("backing store reported success without returning data");
        return Err(StatusCode::internal());
    };
    Ok(Zeroizing::new(data.as_bytes().to_vec()))
}
