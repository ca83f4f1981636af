use std::sync::Arc;

use zeroize::Zeroizing;

use super::foreign::{CKey, ForeignStore};
use super::object::handle_bytes;
use super::{BackingStore, Convention, StoreResult};
use crate::native::OwnedData;

/// Borrowed-handle convention: retrieval returns a reference the store still
/// owns.
///
/// The reference is retained before anything else runs and released when the
/// bytes have been copied out, so it never outlives its owner.
#[derive(Debug, Clone)]
pub struct BorrowedHandleStore {
    foreign: Arc<ForeignStore>,
}

impl BorrowedHandleStore {
    /// Creates the adapter over `foreign`.
    #[must_use]
    pub const fn new(foreign: Arc<ForeignStore>) -> Self {
        Self { foreign }
    }
}

impl BackingStore for BorrowedHandleStore {
    fn convention(&self) -> Convention {
        Convention::BorrowedHandle
    }

    fn store_set(&self, service: &str, user: &str, secret: &[u8]) -> StoreResult<()> {
        let key = CKey::new(service, user)?;
        let data = OwnedData::new(secret);
        self.foreign.set_data(&key, &data)
    }

    fn store_get(&self, service: &str, user: &str) -> StoreResult<Zeroizing<Vec<u8>>> {
        let key = CKey::new(service, user)?;
        handle_bytes(self.foreign.get_data(&key)?)
    }

    fn store_delete(&self, service: &str, user: &str) -> StoreResult<()> {
        self.foreign.delete(&CKey::new(service, user)?)
    }
}
