use std::sync::Arc;

use zeroize::Zeroizing;

use super::foreign::{CKey, ForeignStore};
use super::{BackingStore, Convention, StoreResult};
use crate::status::StatusCode;

/// Default capacity of the retrieval buffer, in bytes.
///
/// Generous for passwords, tokens and keys; larger secrets need a configured
/// capacity.
pub const DEFAULT_BUFFER_CAPACITY: usize = 4096;

/// Largest capacity a [`FixedBufferStore`] accepts.
pub const MAX_BUFFER_CAPACITY: usize = 1 << 20;

/// Fixed-buffer convention: retrieval fills a buffer of `capacity` bytes and
/// reports the item length through a separate cell.
///
/// Only the first reported-length bytes are ever read back. Whatever else the
/// buffer holds is padding.
#[derive(Debug, Clone)]
pub struct FixedBufferStore {
    foreign: Arc<ForeignStore>,
    capacity: usize,
}

impl FixedBufferStore {
    /// Creates the adapter over `foreign` with the given buffer capacity.
    ///
    /// The capacity is clamped to `1..=MAX_BUFFER_CAPACITY`.
    #[must_use]
    pub fn new(foreign: Arc<ForeignStore>, capacity: usize) -> Self {
        Self {
            foreign,
            capacity: capacity.clamp(1, MAX_BUFFER_CAPACITY),
        }
    }

    /// Creates the adapter with [`DEFAULT_BUFFER_CAPACITY`].
    #[must_use]
    pub fn with_default_capacity(foreign: Arc<ForeignStore>) -> Self {
        Self::new(foreign, DEFAULT_BUFFER_CAPACITY)
    }

    /// Size of the retrieval buffer, which is also the capacity declared to
    /// the store.
    #[must_use]
    pub const fn capacity(&self) -> usize {
        self.capacity
    }
}

impl BackingStore for FixedBufferStore {
    fn convention(&self) -> Convention {
        Convention::FixedBuffer
    }

    fn store_set(&self, service: &str, user: &str, secret: &[u8]) -> StoreResult<()> {
        let key = CKey::new(service, user)?;
        // anything longer could be written but never read back
        if secret.len() > self.capacity {
            log::debug!(
                "secret of {} bytes exceeds buffer capacity {}",
                secret.len(),
                self.capacity
            );
            return Err(StatusCode::DataTooLarge);
        }
        self.foreign.set_bytes(&key, secret)
    }

    fn store_get(&self, service: &str, user: &str) -> StoreResult<Zeroizing<Vec<u8>>> {
        let key = CKey::new(service, user)?;
        let mut buf = Zeroizing::new(vec![0u8; self.capacity]);
        let len = self.foreign.get_bytes(&key, &mut buf)?;
        let Some(bytes) = buf.get(..len) else {
            log::warn!(
                "backing store reported {len} bytes for a {} byte buffer",
                self.capacity
            );
            return Err(StatusCode::internal());
        };
        Ok(Zeroizing::new(bytes.to_vec()))
    }

    fn store_delete(&self, service: &str, user: &str) -> StoreResult<()> {
        self.foreign.delete(&CKey::new(service, user)?)
    }
}
