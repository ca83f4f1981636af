//! In-memory implementation of [`SecureStorage`].
//!
//! Not persistent and not protected beyond process memory. Used as the
//! default off Apple platforms and by the test suites.

use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};

use zeroize::Zeroizing;

use super::{PlatformResult, SecureStorage};
use crate::status::StatusCode;

type ItemKey = (String, String);

/// In-memory secure storage backed by a `HashMap`.
///
/// Thread-safe; concurrent writers to the same key race and the last one wins.
#[derive(Default)]
pub struct MemoryStorage {
    items: RwLock<HashMap<ItemKey, Zeroizing<Vec<u8>>>>,
}

impl MemoryStorage {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of stored items.
    #[must_use]
    pub fn len(&self) -> usize {
        self.items.read().map_or(0, |items| items.len())
    }

    /// Returns `true` if no items are stored.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Removes every item.
    pub fn clear(&self) {
        self.items
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }
}

fn poisoned<T>(_: PoisonError<T>) -> StatusCode {
    log::warn!("memory storage lock poisoned");
    StatusCode::internal()
}

fn item_key(service: &str, user: &str) -> ItemKey {
    (service.to_owned(), user.to_owned())
}

impl SecureStorage for MemoryStorage {
    fn set(&self, service: &str, user: &str, secret: &[u8]) -> PlatformResult<()> {
        self.items
            .write()
            .map_err(poisoned)?
            .insert(item_key(service, user), Zeroizing::new(secret.to_vec()));
        Ok(())
    }

    fn get(&self, service: &str, user: &str) -> PlatformResult<Vec<u8>> {
        self.items
            .read()
            .map_err(poisoned)?
            .get(&item_key(service, user))
            .map(|bytes| bytes.to_vec())
            .ok_or(StatusCode::ItemNotFound)
    }

    fn delete(&self, service: &str, user: &str) -> PlatformResult<()> {
        self.items
            .write()
            .map_err(poisoned)?
            .remove(&item_key(service, user))
            .map(drop)
            .ok_or(StatusCode::ItemNotFound)
    }
}
