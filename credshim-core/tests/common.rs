//! Common test utilities shared across integration tests.
#![allow(dead_code)]

use std::sync::Arc;

use credshim_core::{Convention, CredentialShim, ForeignStore};
use rand::{distributions::Alphanumeric, Rng};

/// Capacity used for fixed-buffer shims in tests.
pub const TEST_CAPACITY: usize = 256;

/// A service name no other test uses.
pub fn unique_service() -> String {
    let suffix: String = rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(12)
        .map(char::from)
        .collect();
    format!("credshim.test.{suffix}")
}

/// Random text of at most `max_bytes` UTF-8 bytes, drawn from all of Unicode.
pub fn random_secret(max_bytes: usize) -> String {
    let mut rng = rand::thread_rng();
    let target = rng.gen_range(0..=max_bytes);
    let mut secret = String::new();
    loop {
        let c: char = rng.gen();
        if secret.len() + c.len_utf8() > target {
            break;
        }
        secret.push(c);
    }
    secret
}

/// A shim over its own in-memory native store.
pub fn shim(convention: Convention) -> CredentialShim {
    shim_over(convention, &Arc::new(ForeignStore::memory()))
}

/// A shim over a store shared with other shims.
pub fn shim_over(convention: Convention, foreign: &Arc<ForeignStore>) -> CredentialShim {
    CredentialShim::with_convention(convention, Arc::clone(foreign), TEST_CAPACITY)
}

/// One shim per convention, all over the same store.
pub fn shims_sharing_one_store() -> Vec<CredentialShim> {
    let foreign = Arc::new(ForeignStore::memory());
    Convention::ALL
        .into_iter()
        .map(|convention| shim_over(convention, &foreign))
        .collect()
}
