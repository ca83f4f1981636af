//! The native secure-storage component and its C ABI.
//!
//! This is the component the shim reaches through the foreign boundary. It
//! exports plain C functions (declared in `include/credshim.h`) so it can be
//! linked into an iOS or macOS app and called from Objective-C or Swift as
//! well as from the shim in this crate.
//!
//! Secrets cross the boundary in one of two shapes:
//!
//! - [`ShimData`], a reference-counted byte object, for the object-handle and
//!   borrowed-handle conventions
//! - caller-owned byte buffers with a separate length cell, for the
//!   fixed-buffer convention
//!
//! Behind the ABI sits a [`SecureStorage`](crate::platform::SecureStorage).

mod data;
mod store;

pub use data::{
    credshim_data_create, credshim_data_get_bytes_ptr, credshim_data_get_length,
    credshim_data_get_retain_count, credshim_data_release, credshim_data_retain, OwnedData,
    ShimData, ShimDataRef,
};
pub use store::{
    credshim_copy_data, credshim_delete, credshim_get_bytes, credshim_get_data,
    credshim_set_bytes, credshim_set_data, credshim_store_free, credshim_store_new_memory,
    NativeStore, NATIVE_VTABLE,
};
