//! Reference-counted byte object handed across the C boundary.
//!
//! `ShimData` plays the part a `CFData` plays for Keychain Services: an
//! immutable byte buffer whose lifetime is governed by explicit retain and
//! release calls. Foreign callers only ever see a [`ShimDataRef`].
//!
//! Rust code never touches the raw counts. It holds references through
//! [`OwnedData`], which owns exactly one reference and gives it back on drop.

use std::ptr::{self, NonNull};
use std::slice;
use std::sync::atomic::{fence, AtomicUsize, Ordering};

use zeroize::Zeroizing;

/// Opaque byte object. Contents are zeroized when the last reference goes.
pub struct ShimData {
    refs: AtomicUsize,
    bytes: Zeroizing<Vec<u8>>,
}

/// Pointer to a [`ShimData`] as seen by C callers.
pub type ShimDataRef = *const ShimData;

fn create(bytes: &[u8]) -> NonNull<ShimData> {
    let data = Box::new(ShimData {
        refs: AtomicUsize::new(1),
        bytes: Zeroizing::new(bytes.to_vec()),
    });
    NonNull::from(Box::leak(data))
}

/// Creates a data object holding a copy of `len` bytes at `bytes`.
///
/// The caller owns the returned reference and must release it once.
/// Returns null when `bytes` is null and `len` is non-zero.
///
/// # Safety
///
/// `bytes` must be valid for reads of `len` bytes, or null with `len == 0`.
#[no_mangle]
pub unsafe extern "C" fn credshim_data_create(bytes: *const u8, len: usize) -> ShimDataRef {
    if len == 0 {
        return create(&[]).as_ptr();
    }
    if bytes.is_null() {
        return ptr::null();
    }
    // SAFETY: caller guarantees `bytes` is readable for `len` bytes.
    let source = unsafe { slice::from_raw_parts(bytes, len) };
    create(source).as_ptr()
}

/// Takes an additional reference and returns `data`. Null is passed through.
///
/// # Safety
///
/// `data` must be null or a live reference obtained from this library.
#[no_mangle]
pub unsafe extern "C" fn credshim_data_retain(data: ShimDataRef) -> ShimDataRef {
    // SAFETY: caller guarantees `data` is null or live.
    if let Some(object) = unsafe { data.as_ref() } {
        object.refs.fetch_add(1, Ordering::Relaxed);
    }
    data
}

/// Gives up one reference. The object is freed with the last one.
///
/// # Safety
///
/// `data` must be null or a live reference owned by the caller; it must not
/// be used again after this call.
#[no_mangle]
pub unsafe extern "C" fn credshim_data_release(data: ShimDataRef) {
    // SAFETY: caller guarantees `data` is null or live.
    let Some(object) = (unsafe { data.as_ref() }) else {
        return;
    };
    if object.refs.fetch_sub(1, Ordering::Release) != 1 {
        return;
    }
    fence(Ordering::Acquire);
    // SAFETY: this was the last reference and the pointer came from `Box::leak`.
    drop(unsafe { Box::from_raw(data.cast_mut()) });
}

/// Returns the number of bytes held by `data`, or 0 for null.
///
/// # Safety
///
/// `data` must be null or a live reference.
#[no_mangle]
pub unsafe extern "C" fn credshim_data_get_length(data: ShimDataRef) -> usize {
    // SAFETY: caller guarantees `data` is null or live.
    unsafe { data.as_ref() }.map_or(0, |object| object.bytes.len())
}

/// Returns a pointer to the bytes held by `data`, or null for null.
///
/// The pointer is valid for [`credshim_data_get_length`] bytes while the
/// caller holds a reference.
///
/// # Safety
///
/// `data` must be null or a live reference.
#[no_mangle]
pub unsafe extern "C" fn credshim_data_get_bytes_ptr(data: ShimDataRef) -> *const u8 {
    // SAFETY: caller guarantees `data` is null or live.
    unsafe { data.as_ref() }.map_or(ptr::null(), |object| object.bytes.as_ptr())
}

/// Returns the current reference count of `data`, or 0 for null.
///
/// # Safety
///
/// `data` must be null or a live reference.
#[no_mangle]
pub unsafe extern "C" fn credshim_data_get_retain_count(data: ShimDataRef) -> usize {
    // SAFETY: caller guarantees `data` is null or live.
    unsafe { data.as_ref() }.map_or(0, |object| object.refs.load(Ordering::Acquire))
}

/// Owner of exactly one reference to a [`ShimData`].
///
/// Dropping releases the reference, so every exit path releases it once and
/// no path can use it afterwards.
pub struct OwnedData(NonNull<ShimData>);

// SAFETY: the count is atomic and the bytes are immutable after creation.
unsafe impl Send for OwnedData {}
// SAFETY: shared access only reads the immutable bytes.
unsafe impl Sync for OwnedData {}

impl OwnedData {
    /// Creates a new object holding a copy of `bytes`.
    #[must_use]
    pub fn new(bytes: &[u8]) -> Self {
        Self(create(bytes))
    }

    /// Adopts a reference the caller already owns (create rule).
    ///
    /// Returns `None` for null.
    ///
    /// # Safety
    ///
    /// `data` must be null or a live reference whose ownership is transferred
    /// to the returned value.
    #[must_use]
    pub unsafe fn from_create_rule(data: ShimDataRef) -> Option<Self> {
        NonNull::new(data.cast_mut()).map(Self)
    }

    /// Retains a borrowed reference (get rule).
    ///
    /// Returns `None` for null.
    ///
    /// # Safety
    ///
    /// `data` must be null or a reference that is still live at this call.
    #[must_use]
    pub unsafe fn from_get_rule(data: ShimDataRef) -> Option<Self> {
        // SAFETY: caller guarantees `data` is null or live.
        let retained = unsafe { credshim_data_retain(data) };
        NonNull::new(retained.cast_mut()).map(Self)
    }

    /// Returns the raw pointer without giving up ownership.
    #[must_use]
    pub const fn as_ptr(&self) -> ShimDataRef {
        self.0.as_ptr().cast_const()
    }

    /// Transfers the owned reference to the caller.
    #[must_use]
    pub fn into_raw(self) -> ShimDataRef {
        let data = self.as_ptr();
        std::mem::forget(self);
        data
    }

    /// Returns the held bytes.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        // SAFETY: `self` holds a reference, so the object is live.
        let (bytes, len) = unsafe {
            (
                credshim_data_get_bytes_ptr(self.as_ptr()),
                credshim_data_get_length(self.as_ptr()),
            )
        };
        if len == 0 {
            return &[];
        }
        // SAFETY: the object is immutable and outlives the borrow of `self`.
        unsafe { slice::from_raw_parts(bytes, len) }
    }

    /// Returns the current reference count.
    #[must_use]
    pub fn retain_count(&self) -> usize {
        // SAFETY: `self` holds a reference, so the object is live.
        unsafe { credshim_data_get_retain_count(self.as_ptr()) }
    }
}

impl Clone for OwnedData {
    fn clone(&self) -> Self {
        // SAFETY: `self` holds a reference, so the object is live.
        unsafe { credshim_data_retain(self.as_ptr()) };
        Self(self.0)
    }
}

impl Drop for OwnedData {
    fn drop(&mut self) {
        // SAFETY: `self` owns exactly one reference and is never used again.
        unsafe { credshim_data_release(self.as_ptr()) };
    }
}

impl std::fmt::Debug for OwnedData {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OwnedData")
            .field("len", &self.as_bytes().len())
            .field("refs", &self.retain_count())
            .finish()
    }
}
