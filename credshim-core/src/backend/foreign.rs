//! Raw calls into a foreign secure-storage component.
//!
//! This is the only file in the backend that contains `unsafe` code. The
//! convention adapters use the safe methods on [`ForeignStore`], which turn
//! every raw status into a `Result` and every returned data reference into an
//! [`OwnedData`] before anything else happens.

use std::ffi::{c_char, c_void, CString};
use std::ptr;
use std::sync::Arc;

use super::StoreResult;
use crate::native::{credshim_store_free, NativeStore, OwnedData, ShimDataRef, NATIVE_VTABLE};
use crate::platform::{MemoryStorage, SecureStorage};
use crate::status::{check, OsStatus, StatusCode};

/// Entry points of a foreign store, one per boundary call.
///
/// Every function receives the store's opaque context first, then the
/// NUL-terminated service and user names.
#[repr(C)]
#[derive(Clone, Copy)]
pub struct StoreVTable {
    /// Object-handle write: stores the bytes of a data object.
    pub set_data:
        unsafe extern "C" fn(*mut c_void, *const c_char, *const c_char, ShimDataRef) -> OsStatus,
    /// Object-handle read: writes an owned data reference (create rule).
    pub copy_data: unsafe extern "C" fn(
        *mut c_void,
        *const c_char,
        *const c_char,
        *mut ShimDataRef,
    ) -> OsStatus,
    /// Borrowed-handle read: writes a borrowed data reference (get rule).
    pub get_data: unsafe extern "C" fn(
        *mut c_void,
        *const c_char,
        *const c_char,
        *mut ShimDataRef,
    ) -> OsStatus,
    /// Fixed-buffer write: stores `len` bytes.
    pub set_bytes: unsafe extern "C" fn(
        *mut c_void,
        *const c_char,
        *const c_char,
        *const u8,
        usize,
    ) -> OsStatus,
    /// Fixed-buffer read: fills a caller buffer of the given capacity and
    /// reports the item length through the length cell.
    pub get_bytes: unsafe extern "C" fn(
        *mut c_void,
        *const c_char,
        *const c_char,
        *mut u8,
        usize,
        *mut usize,
    ) -> OsStatus,
    /// Removes the item.
    pub delete: unsafe extern "C" fn(*mut c_void, *const c_char, *const c_char) -> OsStatus,
}

/// Owned connection to a foreign store: its context, its function table and
/// the destructor for the context.
pub struct ForeignStore {
    ctx: *mut c_void,
    vtable: StoreVTable,
    free: Option<unsafe extern "C" fn(*mut c_void)>,
}

// SAFETY: `from_raw` requires a context that may be used from any thread.
unsafe impl Send for ForeignStore {}
// SAFETY: as above; the component serializes its own state.
unsafe impl Sync for ForeignStore {}

impl ForeignStore {
    /// Wraps a foreign store.
    ///
    /// # Safety
    ///
    /// Every function in `vtable` must honour the contract documented on
    /// [`StoreVTable`] for `ctx`, and be callable concurrently from any
    /// thread. `free`, if given, is called exactly once with `ctx` on drop.
    #[must_use]
    pub unsafe fn from_raw(
        ctx: *mut c_void,
        vtable: StoreVTable,
        free: Option<unsafe extern "C" fn(*mut c_void)>,
    ) -> Self {
        Self { ctx, vtable, free }
    }

    /// Connects to the native component of this crate over `storage`.
    #[must_use]
    pub fn native(storage: Arc<dyn SecureStorage>) -> Self {
        let ctx = NativeStore::new(storage).into_raw();
        // SAFETY: the native entry points implement the table for this context
        // and `credshim_store_free` is its destructor.
        unsafe { Self::from_raw(ctx, NATIVE_VTABLE, Some(credshim_store_free)) }
    }

    /// Connects to a native component over a fresh [`MemoryStorage`].
    #[must_use]
    pub fn memory() -> Self {
        Self::native(Arc::new(MemoryStorage::new()))
    }

    pub(super) fn set_data(&self, key: &CKey, data: &OwnedData) -> StoreResult<()> {
        // SAFETY: names are NUL-terminated and `data` is live for the call.
        check(unsafe {
            (self.vtable.set_data)(self.ctx, key.service(), key.user(), data.as_ptr())
        })
    }

    pub(super) fn copy_data(&self, key: &CKey) -> StoreResult<Option<OwnedData>> {
        let mut out: ShimDataRef = ptr::null();
        // SAFETY: names are NUL-terminated and `out` is writable.
        let status =
            unsafe { (self.vtable.copy_data)(self.ctx, key.service(), key.user(), &mut out) };
        // adopted before the status is looked at, so it is released on every path
        // SAFETY: under the create rule `out` is null or owned by us.
        let data = unsafe { OwnedData::from_create_rule(out) };
        check(status)?;
        Ok(data)
    }

    pub(super) fn get_data(&self, key: &CKey) -> StoreResult<Option<OwnedData>> {
        let mut out: ShimDataRef = ptr::null();
        // SAFETY: names are NUL-terminated and `out` is writable.
        let status =
            unsafe { (self.vtable.get_data)(self.ctx, key.service(), key.user(), &mut out) };
        // retained before any other call can invalidate the borrowed reference
        // SAFETY: under the get rule `out` is null or live until the next call.
        let data = unsafe { OwnedData::from_get_rule(out) };
        check(status)?;
        Ok(data)
    }

    pub(super) fn set_bytes(&self, key: &CKey, bytes: &[u8]) -> StoreResult<()> {
        // SAFETY: `bytes` is readable for its length.
        check(unsafe {
            (self.vtable.set_bytes)(
                self.ctx,
                key.service(),
                key.user(),
                bytes.as_ptr(),
                bytes.len(),
            )
        })
    }

    /// Returns the length the store reported. It is not checked against
    /// `buf.len()` here.
    pub(super) fn get_bytes(&self, key: &CKey, buf: &mut [u8]) -> StoreResult<usize> {
        let mut len = 0usize;
        // SAFETY: `buf` is writable for its length and `len` is writable.
        let status = unsafe {
            (self.vtable.get_bytes)(
                self.ctx,
                key.service(),
                key.user(),
                buf.as_mut_ptr(),
                buf.len(),
                &mut len,
            )
        };
        check(status)?;
        Ok(len)
    }

    pub(super) fn delete(&self, key: &CKey) -> StoreResult<()> {
        // SAFETY: names are NUL-terminated.
        check(unsafe { (self.vtable.delete)(self.ctx, key.service(), key.user()) })
    }
}

impl Drop for ForeignStore {
    fn drop(&mut self) {
        if let Some(free) = self.free {
            // SAFETY: `from_raw` requires `free` to accept `ctx` exactly once.
            unsafe { free(self.ctx) };
        }
    }
}

impl std::fmt::Debug for ForeignStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ForeignStore").finish_non_exhaustive()
    }
}

/// Service and user as C strings.
pub(super) struct CKey {
    service: CString,
    user: CString,
}

impl CKey {
    /// Names with an interior NUL cannot cross the boundary.
    pub(super) fn new(service: &str, user: &str) -> StoreResult<Self> {
        let service = CString::new(service).map_err(|_| StatusCode::param())?;
        let user = CString::new(user).map_err(|_| StatusCode::param())?;
        Ok(Self { service, user })
    }

    fn service(&self) -> *const c_char {
        self.service.as_ptr()
    }

    fn user(&self) -> *const c_char {
        self.user.as_ptr()
    }
}
