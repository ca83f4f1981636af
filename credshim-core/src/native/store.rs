//! C-ABI entry points of the native secure-storage component.
//!
//! A store is an opaque `void *` created by [`credshim_store_new_memory`] (or
//! by [`NativeStore::into_raw`]) and freed with [`credshim_store_free`]. Every
//! operation returns an [`OsStatus`]; argument problems are reported the way
//! Keychain Services reports them:
//!
//! * null store, name or input pointer: `errSecBadReq`
//! * empty or non-UTF-8 service/user: `errSecParam`

use std::cell::RefCell;
use std::ffi::{c_char, c_void, CStr};
use std::panic::{self, AssertUnwindSafe};
use std::ptr;
use std::slice;
use std::sync::Arc;

use zeroize::Zeroizing;

use super::data::{OwnedData, ShimDataRef};
use crate::backend::StoreVTable;
use crate::platform::{MemoryStorage, SecureStorage};
use crate::status::{
    OsStatus, StatusCode, ERR_SEC_BAD_REQ, ERR_SEC_BUFFER_TOO_SMALL, ERR_SEC_SUCCESS,
};

/// An object handed out under the get rule, with the store and item it came
/// from.
struct Lent {
    store: usize,
    service: String,
    user: String,
    #[allow(dead_code)] // held only to keep the lent object alive
    data: OwnedData,
}

thread_local! {
    /// Keeps the last object returned under the get rule alive until the next
    /// borrowed retrieval on this thread, or until this thread sets or deletes
    /// that item or frees its store.
    static BORROWED: RefCell<Option<Lent>> = const { RefCell::new(None) };
}

/// Parks `data` in this thread's slot and returns the borrowed reference.
fn lend(store: &NativeStore, service: &str, user: &str, data: OwnedData) -> ShimDataRef {
    let borrowed = data.as_ptr();
    let lent = Lent {
        store: store.addr(),
        service: service.to_owned(),
        user: user.to_owned(),
        data,
    };
    let previous = BORROWED.with(|slot| slot.replace(Some(lent)));
    drop(previous);
    borrowed
}

/// Releases this thread's borrowed object if it came from `store` and, when
/// `item` is given, from that item.
fn reclaim(store: usize, item: Option<(&str, &str)>) {
    let released = BORROWED.with(|slot| {
        let mut slot = slot.borrow_mut();
        let matches = slot.as_ref().is_some_and(|lent| {
            lent.store == store
                && item.is_none_or(|(service, user)| lent.service == service && lent.user == user)
        });
        if matches {
            slot.take()
        } else {
            None
        }
    });
    drop(released);
}

/// The native component: a [`SecureStorage`] exposed through a C ABI.
pub struct NativeStore {
    storage: Arc<dyn SecureStorage>,
}

impl NativeStore {
    /// Wraps `storage`.
    #[must_use]
    pub fn new(storage: Arc<dyn SecureStorage>) -> Self {
        Self { storage }
    }

    /// Moves the store to the heap and returns its opaque handle.
    ///
    /// Free it with [`credshim_store_free`].
    #[must_use]
    pub fn into_raw(self) -> *mut c_void {
        Box::into_raw(Box::new(self)).cast()
    }

    fn addr(&self) -> usize {
        ptr::from_ref(self).addr()
    }

    fn forget_item(&self, service: &str, user: &str) {
        reclaim(self.addr(), Some((service, user)));
    }
}

/// Function table bound to the native entry points below.
pub const NATIVE_VTABLE: StoreVTable = StoreVTable {
    set_data: credshim_set_data,
    copy_data: credshim_copy_data,
    get_data: credshim_get_data,
    set_bytes: credshim_set_bytes,
    get_bytes: credshim_get_bytes,
    delete: credshim_delete,
};

type CallResult<T> = Result<T, StatusCode>;

fn bad_request() -> StatusCode {
    StatusCode::Other(ERR_SEC_BAD_REQ)
}

/// Runs one exported call. A panic must not unwind into C, so it is reported
/// as an internal-component failure.
fn guarded<F>(call: F) -> OsStatus
where
    F: FnOnce() -> CallResult<()>,
{
    match panic::catch_unwind(AssertUnwindSafe(call)) {
        Ok(Ok(())) => ERR_SEC_SUCCESS,
        Ok(Err(status)) => status.raw(),
        Err(_) => {
            log::error!("native store call panicked");
            StatusCode::internal().raw()
        }
    }
}

/// # Safety
///
/// `store` must be null or a handle from [`NativeStore::into_raw`].
unsafe fn store_arg<'a>(store: *mut c_void) -> CallResult<&'a NativeStore> {
    // SAFETY: caller guarantees the handle is null or live.
    unsafe { store.cast::<NativeStore>().as_ref() }.ok_or_else(bad_request)
}

/// # Safety
///
/// `name` must be null or a NUL-terminated string.
unsafe fn name_arg<'a>(name: *const c_char) -> CallResult<&'a str> {
    if name.is_null() {
        return Err(bad_request());
    }
    // SAFETY: caller guarantees a NUL-terminated string.
    let name = unsafe { CStr::from_ptr(name) }
        .to_str()
        .map_err(|_| StatusCode::param())?;
    if name.is_empty() {
        return Err(StatusCode::param());
    }
    Ok(name)
}

/// # Safety
///
/// Same as the exported function calling it.
unsafe fn lookup<'a>(
    store: *mut c_void,
    service: *const c_char,
    user: *const c_char,
) -> CallResult<(&'a NativeStore, &'a str, &'a str)> {
    // SAFETY: forwarded from the caller.
    unsafe { Ok((store_arg(store)?, name_arg(service)?, name_arg(user)?)) }
}

/// Allocates a store backed by process memory.
#[no_mangle]
pub extern "C" fn credshim_store_new_memory() -> *mut c_void {
    NativeStore::new(Arc::new(MemoryStorage::new())).into_raw()
}

/// Frees a store. Null is ignored.
///
/// # Safety
///
/// `store` must be null or a handle not yet freed; it must not be used again.
#[no_mangle]
pub unsafe extern "C" fn credshim_store_free(store: *mut c_void) {
    if !store.is_null() {
        reclaim(store.addr(), None);
        // SAFETY: the handle came from `Box::into_raw` in `NativeStore::into_raw`.
        drop(unsafe { Box::from_raw(store.cast::<NativeStore>()) });
    }
}

/// Creates or overwrites the item with the bytes of `data`.
///
/// # Safety
///
/// `store` must be a live handle, `service` and `user` NUL-terminated strings
/// and `data` a live data reference; null pointers are reported, not followed.
#[no_mangle]
pub unsafe extern "C" fn credshim_set_data(
    store: *mut c_void,
    service: *const c_char,
    user: *const c_char,
    data: ShimDataRef,
) -> OsStatus {
    guarded(|| {
        // SAFETY: forwarded from the caller.
        let (store, service, user) = unsafe { lookup(store, service, user)? };
        // SAFETY: the caller keeps `data` live for the duration of the call.
        let data = unsafe { OwnedData::from_get_rule(data) }.ok_or_else(bad_request)?;
        store.storage.set(service, user, data.as_bytes())?;
        store.forget_item(service, user);
        Ok(())
    })
}

/// Copies the item into a new data object owned by the caller (create rule).
///
/// On success `*out_data` receives a reference the caller must release. When
/// `out_data` is null the lookup still runs and only the status is reported.
///
/// # Safety
///
/// As for [`credshim_set_data`]; `out_data` must be null or writable.
#[no_mangle]
pub unsafe extern "C" fn credshim_copy_data(
    store: *mut c_void,
    service: *const c_char,
    user: *const c_char,
    out_data: *mut ShimDataRef,
) -> OsStatus {
    guarded(|| {
        // SAFETY: forwarded from the caller.
        let (store, service, user) = unsafe { lookup(store, service, user)? };
        let bytes = Zeroizing::new(store.storage.get(service, user)?);
        if !out_data.is_null() {
            // SAFETY: caller guarantees `out_data` is writable.
            unsafe { *out_data = OwnedData::new(&bytes).into_raw() };
        }
        Ok(())
    })
}

/// Returns the item as a borrowed data object (get rule).
///
/// The reference in `*out_data` stays valid only until the next call to this
/// function on the same thread, or until the same thread sets or deletes the
/// item or frees the store. Retain it to keep it longer.
///
/// # Safety
///
/// As for [`credshim_copy_data`].
#[no_mangle]
pub unsafe extern "C" fn credshim_get_data(
    store: *mut c_void,
    service: *const c_char,
    user: *const c_char,
    out_data: *mut ShimDataRef,
) -> OsStatus {
    guarded(|| {
        // SAFETY: forwarded from the caller.
        let (store, service, user) = unsafe { lookup(store, service, user)? };
        let bytes = Zeroizing::new(store.storage.get(service, user)?);
        let borrowed = lend(store, service, user, OwnedData::new(&bytes));
        if !out_data.is_null() {
            // SAFETY: caller guarantees `out_data` is writable.
            unsafe { *out_data = borrowed };
        }
        Ok(())
    })
}

/// Creates or overwrites the item with `len` bytes at `bytes`.
///
/// # Safety
///
/// As for [`credshim_set_data`]; `bytes` must be readable for `len` bytes or
/// null with `len == 0`.
#[no_mangle]
pub unsafe extern "C" fn credshim_set_bytes(
    store: *mut c_void,
    service: *const c_char,
    user: *const c_char,
    bytes: *const u8,
    len: usize,
) -> OsStatus {
    guarded(|| {
        // SAFETY: forwarded from the caller.
        let (store, service, user) = unsafe { lookup(store, service, user)? };
        let secret = match (bytes.is_null(), len) {
            (_, 0) => &[][..],
            (true, _) => return Err(bad_request()),
            // SAFETY: caller guarantees `bytes` is readable for `len` bytes.
            (false, _) => unsafe { slice::from_raw_parts(bytes, len) },
        };
        store.storage.set(service, user, secret)?;
        store.forget_item(service, user);
        Ok(())
    })
}

/// Writes the item into the caller's buffer.
///
/// `*out_len` always receives the item length once the item is found. If the
/// item is longer than `capacity` nothing is written and
/// `errSecBufferTooSmall` is returned, so a call with a null buffer and zero
/// capacity queries the size. `out_len` is required.
///
/// # Safety
///
/// As for [`credshim_set_data`]; `out_buf` must be writable for `capacity`
/// bytes (or null with zero capacity) and `out_len` writable.
#[no_mangle]
pub unsafe extern "C" fn credshim_get_bytes(
    store: *mut c_void,
    service: *const c_char,
    user: *const c_char,
    out_buf: *mut u8,
    capacity: usize,
    out_len: *mut usize,
) -> OsStatus {
    guarded(|| {
        // SAFETY: forwarded from the caller.
        let (store, service, user) = unsafe { lookup(store, service, user)? };
        if out_len.is_null() || (out_buf.is_null() && capacity != 0) {
            return Err(bad_request());
        }
        let bytes = Zeroizing::new(store.storage.get(service, user)?);
        // SAFETY: `out_len` is non-null and the caller guarantees it is writable.
        unsafe { *out_len = bytes.len() };
        if bytes.len() > capacity {
            return Err(StatusCode::from_raw(ERR_SEC_BUFFER_TOO_SMALL));
        }
        if !bytes.is_empty() {
            // SAFETY: `out_buf` is writable for `capacity >= bytes.len()` bytes.
            unsafe { ptr::copy_nonoverlapping(bytes.as_ptr(), out_buf, bytes.len()) };
        }
        Ok(())
    })
}

/// Removes the item. A missing item is reported as `errSecItemNotFound`.
///
/// # Safety
///
/// As for [`credshim_set_data`].
#[no_mangle]
pub unsafe extern "C" fn credshim_delete(
    store: *mut c_void,
    service: *const c_char,
    user: *const c_char,
) -> OsStatus {
    guarded(|| {
        // SAFETY: forwarded from the caller.
        let (store, service, user) = unsafe { lookup(store, service, user)? };
        store.storage.delete(service, user)?;
        store.forget_item(service, user);
        Ok(())
    })
}

// SAFETY (tests): every pointer passed below is null on purpose, a live
// `Fixture` store, a `CString` it owns, or a stack local that outlives the call.
#[cfg(test)]
mod tests {
    use std::ffi::CString;

    use super::*;
    use crate::status::{ERR_SEC_ITEM_NOT_FOUND, ERR_SEC_PARAM};

    struct Fixture {
        store: *mut c_void,
        service: CString,
        user: CString,
    }

    impl Fixture {
        fn new() -> Self {
            Self {
                store: credshim_store_new_memory(),
                service: CString::new("svc").expect("cstring"),
                user: CString::new("usr").expect("cstring"),
            }
        }

        fn set(&self, bytes: &[u8]) -> OsStatus {
            unsafe {
                credshim_set_bytes(
                    self.store,
                    self.service.as_ptr(),
                    self.user.as_ptr(),
                    bytes.as_ptr(),
                    bytes.len(),
                )
            }
        }

        fn borrow(&self) -> OwnedData {
            let mut out: ShimDataRef = ptr::null();
            let status = unsafe {
                credshim_get_data(self.store, self.service.as_ptr(), self.user.as_ptr(), &mut out)
            };
            assert_eq!(status, ERR_SEC_SUCCESS);
            unsafe { OwnedData::from_get_rule(out) }.expect("data")
        }

        fn delete(&self) -> OsStatus {
            unsafe { credshim_delete(self.store, self.service.as_ptr(), self.user.as_ptr()) }
        }
    }

    impl Drop for Fixture {
        fn drop(&mut self) {
            unsafe { credshim_store_free(self.store) };
        }
    }

    #[test]
    fn test_null_arguments_are_bad_requests() {
        let fx = Fixture::new();
        let (service, user) = (fx.service.as_ptr(), fx.user.as_ptr());
        let status = unsafe { credshim_delete(ptr::null_mut(), service, user) };
        assert_eq!(status, ERR_SEC_BAD_REQ);
        let status = unsafe { credshim_delete(fx.store, ptr::null(), fx.user.as_ptr()) };
        assert_eq!(status, ERR_SEC_BAD_REQ);
        let status = unsafe {
            credshim_set_data(fx.store, fx.service.as_ptr(), fx.user.as_ptr(), ptr::null())
        };
        assert_eq!(status, ERR_SEC_BAD_REQ);
        let status = unsafe {
            credshim_set_bytes(fx.store, fx.service.as_ptr(), fx.user.as_ptr(), ptr::null(), 3)
        };
        assert_eq!(status, ERR_SEC_BAD_REQ);
    }

    #[test]
    fn test_empty_name_is_param_error() {
        let fx = Fixture::new();
        let empty = CString::new("").expect("cstring");
        let status = unsafe { credshim_delete(fx.store, empty.as_ptr(), fx.user.as_ptr()) };
        assert_eq!(status, ERR_SEC_PARAM);
    }

    #[test]
    fn test_copy_data_transfers_ownership() {
        let fx = Fixture::new();
        assert_eq!(fx.set(b"secret"), ERR_SEC_SUCCESS);
        let mut out: ShimDataRef = ptr::null();
        let status = unsafe {
            credshim_copy_data(fx.store, fx.service.as_ptr(), fx.user.as_ptr(), &mut out)
        };
        assert_eq!(status, ERR_SEC_SUCCESS);
        let owned = unsafe { OwnedData::from_create_rule(out) }.expect("data");
        assert_eq!(owned.retain_count(), 1);
        assert_eq!(owned.as_bytes(), b"secret");
    }

    #[test]
    fn test_copy_data_with_null_out_reports_status_only() {
        let fx = Fixture::new();
        let status = unsafe {
            credshim_copy_data(fx.store, fx.service.as_ptr(), fx.user.as_ptr(), ptr::null_mut())
        };
        assert_eq!(status, ERR_SEC_ITEM_NOT_FOUND);
        assert_eq!(fx.set(b"x"), ERR_SEC_SUCCESS);
        let status = unsafe {
            credshim_copy_data(fx.store, fx.service.as_ptr(), fx.user.as_ptr(), ptr::null_mut())
        };
        assert_eq!(status, ERR_SEC_SUCCESS);
    }

    #[test]
    fn test_get_data_is_borrowed_until_next_call() {
        let fx = Fixture::new();
        assert_eq!(fx.set(b"first"), ERR_SEC_SUCCESS);
        let mut out: ShimDataRef = ptr::null();
        let status = unsafe {
            credshim_get_data(fx.store, fx.service.as_ptr(), fx.user.as_ptr(), &mut out)
        };
        assert_eq!(status, ERR_SEC_SUCCESS);
        let kept = unsafe { OwnedData::from_get_rule(out) }.expect("data");
        // the slot and our retain
        assert_eq!(kept.retain_count(), 2);

        assert_eq!(fx.set(b"second"), ERR_SEC_SUCCESS);
        let mut next: ShimDataRef = ptr::null();
        let status = unsafe {
            credshim_get_data(fx.store, fx.service.as_ptr(), fx.user.as_ptr(), &mut next)
        };
        assert_eq!(status, ERR_SEC_SUCCESS);
        assert_eq!(kept.retain_count(), 1);
        assert_eq!(kept.as_bytes(), b"first");
    }

    #[test]
    fn test_delete_releases_borrowed_object() {
        let fx = Fixture::new();
        assert_eq!(fx.set(b"secret"), ERR_SEC_SUCCESS);
        let kept = fx.borrow();
        assert_eq!(kept.retain_count(), 2);
        assert_eq!(fx.delete(), ERR_SEC_SUCCESS);
        assert_eq!(kept.retain_count(), 1);
    }

    #[test]
    fn test_overwrite_releases_borrowed_object() {
        let fx = Fixture::new();
        assert_eq!(fx.set(b"old"), ERR_SEC_SUCCESS);
        let kept = fx.borrow();
        assert_eq!(fx.set(b"new"), ERR_SEC_SUCCESS);
        assert_eq!(kept.retain_count(), 1);
        assert_eq!(kept.as_bytes(), b"old");
    }

    #[test]
    fn test_store_free_releases_borrowed_object() {
        let fx = Fixture::new();
        assert_eq!(fx.set(b"secret"), ERR_SEC_SUCCESS);
        let kept = fx.borrow();
        assert_eq!(kept.retain_count(), 2);
        drop(fx);
        assert_eq!(kept.retain_count(), 1);
    }

    #[test]
    fn test_other_store_keeps_borrowed_object() {
        let fx = Fixture::new();
        let other = Fixture::new();
        assert_eq!(fx.set(b"secret"), ERR_SEC_SUCCESS);
        assert_eq!(other.set(b"unrelated"), ERR_SEC_SUCCESS);
        let kept = fx.borrow();
        assert_eq!(other.delete(), ERR_SEC_SUCCESS);
        drop(other);
        assert_eq!(kept.retain_count(), 2);
        assert_eq!(fx.delete(), ERR_SEC_SUCCESS);
        assert_eq!(kept.retain_count(), 1);
    }

    #[test]
    fn test_get_bytes_reports_length_and_too_small() {
        let fx = Fixture::new();
        assert_eq!(fx.set(b"0123456789"), ERR_SEC_SUCCESS);
        let mut buf = [0xAAu8; 4];
        let mut len = 0usize;
        let status = unsafe {
            credshim_get_bytes(
                fx.store,
                fx.service.as_ptr(),
                fx.user.as_ptr(),
                buf.as_mut_ptr(),
                buf.len(),
                &mut len,
            )
        };
        assert_eq!(status, ERR_SEC_BUFFER_TOO_SMALL);
        assert_eq!(len, 10);
        assert_eq!(buf, [0xAA; 4]);
    }

    #[test]
    fn test_get_bytes_size_query() {
        let fx = Fixture::new();
        assert_eq!(fx.set(b"abc"), ERR_SEC_SUCCESS);
        let mut len = 0usize;
        let status = unsafe {
            credshim_get_bytes(
                fx.store,
                fx.service.as_ptr(),
                fx.user.as_ptr(),
                ptr::null_mut(),
                0,
                &mut len,
            )
        };
        assert_eq!(status, ERR_SEC_BUFFER_TOO_SMALL);
        assert_eq!(len, 3);
    }

    #[test]
    fn test_get_bytes_requires_length_cell() {
        let fx = Fixture::new();
        let mut buf = [0u8; 8];
        let status = unsafe {
            credshim_get_bytes(
                fx.store,
                fx.service.as_ptr(),
                fx.user.as_ptr(),
                buf.as_mut_ptr(),
                buf.len(),
                ptr::null_mut(),
            )
        };
        assert_eq!(status, ERR_SEC_BAD_REQ);
    }

    #[test]
    fn test_delete_twice() {
        let fx = Fixture::new();
        assert_eq!(fx.set(b"x"), ERR_SEC_SUCCESS);
        let delete = || unsafe { credshim_delete(fx.store, fx.service.as_ptr(), fx.user.as_ptr()) };
        assert_eq!(delete(), ERR_SEC_SUCCESS);
        assert_eq!(delete(), ERR_SEC_ITEM_NOT_FOUND);
    }
}
