//! The length-prefixed C ABI: open/close, point and range operations.

use crate::config::{NativeConfig, SortKvConfig};
use crate::engine::{open_engine, Engine, KeyRange};
use crate::error::{clear_last_error, set_last_error};
use crate::status::SortKvStatus;
use parking_lot::RwLock;
use std::ffi::{c_char, c_void, CStr, CString};

/// An opaque handle to one open engine instance.
///
/// This is a pointer to the internal engine structure.
/// Never dereference or modify directly.
#[repr(C)]
pub struct SortKvHandle {
    _private: [u8; 0],
}

/// Per-record callback delivering a value.
pub type SortKvGetCallback =
    unsafe extern "C" fn(value: *const u8, value_len: usize, ctx: *mut c_void);

/// Per-record callback delivering a key.
pub type SortKvKeyCallback = unsafe extern "C" fn(key: *const u8, key_len: usize, ctx: *mut c_void);

/// Per-record callback delivering a key and its value.
pub type SortKvKeyValueCallback = unsafe extern "C" fn(
    key: *const u8,
    key_len: usize,
    value: *const u8,
    value_len: usize,
    ctx: *mut c_void,
);

/// Callback invoked when an open attempt fails, carrying the engine
/// name, the configuration that was supplied, and a failure message.
pub type SortKvFailureCallback = unsafe extern "C" fn(
    engine: *const c_char,
    config: *mut SortKvConfig,
    message: *const c_char,
    ctx: *mut c_void,
);

/// The structure behind [`SortKvHandle`].
///
/// The engine may be driven from several threads; the lock is the
/// engine's own internal serialization, not something the client
/// binding provides.
struct HandleInner {
    engine: RwLock<Box<dyn Engine>>,
}

unsafe fn inner<'a>(handle: *mut SortKvHandle) -> &'a HandleInner {
    &*handle.cast::<HandleInner>()
}

/// Builds a byte slice from a pointer/length pair.
///
/// A null pointer is only legal with a zero length (the empty key or
/// value); the caller has already policed the non-zero case.
unsafe fn span<'a>(ptr: *const u8, len: usize) -> &'a [u8] {
    if len == 0 {
        &[]
    } else {
        std::slice::from_raw_parts(ptr, len)
    }
}

fn bad_span(ptr: *const u8, len: usize) -> bool {
    ptr.is_null() && len > 0
}

/// Opens an engine instance by name.
///
/// The configuration is only read; the caller keeps ownership and must
/// delete it after this call, whether or not the open succeeded. On
/// failure, `on_failure` (when supplied) is invoked with the engine
/// name, the configuration, and a message describing the failure.
///
/// # Safety
///
/// - `engine` must be a valid null-terminated string
/// - `config` must be a valid configuration handle
/// - `out_handle` must be a valid pointer
/// - `on_failure`, if present, must be safe to call with `ctx`
#[no_mangle]
pub unsafe extern "C" fn sortkv_open(
    engine: *const c_char,
    config: *mut SortKvConfig,
    out_handle: *mut *mut SortKvHandle,
    on_failure: Option<SortKvFailureCallback>,
    ctx: *mut c_void,
) -> SortKvStatus {
    clear_last_error();

    if engine.is_null() || config.is_null() || out_handle.is_null() {
        set_last_error("null pointer argument");
        return SortKvStatus::InvalidArgument;
    }

    let fail = |message: String| -> SortKvStatus {
        tracing::debug!(message = %message, "engine open failed");
        if let Some(cb) = on_failure {
            if let Ok(c_message) = CString::new(message.clone()) {
                cb(engine, config, c_message.as_ptr(), ctx);
            }
        }
        set_last_error(message);
        SortKvStatus::Failed
    };

    let Ok(name) = CStr::from_ptr(engine).to_str() else {
        return fail("engine name is not valid UTF-8".to_string());
    };

    let cfg = &*config.cast::<NativeConfig>();
    match open_engine(name, cfg) {
        Ok(boxed) => {
            let handle = Box::new(HandleInner {
                engine: RwLock::new(boxed),
            });
            *out_handle = Box::into_raw(handle).cast::<SortKvHandle>();
            tracing::debug!(engine = name, "engine opened");
            SortKvStatus::Ok
        }
        Err(message) => fail(message),
    }
}

/// Closes an engine instance.
///
/// # Safety
///
/// `handle` must have been returned by [`sortkv_open`] and must not be
/// used after this call. Passing null is a no-op.
#[no_mangle]
pub unsafe extern "C" fn sortkv_close(handle: *mut SortKvHandle) {
    if !handle.is_null() {
        drop(Box::from_raw(handle.cast::<HandleInner>()));
        tracing::debug!("engine closed");
    }
}

/// Upserts a record.
///
/// # Safety
///
/// - `handle` must be a valid engine handle
/// - `key` must be valid for `key_len` bytes, `value` for `value_len`
///   (either may be null when its length is zero)
#[no_mangle]
pub unsafe extern "C" fn sortkv_put(
    handle: *mut SortKvHandle,
    key: *const u8,
    key_len: usize,
    value: *const u8,
    value_len: usize,
) -> SortKvStatus {
    clear_last_error();

    if handle.is_null() || bad_span(key, key_len) || bad_span(value, value_len) {
        set_last_error("null pointer argument");
        return SortKvStatus::InvalidArgument;
    }

    let db = inner(handle);
    db.engine
        .write()
        .put(span(key, key_len), span(value, value_len));
    SortKvStatus::Ok
}

/// Looks up a record, delivering its value through `callback`.
///
/// The value pointer passed to the callback is valid only for the
/// duration of the callback invocation.
///
/// # Safety
///
/// - `handle` must be a valid engine handle
/// - `key` must be valid for `key_len` bytes
/// - `callback` must be safe to call with `ctx`
#[no_mangle]
pub unsafe extern "C" fn sortkv_get(
    handle: *mut SortKvHandle,
    key: *const u8,
    key_len: usize,
    callback: SortKvGetCallback,
    ctx: *mut c_void,
) -> SortKvStatus {
    clear_last_error();

    if handle.is_null() || bad_span(key, key_len) {
        set_last_error("null pointer argument");
        return SortKvStatus::InvalidArgument;
    }

    let db = inner(handle);
    let guard = db.engine.read();
    match guard.get(span(key, key_len)) {
        Some(value) => {
            callback(value.as_ptr(), value.len(), ctx);
            SortKvStatus::Ok
        }
        None => SortKvStatus::NotFound,
    }
}

/// Reports whether a record exists.
///
/// Returns `Ok` if present, `NotFound` if absent.
///
/// # Safety
///
/// - `handle` must be a valid engine handle
/// - `key` must be valid for `key_len` bytes
#[no_mangle]
pub unsafe extern "C" fn sortkv_exists(
    handle: *mut SortKvHandle,
    key: *const u8,
    key_len: usize,
) -> SortKvStatus {
    clear_last_error();

    if handle.is_null() || bad_span(key, key_len) {
        set_last_error("null pointer argument");
        return SortKvStatus::InvalidArgument;
    }

    if inner(handle).engine.read().exists(span(key, key_len)) {
        SortKvStatus::Ok
    } else {
        SortKvStatus::NotFound
    }
}

/// Removes a record.
///
/// Returns `Ok` if a record was removed, `NotFound` otherwise.
///
/// # Safety
///
/// - `handle` must be a valid engine handle
/// - `key` must be valid for `key_len` bytes
#[no_mangle]
pub unsafe extern "C" fn sortkv_remove(
    handle: *mut SortKvHandle,
    key: *const u8,
    key_len: usize,
) -> SortKvStatus {
    clear_last_error();

    if handle.is_null() || bad_span(key, key_len) {
        set_last_error("null pointer argument");
        return SortKvStatus::InvalidArgument;
    }

    if inner(handle).engine.write().remove(span(key, key_len)) {
        SortKvStatus::Ok
    } else {
        SortKvStatus::NotFound
    }
}

unsafe fn count_range(
    handle: *mut SortKvHandle,
    range: &KeyRange,
    out_count: *mut usize,
) -> SortKvStatus {
    clear_last_error();

    if handle.is_null() || out_count.is_null() {
        set_last_error("null pointer argument");
        return SortKvStatus::InvalidArgument;
    }

    *out_count = inner(handle).engine.read().count(range);
    SortKvStatus::Ok
}

/// Counts all records.
///
/// # Safety
///
/// `handle` must be a valid engine handle and `out_count` a valid pointer.
#[no_mangle]
pub unsafe extern "C" fn sortkv_count_all(
    handle: *mut SortKvHandle,
    out_count: *mut usize,
) -> SortKvStatus {
    count_range(handle, &KeyRange::all(), out_count)
}

/// Counts records with keys strictly above `key`.
///
/// # Safety
///
/// `handle` must be a valid engine handle, `key` valid for `key_len`
/// bytes, and `out_count` a valid pointer.
#[no_mangle]
pub unsafe extern "C" fn sortkv_count_above(
    handle: *mut SortKvHandle,
    key: *const u8,
    key_len: usize,
    out_count: *mut usize,
) -> SortKvStatus {
    if bad_span(key, key_len) {
        set_last_error("null pointer argument");
        return SortKvStatus::InvalidArgument;
    }
    count_range(handle, &KeyRange::above(span(key, key_len)), out_count)
}

/// Counts records with keys strictly below `key`.
///
/// # Safety
///
/// `handle` must be a valid engine handle, `key` valid for `key_len`
/// bytes, and `out_count` a valid pointer.
#[no_mangle]
pub unsafe extern "C" fn sortkv_count_below(
    handle: *mut SortKvHandle,
    key: *const u8,
    key_len: usize,
    out_count: *mut usize,
) -> SortKvStatus {
    if bad_span(key, key_len) {
        set_last_error("null pointer argument");
        return SortKvStatus::InvalidArgument;
    }
    count_range(handle, &KeyRange::below(span(key, key_len)), out_count)
}

/// Counts records with keys strictly between `key1` and `key2`.
///
/// An inverted or empty interval counts zero records.
///
/// # Safety
///
/// `handle` must be a valid engine handle, both keys valid for their
/// lengths, and `out_count` a valid pointer.
#[no_mangle]
pub unsafe extern "C" fn sortkv_count_between(
    handle: *mut SortKvHandle,
    key1: *const u8,
    key1_len: usize,
    key2: *const u8,
    key2_len: usize,
    out_count: *mut usize,
) -> SortKvStatus {
    if bad_span(key1, key1_len) || bad_span(key2, key2_len) {
        set_last_error("null pointer argument");
        return SortKvStatus::InvalidArgument;
    }
    count_range(
        handle,
        &KeyRange::between(span(key1, key1_len), span(key2, key2_len)),
        out_count,
    )
}

unsafe fn visit_keys(
    handle: *mut SortKvHandle,
    range: &KeyRange,
    callback: SortKvKeyCallback,
    ctx: *mut c_void,
) -> SortKvStatus {
    clear_last_error();

    if handle.is_null() {
        set_last_error("null pointer argument");
        return SortKvStatus::InvalidArgument;
    }

    let db = inner(handle);
    let guard = db.engine.read();
    guard.visit(range, &mut |k, _v| callback(k.as_ptr(), k.len(), ctx));
    SortKvStatus::Ok
}

unsafe fn visit_pairs(
    handle: *mut SortKvHandle,
    range: &KeyRange,
    callback: SortKvKeyValueCallback,
    ctx: *mut c_void,
) -> SortKvStatus {
    clear_last_error();

    if handle.is_null() {
        set_last_error("null pointer argument");
        return SortKvStatus::InvalidArgument;
    }

    let db = inner(handle);
    let guard = db.engine.read();
    guard.visit(range, &mut |k, v| {
        callback(k.as_ptr(), k.len(), v.as_ptr(), v.len(), ctx);
    });
    SortKvStatus::Ok
}

/// Delivers every key, ascending, through `callback`.
///
/// Key pointers are valid only for the duration of each callback
/// invocation.
///
/// # Safety
///
/// `handle` must be a valid engine handle; `callback` must be safe to
/// call with `ctx`.
#[no_mangle]
pub unsafe extern "C" fn sortkv_all(
    handle: *mut SortKvHandle,
    callback: SortKvKeyCallback,
    ctx: *mut c_void,
) -> SortKvStatus {
    visit_keys(handle, &KeyRange::all(), callback, ctx)
}

/// Delivers keys strictly above `key`, ascending.
///
/// # Safety
///
/// Same as [`sortkv_all`]; `key` must be valid for `key_len` bytes.
#[no_mangle]
pub unsafe extern "C" fn sortkv_all_above(
    handle: *mut SortKvHandle,
    key: *const u8,
    key_len: usize,
    callback: SortKvKeyCallback,
    ctx: *mut c_void,
) -> SortKvStatus {
    if bad_span(key, key_len) {
        set_last_error("null pointer argument");
        return SortKvStatus::InvalidArgument;
    }
    visit_keys(handle, &KeyRange::above(span(key, key_len)), callback, ctx)
}

/// Delivers keys strictly below `key`, ascending.
///
/// # Safety
///
/// Same as [`sortkv_all`]; `key` must be valid for `key_len` bytes.
#[no_mangle]
pub unsafe extern "C" fn sortkv_all_below(
    handle: *mut SortKvHandle,
    key: *const u8,
    key_len: usize,
    callback: SortKvKeyCallback,
    ctx: *mut c_void,
) -> SortKvStatus {
    if bad_span(key, key_len) {
        set_last_error("null pointer argument");
        return SortKvStatus::InvalidArgument;
    }
    visit_keys(handle, &KeyRange::below(span(key, key_len)), callback, ctx)
}

/// Delivers keys strictly between `key1` and `key2`, ascending.
///
/// An inverted or empty interval delivers nothing.
///
/// # Safety
///
/// Same as [`sortkv_all`]; both keys must be valid for their lengths.
#[no_mangle]
pub unsafe extern "C" fn sortkv_all_between(
    handle: *mut SortKvHandle,
    key1: *const u8,
    key1_len: usize,
    key2: *const u8,
    key2_len: usize,
    callback: SortKvKeyCallback,
    ctx: *mut c_void,
) -> SortKvStatus {
    if bad_span(key1, key1_len) || bad_span(key2, key2_len) {
        set_last_error("null pointer argument");
        return SortKvStatus::InvalidArgument;
    }
    visit_keys(
        handle,
        &KeyRange::between(span(key1, key1_len), span(key2, key2_len)),
        callback,
        ctx,
    )
}

/// Delivers every record, ascending by key, through `callback`.
///
/// Key and value pointers are valid only for the duration of each
/// callback invocation.
///
/// # Safety
///
/// `handle` must be a valid engine handle; `callback` must be safe to
/// call with `ctx`.
#[no_mangle]
pub unsafe extern "C" fn sortkv_each(
    handle: *mut SortKvHandle,
    callback: SortKvKeyValueCallback,
    ctx: *mut c_void,
) -> SortKvStatus {
    visit_pairs(handle, &KeyRange::all(), callback, ctx)
}

/// Delivers records with keys strictly above `key`, ascending.
///
/// # Safety
///
/// Same as [`sortkv_each`]; `key` must be valid for `key_len` bytes.
#[no_mangle]
pub unsafe extern "C" fn sortkv_each_above(
    handle: *mut SortKvHandle,
    key: *const u8,
    key_len: usize,
    callback: SortKvKeyValueCallback,
    ctx: *mut c_void,
) -> SortKvStatus {
    if bad_span(key, key_len) {
        set_last_error("null pointer argument");
        return SortKvStatus::InvalidArgument;
    }
    visit_pairs(handle, &KeyRange::above(span(key, key_len)), callback, ctx)
}

/// Delivers records with keys strictly below `key`, ascending.
///
/// # Safety
///
/// Same as [`sortkv_each`]; `key` must be valid for `key_len` bytes.
#[no_mangle]
pub unsafe extern "C" fn sortkv_each_below(
    handle: *mut SortKvHandle,
    key: *const u8,
    key_len: usize,
    callback: SortKvKeyValueCallback,
    ctx: *mut c_void,
) -> SortKvStatus {
    if bad_span(key, key_len) {
        set_last_error("null pointer argument");
        return SortKvStatus::InvalidArgument;
    }
    visit_pairs(handle, &KeyRange::below(span(key, key_len)), callback, ctx)
}

/// Delivers records with keys strictly between `key1` and `key2`,
/// ascending. An inverted or empty interval delivers nothing.
///
/// # Safety
///
/// Same as [`sortkv_each`]; both keys must be valid for their lengths.
#[no_mangle]
pub unsafe extern "C" fn sortkv_each_between(
    handle: *mut SortKvHandle,
    key1: *const u8,
    key1_len: usize,
    key2: *const u8,
    key2_len: usize,
    callback: SortKvKeyValueCallback,
    ctx: *mut c_void,
) -> SortKvStatus {
    if bad_span(key1, key1_len) || bad_span(key2, key2_len) {
        set_last_error("null pointer argument");
        return SortKvStatus::InvalidArgument;
    }
    visit_pairs(
        handle,
        &KeyRange::between(span(key1, key1_len), span(key2, key2_len)),
        callback,
        ctx,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::sortkv_config_new;

    unsafe extern "C" fn copy_value(value: *const u8, value_len: usize, ctx: *mut c_void) {
        let out = &mut *ctx.cast::<Option<Vec<u8>>>();
        *out = Some(span(value, value_len).to_vec());
    }

    unsafe extern "C" fn record_failure(
        _engine: *const c_char,
        _config: *mut SortKvConfig,
        message: *const c_char,
        ctx: *mut c_void,
    ) {
        let out = &mut *ctx.cast::<Option<String>>();
        *out = Some(CStr::from_ptr(message).to_string_lossy().into_owned());
    }

    unsafe fn open_blackhole() -> *mut SortKvHandle {
        let config = sortkv_config_new();
        let engine = CString::new("blackhole").unwrap();
        let mut handle: *mut SortKvHandle = std::ptr::null_mut();
        let status = sortkv_open(
            engine.as_ptr(),
            config,
            &mut handle,
            None,
            std::ptr::null_mut(),
        );
        crate::config::sortkv_config_delete(config);
        assert_eq!(status, SortKvStatus::Ok);
        handle
    }

    #[test]
    fn open_unknown_engine_reports_message() {
        unsafe {
            let config = sortkv_config_new();
            let engine = CString::new("nope.nope").unwrap();
            let mut handle: *mut SortKvHandle = std::ptr::null_mut();
            let mut message: Option<String> = None;

            let status = sortkv_open(
                engine.as_ptr(),
                config,
                &mut handle,
                Some(record_failure),
                std::ptr::addr_of_mut!(message).cast(),
            );
            crate::config::sortkv_config_delete(config);

            assert_eq!(status, SortKvStatus::Failed);
            assert!(handle.is_null());
            assert_eq!(message.as_deref(), Some("unknown engine name: nope.nope"));
        }
    }

    #[test]
    fn open_sorted_requires_existing_path() {
        unsafe {
            let dir = tempfile::tempdir().unwrap();
            let config = sortkv_config_new();
            let json = CString::new(format!(
                "{{\"path\":{:?},\"size\":1073741824}}",
                dir.path().to_string_lossy()
            ))
            .unwrap();
            assert_eq!(
                sortkv_config_from_json_helper(config, &json),
                SortKvStatus::Ok
            );

            let engine = CString::new("sorted").unwrap();
            let mut handle: *mut SortKvHandle = std::ptr::null_mut();
            let status = sortkv_open(
                engine.as_ptr(),
                config,
                &mut handle,
                None,
                std::ptr::null_mut(),
            );
            crate::config::sortkv_config_delete(config);
            assert_eq!(status, SortKvStatus::Ok);
            assert!(!handle.is_null());
            sortkv_close(handle);
        }
    }

    unsafe fn sortkv_config_from_json_helper(
        config: *mut SortKvConfig,
        json: &CString,
    ) -> SortKvStatus {
        crate::config::sortkv_config_from_json(config, json.as_ptr())
    }

    #[test]
    fn blackhole_point_ops_through_abi() {
        unsafe {
            let handle = open_blackhole();

            let status = sortkv_put(handle, b"key1".as_ptr(), 4, b"value123".as_ptr(), 8);
            assert_eq!(status, SortKvStatus::Ok);

            assert_eq!(
                sortkv_exists(handle, b"key1".as_ptr(), 4),
                SortKvStatus::NotFound
            );

            let mut value: Option<Vec<u8>> = None;
            let status = sortkv_get(
                handle,
                b"key1".as_ptr(),
                4,
                copy_value,
                std::ptr::addr_of_mut!(value).cast(),
            );
            assert_eq!(status, SortKvStatus::NotFound);
            assert!(value.is_none());

            let mut count = 99usize;
            assert_eq!(sortkv_count_all(handle, &mut count), SortKvStatus::Ok);
            assert_eq!(count, 0);

            // Blackhole acknowledges removals.
            assert_eq!(sortkv_remove(handle, b"key1".as_ptr(), 4), SortKvStatus::Ok);

            sortkv_close(handle);
        }
    }

    #[test]
    fn null_pointer_policing() {
        unsafe {
            assert_eq!(
                sortkv_put(std::ptr::null_mut(), b"k".as_ptr(), 1, b"v".as_ptr(), 1),
                SortKvStatus::InvalidArgument
            );
            let handle = open_blackhole();
            assert_eq!(
                sortkv_put(handle, std::ptr::null(), 3, b"v".as_ptr(), 1),
                SortKvStatus::InvalidArgument
            );
            // Zero-length spans may carry a null pointer.
            assert_eq!(
                sortkv_put(handle, std::ptr::null(), 0, std::ptr::null(), 0),
                SortKvStatus::Ok
            );
            sortkv_close(handle);
        }
    }
}
