//! The legacy C ABI generation.
//!
//! Before the length-prefixed protocol, clients spoke a looser dialect:
//! keys travel as null-terminated C strings, values through a
//! caller-owned fixed-capacity buffer, and results as a signed byte
//! where negative means error, zero means absent and positive means
//! present. Kept for binary compatibility with old bindings; new code
//! should use the `sortkv_*` entry points.

use crate::config::{ConfigValue, NativeConfig};
use crate::database::SortKvHandle;
use crate::engine::{open_engine, Engine};
use crate::error::{clear_last_error, set_last_error};
use parking_lot::RwLock;
use std::ffi::{c_char, CStr};

/// Legacy result: operation succeeded / record present.
pub const LEGACY_OK: i8 = 1;
/// Legacy result: record absent.
pub const LEGACY_NOT_FOUND: i8 = 0;
/// Legacy result: generic failure.
pub const LEGACY_FAILED: i8 = -1;
/// Legacy result: the value does not fit the caller's buffer.
///
/// Earlier engine builds reported this as a bare failure, which forced
/// clients to truncate or guess; the distinct code lets them surface a
/// precise capacity error instead.
pub const LEGACY_VALUE_TOO_LARGE: i8 = -2;

struct LegacyHandle {
    engine: RwLock<Box<dyn Engine>>,
}

unsafe fn inner<'a>(handle: *mut SortKvHandle) -> &'a LegacyHandle {
    &*handle.cast::<LegacyHandle>()
}

/// Opens an engine instance the legacy way: engine name, pool path and
/// pool size, no config object.
///
/// Returns null on failure; the failure message is then available from
/// [`crate::sortkv_errormsg`].
///
/// # Safety
///
/// `engine` and `path` must be valid null-terminated strings.
#[no_mangle]
pub unsafe extern "C" fn sortkv_engine_open(
    engine: *const c_char,
    path: *const c_char,
    size: u64,
) -> *mut SortKvHandle {
    clear_last_error();

    if engine.is_null() || path.is_null() {
        set_last_error("null pointer argument");
        return std::ptr::null_mut();
    }

    let (Ok(name), Ok(path)) = (CStr::from_ptr(engine).to_str(), CStr::from_ptr(path).to_str())
    else {
        set_last_error("engine name or path is not valid UTF-8");
        return std::ptr::null_mut();
    };

    let mut config = NativeConfig::new();
    // Reserved names with the right types; neither put can fail.
    let _ = config.put("path", ConfigValue::String(path.to_string()));
    let _ = config.put("size", ConfigValue::Uint64(size));

    match open_engine(name, &config) {
        Ok(boxed) => Box::into_raw(Box::new(LegacyHandle {
            engine: RwLock::new(boxed),
        }))
        .cast::<SortKvHandle>(),
        Err(message) => {
            set_last_error(message);
            std::ptr::null_mut()
        }
    }
}

/// Closes a legacy engine handle.
///
/// # Safety
///
/// `handle` must have been returned by [`sortkv_engine_open`] and must
/// not be used after this call. Passing null is a no-op.
#[no_mangle]
pub unsafe extern "C" fn sortkv_engine_close(handle: *mut SortKvHandle) {
    if !handle.is_null() {
        drop(Box::from_raw(handle.cast::<LegacyHandle>()));
    }
}

/// Looks up a record, copying its value into the caller's buffer.
///
/// Writes the value length to `value_len` and the bytes to `value`.
/// Returns [`LEGACY_OK`] if found, [`LEGACY_NOT_FOUND`] if absent, and
/// [`LEGACY_VALUE_TOO_LARGE`] when the value exceeds `limit` (in which
/// case `value_len` still receives the full length and `value` is left
/// untouched).
///
/// # Safety
///
/// - `handle` must be a valid legacy engine handle
/// - `key` must be a valid null-terminated string
/// - `value` must be valid for `limit` bytes
/// - `value_len` must be a valid pointer
#[no_mangle]
pub unsafe extern "C" fn sortkv_engine_get(
    handle: *mut SortKvHandle,
    key: *const c_char,
    limit: i32,
    value: *mut u8,
    value_len: *mut i32,
) -> i8 {
    clear_last_error();

    if handle.is_null() || key.is_null() || value.is_null() || value_len.is_null() || limit < 0 {
        set_last_error("null pointer argument");
        return LEGACY_FAILED;
    }

    let db = inner(handle);
    let guard = db.engine.read();
    match guard.get(CStr::from_ptr(key).to_bytes()) {
        Some(found) => {
            *value_len = found.len() as i32;
            if found.len() > limit as usize {
                return LEGACY_VALUE_TOO_LARGE;
            }
            std::ptr::copy_nonoverlapping(found.as_ptr(), value, found.len());
            LEGACY_OK
        }
        None => LEGACY_NOT_FOUND,
    }
}

/// Upserts a record from the caller's buffer.
///
/// Returns [`LEGACY_OK`] on success.
///
/// # Safety
///
/// - `handle` must be a valid legacy engine handle
/// - `key` must be a valid null-terminated string
/// - `value` must be valid for `*value_len` bytes
/// - `value_len` must be a valid pointer to a non-negative length
#[no_mangle]
pub unsafe extern "C" fn sortkv_engine_put(
    handle: *mut SortKvHandle,
    key: *const c_char,
    value: *const u8,
    value_len: *const i32,
) -> i8 {
    clear_last_error();

    if handle.is_null() || key.is_null() || value.is_null() || value_len.is_null() {
        set_last_error("null pointer argument");
        return LEGACY_FAILED;
    }

    let len = *value_len;
    if len < 0 {
        set_last_error("negative value length");
        return LEGACY_FAILED;
    }

    let bytes = if len == 0 {
        &[]
    } else {
        std::slice::from_raw_parts(value, len as usize)
    };

    let db = inner(handle);
    db.engine.write().put(CStr::from_ptr(key).to_bytes(), bytes);
    LEGACY_OK
}

/// Removes a record.
///
/// Returns [`LEGACY_OK`] if a record was removed, [`LEGACY_NOT_FOUND`]
/// otherwise.
///
/// # Safety
///
/// - `handle` must be a valid legacy engine handle
/// - `key` must be a valid null-terminated string
#[no_mangle]
pub unsafe extern "C" fn sortkv_engine_remove(handle: *mut SortKvHandle, key: *const c_char) -> i8 {
    clear_last_error();

    if handle.is_null() || key.is_null() {
        set_last_error("null pointer argument");
        return LEGACY_FAILED;
    }

    let db = inner(handle);
    if db.engine.write().remove(CStr::from_ptr(key).to_bytes()) {
        LEGACY_OK
    } else {
        LEGACY_NOT_FOUND
    }
}
