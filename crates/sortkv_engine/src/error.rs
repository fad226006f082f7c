//! Last-error message storage for the C ABI.

use std::cell::RefCell;
use std::ffi::CString;

// Thread-local storage for the last error message.
thread_local! {
    static LAST_ERROR: RefCell<Option<CString>> = const { RefCell::new(None) };
}

/// Sets the last error message for the calling thread.
pub fn set_last_error(message: impl Into<String>) {
    let msg = message.into();
    LAST_ERROR.with(|e| {
        *e.borrow_mut() = CString::new(msg).ok();
    });
}

/// Clears the last error message for the calling thread.
pub fn clear_last_error() {
    LAST_ERROR.with(|e| {
        *e.borrow_mut() = None;
    });
}

/// Returns the last error message as a C string, or null if none is set.
///
/// # Safety
///
/// The returned pointer is valid until the next engine call on this thread.
#[no_mangle]
pub extern "C" fn sortkv_errormsg() -> *const std::ffi::c_char {
    LAST_ERROR.with(|e| match e.borrow().as_ref() {
        Some(cstr) => cstr.as_ptr(),
        None => std::ptr::null(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn last_error_roundtrip() {
        clear_last_error();
        assert!(sortkv_errormsg().is_null());

        set_last_error("unknown engine name");
        let ptr = sortkv_errormsg();
        assert!(!ptr.is_null());

        let msg = unsafe { std::ffi::CStr::from_ptr(ptr) };
        assert_eq!(msg.to_str().unwrap(), "unknown engine name");

        clear_last_error();
        assert!(sortkv_errormsg().is_null());
    }
}
