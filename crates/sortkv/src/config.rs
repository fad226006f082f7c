//! Safe builder for the engine's opaque configuration object.

use crate::error::{engine_message, Error, Result};
use sortkv_engine::{
    sortkv_config_delete, sortkv_config_from_json, sortkv_config_new, sortkv_config_put_data,
    sortkv_config_put_double, sortkv_config_put_int64, sortkv_config_put_string,
    sortkv_config_put_uint64, SortKvConfig, SortKvStatus,
};
use std::ffi::CString;

/// A native engine configuration under construction.
///
/// Wraps the engine's opaque config object. The native object is
/// created by [`Config::new`] and released by `Drop`, so deletion
/// happens on every path, including the error paths of whatever
/// consumed the config. Opening a database consumes the `Config`; the
/// engine only reads it, and the wrapper deletes it afterwards whether
/// or not the open succeeded.
#[derive(Debug)]
pub struct Config {
    raw: *mut SortKvConfig,
}

impl Config {
    /// Allocates a new, empty configuration.
    pub fn new() -> Result<Self> {
        let raw = sortkv_config_new();
        if raw.is_null() {
            return Err(Error::Alloc);
        }
        Ok(Self { raw })
    }

    /// Builds a configuration from a JSON object document.
    ///
    /// Recognized keys are `path` (string) and `size` (non-negative
    /// integer); unrecognized keys pass through to the engine. A
    /// malformed document or a mistyped recognized option fails with
    /// [`Error::ConfigParse`].
    pub fn from_json(json: &str) -> Result<Self> {
        let config = Self::new()?;
        let text = CString::new(json)
            .map_err(|_| Error::ConfigParse("JSON text contains a NUL byte".to_string()))?;

        let status = unsafe { sortkv_config_from_json(config.raw, text.as_ptr()) };
        if status.is_err() {
            // The native object stays valid after a failed parse; the
            // wrapper's Drop still deletes it.
            return Err(Error::ConfigParse(
                engine_message().unwrap_or_else(|| "config parsing failed".to_string()),
            ));
        }
        Ok(config)
    }

    /// Sets a string option.
    pub fn put_string(&mut self, name: &str, value: &str) -> Result<()> {
        let value = c_string(value)?;
        self.put(name, |raw, name| unsafe {
            sortkv_config_put_string(raw, name, value.as_ptr())
        })
    }

    /// Sets an unsigned 64-bit integer option.
    pub fn put_uint64(&mut self, name: &str, value: u64) -> Result<()> {
        self.put(name, |raw, name| unsafe {
            sortkv_config_put_uint64(raw, name, value)
        })
    }

    /// Sets a signed 64-bit integer option.
    pub fn put_int64(&mut self, name: &str, value: i64) -> Result<()> {
        self.put(name, |raw, name| unsafe {
            sortkv_config_put_int64(raw, name, value)
        })
    }

    /// Sets a double-precision float option.
    pub fn put_double(&mut self, name: &str, value: f64) -> Result<()> {
        self.put(name, |raw, name| unsafe {
            sortkv_config_put_double(raw, name, value)
        })
    }

    /// Sets an opaque binary option.
    pub fn put_data(&mut self, name: &str, value: &[u8]) -> Result<()> {
        self.put(name, |raw, name| unsafe {
            sortkv_config_put_data(raw, name, value.as_ptr(), value.len())
        })
    }

    fn put(
        &mut self,
        name: &str,
        call: impl FnOnce(*mut SortKvConfig, *const std::ffi::c_char) -> SortKvStatus,
    ) -> Result<()> {
        let name = c_string(name)?;
        let status = call(self.raw, name.as_ptr());
        if status.is_err() {
            return Err(Error::InvalidArgument(
                engine_message().unwrap_or_else(|| "option rejected".to_string()),
            ));
        }
        Ok(())
    }

    /// The raw handle, for the open call.
    pub(crate) fn as_ptr(&self) -> *mut SortKvConfig {
        self.raw
    }
}

impl Drop for Config {
    fn drop(&mut self) {
        unsafe { sortkv_config_delete(self.raw) };
    }
}

fn c_string(text: &str) -> Result<CString> {
    CString::new(text).map_err(|_| Error::InvalidArgument("string contains a NUL byte".to_string()))
}
