//! Client for the legacy protocol generation.
//!
//! The legacy dialect predates length-prefixed spans: keys are C
//! strings, values cross the boundary through a fixed-capacity scratch
//! buffer, and statuses follow the loose convention where negative
//! means error, zero means absent and positive means present. The
//! binding keeps one scratch buffer per thread, created lazily and
//! reused across calls; its contents are valid only for one call and
//! are fully overwritten before each use, never trusted as zeroed
//! leftovers from a previous layout.

use crate::error::{engine_message, Error, Result};
use sortkv_engine::{
    sortkv_engine_close, sortkv_engine_get, sortkv_engine_open, sortkv_engine_put,
    sortkv_engine_remove, SortKvHandle, LEGACY_NOT_FOUND, LEGACY_OK, LEGACY_VALUE_TOO_LARGE,
};
use std::cell::RefCell;
use std::ffi::CString;

/// Default scratch-buffer capacity in bytes.
pub const DEFAULT_CAPACITY: usize = 1024;

thread_local! {
    // One marshaling buffer per thread; lazily created, retained across
    // calls, never shared between threads.
    static SCRATCH: RefCell<Vec<u8>> = const { RefCell::new(Vec::new()) };
}

/// One open engine instance, driven over the legacy protocol.
///
/// Values longer than the configured capacity fail with
/// [`Error::CapacityExceeded`]; the binding never truncates. Keys are
/// text in this dialect and must not contain NUL bytes.
#[derive(Debug)]
pub struct KvEngine {
    handle: *mut SortKvHandle,
    capacity: usize,
    closed: bool,
}

impl KvEngine {
    /// Opens an engine over its pool path and size, with the default
    /// scratch capacity.
    pub fn open(engine: &str, path: &str, size: u64) -> Result<Self> {
        Self::open_with_capacity(engine, path, size, DEFAULT_CAPACITY)
    }

    /// Opens an engine with an explicit scratch capacity.
    pub fn open_with_capacity(
        engine: &str,
        path: &str,
        size: u64,
        capacity: usize,
    ) -> Result<Self> {
        let engine_c = c_key(engine)?;
        let path_c = c_key(path)?;
        let handle = unsafe { sortkv_engine_open(engine_c.as_ptr(), path_c.as_ptr(), size) };
        if handle.is_null() {
            return Err(Error::Open(
                engine_message().unwrap_or_else(|| "unable to open persistent pool".to_string()),
            ));
        }
        tracing::debug!(engine, path, "legacy engine opened");
        Ok(Self {
            handle,
            capacity,
            closed: false,
        })
    }

    /// Closes the engine. Idempotent.
    pub fn close(&mut self) {
        if !self.closed {
            self.closed = true;
            unsafe { sortkv_engine_close(self.handle) };
        }
    }

    /// Returns true once [`KvEngine::close`] has run.
    pub fn closed(&self) -> bool {
        self.closed
    }

    fn live(&self) -> Result<*mut SortKvHandle> {
        if self.closed {
            return Err(Error::Closed);
        }
        Ok(self.handle)
    }

    /// Returns the value stored under `key`, or `None` if absent.
    pub fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        let handle = self.live()?;
        let key = c_key(key)?;

        SCRATCH.with(|cell| {
            let mut buf = cell.borrow_mut();
            reset(&mut buf, self.capacity);

            let mut value_len: i32 = 0;
            let rc = unsafe {
                sortkv_engine_get(
                    handle,
                    key.as_ptr(),
                    self.capacity as i32,
                    buf.as_mut_ptr(),
                    &mut value_len,
                )
            };
            match rc {
                LEGACY_OK => Ok(Some(buf[..value_len as usize].to_vec())),
                LEGACY_NOT_FOUND => Ok(None),
                LEGACY_VALUE_TOO_LARGE => Err(Error::CapacityExceeded {
                    needed: value_len as usize,
                    capacity: self.capacity,
                }),
                _ => Err(Error::Get),
            }
        })
    }

    /// Like [`KvEngine::get`], decoding the value as UTF-8 text.
    pub fn get_string(&self, key: &str) -> Result<Option<String>> {
        Ok(self
            .get(key)?
            .map(|bytes| String::from_utf8_lossy(&bytes).into_owned()))
    }

    /// Upserts a record. The value is staged through the scratch
    /// buffer and must fit its capacity.
    pub fn put(&self, key: &str, value: impl AsRef<[u8]>) -> Result<()> {
        let handle = self.live()?;
        let key = c_key(key)?;
        let value = value.as_ref();

        if value.len() > self.capacity {
            return Err(Error::CapacityExceeded {
                needed: value.len(),
                capacity: self.capacity,
            });
        }

        SCRATCH.with(|cell| {
            let mut buf = cell.borrow_mut();
            reset(&mut buf, self.capacity);
            buf[..value.len()].copy_from_slice(value);

            let value_len = value.len() as i32;
            let rc =
                unsafe { sortkv_engine_put(handle, key.as_ptr(), buf.as_ptr(), &value_len) };
            if rc == LEGACY_OK {
                Ok(())
            } else {
                Err(Error::Put)
            }
        })
    }

    /// Removes the record with `key`. Returns true if a record existed
    /// and was removed.
    pub fn remove(&self, key: &str) -> Result<bool> {
        let handle = self.live()?;
        let key = c_key(key)?;
        let rc = unsafe { sortkv_engine_remove(handle, key.as_ptr()) };
        match rc {
            LEGACY_OK => Ok(true),
            LEGACY_NOT_FOUND => Ok(false),
            _ => Err(Error::Remove),
        }
    }
}

impl Drop for KvEngine {
    fn drop(&mut self) {
        self.close();
    }
}

/// Fully overwrites the scratch buffer for a fresh call layout.
fn reset(buf: &mut Vec<u8>, capacity: usize) {
    buf.clear();
    buf.resize(capacity, 0);
}

fn c_key(text: &str) -> Result<CString> {
    CString::new(text)
        .map_err(|_| Error::InvalidArgument("legacy keys cannot contain NUL bytes".to_string()))
}
