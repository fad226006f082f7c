//! The engine handle and query facade.

use crate::config::Config;
use crate::error::{op_error, Error, Result};
use sortkv_engine::{
    sortkv_all, sortkv_all_above, sortkv_all_below, sortkv_all_between, sortkv_close,
    sortkv_count_above, sortkv_count_all, sortkv_count_below, sortkv_count_between, sortkv_each,
    sortkv_each_above, sortkv_each_below, sortkv_each_between, sortkv_exists, sortkv_get,
    sortkv_open, sortkv_put, sortkv_remove, SortKvConfig, SortKvHandle, SortKvStatus,
};
use std::ffi::{c_char, c_void, CStr, CString};

/// One open engine instance.
///
/// `Database` exclusively owns the opaque native handle. The lifecycle
/// is `open -> stop`, with [`Database::stop`] idempotent and every
/// other operation failing fast with [`Error::Closed`] once stopped;
/// dropping the handle stops it. The type is deliberately neither
/// `Send` nor `Sync`: the binding adds no serialization of its own, so
/// callers needing cross-thread access or single-writer discipline
/// must layer it themselves, to whatever extent the engine documents
/// as safe.
///
/// Keys and values are opaque byte sequences ordered by unsigned
/// byte-wise lexicographic comparison; they may be empty and may
/// contain embedded zero bytes. All range bounds are exclusive.
///
/// # Example
///
/// ```rust,ignore
/// use sortkv::Database;
///
/// let db = Database::open_json("sorted", "{\"path\":\"/dev/shm\",\"size\":1073741824}")?;
/// db.put("key1", "value1")?;
/// assert_eq!(db.get("key1")?, Some(b"value1".to_vec()));
/// ```
#[derive(Debug)]
pub struct Database {
    handle: *mut SortKvHandle,
    stopped: bool,
}

impl Database {
    /// Opens an engine instance by name, consuming `config`.
    ///
    /// The native config object is read by the engine and deleted here
    /// on every path, success or failure. When the open fails, the
    /// engine's failure callback supplies the message carried by
    /// [`Error::Open`]; if the engine gives none, a generic
    /// "engine open failed" is used instead.
    pub fn open(engine: &str, config: Config) -> Result<Self> {
        let name = CString::new(engine)
            .map_err(|_| Error::InvalidArgument("engine name contains a NUL byte".to_string()))?;

        let mut handle: *mut SortKvHandle = std::ptr::null_mut();
        let mut failure: Option<String> = None;
        let status = unsafe {
            sortkv_open(
                name.as_ptr(),
                config.as_ptr(),
                &mut handle,
                Some(capture_failure),
                std::ptr::addr_of_mut!(failure).cast(),
            )
        };
        // The engine has read the config; delete it regardless of outcome.
        drop(config);

        if status.is_err() || handle.is_null() {
            return Err(Error::Open(
                failure.unwrap_or_else(|| "engine open failed".to_string()),
            ));
        }
        tracing::debug!(engine, "database opened");
        Ok(Self {
            handle,
            stopped: false,
        })
    }

    /// Opens an engine instance from a JSON configuration document.
    pub fn open_json(engine: &str, json: &str) -> Result<Self> {
        Self::open(engine, Config::from_json(json)?)
    }

    /// Stops the engine instance.
    ///
    /// Idempotent: stopping an already-stopped database is a no-op.
    pub fn stop(&mut self) {
        if !self.stopped {
            self.stopped = true;
            unsafe { sortkv_close(self.handle) };
            tracing::debug!("database stopped");
        }
    }

    /// Returns true once [`Database::stop`] has run.
    pub fn stopped(&self) -> bool {
        self.stopped
    }

    fn live(&self) -> Result<*mut SortKvHandle> {
        if self.stopped {
            return Err(Error::Closed);
        }
        Ok(self.handle)
    }

    // --- point operations ------------------------------------------------

    /// Upserts a record. Overwrites silently if the key exists; empty
    /// keys and values are legal.
    pub fn put(&self, key: impl AsRef<[u8]>, value: impl AsRef<[u8]>) -> Result<()> {
        let handle = self.live()?;
        let key = key.as_ref();
        let value = value.as_ref();
        let status =
            unsafe { sortkv_put(handle, key.as_ptr(), key.len(), value.as_ptr(), value.len()) };
        match status {
            SortKvStatus::Ok => Ok(()),
            other => Err(op_error(other, Error::Put)),
        }
    }

    /// Returns the value stored under `key`, or `None` if absent.
    ///
    /// The engine reports the value length and delivers the bytes
    /// through a callback; the binding copies them exactly once into
    /// the returned buffer.
    pub fn get(&self, key: impl AsRef<[u8]>) -> Result<Option<Vec<u8>>> {
        let handle = self.live()?;
        let key = key.as_ref();
        let mut out: Option<Vec<u8>> = None;
        let status = unsafe {
            sortkv_get(
                handle,
                key.as_ptr(),
                key.len(),
                copy_value,
                std::ptr::addr_of_mut!(out).cast(),
            )
        };
        match status {
            SortKvStatus::Ok => Ok(out),
            SortKvStatus::NotFound => Ok(None),
            other => Err(op_error(other, Error::Get)),
        }
    }

    /// Like [`Database::get`], decoding the value as UTF-8 text.
    ///
    /// Decoding is lossy and applies only to the copy handed back; the
    /// stored bytes are untouched.
    pub fn get_string(&self, key: impl AsRef<[u8]>) -> Result<Option<String>> {
        Ok(self
            .get(key)?
            .map(|bytes| String::from_utf8_lossy(&bytes).into_owned()))
    }

    /// Returns true if a record with `key` exists. Does not allocate
    /// for the value.
    pub fn exists(&self, key: impl AsRef<[u8]>) -> Result<bool> {
        let handle = self.live()?;
        let key = key.as_ref();
        let status = unsafe { sortkv_exists(handle, key.as_ptr(), key.len()) };
        match status {
            SortKvStatus::Ok => Ok(true),
            SortKvStatus::NotFound => Ok(false),
            other => Err(op_error(other, Error::Get)),
        }
    }

    /// Removes the record with `key`. Returns true if a record existed
    /// and was removed, false if it did not exist.
    pub fn remove(&self, key: impl AsRef<[u8]>) -> Result<bool> {
        let handle = self.live()?;
        let key = key.as_ref();
        let status = unsafe { sortkv_remove(handle, key.as_ptr(), key.len()) };
        match status {
            SortKvStatus::Ok => Ok(true),
            SortKvStatus::NotFound => Ok(false),
            other => Err(op_error(other, Error::Remove)),
        }
    }

    // --- counted range queries -------------------------------------------

    /// Counts all records.
    pub fn count_all(&self) -> Result<usize> {
        let handle = self.live()?;
        let mut count = 0usize;
        let status = unsafe { sortkv_count_all(handle, &mut count) };
        finish_count(status, count)
    }

    /// Counts records with keys strictly above `key`.
    pub fn count_above(&self, key: impl AsRef<[u8]>) -> Result<usize> {
        let handle = self.live()?;
        let key = key.as_ref();
        let mut count = 0usize;
        let status = unsafe { sortkv_count_above(handle, key.as_ptr(), key.len(), &mut count) };
        finish_count(status, count)
    }

    /// Counts records with keys strictly below `key`.
    pub fn count_below(&self, key: impl AsRef<[u8]>) -> Result<usize> {
        let handle = self.live()?;
        let key = key.as_ref();
        let mut count = 0usize;
        let status = unsafe { sortkv_count_below(handle, key.as_ptr(), key.len(), &mut count) };
        finish_count(status, count)
    }

    /// Counts records with keys strictly between `key1` and `key2`.
    ///
    /// An inverted or empty interval (`key1 >= key2`) counts zero
    /// records; it is not an error.
    pub fn count_between(
        &self,
        key1: impl AsRef<[u8]>,
        key2: impl AsRef<[u8]>,
    ) -> Result<usize> {
        let handle = self.live()?;
        let key1 = key1.as_ref();
        let key2 = key2.as_ref();
        let mut count = 0usize;
        let status = unsafe {
            sortkv_count_between(
                handle,
                key1.as_ptr(),
                key1.len(),
                key2.as_ptr(),
                key2.len(),
                &mut count,
            )
        };
        finish_count(status, count)
    }

    // --- iterating range queries: keys only -------------------------------

    /// Invokes `f` once per key, in ascending lexicographic order.
    ///
    /// The slice is valid only for the duration of each invocation;
    /// handlers that need to keep a key copy it.
    pub fn all<F: FnMut(&[u8])>(&self, mut f: F) -> Result<()> {
        let handle = self.live()?;
        let status =
            unsafe { sortkv_all(handle, key_trampoline::<F>, std::ptr::addr_of_mut!(f).cast()) };
        finish_iteration(status)
    }

    /// Like [`Database::all`], restricted to keys strictly above `key`.
    pub fn all_above<F: FnMut(&[u8])>(&self, key: impl AsRef<[u8]>, mut f: F) -> Result<()> {
        let handle = self.live()?;
        let key = key.as_ref();
        let status = unsafe {
            sortkv_all_above(
                handle,
                key.as_ptr(),
                key.len(),
                key_trampoline::<F>,
                std::ptr::addr_of_mut!(f).cast(),
            )
        };
        finish_iteration(status)
    }

    /// Like [`Database::all`], restricted to keys strictly below `key`.
    pub fn all_below<F: FnMut(&[u8])>(&self, key: impl AsRef<[u8]>, mut f: F) -> Result<()> {
        let handle = self.live()?;
        let key = key.as_ref();
        let status = unsafe {
            sortkv_all_below(
                handle,
                key.as_ptr(),
                key.len(),
                key_trampoline::<F>,
                std::ptr::addr_of_mut!(f).cast(),
            )
        };
        finish_iteration(status)
    }

    /// Like [`Database::all`], restricted to keys strictly between
    /// `key1` and `key2`. An inverted or empty interval yields nothing.
    pub fn all_between<F: FnMut(&[u8])>(
        &self,
        key1: impl AsRef<[u8]>,
        key2: impl AsRef<[u8]>,
        mut f: F,
    ) -> Result<()> {
        let handle = self.live()?;
        let key1 = key1.as_ref();
        let key2 = key2.as_ref();
        let status = unsafe {
            sortkv_all_between(
                handle,
                key1.as_ptr(),
                key1.len(),
                key2.as_ptr(),
                key2.len(),
                key_trampoline::<F>,
                std::ptr::addr_of_mut!(f).cast(),
            )
        };
        finish_iteration(status)
    }

    /// Like [`Database::all`], decoding each key as UTF-8 text.
    pub fn all_strings<F: FnMut(&str)>(&self, mut f: F) -> Result<()> {
        self.all(|k| f(&String::from_utf8_lossy(k)))
    }

    /// Like [`Database::all_above`], decoding each key as UTF-8 text.
    pub fn all_strings_above<F: FnMut(&str)>(&self, key: impl AsRef<[u8]>, mut f: F) -> Result<()> {
        self.all_above(key, |k| f(&String::from_utf8_lossy(k)))
    }

    /// Like [`Database::all_below`], decoding each key as UTF-8 text.
    pub fn all_strings_below<F: FnMut(&str)>(&self, key: impl AsRef<[u8]>, mut f: F) -> Result<()> {
        self.all_below(key, |k| f(&String::from_utf8_lossy(k)))
    }

    /// Like [`Database::all_between`], decoding each key as UTF-8 text.
    pub fn all_strings_between<F: FnMut(&str)>(
        &self,
        key1: impl AsRef<[u8]>,
        key2: impl AsRef<[u8]>,
        mut f: F,
    ) -> Result<()> {
        self.all_between(key1, key2, |k| f(&String::from_utf8_lossy(k)))
    }

    /// Collects every key, ascending, into owned buffers.
    pub fn get_keys(&self) -> Result<Vec<Vec<u8>>> {
        let mut keys = Vec::new();
        self.all(|k| keys.push(k.to_vec()))?;
        Ok(keys)
    }

    // --- iterating range queries: keys and values --------------------------

    /// Invokes `f` once per record, in ascending key order.
    ///
    /// The slices are valid only for the duration of each invocation;
    /// handlers that need to retain data copy it.
    pub fn each<F: FnMut(&[u8], &[u8])>(&self, mut f: F) -> Result<()> {
        let handle = self.live()?;
        let status =
            unsafe { sortkv_each(handle, pair_trampoline::<F>, std::ptr::addr_of_mut!(f).cast()) };
        finish_iteration(status)
    }

    /// Like [`Database::each`], restricted to keys strictly above `key`.
    pub fn each_above<F: FnMut(&[u8], &[u8])>(
        &self,
        key: impl AsRef<[u8]>,
        mut f: F,
    ) -> Result<()> {
        let handle = self.live()?;
        let key = key.as_ref();
        let status = unsafe {
            sortkv_each_above(
                handle,
                key.as_ptr(),
                key.len(),
                pair_trampoline::<F>,
                std::ptr::addr_of_mut!(f).cast(),
            )
        };
        finish_iteration(status)
    }

    /// Like [`Database::each`], restricted to keys strictly below `key`.
    pub fn each_below<F: FnMut(&[u8], &[u8])>(
        &self,
        key: impl AsRef<[u8]>,
        mut f: F,
    ) -> Result<()> {
        let handle = self.live()?;
        let key = key.as_ref();
        let status = unsafe {
            sortkv_each_below(
                handle,
                key.as_ptr(),
                key.len(),
                pair_trampoline::<F>,
                std::ptr::addr_of_mut!(f).cast(),
            )
        };
        finish_iteration(status)
    }

    /// Like [`Database::each`], restricted to keys strictly between
    /// `key1` and `key2`. An inverted or empty interval yields nothing.
    pub fn each_between<F: FnMut(&[u8], &[u8])>(
        &self,
        key1: impl AsRef<[u8]>,
        key2: impl AsRef<[u8]>,
        mut f: F,
    ) -> Result<()> {
        let handle = self.live()?;
        let key1 = key1.as_ref();
        let key2 = key2.as_ref();
        let status = unsafe {
            sortkv_each_between(
                handle,
                key1.as_ptr(),
                key1.len(),
                key2.as_ptr(),
                key2.len(),
                pair_trampoline::<F>,
                std::ptr::addr_of_mut!(f).cast(),
            )
        };
        finish_iteration(status)
    }

    /// Like [`Database::each`], decoding keys and values as UTF-8 text.
    ///
    /// Decoding is a wrapper over the raw variant, applied to the
    /// callback copies only.
    pub fn each_string<F: FnMut(&str, &str)>(&self, mut f: F) -> Result<()> {
        self.each(|k, v| f(&String::from_utf8_lossy(k), &String::from_utf8_lossy(v)))
    }

    /// Like [`Database::each_above`], decoding as UTF-8 text.
    pub fn each_string_above<F: FnMut(&str, &str)>(
        &self,
        key: impl AsRef<[u8]>,
        mut f: F,
    ) -> Result<()> {
        self.each_above(key, |k, v| {
            f(&String::from_utf8_lossy(k), &String::from_utf8_lossy(v))
        })
    }

    /// Like [`Database::each_below`], decoding as UTF-8 text.
    pub fn each_string_below<F: FnMut(&str, &str)>(
        &self,
        key: impl AsRef<[u8]>,
        mut f: F,
    ) -> Result<()> {
        self.each_below(key, |k, v| {
            f(&String::from_utf8_lossy(k), &String::from_utf8_lossy(v))
        })
    }

    /// Like [`Database::each_between`], decoding as UTF-8 text.
    pub fn each_string_between<F: FnMut(&str, &str)>(
        &self,
        key1: impl AsRef<[u8]>,
        key2: impl AsRef<[u8]>,
        mut f: F,
    ) -> Result<()> {
        self.each_between(key1, key2, |k, v| {
            f(&String::from_utf8_lossy(k), &String::from_utf8_lossy(v))
        })
    }
}

impl Drop for Database {
    fn drop(&mut self) {
        self.stop();
    }
}

fn finish_count(status: SortKvStatus, count: usize) -> Result<usize> {
    match status {
        SortKvStatus::Ok => Ok(count),
        other => Err(op_error(other, Error::Iteration)),
    }
}

fn finish_iteration(status: SortKvStatus) -> Result<()> {
    match status {
        SortKvStatus::Ok => Ok(()),
        other => Err(op_error(other, Error::Iteration)),
    }
}

/// Builds a byte slice from a callback's pointer/length pair.
unsafe fn callback_span<'a>(ptr: *const u8, len: usize) -> &'a [u8] {
    if len == 0 {
        &[]
    } else {
        std::slice::from_raw_parts(ptr, len)
    }
}

/// Captures the engine's open-failure message into an `Option<String>`
/// smuggled through the context pointer.
unsafe extern "C" fn capture_failure(
    _engine: *const c_char,
    _config: *mut SortKvConfig,
    message: *const c_char,
    ctx: *mut c_void,
) {
    let slot = &mut *ctx.cast::<Option<String>>();
    if !message.is_null() {
        *slot = Some(CStr::from_ptr(message).to_string_lossy().into_owned());
    }
}

/// Copies the value delivered by a get callback into an
/// `Option<Vec<u8>>` smuggled through the context pointer. The pointer
/// is only valid for this invocation, so the copy happens here.
unsafe extern "C" fn copy_value(value: *const u8, value_len: usize, ctx: *mut c_void) {
    let slot = &mut *ctx.cast::<Option<Vec<u8>>>();
    *slot = Some(callback_span(value, value_len).to_vec());
}

/// Adapts a caller closure to the engine's per-key callback shape.
///
/// Monomorphised per closure type; the closure travels through the
/// context pointer and is only used for the duration of one call.
unsafe extern "C" fn key_trampoline<F: FnMut(&[u8])>(
    key: *const u8,
    key_len: usize,
    ctx: *mut c_void,
) {
    let f = &mut *ctx.cast::<F>();
    f(callback_span(key, key_len));
}

/// Adapts a caller closure to the engine's per-record callback shape.
unsafe extern "C" fn pair_trampoline<F: FnMut(&[u8], &[u8])>(
    key: *const u8,
    key_len: usize,
    value: *const u8,
    value_len: usize,
    ctx: *mut c_void,
) {
    let f = &mut *ctx.cast::<F>();
    f(callback_span(key, key_len), callback_span(value, value_len));
}
