//! Opaque engine configuration object and its C ABI.

use crate::error::{clear_last_error, set_last_error};
use crate::status::SortKvStatus;
use std::collections::BTreeMap;
use std::ffi::CStr;
use thiserror::Error;

/// An opaque configuration handle.
///
/// This is a pointer to the internal config structure.
/// Never dereference or modify directly.
#[repr(C)]
pub struct SortKvConfig {
    _private: [u8; 0],
}

/// A typed configuration value.
#[derive(Debug, Clone, PartialEq)]
pub enum ConfigValue {
    /// UTF-8 string option.
    String(String),
    /// Unsigned 64-bit integer option.
    Uint64(u64),
    /// Signed 64-bit integer option.
    Int64(i64),
    /// Double-precision float option.
    Double(f64),
    /// Opaque binary option.
    Data(Vec<u8>),
}

impl ConfigValue {
    fn type_name(&self) -> &'static str {
        match self {
            ConfigValue::String(_) => "string",
            ConfigValue::Uint64(_) => "uint64",
            ConfigValue::Int64(_) => "int64",
            ConfigValue::Double(_) => "double",
            ConfigValue::Data(_) => "data",
        }
    }
}

/// Errors raised while building or parsing a configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The JSON document could not be parsed.
    #[error("config JSON is malformed: {0}")]
    Malformed(String),

    /// A recognized option carried a value of the wrong type.
    #[error("config option \"{name}\" must be a {expected}, got {actual}")]
    WrongType {
        /// Option name.
        name: String,
        /// Expected type.
        expected: &'static str,
        /// Type actually supplied.
        actual: &'static str,
    },

    /// The JSON value type has no typed-option representation.
    #[error("config option \"{name}\" has an unsupported JSON type")]
    Unsupported {
        /// Option name.
        name: String,
    },
}

/// The native configuration object behind [`SortKvConfig`].
///
/// Options are typed; the engine recognizes `path` (string) and `size`
/// (uint64) and passes every other entry through untouched for
/// engine-specific use.
#[derive(Debug, Default)]
pub struct NativeConfig {
    entries: BTreeMap<String, ConfigValue>,
}

impl NativeConfig {
    /// Creates an empty configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a typed option, policing the type of recognized names.
    pub fn put(&mut self, name: &str, value: ConfigValue) -> Result<(), ConfigError> {
        Self::check_type(name, &value)?;
        self.entries.insert(name.to_string(), value);
        Ok(())
    }

    /// Returns the string value of an option, if present and a string.
    pub fn get_string(&self, name: &str) -> Option<&str> {
        match self.entries.get(name) {
            Some(ConfigValue::String(s)) => Some(s),
            _ => None,
        }
    }

    /// Returns the uint64 value of an option, if present and a uint64.
    pub fn get_uint64(&self, name: &str) -> Option<u64> {
        match self.entries.get(name) {
            Some(ConfigValue::Uint64(v)) => Some(*v),
            _ => None,
        }
    }

    /// Parses a JSON object document into this configuration.
    ///
    /// Recognized keys are type-checked; unrecognized keys are stored as
    /// whatever typed value their JSON shape maps to (objects and arrays
    /// are retained as raw JSON bytes). The configuration remains valid
    /// and deletable after a failed parse.
    pub fn merge_json(&mut self, text: &str) -> Result<(), ConfigError> {
        let doc: serde_json::Value =
            serde_json::from_str(text).map_err(|e| ConfigError::Malformed(e.to_string()))?;

        let serde_json::Value::Object(map) = doc else {
            return Err(ConfigError::Malformed(
                "top-level JSON value is not an object".to_string(),
            ));
        };

        for (name, value) in map {
            let typed = match value {
                serde_json::Value::String(s) => ConfigValue::String(s),
                serde_json::Value::Number(n) => {
                    if let Some(u) = n.as_u64() {
                        ConfigValue::Uint64(u)
                    } else if let Some(i) = n.as_i64() {
                        ConfigValue::Int64(i)
                    } else if let Some(f) = n.as_f64() {
                        ConfigValue::Double(f)
                    } else {
                        return Err(ConfigError::Unsupported { name });
                    }
                }
                serde_json::Value::Object(_) | serde_json::Value::Array(_) => {
                    ConfigValue::Data(value.to_string().into_bytes())
                }
                serde_json::Value::Bool(_) | serde_json::Value::Null => {
                    return Err(ConfigError::Unsupported { name });
                }
            };
            // Wrong types for recognized keys are a parse error, not an
            // argument error, when they arrive through JSON.
            Self::check_type(&name, &typed).map_err(|e| match e {
                ConfigError::WrongType { .. } => ConfigError::Malformed(e.to_string()),
                other => other,
            })?;
            self.entries.insert(name, typed);
        }
        Ok(())
    }

    fn check_type(name: &str, value: &ConfigValue) -> Result<(), ConfigError> {
        let expected = match name {
            "path" => "string",
            "size" => "uint64",
            _ => return Ok(()),
        };
        if value.type_name() != expected {
            return Err(ConfigError::WrongType {
                name: name.to_string(),
                expected,
                actual: value.type_name(),
            });
        }
        Ok(())
    }
}

// --- C ABI ---------------------------------------------------------------

/// Allocates a new, empty configuration object.
///
/// Returns null if allocation fails. The object must be released with
/// [`sortkv_config_delete`] exactly once.
#[no_mangle]
pub extern "C" fn sortkv_config_new() -> *mut SortKvConfig {
    clear_last_error();
    let boxed = Box::new(NativeConfig::new());
    Box::into_raw(boxed).cast::<SortKvConfig>()
}

/// Releases a configuration object.
///
/// # Safety
///
/// `config` must have been returned by [`sortkv_config_new`] and must not
/// be used after this call. Passing null is a no-op.
#[no_mangle]
pub unsafe extern "C" fn sortkv_config_delete(config: *mut SortKvConfig) {
    if !config.is_null() {
        drop(Box::from_raw(config.cast::<NativeConfig>()));
    }
}

/// Parses a JSON document into a configuration object.
///
/// On failure the configuration keeps its previous contents where
/// possible and remains valid; the caller must still delete it.
///
/// # Safety
///
/// - `config` must be a valid configuration handle
/// - `json` must be a valid null-terminated string
#[no_mangle]
pub unsafe extern "C" fn sortkv_config_from_json(
    config: *mut SortKvConfig,
    json: *const std::ffi::c_char,
) -> SortKvStatus {
    clear_last_error();

    if config.is_null() || json.is_null() {
        set_last_error("null pointer argument");
        return SortKvStatus::InvalidArgument;
    }

    let Ok(text) = CStr::from_ptr(json).to_str() else {
        set_last_error("config JSON is not valid UTF-8");
        return SortKvStatus::ConfigParsingError;
    };

    let cfg = &mut *config.cast::<NativeConfig>();
    match cfg.merge_json(text) {
        Ok(()) => SortKvStatus::Ok,
        Err(e) => {
            set_last_error(e.to_string());
            SortKvStatus::ConfigParsingError
        }
    }
}

unsafe fn config_put(
    config: *mut SortKvConfig,
    name: *const std::ffi::c_char,
    value: ConfigValue,
) -> SortKvStatus {
    clear_last_error();

    if config.is_null() || name.is_null() {
        set_last_error("null pointer argument");
        return SortKvStatus::InvalidArgument;
    }

    let Ok(name) = CStr::from_ptr(name).to_str() else {
        set_last_error("config option name is not valid UTF-8");
        return SortKvStatus::InvalidArgument;
    };

    let cfg = &mut *config.cast::<NativeConfig>();
    match cfg.put(name, value) {
        Ok(()) => SortKvStatus::Ok,
        Err(e) => {
            set_last_error(e.to_string());
            SortKvStatus::InvalidArgument
        }
    }
}

/// Sets a string option.
///
/// # Safety
///
/// `config`, `name` and `value` must be valid pointers; `name` and
/// `value` must be null-terminated strings.
#[no_mangle]
pub unsafe extern "C" fn sortkv_config_put_string(
    config: *mut SortKvConfig,
    name: *const std::ffi::c_char,
    value: *const std::ffi::c_char,
) -> SortKvStatus {
    if value.is_null() {
        set_last_error("null pointer argument");
        return SortKvStatus::InvalidArgument;
    }
    let Ok(value) = CStr::from_ptr(value).to_str() else {
        set_last_error("config option value is not valid UTF-8");
        return SortKvStatus::InvalidArgument;
    };
    config_put(config, name, ConfigValue::String(value.to_string()))
}

/// Sets an unsigned 64-bit integer option.
///
/// # Safety
///
/// `config` must be a valid configuration handle and `name` a valid
/// null-terminated string.
#[no_mangle]
pub unsafe extern "C" fn sortkv_config_put_uint64(
    config: *mut SortKvConfig,
    name: *const std::ffi::c_char,
    value: u64,
) -> SortKvStatus {
    config_put(config, name, ConfigValue::Uint64(value))
}

/// Sets a signed 64-bit integer option.
///
/// # Safety
///
/// `config` must be a valid configuration handle and `name` a valid
/// null-terminated string.
#[no_mangle]
pub unsafe extern "C" fn sortkv_config_put_int64(
    config: *mut SortKvConfig,
    name: *const std::ffi::c_char,
    value: i64,
) -> SortKvStatus {
    config_put(config, name, ConfigValue::Int64(value))
}

/// Sets a double-precision float option.
///
/// # Safety
///
/// `config` must be a valid configuration handle and `name` a valid
/// null-terminated string.
#[no_mangle]
pub unsafe extern "C" fn sortkv_config_put_double(
    config: *mut SortKvConfig,
    name: *const std::ffi::c_char,
    value: f64,
) -> SortKvStatus {
    config_put(config, name, ConfigValue::Double(value))
}

/// Sets a binary option from a pointer/length pair.
///
/// # Safety
///
/// - `config` must be a valid configuration handle
/// - `name` must be a valid null-terminated string
/// - `value` must be valid for `value_len` bytes (may be null if
///   `value_len` is zero)
#[no_mangle]
pub unsafe extern "C" fn sortkv_config_put_data(
    config: *mut SortKvConfig,
    name: *const std::ffi::c_char,
    value: *const u8,
    value_len: usize,
) -> SortKvStatus {
    if value.is_null() && value_len > 0 {
        set_last_error("null data pointer with non-zero length");
        return SortKvStatus::InvalidArgument;
    }
    let bytes = if value_len == 0 {
        Vec::new()
    } else {
        std::slice::from_raw_parts(value, value_len).to_vec()
    };
    config_put(config, name, ConfigValue::Data(bytes))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::ffi::CString;

    #[test]
    fn parses_path_and_size() {
        let mut cfg = NativeConfig::new();
        cfg.merge_json("{\"path\":\"/dev/shm\",\"size\":1073741824}")
            .unwrap();
        assert_eq!(cfg.get_string("path"), Some("/dev/shm"));
        assert_eq!(cfg.get_uint64("size"), Some(1_073_741_824));
    }

    #[test]
    fn empty_object_parses() {
        let mut cfg = NativeConfig::new();
        cfg.merge_json("{}").unwrap();
        assert_eq!(cfg.get_string("path"), None);
    }

    #[test]
    fn malformed_json_is_rejected() {
        let mut cfg = NativeConfig::new();
        let err = cfg.merge_json("{").unwrap_err();
        assert!(matches!(err, ConfigError::Malformed(_)));
    }

    #[test]
    fn path_must_be_a_string() {
        let mut cfg = NativeConfig::new();
        let err = cfg.merge_json("{\"path\":1234}").unwrap_err();
        assert!(matches!(err, ConfigError::Malformed(_)));
    }

    #[test]
    fn size_must_be_unsigned() {
        let mut cfg = NativeConfig::new();
        assert!(cfg.merge_json("{\"size\":-1}").is_err());
    }

    #[test]
    fn unknown_keys_pass_through() {
        let mut cfg = NativeConfig::new();
        cfg.merge_json("{\"path\":\"/dev/shm\",\"force_create\":1,\"oid\":{\"a\":1}}")
            .unwrap();
        assert_eq!(cfg.get_uint64("force_create"), Some(1));
    }

    #[test]
    fn typed_put_polices_recognized_names() {
        let mut cfg = NativeConfig::new();
        assert!(cfg.put("path", ConfigValue::Uint64(7)).is_err());
        assert!(cfg
            .put("size", ConfigValue::String("big".to_string()))
            .is_err());
        cfg.put("path", ConfigValue::String("/dev/shm".to_string()))
            .unwrap();
        cfg.put("size", ConfigValue::Uint64(1024)).unwrap();
        cfg.put("anything", ConfigValue::Double(0.5)).unwrap();
    }

    #[test]
    fn abi_roundtrip() {
        unsafe {
            let cfg = sortkv_config_new();
            assert!(!cfg.is_null());

            let json = CString::new("{\"path\":\"/dev/shm\"}").unwrap();
            assert_eq!(sortkv_config_from_json(cfg, json.as_ptr()), SortKvStatus::Ok);

            let name = CString::new("size").unwrap();
            assert_eq!(
                sortkv_config_put_uint64(cfg, name.as_ptr(), 4096),
                SortKvStatus::Ok
            );

            // Wrong type for a recognized option name.
            let name = CString::new("path").unwrap();
            assert_eq!(
                sortkv_config_put_uint64(cfg, name.as_ptr(), 1),
                SortKvStatus::InvalidArgument
            );
            assert!(!sortkv_errormsg_is_empty());

            sortkv_config_delete(cfg);
        }
    }

    #[test]
    fn abi_rejects_malformed_json() {
        unsafe {
            let cfg = sortkv_config_new();
            let json = CString::new("{").unwrap();
            assert_eq!(
                sortkv_config_from_json(cfg, json.as_ptr()),
                SortKvStatus::ConfigParsingError
            );
            // Config object stays deletable after a failed parse.
            sortkv_config_delete(cfg);
        }
    }

    fn sortkv_errormsg_is_empty() -> bool {
        crate::error::sortkv_errormsg().is_null()
    }
}
