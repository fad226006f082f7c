//! # SortKV Engine
//!
//! The SortKV engine behind its stable C ABI.
//!
//! This crate is the "native side" of the SortKV binding: an embedded,
//! lexicographically sorted key-value engine reachable only through
//! C-compatible entry points (opaque handles, raw pointer/length pairs,
//! C string configuration and per-record function-pointer callbacks).
//! The safe client binding lives in the `sortkv` crate and consumes
//! nothing from here except the exported ABI.
//!
//! Two protocol generations are exported:
//! - the current, length-prefixed generation (`sortkv_*`), where every
//!   byte span travels as an independent pointer/length pair and output
//!   is delivered through callbacks;
//! - the legacy generation (`sortkv_engine_*`), where keys are C strings
//!   and values move through a caller-owned fixed-capacity buffer.

#![warn(missing_docs)]

pub mod config;
pub mod database;
pub mod engine;
pub mod error;
pub mod legacy;
pub mod status;

pub use config::{
    sortkv_config_delete, sortkv_config_from_json, sortkv_config_new, sortkv_config_put_data,
    sortkv_config_put_double, sortkv_config_put_int64, sortkv_config_put_string,
    sortkv_config_put_uint64, SortKvConfig,
};
pub use database::{
    sortkv_all, sortkv_all_above, sortkv_all_below, sortkv_all_between, sortkv_close,
    sortkv_count_above, sortkv_count_all, sortkv_count_below, sortkv_count_between, sortkv_each,
    sortkv_each_above, sortkv_each_below, sortkv_each_between, sortkv_exists, sortkv_get,
    sortkv_open, sortkv_put, sortkv_remove, SortKvFailureCallback, SortKvGetCallback,
    SortKvHandle, SortKvKeyCallback, SortKvKeyValueCallback,
};
pub use error::sortkv_errormsg;
pub use legacy::{
    sortkv_engine_close, sortkv_engine_get, sortkv_engine_open, sortkv_engine_put,
    sortkv_engine_remove, LEGACY_FAILED, LEGACY_NOT_FOUND, LEGACY_OK, LEGACY_VALUE_TOO_LARGE,
};
pub use status::SortKvStatus;
