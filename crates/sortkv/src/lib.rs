//! # SortKV client binding
//!
//! Safe Rust client for the SortKV embedded, sorted, persistent
//! key-value engine, speaking the engine's stable C ABI.
//!
//! This crate provides:
//! - [`Config`]: builder for the engine's opaque configuration object
//!   (typed options or a JSON document), deleted on every path
//! - [`Database`]: the engine handle and query facade - point reads
//!   and writes, counted range queries, and callback-driven iteration
//!   over a lexicographically sorted key space with exclusive bounds
//! - [`KvEngine`]: the legacy fixed-capacity-buffer protocol
//!   generation, kept for old deployments
//! - [`Error`]: a precise taxonomy over the engine's narrow status
//!   codes
//!
//! Absent keys, zero counts and empty ranges are ordinary values, not
//! errors; the binding performs no retries and adds no locking of its
//! own.
//!
//! ```rust,ignore
//! use sortkv::Database;
//!
//! let db = Database::open_json("sorted", "{\"path\":\"/dev/shm\",\"size\":1073741824}")?;
//! db.put("key1", "value1")?;
//! assert_eq!(db.get("key1")?, Some(b"value1".to_vec()));
//! db.each(|key, value| println!("{key:?} = {value:?}"))?;
//! ```

#![warn(missing_docs)]

pub mod config;
pub mod database;
pub mod error;
pub mod legacy;

pub use config::Config;
pub use database::Database;
pub use error::{Error, Result};
pub use legacy::{KvEngine, DEFAULT_CAPACITY};
