//! Engine implementations behind the C ABI.

use crate::config::NativeConfig;
use std::collections::BTreeMap;
use std::ops::Bound;
use std::path::Path;

/// An exclusive-bound key range.
///
/// Both bounds, when present, are exclusive; there is no inclusive
/// variant anywhere in the protocol. An interval whose lower bound is
/// not strictly below its upper bound is empty, never an error.
#[derive(Debug, Clone, Default)]
pub struct KeyRange {
    lower: Option<Vec<u8>>,
    upper: Option<Vec<u8>>,
}

impl KeyRange {
    /// The unbounded range: every key.
    pub fn all() -> Self {
        Self::default()
    }

    /// Keys strictly above `key`.
    pub fn above(key: &[u8]) -> Self {
        Self {
            lower: Some(key.to_vec()),
            upper: None,
        }
    }

    /// Keys strictly below `key`.
    pub fn below(key: &[u8]) -> Self {
        Self {
            lower: None,
            upper: Some(key.to_vec()),
        }
    }

    /// Keys strictly between `lower` and `upper`.
    pub fn between(lower: &[u8], upper: &[u8]) -> Self {
        Self {
            lower: Some(lower.to_vec()),
            upper: Some(upper.to_vec()),
        }
    }

    /// Returns true if no key can fall inside the range.
    ///
    /// `BTreeMap::range` panics on inverted or doubly-excluded-equal
    /// bounds, so callers must consult this before building a range query.
    pub fn is_empty_interval(&self) -> bool {
        match (&self.lower, &self.upper) {
            (Some(lo), Some(hi)) => lo >= hi,
            _ => false,
        }
    }

    fn bounds(&self) -> (Bound<&[u8]>, Bound<&[u8]>) {
        let lo = match &self.lower {
            Some(k) => Bound::Excluded(k.as_slice()),
            None => Bound::Unbounded,
        };
        let hi = match &self.upper {
            Some(k) => Bound::Excluded(k.as_slice()),
            None => Bound::Unbounded,
        };
        (lo, hi)
    }
}

/// The behavior surface an engine exposes to the C ABI layer.
///
/// Keys and values are opaque byte sequences; ordering is unsigned
/// byte-wise lexicographic. `visit` delivers records in ascending key
/// order for sorted engines.
pub trait Engine: Send {
    /// Upserts a record. Zero-length keys and values are legal.
    fn put(&mut self, key: &[u8], value: &[u8]);

    /// Returns the stored value for `key`, if any.
    fn get(&self, key: &[u8]) -> Option<&[u8]>;

    /// Returns true if a record with `key` is present.
    fn exists(&self, key: &[u8]) -> bool;

    /// Removes a record. Returns true if a record was removed.
    fn remove(&mut self, key: &[u8]) -> bool;

    /// Returns the number of records inside `range`.
    fn count(&self, range: &KeyRange) -> usize;

    /// Invokes `visit` once per record inside `range`, ascending.
    fn visit(&self, range: &KeyRange, visit: &mut dyn FnMut(&[u8], &[u8]));
}

/// The `sorted` engine: a volatile, lexicographically ordered map.
///
/// Stands in for a persistent sorted engine; the `path` option must name
/// an existing directory (the pool location), mirroring how the real
/// engine validates its pool path, but nothing is written there.
#[derive(Debug, Default)]
pub struct SortedEngine {
    map: BTreeMap<Vec<u8>, Vec<u8>>,
}

impl SortedEngine {
    /// Creates an empty sorted engine.
    pub fn new() -> Self {
        Self::default()
    }
}

impl Engine for SortedEngine {
    fn put(&mut self, key: &[u8], value: &[u8]) {
        self.map.insert(key.to_vec(), value.to_vec());
    }

    fn get(&self, key: &[u8]) -> Option<&[u8]> {
        self.map.get(key).map(Vec::as_slice)
    }

    fn exists(&self, key: &[u8]) -> bool {
        self.map.contains_key(key)
    }

    fn remove(&mut self, key: &[u8]) -> bool {
        self.map.remove(key).is_some()
    }

    fn count(&self, range: &KeyRange) -> usize {
        if range.is_empty_interval() {
            return 0;
        }
        self.map.range::<[u8], _>(range.bounds()).count()
    }

    fn visit(&self, range: &KeyRange, visit: &mut dyn FnMut(&[u8], &[u8])) {
        if range.is_empty_interval() {
            return;
        }
        for (k, v) in self.map.range::<[u8], _>(range.bounds()) {
            visit(k, v);
        }
    }
}

/// The `blackhole` engine: accepts every write, retains nothing.
///
/// Every operation reports success; lookups always report absence and
/// counts stay at zero. Used for benchmarking the call path.
#[derive(Debug, Default)]
pub struct BlackholeEngine;

impl Engine for BlackholeEngine {
    fn put(&mut self, _key: &[u8], _value: &[u8]) {}

    fn get(&self, _key: &[u8]) -> Option<&[u8]> {
        None
    }

    fn exists(&self, _key: &[u8]) -> bool {
        false
    }

    fn remove(&mut self, _key: &[u8]) -> bool {
        // The blackhole acknowledges removals the same way it
        // acknowledges writes.
        true
    }

    fn count(&self, _range: &KeyRange) -> usize {
        0
    }

    fn visit(&self, _range: &KeyRange, _visit: &mut dyn FnMut(&[u8], &[u8])) {}
}

/// Instantiates an engine by name from a parsed configuration.
///
/// Returns the failure message the start-failure callback should carry.
pub fn open_engine(name: &str, config: &NativeConfig) -> Result<Box<dyn Engine>, String> {
    match name {
        "sorted" => {
            let Some(path) = config.get_string("path") else {
                return Err("config does not contain a valid path string".to_string());
            };
            if !Path::new(path).is_dir() {
                return Err("config path is not an existing directory".to_string());
            }
            // `size` caps the pool for persistent engines; the volatile
            // stand-in only validates its type, which the config layer
            // already enforced.
            let _ = config.get_uint64("size");
            Ok(Box::new(SortedEngine::new()))
        }
        "blackhole" => Ok(Box::new(BlackholeEngine)),
        other => Err(format!("unknown engine name: {other}")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ConfigValue;

    fn sorted_with(keys: &[&str]) -> SortedEngine {
        let mut engine = SortedEngine::new();
        for (i, k) in keys.iter().enumerate() {
            engine.put(k.as_bytes(), i.to_string().as_bytes());
        }
        engine
    }

    #[test]
    fn put_get_remove() {
        let mut engine = SortedEngine::new();
        assert!(!engine.exists(b"key1"));
        assert_eq!(engine.get(b"key1"), None);

        engine.put(b"key1", b"value1");
        assert!(engine.exists(b"key1"));
        assert_eq!(engine.get(b"key1"), Some(&b"value1"[..]));

        engine.put(b"key1", b"value123");
        assert_eq!(engine.get(b"key1"), Some(&b"value123"[..]));

        assert!(engine.remove(b"key1"));
        assert!(!engine.remove(b"key1"));
        assert!(!engine.exists(b"key1"));
    }

    #[test]
    fn binary_keys_and_values() {
        let mut engine = SortedEngine::new();
        engine.put(b"A\0B\0\0C", b"value1");
        assert!(engine.exists(b"A\0B\0\0C"));
        engine.put(b"", b"");
        assert_eq!(engine.get(b""), Some(&b""[..]));
    }

    #[test]
    fn range_counts() {
        let engine = sorted_with(&["A", "AB", "AC", "B", "BB", "BC", "BD"]);
        assert_eq!(engine.count(&KeyRange::all()), 7);

        assert_eq!(engine.count(&KeyRange::above(b"")), 7);
        assert_eq!(engine.count(&KeyRange::above(b"A")), 6);
        assert_eq!(engine.count(&KeyRange::above(b"B")), 3);
        assert_eq!(engine.count(&KeyRange::above(b"BC")), 1);
        assert_eq!(engine.count(&KeyRange::above(b"BD")), 0);
        assert_eq!(engine.count(&KeyRange::above(b"Z")), 0);

        assert_eq!(engine.count(&KeyRange::below(b"")), 0);
        assert_eq!(engine.count(&KeyRange::below(b"A")), 0);
        assert_eq!(engine.count(&KeyRange::below(b"B")), 3);
        assert_eq!(engine.count(&KeyRange::below(b"BD")), 6);
        assert_eq!(engine.count(&KeyRange::below(b"ZZZZZ")), 7);

        assert_eq!(engine.count(&KeyRange::between(b"", b"ZZZZ")), 7);
        assert_eq!(engine.count(&KeyRange::between(b"", b"A")), 0);
        assert_eq!(engine.count(&KeyRange::between(b"", b"B")), 3);
        assert_eq!(engine.count(&KeyRange::between(b"A", b"B")), 2);
        assert_eq!(engine.count(&KeyRange::between(b"B", b"ZZZZ")), 3);
    }

    #[test]
    fn inverted_and_empty_intervals() {
        let engine = sorted_with(&["A", "AB", "AC", "B", "BB", "BC", "BD"]);
        assert_eq!(engine.count(&KeyRange::between(b"", b"")), 0);
        assert_eq!(engine.count(&KeyRange::between(b"A", b"A")), 0);
        assert_eq!(engine.count(&KeyRange::between(b"AC", b"A")), 0);
        assert_eq!(engine.count(&KeyRange::between(b"B", b"A")), 0);
        assert_eq!(engine.count(&KeyRange::between(b"BD", b"A")), 0);
        assert_eq!(engine.count(&KeyRange::between(b"ZZZ", b"B")), 0);

        let mut visited = 0;
        engine.visit(&KeyRange::between(b"B", b"A"), &mut |_, _| visited += 1);
        assert_eq!(visited, 0);
    }

    #[test]
    fn visit_is_ascending() {
        let mut engine = SortedEngine::new();
        // Insert out of order.
        for k in ["BC", "A", "BD", "AB", "B", "AC", "BB"] {
            engine.put(k.as_bytes(), b"x");
        }
        let mut keys = Vec::new();
        engine.visit(&KeyRange::all(), &mut |k, _| keys.push(k.to_vec()));
        assert_eq!(
            keys,
            ["A", "AB", "AC", "B", "BB", "BC", "BD"]
                .iter()
                .map(|k| k.as_bytes().to_vec())
                .collect::<Vec<_>>()
        );
    }

    #[test]
    fn blackhole_laws() {
        let mut engine = BlackholeEngine;
        engine.put(b"key1", b"value123");
        assert_eq!(engine.count(&KeyRange::all()), 0);
        assert!(!engine.exists(b"key1"));
        assert_eq!(engine.get(b"key1"), None);
        assert!(engine.remove(b"key1"));
    }

    #[test]
    fn open_validates_engine_and_path() {
        let config = NativeConfig::new();
        assert_eq!(
            open_engine("nope.nope", &config).err().unwrap(),
            "unknown engine name: nope.nope"
        );
        assert_eq!(
            open_engine("sorted", &config).err().unwrap(),
            "config does not contain a valid path string"
        );

        let mut config = NativeConfig::new();
        config
            .put(
                "path",
                ConfigValue::String("/tmp/123/234/345/456/567/678/nope.nope".to_string()),
            )
            .unwrap();
        assert_eq!(
            open_engine("sorted", &config).err().unwrap(),
            "config path is not an existing directory"
        );

        assert!(open_engine("blackhole", &config).is_ok());

        let dir = tempfile::tempdir().unwrap();
        let mut config = NativeConfig::new();
        config
            .put(
                "path",
                ConfigValue::String(dir.path().to_string_lossy().into_owned()),
            )
            .unwrap();
        assert!(open_engine("sorted", &config).is_ok());
    }
}
