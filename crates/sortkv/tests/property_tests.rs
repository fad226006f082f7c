//! Model-based stress tests: random operation sequences against a
//! `BTreeMap` reference model.

use proptest::collection::vec;
use proptest::prelude::*;
use sortkv::Database;
use std::collections::BTreeMap;

#[derive(Debug, Clone)]
enum Op {
    Put(Vec<u8>, Vec<u8>),
    Remove(Vec<u8>),
    Get(Vec<u8>),
}

// A small key alphabet so sequences revisit keys often.
fn key_strategy() -> impl Strategy<Value = Vec<u8>> {
    vec(prop_oneof![Just(b'a'), Just(b'b'), Just(b'c'), Just(0u8)], 0..4)
}

fn op_strategy() -> impl Strategy<Value = Op> {
    prop_oneof![
        (key_strategy(), vec(any::<u8>(), 0..32)).prop_map(|(k, v)| Op::Put(k, v)),
        key_strategy().prop_map(Op::Remove),
        key_strategy().prop_map(Op::Get),
    ]
}

fn open_sorted() -> (tempfile::TempDir, Database) {
    let dir = tempfile::tempdir().unwrap();
    let json = format!(
        "{{\"path\":{:?},\"size\":1073741824}}",
        dir.path().to_string_lossy()
    );
    let db = Database::open_json("sorted", &json).unwrap();
    (dir, db)
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn agrees_with_reference_model(ops in vec(op_strategy(), 1..64)) {
        let (_dir, db) = open_sorted();
        let mut model: BTreeMap<Vec<u8>, Vec<u8>> = BTreeMap::new();

        for op in ops {
            match op {
                Op::Put(k, v) => {
                    db.put(&k, &v).unwrap();
                    model.insert(k, v);
                }
                Op::Remove(k) => {
                    let removed = db.remove(&k).unwrap();
                    prop_assert_eq!(removed, model.remove(&k).is_some());
                }
                Op::Get(k) => {
                    prop_assert_eq!(db.get(&k).unwrap(), model.get(&k).cloned());
                    prop_assert_eq!(db.exists(&k).unwrap(), model.contains_key(&k));
                }
            }
        }

        prop_assert_eq!(db.count_all().unwrap(), model.len());
        let keys = db.get_keys().unwrap();
        prop_assert_eq!(&keys, &model.keys().cloned().collect::<Vec<_>>());

        let mut pairs = Vec::new();
        db.each(|k, v| pairs.push((k.to_vec(), v.to_vec()))).unwrap();
        prop_assert_eq!(
            pairs,
            model.iter().map(|(k, v)| (k.clone(), v.clone())).collect::<Vec<_>>()
        );
    }

    #[test]
    fn range_counts_match_model(
        keys in vec(key_strategy(), 0..24),
        lo in key_strategy(),
        hi in key_strategy(),
    ) {
        let (_dir, db) = open_sorted();
        let mut model: BTreeMap<Vec<u8>, Vec<u8>> = BTreeMap::new();
        for k in keys {
            db.put(&k, "x").unwrap();
            model.insert(k, b"x".to_vec());
        }

        // Bounds are always exclusive on both sides.
        prop_assert_eq!(
            db.count_above(&lo).unwrap(),
            model.keys().filter(|k| k.as_slice() > lo.as_slice()).count()
        );
        prop_assert_eq!(
            db.count_below(&hi).unwrap(),
            model.keys().filter(|k| k.as_slice() < hi.as_slice()).count()
        );
        prop_assert_eq!(
            db.count_between(&lo, &hi).unwrap(),
            model
                .keys()
                .filter(|k| k.as_slice() > lo.as_slice() && k.as_slice() < hi.as_slice())
                .count()
        );

        let mut seen = 0usize;
        db.each_between(&lo, &hi, |_, _| seen += 1).unwrap();
        prop_assert_eq!(seen, db.count_between(&lo, &hi).unwrap());
    }
}
