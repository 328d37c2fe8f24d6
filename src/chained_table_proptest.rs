#![cfg(test)]

// Property tests for ChainedTable kept inside the crate so they can reach
// the chain checker and the current rung.

use crate::chained_table::{ChainedTable, SetOutcome};
use crate::hash;
use crate::ownership::Ownership;
use crate::traverse::Visit;
use proptest::prelude::*;
use std::collections::HashMap;

// Pool-indexed operations so that shrinking moves towards earlier keys.
#[derive(Clone, Debug)]
enum Op {
    Set(usize, i64),
    Emplace(usize, Option<i64>),
    Take(usize),
    Delete(usize),
    Get(usize),
    DeleteOddValues,
    Iterate,
}

fn arb_scenario() -> impl Strategy<Value = (Vec<String>, Vec<Op>)> {
    proptest::collection::vec("[a-z]{0,6}", 1..=12).prop_flat_map(|pool| {
        let idx = 0..pool.len();
        let op = prop_oneof![
            4 => (idx.clone(), any::<i64>()).prop_map(|(i, v)| Op::Set(i, v)),
            2 => (idx.clone(), proptest::option::of(any::<i64>()))
                .prop_map(|(i, v)| Op::Emplace(i, v)),
            2 => idx.clone().prop_map(Op::Take),
            2 => idx.clone().prop_map(Op::Delete),
            3 => idx.prop_map(Op::Get),
            1 => Just(Op::DeleteOddValues),
            1 => Just(Op::Iterate),
        ];
        proptest::collection::vec(op, 1..80).prop_map(move |ops| (pool.clone(), ops))
    })
}

// Property: state-machine equivalence against std::collections::HashMap.
// Invariants exercised across random operation sequences:
// - `set` reports Inserted exactly when the key was absent; the latest value wins.
// - `emplace` keeps an existing value until something new is stored into the slot.
// - `take` hands back the stored value; `delete` reports presence; both remove the key.
// - `foreach` self-deletion removes exactly the visited entries that asked for it.
// - Every entry stays in the chain selected by its cached hash; `len` matches the model.
proptest! {
    #![proptest_config(ProptestConfig { cases: 64, .. ProptestConfig::default() })]
    #[test]
    fn prop_state_machine((pool, ops) in arb_scenario()) {
        let mut sut: ChainedTable<str, i64> =
            ChainedTable::with_str_keys(Ownership::FixedCopy).unwrap();
        let mut model: HashMap<String, Option<i64>> = HashMap::new();

        for op in &ops {
            match op {
                Op::Set(i, v) => {
                    let k = &pool[*i];
                    let outcome = sut.set(k, v).unwrap();
                    let expected = if model.contains_key(k) {
                        SetOutcome::Updated
                    } else {
                        SetOutcome::Inserted
                    };
                    prop_assert_eq!(outcome, expected);
                    model.insert(k.clone(), Some(*v));
                }
                Op::Emplace(i, v) => {
                    let k = &pool[*i];
                    let mut slot = sut.emplace(k).unwrap();
                    let current = model.entry(k.clone()).or_insert(None);
                    prop_assert_eq!(slot.get().copied(), *current);
                    if let Some(v) = v {
                        slot.store(v).unwrap();
                        *current = Some(*v);
                    }
                }
                Op::Take(i) => {
                    let k = &pool[*i];
                    let got = sut.take(k).map(|v| *v);
                    prop_assert_eq!(got, model.remove(k).flatten());
                }
                Op::Delete(i) => {
                    let k = &pool[*i];
                    prop_assert_eq!(sut.delete(k), model.remove(k).is_some());
                }
                Op::Get(i) => {
                    let k = &pool[*i];
                    prop_assert_eq!(sut.get(k).copied(), model.get(k).copied().flatten());
                    prop_assert_eq!(sut.contains(k), model.contains_key(k));
                }
                Op::DeleteOddValues => {
                    let mut visited = 0;
                    sut.foreach(|e| {
                        visited += 1;
                        if matches!(e.value(), Some(v) if v % 2 != 0) {
                            e.delete();
                        }
                        Visit::Continue
                    })
                    .unwrap();
                    prop_assert_eq!(visited, model.len());
                    model.retain(|_, v| !matches!(v, Some(v) if *v % 2 != 0));
                }
                Op::Iterate => {
                    let seen: HashMap<String, Option<i64>> = sut
                        .iter()
                        .map(|(k, v)| (k.to_owned(), v.copied()))
                        .collect();
                    prop_assert_eq!(&seen, &model);
                }
            }
            prop_assert_eq!(sut.len(), model.len());
            sut.check_chains();
        }
    }
}

// Property: with a constant hash every key shares one chain, and the table
// still behaves like a map.
proptest! {
    #![proptest_config(ProptestConfig { cases: 64, .. ProptestConfig::default() })]
    #[test]
    fn prop_constant_hash_collisions(
        ops in proptest::collection::vec((0u64..16, any::<bool>()), 1..120)
    ) {
        let keys: Vec<u64> = (0..16).collect();
        let mut sut: ChainedTable<u64, u64> = ChainedTable::new(
            |_| 0,
            hash::int_eq,
            Ownership::FixedCopy,
            Ownership::FixedCopy,
        )
        .unwrap();
        let mut model: HashMap<u64, u64> = HashMap::new();
        for (k, insert) in ops {
            let key = &keys[k as usize];
            if insert {
                sut.set(key, key).unwrap();
                model.insert(k, k);
            } else {
                prop_assert_eq!(sut.delete(key), model.remove(&k).is_some());
            }
            for probe in &keys {
                prop_assert_eq!(sut.get(probe), model.get(probe));
            }
            sut.check_chains();
        }
    }
}

#[derive(Clone, Debug)]
enum LoadOp {
    Insert(usize),
    Delete(usize),
    // Walk the table deleting every key not divisible by the modulus.
    Sweep(u64),
}

fn arb_load_ops() -> impl Strategy<Value = Vec<LoadOp>> {
    let op = prop_oneof![
        12 => (0usize..600).prop_map(LoadOp::Insert),
        8 => (0usize..600).prop_map(LoadOp::Delete),
        1 => (2u64..40).prop_map(LoadOp::Sweep),
    ];
    proptest::collection::vec(op, 1..1500)
}

// Property: after every insert, delete or sweeping walk the load factor lies
// within (shrink_at, grow_at), except that the bottom rung may run
// arbitrarily low.
proptest! {
    #![proptest_config(ProptestConfig { cases: 32, .. ProptestConfig::default() })]
    #[test]
    fn prop_load_factor_bound(ops in arb_load_ops()) {
        let keys: Vec<u64> = (0..600).collect();
        let mut sut = ChainedTable::with_int_keys(Ownership::FixedCopy).unwrap();
        for op in ops {
            match op {
                LoadOp::Insert(i) => {
                    sut.set(&keys[i], &keys[i]).unwrap();
                }
                LoadOp::Delete(i) => {
                    sut.delete(&keys[i]);
                }
                LoadOp::Sweep(m) => {
                    sut.foreach(|e| {
                        if *e.key() % m != 0 {
                            e.delete();
                        }
                        Visit::Continue
                    })
                    .unwrap();
                }
            }
            let load = sut.load_factor();
            let config = *sut.config();
            prop_assert!(load < config.grow_at, "load {} at rung {}", load, sut.rung());
            prop_assert!(
                sut.rung() == 0 || load > config.shrink_at,
                "load {} at rung {}",
                load,
                sut.rung()
            );
        }
        sut.check_chains();
    }
}
