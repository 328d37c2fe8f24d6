#![cfg(test)]

// Property tests for AvlTree kept inside the crate so they can reach the
// shape checker.

use crate::avl::{AvlTree, NodeId};
use crate::traverse::{TraversalOrder, Visit};
use proptest::prelude::*;
use std::collections::{BTreeMap, HashMap};

#[derive(Clone, Debug)]
enum Op {
    Insert(i16),
    Remove(i16),
    Find(i16),
    Extremes,
}

fn arb_ops() -> impl Strategy<Value = Vec<Op>> {
    // A narrow value range forces duplicates and removals that hit.
    let v = -40i16..40;
    let op = prop_oneof![
        4 => v.clone().prop_map(Op::Insert),
        3 => v.clone().prop_map(Op::Remove),
        2 => v.prop_map(Op::Find),
        1 => Just(Op::Extremes),
    ];
    proptest::collection::vec(op, 1..200)
}

fn expand(model: &BTreeMap<i16, Vec<NodeId>>) -> Vec<i16> {
    model
        .iter()
        .flat_map(|(v, ids)| std::iter::repeat(*v).take(ids.len()))
        .collect()
}

// Property: model equivalence against a BTreeMap multiset.
// Invariants exercised across random operation sequences:
// - Every node's balance factor equals height(right) - height(left) and stays in -1..=1.
// - In-order traversal yields the multiset in non-decreasing order.
// - `remove` detaches one handle previously returned for an equal value; others stay valid.
// - `find_equal`, `min`, `max` agree with the model.
proptest! {
    #![proptest_config(ProptestConfig { cases: 96, .. ProptestConfig::default() })]
    #[test]
    fn prop_model_equivalence(ops in arb_ops()) {
        let mut sut: AvlTree<i16> = AvlTree::new();
        let mut model: BTreeMap<i16, Vec<NodeId>> = BTreeMap::new();
        let mut live: HashMap<NodeId, i16> = HashMap::new();

        for op in ops {
            match op {
                Op::Insert(v) => {
                    let id = sut.insert(v);
                    prop_assert!(live.insert(id, v).is_none(), "fresh handle must be unique");
                    model.entry(v).or_default().push(id);
                }
                Op::Remove(v) => match sut.remove(&v) {
                    Some((id, item)) => {
                        prop_assert_eq!(item, v);
                        let ids = model.get_mut(&v).expect("removed value must be modelled");
                        let pos = ids.iter().position(|x| *x == id);
                        prop_assert!(pos.is_some(), "removed handle must belong to the value");
                        ids.swap_remove(pos.unwrap());
                        if ids.is_empty() {
                            model.remove(&v);
                        }
                        live.remove(&id);
                        prop_assert!(!sut.contains(id));
                    }
                    None => prop_assert!(!model.contains_key(&v)),
                },
                Op::Find(v) => match sut.find_equal(&v) {
                    Some((id, item)) => {
                        prop_assert_eq!(*item, v);
                        prop_assert_eq!(live.get(&id), Some(&v));
                    }
                    None => prop_assert!(!model.contains_key(&v)),
                },
                Op::Extremes => {
                    prop_assert_eq!(sut.min().map(|(_, v)| *v), model.keys().next().copied());
                    prop_assert_eq!(sut.max().map(|(_, v)| *v), model.keys().next_back().copied());
                }
            }

            sut.check_shape();
            prop_assert_eq!(sut.len(), live.len());
            let in_order: Vec<i16> =
                sut.in_order().into_iter().map(|id| *sut.get(id).unwrap()).collect();
            prop_assert_eq!(in_order, expand(&model));
            for (id, v) in &live {
                prop_assert_eq!(sut.get(*id), Some(v), "live handle must survive rebalancing");
            }
        }
    }
}

// Property: height stays within the AVL bound of 1.44 * log2(n + 2).
proptest! {
    #![proptest_config(ProptestConfig { cases: 32, .. ProptestConfig::default() })]
    #[test]
    fn prop_height_bound(values in proptest::collection::vec(any::<i32>(), 1..500)) {
        let mut t = AvlTree::new();
        for v in &values {
            t.insert(*v);
        }
        let h = t.check_shape() as f64;
        let bound = 1.4405 * ((values.len() + 2) as f64).log2();
        prop_assert!(h <= bound, "height {} exceeds bound {}", h, bound);
    }
}

// Property: every traversal order visits each node exactly once, and
// breadth-first visits never skip a level.
proptest! {
    #![proptest_config(ProptestConfig { cases: 32, .. ProptestConfig::default() })]
    #[test]
    fn prop_orders_are_permutations(values in proptest::collection::vec(-100i32..100, 0..120)) {
        let mut t = AvlTree::new();
        for v in &values {
            t.insert(*v);
        }
        let mut expected = t.in_order();
        expected.sort();
        for order in TraversalOrder::ALL {
            let mut seen = Vec::new();
            let n = t
                .traverse(order, |id, _, _| {
                    seen.push(id);
                    Visit::Continue
                })
                .unwrap();
            prop_assert_eq!(n, values.len());
            seen.sort();
            prop_assert_eq!(&seen, &expected, "{:?}", order);
        }
    }
}
