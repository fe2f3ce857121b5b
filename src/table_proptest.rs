#![cfg(test)]

// Property tests for ByteTable kept inside the crate so they can pin
// internal behaviors (capacity floor, slot-level counts) without feature
// gates.

use crate::{ByteTable, Heap, TableConfig};
use proptest::prelude::*;
use proptest::test_runner::TestCaseError;
use std::collections::{BTreeMap, HashMap};

// Pool-indexed operations to improve shrinking: indices shrink to earlier
// keys, pool length shrinks, and op lists shrink in length. The pools
// also give every borrowed key/value a home that outlives the table.
#[derive(Clone, Debug)]
enum OpI {
    Set(usize, usize),
    Remove(usize),
    Get(usize),
    Contains(usize),
    Clear,
    Iterate,
}

fn arb_scenario() -> impl Strategy<Value = (Vec<Vec<u8>>, Vec<OpI>)> {
    proptest::collection::vec(proptest::collection::vec(any::<u8>(), 0..6), 1..=8).prop_flat_map(
        |pool| {
            let idxs: Vec<usize> = (0..pool.len()).collect();
            let idx = proptest::sample::select(idxs);
            let op = prop_oneof![
                (idx.clone(), idx.clone()).prop_map(|(k, v)| OpI::Set(k, v)),
                idx.clone().prop_map(OpI::Remove),
                idx.clone().prop_map(OpI::Get),
                idx.clone().prop_map(OpI::Contains),
                Just(OpI::Clear),
                Just(OpI::Iterate),
            ];
            proptest::collection::vec(op, 1..60).prop_map(move |ops| (pool.clone(), ops))
        },
    )
}

fn small_cfg() -> TableConfig {
    TableConfig {
        default_capacity: 8,
        min_capacity: 8,
        ..TableConfig::default()
    }
}

// Shared state-machine driver. Invariants checked after every op:
// - len/is_empty parity with a std HashMap model;
// - occupied entries visible through iter() equal the model exactly;
// - capacity never drops below the configured floor;
// - get/contains/remove outcomes match the model per op.
fn run_state_machine<'a>(
    pool: &'a [Vec<u8>],
    ops: &[OpI],
    mut sut: ByteTable<'a, Heap>,
) -> Result<(), TestCaseError> {
    let mut model: HashMap<&[u8], &[u8]> = HashMap::new();

    for op in ops {
        match *op {
            OpI::Set(k, v) => {
                let r = sut.set(&pool[k], &pool[v]);
                prop_assert!(r.is_ok(), "set must not hit TableFull under sane config");
                model.insert(&pool[k], &pool[v]);
            }
            OpI::Remove(k) => {
                let got = sut.remove(&pool[k]);
                let expect = model.remove(pool[k].as_slice());
                prop_assert_eq!(got.map(|(_, v)| v), expect);
            }
            OpI::Get(k) => {
                prop_assert_eq!(sut.get(&pool[k]), model.get(pool[k].as_slice()).copied());
            }
            OpI::Contains(k) => {
                prop_assert_eq!(
                    sut.contains_key(&pool[k]),
                    model.contains_key(pool[k].as_slice())
                );
            }
            OpI::Clear => {
                sut.clear();
                model.clear();
            }
            OpI::Iterate => {
                let seen: BTreeMap<&[u8], &[u8]> = sut.iter().collect();
                let expect: BTreeMap<&[u8], &[u8]> =
                    model.iter().map(|(&k, &v)| (k, v)).collect();
                prop_assert_eq!(seen, expect);
            }
        }

        // Post-conditions after each op
        prop_assert_eq!(sut.len(), model.len());
        prop_assert_eq!(sut.is_empty(), model.is_empty());
        prop_assert!(sut.capacity() >= 8, "capacity fell below the floor");
        prop_assert_eq!(sut.iter().count(), model.len());
    }

    // Final sweep: every pool key agrees with the model.
    for key in pool {
        prop_assert_eq!(sut.get(key), model.get(key.as_slice()).copied());
    }
    Ok(())
}

// Property: state-machine equivalence against std::collections::HashMap
// across random operation sequences, with resizes exercised by the small
// starting capacity.
proptest! {
    #![proptest_config(ProptestConfig { cases: 64, .. ProptestConfig::default() })]
    #[test]
    fn prop_state_machine((pool, ops) in arb_scenario()) {
        let sut = ByteTable::with_config(small_cfg());
        run_state_machine(&pool, &ops, sut)?;
    }
}

fn zero_hash(_: &[u8]) -> u64 {
    0
}

// Property: same invariants under a degenerate digest that lands every
// key at home index 0. This stresses tombstone traversal, the
// update-beyond-tombstone tie-break, and the probe-limit trigger.
proptest! {
    #![proptest_config(ProptestConfig { cases: 64, .. ProptestConfig::default() })]
    #[test]
    fn prop_state_machine_with_collisions((pool, ops) in arb_scenario()) {
        let sut = ByteTable::with_parts(small_cfg(), zero_hash, Heap);
        run_state_machine(&pool, &ops, sut)?;
    }
}
