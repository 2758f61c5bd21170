#![cfg(test)]

// Property tests for OrderedHashMap: state-machine equivalence against an
// association list, which models both the mapping and the insertion order.

use crate::ordered_hash_map::{EntryId, OrderedHashMap};
use proptest::prelude::*;
use proptest::test_runner::TestCaseError;
use std::collections::HashMap;
use std::fmt;
use std::hash::{BuildHasher, Hasher};

// Key newtype with Borrow<str> to exercise borrowed lookup.
#[derive(Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
struct Key(String);
impl fmt::Debug for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}
impl std::borrow::Borrow<str> for Key {
    fn borrow(&self) -> &str {
        &self.0
    }
}

// Pool-indexed operations to improve shrinking: indices shrink to earlier keys,
// pool length shrinks, and op lists shrink in length.
#[derive(Clone, Debug)]
enum OpI {
    Insert(usize, i32),
    InsertOrAssign(usize, i32),
    Remove(usize),
    RemoveAt(usize),
    Find(usize),
    Contains(String),
    Mutate(usize, i32),
    Iterate,
    Clear,
}

fn key_from(pool: &[String], i: usize) -> Key {
    Key(pool[i].clone())
}

fn arb_scenario() -> impl Strategy<Value = (Vec<String>, Vec<OpI>)> {
    proptest::collection::vec("[a-z]{0,5}", 1..=8).prop_flat_map(|pool| {
        let idxs: Vec<usize> = (0..pool.len()).collect();
        let idx = proptest::sample::select(idxs);
        let contains_pool = proptest::sample::select(pool.clone());
        let op = prop_oneof![
            4 => (idx.clone(), any::<i32>()).prop_map(|(i, v)| OpI::Insert(i, v)),
            4 => (idx.clone(), any::<i32>()).prop_map(|(i, v)| OpI::InsertOrAssign(i, v)),
            3 => idx.clone().prop_map(OpI::Remove),
            2 => idx.clone().prop_map(OpI::RemoveAt),
            2 => idx.clone().prop_map(OpI::Find),
            2 => prop_oneof![
                contains_pool.prop_map(|s: String| s),
                "[a-z]{0,5}".prop_map(|s| s)
            ]
            .prop_map(OpI::Contains),
            3 => (idx.clone(), any::<i32>()).prop_map(|(i, d)| OpI::Mutate(i, d)),
            2 => Just(OpI::Iterate),
            1 => Just(OpI::Clear),
        ];
        proptest::collection::vec(op, 1..60).prop_map(move |ops| (pool.clone(), ops))
    })
}

// Shared state-machine runner. Invariants exercised across random op
// sequences:
// - Duplicate inserts are no-ops that return the existing stable id;
//   `insert_or_assign` overwrites in place without moving the entry.
// - `find`/`contains_key` parity with the model; `find` returns the id
//   tracked since insertion.
// - `remove`/`remove_at` return the model's value; removal invalidates ids.
// - Iteration equals the association list, order included.
// - Stale ids never resolve; `len`/`is_empty` parity after every op.
fn run_scenario<S>(
    mut sut: OrderedHashMap<Key, i32, S>,
    pool: &[String],
    ops: Vec<OpI>,
) -> Result<(), TestCaseError>
where
    S: BuildHasher,
{
    let mut model: Vec<(Key, i32)> = Vec::new();
    let mut live: HashMap<Key, EntryId> = HashMap::new();
    let mut stale: Vec<EntryId> = Vec::new();

    for op in ops {
        match op {
            OpI::Insert(i, v) => {
                let k = key_from(pool, i);
                let already = model.iter().any(|(mk, _)| *mk == k);
                let (id, inserted) = sut.insert(k.clone(), v);
                prop_assert_eq!(inserted, !already, "insert reports a no-op on duplicate");
                if inserted {
                    model.push((k.clone(), v));
                    let prev = live.insert(k, id);
                    prop_assert!(prev.is_none());
                } else {
                    let &lid = live.get(&k).expect("tracked live id present");
                    prop_assert_eq!(id, lid, "duplicate insert returns the existing id");
                    let mv = model
                        .iter()
                        .find(|(mk, _)| *mk == k)
                        .map(|(_, mv)| *mv)
                        .expect("present in model");
                    prop_assert_eq!(sut.get(&k).copied(), Some(mv), "value untouched");
                }
            }
            OpI::InsertOrAssign(i, v) => {
                let k = key_from(pool, i);
                let pos = model.iter().position(|(mk, _)| *mk == k);
                let (id, inserted) = sut.insert_or_assign(k.clone(), v);
                match pos {
                    Some(p) => {
                        prop_assert!(!inserted);
                        model[p].1 = v;
                        let &lid = live.get(&k).expect("tracked live id present");
                        prop_assert_eq!(id, lid, "overwrite keeps the id");
                    }
                    None => {
                        prop_assert!(inserted);
                        model.push((k.clone(), v));
                        let prev = live.insert(k, id);
                        prop_assert!(prev.is_none());
                    }
                }
            }
            OpI::Remove(i) => {
                let k = key_from(pool, i);
                let pos = model.iter().position(|(mk, _)| *mk == k);
                let removed = sut.remove(&k);
                match pos {
                    Some(p) => {
                        let (_, mv) = model.remove(p);
                        prop_assert_eq!(removed, Some(mv));
                        let id = live.remove(&k).expect("tracked live id present");
                        stale.push(id);
                    }
                    None => prop_assert_eq!(removed, None),
                }
            }
            OpI::RemoveAt(i) => {
                let k = key_from(pool, i);
                if let Some(&id) = live.get(&k) {
                    let (kk, vv) = sut.remove_at(id).expect("live id removes");
                    prop_assert_eq!(&kk, &k);
                    let p = model
                        .iter()
                        .position(|(mk, _)| *mk == kk)
                        .expect("present in model");
                    let (_, mv) = model.remove(p);
                    prop_assert_eq!(vv, mv);
                    live.remove(&k);
                    stale.push(id);
                } else if let Some(&id) = stale.last() {
                    prop_assert_eq!(sut.remove_at(id), None, "stale id must not remove");
                }
            }
            OpI::Find(i) => {
                let k = key_from(pool, i);
                let found = sut.find(&k);
                let present = model.iter().any(|(mk, _)| *mk == k);
                prop_assert_eq!(found.is_some(), present);
                if let Some(id) = found {
                    let &lid = live.get(&k).expect("tracked live id present");
                    prop_assert_eq!(id, lid, "find returns the stable id");
                }
            }
            OpI::Contains(s) => {
                let has = sut.contains_key(s.as_str());
                let has_model = model.iter().any(|(mk, _)| mk.0 == s);
                prop_assert_eq!(has, has_model);
            }
            OpI::Mutate(i, d) => {
                let k = key_from(pool, i);
                if let Some(vr) = sut.get_mut(&k) {
                    *vr = vr.saturating_add(d);
                    let p = model
                        .iter()
                        .position(|(mk, _)| *mk == k)
                        .expect("present in model");
                    model[p].1 = model[p].1.saturating_add(d);
                } else {
                    prop_assert!(!model.iter().any(|(mk, _)| *mk == k));
                }
            }
            OpI::Iterate => {
                let got: Vec<(Key, i32)> = sut.iter().map(|(_, k, v)| (k.clone(), *v)).collect();
                prop_assert_eq!(&got, &model, "iteration must match the ordered model");
            }
            OpI::Clear => {
                sut.clear();
                model.clear();
                stale.extend(live.drain().map(|(_, id)| id));
            }
        }

        // Post-conditions after each op
        for &id in &stale {
            prop_assert!(!sut.contains_id(id), "stale id must not resolve");
        }
        prop_assert_eq!(sut.len(), model.len());
        prop_assert_eq!(sut.is_empty(), model.is_empty());
    }

    let got: Vec<(Key, i32)> = sut.iter().map(|(_, k, v)| (k.clone(), *v)).collect();
    prop_assert_eq!(got, model, "final iteration must match the ordered model");
    Ok(())
}

proptest! {
    #![proptest_config(ProptestConfig { cases: 64, .. ProptestConfig::default() })]
    #[test]
    fn prop_state_machine((pool, ops) in arb_scenario()) {
        run_scenario(OrderedHashMap::new(), &pool, ops)?;
    }
}

// Collision variant using a constant hasher to stress equality resolution.
#[derive(Clone, Default)]
struct ConstBuildHasher;
struct ConstHasher;
impl BuildHasher for ConstBuildHasher {
    type Hasher = ConstHasher;
    fn build_hasher(&self) -> Self::Hasher {
        ConstHasher
    }
}
impl Hasher for ConstHasher {
    fn write(&mut self, _bytes: &[u8]) {}
    fn finish(&self) -> u64 {
        0
    }
}

// Property: Same state-machine invariants as above, under worst-case
// collision behavior (constant hasher). This stresses equality probing,
// collision resolution in the index, and order-list splicing when every
// entry shares one bucket.
proptest! {
    #![proptest_config(ProptestConfig { cases: 64, .. ProptestConfig::default() })]
    #[test]
    fn prop_state_machine_with_collisions((pool, ops) in arb_scenario()) {
        run_scenario(OrderedHashMap::with_hasher(ConstBuildHasher), &pool, ops)?;
    }
}
