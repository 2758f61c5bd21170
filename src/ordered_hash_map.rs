//! OrderedHashMap: structural layer with insertion-ordered entries and stable ids.

use core::borrow::Borrow;
use core::fmt;
use core::hash::{BuildHasher, Hash};
use hashbrown::HashTable;
use slotmap::{DefaultKey, SlotMap};
use std::collections::hash_map::RandomState;

/// Stable identifier for one entry.
///
/// Ids are generational: once the entry they name is removed they never
/// resolve again, even if the physical slot is reused by a later insert.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub struct EntryId(DefaultKey);

impl EntryId {
    pub(crate) fn new(k: DefaultKey) -> Self {
        EntryId(k)
    }
    pub(crate) fn raw(&self) -> DefaultKey {
        self.0
    }
}

#[derive(Clone, Debug)]
struct Entry<K, V> {
    key: K,
    value: V,
    hash: u64,
    prev: Option<DefaultKey>,
    next: Option<DefaultKey>,
}

/// Hash map that remembers insertion order.
///
/// Entries live in a slot map under generational keys and carry intrusive
/// `prev`/`next` links forming the order list; a raw hash table maps key
/// hashes to slot keys. Every entry stores its hash, so rehashing and
/// removal never call back into `K: Hash`.
#[derive(Clone)]
pub struct OrderedHashMap<K, V, S = RandomState> {
    hasher: S,
    index: HashTable<DefaultKey>,
    slots: SlotMap<DefaultKey, Entry<K, V>>, // storage using generational keys
    head: Option<DefaultKey>,
    tail: Option<DefaultKey>,
}

impl<K, V> OrderedHashMap<K, V>
where
    K: Eq + Hash,
{
    pub fn new() -> Self {
        Self::with_hasher(Default::default())
    }
}

impl<K, V> Default for OrderedHashMap<K, V>
where
    K: Eq + Hash,
{
    fn default() -> Self {
        Self::new()
    }
}

/// Iterator over entries in insertion order.
pub struct Iter<'a, K, V> {
    slots: &'a SlotMap<DefaultKey, Entry<K, V>>,
    cur: Option<DefaultKey>,
    remaining: usize,
}

impl<'a, K, V> Iterator for Iter<'a, K, V> {
    type Item = (EntryId, &'a K, &'a V);
    #[inline]
    fn next(&mut self) -> Option<Self::Item> {
        let k = self.cur?;
        let e = &self.slots[k];
        self.cur = e.next;
        self.remaining -= 1;
        Some((EntryId::new(k), &e.key, &e.value))
    }
    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl<K, V> ExactSizeIterator for Iter<'_, K, V> {}
impl<K, V> core::iter::FusedIterator for Iter<'_, K, V> {}

// Appends a fresh entry at the back of the order list. Free function so it
// can run while a `hash_table` entry still borrows the index.
fn push_back<K, V>(
    slots: &mut SlotMap<DefaultKey, Entry<K, V>>,
    head: &mut Option<DefaultKey>,
    tail: &mut Option<DefaultKey>,
    key: K,
    value: V,
    hash: u64,
) -> DefaultKey {
    let prev = *tail;
    let k = slots.insert(Entry {
        key,
        value,
        hash,
        prev,
        next: None,
    });
    match prev {
        Some(p) => slots[p].next = Some(k),
        None => *head = Some(k),
    }
    *tail = Some(k);
    k
}

impl<K, V, S> OrderedHashMap<K, V, S>
where
    K: Eq + Hash,
    S: BuildHasher,
{
    pub fn with_hasher(hasher: S) -> Self {
        Self {
            hasher,
            index: HashTable::new(),
            slots: SlotMap::with_key(),
            head: None,
            tail: None,
        }
    }

    pub fn hasher(&self) -> &S {
        &self.hasher
    }

    fn make_hash<Q>(&self, q: &Q) -> u64
    where
        Q: ?Sized + Hash,
    {
        self.hasher.hash_one(q)
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Entries the map can hold before the next reallocation.
    pub fn capacity(&self) -> usize {
        self.index.capacity().min(self.slots.capacity())
    }

    pub fn reserve(&mut self, additional: usize) {
        self.index.reserve(additional, |&k| {
            self.slots.get(k).map(|e| e.hash).unwrap_or(0)
        });
        self.slots.reserve(additional);
    }

    pub fn find<Q>(&self, q: &Q) -> Option<EntryId>
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
    {
        let hash = self.make_hash(q);
        if let Some(&k) = self.index.find(hash, |&k| {
            self.slots
                .get(k)
                .map(|e| e.key.borrow() == q)
                .unwrap_or(false)
        }) {
            return Some(EntryId::new(k));
        }
        None
    }

    pub fn contains_key<Q>(&self, q: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
    {
        self.find(q).is_some()
    }

    pub fn get<Q>(&self, q: &Q) -> Option<&V>
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
    {
        let id = self.find(q)?;
        self.slots.get(id.raw()).map(|e| &e.value)
    }

    pub fn get_mut<Q>(&mut self, q: &Q) -> Option<&mut V>
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
    {
        let id = self.find(q)?;
        self.slots.get_mut(id.raw()).map(|e| &mut e.value)
    }

    /// Inserts `key` at the back of the order unless it is already present.
    ///
    /// Returns the entry id and whether an insert happened. On a duplicate
    /// key the stored entry is left untouched (the given key and value are
    /// dropped) and its position in the order does not move.
    pub fn insert(&mut self, key: K, value: V) -> (EntryId, bool) {
        let hash = self.make_hash(&key);
        match self.index.entry(
            hash,
            |&kk| self.slots.get(kk).map(|e| e.key == key).unwrap_or(false),
            |&kk| self.slots.get(kk).map(|e| e.hash).unwrap_or(0),
        ) {
            hashbrown::hash_table::Entry::Occupied(o) => (EntryId::new(*o.get()), false),
            hashbrown::hash_table::Entry::Vacant(v) => {
                let k = push_back(
                    &mut self.slots,
                    &mut self.head,
                    &mut self.tail,
                    key,
                    value,
                    hash,
                );
                let _ = v.insert(k);
                (EntryId::new(k), true)
            }
        }
    }

    /// Inserts `key` or overwrites the value of the existing entry.
    ///
    /// Overwriting keeps the entry in place: same id, same position in the
    /// order, same stored key object.
    pub fn insert_or_assign(&mut self, key: K, value: V) -> (EntryId, bool) {
        let hash = self.make_hash(&key);
        match self.index.entry(
            hash,
            |&kk| self.slots.get(kk).map(|e| e.key == key).unwrap_or(false),
            |&kk| self.slots.get(kk).map(|e| e.hash).unwrap_or(0),
        ) {
            hashbrown::hash_table::Entry::Occupied(o) => {
                let k = *o.get();
                self.slots[k].value = value;
                (EntryId::new(k), false)
            }
            hashbrown::hash_table::Entry::Vacant(v) => {
                let k = push_back(
                    &mut self.slots,
                    &mut self.head,
                    &mut self.tail,
                    key,
                    value,
                    hash,
                );
                let _ = v.insert(k);
                (EntryId::new(k), true)
            }
        }
    }

    pub fn remove<Q>(&mut self, q: &Q) -> Option<V>
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
    {
        self.remove_entry(q).map(|(_k, v)| v)
    }

    pub fn remove_entry<Q>(&mut self, q: &Q) -> Option<(K, V)>
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
    {
        let id = self.find(q)?;
        self.remove_at(id)
    }

    /// Removes the entry named by `id`, or returns `None` if the id is stale.
    pub fn remove_at(&mut self, id: EntryId) -> Option<(K, V)> {
        let k = id.raw();

        // Remove slot
        let entry = self.slots.remove(k)?;

        // Unlink from index via occupied entry removal
        self.index
            .find_entry(entry.hash, |&kk| kk == k)
            .unwrap()
            .remove();

        // Splice neighbors around the removed entry
        match entry.prev {
            Some(p) => self.slots[p].next = entry.next,
            None => self.head = entry.next,
        }
        match entry.next {
            Some(n) => self.slots[n].prev = entry.prev,
            None => self.tail = entry.prev,
        }

        Some((entry.key, entry.value))
    }

    /// Drops every entry. Outstanding ids never resolve again: clearing the
    /// slot map bumps slot generations just like individual removals do.
    pub fn clear(&mut self) {
        self.slots.clear();
        self.index.clear();
        self.head = None;
        self.tail = None;
    }

    pub fn contains_id(&self, id: EntryId) -> bool {
        self.slots.contains_key(id.raw())
    }

    pub fn key_of(&self, id: EntryId) -> Option<&K> {
        self.slots.get(id.raw()).map(|e| &e.key)
    }

    pub fn value_of(&self, id: EntryId) -> Option<&V> {
        self.slots.get(id.raw()).map(|e| &e.value)
    }

    pub fn value_of_mut(&mut self, id: EntryId) -> Option<&mut V> {
        self.slots.get_mut(id.raw()).map(|e| &mut e.value)
    }

    /// Id of the first entry in the order, if any.
    pub fn first_id(&self) -> Option<EntryId> {
        self.head.map(EntryId::new)
    }

    /// Id of the entry after `id` in the order. `None` when `id` names the
    /// last entry or is stale.
    pub fn next_of(&self, id: EntryId) -> Option<EntryId> {
        self.slots.get(id.raw()).and_then(|e| e.next).map(EntryId::new)
    }

    pub fn iter(&self) -> Iter<'_, K, V> {
        Iter {
            slots: &self.slots,
            cur: self.head,
            remaining: self.slots.len(),
        }
    }

    pub fn keys(&self) -> impl Iterator<Item = &K> + '_ {
        self.iter().map(|(_, k, _)| k)
    }

    pub fn values(&self) -> impl Iterator<Item = &V> + '_ {
        self.iter().map(|(_, _, v)| v)
    }

    /// Runs `f` over every entry in insertion order with mutable access to
    /// the value. The order list borrows each slot in turn, so a lending
    /// `iter_mut` cannot be expressed safely; a closure walk can.
    pub fn for_each_mut(&mut self, mut f: impl FnMut(&K, &mut V)) {
        let mut cur = self.head;
        while let Some(k) = cur {
            let e = &mut self.slots[k];
            cur = e.next;
            f(&e.key, &mut e.value);
        }
    }
}

impl<K, V, S> fmt::Debug for OrderedHashMap<K, V, S>
where
    K: fmt::Debug + Eq + Hash,
    V: fmt::Debug,
    S: BuildHasher,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map()
            .entries(self.iter().map(|(_, k, v)| (k, v)))
            .finish()
    }
}

impl<K, V, S> FromIterator<(K, V)> for OrderedHashMap<K, V, S>
where
    K: Eq + Hash,
    S: BuildHasher + Default,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut map = Self::with_hasher(S::default());
        map.extend(iter);
        map
    }
}

impl<K, V, S> Extend<(K, V)> for OrderedHashMap<K, V, S>
where
    K: Eq + Hash,
    S: BuildHasher,
{
    fn extend<I: IntoIterator<Item = (K, V)>>(&mut self, iter: I) {
        for (k, v) in iter {
            self.insert_or_assign(k, v);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn collect<K: Clone + Eq + Hash, V: Clone, S: BuildHasher>(
        m: &OrderedHashMap<K, V, S>,
    ) -> Vec<(K, V)> {
        m.iter().map(|(_, k, v)| (k.clone(), v.clone())).collect()
    }

    /// Invariant: Duplicate keys are rejected; the stored entry, its value and
    /// its position are left untouched, and the existing id is returned.
    #[test]
    fn duplicate_insert_preserves_existing_entry() {
        let mut m: OrderedHashMap<String, i32> = OrderedHashMap::new();
        let (id1, inserted1) = m.insert("dup".to_string(), 1);
        assert!(inserted1);
        let (id2, inserted2) = m.insert("dup".to_string(), 2);
        assert!(!inserted2);
        assert_eq!(id1, id2);
        assert_eq!(m.get("dup"), Some(&1));
        assert_eq!(m.len(), 1);
    }

    /// Invariant: `insert_or_assign` on a present key overwrites the value in
    /// place: same id, same position in the iteration order.
    #[test]
    fn insert_or_assign_overwrites_in_place() {
        let mut m: OrderedHashMap<&'static str, i32> = OrderedHashMap::new();
        m.insert("a", 1);
        let (id_b, _) = m.insert("b", 2);
        m.insert("c", 3);

        let (id_b2, inserted) = m.insert_or_assign("b", 20);
        assert!(!inserted);
        assert_eq!(id_b, id_b2);
        assert_eq!(
            collect(&m),
            vec![("a", 1), ("b", 20), ("c", 3)],
            "overwrite must not move the entry"
        );
    }

    /// Invariant: Iteration, `keys` and `values` follow insertion order.
    #[test]
    fn iteration_follows_insertion_order() {
        let mut m: OrderedHashMap<String, i32> = OrderedHashMap::new();
        for (i, k) in ["first", "second", "third"].iter().enumerate() {
            m.insert((*k).to_string(), i as i32);
        }
        let keys: Vec<String> = m.keys().cloned().collect();
        assert_eq!(keys, ["first", "second", "third"]);
        let values: Vec<i32> = m.values().copied().collect();
        assert_eq!(values, [0, 1, 2]);
        assert_eq!(m.iter().len(), 3);
    }

    /// Invariant: Removing head, middle or tail entries splices their
    /// neighbors back together and iteration stays in the surviving order.
    #[test]
    fn removal_relinks_order() {
        let mut m: OrderedHashMap<&'static str, i32> = OrderedHashMap::new();
        for (i, k) in ["a", "b", "c", "d"].iter().enumerate() {
            m.insert(*k, i as i32);
        }

        assert_eq!(m.remove(&"b"), Some(1)); // middle
        assert_eq!(collect(&m), vec![("a", 0), ("c", 2), ("d", 3)]);

        assert_eq!(m.remove(&"a"), Some(0)); // head
        assert_eq!(collect(&m), vec![("c", 2), ("d", 3)]);

        assert_eq!(m.remove(&"d"), Some(3)); // tail
        assert_eq!(collect(&m), vec![("c", 2)]);

        assert_eq!(m.remove(&"c"), Some(2));
        assert!(m.is_empty());
        assert_eq!(m.first_id(), None);
    }

    /// Invariant: A key removed and inserted again goes to the back of the
    /// order, not to its old position.
    #[test]
    fn reinserting_removed_key_appends_at_end() {
        let mut m: OrderedHashMap<&'static str, i32> = OrderedHashMap::new();
        m.insert("a", 1);
        m.insert("b", 2);
        m.insert("c", 3);

        m.remove(&"b");
        m.insert("b", 20);
        assert_eq!(collect(&m), vec![("a", 1), ("c", 3), ("b", 20)]);
    }

    /// Invariant: Borrowed lookup works (store `String`, query with `&str`)
    /// across find, get, contains and remove.
    #[test]
    fn borrowed_lookup_with_str() {
        let mut m: OrderedHashMap<String, i32> = OrderedHashMap::new();
        m.insert("hello".to_string(), 1);
        assert!(m.contains_key("hello"));
        assert!(!m.contains_key("world"));
        assert!(m.find("hello").is_some());
        assert!(m.find("world").is_none());
        assert_eq!(m.get("hello"), Some(&1));
        assert_eq!(m.remove("hello"), Some(1));
        assert!(m.is_empty());
    }

    /// Invariant: Removing an entry invalidates its id and does not alias a
    /// new entry inserted afterward, even if the physical slot is reused
    /// (generational keys).
    #[test]
    fn stale_id_does_not_alias_new_entry() {
        let mut m: OrderedHashMap<String, i32> = OrderedHashMap::new();
        let (id1, _) = m.insert("old".to_string(), 1);
        m.remove_at(id1).unwrap();
        // Next insert likely reuses the freed slot with bumped generation.
        let (id2, _) = m.insert("new".to_string(), 2);
        assert_ne!(id1, id2, "ids must differ across generations");
        assert!(!m.contains_id(id1), "stale id must not resolve");
        assert_eq!(m.value_of(id1), None);
        assert_eq!(m.remove_at(id1), None);
        assert!(m.contains_key("new"));
        assert!(!m.contains_key("old"));
    }

    /// Invariant: Lookups and removals work under heavy hash collisions;
    /// equality resolves to the correct entry. This also exercises collision
    /// probing via `Eq` and index removal via stored slot keys.
    #[test]
    fn collision_handling_with_const_hasher() {
        #[derive(Clone, Default)]
        struct ConstBuildHasher;
        struct ConstHasher;
        impl BuildHasher for ConstBuildHasher {
            type Hasher = ConstHasher;
            fn build_hasher(&self) -> Self::Hasher {
                ConstHasher
            }
        }
        impl core::hash::Hasher for ConstHasher {
            fn write(&mut self, _bytes: &[u8]) {}
            fn finish(&self) -> u64 {
                0
            } // force all keys into the same hash bucket
        }

        let mut m: OrderedHashMap<String, i32, ConstBuildHasher> =
            OrderedHashMap::with_hasher(ConstBuildHasher);
        m.insert("a".to_string(), 1);
        m.insert("b".to_string(), 2);
        m.insert("c".to_string(), 3);

        let ia = m.find("a").expect("find a");
        let ib = m.find("b").expect("find b");
        assert_ne!(ia, ib);
        assert_eq!(m.key_of(ia), Some(&"a".to_string()));
        assert_eq!(m.key_of(ib), Some(&"b".to_string()));

        // Removing under collisions must leave the survivors reachable.
        assert_eq!(m.remove("b"), Some(2));
        assert_eq!(m.get("a"), Some(&1));
        assert_eq!(m.get("c"), Some(&3));
        assert!(m.get("b").is_none());
        assert_eq!(collect(&m), vec![("a".to_string(), 1), ("c".to_string(), 3)]);
    }

    /// Invariant: `for_each_mut` visits entries in insertion order and its
    /// updates are seen by subsequent lookups.
    #[test]
    fn for_each_mut_visits_in_order_and_updates() {
        let mut m: OrderedHashMap<&'static str, i32> = OrderedHashMap::new();
        m.insert("x", 1);
        m.insert("y", 2);
        m.insert("z", 3);

        let mut visited = Vec::new();
        m.for_each_mut(|k, v| {
            visited.push(*k);
            *v *= 10;
        });
        assert_eq!(visited, ["x", "y", "z"]);
        assert_eq!(collect(&m), vec![("x", 10), ("y", 20), ("z", 30)]);
    }

    /// Invariant: `clear` empties the map, resets the order list and
    /// invalidates outstanding ids even after the map is refilled.
    #[test]
    fn clear_empties_and_invalidates_ids() {
        let mut m: OrderedHashMap<String, i32> = OrderedHashMap::new();
        let (id, _) = m.insert("a".to_string(), 1);
        m.insert("b".to_string(), 2);

        m.clear();
        assert_eq!(m.len(), 0);
        assert!(m.is_empty());
        assert_eq!(m.first_id(), None);
        assert!(!m.contains_id(id));

        m.insert("c".to_string(), 3);
        assert!(!m.contains_id(id), "cleared id must not alias a refill");
        assert_eq!(collect(&m), vec![("c".to_string(), 3)]);
    }

    /// Invariant: `reserve` grows capacity without touching the contents.
    #[test]
    fn reserve_grows_capacity() {
        let mut m: OrderedHashMap<i32, i32> = OrderedHashMap::new();
        m.insert(1, 1);
        m.reserve(100);
        assert!(m.capacity() >= 100);
        assert_eq!(collect(&m), vec![(1, 1)]);
    }

    /// Invariant: `len()` and `is_empty()` reflect the number of live
    /// entries, unaffected by duplicate inserts and updated after removals.
    #[test]
    fn len_and_is_empty_behaviors() {
        let mut m: OrderedHashMap<String, i32> = OrderedHashMap::new();
        assert_eq!(m.len(), 0);
        assert!(m.is_empty());

        m.insert("a".to_string(), 1);
        assert_eq!(m.len(), 1);

        m.insert("a".to_string(), 2); // duplicate
        assert_eq!(m.len(), 1);

        m.insert("b".to_string(), 2);
        assert_eq!(m.len(), 2);

        m.remove("a");
        assert_eq!(m.len(), 1);
        m.remove("b");
        assert_eq!(m.len(), 0);
        assert!(m.is_empty());
    }

    /// Invariant: Walking `first_id`/`next_of` visits the same sequence as
    /// `iter`, and `next_of` answers `None` for the tail and for stale ids.
    #[test]
    fn first_id_next_of_walk_matches_iter() {
        let mut m: OrderedHashMap<&'static str, i32> = OrderedHashMap::new();
        m.insert("a", 1);
        m.insert("b", 2);
        m.insert("c", 3);

        let mut walked = Vec::new();
        let mut cur = m.first_id();
        while let Some(id) = cur {
            walked.push(*m.key_of(id).unwrap());
            cur = m.next_of(id);
        }
        let via_iter: Vec<&'static str> = m.iter().map(|(_, k, _)| *k).collect();
        assert_eq!(walked, via_iter);

        let (last, _) = m.insert_or_assign("c", 3);
        assert_eq!(m.next_of(last), None);

        let (id_b, _) = m.insert_or_assign("b", 2);
        m.remove_at(id_b).unwrap();
        assert_eq!(m.next_of(id_b), None, "stale id walks nowhere");
    }

    /// Invariant: `get_mut` updates are observable through `get`, and absent
    /// keys answer `None` for both.
    #[test]
    fn get_mut_roundtrip() {
        let mut m: OrderedHashMap<String, i32> = OrderedHashMap::new();
        m.insert("k".to_string(), 10);
        *m.get_mut("k").unwrap() += 5;
        assert_eq!(m.get("k"), Some(&15));
        assert!(m.get("absent").is_none());
        assert!(m.get_mut("absent").is_none());
    }

    /// Invariant: A clone owns detached storage: mutations of the original
    /// are invisible to the clone, order is preserved, and slot layout is
    /// carried over so ids taken before the clone resolve in both.
    #[test]
    fn clone_detaches_storage() {
        let mut m: OrderedHashMap<String, i32> = OrderedHashMap::new();
        m.insert("a".to_string(), 1);
        let (id_b, _) = m.insert("b".to_string(), 2);

        let snapshot = m.clone();
        m.insert_or_assign("b".to_string(), 20);
        m.insert("c".to_string(), 3);
        m.remove("a");

        assert_eq!(
            collect(&snapshot),
            vec![("a".to_string(), 1), ("b".to_string(), 2)]
        );
        assert_eq!(snapshot.value_of(id_b), Some(&2));
        assert_eq!(m.value_of(id_b), Some(&20));
    }

    /// Invariant: `FromIterator` keeps first-seen order while later duplicate
    /// pairs overwrite values in place.
    #[test]
    fn from_iter_keeps_first_seen_order() {
        let m: OrderedHashMap<&'static str, i32> =
            [("a", 1), ("b", 2), ("a", 10)].into_iter().collect();
        assert_eq!(collect(&m), vec![("a", 10), ("b", 2)]);
    }
}
