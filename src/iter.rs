//! Cursors and entry views over a shared dict store.

use crate::dict::{Dict, KeyRef, SharedStore, ValueMut, ValueRef};
use crate::ordered_hash_map::EntryId;
use core::fmt;
use core::hash::{BuildHasher, Hash};
use core::iter::FusedIterator;
use std::cell::{Ref, RefMut};
use std::collections::hash_map::RandomState;
use std::rc::Rc;

pub(crate) const END_CURSOR: &str = "dict cursor is at the end";
pub(crate) const STALE_ENTRY: &str = "dict entry has been removed";
pub(crate) const FOREIGN_CURSOR: &str = "cursor belongs to a different dict";

fn key_guard<K, V, S>(store: &SharedStore<K, V, S>, id: EntryId) -> KeyRef<'_, K>
where
    K: Eq + Hash,
    S: BuildHasher,
{
    match Ref::filter_map(store.borrow(), |m| m.key_of(id)) {
        Ok(k) => KeyRef(k),
        Err(_) => panic!("{}", STALE_ENTRY),
    }
}

fn value_guard<K, V, S>(store: &SharedStore<K, V, S>, id: EntryId) -> ValueRef<'_, V>
where
    K: Eq + Hash,
    S: BuildHasher,
{
    match Ref::filter_map(store.borrow(), |m| m.value_of(id)) {
        Ok(v) => ValueRef(v),
        Err(_) => panic!("{}", STALE_ENTRY),
    }
}

fn value_mut_guard<K, V, S>(store: &SharedStore<K, V, S>, id: EntryId) -> ValueMut<'_, V>
where
    K: Eq + Hash,
    S: BuildHasher,
{
    match RefMut::filter_map(store.borrow_mut(), |m| m.value_of_mut(id)) {
        Ok(v) => ValueMut(v),
        Err(_) => panic!("{}", STALE_ENTRY),
    }
}

/// Shared cursor into a dict's insertion order.
///
/// A cursor owns its own alias handle, so it borrows nothing from the dict
/// it came from. It stays pinned to its entry across unrelated inserts and
/// removals; once that entry is removed, any use of the cursor panics. The
/// end cursor sits past the last entry.
///
/// Two cursors are equal when they alias the same store and sit at the same
/// position; the end cursors of one dict are all equal. Cursors of
/// different stores never compare equal, deep copies included.
pub struct Iter<K, V, S = RandomState> {
    pub(crate) dict: Dict<K, V, S>,
    pub(crate) at: Option<EntryId>,
}

impl<K, V, S> Iter<K, V, S>
where
    K: Eq + Hash,
    S: BuildHasher,
{
    pub(crate) fn new(dict: Dict<K, V, S>, at: Option<EntryId>) -> Self {
        Iter { dict, at }
    }

    /// Whether this is the end cursor.
    pub fn is_end(&self) -> bool {
        self.at.is_none()
    }

    fn id(&self) -> EntryId {
        match self.at {
            Some(id) => id,
            None => panic!("{}", END_CURSOR),
        }
    }

    /// Borrows the entry's key. Panics at the end cursor and on a removed
    /// entry.
    pub fn key(&self) -> KeyRef<'_, K> {
        key_guard(&self.dict.store, self.id())
    }

    /// Borrows the entry's value. Same panics as [`Iter::key`].
    pub fn value(&self) -> ValueRef<'_, V> {
        value_guard(&self.dict.store, self.id())
    }

    /// Steps to the next entry in insertion order, reaching the end cursor
    /// after the last entry. Same panics as [`Iter::key`].
    pub fn advance(&mut self) {
        let id = self.id();
        let store = self.dict.store.borrow();
        assert!(store.contains_id(id), "{}", STALE_ENTRY);
        self.at = store.next_of(id);
    }
}

impl<K, V, S> Clone for Iter<K, V, S> {
    fn clone(&self) -> Self {
        Iter {
            dict: self.dict.clone(),
            at: self.at,
        }
    }
}

impl<K, V, S> PartialEq for Iter<K, V, S> {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.dict.store, &other.dict.store) && self.at == other.at
    }
}

impl<K, V, S> Eq for Iter<K, V, S> {}

impl<K, V, S> fmt::Debug for Iter<K, V, S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Iter").field("at", &self.at).finish()
    }
}

impl<K, V, S> Iterator for Iter<K, V, S>
where
    K: Eq + Hash,
    S: BuildHasher,
{
    type Item = EntryRef<K, V, S>;
    fn next(&mut self) -> Option<Self::Item> {
        let id = self.at?;
        {
            let store = self.dict.store.borrow();
            assert!(store.contains_id(id), "{}", STALE_ENTRY);
            self.at = store.next_of(id);
        }
        Some(EntryRef {
            dict: self.dict.clone(),
            id,
        })
    }
}

impl<K, V, S> FusedIterator for Iter<K, V, S>
where
    K: Eq + Hash,
    S: BuildHasher,
{
}

/// Mutable cursor into a dict's insertion order.
///
/// Everything [`Iter`] offers plus value writes. Converts into an [`Iter`]
/// via `From`, losing write access; there is no conversion back.
pub struct IterMut<K, V, S = RandomState> {
    pub(crate) dict: Dict<K, V, S>,
    pub(crate) at: Option<EntryId>,
}

impl<K, V, S> IterMut<K, V, S>
where
    K: Eq + Hash,
    S: BuildHasher,
{
    pub(crate) fn new(dict: Dict<K, V, S>, at: Option<EntryId>) -> Self {
        IterMut { dict, at }
    }

    /// Whether this is the end cursor.
    pub fn is_end(&self) -> bool {
        self.at.is_none()
    }

    fn id(&self) -> EntryId {
        match self.at {
            Some(id) => id,
            None => panic!("{}", END_CURSOR),
        }
    }

    /// Borrows the entry's key. Panics at the end cursor and on a removed
    /// entry.
    pub fn key(&self) -> KeyRef<'_, K> {
        key_guard(&self.dict.store, self.id())
    }

    /// Borrows the entry's value. Same panics as [`IterMut::key`].
    pub fn value(&self) -> ValueRef<'_, V> {
        value_guard(&self.dict.store, self.id())
    }

    /// Mutably borrows the entry's value. Same panics as [`IterMut::key`].
    pub fn value_mut(&mut self) -> ValueMut<'_, V> {
        value_mut_guard(&self.dict.store, self.id())
    }

    /// Replaces the entry's value, keeping its key and position. Same panics
    /// as [`IterMut::key`].
    pub fn set_value(&mut self, value: V) {
        let id = self.id();
        match self.dict.store.borrow_mut().value_of_mut(id) {
            Some(slot) => *slot = value,
            None => panic!("{}", STALE_ENTRY),
        }
    }

    /// Steps to the next entry in insertion order, reaching the end cursor
    /// after the last entry. Same panics as [`IterMut::key`].
    pub fn advance(&mut self) {
        let id = self.id();
        let store = self.dict.store.borrow();
        assert!(store.contains_id(id), "{}", STALE_ENTRY);
        self.at = store.next_of(id);
    }
}

impl<K, V, S> Clone for IterMut<K, V, S> {
    fn clone(&self) -> Self {
        IterMut {
            dict: self.dict.clone(),
            at: self.at,
        }
    }
}

impl<K, V, S> PartialEq for IterMut<K, V, S> {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.dict.store, &other.dict.store) && self.at == other.at
    }
}

impl<K, V, S> Eq for IterMut<K, V, S> {}

impl<K, V, S> fmt::Debug for IterMut<K, V, S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IterMut").field("at", &self.at).finish()
    }
}

impl<K, V, S> From<IterMut<K, V, S>> for Iter<K, V, S> {
    fn from(it: IterMut<K, V, S>) -> Self {
        Iter {
            dict: it.dict,
            at: it.at,
        }
    }
}

impl<K, V, S> Iterator for IterMut<K, V, S>
where
    K: Eq + Hash,
    S: BuildHasher,
{
    type Item = EntryMut<K, V, S>;
    fn next(&mut self) -> Option<Self::Item> {
        let id = self.at?;
        {
            let store = self.dict.store.borrow();
            assert!(store.contains_id(id), "{}", STALE_ENTRY);
            self.at = store.next_of(id);
        }
        Some(EntryMut {
            dict: self.dict.clone(),
            id,
        })
    }
}

impl<K, V, S> FusedIterator for IterMut<K, V, S>
where
    K: Eq + Hash,
    S: BuildHasher,
{
}

/// One entry yielded by iterating a dict.
///
/// Holds its own alias handle plus the entry's id, so it borrows nothing
/// from the iterator that produced it and may outlive it. Accessors panic if
/// the entry has been removed in the meantime.
pub struct EntryRef<K, V, S = RandomState> {
    dict: Dict<K, V, S>,
    id: EntryId,
}

impl<K, V, S> EntryRef<K, V, S>
where
    K: Eq + Hash,
    S: BuildHasher,
{
    pub fn key(&self) -> KeyRef<'_, K> {
        key_guard(&self.dict.store, self.id)
    }

    pub fn value(&self) -> ValueRef<'_, V> {
        value_guard(&self.dict.store, self.id)
    }
}

impl<K, V, S> Clone for EntryRef<K, V, S> {
    fn clone(&self) -> Self {
        EntryRef {
            dict: self.dict.clone(),
            id: self.id,
        }
    }
}

/// One entry yielded by mutably iterating a dict.
pub struct EntryMut<K, V, S = RandomState> {
    dict: Dict<K, V, S>,
    id: EntryId,
}

impl<K, V, S> EntryMut<K, V, S>
where
    K: Eq + Hash,
    S: BuildHasher,
{
    pub fn key(&self) -> KeyRef<'_, K> {
        key_guard(&self.dict.store, self.id)
    }

    pub fn value(&self) -> ValueRef<'_, V> {
        value_guard(&self.dict.store, self.id)
    }

    pub fn value_mut(&mut self) -> ValueMut<'_, V> {
        value_mut_guard(&self.dict.store, self.id)
    }

    /// Replaces the entry's value, keeping its key and position.
    pub fn set_value(&mut self, value: V) {
        match self.dict.store.borrow_mut().value_of_mut(self.id) {
            Some(slot) => *slot = value,
            None => panic!("{}", STALE_ENTRY),
        }
    }
}
