//! Dict: reference layer. Cheap aliasing handles over one shared ordered store.

use crate::iter::{Iter, IterMut, END_CURSOR, FOREIGN_CURSOR, STALE_ENTRY};
use crate::ordered_hash_map::OrderedHashMap;
use core::fmt;
use core::hash::{BuildHasher, Hash};
use core::ops::{Deref, DerefMut};
use std::cell::{Ref, RefCell, RefMut};
use std::collections::hash_map::RandomState;
use std::mem;
use std::rc::Rc;
use thiserror::Error;

pub(crate) type SharedStore<K, V, S> = Rc<RefCell<OrderedHashMap<K, V, S>>>;

/// Lookup error for [`Dict::at`].
#[derive(Error, Copy, Clone, Debug, Eq, PartialEq)]
#[error("key not found in dict")]
pub struct NotFoundError;

/// Shared borrow of an entry's key.
///
/// Holds the store's shared borrow for its lifetime; mutating the dict
/// through any handle while it is alive panics.
pub struct KeyRef<'a, K>(pub(crate) Ref<'a, K>);

impl<K> Deref for KeyRef<'_, K> {
    type Target = K;
    fn deref(&self) -> &K {
        &self.0
    }
}

impl<K: fmt::Debug> fmt::Debug for KeyRef<'_, K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&**self, f)
    }
}

impl<K: fmt::Display> fmt::Display for KeyRef<'_, K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&**self, f)
    }
}

/// Shared borrow of an entry's value. Same borrow discipline as [`KeyRef`].
pub struct ValueRef<'a, V>(pub(crate) Ref<'a, V>);

impl<V> Deref for ValueRef<'_, V> {
    type Target = V;
    fn deref(&self) -> &V {
        &self.0
    }
}

impl<V: fmt::Debug> fmt::Debug for ValueRef<'_, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&**self, f)
    }
}

impl<V: fmt::Display> fmt::Display for ValueRef<'_, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&**self, f)
    }
}

/// Exclusive borrow of an entry's value.
///
/// Holds the store's exclusive borrow for its lifetime; any other access to
/// the dict while it is alive panics.
pub struct ValueMut<'a, V>(pub(crate) RefMut<'a, V>);

impl<V> Deref for ValueMut<'_, V> {
    type Target = V;
    fn deref(&self) -> &V {
        &self.0
    }
}

impl<V> DerefMut for ValueMut<'_, V> {
    fn deref_mut(&mut self) -> &mut V {
        &mut self.0
    }
}

impl<V: fmt::Debug> fmt::Debug for ValueMut<'_, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&**self, f)
    }
}

impl<V: fmt::Display> fmt::Display for ValueMut<'_, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&**self, f)
    }
}

/// An insertion-ordered map handle with reference semantics.
///
/// `Dict` is a cheap handle to a shared store: `clone` hands out another
/// alias of the same entries, and writes through any alias are visible
/// through all of them. [`Dict::copy`] makes a detached deep copy instead.
/// Entries keep their insertion order; overwriting a value leaves the entry
/// where it is, and re-inserting a removed key appends it at the back.
///
/// The store sits behind a single-threaded borrow cell, so handles are
/// neither `Send` nor `Sync`, and holding a borrow guard (for example a
/// [`ValueMut`]) across a conflicting call panics rather than aliasing.
pub struct Dict<K, V, S = RandomState> {
    pub(crate) store: SharedStore<K, V, S>,
}

impl<K, V, S> Clone for Dict<K, V, S> {
    /// Returns another handle to the same store, not a copy of the entries.
    fn clone(&self) -> Self {
        Dict {
            store: Rc::clone(&self.store),
        }
    }
}

impl<K, V> Dict<K, V>
where
    K: Eq + Hash,
{
    pub fn new() -> Self {
        Self::with_hasher(Default::default())
    }
}

impl<K, V, S> Default for Dict<K, V, S>
where
    K: Eq + Hash,
    S: BuildHasher + Default,
{
    fn default() -> Self {
        Self::with_hasher(S::default())
    }
}

impl<K, V, S> Dict<K, V, S>
where
    K: Eq + Hash,
    S: BuildHasher,
{
    pub fn with_hasher(hasher: S) -> Self {
        Dict {
            store: Rc::new(RefCell::new(OrderedHashMap::with_hasher(hasher))),
        }
    }

    pub fn len(&self) -> usize {
        self.store.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.store.borrow().is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.store.borrow().capacity()
    }

    pub fn reserve(&mut self, additional: usize) {
        self.store.borrow_mut().reserve(additional);
    }

    /// Whether `self` and `other` are aliases of the same store.
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.store, &other.store)
    }

    pub fn contains_key<Q>(&self, key: &Q) -> bool
    where
        K: core::borrow::Borrow<Q>,
        Q: ?Sized + Hash + Eq,
    {
        self.store.borrow().contains_key(key)
    }

    /// Borrows the value stored for `key`, or `None` if absent.
    pub fn get<Q>(&self, key: &Q) -> Option<ValueRef<'_, V>>
    where
        K: core::borrow::Borrow<Q>,
        Q: ?Sized + Hash + Eq,
    {
        Ref::filter_map(self.store.borrow(), |m| m.get(key))
            .ok()
            .map(ValueRef)
    }

    /// Like [`Dict::get`] but an absent key is an error.
    pub fn at<Q>(&self, key: &Q) -> Result<ValueRef<'_, V>, NotFoundError>
    where
        K: core::borrow::Borrow<Q>,
        Q: ?Sized + Hash + Eq,
    {
        self.get(key).ok_or(NotFoundError)
    }

    /// Mutably borrows the value stored for `key`, or `None` if absent.
    pub fn get_mut<Q>(&mut self, key: &Q) -> Option<ValueMut<'_, V>>
    where
        K: core::borrow::Borrow<Q>,
        Q: ?Sized + Hash + Eq,
    {
        RefMut::filter_map(self.store.borrow_mut(), |m| m.get_mut(key))
            .ok()
            .map(ValueMut)
    }

    /// Inserts `key` at the back of the order unless it is already present.
    ///
    /// Returns a cursor at the entry and whether an insert happened. On a
    /// duplicate key the stored entry keeps its value and its position.
    pub fn insert(&mut self, key: K, value: V) -> (IterMut<K, V, S>, bool) {
        let (id, inserted) = self.store.borrow_mut().insert(key, value);
        (IterMut::new(self.clone(), Some(id)), inserted)
    }

    /// Inserts `key` or overwrites the existing entry's value in place.
    ///
    /// Returns a cursor at the entry and whether an insert happened.
    /// Overwriting keeps the entry's position and its stored key object.
    pub fn insert_or_assign(&mut self, key: K, value: V) -> (IterMut<K, V, S>, bool) {
        let (id, inserted) = self.store.borrow_mut().insert_or_assign(key, value);
        (IterMut::new(self.clone(), Some(id)), inserted)
    }

    /// Removes `key` and returns its value, or `None` if absent.
    pub fn remove<Q>(&mut self, key: &Q) -> Option<V>
    where
        K: core::borrow::Borrow<Q>,
        Q: ?Sized + Hash + Eq,
    {
        self.store.borrow_mut().remove(key)
    }

    /// Removes the entry a cursor points at and returns the pair.
    ///
    /// Panics if the cursor belongs to a different dict, sits at the end, or
    /// points to an entry that has already been removed.
    pub fn remove_at(&mut self, at: impl Into<Iter<K, V, S>>) -> (K, V) {
        let at = at.into();
        assert!(
            Rc::ptr_eq(&self.store, &at.dict.store),
            "{}",
            FOREIGN_CURSOR
        );
        let id = match at.at {
            Some(id) => id,
            None => panic!("{}", END_CURSOR),
        };
        match self.store.borrow_mut().remove_at(id) {
            Some(pair) => pair,
            None => panic!("{}", STALE_ENTRY),
        }
    }

    /// Cursor at the entry stored for `key`, or the end cursor if absent.
    pub fn find<Q>(&self, key: &Q) -> Iter<K, V, S>
    where
        K: core::borrow::Borrow<Q>,
        Q: ?Sized + Hash + Eq,
    {
        let at = self.store.borrow().find(key);
        Iter::new(self.clone(), at)
    }

    /// Mutable-cursor version of [`Dict::find`].
    pub fn find_mut<Q>(&mut self, key: &Q) -> IterMut<K, V, S>
    where
        K: core::borrow::Borrow<Q>,
        Q: ?Sized + Hash + Eq,
    {
        let at = self.store.borrow().find(key);
        IterMut::new(self.clone(), at)
    }

    /// Cursor at the first entry in insertion order; the end cursor when the
    /// dict is empty.
    pub fn begin(&self) -> Iter<K, V, S> {
        let first = self.store.borrow().first_id();
        Iter::new(self.clone(), first)
    }

    /// The past-the-last cursor.
    pub fn end(&self) -> Iter<K, V, S> {
        Iter::new(self.clone(), None)
    }

    /// Mutable-cursor version of [`Dict::begin`].
    pub fn begin_mut(&mut self) -> IterMut<K, V, S> {
        let first = self.store.borrow().first_id();
        IterMut::new(self.clone(), first)
    }

    /// Mutable-cursor version of [`Dict::end`].
    pub fn end_mut(&mut self) -> IterMut<K, V, S> {
        IterMut::new(self.clone(), None)
    }

    /// Drops every entry. Visible through all aliases; outstanding cursors
    /// for old entries become stale.
    pub fn clear(&mut self) {
        self.store.borrow_mut().clear();
    }

    /// Deep copy: a new dict with its own store, the same entries in the
    /// same order, and no aliasing to `self`.
    pub fn copy(&self) -> Self
    where
        K: Clone,
        V: Clone,
        S: Clone,
    {
        Dict {
            store: Rc::new(RefCell::new(self.store.borrow().clone())),
        }
    }

    /// Rebinds `self` to a fresh empty store and returns a handle owning the
    /// old one.
    ///
    /// Aliases of the old store keep their entries and now share them with
    /// the returned handle; only `self` is detached. The fresh store reuses
    /// the old hasher.
    pub fn take(&mut self) -> Self
    where
        S: Clone,
    {
        let hasher = self.store.borrow().hasher().clone();
        let fresh = Rc::new(RefCell::new(OrderedHashMap::with_hasher(hasher)));
        Dict {
            store: mem::replace(&mut self.store, fresh),
        }
    }
}

impl<K, V, S> fmt::Debug for Dict<K, V, S>
where
    K: fmt::Debug + Eq + Hash,
    V: fmt::Debug,
    S: BuildHasher,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.store.try_borrow() {
            Ok(m) => fmt::Debug::fmt(&*m, f),
            Err(_) => f.write_str("{ <borrowed> }"),
        }
    }
}

impl<K, V, S> FromIterator<(K, V)> for Dict<K, V, S>
where
    K: Eq + Hash,
    S: BuildHasher + Default,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Dict {
            store: Rc::new(RefCell::new(OrderedHashMap::from_iter(iter))),
        }
    }
}

impl<K, V, S> Extend<(K, V)> for Dict<K, V, S>
where
    K: Eq + Hash,
    S: BuildHasher,
{
    fn extend<I: IntoIterator<Item = (K, V)>>(&mut self, iter: I) {
        self.store.borrow_mut().extend(iter);
    }
}

impl<K, V, const N: usize> From<[(K, V); N]> for Dict<K, V>
where
    K: Eq + Hash,
{
    fn from(entries: [(K, V); N]) -> Self {
        Self::from_iter(entries)
    }
}

impl<K, V, S> IntoIterator for &Dict<K, V, S>
where
    K: Eq + Hash,
    S: BuildHasher,
{
    type Item = crate::iter::EntryRef<K, V, S>;
    type IntoIter = Iter<K, V, S>;
    fn into_iter(self) -> Iter<K, V, S> {
        self.begin()
    }
}

impl<K, V, S> IntoIterator for &mut Dict<K, V, S>
where
    K: Eq + Hash,
    S: BuildHasher,
{
    type Item = crate::iter::EntryMut<K, V, S>;
    type IntoIter = IterMut<K, V, S>;
    fn into_iter(self) -> IterMut<K, V, S> {
        self.begin_mut()
    }
}
