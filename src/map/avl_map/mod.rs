/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at http://mozilla.org/MPL/2.0/.
 */

use super::pair::{Key, Pair, PairCompare, PairReplace};
use crate::error::{Error, Result};
use crate::lock::{CriticalSection, DummyLock, Guarded, RawLock, SyncLock};
use crate::policy::{natural, Assign, Compare, Natural, Replace};
use crate::tree::{self, AvlTree};
use allocator_api2::alloc::{Allocator, Global};
use parking_lot::lock_api::{MappedMutexGuard, MutexGuard};
use std::fmt::{self, Debug};
use std::iter::FromIterator;
use std::ops::ControlFlow;

type MapTree<K, V, C, R, A> = AvlTree<Pair<K, V>, PairCompare<C>, PairReplace<R>, A>;

pub type Iter<'a, K, V, A = Global> =
    std::iter::Map<tree::Iter<'a, Pair<K, V>, A>, fn(&'a Pair<K, V>) -> (&'a K, &'a V)>;

/// A reference to a value that keeps its map locked until it is dropped.
pub type ValueGuard<'a, L, V> = MappedMutexGuard<'a, L, V>;

/// An [`AvlMap`] that can be shared between threads.
pub type AvlMapSync<K, V, C = Natural<K>, R = Assign, A = Global> = AvlMap<K, V, SyncLock, C, R, A>;

/// Creates an [`AvlMap`](map/avl_map/struct.AvlMap.html) containing the given arguments:
///
/// ```
/// # use avl_collections::*;
/// #
/// let m = AvlMap::new();
///
/// m.insert(1, "one");
/// m.insert(2, "two");
/// m.insert(3, "three");
///
/// assert_eq!(avl_map![1 => "one", 2 => "two", 3 => "three"], m);
/// ```
#[macro_export]
macro_rules! avl_map {
    ($($k:expr => $v:expr),* $(,)?) => {
        {
            #[allow(unused_mut)]
            let mut m = $crate::AvlMap::new();
            $(
                m.insert($k, $v);
            )*
            m
        }
    };
}

/// Creates an [`AvlMapSync`](map/avl_map/type.AvlMapSync.html) containing the given arguments:
///
/// ```
/// # use avl_collections::*;
/// #
/// let m = AvlMapSync::new_sync();
///
/// m.insert(1, "one");
/// m.insert(2, "two");
///
/// assert_eq!(avl_map_sync![1 => "one", 2 => "two"], m);
/// ```
#[macro_export]
macro_rules! avl_map_sync {
    ($($k:expr => $v:expr),* $(,)?) => {
        {
            #[allow(unused_mut)]
            let mut m = $crate::AvlMapSync::new_sync();
            $(
                m.insert($k, $v);
            )*
            m
        }
    };
}

/// An ordered map whose every operation runs under the map's own lock.
///
/// The entries live in an [`AvlTree`] of [`Pair`]s ordered by key with the comparator `C`.
/// `update` merges the values of equal keys with the replacer `R`.  The lock `L` decides who may
/// share the map: the default [`DummyLock`] keeps it on one thread, [`SyncLock`] (see
/// [`AvlMapSync`]) makes it `Sync`.
///
/// Every method takes `&self`.  A method holds the lock for its whole duration, so each call is
/// atomic with respect to other calls on the same map.  Several operations can be grouped
/// atomically through [`critical_section()`](AvlMap::critical_section).
///
/// Visitors passed to the `enumerate_*` methods run with the lock held.  They must not call back
/// into the same map: with [`DummyLock`] that panics, with a blocking lock it deadlocks.
///
/// # Complexity
///
/// Let *n* be the number of entries in the map.
///
/// ## Temporal complexity
///
/// | Operation                  | Best case | Average   | Worst case  |
/// |:-------------------------- | ---------:| ---------:| -----------:|
/// | `new()`                    |      Θ(1) |      Θ(1) |        Θ(1) |
/// | `insert()`                 |      Θ(1) | Θ(log(n)) |   Θ(log(n)) |
/// | `update()`                 |      Θ(1) | Θ(log(n)) |   Θ(log(n)) |
/// | `remove()`                 |      Θ(1) | Θ(log(n)) |   Θ(log(n)) |
/// | `find()`                   |      Θ(1) | Θ(log(n)) |   Θ(log(n)) |
/// | `value()`                  |      Θ(1) | Θ(log(n)) |   Θ(log(n)) |
/// | `count()`                  |      Θ(1) |      Θ(1) |        Θ(1) |
/// | `clone()`                  |      Θ(n) |      Θ(n) |        Θ(n) |
///
/// Lock acquisition comes on top of these.
pub struct AvlMap<K, V, L = DummyLock, C = Natural<K>, R = Assign, A: Allocator = Global> {
    tree: Guarded<L, MapTree<K, V, C, R, A>>,
}

/// The lock of an [`AvlMap`], held for as long as this value lives.
///
/// Operations on a section do not lock again, which makes a sequence of them atomic.
pub struct MapSection<'a, K, V, L, C, R, A>
where
    L: RawLock,
    A: Allocator,
{
    tree: CriticalSection<'a, L, MapTree<K, V, C, R, A>>,
}

impl<K, V> AvlMap<K, V>
where
    K: Ord,
{
    #[must_use]
    pub fn new() -> AvlMap<K, V> {
        AvlMap::from_parts(natural(), Assign, Global)
    }
}

impl<K, V> AvlMapSync<K, V>
where
    K: Ord,
{
    #[must_use]
    pub fn new_sync() -> AvlMapSync<K, V> {
        AvlMap::from_parts(natural(), Assign, Global)
    }
}

impl<K, V, L, C, R, A> AvlMap<K, V, L, C, R, A>
where
    L: RawLock,
    A: Allocator,
{
    /// Creates an empty map with the given key comparator, value replacer and node allocator.
    #[must_use]
    pub fn from_parts(cmp: C, replacer: R, alloc: A) -> AvlMap<K, V, L, C, R, A> {
        let tree = AvlTree::from_parts(PairCompare(cmp), PairReplace(replacer), alloc);

        AvlMap { tree: Guarded::new(tree) }
    }

    /// Creates an empty map ordered by `cmp`.
    #[must_use]
    pub fn with_comparator(cmp: C) -> AvlMap<K, V, L, C, R, A>
    where
        R: Default,
        A: Default,
    {
        AvlMap::from_parts(cmp, R::default(), A::default())
    }

    #[must_use]
    pub fn count(&self) -> usize {
        self.tree.lock().count()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tree.lock().is_empty()
    }

    /// Drops every entry.
    pub fn clear(&self) {
        self.tree.lock().clear();
    }

    /// Locks the map and returns a handle to its contents that keeps it locked.
    pub fn critical_section(&self) -> MapSection<'_, K, V, L, C, R, A> {
        MapSection { tree: self.tree.lock() }
    }

    /// Like `critical_section()`, but returns `None` instead of waiting if the map is locked.
    pub fn try_critical_section(&self) -> Option<MapSection<'_, K, V, L, C, R, A>> {
        self.tree.try_lock().map(|tree| MapSection { tree })
    }

    /// Visits the entries in ascending key order until the visitor breaks.
    pub fn enumerate_forward<B, F>(&self, mut visitor: F) -> ControlFlow<B>
    where
        F: FnMut(&K, &V) -> ControlFlow<B>,
    {
        self.tree.lock().enumerate_forward(|pair| visitor(pair.key(), &pair.value))
    }

    /// Visits the entries in descending key order until the visitor breaks.
    pub fn enumerate_backward<B, F>(&self, mut visitor: F) -> ControlFlow<B>
    where
        F: FnMut(&K, &V) -> ControlFlow<B>,
    {
        self.tree.lock().enumerate_backward(|pair| visitor(pair.key(), &pair.value))
    }

    pub fn enumerate_forward_mut<B, F>(&self, mut visitor: F) -> ControlFlow<B>
    where
        F: FnMut(&K, &mut V) -> ControlFlow<B>,
    {
        self.tree.lock().enumerate_forward_mut(|pair| {
            let (key, value) = pair.parts_mut();
            visitor(key, value)
        })
    }

    pub fn enumerate_backward_mut<B, F>(&self, mut visitor: F) -> ControlFlow<B>
    where
        F: FnMut(&K, &mut V) -> ControlFlow<B>,
    {
        self.tree.lock().enumerate_backward_mut(|pair| {
            let (key, value) = pair.parts_mut();
            visitor(key, value)
        })
    }

    /// Moves the entries out in constant time and leaves this map empty.
    #[must_use]
    pub fn take(&self) -> AvlMap<K, V, L, C, R, A>
    where
        C: Clone,
        R: Clone,
        A: Clone,
    {
        AvlMap { tree: Guarded::new(self.tree.lock().take()) }
    }

    /// Copies the map.  On allocation failure nothing is left allocated.
    pub fn try_duplicate(&self) -> Result<AvlMap<K, V, L, C, R, A>>
    where
        K: Clone,
        V: Clone,
        C: Clone,
        R: Clone,
        A: Clone,
    {
        let tree = self.tree.lock().try_duplicate()?;

        Ok(AvlMap { tree: Guarded::new(tree) })
    }

    /// Returns a copy of all entries, in key order.
    #[must_use]
    pub fn to_vec(&self) -> Vec<(K, V)>
    where
        K: Clone,
        V: Clone,
    {
        self.tree.lock().iter().map(|pair| (pair.key().clone(), pair.value.clone())).collect()
    }

    /// Gives access to the contents without locking, which needs exclusive access to the map.
    pub fn get_mut(&mut self) -> MapView<'_, K, V, C, R, A> {
        MapView { tree: self.tree.get_mut() }
    }
}

impl<K, V, L, C, R, A> AvlMap<K, V, L, C, R, A>
where
    L: RawLock,
    C: Compare<K>,
    A: Allocator + Clone,
{
    /// Inserts an entry unless the key is present.  Returns whether the entry was inserted.
    ///
    /// ```
    /// # use avl_collections::AvlMap;
    /// #
    /// let map = AvlMap::new();
    ///
    /// assert!(map.insert("k", 1));
    /// assert!(!map.insert("k", 2));
    /// assert_eq!(map.get_cloned(&"k"), Some(1));
    /// ```
    pub fn insert(&self, key: K, value: V) -> bool {
        self.try_insert(key, value).unwrap_or_else(|e| e.handle())
    }

    pub fn try_insert(&self, key: K, value: V) -> Result<bool> {
        Ok(self.tree.lock().try_insert(Pair::new(key, value))?.is_some())
    }

    /// Removes the entry with `key`.  Returns whether there was one.
    pub fn remove(&self, key: &K) -> bool {
        self.tree.lock().remove(&Key(key))
    }

    #[must_use]
    pub fn contains_key(&self, key: &K) -> bool {
        self.tree.lock().contains(&Key(key))
    }

    /// Returns the value of `key`.  The map stays locked until the returned guard is dropped.
    ///
    /// ```
    /// # use avl_collections::AvlMap;
    /// #
    /// let map = AvlMap::new();
    ///
    /// map.insert(10, "a");
    ///
    /// assert_eq!(map.find(&10).as_deref(), Some(&"a"));
    /// assert!(map.find(&20).is_none());
    /// ```
    #[must_use]
    pub fn find(&self, key: &K) -> Option<ValueGuard<'_, L, V>> {
        MutexGuard::try_map(self.tree.lock(), |tree| {
            tree.find_mut(&Key(key)).map(|pair| &mut pair.value)
        })
        .ok()
    }

    /// Returns a copy of the value of `key`, releasing the lock before returning.
    #[must_use]
    pub fn get_cloned(&self, key: &K) -> Option<V>
    where
        V: Clone,
    {
        self.tree.lock().find(&Key(key)).map(|pair| pair.value.clone())
    }

    /// Returns the value of `key`, inserting `V::default()` first if the key is absent.  The
    /// lookup and the insertion are one atomic step.
    ///
    /// ```
    /// # use avl_collections::AvlMap;
    /// #
    /// let words: AvlMap<&str, u32> = AvlMap::new();
    ///
    /// for w in ["a", "b", "a"] {
    ///     *words.value(w) += 1;
    /// }
    ///
    /// assert_eq!(words.get_cloned(&"a"), Some(2));
    /// ```
    pub fn value(&self, key: K) -> ValueGuard<'_, L, V>
    where
        V: Default,
    {
        self.try_value(key).unwrap_or_else(|e| e.handle())
    }

    pub fn try_value(&self, key: K) -> Result<ValueGuard<'_, L, V>>
    where
        V: Default,
    {
        let mut failure: Option<Error> = None;

        let guard = MutexGuard::try_map(self.tree.lock(), |tree| {
            match tree.try_get_or_insert(Pair::new(key, V::default())) {
                Ok(pair) => Some(&mut pair.value),
                Err(e) => {
                    failure = Some(e);
                    None
                }
            }
        });

        match (guard, failure) {
            (Ok(value), _) => Ok(value),
            (Err(_), Some(e)) => Err(e),
            (Err(_), None) => unreachable!("lookup failed without an error"),
        }
    }

    /// Inserts every entry whose key is absent, under a single acquisition of the lock.  Returns
    /// the number of entries inserted.
    pub fn insert_all<I>(&self, entries: I) -> usize
    where
        I: IntoIterator<Item = (K, V)>,
    {
        let mut tree = self.tree.lock();
        let mut inserted = 0;

        for (k, v) in entries {
            if tree.insert(Pair::new(k, v)).is_some() {
                inserted += 1;
            }
        }

        #[cfg(feature = "tracing")]
        tracing::debug!(inserted, count = tree.count(), "bulk insert into map");

        inserted
    }

    /// Removes every listed key under a single acquisition of the lock.  Returns the number of
    /// entries removed.
    pub fn remove_all<'k, I>(&self, keys: I) -> usize
    where
        I: IntoIterator<Item = &'k K>,
        K: 'k,
    {
        let mut tree = self.tree.lock();
        let mut removed = 0;

        for key in keys {
            if tree.remove(&Key(key)) {
                removed += 1;
            }
        }

        #[cfg(feature = "tracing")]
        tracing::debug!(removed, count = tree.count(), "bulk remove from map");

        removed
    }

    /// Inserts the entries of `other` whose keys are absent from this map.  Returns the number
    /// of entries inserted.
    ///
    /// The entries of `other` are copied out before this map is locked, so two maps can merge
    /// into each other from different threads without deadlocking.
    pub fn insert_map<L2, C2, R2, A2>(&self, other: &AvlMap<K, V, L2, C2, R2, A2>) -> usize
    where
        K: Clone,
        V: Clone,
        L2: RawLock,
        A2: Allocator,
    {
        if same_instance(self, other) {
            return 0;
        }

        self.insert_all(other.to_vec())
    }
}

impl<K, V, L, C, R, A> AvlMap<K, V, L, C, R, A>
where
    L: RawLock,
    C: Compare<K>,
    R: Replace<V>,
    A: Allocator + Clone,
{
    /// Inserts an entry, or merges `value` into the value already stored under `key`.
    pub fn update(&self, key: K, value: V) {
        self.try_update(key, value).unwrap_or_else(|e| e.handle());
    }

    pub fn try_update(&self, key: K, value: V) -> Result<()> {
        self.tree.lock().try_update(Pair::new(key, value))?;

        Ok(())
    }

    /// Updates every entry under a single acquisition of the lock.
    pub fn update_all<I>(&self, entries: I)
    where
        I: IntoIterator<Item = (K, V)>,
    {
        let mut tree = self.tree.lock();

        for (k, v) in entries {
            tree.update(Pair::new(k, v));
        }

        #[cfg(feature = "tracing")]
        tracing::debug!(count = tree.count(), "bulk update of map");
    }

    /// Updates this map with every entry of `other`.  As with `insert_map()`, `other` is copied
    /// out before this map is locked.
    pub fn update_map<L2, C2, R2, A2>(&self, other: &AvlMap<K, V, L2, C2, R2, A2>)
    where
        K: Clone,
        V: Clone,
        L2: RawLock,
        A2: Allocator,
    {
        if !same_instance(self, other) {
            self.update_all(other.to_vec());
        }
    }
}

fn same_instance<T, U>(a: &T, b: &U) -> bool {
    std::ptr::eq(a as *const T as *const u8, b as *const U as *const u8)
}

impl<'a, K, V, L, C, R, A> MapSection<'a, K, V, L, C, R, A>
where
    L: RawLock,
    A: Allocator,
{
    #[must_use]
    pub fn count(&self) -> usize {
        self.tree.count()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tree.is_empty()
    }

    #[must_use]
    pub fn iter(&self) -> Iter<'_, K, V, A> {
        self.tree.iter().map(|pair| (pair.key(), &pair.value))
    }
}

impl<'a, K, V, L, C, R, A> MapSection<'a, K, V, L, C, R, A>
where
    L: RawLock,
    C: Compare<K>,
    A: Allocator + Clone,
{
    #[must_use]
    pub fn find(&self, key: &K) -> Option<&V> {
        self.tree.find(&Key(key)).map(|pair| &pair.value)
    }

    #[must_use]
    pub fn find_mut(&mut self, key: &K) -> Option<&mut V> {
        self.tree.find_mut(&Key(key)).map(|pair| &mut pair.value)
    }

    pub fn insert(&mut self, key: K, value: V) -> bool {
        self.tree.insert(Pair::new(key, value)).is_some()
    }

    pub fn try_insert(&mut self, key: K, value: V) -> Result<bool> {
        Ok(self.tree.try_insert(Pair::new(key, value))?.is_some())
    }

    pub fn remove(&mut self, key: &K) -> bool {
        self.tree.remove(&Key(key))
    }

    pub fn value(&mut self, key: K) -> &mut V
    where
        V: Default,
    {
        &mut self.tree.get_or_insert(Pair::new(key, V::default())).value
    }

    pub fn update(&mut self, key: K, value: V) -> &mut V
    where
        R: Replace<V>,
    {
        &mut self.tree.update(Pair::new(key, value)).value
    }
}

/// Unlocked access to the contents of a map, obtained through exclusive access to it.
pub struct MapView<'a, K, V, C, R, A: Allocator> {
    tree: &'a mut MapTree<K, V, C, R, A>,
}

impl<'a, K, V, C, R, A> MapView<'a, K, V, C, R, A>
where
    C: Compare<K>,
    R: Replace<V>,
    A: Allocator + Clone,
{
    pub fn update(&mut self, key: K, value: V) -> &mut V {
        &mut self.tree.update(Pair::new(key, value)).value
    }

    #[must_use]
    pub fn find_mut(&mut self, key: &K) -> Option<&mut V> {
        self.tree.find_mut(&Key(key)).map(|pair| &mut pair.value)
    }
}

impl<K, V, L, C, R, A> Clone for AvlMap<K, V, L, C, R, A>
where
    K: Clone,
    V: Clone,
    L: RawLock,
    C: Clone,
    R: Clone,
    A: Allocator + Clone,
{
    fn clone(&self) -> AvlMap<K, V, L, C, R, A> {
        self.try_duplicate().unwrap_or_else(|e| e.handle())
    }
}

impl<K, V, L, R, A> Default for AvlMap<K, V, L, Natural<K>, R, A>
where
    K: Ord,
    L: RawLock,
    R: Default,
    A: Allocator + Default,
{
    fn default() -> AvlMap<K, V, L, Natural<K>, R, A> {
        AvlMap::from_parts(natural(), R::default(), A::default())
    }
}

impl<K, V, L, C, R, A> PartialEq for AvlMap<K, V, L, C, R, A>
where
    K: PartialEq,
    V: PartialEq,
    L: RawLock,
    A: Allocator,
{
    fn eq(&self, other: &AvlMap<K, V, L, C, R, A>) -> bool {
        if same_instance(self, other) {
            return true;
        }

        // Both locks are taken in address order, so concurrent `a == b` and `b == a` agree on
        // which one comes first.
        let (first, second) = if (self as *const Self) < (other as *const Self) {
            (self, other)
        } else {
            (other, self)
        };

        let first = first.tree.lock();
        let second = second.tree.lock();

        *first == *second
    }
}

impl<K, V, L, C, R, A> Debug for AvlMap<K, V, L, C, R, A>
where
    K: Debug,
    V: Debug,
    L: RawLock,
    A: Allocator,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.tree.try_lock() {
            Some(tree) => {
                f.debug_map().entries(tree.iter().map(|pair| (pair.key(), &pair.value))).finish()
            }
            None => f.write_str("AvlMap { <locked> }"),
        }
    }
}

impl<K, V, L, C, R, A> Extend<(K, V)> for AvlMap<K, V, L, C, R, A>
where
    L: RawLock,
    C: Compare<K>,
    R: Replace<V>,
    A: Allocator + Clone,
{
    fn extend<I: IntoIterator<Item = (K, V)>>(&mut self, iter: I) {
        let mut view = self.get_mut();

        for (k, v) in iter {
            view.update(k, v);
        }
    }
}

impl<K, V, L> FromIterator<(K, V)> for AvlMap<K, V, L>
where
    K: Ord,
    L: RawLock,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(into_iter: I) -> AvlMap<K, V, L> {
        let mut map = AvlMap::from_parts(natural(), Assign, Global);

        map.extend(into_iter);

        map
    }
}

#[cfg(test)]
mod test;
