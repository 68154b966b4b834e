/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at http://mozilla.org/MPL/2.0/.
 */

use crate::error::Result;
use crate::lock::{CriticalSection, DummyLock, Guarded, RawLock, SyncLock};
use crate::policy::{natural, Assign, Compare, Natural};
use crate::tree::{self, AvlTree};
use allocator_api2::alloc::{Allocator, Global};
use std::fmt::{self, Debug, Display};
use std::iter::FromIterator;
use std::ops::ControlFlow;

type SetTree<T, C, A> = AvlTree<T, C, Assign, A>;

pub type Iter<'a, T, A = Global> = tree::Iter<'a, T, A>;

/// An [`AvlSet`] that can be shared between threads.
pub type AvlSetSync<T, C = Natural<T>, A = Global> = AvlSet<T, SyncLock, C, A>;

/// Creates an [`AvlSet`](set/avl_set/struct.AvlSet.html) containing the given arguments:
///
/// ```
/// # use avl_collections::*;
/// #
/// let s = AvlSet::new();
///
/// s.insert(1);
/// s.insert(2);
/// s.insert(3);
///
/// assert_eq!(avl_set![1, 2, 3], s);
/// ```
#[macro_export]
macro_rules! avl_set {
    ($($e:expr),* $(,)?) => {
        {
            #[allow(unused_mut)]
            let mut s = $crate::AvlSet::new();
            $(
                s.insert($e);
            )*
            s
        }
    };
}

/// Creates an [`AvlSetSync`](set/avl_set/type.AvlSetSync.html) containing the given arguments:
///
/// ```
/// # use avl_collections::*;
/// #
/// let s = AvlSetSync::new_sync();
///
/// s.insert(1);
/// s.insert(2);
///
/// assert_eq!(avl_set_sync![1, 2], s);
/// ```
#[macro_export]
macro_rules! avl_set_sync {
    ($($e:expr),* $(,)?) => {
        {
            #[allow(unused_mut)]
            let mut s = $crate::AvlSetSync::new_sync();
            $(
                s.insert($e);
            )*
            s
        }
    };
}

/// An ordered set whose every operation runs under the set's own lock.
///
/// # Complexity
///
/// Let *n* be the number of elements in the set and *m* the number of elements in the other
/// set of a binary operation.
///
/// ## Temporal complexity
///
/// | Operation                  | Average          | Worst case       |
/// |:-------------------------- | ----------------:| ----------------:|
/// | `new()`                    |             Θ(1) |             Θ(1) |
/// | `insert()`                 |        Θ(log(n)) |        Θ(log(n)) |
/// | `remove()`                 |        Θ(log(n)) |        Θ(log(n)) |
/// | `contains()`               |        Θ(log(n)) |        Θ(log(n)) |
/// | `count()`                  |             Θ(1) |             Θ(1) |
/// | `union()`                  | Θ(m·log(n + m))  | Θ(m·log(n + m))  |
/// | `intersect()`              | Θ(n·log(m))      | Θ(n·log(m))      |
/// | `subtract()`               | Θ(m·log(n))      | Θ(m·log(n))      |
///
/// # Implementation details
///
/// This is a thin wrapper around an [`AvlTree`] behind a lock, in the same way as
/// [`AvlMap`](crate::AvlMap).  Operations on two sets lock both, always in the same global order,
/// so concurrent `a.union(&b)` and `b.union(&a)` cannot deadlock.
pub struct AvlSet<T, L = DummyLock, C = Natural<T>, A: Allocator = Global> {
    tree: Guarded<L, SetTree<T, C, A>>,
}

/// The lock of an [`AvlSet`], held for as long as this value lives.
pub struct SetSection<'a, T, L, C, A>
where
    L: RawLock,
    A: Allocator,
{
    tree: CriticalSection<'a, L, SetTree<T, C, A>>,
}

impl<T> AvlSet<T>
where
    T: Ord,
{
    #[must_use]
    pub fn new() -> AvlSet<T> {
        AvlSet::from_parts(natural(), Global)
    }
}

impl<T> AvlSetSync<T>
where
    T: Ord,
{
    #[must_use]
    pub fn new_sync() -> AvlSetSync<T> {
        AvlSet::from_parts(natural(), Global)
    }
}

/// Locks two sets in address order.  The sets must be distinct.
fn lock_both<'s, 'o, T, L, C, A, L2, C2, A2>(
    this: &'s AvlSet<T, L, C, A>,
    other: &'o AvlSet<T, L2, C2, A2>,
) -> (CriticalSection<'s, L, SetTree<T, C, A>>, CriticalSection<'o, L2, SetTree<T, C2, A2>>)
where
    L: RawLock,
    L2: RawLock,
    A: Allocator,
    A2: Allocator,
{
    let this_address = this as *const AvlSet<T, L, C, A> as *const u8;
    let other_address = other as *const AvlSet<T, L2, C2, A2> as *const u8;

    if this_address < other_address {
        let mine = this.tree.lock();
        let theirs = other.tree.lock();
        (mine, theirs)
    } else {
        let theirs = other.tree.lock();
        let mine = this.tree.lock();
        (mine, theirs)
    }
}

fn same_instance<T, U>(a: &T, b: &U) -> bool {
    std::ptr::eq(a as *const T as *const u8, b as *const U as *const u8)
}

impl<T, L, C, A> AvlSet<T, L, C, A>
where
    L: RawLock,
    A: Allocator,
{
    #[must_use]
    pub fn from_parts(cmp: C, alloc: A) -> AvlSet<T, L, C, A> {
        AvlSet { tree: Guarded::new(AvlTree::from_parts(cmp, Assign, alloc)) }
    }

    #[must_use]
    pub fn with_comparator(cmp: C) -> AvlSet<T, L, C, A>
    where
        A: Default,
    {
        AvlSet::from_parts(cmp, A::default())
    }

    #[must_use]
    pub fn count(&self) -> usize {
        self.tree.lock().count()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tree.lock().is_empty()
    }

    pub fn clear(&self) {
        self.tree.lock().clear();
    }

    pub fn critical_section(&self) -> SetSection<'_, T, L, C, A> {
        SetSection { tree: self.tree.lock() }
    }

    pub fn try_critical_section(&self) -> Option<SetSection<'_, T, L, C, A>> {
        self.tree.try_lock().map(|tree| SetSection { tree })
    }

    pub fn enumerate_forward<B, F>(&self, visitor: F) -> ControlFlow<B>
    where
        F: FnMut(&T) -> ControlFlow<B>,
    {
        self.tree.lock().enumerate_forward(visitor)
    }

    pub fn enumerate_backward<B, F>(&self, visitor: F) -> ControlFlow<B>
    where
        F: FnMut(&T) -> ControlFlow<B>,
    {
        self.tree.lock().enumerate_backward(visitor)
    }

    /// Returns a copy of all elements in order.
    #[must_use]
    pub fn to_vec(&self) -> Vec<T>
    where
        T: Clone,
    {
        self.tree.lock().iter().cloned().collect()
    }

    /// Moves the elements out in constant time and leaves this set empty.
    #[must_use]
    pub fn take(&self) -> AvlSet<T, L, C, A>
    where
        C: Clone,
        A: Clone,
    {
        AvlSet { tree: Guarded::new(self.tree.lock().take()) }
    }

    pub fn try_duplicate(&self) -> Result<AvlSet<T, L, C, A>>
    where
        T: Clone,
        C: Clone,
        A: Clone,
    {
        let tree = self.tree.lock().try_duplicate()?;

        Ok(AvlSet { tree: Guarded::new(tree) })
    }
}

impl<T, L, C, A> AvlSet<T, L, C, A>
where
    L: RawLock,
    C: Compare<T>,
    A: Allocator + Clone,
{
    /// Adds `value` unless an equal element is present.  Returns whether it was added.
    pub fn insert(&self, value: T) -> bool {
        self.try_insert(value).unwrap_or_else(|e| e.handle())
    }

    pub fn try_insert(&self, value: T) -> Result<bool> {
        Ok(self.tree.lock().try_insert(value)?.is_some())
    }

    pub fn remove(&self, value: &T) -> bool {
        self.tree.lock().remove(value)
    }

    #[must_use]
    pub fn contains(&self, value: &T) -> bool {
        self.tree.lock().contains(value)
    }

    /// Adds every value under a single acquisition of the lock.  Returns the number of values
    /// added.
    pub fn insert_all<I>(&self, values: I) -> usize
    where
        I: IntoIterator<Item = T>,
    {
        let mut tree = self.tree.lock();
        let mut inserted = 0;

        for value in values {
            if tree.insert(value).is_some() {
                inserted += 1;
            }
        }

        #[cfg(feature = "tracing")]
        tracing::debug!(inserted, count = tree.count(), "bulk insert into set");

        inserted
    }

    /// Removes every listed value under a single acquisition of the lock.  Returns the number of
    /// values removed.
    pub fn remove_all<'v, I>(&self, values: I) -> usize
    where
        I: IntoIterator<Item = &'v T>,
        T: 'v,
    {
        let mut tree = self.tree.lock();
        let mut removed = 0;

        for value in values {
            if tree.remove(value) {
                removed += 1;
            }
        }

        #[cfg(feature = "tracing")]
        tracing::debug!(removed, count = tree.count(), "bulk remove from set");

        removed
    }

    /// Adds every element of `other` to this set.  Returns the number of elements added.
    ///
    /// ```
    /// # use avl_collections::avl_set;
    /// #
    /// let a = avl_set![1, 2];
    /// let b = avl_set![2, 3];
    ///
    /// assert_eq!(a.union(&b), 1);
    /// assert_eq!(a, avl_set![1, 2, 3]);
    /// ```
    pub fn union<L2, C2, A2>(&self, other: &AvlSet<T, L2, C2, A2>) -> usize
    where
        T: Clone,
        L2: RawLock,
        A2: Allocator,
    {
        self.try_union(other).unwrap_or_else(|e| e.handle())
    }

    /// Fallible variant of `union()`.  If a node cannot be allocated, the elements added before
    /// the failure stay in the set.
    pub fn try_union<L2, C2, A2>(&self, other: &AvlSet<T, L2, C2, A2>) -> Result<usize>
    where
        T: Clone,
        L2: RawLock,
        A2: Allocator,
    {
        if same_instance(self, other) {
            return Ok(0);
        }

        let (mut mine, theirs) = lock_both(self, other);
        let mut added = 0;

        for value in theirs.iter() {
            if mine.try_insert(value.clone())?.is_some() {
                added += 1;
            }
        }

        #[cfg(feature = "tracing")]
        tracing::debug!(added, count = mine.count(), "set union");

        Ok(added)
    }

    /// Keeps only the elements that `other` contains as well.  Returns the number of elements
    /// removed.  To remove the elements of `other` instead, use [`subtract()`](AvlSet::subtract).
    ///
    /// ```
    /// # use avl_collections::avl_set;
    /// #
    /// let a = avl_set![1, 2, 3, 4];
    ///
    /// assert_eq!(a.intersect(&avl_set![2, 4, 6]), 2);
    /// assert_eq!(a, avl_set![2, 4]);
    /// ```
    pub fn intersect<L2, C2, A2>(&self, other: &AvlSet<T, L2, C2, A2>) -> usize
    where
        T: Clone,
        L2: RawLock,
        C2: Compare<T>,
        A2: Allocator,
    {
        if same_instance(self, other) {
            return 0;
        }

        let (mut mine, theirs) = lock_both(self, other);
        let missing: Vec<T> = mine.iter().filter(|v| !theirs.contains(*v)).cloned().collect();

        for value in &missing {
            mine.remove(value);
        }

        #[cfg(feature = "tracing")]
        tracing::debug!(removed = missing.len(), count = mine.count(), "set intersection");

        missing.len()
    }

    /// Removes every element that `other` contains.  Returns the number of elements removed.
    ///
    /// ```
    /// # use avl_collections::avl_set;
    /// #
    /// let a = avl_set![1, 2, 3, 4];
    ///
    /// assert_eq!(a.subtract(&avl_set![2, 4, 6]), 2);
    /// assert_eq!(a, avl_set![1, 3]);
    /// ```
    pub fn subtract<L2, C2, A2>(&self, other: &AvlSet<T, L2, C2, A2>) -> usize
    where
        L2: RawLock,
        A2: Allocator,
    {
        if same_instance(self, other) {
            let mut tree = self.tree.lock();
            let removed = tree.count();
            tree.clear();
            return removed;
        }

        let (mut mine, theirs) = lock_both(self, other);
        let mut removed = 0;

        for value in theirs.iter() {
            if mine.remove(value) {
                removed += 1;
            }
        }

        #[cfg(feature = "tracing")]
        tracing::debug!(removed, count = mine.count(), "set difference");

        removed
    }

    /// Returns whether `other` contains every element of this set.
    #[must_use]
    pub fn is_subset<L2, C2, A2>(&self, other: &AvlSet<T, L2, C2, A2>) -> bool
    where
        L2: RawLock,
        C2: Compare<T>,
        A2: Allocator,
    {
        if same_instance(self, other) {
            return true;
        }

        let (mine, theirs) = lock_both(self, other);

        mine.count() <= theirs.count() && mine.iter().all(|v| theirs.contains(v))
    }
}

impl<'a, T, L, C, A> SetSection<'a, T, L, C, A>
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
    pub fn first(&self) -> Option<&T> {
        self.tree.first()
    }

    #[must_use]
    pub fn last(&self) -> Option<&T> {
        self.tree.last()
    }

    #[must_use]
    pub fn iter(&self) -> Iter<'_, T, A> {
        self.tree.iter()
    }
}

impl<'a, T, L, C, A> SetSection<'a, T, L, C, A>
where
    L: RawLock,
    C: Compare<T>,
    A: Allocator + Clone,
{
    #[must_use]
    pub fn contains(&self, value: &T) -> bool {
        self.tree.contains(value)
    }

    pub fn insert(&mut self, value: T) -> bool {
        self.tree.insert(value).is_some()
    }

    pub fn try_insert(&mut self, value: T) -> Result<bool> {
        Ok(self.tree.try_insert(value)?.is_some())
    }

    pub fn remove(&mut self, value: &T) -> bool {
        self.tree.remove(value)
    }
}

impl<T, L, C, A> Clone for AvlSet<T, L, C, A>
where
    T: Clone,
    L: RawLock,
    C: Clone,
    A: Allocator + Clone,
{
    fn clone(&self) -> AvlSet<T, L, C, A> {
        self.try_duplicate().unwrap_or_else(|e| e.handle())
    }
}

impl<T, L, A> Default for AvlSet<T, L, Natural<T>, A>
where
    T: Ord,
    L: RawLock,
    A: Allocator + Default,
{
    fn default() -> AvlSet<T, L, Natural<T>, A> {
        AvlSet::from_parts(natural(), A::default())
    }
}

impl<T, L, C, A> PartialEq for AvlSet<T, L, C, A>
where
    T: PartialEq,
    L: RawLock,
    A: Allocator,
{
    fn eq(&self, other: &AvlSet<T, L, C, A>) -> bool {
        if same_instance(self, other) {
            return true;
        }

        let (mine, theirs) = lock_both(self, other);

        *mine == *theirs
    }
}

impl<T, L, C, A> Debug for AvlSet<T, L, C, A>
where
    T: Debug,
    L: RawLock,
    A: Allocator,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.tree.try_lock() {
            Some(tree) => Debug::fmt(&*tree, f),
            None => f.write_str("AvlSet { <locked> }"),
        }
    }
}

impl<T, L, C, A> Display for AvlSet<T, L, C, A>
where
    T: Display,
    L: RawLock,
    A: Allocator,
{
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.tree.try_lock() {
            Some(tree) => Display::fmt(&*tree, fmt),
            None => fmt.write_str("{<locked>}"),
        }
    }
}

impl<T, L, C, A> Extend<T> for AvlSet<T, L, C, A>
where
    L: RawLock,
    C: Compare<T>,
    A: Allocator + Clone,
{
    fn extend<I: IntoIterator<Item = T>>(&mut self, iter: I) {
        let tree = self.tree.get_mut();

        for value in iter {
            tree.insert(value);
        }
    }
}

impl<T, L> FromIterator<T> for AvlSet<T, L>
where
    T: Ord,
    L: RawLock,
{
    fn from_iter<I: IntoIterator<Item = T>>(into_iter: I) -> AvlSet<T, L> {
        let mut set = AvlSet::from_parts(natural(), Global);

        set.extend(into_iter);

        set
    }
}
