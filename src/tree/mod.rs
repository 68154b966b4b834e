/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at http://mozilla.org/MPL/2.0/.
 */

mod path;

use self::path::{Dir, Path, Rotation};
use crate::error::{Error, Result};
use crate::policy::{natural, Assign, Compare, Natural, Replace};
use allocator_api2::alloc::{Allocator, Global};
use allocator_api2::boxed::Box;
use std::cmp::Ordering;
use std::fmt::{self, Debug, Display};
use std::iter::FromIterator;
use std::mem;
use std::ops::ControlFlow;

type Link<V, A> = Option<Box<Node<V, A>, A>>;

/// A mutable ordered collection of unique values kept in a height-balanced
/// [AVL tree](https://en.wikipedia.org/wiki/AVL_tree).
///
/// Values are placed by the comparator `C` and a value that compares equal to a resident one is
/// merged into it by the replacer `R`.  Every node is allocated individually through `A`.
///
/// # Complexity
///
/// Let *n* be the number of values in the tree.
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
/// | `count()`                  |      Θ(1) |      Θ(1) |        Θ(1) |
/// | `take()`                   |      Θ(1) |      Θ(1) |        Θ(1) |
/// | `clone()`                  |      Θ(n) |      Θ(n) |        Θ(n) |
/// | `clear()`                  |      Θ(n) |      Θ(n) |        Θ(n) |
/// | iterator step              |      Θ(1) |      Θ(1) |   Θ(log(n)) |
/// | iterator full              |      Θ(n) |      Θ(n) |        Θ(n) |
///
/// # Implementation details
///
/// Every node caches the heights of both of its subtrees, so the balance factor of a node is
/// available without visiting its children.  After a mutation each node on the path back to the
/// root is rebalanced exactly once.  Removing a node with two children relinks its in-order
/// neighbour from the taller side into its place: values never move between nodes, so a
/// reference obtained from `find_mut()` always designates the same value.
pub struct AvlTree<V, C = Natural<V>, R = Assign, A: Allocator = Global> {
    root: Link<V, A>,
    count: usize,
    cmp: C,
    replacer: R,
    alloc: A,
}

struct Node<V, A: Allocator> {
    // Children come first so that dropping a node releases its subtrees before its value.
    left: Link<V, A>,
    right: Link<V, A>,
    left_height: u8,
    right_height: u8,
    value: V,
}

/// Result of placing a value below some link.
struct Placed {
    /// Where the resident value sits relative to the subtree root now occupying the link.
    path: Path,
    created: bool,
}

#[inline]
fn height<V, A: Allocator>(link: &Link<V, A>) -> u8 {
    link.as_ref().map_or(0, |node| node.height())
}

impl<V, A: Allocator> Node<V, A> {
    fn leaf(value: V) -> Node<V, A> {
        Node { left: None, right: None, left_height: 0, right_height: 0, value }
    }

    #[inline]
    fn height(&self) -> u8 {
        self.left_height.max(self.right_height) + 1
    }

    #[inline]
    fn balance(&self) -> i16 {
        i16::from(self.left_height) - i16::from(self.right_height)
    }

    #[inline]
    fn update_heights(&mut self) {
        self.left_height = height(&self.left);
        self.right_height = height(&self.right);
    }

    fn first(&self) -> &V {
        match &self.left {
            Some(left) => left.first(),
            None => &self.value,
        }
    }

    fn last(&self) -> &V {
        match &self.right {
            Some(right) => right.last(),
            None => &self.value,
        }
    }

    /// Right rotation: the left child becomes the subtree root.
    ///
    /// ```text
    ///         node              pivot
    ///         ╱  ╲              ╱  ╲
    ///     pivot   c    ──▶     a   node
    ///     ╱  ╲                     ╱  ╲
    ///    a    b                   b    c
    /// ```
    fn rotate_right(mut node: Box<Self, A>) -> Box<Self, A> {
        let Some(mut pivot) = node.left.take() else {
            return node;
        };

        node.left = pivot.right.take();
        node.update_heights();
        pivot.right = Some(node);
        pivot.update_heights();

        pivot
    }

    /// Mirror image of `rotate_right()`.
    fn rotate_left(mut node: Box<Self, A>) -> Box<Self, A> {
        let Some(mut pivot) = node.right.take() else {
            return node;
        };

        node.right = pivot.left.take();
        node.update_heights();
        pivot.left = Some(node);
        pivot.update_heights();

        pivot
    }

    /// Refreshes the cached heights of `node` and restores its balance factor to `[-1, 1]`,
    /// provided both subtrees are balanced and their heights differ by at most two.
    fn rebalance(mut node: Box<Self, A>) -> (Box<Self, A>, Rotation) {
        node.update_heights();

        let (node, rotation) = match node.balance() {
            b if b > 1 => {
                let double = node.left.as_ref().map_or(false, |l| l.right_height > l.left_height);

                if double {
                    node.left = node.left.take().map(Node::rotate_left);
                    (Node::rotate_right(node), Rotation::LeftRight)
                } else {
                    (Node::rotate_right(node), Rotation::Right)
                }
            }
            b if b < -1 => {
                let double = node.right.as_ref().map_or(false, |r| r.left_height > r.right_height);

                if double {
                    node.right = node.right.take().map(Node::rotate_right);
                    (Node::rotate_left(node), Rotation::RightLeft)
                } else {
                    (Node::rotate_left(node), Rotation::Left)
                }
            }
            _ => (node, Rotation::None),
        };

        #[cfg(feature = "tracing")]
        if rotation != Rotation::None {
            tracing::trace!(?rotation, height = node.height(), "rebalanced subtree");
        }

        (node, rotation)
    }

    fn rebalance_link(link: &mut Link<V, A>) -> Rotation {
        match link.take() {
            Some(node) => {
                let (node, rotation) = Node::rebalance(node);
                *link = Some(node);
                rotation
            }
            None => Rotation::None,
        }
    }

    /// Detaches the greatest node of the subtree.  Returns the remaining subtree, rebalanced,
    /// and the detached node with no children.
    fn detach_max(mut node: Box<Self, A>) -> (Link<V, A>, Box<Self, A>) {
        match node.right.take() {
            Some(right) => {
                let (rest, max) = Node::detach_max(right);
                node.right = rest;
                (Some(Node::rebalance(node).0), max)
            }
            None => (node.left.take(), node),
        }
    }

    /// Mirror image of `detach_max()`.
    fn detach_min(mut node: Box<Self, A>) -> (Link<V, A>, Box<Self, A>) {
        match node.left.take() {
            Some(left) => {
                let (rest, min) = Node::detach_min(left);
                node.left = rest;
                (Some(Node::rebalance(node).0), min)
            }
            None => (node.right.take(), node),
        }
    }

    /// Removes the node at `link`, putting a replacement node in its place.
    fn splice(link: &mut Link<V, A>) {
        let Some(mut node) = link.take() else {
            return;
        };

        *link = match (node.left.take(), node.right.take()) {
            (None, None) => None,
            (Some(child), None) | (None, Some(child)) => Some(child),
            (Some(left), Some(right)) => {
                // The cached heights still describe the detached subtrees.
                let replacement = if node.left_height > node.right_height {
                    let (rest, mut max) = Node::detach_max(left);
                    max.left = rest;
                    max.right = Some(right);
                    max
                } else {
                    let (rest, mut min) = Node::detach_min(right);
                    min.left = Some(left);
                    min.right = rest;
                    min
                };

                Some(Node::rebalance(replacement).0)
            }
        };
    }

    fn visit_forward<B, F>(&self, visitor: &mut F) -> ControlFlow<B>
    where
        F: FnMut(&V) -> ControlFlow<B>,
    {
        if let Some(left) = &self.left {
            left.visit_forward(visitor)?;
        }

        visitor(&self.value)?;

        if let Some(right) = &self.right {
            right.visit_forward(visitor)?;
        }

        ControlFlow::Continue(())
    }

    fn visit_backward<B, F>(&self, visitor: &mut F) -> ControlFlow<B>
    where
        F: FnMut(&V) -> ControlFlow<B>,
    {
        if let Some(right) = &self.right {
            right.visit_backward(visitor)?;
        }

        visitor(&self.value)?;

        if let Some(left) = &self.left {
            left.visit_backward(visitor)?;
        }

        ControlFlow::Continue(())
    }

    fn visit_forward_mut<B, F>(&mut self, visitor: &mut F) -> ControlFlow<B>
    where
        F: FnMut(&mut V) -> ControlFlow<B>,
    {
        if let Some(left) = &mut self.left {
            left.visit_forward_mut(visitor)?;
        }

        visitor(&mut self.value)?;

        if let Some(right) = &mut self.right {
            right.visit_forward_mut(visitor)?;
        }

        ControlFlow::Continue(())
    }

    fn visit_backward_mut<B, F>(&mut self, visitor: &mut F) -> ControlFlow<B>
    where
        F: FnMut(&mut V) -> ControlFlow<B>,
    {
        if let Some(right) = &mut self.right {
            right.visit_backward_mut(visitor)?;
        }

        visitor(&mut self.value)?;

        if let Some(left) = &mut self.left {
            left.visit_backward_mut(visitor)?;
        }

        ControlFlow::Continue(())
    }

    /// Deep copy with identical shape.  Children are copied before their parent, so a failed
    /// allocation drops the partial copy and leaves nothing behind.
    fn duplicate_in(&self, alloc: &A) -> Result<Box<Self, A>>
    where
        V: Clone,
        A: Clone,
    {
        let left = self.left.as_ref().map(|l| l.duplicate_in(alloc)).transpose()?;
        let right = self.right.as_ref().map(|r| r.duplicate_in(alloc)).transpose()?;

        let node = Node {
            left,
            right,
            left_height: self.left_height,
            right_height: self.right_height,
            value: self.value.clone(),
        };

        Box::try_new_in(node, alloc.clone()).map_err(|_| Error::alloc_for::<Self>())
    }
}

impl<V> AvlTree<V>
where
    V: Ord,
{
    /// Creates an empty tree ordered by the natural order of its values.
    #[must_use]
    pub fn new() -> AvlTree<V> {
        AvlTree::from_parts(natural(), Assign, Global)
    }
}

impl<V, C> AvlTree<V, C>
where
    C: Compare<V>,
{
    /// Creates an empty tree ordered by `cmp`.
    ///
    /// ```
    /// # use avl_collections::AvlTree;
    /// # use avl_collections::policy::{natural, Compare};
    /// #
    /// let mut tree = AvlTree::with_comparator(natural().rev());
    ///
    /// tree.extend([1, 3, 2]);
    ///
    /// assert_eq!(tree.iter().copied().collect::<Vec<_>>(), vec![3, 2, 1]);
    /// ```
    #[must_use]
    pub fn with_comparator(cmp: C) -> AvlTree<V, C> {
        AvlTree::from_parts(cmp, Assign, Global)
    }
}

impl<V, C, R, A> AvlTree<V, C, R, A>
where
    A: Allocator,
{
    /// Creates an empty tree with the given comparator, replacer and node allocator.
    #[must_use]
    pub fn from_parts(cmp: C, replacer: R, alloc: A) -> AvlTree<V, C, R, A> {
        AvlTree { root: None, count: 0, cmp, replacer, alloc }
    }

    #[must_use]
    #[inline]
    pub fn count(&self) -> usize {
        self.count
    }

    #[must_use]
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    /// Number of levels in the tree: zero when empty, one for a single value.
    #[must_use]
    pub fn height(&self) -> usize {
        usize::from(height(&self.root))
    }

    #[must_use]
    pub fn comparator(&self) -> &C {
        &self.cmp
    }

    #[must_use]
    pub fn replacer(&self) -> &R {
        &self.replacer
    }

    #[must_use]
    pub fn allocator(&self) -> &A {
        &self.alloc
    }

    /// Returns the least value.
    #[must_use]
    pub fn first(&self) -> Option<&V> {
        self.root.as_ref().map(|root| root.first())
    }

    /// Returns the greatest value.
    #[must_use]
    pub fn last(&self) -> Option<&V> {
        self.root.as_ref().map(|root| root.last())
    }

    /// Looks up the value that `cmp` reports as equal to `key`.
    ///
    /// The comparator receives the resident value first and must order values exactly like the
    /// comparator the tree was built with.
    #[must_use]
    pub fn find_by<Q, K>(&self, key: &Q, cmp: &K) -> Option<&V>
    where
        Q: ?Sized,
        K: Compare<V, Q>,
    {
        let mut current = self.root.as_deref();

        while let Some(node) = current {
            current = match cmp.compare(&node.value, key) {
                Ordering::Greater => node.left.as_deref(),
                Ordering::Less => node.right.as_deref(),
                Ordering::Equal => return Some(&node.value),
            };
        }

        None
    }

    /// Same as `find_by()` but the value may be modified in place.  Modifications must not change
    /// how the value is ordered.
    #[must_use]
    pub fn find_by_mut<Q, K>(&mut self, key: &Q, cmp: &K) -> Option<&mut V>
    where
        Q: ?Sized,
        K: Compare<V, Q>,
    {
        Self::search_mut(&mut self.root, key, cmp)
    }

    fn search_mut<'n, Q, K>(root: &'n mut Link<V, A>, key: &Q, cmp: &K) -> Option<&'n mut V>
    where
        Q: ?Sized,
        K: Compare<V, Q>,
    {
        let mut current = root.as_deref_mut();

        while let Some(node) = current {
            current = match cmp.compare(&node.value, key) {
                Ordering::Greater => node.left.as_deref_mut(),
                Ordering::Less => node.right.as_deref_mut(),
                Ordering::Equal => return Some(&mut node.value),
            };
        }

        None
    }

    #[must_use]
    pub fn find<Q>(&self, key: &Q) -> Option<&V>
    where
        Q: ?Sized,
        C: Compare<V, Q>,
    {
        self.find_by(key, &self.cmp)
    }

    #[must_use]
    pub fn find_mut<Q>(&mut self, key: &Q) -> Option<&mut V>
    where
        Q: ?Sized,
        C: Compare<V, Q>,
    {
        Self::search_mut(&mut self.root, key, &self.cmp)
    }

    #[must_use]
    pub fn contains<Q>(&self, key: &Q) -> bool
    where
        Q: ?Sized,
        C: Compare<V, Q>,
    {
        self.find(key).is_some()
    }

    /// Removes the value that `cmp` reports as equal to `key`.  Returns whether a value was
    /// removed.
    pub fn remove_by<Q, K>(&mut self, key: &Q, cmp: &K) -> bool
    where
        Q: ?Sized,
        K: Compare<V, Q>,
    {
        let removed = Self::unlink(&mut self.root, key, cmp);

        if removed {
            self.count -= 1;
        }

        removed
    }

    pub fn remove<Q>(&mut self, key: &Q) -> bool
    where
        Q: ?Sized,
        C: Compare<V, Q>,
    {
        let removed = Self::unlink(&mut self.root, key, &self.cmp);

        if removed {
            self.count -= 1;
        }

        removed
    }

    fn unlink<Q, K>(link: &mut Link<V, A>, key: &Q, cmp: &K) -> bool
    where
        Q: ?Sized,
        K: Compare<V, Q>,
    {
        let node = match link {
            Some(node) => node,
            None => return false,
        };

        let removed = match cmp.compare(&node.value, key) {
            Ordering::Greater => Self::unlink(&mut node.left, key, cmp),
            Ordering::Less => Self::unlink(&mut node.right, key, cmp),
            Ordering::Equal => {
                Node::splice(link);
                return true;
            }
        };

        if removed {
            Node::rebalance_link(link);
        }

        removed
    }

    /// Drops every value, children before parents.
    pub fn clear(&mut self) {
        self.root = None;
        self.count = 0;
    }

    /// Visits the values in ascending order until the visitor breaks.
    ///
    /// ```
    /// # use avl_collections::AvlTree;
    /// # use std::ops::ControlFlow;
    /// #
    /// let tree: AvlTree<i32> = (1..=10).collect();
    /// let mut seen = Vec::new();
    ///
    /// let flow = tree.enumerate_forward(|&v| {
    ///     seen.push(v);
    ///     if v == 3 { ControlFlow::Break(v) } else { ControlFlow::Continue(()) }
    /// });
    ///
    /// assert_eq!(flow, ControlFlow::Break(3));
    /// assert_eq!(seen, vec![1, 2, 3]);
    /// ```
    pub fn enumerate_forward<B, F>(&self, mut visitor: F) -> ControlFlow<B>
    where
        F: FnMut(&V) -> ControlFlow<B>,
    {
        match &self.root {
            Some(root) => root.visit_forward(&mut visitor),
            None => ControlFlow::Continue(()),
        }
    }

    /// Visits the values in descending order until the visitor breaks.
    pub fn enumerate_backward<B, F>(&self, mut visitor: F) -> ControlFlow<B>
    where
        F: FnMut(&V) -> ControlFlow<B>,
    {
        match &self.root {
            Some(root) => root.visit_backward(&mut visitor),
            None => ControlFlow::Continue(()),
        }
    }

    /// Like `enumerate_forward()` with mutable access.  The visitor must not change how values
    /// are ordered.
    pub fn enumerate_forward_mut<B, F>(&mut self, mut visitor: F) -> ControlFlow<B>
    where
        F: FnMut(&mut V) -> ControlFlow<B>,
    {
        match &mut self.root {
            Some(root) => root.visit_forward_mut(&mut visitor),
            None => ControlFlow::Continue(()),
        }
    }

    pub fn enumerate_backward_mut<B, F>(&mut self, mut visitor: F) -> ControlFlow<B>
    where
        F: FnMut(&mut V) -> ControlFlow<B>,
    {
        match &mut self.root {
            Some(root) => root.visit_backward_mut(&mut visitor),
            None => ControlFlow::Continue(()),
        }
    }

    #[must_use]
    pub fn iter(&self) -> Iter<'_, V, A> {
        Iter::new(self)
    }

    /// Moves the contents out in constant time, leaving this tree empty with copies of its
    /// policies.
    #[must_use]
    pub fn take(&mut self) -> AvlTree<V, C, R, A>
    where
        C: Clone,
        R: Clone,
        A: Clone,
    {
        let empty = AvlTree::from_parts(self.cmp.clone(), self.replacer.clone(), self.alloc.clone());

        mem::replace(self, empty)
    }

    /// Deep copy of the tree with the same shape and policies.  On allocation failure this tree
    /// is untouched and nothing is leaked.
    pub fn try_duplicate(&self) -> Result<AvlTree<V, C, R, A>>
    where
        V: Clone,
        C: Clone,
        R: Clone,
        A: Clone,
    {
        let root = self.root.as_ref().map(|root| root.duplicate_in(&self.alloc)).transpose()?;

        #[cfg(feature = "tracing")]
        tracing::debug!(count = self.count, "duplicated tree");

        Ok(AvlTree {
            root,
            count: self.count,
            cmp: self.cmp.clone(),
            replacer: self.replacer.clone(),
            alloc: self.alloc.clone(),
        })
    }
}

impl<V, C, R, A> AvlTree<V, C, R, A>
where
    C: Compare<V>,
    A: Allocator + Clone,
{
    /// Places `value` below `link` unless an equal value is already there, in which case `merge`
    /// receives the resident value and the new one.
    ///
    /// The leaf is allocated before anything is relinked, so an allocation failure leaves the
    /// tree as it was.
    fn place<M>(link: &mut Link<V, A>, value: V, cmp: &C, alloc: &A, merge: M) -> Result<Placed>
    where
        M: FnOnce(&mut V, V),
    {
        let node = match link {
            Some(node) => node,
            None => {
                let leaf = Box::try_new_in(Node::leaf(value), alloc.clone())
                    .map_err(|_| Error::alloc_for::<Node<V, A>>())?;

                *link = Some(leaf);

                return Ok(Placed { path: Path::default(), created: true });
            }
        };

        let (dir, child) = match cmp.compare(&node.value, &value) {
            Ordering::Greater => (Dir::Left, &mut node.left),
            Ordering::Less => (Dir::Right, &mut node.right),
            Ordering::Equal => {
                merge(&mut node.value, value);

                return Ok(Placed { path: Path::default(), created: false });
            }
        };

        let mut placed = Self::place(child, value, cmp, alloc, merge)?;

        placed.path.push_front(dir);

        if placed.created {
            let rotation = Node::rebalance_link(link);
            placed.path.rotate(rotation);
        }

        Ok(placed)
    }

    fn resolve(&mut self, mut path: Path) -> Option<&mut V> {
        let mut node = self.root.as_deref_mut()?;

        while let Some(dir) = path.pop_front() {
            node = match dir {
                Dir::Left => node.left.as_deref_mut()?,
                Dir::Right => node.right.as_deref_mut()?,
            };
        }

        Some(&mut node.value)
    }

    /// Inserts `value` if no equal value is present.  Returns the newly stored value, or `None`
    /// if an equal value already existed, in which case `value` is dropped and the tree is
    /// unchanged.
    pub fn try_insert(&mut self, value: V) -> Result<Option<&mut V>> {
        let placed = Self::place(&mut self.root, value, &self.cmp, &self.alloc, |_, _| ())?;

        if !placed.created {
            return Ok(None);
        }

        self.count += 1;

        Ok(self.resolve(placed.path))
    }

    /// Infallible variant of `try_insert()`: allocation failure aborts through
    /// [`handle_alloc_error`](std::alloc::handle_alloc_error).
    pub fn insert(&mut self, value: V) -> Option<&mut V> {
        self.try_insert(value).unwrap_or_else(|e| e.handle())
    }

    /// Returns the resident value equal to `value`, storing `value` first if there is none.
    pub fn try_get_or_insert(&mut self, value: V) -> Result<&mut V> {
        let placed = Self::place(&mut self.root, value, &self.cmp, &self.alloc, |_, _| ())?;

        if placed.created {
            self.count += 1;
        }

        match self.resolve(placed.path) {
            Some(value) => Ok(value),
            None => unreachable!("placed value is not on its recorded path"),
        }
    }

    pub fn get_or_insert(&mut self, value: V) -> &mut V {
        match self.try_get_or_insert(value) {
            Ok(value) => value,
            Err(e) => e.handle(),
        }
    }
}

impl<V, C, R, A> AvlTree<V, C, R, A>
where
    C: Compare<V>,
    R: Replace<V>,
    A: Allocator + Clone,
{
    /// Inserts `value`, or hands it to the replacer together with the equal resident value.
    /// Returns the stored value.
    pub fn try_update(&mut self, value: V) -> Result<&mut V> {
        let replacer = &self.replacer;
        let placed = Self::place(&mut self.root, value, &self.cmp, &self.alloc, |dst, src| {
            replacer.replace(dst, src)
        })?;

        if placed.created {
            self.count += 1;
        }

        match self.resolve(placed.path) {
            Some(value) => Ok(value),
            None => unreachable!("placed value is not on its recorded path"),
        }
    }

    /// Infallible variant of `try_update()`.
    pub fn update(&mut self, value: V) -> &mut V {
        match self.try_update(value) {
            Ok(value) => value,
            Err(e) => e.handle(),
        }
    }
}

impl<V, C, R, A> Clone for AvlTree<V, C, R, A>
where
    V: Clone,
    C: Clone,
    R: Clone,
    A: Allocator + Clone,
{
    fn clone(&self) -> AvlTree<V, C, R, A> {
        self.try_duplicate().unwrap_or_else(|e| e.handle())
    }
}

impl<V, R, A> Default for AvlTree<V, Natural<V>, R, A>
where
    V: Ord,
    R: Default,
    A: Allocator + Default,
{
    fn default() -> AvlTree<V, Natural<V>, R, A> {
        AvlTree::from_parts(natural(), R::default(), A::default())
    }
}

impl<V, C, R, A> PartialEq for AvlTree<V, C, R, A>
where
    V: PartialEq,
    A: Allocator,
{
    fn eq(&self, other: &AvlTree<V, C, R, A>) -> bool {
        self.count() == other.count() && self.iter().eq(other.iter())
    }
}

impl<V: Eq, C, R, A: Allocator> Eq for AvlTree<V, C, R, A> {}

impl<V, C, R, A> Debug for AvlTree<V, C, R, A>
where
    V: Debug,
    A: Allocator,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.iter()).finish()
    }
}

impl<V, C, R, A> Display for AvlTree<V, C, R, A>
where
    V: Display,
    A: Allocator,
{
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;

        fmt.write_str("{")?;

        for v in self.iter() {
            if !first {
                fmt.write_str(", ")?;
            }
            v.fmt(fmt)?;
            first = false;
        }

        fmt.write_str("}")
    }
}

impl<'a, V, C, R, A> IntoIterator for &'a AvlTree<V, C, R, A>
where
    A: Allocator,
{
    type Item = &'a V;
    type IntoIter = Iter<'a, V, A>;

    fn into_iter(self) -> Iter<'a, V, A> {
        self.iter()
    }
}

impl<V, C, R, A> Extend<V> for AvlTree<V, C, R, A>
where
    C: Compare<V>,
    R: Replace<V>,
    A: Allocator + Clone,
{
    fn extend<I: IntoIterator<Item = V>>(&mut self, iter: I) {
        for value in iter {
            self.update(value);
        }
    }
}

impl<V> FromIterator<V> for AvlTree<V>
where
    V: Ord,
{
    fn from_iter<I: IntoIterator<Item = V>>(into_iter: I) -> AvlTree<V> {
        let mut tree = AvlTree::new();

        tree.extend(into_iter);

        tree
    }
}

/// In-order iterator over the values of an [`AvlTree`].
pub struct Iter<'a, V, A: Allocator = Global> {
    root: Option<&'a Node<V, A>>,

    stack_forward: Option<Stack<'a, V, A>>,
    stack_backward: Option<Stack<'a, V, A>>,

    left_index: usize,  // inclusive
    right_index: usize, // exclusive
}

// This is a stack for navigating through the tree.  It can be used to go either forwards or
// backwards, but not both: when you call `dig` or `advance`, you must use the same value of
// `backwards` for the entire lifetime of this stack.
struct Stack<'a, V, A: Allocator> {
    // The current node is at the top of the stack.  If we are moving forwards, the rest of the
    // stack consists of those ancestors of the current node that contain the current node in
    // their left subtree, so the values in the stack increase from the top to the bottom.
    stack: Vec<&'a Node<V, A>>,
}

impl<'a, V, A: Allocator> Stack<'a, V, A> {
    fn new(root: Option<&'a Node<V, A>>, count: usize, backwards: bool) -> Stack<'a, V, A> {
        let mut stack = Stack { stack: Vec::with_capacity(iter_utils::max_height(count)) };

        if let Some(root) = root {
            stack.stack.push(root);
            stack.dig(backwards);
        }

        stack
    }

    #[inline]
    fn current(&self) -> Option<&'a V> {
        self.stack.last().map(|&node| &node.value)
    }

    fn dig(&mut self, backwards: bool) {
        let child = self.stack.last().and_then(|&node| {
            let c = if backwards { &node.right } else { &node.left };
            c.as_deref()
        });

        if let Some(c) = child {
            self.stack.push(c);
            self.dig(backwards);
        }
    }

    fn advance(&mut self, backwards: bool) {
        if let Some(node) = self.stack.pop() {
            let child = if backwards { &node.left } else { &node.right };

            if let Some(c) = child.as_deref() {
                self.stack.push(c);
                self.dig(backwards);
            }
        }
    }
}

mod iter_utils {
    /// Upper bound on the height of an AVL tree with `count` nodes: `1.4405 * lg(count + 2)`.
    pub fn max_height(count: usize) -> usize {
        let lg = usize::BITS - (count.saturating_add(2)).leading_zeros();

        (lg as usize * 3) / 2 + 1
    }
}

impl<'a, V, A: Allocator> Iter<'a, V, A> {
    fn new<C, R>(tree: &'a AvlTree<V, C, R, A>) -> Iter<'a, V, A> {
        Iter {
            root: tree.root.as_deref(),

            stack_forward: None,
            stack_backward: None,

            left_index: 0,
            right_index: tree.count(),
        }
    }

    fn stack(&mut self, backwards: bool) -> &mut Stack<'a, V, A> {
        let root = self.root;
        let count = self.right_index - self.left_index;
        let stack_field = if backwards { &mut self.stack_backward } else { &mut self.stack_forward };

        stack_field.get_or_insert_with(|| Stack::new(root, count, backwards))
    }

    #[inline]
    fn non_empty(&self) -> bool {
        self.left_index < self.right_index
    }
}

impl<'a, V, A: Allocator> Iterator for Iter<'a, V, A> {
    type Item = &'a V;

    fn next(&mut self) -> Option<&'a V> {
        if !self.non_empty() {
            return None;
        }

        let stack = self.stack(false);
        let current = stack.current();
        stack.advance(false);
        self.left_index += 1;

        current
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let len = self.right_index - self.left_index;

        (len, Some(len))
    }
}

impl<'a, V, A: Allocator> DoubleEndedIterator for Iter<'a, V, A> {
    fn next_back(&mut self) -> Option<&'a V> {
        if !self.non_empty() {
            return None;
        }

        let stack = self.stack(true);
        let current = stack.current();
        stack.advance(true);
        self.right_index -= 1;

        current
    }
}

impl<'a, V, A: Allocator> ExactSizeIterator for Iter<'a, V, A> {}
