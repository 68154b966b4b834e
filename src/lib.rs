/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at http://mozilla.org/MPL/2.0/.
 */

#![cfg_attr(feature = "fatal-warnings", deny(warnings))]

// Note: Keep this in sync with `README.md`.  Note that the doc links must be removed.
//! # AVL Collections
//!
//! AVL Collections provides mutable ordered containers built on a height-balanced
//! [AVL tree](https://en.wikipedia.org/wiki/AVL_tree), with pluggable ordering, value merging,
//! node allocation and locking.
//!
//! # Data Structures
//!
//! This crate implements the following data structures:
//!
//!   1. [`AvlTree`](#avltree)
//!   2. [`AvlMap`](#avlmap)
//!   3. [`AvlSet`](#avlset)
//!
//! ## `AvlTree`
//! [![AvlTree documentation](https://img.shields.io/badge/doc-AvlTree-303070.svg)](tree/struct.AvlTree.html)
//!
//! The engine: an ordered collection of unique values, parameterized by a comparator, a
//! replacer that merges equal values on `update`, and an allocator for its nodes.  It has no
//! lock of its own.
//!
//! ### Example
//!
//! ```rust
//! use avl_collections::AvlTree;
//!
//! let mut tree = AvlTree::new();
//!
//! for v in [5, 3, 8, 1, 4, 7, 9, 2, 6, 0] {
//!     tree.insert(v);
//! }
//!
//! assert_eq!(tree.count(), 10);
//! assert_eq!(tree.find(&4), Some(&4));
//! assert_eq!(tree.iter().copied().collect::<Vec<_>>(), (0..10).collect::<Vec<_>>());
//!
//! tree.remove(&4);
//!
//! assert_eq!(tree.find(&4), None);
//! ```
//!
//! ## `AvlMap`
//! [![AvlMap documentation](https://img.shields.io/badge/doc-AvlMap-303070.svg)](map/avl_map/struct.AvlMap.html)
//!
//! An ordered key-value map.  Every operation takes `&self` and runs under the map's own lock.
//! The default lock is for maps that stay on one thread; [`AvlMapSync`] can be shared.
//!
//! ### Example
//!
//! ```rust
//! use avl_collections::AvlMapSync;
//! use std::thread;
//!
//! let map = AvlMapSync::new_sync();
//!
//! thread::scope(|scope| {
//!     scope.spawn(|| map.insert(1, "one"));
//!     scope.spawn(|| map.insert(2, "two"));
//! });
//!
//! assert_eq!(map.count(), 2);
//! assert_eq!(map.get_cloned(&2), Some("two"));
//! ```
//!
//! ## `AvlSet`
//! [![AvlSet documentation](https://img.shields.io/badge/doc-AvlSet-303070.svg)](set/avl_set/struct.AvlSet.html)
//!
//! An ordered set with the same locking as [`AvlMap`], plus union, intersection, difference and
//! subset tests against other sets.
//!
//! ### Example
//!
//! ```rust
//! use avl_collections::AvlSet;
//!
//! let set = AvlSet::new();
//!
//! set.insert("zero");
//! set.insert("one");
//!
//! assert!(set.contains(&"one"));
//!
//! set.remove(&"zero");
//!
//! assert!(!set.contains(&"zero"));
//! ```

pub mod error;
pub mod lock;
pub mod map;
pub mod policy;
pub mod set;
pub mod tree;

#[cfg(test)]
mod utils;

pub use error::Error;
pub use lock::{DummyLock, RawLock, SyncLock};
pub use map::avl_map::{AvlMap, AvlMapSync};
pub use map::pair::Pair;
pub use policy::{Assign, Compare, Replace};
pub use set::avl_set::{AvlSet, AvlSetSync};
pub use tree::AvlTree;
