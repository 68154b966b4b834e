/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at http://mozilla.org/MPL/2.0/.
 */

//! Policy objects that parameterize the tree without subclassing it.
//!
//! A comparator is any [`Compare`] implementation.  `compare(value, key)` tells where `value`
//! stands relative to `key`: a tree walks left from a node whose value compares `Greater` than
//! the key it is looking for, and right from one that compares `Less`.  The ordering must be a
//! strict weak order and must stay the same for the lifetime of the tree; values that compare
//! `Equal` are indistinguishable to lookups.
//!
//! A replacer is any [`Replace`] implementation.  It only runs on `update` when an equal value
//! is already present, and it must not change the part of the destination the comparator looks
//! at.  Neither rule is checked at runtime: breaking them silently corrupts the search order.

pub use compare::{natural, Compare, Natural};

/// Merges a new value into an existing, equal one.
pub trait Replace<V> {
    fn replace(&self, dst: &mut V, src: V);
}

/// The default replacer: the new value overwrites the old one.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct Assign;

impl<V> Replace<V> for Assign {
    #[inline]
    fn replace(&self, dst: &mut V, src: V) {
        *dst = src;
    }
}

impl<V, F> Replace<V> for F
where
    F: Fn(&mut V, V),
{
    #[inline]
    fn replace(&self, dst: &mut V, src: V) {
        self(dst, src);
    }
}

#[cfg(test)]
mod test;
