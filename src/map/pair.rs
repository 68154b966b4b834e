/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at http://mozilla.org/MPL/2.0/.
 */

use crate::policy::{Compare, Replace};
use std::cmp::Ordering;

/// A map entry.  The key decides where the pair is stored, so it cannot change once the pair
/// exists; the value can.
#[derive(Debug, PartialEq, Eq, Clone, Hash)]
pub struct Pair<K, V> {
    key: K,
    pub value: V,
}

impl<K, V> Pair<K, V> {
    #[must_use]
    pub fn new(key: K, value: V) -> Pair<K, V> {
        Pair { key, value }
    }

    #[must_use]
    pub fn key(&self) -> &K {
        &self.key
    }

    /// Splits the pair into its key and a mutable reference to its value.
    pub fn parts_mut(&mut self) -> (&K, &mut V) {
        (&self.key, &mut self.value)
    }

    #[must_use]
    pub fn into_parts(self) -> (K, V) {
        (self.key, self.value)
    }
}

/// A key used to look a pair up.
#[derive(Debug, Clone, Copy)]
pub struct Key<'a, Q: ?Sized>(pub &'a Q);

/// Orders pairs by their keys only.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PairCompare<C>(pub C);

impl<K, V, C> Compare<Pair<K, V>> for PairCompare<C>
where
    C: Compare<K>,
{
    #[inline]
    fn compare(&self, l: &Pair<K, V>, r: &Pair<K, V>) -> Ordering {
        self.0.compare(&l.key, &r.key)
    }
}

impl<'a, K, Q, V, C> Compare<Pair<K, V>, Key<'a, Q>> for PairCompare<C>
where
    Q: ?Sized,
    C: Compare<K, Q>,
{
    #[inline]
    fn compare(&self, l: &Pair<K, V>, r: &Key<'a, Q>) -> Ordering {
        self.0.compare(&l.key, r.0)
    }
}

/// Hands the values of two equal pairs to `R`; the resident key is kept.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PairReplace<R>(pub R);

impl<K, V, R> Replace<Pair<K, V>> for PairReplace<R>
where
    R: Replace<V>,
{
    #[inline]
    fn replace(&self, dst: &mut Pair<K, V>, src: Pair<K, V>) {
        self.0.replace(&mut dst.value, src.value);
    }
}
