/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at http://mozilla.org/MPL/2.0/.
 */

//! Bookkeeping that lets an insertion hand back a reference to the value it placed.
//!
//! Placement is recursive and every ancestor of the new node may rotate on the way back up, so
//! the reference cannot be carried up the call stack.  Instead each level reports where the
//! value sits relative to the root of the subtree it returns, and every rotation rewrites that
//! path.  Once the whole spine is balanced the tree is walked along the final path.

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(super) enum Dir {
    Left,
    Right,
}

impl Dir {
    #[inline]
    fn opposite(self) -> Dir {
        match self {
            Dir::Left => Dir::Right,
            Dir::Right => Dir::Left,
        }
    }
}

/// Restructuring applied by one rebalancing step.  Double rotations are named after the
/// direction of the child rotation first.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(super) enum Rotation {
    None,
    Left,
    Right,
    LeftRight,
    RightLeft,
}

/// Directions from a subtree root down to one of its nodes.  Step `i` is bit `i` of `steps`
/// (set means right), so the first step is the least significant bit.
///
/// An AVL tree holding `usize::MAX` nodes is less than 93 levels high, which leaves plenty of
/// room in 128 bits.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub(super) struct Path {
    steps: u128,
    len: u8,
}

impl Path {
    pub(super) fn push_front(&mut self, dir: Dir) {
        debug_assert!(self.len < 128, "path deeper than any balanced tree");

        self.steps = (self.steps << 1) | u128::from(dir == Dir::Right);
        self.len += 1;
    }

    pub(super) fn pop_front(&mut self) -> Option<Dir> {
        let dir = self.front()?;

        self.steps >>= 1;
        self.len -= 1;

        Some(dir)
    }

    fn front(&self) -> Option<Dir> {
        match (self.len, self.steps & 1) {
            (0, _) => None,
            (_, 0) => Some(Dir::Left),
            _ => Some(Dir::Right),
        }
    }

    #[cfg(test)]
    pub(super) fn len(&self) -> usize {
        usize::from(self.len)
    }

    /// Rewrites the path after `rotation` was applied at the subtree root.
    pub(super) fn rotate(&mut self, rotation: Rotation) {
        match rotation {
            Rotation::None => (),
            Rotation::Left => self.sink(Dir::Left),
            Rotation::Right => self.sink(Dir::Right),
            Rotation::LeftRight => {
                self.below(Dir::Left, |path| path.sink(Dir::Left));
                self.sink(Dir::Right);
            }
            Rotation::RightLeft => {
                self.below(Dir::Right, |path| path.sink(Dir::Right));
                self.sink(Dir::Left);
            }
        }
    }

    /// Applies `f` to the part of the path below the child on side `dir`, if the path goes
    /// through it.
    fn below(&mut self, dir: Dir, f: impl FnOnce(&mut Path)) {
        if self.front() == Some(dir) {
            self.pop_front();
            f(self);
            self.push_front(dir);
        }
    }

    /// The root moves down to side `down` and its child on the opposite side (the pivot)
    /// becomes the new root.  Only the pivot's inner subtree changes parent.
    ///
    /// ```text
    ///   sink(Right):      root                pivot
    ///                     ╱  ╲                ╱  ╲
    ///                 pivot   c      ──▶     a   root
    ///                 ╱  ╲                       ╱  ╲
    ///                a    b                     b    c
    /// ```
    fn sink(&mut self, down: Dir) {
        let up = down.opposite();

        match self.pop_front() {
            None => self.push_front(down),
            Some(d) if d == down => {
                self.push_front(down);
                self.push_front(down);
            }
            Some(_) => match self.pop_front() {
                None => (),
                Some(d) if d == up => self.push_front(up),
                Some(_) => {
                    self.push_front(up);
                    self.push_front(down);
                }
            },
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use pretty_assertions::assert_eq;

    fn path(dirs: &[Dir]) -> Path {
        let mut path = Path::default();

        for &dir in dirs.iter().rev() {
            path.push_front(dir);
        }

        path
    }

    fn dirs(mut path: Path) -> Vec<Dir> {
        let mut dirs = Vec::with_capacity(path.len());

        while let Some(dir) = path.pop_front() {
            dirs.push(dir);
        }

        dirs
    }

    use super::Dir::{Left as L, Right as R};

    #[test]
    fn test_push_pop_order() {
        let p = path(&[L, R, R, L]);

        assert_eq!(p.len(), 4);
        assert_eq!(dirs(p), vec![L, R, R, L]);
    }

    #[test]
    fn test_sink_right() {
        let rotate = |dirs_before: &[Dir]| {
            let mut p = path(dirs_before);
            p.rotate(Rotation::Right);
            dirs(p)
        };

        assert_eq!(rotate(&[]), vec![R]);
        assert_eq!(rotate(&[L]), vec![]);
        assert_eq!(rotate(&[L, L, R]), vec![L, R]);
        assert_eq!(rotate(&[L, R, L]), vec![R, L, L]);
        assert_eq!(rotate(&[R, L]), vec![R, R, L]);
    }

    #[test]
    fn test_sink_left() {
        let rotate = |dirs_before: &[Dir]| {
            let mut p = path(dirs_before);
            p.rotate(Rotation::Left);
            dirs(p)
        };

        assert_eq!(rotate(&[]), vec![L]);
        assert_eq!(rotate(&[R]), vec![]);
        assert_eq!(rotate(&[R, R]), vec![R]);
        assert_eq!(rotate(&[R, L]), vec![L, R]);
        assert_eq!(rotate(&[L, R]), vec![L, L, R]);
    }

    #[test]
    fn test_double_rotation() {
        // The grandchild in the middle becomes the root.
        let mut p = path(&[L, R]);
        p.rotate(Rotation::LeftRight);
        assert_eq!(dirs(p), vec![]);

        let mut p = path(&[R, L]);
        p.rotate(Rotation::RightLeft);
        assert_eq!(dirs(p), vec![]);

        // The old root ends up on the far side.
        let mut p = path(&[]);
        p.rotate(Rotation::LeftRight);
        assert_eq!(dirs(p), vec![R]);
    }
}
