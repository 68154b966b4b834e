/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at http://mozilla.org/MPL/2.0/.
 */

//! Locks used by the map and set wrappers.
//!
//! A lock is anything implementing [`RawLock`] (`lock`, `try_lock`, `unlock`), which is the
//! `lock_api` raw mutex interface.  [`parking_lot::RawMutex`] is the lock of the `*Sync` aliases;
//! [`DummyLock`] is the default and is meant for containers that never leave one thread.

use core::cell::Cell;

pub use parking_lot::lock_api::RawMutex as RawLock;
use parking_lot::lock_api::{GuardNoSend, Mutex, MutexGuard};

/// The lock of containers shared between threads.
pub type SyncLock = parking_lot::RawMutex;

/// A scoped acquisition of a container lock: the lock is released when the guard is dropped,
/// on every exit path including unwinding.
pub type CriticalSection<'a, L, T> = MutexGuard<'a, L, T>;

pub(crate) type Guarded<L, T> = Mutex<L, T>;

/// A lock for single-threaded containers.
///
/// Acquiring it is a flag check.  `DummyLock` is not `Sync`, so a container that uses it cannot
/// be reached from two threads at once; the only way to contend for it is to re-enter the same
/// container from inside one of its own operations (for instance from an enumeration callback).
/// A blocking lock would wait forever in that situation, so `lock()` panics instead and
/// `try_lock()` returns `false`.
#[derive(Debug, Default)]
pub struct DummyLock {
    locked: Cell<bool>,
}

// SAFETY: the flag gives out at most one guard at a time, and `DummyLock` is `!Sync`, so no
// other thread can observe or change the flag while a guard is alive.
unsafe impl RawLock for DummyLock {
    #[allow(clippy::declare_interior_mutable_const)]
    const INIT: DummyLock = DummyLock { locked: Cell::new(false) };

    type GuardMarker = GuardNoSend;

    fn lock(&self) {
        if !self.try_lock() {
            panic!("container lock is already held by this thread (re-entrant access)");
        }
    }

    #[inline]
    fn try_lock(&self) -> bool {
        !self.locked.replace(true)
    }

    #[inline]
    unsafe fn unlock(&self) {
        self.locked.set(false);
    }

    #[inline]
    fn is_locked(&self) -> bool {
        self.locked.get()
    }
}
