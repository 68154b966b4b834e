/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at http://mozilla.org/MPL/2.0/.
 */

use allocator_api2::alloc::{AllocError, Allocator, Global};
use std::alloc::Layout;
use std::cell::Cell;
use std::ptr::NonNull;
use std::rc::Rc;

/// Delegates to the global allocator until its budget runs out.  Clones share the budget and the
/// count of live blocks.
#[derive(Clone, Debug, Default)]
pub(crate) struct Budget {
    pub(crate) remaining: Rc<Cell<usize>>,
    pub(crate) live: Rc<Cell<usize>>,
}

impl Budget {
    pub(crate) fn new(remaining: usize) -> Budget {
        let budget = Budget::default();
        budget.remaining.set(remaining);
        budget
    }
}

unsafe impl Allocator for Budget {
    fn allocate(&self, layout: Layout) -> Result<NonNull<[u8]>, AllocError> {
        match self.remaining.get() {
            0 => Err(AllocError),
            n => {
                let block = Global.allocate(layout)?;
                self.remaining.set(n - 1);
                self.live.set(self.live.get() + 1);
                Ok(block)
            }
        }
    }

    unsafe fn deallocate(&self, ptr: NonNull<u8>, layout: Layout) {
        self.live.set(self.live.get() - 1);
        Global.deallocate(ptr, layout);
    }
}
