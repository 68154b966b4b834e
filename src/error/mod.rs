/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at http://mozilla.org/MPL/2.0/.
 */

use core::alloc::Layout;

/// Failure of a tree operation.
///
/// Missing and duplicate keys are not errors: they are reported through `Option` and `bool`
/// return values.  The only failure a tree can run into is running out of memory while creating
/// a node, and the operation that hit it leaves the tree exactly as it was before the call.
#[derive(Clone, Copy, Debug, PartialEq, Eq, thiserror::Error)]
pub enum Error {
    #[error("memory allocation failed for a tree node ({layout:?})")]
    Alloc { layout: Layout },
}

impl Error {
    #[must_use]
    pub(crate) fn alloc_for<T>() -> Error {
        let layout = Layout::new::<T>();

        #[cfg(feature = "tracing")]
        tracing::warn!(size = layout.size(), align = layout.align(), "tree node allocation failed");

        Error::Alloc { layout }
    }

    /// Diverges through the global allocation error handler, like the standard collections do
    /// when they cannot grow.
    pub(crate) fn handle(self) -> ! {
        match self {
            Error::Alloc { layout } => std::alloc::handle_alloc_error(layout),
        }
    }
}

pub type Result<T> = core::result::Result<T, Error>;
