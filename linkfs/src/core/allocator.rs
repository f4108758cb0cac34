// SPDX-License-Identifier: MIT

pub use crate::core::errors::{FsAllocatorError, FsAllocatorResult};

/// An allocated run of units, addressed by its first one.
pub trait FsHandle {
    fn head(&self) -> u32;

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Hands out and reclaims units.
///
/// A failed call leaves the allocator as it was: no unit is half-claimed
/// and the free count stays exact.
pub trait FsAllocator<Handle: FsHandle + Clone> {
    /// Claims `count` units as one handle.
    fn allocate_chain(&mut self, count: usize) -> FsAllocatorResult<Handle>;

    fn allocate_unit(&mut self) -> FsAllocatorResult<Handle> {
        self.allocate_chain(1)
    }

    /// Appends one unit to `handle`, returning it.
    fn extend(&mut self, handle: &mut Handle) -> FsAllocatorResult<u32>;

    /// Frees every unit linked from `head`, returning how many were freed.
    fn release(&mut self, head: u32) -> FsAllocatorResult<usize>;

    fn used_units(&self) -> usize;

    fn remaining_units(&self) -> usize;
}
