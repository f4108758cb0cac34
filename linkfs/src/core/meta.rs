// SPDX-License-Identifier: MIT

/// Block geometry shared by formatting, allocation, I/O and checking.
///
/// A unit is the allocation granule (a block). Units below
/// [`FsMeta::first_data_unit`] hold volume metadata and never enter a chain.
pub trait FsMeta<Unit: Ord + Copy> {
    /// Bytes per unit.
    fn unit_size(&self) -> usize;

    /// First device sector of `unit`.
    fn unit_lba(&self, unit: Unit) -> u64;

    fn first_data_unit(&self) -> Unit;

    fn last_data_unit(&self) -> Unit;

    /// Whether `unit` may be handed out by the allocator.
    fn is_valid_unit(&self, unit: Unit) -> bool {
        unit >= self.first_data_unit() && unit <= self.last_data_unit()
    }

    /// Whether `unit` belongs to the metadata area.
    fn is_reserved(&self, unit: Unit) -> bool {
        unit < self.first_data_unit()
    }

    /// Units needed to hold `bytes`.
    fn blocks_for(&self, bytes: u64) -> u64 {
        bytes.div_ceil(self.unit_size() as u64)
    }
}
