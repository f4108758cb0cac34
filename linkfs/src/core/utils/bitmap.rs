// SPDX-License-Identifier: MIT

//! Ownership bitmap over block numbers, used by the checker's tree walk.

/// Bit `n` lives in byte `n / 8`, LSB first. Out-of-range bits read as clear
/// and ignore writes.
pub trait BitmapOps {
    fn get_bit(&self, bit: usize) -> bool;

    /// Sets `bit`, returning whether it was already set.
    fn test_and_set(&mut self, bit: usize) -> bool;

    fn count_ones(&self) -> usize;
}

impl BitmapOps for [u8] {
    #[inline]
    fn get_bit(&self, bit: usize) -> bool {
        self.get(bit / 8).is_some_and(|b| b & (1 << (bit % 8)) != 0)
    }

    #[inline]
    fn test_and_set(&mut self, bit: usize) -> bool {
        let Some(byte) = self.get_mut(bit / 8) else {
            return false;
        };
        let mask = 1u8 << (bit % 8);
        let was = *byte & mask != 0;
        *byte |= mask;
        was
    }

    fn count_ones(&self) -> usize {
        self.iter().map(|b| b.count_ones() as usize).sum()
    }
}
