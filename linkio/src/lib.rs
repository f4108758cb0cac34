// SPDX-License-Identifier: MIT
#![cfg_attr(not(feature = "std"), no_std)]

#[cfg(feature = "alloc")]
extern crate alloc;

// Core modules
pub mod errors;
pub mod stats;

// Backend modules
#[cfg(feature = "mem")]
mod mem;

#[cfg(feature = "std")]
mod std;

// Prelude re-exports (central entrypoint)
pub mod prelude {
    pub use super::BlockDevice;
    pub use super::BlockDeviceExt;
    pub use super::errors::*;
    pub use super::stats::*;

    #[cfg(feature = "mem")]
    pub use super::mem::MemDevice;

    #[cfg(feature = "std")]
    pub use super::std::StdDevice;
}

// Internal use
use errors::*;

// Constants

/// Size of the internal scratch buffer used by the struct and zero-fill helpers.
/// Also the largest sector size those helpers accept.
pub const BLOCK_BUF_SIZE: usize = 4096;

/// Sector size used when a backend is built without an explicit one.
pub const DEFAULT_SECTOR_SIZE: usize = 512;

// Traits

/// Sector-addressed block device.
///
/// Every transfer starts at a logical block address (LBA) and moves a whole
/// number of sectors: `buf.len()` must be a multiple of [`BlockDevice::sector_size`].
/// Implementations may target RAM, image files, raw disks, firmware services, etc.
pub trait BlockDevice {
    /// Size of one physical sector in bytes.
    fn sector_size(&self) -> usize;

    /// Number of addressable sectors.
    fn sector_count(&self) -> u64;

    /// Reads `buf.len() / sector_size()` sectors starting at `lba`.
    fn read_sectors(&mut self, lba: u64, buf: &mut [u8]) -> BlockDevResult;

    /// Writes `buf.len() / sector_size()` sectors starting at `lba`.
    fn write_sectors(&mut self, lba: u64, buf: &[u8]) -> BlockDevResult;

    /// Flushes any buffered data (may be a no-op).
    fn flush(&mut self) -> BlockDevResult {
        Ok(())
    }

    /// Validates a transfer of `len` bytes at `lba` and returns its sector count.
    #[inline]
    fn check_transfer(&self, lba: u64, len: usize) -> BlockDevResult<u64> {
        let ss = self.sector_size();
        if ss == 0 || !len.is_multiple_of(ss) {
            return Err(BlockDevError::Misaligned);
        }
        let count = (len / ss) as u64;
        let end = lba.checked_add(count).ok_or(BlockDevError::OutOfBounds)?;
        if end > self.sector_count() {
            return Err(BlockDevError::OutOfBounds);
        }
        Ok(count)
    }

    /// Total capacity in bytes.
    #[inline]
    fn size_bytes(&self) -> u64 {
        self.sector_count() * self.sector_size() as u64
    }
}

/// Extension helpers for BlockDevice.
///
/// - zero fill of sector ranges
/// - coalesced multi-unit transfers (units = fixed groups of sectors)
/// - zerocopy struct reads/writes padded to one sector
pub trait BlockDeviceExt: BlockDevice {
    /// Writes `count` zeroed sectors starting at `lba`.
    fn zero_sectors(&mut self, lba: u64, count: u64) -> BlockDevResult {
        const ZERO_BUF: [u8; BLOCK_BUF_SIZE] = [0u8; BLOCK_BUF_SIZE];
        let ss = self.sector_size();
        if ss == 0 || ss > BLOCK_BUF_SIZE {
            return Err(BlockDevError::Unsupported);
        }
        let per_chunk = (BLOCK_BUF_SIZE / ss) as u64;
        let mut remaining = count;
        let mut lba = lba;
        while remaining > 0 {
            let n = remaining.min(per_chunk);
            self.write_sectors(lba, &ZERO_BUF[..n as usize * ss])?;
            lba += n;
            remaining -= n;
        }
        Ok(())
    }

    /// Reads units located at `lbas` (each `sectors_per_unit` sectors long) into `buf`.
    ///
    /// Adjacent units are coalesced into a single transfer.
    ///
    /// # Errors
    /// Returns `BlockDevError::Misaligned` if `buf.len()` does not match `lbas.len()` units.
    fn read_units(&mut self, lbas: &[u64], sectors_per_unit: u64, buf: &mut [u8]) -> BlockDevResult {
        let unit_bytes = sectors_per_unit as usize * self.sector_size();
        if buf.len() != lbas.len() * unit_bytes {
            return Err(BlockDevError::Misaligned);
        }
        for_each_run(lbas, sectors_per_unit, |first, start, len| {
            let from = first * unit_bytes;
            self.read_sectors(start, &mut buf[from..from + len * unit_bytes])
        })
    }

    /// Writes `buf` to the units located at `lbas`, coalescing adjacent units.
    ///
    /// # Errors
    /// Returns `BlockDevError::Misaligned` if `buf.len()` does not match `lbas.len()` units.
    fn write_units(&mut self, lbas: &[u64], sectors_per_unit: u64, buf: &[u8]) -> BlockDevResult {
        let unit_bytes = sectors_per_unit as usize * self.sector_size();
        if buf.len() != lbas.len() * unit_bytes {
            return Err(BlockDevError::Misaligned);
        }
        for_each_run(lbas, sectors_per_unit, |first, start, len| {
            let from = first * unit_bytes;
            self.write_sectors(start, &buf[from..from + len * unit_bytes])
        })
    }

    /// Reads a struct of type `T` from the start of sector `lba`.
    fn read_struct<T: zerocopy::FromBytes + zerocopy::KnownLayout + zerocopy::Immutable>(
        &mut self,
        lba: u64,
    ) -> BlockDevResult<T> {
        let ss = self.sector_size();
        let size = core::mem::size_of::<T>();
        if ss > BLOCK_BUF_SIZE || size > ss {
            return Err(BlockDevError::Unsupported);
        }
        let mut buf = [0u8; BLOCK_BUF_SIZE];
        self.read_sectors(lba, &mut buf[..ss])?;
        T::read_from_bytes(&buf[..size]).map_err(|_| BlockDevError::Other("read_struct failed"))
    }

    /// Writes a struct of type `T` at sector `lba`, zero padded to one sector.
    fn write_struct<T: zerocopy::IntoBytes + zerocopy::KnownLayout + zerocopy::Immutable>(
        &mut self,
        lba: u64,
        val: &T,
    ) -> BlockDevResult {
        let ss = self.sector_size();
        let bytes = val.as_bytes();
        if ss > BLOCK_BUF_SIZE || bytes.len() > ss {
            return Err(BlockDevError::Unsupported);
        }
        let mut buf = [0u8; BLOCK_BUF_SIZE];
        buf[..bytes.len()].copy_from_slice(bytes);
        self.write_sectors(lba, &buf[..ss])
    }
}

impl<T: BlockDevice + ?Sized> BlockDeviceExt for T {}

/// Groups `lbas` into runs of adjacent units and calls `f(first_index, start_lba, run_len)`.
fn for_each_run<F>(lbas: &[u64], sectors_per_unit: u64, mut f: F) -> BlockDevResult
where
    F: FnMut(usize, u64, usize) -> BlockDevResult,
{
    if lbas.is_empty() {
        return Ok(());
    }

    let mut run_start = 0;
    for i in 1..lbas.len() {
        if lbas[i] != lbas[i - 1] + sectors_per_unit {
            f(run_start, lbas[run_start], i - run_start)?;
            run_start = i;
        }
    }
    f(run_start, lbas[run_start], lbas.len() - run_start)
}
