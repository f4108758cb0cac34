// SPDX-License-Identifier: MIT

use crate::{BlockDevError, BlockDevResult, BlockDevice, DEFAULT_SECTOR_SIZE};

/// In-memory implementation of `BlockDevice`.
///
/// Useful for tests, RAM disks, virtual volumes.
/// Trailing bytes that do not fill a whole sector are not addressable.
#[derive(Debug)]
pub struct MemDevice<'a> {
    buffer: &'a mut [u8],
    sector_size: usize,
}

impl<'a> MemDevice<'a> {
    #[inline]
    pub fn new(buffer: &'a mut [u8]) -> Self {
        Self::with_sector_size(buffer, DEFAULT_SECTOR_SIZE)
    }

    #[inline]
    pub fn with_sector_size(buffer: &'a mut [u8], sector_size: usize) -> Self {
        debug_assert!(sector_size > 0, "sector size must be non-zero");
        Self {
            buffer,
            sector_size: sector_size.max(1),
        }
    }

    /// Raw view of the backing buffer.
    #[inline]
    pub fn as_bytes(&self) -> &[u8] {
        self.buffer
    }

    #[inline]
    fn byte_range(&self, lba: u64, len: usize) -> BlockDevResult<core::ops::Range<usize>> {
        self.check_transfer(lba, len)?;
        let start = usize::try_from(lba)
            .ok()
            .and_then(|l| l.checked_mul(self.sector_size))
            .ok_or(BlockDevError::OutOfBounds)?;
        Ok(start..start + len)
    }
}

impl<'a> BlockDevice for MemDevice<'a> {
    #[inline]
    fn sector_size(&self) -> usize {
        self.sector_size
    }

    #[inline]
    fn sector_count(&self) -> u64 {
        (self.buffer.len() / self.sector_size) as u64
    }

    #[inline(always)]
    fn read_sectors(&mut self, lba: u64, buf: &mut [u8]) -> BlockDevResult {
        let range = self.byte_range(lba, buf.len())?;
        buf.copy_from_slice(&self.buffer[range]);
        Ok(())
    }

    #[inline(always)]
    fn write_sectors(&mut self, lba: u64, buf: &[u8]) -> BlockDevResult {
        let range = self.byte_range(lba, buf.len())?;
        self.buffer[range].copy_from_slice(buf);
        Ok(())
    }
}

#[cfg(all(test, feature = "std"))]
mod test {
    use super::*;
    use crate::prelude::*;

    #[test]
    fn test_rw() {
        let mut buf = [0u8; 2048];
        let mut io = MemDevice::new(&mut buf);
        io.write_sectors(2, &[0x5A; 512]).unwrap();

        let mut output = [0u8; 512];
        io.read_sectors(2, &mut output).unwrap();
        assert_eq!(output, [0x5A; 512]);
        assert_eq!(io.as_bytes()[1024], 0x5A);
        assert_eq!(io.as_bytes()[1023], 0);
    }

    #[test]
    fn test_bounds_and_alignment() {
        let mut buf = [0u8; 1024];
        let mut io = MemDevice::new(&mut buf);
        assert_eq!(io.sector_count(), 2);

        let mut one = [0u8; 512];
        assert_eq!(io.read_sectors(2, &mut one), Err(BlockDevError::OutOfBounds));
        assert_eq!(io.write_sectors(1, &[0u8; 1024]), Err(BlockDevError::OutOfBounds));
        assert_eq!(io.write_sectors(0, &[0u8; 100]), Err(BlockDevError::Misaligned));
    }

    #[test]
    fn test_units_coalesced() {
        let mut buf = [0u8; 64 * 8];
        let mut io = MemDevice::with_sector_size(&mut buf, 64);

        // Units of two sectors at LBA 0, 2 (adjacent) and 6.
        let lbas = [0u64, 2, 6];
        let mut input = [0u8; 3 * 128];
        for (i, b) in input.iter_mut().enumerate() {
            *b = (i / 128) as u8 + 1;
        }
        io.write_units(&lbas, 2, &input).unwrap();

        assert_eq!(io.as_bytes()[4 * 64], 0);
        assert_eq!(io.as_bytes()[6 * 64], 3);

        let mut output = [0u8; 3 * 128];
        io.read_units(&lbas, 2, &mut output).unwrap();
        assert_eq!(input, output);

        let mut short = [0u8; 128];
        assert_eq!(io.read_units(&lbas, 2, &mut short), Err(BlockDevError::Misaligned));
    }

    #[test]
    fn test_zero_sectors() {
        let mut buf = [0xFF; 512 * 12];
        let mut io = MemDevice::new(&mut buf);

        io.zero_sectors(1, 10).unwrap();

        assert_eq!(io.as_bytes()[511], 0xFF);
        assert!(io.as_bytes()[512..512 * 11].iter().all(|&b| b == 0));
        assert_eq!(io.as_bytes()[512 * 11], 0xFF);
    }

    #[test]
    fn test_struct_padded_to_sector() {
        let mut buf = [0xEE; 1024];
        let mut io = MemDevice::new(&mut buf);

        io.write_struct(1, &0xDEADBEEFu32).unwrap();
        assert_eq!(io.read_struct::<u32>(1).unwrap(), 0xDEADBEEF);
        assert!(io.as_bytes()[516..1024].iter().all(|&b| b == 0));
    }
}
