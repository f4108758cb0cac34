// SPDX-License-Identifier: MIT

use linkio::{BlockDevice, BlockDeviceExt};

pub use crate::core::formatter::*;

use crate::core::log::log_info;
use crate::fs::{
    allocator::BlockAllocator, constant::*, directory::Directory, meta::*,
    table::AllocationTable, types::VolumeDescriptor,
};

/// LinkFormatter:
/// - Writes a zeroed allocation table with the descriptor and table blocks marked end-of-chain.
/// - Allocates the root directory with its "." and ".." records.
/// - Writes the volume descriptor last, so an interrupted format never mounts.
/// - A full format also zeroes every data block.
pub struct LinkFormatter<'a, IO: BlockDevice + ?Sized> {
    io: &'a mut IO,
    meta: &'a VolumeMeta,
}

impl<'a, IO: BlockDevice + ?Sized> LinkFormatter<'a, IO> {
    pub fn new(io: &'a mut IO, meta: &'a VolumeMeta) -> Self {
        Self { io, meta }
    }

    fn check_device(&self) -> FsFormatterResult {
        crate::ensure!(
            self.io.sector_size() == self.meta.sector_size,
            FsFormatterError::Invalid("device sector size differs from the volume's")
        );
        let needed = self.meta.num_blocks as u64 * self.meta.sectors_per_block as u64;
        crate::ensure!(
            needed <= self.io.sector_count(),
            FsFormatterError::Invalid("device too small for the volume")
        );
        Ok(())
    }

    fn zero_blocks(&mut self, first: u32, count: u32) -> FsFormatterResult {
        let spb = self.meta.sectors_per_block as u64;
        self.io
            .zero_sectors(self.meta.unit_lba(first), count as u64 * spb)?;
        Ok(())
    }

    fn write_table_and_root(&mut self) -> FsFormatterResult<VolumeDescriptor> {
        let mut vcb = VolumeDescriptor::from_meta(self.meta);
        let mut table = AllocationTable::new(self.meta);
        let mut alloc = BlockAllocator::new(&mut *self.io, self.meta, &mut vcb, &mut table);

        for block in 0..=self.meta.table_blocks {
            alloc.set_entry(block, LINK_EOC)?;
        }

        let root = Directory::create_root(&mut alloc)?;
        alloc.descriptor_mut().root_dir_block = root.start();
        alloc.persist()?;
        Ok(vcb)
    }
}

impl<'a, IO: BlockDevice + ?Sized> FsFormatter for LinkFormatter<'a, IO> {
    fn format(&mut self, full_format: bool) -> FsFormatterResult {
        self.check_device()?;

        // Drop any previous signature before the table changes underneath it.
        self.zero_blocks(LINK_DESCRIPTOR_BLOCK, 1)?;
        self.zero_blocks(1, self.meta.table_blocks)?;
        if full_format {
            let first = self.meta.first_data_unit();
            self.zero_blocks(first, self.meta.num_blocks - first)?;
        }

        let vcb = self.write_table_and_root()?;
        self.flush()?;

        let (root, free) = (vcb.root_dir_block, vcb.free_block_count);
        log_info!(
            "formatted {} blocks of {} bytes (table {} blocks, root at {}, {} free)",
            self.meta.num_blocks,
            self.meta.block_size,
            self.meta.table_blocks,
            root,
            free
        );
        Ok(())
    }

    fn flush(&mut self) -> FsFormatterResult {
        self.io.flush()?;
        Ok(())
    }
}

#[cfg(all(test, feature = "std"))]
mod tests {
    use super::*;
    use linkio::prelude::*;

    #[test]
    fn test_format_layout() {
        let meta = VolumeMeta::new(2048 * 512).unwrap();
        let mut buf = vec![0xEEu8; 2048 * 512];
        let mut io = MemDevice::new(&mut buf);
        LinkFormatter::new(&mut io, &meta).format(false).unwrap();

        let vcb = VolumeDescriptor::read_from(&mut io).unwrap();
        assert!(vcb.has_signature() && vcb.checksum_ok());
        let (root, free, hint) = (vcb.root_dir_block, vcb.free_block_count, vcb.next_free_block);
        assert_eq!(root, 17);
        assert_eq!(free, 2048 - 17 - 8);
        assert_eq!(hint, 25);

        let disk = io.as_bytes();
        let entry = |b: usize| u32::from_le_bytes(disk[512 + b * 4..512 + b * 4 + 4].try_into().unwrap());
        for b in 0..=16 {
            assert_eq!(entry(b), LINK_EOC, "reserved block {b}");
        }
        for b in 17..24 {
            assert_eq!(entry(b), b as u32 + 1);
        }
        assert_eq!(entry(24), LINK_EOC);
        assert_eq!(entry(25), LINK_FREE);
        assert_eq!(entry(2047), LINK_FREE);

        // Quick format leaves data blocks alone.
        assert_eq!(disk[2047 * 512], 0xEE);
    }

    #[test]
    fn test_full_format_zeroes_data() {
        let meta = VolumeMeta::new_custom(64, 512, 512).unwrap();
        let mut buf = vec![0xEEu8; 64 * 512];
        let mut io = MemDevice::new(&mut buf);
        LinkFormatter::new(&mut io, &meta).format(true).unwrap();

        let disk = io.as_bytes();
        assert!(disk[20 * 512..].iter().all(|&b| b == 0));
    }

    #[test]
    fn test_device_mismatch() {
        let meta = VolumeMeta::new_custom(64, 512, 512).unwrap();
        let mut small = vec![0u8; 32 * 512];
        let mut io = MemDevice::new(&mut small);
        assert_eq!(
            LinkFormatter::new(&mut io, &meta).format(false),
            Err(FsFormatterError::Invalid("device too small for the volume"))
        );

        let mut buf = vec![0u8; 64 * 512];
        let mut io = MemDevice::with_sector_size(&mut buf, 256);
        assert!(LinkFormatter::new(&mut io, &meta).format(false).is_err());
    }
}
