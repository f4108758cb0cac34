// SPDX-License-Identifier: MIT

pub use crate::core::meta::*;

use linkio::BlockDevice;

use crate::core::errors::*;
use crate::fs::constant::*;

/// Static geometry of a volume.
///
/// Built from parameters before formatting, or from the on-disk descriptor when mounting.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VolumeMeta {
    pub sector_size: usize,
    pub block_size: usize,
    pub sectors_per_block: u32,
    pub num_blocks: u32,

    /// Blocks `1..=table_blocks` hold the allocation table.
    pub table_blocks: u32,
    /// Blocks spanned by one directory record array.
    pub dir_blocks: u32,
}

impl VolumeMeta {
    /// Default geometry (512-byte sectors and blocks) for a volume of `size_bytes`.
    pub fn new(size_bytes: u64) -> FsFormatterResult<Self> {
        let num_blocks = u32::try_from(size_bytes / LINK_BLOCK_SIZE as u64)
            .map_err(|_| FsFormatterError::Invalid("volume too large"))?;
        Self::new_custom(num_blocks, LINK_BLOCK_SIZE, LINK_SECTOR_SIZE)
    }

    /// Geometry filling a whole device with `block_size` blocks.
    pub fn for_device<IO: BlockDevice + ?Sized>(io: &IO, block_size: usize) -> FsFormatterResult<Self> {
        let sector_size = io.sector_size();
        crate::ensure!(
            sector_size != 0 && block_size.is_multiple_of(sector_size),
            FsFormatterError::Invalid("block size must be a multiple of the sector size")
        );
        let spb = (block_size / sector_size) as u64;
        let num_blocks = u32::try_from(io.sector_count() / spb)
            .map_err(|_| FsFormatterError::Invalid("volume too large"))?;
        Self::new_custom(num_blocks, block_size, sector_size)
    }

    pub fn new_custom(num_blocks: u32, block_size: usize, sector_size: usize) -> FsFormatterResult<Self> {
        crate::ensure!(
            (LINK_MIN_SECTOR_SIZE..=LINK_MAX_SECTOR_SIZE).contains(&sector_size),
            FsFormatterError::Invalid("unsupported sector size")
        );
        crate::ensure!(
            block_size >= sector_size && block_size.is_multiple_of(sector_size),
            FsFormatterError::Invalid("block size must be a multiple of the sector size")
        );
        crate::ensure!(
            num_blocks >= LINK_MIN_BLOCKS,
            FsFormatterError::Invalid("volume has too few blocks")
        );

        let table_bytes = num_blocks as u64 * LINK_ENTRY_SIZE as u64;
        let table_blocks = table_bytes.div_ceil(block_size as u64) as u32;
        let dir_blocks = (LINK_DIR_ENTRIES * LINK_RECORD_SIZE).div_ceil(block_size) as u32;

        // Descriptor + table + root directory must leave room for data.
        crate::ensure!(
            (1 + table_blocks as u64 + dir_blocks as u64) < num_blocks as u64,
            FsFormatterError::Invalid("volume too small for its metadata")
        );

        Ok(Self {
            sector_size,
            block_size,
            sectors_per_block: (block_size / sector_size) as u32,
            num_blocks,
            table_blocks,
            dir_blocks,
        })
    }

    /// Table block holding the entry of `block`, and the entry's byte offset inside it.
    #[inline]
    pub fn entry_location(&self, block: u32) -> (u32, usize) {
        let byte = block as u64 * LINK_ENTRY_SIZE as u64;
        let table_block = (byte / self.block_size as u64) as u32 + 1;
        (table_block, (byte % self.block_size as u64) as usize)
    }

    /// Byte size of a directory record array.
    #[inline]
    pub fn dir_bytes(&self) -> u64 {
        (LINK_DIR_ENTRIES * LINK_RECORD_SIZE) as u64
    }

    /// Blocks available to files and directories on a fresh volume.
    #[inline]
    pub fn data_blocks(&self) -> u32 {
        self.num_blocks - 1 - self.table_blocks
    }
}

impl FsMeta<u32> for VolumeMeta {
    fn unit_size(&self) -> usize {
        self.block_size
    }

    fn unit_lba(&self, block: u32) -> u64 {
        block as u64 * self.sectors_per_block as u64
    }

    fn first_data_unit(&self) -> u32 {
        self.table_blocks + 1
    }

    fn last_data_unit(&self) -> u32 {
        self.num_blocks - 1
    }
}
