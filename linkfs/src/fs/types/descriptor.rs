// SPDX-License-Identifier: MIT

use linkio::{BlockDevice, BlockDeviceExt};
use zerocopy::{FromBytes, Immutable, IntoBytes, KnownLayout};

use crate::core::errors::*;
use crate::fs::{constant::*, meta::*};

/// On-disk volume descriptor, stored at the start of block 0 and padded to one sector.
#[derive(IntoBytes, FromBytes, KnownLayout, Immutable, Copy, Clone, Debug, PartialEq, Eq)]
#[repr(C, packed)]
pub struct VolumeDescriptor {
    pub signature: [u8; 8],
    pub sector_size: u32,
    pub block_size: u32,
    pub num_blocks: u32,
    pub sectors_per_block: u32,
    pub table_blocks: u32,
    pub free_block_count: u32,
    pub next_free_block: u32,
    pub root_dir_block: u32,
    pub root_dir_blocks: u32,
    /// CRC32 of every preceding byte.
    pub checksum: u32,
}

impl VolumeDescriptor {
    /// Descriptor of a freshly formatted volume, before the root directory exists.
    pub fn from_meta(meta: &VolumeMeta) -> Self {
        let mut d = Self {
            signature: LINK_SIGNATURE,
            sector_size: meta.sector_size as u32,
            block_size: meta.block_size as u32,
            num_blocks: meta.num_blocks,
            sectors_per_block: meta.sectors_per_block,
            table_blocks: meta.table_blocks,
            free_block_count: meta.data_blocks(),
            next_free_block: meta.first_data_unit(),
            root_dir_block: 0,
            root_dir_blocks: meta.dir_blocks,
            checksum: 0,
        };
        d.seal();
        d
    }

    #[inline]
    pub fn compute_checksum(&self) -> u32 {
        let bytes = self.as_bytes();
        crc32fast::hash(&bytes[..bytes.len() - 4])
    }

    /// Refreshes the checksum after a field change.
    #[inline]
    pub fn seal(&mut self) {
        self.checksum = self.compute_checksum();
    }

    #[inline]
    pub fn has_signature(&self) -> bool {
        self.signature == LINK_SIGNATURE
    }

    #[inline]
    pub fn checksum_ok(&self) -> bool {
        let stored = self.checksum;
        stored == self.compute_checksum()
    }

    /// Rebuilds the geometry recorded in the descriptor.
    pub fn meta(&self) -> FsMountResult<VolumeMeta> {
        let meta = VolumeMeta::new_custom(
            self.num_blocks,
            self.block_size as usize,
            self.sector_size as usize,
        )
        .map_err(|_| FsMountError::Invalid("descriptor geometry is invalid"))?;

        let (spb, table, dir) = (self.sectors_per_block, self.table_blocks, self.root_dir_blocks);
        crate::ensure!(
            spb == meta.sectors_per_block && table == meta.table_blocks && dir == meta.dir_blocks,
            FsMountError::Invalid("descriptor geometry is inconsistent")
        );
        Ok(meta)
    }

    pub fn read_from<IO: BlockDevice + ?Sized>(io: &mut IO) -> FsMountResult<Self> {
        Ok(io.read_struct::<Self>(LINK_DESCRIPTOR_BLOCK as u64)?)
    }

    /// Seals and writes the descriptor to block 0.
    pub fn write_to<IO: BlockDevice + ?Sized>(&mut self, io: &mut IO) -> BlockDevResult {
        self.seal();
        io.write_struct(LINK_DESCRIPTOR_BLOCK as u64, self)
    }
}
