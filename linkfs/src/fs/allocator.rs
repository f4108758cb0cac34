// SPDX-License-Identifier: MIT
#[cfg(all(not(feature = "std"), feature = "alloc"))]
use alloc::vec::Vec;

pub use crate::core::allocator::*;

use linkio::BlockDevice;

use crate::core::log::{log_verbose, log_warn};
use crate::fs::{constant::*, meta::*, table::AllocationTable, types::VolumeDescriptor};

/// Ordered list of the blocks of one chain (a file's block map).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BlockChain {
    blocks: Vec<u32>,
}

/// Block map of an open file.
pub type FileBlockMap = BlockChain;

impl BlockChain {
    pub fn from_blocks(blocks: Vec<u32>) -> Self {
        Self { blocks }
    }

    #[inline]
    pub fn blocks(&self) -> &[u32] {
        &self.blocks
    }

    /// Block at position `index` of the chain.
    #[inline]
    pub fn get(&self, index: usize) -> Option<u32> {
        self.blocks.get(index).copied()
    }

    #[inline]
    pub fn tail(&self) -> Option<u32> {
        self.blocks.last().copied()
    }

    /// Device address of every block, in chain order.
    pub fn lbas(&self, meta: &VolumeMeta) -> Vec<u64> {
        self.blocks.iter().map(|&b| meta.unit_lba(b)).collect()
    }
}

impl FsHandle for BlockChain {
    fn head(&self) -> u32 {
        self.blocks.first().copied().unwrap_or(LINK_FREE)
    }

    fn len(&self) -> usize {
        self.blocks.len()
    }
}

/// First-fit chain allocator over the allocation table.
///
/// Borrows the pieces of a mounted volume for the duration of one operation.
/// Every allocation or release persists the volume descriptor (hint and free count).
pub struct BlockAllocator<'v, IO: BlockDevice + ?Sized> {
    io: &'v mut IO,
    meta: &'v VolumeMeta,
    vcb: &'v mut VolumeDescriptor,
    table: &'v mut AllocationTable,
}

impl<'v, IO: BlockDevice + ?Sized> BlockAllocator<'v, IO> {
    pub fn new(
        io: &'v mut IO,
        meta: &'v VolumeMeta,
        vcb: &'v mut VolumeDescriptor,
        table: &'v mut AllocationTable,
    ) -> Self {
        Self {
            io,
            meta,
            vcb,
            table,
        }
    }

    #[inline]
    pub fn io(&mut self) -> &mut IO {
        &mut *self.io
    }

    #[inline]
    pub fn meta(&self) -> &'v VolumeMeta {
        self.meta
    }

    #[inline]
    pub fn descriptor(&self) -> &VolumeDescriptor {
        &*self.vcb
    }

    /// In-memory descriptor. Changes reach the disk with the next [`Self::persist`].
    #[inline]
    pub fn descriptor_mut(&mut self) -> &mut VolumeDescriptor {
        &mut *self.vcb
    }

    /// Current next-free hint.
    #[inline]
    pub fn hint(&self) -> u32 {
        self.vcb.next_free_block
    }

    #[inline]
    pub fn entry(&mut self, block: u32) -> FsAllocatorResult<u32> {
        self.table.get_entry(self.io, self.meta, block)
    }

    #[inline]
    pub fn set_entry(&mut self, block: u32, value: u32) -> FsAllocatorResult {
        self.table.set_entry(self.io, self.meta, block, value)
    }

    pub fn read_chain(&mut self, start: u32) -> FsAllocatorResult<BlockChain> {
        let blocks = self.table.read_chain(self.io, self.meta, start)?;
        Ok(BlockChain::from_blocks(blocks))
    }

    /// First free block at or after `from`, or `num_blocks` when there is none.
    fn next_free_from(&mut self, from: u32) -> FsAllocatorResult<u32> {
        let mut block = from.max(self.meta.first_data_unit());
        while block < self.meta.num_blocks {
            if self.entry(block)? == LINK_FREE {
                return Ok(block);
            }
            block += 1;
        }
        Ok(self.meta.num_blocks)
    }

    /// Collects `count` free blocks scanning forward from the hint. Nothing is modified.
    fn scan_free(&mut self, count: usize) -> FsAllocatorResult<Vec<u32>> {
        let mut found = Vec::with_capacity(count);
        let mut block = self.hint();
        while found.len() < count {
            block = self.next_free_from(block)?;
            if block >= self.meta.num_blocks {
                let free = self.vcb.free_block_count;
                log_warn!("out of space: wanted {count} blocks, {free} free");
                return Err(FsAllocatorError::OutOfSpace);
            }
            found.push(block);
            block += 1;
        }
        Ok(found)
    }

    /// Seals and writes the descriptor to block 0.
    pub fn persist(&mut self) -> FsAllocatorResult {
        self.vcb.write_to(self.io)?;
        Ok(())
    }
}

impl<'v, IO: BlockDevice + ?Sized> FsAllocator<BlockChain> for BlockAllocator<'v, IO> {
    fn allocate_chain(&mut self, count: usize) -> FsAllocatorResult<BlockChain> {
        crate::ensure!(count > 0, FsAllocatorError::Other("empty allocation"));

        let blocks = self.scan_free(count)?;
        for pair in blocks.windows(2) {
            self.set_entry(pair[0], pair[1])?;
        }
        let last = blocks[blocks.len() - 1];
        self.set_entry(last, LINK_EOC)?;

        self.vcb.next_free_block = self.next_free_from(last + 1)?;
        self.vcb.free_block_count -= count as u32;
        self.persist()?;

        log_verbose!("allocated {} blocks from {}", count, blocks[0]);
        Ok(BlockChain::from_blocks(blocks))
    }

    fn extend(&mut self, handle: &mut BlockChain) -> FsAllocatorResult<u32> {
        let block = self.allocate_unit()?.head();
        if let Some(tail) = handle.tail() {
            self.set_entry(tail, block)?;
        }
        handle.blocks.push(block);
        Ok(block)
    }

    fn release(&mut self, head: u32) -> FsAllocatorResult<usize> {
        let chain = self.read_chain(head)?;
        for &block in chain.blocks() {
            self.set_entry(block, LINK_FREE)?;
        }

        // Chains grown by extend may hold blocks below their head.
        if let Some(&lowest) = chain.blocks().iter().min()
            && lowest < self.vcb.next_free_block
        {
            self.vcb.next_free_block = lowest;
        }
        self.vcb.free_block_count += chain.len() as u32;
        self.persist()?;

        log_verbose!("released {} blocks from {}", chain.len(), head);
        Ok(chain.len())
    }

    fn used_units(&self) -> usize {
        (self.meta.data_blocks() - self.vcb.free_block_count) as usize
    }

    fn remaining_units(&self) -> usize {
        self.vcb.free_block_count as usize
    }
}
