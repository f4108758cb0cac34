// SPDX-License-Identifier: MIT
#[cfg(all(not(feature = "std"), feature = "alloc"))]
use alloc::{vec, vec::Vec};

use linkio::BlockDevice;

use crate::core::{errors::*, log::log_warn};
use crate::fs::{constant::*, meta::*};

/// The block allocation table, seen through a single cached table block.
///
/// Entries are 4-byte little-endian values: [`LINK_FREE`], [`LINK_EOC`], or
/// the number of the next block in the chain. Every `set_entry` writes the
/// whole table block back immediately. A miss on another table block replaces
/// the cached one.
#[derive(Debug, Clone)]
pub struct AllocationTable {
    cache: Vec<u8>,
    cached: Option<u32>,
}

impl AllocationTable {
    pub fn new(meta: &VolumeMeta) -> Self {
        Self {
            cache: vec![0u8; meta.block_size],
            cached: None,
        }
    }

    /// Table block currently resident, if any.
    #[inline]
    pub fn cached_block(&self) -> Option<u32> {
        self.cached
    }

    #[inline]
    pub fn invalidate(&mut self) {
        self.cached = None;
    }

    fn load<IO: BlockDevice + ?Sized>(
        &mut self,
        io: &mut IO,
        meta: &VolumeMeta,
        table_block: u32,
    ) -> FsAllocatorResult {
        if self.cached != Some(table_block) {
            // Drop residency first so a failed read never leaves a stale tag.
            self.cached = None;
            io.read_sectors(meta.unit_lba(table_block), &mut self.cache)?;
            self.cached = Some(table_block);
        }
        Ok(())
    }

    pub fn get_entry<IO: BlockDevice + ?Sized>(
        &mut self,
        io: &mut IO,
        meta: &VolumeMeta,
        block: u32,
    ) -> FsAllocatorResult<u32> {
        debug_assert!(block < meta.num_blocks, "table index out of range");
        let (table_block, off) = meta.entry_location(block);
        self.load(io, meta, table_block)?;

        let mut raw = [0u8; LINK_ENTRY_SIZE];
        raw.copy_from_slice(&self.cache[off..off + LINK_ENTRY_SIZE]);
        Ok(u32::from_le_bytes(raw))
    }

    pub fn set_entry<IO: BlockDevice + ?Sized>(
        &mut self,
        io: &mut IO,
        meta: &VolumeMeta,
        block: u32,
        value: u32,
    ) -> FsAllocatorResult {
        debug_assert!(block < meta.num_blocks, "table index out of range");
        let (table_block, off) = meta.entry_location(block);
        self.load(io, meta, table_block)?;

        self.cache[off..off + LINK_ENTRY_SIZE].copy_from_slice(&value.to_le_bytes());
        io.write_sectors(meta.unit_lba(table_block), &self.cache)?;
        Ok(())
    }

    /// Walks the chain starting at `start` into its ordered block list.
    ///
    /// Fails with `CorruptChain` on a reserved or out-of-range link, a free
    /// entry inside the chain, or a loop.
    pub fn read_chain<IO: BlockDevice + ?Sized>(
        &mut self,
        io: &mut IO,
        meta: &VolumeMeta,
        start: u32,
    ) -> FsAllocatorResult<Vec<u32>> {
        let limit = meta.data_blocks() as usize;
        let mut chain = Vec::new();
        let mut current = start;

        loop {
            if current >= meta.num_blocks || meta.is_reserved(current) || chain.len() >= limit {
                log_warn!("corrupt chain from block {start}: bad link to {current}");
                return Err(FsAllocatorError::CorruptChain(current));
            }
            chain.push(current);

            match self.get_entry(io, meta, current)? {
                LINK_EOC => break,
                LINK_FREE => {
                    log_warn!("corrupt chain from block {start}: block {current} is free");
                    return Err(FsAllocatorError::CorruptChain(current));
                }
                next => current = next,
            }
        }

        Ok(chain)
    }
}
