// SPDX-License-Identifier: MIT
#[cfg(all(not(feature = "std"), feature = "alloc"))]
use alloc::{format, vec, vec::Vec};

use linkio::{BlockDevice, BlockDeviceExt};

pub use crate::core::checker::*;

use crate::core::{errors::*, log::log_warn, utils::bitmap::BitmapOps};
use crate::fs::{
    allocator::{BlockAllocator, FsHandle},
    constant::*,
    directory::Directory,
    meta::*,
    table::AllocationTable,
    types::{VolumeDescriptor, validate_name},
};

#[derive(Clone, Debug)]
pub struct LinkCheckOptions {
    pub phases: VerifyPhases,
    pub fail_fast: bool,
    /// Stop walking the tree after this many directories
    pub max_dirs: usize,
    /// Leaked blocks reported one by one before summarizing
    pub leak_sample_limit: usize,
}

impl Default for LinkCheckOptions {
    fn default() -> Self {
        Self {
            phases: VerifyPhases::ALL,
            fail_fast: false,
            max_dirs: 100_000,
            leak_sample_limit: 8,
        }
    }
}

impl VerifierOptionsLike for LinkCheckOptions {
    fn phases(&self) -> VerifyPhases {
        self.phases
    }
    fn fail_fast(&self) -> bool {
        self.fail_fast
    }
}

/// Read-only consistency checker.
///
/// Reads the descriptor and the table from the device through its own table
/// cache; nothing is ever written.
pub struct LinkChecker<'a, IO: BlockDevice + ?Sized> {
    io: &'a mut IO,
    meta: &'a VolumeMeta,
    table: AllocationTable,
    vcb: Option<VolumeDescriptor>,
    /// Blocks owned by some directory or file, filled by the tree walk
    reachable: Option<Vec<u8>>,
}

impl<'a, IO: BlockDevice + ?Sized> LinkChecker<'a, IO> {
    pub fn new(io: &'a mut IO, meta: &'a VolumeMeta) -> Self {
        Self {
            io,
            table: AllocationTable::new(meta),
            meta,
            vcb: None,
            reachable: None,
        }
    }

    fn descriptor(&mut self) -> FsCheckerResult<VolumeDescriptor> {
        if let Some(vcb) = self.vcb {
            return Ok(vcb);
        }
        let vcb = self
            .io
            .read_struct::<VolumeDescriptor>(LINK_DESCRIPTOR_BLOCK as u64)?;
        self.vcb = Some(vcb);
        Ok(vcb)
    }

    /// Walks the directory tree from the root, checking every chain and
    /// returning the bitmap of blocks it owns.
    fn walk(
        &mut self,
        opt: &LinkCheckOptions,
        rep: &mut VerifyReport,
    ) -> FsCheckerResult<Vec<u8>> {
        let mut vcb = self.descriptor()?;
        let meta = self.meta;
        let mut owned = vec![0u8; (meta.num_blocks as usize).div_ceil(8)];
        let root = vcb.root_dir_block;

        let mut alloc = BlockAllocator::new(&mut *self.io, meta, &mut vcb, &mut self.table);
        let mut pending = vec![(root, root)];
        let mut visited = 0usize;

        while let Some((start, parent)) = pending.pop() {
            if visited >= opt.max_dirs {
                rep.push(Finding::warn(
                    "chain.limit",
                    format!("stopped after {visited} directories"),
                ));
                break;
            }
            visited += 1;

            let Some(chain) = read_chain_reported(&mut alloc, start, "directory", rep)? else {
                continue;
            };
            if !claim(&mut owned, chain.blocks(), start, rep) {
                continue;
            }
            if chain.len() != meta.dir_blocks as usize {
                rep.push(Finding::err(
                    "chain.dir_len",
                    format!(
                        "directory at {start} spans {} blocks, expected {}",
                        chain.len(),
                        meta.dir_blocks
                    ),
                ).at(start));
                continue;
            }

            let dir = Directory::load(&mut alloc, start)?;
            let (dot, dotdot) = (dir.records()[0], dir.records()[1]);
            if !dot.is_dir() || dot.start() != start || !dotdot.is_dir() || dotdot.start() != parent
            {
                rep.push(Finding::err(
                    "dir.dots",
                    format!("directory at {start} has bad \".\" or \"..\" records"),
                ).at(start));
            }

            for (slot, rec) in dir.records().iter().enumerate() {
                if rec.record_kind().is_none() {
                    rep.push(Finding::warn(
                        "dir.kind",
                        format!("directory at {start}, slot {slot}: unknown kind {}", { rec.kind }),
                    ));
                }
            }

            for (_, rec) in dir.entries() {
                let name = rec.name();
                if validate_name(name).is_err() {
                    rep.push(Finding::warn(
                        "dir.name",
                        format!("directory at {start}: invalid name {name:?}"),
                    ));
                }
                if rec.is_dir() {
                    pending.push((rec.start(), start));
                    continue;
                }

                let Some(chain) = read_chain_reported(&mut alloc, rec.start(), name, rep)? else {
                    continue;
                };
                if !claim(&mut owned, chain.blocks(), rec.start(), rep) {
                    continue;
                }
                let expected = meta.blocks_for(rec.byte_size()).max(1);
                if chain.len() as u64 != expected {
                    rep.push(Finding::err(
                        "chain.file_len",
                        format!(
                            "{name}: {} bytes in {} blocks, expected {expected}",
                            { rec.size },
                            chain.len()
                        ),
                    ).at(rec.start()));
                }
            }
        }

        Ok(owned)
    }
}

/// Reads a chain, turning corruption into a finding. Device failures still propagate.
fn read_chain_reported<IO: BlockDevice + ?Sized>(
    alloc: &mut BlockAllocator<'_, IO>,
    start: u32,
    what: &str,
    rep: &mut VerifyReport,
) -> FsCheckerResult<Option<crate::fs::allocator::BlockChain>> {
    match alloc.read_chain(start) {
        Ok(chain) => Ok(Some(chain)),
        Err(FsAllocatorError::CorruptChain(at)) => {
            rep.push(Finding::err(
                "chain.broken",
                format!("{what} starting at {start}: bad link at block {at}"),
            ).at(at));
            Ok(None)
        }
        Err(e) => Err(e.into()),
    }
}

/// Marks `blocks` as owned. Returns `false` if any was already owned.
fn claim(owned: &mut [u8], blocks: &[u32], head: u32, rep: &mut VerifyReport) -> bool {
    let mut clean = true;
    for &block in blocks {
        if owned.test_and_set(block as usize) {
            rep.push(Finding::err(
                "chain.crosslink",
                format!("block {block} of chain {head} already belongs to another chain"),
            ).at(block));
            clean = false;
        }
    }
    clean
}

impl<'a, IO: BlockDevice + ?Sized> FsChecker for LinkChecker<'a, IO> {
    type Options = LinkCheckOptions;

    fn check_boot(&mut self, _opt: &Self::Options, rep: &mut VerifyReport) -> FsCheckerResult<()> {
        let vcb = self.descriptor()?;
        if !vcb.has_signature() {
            rep.push(Finding::err("boot.signature", "volume signature not found"));
        } else if !vcb.checksum_ok() {
            let (stored, computed) = ({ vcb.checksum }, vcb.compute_checksum());
            rep.push(Finding::err(
                "boot.checksum",
                format!("descriptor checksum {stored:#010x}, computed {computed:#010x}"),
            ));
        } else {
            rep.push(Finding::info("boot.ok", "descriptor signature and checksum valid"));
        }
        Ok(())
    }

    fn check_geometry(&mut self, _opt: &Self::Options, rep: &mut VerifyReport) -> FsCheckerResult<()> {
        let vcb = self.descriptor()?;
        let meta = self.meta;

        match vcb.meta() {
            Ok(m) if m == *meta => {}
            Ok(_) => rep.push(Finding::err(
                "geom.mismatch",
                "descriptor geometry differs from the mounted volume",
            )),
            Err(e) => rep.push(Finding::err("geom.invalid", e.msg())),
        }

        let needed = meta.num_blocks as u64 * meta.sectors_per_block as u64;
        if needed > self.io.sector_count() {
            rep.push(Finding::err(
                "geom.device",
                format!("volume needs {needed} sectors, device has {}", self.io.sector_count()),
            ));
        }

        let (root, free, hint) = (vcb.root_dir_block, vcb.free_block_count, vcb.next_free_block);
        if !meta.is_valid_unit(root) {
            rep.push(Finding::err("geom.root", format!("root block {root} outside the data area")));
        }
        if free > meta.data_blocks() {
            rep.push(Finding::err(
                "geom.free_count",
                format!("{free} free blocks on a volume of {} data blocks", meta.data_blocks()),
            ));
        }
        if hint < meta.first_data_unit() || hint > meta.num_blocks {
            rep.push(Finding::err("geom.hint", format!("free hint {hint} out of range")));
        }

        for block in 0..=meta.table_blocks {
            if self.table.get_entry(self.io, meta, block)? != LINK_EOC {
                rep.push(Finding::err(
                    "geom.reserved",
                    format!("reserved block {block} is not marked end-of-chain"),
                ).at(block));
            }
        }
        Ok(())
    }

    fn check_chain(&mut self, opt: &Self::Options, rep: &mut VerifyReport) -> FsCheckerResult<()> {
        let owned = self.walk(opt, rep)?;
        self.reachable = Some(owned);
        Ok(())
    }

    fn check_cross_reference(
        &mut self,
        opt: &Self::Options,
        rep: &mut VerifyReport,
    ) -> FsCheckerResult<()> {
        let vcb = self.descriptor()?;
        let owned = match self.reachable.take() {
            Some(owned) => owned,
            // Chain phase disabled: walk silently.
            None => self.walk(opt, &mut VerifyReport::default())?,
        };
        let meta = self.meta;

        let mut free = 0u32;
        let mut leaked = 0usize;
        let mut first_free = None;

        for block in 0..meta.num_blocks {
            let is_free = self.table.get_entry(self.io, meta, block)? == LINK_FREE;
            let is_owned = owned.get_bit(block as usize);

            if meta.is_reserved(block) {
                if is_owned || is_free {
                    rep.push(Finding::err(
                        "part.reserved",
                        format!("reserved block {block} is free or owned by a chain"),
                    ).at(block));
                }
                continue;
            }

            match (is_free, is_owned) {
                (true, false) => {
                    free += 1;
                    first_free.get_or_insert(block);
                }
                (true, true) => rep.push(Finding::err(
                    "part.overlap",
                    format!("block {block} is free and owned by a chain"),
                ).at(block)),
                (false, false) => {
                    leaked += 1;
                    if leaked <= opt.leak_sample_limit {
                        rep.push(Finding::err(
                            "part.leak",
                            format!("block {block} is allocated but unreachable"),
                        ).at(block));
                    }
                }
                (false, true) => {}
            }
        }

        if leaked > opt.leak_sample_limit {
            rep.push(Finding::err(
                "part.leak",
                format!("{leaked} unreachable blocks in total"),
            ));
        }

        let (recorded, hint) = (vcb.free_block_count, vcb.next_free_block);
        if free != recorded {
            rep.push(Finding::err(
                "part.free_count",
                format!("descriptor records {recorded} free blocks, table has {free}"),
            ));
        }
        if let Some(first) = first_free
            && hint > first
        {
            rep.push(Finding::err(
                "part.hint",
                format!("free hint {hint} is past the first free block {first}"),
            ));
        }

        if rep.has_error() {
            log_warn!("check found {} error(s)", rep.count(Severity::Error));
        }
        rep.push(Finding::info(
            "part.summary",
            format!(
                "{free} free, {} owned, {} reserved",
                owned.count_ones(),
                meta.table_blocks + 1
            ),
        ));
        Ok(())
    }
}
