// SPDX-License-Identifier: MIT
#[cfg(all(not(feature = "std"), feature = "alloc"))]
use alloc::{vec, vec::Vec};

use linkio::{BlockDevice, BlockDeviceExt};
use zerocopy::{FromBytes, IntoBytes};

use crate::core::{errors::*, log::log_verbose};
use crate::fs::{
    allocator::*,
    constant::*,
    types::{DirRecord, RecordKind, validate_name},
};

/// In-memory copy of one directory: its block chain and its 64 record slots.
///
/// Every mutation writes the whole record array back before returning.
#[derive(Debug, Clone)]
pub struct Directory {
    chain: BlockChain,
    records: Vec<DirRecord>,
}

impl Directory {
    /// Fresh record array living in `chain`, with "." and ".." seeded.
    fn seeded(chain: BlockChain, parent: u32, dir_bytes: u64) -> Self {
        let mut records = vec![DirRecord::unused(); LINK_DIR_ENTRIES];
        records[0] = DirRecord::new(LINK_SELF_NAME, RecordKind::Directory, chain.head(), dir_bytes);
        records[1] = DirRecord::new(LINK_PARENT_NAME, RecordKind::Directory, parent, dir_bytes);
        Self { chain, records }
    }

    /// Allocates and writes the root directory. Its ".." points to itself.
    pub fn create_root<IO: BlockDevice + ?Sized>(
        alloc: &mut BlockAllocator<'_, IO>,
    ) -> FsDirectoryResult<Self> {
        let meta = alloc.meta();
        let chain = alloc.allocate_chain(meta.dir_blocks as usize)?;
        let root = chain.head();
        let dir = Self::seeded(chain, root, meta.dir_bytes());
        dir.store(alloc)?;
        Ok(dir)
    }

    /// Reads the record array stored in the chain starting at `start`.
    ///
    /// Adjacent blocks are read in one device transfer.
    pub fn load<IO: BlockDevice + ?Sized>(
        alloc: &mut BlockAllocator<'_, IO>,
        start: u32,
    ) -> FsDirectoryResult<Self> {
        let meta = alloc.meta();
        let chain = alloc.read_chain(start)?;
        crate::ensure!(
            chain.len() == meta.dir_blocks as usize,
            FsAllocatorError::CorruptChain(start)
        );

        let mut buf = vec![0u8; meta.dir_blocks as usize * meta.block_size];
        alloc
            .io()
            .read_units(&chain.lbas(meta), meta.sectors_per_block as u64, &mut buf)?;

        let records = buf
            .chunks_exact(LINK_RECORD_SIZE)
            .take(LINK_DIR_ENTRIES)
            .map(|raw| {
                DirRecord::read_from_bytes(raw)
                    .map_err(|_| FsDirectoryError::Other("malformed directory record"))
            })
            .collect::<FsDirectoryResult<Vec<_>>>()?;

        Ok(Self { chain, records })
    }

    /// Writes the whole record array back to its chain.
    pub fn store<IO: BlockDevice + ?Sized>(
        &self,
        alloc: &mut BlockAllocator<'_, IO>,
    ) -> FsDirectoryResult {
        let meta = alloc.meta();
        let mut buf = vec![0u8; self.chain.len() * meta.block_size];
        for (slot, rec) in buf.chunks_exact_mut(LINK_RECORD_SIZE).zip(&self.records) {
            slot.copy_from_slice(rec.as_bytes());
        }
        alloc
            .io()
            .write_units(&self.chain.lbas(meta), meta.sectors_per_block as u64, &buf)?;
        Ok(())
    }

    #[inline]
    pub fn start(&self) -> u32 {
        self.chain.head()
    }

    #[inline]
    pub fn chain(&self) -> &BlockChain {
        &self.chain
    }

    #[inline]
    pub fn records(&self) -> &[DirRecord] {
        &self.records
    }

    #[inline]
    pub fn record(&self, index: usize) -> Option<&DirRecord> {
        self.records.get(index)
    }

    /// The "." record, describing this directory.
    #[inline]
    pub fn self_record(&self) -> &DirRecord {
        &self.records[0]
    }

    /// Slot of the used record called `name`, "." and ".." included.
    pub fn find(&self, name: &str) -> Option<usize> {
        self.records
            .iter()
            .position(|r| r.is_used() && r.name() == name)
    }

    pub fn lookup(&self, name: &str) -> FsDirectoryResult<(usize, DirRecord)> {
        let idx = self.find(name).ok_or(FsDirectoryError::NotFound)?;
        Ok((idx, self.records[idx]))
    }

    /// Used records other than "." and "..", with their slots.
    pub fn entries(&self) -> impl Iterator<Item = (usize, &DirRecord)> {
        self.records
            .iter()
            .enumerate()
            .skip(LINK_FIRST_USER_RECORD)
            .filter(|(_, r)| r.is_used())
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.entries().next().is_none()
    }

    /// Validates `name` and returns the slot a new record would take.
    fn reserve_slot(&self, name: &str) -> FsDirectoryResult<usize> {
        validate_name(name)?;
        crate::ensure!(self.find(name).is_none(), FsDirectoryError::AlreadyExists);
        self.records
            .iter()
            .enumerate()
            .skip(LINK_FIRST_USER_RECORD)
            .find(|(_, r)| !r.is_used())
            .map(|(idx, _)| idx)
            .ok_or(FsDirectoryError::DirectoryFull)
    }

    /// Adds an empty file owning one block.
    pub fn create_entry<IO: BlockDevice + ?Sized>(
        &mut self,
        alloc: &mut BlockAllocator<'_, IO>,
        name: &str,
    ) -> FsDirectoryResult<usize> {
        let slot = self.reserve_slot(name)?;
        let chain = alloc.allocate_unit()?;

        self.records[slot] = DirRecord::new(name, RecordKind::File, chain.head(), 0);
        self.store(alloc)?;
        log_verbose!("created file {name} at block {}", chain.head());
        Ok(slot)
    }

    /// Adds a subdirectory with its own "." and "..".
    pub fn make_directory<IO: BlockDevice + ?Sized>(
        &mut self,
        alloc: &mut BlockAllocator<'_, IO>,
        name: &str,
    ) -> FsDirectoryResult<usize> {
        let slot = self.reserve_slot(name)?;
        let meta = alloc.meta();
        let chain = alloc.allocate_chain(meta.dir_blocks as usize)?;
        let head = chain.head();

        Self::seeded(chain, self.start(), meta.dir_bytes()).store(alloc)?;

        self.records[slot] = DirRecord::new(name, RecordKind::Directory, head, meta.dir_bytes());
        self.store(alloc)?;
        log_verbose!("created directory {name} at block {head}");
        Ok(slot)
    }

    /// Deletes a file: frees its chain, then marks the record unused.
    pub fn remove_entry<IO: BlockDevice + ?Sized>(
        &mut self,
        alloc: &mut BlockAllocator<'_, IO>,
        name: &str,
    ) -> FsDirectoryResult {
        let (idx, rec) = self.lookup(name)?;
        crate::ensure!(!rec.is_dir(), FsDirectoryError::IsADirectory);

        alloc.release(rec.start())?;
        self.records[idx].kind = RecordKind::Unused as u32;
        self.store(alloc)
    }

    /// Deletes an empty subdirectory. A non-empty one is left untouched.
    pub fn remove_directory<IO: BlockDevice + ?Sized>(
        &mut self,
        alloc: &mut BlockAllocator<'_, IO>,
        name: &str,
    ) -> FsDirectoryResult {
        let (idx, rec) = self.lookup(name)?;
        crate::ensure!(idx >= LINK_FIRST_USER_RECORD, FsDirectoryError::InvalidName);
        crate::ensure!(rec.is_dir(), FsDirectoryError::NotADirectory);

        let child = Directory::load(alloc, rec.start())?;
        crate::ensure!(child.is_empty(), FsDirectoryError::NotEmpty);

        alloc.release(rec.start())?;
        self.records[idx].kind = RecordKind::Unused as u32;
        self.store(alloc)
    }

    /// Renames an entry in place.
    pub fn rename<IO: BlockDevice + ?Sized>(
        &mut self,
        alloc: &mut BlockAllocator<'_, IO>,
        old: &str,
        new: &str,
    ) -> FsDirectoryResult {
        crate::ensure!(old != new, FsDirectoryError::InvalidName);
        let (idx, _) = self.lookup(old)?;
        crate::ensure!(idx >= LINK_FIRST_USER_RECORD, FsDirectoryError::InvalidName);
        validate_name(new)?;
        crate::ensure!(self.find(new).is_none(), FsDirectoryError::AlreadyExists);

        let rec = &mut self.records[idx];
        rec.set_name(new);
        rec.touch_modified();
        self.store(alloc)
    }

    /// Records the final size of a file.
    pub fn set_size<IO: BlockDevice + ?Sized>(
        &mut self,
        alloc: &mut BlockAllocator<'_, IO>,
        name: &str,
        size: u64,
    ) -> FsDirectoryResult {
        let (idx, rec) = self.lookup(name)?;
        crate::ensure!(rec.is_file(), FsDirectoryError::IsADirectory);

        let rec = &mut self.records[idx];
        rec.size = size;
        rec.touch_modified();
        self.store(alloc)
    }
}
