// SPDX-License-Identifier: MIT
#[cfg(all(not(feature = "std"), feature = "alloc"))]
use alloc::{
    boxed::Box,
    string::{String, ToString},
    vec,
    vec::Vec,
};

use linkio::BlockDevice;

use crate::core::{errors::*, log::log_verbose, utils::path_utils::split_parent};
use crate::fs::{
    allocator::*,
    directory::Directory,
    flags::{OpenFlags, SeekFrom},
    meta::*,
    resolver::{WorkingDir, open_parent},
};

/// Handle to an open file: the index of its slot in the descriptor table.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Fd(pub usize);

/// How a transfer at `pos` of `count` bytes falls on block boundaries.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TransferSplit {
    /// Bytes from `pos` up to the next boundary (0 when aligned).
    pub head: usize,
    /// Whole blocks after the head.
    pub blocks: usize,
    /// Trailing bytes of a last, partial block.
    pub tail: usize,
}

pub fn split_transfer(pos: u64, count: usize, block_size: usize) -> TransferSplit {
    let off = (pos % block_size as u64) as usize;
    let head = if off == 0 {
        0
    } else {
        (block_size - off).min(count)
    };
    let rest = count - head;
    TransferSplit {
        head,
        blocks: rest / block_size,
        tail: rest % block_size,
    }
}

/// State of one open file.
#[derive(Debug)]
struct OpenFile {
    dir_start: u32,
    name: String,
    flags: OpenFlags,
    size: u64,
    blocks: FileBlockMap,
    cursor: u64,
    cache: Vec<u8>,
    cached: Option<u32>,
}

impl OpenFile {
    /// Chain position of the block holding byte `pos`.
    #[inline]
    fn index_of(&self, pos: u64) -> usize {
        (pos / self.cache.len() as u64) as usize
    }

    fn advance(&mut self, n: usize) {
        self.cursor += n as u64;
        if self.cursor > self.size {
            self.size = self.cursor;
        }
    }

    /// Makes block `index` of the file resident in the cache.
    fn fetch<IO: BlockDevice + ?Sized>(
        &mut self,
        alloc: &mut BlockAllocator<'_, IO>,
        index: usize,
    ) -> FsFileResult<u32> {
        let block = self
            .blocks
            .get(index)
            .ok_or(FsFileError::Corrupted("block map shorter than file size"))?;

        if self.cached != Some(block) {
            self.cached = None;
            let lba = alloc.meta().unit_lba(block);
            alloc.io().read_sectors(lba, &mut self.cache)?;
            self.cached = Some(block);
        }
        Ok(block)
    }

    /// Block `index` of the file, growing the chain one block at a time to reach it.
    fn reach<IO: BlockDevice + ?Sized>(
        &mut self,
        alloc: &mut BlockAllocator<'_, IO>,
        index: usize,
    ) -> FsFileResult<u32> {
        while self.blocks.len() <= index {
            alloc.extend(&mut self.blocks)?;
        }
        self.blocks
            .get(index)
            .ok_or(FsFileError::Corrupted("block map shorter than file size"))
    }

    /// Writes the cache to `block`. The cache is untagged if the write fails.
    fn write_cache<IO: BlockDevice + ?Sized>(
        &mut self,
        alloc: &mut BlockAllocator<'_, IO>,
        block: u32,
    ) -> FsFileResult {
        self.cached = None;
        let lba = alloc.meta().unit_lba(block);
        alloc.io().write_sectors(lba, &self.cache)?;
        self.cached = Some(block);
        Ok(())
    }

    fn read<IO: BlockDevice + ?Sized>(
        &mut self,
        alloc: &mut BlockAllocator<'_, IO>,
        buf: &mut [u8],
    ) -> FsFileResult<usize> {
        if self.cursor >= self.size {
            return Ok(0);
        }
        crate::ensure!(
            self.blocks.len() as u64 >= alloc.meta().blocks_for(self.size),
            FsFileError::Corrupted("block map shorter than file size")
        );

        let bs = self.cache.len();
        let count = buf.len().min((self.size - self.cursor) as usize);
        let split = split_transfer(self.cursor, count, bs);
        let mut done = 0;

        if split.head > 0 {
            let off = (self.cursor % bs as u64) as usize;
            self.fetch(alloc, self.index_of(self.cursor))?;
            buf[..split.head].copy_from_slice(&self.cache[off..off + split.head]);
            done += split.head;
        }

        for _ in 0..split.blocks {
            self.fetch(alloc, self.index_of(self.cursor + done as u64))?;
            buf[done..done + bs].copy_from_slice(&self.cache);
            done += bs;
        }

        if split.tail > 0 {
            self.fetch(alloc, self.index_of(self.cursor + done as u64))?;
            buf[done..done + split.tail].copy_from_slice(&self.cache[..split.tail]);
            done += split.tail;
        }

        self.cursor = (self.cursor + done as u64).min(self.size);
        Ok(done)
    }

    /// Writes `buf` at the cursor.
    ///
    /// The head block is read, patched and written back. Whole blocks are
    /// written without reading them first. The tail block is zero-filled
    /// before the partial write, so bytes after the written range in that
    /// block read back as zero.
    ///
    /// Size and cursor follow each part as it lands, so bytes written before
    /// an error stay accounted.
    fn write<IO: BlockDevice + ?Sized>(
        &mut self,
        alloc: &mut BlockAllocator<'_, IO>,
        buf: &[u8],
    ) -> FsFileResult<usize> {
        let bs = self.cache.len();
        let split = split_transfer(self.cursor, buf.len(), bs);
        let mut done = 0;

        if split.head > 0 {
            let index = self.index_of(self.cursor);
            let off = (self.cursor % bs as u64) as usize;
            self.reach(alloc, index)?;
            let block = self.fetch(alloc, index)?;
            self.cache[off..off + split.head].copy_from_slice(&buf[..split.head]);
            self.write_cache(alloc, block)?;
            self.advance(split.head);
            done += split.head;
        }

        for _ in 0..split.blocks {
            let block = self.reach(alloc, self.index_of(self.cursor))?;
            self.cache.copy_from_slice(&buf[done..done + bs]);
            self.write_cache(alloc, block)?;
            self.advance(bs);
            done += bs;
        }

        if split.tail > 0 {
            let block = self.reach(alloc, self.index_of(self.cursor))?;
            self.cache.fill(0);
            self.cache[..split.tail].copy_from_slice(&buf[done..]);
            self.write_cache(alloc, block)?;
            self.advance(split.tail);
            done += split.tail;
        }

        Ok(done)
    }

    /// Moves the cursor, clamped to `[0, size]`.
    fn seek(&mut self, pos: SeekFrom) -> u64 {
        let shift = |base: u64, delta: i64| {
            if delta < 0 {
                base.saturating_sub(delta.unsigned_abs())
            } else {
                base.saturating_add(delta as u64)
            }
        };
        let target = match pos {
            SeekFrom::Start(n) => n,
            SeekFrom::Current(d) => shift(self.cursor, d),
            SeekFrom::End(d) => shift(self.size, d),
        };
        self.cursor = target.min(self.size);
        self.cursor
    }
}

#[derive(Debug)]
enum Slot {
    Free,
    /// Reserved by an `open` still resolving its path.
    Opening,
    Open(Box<OpenFile>),
}

/// Fixed pool of open-file slots, handed out first-fit.
#[derive(Debug)]
pub struct FileTable {
    slots: Vec<Slot>,
}

impl FileTable {
    pub fn new(capacity: usize) -> Self {
        let mut slots = Vec::with_capacity(capacity);
        slots.resize_with(capacity, || Slot::Free);
        Self { slots }
    }

    #[inline]
    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    pub fn open_count(&self) -> usize {
        self.slots
            .iter()
            .filter(|s| matches!(s, Slot::Open(_)))
            .count()
    }

    /// Whether the file `name` of the directory starting at `dir_start` is open.
    pub fn is_open(&self, dir_start: u32, name: &str) -> bool {
        self.slots.iter().any(|s| match s {
            Slot::Open(f) => f.dir_start == dir_start && f.name == name,
            _ => false,
        })
    }

    fn file(&self, fd: Fd) -> FsFileResult<&OpenFile> {
        match self.slots.get(fd.0) {
            Some(Slot::Open(f)) => Ok(f.as_ref()),
            _ => Err(FsFileError::InvalidDescriptor),
        }
    }

    fn file_mut(&mut self, fd: Fd) -> FsFileResult<&mut OpenFile> {
        match self.slots.get_mut(fd.0) {
            Some(Slot::Open(f)) => Ok(f.as_mut()),
            _ => Err(FsFileError::InvalidDescriptor),
        }
    }

    /// Opens `path`, creating it when `CREATE` is set and it does not exist.
    ///
    /// A slot is reserved before the path is resolved; a full table fails
    /// without touching the volume. A file has at most one writable
    /// descriptor at a time (`Busy` otherwise).
    pub fn open<IO: BlockDevice + ?Sized>(
        &mut self,
        alloc: &mut BlockAllocator<'_, IO>,
        cwd: &WorkingDir,
        path: &str,
        flags: OpenFlags,
    ) -> FsFileResult<Fd> {
        let slot = self
            .slots
            .iter()
            .position(|s| matches!(s, Slot::Free))
            .ok_or(FsFileError::TooManyOpenFiles)?;
        self.slots[slot] = Slot::Opening;

        let built = Self::build(alloc, cwd, path, flags).and_then(|file| {
            // A second writer would extend the chain from a stale tail.
            let clash = file.flags.can_write()
                && self.slots.iter().any(|s| match s {
                    Slot::Open(f) => {
                        f.flags.can_write() && f.dir_start == file.dir_start && f.name == file.name
                    }
                    _ => false,
                });
            crate::ensure!(!clash, FsDirectoryError::Busy);
            Ok(file)
        });

        match built {
            Ok(file) => {
                log_verbose!("open {path} -> fd {slot}");
                self.slots[slot] = Slot::Open(Box::new(file));
                Ok(Fd(slot))
            }
            Err(e) => {
                self.slots[slot] = Slot::Free;
                Err(e)
            }
        }
    }

    fn build<IO: BlockDevice + ?Sized>(
        alloc: &mut BlockAllocator<'_, IO>,
        cwd: &WorkingDir,
        path: &str,
        flags: OpenFlags,
    ) -> FsFileResult<OpenFile> {
        let (parent, leaf) = split_parent(path);
        let mut dir = open_parent(alloc, cwd, parent)?;

        let idx = match dir.find(leaf) {
            Some(idx) => idx,
            None if flags.contains(OpenFlags::CREATE) => dir.create_entry(alloc, leaf)?,
            None => crate::bail!(FsDirectoryError::NotFound),
        };
        let rec = dir.records()[idx];
        crate::ensure!(rec.is_file(), FsDirectoryError::IsADirectory);

        Ok(OpenFile {
            dir_start: dir.start(),
            name: leaf.to_string(),
            flags,
            size: rec.byte_size(),
            blocks: alloc.read_chain(rec.start())?,
            cursor: 0,
            cache: vec![0u8; alloc.meta().block_size],
            cached: None,
        })
    }

    pub fn read<IO: BlockDevice + ?Sized>(
        &mut self,
        alloc: &mut BlockAllocator<'_, IO>,
        fd: Fd,
        buf: &mut [u8],
    ) -> FsFileResult<usize> {
        let file = self.file_mut(fd)?;
        crate::ensure!(file.flags.can_read(), FsFileError::AccessDenied);
        file.read(alloc, buf)
    }

    pub fn write<IO: BlockDevice + ?Sized>(
        &mut self,
        alloc: &mut BlockAllocator<'_, IO>,
        fd: Fd,
        buf: &[u8],
    ) -> FsFileResult<usize> {
        let file = self.file_mut(fd)?;
        crate::ensure!(file.flags.can_write(), FsFileError::AccessDenied);
        file.write(alloc, buf)
    }

    /// Repositions the cursor and returns it.
    ///
    /// Targets outside `[0, size]` are clamped rather than rejected, and
    /// seeking never grows the file.
    pub fn seek(&mut self, fd: Fd, pos: SeekFrom) -> FsFileResult<u64> {
        Ok(self.file_mut(fd)?.seek(pos))
    }

    pub fn tell(&self, fd: Fd) -> FsFileResult<u64> {
        Ok(self.file(fd)?.cursor)
    }

    /// Current size of an open file, including unflushed growth.
    pub fn size(&self, fd: Fd) -> FsFileResult<u64> {
        Ok(self.file(fd)?.size)
    }

    /// Frees the slot, then records the final size when the file was writable.
    pub fn close<IO: BlockDevice + ?Sized>(
        &mut self,
        alloc: &mut BlockAllocator<'_, IO>,
        fd: Fd,
    ) -> FsFileResult {
        self.file(fd)?;
        let Slot::Open(file) = core::mem::replace(&mut self.slots[fd.0], Slot::Free) else {
            crate::bail!(FsFileError::InvalidDescriptor);
        };

        if file.flags.can_write() {
            let mut dir = Directory::load(alloc, file.dir_start)?;
            dir.set_size(alloc, &file.name, file.size)?;
        }
        log_verbose!("close fd {} ({} bytes)", fd.0, file.size);
        Ok(())
    }

    /// Closes every open descriptor. Returns the first failure, after trying all.
    pub fn close_all<IO: BlockDevice + ?Sized>(
        &mut self,
        alloc: &mut BlockAllocator<'_, IO>,
    ) -> FsFileResult {
        let mut first = Ok(());
        for idx in 0..self.slots.len() {
            if matches!(self.slots[idx], Slot::Open(_)) {
                let res = self.close(alloc, Fd(idx));
                if first.is_ok() {
                    first = res;
                }
            }
        }
        first
    }
}
