// SPDX-License-Identifier: MIT
#[cfg(all(not(feature = "std"), feature = "alloc"))]
use alloc::vec::Vec;

use linkio::BlockDevice;

use crate::core::{
    errors::*,
    log::{log_info, log_verbose},
    utils::path_utils::split_parent,
};
use crate::fs::{
    allocator::BlockAllocator,
    checker::*,
    constant::*,
    file::{Fd, FileTable},
    flags::{OpenFlags, SeekFrom},
    formatter::{FsFormatter, LinkFormatter},
    meta::*,
    resolver::{self, WorkingDir},
    table::AllocationTable,
    types::{DirItem, FileStat, VolumeDescriptor},
};

/// Session settings chosen at mount time.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct VolumeOptions {
    /// Size of the descriptor pool
    pub max_open_files: usize,
}

impl Default for VolumeOptions {
    fn default() -> Self {
        Self {
            max_open_files: LINK_MAX_OPEN_FILES,
        }
    }
}

/// A mounted volume.
///
/// Owns everything a session mutates: geometry, descriptor, the table cache,
/// the working directory and the descriptor pool. The device stays borrowed
/// until [`Volume::unmount`] (or drop).
pub struct Volume<'a, IO: BlockDevice + ?Sized> {
    io: &'a mut IO,
    meta: VolumeMeta,
    vcb: VolumeDescriptor,
    table: AllocationTable,
    cwd: WorkingDir,
    files: FileTable,
}

impl<'a, IO: BlockDevice + ?Sized> Volume<'a, IO> {
    pub fn mount(io: &'a mut IO) -> FsMountResult<Self> {
        Self::mount_with(io, VolumeOptions::default())
    }

    pub fn mount_with(io: &'a mut IO, options: VolumeOptions) -> FsMountResult<Self> {
        let vcb = VolumeDescriptor::read_from(io)?;
        crate::ensure!(vcb.has_signature(), FsMountError::NotFormatted);
        crate::ensure!(vcb.checksum_ok(), FsMountError::BadChecksum);

        let meta = vcb.meta()?;
        crate::ensure!(
            io.sector_size() == meta.sector_size,
            FsMountError::Invalid("device sector size differs from the volume's")
        );
        crate::ensure!(
            meta.num_blocks as u64 * meta.sectors_per_block as u64 <= io.sector_count(),
            FsMountError::Invalid("device smaller than the volume")
        );
        let root = vcb.root_dir_block;
        crate::ensure!(
            meta.is_valid_unit(root),
            FsMountError::Invalid("root directory outside the data area")
        );
        crate::ensure!(
            options.max_open_files > 0,
            FsMountError::Invalid("descriptor pool cannot be empty")
        );

        log_info!(
            "mounted {} blocks of {} bytes, {} free",
            meta.num_blocks,
            meta.block_size,
            { vcb.free_block_count }
        );
        Ok(Self {
            io,
            table: AllocationTable::new(&meta),
            meta,
            vcb,
            cwd: WorkingDir::root(root),
            files: FileTable::new(options.max_open_files),
        })
    }

    /// Mounts the volume, formatting the device with `meta` first when no
    /// signature is found.
    pub fn open_or_format(io: &'a mut IO, meta: &VolumeMeta) -> FsMountResult<Self> {
        let vcb = VolumeDescriptor::read_from(&mut *io)?;
        if !vcb.has_signature() {
            log_info!("no volume signature, formatting");
            LinkFormatter::new(&mut *io, meta).format(false)?;
        }
        Self::mount(io)
    }

    /// Closes every descriptor, persists the descriptor and flushes the device.
    pub fn unmount(mut self) -> FsResult {
        let closed = {
            let (mut alloc, _, files) = self.session();
            files.close_all(&mut alloc)
        };
        self.session().0.persist()?;
        self.io.flush()?;
        closed?;
        log_info!("unmounted, {} blocks free", { self.vcb.free_block_count });
        Ok(())
    }

    /// Splits the session into the allocator and the state beside it.
    fn session(&mut self) -> (BlockAllocator<'_, IO>, &mut WorkingDir, &mut FileTable) {
        (
            BlockAllocator::new(&mut *self.io, &self.meta, &mut self.vcb, &mut self.table),
            &mut self.cwd,
            &mut self.files,
        )
    }

    // === Files ===

    pub fn open(&mut self, path: &str, flags: OpenFlags) -> FsFileResult<Fd> {
        let (mut alloc, cwd, files) = self.session();
        files.open(&mut alloc, cwd, path, flags)
    }

    pub fn read(&mut self, fd: Fd, buf: &mut [u8]) -> FsFileResult<usize> {
        let (mut alloc, _, files) = self.session();
        files.read(&mut alloc, fd, buf)
    }

    pub fn write(&mut self, fd: Fd, buf: &[u8]) -> FsFileResult<usize> {
        let (mut alloc, _, files) = self.session();
        files.write(&mut alloc, fd, buf)
    }

    pub fn seek(&mut self, fd: Fd, pos: SeekFrom) -> FsFileResult<u64> {
        self.files.seek(fd, pos)
    }

    pub fn tell(&self, fd: Fd) -> FsFileResult<u64> {
        self.files.tell(fd)
    }

    /// Size of an open file, growth since open included.
    pub fn file_size(&self, fd: Fd) -> FsFileResult<u64> {
        self.files.size(fd)
    }

    pub fn close(&mut self, fd: Fd) -> FsFileResult {
        let (mut alloc, _, files) = self.session();
        files.close(&mut alloc, fd)
    }

    #[inline]
    pub fn open_files(&self) -> usize {
        self.files.open_count()
    }

    // === Namespace ===

    pub fn mkdir(&mut self, path: &str) -> FsDirectoryResult {
        let (mut alloc, cwd, _) = self.session();
        let (parent, leaf) = split_parent(path);
        let mut dir = resolver::open_parent(&mut alloc, cwd, parent)?;
        dir.make_directory(&mut alloc, leaf)?;
        Ok(())
    }

    /// Removes an empty directory. The working directory cannot be removed.
    pub fn rmdir(&mut self, path: &str) -> FsDirectoryResult {
        let (mut alloc, cwd, _) = self.session();
        let (parent, leaf) = split_parent(path);
        crate::ensure!(!leaf.is_empty(), FsDirectoryError::InvalidName);

        let mut dir = resolver::open_parent(&mut alloc, cwd, parent)?;
        let (idx, rec) = dir.lookup(leaf)?;
        crate::ensure!(idx >= LINK_FIRST_USER_RECORD, FsDirectoryError::InvalidName);
        crate::ensure!(rec.start() != cwd.block(), FsDirectoryError::Busy);
        dir.remove_directory(&mut alloc, leaf)
    }

    /// Deletes a file that is not currently open.
    pub fn delete(&mut self, path: &str) -> FsDirectoryResult {
        let (mut alloc, cwd, files) = self.session();
        let (parent, leaf) = split_parent(path);
        let mut dir = resolver::open_parent(&mut alloc, cwd, parent)?;
        crate::ensure!(!files.is_open(dir.start(), leaf), FsDirectoryError::Busy);
        dir.remove_entry(&mut alloc, leaf)
    }

    /// Renames an entry inside its directory. `new_name` is a plain name, not a path.
    pub fn rename(&mut self, path: &str, new_name: &str) -> FsDirectoryResult {
        let (mut alloc, cwd, files) = self.session();
        let (parent, leaf) = split_parent(path);
        let mut dir = resolver::open_parent(&mut alloc, cwd, parent)?;
        crate::ensure!(!files.is_open(dir.start(), leaf), FsDirectoryError::Busy);

        let was_dir = dir.find(leaf).is_some_and(|i| dir.records()[i].is_dir());
        dir.rename(&mut alloc, leaf, new_name)?;
        if was_dir {
            cwd.refresh(&mut alloc)?;
        }
        log_verbose!("renamed {path} to {new_name}");
        Ok(())
    }

    pub fn set_cwd(&mut self, path: &str) -> FsDirectoryResult {
        let (mut alloc, cwd, _) = self.session();
        cwd.set(&mut alloc, path)
    }

    #[inline]
    pub fn cwd(&self) -> &str {
        self.cwd.as_str()
    }

    pub fn stat(&mut self, path: &str) -> FsDirectoryResult<FileStat> {
        let (mut alloc, cwd, _) = self.session();
        resolver::stat(&mut alloc, cwd, path)
    }

    pub fn is_file(&mut self, path: &str) -> bool {
        let (mut alloc, cwd, _) = self.session();
        resolver::is_file(&mut alloc, cwd, path)
    }

    pub fn is_dir(&mut self, path: &str) -> bool {
        let (mut alloc, cwd, _) = self.session();
        resolver::is_dir(&mut alloc, cwd, path)
    }

    pub fn read_dir(&mut self, path: &str) -> FsDirectoryResult<Vec<DirItem>> {
        let (mut alloc, cwd, _) = self.session();
        resolver::read_dir(&mut alloc, cwd, path)
    }

    // === Volume ===

    pub fn check(&mut self) -> FsCheckerResult<VerifyReport> {
        self.check_with(&LinkCheckOptions::default())
    }

    pub fn check_with(&mut self, opt: &LinkCheckOptions) -> FsCheckerResult<VerifyReport> {
        LinkChecker::new(&mut *self.io, &self.meta).check_with(opt)
    }

    #[inline]
    pub fn free_blocks(&self) -> u32 {
        self.vcb.free_block_count
    }

    #[inline]
    pub fn descriptor(&self) -> &VolumeDescriptor {
        &self.vcb
    }

    #[inline]
    pub fn meta(&self) -> &VolumeMeta {
        &self.meta
    }
}
