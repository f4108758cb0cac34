// SPDX-License-Identifier: MIT
#[cfg(all(not(feature = "std"), feature = "alloc"))]
use alloc::{
    string::{String, ToString},
    vec::Vec,
};

use linkio::BlockDevice;

use crate::core::{errors::*, utils::path_utils::*, utils::time_utils::from_timestamp};
use crate::fs::{
    allocator::BlockAllocator,
    constant::*,
    directory::Directory,
    types::{DirItem, FileStat, RecordKind},
};

/// Working directory of a session.
///
/// Holds the normalized absolute path (`/`, `/a/b`) and the start block of the
/// directory it names.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkingDir {
    path: String,
    block: u32,
}

impl WorkingDir {
    /// Working directory at the root, whose records start at `root`.
    pub fn root(root: u32) -> Self {
        Self {
            path: String::from("/"),
            block: root,
        }
    }

    #[inline]
    pub fn as_str(&self) -> &str {
        &self.path
    }

    /// Start block of the working directory.
    #[inline]
    pub fn block(&self) -> u32 {
        self.block
    }

    /// Changes directory, one segment at a time.
    ///
    /// Nothing is committed until the whole path resolved, so a failure leaves
    /// the previous working directory in place.
    pub fn set<IO: BlockDevice + ?Sized>(
        &mut self,
        alloc: &mut BlockAllocator<'_, IO>,
        path: &str,
    ) -> FsDirectoryResult {
        let (mut abs, start) = if path.is_empty() || is_absolute(path) {
            (String::from("/"), alloc.descriptor().root_dir_block)
        } else {
            (self.path.clone(), self.block)
        };

        let mut dir = Directory::load(alloc, start)?;
        for seg in split_path(path) {
            dir = descend(alloc, &dir, seg)?;
            abs = match seg {
                LINK_SELF_NAME => abs,
                LINK_PARENT_NAME => parent_path(&abs),
                _ => join_paths(&abs, seg),
            };
        }

        self.path = abs;
        self.block = dir.start();
        Ok(())
    }

    /// Rebuilds the path string from the directory block, climbing ".." records.
    /// Needed after a directory on the path was renamed.
    pub fn refresh<IO: BlockDevice + ?Sized>(
        &mut self,
        alloc: &mut BlockAllocator<'_, IO>,
    ) -> FsDirectoryResult {
        let root = alloc.descriptor().root_dir_block;
        let mut names = Vec::new();
        let mut block = self.block;

        while block != root {
            crate::ensure!(
                names.len() < alloc.meta().data_blocks() as usize,
                FsDirectoryError::InvalidPath("working directory is detached from the root")
            );
            let dir = Directory::load(alloc, block)?;
            let parent = dir.records()[1].start();
            let up = Directory::load(alloc, parent)?;
            let (_, rec) = up
                .entries()
                .find(|(_, r)| r.is_dir() && r.start() == block)
                .ok_or(FsDirectoryError::NotFound)?;
            names.push(rec.name().to_string());
            block = parent;
        }

        let mut path = String::from("/");
        for name in names.iter().rev() {
            path = join_paths(&path, name);
        }
        self.path = path;
        Ok(())
    }
}

fn descend<IO: BlockDevice + ?Sized>(
    alloc: &mut BlockAllocator<'_, IO>,
    dir: &Directory,
    name: &str,
) -> FsDirectoryResult<Directory> {
    let (_, rec) = dir.lookup(name)?;
    crate::ensure!(rec.is_dir(), FsDirectoryError::NotADirectory);
    Directory::load(alloc, rec.start())
}

/// Opens the directory named by `path`. Empty and `/` are the root.
pub fn open_dir<IO: BlockDevice + ?Sized>(
    alloc: &mut BlockAllocator<'_, IO>,
    cwd: &WorkingDir,
    path: &str,
) -> FsDirectoryResult<Directory> {
    let start = if path.is_empty() || is_absolute(path) {
        alloc.descriptor().root_dir_block
    } else {
        cwd.block()
    };

    let mut dir = Directory::load(alloc, start)?;
    for seg in split_path(path) {
        dir = descend(alloc, &dir, seg)?;
    }
    Ok(dir)
}

/// Opens the parent half returned by [`split_parent`]; empty means the working directory.
pub fn open_parent<IO: BlockDevice + ?Sized>(
    alloc: &mut BlockAllocator<'_, IO>,
    cwd: &WorkingDir,
    parent: &str,
) -> FsDirectoryResult<Directory> {
    if parent.is_empty() {
        Directory::load(alloc, cwd.block())
    } else {
        open_dir(alloc, cwd, parent)
    }
}

/// Directory holding the record for `path`, and the record's slot.
///
/// A path naming a directory itself (`/`, `docs/`) resolves to its "." record.
pub fn lookup<IO: BlockDevice + ?Sized>(
    alloc: &mut BlockAllocator<'_, IO>,
    cwd: &WorkingDir,
    path: &str,
) -> FsDirectoryResult<(Directory, usize)> {
    let (parent, leaf) = split_parent(path);
    if leaf.is_empty() {
        let dir = open_dir(alloc, cwd, path)?;
        return Ok((dir, 0));
    }

    let dir = open_parent(alloc, cwd, parent)?;
    let idx = dir.find(leaf).ok_or(FsDirectoryError::NotFound)?;
    Ok((dir, idx))
}

pub fn stat<IO: BlockDevice + ?Sized>(
    alloc: &mut BlockAllocator<'_, IO>,
    cwd: &WorkingDir,
    path: &str,
) -> FsDirectoryResult<FileStat> {
    let (dir, idx) = lookup(alloc, cwd, path)?;
    let rec = dir.records()[idx];
    let kind = rec
        .record_kind()
        .ok_or(FsDirectoryError::Other("unknown record kind"))?;

    Ok(FileStat {
        kind,
        size: rec.size,
        block_size: alloc.meta().block_size as u64,
        blocks: rec.size.div_ceil(LINK_STAT_BLOCK_SIZE),
        start_block: rec.start(),
        accessed: from_timestamp(rec.accessed),
        modified: from_timestamp(rec.modified),
        created: from_timestamp(rec.created),
    })
}

/// Whether `path` names a file. Unresolvable paths are not files.
pub fn is_file<IO: BlockDevice + ?Sized>(
    alloc: &mut BlockAllocator<'_, IO>,
    cwd: &WorkingDir,
    path: &str,
) -> bool {
    lookup(alloc, cwd, path).is_ok_and(|(dir, idx)| dir.records()[idx].is_file())
}

pub fn is_dir<IO: BlockDevice + ?Sized>(
    alloc: &mut BlockAllocator<'_, IO>,
    cwd: &WorkingDir,
    path: &str,
) -> bool {
    lookup(alloc, cwd, path).is_ok_and(|(dir, idx)| dir.records()[idx].is_dir())
}

/// Lists the used records of a directory, "." and ".." excluded, in slot order.
pub fn read_dir<IO: BlockDevice + ?Sized>(
    alloc: &mut BlockAllocator<'_, IO>,
    cwd: &WorkingDir,
    path: &str,
) -> FsDirectoryResult<Vec<DirItem>> {
    let dir = open_dir(alloc, cwd, path)?;
    let spb = alloc.meta().sectors_per_block as u64;

    Ok(dir
        .entries()
        .map(|(_, rec)| DirItem {
            name: rec.name().to_string(),
            kind: rec.record_kind().unwrap_or(RecordKind::Unused),
            start_lba: rec.start_block * spb,
            size: rec.size,
        })
        .collect())
}

#[cfg(all(test, feature = "std"))]
mod tests {
    use super::*;
    use crate::fs::{meta::*, table::AllocationTable, types::VolumeDescriptor};
    use linkio::prelude::*;

    const BLOCKS: u32 = 512;

    struct Fixture {
        buf: Vec<u8>,
        meta: VolumeMeta,
        vcb: VolumeDescriptor,
        table: AllocationTable,
    }

    fn fixture() -> Fixture {
        let meta = VolumeMeta::new_custom(BLOCKS, 512, 512).unwrap();
        Fixture {
            buf: vec![0u8; BLOCKS as usize * 512],
            vcb: VolumeDescriptor::from_meta(&meta),
            table: AllocationTable::new(&meta),
            meta,
        }
    }

    // Builds /docs/notes and /docs/a.txt, returns the root working directory.
    fn populate<IO: BlockDevice>(alloc: &mut BlockAllocator<'_, IO>) -> WorkingDir {
        let mut root = Directory::create_root(alloc).unwrap();
        alloc.descriptor_mut().root_dir_block = root.start();
        root.make_directory(alloc, "docs").unwrap();

        let (_, rec) = root.lookup("docs").unwrap();
        let mut docs = Directory::load(alloc, rec.start()).unwrap();
        docs.make_directory(alloc, "notes").unwrap();
        docs.create_entry(alloc, "a.txt").unwrap();
        docs.set_size(alloc, "a.txt", 1500).unwrap();

        WorkingDir::root(root.start())
    }

    #[test]
    fn test_open_dir_paths() {
        let mut fx = fixture();
        let mut io = MemDevice::new(&mut fx.buf);
        let mut alloc = BlockAllocator::new(&mut io, &fx.meta, &mut fx.vcb, &mut fx.table);
        let cwd = populate(&mut alloc);
        let root = cwd.block();

        assert_eq!(open_dir(&mut alloc, &cwd, "").unwrap().start(), root);
        assert_eq!(open_dir(&mut alloc, &cwd, "/").unwrap().start(), root);

        let notes = open_dir(&mut alloc, &cwd, "/docs/notes").unwrap();
        let back = open_dir(&mut alloc, &cwd, "docs/notes/../..").unwrap();
        assert_eq!(back.start(), root);
        assert_ne!(notes.start(), root);

        assert_eq!(
            open_dir(&mut alloc, &cwd, "/docs/a.txt").unwrap_err(),
            FsDirectoryError::NotADirectory
        );
        assert_eq!(
            open_dir(&mut alloc, &cwd, "/missing").unwrap_err(),
            FsDirectoryError::NotFound
        );
    }

    #[test]
    fn test_set_cwd_and_restore() {
        let mut fx = fixture();
        let mut io = MemDevice::new(&mut fx.buf);
        let mut alloc = BlockAllocator::new(&mut io, &fx.meta, &mut fx.vcb, &mut fx.table);
        let mut cwd = populate(&mut alloc);
        let root = cwd.block();

        cwd.set(&mut alloc, "..").unwrap();
        assert_eq!(cwd.as_str(), "/");
        assert_eq!(cwd.block(), root);

        cwd.set(&mut alloc, "docs").unwrap();
        cwd.set(&mut alloc, "./notes").unwrap();
        assert_eq!(cwd.as_str(), "/docs/notes");
        let notes = cwd.clone();

        // Fails on the last segment: nothing changes.
        assert_eq!(
            cwd.set(&mut alloc, "../a.txt"),
            Err(FsDirectoryError::NotADirectory)
        );
        assert_eq!(cwd, notes);
        assert_eq!(cwd.set(&mut alloc, "/nope/docs"), Err(FsDirectoryError::NotFound));
        assert_eq!(cwd, notes);

        cwd.set(&mut alloc, "..").unwrap();
        assert_eq!(cwd.as_str(), "/docs");
        cwd.set(&mut alloc, "/").unwrap();
        assert_eq!(cwd.as_str(), "/");
    }

    #[test]
    fn test_relative_to_cwd() {
        let mut fx = fixture();
        let mut io = MemDevice::new(&mut fx.buf);
        let mut alloc = BlockAllocator::new(&mut io, &fx.meta, &mut fx.vcb, &mut fx.table);
        let mut cwd = populate(&mut alloc);

        assert!(!is_file(&mut alloc, &cwd, "a.txt"));
        cwd.set(&mut alloc, "/docs").unwrap();
        assert!(is_file(&mut alloc, &cwd, "a.txt"));
        assert!(is_dir(&mut alloc, &cwd, "notes"));
        assert!(is_dir(&mut alloc, &cwd, "/"));
        assert!(!is_dir(&mut alloc, &cwd, "a.txt"));
        assert!(!is_file(&mut alloc, &cwd, "ghost"));
    }

    #[test]
    fn test_stat_and_listing() {
        let mut fx = fixture();
        let mut io = MemDevice::new(&mut fx.buf);
        let mut alloc = BlockAllocator::new(&mut io, &fx.meta, &mut fx.vcb, &mut fx.table);
        let cwd = populate(&mut alloc);

        let st = stat(&mut alloc, &cwd, "/docs/a.txt").unwrap();
        assert!(st.is_file());
        assert_eq!(st.size, 1500);
        assert_eq!(st.blocks, 3);
        assert_eq!(st.block_size, 512);

        let root = stat(&mut alloc, &cwd, "/").unwrap();
        assert!(root.is_dir());
        assert_eq!(root.start_block, cwd.block());
        assert_eq!(root.size, 4096);

        let items = read_dir(&mut alloc, &cwd, "/docs").unwrap();
        let names: Vec<_> = items.iter().map(|i| i.name.as_str()).collect();
        assert_eq!(names, ["notes", "a.txt"]);
        assert_eq!(items[0].kind, RecordKind::Directory);
        assert_eq!(items[1].size, 1500);
        assert_eq!(items[1].start_lba, st.start_block as u64);

        assert!(read_dir(&mut alloc, &cwd, "/docs/notes").unwrap().is_empty());
    }
}
