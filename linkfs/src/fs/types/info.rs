// SPDX-License-Identifier: MIT
#[cfg(all(not(feature = "std"), feature = "alloc"))]
use alloc::string::String;

use time::OffsetDateTime;

use crate::fs::types::record::RecordKind;

/// One line of a directory listing.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DirItem {
    pub name: String,
    pub kind: RecordKind,
    /// Device sector where the entry's first block starts.
    pub start_lba: u64,
    pub size: u64,
}

/// Metadata returned by `stat`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FileStat {
    pub kind: RecordKind,
    pub size: u64,
    /// Filesystem block size, the preferred IO granularity.
    pub block_size: u64,
    /// Allocated size in 512-byte units.
    pub blocks: u64,
    pub start_block: u32,
    pub accessed: OffsetDateTime,
    pub modified: OffsetDateTime,
    pub created: OffsetDateTime,
}

impl FileStat {
    #[inline]
    pub fn is_dir(&self) -> bool {
        self.kind == RecordKind::Directory
    }

    #[inline]
    pub fn is_file(&self) -> bool {
        self.kind == RecordKind::File
    }
}
