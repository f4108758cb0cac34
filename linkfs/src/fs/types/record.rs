// SPDX-License-Identifier: MIT

use zerocopy::{FromBytes, FromZeros, Immutable, IntoBytes, KnownLayout};

use crate::core::{errors::*, utils::time_utils::now_timestamp};
use crate::fs::constant::*;

/// Kind stored in a directory record.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[repr(u32)]
pub enum RecordKind {
    Unused = 0,
    Directory = 1,
    File = 2,
}

impl RecordKind {
    #[inline]
    pub fn from_raw(raw: u32) -> Option<Self> {
        match raw {
            0 => Some(RecordKind::Unused),
            1 => Some(RecordKind::Directory),
            2 => Some(RecordKind::File),
            _ => None,
        }
    }
}

/// One 64-byte slot of a directory.
#[derive(IntoBytes, FromBytes, KnownLayout, Immutable, Copy, Clone, Debug)]
#[repr(C, packed)]
pub struct DirRecord {
    pub name: [u8; LINK_NAME_LEN],
    pub kind: u32,
    pub start_block: u64,
    pub size: u64,
    pub modified: i64,
    pub accessed: i64,
    pub created: i64,
}

impl DirRecord {
    /// An unused, zeroed slot.
    #[inline]
    pub fn unused() -> Self {
        Self::new_zeroed()
    }

    /// A record stamped with the current time. `name` must already be validated.
    pub fn new(name: &str, kind: RecordKind, start_block: u32, size: u64) -> Self {
        let now = now_timestamp();
        let mut rec = Self {
            name: [0u8; LINK_NAME_LEN],
            kind: kind as u32,
            start_block: start_block as u64,
            size,
            modified: now,
            accessed: now,
            created: now,
        };
        rec.set_name(name);
        rec
    }

    /// Name up to the first NUL. Undecodable names read as empty.
    pub fn name(&self) -> &str {
        let len = self
            .name
            .iter()
            .position(|&b| b == 0)
            .unwrap_or(LINK_NAME_LEN);
        core::str::from_utf8(&self.name[..len]).unwrap_or("")
    }

    pub fn set_name(&mut self, name: &str) {
        let bytes = name.as_bytes();
        let n = bytes.len().min(LINK_NAME_LEN);
        self.name = [0u8; LINK_NAME_LEN];
        self.name[..n].copy_from_slice(&bytes[..n]);
    }

    /// Kind, with unknown values reported as `None`.
    #[inline]
    pub fn record_kind(&self) -> Option<RecordKind> {
        RecordKind::from_raw(self.kind)
    }

    #[inline]
    pub fn is_used(&self) -> bool {
        matches!(self.record_kind(), Some(RecordKind::Directory | RecordKind::File))
    }

    #[inline]
    pub fn is_dir(&self) -> bool {
        self.record_kind() == Some(RecordKind::Directory)
    }

    #[inline]
    pub fn is_file(&self) -> bool {
        self.record_kind() == Some(RecordKind::File)
    }

    /// First block of the chain. A stored value past `u32::MAX` reads as
    /// end-of-chain, which `read_chain` rejects as out of range.
    #[inline]
    pub fn start(&self) -> u32 {
        u32::try_from(self.start_block).unwrap_or(LINK_EOC)
    }

    #[inline]
    pub fn byte_size(&self) -> u64 {
        self.size
    }

    #[inline]
    pub fn touch_modified(&mut self) {
        let now = now_timestamp();
        self.modified = now;
        self.accessed = now;
    }
}

/// Checks a leaf name: 1..=20 bytes, no separator or NUL, not `.` or `..`.
pub fn validate_name(name: &str) -> FsDirectoryResult {
    crate::ensure!(
        !name.is_empty() && name.len() <= LINK_NAME_LEN,
        FsDirectoryError::InvalidName
    );
    crate::ensure!(
        name != LINK_SELF_NAME && name != LINK_PARENT_NAME,
        FsDirectoryError::InvalidName
    );
    crate::ensure!(
        !name.bytes().any(|b| b == b'/' || b == 0),
        FsDirectoryError::InvalidName
    );
    Ok(())
}
