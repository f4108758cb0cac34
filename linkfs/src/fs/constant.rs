// SPDX-License-Identifier: MIT

// === Volume Descriptor ===

pub const LINK_SIGNATURE: [u8; 8] = *b"LINKFS\0\x01";
pub const LINK_DESCRIPTOR_BLOCK: u32 = 0;

// === Geometry ===

pub const LINK_SECTOR_SIZE: usize = 512;
pub const LINK_BLOCK_SIZE: usize = 512;
/// Smallest sector that still holds the volume descriptor.
pub const LINK_MIN_SECTOR_SIZE: usize = 64;
/// Largest sector accepted (bounded by the device scratch buffer).
pub const LINK_MAX_SECTOR_SIZE: usize = linkio::BLOCK_BUF_SIZE;
/// Fewest blocks a volume can have: descriptor, table, root directory and some data.
pub const LINK_MIN_BLOCKS: u32 = 16;

// === Allocation Table ===

pub const LINK_ENTRY_SIZE: usize = 4;
pub const LINK_FREE: u32 = 0x0000_0000;
pub const LINK_EOC: u32 = 0xFFFF_FFFF;

// === Directories ===

pub const LINK_DIR_ENTRIES: usize = 64;
pub const LINK_RECORD_SIZE: usize = 64;
pub const LINK_NAME_LEN: usize = 20;
pub const LINK_SELF_NAME: &str = ".";
pub const LINK_PARENT_NAME: &str = "..";
/// Index of the first record that is not "." or "..".
pub const LINK_FIRST_USER_RECORD: usize = 2;

// === Open Files ===

pub const LINK_MAX_OPEN_FILES: usize = 20;
/// Unit used by `stat` to report allocated size.
pub const LINK_STAT_BLOCK_SIZE: u64 = 512;
