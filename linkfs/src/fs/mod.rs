// SPDX-License-Identifier: MIT

pub mod allocator;
pub mod checker;
pub mod constant;
pub mod directory;
pub mod file;
pub mod flags;
pub mod formatter;
pub mod meta;
pub mod resolver;
pub mod table;
pub mod types;
pub mod volume;

// === Public Interface ===
pub mod traits {
    pub use super::allocator::BlockAllocator;
    pub use super::checker::LinkChecker;
    pub use super::formatter::LinkFormatter;
    pub use super::meta::VolumeMeta;
}

pub mod prelude {
    pub use super::checker::{LinkCheckOptions, Severity, VerifyPhases, VerifyReport};
    pub use super::file::Fd;
    pub use super::flags::{OpenFlags, SeekFrom};
    pub use super::traits::*;
    pub use super::types::{DirItem, FileStat, RecordKind, VolumeDescriptor};
    pub use super::volume::{Volume, VolumeOptions};
    pub use crate::core::errors::*;
    pub use crate::core::log::{LogLevel, set_log_level};
    pub use crate::core::traits::*;
    pub use linkio::prelude::*;
}
