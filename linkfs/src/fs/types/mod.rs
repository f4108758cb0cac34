// SPDX-License-Identifier: MIT

pub mod descriptor;
pub mod info;
pub mod record;

pub use descriptor::VolumeDescriptor;
pub use info::{DirItem, FileStat};
pub use record::{DirRecord, RecordKind, validate_name};
