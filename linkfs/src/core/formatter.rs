// SPDX-License-Identifier: MIT

pub use crate::core::errors::{FsFormatterError, FsFormatterResult};

/// Lays down an empty filesystem on a device.
///
/// A quick format only writes metadata. A full format also zeroes the data area.
pub trait FsFormatter {
    #[must_use = "format result must be checked for errors"]
    fn format(&mut self, full_format: bool) -> FsFormatterResult;

    /// Pushes buffered writes to the device.
    #[must_use = "flush result must be checked for errors"]
    fn flush(&mut self) -> FsFormatterResult {
        Ok(())
    }
}
