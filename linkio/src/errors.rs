// SPDX-License-Identifier: MIT

use core::fmt;

/// Result type for block device operations.
pub type BlockDevResult<T = ()> = core::result::Result<T, BlockDevError>;

/// Error type for block device operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockDevError {
    /// Transfer reaches past the last sector.
    OutOfBounds,
    /// Buffer length is not a whole number of sectors.
    Misaligned,
    Unsupported,
    Other(&'static str),
}

impl BlockDevError {
    pub fn msg(&self) -> &'static str {
        match self {
            BlockDevError::OutOfBounds => "Out of bounds",
            BlockDevError::Misaligned => "Buffer is not sector aligned",
            BlockDevError::Unsupported => "Unsupported operation",
            BlockDevError::Other(msg) => msg,
        }
    }
}

impl From<&'static str> for BlockDevError {
    #[inline]
    fn from(msg: &'static str) -> Self {
        BlockDevError::Other(msg)
    }
}

impl fmt::Display for BlockDevError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.msg())?;
        Ok(())
    }
}
