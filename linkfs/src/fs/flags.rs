// SPDX-License-Identifier: MIT

use bitflags::bitflags;

bitflags! {
    /// Flags accepted by `open`, with the octal values of the usual POSIX API.
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
    pub struct OpenFlags: u32 {
        const WRITE_ONLY = 0o1;
        const READ_WRITE = 0o2;
        const CREATE     = 0o100;
    }
}

impl OpenFlags {
    /// No bits set: read access only.
    pub const READ_ONLY: Self = Self::empty();

    /// Builds flags from raw bits, ignoring unknown ones.
    #[inline]
    pub fn from_raw(bits: u32) -> Self {
        Self::from_bits_truncate(bits)
    }

    #[inline]
    pub fn can_read(self) -> bool {
        !self.contains(Self::WRITE_ONLY) || self.contains(Self::READ_WRITE)
    }

    #[inline]
    pub fn can_write(self) -> bool {
        self.intersects(Self::WRITE_ONLY | Self::READ_WRITE)
    }
}

/// Cursor origin for `seek`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SeekFrom {
    Start(u64),
    Current(i64),
    End(i64),
}

#[cfg(all(test, feature = "std"))]
mod tests {
    use super::*;

    #[test]
    fn test_access_modes() {
        assert!(OpenFlags::READ_ONLY.can_read());
        assert!(!OpenFlags::READ_ONLY.can_write());
        assert!(!OpenFlags::WRITE_ONLY.can_read());
        assert!(OpenFlags::WRITE_ONLY.can_write());
        let rw = OpenFlags::READ_WRITE | OpenFlags::CREATE;
        assert!(rw.can_read() && rw.can_write());
    }

    #[test]
    fn test_unknown_bits_ignored() {
        let f = OpenFlags::from_raw(0o102 | 0o4000);
        assert_eq!(f, OpenFlags::READ_WRITE | OpenFlags::CREATE);
        assert_eq!(OpenFlags::from_raw(0), OpenFlags::READ_ONLY);
    }
}
