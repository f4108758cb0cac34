// SPDX-License-Identifier: MIT

use std::io::{Error, ErrorKind, Read, Seek, SeekFrom, Write};

use crate::{BlockDevError, BlockDevResult, BlockDevice};

/// `BlockDevice` over any `Read + Write + Seek` stream (image files, raw disks, cursors).
#[derive(Debug)]
pub struct StdDevice<'a, T: Read + Write + Seek> {
    io: &'a mut T,
    sector_size: usize,
    sector_count: u64,
}

impl<'a, T: Read + Write + Seek> StdDevice<'a, T> {
    #[inline]
    pub fn new(io: &'a mut T, sector_size: usize, sector_count: u64) -> Self {
        debug_assert!(sector_size > 0, "sector size must be non-zero");
        Self {
            io,
            sector_size: sector_size.max(1),
            sector_count,
        }
    }

    #[inline]
    fn seek_to(&mut self, lba: u64) -> BlockDevResult {
        let offset = lba
            .checked_mul(self.sector_size as u64)
            .ok_or(BlockDevError::OutOfBounds)?;
        self.io.seek(SeekFrom::Start(offset))?;
        Ok(())
    }
}

impl<'a> StdDevice<'a, std::fs::File> {
    /// Wraps a file, sizing the device from its current length.
    pub fn from_file(file: &'a mut std::fs::File, sector_size: usize) -> BlockDevResult<Self> {
        let len = file.metadata()?.len();
        let sector_count = len / sector_size.max(1) as u64;
        Ok(Self::new(file, sector_size, sector_count))
    }
}

impl<'a, T: Read + Write + Seek> BlockDevice for StdDevice<'a, T> {
    #[inline]
    fn sector_size(&self) -> usize {
        self.sector_size
    }

    #[inline]
    fn sector_count(&self) -> u64 {
        self.sector_count
    }

    fn read_sectors(&mut self, lba: u64, buf: &mut [u8]) -> BlockDevResult {
        self.check_transfer(lba, buf.len())?;
        self.seek_to(lba)?;
        self.io.read_exact(buf)?;
        Ok(())
    }

    fn write_sectors(&mut self, lba: u64, buf: &[u8]) -> BlockDevResult {
        self.check_transfer(lba, buf.len())?;
        self.seek_to(lba)?;
        self.io.write_all(buf)?;
        Ok(())
    }

    fn flush(&mut self) -> BlockDevResult {
        self.io.flush()?;
        Ok(())
    }
}

impl From<Error> for BlockDevError {
    #[cold]
    fn from(e: Error) -> Self {
        match e.kind() {
            ErrorKind::UnexpectedEof => BlockDevError::OutOfBounds,
            ErrorKind::Unsupported => BlockDevError::Unsupported,
            ErrorKind::PermissionDenied => BlockDevError::Other("permission denied"),
            ErrorKind::WriteZero => BlockDevError::Other("device refused the write"),
            ErrorKind::Interrupted => BlockDevError::Other("transfer interrupted"),
            _ => BlockDevError::Other("host I/O error"),
        }
    }
}
