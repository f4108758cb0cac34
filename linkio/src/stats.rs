// SPDX-License-Identifier: MIT

use crate::{BlockDevResult, BlockDevice};

/// Simple counters, no_std friendly.
#[derive(Clone, Copy, Default, Debug, PartialEq, Eq)]
pub struct IoStats {
    pub reads: u64,
    pub read_sectors: u64,
    pub writes: u64,
    pub written_sectors: u64,
    pub flushes: u64,

    // Largest single transfer, in sectors
    pub max_read: u64,
    pub max_write: u64,
}

impl IoStats {
    #[inline]
    pub fn reset(&mut self) {
        *self = IoStats::default();
    }

    /// Transfers issued in either direction.
    #[inline]
    pub fn transfers(&self) -> u64 {
        self.reads + self.writes
    }
}

/// Transparent instrumentation wrapper.
pub struct IoCounter<'a, IO: BlockDevice + ?Sized> {
    inner: &'a mut IO,
    pub stats: IoStats,
}

impl<'a, IO: BlockDevice + ?Sized> IoCounter<'a, IO> {
    #[inline]
    pub fn new(inner: &'a mut IO) -> Self {
        Self {
            inner,
            stats: IoStats::default(),
        }
    }

    #[inline]
    pub fn snapshot(&self) -> IoStats {
        self.stats
    }

    #[inline]
    pub fn into_inner(self) -> &'a mut IO {
        self.inner
    }
}

impl<'a, IO: BlockDevice + ?Sized> BlockDevice for IoCounter<'a, IO> {
    #[inline]
    fn sector_size(&self) -> usize {
        self.inner.sector_size()
    }

    #[inline]
    fn sector_count(&self) -> u64 {
        self.inner.sector_count()
    }

    #[inline]
    fn read_sectors(&mut self, lba: u64, buf: &mut [u8]) -> BlockDevResult {
        let n = (buf.len() / self.inner.sector_size().max(1)) as u64;
        self.stats.reads += 1;
        self.stats.read_sectors += n;
        self.stats.max_read = self.stats.max_read.max(n);
        self.inner.read_sectors(lba, buf)
    }

    #[inline]
    fn write_sectors(&mut self, lba: u64, buf: &[u8]) -> BlockDevResult {
        let n = (buf.len() / self.inner.sector_size().max(1)) as u64;
        self.stats.writes += 1;
        self.stats.written_sectors += n;
        self.stats.max_write = self.stats.max_write.max(n);
        self.inner.write_sectors(lba, buf)
    }

    #[inline]
    fn flush(&mut self) -> BlockDevResult {
        self.stats.flushes += 1;
        self.inner.flush()
    }
}
