// SPDX-License-Identifier: MIT

//! Record timestamps: whole seconds since the UNIX epoch, UTC.
//!
//! Without `std` there is no clock, so every new stamp is the epoch.

use time::OffsetDateTime;

/// Current time as a record timestamp.
pub fn now_timestamp() -> i64 {
    #[cfg(feature = "std")]
    let now = OffsetDateTime::now_utc();
    #[cfg(not(feature = "std"))]
    let now = OffsetDateTime::UNIX_EPOCH;

    now.unix_timestamp()
}

/// Converts a record timestamp back to a date. Out-of-range values map to the epoch.
pub fn from_timestamp(ts: i64) -> OffsetDateTime {
    OffsetDateTime::from_unix_timestamp(ts).unwrap_or(OffsetDateTime::UNIX_EPOCH)
}

#[cfg(all(test, feature = "std"))]
mod tests {
    use super::*;

    #[test]
    fn test_stamp_converts_back() {
        let ts = now_timestamp();
        assert!(ts > 1_600_000_000);
        assert_eq!(from_timestamp(ts).unix_timestamp(), ts);
    }

    #[test]
    fn test_out_of_range_is_epoch() {
        assert_eq!(from_timestamp(i64::MAX), OffsetDateTime::UNIX_EPOCH);
    }
}
