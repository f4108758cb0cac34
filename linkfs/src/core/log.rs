// SPDX-License-Identifier: MIT

//! Leveled diagnostics.
//!
//! Messages go to stderr with a `[linkfs]` prefix when the `std` feature is
//! enabled and compile to nothing otherwise.

use core::sync::atomic::{AtomicU8, Ordering};

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
#[repr(u8)]
pub enum LogLevel {
    Quiet = 0,
    Normal = 1,
    Verbose = 2,
}

static LOG_LEVEL: AtomicU8 = AtomicU8::new(LogLevel::Normal as u8);

pub fn set_log_level(level: LogLevel) {
    LOG_LEVEL.store(level as u8, Ordering::Relaxed);
}

pub fn log_level() -> LogLevel {
    match LOG_LEVEL.load(Ordering::Relaxed) {
        0 => LogLevel::Quiet,
        1 => LogLevel::Normal,
        _ => LogLevel::Verbose,
    }
}

#[inline]
pub fn enabled(level: LogLevel) -> bool {
    log_level() >= level
}

macro_rules! log_info {
    ($($arg:tt)*) => {{
        #[cfg(feature = "std")]
        {
            if $crate::core::log::enabled($crate::core::log::LogLevel::Normal) {
                std::eprintln!("[linkfs] {}", format_args!($($arg)*));
            }
        }
        #[cfg(not(feature = "std"))]
        {
            let _ = format_args!($($arg)*);
        }
    }};
}

macro_rules! log_warn {
    ($($arg:tt)*) => {{
        #[cfg(feature = "std")]
        {
            if $crate::core::log::enabled($crate::core::log::LogLevel::Normal) {
                std::eprintln!("[linkfs] warning: {}", format_args!($($arg)*));
            }
        }
        #[cfg(not(feature = "std"))]
        {
            let _ = format_args!($($arg)*);
        }
    }};
}

macro_rules! log_verbose {
    ($($arg:tt)*) => {{
        #[cfg(feature = "std")]
        {
            if $crate::core::log::enabled($crate::core::log::LogLevel::Verbose) {
                std::eprintln!("[linkfs] {}", format_args!($($arg)*));
            }
        }
        #[cfg(not(feature = "std"))]
        {
            let _ = format_args!($($arg)*);
        }
    }};
}

pub(crate) use {log_info, log_verbose, log_warn};
