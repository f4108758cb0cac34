// SPDX-License-Identifier: MIT

//! Path utilities for `/`-separated volume paths.
//!
//! All functions are no_std + alloc safe. Paths are plain strings; `.` and
//! `..` are left for the resolver, which sees them as ordinary directory records.

#[cfg(all(not(feature = "std"), feature = "alloc"))]
use alloc::{string::String, vec::Vec};

/// Separator between path segments.
pub const SEPARATOR: char = '/';

/// Returns `true` when `path` starts at the root directory.
#[inline]
pub fn is_absolute(path: &str) -> bool {
    path.starts_with(SEPARATOR)
}

/// Join two path components with `/`, ensuring no duplicate slash
pub fn join_paths(base: &str, part: &str) -> String {
    let mut out = String::new();
    out.push_str(base.trim_end_matches(SEPARATOR));
    out.push(SEPARATOR);
    out.push_str(part.trim_start_matches(SEPARATOR));
    out
}

/// Splits a path into its non-empty components.
pub fn split_path(path: &str) -> Vec<&str> {
    path.split(SEPARATOR).filter(|p| !p.is_empty()).collect()
}

/// Splits a path into `(parent, leaf)`.
///
/// - `"a.txt"` → `("", "a.txt")` (parent is the working directory)
/// - `"/a.txt"` → `("/", "a.txt")`
/// - `"docs/notes/"` → `("docs", "notes")`
/// - `"/"` → `("/", "")`
pub fn split_parent(path: &str) -> (&str, &str) {
    let trimmed = path.trim_end_matches(SEPARATOR);
    if trimmed.is_empty() {
        return if is_absolute(path) { ("/", "") } else { ("", "") };
    }
    match trimmed.rfind(SEPARATOR) {
        None => ("", trimmed),
        Some(0) => ("/", &trimmed[1..]),
        Some(idx) => (&trimmed[..idx], &trimmed[idx + 1..]),
    }
}

/// Parent of a normalized absolute path. The root is its own parent.
pub fn parent_path(abs: &str) -> String {
    match abs.trim_end_matches(SEPARATOR).rfind(SEPARATOR) {
        None | Some(0) => String::from("/"),
        Some(idx) => String::from(&abs[..idx]),
    }
}
