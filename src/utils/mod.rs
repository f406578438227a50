//! Utility functions and helpers.

pub mod date;
pub mod fs;
pub mod http;
pub mod log;
pub mod url;

/// Collapse runs of whitespace into single spaces and trim the ends.
pub fn normalize_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}
