// src/utils/log.rs

//! Operator-facing report output.
//!
//! Diagnostics go through the `log` facade; this module prints the banners
//! and run summaries that should appear regardless of the log filter.

use chrono::Local;
use unicode_segmentation::UnicodeSegmentation;

const RULE_WIDTH: usize = 60;

fn format_line(tag: &str, message: &str) -> String {
    let timestamp = Local::now().format("%Y-%m-%d %H:%M:%S");
    format!("[{timestamp}] [{tag}] {message}")
}

/// Print a boxed header.
pub fn header(title: &str) {
    let border = "═".repeat(RULE_WIDTH);
    println!("{}", format_line("INFO", &border));
    println!("{}", format_line("INFO", &format!("  {title}")));
    println!("{}", format_line("INFO", &border));
}

/// Print an indented line.
pub fn sub_item(message: &str) {
    println!("{}", format_line("INFO", &format!("    {message}")));
}

/// Print a summary section.
pub fn summary(title: &str, items: &[(&str, String)]) {
    println!("{}", format_line("SUMMARY", title));
    for (key, value) in items {
        println!("{}", format_line("SUMMARY", &format!("    {key}: {value}")));
    }
}

/// Shorten `text` to at most `max` graphemes, appending an ellipsis when cut.
pub fn truncate(text: &str, max: usize) -> String {
    let mut graphemes = text.graphemes(true);
    let head: String = graphemes.by_ref().take(max).collect();
    if graphemes.next().is_some() {
        format!("{head}…")
    } else {
        head
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_short_text_unchanged() {
        assert_eq!(truncate("講座", 10), "講座");
    }

    #[test]
    fn test_truncate_counts_graphemes() {
        assert_eq!(truncate("教師教學發展中心", 4), "教師教學…");
        assert_eq!(truncate("e\u{301}abc", 2), "e\u{301}a…");
    }
}
