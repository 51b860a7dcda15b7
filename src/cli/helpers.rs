//! Shared helper functions for CLI commands

use console::style;

/// Truncate to `max_len` characters, adding "..." if truncated
///
/// Counts characters, not bytes, so accented designations are cut cleanly.
pub fn truncate_str(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{}...", kept)
    }
}

/// Escape a string for comma-separated output (RFC 4180)
pub fn escape_csv(s: &str) -> String {
    if s.contains(',') || s.contains('"') || s.contains('\n') {
        format!("\"{}\"", s.replace('"', "\"\""))
    } else {
        s.to_string()
    }
}

/// Price for terminal display, e.g. "1 234,50 €"
pub fn format_euros(price: f64) -> String {
    let fixed = format!("{:.2}", price.abs());
    let (units, cents) = fixed.split_once('.').unwrap_or((fixed.as_str(), "00"));

    let mut grouped = String::new();
    for (i, c) in units.chars().enumerate() {
        if i > 0 && (units.len() - i) % 3 == 0 {
            grouped.push(' ');
        }
        grouped.push(c);
    }

    let sign = if price < 0.0 { "-" } else { "" };
    format!("{}{},{} €", sign, grouped, cents)
}

/// Print a success line unless quiet
pub fn success(quiet: bool, message: impl std::fmt::Display) {
    if !quiet {
        println!("{} {}", style("✓").green(), message);
    }
}
