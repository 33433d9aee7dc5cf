use colored::Colorize;

use crate::engine::{HostStatus, Outcome};

/// Print an info message
pub fn info(msg: &str) {
    println!("{} {}", "ℹ".blue(), msg);
}

/// Print a success message
pub fn success(msg: &str) {
    println!("{} {}", "✓".green(), msg);
}

/// Print a warning message
pub fn warn(msg: &str) {
    println!("{} {}", "⚠".yellow(), msg);
}

/// Print an error message
pub fn error(msg: &str) {
    eprintln!("{} {}", "✗".red(), msg);
}

/// Print a dim/muted message
pub fn dim(msg: &str) {
    println!("  {}", msg.dimmed());
}

/// Print a header/title
pub fn header(title: &str) {
    println!();
    println!("{}", title.bold());
    println!("{}", "─".repeat(title.len()).dimmed());
}

/// Print a section header
pub fn section(title: &str) {
    println!();
    println!("{}", title.cyan().bold());
}

/// Print a key-value pair
pub fn kv(key: &str, value: &str) {
    println!("  {}: {}", key.dimmed(), value);
}

/// Print a step indicator
pub fn step(num: usize, total: usize, msg: &str) {
    println!("{} {}", format!("[{}/{}]", num, total).blue().bold(), msg);
}

// ============================================================================
// Run display
// ============================================================================

/// Glyph for a step outcome.
pub fn outcome_glyph(outcome: Outcome) -> &'static str {
    match outcome {
        Outcome::Changed => "~",
        Outcome::Satisfied => "✓",
        Outcome::Skipped => "⊘",
        Outcome::Failed => "✗",
    }
}

/// The host status label, colored for terminals.
pub fn status_label(status: HostStatus) -> colored::ColoredString {
    let label = status.label();
    match status {
        HostStatus::Ok => label.green(),
        HostStatus::Changed => label.cyan(),
        HostStatus::Degraded => label.yellow(),
        HostStatus::Failed => label.red(),
        HostStatus::Cancelled => label.dimmed(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_outcome_glyphs_are_distinct() {
        let glyphs = [
            outcome_glyph(Outcome::Changed),
            outcome_glyph(Outcome::Satisfied),
            outcome_glyph(Outcome::Skipped),
            outcome_glyph(Outcome::Failed),
        ];
        for (i, a) in glyphs.iter().enumerate() {
            for b in glyphs.iter().skip(i + 1) {
                assert_ne!(a, b);
            }
        }
    }
}
