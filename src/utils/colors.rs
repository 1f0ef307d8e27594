// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 watermill contributors

//! Terminal color utilities
//!
//! Status marks shared by the run, validate and progress output.

use colored::{ColoredString, Colorize};

/// Outcome mark printed in front of a line
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mark {
    Ok,
    Failed,
    Warning,
}

impl Mark {
    pub fn symbol(self) -> ColoredString {
        match self {
            Self::Ok => "✓".green(),
            Self::Failed => "✗".red(),
            Self::Warning => "⚠".yellow(),
        }
    }
}

/// Whether `colored` output should be enabled
///
/// Off when `NO_COLOR` is set or the terminal is unknown or dumb.
pub fn should_use_colors() -> bool {
    if std::env::var_os("NO_COLOR").is_some() {
        return false;
    }

    std::env::var("TERM").map(|t| t != "dumb").unwrap_or(false)
}

/// Apply the color preference to all `colored` output
pub fn init_colors() {
    colored::control::set_override(should_use_colors());
}

/// Print a bold section title preceded by a blank line
pub fn print_section(title: &str) {
    println!();
    println!("{}:", title.bold());
}

/// Print an indented line with a status mark
pub fn print_mark(mark: Mark, msg: &str) {
    println!("  {} {}", mark.symbol(), msg);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_marks_without_color() {
        colored::control::set_override(false);

        assert_eq!(Mark::Ok.symbol().to_string(), "✓");
        assert_eq!(Mark::Failed.symbol().to_string(), "✗");
        assert_eq!(Mark::Warning.symbol().to_string(), "⚠");
    }
}
