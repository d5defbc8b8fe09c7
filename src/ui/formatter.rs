//! Pure formatting functions for operator output.
//!
//! Everything here returns a `String`; printing happens in the parent module.

use console::style;
use std::fmt;

/// Pipeline stage a message belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Version,
    Publish,
    Tag,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Stage::Version => write!(f, "[version]"),
            Stage::Publish => write!(f, "[publish]"),
            Stage::Tag => write!(f, "[tag]"),
        }
    }
}

pub fn format_error(stage: Stage, message: &str) -> String {
    format!("{} {} {}", stage, style("ERROR:").red().bold(), message)
}

pub fn format_warning(stage: Stage, message: &str) -> String {
    format!("{} {} {}", stage, style("⚠ WARNING:").yellow(), message)
}

pub fn format_success(stage: Stage, message: &str) -> String {
    format!("{} {} {}", stage, style("✓").green(), message)
}

pub fn format_status(stage: Stage, message: &str) -> String {
    format!("{} {} {}", stage, style("→").yellow(), message)
}

pub fn format_command(stage: Stage, label: &str, command_line: &str) -> String {
    format!("{} {} {}", stage, label, style(command_line).cyan())
}

/// Indents a line of agent output under the command that produced it.
pub fn format_agent_line(line: &str) -> String {
    format!("  {} {}", style("|").dim(), line)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn plain(s: String) -> String {
        console::strip_ansi_codes(&s).into_owned()
    }

    #[test]
    fn test_stage_prefixes() {
        assert_eq!(
            plain(format_status(Stage::Publish, "Running")),
            "[publish] → Running"
        );
        assert_eq!(
            plain(format_error(Stage::Tag, "push rejected")),
            "[tag] ERROR: push rejected"
        );
        assert_eq!(
            plain(format_success(Stage::Version, "01.02.7")),
            "[version] ✓ 01.02.7"
        );
    }

    #[test]
    fn test_format_agent_line_is_indented() {
        assert_eq!(plain(format_agent_line("226 Transfer complete")), "  | 226 Transfer complete");
    }
}
