//! Operator output.
//!
//! All diagnostics go to stderr: the `stamp` command's stdout is consumed by
//! the host build system and must contain only the build constants.
//! - `formatter` - Pure formatting functions
//! - This module - Printing

use console::Term;

pub mod formatter;

pub use formatter::Stage;

fn emit(line: String) {
    // A closed stderr must not turn into a build failure.
    let _ = Term::stderr().write_line(&line);
}

/// Print an error message in red.
pub fn display_error(stage: Stage, message: &str) {
    emit(formatter::format_error(stage, message));
}

/// Print a non-fatal warning.
pub fn display_warning(stage: Stage, message: &str) {
    emit(formatter::format_warning(stage, message));
}

/// Print a success message with a green checkmark.
pub fn display_success(stage: Stage, message: &str) {
    emit(formatter::format_success(stage, message));
}

/// Print a status message with a yellow arrow.
pub fn display_status(stage: Stage, message: &str) {
    emit(formatter::format_status(stage, message));
}

/// Print the command line about to run (secrets already masked by the caller).
pub fn display_command(stage: Stage, label: &str, command_line: &str) {
    emit(formatter::format_command(stage, label, command_line));
}

/// Echo one line an external program just wrote.
pub fn display_agent_line(line: &str) {
    emit(formatter::format_agent_line(line));
}
