use std::path::PathBuf;

use thiserror::Error;

/// Unified error type for fw-release operations
#[derive(Error, Debug)]
pub enum ReleaseError {
    #[error("Git operation failed: {0}")]
    Git(#[from] git2::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Publish agent not found: {}", .path.display())]
    MissingAgent { path: PathBuf },

    #[error("Command `{command}` exited with {}\n{output}", exit_code_label(.exit_code))]
    Transport {
        command: String,
        exit_code: Option<i32>,
        output: String,
    },

    #[error("Failed to start `{command}`: {source}")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Tag error: {0}")]
    Tag(String),

    #[error("Remote operation failed: {0}")]
    Remote(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Convenience type alias for Results in fw-release
pub type Result<T> = std::result::Result<T, ReleaseError>;

fn exit_code_label(code: &Option<i32>) -> String {
    match code {
        Some(code) => format!("exit code {}", code),
        None => "no exit code (terminated by signal)".to_string(),
    }
}

impl ReleaseError {
    /// Create a configuration error with context
    pub fn config(msg: impl Into<String>) -> Self {
        ReleaseError::Config(msg.into())
    }

    /// Create a tag error with context
    pub fn tag(msg: impl Into<String>) -> Self {
        ReleaseError::Tag(msg.into())
    }

    /// Create a remote error with context
    pub fn remote(msg: impl Into<String>) -> Self {
        ReleaseError::Remote(msg.into())
    }

    /// True for errors an operator fixes by editing configuration or the
    /// project tree, as opposed to failures reported by a running agent.
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            ReleaseError::Config(_) | ReleaseError::MissingAgent { .. }
        )
    }
}
