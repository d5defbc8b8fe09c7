pub mod cli;
pub mod config;
pub mod env_file;
pub mod error;
pub mod git;
pub mod process;
pub mod publish;
pub mod resolver;
pub mod skip;
pub mod tagger;
pub mod ui;
pub mod version;

pub use error::{ReleaseError, Result};
