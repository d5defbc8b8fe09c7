use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{ReleaseError, Result};

/// Name of the settings file looked up in the project root and the user config dir.
pub const SETTINGS_FILE_NAME: &str = "fw-release.toml";

/// Represents the complete tool settings for fw-release.
///
/// These are the fixed locations and conventions of a firmware project. The
/// per-build publish switches live in the environment and override files
/// instead (see [`crate::resolver`]).
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct Settings {
    /// Environment-name suffix that makes a build publish-eligible.
    #[serde(default = "default_release_suffix")]
    pub release_suffix: String,

    /// Directory holding one output directory per build environment.
    #[serde(default = "default_build_root")]
    pub build_root: PathBuf,

    #[serde(default)]
    pub agents: AgentsConfig,

    #[serde(default)]
    pub files: FilesConfig,

    #[serde(default)]
    pub git: GitConfig,
}

fn default_release_suffix() -> String {
    "_release".to_string()
}

fn default_build_root() -> PathBuf {
    PathBuf::from(".pio").join("build")
}

/// Returns the default interpreter prefix used to launch publish agents.
fn default_interpreter() -> Vec<String> {
    vec![
        "pwsh".to_string(),
        "-NoProfile".to_string(),
        "-ExecutionPolicy".to_string(),
        "Bypass".to_string(),
        "-File".to_string(),
    ]
}

fn default_http_agent() -> PathBuf {
    PathBuf::from("tools").join("publish-http.ps1")
}

fn default_ftp_agent() -> PathBuf {
    PathBuf::from("tools").join("publish-firmware.ps1")
}

/// Locations of the external publish agents, relative to the project root.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct AgentsConfig {
    /// Program and leading arguments placed before the agent script path.
    /// An empty list runs the agent directly.
    #[serde(default = "default_interpreter")]
    pub interpreter: Vec<String>,

    #[serde(default = "default_http_agent")]
    pub http: PathBuf,

    #[serde(default = "default_ftp_agent")]
    pub ftp: PathBuf,
}

impl Default for AgentsConfig {
    fn default() -> Self {
        AgentsConfig {
            interpreter: default_interpreter(),
            http: default_http_agent(),
            ftp: default_ftp_agent(),
        }
    }
}

fn default_version_file() -> PathBuf {
    PathBuf::from("VERSION")
}

fn default_build_number_file() -> PathBuf {
    PathBuf::from(".buildnumber")
}

fn default_env_local() -> PathBuf {
    PathBuf::from(".env.local")
}

fn default_env_shared() -> PathBuf {
    PathBuf::from(".env")
}

/// Project-relative files read or written by fw-release.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct FilesConfig {
    #[serde(default = "default_version_file")]
    pub version: PathBuf,

    #[serde(default = "default_build_number_file")]
    pub build_number: PathBuf,

    /// Override file applied first.
    #[serde(default = "default_env_local")]
    pub env_local: PathBuf,

    /// Override file applied second.
    #[serde(default = "default_env_shared")]
    pub env_shared: PathBuf,
}

impl Default for FilesConfig {
    fn default() -> Self {
        FilesConfig {
            version: default_version_file(),
            build_number: default_build_number_file(),
            env_local: default_env_local(),
            env_shared: default_env_shared(),
        }
    }
}

fn default_remote() -> String {
    "origin".to_string()
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct GitConfig {
    #[serde(default = "default_remote")]
    pub remote: String,
}

impl Default for GitConfig {
    fn default() -> Self {
        GitConfig {
            remote: default_remote(),
        }
    }
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            release_suffix: default_release_suffix(),
            build_root: default_build_root(),
            agents: AgentsConfig::default(),
            files: FilesConfig::default(),
            git: GitConfig::default(),
        }
    }
}

impl Settings {
    /// Output directory of the given build environment.
    pub fn build_dir(&self, project_root: &Path, environment_name: &str) -> PathBuf {
        project_root.join(&self.build_root).join(environment_name)
    }

    /// Whether an environment name carries the release suffix.
    pub fn is_release_environment(&self, environment_name: &str) -> bool {
        !self.release_suffix.is_empty() && environment_name.ends_with(&self.release_suffix)
    }
}

/// Loads settings from file or returns defaults.
///
/// Attempts to load settings in the following order:
/// 1. Custom path provided as parameter
/// 2. `fw-release.toml` in the project root
/// 3. `fw-release.toml` in the user config directory
/// 4. Default settings if no file found
///
/// # Returns
/// * `Ok(Settings)` - Loaded or default settings
/// * `Err` - If a file exists but cannot be read or parsed
pub fn load_settings(config_path: Option<&Path>, project_root: &Path) -> Result<Settings> {
    let candidate = if let Some(path) = config_path {
        Some(path.to_path_buf())
    } else if project_root.join(SETTINGS_FILE_NAME).exists() {
        Some(project_root.join(SETTINGS_FILE_NAME))
    } else {
        dirs::config_dir()
            .map(|dir| dir.join(SETTINGS_FILE_NAME))
            .filter(|path| path.exists())
    };

    match candidate {
        Some(path) => parse_settings_file(&path),
        None => Ok(Settings::default()),
    }
}

fn parse_settings_file(path: &Path) -> Result<Settings> {
    let text = fs::read_to_string(path).map_err(|e| {
        ReleaseError::config(format!("Cannot read {}: {}", path.display(), e))
    })?;
    toml::from_str(&text)
        .map_err(|e| ReleaseError::config(format!("Invalid {}: {}", path.display(), e)))
}
