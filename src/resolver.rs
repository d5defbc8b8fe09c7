//! Resolution of the per-build publish configuration.
//!
//! Sources, highest precedence first: the process environment, the local
//! override file, the shared override file. A key set by a higher source is
//! never overwritten.

use serde::Serialize;
use std::fmt;
use std::path::{Path, PathBuf};

use crate::config::Settings;
use crate::env_file::{self, EnvMap};
use crate::error::{ReleaseError, Result};

pub const FTP_AUTO_PUBLISH: &str = "FTP_AUTO_PUBLISH";
pub const PUBLISH_MODE: &str = "PUBLISH_MODE";
pub const HTTP_PUBLISH_URL: &str = "HTTP_PUBLISH_URL";
pub const HTTP_PUBLISH_TOKEN: &str = "HTTP_PUBLISH_TOKEN";
pub const GIT_TAG_ON_RELEASE: &str = "GIT_TAG_ON_RELEASE";
pub const FTP_STABLE_ONLY: &str = "FTP_STABLE_ONLY";

/// Transport used to publish an artifact.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PublishMode {
    Ftp,
    Http,
}

impl PublishMode {
    /// Case-insensitive parse of a `PUBLISH_MODE` value.
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "ftp" => Some(PublishMode::Ftp),
            "http" => Some(PublishMode::Http),
            _ => None,
        }
    }
}

impl fmt::Display for PublishMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PublishMode::Ftp => write!(f, "ftp"),
            PublishMode::Http => write!(f, "http"),
        }
    }
}

/// Resolved publish settings of one build.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PublishConfig {
    pub environment_name: String,
    pub mode: PublishMode,
    pub target_url: Option<String>,
    #[serde(serialize_with = "mask_secret")]
    pub auth_token: Option<String>,
    pub stable_only: bool,
    pub enable_tagging: bool,
    /// `FTP_AUTO_PUBLISH=1`
    pub auto_publish: bool,
    /// The environment name carries the release suffix.
    pub release_environment: bool,
}

fn mask_secret<S: serde::Serializer>(
    value: &Option<String>,
    serializer: S,
) -> std::result::Result<S::Ok, S::Error> {
    match value {
        Some(_) => serializer.serialize_some("****"),
        None => serializer.serialize_none(),
    }
}

impl PublishConfig {
    /// Publishing runs only on explicit opt-in or for release environments.
    pub fn is_publish_eligible(&self) -> bool {
        self.auto_publish || self.release_environment
    }

    /// Checks that the chosen transport has what it needs.
    pub fn validate(&self) -> Result<()> {
        if self.mode == PublishMode::Http && self.target_url.is_none() {
            return Err(ReleaseError::config(format!(
                "{} not set; HTTP publish requires a target URL",
                HTTP_PUBLISH_URL
            )));
        }
        Ok(())
    }
}

/// Outcome of a resolution pass, with what the operator may want to know.
#[derive(Debug, Clone)]
pub struct Resolution {
    pub config: PublishConfig,
    /// Override files that contributed at least one key.
    pub applied_files: Vec<PathBuf>,
    pub warnings: Vec<String>,
}

/// Merges configuration sources into a [PublishConfig].
pub struct ConfigResolver<'a> {
    settings: &'a Settings,
    env: EnvMap,
}

impl<'a> ConfigResolver<'a> {
    /// Resolver seeded with an explicit environment (process or test).
    pub fn new(settings: &'a Settings, env: EnvMap) -> Self {
        ConfigResolver { settings, env }
    }

    /// Resolver seeded with a snapshot of the process environment.
    pub fn from_process_env(settings: &'a Settings) -> Self {
        Self::new(settings, crate::env_file::process_env())
    }

    /// Applies the override files of `project_root` and resolves the config.
    pub fn resolve(mut self, project_root: &Path, environment_name: &str) -> Resolution {
        let files = [
            project_root.join(&self.settings.files.env_local),
            project_root.join(&self.settings.files.env_shared),
        ];

        let mut applied_files = Vec::new();
        for path in files {
            if !env_file::load_into(&mut self.env, &path).is_empty() {
                applied_files.push(path);
            }
        }

        let mut warnings = Vec::new();
        let target_url = self.non_empty(HTTP_PUBLISH_URL);
        let explicit_mode = match self.non_empty(PUBLISH_MODE) {
            Some(raw) => {
                let parsed = PublishMode::parse(&raw);
                if parsed.is_none() {
                    warnings.push(format!(
                        "Ignoring unrecognized {}={:?} (expected \"http\" or \"ftp\")",
                        PUBLISH_MODE, raw
                    ));
                }
                parsed
            }
            None => None,
        };

        let mode = explicit_mode.unwrap_or(if target_url.is_some() {
            PublishMode::Http
        } else {
            PublishMode::Ftp
        });

        let config = PublishConfig {
            environment_name: environment_name.to_string(),
            mode,
            auth_token: self.non_empty(HTTP_PUBLISH_TOKEN),
            target_url,
            stable_only: self.non_empty(FTP_STABLE_ONLY).as_deref() != Some("0"),
            enable_tagging: self.flag(GIT_TAG_ON_RELEASE),
            auto_publish: self.flag(FTP_AUTO_PUBLISH),
            release_environment: self.settings.is_release_environment(environment_name),
        };

        Resolution {
            config,
            applied_files,
            warnings,
        }
    }

    fn non_empty(&self, key: &str) -> Option<String> {
        self.env
            .get(key)
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
    }

    fn flag(&self, key: &str) -> bool {
        self.non_empty(key).as_deref() == Some("1")
    }
}
