//! Best-effort release tagging after a successful publish.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use regex::Regex;

use crate::error::{ReleaseError, Result};
use crate::git::Repository;
use crate::publish::PublishOutcome;
use crate::resolver::PublishConfig;
use crate::skip::SkipReason;

/// What the tagger did.
#[derive(Debug)]
pub enum TagOutcome {
    Skipped(SkipReason),
    Tagged { tag: String, artifact: PathBuf },
    /// Tagging was attempted and failed; the publish result stands.
    Failed(ReleaseError),
}

/// Newest `{environment}-*.bin` in `build_dir`.
///
/// Equal modification times are broken by file name so the choice is stable.
pub fn find_latest_artifact(build_dir: &Path, environment_name: &str) -> Result<Option<PathBuf>> {
    let pattern = Regex::new(&format!(r"^{}-.*\.bin$", regex::escape(environment_name)))
        .map_err(|e| ReleaseError::tag(format!("Invalid artifact pattern: {}", e)))?;

    let mut newest: Option<(SystemTime, String, PathBuf)> = None;
    for entry in fs::read_dir(build_dir)? {
        let entry = entry?;
        let name = entry.file_name().to_string_lossy().into_owned();
        if !pattern.is_match(&name) || !entry.file_type()?.is_file() {
            continue;
        }
        let modified = entry.metadata()?.modified()?;
        let candidate = (modified, name, entry.path());
        if newest
            .as_ref()
            .map_or(true, |best| (&candidate.0, &candidate.1) > (&best.0, &best.1))
        {
            newest = Some(candidate);
        }
    }

    Ok(newest.map(|(_, _, path)| path))
}

/// Version token of an artifact file name: the text after the first `-`
/// with the extension removed.
///
/// An environment name that itself contains `-` shifts the split, e.g.
/// `esp-01-01.02.7.bin` yields `01-01.02.7`.
pub fn artifact_version(file_name: &str) -> Option<String> {
    let rest = file_name.split_once('-').map_or(file_name, |(_, rest)| rest);
    let version = rest.rsplit_once('.').map_or(rest, |(stem, _)| stem);
    if version.is_empty() {
        None
    } else {
        Some(version.to_string())
    }
}

pub fn tag_name(version: &str) -> String {
    format!("v{}", version)
}

pub fn tag_message(tag: &str) -> String {
    format!("Release {}", tag)
}

/// Creates and pushes the release tag for the newest artifact.
pub struct ReleaseTagger<'a> {
    repo: Option<&'a dyn Repository>,
    remote: &'a str,
}

impl<'a> ReleaseTagger<'a> {
    /// `repo` is `None` when no repository could be opened; tagging then fails softly.
    pub fn new(repo: Option<&'a dyn Repository>, remote: &'a str) -> Self {
        ReleaseTagger { repo, remote }
    }

    /// Tags only after a successful publish with tagging enabled. Never fails.
    pub fn tag_if_requested(
        &self,
        config: &PublishConfig,
        outcome: &PublishOutcome,
        build_dir: &Path,
    ) -> TagOutcome {
        if !outcome.success {
            return TagOutcome::Skipped(SkipReason::PublishFailed);
        }
        if !config.enable_tagging {
            return TagOutcome::Skipped(SkipReason::TaggingDisabled);
        }

        match self.tag_latest(build_dir, &config.environment_name) {
            Ok((tag, artifact)) => TagOutcome::Tagged { tag, artifact },
            Err(e) => TagOutcome::Failed(e),
        }
    }

    fn tag_latest(&self, build_dir: &Path, environment_name: &str) -> Result<(String, PathBuf)> {
        let repo = self
            .repo
            .ok_or_else(|| ReleaseError::tag("No git repository available"))?;

        let artifact = find_latest_artifact(build_dir, environment_name)?.ok_or_else(|| {
            ReleaseError::tag(format!(
                "No {}-*.bin artifact in {}",
                environment_name,
                build_dir.display()
            ))
        })?;

        let file_name = artifact
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let version = artifact_version(&file_name).ok_or_else(|| {
            ReleaseError::tag(format!("Cannot read a version from '{}'", file_name))
        })?;

        let tag = tag_name(&version);
        repo.create_annotated_tag(&tag, &tag_message(&tag))?;
        repo.push_tags(self.remote, &[tag.as_str()])?;

        Ok((tag, artifact))
    }
}
