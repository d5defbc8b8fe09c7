//! Build stamping: version base, persistent build counter and the derived
//! version strings injected into each firmware build.

use serde::Serialize;
use std::fmt;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::config::Settings;
use crate::error::Result;
use crate::git::Repository;

/// Two-component firmware version base, rendered as `MM.mm`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VersionBase {
    pub major: u32,
    pub minor: u32,
}

impl VersionBase {
    pub const DEFAULT: VersionBase = VersionBase { major: 1, minor: 0 };

    pub fn new(major: u32, minor: u32) -> Self {
        VersionBase { major, minor }
    }

    /// Parses a `MAJOR.MINOR` declaration, falling back to `01.00`.
    ///
    /// Only the first two dot-separated components are considered, so
    /// `"1.2.3"` yields `01.02`. Anything that does not give two unsigned
    /// integers yields [`VersionBase::DEFAULT`].
    pub fn sanitize(text: &str) -> Self {
        let mut parts = text.trim().split('.');
        let major = parts.next().and_then(|p| p.trim().parse::<u32>().ok());
        let minor = parts.next().and_then(|p| p.trim().parse::<u32>().ok());

        match (major, minor) {
            (Some(major), Some(minor)) => VersionBase::new(major, minor),
            _ => VersionBase::DEFAULT,
        }
    }

    /// Reads the declaration file; a missing or unreadable file gives the default.
    pub fn load(path: &Path) -> Self {
        fs::read_to_string(path)
            .map(|text| VersionBase::sanitize(&text))
            .unwrap_or(VersionBase::DEFAULT)
    }
}

impl Default for VersionBase {
    fn default() -> Self {
        VersionBase::DEFAULT
    }
}

impl fmt::Display for VersionBase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}.{:02}", self.major, self.minor)
    }
}

/// Persistent build-attempt counter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
pub struct BuildCounter(pub u64);

impl BuildCounter {
    /// Parses counter file content; non-numeric content counts as zero.
    pub fn parse(text: &str) -> Self {
        BuildCounter(text.trim().parse::<u64>().unwrap_or(0))
    }

    /// Reads the counter file; a missing file counts as zero.
    pub fn load(path: &Path) -> Self {
        fs::read_to_string(path)
            .map(|text| BuildCounter::parse(&text))
            .unwrap_or_default()
    }

    pub fn next(self) -> Self {
        BuildCounter(self.0.saturating_add(1))
    }

    /// Writes the counter through a sibling temp file and a rename, so the
    /// file holds either the old or the new value.
    pub fn persist(self, path: &Path) -> Result<()> {
        let dir = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };
        fs::create_dir_all(&dir)?;

        let mut temp = tempfile::NamedTempFile::new_in(&dir)?;
        temp.write_all(self.0.to_string().as_bytes())?;
        temp.flush()?;
        temp.persist(path).map_err(|e| e.error)?;
        Ok(())
    }
}

impl fmt::Display for BuildCounter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Filesystem-safe label of the checked-out branch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BranchLabel(String);

impl BranchLabel {
    pub const FALLBACK: &'static str = "local";

    /// Builds a label from the symbolic HEAD name. `None`, an empty name or
    /// the literal `HEAD` (detached) give `local`.
    pub fn from_reference(reference: Option<&str>) -> Self {
        match reference.map(str::trim) {
            Some(name) if !name.is_empty() && name != "HEAD" => {
                BranchLabel(name.replace(['/', '\\'], "-"))
            }
            _ => BranchLabel::local(),
        }
    }

    pub fn local() -> Self {
        BranchLabel(BranchLabel::FALLBACK.to_string())
    }

    /// Queries the repository; any failure falls back to `local`.
    pub fn detect(repo: Option<&dyn Repository>) -> Self {
        match repo.map(|r| r.current_branch()) {
            Some(Ok(branch)) => BranchLabel::from_reference(branch.as_deref()),
            _ => BranchLabel::local(),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for BranchLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Version strings of one build, plus the artifact program name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VersionStrings {
    /// `{base}.{branch}:{counter}`, exposed as `FW_VERSION`.
    pub long: String,
    /// `{base}.{counter}`, exposed as `FW_VERSION_SHORT`.
    pub short: String,
    /// `{environment}-{short}`, the artifact name without extension.
    pub program_name: String,
}

impl VersionStrings {
    pub fn new(
        base: VersionBase,
        branch: &BranchLabel,
        counter: BuildCounter,
        environment_name: &str,
    ) -> Self {
        let short = format!("{}.{}", base, counter);
        VersionStrings {
            long: format!("{}.{}:{}", base, branch, counter),
            program_name: artifact_stem(environment_name, &short),
            short,
        }
    }

    /// Compile-time definitions in `-DNAME="value"` form.
    pub fn build_flags(&self) -> Vec<String> {
        vec![
            format!("-DFW_VERSION=\"{}\"", self.long),
            format!("-DFW_VERSION_SHORT=\"{}\"", self.short),
        ]
    }

    pub fn artifact_file_name(&self) -> String {
        format!("{}.bin", self.program_name)
    }
}

pub fn artifact_stem(environment_name: &str, version_short: &str) -> String {
    format!("{}-{}", environment_name, version_short)
}

/// Owns the per-project version inputs and performs build stamping.
pub struct VersionState<'a> {
    project_root: &'a Path,
    settings: &'a Settings,
}

impl<'a> VersionState<'a> {
    pub fn new(project_root: &'a Path, settings: &'a Settings) -> Self {
        VersionState {
            project_root,
            settings,
        }
    }

    pub fn version_file(&self) -> PathBuf {
        self.project_root.join(&self.settings.files.version)
    }

    pub fn counter_file(&self) -> PathBuf {
        self.project_root.join(&self.settings.files.build_number)
    }

    pub fn base(&self) -> VersionBase {
        VersionBase::load(&self.version_file())
    }

    pub fn current_counter(&self) -> BuildCounter {
        BuildCounter::load(&self.counter_file())
    }

    /// Increments and persists the build counter, then derives the version
    /// strings. The counter is written before anything else can fail.
    pub fn stamp(
        &self,
        repo: Option<&dyn Repository>,
        environment_name: &str,
    ) -> Result<VersionStrings> {
        let counter = self.current_counter().next();
        counter.persist(&self.counter_file())?;

        let branch = BranchLabel::detect(repo);
        Ok(VersionStrings::new(
            self.base(),
            &branch,
            counter,
            environment_name,
        ))
    }

    /// Short version of the last stamped build, without touching the counter.
    pub fn current_short(&self) -> String {
        format!("{}.{}", self.base(), self.current_counter())
    }
}
