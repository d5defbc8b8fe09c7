//! Pre-build and post-build workflows
//!
//! The binary only parses arguments and wires real collaborators; the
//! sequencing of stamping, config resolution, publishing and tagging lives
//! here so it can be driven with fakes.

use std::path::PathBuf;

use crate::config::Settings;
use crate::env_file::EnvMap;
use crate::error::Result;
use crate::git::Repository;
use crate::process::CommandRunner;
use crate::publish::{PublishDispatcher, PublishOutcome, SECRET_FLAGS};
use crate::resolver::{ConfigResolver, PublishConfig};
use crate::skip::SkipReason;
use crate::tagger::{ReleaseTagger, TagOutcome};
use crate::ui::{self, Stage};
use crate::version::{VersionState, VersionStrings};

/// Arguments shared by both hook points.
#[derive(Debug, Clone, PartialEq)]
pub struct BuildTarget {
    pub project_root: PathBuf,
    /// Build environment name (e.g. "esp01_1m_release")
    pub environment_name: String,
}

/// Arguments of the post-build workflow
#[derive(Debug, Clone, PartialEq)]
pub struct PublishWorkflowArgs {
    pub target: BuildTarget,
    /// Overrides `<build_root>/<environment>` as the artifact directory
    pub build_dir: Option<PathBuf>,
    /// Describe the invocation without running any agent or tagging
    pub dry_run: bool,
}

/// Everything the post-build workflow decided and did
#[derive(Debug)]
pub struct WorkflowResult {
    pub config: PublishConfig,
    pub version_short: String,
    /// Set when publishing was not attempted
    pub skipped: Option<SkipReason>,
    pub publish: Option<PublishOutcome>,
    pub tag: Option<TagOutcome>,
}

impl WorkflowResult {
    pub fn published(&self) -> bool {
        self.publish.as_ref().map_or(false, |o| o.success)
    }
}

/// Pre-build hook: bump the build counter and derive the version strings.
pub fn run_stamp_workflow(
    target: &BuildTarget,
    settings: &Settings,
    repo: Option<&dyn Repository>,
) -> Result<VersionStrings> {
    let state = VersionState::new(&target.project_root, settings);
    let strings = state.stamp(repo, &target.environment_name)?;

    ui::display_success(
        Stage::Version,
        &format!(
            "Build {} stamped as {} ({})",
            strings.short, strings.long, strings.program_name
        ),
    );
    Ok(strings)
}

/// Post-build hook: resolve config, publish once, optionally tag.
///
/// Never fails; every problem ends up in the returned result and on stderr.
pub fn run_publish_workflow(
    args: &PublishWorkflowArgs,
    settings: &Settings,
    env: EnvMap,
    runner: &dyn CommandRunner,
    repo: Option<&dyn Repository>,
) -> WorkflowResult {
    let target = &args.target;
    let resolution = ConfigResolver::new(settings, env)
        .resolve(&target.project_root, &target.environment_name);
    for warning in &resolution.warnings {
        ui::display_warning(Stage::Publish, warning);
    }

    let config = resolution.config;
    let version_short = VersionState::new(&target.project_root, settings).current_short();
    let mut result = WorkflowResult {
        config,
        version_short,
        skipped: None,
        publish: None,
        tag: None,
    };

    if !result.config.is_publish_eligible() {
        let reason = SkipReason::NotEligible {
            environment_name: target.environment_name.clone(),
            release_suffix: settings.release_suffix.clone(),
        };
        ui::display_status(Stage::Publish, &reason.to_string());
        result.skipped = Some(reason);
        return result;
    }

    for path in &resolution.applied_files {
        ui::display_status(
            Stage::Publish,
            &format!("Loaded overrides from {}", path.display()),
        );
    }

    let dispatcher = PublishDispatcher::new(runner, settings, &target.project_root);

    if args.dry_run {
        match dispatcher.plan(&result.config, &result.version_short) {
            Ok(invocation) => ui::display_command(
                Stage::Publish,
                &format!("Would run ({}):", result.config.mode),
                &invocation.redacted(SECRET_FLAGS),
            ),
            Err(e) => ui::display_error(Stage::Publish, &e.to_string()),
        }
        result.skipped = Some(SkipReason::DryRun);
        return result;
    }

    let outcome = publish(&dispatcher, &result.config, &result.version_short);

    let build_dir = args
        .build_dir
        .clone()
        .unwrap_or_else(|| settings.build_dir(&target.project_root, &target.environment_name));
    let tagger = ReleaseTagger::new(repo, &settings.git.remote);
    let tag = tagger.tag_if_requested(&result.config, &outcome, &build_dir);
    report_tag(&tag);

    result.publish = Some(outcome);
    result.tag = Some(tag);
    result
}

fn publish(
    dispatcher: &PublishDispatcher<'_>,
    config: &PublishConfig,
    version_short: &str,
) -> PublishOutcome {
    let outcome = match dispatcher.plan(config, version_short) {
        Ok(invocation) => {
            ui::display_command(
                Stage::Publish,
                &format!("Running {}:", config.mode),
                &invocation.redacted(SECRET_FLAGS),
            );
            dispatcher.run(config, invocation)
        }
        Err(e) => dispatcher.rejected(config, e),
    };

    match &outcome.error {
        None => ui::display_success(
            Stage::Publish,
            &format!(
                "Firmware {} published successfully ({})",
                version_short, outcome.transport
            ),
        ),
        Some(e) if outcome.is_configuration_error() => {
            ui::display_error(Stage::Publish, &format!("{}; skipping publish", e));
        }
        Some(e) => {
            ui::display_error(
                Stage::Publish,
                &format!("{} publish failed: {}", outcome.transport, e),
            );
        }
    }
    outcome
}

fn report_tag(tag: &TagOutcome) {
    match tag {
        TagOutcome::Tagged { tag, artifact } => ui::display_success(
            Stage::Tag,
            &format!("Created and pushed {} for {}", tag, artifact.display()),
        ),
        TagOutcome::Skipped(SkipReason::PublishFailed) => {}
        TagOutcome::Skipped(reason) => ui::display_status(Stage::Tag, &reason.to_string()),
        TagOutcome::Failed(e) => {
            ui::display_warning(Stage::Tag, &format!("Tagging skipped or failed: {}", e))
        }
    }
}
