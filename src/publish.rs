//! Transport selection and invocation of the external publish agents.
//!
//! Exactly one agent runs per build. A failure of that agent is final for
//! the publish step: there is no retry and no fallback to the other transport.

use std::path::{Path, PathBuf};

use crate::config::Settings;
use crate::error::{ReleaseError, Result};
use crate::process::{CommandOutput, CommandRunner, Invocation};
use crate::resolver::{PublishConfig, PublishMode};

/// Agent switches carrying secrets; masked when a command line is shown.
pub const SECRET_FLAGS: &[&str] = &["-ApiKey"];

/// Result of one publish attempt.
#[derive(Debug)]
pub struct PublishOutcome {
    pub success: bool,
    pub transport: PublishMode,
    /// The command that ran, if the attempt got that far.
    pub invocation: Option<Invocation>,
    /// Captured output of the agent, on success or failure.
    pub output: Option<CommandOutput>,
    pub error: Option<ReleaseError>,
}

impl PublishOutcome {
    fn failed(
        transport: PublishMode,
        invocation: Option<Invocation>,
        error: ReleaseError,
    ) -> Self {
        PublishOutcome {
            success: false,
            transport,
            invocation,
            output: None,
            error: Some(error),
        }
    }

    /// True when configuration stopped the attempt before any agent started.
    pub fn is_configuration_error(&self) -> bool {
        self.error
            .as_ref()
            .map_or(false, ReleaseError::is_configuration)
    }
}

/// Chooses the transport, builds the agent invocation and runs it.
pub struct PublishDispatcher<'a> {
    runner: &'a dyn CommandRunner,
    settings: &'a Settings,
    project_root: &'a Path,
}

impl<'a> PublishDispatcher<'a> {
    pub fn new(
        runner: &'a dyn CommandRunner,
        settings: &'a Settings,
        project_root: &'a Path,
    ) -> Self {
        PublishDispatcher {
            runner,
            settings,
            project_root,
        }
    }

    /// Project-relative location of the agent for a transport.
    pub fn agent_path(&self, mode: PublishMode) -> PathBuf {
        let relative = match mode {
            PublishMode::Http => &self.settings.agents.http,
            PublishMode::Ftp => &self.settings.agents.ftp,
        };
        self.project_root.join(relative)
    }

    /// Validates the configuration and builds the agent invocation.
    ///
    /// # Returns
    /// * `Ok(Invocation)` - The command that `publish` would run
    /// * `Err` - Missing target URL or missing agent
    pub fn plan(&self, config: &PublishConfig, version_short: &str) -> Result<Invocation> {
        config.validate()?;

        let agent = self.agent_path(config.mode);
        if !agent.is_file() {
            return Err(ReleaseError::MissingAgent { path: agent });
        }

        let mut invocation = match self.settings.agents.interpreter.split_first() {
            Some((program, prefix)) => Invocation::new(program.clone())
                .args(prefix.iter().cloned())
                .arg(agent.to_string_lossy()),
            None => Invocation::new(agent.to_string_lossy()),
        }
        .current_dir(self.project_root)
        .args(["-EnvName", config.environment_name.as_str()]);

        match config.mode {
            PublishMode::Http => {
                // validate() guarantees the URL
                let url = config.target_url.as_deref().unwrap_or_default();
                invocation = invocation.args(["-Url", url, "-Version", version_short]);
                if let Some(token) = &config.auth_token {
                    invocation = invocation.args(["-ApiKey", token.as_str()]);
                }
            }
            PublishMode::Ftp => {
                invocation = invocation.args(["-Version", version_short]);
                if config.stable_only {
                    invocation = invocation.arg("-StableOnly");
                }
            }
        }

        Ok(invocation)
    }

    /// Runs the agent for the configured transport once.
    ///
    /// Never returns an error: configuration problems, spawn failures and
    /// non-zero exits are all reported through the outcome.
    pub fn publish(&self, config: &PublishConfig, version_short: &str) -> PublishOutcome {
        match self.plan(config, version_short) {
            Ok(invocation) => self.run(config, invocation),
            Err(e) => PublishOutcome::failed(config.mode, None, e),
        }
    }

    /// Runs an invocation produced by [`plan`](Self::plan) exactly once.
    pub fn run(&self, config: &PublishConfig, invocation: Invocation) -> PublishOutcome {
        let output = match self.runner.run(&invocation) {
            Ok(output) => output,
            Err(e) => return PublishOutcome::failed(config.mode, Some(invocation), e),
        };

        if output.success() {
            return PublishOutcome {
                success: true,
                transport: config.mode,
                invocation: Some(invocation),
                output: Some(output),
                error: None,
            };
        }

        let error = ReleaseError::Transport {
            command: invocation.redacted(SECRET_FLAGS),
            exit_code: output.exit_code,
            output: output.combined(),
        };
        PublishOutcome {
            success: false,
            transport: config.mode,
            invocation: Some(invocation),
            output: Some(output),
            error: Some(error),
        }
    }

    /// Reports a plan that could not be built as a failed attempt.
    pub fn rejected(&self, config: &PublishConfig, error: ReleaseError) -> PublishOutcome {
        PublishOutcome::failed(config.mode, None, error)
    }
}
