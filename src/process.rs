//! Execution of external programs (publish agents).
//!
//! The dispatcher only sees the [CommandRunner] trait, so tests swap in a
//! [RecordingRunner] and never need real agent binaries.

use std::collections::VecDeque;
use std::fmt;
use std::io::{BufRead, BufReader, Read};
use std::path::PathBuf;
use std::process::{Command, Stdio};
use std::sync::Mutex;
use std::thread::{self, JoinHandle};

use crate::error::{ReleaseError, Result};
use crate::ui;

/// A single external program call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    pub program: String,
    pub args: Vec<String>,
    /// Working directory; inherited when `None`.
    pub cwd: Option<PathBuf>,
}

impl Invocation {
    pub fn new(program: impl Into<String>) -> Self {
        Invocation {
            program: program.into(),
            args: Vec::new(),
            cwd: None,
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn current_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.cwd = Some(dir.into());
        self
    }

    /// Value following a `-Flag` style switch, if present.
    pub fn value_of(&self, flag: &str) -> Option<&str> {
        self.args
            .iter()
            .position(|a| a == flag)
            .and_then(|i| self.args.get(i + 1))
            .map(String::as_str)
    }

    pub fn has_flag(&self, flag: &str) -> bool {
        self.args.iter().any(|a| a == flag)
    }

    /// Command line with the value after any of `secret_flags` masked.
    pub fn redacted(&self, secret_flags: &[&str]) -> String {
        let mut parts = vec![self.program.clone()];
        let mut mask_next = false;
        for arg in &self.args {
            if mask_next {
                parts.push("****".to_string());
                mask_next = false;
            } else {
                parts.push(arg.clone());
                mask_next = secret_flags.contains(&arg.as_str());
            }
        }
        parts.join(" ")
    }
}

impl fmt::Display for Invocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.redacted(&[]))
    }
}

/// Captured result of a finished program.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOutput {
    /// `None` when the process was terminated by a signal.
    pub exit_code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl CommandOutput {
    pub fn success(&self) -> bool {
        self.exit_code == Some(0)
    }

    /// Stdout and stderr joined for diagnostics.
    pub fn combined(&self) -> String {
        match (self.stdout.trim_end(), self.stderr.trim_end()) {
            ("", "") => String::new(),
            (out, "") => out.to_string(),
            ("", err) => err.to_string(),
            (out, err) => format!("{}\n{}", out, err),
        }
    }
}

/// Capability to run an external program to completion.
pub trait CommandRunner {
    /// Run the invocation and wait for it.
    ///
    /// # Returns
    /// * `Ok(CommandOutput)` - The program ran, whatever its exit status
    /// * `Err` - If the program could not be started
    fn run(&self, invocation: &Invocation) -> Result<CommandOutput>;
}

/// Runs programs with `std::process::Command`.
///
/// Stdout and stderr are always captured. A streaming runner also echoes
/// each line to the operator while the program is still running.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemRunner {
    echo: bool,
}

impl SystemRunner {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn streaming() -> Self {
        SystemRunner { echo: true }
    }
}

impl CommandRunner for SystemRunner {
    fn run(&self, invocation: &Invocation) -> Result<CommandOutput> {
        let mut cmd = Command::new(&invocation.program);
        cmd.args(&invocation.args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        if let Some(dir) = &invocation.cwd {
            cmd.current_dir(dir);
        }

        let mut child = cmd.spawn().map_err(|source| ReleaseError::Spawn {
            command: invocation.to_string(),
            source,
        })?;

        // Both pipes are drained concurrently so a chatty agent never blocks.
        let echo = self.echo;
        let stdout = child.stdout.take().map(|pipe| drain_in_background(pipe, echo));
        let stderr = child.stderr.take().map(|pipe| drain_in_background(pipe, echo));
        let status = child.wait()?;

        Ok(CommandOutput {
            exit_code: status.code(),
            stdout: join_captured(stdout),
            stderr: join_captured(stderr),
        })
    }
}

fn drain_in_background<R: Read + Send + 'static>(pipe: R, echo: bool) -> JoinHandle<String> {
    thread::spawn(move || drain(pipe, echo))
}

/// Reads a pipe to its end, line by line, returning everything read.
fn drain<R: Read>(pipe: R, echo: bool) -> String {
    let mut reader = BufReader::new(pipe);
    let mut captured = Vec::new();
    let mut line = Vec::new();
    loop {
        line.clear();
        match reader.read_until(b'\n', &mut line) {
            Ok(0) | Err(_) => break,
            Ok(_) => {
                if echo {
                    ui::display_agent_line(String::from_utf8_lossy(&line).trim_end());
                }
                captured.extend_from_slice(&line);
            }
        }
    }
    String::from_utf8_lossy(&captured).into_owned()
}

fn join_captured(handle: Option<JoinHandle<String>>) -> String {
    handle
        .and_then(|handle| handle.join().ok())
        .unwrap_or_default()
}

/// Test runner: records invocations and replays scripted outputs.
///
/// When the script is exhausted every call succeeds with empty output.
#[derive(Debug, Default)]
pub struct RecordingRunner {
    calls: Mutex<Vec<Invocation>>,
    script: Mutex<VecDeque<CommandOutput>>,
}

impl RecordingRunner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue the output of the next call.
    pub fn then_output(self, output: CommandOutput) -> Self {
        self.script
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push_back(output);
        self
    }

    /// Queue an exit code for the next call, with `stderr` as its diagnostics.
    pub fn then_exit(self, exit_code: i32, stderr: &str) -> Self {
        self.then_output(CommandOutput {
            exit_code: Some(exit_code),
            stdout: String::new(),
            stderr: stderr.to_string(),
        })
    }

    pub fn calls(&self) -> Vec<Invocation> {
        self.calls.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }
}

impl CommandRunner for RecordingRunner {
    fn run(&self, invocation: &Invocation) -> Result<CommandOutput> {
        self.calls
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(invocation.clone());

        let next = self
            .script
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .pop_front();
        Ok(next.unwrap_or(CommandOutput {
            exit_code: Some(0),
            ..CommandOutput::default()
        }))
    }
}
