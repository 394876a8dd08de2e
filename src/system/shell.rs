//! External command execution.

use std::process::Stdio;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;

use crate::resilience::timeouts::with_timeout;

/// Failure of one command invocation.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ShellError {
    #[error("{program}: failed to start: {reason}")]
    Spawn { program: String, reason: String },

    #[error("{program}: timed out after {secs}s")]
    Timeout { program: String, secs: u64 },

    #[error("{program}: exited with {code:?}\n{output}")]
    Failed {
        program: String,
        code: Option<i32>,
        output: String,
    },
}

/// Captured result of a command that ran to completion.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOutput {
    pub code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl CommandOutput {
    pub fn success(&self) -> bool {
        self.code == Some(0)
    }

    pub fn combined(&self) -> String {
        format!("{}{}", self.stdout, self.stderr)
    }
}

/// Runs external programs on behalf of the engine.
#[async_trait]
pub trait Shell: Send + Sync {
    /// Run `program` and return its output whatever the exit status.
    async fn output(
        &self,
        program: &str,
        args: &[&str],
        stdin: Option<&str>,
    ) -> Result<CommandOutput, ShellError>;

    /// Run `program` and fail unless it exits with status 0.
    async fn run(
        &self,
        program: &str,
        args: &[&str],
        stdin: Option<&str>,
    ) -> Result<CommandOutput, ShellError> {
        let output = self.output(program, args, stdin).await?;
        if output.success() {
            Ok(output)
        } else {
            Err(ShellError::Failed {
                program: program.to_string(),
                code: output.code,
                output: output.combined(),
            })
        }
    }
}

/// Executes commands on the host with a per-command deadline.
#[derive(Debug, Clone)]
pub struct SystemShell {
    timeout: Duration,
}

impl SystemShell {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }
}

#[async_trait]
impl Shell for SystemShell {
    async fn output(
        &self,
        program: &str,
        args: &[&str],
        stdin: Option<&str>,
    ) -> Result<CommandOutput, ShellError> {
        let spawn_err = |e: std::io::Error| ShellError::Spawn {
            program: program.to_string(),
            reason: e.to_string(),
        };

        tracing::debug!(program, ?args, "Running system command");

        let mut child = Command::new(program)
            .args(args)
            .stdin(if stdin.is_some() { Stdio::piped() } else { Stdio::null() })
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(spawn_err)?;

        if let (Some(input), Some(mut pipe)) = (stdin, child.stdin.take()) {
            pipe.write_all(input.as_bytes()).await.map_err(spawn_err)?;
        }

        let output = with_timeout(self.timeout, child.wait_with_output())
            .await
            .map_err(|_| ShellError::Timeout {
                program: program.to_string(),
                secs: self.timeout.as_secs(),
            })?
            .map_err(spawn_err)?;

        Ok(CommandOutput {
            code: output.status.code(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        })
    }
}

/// One command seen by a [`DryRunShell`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedCommand {
    pub program: String,
    pub args: Vec<String>,
    pub stdin: Option<String>,
}

impl RecordedCommand {
    /// `program arg1 arg2 ...`
    pub fn line(&self) -> String {
        std::iter::once(self.program.as_str())
            .chain(self.args.iter().map(String::as_str))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// Records commands instead of executing them.
///
/// Used by `--dry-run` and by tests. Programs registered with
/// [`DryRunShell::respond`] return the canned output; everything else exits 0.
#[derive(Debug, Default)]
pub struct DryRunShell {
    history: Mutex<Vec<RecordedCommand>>,
    responses: Mutex<Vec<(String, CommandOutput)>>,
}

impl DryRunShell {
    pub fn new() -> Self {
        Self::default()
    }

    /// Canned output for any command line starting with `prefix`.
    pub fn respond(&self, prefix: &str, output: CommandOutput) {
        if let Ok(mut responses) = self.responses.lock() {
            responses.push((prefix.to_string(), output));
        }
    }

    /// Make every command line starting with `prefix` exit 1.
    pub fn fail(&self, prefix: &str) {
        self.respond(
            prefix,
            CommandOutput {
                code: Some(1),
                stdout: String::new(),
                stderr: format!("{}: injected failure", prefix),
            },
        );
    }

    pub fn history(&self) -> Vec<RecordedCommand> {
        self.history.lock().map(|h| h.clone()).unwrap_or_default()
    }

    /// Recorded command lines, without stdin.
    pub fn lines(&self) -> Vec<String> {
        self.history().iter().map(RecordedCommand::line).collect()
    }
}

#[async_trait]
impl Shell for DryRunShell {
    async fn output(
        &self,
        program: &str,
        args: &[&str],
        stdin: Option<&str>,
    ) -> Result<CommandOutput, ShellError> {
        let command = RecordedCommand {
            program: program.to_string(),
            args: args.iter().map(|a| a.to_string()).collect(),
            stdin: stdin.map(str::to_string),
        };
        let line = command.line();
        tracing::info!(command = %line, "dry-run: command not executed");

        if let Ok(mut history) = self.history.lock() {
            history.push(command);
        }

        let canned = self.responses.lock().ok().and_then(|responses| {
            responses
                .iter()
                .find(|(prefix, _)| line.starts_with(prefix.as_str()))
                .map(|(_, out)| out.clone())
        });

        Ok(canned.unwrap_or(CommandOutput {
            code: Some(0),
            ..CommandOutput::default()
        }))
    }
}
