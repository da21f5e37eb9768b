//! Command executor: the single choke point for every mutation.
//!
//! Two implementations share one trait. `SystemExecutor` spawns processes
//! with inherited stdio and performs filesystem intents natively;
//! `DryRunExecutor` logs and records each step and touches nothing.

use crate::domain::{Outcome, Step, StepAction};
use crate::error::{AppError, Result};
use async_trait::async_trait;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

/// Consumes steps and reports their outcomes
#[async_trait]
pub trait CommandExecutor: Send + Sync {
    /// Apply one step. A mandatory step that exits non-zero is an error;
    /// an optional one returns its outcome for the caller to inspect.
    async fn run(&self, step: &Step) -> Result<Outcome>;

    /// True when no step is really applied
    fn is_simulation(&self) -> bool;

    /// Run a step and turn an interrupted outcome into `AppError::Interrupted`
    async fn apply(&self, step: Step) -> Result<Outcome> {
        let outcome = self.run(&step).await?;
        if outcome.cancelled {
            return Err(AppError::Interrupted);
        }
        Ok(outcome)
    }
}

/// One entry of a dry-run transcript
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedStep {
    pub argv: Vec<String>,
    pub cwd: Option<PathBuf>,
}

impl RecordedStep {
    pub fn of(step: &Step) -> Self {
        Self {
            argv: step.argv(),
            cwd: step.cwd.clone(),
        }
    }
}

/// Simulating executor used by `--dry-run`
#[derive(Debug, Default)]
pub struct DryRunExecutor {
    transcript: Mutex<Vec<RecordedStep>>,
}

impl DryRunExecutor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Steps seen so far, in order
    pub fn transcript(&self) -> Vec<RecordedStep> {
        self.transcript
            .lock()
            .map(|steps| steps.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl CommandExecutor for DryRunExecutor {
    async fn run(&self, step: &Step) -> Result<Outcome> {
        let cwd = step.cwd.as_deref().map(|p| p.display().to_string());
        let env: Vec<&str> = step.env.keys().map(String::as_str).collect();
        tracing::info!(cwd = ?cwd, env = ?env, "DRYRUN: {}", step.command_line());

        if let Ok(mut steps) = self.transcript.lock() {
            steps.push(RecordedStep::of(step));
        }
        Ok(Outcome::simulated(step))
    }

    fn is_simulation(&self) -> bool {
        true
    }
}

/// Executor that really spawns processes and mutates the filesystem
#[derive(Debug, Default)]
pub struct SystemExecutor;

impl SystemExecutor {
    pub fn new() -> Self {
        Self
    }

    async fn spawn(&self, step: &Step, program: &str, args: &[String]) -> Result<Outcome> {
        let command = step.command_line();
        let mut cmd = tokio::process::Command::new(program);
        cmd.args(args).kill_on_drop(true);
        if let Some(cwd) = &step.cwd {
            ensure_cwd(cwd)?;
            cmd.current_dir(cwd);
        }
        cmd.envs(&step.env);

        let mut child = cmd.spawn().map_err(|source| AppError::Spawn {
            command: command.clone(),
            source,
        })?;

        let status = tokio::select! {
            status = child.wait() => status.map_err(|source| AppError::Spawn {
                command: command.clone(),
                source,
            })?,
            _ = tokio::signal::ctrl_c() => {
                tracing::warn!("Interrupt received, stopping `{}`", command);
                if let Err(e) = child.kill().await {
                    tracing::debug!("Failed to kill child: {}", e);
                }
                return Ok(Outcome::cancelled(step));
            }
        };

        let outcome = Outcome::completed(step, status.code());
        if !outcome.success && step.mandatory {
            return Err(AppError::Execution {
                argv: step.argv(),
                exit_code: outcome.exit_code,
            });
        }
        if !outcome.success {
            tracing::warn!("`{}` exited with {:?}", command, outcome.exit_code);
        }
        Ok(outcome)
    }
}

#[async_trait]
impl CommandExecutor for SystemExecutor {
    async fn run(&self, step: &Step) -> Result<Outcome> {
        match &step.cwd {
            Some(cwd) => tracing::info!("$ {} (in {})", step.command_line(), cwd.display()),
            None => tracing::info!("$ {}", step.command_line()),
        }

        match &step.action {
            StepAction::Process { program, args } => self.spawn(step, program, args).await,
            StepAction::CreateDir(path) => {
                fs::create_dir_all(path).map_err(|e| AppError::filesystem("create", path, e))?;
                Ok(Outcome::completed(step, Some(0)))
            }
            StepAction::Move { from, to } => {
                fs::rename(from, to).map_err(|e| AppError::filesystem("move", from, e))?;
                Ok(Outcome::completed(step, Some(0)))
            }
            StepAction::RemoveTree(path) => {
                remove_tree(path)?;
                Ok(Outcome::completed(step, Some(0)))
            }
            StepAction::WriteFile { path, contents } => {
                fs::write(path, contents).map_err(|e| AppError::filesystem("write", path, e))?;
                Ok(Outcome::completed(step, Some(0)))
            }
        }
    }

    fn is_simulation(&self) -> bool {
        false
    }
}

/// A missing working directory is reported as such, not as a missing program
pub(crate) fn ensure_cwd(cwd: &Path) -> Result<()> {
    if cwd.is_dir() {
        return Ok(());
    }
    Err(AppError::filesystem(
        "enter",
        cwd,
        std::io::Error::new(ErrorKind::NotFound, "working directory does not exist"),
    ))
}

/// Remove a file, symlink or directory tree; a missing path is not an error
fn remove_tree(path: &Path) -> Result<()> {
    let meta = match fs::symlink_metadata(path) {
        Ok(meta) => meta,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(()),
        Err(e) => return Err(AppError::filesystem("inspect", path, e)),
    };
    let result = if meta.is_dir() {
        fs::remove_dir_all(path)
    } else {
        fs::remove_file(path)
    };
    result.map_err(|e| AppError::filesystem("remove", path, e))
}
