//! Step and Outcome: the unit of work consumed by the command executor.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// What a step does when it is applied
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StepAction {
    /// Spawn an external process
    Process { program: String, args: Vec<String> },
    /// Create a directory and its parents (no-op when present)
    CreateDir(PathBuf),
    /// Rename an entry
    Move { from: PathBuf, to: PathBuf },
    /// Remove a file or directory tree
    RemoveTree(PathBuf),
    /// Write a text file, replacing any previous content
    WriteFile { path: PathBuf, contents: String },
}

/// An atomic unit of mutation
#[derive(Clone, PartialEq, Eq)]
pub struct Step {
    pub action: StepAction,
    /// Working directory for process steps
    pub cwd: Option<PathBuf>,
    /// Environment overrides for process steps
    pub env: BTreeMap<String, String>,
    /// A non-zero exit aborts the sequence
    pub mandatory: bool,
}

impl Step {
    fn from_action(action: StepAction) -> Self {
        Self {
            action,
            cwd: None,
            env: BTreeMap::new(),
            mandatory: true,
        }
    }

    pub fn process<I, S>(program: impl Into<String>, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::from_action(StepAction::Process {
            program: program.into(),
            args: args.into_iter().map(Into::into).collect(),
        })
    }

    pub fn create_dir(path: impl Into<PathBuf>) -> Self {
        Self::from_action(StepAction::CreateDir(path.into()))
    }

    pub fn move_entry(from: impl Into<PathBuf>, to: impl Into<PathBuf>) -> Self {
        Self::from_action(StepAction::Move {
            from: from.into(),
            to: to.into(),
        })
    }

    pub fn remove_tree(path: impl Into<PathBuf>) -> Self {
        Self::from_action(StepAction::RemoveTree(path.into()))
    }

    pub fn write_file(path: impl Into<PathBuf>, contents: impl Into<String>) -> Self {
        Self::from_action(StepAction::WriteFile {
            path: path.into(),
            contents: contents.into(),
        })
    }

    pub fn in_dir(mut self, cwd: impl Into<PathBuf>) -> Self {
        self.cwd = Some(cwd.into());
        self
    }

    pub fn with_env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.insert(key.into(), value.into());
        self
    }

    /// Mark the step as allowed to fail; the caller inspects the outcome
    pub fn optional(mut self) -> Self {
        self.mandatory = false;
        self
    }

    pub fn is_process(&self) -> bool {
        matches!(self.action, StepAction::Process { .. })
    }

    /// Fully resolved argument vector, used for logging and errors
    pub fn argv(&self) -> Vec<String> {
        match &self.action {
            StepAction::Process { program, args } => {
                let mut argv = Vec::with_capacity(args.len() + 1);
                argv.push(program.clone());
                argv.extend(args.iter().cloned());
                argv
            }
            StepAction::CreateDir(path) => vec!["mkdir".into(), "-p".into(), display(path)],
            StepAction::Move { from, to } => vec!["mv".into(), display(from), display(to)],
            StepAction::RemoveTree(path) => vec!["rm".into(), "-rf".into(), display(path)],
            StepAction::WriteFile { path, .. } => vec!["write".into(), display(path)],
        }
    }

    /// Argument vector joined into a single shell-like line
    pub fn command_line(&self) -> String {
        join_argv(&self.argv())
    }
}

/// Join an argument vector, quoting arguments that need it
pub fn join_argv(argv: &[String]) -> String {
    argv.iter()
        .map(|arg| quote(arg))
        .collect::<Vec<_>>()
        .join(" ")
}

// Env values may hold credentials; only their names are printed
impl std::fmt::Debug for Step {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Step")
            .field("argv", &self.argv())
            .field("cwd", &self.cwd)
            .field("env", &self.env.keys().collect::<Vec<_>>())
            .field("mandatory", &self.mandatory)
            .finish()
    }
}

fn display(path: &Path) -> String {
    path.display().to_string()
}

fn quote(arg: &str) -> String {
    if arg.is_empty() || arg.chars().any(|c| c.is_whitespace() || c == '\'') {
        format!("'{}'", arg.replace('\'', r"'\''"))
    } else {
        arg.to_string()
    }
}

/// Result of applying one step
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Outcome {
    /// Command line of the step that produced this outcome
    pub command: String,
    /// Exit status; `None` when killed by a signal
    pub exit_code: Option<i32>,
    pub success: bool,
    /// The operator interrupted the step
    pub cancelled: bool,
    /// Produced by the dry-run executor
    pub simulated: bool,
}

impl Outcome {
    pub fn completed(step: &Step, exit_code: Option<i32>) -> Self {
        Self {
            command: step.command_line(),
            exit_code,
            success: exit_code == Some(0),
            cancelled: false,
            simulated: false,
        }
    }

    pub fn simulated(step: &Step) -> Self {
        Self {
            command: step.command_line(),
            exit_code: Some(0),
            success: true,
            cancelled: false,
            simulated: true,
        }
    }

    pub fn cancelled(step: &Step) -> Self {
        Self {
            command: step.command_line(),
            exit_code: None,
            success: false,
            cancelled: true,
            simulated: false,
        }
    }
}
