//! Unified error types for comfy-stack.

use crate::domain::join_argv;
use std::path::PathBuf;
use thiserror::Error;

/// Main provisioning error type
#[derive(Debug, Error)]
pub enum AppError {
    /// Invalid flag or token combination, raised before any step runs
    #[error("Invalid options: {0}")]
    Configuration(String),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// The target directory is in a state the engine refuses to touch
    #[error("State conflict at {}: {reason}", .path.display())]
    StateConflict { path: PathBuf, reason: String },

    /// A mandatory step exited non-zero
    #[error("Command failed ({}): {}", exit_label(.exit_code), join_argv(.argv))]
    Execution {
        argv: Vec<String>,
        exit_code: Option<i32>,
    },

    #[error("Failed to start `{command}`: {source}")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to {action} {}: {source}", .path.display())]
    Filesystem {
        action: &'static str,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("No environment found at {}; run `install` first", .0.display())]
    MissingEnvironment(PathBuf),

    #[error("Interrupted by user")]
    Interrupted,
}

impl AppError {
    /// Create a configuration error from a string
    pub fn configuration(msg: impl Into<String>) -> Self {
        Self::Configuration(msg.into())
    }

    pub fn filesystem(
        action: &'static str,
        path: impl Into<PathBuf>,
        source: std::io::Error,
    ) -> Self {
        Self::Filesystem {
            action,
            path: path.into(),
            source,
        }
    }
}

fn exit_label(code: &Option<i32>) -> String {
    match code {
        Some(code) => format!("exit code {}", code),
        None => "terminated by signal".to_string(),
    }
}

/// Configuration-loading errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid configuration: {0}")]
    Invalid(String),

    #[error("Failed to parse configuration: {0}")]
    Parse(String),
}

/// Result type alias for the provisioning engine
pub type Result<T> = std::result::Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_execution_message_includes_exit_code() {
        let err = AppError::Execution {
            argv: vec!["git".into(), "pull".into(), "--ff-only".into()],
            exit_code: Some(128),
        };
        assert_eq!(
            err.to_string(),
            "Command failed (exit code 128): git pull --ff-only"
        );
    }

    #[test]
    fn test_execution_message_for_signal() {
        let err = AppError::Execution {
            argv: vec!["python".into(), "main.py".into()],
            exit_code: None,
        };
        assert!(err.to_string().contains("terminated by signal"));
    }
}
