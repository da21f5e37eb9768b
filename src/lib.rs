//! comfy-stack: provisioning engine for a ComfyUI + Wan 2.2 workspace
//!
//! This crate classifies a target directory, fetches or merges the
//! framework source into it, manages the runtime environment, and plans
//! model downloads. Every mutation flows through a `CommandExecutor`, so a
//! dry run takes exactly the decisions a real run would.

pub mod cli;
pub mod config;
pub mod domain;
pub mod error;
pub mod orchestrator;
pub mod services;

pub use cli::Cli;
pub use config::ProvisionConfig;
pub use error::{AppError, Result};
pub use orchestrator::{Command, Orchestrator};
