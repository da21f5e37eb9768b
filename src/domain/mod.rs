//! Domain entities for comfy-stack.
//!
//! This module contains the core entities:
//! - Workspace: The installation target and its classification
//! - Step / Outcome: Units of mutation and their results
//! - Asset: Planned model file fetches
//! - Environment: The isolated runtime

mod asset;
mod environment;
mod step;
mod workspace;

pub use asset::{Asset, AssetCategory, AssetSet};
pub use environment::{
    bin_dir_name, executable_name, Credential, EnvMode, Environment, RuntimeBuild, CREDENTIAL_VAR,
};
pub use step::{join_argv, Outcome, Step, StepAction};
pub use workspace::{DirectoryState, Workspace, AUXILIARY_DIRS, REPO_MARKER};
