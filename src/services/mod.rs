//! Infrastructure services for comfy-stack.
//!
//! This module contains:
//! - CommandExecutor: the only path by which anything is mutated
//! - DirectoryStateInspector: read-only workspace classification
//! - RepositoryProvisioner / PromotionMerger: workspace tree ownership
//! - EnvironmentLifecycleManager / PackageInstaller: environment ownership
//! - AssetDownloadPlanner / AssetFetcher: model files
//! - FrontendScaffolder: optional loader app

pub mod assets;
pub mod environment;
pub mod executor;
pub mod frontend;
pub mod inspector;
pub mod promotion;
pub mod provisioner;
pub mod tools;

#[cfg(test)]
pub mod testing;

pub use assets::{AssetDownloadPlanner, AssetFetcher};
pub use environment::{EnvironmentLifecycleManager, Interpreter, PackageInstaller};
pub use executor::{CommandExecutor, DryRunExecutor, RecordedStep, SystemExecutor};
pub use frontend::{FrontendScaffolder, ScaffoldResult};
pub use inspector::DirectoryStateInspector;
pub use promotion::{PromotionMerger, PromotionPlan, PromotionReport};
pub use provisioner::{ProvisionReport, RepositoryProvisioner};
pub use tools::{check_tools, EXTERNAL_TOOLS};
