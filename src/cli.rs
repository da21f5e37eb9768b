//! Command-line surface.
//!
//! Flags are parsed as plain strings and validated here, so every invalid
//! combination surfaces as a configuration error before any step runs.

use crate::config::ProvisionConfig;
use crate::domain::{AssetSet, Credential, RuntimeBuild, CREDENTIAL_VAR};
use crate::error::{AppError, Result};
use crate::orchestrator::{
    Command, FrontendOptions, InstallOptions, LaunchOptions, ModelsOptions,
};
use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "comfy-stack",
    version,
    about = "Provision a ComfyUI + Wan 2.2 workspace"
)]
pub struct Cli {
    /// Workspace root (default: ~/ComfyStack/ComfyUI)
    #[arg(long, global = true)]
    pub path: Option<PathBuf>,
    /// Log every decision and step without mutating anything
    #[arg(long, global = true, default_value_t = false)]
    pub dry_run: bool,
    #[arg(long, short, global = true, default_value_t = false)]
    pub verbose: bool,
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Fetch or update the framework, build the environment, install everything
    Install {
        /// cu121, cu118 or cpu
        #[arg(long, default_value = "cpu")]
        runtime_build: String,
        /// Also install ComfyUI-Manager
        #[arg(long, default_value_t = false)]
        with_addon: bool,
        /// A|5b, B|14b, C|i2v or All
        #[arg(long)]
        asset_set: Option<String>,
        #[arg(long, env = CREDENTIAL_VAR, hide_env_values = true)]
        token: Option<String>,
        /// Launch the application when done
        #[arg(long, default_value_t = false)]
        start: bool,
        #[arg(long)]
        port: Option<u16>,
        #[arg(long, default_value_t = false)]
        listen_all: bool,
        /// Keep an existing environment instead of recreating it
        #[arg(long, default_value_t = false)]
        reuse_env: bool,
        /// Merge into a non-empty directory, backing up displaced entries
        #[arg(long, default_value_t = false)]
        force_merge: bool,
        /// Interpreter version for a new environment, e.g. 3.11
        #[arg(long)]
        python: Option<String>,
    },
    /// Fetch model files into an existing (or new) environment's workspace
    Models {
        #[arg(long)]
        asset_set: Option<String>,
        #[arg(long, env = CREDENTIAL_VAR, hide_env_values = true)]
        token: Option<String>,
        #[arg(long)]
        python: Option<String>,
    },
    /// Create a Vite + React loader next to the workspace
    ScaffoldFrontend {
        #[arg(long)]
        name: Option<String>,
        /// Backend URL written into the app's .env
        #[arg(long)]
        url: Option<String>,
    },
    /// Launch the application from an existing environment
    Start {
        #[arg(long)]
        port: Option<u16>,
        #[arg(long, default_value_t = false)]
        listen_all: bool,
    },
}

impl Cli {
    pub fn workspace(&self) -> PathBuf {
        self.path.clone().unwrap_or_else(crate::config::default_workspace)
    }

    /// Validate flags against each other and resolve defaults from `config`
    pub fn into_command(self, config: &ProvisionConfig) -> Result<Command> {
        let default_port = config.launch.port;
        match self.command {
            Commands::Install {
                runtime_build,
                with_addon,
                asset_set,
                token,
                start,
                port,
                listen_all,
                reuse_env,
                force_merge,
                python,
            } => {
                if !start && (port.is_some() || listen_all) {
                    return Err(AppError::configuration(
                        "--port and --listen-all only apply together with --start",
                    ));
                }
                let launch = start.then(|| LaunchOptions {
                    port: port.unwrap_or(default_port),
                    listen_all,
                });
                Ok(Command::Install(InstallOptions {
                    runtime_build: runtime_build.parse::<RuntimeBuild>()?,
                    with_addon,
                    asset_set: asset_set.as_deref().map(str::parse::<AssetSet>).transpose()?,
                    credential: token.and_then(Credential::new),
                    launch,
                    reuse_env,
                    force_merge,
                    python,
                }))
            }
            Commands::Models {
                asset_set,
                token,
                python,
            } => {
                let asset_set = asset_set.ok_or_else(|| {
                    AppError::configuration("models requires --asset-set (A|5b, B|14b, C|i2v, All)")
                })?;
                Ok(Command::Models(ModelsOptions {
                    asset_set: asset_set.parse()?,
                    credential: token.and_then(Credential::new),
                    python,
                }))
            }
            Commands::ScaffoldFrontend { name, url } => {
                Ok(Command::ScaffoldFrontend(FrontendOptions {
                    name: name.unwrap_or_else(|| config.frontend.name.clone()),
                    url,
                }))
            }
            Commands::Start { port, listen_all } => Ok(Command::Start(LaunchOptions {
                port: port.unwrap_or(default_port),
                listen_all,
            })),
        }
    }
}
