//! Per-command sequencing.
//!
//! Every command re-derives its decisions from the filesystem, so running
//! it again after a partial failure is safe.

use crate::config::ProvisionConfig;
use crate::domain::{AssetSet, Credential, EnvMode, Environment, RuntimeBuild, Step, Workspace};
use crate::error::Result;
use crate::services::{
    check_tools, AssetDownloadPlanner, AssetFetcher, CommandExecutor, DirectoryStateInspector,
    EnvironmentLifecycleManager, FrontendScaffolder, Interpreter, PackageInstaller,
    RepositoryProvisioner, EXTERNAL_TOOLS,
};
use std::path::PathBuf;

/// Foreground launch parameters
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LaunchOptions {
    pub port: u16,
    /// Bind every interface instead of loopback only
    pub listen_all: bool,
}

#[derive(Debug, Clone)]
pub struct InstallOptions {
    pub runtime_build: RuntimeBuild,
    pub with_addon: bool,
    pub asset_set: Option<AssetSet>,
    pub credential: Option<Credential>,
    /// Launch after installing when set
    pub launch: Option<LaunchOptions>,
    pub reuse_env: bool,
    pub force_merge: bool,
    /// Interpreter version for new environments
    pub python: Option<String>,
}

#[derive(Debug, Clone)]
pub struct ModelsOptions {
    pub asset_set: AssetSet,
    pub credential: Option<Credential>,
    pub python: Option<String>,
}

#[derive(Debug, Clone)]
pub struct FrontendOptions {
    pub name: String,
    /// Backend URL; defaults to loopback on the configured port
    pub url: Option<String>,
}

/// A fully validated top-level command
#[derive(Debug, Clone)]
pub enum Command {
    Install(InstallOptions),
    Models(ModelsOptions),
    ScaffoldFrontend(FrontendOptions),
    Start(LaunchOptions),
}

impl Command {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Install(_) => "install",
            Self::Models(_) => "models",
            Self::ScaffoldFrontend(_) => "scaffold-frontend",
            Self::Start(_) => "start",
        }
    }
}

/// Runs one command against one workspace
pub struct Orchestrator<'a> {
    config: &'a ProvisionConfig,
    executor: &'a dyn CommandExecutor,
    workspace: Workspace,
}

impl<'a> Orchestrator<'a> {
    pub fn new(
        config: &'a ProvisionConfig,
        executor: &'a dyn CommandExecutor,
        root: PathBuf,
    ) -> Self {
        let workspace = Workspace::new(root, &config.repository);
        Self {
            config,
            executor,
            workspace,
        }
    }

    /// Exit code for the process: 0, or the launched application's own code
    pub async fn run(&self, command: &Command) -> Result<i32> {
        tracing::info!(
            dry_run = self.executor.is_simulation(),
            "Running {} in {}",
            command.name(),
            self.workspace.root.display()
        );
        match command {
            Command::Install(opts) => self.install(opts).await,
            Command::Models(opts) => self.models(opts).await.map(|_| 0),
            Command::ScaffoldFrontend(opts) => self.scaffold_frontend(opts).await.map(|_| 0),
            Command::Start(opts) => {
                let env = self.environments(None).locate(&self.workspace)?;
                self.launch(&env, opts).await
            }
        }
    }

    fn environments(&self, python: Option<&str>) -> EnvironmentLifecycleManager<'a> {
        EnvironmentLifecycleManager::new(
            self.executor,
            Interpreter::for_version(python),
            self.config.environment.directory.clone(),
        )
    }

    fn inspector(&self) -> DirectoryStateInspector {
        if self.config.repository.verify_remote {
            DirectoryStateInspector::with_expected_remote(&self.config.repository.url)
        } else {
            DirectoryStateInspector::new()
        }
    }

    async fn install(&self, opts: &InstallOptions) -> Result<i32> {
        check_tools(EXTERNAL_TOOLS);

        let provision =
            RepositoryProvisioner::new(self.executor, self.inspector(), &self.config.repository.url)
                .ensure(&self.workspace, opts.force_merge)
                .await?;

        for dir in self.workspace.auxiliary_dirs() {
            self.executor.apply(Step::create_dir(dir)).await?;
        }

        let mode = if opts.reuse_env {
            EnvMode::Reuse
        } else {
            EnvMode::Recreate
        };
        let env = self
            .environments(opts.python.as_deref())
            .obtain(&self.workspace, mode)
            .await?;

        let packages = PackageInstaller::new(self.executor);
        packages
            .install(&env, &["pip", "setuptools", "wheel"], true, None)
            .await?;
        tracing::info!("Installing runtime build {}", opts.runtime_build.id());
        packages
            .install(
                &env,
                &["torch", "torchvision", "torchaudio"],
                false,
                Some(opts.runtime_build.index_url()),
            )
            .await?;
        packages.install_requirements(&env, &self.workspace).await?;

        if opts.with_addon {
            self.install_addon().await?;
        }

        if let Some(set) = opts.asset_set {
            self.fetch_assets(&env, set, opts.credential.as_ref()).await?;
        }

        tracing::info!("Install complete. Activate with: {}", env.activate_hint());
        if let Some(notice) = provision.review_notice() {
            tracing::warn!("{}", notice);
        }

        match &opts.launch {
            Some(launch) => self.launch(&env, launch).await,
            None => Ok(0),
        }
    }

    async fn install_addon(&self) -> Result<()> {
        let target = self
            .workspace
            .custom_nodes()
            .join(&self.config.repository.addon_dir);
        if target.exists() {
            tracing::info!("Add-on already present at {}", target.display());
            return Ok(());
        }
        let step = Step::process(
            "git",
            [
                "clone".to_string(),
                self.config.repository.addon_url.clone(),
                target.display().to_string(),
            ],
        );
        self.executor.apply(step).await?;
        Ok(())
    }

    /// Fetch into the workspace, creating it and the environment when missing
    async fn models(&self, opts: &ModelsOptions) -> Result<usize> {
        self.executor
            .apply(Step::create_dir(&self.workspace.root))
            .await?;
        let env = self
            .environments(opts.python.as_deref())
            .obtain(&self.workspace, EnvMode::Reuse)
            .await?;
        self.fetch_assets(&env, opts.asset_set, opts.credential.as_ref())
            .await
    }

    async fn fetch_assets(
        &self,
        env: &Environment,
        set: AssetSet,
        credential: Option<&Credential>,
    ) -> Result<usize> {
        let assets =
            AssetDownloadPlanner::new(&self.config.assets.repository, &self.workspace).plan(set);
        tracing::info!("Asset set {} resolves to {} files", set, assets.len());

        let fetcher = AssetFetcher::new(self.executor);
        fetcher.bootstrap(env, credential).await?;
        fetcher.fetch(env, &assets, credential).await
    }

    async fn scaffold_frontend(&self, opts: &FrontendOptions) -> Result<()> {
        let parent = self
            .workspace
            .root
            .parent()
            .map(PathBuf::from)
            .unwrap_or_else(|| self.workspace.root.clone());
        let url = opts
            .url
            .clone()
            .unwrap_or_else(|| format!("http://127.0.0.1:{}", self.config.launch.port));
        FrontendScaffolder::new(self.executor)
            .scaffold(&parent, &opts.name, &url)
            .await?;
        Ok(())
    }

    /// Foreground run; its exit code becomes the command's
    async fn launch(&self, env: &Environment, opts: &LaunchOptions) -> Result<i32> {
        let mut args = vec![
            self.config.launch.entry.clone(),
            "--port".to_string(),
            opts.port.to_string(),
        ];
        if opts.listen_all {
            args.push("--listen".to_string());
        }
        let host = if opts.listen_all { "0.0.0.0" } else { "127.0.0.1" };
        tracing::info!("Starting on http://{}:{}", host, opts.port);

        let step = Step::process(env.python().display().to_string(), args)
            .in_dir(&self.workspace.root)
            .optional();
        let outcome = self.executor.apply(step).await?;
        Ok(outcome.exit_code.unwrap_or(1))
    }
}
