//! Environment lifecycle: create, recreate or reuse the virtualenv.

use crate::domain::{EnvMode, Environment, Step, Workspace};
use crate::error::{AppError, Result};
use crate::services::executor::CommandExecutor;

/// Interpreter used to build new environments
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Interpreter {
    pub program: String,
    pub args: Vec<String>,
}

impl Interpreter {
    /// `python` by default; `python3.11` (POSIX) or `py -3.11` (Windows) when pinned
    pub fn for_version(version: Option<&str>) -> Self {
        match version.map(str::trim).filter(|v| !v.is_empty()) {
            None => Self {
                program: if cfg!(windows) { "py" } else { "python" }.to_string(),
                args: Vec::new(),
            },
            Some(version) if cfg!(windows) => Self {
                program: "py".to_string(),
                args: vec![format!("-{}", version)],
            },
            Some(version) => Self {
                program: format!("python{}", version),
                args: Vec::new(),
            },
        }
    }
}

/// Owns every decision about the environment directory
pub struct EnvironmentLifecycleManager<'a> {
    executor: &'a dyn CommandExecutor,
    interpreter: Interpreter,
    directory: String,
}

impl<'a> EnvironmentLifecycleManager<'a> {
    pub fn new(
        executor: &'a dyn CommandExecutor,
        interpreter: Interpreter,
        directory: impl Into<String>,
    ) -> Self {
        Self {
            executor,
            interpreter,
            directory: directory.into(),
        }
    }

    pub fn expected(&self, workspace: &Workspace) -> Environment {
        Environment::new(workspace.join(&self.directory))
    }

    pub async fn obtain(&self, workspace: &Workspace, mode: EnvMode) -> Result<Environment> {
        let env = self.expected(workspace);
        match mode {
            EnvMode::Reuse if env.exists() => {
                tracing::info!("Environment {} already exists, reusing", env.path.display());
                return Ok(env);
            }
            EnvMode::Reuse => {
                tracing::info!("No environment at {}, building", env.path.display());
            }
            EnvMode::Recreate => {
                if env.path.symlink_metadata().is_ok() {
                    if self.executor.is_simulation() {
                        tracing::info!("Would remove existing environment {}", env.path.display());
                    }
                    self.executor.apply(Step::remove_tree(&env.path)).await?;
                }
            }
        }

        self.build(workspace, &env).await?;
        Ok(env)
    }

    /// Existing environment for commands that must not build one
    pub fn locate(&self, workspace: &Workspace) -> Result<Environment> {
        let env = self.expected(workspace);
        if !env.exists() {
            return Err(AppError::MissingEnvironment(env.path));
        }
        Ok(env)
    }

    async fn build(&self, workspace: &Workspace, env: &Environment) -> Result<()> {
        let mut args = self.interpreter.args.clone();
        args.extend(["-m".to_string(), "venv".to_string(), env.path.display().to_string()]);
        let step = Step::process(self.interpreter.program.clone(), args).in_dir(&workspace.root);
        self.executor.apply(step).await?;
        Ok(())
    }
}

/// Installs packages into an environment with its own pip
pub struct PackageInstaller<'a> {
    executor: &'a dyn CommandExecutor,
}

impl<'a> PackageInstaller<'a> {
    pub fn new(executor: &'a dyn CommandExecutor) -> Self {
        Self { executor }
    }

    pub fn pip_step<I, S>(env: &Environment, args: I) -> Step
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut argv = vec!["-m".to_string(), "pip".to_string()];
        argv.extend(args.into_iter().map(Into::into));
        Step::process(env.python().display().to_string(), argv)
    }

    /// `pip install [-U] <packages> [--index-url <url>]`
    pub async fn install(
        &self,
        env: &Environment,
        packages: &[&str],
        upgrade: bool,
        index_url: Option<&str>,
    ) -> Result<()> {
        let mut args = vec!["install".to_string()];
        if upgrade {
            args.push("-U".to_string());
        }
        args.extend(packages.iter().map(|p| p.to_string()));
        if let Some(url) = index_url {
            args.push("--index-url".to_string());
            args.push(url.to_string());
        }
        self.executor.apply(Self::pip_step(env, args)).await?;
        Ok(())
    }

    /// `pip install -r requirements.txt` inside the workspace
    pub async fn install_requirements(
        &self,
        env: &Environment,
        workspace: &Workspace,
    ) -> Result<()> {
        let step =
            Self::pip_step(env, ["install", "-r", "requirements.txt"]).in_dir(&workspace.root);
        self.executor.apply(step).await?;
        Ok(())
    }
}
