//! Configuration management for comfy-stack.
//!
//! Supports layered configuration: defaults → user → workspace → env

use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Workspace-local override file, read only when present
pub const WORKSPACE_CONFIG_FILE: &str = ".comfy-stack.toml";

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProvisionConfig {
    #[serde(default)]
    pub repository: RepositoryConfig,
    #[serde(default)]
    pub environment: EnvironmentConfig,
    #[serde(default)]
    pub assets: AssetsConfig,
    #[serde(default)]
    pub launch: LaunchConfig,
    #[serde(default)]
    pub frontend: FrontendConfig,
}

impl ProvisionConfig {
    /// Load configuration with hierarchy: defaults → user → workspace → env
    pub fn load(workspace: Option<&Path>) -> Result<Self, ConfigError> {
        use config::{Config, Environment, File};

        let mut builder = Config::builder();

        builder = builder.add_source(
            config::File::from_str(
                include_str!("../default_config.toml"),
                config::FileFormat::Toml,
            )
            .required(false),
        );

        if let Some(dirs) = directories::ProjectDirs::from("com", "comfy-stack", "comfy-stack") {
            let user_config = dirs.config_dir().join("config.toml");
            if user_config.exists() {
                builder = builder.add_source(File::from(user_config).required(false));
            }
        }

        if let Some(root) = workspace {
            let workspace_config = root.join(WORKSPACE_CONFIG_FILE);
            if workspace_config.is_file() {
                builder = builder.add_source(File::from(workspace_config).required(false));
            }
        }

        // COMFY_STACK__LAUNCH__PORT=9000 and friends
        builder = builder.add_source(
            Environment::with_prefix("COMFY_STACK")
                .separator("__")
                .try_parsing(true),
        );

        let config: Self = builder
            .build()
            .map_err(|e| ConfigError::Parse(e.to_string()))?
            .try_deserialize()
            .map_err(|e| ConfigError::Parse(e.to_string()))?;

        config.validate()?;
        Ok(config)
    }

    /// Reject values that would make the merge path unsafe
    pub fn validate(&self) -> Result<(), ConfigError> {
        let repo = &self.repository;
        for (key, name) in [("temp_dir", &repo.temp_dir), ("backup_dir", &repo.backup_dir)] {
            if !is_plain_name(name) {
                return Err(ConfigError::Invalid(format!(
                    "repository.{} must be a single directory name, got {:?}",
                    key, name
                )));
            }
        }
        if repo.temp_dir == repo.backup_dir {
            return Err(ConfigError::Invalid(
                "repository.temp_dir and repository.backup_dir must differ".to_string(),
            ));
        }
        if repo.whitelist.iter().any(|name| !is_plain_name(name)) {
            return Err(ConfigError::Invalid(
                "repository.whitelist entries must be single names".to_string(),
            ));
        }
        if !is_plain_name(&self.environment.directory) {
            return Err(ConfigError::Invalid(
                "environment.directory must be a single directory name".to_string(),
            ));
        }
        Ok(())
    }
}

fn is_plain_name(name: &str) -> bool {
    let path = Path::new(name);
    !name.is_empty()
        && name != "."
        && name != ".."
        && path.components().count() == 1
        && path.file_name().is_some()
}

/// Default workspace root: `~/ComfyStack/ComfyUI`
pub fn default_workspace() -> PathBuf {
    let home = directories::BaseDirs::new()
        .map(|dirs| dirs.home_dir().to_path_buf())
        .unwrap_or_else(|| PathBuf::from("."));
    home.join("ComfyStack").join("ComfyUI")
}

/// Source-tree locations and merge policy
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RepositoryConfig {
    #[serde(default = "default_repository_url")]
    pub url: String,
    #[serde(default = "default_addon_url")]
    pub addon_url: String,
    /// Directory name of the add-on under `custom_nodes`
    #[serde(default = "default_addon_dir")]
    pub addon_dir: String,
    #[serde(default = "default_temp_dir")]
    pub temp_dir: String,
    #[serde(default = "default_backup_dir")]
    pub backup_dir: String,
    /// Names promotion never moves, deletes or overwrites
    #[serde(default = "default_whitelist")]
    pub whitelist: Vec<String>,
    /// Treat a clone of a different remote as foreign content
    #[serde(default)]
    pub verify_remote: bool,
}

impl Default for RepositoryConfig {
    fn default() -> Self {
        Self {
            url: default_repository_url(),
            addon_url: default_addon_url(),
            addon_dir: default_addon_dir(),
            temp_dir: default_temp_dir(),
            backup_dir: default_backup_dir(),
            whitelist: default_whitelist(),
            verify_remote: false,
        }
    }
}

fn default_repository_url() -> String {
    "https://github.com/comfyanonymous/ComfyUI.git".to_string()
}

fn default_addon_url() -> String {
    "https://github.com/Comfy-Org/ComfyUI-Manager.git".to_string()
}

fn default_addon_dir() -> String {
    "ComfyUI-Manager".to_string()
}

fn default_temp_dir() -> String {
    ".promote-tmp".to_string()
}

fn default_backup_dir() -> String {
    ".promote-backup".to_string()
}

fn default_whitelist() -> Vec<String> {
    [".venv", "models", "custom_nodes", "input", "output", "user"]
        .into_iter()
        .map(String::from)
        .collect()
}

/// Isolated runtime environment settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnvironmentConfig {
    /// Environment directory, relative to the workspace
    #[serde(default = "default_environment_directory")]
    pub directory: String,
}

impl Default for EnvironmentConfig {
    fn default() -> Self {
        Self {
            directory: default_environment_directory(),
        }
    }
}

fn default_environment_directory() -> String {
    ".venv".to_string()
}

/// Asset download settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssetsConfig {
    /// Hugging Face repository holding every asset
    #[serde(default = "default_asset_repository")]
    pub repository: String,
}

impl Default for AssetsConfig {
    fn default() -> Self {
        Self {
            repository: default_asset_repository(),
        }
    }
}

fn default_asset_repository() -> String {
    "Comfy-Org/Wan_2.2_ComfyUI_Repackaged".to_string()
}

/// Application launch settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LaunchConfig {
    #[serde(default = "default_port")]
    pub port: u16,
    /// Entry script, relative to the workspace
    #[serde(default = "default_entry")]
    pub entry: String,
}

impl Default for LaunchConfig {
    fn default() -> Self {
        Self {
            port: default_port(),
            entry: default_entry(),
        }
    }
}

fn default_port() -> u16 {
    8188
}

fn default_entry() -> String {
    "main.py".to_string()
}

/// Frontend scaffolding settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FrontendConfig {
    #[serde(default = "default_frontend_name")]
    pub name: String,
}

impl Default for FrontendConfig {
    fn default() -> Self {
        Self {
            name: default_frontend_name(),
        }
    }
}

fn default_frontend_name() -> String {
    "comfy-loader".to_string()
}
