//! Workspace entity and directory classification.

use crate::config::RepositoryConfig;
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

/// Source-control marker left behind by a successful fetch
pub const REPO_MARKER: &str = ".git";

/// Asset and add-on directories ensured under every workspace
pub const AUXILIARY_DIRS: &[&str] = &[
    "models/diffusion_models",
    "models/vae",
    "models/text_encoders",
    "custom_nodes",
];

/// State of a target directory, read from the filesystem at call time
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DirectoryState {
    /// Path does not exist
    Absent,
    /// Path exists with no entries
    Empty,
    /// Path holds the source-control marker from a prior fetch
    RecognizedRepo,
    /// Non-empty without the marker, or not fully readable
    ForeignNonEmpty,
}

impl DirectoryState {
    pub fn description(&self) -> &'static str {
        match self {
            Self::Absent => "absent",
            Self::Empty => "empty",
            Self::RecognizedRepo => "recognized repository",
            Self::ForeignNonEmpty => "foreign non-empty directory",
        }
    }
}

impl std::fmt::Display for DirectoryState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.description())
    }
}

/// The installation target and its merge policy
#[derive(Debug, Clone)]
pub struct Workspace {
    /// Workspace root path
    pub root: PathBuf,
    /// Names promotion never relocates or overwrites
    pub whitelist: BTreeSet<String>,
    /// Name of the isolated fetch directory used by merges
    pub temp_dir: String,
    /// Name of the directory receiving displaced entries
    pub backup_dir: String,
}

impl Workspace {
    pub fn new(root: PathBuf, repo: &RepositoryConfig) -> Self {
        Self {
            root,
            whitelist: repo.whitelist.iter().cloned().collect(),
            temp_dir: repo.temp_dir.clone(),
            backup_dir: repo.backup_dir.clone(),
        }
    }

    pub fn temp_path(&self) -> PathBuf {
        self.root.join(&self.temp_dir)
    }

    pub fn backup_path(&self) -> PathBuf {
        self.root.join(&self.backup_dir)
    }

    /// Paths of the auxiliary directories, in creation order
    pub fn auxiliary_dirs(&self) -> Vec<PathBuf> {
        AUXILIARY_DIRS.iter().map(|rel| self.join(rel)).collect()
    }

    pub fn custom_nodes(&self) -> PathBuf {
        self.root.join("custom_nodes")
    }

    pub fn join(&self, rel: impl AsRef<Path>) -> PathBuf {
        self.root.join(rel)
    }
}
