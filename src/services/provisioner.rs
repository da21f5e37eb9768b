//! Repository provisioning: guarantee the workspace holds the source tree.

use crate::domain::{DirectoryState, Step, Workspace};
use crate::error::{AppError, Result};
use crate::services::executor::CommandExecutor;
use crate::services::inspector::DirectoryStateInspector;
use crate::services::promotion::{PromotionMerger, PromotionReport};
use std::path::Path;

/// What `ensure` found and did
#[derive(Debug, Clone)]
pub struct ProvisionReport {
    /// Classification read before any mutation
    pub state: DirectoryState,
    /// Present only when a merge was performed
    pub promotion: Option<PromotionReport>,
}

impl ProvisionReport {
    /// Closing line for an operator when a merge displaced entries
    pub fn review_notice(&self) -> Option<String> {
        let promotion = self.promotion.as_ref().filter(|p| p.review_required())?;
        Some(format!(
            "{}Review required: workspace was {}, {} fetched entr{} merged, {} entr{} moved to {}",
            if promotion.simulated { "[dry run] " } else { "" },
            self.state,
            promotion.promoted.len(),
            plural(promotion.promoted.len()),
            promotion.backed_up.len(),
            plural(promotion.backed_up.len()),
            promotion.backup_dir.display()
        ))
    }
}

fn plural(n: usize) -> &'static str {
    if n == 1 {
        "y"
    } else {
        "ies"
    }
}

/// Brings a workspace into the recognized-repository state
pub struct RepositoryProvisioner<'a> {
    executor: &'a dyn CommandExecutor,
    inspector: DirectoryStateInspector,
    url: String,
}

impl<'a> RepositoryProvisioner<'a> {
    pub fn new(
        executor: &'a dyn CommandExecutor,
        inspector: DirectoryStateInspector,
        url: impl Into<String>,
    ) -> Self {
        Self {
            executor,
            inspector,
            url: url.into(),
        }
    }

    pub async fn ensure(
        &self,
        workspace: &Workspace,
        merge_allowed: bool,
    ) -> Result<ProvisionReport> {
        let root = &workspace.root;
        let state = self.inspector.classify(root);
        tracing::info!("Workspace {} is {}", root.display(), state);

        let promotion = match state {
            DirectoryState::Absent => {
                self.executor.apply(Step::create_dir(root)).await?;
                self.clone_into(root).await?;
                None
            }
            DirectoryState::Empty => {
                self.clone_into(root).await?;
                None
            }
            DirectoryState::RecognizedRepo => {
                self.update(root).await?;
                None
            }
            DirectoryState::ForeignNonEmpty if !merge_allowed => {
                return Err(AppError::StateConflict {
                    path: root.clone(),
                    reason: format!(
                        "directory is not empty and is not a clone of {}. Move its contents \
                         elsewhere, or re-run with --force-merge to back up conflicting \
                         entries into {} and merge the fetched tree",
                        self.url, workspace.backup_dir
                    ),
                });
            }
            DirectoryState::ForeignNonEmpty => Some(self.merge(workspace).await?),
        };

        Ok(ProvisionReport { state, promotion })
    }

    async fn clone_into(&self, dest: &Path) -> Result<()> {
        let step = Step::process(
            "git",
            ["clone".to_string(), self.url.clone(), dest.display().to_string()],
        );
        self.executor.apply(step).await?;
        Ok(())
    }

    /// Fast-forward only; diverged history fails instead of being overwritten
    async fn update(&self, root: &Path) -> Result<()> {
        tracing::info!("Already cloned, pulling latest (fast-forward only)");
        let step = Step::process("git", ["pull", "--ff-only"]).in_dir(root);
        match self.executor.apply(step).await {
            Err(err @ AppError::Execution { .. }) => {
                tracing::error!(
                    "Update of {} was refused. Local history may have diverged from the \
                     remote; reconcile it manually (nothing was overwritten)",
                    root.display()
                );
                Err(err)
            }
            other => other.map(|_| ()),
        }
    }

    async fn merge(&self, workspace: &Workspace) -> Result<PromotionReport> {
        let temp = workspace.temp_path();
        tracing::info!("Merging into occupied workspace via {}", temp.display());
        // Leftover from an interrupted merge
        if temp.symlink_metadata().is_ok() {
            self.executor.apply(Step::remove_tree(&temp)).await?;
        }
        self.clone_into(&temp).await?;

        PromotionMerger::new(self.executor)
            .promote(
                &temp,
                &workspace.root,
                &workspace.whitelist,
                &workspace.backup_path(),
            )
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RepositoryConfig;
    use crate::services::executor::DryRunExecutor;
    use crate::services::testing::ScriptedExecutor;
    use std::fs;
    use std::path::PathBuf;
    use tempfile::TempDir;

    const URL: &str = "https://github.com/comfyanonymous/ComfyUI.git";

    fn workspace(root: PathBuf) -> Workspace {
        Workspace::new(root, &RepositoryConfig::default())
    }

    fn provisioner(exec: &dyn CommandExecutor) -> RepositoryProvisioner<'_> {
        RepositoryProvisioner::new(exec, DirectoryStateInspector::new(), URL)
    }

    #[tokio::test]
    async fn test_absent_creates_then_clones() {
        let temp = TempDir::new().unwrap();
        let ws = workspace(temp.path().join("ws"));
        let exec = DryRunExecutor::new();

        let report = provisioner(&exec).ensure(&ws, false).await.unwrap();

        assert_eq!(report.state, DirectoryState::Absent);
        assert!(report.review_notice().is_none());
        let root = ws.root.display().to_string();
        let argv: Vec<Vec<String>> = exec.transcript().into_iter().map(|r| r.argv).collect();
        assert_eq!(argv[0], vec!["mkdir", "-p", root.as_str()]);
        assert_eq!(argv[1], vec!["git", "clone", URL, root.as_str()]);
        assert!(!ws.root.exists());
    }

    #[tokio::test]
    async fn test_recognized_repo_pulls() {
        let temp = TempDir::new().unwrap();
        fs::create_dir(temp.path().join(".git")).unwrap();
        let ws = workspace(temp.path().to_path_buf());
        let exec = DryRunExecutor::new();

        provisioner(&exec).ensure(&ws, false).await.unwrap();

        let transcript = exec.transcript();
        assert_eq!(transcript.len(), 1);
        assert_eq!(transcript[0].argv, vec!["git", "pull", "--ff-only"]);
        assert_eq!(transcript[0].cwd.as_deref(), Some(temp.path()));
    }

    #[tokio::test]
    async fn test_foreign_without_merge_is_conflict_without_mutation() {
        let temp = TempDir::new().unwrap();
        fs::write(temp.path().join("notes.txt"), "mine").unwrap();
        let ws = workspace(temp.path().to_path_buf());
        let exec = ScriptedExecutor::new();

        let err = provisioner(&exec).ensure(&ws, false).await.unwrap_err();

        assert!(matches!(err, AppError::StateConflict { .. }));
        assert!(err.to_string().contains("--force-merge"));
        assert!(exec.recorded().is_empty());
        assert_eq!(fs::read_to_string(temp.path().join("notes.txt")).unwrap(), "mine");
    }

    #[tokio::test]
    async fn test_foreign_with_merge_promotes_fetched_tree() {
        let temp = TempDir::new().unwrap();
        fs::write(temp.path().join("notes.txt"), "mine").unwrap();
        // Stale temp from an interrupted run
        fs::create_dir_all(temp.path().join(".promote-tmp/junk")).unwrap();
        let ws = workspace(temp.path().to_path_buf());
        let exec = ScriptedExecutor::new();

        let report = provisioner(&exec).ensure(&ws, true).await.unwrap();

        assert_eq!(report.state, DirectoryState::ForeignNonEmpty);
        let promotion = report.promotion.as_ref().unwrap();
        assert!(promotion.review_required());
        let notice = report.review_notice().unwrap();
        assert!(notice.starts_with("Review required: workspace was foreign non-empty directory"));
        assert!(notice.contains("4 fetched entries merged, 1 entry moved to"));
        assert!(notice.ends_with(".promote-backup"));
        assert!(temp.path().join(".git").is_dir());
        assert!(temp.path().join("main.py").is_file());
        assert!(!temp.path().join("junk").exists());
        assert_eq!(
            fs::read_to_string(temp.path().join(".promote-backup/notes.txt")).unwrap(),
            "mine"
        );
        assert!(!temp.path().join(".promote-tmp").exists());
    }

    #[tokio::test]
    async fn test_diverged_update_fails_fast() {
        let temp = TempDir::new().unwrap();
        fs::create_dir(temp.path().join(".git")).unwrap();
        fs::write(temp.path().join("local-edit.py"), "keep").unwrap();
        let ws = workspace(temp.path().to_path_buf());
        let exec = ScriptedExecutor::new().fail_when("pull", 128);

        let err = provisioner(&exec).ensure(&ws, false).await.unwrap_err();

        match err {
            AppError::Execution { argv, exit_code } => {
                assert_eq!(argv, vec!["git", "pull", "--ff-only"]);
                assert_eq!(exit_code, Some(128));
            }
            other => panic!("unexpected error: {other}"),
        }
        assert_eq!(fs::read_to_string(temp.path().join("local-edit.py")).unwrap(), "keep");
        assert_eq!(exec.recorded().len(), 1);
    }
}
