//! Promotion of a freshly fetched tree into an occupied workspace.
//!
//! The merge is computed up front as a [`PromotionPlan`] of intents; the
//! same plan drives dry-run logging and real execution.

use crate::domain::Step;
use crate::error::{AppError, Result};
use crate::services::executor::CommandExecutor;
use std::collections::BTreeSet;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

/// A single move/delete intent
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PromotionIntent {
    /// Create the backup directory before the first backup
    CreateBackupDir(PathBuf),
    /// Relocate a non-whitelisted base entry into the backup directory
    Backup {
        name: String,
        from: PathBuf,
        to: PathBuf,
        /// A previous backup of the same name is replaced wholesale
        replaces: bool,
    },
    /// Relocate a fetched entry into the base
    Promote {
        name: String,
        from: PathBuf,
        to: PathBuf,
        /// A same-named base entry is removed first
        replaces: bool,
    },
    /// Leave a protected base entry untouched
    Skip { name: String },
    /// Remove the temp directory and anything left in it
    RemoveTemp(PathBuf),
}

impl PromotionIntent {
    /// Steps realizing this intent, in order
    pub fn steps(&self) -> Vec<Step> {
        match self {
            Self::CreateBackupDir(path) => vec![Step::create_dir(path)],
            Self::Backup { from, to, replaces, .. } | Self::Promote { from, to, replaces, .. } => {
                let mut steps = Vec::with_capacity(2);
                if *replaces {
                    steps.push(Step::remove_tree(to));
                }
                steps.push(Step::move_entry(from, to));
                steps
            }
            Self::Skip { .. } => Vec::new(),
            Self::RemoveTemp(path) => vec![Step::remove_tree(path)],
        }
    }

    /// One-line description relative to the base directory
    pub fn describe(&self) -> String {
        match self {
            Self::CreateBackupDir(path) => format!("create backup dir {}", file_name(path)),
            Self::Backup { name, replaces, .. } => {
                if *replaces {
                    format!("backup {} (replacing previous backup)", name)
                } else {
                    format!("backup {}", name)
                }
            }
            Self::Promote { name, replaces, .. } => {
                if *replaces {
                    format!("promote {} (replacing existing)", name)
                } else {
                    format!("promote {}", name)
                }
            }
            Self::Skip { name } => format!("skip {} (protected)", name),
            Self::RemoveTemp(path) => format!("remove {}", file_name(path)),
        }
    }
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| path.display().to_string())
}

/// Ordered intents computed before any mutation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromotionPlan {
    pub intents: Vec<PromotionIntent>,
    pub backup_dir: PathBuf,
}

impl PromotionPlan {
    /// Compute the merge of `temp` into `base`.
    ///
    /// `temp` and `backup_dir` are never backed up or overwritten, in
    /// addition to every whitelisted name. A missing `temp` contributes
    /// no entries (the dry-run case, where nothing was fetched).
    pub fn compute(
        temp: &Path,
        base: &Path,
        whitelist: &BTreeSet<String>,
        backup_dir: &Path,
    ) -> Result<Self> {
        let reserved: BTreeSet<String> = [temp, backup_dir]
            .iter()
            .filter(|p| p.parent() == Some(base))
            .filter_map(|p| p.file_name())
            .map(|n| n.to_string_lossy().to_string())
            .collect();

        let base_entries = list_names(base)?;
        let temp_entries = list_names(temp)?;
        let backup_exists = backup_dir.exists();

        let mut intents = Vec::new();
        // Names still present in base once backups are done
        let mut occupied: BTreeSet<String> = BTreeSet::new();
        let mut backup_created = backup_exists;

        for name in base_entries {
            if whitelist.contains(&name) || reserved.contains(&name) {
                occupied.insert(name);
                continue;
            }
            if !backup_created {
                intents.push(PromotionIntent::CreateBackupDir(backup_dir.to_path_buf()));
                backup_created = true;
            }
            let to = backup_dir.join(&name);
            let replaces = backup_exists && to.symlink_metadata().is_ok();
            intents.push(PromotionIntent::Backup {
                from: base.join(&name),
                to,
                replaces,
                name,
            });
        }

        for name in temp_entries {
            if reserved.contains(&name) || (whitelist.contains(&name) && occupied.contains(&name))
            {
                intents.push(PromotionIntent::Skip { name });
                continue;
            }
            intents.push(PromotionIntent::Promote {
                from: temp.join(&name),
                to: base.join(&name),
                replaces: occupied.contains(&name),
                name,
            });
        }

        intents.push(PromotionIntent::RemoveTemp(temp.to_path_buf()));

        Ok(Self {
            intents,
            backup_dir: backup_dir.to_path_buf(),
        })
    }

    pub fn steps(&self) -> Vec<Step> {
        self.intents.iter().flat_map(PromotionIntent::steps).collect()
    }

    /// Human-readable plan, one intent per line
    pub fn render(&self) -> String {
        self.intents
            .iter()
            .map(PromotionIntent::describe)
            .collect::<Vec<_>>()
            .join("\n")
    }

    pub fn report(&self, simulated: bool) -> PromotionReport {
        let mut report = PromotionReport {
            backup_dir: self.backup_dir.clone(),
            simulated,
            ..PromotionReport::default()
        };
        for intent in &self.intents {
            match intent {
                PromotionIntent::Backup { name, .. } => report.backed_up.push(name.clone()),
                PromotionIntent::Promote { name, .. } => report.promoted.push(name.clone()),
                PromotionIntent::Skip { name } => report.skipped.push(name.clone()),
                _ => {}
            }
        }
        report
    }
}

fn list_names(dir: &Path) -> Result<Vec<String>> {
    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(AppError::filesystem("list", dir, e)),
    };
    let mut names = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|e| AppError::filesystem("list", dir, e))?;
        names.push(entry.file_name().to_string_lossy().to_string());
    }
    names.sort();
    Ok(names)
}

/// What a promotion did (or would do, under dry-run)
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PromotionReport {
    pub backed_up: Vec<String>,
    pub promoted: Vec<String>,
    pub skipped: Vec<String>,
    pub backup_dir: PathBuf,
    pub simulated: bool,
}

impl PromotionReport {
    /// Displaced files need an operator's attention
    pub fn review_required(&self) -> bool {
        !self.backed_up.is_empty()
    }
}

/// Folds a fetched tree into an occupied directory
pub struct PromotionMerger<'a> {
    executor: &'a dyn CommandExecutor,
}

impl<'a> PromotionMerger<'a> {
    pub fn new(executor: &'a dyn CommandExecutor) -> Self {
        Self { executor }
    }

    pub async fn promote(
        &self,
        temp: &Path,
        base: &Path,
        whitelist: &BTreeSet<String>,
        backup_dir: &Path,
    ) -> Result<PromotionReport> {
        let plan = PromotionPlan::compute(temp, base, whitelist, backup_dir)?;
        tracing::info!(
            "Promotion plan for {} ({} intents):",
            base.display(),
            plan.intents.len()
        );
        for intent in &plan.intents {
            tracing::info!("  {}", intent.describe());
        }

        for step in plan.steps() {
            self.executor.apply(step).await?;
        }

        let report = plan.report(self.executor.is_simulation());
        if report.review_required() {
            tracing::warn!(
                "Review required: {} entr{} moved to {}",
                report.backed_up.len(),
                if report.backed_up.len() == 1 { "y" } else { "ies" },
                report.backup_dir.display()
            );
        }
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::executor::{DryRunExecutor, SystemExecutor};
    use tempfile::TempDir;

    fn whitelist() -> BTreeSet<String> {
        ["models", "custom_nodes", ".venv"]
            .into_iter()
            .map(String::from)
            .collect()
    }

    /// base: notes.txt, scripts/run.sh, models/keep.bin, main.py (stale)
    /// temp: .git/HEAD, main.py, models/README, requirements.txt
    fn fixture() -> (TempDir, PathBuf, PathBuf, PathBuf) {
        let root = TempDir::new().unwrap();
        let base = root.path().join("ws");
        let temp = base.join(".promote-tmp");
        let backup = base.join(".promote-backup");

        fs::create_dir_all(base.join("scripts")).unwrap();
        fs::create_dir_all(base.join("models")).unwrap();
        fs::write(base.join("notes.txt"), "operator notes").unwrap();
        fs::write(base.join("scripts/run.sh"), "#!/bin/sh").unwrap();
        fs::write(base.join("models/keep.bin"), "weights").unwrap();
        fs::write(base.join("main.py"), "old").unwrap();

        fs::create_dir_all(temp.join(".git")).unwrap();
        fs::create_dir_all(temp.join("models")).unwrap();
        fs::write(temp.join(".git/HEAD"), "ref: refs/heads/master").unwrap();
        fs::write(temp.join("main.py"), "new").unwrap();
        fs::write(temp.join("models/README"), "put models here").unwrap();
        fs::write(temp.join("requirements.txt"), "torch").unwrap();

        (root, base, temp, backup)
    }

    #[test]
    fn test_plan_render() {
        let (_root, base, temp, backup) = fixture();
        let plan = PromotionPlan::compute(&temp, &base, &whitelist(), &backup).unwrap();

        insta::assert_snapshot!(plan.render(), @r"
        create backup dir .promote-backup
        backup main.py
        backup notes.txt
        backup scripts
        promote .git
        promote main.py
        skip models (protected)
        promote requirements.txt
        remove .promote-tmp
        ");
    }

    #[test]
    fn test_compute_does_not_mutate() {
        let (_root, base, temp, backup) = fixture();
        PromotionPlan::compute(&temp, &base, &whitelist(), &backup).unwrap();
        assert!(!backup.exists());
        assert!(base.join("notes.txt").exists());
        assert!(temp.join("main.py").exists());
    }

    #[tokio::test]
    async fn test_promote_preserves_whitelist_and_backs_up() {
        let (_root, base, temp, backup) = fixture();
        let exec = SystemExecutor::new();

        let report = PromotionMerger::new(&exec)
            .promote(&temp, &base, &whitelist(), &backup)
            .await
            .unwrap();

        // Whitelisted content unchanged, fetched copy discarded
        assert_eq!(fs::read_to_string(base.join("models/keep.bin")).unwrap(), "weights");
        assert!(!base.join("models/README").exists());

        // Every displaced entry is in the backup, byte for byte
        assert_eq!(fs::read_to_string(backup.join("notes.txt")).unwrap(), "operator notes");
        assert_eq!(fs::read_to_string(backup.join("scripts/run.sh")).unwrap(), "#!/bin/sh");
        assert_eq!(fs::read_to_string(backup.join("main.py")).unwrap(), "old");

        // Fetched tree promoted, temp gone
        assert!(base.join(".git/HEAD").exists());
        assert_eq!(fs::read_to_string(base.join("main.py")).unwrap(), "new");
        assert!(base.join("requirements.txt").exists());
        assert!(!temp.exists());

        assert!(report.review_required());
        assert_eq!(report.backed_up, vec!["main.py", "notes.txt", "scripts"]);
        assert_eq!(report.skipped, vec!["models"]);
        assert!(!report.simulated);
    }

    #[tokio::test]
    async fn test_existing_backup_is_replaced_wholesale() {
        let (_root, base, temp, backup) = fixture();
        fs::create_dir_all(backup.join("scripts")).unwrap();
        fs::write(backup.join("scripts/stale.sh"), "stale").unwrap();
        fs::write(backup.join("notes.txt"), "older notes").unwrap();

        let plan = PromotionPlan::compute(&temp, &base, &whitelist(), &backup).unwrap();
        assert!(!plan
            .intents
            .iter()
            .any(|i| matches!(i, PromotionIntent::CreateBackupDir(_))));

        let exec = SystemExecutor::new();
        PromotionMerger::new(&exec)
            .promote(&temp, &base, &whitelist(), &backup)
            .await
            .unwrap();

        assert_eq!(fs::read_to_string(backup.join("notes.txt")).unwrap(), "operator notes");
        assert!(backup.join("scripts/run.sh").exists());
        assert!(!backup.join("scripts/stale.sh").exists());
    }

    #[tokio::test]
    async fn test_dry_run_promotion_changes_nothing() {
        let (_root, base, temp, backup) = fixture();
        let exec = DryRunExecutor::new();

        let report = PromotionMerger::new(&exec)
            .promote(&temp, &base, &whitelist(), &backup)
            .await
            .unwrap();

        assert!(report.simulated);
        assert!(report.review_required());
        assert!(!backup.exists());
        assert!(temp.join("main.py").exists());
        assert_eq!(fs::read_to_string(base.join("main.py")).unwrap(), "old");

        let plan = PromotionPlan::compute(&temp, &base, &whitelist(), &backup).unwrap();
        let planned: Vec<Vec<String>> = plan.steps().iter().map(Step::argv).collect();
        let logged: Vec<Vec<String>> = exec.transcript().into_iter().map(|r| r.argv).collect();
        assert_eq!(planned, logged);
    }

    #[tokio::test]
    async fn test_no_conflicts_means_no_backup_dir() {
        let root = TempDir::new().unwrap();
        let base = root.path().join("ws");
        let temp = base.join(".promote-tmp");
        let backup = base.join(".promote-backup");
        fs::create_dir_all(base.join("models")).unwrap();
        fs::create_dir_all(&temp).unwrap();
        fs::write(temp.join("main.py"), "new").unwrap();

        let exec = SystemExecutor::new();
        let report = PromotionMerger::new(&exec)
            .promote(&temp, &base, &whitelist(), &backup)
            .await
            .unwrap();

        assert!(!report.review_required());
        assert!(!backup.exists());
        assert!(base.join("main.py").exists());
    }
}
