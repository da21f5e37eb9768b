//! Directory state inspection.
//!
//! Classification reads the filesystem and never writes to it.

use crate::domain::{DirectoryState, REPO_MARKER};
use regex::Regex;
use std::fs;
use std::path::Path;
use std::sync::OnceLock;

/// Classifies a target directory into one of four states
#[derive(Debug, Clone, Default)]
pub struct DirectoryStateInspector {
    /// When set, a clone whose origin differs is treated as foreign
    expected_remote: Option<String>,
}

impl DirectoryStateInspector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_expected_remote(url: impl Into<String>) -> Self {
        Self {
            expected_remote: Some(url.into()),
        }
    }

    pub fn classify(&self, path: &Path) -> DirectoryState {
        match path.try_exists() {
            Ok(false) => return DirectoryState::Absent,
            Ok(true) => {}
            Err(e) => {
                tracing::debug!("Cannot stat {}: {}", path.display(), e);
                return DirectoryState::ForeignNonEmpty;
            }
        }

        // Unreadable means foreign, never empty
        let mut entries = match fs::read_dir(path) {
            Ok(entries) => entries,
            Err(e) => {
                tracing::debug!("Cannot list {}: {}", path.display(), e);
                return DirectoryState::ForeignNonEmpty;
            }
        };
        match entries.next() {
            None => return DirectoryState::Empty,
            Some(Err(e)) => {
                tracing::debug!("Cannot read entry in {}: {}", path.display(), e);
                return DirectoryState::ForeignNonEmpty;
            }
            Some(Ok(_)) => {}
        }

        if !path.join(REPO_MARKER).exists() {
            return DirectoryState::ForeignNonEmpty;
        }

        match &self.expected_remote {
            None => DirectoryState::RecognizedRepo,
            Some(expected) => {
                let origin = fs::read_to_string(path.join(REPO_MARKER).join("config"))
                    .ok()
                    .and_then(|text| origin_url(&text));
                match origin {
                    Some(url) if same_remote(&url, expected) => DirectoryState::RecognizedRepo,
                    other => {
                        tracing::warn!(
                            "{} is a clone of {:?}, expected {}",
                            path.display(),
                            other,
                            expected
                        );
                        DirectoryState::ForeignNonEmpty
                    }
                }
            }
        }
    }
}

/// `url` of the `origin` remote in a git config file
pub fn origin_url(config_text: &str) -> Option<String> {
    static SECTION: OnceLock<Regex> = OnceLock::new();
    static URL: OnceLock<Regex> = OnceLock::new();
    let section = SECTION.get_or_init(|| {
        Regex::new(r#"^\s*\[\s*([A-Za-z]+)(?:\s+"([^"]*)")?\s*\]"#).expect("valid regex")
    });
    let url = URL.get_or_init(|| Regex::new(r"^\s*url\s*=\s*(.+?)\s*$").expect("valid regex"));

    let mut in_origin = false;
    for line in config_text.lines() {
        if let Some(caps) = section.captures(line) {
            in_origin = &caps[1] == "remote" && caps.get(2).map(|m| m.as_str()) == Some("origin");
            continue;
        }
        if in_origin {
            if let Some(caps) = url.captures(line) {
                return Some(caps[1].to_string());
            }
        }
    }
    None
}

fn same_remote(a: &str, b: &str) -> bool {
    fn normalize(url: &str) -> String {
        let url = url.trim().trim_end_matches('/');
        url.strip_suffix(".git").unwrap_or(url).to_ascii_lowercase()
    }
    normalize(a) == normalize(b)
}
