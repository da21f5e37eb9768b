//! Frontend loader scaffolding.
//!
//! Creates a small Vite + React app that talks to a running ComfyUI.

use crate::domain::Step;
use crate::error::{AppError, Result};
use crate::services::executor::CommandExecutor;
use std::path::{Path, PathBuf};

const APP_TSX: &str = r#"import { useEffect, useState } from "react";
import axios from "axios";

const baseUrl = import.meta.env.VITE_COMFY_BASE_URL as string;

export default function App() {
  const [stats, setStats] = useState<string>("connecting...");

  useEffect(() => {
    axios
      .get(`${baseUrl}/system_stats`)
      .then((res) => setStats(JSON.stringify(res.data, null, 2)))
      .catch((err) => setStats(`unreachable: ${err.message}`));
  }, []);

  return (
    <main>
      <h1>ComfyUI loader</h1>
      <p>Backend: {baseUrl}</p>
      <pre>{stats}</pre>
    </main>
  );
}
"#;

/// Result of a scaffold request
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScaffoldResult {
    Created(PathBuf),
    AlreadyPresent(PathBuf),
}

pub struct FrontendScaffolder<'a> {
    executor: &'a dyn CommandExecutor,
}

impl<'a> FrontendScaffolder<'a> {
    pub fn new(executor: &'a dyn CommandExecutor) -> Self {
        Self { executor }
    }

    /// Scaffold `<parent>/<name>` pointed at `url`; an existing target is left alone
    pub async fn scaffold(&self, parent: &Path, name: &str, url: &str) -> Result<ScaffoldResult> {
        if name.is_empty() || Path::new(name).components().count() != 1 {
            return Err(AppError::configuration(format!(
                "frontend name must be a single directory name, got {:?}",
                name
            )));
        }

        let target = parent.join(name);
        if target.exists() {
            tracing::info!("{} already exists, skipping scaffold", target.display());
            return Ok(ScaffoldResult::AlreadyPresent(target));
        }

        for step in Self::steps(parent, name, url) {
            self.executor.apply(step).await?;
        }
        tracing::info!("Frontend ready: cd {} && npm run dev", target.display());
        Ok(ScaffoldResult::Created(target))
    }

    pub fn steps(parent: &Path, name: &str, url: &str) -> Vec<Step> {
        let target = parent.join(name);
        vec![
            Step::create_dir(parent),
            Step::process(
                "npm",
                ["create", "vite@latest", name, "--", "--template", "react-ts"],
            )
            .in_dir(parent),
            Step::process("npm", ["i"]).in_dir(&target),
            Step::process("npm", ["i", "axios"]).in_dir(&target),
            Step::write_file(target.join(".env"), format!("VITE_COMFY_BASE_URL={}\n", url)),
            Step::write_file(target.join("src").join("App.tsx"), APP_TSX),
        ]
    }
}
