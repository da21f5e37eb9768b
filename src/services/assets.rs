//! Asset download planning and fetching.

use crate::domain::{
    Asset, AssetCategory, AssetSet, Credential, Environment, Step, Workspace, CREDENTIAL_VAR,
};
use crate::error::Result;
use crate::services::environment::PackageInstaller;
use crate::services::executor::CommandExecutor;
use std::collections::HashSet;
use std::path::PathBuf;

const TI2V_5B: &[&str] = &["split_files/diffusion_models/wan2.2_ti2v_5B_fp16.safetensors"];

const T2V_14B: &[&str] = &[
    "split_files/diffusion_models/wan2.2_t2v_high_noise_14B_fp8_scaled.safetensors",
    "split_files/diffusion_models/wan2.2_t2v_low_noise_14B_fp8_scaled.safetensors",
];

const I2V_14B: &[&str] = &[
    "split_files/diffusion_models/wan2.2_i2v_high_noise_14B_fp8_scaled.safetensors",
    "split_files/diffusion_models/wan2.2_i2v_low_noise_14B_fp8_scaled.safetensors",
];

/// Appended to every plan
const VAE: &[&str] = &[
    "split_files/vae/wan_2.1_vae.safetensors",
    "split_files/vae/wan2.2_vae.safetensors",
];

/// Appended to every plan, after the VAE files
const TEXT_ENCODERS: &[&str] =
    &["split_files/text_encoders/umt5_xxl_fp8_e4m3fn_scaled.safetensors"];

/// Maps an asset set to an ordered list of files
pub struct AssetDownloadPlanner {
    repository: String,
    root: PathBuf,
}

impl AssetDownloadPlanner {
    pub fn new(repository: impl Into<String>, workspace: &Workspace) -> Self {
        Self {
            repository: repository.into(),
            root: workspace.root.clone(),
        }
    }

    fn primary(set: AssetSet) -> Vec<&'static str> {
        match set {
            AssetSet::Ti2v5B => TI2V_5B.to_vec(),
            AssetSet::T2v14B => T2V_14B.to_vec(),
            AssetSet::I2v14B => I2V_14B.to_vec(),
            AssetSet::All => [TI2V_5B, T2V_14B, I2V_14B].concat(),
        }
    }

    fn asset(&self, file: &str, category: AssetCategory) -> Asset {
        Asset {
            repository: self.repository.clone(),
            file: file.to_string(),
            destination: self.root.join(category.relative_dir()),
        }
    }

    pub fn plan(&self, set: AssetSet) -> Vec<Asset> {
        let primary = Self::primary(set)
            .into_iter()
            .map(|file| self.asset(file, AssetCategory::Diffusion));
        let secondary = VAE.iter().map(|file| self.asset(file, AssetCategory::Vae));
        let tertiary = TEXT_ENCODERS
            .iter()
            .map(|file| self.asset(file, AssetCategory::TextEncoder));
        primary.chain(secondary).chain(tertiary).collect()
    }

    /// One `CreateDir` before the first fetch into each destination, then
    /// one fetch per asset
    pub fn steps(
        env: &Environment,
        assets: &[Asset],
        credential: Option<&Credential>,
    ) -> Vec<Step> {
        let cli = env.executable("huggingface-cli").display().to_string();
        let mut seen = HashSet::new();
        let mut steps = Vec::with_capacity(assets.len() + 3);

        for asset in assets {
            if seen.insert(asset.destination.clone()) {
                steps.push(Step::create_dir(&asset.destination));
            }
            let mut step = Step::process(
                cli.clone(),
                [
                    "download".to_string(),
                    asset.repository.clone(),
                    asset.file.clone(),
                    "--local-dir".to_string(),
                    asset.destination.display().to_string(),
                ],
            );
            if let Some(cred) = credential {
                step = step.with_env(CREDENTIAL_VAR, cred.expose());
            }
            steps.push(step);
        }
        steps
    }
}

/// Prepares the asset client and runs fetches in plan order
pub struct AssetFetcher<'a> {
    executor: &'a dyn CommandExecutor,
}

impl<'a> AssetFetcher<'a> {
    pub fn new(executor: &'a dyn CommandExecutor) -> Self {
        Self { executor }
    }

    /// Install the client and check or obtain a login
    pub async fn bootstrap(
        &self,
        env: &Environment,
        credential: Option<&Credential>,
    ) -> Result<()> {
        PackageInstaller::new(self.executor)
            .install(env, &["huggingface_hub[cli]"], true, None)
            .await?;

        match credential {
            Some(cred) => {
                let whoami = Step::process(
                    env.python().display().to_string(),
                    ["-m", "huggingface_hub", "whoami"],
                )
                .with_env(CREDENTIAL_VAR, cred.expose())
                .optional();
                let outcome = self.executor.apply(whoami).await?;
                if !outcome.success && !outcome.simulated {
                    tracing::warn!("Credential check failed; gated downloads may be refused");
                }
            }
            None => {
                tracing::info!(
                    "Tip: set {} or pass --token to skip the interactive login",
                    CREDENTIAL_VAR
                );
                let login = Step::process(
                    env.executable("huggingface-cli").display().to_string(),
                    ["login"],
                );
                self.executor.apply(login).await?;
            }
        }
        Ok(())
    }

    pub async fn fetch(
        &self,
        env: &Environment,
        assets: &[Asset],
        credential: Option<&Credential>,
    ) -> Result<usize> {
        tracing::info!("Fetching {} assets", assets.len());
        for step in AssetDownloadPlanner::steps(env, assets, credential) {
            self.executor.apply(step).await?;
        }
        Ok(assets.len())
    }
}
