//! Asset sets and planned asset fetches.

use crate::error::AppError;
use std::path::PathBuf;
use std::str::FromStr;

/// Named selection of primary model files
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssetSet {
    /// Text/image-to-video 5B
    Ti2v5B,
    /// Text-to-video 14B
    T2v14B,
    /// Image-to-video 14B
    I2v14B,
    /// Every primary set, in order
    All,
}

impl AssetSet {
    pub fn token(&self) -> &'static str {
        match self {
            Self::Ti2v5B => "5b",
            Self::T2v14B => "14b",
            Self::I2v14B => "i2v",
            Self::All => "all",
        }
    }
}

impl FromStr for AssetSet {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "a" | "5b" => Ok(Self::Ti2v5B),
            "b" | "14b" => Ok(Self::T2v14B),
            "c" | "i2v" => Ok(Self::I2v14B),
            "all" => Ok(Self::All),
            other => Err(AppError::configuration(format!(
                "unknown asset set {:?}; expected one of A|5b, B|14b, C|i2v, All",
                other
            ))),
        }
    }
}

impl std::fmt::Display for AssetSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.token())
    }
}

/// Destination category of an asset
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AssetCategory {
    Diffusion,
    Vae,
    TextEncoder,
}

impl AssetCategory {
    /// Directory relative to the workspace
    pub fn relative_dir(&self) -> &'static str {
        match self {
            Self::Diffusion => "models/diffusion_models",
            Self::Vae => "models/vae",
            Self::TextEncoder => "models/text_encoders",
        }
    }
}

/// One file to fetch; immutable once planned
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Asset {
    /// Remote repository id
    pub repository: String,
    /// File path inside the repository
    pub file: String,
    pub destination: PathBuf,
}
