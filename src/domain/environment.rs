//! Isolated runtime environment entity and runtime build selection.

use crate::error::AppError;
use std::path::PathBuf;
use std::str::FromStr;

/// Directory holding executables inside a virtualenv
pub fn bin_dir_name() -> &'static str {
    if cfg!(windows) {
        "Scripts"
    } else {
        "bin"
    }
}

/// Executable file name on the current platform
pub fn executable_name(name: &str) -> String {
    if cfg!(windows) {
        format!("{}.exe", name)
    } else {
        name.to_string()
    }
}

/// A virtualenv nested under the workspace
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Environment {
    pub path: PathBuf,
}

impl Environment {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    pub fn bin_dir(&self) -> PathBuf {
        self.path.join(bin_dir_name())
    }

    pub fn executable(&self, name: &str) -> PathBuf {
        self.bin_dir().join(executable_name(name))
    }

    pub fn python(&self) -> PathBuf {
        self.executable("python")
    }

    /// Binary whose presence means the environment exists
    pub fn marker(&self) -> PathBuf {
        self.python()
    }

    pub fn exists(&self) -> bool {
        self.marker().is_file()
    }

    /// Operator hint for activating the environment in a shell
    pub fn activate_hint(&self) -> String {
        if cfg!(windows) {
            self.bin_dir().join("Activate.ps1").display().to_string()
        } else {
            format!("source {}", self.bin_dir().join("activate").display())
        }
    }
}

/// Create-or-reuse policy for the environment
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnvMode {
    Recreate,
    Reuse,
}

/// PyTorch wheel flavor installed into the environment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RuntimeBuild {
    Cu121,
    Cu118,
    #[default]
    Cpu,
}

impl RuntimeBuild {
    pub fn id(&self) -> &'static str {
        match self {
            Self::Cu121 => "cu121",
            Self::Cu118 => "cu118",
            Self::Cpu => "cpu",
        }
    }

    pub fn index_url(&self) -> &'static str {
        match self {
            Self::Cu121 => "https://download.pytorch.org/whl/cu121",
            Self::Cu118 => "https://download.pytorch.org/whl/cu118",
            Self::Cpu => "https://download.pytorch.org/whl/cpu",
        }
    }
}

impl FromStr for RuntimeBuild {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "cu121" => Ok(Self::Cu121),
            "cu118" => Ok(Self::Cu118),
            "cpu" => Ok(Self::Cpu),
            other => Err(AppError::configuration(format!(
                "unknown runtime build {:?}; expected one of cu121, cu118, cpu",
                other
            ))),
        }
    }
}

/// Token for the gated asset host; never printed
#[derive(Clone, PartialEq, Eq)]
pub struct Credential(String);

/// Variable the credential is read from and propagated through
pub const CREDENTIAL_VAR: &str = "HF_TOKEN";

impl Credential {
    /// Returns `None` for blank input
    pub fn new(value: impl Into<String>) -> Option<Self> {
        let value = value.into();
        if value.trim().is_empty() {
            None
        } else {
            Some(Self(value))
        }
    }

    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Debug for Credential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Credential(***)")
    }
}
