//! Configuration schema definitions.
//!
//! Every field has a default, and the defaults are the reference image
//! recipe: running without a config file provisions exactly that image.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;

/// Root configuration structure for `imgprep.yml`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ProvisionConfig {
    /// Python interpreter used for the installer, probes and discovery.
    pub interpreter: Interpreter,

    /// Environment handed to every child process.
    pub environment: EnvironmentConfig,

    /// OS build dependencies.
    pub system_packages: SystemPackagesConfig,

    /// Package installer bootstrap pins.
    pub installer: InstallerConfig,

    /// Requirements manifest installation.
    pub manifest: ManifestConfig,

    /// Post-install verification.
    pub verify: VerifyConfig,

    /// Cache removal.
    pub cleanup: CleanupConfig,
}

/// Python interpreter program name or path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Interpreter(pub String);

impl Default for Interpreter {
    fn default() -> Self {
        Self("python3".to_string())
    }
}

impl Interpreter {
    /// Program name or path.
    pub fn program(&self) -> &str {
        &self.0
    }
}

/// Child process environment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EnvironmentConfig {
    /// Suppress interactive package-manager prompts.
    pub noninteractive: bool,

    /// Extra variables for every child process.
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub vars: BTreeMap<String, String>,
}

impl Default for EnvironmentConfig {
    fn default() -> Self {
        Self {
            noninteractive: true,
            vars: BTreeMap::new(),
        }
    }
}

/// System package manager settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SystemPackagesConfig {
    /// Package manager program.
    pub program: String,

    /// Refresh the package index before installing.
    pub update_index: bool,

    /// Packages to install.
    pub packages: Vec<String>,

    /// Package index cache; its contents are purged after installing.
    pub index_dir: PathBuf,
}

impl Default for SystemPackagesConfig {
    fn default() -> Self {
        Self {
            program: "apt-get".to_string(),
            update_index: true,
            packages: vec![
                "python3-dev".to_string(),
                "build-essential".to_string(),
                "libpython3.10-dev".to_string(),
            ],
            index_dir: PathBuf::from("/var/lib/apt/lists"),
        }
    }
}

/// Installer bootstrap pins.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct InstallerConfig {
    /// Exact pip version to upgrade to.
    pub pip_version: String,

    /// Build tooling requirements, installed after pip.
    pub build_tools: Vec<String>,
}

impl Default for InstallerConfig {
    fn default() -> Self {
        Self {
            pip_version: "23.1.2".to_string(),
            build_tools: vec!["setuptools==65.5.0".to_string(), "wheel==0.37.1".to_string()],
        }
    }
}

/// Manifest installation policy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ManifestConfig {
    /// Requirements file, relative to the project directory.
    pub path: PathBuf,

    /// Pass `--no-cache-dir`.
    pub no_cache: bool,

    /// Network timeout in seconds.
    pub timeout_secs: u64,

    /// Value for `--implementation` (`py` = pure Python wheels).
    pub implementation: Option<String>,

    /// Value for `--only-binary`; `:all:` forbids source builds.
    pub only_binary: Option<String>,
}

impl Default for ManifestConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("requirements.txt"),
            no_cache: true,
            timeout_secs: 300,
            implementation: Some("py".to_string()),
            only_binary: Some(":all:".to_string()),
        }
    }
}

/// A library whose installed version is asserted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PackageCheck {
    /// Display name.
    pub name: String,

    /// Importable module name.
    pub module: String,

    /// Exact expected `__version__`.
    pub version: String,
}

impl PackageCheck {
    pub fn new(name: &str, module: &str, version: &str) -> Self {
        Self {
            name: name.to_string(),
            module: module.to_string(),
            version: version.to_string(),
        }
    }
}

/// Verification settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct VerifyConfig {
    /// Packages checked in order.
    pub packages: Vec<PackageCheck>,

    /// Dotted paths (`package.module.attribute`) that must import.
    pub entry_points: Vec<String>,
}

impl Default for VerifyConfig {
    fn default() -> Self {
        Self {
            packages: vec![
                PackageCheck::new("TensorFlow", "tensorflow", "2.12.1"),
                PackageCheck::new("Flask", "flask", "2.3.2"),
                PackageCheck::new("NumPy", "numpy", "1.23.5"),
            ],
            entry_points: vec!["tensorflow.keras.models.load_model".to_string()],
        }
    }
}

/// How cleanup errors affect the run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CleanupPolicy {
    /// Log removal errors and carry on.
    #[default]
    BestEffort,
    /// The first removal error fails the run.
    Strict,
}

impl std::fmt::Display for CleanupPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CleanupPolicy::BestEffort => write!(f, "best_effort"),
            CleanupPolicy::Strict => write!(f, "strict"),
        }
    }
}

/// Cache removal settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CleanupConfig {
    /// Error policy.
    pub policy: CleanupPolicy,

    /// Roots searched for `__pycache__`; empty means ask the interpreter.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub bytecode_roots: Vec<PathBuf>,

    /// Installer cache directory; `None` means `<user cache dir>/pip`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub installer_cache: Option<PathBuf>,
}

impl Default for CleanupConfig {
    fn default() -> Self {
        Self {
            policy: CleanupPolicy::BestEffort,
            bytecode_roots: Vec::new(),
            installer_cache: None,
        }
    }
}

impl CleanupConfig {
    /// Installer cache directory after applying the default.
    pub fn resolved_installer_cache(&self) -> Option<PathBuf> {
        self.installer_cache
            .clone()
            .or_else(|| dirs::cache_dir().map(|d| d.join("pip")))
    }
}
