//! Checks run before any step executes.

use crate::config::ProvisionConfig;
use crate::error::Result;
use crate::manifest::Manifest;
use crate::provision::step::manifest_path;
use crate::shell::is_elevated;
use crate::ui::UserInterface;
use std::path::Path;

/// A non-fatal preflight finding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PreflightWarning {
    /// Requirement without an exact `==` pin.
    Unpinned { line: usize, name: String },
    /// Line without a package name (URL, path, VCS reference).
    Unnamed { line: usize, text: String },
    /// Manifest pins a different version than the verify step expects.
    PinConflict {
        package: String,
        pinned: String,
        expected: String,
    },
    /// The package manager will run without root privileges.
    NotRoot { program: String },
}

impl PreflightWarning {
    /// Human-readable text.
    pub fn message(&self, manifest_name: &str) -> String {
        match self {
            PreflightWarning::Unpinned { line, name } => format!(
                "{}:{}: '{}' is not pinned to an exact version",
                manifest_name, line, name
            ),
            PreflightWarning::Unnamed { line, text } => format!(
                "{}:{}: '{}' has no package name; left for pip to resolve",
                manifest_name, line, text
            ),
            PreflightWarning::PinConflict {
                package,
                pinned,
                expected,
            } => format!(
                "{} pins {}=={} but verification expects {}",
                manifest_name, package, pinned, expected
            ),
            PreflightWarning::NotRoot { program } => {
                format!("Not running as root; {} will likely be refused", program)
            }
        }
    }
}

/// Load the manifest and compare it with the verification pins.
///
/// # Errors
///
/// `ManifestNotFound` when the file is missing. Manifest content never
/// fails preflight; questionable lines become warnings.
pub fn inspect_manifest(
    config: &ProvisionConfig,
    project_root: &Path,
) -> Result<(Manifest, Vec<PreflightWarning>)> {
    let path = manifest_path(config, project_root);
    let manifest = Manifest::load(&path)?;
    tracing::debug!(
        "Manifest {} has {} entries",
        path.display(),
        manifest.len()
    );

    let mut warnings: Vec<PreflightWarning> = manifest
        .unpinned()
        .into_iter()
        .map(|(line, req)| PreflightWarning::Unpinned {
            line,
            name: req.name.clone(),
        })
        .collect();

    warnings.extend(
        manifest
            .unnamed()
            .into_iter()
            .map(|(line, text)| PreflightWarning::Unnamed {
                line,
                text: text.to_string(),
            }),
    );

    for check in &config.verify.packages {
        if let Some(pinned) = manifest.pinned_version(&check.name) {
            if pinned != check.version {
                warnings.push(PreflightWarning::PinConflict {
                    package: check.name.clone(),
                    pinned: pinned.to_string(),
                    expected: check.version.clone(),
                });
            }
        }
    }

    Ok((manifest, warnings))
}

/// Warn when the package manager step would run unprivileged.
pub fn privilege_warning(config: &ProvisionConfig) -> Option<PreflightWarning> {
    if config.system_packages.packages.is_empty() || is_elevated() {
        None
    } else {
        Some(PreflightWarning::NotRoot {
            program: config.system_packages.program.clone(),
        })
    }
}

/// Show warnings through the UI.
pub fn report_warnings(
    warnings: &[PreflightWarning],
    config: &ProvisionConfig,
    ui: &mut dyn UserInterface,
) {
    let manifest_name = config.manifest.path.display().to_string();
    for warning in warnings {
        ui.warning(&warning.message(&manifest_name));
    }
}
