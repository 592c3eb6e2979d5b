//! Configuration validation rules.
//!
//! Collects every problem instead of stopping at the first one, so a
//! broken config can be fixed in one pass.

use crate::config::schema::ProvisionConfig;
use crate::error::{ProvisionError, Result};

/// Validation error with context.
#[derive(Debug, Clone)]
pub struct ValidationError {
    /// Config section the error belongs to.
    pub section: &'static str,
    /// Human-readable error message.
    pub message: String,
}

impl ValidationError {
    fn new(section: &'static str, message: impl Into<String>) -> Self {
        Self {
            section,
            message: message.into(),
        }
    }
}

/// Validate a configuration and return all errors.
pub fn validate_config(config: &ProvisionConfig) -> Vec<ValidationError> {
    let mut errors = Vec::new();

    if config.interpreter.program().trim().is_empty() {
        errors.push(ValidationError::new("interpreter", "interpreter must not be empty"));
    }

    for key in config.environment.vars.keys() {
        if key.is_empty() || key.contains('=') || key.contains('\0') {
            errors.push(ValidationError::new(
                "environment",
                format!("'{}' is not a valid environment variable name", key),
            ));
        }
    }

    if config.system_packages.program.trim().is_empty() {
        errors.push(ValidationError::new(
            "system_packages",
            "package manager program must not be empty",
        ));
    }
    for pkg in &config.system_packages.packages {
        if pkg.trim().is_empty() || pkg.starts_with('-') {
            errors.push(ValidationError::new(
                "system_packages",
                format!("'{}' is not a package name", pkg),
            ));
        }
    }

    if !is_exact_version(&config.installer.pip_version) {
        errors.push(ValidationError::new(
            "installer",
            format!(
                "pip_version '{}' must be an exact version such as 23.1.2",
                config.installer.pip_version
            ),
        ));
    }
    for tool in &config.installer.build_tools {
        if !tool.contains("==") {
            errors.push(ValidationError::new(
                "installer",
                format!("build tool '{}' must be pinned with ==", tool),
            ));
        }
    }

    if config.manifest.path.as_os_str().is_empty() {
        errors.push(ValidationError::new("manifest", "manifest path must not be empty"));
    }
    if config.manifest.timeout_secs == 0 {
        errors.push(ValidationError::new(
            "manifest",
            "timeout_secs must be greater than zero",
        ));
    }

    for check in &config.verify.packages {
        if check.name.trim().is_empty() {
            errors.push(ValidationError::new("verify", "package name must not be empty"));
        }
        if !is_dotted_identifier(&check.module) {
            errors.push(ValidationError::new(
                "verify",
                format!("'{}' is not an importable module name", check.module),
            ));
        }
        if check.version.trim().is_empty() {
            errors.push(ValidationError::new(
                "verify",
                format!("expected version for '{}' must not be empty", check.name),
            ));
        }
    }
    for entry in &config.verify.entry_points {
        if !is_dotted_identifier(entry) || !entry.contains('.') {
            errors.push(ValidationError::new(
                "verify",
                format!("entry point '{}' must look like package.module.name", entry),
            ));
        }
    }

    errors
}

/// Validate a configuration, failing with all messages joined.
pub fn validate(config: &ProvisionConfig) -> Result<()> {
    let errors = validate_config(config);

    if errors.is_empty() {
        Ok(())
    } else {
        let messages: Vec<_> = errors
            .iter()
            .map(|e| format!("{}: {}", e.section, e.message))
            .collect();
        Err(ProvisionError::ConfigValidation {
            message: messages.join("; "),
        })
    }
}

fn is_exact_version(version: &str) -> bool {
    !version.is_empty()
        && version
            .split('.')
            .all(|part| !part.is_empty() && part.chars().all(|c| c.is_ascii_alphanumeric()))
}

fn is_dotted_identifier(path: &str) -> bool {
    !path.is_empty()
        && path.split('.').all(|part| {
            let mut chars = part.chars();
            matches!(chars.next(), Some(c) if c == '_' || c.is_ascii_alphabetic())
                && chars.all(|c| c == '_' || c.is_ascii_alphanumeric())
        })
}
