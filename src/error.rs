//! Error types for imgprep operations.
//!
//! This module defines [`ProvisionError`], the primary error type used
//! throughout the crate, and a [`Result`] type alias for convenience.
//!
//! # Error Handling Strategy
//!
//! - Every provisioning step fails fast: the first error aborts the run
//! - Use `ProvisionError` for failures that map to a distinct exit code or message
//! - Use `anyhow::Error` (via `ProvisionError::Other`) for unexpected errors

use std::path::PathBuf;
use thiserror::Error;

/// Core error type for provisioning operations.
#[derive(Debug, Error)]
pub enum ProvisionError {
    /// Explicitly requested configuration file does not exist.
    #[error("Configuration not found: {path}")]
    ConfigNotFound { path: PathBuf },

    /// Failed to parse configuration file.
    #[error("Failed to parse config at {path}: {message}")]
    ConfigParse { path: PathBuf, message: String },

    /// Invalid configuration values.
    #[error("Invalid configuration: {message}")]
    ConfigValidation { message: String },

    /// Requirements manifest is missing.
    #[error("Manifest not found: {path}")]
    ManifestNotFound { path: PathBuf },

    /// A command could not be started at all.
    #[error("Failed to start '{program}': {message}")]
    CommandSpawn { program: String, message: String },

    /// A step's command exited unsuccessfully.
    #[error("Step '{step}' failed: `{command}` exited with {}", describe_code(.code))]
    StepFailed {
        step: String,
        command: String,
        code: Option<i32>,
    },

    /// An installed package reports a different version than pinned.
    #[error("{package} version mismatch: expected {expected}, found {actual}")]
    VersionMismatch {
        package: String,
        expected: String,
        actual: String,
    },

    /// A module or entry point could not be imported.
    #[error("Failed to import '{module}': {message}")]
    ImportFailed { module: String, message: String },

    /// Removing a cache path failed under the strict cleanup policy.
    #[error("Cleanup failed for {path}: {message}")]
    CleanupFailed { path: PathBuf, message: String },

    /// IO error wrapper.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Generic wrapped error for anyhow interop.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

fn describe_code(code: &Option<i32>) -> String {
    match code {
        Some(code) => format!("exit code {}", code),
        None => "no exit code (terminated by signal)".to_string(),
    }
}

impl ProvisionError {
    /// Process exit code for this error.
    ///
    /// A failed command propagates its own non-zero exit code; every
    /// other failure exits with 1.
    pub fn exit_code(&self) -> i32 {
        match self {
            ProvisionError::StepFailed {
                code: Some(code), ..
            } if *code != 0 => *code,
            _ => 1,
        }
    }
}

/// Result type alias for provisioning operations.
pub type Result<T> = std::result::Result<T, ProvisionError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_not_found_displays_path() {
        let err = ProvisionError::ConfigNotFound {
            path: PathBuf::from("/foo/imgprep.yml"),
        };
        assert!(err.to_string().contains("/foo/imgprep.yml"));
    }

    #[test]
    fn manifest_not_found_displays_path() {
        let err = ProvisionError::ManifestNotFound {
            path: PathBuf::from("app/requirements.txt"),
        };
        assert_eq!(
            err.to_string(),
            "Manifest not found: app/requirements.txt"
        );
    }

    #[test]
    fn step_failed_displays_step_command_and_code() {
        let err = ProvisionError::StepFailed {
            step: "os-dependencies".into(),
            command: "apt-get update".into(),
            code: Some(100),
        };
        let msg = err.to_string();
        assert!(msg.contains("os-dependencies"));
        assert!(msg.contains("apt-get update"));
        assert!(msg.contains("exit code 100"));
    }

    #[test]
    fn step_failed_without_code_mentions_signal() {
        let err = ProvisionError::StepFailed {
            step: "manifest".into(),
            command: "python3 -m pip install".into(),
            code: None,
        };
        assert!(err.to_string().contains("signal"));
    }

    #[test]
    fn version_mismatch_names_package_and_versions() {
        let err = ProvisionError::VersionMismatch {
            package: "TensorFlow".into(),
            expected: "2.12.1".into(),
            actual: "2.13.0".into(),
        };
        assert_eq!(
            err.to_string(),
            "TensorFlow version mismatch: expected 2.12.1, found 2.13.0"
        );
    }

    #[test]
    fn exit_code_propagates_command_code() {
        let err = ProvisionError::StepFailed {
            step: "installer".into(),
            command: "pip".into(),
            code: Some(2),
        };
        assert_eq!(err.exit_code(), 2);
    }

    #[test]
    fn exit_code_defaults_to_one() {
        let signalled = ProvisionError::StepFailed {
            step: "installer".into(),
            command: "pip".into(),
            code: None,
        };
        assert_eq!(signalled.exit_code(), 1);

        let mismatch = ProvisionError::VersionMismatch {
            package: "NumPy".into(),
            expected: "1.23.5".into(),
            actual: "1.24.0".into(),
        };
        assert_eq!(mismatch.exit_code(), 1);
    }

    #[test]
    fn io_error_converts_from_std() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file missing");
        let err: ProvisionError = io_err.into();
        assert!(matches!(err, ProvisionError::Io(_)));
    }
}
