//! Provisioning configuration.
//!
//! - Schema definitions and defaults in [`schema`]
//! - File discovery and loading in [`loader`]
//! - Validation in [`validator`]
//!
//! # Example
//!
//! ```
//! use imgprep::config::{parse_config, validate};
//! use std::path::Path;
//!
//! let config = parse_config("manifest:\n  timeout_secs: 600\n", Path::new("imgprep.yml")).unwrap();
//! validate(&config).unwrap();
//! assert_eq!(config.manifest.timeout_secs, 600);
//! assert_eq!(config.installer.pip_version, "23.1.2");
//! ```

pub mod loader;
pub mod schema;
pub mod validator;

pub use loader::{find_project_config, load_config, load_config_file, parse_config, CONFIG_FILE_NAME};
pub use schema::{
    CleanupConfig, CleanupPolicy, EnvironmentConfig, InstallerConfig, Interpreter, ManifestConfig,
    PackageCheck, ProvisionConfig, SystemPackagesConfig, VerifyConfig,
};
pub use validator::{validate, validate_config, ValidationError};
