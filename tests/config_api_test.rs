//! Integration tests for config module public API.

use imgprep::config::{load_config, validate, CleanupPolicy, ProvisionConfig};
use std::fs;
use std::path::PathBuf;
use tempfile::TempDir;

#[test]
fn defaults_describe_the_serving_image() {
    let config = ProvisionConfig::default();
    validate(&config).unwrap();

    assert_eq!(config.interpreter.program(), "python3");
    assert_eq!(
        config.system_packages.packages,
        vec!["python3-dev", "build-essential", "libpython3.10-dev"]
    );
    assert_eq!(config.installer.pip_version, "23.1.2");
    assert_eq!(config.manifest.timeout_secs, 300);
    assert_eq!(config.cleanup.policy, CleanupPolicy::BestEffort);
}

#[test]
fn project_file_overrides_defaults() {
    let temp = TempDir::new().unwrap();
    fs::write(
        temp.path().join("imgprep.yml"),
        r#"
interpreter: python3.10
manifest:
  path: deploy/requirements.txt
cleanup:
  policy: strict
verify:
  packages:
    - { name: NumPy, module: numpy, version: "1.23.5" }
"#,
    )
    .unwrap();

    let config = load_config(temp.path(), None).unwrap();
    validate(&config).unwrap();

    assert_eq!(config.interpreter.program(), "python3.10");
    assert_eq!(config.manifest.path, PathBuf::from("deploy/requirements.txt"));
    assert_eq!(config.cleanup.policy, CleanupPolicy::Strict);
    assert_eq!(config.verify.packages.len(), 1);
    // Untouched sections keep their defaults
    assert_eq!(config.installer.build_tools.len(), 2);
}

#[test]
fn unknown_top_level_keys_are_rejected() {
    let temp = TempDir::new().unwrap();
    fs::write(temp.path().join("imgprep.yml"), "workflows: {}\n").unwrap();

    let err = load_config(temp.path(), None).unwrap_err();
    assert!(err.to_string().contains("Failed to parse config"));
}
