//! Import-and-assert probes run through the interpreter.

use crate::config::PackageCheck;
use crate::error::{ProvisionError, Result};
use crate::shell::{CommandOptions, CommandResult, CommandRunner, Invocation};

/// Probe printing a module's `__version__` as its last stdout line.
pub fn version_probe(interpreter: &str, module: &str) -> Invocation {
    Invocation::new(interpreter).args([
        "-c".to_string(),
        format!(
            "import {m}; print(getattr({m}, '__version__', ''))",
            m = module
        ),
    ])
}

/// Probe importing `attr` from the module part of a dotted entry point.
pub fn import_probe(interpreter: &str, entry_point: &str) -> Invocation {
    let script = match entry_point.rsplit_once('.') {
        Some((module, attr)) => format!("from {} import {}", module, attr),
        None => format!("import {}", entry_point),
    };
    Invocation::new(interpreter).args(["-c".to_string(), script])
}

/// Run a version probe and assert the exact expected version.
///
/// Returns the installed version on success.
pub fn check_version(
    runner: &mut dyn CommandRunner,
    check: &PackageCheck,
    probe: &Invocation,
    options: &CommandOptions,
) -> Result<String> {
    let result = runner.run(probe, options)?;
    if !result.success {
        return Err(ProvisionError::ImportFailed {
            module: check.module.clone(),
            message: failure_reason(&result),
        });
    }

    let actual = result.last_stdout_line().unwrap_or_default();
    tracing::debug!(
        "{} reports version '{}' (expected {})",
        check.module,
        actual,
        check.version
    );

    if actual == check.version {
        Ok(actual.to_string())
    } else {
        Err(ProvisionError::VersionMismatch {
            package: check.name.clone(),
            expected: check.version.clone(),
            actual: if actual.is_empty() {
                "no __version__".to_string()
            } else {
                actual.to_string()
            },
        })
    }
}

/// Run an import probe for an entry point.
pub fn check_import(
    runner: &mut dyn CommandRunner,
    entry_point: &str,
    probe: &Invocation,
    options: &CommandOptions,
) -> Result<()> {
    let result = runner.run(probe, options)?;
    if result.success {
        Ok(())
    } else {
        Err(ProvisionError::ImportFailed {
            module: entry_point.to_string(),
            message: failure_reason(&result),
        })
    }
}

/// Last stderr line, which for a Python traceback is the exception itself.
fn failure_reason(result: &CommandResult) -> String {
    result
        .stderr
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .last()
        .map(str::to_string)
        .unwrap_or_else(|| match result.exit_code {
            Some(code) => format!("interpreter exited with code {}", code),
            None => "interpreter terminated by signal".to_string(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shell::ScriptedRunner;

    fn tf() -> PackageCheck {
        PackageCheck::new("TensorFlow", "tensorflow", "2.12.1")
    }

    #[test]
    fn version_probe_prints_dunder_version() {
        let probe = version_probe("python3", "numpy");
        assert_eq!(probe.program, "python3");
        assert_eq!(
            probe.args,
            vec![
                "-c".to_string(),
                "import numpy; print(getattr(numpy, '__version__', ''))".to_string()
            ]
        );
    }

    #[test]
    fn import_probe_splits_attribute() {
        let probe = import_probe("python3", "tensorflow.keras.models.load_model");
        assert_eq!(probe.args[1], "from tensorflow.keras.models import load_model");
    }

    #[test]
    fn import_probe_without_dot_imports_module() {
        let probe = import_probe("python3", "flask");
        assert_eq!(probe.args[1], "import flask");
    }

    #[test]
    fn matching_version_passes() {
        let mut runner = ScriptedRunner::new().respond("import tensorflow", 0, "some log line\n2.12.1\n");
        let probe = version_probe("python3", "tensorflow");
        let version = check_version(&mut runner, &tf(), &probe, &CommandOptions::default()).unwrap();
        assert_eq!(version, "2.12.1");
    }

    #[test]
    fn mismatched_version_names_package_and_both_versions() {
        let mut runner = ScriptedRunner::new().respond("import tensorflow", 0, "2.13.0\n");
        let probe = version_probe("python3", "tensorflow");
        let err = check_version(&mut runner, &tf(), &probe, &CommandOptions::default()).unwrap_err();
        match err {
            ProvisionError::VersionMismatch {
                package,
                expected,
                actual,
            } => {
                assert_eq!(package, "TensorFlow");
                assert_eq!(expected, "2.12.1");
                assert_eq!(actual, "2.13.0");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn missing_version_attribute_is_mismatch() {
        let mut runner = ScriptedRunner::new().respond("import tensorflow", 0, "\n");
        let probe = version_probe("python3", "tensorflow");
        let err = check_version(&mut runner, &tf(), &probe, &CommandOptions::default()).unwrap_err();
        assert!(err.to_string().contains("no __version__"));
    }

    #[test]
    fn import_error_reports_exception_line() {
        let mut runner = ScriptedRunner::new().respond_err(
            "import tensorflow",
            1,
            "Traceback (most recent call last):\n  File \"<string>\", line 1\nModuleNotFoundError: No module named 'tensorflow'\n",
        );
        let probe = version_probe("python3", "tensorflow");
        let err = check_version(&mut runner, &tf(), &probe, &CommandOptions::default()).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Failed to import 'tensorflow': ModuleNotFoundError: No module named 'tensorflow'"
        );
    }

    #[test]
    fn entry_point_import_failure_without_stderr_mentions_exit_code() {
        let mut runner = ScriptedRunner::new().respond("import load_model", 3, "");
        let probe = import_probe("python3", "tensorflow.keras.models.load_model");
        let err = check_import(
            &mut runner,
            "tensorflow.keras.models.load_model",
            &probe,
            &CommandOptions::default(),
        )
        .unwrap_err();
        assert!(err.to_string().contains("exited with code 3"));
    }
}
