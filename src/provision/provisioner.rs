//! Fail-fast execution of the provisioning steps.

use crate::config::{CleanupPolicy, ProvisionConfig};
use crate::error::{ProvisionError, Result};
use crate::provision::cleanup::{self, Cleaner};
use crate::provision::report::{ProvisionReport, StepStatus, VerifiedPackage};
use crate::provision::step::{build_plan, BytecodeRoots, ProvisionStep, StepAction, StepKind};
use crate::provision::{hints, preflight, verify};
use crate::shell::{CommandOptions, CommandRunner, Invocation};
use crate::ui::{format_duration, UserInterface};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Instant;

/// Lines of command output kept in the error block.
const ERROR_TAIL_LINES: usize = 20;

/// Which steps run and whether anything is executed.
#[derive(Debug, Clone, Default)]
pub struct ProvisionOptions {
    /// Print actions without executing them.
    pub dry_run: bool,
    /// Steps to skip.
    pub skip: Vec<StepKind>,
    /// When non-empty, only these steps run.
    pub only: Vec<StepKind>,
}

impl ProvisionOptions {
    /// Options running only the given steps.
    pub fn only(steps: impl IntoIterator<Item = StepKind>) -> Self {
        Self {
            only: steps.into_iter().collect(),
            ..Default::default()
        }
    }

    /// Whether a step is selected.
    pub fn includes(&self, kind: StepKind) -> bool {
        (self.only.is_empty() || self.only.contains(&kind)) && !self.skip.contains(&kind)
    }
}

/// Runs the steps in order, stopping at the first failure.
pub struct Provisioner {
    config: ProvisionConfig,
    project_root: PathBuf,
    runner: Box<dyn CommandRunner>,
    options: ProvisionOptions,
    env: HashMap<String, String>,
    report: ProvisionReport,
}

impl Provisioner {
    /// Create a provisioner for a project directory.
    pub fn new(
        config: ProvisionConfig,
        project_root: impl Into<PathBuf>,
        runner: Box<dyn CommandRunner>,
    ) -> Self {
        Self {
            config,
            project_root: project_root.into(),
            runner,
            options: ProvisionOptions::default(),
            env: HashMap::new(),
            report: ProvisionReport::new(false),
        }
    }

    /// Replace the run options.
    pub fn with_options(mut self, options: ProvisionOptions) -> Self {
        self.options = options;
        self
    }

    /// Report of the last run, including a failed one.
    pub fn report(&self) -> &ProvisionReport {
        &self.report
    }

    /// Environment variables applied to child processes so far.
    pub fn child_env(&self) -> &HashMap<String, String> {
        &self.env
    }

    /// The resolved steps.
    pub fn plan(&self) -> Vec<ProvisionStep> {
        build_plan(&self.config, &self.project_root)
    }

    /// Run the selected steps.
    ///
    /// Preflight errors are returned before any command runs. After that,
    /// the first failing step stops the run and every later step is
    /// reported as skipped.
    pub fn run(&mut self, ui: &mut dyn UserInterface) -> Result<ProvisionReport> {
        let start = Instant::now();
        self.report = ProvisionReport::new(self.options.dry_run);
        self.env.clear();

        self.preflight(ui)?;

        let steps = self.plan();
        let total = steps
            .iter()
            .filter(|s| self.options.includes(s.kind))
            .count();
        let mut current = 0;

        for step in &steps {
            if !self.options.includes(step.kind) {
                tracing::debug!("Skipping step {}", step.kind);
                self.report
                    .record(step.kind, StepStatus::Skipped, None, Some("skipped".to_string()));
                continue;
            }

            current += 1;
            ui.show_step(current, total, step.kind.title());

            if self.options.dry_run {
                for action in &step.actions {
                    ui.message(&format!("  would {}", action.describe()));
                }
                self.report
                    .record(step.kind, StepStatus::Skipped, None, Some("dry run".to_string()));
                continue;
            }

            let step_start = Instant::now();
            match self.run_step(step, ui) {
                Ok(()) => {
                    let elapsed = step_start.elapsed();
                    tracing::debug!("Step {} completed in {}", step.kind, format_duration(elapsed));
                    self.report
                        .record(step.kind, StepStatus::Completed, Some(elapsed), None);
                }
                Err(err) => {
                    tracing::debug!("Step {} failed: {}", step.kind, err);
                    self.report.record(
                        step.kind,
                        StepStatus::Failed,
                        Some(step_start.elapsed()),
                        Some(failure_detail(&err)),
                    );
                    self.report.skip_remaining("not run");
                    self.report.total_duration = start.elapsed();
                    return Err(err);
                }
            }
        }

        self.report.total_duration = start.elapsed();
        Ok(self.report.clone())
    }

    fn preflight(&self, ui: &mut dyn UserInterface) -> Result<()> {
        let mut warnings = Vec::new();
        if self.options.includes(StepKind::Manifest) {
            let (_, manifest_warnings) =
                preflight::inspect_manifest(&self.config, &self.project_root)?;
            warnings.extend(manifest_warnings);
        }
        if self.options.includes(StepKind::SystemPackages) && !self.options.dry_run {
            warnings.extend(preflight::privilege_warning(&self.config));
        }
        preflight::report_warnings(&warnings, &self.config, ui);
        Ok(())
    }

    fn run_step(&mut self, step: &ProvisionStep, ui: &mut dyn UserInterface) -> Result<()> {
        for action in &step.actions {
            self.run_action(step.kind, action, ui)?;
        }
        Ok(())
    }

    fn command_options(&self) -> CommandOptions {
        CommandOptions {
            cwd: Some(self.project_root.clone()),
            env: self.env.clone(),
            ..CommandOptions::captured()
        }
    }

    fn run_action(
        &mut self,
        kind: StepKind,
        action: &StepAction,
        ui: &mut dyn UserInterface,
    ) -> Result<()> {
        match action {
            StepAction::SetEnv { key, value } => {
                tracing::debug!("Child environment: {}={}", key, value);
                self.env.insert(key.clone(), value.clone());
                ui.message(&format!("  {}={}", key, value));
                Ok(())
            }
            StepAction::Run { invocation } => self.run_invocation(kind, invocation, ui),
            StepAction::PurgeContents { path } => {
                // Part of the package step, so always fatal.
                Cleaner::new(CleanupPolicy::Strict, &mut self.report.cleanup)
                    .purge_contents(path)?;
                ui.message(&format!("  Purged {}", path.display()));
                Ok(())
            }
            StepAction::CheckVersion { check, probe } => {
                let options = self.command_options();
                let version = verify::check_version(self.runner.as_mut(), check, probe, &options)?;
                ui.success(&format!("{} {}", check.name, version));
                self.report.verified.push(VerifiedPackage {
                    name: check.name.clone(),
                    version,
                });
                Ok(())
            }
            StepAction::CheckImport { entry_point, probe } => {
                let options = self.command_options();
                verify::check_import(self.runner.as_mut(), entry_point, probe, &options)?;
                ui.message(&format!("  {} imports", entry_point));
                Ok(())
            }
            StepAction::RemoveBytecode { roots } => {
                let roots = self.bytecode_roots(roots)?;
                let before = self.report.cleanup.removed;
                let policy = self.config.cleanup.policy;
                Cleaner::new(policy, &mut self.report.cleanup).remove_bytecode(&roots)?;
                ui.message(&format!(
                    "  Removed {} {} directories",
                    self.report.cleanup.removed - before,
                    cleanup::BYTECODE_DIR
                ));
                Ok(())
            }
            StepAction::RemoveDir { path } => {
                let policy = self.config.cleanup.policy;
                Cleaner::new(policy, &mut self.report.cleanup).remove_dir(path)?;
                ui.message(&format!("  Removed {}", path.display()));
                Ok(())
            }
        }
    }

    fn bytecode_roots(&mut self, roots: &BytecodeRoots) -> Result<Vec<PathBuf>> {
        let probe = match roots {
            BytecodeRoots::Fixed(paths) => return Ok(paths.clone()),
            BytecodeRoots::Discover(probe) => probe,
        };

        let options = self.command_options();
        let result = self.runner.run(probe, &options)?;
        if result.success {
            let roots = cleanup::parse_library_roots(&result.stdout);
            tracing::debug!("Library roots: {:?}", roots);
            Ok(roots)
        } else {
            let policy = self.config.cleanup.policy;
            let message = format!(
                "could not list library paths: {}",
                result.stderr.lines().last().unwrap_or("no output")
            );
            Cleaner::new(policy, &mut self.report.cleanup)
                .fail(Path::new(&probe.program), message)?;
            Ok(Vec::new())
        }
    }

    fn run_invocation(
        &mut self,
        kind: StepKind,
        invocation: &Invocation,
        ui: &mut dyn UserInterface,
    ) -> Result<()> {
        let line = invocation.display();
        tracing::debug!("Running: {}", line);

        let options = self.command_options();
        let mut spinner = ui.start_spinner(&line);
        let result = match self.runner.run(invocation, &options) {
            Ok(result) => result,
            Err(err) => {
                spinner.finish_error(&line);
                return Err(err);
            }
        };

        if result.success {
            spinner.finish_success(&format!("{} ({})", line, format_duration(result.duration)));
            return Ok(());
        }

        spinner.finish_error(&format!("{} ({})", line, format_duration(result.duration)));
        let output = result.combined_output();
        let hint = hints::hint_for(kind, &output);
        ui.show_error_block(&line, &tail(&output, ERROR_TAIL_LINES), hint.as_deref());

        Err(ProvisionError::StepFailed {
            step: kind.name().to_string(),
            command: line,
            code: result.exit_code,
        })
    }
}

fn failure_detail(err: &ProvisionError) -> String {
    match err {
        ProvisionError::StepFailed { code: Some(code), .. } => format!("exit code {}", code),
        ProvisionError::StepFailed { code: None, .. } => "terminated by signal".to_string(),
        ProvisionError::VersionMismatch { package, .. } => format!("{} mismatch", package),
        ProvisionError::ImportFailed { module, .. } => format!("cannot import {}", module),
        _ => "failed".to_string(),
    }
}

fn tail(output: &str, lines: usize) -> String {
    let all: Vec<&str> = output.trim_end().lines().collect();
    let start = all.len().saturating_sub(lines);
    all[start..].join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shell::{CallLog, ScriptedRunner};
    use crate::ui::MockUI;
    use std::fs;
    use tempfile::TempDir;

    const MANIFEST: &str = "tensorflow==2.12.1\nflask==2.3.2\nnumpy==1.23.5\n";

    struct Fixture {
        temp: TempDir,
        config: ProvisionConfig,
    }

    impl Fixture {
        fn new() -> Self {
            let temp = TempDir::new().unwrap();
            fs::write(temp.path().join("requirements.txt"), MANIFEST).unwrap();

            let mut config = ProvisionConfig::default();
            config.system_packages.index_dir = temp.path().join("apt-lists");
            config.cleanup.bytecode_roots = vec![temp.path().join("site-packages")];
            config.cleanup.installer_cache = Some(temp.path().join("pip-cache"));
            Self { temp, config }
        }

        fn root(&self) -> &Path {
            self.temp.path()
        }

        fn provisioner(&self, runner: ScriptedRunner) -> (Provisioner, CallLog) {
            let log = runner.log();
            let provisioner = Provisioner::new(self.config.clone(), self.root(), Box::new(runner));
            (provisioner, log)
        }
    }

    fn healthy() -> ScriptedRunner {
        ScriptedRunner::new()
            .respond("import tensorflow;", 0, "2.12.1\n")
            .respond("import flask;", 0, "2.3.2\n")
            .respond("import numpy;", 0, "1.23.5\n")
    }

    #[test]
    fn successful_run_verifies_in_order() {
        let fixture = Fixture::new();
        let (mut provisioner, log) = fixture.provisioner(healthy());
        let mut ui = MockUI::new();

        let report = provisioner.run(&mut ui).unwrap();

        assert!(report.success());
        assert_eq!(
            ui.successes(),
            &[
                "TensorFlow 2.12.1".to_string(),
                "Flask 2.3.2".to_string(),
                "NumPy 1.23.5".to_string()
            ]
        );
        assert_eq!(report.verified.len(), 3);
        assert!(log.ran("from tensorflow.keras.models import load_model"));
        assert_eq!(ui.steps().len(), 6);
        assert_eq!(ui.steps()[0], (1, 6, "Configure environment".to_string()));
    }

    #[test]
    fn commands_run_in_step_order() {
        let fixture = Fixture::new();
        let (mut provisioner, log) = fixture.provisioner(healthy());
        provisioner.run(&mut MockUI::new()).unwrap();

        let lines = log.command_lines();
        let position = |needle: &str| lines.iter().position(|l| l.contains(needle)).unwrap();
        assert!(position("apt-get update") < position("apt-get install"));
        assert!(position("apt-get install") < position("pip==23.1.2"));
        assert!(position("pip==23.1.2") < position("setuptools==65.5.0"));
        assert!(position("setuptools==65.5.0") < position("--only-binary=:all:"));
        assert!(position("--only-binary=:all:") < position("import tensorflow;"));
    }

    #[test]
    fn children_receive_noninteractive_frontend() {
        let fixture = Fixture::new();
        let (mut provisioner, log) = fixture.provisioner(healthy());
        provisioner.run(&mut MockUI::new()).unwrap();

        let calls = log.calls();
        assert!(!calls.is_empty());
        assert!(calls
            .iter()
            .all(|c| c.env.get("DEBIAN_FRONTEND").map(String::as_str) == Some("noninteractive")));
        assert_eq!(
            provisioner.child_env().get("DEBIAN_FRONTEND").map(String::as_str),
            Some("noninteractive")
        );
    }

    #[test]
    fn system_package_failure_stops_before_installer() {
        let fixture = Fixture::new();
        let runner = healthy().respond_err(
            "apt-get install",
            100,
            "E: Unable to locate package libpython3.10-dev\n",
        );
        let (mut provisioner, log) = fixture.provisioner(runner);
        let mut ui = MockUI::new();

        let err = provisioner.run(&mut ui).unwrap_err();

        assert_eq!(err.exit_code(), 100);
        assert!(!log.ran("pip"));
        let report = provisioner.report();
        assert_eq!(report.failed_step(), Some(StepKind::SystemPackages));
        assert_eq!(
            report.step(StepKind::Installer).unwrap().status,
            StepStatus::Skipped
        );
        let (command, output, hint) = &ui.error_blocks()[0];
        assert!(command.starts_with("apt-get install"));
        assert!(output.contains("Unable to locate package"));
        assert!(hint.as_deref().unwrap().contains("libpython3.10-dev"));
    }

    #[test]
    fn manifest_failure_propagates_exit_code() {
        let fixture = Fixture::new();
        let runner = healthy().respond_err(
            "--only-binary=:all:",
            1,
            "ERROR: No matching distribution found for tensorflow==2.12.1\n",
        );
        let (mut provisioner, log) = fixture.provisioner(runner);

        let err = provisioner.run(&mut MockUI::new()).unwrap_err();

        assert!(matches!(err, ProvisionError::StepFailed { .. }));
        assert_eq!(err.exit_code(), 1);
        assert!(!log.ran("import tensorflow"));
    }

    #[test]
    fn version_mismatch_stops_later_confirmations() {
        let fixture = Fixture::new();
        let runner = ScriptedRunner::new()
            .respond("import tensorflow;", 0, "2.12.1\n")
            .respond("import flask;", 0, "3.0.0\n")
            .respond("import numpy;", 0, "1.23.5\n");
        let (mut provisioner, log) = fixture.provisioner(runner);
        let mut ui = MockUI::new();

        let err = provisioner.run(&mut ui).unwrap_err();

        assert_eq!(
            err.to_string(),
            "Flask version mismatch: expected 2.3.2, found 3.0.0"
        );
        assert_eq!(err.exit_code(), 1);
        assert_eq!(ui.successes(), &["TensorFlow 2.12.1".to_string()]);
        assert!(!log.ran("import numpy"));
        assert_eq!(
            provisioner.report().step(StepKind::Cleanup).unwrap().status,
            StepStatus::Skipped
        );
    }

    #[test]
    fn missing_manifest_runs_nothing() {
        let fixture = Fixture::new();
        fs::remove_file(fixture.root().join("requirements.txt")).unwrap();
        let (mut provisioner, log) = fixture.provisioner(healthy());
        let mut ui = MockUI::new();

        let err = provisioner.run(&mut ui).unwrap_err();

        assert!(matches!(err, ProvisionError::ManifestNotFound { .. }));
        assert!(log.calls().is_empty());
        assert!(ui.steps().is_empty());
    }

    #[test]
    fn unpinned_manifest_lines_warn() {
        let fixture = Fixture::new();
        fs::write(
            fixture.root().join("requirements.txt"),
            "tensorflow==2.12.1\npillow\n",
        )
        .unwrap();
        let (mut provisioner, _) = fixture.provisioner(healthy());
        let mut ui = MockUI::new();

        provisioner.run(&mut ui).unwrap();

        assert!(ui.has_warning("'pillow' is not pinned"));
    }

    #[test]
    fn cleanup_removes_bytecode_and_installer_cache() {
        let fixture = Fixture::new();
        let site = fixture.root().join("site-packages");
        fs::create_dir_all(site.join("numpy/__pycache__")).unwrap();
        fs::write(site.join("numpy/__pycache__/core.pyc"), b"bytecode").unwrap();
        fs::write(site.join("numpy/__init__.py"), b"").unwrap();
        fs::create_dir_all(fixture.root().join("pip-cache/http")).unwrap();
        fs::create_dir_all(fixture.root().join("apt-lists")).unwrap();
        fs::write(fixture.root().join("apt-lists/InRelease"), b"index").unwrap();

        let (mut provisioner, _) = fixture.provisioner(healthy());
        let report = provisioner.run(&mut MockUI::new()).unwrap();

        assert!(!site.join("numpy/__pycache__").exists());
        assert!(site.join("numpy/__init__.py").exists());
        assert!(!fixture.root().join("pip-cache").exists());
        assert!(fixture.root().join("apt-lists").is_dir());
        assert!(!fixture.root().join("apt-lists/InRelease").exists());
        assert!(report.cleanup.bytes_freed >= 13);
    }

    #[test]
    fn discovered_roots_come_from_interpreter() {
        let mut fixture = Fixture::new();
        fixture.config.cleanup.bytecode_roots.clear();
        let lib = fixture.root().join("lib/python3.10");
        fs::create_dir_all(lib.join("json/__pycache__")).unwrap();
        let listing = format!("{}\n{}\n", lib.display(), lib.join("site-packages").display());
        let runner = healthy().respond("sysconfig", 0, &listing);
        let (mut provisioner, _) = fixture.provisioner(runner);

        provisioner.run(&mut MockUI::new()).unwrap();

        assert!(!lib.join("json/__pycache__").exists());
    }

    #[test]
    fn best_effort_cleanup_tolerates_failed_discovery() {
        let mut fixture = Fixture::new();
        fixture.config.cleanup.bytecode_roots.clear();
        let runner = healthy().respond_err("sysconfig", 1, "boom\n");
        let (mut provisioner, _) = fixture.provisioner(runner);

        let report = provisioner.run(&mut MockUI::new()).unwrap();

        assert!(report.success());
        assert_eq!(report.cleanup.failures.len(), 1);
    }

    #[test]
    fn strict_cleanup_fails_the_run() {
        let mut fixture = Fixture::new();
        fixture.config.cleanup.bytecode_roots.clear();
        fixture.config.cleanup.policy = CleanupPolicy::Strict;
        let runner = healthy().respond_err("sysconfig", 1, "boom\n");
        let (mut provisioner, _) = fixture.provisioner(runner);

        let err = provisioner.run(&mut MockUI::new()).unwrap_err();

        assert!(matches!(err, ProvisionError::CleanupFailed { .. }));
        assert_eq!(provisioner.report().failed_step(), Some(StepKind::Cleanup));
    }

    #[test]
    fn index_purge_failure_is_fatal_under_best_effort() {
        let mut fixture = Fixture::new();
        let index = fixture.root().join("apt-lists");
        fs::write(&index, b"not a directory").unwrap();
        fixture.config.system_packages.index_dir = index;
        assert_eq!(fixture.config.cleanup.policy, CleanupPolicy::BestEffort);
        let (mut provisioner, log) = fixture.provisioner(healthy());

        let err = provisioner.run(&mut MockUI::new()).unwrap_err();

        assert!(matches!(err, ProvisionError::CleanupFailed { .. }));
        assert_eq!(
            provisioner.report().failed_step(),
            Some(StepKind::SystemPackages)
        );
        assert!(!log.ran("pip"));
    }

    #[test]
    fn second_run_repeats_the_same_commands() {
        let fixture = Fixture::new();
        let site = fixture.root().join("site-packages");
        fs::create_dir_all(site.join("numpy/__pycache__")).unwrap();
        fs::create_dir_all(fixture.root().join("pip-cache/http")).unwrap();
        fs::create_dir_all(fixture.root().join("apt-lists")).unwrap();

        let (mut first, first_log) = fixture.provisioner(healthy());
        let first_report = first.run(&mut MockUI::new()).unwrap();
        let (mut second, second_log) = fixture.provisioner(healthy());
        let second_report = second.run(&mut MockUI::new()).unwrap();

        assert!(first_report.success());
        assert!(second_report.success());
        assert_eq!(first_log.command_lines(), second_log.command_lines());
        assert!(second_report.cleanup.failures.is_empty());
        assert_eq!(second_report.cleanup.removed, 0);
        assert_eq!(first_report.verified, second_report.verified);
    }

    #[test]
    fn dry_run_executes_nothing() {
        let fixture = Fixture::new();
        let (provisioner, log) = fixture.provisioner(healthy());
        let mut provisioner = provisioner.with_options(ProvisionOptions {
            dry_run: true,
            ..Default::default()
        });
        let mut ui = MockUI::new();

        let report = provisioner.run(&mut ui).unwrap();

        assert!(log.calls().is_empty());
        assert!(report.dry_run);
        assert!(ui.has_message("would apt-get update"));
        assert!(ui.has_message("--only-binary=:all:"));
        assert!(report
            .steps
            .iter()
            .all(|s| s.detail.as_deref() == Some("dry run")));
    }

    #[test]
    fn skipped_steps_do_not_run() {
        let fixture = Fixture::new();
        let (provisioner, log) = fixture.provisioner(healthy());
        let mut provisioner = provisioner.with_options(ProvisionOptions {
            skip: vec![StepKind::SystemPackages, StepKind::Installer],
            ..Default::default()
        });
        let mut ui = MockUI::new();

        let report = provisioner.run(&mut ui).unwrap();

        assert!(!log.ran("apt-get"));
        assert!(!log.ran("pip==23.1.2"));
        assert!(log.ran("--only-binary=:all:"));
        assert_eq!(ui.steps()[0].1, 4);
        assert_eq!(
            report.step(StepKind::SystemPackages).unwrap().status,
            StepStatus::Skipped
        );
        assert!(report.success());
    }

    #[test]
    fn verify_only_ignores_missing_manifest() {
        let fixture = Fixture::new();
        fs::remove_file(fixture.root().join("requirements.txt")).unwrap();
        let (provisioner, log) = fixture.provisioner(healthy());
        let mut provisioner =
            provisioner.with_options(ProvisionOptions::only([StepKind::Verify]));
        let mut ui = MockUI::new();

        provisioner.run(&mut ui).unwrap();

        assert_eq!(ui.successes().len(), 3);
        assert!(!log.ran("pip install"));
    }

    #[test]
    fn tail_keeps_last_lines() {
        let output = (1..=30).map(|i| i.to_string()).collect::<Vec<_>>().join("\n");
        let tailed = tail(&output, 20);
        assert!(tailed.starts_with("11\n"));
        assert!(tailed.ends_with("30"));
    }
}
