//! Integration tests for the provision module public API.

use imgprep::config::ProvisionConfig;
use imgprep::provision::{
    build_plan, ProvisionOptions, Provisioner, StepAction, StepKind, StepStatus,
};
use imgprep::shell::ScriptedRunner;
use imgprep::ui::MockUI;
use imgprep::ProvisionError;
use std::fs;
use tempfile::TempDir;

fn project() -> (TempDir, ProvisionConfig) {
    let temp = TempDir::new().unwrap();
    fs::write(
        temp.path().join("requirements.txt"),
        "tensorflow==2.12.1\nflask==2.3.2\nnumpy==1.23.5\n",
    )
    .unwrap();

    let mut config = ProvisionConfig::default();
    config.system_packages.index_dir = temp.path().join("lists");
    config.cleanup.bytecode_roots = vec![temp.path().join("site")];
    config.cleanup.installer_cache = Some(temp.path().join("pip"));
    (temp, config)
}

fn versions() -> ScriptedRunner {
    ScriptedRunner::new()
        .respond("import tensorflow;", 0, "2.12.1\n")
        .respond("import flask;", 0, "2.3.2\n")
        .respond("import numpy;", 0, "1.23.5\n")
}

#[test]
fn plan_is_serializable() {
    let (temp, config) = project();
    let plan = build_plan(&config, temp.path());
    let json = serde_json::to_value(&plan).unwrap();
    assert_eq!(json.as_array().unwrap().len(), 6);
    assert!(matches!(plan[1].actions[0], StepAction::Run { .. }));
}

#[test]
fn run_reports_every_step() {
    let (temp, config) = project();
    let runner = versions();
    let log = runner.log();
    let mut provisioner = Provisioner::new(config, temp.path(), Box::new(runner));
    let mut ui = MockUI::new();

    let report = provisioner.run(&mut ui).unwrap();

    assert!(report.success());
    assert!(report
        .steps
        .iter()
        .all(|s| s.status == StepStatus::Completed));
    let names: Vec<_> = report.verified.iter().map(|p| p.name.as_str()).collect();
    assert_eq!(names, ["TensorFlow", "Flask", "NumPy"]);
    // apt update + install, pip bootstrap x2, manifest, 3 versions, 1 import
    assert_eq!(log.calls().len(), 9);
    assert!(log.calls().iter().all(|c| c.cwd.as_deref() == Some(temp.path())));
}

#[test]
fn spawn_failure_is_command_spawn_error() {
    let (temp, config) = project();
    let runner = versions().fail_spawn("apt-get");
    let mut provisioner = Provisioner::new(config, temp.path(), Box::new(runner));

    let err = provisioner.run(&mut MockUI::new()).unwrap_err();

    assert!(matches!(err, ProvisionError::CommandSpawn { .. }));
    assert_eq!(
        provisioner.report().failed_step(),
        Some(StepKind::SystemPackages)
    );
}

#[test]
fn import_failure_stops_verification() {
    let (temp, config) = project();
    let runner = versions().respond_err(
        "import load_model",
        1,
        "ImportError: cannot import name 'load_model'\n",
    );
    let mut provisioner = Provisioner::new(config, temp.path(), Box::new(runner));
    let mut ui = MockUI::new();

    let err = provisioner.run(&mut ui).unwrap_err();

    assert!(err.to_string().contains("cannot import name 'load_model'"));
    assert_eq!(ui.successes().len(), 3);
    assert_eq!(
        provisioner.report().step(StepKind::Cleanup).unwrap().status,
        StepStatus::Skipped
    );
}

#[test]
fn only_selected_steps_run() {
    let (temp, config) = project();
    let runner = versions();
    let mut provisioner = Provisioner::new(config, temp.path(), Box::new(runner))
        .with_options(ProvisionOptions::only([StepKind::Environment]));

    let report = provisioner.run(&mut MockUI::new()).unwrap();

    assert_eq!(
        report.step(StepKind::Environment).unwrap().status,
        StepStatus::Completed
    );
    assert_eq!(
        report.step(StepKind::Verify).unwrap().status,
        StepStatus::Skipped
    );
}
