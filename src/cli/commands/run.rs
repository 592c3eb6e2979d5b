//! Run command implementation.
//!
//! The `imgprep run` command executes the provisioning steps. The `verify`
//! and `clean` commands go through the same path with a restricted step
//! selection.

use std::path::{Path, PathBuf};

use crate::cli::args::RunArgs;
use crate::config::{load_config, validate, ProvisionConfig};
use crate::error::Result;
use crate::provision::{ProvisionOptions, Provisioner, StepStatus};
use crate::shell::SystemRunner;
use crate::ui::UserInterface;

use super::dispatcher::{Command, CommandResult};

/// The run command implementation.
pub struct RunCommand {
    project_root: PathBuf,
    config_path: Option<PathBuf>,
    args: RunArgs,
}

impl RunCommand {
    /// Create a new run command.
    pub fn new(project_root: &Path, config_path: Option<&Path>, args: RunArgs) -> Self {
        Self {
            project_root: project_root.to_path_buf(),
            config_path: config_path.map(Path::to_path_buf),
            args,
        }
    }

    /// Get the command arguments.
    pub fn args(&self) -> &RunArgs {
        &self.args
    }

    /// Build provisioning options from args.
    fn build_options(&self) -> ProvisionOptions {
        ProvisionOptions {
            dry_run: self.args.dry_run,
            skip: self.args.skip.clone(),
            only: Vec::new(),
        }
    }
}

impl Command for RunCommand {
    fn execute(&self, ui: &mut dyn UserInterface) -> Result<CommandResult> {
        let config = load_validated_config(&self.project_root, self.config_path.as_deref())?;
        let header = if self.args.dry_run {
            "Provisioning image (dry run)"
        } else {
            "Provisioning image"
        };
        provision(config, &self.project_root, self.build_options(), header, ui)
    }
}

/// Load the configuration and reject invalid values.
pub(crate) fn load_validated_config(
    project_root: &Path,
    config_path: Option<&Path>,
) -> Result<ProvisionConfig> {
    let config = load_config(project_root, config_path)?;
    validate(&config)?;
    Ok(config)
}

/// Run the provisioner and render its outcome.
///
/// Provisioning failures become a failed [`CommandResult`] carrying the
/// error's exit code; they are reported here rather than propagated.
pub(crate) fn provision(
    config: ProvisionConfig,
    project_root: &Path,
    options: ProvisionOptions,
    header: &str,
    ui: &mut dyn UserInterface,
) -> Result<CommandResult> {
    let runner = if ui.output_mode().shows_command_output() {
        SystemRunner::echoing()
    } else {
        SystemRunner::new()
    };
    let mut provisioner =
        Provisioner::new(config, project_root, Box::new(runner)).with_options(options);

    ui.show_header(header);

    match provisioner.run(ui) {
        Ok(report) => {
            ui.show_run_summary(&report.summary());
            Ok(CommandResult::success())
        }
        Err(err) => {
            tracing::debug!("Provisioning failed: {:?}", err);
            let report = provisioner.report();
            let started = report
                .steps
                .iter()
                .any(|s| s.status != StepStatus::Pending);
            if started {
                ui.show_run_summary(&report.summary());
            }
            ui.error(&err.to_string());
            Ok(CommandResult::failure(err.exit_code()))
        }
    }
}
