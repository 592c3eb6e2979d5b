//! Plan command implementation.
//!
//! The `imgprep plan` command prints the resolved steps without running
//! anything.

use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::cli::args::{PlanArgs, PlanFormat};
use crate::config::CleanupPolicy;
use crate::error::{ProvisionError, Result};
use crate::provision::{build_plan, inspect_manifest, manifest_path, ProvisionStep};
use crate::ui::{Theme, UserInterface};

use super::dispatcher::{Command, CommandResult};
use super::run::load_validated_config;

/// Serialized form of `plan --format json`.
#[derive(Debug, Serialize)]
struct PlanDocument<'a> {
    project_root: &'a Path,
    manifest: PathBuf,
    cleanup_policy: CleanupPolicy,
    steps: &'a [ProvisionStep],
}

/// The plan command implementation.
pub struct PlanCommand {
    project_root: PathBuf,
    config_path: Option<PathBuf>,
    args: PlanArgs,
}

impl PlanCommand {
    /// Create a new plan command.
    pub fn new(project_root: &Path, config_path: Option<&Path>, args: PlanArgs) -> Self {
        Self {
            project_root: project_root.to_path_buf(),
            config_path: config_path.map(Path::to_path_buf),
            args,
        }
    }
}

impl Command for PlanCommand {
    fn execute(&self, ui: &mut dyn UserInterface) -> Result<CommandResult> {
        let config = load_validated_config(&self.project_root, self.config_path.as_deref())?;
        let steps = build_plan(&config, &self.project_root);

        if self.args.format == PlanFormat::Json {
            let document = PlanDocument {
                project_root: &self.project_root,
                manifest: manifest_path(&config, &self.project_root),
                cleanup_policy: config.cleanup.policy,
                steps: &steps,
            };
            let json = serde_json::to_string_pretty(&document)
                .map_err(|e| ProvisionError::Other(e.into()))?;
            ui.message(&json);
            return Ok(CommandResult::success());
        }

        let theme = Theme::new();
        ui.show_header("Provisioning plan");

        for (index, step) in steps.iter().enumerate() {
            ui.message(&format!(
                "  {} {} {}",
                theme.dim.apply_to(format!("{}.", index + 1)),
                theme.highlight.apply_to(step.kind.name()),
                theme.dim.apply_to(format!("({})", step.kind.title())),
            ));
            if step.actions.is_empty() {
                ui.message(&format!("      {}", theme.dim.apply_to("nothing to do")));
            }
            for action in &step.actions {
                ui.message(&format!("      {}", theme.command.apply_to(action.describe())));
            }
        }
        ui.message("");
        ui.message(&format!(
            "  {} {}",
            theme.dim.apply_to("Cleanup policy:"),
            config.cleanup.policy
        ));

        match inspect_manifest(&config, &self.project_root) {
            Ok((_, warnings)) => {
                crate::provision::preflight::report_warnings(&warnings, &config, ui)
            }
            Err(e @ ProvisionError::ManifestNotFound { .. }) => ui.warning(&e.to_string()),
            Err(e) => return Err(e),
        }

        Ok(CommandResult::success())
    }
}
