//! Verify command implementation.
//!
//! The `imgprep verify` command re-checks installed package versions
//! without installing or removing anything.

use std::path::{Path, PathBuf};

use crate::error::Result;
use crate::provision::{ProvisionOptions, StepKind};
use crate::ui::UserInterface;

use super::dispatcher::{Command, CommandResult};
use super::run::{load_validated_config, provision};

/// The verify command implementation.
pub struct VerifyCommand {
    project_root: PathBuf,
    config_path: Option<PathBuf>,
}

impl VerifyCommand {
    /// Create a new verify command.
    pub fn new(project_root: &Path, config_path: Option<&Path>) -> Self {
        Self {
            project_root: project_root.to_path_buf(),
            config_path: config_path.map(Path::to_path_buf),
        }
    }
}

impl Command for VerifyCommand {
    fn execute(&self, ui: &mut dyn UserInterface) -> Result<CommandResult> {
        let config = load_validated_config(&self.project_root, self.config_path.as_deref())?;
        provision(
            config,
            &self.project_root,
            ProvisionOptions::only([StepKind::Verify]),
            "Verifying installed packages",
            ui,
        )
    }
}
