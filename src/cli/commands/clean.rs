//! Clean command implementation.
//!
//! The `imgprep clean` command removes bytecode and installer caches.

use std::path::{Path, PathBuf};

use crate::error::Result;
use crate::provision::{ProvisionOptions, StepKind};
use crate::ui::UserInterface;

use super::dispatcher::{Command, CommandResult};
use super::run::{load_validated_config, provision};

/// The clean command implementation.
pub struct CleanCommand {
    project_root: PathBuf,
    config_path: Option<PathBuf>,
}

impl CleanCommand {
    /// Create a new clean command.
    pub fn new(project_root: &Path, config_path: Option<&Path>) -> Self {
        Self {
            project_root: project_root.to_path_buf(),
            config_path: config_path.map(Path::to_path_buf),
        }
    }
}

impl Command for CleanCommand {
    fn execute(&self, ui: &mut dyn UserInterface) -> Result<CommandResult> {
        let config = load_validated_config(&self.project_root, self.config_path.as_deref())?;
        provision(
            config,
            &self.project_root,
            ProvisionOptions::only([StepKind::Cleanup]),
            "Removing caches",
            ui,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ui::MockUI;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn clean_removes_configured_caches_without_manifest() {
        let temp = TempDir::new().unwrap();
        let site = temp.path().join("site");
        fs::create_dir_all(site.join("pkg/__pycache__")).unwrap();
        fs::create_dir_all(temp.path().join("pip-cache/wheels")).unwrap();
        fs::write(
            temp.path().join("imgprep.yml"),
            format!(
                "cleanup:\n  bytecode_roots: [\"{}\"]\n  installer_cache: \"{}\"\n",
                site.display(),
                temp.path().join("pip-cache").display()
            ),
        )
        .unwrap();
        let mut ui = MockUI::new();

        let result = CleanCommand::new(temp.path(), None).execute(&mut ui).unwrap();

        assert!(result.success);
        assert!(!site.join("pkg/__pycache__").exists());
        assert!(!temp.path().join("pip-cache").exists());
        assert_eq!(ui.steps(), &[(1, 1, "Remove caches".to_string())]);
    }
}
