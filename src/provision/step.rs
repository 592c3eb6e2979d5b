//! The six provisioning steps and the actions they resolve to.

use crate::config::{PackageCheck, ProvisionConfig};
use crate::provision::{cleanup, verify};
use crate::shell::Invocation;
use serde::Serialize;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// Provisioning steps, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum StepKind {
    /// Non-interactive environment for child processes.
    Environment,
    /// OS build dependencies and index purge.
    SystemPackages,
    /// Pinned installer and build tooling.
    Installer,
    /// Requirements manifest installation.
    Manifest,
    /// Version and import assertions.
    Verify,
    /// Cache removal.
    Cleanup,
}

impl StepKind {
    /// Every step in execution order.
    pub const ALL: [StepKind; 6] = [
        StepKind::Environment,
        StepKind::SystemPackages,
        StepKind::Installer,
        StepKind::Manifest,
        StepKind::Verify,
        StepKind::Cleanup,
    ];

    /// Identifier used on the command line and in errors.
    pub fn name(&self) -> &'static str {
        match self {
            StepKind::Environment => "environment",
            StepKind::SystemPackages => "system-packages",
            StepKind::Installer => "installer",
            StepKind::Manifest => "manifest",
            StepKind::Verify => "verify",
            StepKind::Cleanup => "cleanup",
        }
    }

    /// Banner title.
    pub fn title(&self) -> &'static str {
        match self {
            StepKind::Environment => "Configure environment",
            StepKind::SystemPackages => "Install OS dependencies",
            StepKind::Installer => "Bootstrap installer tooling",
            StepKind::Manifest => "Install manifest dependencies",
            StepKind::Verify => "Verify installed packages",
            StepKind::Cleanup => "Remove caches",
        }
    }
}

impl fmt::Display for StepKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for StepKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_lowercase().replace('_', "-");
        StepKind::ALL
            .into_iter()
            .find(|k| k.name() == wanted)
            .ok_or_else(|| {
                let names: Vec<_> = StepKind::ALL.iter().map(|k| k.name()).collect();
                format!("unknown step '{}' (expected one of: {})", s, names.join(", "))
            })
    }
}

/// Where bytecode caches are searched for.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BytecodeRoots {
    /// Configured roots.
    Fixed(Vec<PathBuf>),
    /// Ask the interpreter at run time.
    Discover(Invocation),
}

/// A single unit of work inside a step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum StepAction {
    /// Add a variable to every later child process.
    SetEnv { key: String, value: String },
    /// Run a command; non-zero exit fails the step.
    Run { invocation: Invocation },
    /// Remove everything inside a directory, keeping the directory.
    PurgeContents { path: PathBuf },
    /// Import a module and compare its `__version__`.
    CheckVersion {
        check: PackageCheck,
        probe: Invocation,
    },
    /// Import a dotted entry point.
    CheckImport {
        entry_point: String,
        probe: Invocation,
    },
    /// Remove every `__pycache__` directory under the roots.
    RemoveBytecode { roots: BytecodeRoots },
    /// Remove a directory tree.
    RemoveDir { path: PathBuf },
}

impl StepAction {
    /// One-line description for plans and dry runs.
    pub fn describe(&self) -> String {
        match self {
            StepAction::SetEnv { key, value } => format!("export {}={}", key, value),
            StepAction::Run { invocation } => invocation.display(),
            StepAction::PurgeContents { path } => {
                format!("remove contents of {}", path.display())
            }
            StepAction::CheckVersion { check, probe } => format!(
                "assert {} == {} ({})",
                check.name,
                check.version,
                probe.display()
            ),
            StepAction::CheckImport { entry_point, probe } => {
                format!("import {} ({})", entry_point, probe.display())
            }
            StepAction::RemoveBytecode { roots } => match roots {
                BytecodeRoots::Fixed(paths) => {
                    let joined: Vec<_> = paths.iter().map(|p| p.display().to_string()).collect();
                    format!("remove __pycache__ under {}", joined.join(", "))
                }
                BytecodeRoots::Discover(_) => {
                    "remove __pycache__ under the interpreter library paths".to_string()
                }
            },
            StepAction::RemoveDir { path } => format!("remove {}", path.display()),
        }
    }
}

/// A step with its resolved actions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProvisionStep {
    /// Which step this is.
    pub kind: StepKind,
    /// Actions run in order.
    pub actions: Vec<StepAction>,
}

/// Manifest path resolved against the project root.
pub fn manifest_path(config: &ProvisionConfig, project_root: &Path) -> PathBuf {
    if config.manifest.path.is_absolute() {
        config.manifest.path.clone()
    } else {
        project_root.join(&config.manifest.path)
    }
}

/// Resolve the configuration into the ordered list of steps.
pub fn build_plan(config: &ProvisionConfig, project_root: &Path) -> Vec<ProvisionStep> {
    StepKind::ALL
        .into_iter()
        .map(|kind| ProvisionStep {
            kind,
            actions: actions_for(kind, config, project_root),
        })
        .collect()
}

fn pip(config: &ProvisionConfig) -> Invocation {
    Invocation::new(config.interpreter.program()).args(["-m", "pip", "install"])
}

fn actions_for(kind: StepKind, config: &ProvisionConfig, project_root: &Path) -> Vec<StepAction> {
    match kind {
        StepKind::Environment => {
            let mut actions = Vec::new();
            if config.environment.noninteractive {
                actions.push(StepAction::SetEnv {
                    key: "DEBIAN_FRONTEND".to_string(),
                    value: "noninteractive".to_string(),
                });
            }
            actions.extend(config.environment.vars.iter().map(|(k, v)| StepAction::SetEnv {
                key: k.clone(),
                value: v.clone(),
            }));
            actions
        }
        StepKind::SystemPackages => {
            let pkgs = &config.system_packages;
            let mut actions = Vec::new();
            if pkgs.packages.is_empty() {
                return actions;
            }
            if pkgs.update_index {
                actions.push(StepAction::Run {
                    invocation: Invocation::new(&pkgs.program).arg("update"),
                });
            }
            actions.push(StepAction::Run {
                invocation: Invocation::new(&pkgs.program)
                    .args(["install", "-y", "--no-install-recommends"])
                    .args(pkgs.packages.iter().cloned()),
            });
            actions.push(StepAction::PurgeContents {
                path: pkgs.index_dir.clone(),
            });
            actions
        }
        StepKind::Installer => {
            let installer = &config.installer;
            let mut actions = vec![StepAction::Run {
                invocation: pip(config)
                    .arg("--upgrade")
                    .arg(format!("pip=={}", installer.pip_version)),
            }];
            if !installer.build_tools.is_empty() {
                actions.push(StepAction::Run {
                    invocation: pip(config).args(installer.build_tools.iter().cloned()),
                });
            }
            actions
        }
        StepKind::Manifest => {
            let manifest = &config.manifest;
            let mut invocation = pip(config);
            if manifest.no_cache {
                invocation = invocation.arg("--no-cache-dir");
            }
            invocation = invocation.arg(format!("--default-timeout={}", manifest.timeout_secs));
            if let Some(implementation) = &manifest.implementation {
                invocation = invocation.args(["--implementation", implementation.as_str()]);
            }
            if let Some(only_binary) = &manifest.only_binary {
                invocation = invocation.arg(format!("--only-binary={}", only_binary));
            }
            let path = manifest_path(config, project_root);
            invocation = invocation.arg("-r").arg(path.display().to_string());
            vec![StepAction::Run { invocation }]
        }
        StepKind::Verify => {
            let interpreter = config.interpreter.program();
            let mut actions: Vec<StepAction> = config
                .verify
                .packages
                .iter()
                .map(|check| StepAction::CheckVersion {
                    check: check.clone(),
                    probe: verify::version_probe(interpreter, &check.module),
                })
                .collect();
            actions.extend(config.verify.entry_points.iter().map(|entry| {
                StepAction::CheckImport {
                    entry_point: entry.clone(),
                    probe: verify::import_probe(interpreter, entry),
                }
            }));
            actions
        }
        StepKind::Cleanup => {
            let cleanup_config = &config.cleanup;
            let roots = if cleanup_config.bytecode_roots.is_empty() {
                BytecodeRoots::Discover(cleanup::library_roots_probe(config.interpreter.program()))
            } else {
                BytecodeRoots::Fixed(cleanup_config.bytecode_roots.clone())
            };
            let mut actions = vec![StepAction::RemoveBytecode { roots }];
            if let Some(cache) = cleanup_config.resolved_installer_cache() {
                actions.push(StepAction::RemoveDir { path: cache });
            }
            actions
        }
    }
}
