//! The provisioning routine.
//!
//! A run resolves the configuration into six ordered steps
//! ([`build_plan`]) and executes them with a [`Provisioner`]. Every command
//! goes through a [`CommandRunner`](crate::shell::CommandRunner), so the
//! same code path drives real builds and scripted tests.
//!
//! # Example
//!
//! ```
//! use imgprep::config::ProvisionConfig;
//! use imgprep::provision::{build_plan, StepKind};
//! use std::path::Path;
//!
//! let plan = build_plan(&ProvisionConfig::default(), Path::new("/app"));
//! assert_eq!(plan.len(), 6);
//! assert_eq!(plan[0].kind, StepKind::Environment);
//! ```

pub mod cleanup;
pub mod hints;
pub mod preflight;
pub mod provisioner;
pub mod report;
pub mod step;
pub mod verify;

pub use cleanup::{CleanupFailure, CleanupStats};
pub use preflight::{inspect_manifest, PreflightWarning};
pub use provisioner::{ProvisionOptions, Provisioner};
pub use report::{ProvisionReport, StepOutcome, StepStatus, VerifiedPackage};
pub use step::{build_plan, manifest_path, BytecodeRoots, ProvisionStep, StepAction, StepKind};
