//! imgprep - Provisioning for Python ML serving images.
//!
//! imgprep replaces the `RUN` chain of a model-serving Dockerfile with a
//! single fail-fast routine: OS build dependencies, pinned installer
//! tooling, a binary-only manifest install, version verification, and
//! cache removal.
//!
//! # Modules
//!
//! - [`cli`] - Command-line interface and argument parsing
//! - [`config`] - Configuration loading, parsing, and validation
//! - [`error`] - Error types and result aliases
//! - [`manifest`] - Requirements manifest parsing
//! - [`provision`] - Step resolution and fail-fast execution
//! - [`shell`] - External command execution
//! - [`ui`] - Spinners, step banners, and terminal output
//!
//! # Example
//!
//! ```
//! use imgprep::manifest::Manifest;
//!
//! let manifest = Manifest::parse("tensorflow==2.12.1\nflask==2.3.2  # web\n");
//! assert_eq!(manifest.pinned_version("TensorFlow"), Some("2.12.1"));
//! assert_eq!(manifest.pinned_version("flask"), Some("2.3.2"));
//! ```
//!
//! For end-to-end runs against fake executables, see the integration tests.

pub mod cli;
pub mod config;
pub mod error;
pub mod manifest;
pub mod provision;
pub mod shell;
pub mod ui;

pub use error::{ProvisionError, Result};
