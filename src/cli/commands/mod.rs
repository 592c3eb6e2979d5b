//! CLI command implementations.
//!
//! Each command implements the [`Command`] trait, which provides a uniform
//! interface for executing commands and reporting results.
//!
//! # Architecture
//!
//! Commands are dispatched via [`CommandDispatcher`], which routes CLI
//! subcommands to their implementations:
//! - `run` executes every step (the default with no subcommand)
//! - `plan` prints the resolved steps
//! - `verify` and `clean` run a single step through the same path as `run`

pub mod clean;
pub mod dispatcher;
pub mod plan;
pub mod run;
pub mod verify;

pub use dispatcher::{Command, CommandDispatcher, CommandResult};
