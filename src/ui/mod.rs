//! Terminal user interface.
//!
//! This module provides:
//! - [`UserInterface`] trait for UI abstraction
//! - [`TerminalUI`] for interactive terminals
//! - [`NonInteractiveUI`] for CI and `docker build` logs
//! - [`MockUI`] capturing everything for tests
//!
//! # Example
//!
//! ```
//! use imgprep::ui::{create_ui, OutputMode};
//!
//! let mut ui = create_ui(false, OutputMode::Quiet);
//! ui.show_header("imgprep");
//! ui.success("NumPy 1.23.5");
//! ```

pub mod icons;
pub mod mock;
pub mod non_interactive;
pub mod output;
pub mod progress;
pub mod spinner;
pub mod terminal;
pub mod theme;

pub use icons::StatusKind;
pub use mock::MockUI;
pub use non_interactive::NonInteractiveUI;
pub use output::OutputMode;
pub use progress::{format_bytes, format_duration};
pub use spinner::ProgressSpinner;
pub use terminal::{create_ui, TerminalUI};
pub use theme::{should_use_colors, Theme};

use std::time::Duration;

/// Trait for user interface interactions.
///
/// The provisioner only talks to this trait, so tests can capture output
/// with [`MockUI`].
pub trait UserInterface {
    /// Get the current output mode.
    fn output_mode(&self) -> OutputMode;

    /// Display a message to the user.
    fn message(&mut self, msg: &str);

    /// Display a success message.
    fn success(&mut self, msg: &str);

    /// Display a warning message.
    fn warning(&mut self, msg: &str);

    /// Display an error message.
    fn error(&mut self, msg: &str);

    /// Start a spinner for an operation.
    fn start_spinner(&mut self, message: &str) -> Box<dyn SpinnerHandle>;

    /// Show a header/banner.
    fn show_header(&mut self, title: &str);

    /// Announce a step (e.g., "[2/6] Install OS dependencies").
    fn show_step(&mut self, current: usize, total: usize, title: &str);

    /// Show the command and output of a failed invocation.
    fn show_error_block(&mut self, command: &str, output: &str, hint: Option<&str>);

    /// Show the end-of-run summary.
    fn show_run_summary(&mut self, summary: &RunSummary);

    /// Check if running in interactive mode.
    fn is_interactive(&self) -> bool;
}

/// Handle for controlling a spinner.
pub trait SpinnerHandle {
    /// Update the spinner message.
    fn set_message(&mut self, msg: &str);

    /// Mark the operation as successful.
    fn finish_success(&mut self, msg: &str);

    /// Mark the operation as failed.
    fn finish_error(&mut self, msg: &str);

    /// Mark as skipped.
    fn finish_skipped(&mut self, msg: &str);
}

/// One row of the end-of-run summary.
#[derive(Debug, Clone, PartialEq)]
pub struct StepSummary {
    /// Step name.
    pub name: String,
    /// Final status.
    pub status: StatusKind,
    /// Time spent, when the step ran.
    pub duration: Option<Duration>,
    /// Short note (e.g., "freed 12.0 MiB", "not run").
    pub detail: Option<String>,
}

/// Data for the end-of-run summary.
#[derive(Debug, Clone, PartialEq)]
pub struct RunSummary {
    /// Per-step rows in execution order.
    pub step_results: Vec<StepSummary>,
    /// Wall-clock time of the whole run.
    pub total_duration: Duration,
    /// Number of steps that ran.
    pub steps_run: usize,
    /// Number of steps skipped.
    pub steps_skipped: usize,
    /// Whether every step that ran succeeded.
    pub success: bool,
    /// Step that failed, if any.
    pub failed_step: Option<String>,
}

impl RunSummary {
    /// Render the summary as plain lines (no colors, no borders).
    pub fn plain_lines(&self) -> Vec<String> {
        let mut lines = Vec::new();
        for step in &self.step_results {
            let right = step
                .duration
                .map(format_duration)
                .or_else(|| step.detail.clone())
                .unwrap_or_default();
            let detail = match (&step.duration, &step.detail) {
                (Some(_), Some(d)) => format!(" · {}", d),
                _ => String::new(),
            };
            lines.push(
                format!("{} {:<16} {}{}", step.status.icon(), step.name, right, detail)
                    .trim_end()
                    .to_string(),
            );
        }
        lines.push(format!(
            "Total: {} · {} run · {} skipped",
            format_duration(self.total_duration),
            self.steps_run,
            self.steps_skipped
        ));
        lines
    }
}
