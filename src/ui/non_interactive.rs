//! Non-interactive UI for CI and image builds.

use super::{OutputMode, RunSummary, SpinnerHandle, StatusKind, Theme, UserInterface};

/// UI implementation for logs: plain lines, no spinners, no colors.
pub struct NonInteractiveUI {
    mode: OutputMode,
}

impl NonInteractiveUI {
    /// Create a new non-interactive UI.
    pub fn new(mode: OutputMode) -> Self {
        Self { mode }
    }
}

impl UserInterface for NonInteractiveUI {
    fn output_mode(&self) -> OutputMode {
        self.mode
    }

    fn message(&mut self, msg: &str) {
        println!("{}", msg);
    }

    fn success(&mut self, msg: &str) {
        println!("✓ {}", msg);
    }

    fn warning(&mut self, msg: &str) {
        eprintln!("⚠ {}", msg);
    }

    fn error(&mut self, msg: &str) {
        eprintln!("✗ {}", msg);
    }

    fn start_spinner(&mut self, message: &str) -> Box<dyn SpinnerHandle> {
        println!("  {}", message);
        Box::new(NoopSpinner { indent: 2 })
    }

    fn show_header(&mut self, title: &str) {
        println!("\n{}\n", title);
    }

    fn show_step(&mut self, current: usize, total: usize, title: &str) {
        println!("[{}/{}] {}", current, total, title);
    }

    fn show_error_block(&mut self, command: &str, output: &str, hint: Option<&str>) {
        eprintln!();
        eprintln!("    ┌─ Command ──────────────────────────");
        eprintln!("    │ {}", command);
        if !output.is_empty() {
            eprintln!("    ├─ Output ───────────────────────────");
            for line in output.lines() {
                eprintln!("    │ {}", line);
            }
        }
        eprintln!("    └────────────────────────────────────");
        if let Some(h) = hint {
            eprintln!();
            eprintln!("    Hint: {}", h);
        }
    }

    fn show_run_summary(&mut self, summary: &RunSummary) {
        println!();
        println!("  ┌─ Summary ──────────────────────────");
        for line in summary.plain_lines() {
            println!("  │ {}", line);
        }
        println!("  └────────────────────────────────────");

        if summary.success {
            println!("  ✓ Image provisioned");
        } else {
            eprintln!(
                "  {} Provisioning failed at {}",
                StatusKind::Failed.icon(),
                summary.failed_step.as_deref().unwrap_or("unknown step")
            );
        }
    }

    fn is_interactive(&self) -> bool {
        false
    }
}

/// Spinner that only prints its final line.
struct NoopSpinner {
    indent: usize,
}

impl NoopSpinner {
    fn finish(&self, line: String) {
        println!("{}{}", " ".repeat(self.indent), line);
    }
}

impl SpinnerHandle for NoopSpinner {
    fn set_message(&mut self, _msg: &str) {}

    fn finish_success(&mut self, msg: &str) {
        self.finish(Theme::plain().format_success(msg));
    }

    fn finish_error(&mut self, msg: &str) {
        self.finish(Theme::plain().format_error(msg));
    }

    fn finish_skipped(&mut self, msg: &str) {
        self.finish(Theme::plain().format_skipped(msg));
    }
}
