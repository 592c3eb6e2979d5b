//! Interactive terminal UI.

use console::Term;
use std::io::Write;

use super::{
    format_duration, should_use_colors, NonInteractiveUI, OutputMode, ProgressSpinner, RunSummary,
    SpinnerHandle, Theme, UserInterface,
};

/// Interactive terminal UI implementation.
pub struct TerminalUI {
    term: Term,
    theme: Theme,
    mode: OutputMode,
}

impl TerminalUI {
    /// Create a new terminal UI.
    pub fn new(mode: OutputMode) -> Self {
        let theme = if should_use_colors() {
            Theme::new()
        } else {
            Theme::plain()
        };

        Self {
            term: Term::stdout(),
            theme,
            mode,
        }
    }
}

impl UserInterface for TerminalUI {
    fn output_mode(&self) -> OutputMode {
        self.mode
    }

    fn message(&mut self, msg: &str) {
        writeln!(self.term, "{}", msg).ok();
    }

    fn success(&mut self, msg: &str) {
        writeln!(self.term, "{}", self.theme.format_success(msg)).ok();
    }

    fn warning(&mut self, msg: &str) {
        writeln!(self.term, "{}", self.theme.format_warning(msg)).ok();
    }

    fn error(&mut self, msg: &str) {
        let mut stderr = Term::stderr();
        writeln!(stderr, "{}", self.theme.format_error(msg)).ok();
    }

    fn start_spinner(&mut self, message: &str) -> Box<dyn SpinnerHandle> {
        if !self.mode.shows_command_output() {
            Box::new(ProgressSpinner::with_indent(message, 2))
        } else {
            writeln!(self.term, "  {}", self.theme.dim.apply_to(message)).ok();
            Box::new(ProgressSpinner::hidden())
        }
    }

    fn show_header(&mut self, title: &str) {
        writeln!(self.term, "\n{}\n", self.theme.format_header(title)).ok();
    }

    fn show_step(&mut self, current: usize, total: usize, title: &str) {
        writeln!(self.term, "{}", self.theme.format_step(current, total, title)).ok();
    }

    fn show_error_block(&mut self, command: &str, output: &str, hint: Option<&str>) {
        let mut err = Term::stderr();
        let b = &self.theme.border;
        writeln!(
            err,
            "    {} {}",
            b.apply_to("┌─"),
            b.apply_to("Command ──────────────────────────")
        )
        .ok();
        writeln!(
            err,
            "    {} {}",
            b.apply_to("│"),
            self.theme.command.apply_to(command)
        )
        .ok();

        if !output.is_empty() {
            writeln!(
                err,
                "    {} {}",
                b.apply_to("├─"),
                b.apply_to("Output ───────────────────────────")
            )
            .ok();
            for line in output.lines() {
                writeln!(err, "    {} {}", b.apply_to("│"), line).ok();
            }
        }

        writeln!(err, "    {}", b.apply_to("└────────────────────────────────────")).ok();

        if let Some(h) = hint {
            writeln!(err).ok();
            writeln!(
                err,
                "    {} {}",
                self.theme.hint.apply_to("Hint:"),
                self.theme.hint.apply_to(h)
            )
            .ok();
        }
    }

    fn show_run_summary(&mut self, summary: &RunSummary) {
        let b = &self.theme.border;
        writeln!(self.term).ok();
        writeln!(self.term, "  {}", b.apply_to("┌─ Summary ──────────────────────────")).ok();
        for step in &summary.step_results {
            let right = step
                .duration
                .map(format_duration)
                .or_else(|| step.detail.clone())
                .unwrap_or_default();
            let extra = match (&step.duration, &step.detail) {
                (Some(_), Some(d)) => format!(" {} {}", self.theme.dim.apply_to("·"), d),
                _ => String::new(),
            };
            writeln!(
                self.term,
                "  {} {} {:<16} {}{}",
                b.apply_to("│"),
                step.status.styled(&self.theme),
                step.name,
                self.theme.duration.apply_to(right),
                extra
            )
            .ok();
        }
        writeln!(self.term, "  {}", b.apply_to("├────────────────────────────────────")).ok();
        writeln!(
            self.term,
            "  {} Total: {} · {} run · {} skipped",
            b.apply_to("│"),
            format_duration(summary.total_duration),
            summary.steps_run,
            summary.steps_skipped
        )
        .ok();
        writeln!(self.term, "  {}", b.apply_to("└────────────────────────────────────")).ok();

        if summary.success {
            writeln!(self.term, "  {}", self.theme.format_success("Image provisioned")).ok();
        } else {
            let failed = summary.failed_step.as_deref().unwrap_or("unknown step");
            let mut stderr = Term::stderr();
            writeln!(
                stderr,
                "  {}",
                self.theme
                    .format_error(&format!("Provisioning failed at {}", failed))
            )
            .ok();
        }
    }

    fn is_interactive(&self) -> bool {
        self.term.is_term()
    }
}

/// Create the appropriate UI implementation.
///
/// Falls back to [`NonInteractiveUI`] when stdout is not a terminal, which
/// is the normal case inside `docker build`.
pub fn create_ui(interactive: bool, mode: OutputMode) -> Box<dyn UserInterface> {
    if interactive && Term::stdout().is_term() {
        Box::new(TerminalUI::new(mode))
    } else {
        Box::new(NonInteractiveUI::new(mode))
    }
}
