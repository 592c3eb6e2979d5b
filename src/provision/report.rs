//! What a provisioning run did.

use crate::provision::cleanup::CleanupStats;
use crate::provision::StepKind;
use crate::ui::{format_bytes, RunSummary, StatusKind, StepSummary};
use serde::Serialize;
use std::time::Duration;

/// Status of a single step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StepStatus {
    /// Not reached yet.
    Pending,
    /// Ran to completion.
    Completed,
    /// Ran and failed.
    Failed,
    /// Deliberately not run.
    Skipped,
}

/// Outcome of one step.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StepOutcome {
    pub kind: StepKind,
    pub status: StepStatus,
    pub duration: Option<Duration>,
    pub detail: Option<String>,
}

impl StepOutcome {
    fn pending(kind: StepKind) -> Self {
        Self {
            kind,
            status: StepStatus::Pending,
            duration: None,
            detail: None,
        }
    }
}

/// A package whose version was confirmed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VerifiedPackage {
    pub name: String,
    pub version: String,
}

/// Record of a whole run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProvisionReport {
    /// One outcome per step, in execution order.
    pub steps: Vec<StepOutcome>,
    /// Packages verified, in verification order.
    pub verified: Vec<VerifiedPackage>,
    /// Cache removal totals.
    pub cleanup: CleanupStats,
    /// Wall-clock time of the run.
    pub total_duration: Duration,
    /// Whether nothing was executed.
    pub dry_run: bool,
}

impl ProvisionReport {
    /// Fresh report with every step pending.
    pub fn new(dry_run: bool) -> Self {
        Self {
            steps: StepKind::ALL.into_iter().map(StepOutcome::pending).collect(),
            verified: Vec::new(),
            cleanup: CleanupStats::default(),
            total_duration: Duration::ZERO,
            dry_run,
        }
    }

    /// Outcome for a step.
    pub fn step(&self, kind: StepKind) -> Option<&StepOutcome> {
        self.steps.iter().find(|s| s.kind == kind)
    }

    pub(crate) fn record(
        &mut self,
        kind: StepKind,
        status: StepStatus,
        duration: Option<Duration>,
        detail: Option<String>,
    ) {
        if let Some(outcome) = self.steps.iter_mut().find(|s| s.kind == kind) {
            outcome.status = status;
            outcome.duration = duration;
            outcome.detail = detail;
        }
    }

    /// Mark every step still pending as skipped.
    pub(crate) fn skip_remaining(&mut self, detail: &str) {
        for outcome in self.steps.iter_mut() {
            if outcome.status == StepStatus::Pending {
                outcome.status = StepStatus::Skipped;
                outcome.detail = Some(detail.to_string());
            }
        }
    }

    /// True when no step failed.
    pub fn success(&self) -> bool {
        self.failed_step().is_none()
    }

    /// The step that failed, if any.
    pub fn failed_step(&self) -> Option<StepKind> {
        self.steps
            .iter()
            .find(|s| s.status == StepStatus::Failed)
            .map(|s| s.kind)
    }

    /// Convert into the UI summary.
    pub fn summary(&self) -> RunSummary {
        let step_results = self
            .steps
            .iter()
            .map(|s| {
                let detail = match (s.kind, s.status) {
                    (StepKind::Cleanup, StepStatus::Completed) => Some(self.cleanup_detail()),
                    _ => s.detail.clone(),
                };
                StepSummary {
                    name: s.kind.name().to_string(),
                    status: StatusKind::from(s.status),
                    duration: s.duration,
                    detail,
                }
            })
            .collect();

        RunSummary {
            step_results,
            total_duration: self.total_duration,
            steps_run: self
                .steps
                .iter()
                .filter(|s| matches!(s.status, StepStatus::Completed | StepStatus::Failed))
                .count(),
            steps_skipped: self
                .steps
                .iter()
                .filter(|s| s.status == StepStatus::Skipped)
                .count(),
            success: self.success(),
            failed_step: self.failed_step().map(|k| k.name().to_string()),
        }
    }

    fn cleanup_detail(&self) -> String {
        let mut detail = format!("freed {}", format_bytes(self.cleanup.bytes_freed));
        if !self.cleanup.failures.is_empty() {
            detail.push_str(&format!(", {} not removed", self.cleanup.failures.len()));
        }
        detail
    }
}
