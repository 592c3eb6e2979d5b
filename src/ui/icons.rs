//! Status vocabulary shared by every output path.

use super::theme::Theme;

/// Canonical status kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StatusKind {
    /// Operation completed successfully.
    Success,
    /// Operation failed.
    Failed,
    /// Operation was skipped.
    Skipped,
    /// Operation has not been run yet.
    Pending,
    /// Non-fatal warning.
    Warning,
}

impl StatusKind {
    /// Unicode icon.
    pub fn icon(self) -> &'static str {
        match self {
            Self::Success => "✓",
            Self::Failed => "✗",
            Self::Skipped => "○",
            Self::Pending => "◌",
            Self::Warning => "⚠",
        }
    }

    /// Styled icon string using the given theme.
    pub fn styled(self, theme: &Theme) -> String {
        let icon = self.icon();
        match self {
            Self::Success => theme.success.apply_to(icon).to_string(),
            Self::Failed => theme.error.apply_to(icon).to_string(),
            Self::Skipped | Self::Pending => theme.dim.apply_to(icon).to_string(),
            Self::Warning => theme.warning.apply_to(icon).to_string(),
        }
    }
}

impl From<crate::provision::StepStatus> for StatusKind {
    fn from(status: crate::provision::StepStatus) -> Self {
        match status {
            crate::provision::StepStatus::Completed => Self::Success,
            crate::provision::StepStatus::Failed => Self::Failed,
            crate::provision::StepStatus::Skipped => Self::Skipped,
            crate::provision::StepStatus::Pending => Self::Pending,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provision::StepStatus;

    #[test]
    fn icon_returns_unicode_symbols() {
        assert_eq!(StatusKind::Success.icon(), "✓");
        assert_eq!(StatusKind::Failed.icon(), "✗");
        assert_eq!(StatusKind::Skipped.icon(), "○");
        assert_eq!(StatusKind::Pending.icon(), "◌");
        assert_eq!(StatusKind::Warning.icon(), "⚠");
    }

    #[test]
    fn styled_plain_is_bare_icon() {
        assert_eq!(StatusKind::Failed.styled(&Theme::plain()), "✗");
    }

    #[test]
    fn converts_from_step_status() {
        assert_eq!(StatusKind::from(StepStatus::Completed), StatusKind::Success);
        assert_eq!(StatusKind::from(StepStatus::Failed), StatusKind::Failed);
        assert_eq!(StatusKind::from(StepStatus::Skipped), StatusKind::Skipped);
        assert_eq!(StatusKind::from(StepStatus::Pending), StatusKind::Pending);
    }
}
