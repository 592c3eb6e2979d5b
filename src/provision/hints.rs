//! Hints shown below a failed command's output.
//!
//! Output is matched against known failure signatures from apt and pip.
//! The first matching pattern wins; steps without a match fall back to a
//! generic hint for that step.

use crate::provision::StepKind;
use regex::Regex;
use std::sync::LazyLock;

struct HintPattern {
    /// Steps the pattern applies to; empty means any step.
    steps: &'static [StepKind],
    regex: LazyLock<Regex>,
    hint: fn(&regex::Captures) -> String,
}

macro_rules! pattern {
    ($steps:expr, $re:expr, $hint:expr) => {
        HintPattern {
            steps: $steps,
            regex: LazyLock::new(|| Regex::new($re).expect("hint pattern is valid")),
            hint: $hint,
        }
    };
}

static PATTERNS: [HintPattern; 6] = [
    pattern!(
        &[StepKind::SystemPackages],
        r"Unable to locate package (\S+)",
        |c| format!("'{}' is not in the package index of this base image", &c[1])
    ),
    pattern!(
        &[StepKind::SystemPackages],
        r"(?i)are you root\?|could not open lock file|Permission denied",
        |_| "The package manager needs root; build as root or use sudo".to_string()
    ),
    pattern!(
        &[],
        r"Temporary failure (in name )?resolution|Could not resolve|Network is unreachable",
        |_| "The build has no network access to the package servers".to_string()
    ),
    pattern!(
        &[StepKind::Installer, StepKind::Manifest],
        r"ReadTimeoutError|timed out",
        |_| "The package index timed out; retry or raise manifest.timeout_secs".to_string()
    ),
    pattern!(
        &[StepKind::Manifest],
        r"No matching distribution found for (\S+)",
        |c| format!(
            "No prebuilt wheel of {} matches this platform and source builds are disabled",
            &c[1]
        )
    ),
    pattern!(
        &[StepKind::Manifest],
        r"ResolutionImpossible|conflicting dependencies",
        |_| "The manifest pins versions that cannot be installed together".to_string()
    ),
];

/// Hint for a failed command in the given step.
pub fn hint_for(step: StepKind, output: &str) -> Option<String> {
    for pattern in PATTERNS.iter() {
        if !pattern.steps.is_empty() && !pattern.steps.contains(&step) {
            continue;
        }
        if let Some(caps) = pattern.regex.captures(output) {
            return Some((pattern.hint)(&caps));
        }
    }
    fallback(step).map(str::to_string)
}

fn fallback(step: StepKind) -> Option<&'static str> {
    match step {
        StepKind::SystemPackages => Some("Check the package names and that the build runs as root"),
        StepKind::Manifest => {
            Some("Every requirement needs a prebuilt wheel for this interpreter and platform")
        }
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_apt_package_names_package() {
        let output = "Reading package lists...\nE: Unable to locate package libpython3.10-dev\n";
        assert_eq!(
            hint_for(StepKind::SystemPackages, output).as_deref(),
            Some("'libpython3.10-dev' is not in the package index of this base image")
        );
    }

    #[test]
    fn missing_wheel_mentions_source_builds() {
        let output = "ERROR: No matching distribution found for tensorflow==2.12.1";
        let hint = hint_for(StepKind::Manifest, output).unwrap();
        assert!(hint.contains("tensorflow==2.12.1"));
        assert!(hint.contains("source builds are disabled"));
    }

    #[test]
    fn network_failure_matches_any_step() {
        let output = "Temporary failure in name resolution";
        assert!(hint_for(StepKind::Installer, output)
            .unwrap()
            .contains("network"));
    }

    #[test]
    fn step_filter_applies() {
        let output = "E: Unable to locate package foo";
        assert_eq!(hint_for(StepKind::Installer, output), None);
    }

    #[test]
    fn unmatched_output_falls_back_per_step() {
        assert!(hint_for(StepKind::SystemPackages, "boom").is_some());
        assert!(hint_for(StepKind::Verify, "boom").is_none());
    }
}
