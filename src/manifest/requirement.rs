//! Single requirement lines.

use regex::Regex;
use std::sync::LazyLock;

static REQUIREMENT_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?x)
        ^(?P<name>[A-Za-z0-9](?:[A-Za-z0-9._-]*[A-Za-z0-9])?)
        \s*(?:\[(?P<extras>[^\]]*)\])?
        \s*(?:
            @\s*(?P<url>\S+)
          | (?P<spec>(?:===|==|~=|!=|<=|>=|<|>)[^;]*)
        )?
        \s*(?:;\s*(?P<marker>.+))?$",
    )
    .expect("requirement regex is valid")
});

/// Start of per-requirement options such as `--hash=sha256:...`.
static OPTION_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s--[A-Za-z]").expect("option regex is valid"));

/// A package requirement from a manifest line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Requirement {
    /// Name as written.
    pub name: String,

    /// Extras inside `[...]`.
    pub extras: Vec<String>,

    /// Version specifier such as `==2.12.1` or `>=1.2,<2`.
    pub specifier: Option<String>,

    /// Direct reference (`name @ url`).
    pub url: Option<String>,

    /// Environment marker after `;`.
    pub marker: Option<String>,

    /// Per-requirement option tokens (`--hash`, `--config-settings`, ...).
    pub options: Vec<String>,
}

impl Requirement {
    /// Parse one requirement, returning `None` if the text is not one.
    pub fn parse(text: &str) -> Option<Self> {
        let text = text.trim();
        let (body, options) = match OPTION_REGEX.find(text) {
            Some(m) => (
                &text[..m.start()],
                text[m.start()..]
                    .split_whitespace()
                    .map(str::to_string)
                    .collect(),
            ),
            None => (text, Vec::new()),
        };
        let caps = REQUIREMENT_REGEX.captures(body.trim_end())?;

        let extras = caps
            .name("extras")
            .map(|m| {
                m.as_str()
                    .split(',')
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default();

        let specifier = caps
            .name("spec")
            .map(|m| m.as_str().split_whitespace().collect::<String>())
            .filter(|s| !s.is_empty());

        Some(Self {
            name: caps["name"].to_string(),
            extras,
            specifier,
            url: caps.name("url").map(|m| m.as_str().to_string()),
            marker: caps.name("marker").map(|m| m.as_str().trim().to_string()),
            options,
        })
    }

    /// Name normalized for comparisons.
    pub fn normalized_name(&self) -> String {
        normalize_name(&self.name)
    }

    /// Version when the specifier is a single exact `==` pin without wildcards.
    pub fn pinned_version(&self) -> Option<&str> {
        let spec = self.specifier.as_deref()?;
        if spec.contains(',') || spec.starts_with("===") {
            return None;
        }
        let version = spec.strip_prefix("==")?;
        if version.is_empty() || version.contains('*') {
            None
        } else {
            Some(version)
        }
    }
}

/// Normalize a distribution name: lowercase, runs of `-`, `_`, `.` become `-`.
pub fn normalize_name(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    let mut in_separator = false;
    for c in name.chars() {
        if matches!(c, '-' | '_' | '.') {
            if !in_separator {
                out.push('-');
            }
            in_separator = true;
        } else {
            out.push(c.to_ascii_lowercase());
            in_separator = false;
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_exact_pin() {
        let req = Requirement::parse("tensorflow==2.12.1").unwrap();
        assert_eq!(req.name, "tensorflow");
        assert_eq!(req.specifier.as_deref(), Some("==2.12.1"));
        assert_eq!(req.pinned_version(), Some("2.12.1"));
    }

    #[test]
    fn parses_extras_and_marker() {
        let req = Requirement::parse("gunicorn[gevent, setproctitle] == 20.1.0 ; python_version >= \"3.8\"")
            .unwrap();
        assert_eq!(req.extras, vec!["gevent", "setproctitle"]);
        assert_eq!(req.pinned_version(), Some("20.1.0"));
        assert_eq!(req.marker.as_deref(), Some("python_version >= \"3.8\""));
    }

    #[test]
    fn range_is_not_a_pin() {
        let req = Requirement::parse("joblib>=1.2,<2").unwrap();
        assert_eq!(req.specifier.as_deref(), Some(">=1.2,<2"));
        assert_eq!(req.pinned_version(), None);
    }

    #[test]
    fn wildcard_is_not_a_pin() {
        let req = Requirement::parse("numpy==1.23.*").unwrap();
        assert_eq!(req.pinned_version(), None);
    }

    #[test]
    fn bare_name_has_no_specifier() {
        let req = Requirement::parse("Flask").unwrap();
        assert!(req.specifier.is_none());
        assert!(req.pinned_version().is_none());
    }

    #[test]
    fn direct_reference() {
        let req = Requirement::parse("mypkg @ https://example.com/mypkg-1.0-py3-none-any.whl").unwrap();
        assert_eq!(req.name, "mypkg");
        assert!(req.url.is_some());
        assert!(req.specifier.is_none());
    }

    #[test]
    fn hash_options_are_split_from_specifier() {
        let req = Requirement::parse("flask==2.3.2   --hash=sha256:abcd --hash=sha256:ef01").unwrap();
        assert_eq!(req.specifier.as_deref(), Some("==2.3.2"));
        assert_eq!(req.pinned_version(), Some("2.3.2"));
        assert_eq!(req.options, vec!["--hash=sha256:abcd", "--hash=sha256:ef01"]);
    }

    #[test]
    fn options_follow_marker_and_url() {
        let req = Requirement::parse("numpy==1.23.5 ; python_version < \"3.11\" --hash=sha256:aa").unwrap();
        assert_eq!(req.marker.as_deref(), Some("python_version < \"3.11\""));
        assert_eq!(req.pinned_version(), Some("1.23.5"));

        let req = Requirement::parse("mypkg @ https://example.com/mypkg.whl --hash=sha256:bb").unwrap();
        assert_eq!(req.url.as_deref(), Some("https://example.com/mypkg.whl"));
        assert_eq!(req.options, vec!["--hash=sha256:bb"]);
    }

    #[test]
    fn rejects_non_requirements() {
        assert!(Requirement::parse("==1.0").is_none());
        assert!(Requirement::parse("numpy 1.23").is_none());
    }

    #[test]
    fn normalization_follows_pep503() {
        assert_eq!(normalize_name("Scikit_Learn"), "scikit-learn");
        assert_eq!(normalize_name("zope..interface"), "zope-interface");
        assert_eq!(normalize_name("NumPy"), "numpy");
    }
}
