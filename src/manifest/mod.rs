//! Requirements manifest parsing.
//!
//! Understands the subset of the pip requirements format that matters for
//! preflight checks: requirement lines, option lines, comments, and
//! backslash continuations. Lines without a readable package name, such as
//! direct URLs or local wheel paths, are kept verbatim and left for pip.

mod requirement;

pub use requirement::{normalize_name, Requirement};

use crate::error::{ProvisionError, Result};
use std::fs;
use std::path::{Path, PathBuf};

/// One meaningful manifest line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ManifestEntry {
    /// A package requirement.
    Requirement { line: usize, requirement: Requirement },
    /// An installer option such as `--index-url` or `-r other.txt`, kept verbatim.
    Option { line: usize, text: String },
    /// Anything else pip may accept, like `./vendor/x.whl` or `git+https://...`.
    Unnamed { line: usize, text: String },
}

/// A parsed requirements file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Manifest {
    path: Option<PathBuf>,
    entries: Vec<ManifestEntry>,
}

impl Manifest {
    /// Read and parse a manifest file.
    ///
    /// # Errors
    ///
    /// Returns `ManifestNotFound` if the file does not exist and `Io` if it
    /// cannot be read.
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                ProvisionError::ManifestNotFound {
                    path: path.to_path_buf(),
                }
            } else {
                ProvisionError::Io(e)
            }
        })?;

        let mut manifest = Self::parse(&content);
        manifest.path = Some(path.to_path_buf());
        Ok(manifest)
    }

    /// Parse manifest content. Every line is classified; nothing is rejected.
    pub fn parse(content: &str) -> Self {
        let mut entries = Vec::new();

        for (line, text) in logical_lines(content) {
            let text = strip_comment(&text);
            let text = text.trim();
            if text.is_empty() {
                continue;
            }

            if text.starts_with('-') {
                entries.push(ManifestEntry::Option {
                    line,
                    text: text.to_string(),
                });
                continue;
            }

            match Requirement::parse(text) {
                Some(requirement) => entries.push(ManifestEntry::Requirement { line, requirement }),
                None => entries.push(ManifestEntry::Unnamed {
                    line,
                    text: text.to_string(),
                }),
            }
        }

        Self {
            path: None,
            entries,
        }
    }

    /// Source path, when loaded from disk.
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// All entries in file order.
    pub fn entries(&self) -> &[ManifestEntry] {
        &self.entries
    }

    /// Requirement entries in file order.
    pub fn requirements(&self) -> impl Iterator<Item = &Requirement> {
        self.entries.iter().filter_map(|e| match e {
            ManifestEntry::Requirement { requirement, .. } => Some(requirement),
            _ => None,
        })
    }

    /// Option lines in file order.
    pub fn options(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().filter_map(|e| match e {
            ManifestEntry::Option { text, .. } => Some(text.as_str()),
            _ => None,
        })
    }

    /// Lines without a package name, with their line numbers.
    pub fn unnamed(&self) -> Vec<(usize, &str)> {
        self.entries
            .iter()
            .filter_map(|e| match e {
                ManifestEntry::Unnamed { line, text } => Some((*line, text.as_str())),
                _ => None,
            })
            .collect()
    }

    /// Look up a requirement by name, ignoring case and `-_.` differences.
    pub fn find(&self, name: &str) -> Option<&Requirement> {
        let wanted = normalize_name(name);
        self.requirements().find(|r| r.normalized_name() == wanted)
    }

    /// Exact `==` pin for a package, if the manifest has one.
    pub fn pinned_version(&self, name: &str) -> Option<&str> {
        self.find(name).and_then(Requirement::pinned_version)
    }

    /// Requirements that are not exact pins, with their line numbers.
    pub fn unpinned(&self) -> Vec<(usize, &Requirement)> {
        self.entries
            .iter()
            .filter_map(|e| match e {
                ManifestEntry::Requirement { line, requirement }
                    if requirement.pinned_version().is_none() && requirement.url.is_none() =>
                {
                    Some((*line, requirement))
                }
                _ => None,
            })
            .collect()
    }

    /// Number of requirement lines.
    pub fn len(&self) -> usize {
        self.requirements().count()
    }

    /// True when the manifest lists no requirements.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Join backslash continuations, keeping the first physical line number.
fn logical_lines(content: &str) -> Vec<(usize, String)> {
    let mut lines = Vec::new();
    let mut pending: Option<(usize, String)> = None;

    for (idx, raw) in content.lines().enumerate() {
        let number = idx + 1;
        let (start, mut text) = pending.take().unwrap_or((number, String::new()));
        if let Some(stripped) = raw.strip_suffix('\\') {
            text.push_str(stripped);
            pending = Some((start, text));
        } else {
            text.push_str(raw);
            lines.push((start, text));
        }
    }

    if let Some(last) = pending {
        lines.push(last);
    }

    lines
}

/// Remove a comment: `#` at line start or preceded by whitespace.
fn strip_comment(line: &str) -> &str {
    if line.trim_start().starts_with('#') {
        return "";
    }
    let bytes = line.as_bytes();
    for (i, b) in bytes.iter().enumerate() {
        if *b == b'#' && i > 0 && bytes[i - 1].is_ascii_whitespace() {
            return &line[..i];
        }
    }
    line
}
