use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Prefix of the metadata-stripped sibling kept next to an upload.
pub const CLEAN_COPY_PREFIX: &str = "clean_";

/// A file accepted by intake and written to the upload directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadedFile {
    pub original_name: String,
    pub stored_path: PathBuf,
    pub extension: String,
}

impl UploadedFile {
    /// Location of the clean copy for this file. The copy may not exist yet.
    pub fn clean_copy(&self) -> CleanCopy {
        let name = format!("{}{}", CLEAN_COPY_PREFIX, self.original_name);
        let stored_path = self
            .stored_path
            .parent()
            .map(|dir| dir.join(&name))
            .unwrap_or_else(|| PathBuf::from(&name));
        CleanCopy(UploadedFile {
            original_name: name,
            stored_path,
            extension: self.extension.clone(),
        })
    }
}

/// Metadata-stripped sibling of an [`UploadedFile`], named `clean_<original>`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CleanCopy(pub UploadedFile);

impl CleanCopy {
    pub fn file(&self) -> &UploadedFile {
        &self.0
    }

    pub fn path(&self) -> &Path {
        &self.0.stored_path
    }
}

/// Output of one metadata read: one `Tag : Value` line per entry, in the
/// order the tool printed them.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetadataReport {
    pub lines: Vec<String>,
    pub source_file: PathBuf,
}

impl MetadataReport {
    /// Keeps trimmed, non-empty lines of raw tool output.
    pub fn from_tool_output(stdout: &str, source_file: impl Into<PathBuf>) -> Self {
        let lines = stdout
            .lines()
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .map(str::to_string)
            .collect();
        Self {
            lines,
            source_file: source_file.into(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }
}

/// The most recent successful analysis held for a browser session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnalyzedFile {
    pub filename: String,
    pub filepath: PathBuf,
    pub metadata: MetadataReport,
}

/// Single-slot per-session cache. Each new analysis replaces the previous one.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum SessionState {
    #[default]
    Empty,
    Analyzed(AnalyzedFile),
}

impl SessionState {
    pub fn analyzed(&self) -> Option<&AnalyzedFile> {
        match self {
            SessionState::Analyzed(file) => Some(file),
            SessionState::Empty => None,
        }
    }
}
