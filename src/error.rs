//! Domain error taxonomy. Plumbing failures (I/O, SQLite, thread joins) stay `anyhow` with context;
//! these variants are the ones an operator has to act on, and callers can `downcast_ref` them.

use std::path::PathBuf;
use thiserror::Error;

/// Hint appended to integrity failures.
pub const INTEGRITY_HINT: &str = "This is likely caused by insufficient memory leading to a silent worker crash. \
     Rerun with more memory per worker, or with --restart-collect on the binary path.";

#[derive(Debug, Error)]
pub enum CollateError {
    /// Header prefix, header ids, column names or a body row did not parse.
    #[error("{}: not a track file: {reason}", path.display())]
    Format { path: PathBuf, reason: String },

    /// No candidate row width matched the id-field convention.
    #[error("{}: could not infer the binary row width from {values} values (tried widths 18..=23)", path.display())]
    LayoutInference { path: PathBuf, values: usize },

    /// Structurally corrupt input, or inputs from mismatched runs.
    #[error("inconsistent layout in {context}: {reason}")]
    InconsistentLayout { context: String, reason: String },

    /// Post-hoc row or file count mismatch.
    #[error("collation integrity check failed: expected {expected} {what} but found {actual}. {hint}", hint = INTEGRITY_HINT)]
    CollationIntegrity {
        what: &'static str,
        expected: usize,
        actual: usize,
    },

    #[error("no {pattern} files found in {}", dir.display())]
    NoInputFiles { dir: PathBuf, pattern: String },

    #[error("run cancelled during the {stage} stage; intermediate stores were kept")]
    Cancelled { stage: &'static str },
}

impl CollateError {
    pub fn format(path: &std::path::Path, reason: impl Into<String>) -> Self {
        CollateError::Format {
            path: path.to_path_buf(),
            reason: reason.into(),
        }
    }

    pub fn inconsistent(context: impl Into<String>, reason: impl Into<String>) -> Self {
        CollateError::InconsistentLayout {
            context: context.into(),
            reason: reason.into(),
        }
    }
}
