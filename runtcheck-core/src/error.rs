//! Error types for runtcheck core.
//!
//! Only [`RuntCheckError::RepoNotFound`] and [`RuntCheckError::RepoTooLarge`]
//! are expected to surface from a scan; recoverable problems are recorded as
//! [`crate::ScanWarning`] values inside the result instead.

use std::path::PathBuf;
use std::{error::Error, fmt, io};

/// Error type for runtcheck core operations.
#[derive(Debug)]
pub enum RuntCheckError {
    /// The repository path does not exist.
    RepoNotFound(PathBuf),
    /// The repository walk exceeded the configured file ceiling.
    RepoTooLarge {
        /// Repository root that was being walked.
        path: PathBuf,
        /// File ceiling that was exceeded.
        limit: usize,
    },
    /// A rule id was registered twice in one catalog.
    DuplicateRule(String),
    /// An underlying I/O error.
    Io(io::Error),
    /// A JSON serialization error.
    Json(serde_json::Error),
    /// A catch-all error with a message.
    Other(String),
}

impl fmt::Display for RuntCheckError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::RepoNotFound(path) => write!(f, "repository not found: {}", path.display()),
            Self::RepoTooLarge { path, limit } => write!(
                f,
                "repository too large: {} has more than {limit} files",
                path.display()
            ),
            Self::DuplicateRule(id) => write!(f, "duplicate rule id: {id}"),
            Self::Io(err) => write!(f, "io error: {err}"),
            Self::Json(err) => write!(f, "json error: {err}"),
            Self::Other(message) => write!(f, "{message}"),
        }
    }
}

impl Error for RuntCheckError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Io(err) => Some(err),
            Self::Json(err) => Some(err),
            _ => None,
        }
    }
}

impl From<io::Error> for RuntCheckError {
    fn from(value: io::Error) -> Self {
        Self::Io(value)
    }
}

impl From<serde_json::Error> for RuntCheckError {
    fn from(value: serde_json::Error) -> Self {
        Self::Json(value)
    }
}

impl RuntCheckError {
    /// Whether the error ends the scan of a single repository only.
    ///
    /// Fleet scans record these per repository and keep going.
    pub fn is_repo_failure(&self) -> bool {
        matches!(self, Self::RepoNotFound(_) | Self::RepoTooLarge { .. })
    }
}

/// Convenience result type for runtcheck core.
pub type Result<T> = std::result::Result<T, RuntCheckError>;
