//! Viewer backend: result-tree aggregation and baseline maintenance.
//!
//! Reads the persisted records and screenshot artifacts the session side
//! writes, independent of any live session. `tree` turns the results
//! directory into nested pass/fail statistics and per-test detail views;
//! `baseline` promotes or discards changed screenshots; `routes` exposes both
//! over HTTP.

pub mod baseline;
pub mod routes;
pub mod tree;

pub use baseline::{keep_baseline, update_baseline};
pub use routes::{ViewerState, create_app};
pub use tree::{
    FolderContents, FolderNode, FolderStats, SnapDetails, TestDetails, TestSummary,
    failed_tests, folder_contents, folder_stats, test_details,
};

/// Result type for viewer operations
pub type ViewerResult<T> = Result<T, ViewerError>;

/// Error types for viewer operations
#[derive(Debug)]
pub enum ViewerError {
    /// I/O error while walking the results tree or mutating artifacts
    Io(std::io::Error),

    /// A persisted record could not be parsed
    Parse(serde_json::Error),

    /// A requested path resolves outside the configured root
    PathTraversal(String),

    /// `update-baseline` with no diff artifact to promote
    NothingToPromote(String),

    /// The requested record does not exist
    NotFound(String),
}

impl std::fmt::Display for ViewerError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ViewerError::Io(err) => write!(f, "I/O error: {}", err),
            ViewerError::Parse(err) => write!(f, "Record parse error: {}", err),
            ViewerError::PathTraversal(path) => {
                write!(f, "Path escapes the configured root: {}", path)
            }
            ViewerError::NothingToPromote(path) => {
                write!(f, "No diff artifact to promote for: {}", path)
            }
            ViewerError::NotFound(path) => write!(f, "No such test record: {}", path),
        }
    }
}

impl std::error::Error for ViewerError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ViewerError::Io(err) => Some(err),
            ViewerError::Parse(err) => Some(err),
            _ => None,
        }
    }
}

impl From<std::io::Error> for ViewerError {
    fn from(err: std::io::Error) -> Self {
        ViewerError::Io(err)
    }
}

impl From<serde_json::Error> for ViewerError {
    fn from(err: serde_json::Error) -> Self {
        ViewerError::Parse(err)
    }
}
