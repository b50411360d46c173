use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::engine::EngineError;

/// A named viewport size
///
/// Immutable once handed to a session; multiplexed snaps capture once per
/// configured viewport, in order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Viewport {
    /// Short name used as capture file suffix (e.g. "small")
    pub name: String,

    /// Viewport width in pixels
    pub width: u32,

    /// Viewport height in pixels
    pub height: u32,
}

impl Viewport {
    /// Create a viewport definition
    pub fn new(name: &str, width: u32, height: u32) -> Self {
        Self {
            name: name.to_string(),
            width,
            height,
        }
    }
}

/// One logical screenshot request, possibly multiplexed across viewports
///
/// The persisted form carries only `screenshots`, `annotation` and
/// `cssSelector`; the sequence number is session-internal and recoverable
/// from the record's position.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SnapRecord {
    /// Position of this snap within the session, assigned at creation
    #[serde(skip_serializing, default)]
    pub sequence_number: usize,

    /// Base refs of the captures, relative to the screenshot root, no extension.
    /// Length 1 for single-viewport snaps, one per viewport when multiplexed.
    pub screenshots: Vec<String>,

    /// Comment describing what the snap checks
    pub annotation: String,

    /// CSS selector of the captured element
    pub css_selector: String,
}

/// State of one running test session, created by `start` and finalized by `end`
#[derive(Debug, Clone)]
pub struct TestSession {
    /// Slash-separated virtual path identifying the test (e.g. "shop/cart")
    pub hierarchy_path: String,

    /// Unique id derived from the hierarchy ('/' replaced by '-')
    pub test_id: String,

    /// Human description of the test
    pub description: String,

    /// Viewports captured by multiplexed snaps
    pub viewports: Vec<Viewport>,

    /// Ordered capture records, append-only
    pub snaps: Vec<SnapRecord>,

    /// Sequence number the next snap will take
    pub next_snap_number: usize,

    /// Whether any step has failed so far
    pub failed: bool,

    /// Why the session failed; first reason wins
    pub failure_reason: Option<String>,

    /// When the session started
    pub started_at: DateTime<Utc>,
}

impl TestSession {
    /// Create a fresh session for the given hierarchy path
    pub fn new(hierarchy_path: &str, description: &str, viewports: Vec<Viewport>) -> Self {
        Self {
            hierarchy_path: hierarchy_path.to_string(),
            test_id: hierarchy_path.replace('/', "-"),
            description: description.to_string(),
            viewports,
            snaps: Vec::new(),
            next_snap_number: 0,
            failed: false,
            failure_reason: None,
            started_at: Utc::now(),
        }
    }
}

/// Final verdict of a completed session
#[derive(Debug, Clone)]
pub struct SessionOutcome {
    /// Whether the session ended without any failure
    pub passed: bool,

    /// Process exit code reflecting the verdict (0 on pass, 1 on fail)
    pub exit_code: i32,
}

/// Result type for session operations
pub type SessionResult<T> = Result<T, SessionError>;

/// Error types for session operations
#[derive(Debug)]
pub enum SessionError {
    /// An engine operation failed outright (distinct from a test failure)
    Engine(EngineError),

    /// The session's result record could not be written
    Persistence(std::io::Error),

    /// The result record could not be serialized
    Serialization(serde_json::Error),

    /// `set_viewports` was called with an empty list
    EmptyViewports,
}

impl std::fmt::Display for SessionError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SessionError::Engine(err) => write!(f, "Engine error: {}", err),
            SessionError::Persistence(err) => write!(f, "Persistence error: {}", err),
            SessionError::Serialization(err) => write!(f, "Serialization error: {}", err),
            SessionError::EmptyViewports => {
                write!(f, "Viewport set must contain at least one viewport")
            }
        }
    }
}

impl std::error::Error for SessionError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            SessionError::Engine(err) => Some(err),
            SessionError::Persistence(err) => Some(err),
            SessionError::Serialization(err) => Some(err),
            SessionError::EmptyViewports => None,
        }
    }
}

impl From<EngineError> for SessionError {
    fn from(err: EngineError) -> Self {
        SessionError::Engine(err)
    }
}

impl From<serde_json::Error> for SessionError {
    fn from(err: serde_json::Error) -> Self {
        SessionError::Serialization(err)
    }
}
