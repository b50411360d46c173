//! External collaborator abstractions for page driving and image comparison.
//!
//! This module provides the seams the session controller works against:
//! - `PageEngine` drives a rendered page (navigation, input, capture) with a
//!   wait-then-act contract: interactions targeting a selector first wait for
//!   it, and the wait returns an explicit [`WaitOutcome`] instead of invoking
//!   success/failure callbacks.
//! - `CompareEngine` compares the session's captures against their baselines
//!   and reports which refs mismatched.
//!
//! Real implementations wrap a browser-automation and a pixel-diff engine;
//! `MockPageEngine` and `MockCompareEngine` provide scripted doubles for tests.

pub mod mock;

use std::path::Path;
use std::time::Duration;

pub use mock::{MockCompareEngine, MockPageEngine, PageCall};

/// Result of waiting for a selector to appear
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaitOutcome {
    /// The selector appeared within the engine's timeout
    Found,
    /// The selector did not appear within the engine's timeout
    NotFound,
}

/// Outcome of comparing a session's captures against their baselines
#[derive(Debug, Clone, Default)]
pub struct CompareOutcome {
    /// Base refs whose comparison exceeded the tolerance
    pub mismatches: Vec<String>,
}

impl CompareOutcome {
    /// Whether every capture matched its baseline
    pub fn passed(&self) -> bool {
        self.mismatches.is_empty()
    }
}

/// Result type for engine operations
pub type EngineResult<T> = Result<T, EngineError>;

/// Error types for engine operations
#[derive(Debug)]
pub enum EngineError {
    /// The engine could not perform the requested operation
    Engine(String),

    /// I/O error while writing a capture
    Io(std::io::Error),
}

impl std::fmt::Display for EngineError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EngineError::Engine(msg) => write!(f, "Engine error: {}", msg),
            EngineError::Io(err) => write!(f, "I/O error: {}", err),
        }
    }
}

impl std::error::Error for EngineError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            EngineError::Engine(_) => None,
            EngineError::Io(err) => Some(err),
        }
    }
}

impl From<std::io::Error> for EngineError {
    fn from(err: std::io::Error) -> Self {
        EngineError::Io(err)
    }
}

/// Trait for page-driving engines
///
/// All steps run on a single cooperative timeline: the controller calls these
/// methods strictly in the order the session enqueued them, never concurrently.
pub trait PageEngine {
    /// Open the given URL, replacing the current page
    fn open(&mut self, url: &str) -> EngineResult<()>;

    /// Resize the rendering viewport
    fn set_viewport(&mut self, width: u32, height: u32) -> EngineResult<()>;

    /// Override the user agent string for subsequent navigation
    fn set_user_agent(&mut self, user_agent: &str) -> EngineResult<()>;

    /// Wait for a selector to appear, up to the engine's timeout
    fn wait_for_selector(&mut self, selector: &str) -> EngineResult<WaitOutcome>;

    /// Click the element matching the selector
    fn click(&mut self, selector: &str) -> EngineResult<()>;

    /// Type text into the element matching the selector
    fn send_keys(&mut self, selector: &str, keys: &str) -> EngineResult<()>;

    /// Press the enter key while the element matching the selector has focus
    fn press_enter(&mut self, selector: &str) -> EngineResult<()>;

    /// Attach a local file to the input matching the selector
    fn upload_file(&mut self, selector: &str, file: &Path) -> EngineResult<()>;

    /// Move the pointer over the element matching the selector
    fn mouseover(&mut self, selector: &str) -> EngineResult<()>;

    /// Evaluate a script in the page context
    fn evaluate(&mut self, script: &str) -> EngineResult<()>;

    /// Suspend the timeline for a fixed delay
    fn wait(&mut self, duration: Duration) -> EngineResult<()>;

    /// Capture the element matching the selector as a PNG at `target`,
    /// optionally blanking the region matching `exclude`
    fn capture(&mut self, selector: &str, exclude: Option<&str>, target: &Path)
    -> EngineResult<()>;
}

/// Trait for screenshot comparison engines
pub trait CompareEngine {
    /// Compare every captured ref against its baseline and report mismatches.
    ///
    /// Refs are base identifiers relative to the screenshot root; the engine
    /// owns creating `.diff.png`/`.fail.png` artifacts next to the baselines.
    fn compare_session(&mut self, refs: &[String]) -> EngineResult<CompareOutcome>;
}
