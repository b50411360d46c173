//! Viewport multiplexing: expanding one snap into per-viewport captures.
//!
//! A multiplexed snap resizes the engine to each configured viewport in order
//! and captures once per size; a single snap captures once at the first
//! configured viewport. Per-viewport wait failures are independent: a missed
//! selector at one size never cancels the remaining sizes. Above the returned
//! expansion the multiplexing is invisible: all refs land in one SnapRecord.

use std::path::Path;

use tracing::warn;

use crate::artifacts;
use crate::engine::{PageEngine, WaitOutcome};
use crate::session::types::{SessionError, SessionResult, TestSession};

/// Captures produced for one logical snap
#[derive(Debug)]
pub struct SnapExpansion {
    /// Base refs of the captures that succeeded, in viewport order
    pub screenshots: Vec<String>,

    /// Whether any viewport's wait for the selector timed out
    pub selector_missed: bool,
}

/// Capture one logical snap across the session's viewports.
///
/// Refs are `{hierarchy}{seq}` for single captures and `{hierarchy}{seq}_{name}`
/// per viewport when multiplexed. An empty viewport set is a configuration
/// error: a snap that captures nothing must never look like a pass.
pub fn expand<P: PageEngine>(
    engine: &mut P,
    session: &TestSession,
    screenshot_root: &Path,
    selector: &str,
    exclude: Option<&str>,
    multiplex: bool,
) -> SessionResult<SnapExpansion> {
    let Some(first_viewport) = session.viewports.first() else {
        return Err(SessionError::EmptyViewports);
    };

    let seq = session.next_snap_number;
    let mut screenshots = Vec::new();
    let mut selector_missed = false;

    if !multiplex {
        let screenshot_ref = format!("{}{}", session.hierarchy_path, seq);
        engine.set_viewport(first_viewport.width, first_viewport.height)?;
        match engine.wait_for_selector(selector)? {
            WaitOutcome::Found => {
                let target = artifacts::baseline_path(screenshot_root, &screenshot_ref);
                engine.capture(selector, exclude, &target)?;
                screenshots.push(screenshot_ref);
            }
            WaitOutcome::NotFound => {
                warn!(selector, "selector not found for snap {}", seq);
                selector_missed = true;
            }
        }
        return Ok(SnapExpansion {
            screenshots,
            selector_missed,
        });
    }

    for viewport in &session.viewports {
        let screenshot_ref = format!("{}{}_{}", session.hierarchy_path, seq, viewport.name);
        engine.set_viewport(viewport.width, viewport.height)?;
        match engine.wait_for_selector(selector)? {
            WaitOutcome::Found => {
                let target = artifacts::baseline_path(screenshot_root, &screenshot_ref);
                engine.capture(selector, exclude, &target)?;
                screenshots.push(screenshot_ref);
            }
            WaitOutcome::NotFound => {
                warn!(
                    selector,
                    viewport = %viewport.name,
                    "selector not found for snap {}",
                    seq
                );
                selector_missed = true;
            }
        }
    }

    Ok(SnapExpansion {
        screenshots,
        selector_missed,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::default_viewports;
    use crate::engine::{MockPageEngine, PageCall};
    use crate::session::types::TestSession;

    fn session() -> TestSession {
        TestSession::new("home", "Home page", default_viewports())
    }

    #[test]
    fn test_multiplexed_refs_per_viewport() {
        let dir = tempfile::tempdir().unwrap();
        let mut engine = MockPageEngine::new();
        let session = session();

        let expansion = expand(&mut engine, &session, dir.path(), "body", None, true).unwrap();

        assert!(!expansion.selector_missed);
        assert_eq!(
            expansion.screenshots,
            vec!["home0_small", "home0_medium", "home0_large"]
        );
        assert_eq!(engine.capture_count(), 3);
        // Viewport is resized before each wait
        assert_eq!(engine.calls[0], PageCall::SetViewport(320, 480));
        assert_eq!(engine.calls[1], PageCall::WaitForSelector("body".to_string()));
    }

    #[test]
    fn test_single_capture_has_no_suffix() {
        let dir = tempfile::tempdir().unwrap();
        let mut engine = MockPageEngine::new();
        let session = session();

        let expansion = expand(&mut engine, &session, dir.path(), "body", None, false).unwrap();

        assert_eq!(expansion.screenshots, vec!["home0"]);
        assert_eq!(engine.capture_count(), 1);
        assert_eq!(engine.calls[0], PageCall::SetViewport(320, 480));
    }

    #[test]
    fn test_missed_selector_does_not_cancel_remaining_viewports() {
        let dir = tempfile::tempdir().unwrap();
        let mut engine = MockPageEngine::new().with_missing_selector("#flaky");
        let session = session();

        let expansion = expand(&mut engine, &session, dir.path(), "#flaky", None, true).unwrap();

        assert!(expansion.selector_missed);
        assert!(expansion.screenshots.is_empty());
        // All three viewports were still attempted
        let waits = engine
            .calls
            .iter()
            .filter(|c| matches!(c, PageCall::WaitForSelector(_)))
            .count();
        assert_eq!(waits, 3);
    }

    #[test]
    fn test_empty_viewport_set_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let mut engine = MockPageEngine::new();
        let session = TestSession::new("home", "Home page", vec![]);

        for multiplex in [true, false] {
            let err =
                expand(&mut engine, &session, dir.path(), "body", None, multiplex).unwrap_err();
            assert!(matches!(err, SessionError::EmptyViewports));
        }
        assert_eq!(engine.capture_count(), 0);
    }

    #[test]
    fn test_exclude_selector_forwarded() {
        let dir = tempfile::tempdir().unwrap();
        let mut engine = MockPageEngine::new();
        let session = session();

        expand(&mut engine, &session, dir.path(), "body", Some(".ad"), false).unwrap();

        assert!(engine.calls.iter().any(|c| matches!(
            c,
            PageCall::Capture { exclude: Some(e), .. } if e == ".ad"
        )));
    }
}
