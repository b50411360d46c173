//! Result persistence: one JSON record per test.
//!
//! The record's on-disk path mirrors the test hierarchy under the results
//! root (`results_root/<hierarchy>.json`) and is the only index there is.
//! Overwriting a record at the same path is how a test gets re-run.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::session::types::{SessionError, SessionResult, SnapRecord, TestSession, Viewport};

/// Extension of persisted result records
pub const RECORD_EXT: &str = "json";

/// Persisted form of a finished (or failed) test session
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResultRecord {
    /// Human description of the test
    pub description: String,

    /// Unique id derived from the hierarchy
    pub test_id: String,

    /// Slash-separated virtual path of the test
    pub test_hierarchy: String,

    /// Ordered capture records
    pub snaps: Vec<SnapRecord>,

    /// Whether the session ended without any failure
    pub passed: bool,

    /// When the record was written, as epoch milliseconds
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub last_execution: DateTime<Utc>,

    /// Viewports the session captured with
    #[serde(default)]
    pub viewports: Vec<Viewport>,

    /// Why the session failed; present iff `!passed`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failure_reason: Option<String>,
}

impl ResultRecord {
    /// Build a record from the current session state.
    ///
    /// Snaps are cloned so later mutation of the live session cannot alter a
    /// record that was already written.
    pub fn from_session(session: &TestSession) -> Self {
        Self {
            description: session.description.clone(),
            test_id: session.test_id.clone(),
            test_hierarchy: session.hierarchy_path.clone(),
            snaps: session.snaps.clone(),
            passed: !session.failed,
            last_execution: Utc::now(),
            viewports: session.viewports.clone(),
            failure_reason: if session.failed {
                session.failure_reason.clone()
            } else {
                None
            },
        }
    }
}

/// Canonical record path for a hierarchy path
pub fn record_path(results_root: &Path, hierarchy_path: &str) -> PathBuf {
    results_root.join(format!("{}.{}", hierarchy_path, RECORD_EXT))
}

/// Serialize the session's current state to its canonical record path.
///
/// Missing intermediate directories are created. A write failure is fatal to
/// the session: a lost record is indistinguishable from a test that never ran.
pub fn save(session: &TestSession, results_root: &Path) -> SessionResult<ResultRecord> {
    let record = ResultRecord::from_session(session);
    let path = record_path(results_root, &record.test_hierarchy);

    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(SessionError::Persistence)?;
    }
    let data = serde_json::to_string(&record)?;
    fs::write(&path, data).map_err(SessionError::Persistence)?;

    debug!(path = %path.display(), passed = record.passed, "result record written");
    Ok(record)
}

/// Load a record from its canonical path
pub fn load(results_root: &Path, hierarchy_path: &str) -> std::io::Result<ResultRecord> {
    let data = fs::read_to_string(record_path(results_root, hierarchy_path))?;
    serde_json::from_str(&data).map_err(std::io::Error::other)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::default_viewports;
    use pretty_assertions::assert_eq;

    fn session_with_snaps() -> TestSession {
        let mut session = TestSession::new("shop/cart", "Cart page", default_viewports());
        session.snaps.push(SnapRecord {
            sequence_number: 0,
            screenshots: vec![
                "shop/cart0_small".to_string(),
                "shop/cart0_medium".to_string(),
                "shop/cart0_large".to_string(),
            ],
            annotation: "cart contents".to_string(),
            css_selector: "#cart".to_string(),
        });
        session.next_snap_number = 1;
        session
    }

    #[test]
    fn test_save_creates_intermediate_dirs() {
        let dir = tempfile::tempdir().unwrap();
        let session = session_with_snaps();

        save(&session, dir.path()).unwrap();

        assert!(dir.path().join("shop").join("cart.json").is_file());
    }

    #[test]
    fn test_round_trip_preserves_snaps() {
        let dir = tempfile::tempdir().unwrap();
        let session = session_with_snaps();

        save(&session, dir.path()).unwrap();
        let loaded = load(dir.path(), "shop/cart").unwrap();

        assert_eq!(loaded.test_id, "shop-cart");
        assert_eq!(loaded.snaps.len(), 1);
        assert_eq!(loaded.snaps[0].annotation, "cart contents");
        assert_eq!(loaded.snaps[0].css_selector, "#cart");
        assert_eq!(loaded.snaps[0].screenshots, session.snaps[0].screenshots);
        assert!(loaded.passed);
        assert_eq!(loaded.viewports, session.viewports);
    }

    #[test]
    fn test_failure_reason_present_iff_failed() {
        let dir = tempfile::tempdir().unwrap();
        let mut session = session_with_snaps();

        let record = save(&session, dir.path()).unwrap();
        assert!(record.failure_reason.is_none());

        session.failed = true;
        session.failure_reason = Some("Selector '#cart' not found".to_string());
        let record = save(&session, dir.path()).unwrap();
        assert!(!record.passed);
        assert_eq!(
            record.failure_reason.as_deref(),
            Some("Selector '#cart' not found")
        );
    }

    #[test]
    fn test_overwrite_is_not_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let session = session_with_snaps();
        save(&session, dir.path()).unwrap();
        save(&session, dir.path()).unwrap();
    }

    #[test]
    fn test_saved_record_is_detached_from_live_session() {
        let dir = tempfile::tempdir().unwrap();
        let mut session = session_with_snaps();

        save(&session, dir.path()).unwrap();
        session.snaps[0].annotation = "mutated later".to_string();

        let loaded = load(dir.path(), "shop/cart").unwrap();
        assert_eq!(loaded.snaps[0].annotation, "cart contents");
    }

    #[test]
    fn test_record_json_keys_are_camel_case() {
        let record = ResultRecord::from_session(&session_with_snaps());
        let json = serde_json::to_value(&record).unwrap();
        assert!(json.get("testId").is_some());
        assert!(json.get("testHierarchy").is_some());
        assert!(json.get("lastExecution").is_some());
        assert!(json["lastExecution"].is_i64());
        assert!(json.get("failureReason").is_none());
    }
}
