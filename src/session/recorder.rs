//! Snapshot recording: ordered append with stale-artifact eviction.
//!
//! Before a new capture record is accepted, any `.diff.png` left by a prior
//! run for the same refs is deleted, so an old comparison cannot be misread
//! as belonging to the new capture.

use std::fs;
use std::path::Path;

use tracing::debug;

use crate::artifacts;
use crate::session::types::{SnapRecord, TestSession};

/// Append a snap record to the session, assigning the next sequence number.
///
/// Sessions are single-threaded, so reading and bumping the counter here is
/// the only assignment path; numbers within a session are exactly
/// `0..snaps.len()` in capture order.
pub fn record(
    session: &mut TestSession,
    screenshot_root: &Path,
    css_selector: &str,
    annotation: &str,
    screenshots: Vec<String>,
) -> usize {
    for screenshot_ref in &screenshots {
        evict_stale_diff(screenshot_root, screenshot_ref);
    }

    let sequence_number = session.next_snap_number;
    session.snaps.push(SnapRecord {
        sequence_number,
        screenshots,
        annotation: annotation.to_string(),
        css_selector: css_selector.to_string(),
    });
    session.next_snap_number += 1;
    sequence_number
}

/// Delete a prior run's diff artifact for this ref, if present
fn evict_stale_diff(screenshot_root: &Path, screenshot_ref: &str) {
    let stale = artifacts::diff_path(screenshot_root, screenshot_ref);
    if stale.is_file() {
        debug!(path = %stale.display(), "removing stale diff artifact");
        let _ = fs::remove_file(&stale);
    }
}
