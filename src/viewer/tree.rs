//! Result tree aggregation.
//!
//! The persisted records form a directory tree under the results root; this
//! module walks it depth-first and produces immutable aggregates: folder
//! statistics counting every descendant test, folder listings for one level,
//! and per-test detail views that probe the filesystem for the baseline,
//! diff and fail artifacts of every capture.

use std::fs;
use std::path::{Component, Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::artifacts;
use crate::persist::{self, ResultRecord};
use crate::session::types::{SnapRecord, Viewport};
use crate::viewer::{ViewerError, ViewerResult};

/// Display tab choices for a snap's detail view
pub const TAB_LATEST: &str = "latest";
pub const TAB_BASELINE: &str = "baseline";
pub const TAB_DIFF: &str = "diff";

/// Aggregate statistics of one folder, counting all descendants
#[derive(Debug, Clone, Default)]
pub struct FolderStats {
    /// Total number of test records under this folder
    pub n_tests: usize,
    /// Records that passed, in traversal order
    pub passed_tests: Vec<ResultRecord>,
    /// Records that failed, in traversal order
    pub failed_tests: Vec<ResultRecord>,
}

/// One subfolder entry in a folder listing
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FolderNode {
    /// Directory name
    pub name: String,
    /// Descendant tests that passed
    pub n_passed_tests: usize,
    /// Descendant tests that failed
    pub n_failed_tests: usize,
    /// Total descendant tests
    pub n_tests: usize,
}

/// One test entry in a folder listing
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TestSummary {
    /// Record file name without extension
    pub name: String,
    /// Unique test id
    pub test_id: String,
    /// Human description of the test
    pub description: String,
    /// Capture records
    pub snaps: Vec<SnapRecord>,
    /// Whether the last run passed
    pub passed: bool,
    /// Humanized time of the last run (e.g. "5 minutes ago")
    pub last_execution: String,
}

/// Immediate contents of one folder
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FolderContents {
    pub folders: Vec<FolderNode>,
    pub tests: Vec<TestSummary>,
}

/// Detail view of one snap, with per-ref artifact presence
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SnapDetails {
    /// Base refs of the snap's captures
    pub screenshots: Vec<String>,
    /// Comment describing what the snap checks
    pub annotation: String,
    /// CSS selector of the captured element
    pub css_selector: String,
    /// Tab the UI should open on: "latest", "baseline" or "diff"
    pub active_tab: String,
    /// Baseline image per ref, when present on disk
    pub base_screenshots: Vec<Option<String>>,
    /// Diff image per ref, when present on disk
    pub latest_screenshots: Vec<Option<String>>,
    /// Fail crop per ref, when present on disk
    pub fail_screenshots: Vec<Option<String>>,
}

/// Detail view of one test record
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TestDetails {
    pub description: String,
    pub test_id: String,
    pub test_hierarchy: String,
    pub snaps: Vec<SnapDetails>,
    pub passed: bool,
    /// Humanized time of the last run
    pub last_execution: String,
    pub viewports: Vec<Viewport>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failure_reason: Option<String>,
}

/// Resolve a virtual folder path inside the results root.
///
/// Rejects parent-directory segments instead of stripping them.
fn resolve_tree_path(results_root: &Path, path: &str) -> ViewerResult<PathBuf> {
    let trimmed = path.trim_start_matches('/');
    let rel = Path::new(trimmed);
    for component in rel.components() {
        match component {
            Component::Normal(_) | Component::CurDir => {}
            _ => return Err(ViewerError::PathTraversal(path.to_string())),
        }
    }
    Ok(results_root.join(rel))
}

/// List the immediate contents of a folder under the results root.
///
/// Hidden entries are skipped, as is the screenshot-storage directory when
/// listing the root itself. Subfolders carry aggregate stats over all their
/// descendants; record files become summaries with humanized timestamps.
/// Entries are sorted by name.
pub fn folder_contents(
    results_root: &Path,
    screenshot_root: &Path,
    path: &str,
) -> ViewerResult<FolderContents> {
    let folder = resolve_tree_path(results_root, path)?;
    let at_root = folder == *results_root;
    let screenshot_dir_name = screenshot_root.file_name().map(|n| n.to_os_string());

    let mut folders = Vec::new();
    let mut tests = Vec::new();

    for entry in fs::read_dir(&folder)? {
        let entry = entry?;
        let name = entry.file_name().to_string_lossy().to_string();
        if name.starts_with('.') {
            continue;
        }
        if at_root && Some(entry.file_name()) == screenshot_dir_name {
            continue;
        }

        let entry_path = entry.path();
        if entry_path.is_dir() {
            let stats = folder_stats(&entry_path)?;
            folders.push(FolderNode {
                name,
                n_passed_tests: stats.passed_tests.len(),
                n_failed_tests: stats.failed_tests.len(),
                n_tests: stats.n_tests,
            });
        } else if let Some(stem) = record_stem(&name) {
            let record = read_record(&entry_path)?;
            tests.push(TestSummary {
                name: stem.to_string(),
                test_id: record.test_id,
                description: record.description,
                snaps: record.snaps,
                passed: record.passed,
                last_execution: humanize_since(record.last_execution, Utc::now()),
            });
        }
    }

    folders.sort_by(|a, b| a.name.cmp(&b.name));
    tests.sort_by(|a, b| a.name.cmp(&b.name));
    Ok(FolderContents { folders, tests })
}

/// Recursively aggregate pass/fail statistics for a folder.
///
/// Additivity holds by construction: a folder's stats are the merge of its
/// subfolders' stats plus its own direct record files.
pub fn folder_stats(folder: &Path) -> ViewerResult<FolderStats> {
    let mut stats = FolderStats::default();

    for entry in fs::read_dir(folder)? {
        let entry = entry?;
        let name = entry.file_name().to_string_lossy().to_string();
        if name.starts_with('.') {
            continue;
        }

        let entry_path = entry.path();
        if entry_path.is_dir() {
            let sub = folder_stats(&entry_path)?;
            stats.n_tests += sub.n_tests;
            stats.passed_tests.extend(sub.passed_tests);
            stats.failed_tests.extend(sub.failed_tests);
        } else if record_stem(&name).is_some() {
            let record = read_record(&entry_path)?;
            stats.n_tests += 1;
            if record.passed {
                stats.passed_tests.push(record);
            } else {
                stats.failed_tests.push(record);
            }
        }
    }

    Ok(stats)
}

/// All failed tests under the results root, in traversal order
pub fn failed_tests(results_root: &Path) -> ViewerResult<Vec<ResultRecord>> {
    Ok(folder_stats(results_root)?.failed_tests)
}

/// Load one record and resolve its per-snap artifact presence.
///
/// Active-tab resolution per snap, evaluated per ref in array order with
/// last-write-wins: start on "latest"; a missing diff downgrades to
/// "baseline"; a present fail artifact escalates to "diff" (checked after
/// the downgrade, so fail presence takes priority within a ref).
pub fn test_details(
    results_root: &Path,
    screenshot_root: &Path,
    path: &str,
) -> ViewerResult<TestDetails> {
    resolve_tree_path(results_root, path)?;
    let record_file = persist::record_path(results_root, path.trim_start_matches('/'));
    if !record_file.is_file() {
        return Err(ViewerError::NotFound(path.to_string()));
    }
    let record = read_record(&record_file)?;

    let mut snaps = Vec::with_capacity(record.snaps.len());
    for snap in &record.snaps {
        let mut active_tab = TAB_LATEST;
        let mut base_screenshots = Vec::with_capacity(snap.screenshots.len());
        let mut latest_screenshots = Vec::with_capacity(snap.screenshots.len());
        let mut fail_screenshots = Vec::with_capacity(snap.screenshots.len());

        for screenshot_ref in &snap.screenshots {
            base_screenshots.push(
                artifacts::baseline_path(screenshot_root, screenshot_ref)
                    .is_file()
                    .then(|| format!("{}.png", screenshot_ref)),
            );

            if artifacts::diff_path(screenshot_root, screenshot_ref).is_file() {
                latest_screenshots.push(Some(format!("{}.diff.png", screenshot_ref)));
            } else {
                latest_screenshots.push(None);
                active_tab = TAB_BASELINE;
            }

            if artifacts::fail_path(screenshot_root, screenshot_ref).is_file() {
                fail_screenshots.push(Some(format!("{}.fail.png", screenshot_ref)));
                active_tab = TAB_DIFF;
            } else {
                fail_screenshots.push(None);
            }
        }

        snaps.push(SnapDetails {
            screenshots: snap.screenshots.clone(),
            annotation: snap.annotation.clone(),
            css_selector: snap.css_selector.clone(),
            active_tab: active_tab.to_string(),
            base_screenshots,
            latest_screenshots,
            fail_screenshots,
        });
    }

    Ok(TestDetails {
        description: record.description,
        test_id: record.test_id,
        test_hierarchy: record.test_hierarchy,
        snaps,
        passed: record.passed,
        last_execution: humanize_since(record.last_execution, Utc::now()),
        viewports: record.viewports,
        failure_reason: record.failure_reason,
    })
}

/// File stem if the entry is a persisted record, `None` otherwise
fn record_stem(name: &str) -> Option<&str> {
    name.strip_suffix(".json")
}

fn read_record(path: &Path) -> ViewerResult<ResultRecord> {
    let data = fs::read_to_string(path)?;
    Ok(serde_json::from_str(&data)?)
}

/// Render a past instant relative to `now` ("5 minutes ago").
///
/// Months are counted as 30 days and years as 365, which is as precise as a
/// humanized age needs to be.
pub fn humanize_since(then: DateTime<Utc>, now: DateTime<Utc>) -> String {
    const MINUTE: i64 = 60;
    const HOUR: i64 = 60 * MINUTE;
    const DAY: i64 = 24 * HOUR;
    const MONTH: i64 = 30 * DAY;
    const YEAR: i64 = 365 * DAY;

    let seconds = (now - then).num_seconds().max(0);
    if seconds < MINUTE {
        plural(seconds, "second")
    } else if seconds < HOUR {
        plural(seconds / MINUTE, "minute")
    } else if seconds < DAY {
        plural(seconds / HOUR, "hour")
    } else if seconds < MONTH {
        plural(seconds / DAY, "day")
    } else if seconds < YEAR {
        plural(seconds / MONTH, "month")
    } else {
        plural(seconds / YEAR, "year")
    }
}

fn plural(n: i64, unit: &str) -> String {
    if n == 1 {
        format!("1 {} ago", unit)
    } else {
        format!("{} {}s ago", n, unit)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use pretty_assertions::assert_eq;

    fn write_record(root: &Path, hierarchy: &str, passed: bool) {
        let path = persist::record_path(root, hierarchy);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        let record = serde_json::json!({
            "description": format!("test {}", hierarchy),
            "testId": hierarchy.replace('/', "-"),
            "testHierarchy": hierarchy,
            "snaps": [{
                "screenshots": [format!("{}0_small", hierarchy)],
                "annotation": "check",
                "cssSelector": "body",
            }],
            "passed": passed,
            "lastExecution": 1_700_000_000_000_i64,
            "viewports": [{"name": "small", "width": 320, "height": 480}],
        });
        fs::write(path, record.to_string()).unwrap();
    }

    #[test]
    fn test_folder_stats_additivity() {
        let dir = tempfile::tempdir().unwrap();
        write_record(dir.path(), "a/x", true);
        write_record(dir.path(), "a/y", false);
        write_record(dir.path(), "a/deep/z", false);
        write_record(dir.path(), "b/w", true);

        let total = folder_stats(dir.path()).unwrap();
        let a = folder_stats(&dir.path().join("a")).unwrap();
        let b = folder_stats(&dir.path().join("b")).unwrap();

        assert_eq!(total.n_tests, 4);
        assert_eq!(total.n_tests, a.n_tests + b.n_tests);
        assert_eq!(
            total.failed_tests.len(),
            a.failed_tests.len() + b.failed_tests.len()
        );
        assert_eq!(a.n_tests, 3);
        assert_eq!(a.failed_tests.len(), 2);
    }

    #[test]
    fn test_root_contents_with_passing_subfolder() {
        // Scenario: one subfolder with one passing record and nothing else
        let dir = tempfile::tempdir().unwrap();
        write_record(dir.path(), "home/landing", true);

        let contents =
            folder_contents(dir.path(), &dir.path().join("screenshots"), "/").unwrap();

        assert_eq!(contents.tests.len(), 0);
        assert_eq!(contents.folders.len(), 1);
        let node = &contents.folders[0];
        assert_eq!(node.name, "home");
        assert_eq!(node.n_tests, 1);
        assert_eq!(node.n_passed_tests, 1);
        assert_eq!(node.n_failed_tests, 0);
    }

    #[test]
    fn test_root_listing_skips_screenshot_dir_and_hidden() {
        let dir = tempfile::tempdir().unwrap();
        let screenshot_root = dir.path().join("screenshots");
        fs::create_dir_all(&screenshot_root).unwrap();
        fs::create_dir_all(dir.path().join(".git")).unwrap();
        write_record(dir.path(), "home/landing", true);

        let contents = folder_contents(dir.path(), &screenshot_root, "/").unwrap();
        let names: Vec<&str> = contents.folders.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, vec!["home"]);

        // Below the root the screenshot dir name is not special
        let nested = folder_contents(dir.path(), &screenshot_root, "home").unwrap();
        assert_eq!(nested.tests.len(), 1);
        assert_eq!(nested.tests[0].name, "landing");
    }

    #[test]
    fn test_contents_path_traversal_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let err = folder_contents(dir.path(), &dir.path().join("screenshots"), "../etc");
        assert!(matches!(err, Err(ViewerError::PathTraversal(_))));
    }

    #[test]
    fn test_details_fail_artifact_wins_over_missing_diff() {
        // A ref with a fail crop present and no diff must land on "diff"
        let dir = tempfile::tempdir().unwrap();
        let screenshot_root = dir.path().join("screenshots");
        fs::create_dir_all(&screenshot_root).unwrap();
        write_record(dir.path(), "home", false);
        fs::write(screenshot_root.join("home0_small.png"), b"base").unwrap();
        fs::write(screenshot_root.join("home0_small.fail.png"), b"crop").unwrap();

        let details = test_details(dir.path(), &screenshot_root, "home").unwrap();
        let snap = &details.snaps[0];
        assert_eq!(snap.active_tab, TAB_DIFF);
        assert_eq!(snap.base_screenshots, vec![Some("home0_small.png".to_string())]);
        assert_eq!(snap.latest_screenshots, vec![None]);
        assert_eq!(
            snap.fail_screenshots,
            vec![Some("home0_small.fail.png".to_string())]
        );
    }

    #[test]
    fn test_details_missing_diff_downgrades_to_baseline() {
        let dir = tempfile::tempdir().unwrap();
        let screenshot_root = dir.path().join("screenshots");
        fs::create_dir_all(&screenshot_root).unwrap();
        write_record(dir.path(), "home", true);
        fs::write(screenshot_root.join("home0_small.png"), b"base").unwrap();

        let details = test_details(dir.path(), &screenshot_root, "home").unwrap();
        assert_eq!(details.snaps[0].active_tab, TAB_BASELINE);
    }

    #[test]
    fn test_details_all_artifacts_present_stays_on_latest() {
        let dir = tempfile::tempdir().unwrap();
        let screenshot_root = dir.path().join("screenshots");
        fs::create_dir_all(&screenshot_root).unwrap();
        write_record(dir.path(), "home", true);
        fs::write(screenshot_root.join("home0_small.png"), b"base").unwrap();
        fs::write(screenshot_root.join("home0_small.diff.png"), b"diff").unwrap();

        let details = test_details(dir.path(), &screenshot_root, "home").unwrap();
        assert_eq!(details.snaps[0].active_tab, TAB_LATEST);
        assert_eq!(
            details.snaps[0].latest_screenshots,
            vec![Some("home0_small.diff.png".to_string())]
        );
    }

    #[test]
    fn test_details_round_trip_preserves_snap_fields() {
        let dir = tempfile::tempdir().unwrap();
        let screenshot_root = dir.path().join("screenshots");
        write_record(dir.path(), "shop/cart", true);

        let details = test_details(dir.path(), &screenshot_root, "shop/cart").unwrap();
        assert_eq!(details.test_id, "shop-cart");
        assert_eq!(details.snaps[0].annotation, "check");
        assert_eq!(details.snaps[0].css_selector, "body");
        assert_eq!(
            details.snaps[0].screenshots,
            vec!["shop/cart0_small".to_string()]
        );
    }

    #[test]
    fn test_details_missing_record_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let err = test_details(dir.path(), &dir.path().join("screenshots"), "nope");
        assert!(matches!(err, Err(ViewerError::NotFound(_))));
    }

    #[test]
    fn test_humanize_since() {
        let base = Utc.timestamp_opt(1_700_000_000, 0).unwrap();
        assert_eq!(humanize_since(base, base + chrono::Duration::seconds(1)), "1 second ago");
        assert_eq!(humanize_since(base, base + chrono::Duration::seconds(59)), "59 seconds ago");
        assert_eq!(humanize_since(base, base + chrono::Duration::minutes(5)), "5 minutes ago");
        assert_eq!(humanize_since(base, base + chrono::Duration::hours(1)), "1 hour ago");
        assert_eq!(humanize_since(base, base + chrono::Duration::days(3)), "3 days ago");
        assert_eq!(humanize_since(base, base + chrono::Duration::days(29)), "29 days ago");
        assert_eq!(humanize_since(base, base + chrono::Duration::days(30)), "1 month ago");
        assert_eq!(humanize_since(base, base + chrono::Duration::days(340)), "11 months ago");
        assert_eq!(humanize_since(base, base + chrono::Duration::days(400)), "1 year ago");
        assert_eq!(humanize_since(base, base + chrono::Duration::days(800)), "2 years ago");
        // Clock skew must not produce negative ages
        assert_eq!(humanize_since(base, base - chrono::Duration::seconds(5)), "0 seconds ago");
    }
}
