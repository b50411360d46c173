//! Baseline maintenance: accept or discard a changed screenshot.
//!
//! Both operations take the baseline image's path (relative to the screenshot
//! root, or the viewer's `/screenshots/...` web path) and mutate the artifact
//! trio next to it. The request path is resolved inside the canonicalized
//! screenshot root first; anything that would escape is rejected outright,
//! never stripped into a different valid path. Concurrent maintenance on the
//! same resolved path is serialized through a per-path lock.

use std::collections::HashMap;
use std::fs;
use std::path::{Component, Path, PathBuf};
use std::sync::{Arc, Mutex, OnceLock};

use tracing::info;

use crate::artifacts;
use crate::viewer::{ViewerError, ViewerResult};

/// Web mount point of the screenshot root in the viewer
const SCREENSHOTS_MOUNT: &str = "screenshots";

static PATH_LOCKS: OnceLock<Mutex<HashMap<PathBuf, Arc<Mutex<()>>>>> = OnceLock::new();

fn lock_map() -> &'static Mutex<HashMap<PathBuf, Arc<Mutex<()>>>> {
    PATH_LOCKS.get_or_init(|| Mutex::new(HashMap::new()))
}

/// Run `f` while holding the lock for one resolved screenshot path.
///
/// The map entry is evicted once no other holder remains, so the map stays
/// bounded by the number of in-flight operations rather than every path ever
/// touched.
fn with_path_lock<T>(path: &Path, f: impl FnOnce() -> ViewerResult<T>) -> ViewerResult<T> {
    let lock = {
        let mut map = lock_map().lock().expect("path lock map poisoned");
        Arc::clone(map.entry(path.to_path_buf()).or_default())
    };

    let result = {
        let _guard = lock.lock().expect("path lock poisoned");
        f()
    };
    drop(lock);

    let mut map = lock_map().lock().expect("path lock map poisoned");
    if map.get(path).is_some_and(|entry| Arc::strong_count(entry) == 1) {
        map.remove(path);
    }
    result
}

/// Resolve a requested screenshot path to an absolute path inside the root.
///
/// Accepts paths relative to the root, absolute paths already under the
/// root, and the viewer's `/screenshots/...` web form. Any parent-directory
/// segment or resolution outside the root is a [`ViewerError::PathTraversal`].
pub fn resolve_screenshot_path(screenshot_root: &Path, requested: &str) -> ViewerResult<PathBuf> {
    let root = screenshot_root.canonicalize()?;

    let requested_path = Path::new(requested);
    let relative = if requested_path.is_absolute() {
        match requested_path.strip_prefix(&root) {
            Ok(rel) => rel.to_path_buf(),
            Err(_) => return Err(ViewerError::PathTraversal(requested.to_string())),
        }
    } else {
        let trimmed = requested.trim_start_matches('/');
        let p = Path::new(trimmed);
        // Tolerate the web mount prefix the viewer UI sends
        p.strip_prefix(SCREENSHOTS_MOUNT).unwrap_or(p).to_path_buf()
    };

    if relative.as_os_str().is_empty() {
        return Err(ViewerError::PathTraversal(requested.to_string()));
    }
    for component in relative.components() {
        match component {
            Component::Normal(_) => {}
            _ => return Err(ViewerError::PathTraversal(requested.to_string())),
        }
    }

    Ok(root.join(relative))
}

/// The new capture was wrong: discard it and keep the current baseline.
///
/// Deletes the diff and fail artifacts; the baseline itself is untouched.
/// Idempotent: repeating the call when neither artifact exists succeeds.
pub fn keep_baseline(screenshot_root: &Path, requested: &str) -> ViewerResult<()> {
    let baseline = resolve_screenshot_path(screenshot_root, requested)?;
    with_path_lock(&baseline, || {
        remove_if_exists(&artifacts::diff_of(&baseline))?;
        remove_if_exists(&artifacts::fail_of(&baseline))?;
        info!(baseline = %baseline.display(), "kept baseline");
        Ok(())
    })
}

/// The baseline was outdated: promote the new capture.
///
/// The diff artifact becomes the new baseline; the fail artifact is removed.
/// With no diff to promote the operation fails cleanly and the current
/// baseline survives.
pub fn update_baseline(screenshot_root: &Path, requested: &str) -> ViewerResult<()> {
    let baseline = resolve_screenshot_path(screenshot_root, requested)?;
    with_path_lock(&baseline, || {
        let diff = artifacts::diff_of(&baseline);
        if !diff.is_file() {
            return Err(ViewerError::NothingToPromote(requested.to_string()));
        }

        remove_if_exists(&baseline)?;
        fs::rename(&diff, &baseline)?;
        remove_if_exists(&artifacts::fail_of(&baseline))?;
        info!(baseline = %baseline.display(), "updated baseline from diff");
        Ok(())
    })
}

/// Delete a file, treating "already gone" as success
fn remove_if_exists(path: &Path) -> ViewerResult<()> {
    match fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(err) => Err(err.into()),
    }
}
