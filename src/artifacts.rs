//! Screenshot artifact naming.
//!
//! Every capture is identified by a base ref (no extension), relative to the
//! screenshot root. Given ref `R`:
//! - baseline image: `R.png`
//! - comparison diff: `R.diff.png`
//! - failure crop:   `R.fail.png`

use std::path::{Path, PathBuf};

/// Extension of the baseline image
pub const BASELINE_EXT: &str = "png";

/// Suffix of the comparison diff image
pub const DIFF_SUFFIX: &str = ".diff.png";

/// Suffix of the failure crop image
pub const FAIL_SUFFIX: &str = ".fail.png";

/// Path of the baseline image for a base ref
pub fn baseline_path(root: &Path, screenshot_ref: &str) -> PathBuf {
    root.join(format!("{}.{}", screenshot_ref, BASELINE_EXT))
}

/// Path of the comparison diff for a base ref
pub fn diff_path(root: &Path, screenshot_ref: &str) -> PathBuf {
    root.join(format!("{}{}", screenshot_ref, DIFF_SUFFIX))
}

/// Path of the failure crop for a base ref
pub fn fail_path(root: &Path, screenshot_ref: &str) -> PathBuf {
    root.join(format!("{}{}", screenshot_ref, FAIL_SUFFIX))
}

/// Derive the diff path for an existing baseline path (`x.png` -> `x.diff.png`)
pub fn diff_of(baseline: &Path) -> PathBuf {
    with_suffix(baseline, DIFF_SUFFIX)
}

/// Derive the fail path for an existing baseline path (`x.png` -> `x.fail.png`)
pub fn fail_of(baseline: &Path) -> PathBuf {
    with_suffix(baseline, FAIL_SUFFIX)
}

fn with_suffix(baseline: &Path, suffix: &str) -> PathBuf {
    let s = baseline.to_string_lossy();
    match s.strip_suffix(".png") {
        Some(stem) => PathBuf::from(format!("{}{}", stem, suffix)),
        None => PathBuf::from(format!("{}{}", s, suffix)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ref_paths() {
        let root = Path::new("/shots");
        assert_eq!(baseline_path(root, "home0_small"), Path::new("/shots/home0_small.png"));
        assert_eq!(diff_path(root, "home0_small"), Path::new("/shots/home0_small.diff.png"));
        assert_eq!(fail_path(root, "home0_small"), Path::new("/shots/home0_small.fail.png"));
    }

    #[test]
    fn test_nested_ref() {
        let root = Path::new("/shots");
        assert_eq!(
            baseline_path(root, "shop/cart0_large"),
            Path::new("/shots/shop/cart0_large.png")
        );
    }

    #[test]
    fn test_suffix_of_baseline() {
        assert_eq!(diff_of(Path::new("/shots/a.png")), Path::new("/shots/a.diff.png"));
        assert_eq!(fail_of(Path::new("/shots/a.png")), Path::new("/shots/a.fail.png"));
    }
}
