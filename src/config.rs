//! Configuration management with environment variable support.
//!
//! This module provides centralized configuration for page-vision, supporting:
//! - Environment variables for all configurable values
//! - Sensible defaults matching the demo setup
//! - Programmatic construction for tests
//!
//! # Environment Variables
//!
//! | Variable | Description | Default |
//! |----------|-------------|---------|
//! | `PAGE_VISION_BASE_URL` | Page opened when a session starts | `http://localhost:3000/` |
//! | `PAGE_VISION_RESULTS_ROOT` | Directory holding persisted test records | `./results` |
//! | `PAGE_VISION_SCREENSHOT_ROOT` | Directory holding baseline/diff/fail images | `./screenshots` |
//! | `PAGE_VISION_VIEWER_PORT` | Port for the viewer HTTP server | `8080` |
//! | `PAGE_VISION_MISMATCH_TOLERANCE` | Comparison tolerance in percent | `0.5` |

use std::env;
use std::path::PathBuf;
use std::sync::OnceLock;

use crate::session::types::Viewport;

// ============================================================================
// Default Values
// ============================================================================

/// Default base URL opened at session start
pub const DEFAULT_BASE_URL: &str = "http://localhost:3000/";

/// Default root directory for persisted test records
pub const DEFAULT_RESULTS_ROOT: &str = "./results";

/// Default root directory for screenshot artifacts
pub const DEFAULT_SCREENSHOT_ROOT: &str = "./screenshots";

/// Default viewer server port
pub const DEFAULT_VIEWER_PORT: u16 = 8080;

/// Default pixel mismatch tolerance (percent)
pub const DEFAULT_MISMATCH_TOLERANCE: f64 = 0.5;

// ============================================================================
// Environment Variable Names
// ============================================================================

/// Environment variable for the base URL
pub const ENV_BASE_URL: &str = "PAGE_VISION_BASE_URL";

/// Environment variable for the results root
pub const ENV_RESULTS_ROOT: &str = "PAGE_VISION_RESULTS_ROOT";

/// Environment variable for the screenshot root
pub const ENV_SCREENSHOT_ROOT: &str = "PAGE_VISION_SCREENSHOT_ROOT";

/// Environment variable for the viewer port
pub const ENV_VIEWER_PORT: &str = "PAGE_VISION_VIEWER_PORT";

/// Environment variable for the mismatch tolerance
pub const ENV_MISMATCH_TOLERANCE: &str = "PAGE_VISION_MISMATCH_TOLERANCE";

// ============================================================================
// Configuration Getter (with caching)
// ============================================================================

static CONFIG: OnceLock<Config> = OnceLock::new();

/// Get the global configuration (initialized from environment on first access)
pub fn get() -> &'static Config {
    CONFIG.get_or_init(Config::from_env)
}

/// Centralized configuration for page-vision
#[derive(Debug, Clone)]
pub struct Config {
    /// Page opened when a session starts
    pub base_url: String,
    /// Directory where test records are persisted
    pub results_root: PathBuf,
    /// Directory where baseline/diff/fail screenshots live
    pub screenshot_root: PathBuf,
    /// Port for the viewer HTTP server
    pub viewer_port: u16,
    /// Pixel mismatch tolerance handed to the comparison engine (percent)
    pub mismatch_tolerance: f64,
    /// Viewports used when a session does not set its own
    pub default_viewports: Vec<Viewport>,
}

impl Config {
    /// Create configuration from environment variables, falling back to defaults
    pub fn from_env() -> Self {
        Self {
            base_url: env::var(ENV_BASE_URL).unwrap_or_else(|_| DEFAULT_BASE_URL.to_string()),
            results_root: env::var(ENV_RESULTS_ROOT)
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from(DEFAULT_RESULTS_ROOT)),
            screenshot_root: env::var(ENV_SCREENSHOT_ROOT)
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from(DEFAULT_SCREENSHOT_ROOT)),
            viewer_port: env::var(ENV_VIEWER_PORT)
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(DEFAULT_VIEWER_PORT),
            mismatch_tolerance: env::var(ENV_MISMATCH_TOLERANCE)
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(DEFAULT_MISMATCH_TOLERANCE),
            default_viewports: default_viewports(),
        }
    }

    /// Create configuration with all defaults (ignoring environment)
    pub fn defaults() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            results_root: PathBuf::from(DEFAULT_RESULTS_ROOT),
            screenshot_root: PathBuf::from(DEFAULT_SCREENSHOT_ROOT),
            viewer_port: DEFAULT_VIEWER_PORT,
            mismatch_tolerance: DEFAULT_MISMATCH_TOLERANCE,
            default_viewports: default_viewports(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::from_env()
    }
}

/// The stock viewport set: one phone, one tablet, one desktop size
pub fn default_viewports() -> Vec<Viewport> {
    vec![
        Viewport::new("small", 320, 480),
        Viewport::new("medium", 768, 480),
        Viewport::new("large", 1024, 768),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_defaults() {
        let config = Config::defaults();
        assert_eq!(config.base_url, DEFAULT_BASE_URL);
        assert_eq!(config.results_root, PathBuf::from(DEFAULT_RESULTS_ROOT));
        assert_eq!(config.viewer_port, DEFAULT_VIEWER_PORT);
        assert_eq!(config.mismatch_tolerance, DEFAULT_MISMATCH_TOLERANCE);
    }

    #[test]
    fn test_default_viewports_ordered() {
        let viewports = default_viewports();
        assert_eq!(viewports.len(), 3);
        assert_eq!(viewports[0].name, "small");
        assert_eq!(viewports[0].width, 320);
        assert_eq!(viewports[0].height, 480);
        assert_eq!(viewports[2].name, "large");
    }
}
