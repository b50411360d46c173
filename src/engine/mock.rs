//! Scripted engine doubles for tests.
//!
//! `MockPageEngine` answers the wait-then-act contract from a scripted set of
//! missing selectors and records every call it receives, so tests can assert
//! both the outcome and the exact step order. `MockCompareEngine` reports a
//! scripted set of mismatching refs.

use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use super::{CompareEngine, CompareOutcome, EngineResult, PageEngine, WaitOutcome};

/// One recorded call against a [`MockPageEngine`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PageCall {
    Open(String),
    SetViewport(u32, u32),
    SetUserAgent(String),
    WaitForSelector(String),
    Click(String),
    SendKeys(String, String),
    PressEnter(String),
    UploadFile(String, PathBuf),
    Mouseover(String),
    Evaluate(String),
    Wait(Duration),
    Capture {
        selector: String,
        exclude: Option<String>,
        target: PathBuf,
    },
}

/// A page engine that performs no real browsing
///
/// Captures are written as small placeholder PNG files so downstream code that
/// probes the filesystem sees real entries.
#[derive(Debug, Default)]
pub struct MockPageEngine {
    /// Selectors that never appear (every wait returns `NotFound`)
    missing_selectors: HashSet<String>,
    /// Every call received, in order
    pub calls: Vec<PageCall>,
}

/// Minimal valid 1x1 PNG, used as placeholder capture output
const PLACEHOLDER_PNG: &[u8] = &[
    0x89, 0x50, 0x4e, 0x47, 0x0d, 0x0a, 0x1a, 0x0a, 0x00, 0x00, 0x00, 0x0d, 0x49, 0x48, 0x44,
    0x52, 0x00, 0x00, 0x00, 0x01, 0x00, 0x00, 0x00, 0x01, 0x08, 0x06, 0x00, 0x00, 0x00, 0x1f,
    0x15, 0xc4, 0x89, 0x00, 0x00, 0x00, 0x0d, 0x49, 0x44, 0x41, 0x54, 0x78, 0x9c, 0x63, 0x64,
    0x60, 0x60, 0x60, 0x00, 0x00, 0x00, 0x05, 0x00, 0x01, 0x5e, 0xf3, 0x2a, 0x3a, 0x00, 0x00,
    0x00, 0x00, 0x49, 0x45, 0x4e, 0x44, 0xae, 0x42, 0x60, 0x82,
];

impl MockPageEngine {
    /// Create a mock engine where every selector appears immediately
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark a selector as never appearing
    pub fn with_missing_selector(mut self, selector: &str) -> Self {
        self.missing_selectors.insert(selector.to_string());
        self
    }

    /// Number of capture calls received so far
    pub fn capture_count(&self) -> usize {
        self.calls
            .iter()
            .filter(|c| matches!(c, PageCall::Capture { .. }))
            .count()
    }
}

impl PageEngine for MockPageEngine {
    fn open(&mut self, url: &str) -> EngineResult<()> {
        self.calls.push(PageCall::Open(url.to_string()));
        Ok(())
    }

    fn set_viewport(&mut self, width: u32, height: u32) -> EngineResult<()> {
        self.calls.push(PageCall::SetViewport(width, height));
        Ok(())
    }

    fn set_user_agent(&mut self, user_agent: &str) -> EngineResult<()> {
        self.calls.push(PageCall::SetUserAgent(user_agent.to_string()));
        Ok(())
    }

    fn wait_for_selector(&mut self, selector: &str) -> EngineResult<WaitOutcome> {
        self.calls.push(PageCall::WaitForSelector(selector.to_string()));
        if self.missing_selectors.contains(selector) {
            Ok(WaitOutcome::NotFound)
        } else {
            Ok(WaitOutcome::Found)
        }
    }

    fn click(&mut self, selector: &str) -> EngineResult<()> {
        self.calls.push(PageCall::Click(selector.to_string()));
        Ok(())
    }

    fn send_keys(&mut self, selector: &str, keys: &str) -> EngineResult<()> {
        self.calls
            .push(PageCall::SendKeys(selector.to_string(), keys.to_string()));
        Ok(())
    }

    fn press_enter(&mut self, selector: &str) -> EngineResult<()> {
        self.calls.push(PageCall::PressEnter(selector.to_string()));
        Ok(())
    }

    fn upload_file(&mut self, selector: &str, file: &Path) -> EngineResult<()> {
        self.calls
            .push(PageCall::UploadFile(selector.to_string(), file.to_path_buf()));
        Ok(())
    }

    fn mouseover(&mut self, selector: &str) -> EngineResult<()> {
        self.calls.push(PageCall::Mouseover(selector.to_string()));
        Ok(())
    }

    fn evaluate(&mut self, script: &str) -> EngineResult<()> {
        self.calls.push(PageCall::Evaluate(script.to_string()));
        Ok(())
    }

    fn wait(&mut self, duration: Duration) -> EngineResult<()> {
        self.calls.push(PageCall::Wait(duration));
        Ok(())
    }

    fn capture(
        &mut self,
        selector: &str,
        exclude: Option<&str>,
        target: &Path,
    ) -> EngineResult<()> {
        self.calls.push(PageCall::Capture {
            selector: selector.to_string(),
            exclude: exclude.map(|s| s.to_string()),
            target: target.to_path_buf(),
        });
        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(target, PLACEHOLDER_PNG)?;
        Ok(())
    }
}

/// A comparison engine that reports a scripted set of mismatches
#[derive(Debug, Default)]
pub struct MockCompareEngine {
    /// Refs that compare as mismatched
    mismatching_refs: HashSet<String>,
    /// Refs handed to the last `compare_session` call
    pub compared: Vec<String>,
}

impl MockCompareEngine {
    /// Create a comparison engine where every ref matches its baseline
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark a ref as mismatching
    pub fn with_mismatch(mut self, screenshot_ref: &str) -> Self {
        self.mismatching_refs.insert(screenshot_ref.to_string());
        self
    }
}

impl CompareEngine for MockCompareEngine {
    fn compare_session(&mut self, refs: &[String]) -> EngineResult<CompareOutcome> {
        self.compared = refs.to_vec();
        let mismatches = refs
            .iter()
            .filter(|r| self.mismatching_refs.contains(*r))
            .cloned()
            .collect();
        Ok(CompareOutcome { mismatches })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wait_outcome_scripting() {
        let mut engine = MockPageEngine::new().with_missing_selector("#gone");
        assert_eq!(engine.wait_for_selector("body").unwrap(), WaitOutcome::Found);
        assert_eq!(engine.wait_for_selector("#gone").unwrap(), WaitOutcome::NotFound);
    }

    #[test]
    fn test_capture_writes_placeholder() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("nested").join("shot.png");
        let mut engine = MockPageEngine::new();
        engine.capture("body", None, &target).unwrap();
        assert!(target.exists());
        assert_eq!(engine.capture_count(), 1);
    }

    #[test]
    fn test_compare_scripting() {
        let mut compare = MockCompareEngine::new().with_mismatch("home0_small");
        let outcome = compare
            .compare_session(&["home0_small".to_string(), "home1_small".to_string()])
            .unwrap();
        assert!(!outcome.passed());
        assert_eq!(outcome.mismatches, vec!["home0_small".to_string()]);
    }
}
