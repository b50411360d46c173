//! Test session orchestration.
//!
//! A [`SessionController`] owns one session from `start` to `end`. Action
//! methods do not touch the page immediately: each pushes one step onto a
//! deferred timeline, and `end()` drains the timeline strictly in order
//! against the page engine, runs the comparison engine over every capture,
//! persists the result record and reports the verdict.
//!
//! Failures do not abort the timeline. A selector that never appears marks
//! the session failed (first reason wins) and persists the partial record,
//! but every remaining queued step still executes.

pub mod gate;
pub mod multiplex;
pub mod recorder;
pub mod types;

use std::path::PathBuf;
use std::time::Duration;

use tracing::info;

use crate::config::Config;
use crate::engine::{CompareEngine, PageEngine, WaitOutcome};
use crate::persist;
pub use gate::CommandGate;
pub use types::{SessionError, SessionOutcome, SessionResult, SnapRecord, TestSession, Viewport};

/// Session-scoped settings, usually derived from the global [`Config`]
#[derive(Debug, Clone)]
pub struct SessionSettings {
    /// Page opened when the session starts
    pub base_url: String,
    /// Directory where the result record is persisted
    pub results_root: PathBuf,
    /// Directory where captures and comparison artifacts live
    pub screenshot_root: PathBuf,
    /// Viewport set the session starts with
    pub viewports: Vec<Viewport>,
}

impl SessionSettings {
    /// Derive session settings from the crate configuration
    pub fn from_config(config: &Config) -> Self {
        Self {
            base_url: config.base_url.clone(),
            results_root: config.results_root.clone(),
            screenshot_root: config.screenshot_root.clone(),
            viewports: config.default_viewports.clone(),
        }
    }
}

/// One deferred step on the session timeline
#[derive(Debug, Clone)]
enum Step {
    GoToUrl(String),
    SetViewports(Vec<Viewport>),
    SetUserAgent(String),
    Click(String),
    SendKeys(String, String),
    PressEnter(String),
    UploadFile(String, PathBuf),
    Mouseover(String),
    Evaluate(String),
    Wait(Duration),
    Snap {
        selector: String,
        annotation: String,
        exclude: Option<String>,
        multiplex: bool,
    },
}

/// Orchestrates one test session against a page engine and a compare engine
pub struct SessionController<P: PageEngine, C: CompareEngine> {
    page: P,
    compare: C,
    gate: CommandGate,
    settings: SessionSettings,
    session: TestSession,
    steps: Vec<Step>,
}

impl<P: PageEngine, C: CompareEngine> SessionController<P, C> {
    /// Start a session: wait for the command gate, reset all session state and
    /// queue opening the base page.
    pub fn start(
        page: P,
        compare: C,
        settings: SessionSettings,
        hierarchy_path: &str,
        description: &str,
    ) -> Self {
        let gate = gate::global();
        gate.wait_idle();

        info!("{}", description);
        let session = TestSession::new(hierarchy_path, description, settings.viewports.clone());
        let steps = vec![Step::GoToUrl(settings.base_url.clone())];

        Self {
            page,
            compare,
            gate,
            settings,
            session,
            steps,
        }
    }

    /// Replace the session's viewport set.
    ///
    /// Applied in timeline order, so it only affects snaps queued after it.
    /// An empty set is a configuration error, never a silent no-op.
    pub fn set_viewports(&mut self, viewports: Vec<Viewport>) -> SessionResult<()> {
        if viewports.is_empty() {
            return Err(SessionError::EmptyViewports);
        }
        self.steps.push(Step::SetViewports(viewports));
        Ok(())
    }

    /// Override the user agent for subsequent navigation
    pub fn set_user_agent(&mut self, user_agent: &str) {
        self.steps.push(Step::SetUserAgent(user_agent.to_string()));
    }

    /// Navigate to a URL
    pub fn go_to_url(&mut self, url: &str) {
        self.steps.push(Step::GoToUrl(url.to_string()));
    }

    /// Click the element matching the selector
    pub fn click(&mut self, selector: &str) {
        self.steps.push(Step::Click(selector.to_string()));
    }

    /// Type text into the element matching the selector
    pub fn send_keys(&mut self, selector: &str, keys: &str) {
        self.steps
            .push(Step::SendKeys(selector.to_string(), keys.to_string()));
    }

    /// Press enter while the element matching the selector has focus
    pub fn press_enter(&mut self, selector: &str) {
        self.steps.push(Step::PressEnter(selector.to_string()));
    }

    /// Attach a local file to the input matching the selector
    pub fn upload_file(&mut self, selector: &str, file: impl Into<PathBuf>) {
        self.steps
            .push(Step::UploadFile(selector.to_string(), file.into()));
    }

    /// Move the pointer over the element matching the selector
    pub fn mouseover(&mut self, selector: &str) {
        self.steps.push(Step::Mouseover(selector.to_string()));
    }

    /// Evaluate a script in the page context
    pub fn evaluate(&mut self, script: &str) {
        self.steps.push(Step::Evaluate(script.to_string()));
    }

    /// Suspend the timeline for a fixed delay
    pub fn wait(&mut self, duration: Duration) {
        self.steps.push(Step::Wait(duration));
    }

    /// Take a screenshot of the selector across every configured viewport
    pub fn snap(&mut self, selector: &str, annotation: &str) {
        self.push_snap(selector, annotation, None, true);
    }

    /// Take a single screenshot of the selector at the first configured viewport
    pub fn snap_single(&mut self, selector: &str, annotation: &str) {
        self.push_snap(selector, annotation, None, false);
    }

    /// Take a screenshot excluding a region, across every configured viewport
    pub fn snap_excluding(&mut self, selector: &str, exclude: &str, annotation: &str) {
        self.push_snap(selector, annotation, Some(exclude.to_string()), true);
    }

    fn push_snap(
        &mut self,
        selector: &str,
        annotation: &str,
        exclude: Option<String>,
        multiplex: bool,
    ) {
        self.steps.push(Step::Snap {
            selector: selector.to_string(),
            annotation: annotation.to_string(),
            exclude,
            multiplex,
        });
    }

    /// Run an external command exclusively (not part of the page timeline)
    pub fn run_exclusive(&self, command: &str, args: &[String]) -> std::io::Result<()> {
        self.gate.run_exclusive(command, args)
    }

    /// Whether the session has failed so far
    pub fn is_failed(&self) -> bool {
        self.session.failed
    }

    /// Why the session failed, if it did
    pub fn failure_reason(&self) -> Option<&str> {
        self.session.failure_reason.as_deref()
    }

    /// Current session state (read-only)
    pub fn session(&self) -> &TestSession {
        &self.session
    }

    /// Finish the session: wait for the command gate, drain the timeline,
    /// compare every capture against its baseline and persist the record.
    ///
    /// Returns the verdict; the caller decides whether to exit the process.
    pub fn end(mut self) -> SessionResult<SessionOutcome> {
        self.gate.wait_idle();

        for step in std::mem::take(&mut self.steps) {
            self.run_step(step)?;
        }

        let refs: Vec<String> = self
            .session
            .snaps
            .iter()
            .flat_map(|snap| snap.screenshots.iter().cloned())
            .collect();
        let comparison = self.compare.compare_session(&refs)?;
        if !comparison.passed() {
            self.mark_failed("FAIL")?;
        }

        persist::save(&self.session, &self.settings.results_root)?;

        let passed = !self.session.failed;
        info!(
            test = %self.session.test_id,
            passed, "session ended with {} snaps", self.session.snaps.len()
        );
        Ok(SessionOutcome {
            passed,
            exit_code: if passed { 0 } else { 1 },
        })
    }

    /// Record a failure without halting the timeline.
    ///
    /// The first reason wins; later failures keep the flag but not the text.
    /// The partial record is persisted immediately so progress survives a
    /// crash before `end()`.
    fn mark_failed(&mut self, reason: &str) -> SessionResult<()> {
        self.session.failed = true;
        if self.session.failure_reason.is_none() {
            self.session.failure_reason = Some(reason.to_string());
        }
        persist::save(&self.session, &self.settings.results_root)?;
        Ok(())
    }

    fn selector_not_found(&mut self, selector: &str) -> SessionResult<()> {
        self.mark_failed(&format!("Selector '{}' not found", selector))
    }

    fn run_step(&mut self, step: Step) -> SessionResult<()> {
        match step {
            Step::GoToUrl(url) => self.page.open(&url)?,
            Step::SetViewports(viewports) => self.session.viewports = viewports,
            Step::SetUserAgent(user_agent) => self.page.set_user_agent(&user_agent)?,
            Step::Click(selector) => match self.page.wait_for_selector(&selector)? {
                WaitOutcome::Found => self.page.click(&selector)?,
                WaitOutcome::NotFound => self.selector_not_found(&selector)?,
            },
            Step::SendKeys(selector, keys) => match self.page.wait_for_selector(&selector)? {
                WaitOutcome::Found => self.page.send_keys(&selector, &keys)?,
                WaitOutcome::NotFound => self.selector_not_found(&selector)?,
            },
            Step::PressEnter(selector) => match self.page.wait_for_selector(&selector)? {
                WaitOutcome::Found => self.page.press_enter(&selector)?,
                WaitOutcome::NotFound => self.selector_not_found(&selector)?,
            },
            Step::UploadFile(selector, file) => match self.page.wait_for_selector(&selector)? {
                WaitOutcome::Found => self.page.upload_file(&selector, &file)?,
                WaitOutcome::NotFound => self.selector_not_found(&selector)?,
            },
            Step::Mouseover(selector) => match self.page.wait_for_selector(&selector)? {
                WaitOutcome::Found => self.page.mouseover(&selector)?,
                WaitOutcome::NotFound => self.selector_not_found(&selector)?,
            },
            Step::Evaluate(script) => self.page.evaluate(&script)?,
            Step::Wait(duration) => self.page.wait(duration)?,
            Step::Snap {
                selector,
                annotation,
                exclude,
                multiplex,
            } => self.run_snap(&selector, &annotation, exclude.as_deref(), multiplex)?,
        }
        Ok(())
    }

    fn run_snap(
        &mut self,
        selector: &str,
        annotation: &str,
        exclude: Option<&str>,
        multiplex: bool,
    ) -> SessionResult<()> {
        let expansion = multiplex::expand(
            &mut self.page,
            &self.session,
            &self.settings.screenshot_root,
            selector,
            exclude,
            multiplex,
        )?;

        let annotation = if expansion.selector_missed {
            format!("Selector not found: {}", selector)
        } else {
            annotation.to_string()
        };

        let seq = recorder::record(
            &mut self.session,
            &self.settings.screenshot_root,
            selector,
            &annotation,
            expansion.screenshots,
        );
        info!("{}- {}", seq, annotation);

        if expansion.selector_missed {
            self.selector_not_found(selector)?;
        }
        Ok(())
    }
}
