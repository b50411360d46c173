//! Page Vision - Visual regression testing for rendered pages.
//!
//! This crate provides:
//! - A session orchestrator that sequences page actions, captures labelled
//!   screenshots across multiple viewport sizes and persists one result
//!   record per test
//! - Collaborator traits for the external page-driving and pixel-comparison
//!   engines, plus scripted mocks for tests
//! - A viewer backend that aggregates persisted records into a browsable
//!   pass/fail tree and exposes baseline maintenance over HTTP
//!
//! # Example
//!
//! ```rust,no_run
//! use page_vision::engine::{MockCompareEngine, MockPageEngine};
//! use page_vision::session::{SessionController, SessionSettings};
//!
//! let settings = SessionSettings::from_config(page_vision::config::get());
//! let mut test = SessionController::start(
//!     MockPageEngine::new(),
//!     MockCompareEngine::new(),
//!     settings,
//!     "shop/cart",
//!     "Cart page keeps its layout",
//! );
//! test.click("#add-to-cart");
//! test.snap("#cart", "cart with one item");
//! let outcome = test.end().unwrap();
//! std::process::exit(outcome.exit_code);
//! ```

pub mod artifacts;
pub mod config;
pub mod engine;
pub mod persist;
pub mod session;
pub mod viewer;

// Re-export session types
pub use session::{
    CommandGate, SessionController, SessionError, SessionOutcome, SessionResult, SessionSettings,
    SnapRecord, TestSession, Viewport,
};

// Re-export engine seams and mocks
pub use engine::{
    CompareEngine, CompareOutcome, EngineError, EngineResult, MockCompareEngine, MockPageEngine,
    PageEngine, WaitOutcome,
};

// Re-export persistence and viewer surface
pub use persist::ResultRecord;
pub use viewer::{ViewerError, ViewerResult, ViewerState, create_app};
