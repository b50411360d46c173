//! HTTP surface of the viewer backend.
//!
//! Read endpoints expose the result tree; the two baseline endpoints mutate
//! screenshot artifacts and answer with a bare success status. The screenshot
//! root is served statically under `/screenshots` so the UI can display the
//! artifact images directly.

use std::path::PathBuf;

use axum::{
    Json, Router,
    extract::{Query, State},
    http::StatusCode,
    routing::get,
};
use serde::{Deserialize, Serialize};
use tower_http::cors::{Any, CorsLayer};
use tower_http::services::ServeDir;
use tracing::error;

use crate::persist::ResultRecord;
use crate::viewer::{ViewerError, baseline, tree};

/// Shared state for the viewer handlers
#[derive(Debug, Clone)]
pub struct ViewerState {
    /// Directory holding persisted test records
    pub results_root: PathBuf,
    /// Directory holding baseline/diff/fail images
    pub screenshot_root: PathBuf,
}

/// Error response body
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

/// Count of failed tests
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TotalFailed {
    pub total_failed: usize,
}

#[derive(Debug, Deserialize)]
struct PathQuery {
    path: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ScreenshotQuery {
    screenshot_path: String,
}

type HandlerError = (StatusCode, Json<ErrorResponse>);

fn into_response_error(err: ViewerError) -> HandlerError {
    let status = match &err {
        ViewerError::PathTraversal(_) | ViewerError::NothingToPromote(_) => {
            StatusCode::BAD_REQUEST
        }
        ViewerError::NotFound(_) => StatusCode::NOT_FOUND,
        ViewerError::Io(io) if io.kind() == std::io::ErrorKind::NotFound => StatusCode::NOT_FOUND,
        ViewerError::Io(_) | ViewerError::Parse(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };
    if status == StatusCode::INTERNAL_SERVER_ERROR {
        error!("viewer request failed: {}", err);
    }
    (
        status,
        Json(ErrorResponse {
            error: err.to_string(),
        }),
    )
}

/// Tree rooted at the results root
async fn root_contents(
    State(state): State<ViewerState>,
) -> Result<Json<tree::FolderContents>, HandlerError> {
    tree::folder_contents(&state.results_root, &state.screenshot_root, "/")
        .map(Json)
        .map_err(into_response_error)
}

/// Tree rooted at a subfolder
async fn contents(
    State(state): State<ViewerState>,
    Query(query): Query<PathQuery>,
) -> Result<Json<tree::FolderContents>, HandlerError> {
    tree::folder_contents(&state.results_root, &state.screenshot_root, &query.path)
        .map(Json)
        .map_err(into_response_error)
}

/// Full detail of one test, with per-ref artifact presence
async fn details(
    State(state): State<ViewerState>,
    Query(query): Query<PathQuery>,
) -> Result<Json<tree::TestDetails>, HandlerError> {
    tree::test_details(&state.results_root, &state.screenshot_root, &query.path)
        .map(Json)
        .map_err(into_response_error)
}

/// Flattened list of every failed test
async fn failed_tests(
    State(state): State<ViewerState>,
) -> Result<Json<Vec<ResultRecord>>, HandlerError> {
    tree::failed_tests(&state.results_root)
        .map(Json)
        .map_err(into_response_error)
}

/// Count of failed tests
async fn total_failed(
    State(state): State<ViewerState>,
) -> Result<Json<TotalFailed>, HandlerError> {
    tree::failed_tests(&state.results_root)
        .map(|failed| {
            Json(TotalFailed {
                total_failed: failed.len(),
            })
        })
        .map_err(into_response_error)
}

/// Discard a changed screenshot, keeping the baseline
async fn keep_baseline(
    State(state): State<ViewerState>,
    Query(query): Query<ScreenshotQuery>,
) -> Result<StatusCode, HandlerError> {
    baseline::keep_baseline(&state.screenshot_root, &query.screenshot_path)
        .map(|()| StatusCode::OK)
        .map_err(into_response_error)
}

/// Promote a changed screenshot to be the new baseline
async fn update_baseline(
    State(state): State<ViewerState>,
    Query(query): Query<ScreenshotQuery>,
) -> Result<StatusCode, HandlerError> {
    baseline::update_baseline(&state.screenshot_root, &query.screenshot_path)
        .map(|()| StatusCode::OK)
        .map_err(into_response_error)
}

/// Create the viewer application router.
///
/// `static_dir`, when given, is served at the root for the front-end build.
pub fn create_app(state: ViewerState, static_dir: Option<PathBuf>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let mut app = Router::new()
        .route("/root-contents", get(root_contents))
        .route("/contents", get(contents))
        .route("/details", get(details))
        .route("/failed-tests", get(failed_tests))
        .route("/total-failed", get(total_failed))
        .route("/keep-baseline", get(keep_baseline))
        .route("/update-baseline", get(update_baseline))
        .nest_service(
            "/screenshots",
            ServeDir::new(state.screenshot_root.clone()),
        )
        .with_state(state);

    if let Some(dir) = static_dir {
        app = app.fallback_service(ServeDir::new(dir));
    }

    app.layer(cors)
}
