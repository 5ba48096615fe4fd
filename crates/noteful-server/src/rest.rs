use std::sync::Arc;

use axum::{
    http::{header, StatusCode},
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use noteful_core::NotefulError;

#[path = "rest/folders.rs"]
mod folders;
#[path = "rest/notes.rs"]
mod notes;
#[path = "rest/tags.rs"]
mod tags;
#[path = "rest/users.rs"]
mod users;

use crate::state::AppState;
use crate::validation::ValidationError;

pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/notes", get(notes::list_notes).post(notes::create_note))
        .route(
            "/notes/:id",
            get(notes::get_note)
                .put(notes::update_note)
                .delete(notes::delete_note),
        )
        .route(
            "/folders",
            get(folders::list_folders).post(folders::create_folder),
        )
        .route(
            "/folders/:id",
            get(folders::get_folder)
                .put(folders::update_folder)
                .delete(folders::delete_folder),
        )
        .route("/tags", get(tags::list_tags).post(tags::create_tag))
        .route(
            "/tags/:id",
            get(tags::get_tag).put(tags::update_tag).delete(tags::delete_tag),
        )
        .route("/users", post(users::register_user))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": "ok" }))
}

// ---------------------------------------------------------------------------
// Error responses
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
pub(crate) struct ErrorBody {
    message: String,
}

/// All handler failures render as `{"message": ...}` with the right status.
pub(crate) type ApiError = (StatusCode, Json<ErrorBody>);

fn error_body(message: impl ToString) -> Json<ErrorBody> {
    Json(ErrorBody {
        message: message.to_string(),
    })
}

pub(crate) fn bad_request(message: impl ToString) -> ApiError {
    (StatusCode::BAD_REQUEST, error_body(message))
}

pub(crate) fn not_found() -> ApiError {
    (StatusCode::NOT_FOUND, error_body("Not Found"))
}

/// Centralized responder for store failures: duplicate-key conditions were
/// already re-labeled by the storage layer and pass through as 400s;
/// anything unexpected is logged and reported as a generic 500 so internals
/// never leak to the client.
pub(crate) fn map_store_error(err: NotefulError) -> ApiError {
    match err {
        NotefulError::InvalidId(_)
        | NotefulError::MissingField(_)
        | NotefulError::DuplicateName(_) => bad_request(err),
        NotefulError::NotFound => not_found(),
        other => {
            tracing::error!(error = %other, "store operation failed");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                error_body("Internal server error"),
            )
        }
    }
}

impl From<ValidationError> for ApiError {
    fn from(err: ValidationError) -> Self {
        bad_request(err)
    }
}

pub(crate) fn location_header(path: String) -> [(header::HeaderName, String); 1] {
    [(header::LOCATION, path)]
}
