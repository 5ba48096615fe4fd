use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::{header::HeaderName, StatusCode};
use axum::Json;
use serde::Deserialize;

use noteful_core::{Folder, FolderStore};

use crate::cascade;
use crate::rest::{location_header, map_store_error, not_found, ApiError};
use crate::state::AppState;
use crate::validation::{parse_id, require_field, validate_name};

#[derive(Deserialize)]
pub(crate) struct FolderPayload {
    name: Option<String>,
}

pub(crate) async fn list_folders(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<Folder>>, ApiError> {
    let folders = state.folders.list().await.map_err(map_store_error)?;
    Ok(Json(folders))
}

pub(crate) async fn get_folder(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<Folder>, ApiError> {
    let id = parse_id("id", &id)?;
    let folder = state
        .folders
        .get(id)
        .await
        .map_err(map_store_error)?
        .ok_or_else(not_found)?;
    Ok(Json(folder))
}

pub(crate) async fn create_folder(
    State(state): State<Arc<AppState>>,
    Json(req): Json<FolderPayload>,
) -> Result<(StatusCode, [(HeaderName, String); 1], Json<Folder>), ApiError> {
    let name = require_field("name", req.name.as_deref())?;
    validate_name(name)?;

    let folder = state.folders.insert(name).await.map_err(map_store_error)?;
    let location = format!("/folders/{}", folder.id);
    Ok((StatusCode::CREATED, location_header(location), Json(folder)))
}

pub(crate) async fn update_folder(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(req): Json<FolderPayload>,
) -> Result<Json<Folder>, ApiError> {
    let id = parse_id("id", &id)?;
    let name = require_field("name", req.name.as_deref())?;
    validate_name(name)?;

    let folder = state
        .folders
        .update(id, name)
        .await
        .map_err(map_store_error)?
        .ok_or_else(not_found)?;
    Ok(Json(folder))
}

/// Deleting a folder also clears `folderId` on every note that referenced it.
pub(crate) async fn delete_folder(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    let id = parse_id("id", &id)?;
    cascade::delete_folder(&state, id)
        .await
        .map_err(map_store_error)?;
    Ok(StatusCode::NO_CONTENT)
}
