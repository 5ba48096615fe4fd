use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::{header::HeaderName, StatusCode};
use axum::Json;
use serde::Deserialize;

use noteful_core::{Tag, TagStore};

use crate::cascade;
use crate::rest::{location_header, map_store_error, not_found, ApiError};
use crate::state::AppState;
use crate::validation::{parse_id, require_field, validate_name};

#[derive(Deserialize)]
pub(crate) struct TagPayload {
    name: Option<String>,
}

pub(crate) async fn list_tags(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<Tag>>, ApiError> {
    let tags = state.tags.list().await.map_err(map_store_error)?;
    Ok(Json(tags))
}

pub(crate) async fn get_tag(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<Tag>, ApiError> {
    let id = parse_id("id", &id)?;
    let tag = state
        .tags
        .get(id)
        .await
        .map_err(map_store_error)?
        .ok_or_else(not_found)?;
    Ok(Json(tag))
}

pub(crate) async fn create_tag(
    State(state): State<Arc<AppState>>,
    Json(req): Json<TagPayload>,
) -> Result<(StatusCode, [(HeaderName, String); 1], Json<Tag>), ApiError> {
    let name = require_field("name", req.name.as_deref())?;
    validate_name(name)?;

    let tag = state.tags.insert(name).await.map_err(map_store_error)?;
    let location = format!("/tags/{}", tag.id);
    Ok((StatusCode::CREATED, location_header(location), Json(tag)))
}

pub(crate) async fn update_tag(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(req): Json<TagPayload>,
) -> Result<Json<Tag>, ApiError> {
    let id = parse_id("id", &id)?;
    let name = require_field("name", req.name.as_deref())?;
    validate_name(name)?;

    let tag = state
        .tags
        .update(id, name)
        .await
        .map_err(map_store_error)?
        .ok_or_else(not_found)?;
    Ok(Json(tag))
}

/// Deleting a tag also removes its id from every note's tag list.
pub(crate) async fn delete_tag(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    let id = parse_id("id", &id)?;
    cascade::delete_tag(&state, id)
        .await
        .map_err(map_store_error)?;
    Ok(StatusCode::NO_CONTENT)
}
