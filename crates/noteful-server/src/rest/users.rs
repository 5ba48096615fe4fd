use std::sync::Arc;

use axum::extract::State;
use axum::http::{header::HeaderName, StatusCode};
use axum::Json;
use serde::Deserialize;

use noteful_core::{NewUser, NotefulError, User, UserStore};

use crate::rest::{bad_request, location_header, map_store_error, ApiError};
use crate::state::AppState;
use crate::validation::{
    require_field, validate_fullname, validate_password, validate_username, ValidationError,
};

#[derive(Deserialize)]
pub(crate) struct RegisterUserRequest {
    fullname: Option<String>,
    username: Option<String>,
    password: Option<String>,
}

pub(crate) async fn register_user(
    State(state): State<Arc<AppState>>,
    Json(req): Json<RegisterUserRequest>,
) -> Result<(StatusCode, [(HeaderName, String); 1], Json<User>), ApiError> {
    let username = require_field("username", req.username.as_deref())?.to_string();
    validate_username(&username)?;

    // Passwords are stored verbatim, so no trimming here: whatever the user
    // typed is what a later login must match.
    let password = match req.password {
        Some(p) if !p.is_empty() => p,
        _ => return Err(ValidationError::MissingField { field: "password" }.into()),
    };
    validate_password(&password)?;

    let fullname = req
        .fullname
        .map(|f| f.trim().to_string())
        .filter(|f| !f.is_empty());
    validate_fullname(fullname.as_deref())?;

    // Count-then-insert is not atomic. A concurrent registration slipping
    // through the count still trips the unique index and surfaces as the
    // same duplicate failure.
    let existing = state
        .users
        .count_by_username(&username)
        .await
        .map_err(map_store_error)?;
    if existing > 0 {
        return Err(bad_request(NotefulError::DuplicateName("username")));
    }

    let user = state
        .users
        .insert(NewUser {
            fullname,
            username,
            password,
        })
        .await
        .map_err(map_store_error)?;
    let location = format!("/users/{}", user.id);
    Ok((StatusCode::CREATED, location_header(location), Json(user)))
}
