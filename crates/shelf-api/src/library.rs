use axum::{
    Extension, Json,
    extract::State,
    http::StatusCode,
    response::IntoResponse,
};

use shelf_core::library;
use shelf_types::api::{AddBookRequest, Claims, MarkReadRequest, RemoveBookRequest};

use crate::auth::AppState;
use crate::blocking;
use crate::error::ApiError;
use crate::extract::JsonBody;

pub async fn list(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, ApiError> {
    let me = claims.sub.to_string();
    let entries = blocking(&state, move |db| library::list_library(db, &me)).await?;
    Ok(Json(entries))
}

pub async fn add(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    JsonBody(req): JsonBody<AddBookRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let me = claims.sub.to_string();
    let entries = blocking(&state, move |db| {
        library::add_or_update(db, &me, req.book, req.status.as_deref())
    })
    .await?;
    Ok((StatusCode::CREATED, Json(entries)))
}

pub async fn remove(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    JsonBody(req): JsonBody<RemoveBookRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let me = claims.sub.to_string();
    let entries = blocking(&state, move |db| library::remove(db, &me, &req.google_id)).await?;
    Ok(Json(entries))
}

pub async fn mark_read(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    JsonBody(req): JsonBody<MarkReadRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let me = claims.sub.to_string();
    let entries = blocking(&state, move |db| {
        library::mark_read(db, &me, &req.google_id, req.is_read)
    })
    .await?;
    Ok(Json(entries))
}
