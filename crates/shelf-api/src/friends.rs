use axum::{
    Extension, Json,
    extract::{Path, State},
    response::IntoResponse,
};

use shelf_core::friends;
use shelf_types::api::{Claims, MessageResponse};

use crate::auth::AppState;
use crate::blocking;
use crate::error::ApiError;

pub async fn list_friends(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, ApiError> {
    let me = claims.sub.to_string();
    let friends = blocking(&state, move |db| friends::list_friends(db, &me)).await?;
    Ok(Json(friends))
}

pub async fn list_requests(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, ApiError> {
    let me = claims.sub.to_string();
    let pending = blocking(&state, move |db| friends::list_pending_requests(db, &me)).await?;
    Ok(Json(pending))
}

pub async fn send_request(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, ApiError> {
    let me = claims.sub.to_string();
    blocking(&state, move |db| friends::send_request(db, &me, &user_id)).await?;
    Ok(Json(MessageResponse::new("Request sent")))
}

pub async fn accept_request(
    State(state): State<AppState>,
    Path(from_user_id): Path<String>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, ApiError> {
    let me = claims.sub.to_string();
    blocking(&state, move |db| friends::accept_request(db, &me, &from_user_id)).await?;
    Ok(Json(MessageResponse::new("Friend added")))
}

pub async fn reject_request(
    State(state): State<AppState>,
    Path(from_user_id): Path<String>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, ApiError> {
    let me = claims.sub.to_string();
    blocking(&state, move |db| friends::reject_request(db, &me, &from_user_id)).await?;
    Ok(Json(MessageResponse::new("Request rejected")))
}

pub async fn friend_library(
    State(state): State<AppState>,
    Path(friend_id): Path<String>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, ApiError> {
    let me = claims.sub.to_string();
    let view = blocking(&state, move |db| friends::view_friend_library(db, &me, &friend_id)).await?;
    Ok(Json(view))
}
