use axum::{
    Extension, Json,
    extract::{Query, State},
    response::IntoResponse,
};

use shelf_core::users;
use shelf_types::api::{Claims, UserSearchQuery};

use crate::auth::AppState;
use crate::blocking;
use crate::error::ApiError;

pub async fn me(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, ApiError> {
    let me = claims.sub.to_string();
    let profile = blocking(&state, move |db| users::profile(db, &me)).await?;
    Ok(Json(profile))
}

pub async fn search(
    State(state): State<AppState>,
    Query(query): Query<UserSearchQuery>,
    Extension(_claims): Extension<Claims>,
) -> Result<impl IntoResponse, ApiError> {
    let hits = blocking(&state, move |db| users::search(db, &query.q)).await?;
    Ok(Json(hits))
}
