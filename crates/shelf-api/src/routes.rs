use axum::{
    Json, Router, middleware,
    routing::{get, post},
};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use shelf_types::api::HealthResponse;

use crate::auth::{self, AppState};
use crate::middleware::require_auth;
use crate::{books, friends, library, users};

/// Full HTTP surface. Everything except health and auth sits behind
/// [`require_auth`].
pub fn router(state: AppState) -> Router {
    let public_routes = Router::new()
        .route("/api/health", get(health))
        .route("/api/auth/register", post(auth::register))
        .route("/api/auth/login", post(auth::login));

    let protected_routes = Router::new()
        .route("/api/users/me", get(users::me))
        .route("/api/users/search", get(users::search))
        .route("/api/friends", get(friends::list_friends))
        .route("/api/friends/requests", get(friends::list_requests))
        .route("/api/friends/request/{user_id}", post(friends::send_request))
        .route("/api/friends/accept/{from_user_id}", post(friends::accept_request))
        .route("/api/friends/reject/{from_user_id}", post(friends::reject_request))
        .route("/api/friends/{friend_id}/library", get(friends::friend_library))
        .route("/api/library", get(library::list))
        .route("/api/library/add", post(library::add))
        .route("/api/library/remove", post(library::remove))
        .route("/api/library/mark-read", post(library::mark_read))
        .route("/api/books/search", get(books::search))
        .route("/api/books/{id}", get(books::get_book))
        .route_layer(middleware::from_fn_with_state(state.clone(), require_auth));

    Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        time: chrono::Utc::now(),
    })
}
