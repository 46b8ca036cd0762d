pub mod auth;
pub mod books;
pub mod error;
pub mod extract;
pub mod friends;
pub mod library;
pub mod middleware;
pub mod routes;
pub mod users;

pub use auth::{AppState, AppStateInner};
pub use error::ApiError;
pub use routes::router;

use shelf_db::Database;

/// Runs store work on the blocking pool so SQLite never stalls the runtime.
pub(crate) async fn blocking<F, T, E>(state: &AppState, f: F) -> Result<T, ApiError>
where
    F: FnOnce(&Database) -> Result<T, E> + Send + 'static,
    T: Send + 'static,
    E: Into<ApiError> + Send + 'static,
{
    let state = state.clone();
    tokio::task::spawn_blocking(move || f(&state.db))
        .await
        .map_err(|e| ApiError::from(anyhow::anyhow!("spawn_blocking join error: {}", e)))?
        .map_err(Into::into)
}
