use axum::extract::{FromRequest, rejection::JsonRejection};

use shelf_core::CoreError;

use crate::error::ApiError;

/// `axum::Json` for request bodies, but a body that is not valid JSON, or
/// does not fit the target type, fails as a 400 with a `{ "message": ... }`
/// body like every other error.
#[derive(Debug, FromRequest)]
#[from_request(via(axum::Json), rejection(ApiError))]
pub struct JsonBody<T>(pub T);

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self::Core(CoreError::invalid(rejection.body_text()))
    }
}
