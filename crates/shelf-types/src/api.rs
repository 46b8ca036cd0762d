use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::{BookDescriptor, FriendRequest, LibraryEntry};

// -- JWT Claims --

/// Claims carried by every bearer token. `sub` is the caller's user id and
/// the only identity the handlers trust.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: Uuid,
    pub username: String,
    pub exp: usize,
}

// -- Auth --

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthUser {
    pub id: Uuid,
    pub username: String,
    pub email: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct AuthResponse {
    pub token: String,
    pub user: AuthUser,
}

// -- Users --

/// The caller's own record, minus the password hash.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MeResponse {
    pub id: String,
    pub username: String,
    pub email: String,
    pub profile_pic: Option<String>,
    pub friends: Vec<String>,
    pub friend_requests: Vec<FriendRequest>,
    pub library: Vec<LibraryEntry>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
pub struct UserSearchQuery {
    #[serde(default)]
    pub q: String,
}

// -- Friends --

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PendingRequest {
    pub from_user_id: String,
    pub username: String,
    pub profile_pic: Option<String>,
    pub requested_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FriendLibrary {
    pub id: String,
    pub username: String,
    pub profile_pic: Option<String>,
    pub library: Vec<LibraryEntry>,
}

/// Plain confirmation body, also used for error responses.
#[derive(Debug, Serialize, Deserialize)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self { message: message.into() }
    }
}

// -- Library --

#[derive(Debug, Deserialize)]
pub struct AddBookRequest {
    #[serde(default)]
    pub book: Option<BookDescriptor>,
    #[serde(default)]
    pub status: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoveBookRequest {
    #[serde(default)]
    pub google_id: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MarkReadRequest {
    #[serde(default)]
    pub google_id: String,
    #[serde(default)]
    pub is_read: bool,
}

// -- Catalog --

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BookSearchQuery {
    #[serde(default)]
    pub q: String,
    #[serde(default)]
    pub start_index: u32,
    pub max_results: Option<u32>,
}

/// A catalog search hit, shaped so it can be posted straight back as the
/// `book` of an [`AddBookRequest`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CatalogBook {
    pub google_id: String,
    pub title: Option<String>,
    pub authors: Vec<String>,
    pub thumbnail: Option<String>,
    pub rating: Option<f64>,
    pub description: Option<String>,
    pub preview_link: Option<String>,
    pub genres: Vec<String>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BookSearchResponse {
    pub items: Vec<CatalogBook>,
    pub total_items: u64,
    pub next_start_index: u64,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub time: DateTime<Utc>,
}
