//! Friend relationships and reading libraries on top of the shelf user store.
//!
//! Every operation takes the caller's id as already verified by the auth
//! layer. Ids supplied by the caller for *other* users are untrusted and go
//! through [`canonical_id`] first.

pub mod error;
pub mod friends;
pub mod library;
pub mod users;

pub use error::{CoreError, Result};

use uuid::Uuid;

/// Normalizes a user id from a path or body to the stored hyphenated form.
/// Anything that is not a UUID cannot name a user.
pub fn canonical_id(raw: &str) -> Option<String> {
    Uuid::parse_str(raw.trim()).ok().map(|id| id.to_string())
}
