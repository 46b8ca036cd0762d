use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use thiserror::Error;

// -- Library --

/// Reading status of a library entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum BookStatus {
    #[serde(rename = "read")]
    Read,
    #[default]
    #[serde(rename = "toBeRead")]
    ToBeRead,
}

impl BookStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Read => "read",
            Self::ToBeRead => "toBeRead",
        }
    }

    pub fn is_read(self) -> bool {
        self == Self::Read
    }

    pub fn from_is_read(is_read: bool) -> Self {
        if is_read { Self::Read } else { Self::ToBeRead }
    }
}

impl fmt::Display for BookStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Parses a client-supplied status. Matching is case-insensitive, so
/// `"READ"`, `"toberead"` and `"ToBeRead"` are all accepted.
impl FromStr for BookStatus {
    type Err = UnknownStatus;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "read" => Ok(Self::Read),
            "toberead" => Ok(Self::ToBeRead),
            _ => Err(UnknownStatus(s.to_string())),
        }
    }
}

/// Book fields as they arrive from the catalog when a user adds a result.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BookDescriptor {
    #[serde(default)]
    pub google_id: Option<String>,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub title: String,
    #[serde(default)]
    pub authors: Vec<String>,
    #[serde(default)]
    pub thumbnail: Option<String>,
    #[serde(default)]
    pub rating: Option<f64>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub preview_link: Option<String>,
}

// Catalog hits carry `"title": null` for untitled volumes.
fn null_as_empty<'de, D: Deserializer<'de>>(de: D) -> Result<String, D::Error> {
    Ok(Option::<String>::deserialize(de)?.unwrap_or_default())
}

/// One book in a user's library. `is_read` is kept for older clients and
/// always equals `status == Read`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LibraryEntry {
    pub google_id: String,
    pub title: String,
    pub authors: Vec<String>,
    pub thumbnail: Option<String>,
    pub rating: Option<f64>,
    pub description: Option<String>,
    pub preview_link: Option<String>,
    pub status: BookStatus,
    pub is_read: bool,
}

impl LibraryEntry {
    pub fn new(google_id: String, book: BookDescriptor, status: BookStatus) -> Self {
        Self {
            google_id,
            title: book.title,
            authors: book.authors,
            thumbnail: book.thumbnail,
            rating: book.rating,
            description: book.description,
            preview_link: book.preview_link,
            status,
            is_read: status.is_read(),
        }
    }

    pub fn set_status(&mut self, status: BookStatus) {
        self.status = status;
        self.is_read = status.is_read();
    }
}

// -- Friends --

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RequestStatus {
    #[default]
    Pending,
    Accepted,
    Rejected,
}

impl RequestStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Accepted => "accepted",
            Self::Rejected => "rejected",
        }
    }

    pub fn is_terminal(self) -> bool {
        self != Self::Pending
    }
}

impl fmt::Display for RequestStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RequestStatus {
    type Err = UnknownStatus;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Self::Pending),
            "accepted" => Ok(Self::Accepted),
            "rejected" => Ok(Self::Rejected),
            _ => Err(UnknownStatus(s.to_string())),
        }
    }
}

/// A directed friend request, stored on the recipient.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FriendRequest {
    pub id: i64,
    pub from: String,
    pub status: RequestStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Attempted to move a friend request out of a terminal state.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("friend request is already {0}")]
pub struct TerminalState(pub RequestStatus);

impl FriendRequest {
    /// Moves a pending request to `next`. Only `pending -> accepted` and
    /// `pending -> rejected` are legal.
    pub fn transition(&mut self, next: RequestStatus) -> Result<(), TerminalState> {
        if self.status.is_terminal() || next == RequestStatus::Pending {
            return Err(TerminalState(self.status));
        }
        self.status = next;
        self.updated_at = Utc::now();
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown status '{0}'")]
pub struct UnknownStatus(pub String);

// -- Users --

/// Public view of another user: what friends lists and search results show.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserSummary {
    pub id: String,
    pub username: String,
    pub profile_pic: Option<String>,
}
