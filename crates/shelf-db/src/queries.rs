use crate::Database;
use crate::models::{PendingRequestRow, UserRow};
use anyhow::{Context, Result, anyhow};
use chrono::{DateTime, NaiveDateTime, Utc};
use rusqlite::Connection;
use shelf_types::models::{BookStatus, FriendRequest, LibraryEntry, RequestStatus, UserSummary};

impl Database {
    // -- Users --

    pub fn create_user(
        &self,
        id: &str,
        username: &str,
        email: &str,
        password_hash: &str,
    ) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO users (id, username, email, password, created_at) VALUES (?1, ?2, ?3, ?4, ?5)",
                rusqlite::params![id, username, email, password_hash, now_timestamp()],
            )?;
            Ok(())
        })
    }

    pub fn get_user_by_email(&self, email: &str) -> Result<Option<UserRow>> {
        self.with_conn(|conn| query_user(conn, "email", email))
    }

    pub fn get_user_by_username(&self, username: &str) -> Result<Option<UserRow>> {
        self.with_conn(|conn| query_user(conn, "username", username))
    }

    /// Case-insensitive substring match on usernames.
    pub fn search_users(&self, needle: &str, limit: u32) -> Result<Vec<UserSummary>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id, username, profile_pic FROM users
                 WHERE instr(lower(username), lower(?1)) > 0
                 ORDER BY username
                 LIMIT ?2",
            )?;

            let rows = stmt
                .query_map(rusqlite::params![needle, limit], |row| {
                    Ok(UserSummary {
                        id: row.get(0)?,
                        username: row.get(1)?,
                        profile_pic: row.get(2)?,
                    })
                })?
                .collect::<std::result::Result<Vec<_>, _>>()?;

            Ok(rows)
        })
    }
}

// -- Users (connection level) --

pub fn user_by_id(conn: &Connection, id: &str) -> Result<Option<UserRow>> {
    query_user(conn, "id", id)
}

pub fn user_exists(conn: &Connection, id: &str) -> Result<bool> {
    let found: Option<i64> = conn
        .query_row("SELECT 1 FROM users WHERE id = ?1", [id], |row| row.get(0))
        .optional()?;
    Ok(found.is_some())
}

fn query_user(conn: &Connection, column: &'static str, value: &str) -> Result<Option<UserRow>> {
    let sql = format!(
        "SELECT id, username, email, password, profile_pic, created_at FROM users WHERE {} = ?1",
        column
    );
    let mut stmt = conn.prepare(&sql)?;

    let row = stmt
        .query_row([value], |row| {
            Ok(UserRow {
                id: row.get(0)?,
                username: row.get(1)?,
                email: row.get(2)?,
                password: row.get(3)?,
                profile_pic: row.get(4)?,
                created_at: row.get(5)?,
            })
        })
        .optional()?;

    Ok(row)
}

// -- Friend requests --

/// Appends a pending request to the recipient's list and returns its id.
pub fn insert_friend_request(conn: &Connection, recipient_id: &str, from_id: &str) -> Result<i64> {
    let now = now_timestamp();
    conn.execute(
        "INSERT INTO friend_requests (recipient_id, from_id, status, created_at, updated_at)
         VALUES (?1, ?2, 'pending', ?3, ?3)",
        rusqlite::params![recipient_id, from_id, now],
    )?;
    Ok(conn.last_insert_rowid())
}

/// Every request ever received by `recipient_id`, oldest first.
pub fn friend_requests_for(conn: &Connection, recipient_id: &str) -> Result<Vec<FriendRequest>> {
    let mut stmt = conn.prepare(
        "SELECT id, from_id, status, created_at, updated_at FROM friend_requests
         WHERE recipient_id = ?1
         ORDER BY id",
    )?;

    let raw = stmt
        .query_map([recipient_id], |row| {
            Ok((
                row.get::<_, i64>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
                row.get::<_, String>(3)?,
                row.get::<_, String>(4)?,
            ))
        })?
        .collect::<std::result::Result<Vec<_>, _>>()?;

    raw.into_iter()
        .map(|(id, from, status, created_at, updated_at)| -> Result<FriendRequest> {
            Ok(FriendRequest {
                id,
                from,
                status: status
                    .parse::<RequestStatus>()
                    .with_context(|| format!("friend request {}", id))?,
                created_at: parse_timestamp(&created_at)?,
                updated_at: parse_timestamp(&updated_at)?,
            })
        })
        .collect()
}

pub fn save_friend_request_status(conn: &Connection, request: &FriendRequest) -> Result<()> {
    let changed = conn.execute(
        "UPDATE friend_requests SET status = ?1, updated_at = ?2 WHERE id = ?3",
        rusqlite::params![request.status.as_str(), request.updated_at.to_rfc3339(), request.id],
    )?;
    if changed != 1 {
        return Err(anyhow!("Friend request {} vanished during update", request.id));
    }
    Ok(())
}

/// Pending requests for `recipient_id` joined with each sender's username
/// and picture, in the order they were sent.
pub fn pending_requests_for(conn: &Connection, recipient_id: &str) -> Result<Vec<PendingRequestRow>> {
    let mut stmt = conn.prepare(
        "SELECT fr.from_id, u.username, u.profile_pic, fr.created_at
         FROM friend_requests fr
         JOIN users u ON u.id = fr.from_id
         WHERE fr.recipient_id = ?1 AND fr.status = 'pending'
         ORDER BY fr.id",
    )?;

    let rows = stmt
        .query_map([recipient_id], |row| {
            Ok(PendingRequestRow {
                from_id: row.get(0)?,
                username: row.get(1)?,
                profile_pic: row.get(2)?,
                created_at: row.get(3)?,
            })
        })?
        .collect::<std::result::Result<Vec<_>, _>>()?;

    Ok(rows)
}

// -- Friendships --

/// Adds `friend_id` to `user_id`'s friend set. Returns false if it was
/// already there.
pub fn add_friend(conn: &Connection, user_id: &str, friend_id: &str) -> Result<bool> {
    let inserted = conn.execute(
        "INSERT OR IGNORE INTO friendships (user_id, friend_id, created_at) VALUES (?1, ?2, ?3)",
        rusqlite::params![user_id, friend_id, now_timestamp()],
    )?;
    Ok(inserted == 1)
}

pub fn is_friend(conn: &Connection, user_id: &str, friend_id: &str) -> Result<bool> {
    let found: Option<i64> = conn
        .query_row(
            "SELECT 1 FROM friendships WHERE user_id = ?1 AND friend_id = ?2",
            [user_id, friend_id],
            |row| row.get(0),
        )
        .optional()?;
    Ok(found.is_some())
}

pub fn friends_of(conn: &Connection, user_id: &str) -> Result<Vec<UserSummary>> {
    let mut stmt = conn.prepare(
        "SELECT u.id, u.username, u.profile_pic
         FROM friendships f
         JOIN users u ON u.id = f.friend_id
         WHERE f.user_id = ?1
         ORDER BY f.rowid",
    )?;

    let rows = stmt
        .query_map([user_id], |row| {
            Ok(UserSummary {
                id: row.get(0)?,
                username: row.get(1)?,
                profile_pic: row.get(2)?,
            })
        })?
        .collect::<std::result::Result<Vec<_>, _>>()?;

    Ok(rows)
}

// -- Library --

pub fn library_for(conn: &Connection, user_id: &str) -> Result<Vec<LibraryEntry>> {
    let mut stmt = conn.prepare(
        "SELECT google_id, title, authors, thumbnail, rating, description, preview_link, status, is_read
         FROM library_entries
         WHERE user_id = ?1
         ORDER BY id",
    )?;

    let raw = stmt
        .query_map([user_id], |row| {
            Ok((
                LibraryEntry {
                    google_id: row.get(0)?,
                    title: row.get(1)?,
                    authors: Vec::new(),
                    thumbnail: row.get(3)?,
                    rating: row.get(4)?,
                    description: row.get(5)?,
                    preview_link: row.get(6)?,
                    status: BookStatus::default(),
                    is_read: row.get(8)?,
                },
                row.get::<_, String>(2)?,
                row.get::<_, String>(7)?,
            ))
        })?
        .collect::<std::result::Result<Vec<_>, _>>()?;

    raw.into_iter()
        .map(|(mut entry, authors, status)| -> Result<LibraryEntry> {
            entry.authors = serde_json::from_str(&authors)
                .with_context(|| format!("Corrupt authors on library entry '{}'", entry.google_id))?;
            entry.status = status
                .parse()
                .with_context(|| format!("library entry '{}'", entry.google_id))?;
            Ok(entry)
        })
        .collect()
}

/// Replaces the whole library of `user_id` with `entries`, preserving their
/// order. Call inside a transaction.
pub fn save_library(conn: &Connection, user_id: &str, entries: &[LibraryEntry]) -> Result<()> {
    conn.execute("DELETE FROM library_entries WHERE user_id = ?1", [user_id])?;

    let mut stmt = conn.prepare(
        "INSERT INTO library_entries
            (user_id, google_id, title, authors, thumbnail, rating, description, preview_link, status, is_read)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
    )?;

    for entry in entries {
        stmt.execute(rusqlite::params![
            user_id,
            entry.google_id,
            entry.title,
            serde_json::to_string(&entry.authors)?,
            entry.thumbnail,
            entry.rating,
            entry.description,
            entry.preview_link,
            entry.status.as_str(),
            entry.is_read,
        ])?;
    }

    Ok(())
}

// -- Timestamps --

fn now_timestamp() -> String {
    Utc::now().to_rfc3339()
}

/// Parses a stored timestamp. Rows written by this crate are RFC 3339; rows
/// that fell back to the column default use SQLite's "YYYY-MM-DD HH:MM:SS".
pub fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>> {
    raw.parse::<DateTime<Utc>>()
        .or_else(|_| NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S").map(|ndt| ndt.and_utc()))
        .with_context(|| format!("Corrupt timestamp '{}'", raw))
}

/// Extension trait for optional query results
trait OptionalExt<T> {
    fn optional(self) -> Result<Option<T>>;
}

impl<T> OptionalExt<T> for std::result::Result<T, rusqlite::Error> {
    fn optional(self) -> Result<Option<T>> {
        match self {
            Ok(val) => Ok(Some(val)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}
