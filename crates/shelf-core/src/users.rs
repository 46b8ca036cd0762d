use shelf_db::models::UserRow;
use shelf_db::{Database, queries};
use shelf_types::api::MeResponse;
use shelf_types::models::UserSummary;
use tracing::info;
use uuid::Uuid;

use crate::{CoreError, Result};

const SEARCH_LIMIT: u32 = 20;

/// Registration input after trimming and validation. The password is still
/// plaintext; hashing happens in the auth layer.
#[derive(Debug)]
pub struct NewUser {
    pub username: String,
    pub email: String,
    pub password: String,
}

impl NewUser {
    pub fn validate(username: &str, email: &str, password: &str) -> Result<Self> {
        let username = username.trim();
        let email = email.trim().to_lowercase();

        if username.is_empty() || email.is_empty() || password.is_empty() {
            return Err(CoreError::invalid("username, email, password required"));
        }
        if username.chars().count() < 3 || username.chars().count() > 32 {
            return Err(CoreError::invalid("username must be 3 to 32 characters"));
        }
        if !email.contains('@') {
            return Err(CoreError::invalid("email is not valid"));
        }
        if password.len() < 8 {
            return Err(CoreError::invalid("password must be at least 8 characters"));
        }

        Ok(Self {
            username: username.to_string(),
            email,
            password: password.to_string(),
        })
    }
}

/// Stores a validated user with an already-hashed password and returns the
/// new id. Username and email must both be unused.
pub fn create(db: &Database, user: &NewUser, password_hash: &str) -> Result<Uuid> {
    if db.get_user_by_username(&user.username)?.is_some()
        || db.get_user_by_email(&user.email)?.is_some()
    {
        return Err(CoreError::conflict("User already exists"));
    }

    let id = Uuid::new_v4();
    // A concurrent registration can still win between the check and the insert
    db.create_user(&id.to_string(), &user.username, &user.email, password_hash)
        .map_err(|e| {
            if shelf_db::is_constraint_violation(&e) {
                CoreError::conflict("User already exists")
            } else {
                CoreError::Internal(e)
            }
        })?;

    info!(user_id = %id, username = %user.username, "User registered");
    Ok(id)
}

pub fn find_by_email(db: &Database, email: &str) -> Result<Option<UserRow>> {
    Ok(db.get_user_by_email(email.trim())?)
}

/// The caller's full record without the password hash.
pub fn profile(db: &Database, user_id: &str) -> Result<MeResponse> {
    db.transaction(|tx| -> Result<MeResponse> {
        let row = queries::user_by_id(tx, user_id)?
            .ok_or_else(|| CoreError::not_found("User not found"))?;

        let friends = queries::friends_of(tx, user_id)?
            .into_iter()
            .map(|f| f.id)
            .collect();

        Ok(MeResponse {
            friend_requests: queries::friend_requests_for(tx, user_id)?,
            library: queries::library_for(tx, user_id)?,
            created_at: queries::parse_timestamp(&row.created_at)?,
            id: row.id,
            username: row.username,
            email: row.email,
            profile_pic: row.profile_pic,
            friends,
        })
    })
}

/// Users whose name contains `q`, ignoring case. An empty query matches
/// nobody.
pub fn search(db: &Database, q: &str) -> Result<Vec<UserSummary>> {
    let q = q.trim();
    if q.is_empty() {
        return Ok(Vec::new());
    }
    Ok(db.search_users(q, SEARCH_LIMIT)?)
}
