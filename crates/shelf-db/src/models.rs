//! Database row types for records that do not map one-to-one onto a
//! shelf-types model. Friend requests and library entries are read straight
//! into their shelf-types form.

pub struct UserRow {
    pub id: String,
    pub username: String,
    pub email: String,
    pub password: String,
    pub profile_pic: Option<String>,
    pub created_at: String,
}

/// A pending request joined with its sender's public fields.
pub struct PendingRequestRow {
    pub from_id: String,
    pub username: String,
    pub profile_pic: Option<String>,
    pub created_at: String,
}
