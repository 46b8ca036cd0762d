use anyhow::Result;
use rusqlite::Connection;
use tracing::info;

pub fn run(conn: &Connection) -> Result<()> {
    conn.execute_batch("CREATE TABLE IF NOT EXISTS schema_version (version INTEGER NOT NULL);")?;

    let version: i64 = conn
        .query_row("SELECT COALESCE(MAX(version), 0) FROM schema_version", [], |r| r.get(0))?;

    if version < 1 {
        info!("Running migration v1 (users, friends, library)");
        conn.execute_batch(
            "
            CREATE TABLE users (
                id          TEXT PRIMARY KEY,
                username    TEXT NOT NULL UNIQUE,
                email       TEXT NOT NULL UNIQUE COLLATE NOCASE,
                password    TEXT NOT NULL,
                profile_pic TEXT,
                created_at  TEXT NOT NULL DEFAULT (datetime('now'))
            );

            CREATE TABLE friend_requests (
                id            INTEGER PRIMARY KEY AUTOINCREMENT,
                recipient_id  TEXT NOT NULL REFERENCES users(id),
                from_id       TEXT NOT NULL REFERENCES users(id),
                status        TEXT NOT NULL DEFAULT 'pending'
                              CHECK (status IN ('pending', 'accepted', 'rejected')),
                created_at    TEXT NOT NULL DEFAULT (datetime('now')),
                updated_at    TEXT NOT NULL DEFAULT (datetime('now'))
            );

            CREATE INDEX idx_friend_requests_recipient
                ON friend_requests(recipient_id, status);

            CREATE TABLE friendships (
                user_id     TEXT NOT NULL REFERENCES users(id),
                friend_id   TEXT NOT NULL REFERENCES users(id),
                created_at  TEXT NOT NULL DEFAULT (datetime('now')),
                PRIMARY KEY (user_id, friend_id)
            );

            CREATE TABLE library_entries (
                id            INTEGER PRIMARY KEY AUTOINCREMENT,
                user_id       TEXT NOT NULL REFERENCES users(id),
                google_id     TEXT NOT NULL,
                title         TEXT NOT NULL DEFAULT '',
                authors       TEXT NOT NULL DEFAULT '[]',
                thumbnail     TEXT,
                rating        REAL,
                description   TEXT,
                preview_link  TEXT,
                status        TEXT NOT NULL DEFAULT 'toBeRead'
                              CHECK (status IN ('read', 'toBeRead')),
                is_read       INTEGER NOT NULL DEFAULT 0,
                UNIQUE (user_id, google_id)
            );

            INSERT INTO schema_version (version) VALUES (1);
            ",
        )?;
    }

    info!("Database migrations complete");
    Ok(())
}
