use shelf_db::{Database, queries};
use shelf_types::models::{BookDescriptor, BookStatus, LibraryEntry};
use tracing::{debug, info};

use crate::{CoreError, Result};

pub fn find_entry<'a>(entries: &'a mut [LibraryEntry], google_id: &str) -> Option<&'a mut LibraryEntry> {
    entries.iter_mut().find(|e| e.google_id == google_id)
}

/// Validates the status string of an add request.
pub fn parse_status(raw: Option<&str>) -> Result<BookStatus> {
    raw.and_then(|s| s.parse().ok())
        .ok_or_else(|| CoreError::invalid(r#"Invalid status. Must be "read" or "toBeRead""#))
}

/// Appends `book`, or only re-statuses it when its googleId is already
/// present. Title, authors and the rest of an existing entry are never
/// overwritten here.
pub fn upsert(entries: &mut Vec<LibraryEntry>, google_id: String, book: BookDescriptor, status: BookStatus) {
    match find_entry(entries, &google_id) {
        Some(existing) => existing.set_status(status),
        None => entries.push(LibraryEntry::new(google_id, book, status)),
    }
}

/// Returns whether anything was removed.
pub fn remove_entry(entries: &mut Vec<LibraryEntry>, google_id: &str) -> bool {
    let before = entries.len();
    entries.retain(|e| e.google_id != google_id);
    entries.len() != before
}

pub fn list_library(db: &Database, user_id: &str) -> Result<Vec<LibraryEntry>> {
    Ok(db.with_conn(|conn| queries::library_for(conn, user_id))?)
}

/// Adds `book` with `status`, or updates the status of the copy already in
/// the library. Returns the whole library afterwards.
pub fn add_or_update(
    db: &Database,
    user_id: &str,
    book: Option<BookDescriptor>,
    status: Option<&str>,
) -> Result<Vec<LibraryEntry>> {
    let mut book = book.unwrap_or_default();
    let google_id = book
        .google_id
        .take()
        .filter(|id| !id.trim().is_empty())
        .ok_or_else(|| CoreError::invalid("book.googleId required"))?;
    let status = parse_status(status)?;

    let library = update_library(db, user_id, |entries| {
        upsert(entries, google_id.clone(), book, status);
        Ok(true)
    })?;

    info!(user_id, google_id = %google_id, %status, "Library entry saved");
    Ok(library)
}

/// Removes the entry for `google_id` if there is one. Removing a book that
/// is not in the library is not an error.
pub fn remove(db: &Database, user_id: &str, google_id: &str) -> Result<Vec<LibraryEntry>> {
    update_library(db, user_id, |entries| {
        let removed = remove_entry(entries, google_id);
        debug!(user_id, google_id, removed, "Library remove");
        Ok(removed)
    })
}

/// Sets `is_read` on an existing entry and derives its status from it.
pub fn mark_read(db: &Database, user_id: &str, google_id: &str, is_read: bool) -> Result<Vec<LibraryEntry>> {
    update_library(db, user_id, |entries| {
        let entry = find_entry(entries, google_id)
            .ok_or_else(|| CoreError::not_found("Book not in library"))?;
        entry.set_status(BookStatus::from_is_read(is_read));
        Ok(true)
    })
}

/// Loads the library, lets `f` edit it, and writes it back in the same
/// transaction. `f` returns whether it changed anything; on `Err` nothing is
/// written.
fn update_library<F>(db: &Database, user_id: &str, f: F) -> Result<Vec<LibraryEntry>>
where
    F: FnOnce(&mut Vec<LibraryEntry>) -> Result<bool>,
{
    db.transaction(|tx| -> Result<Vec<LibraryEntry>> {
        if !queries::user_exists(tx, user_id)? {
            return Err(CoreError::not_found("User not found"));
        }
        let mut entries = queries::library_for(tx, user_id)?;
        if f(&mut entries)? {
            queries::save_library(tx, user_id, &entries)?;
        }
        Ok(entries)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::seeded;

    fn book(google_id: &str, title: &str) -> Option<BookDescriptor> {
        Some(BookDescriptor {
            google_id: Some(google_id.to_string()),
            title: title.to_string(),
            authors: vec!["Ursula K. Le Guin".into()],
            thumbnail: Some(format!("http://img/{}", google_id)),
            ..Default::default()
        })
    }

    fn coherent(entries: &[LibraryEntry]) -> bool {
        entries.iter().all(|e| e.is_read == (e.status == BookStatus::Read))
    }

    #[test]
    fn re_adding_updates_status_only() {
        let (db, ids) = seeded(&["alice"]);
        let a = &ids[0];

        add_or_update(&db, a, book("X1", "The Dispossessed"), Some("toBeRead")).unwrap();
        let library = add_or_update(&db, a, book("X1", "Renamed"), Some("read")).unwrap();

        assert_eq!(library.len(), 1);
        assert_eq!(library[0].status, BookStatus::Read);
        assert!(library[0].is_read);
        assert_eq!(library[0].title, "The Dispossessed");
        assert_eq!(list_library(&db, a).unwrap(), library);
    }

    #[test]
    fn many_adds_keep_one_entry_per_book() {
        let (db, ids) = seeded(&["alice"]);
        let a = &ids[0];

        for status in ["read", "TOBEREAD", "Read", "toberead", "read"] {
            add_or_update(&db, a, book("X1", "t"), Some(status)).unwrap();
            add_or_update(&db, a, book("X2", "t"), Some(status)).unwrap();
        }
        let library = list_library(&db, a).unwrap();
        let order: Vec<_> = library.iter().map(|e| e.google_id.as_str()).collect();
        assert_eq!(order, ["X1", "X2"]);
        assert!(coherent(&library));
    }

    #[test]
    fn invalid_input_is_rejected_before_any_write() {
        let (db, ids) = seeded(&["alice"]);
        let a = &ids[0];

        assert!(matches!(add_or_update(&db, a, None, Some("read")), Err(CoreError::InvalidArgument(_))));
        assert!(matches!(add_or_update(&db, a, book("  ", "t"), Some("read")), Err(CoreError::InvalidArgument(_))));
        assert!(matches!(add_or_update(&db, a, book("X1", "t"), Some("finished")), Err(CoreError::InvalidArgument(_))));
        assert!(matches!(add_or_update(&db, a, book("X1", "t"), None), Err(CoreError::InvalidArgument(_))));
        assert!(list_library(&db, a).unwrap().is_empty());
    }

    #[test]
    fn mark_read_drives_status() {
        let (db, ids) = seeded(&["alice"]);
        let a = &ids[0];

        add_or_update(&db, a, book("X1", "t"), Some("read")).unwrap();
        let library = mark_read(&db, a, "X1", false).unwrap();
        assert_eq!(library[0].status, BookStatus::ToBeRead);
        assert!(!library[0].is_read);

        let library = mark_read(&db, a, "X1", true).unwrap();
        assert_eq!(library[0].status, BookStatus::Read);
        assert!(coherent(&library));
    }

    #[test]
    fn mark_read_on_missing_book_is_not_found() {
        let (db, ids) = seeded(&["alice"]);
        assert!(matches!(mark_read(&db, &ids[0], "nope", true), Err(CoreError::NotFound(_))));
    }

    #[test]
    fn remove_is_idempotent() {
        let (db, ids) = seeded(&["alice"]);
        let a = &ids[0];

        add_or_update(&db, a, book("X1", "t"), Some("read")).unwrap();
        add_or_update(&db, a, book("X2", "t"), Some("read")).unwrap();

        let library = remove(&db, a, "X1").unwrap();
        assert_eq!(library.len(), 1);
        let again = remove(&db, a, "X1").unwrap();
        assert_eq!(again, library);
        assert_eq!(remove(&db, a, "").unwrap(), library);
    }

    #[test]
    fn libraries_are_per_user() {
        let (db, ids) = seeded(&["alice", "bob"]);
        add_or_update(&db, &ids[0], book("X1", "t"), Some("read")).unwrap();
        add_or_update(&db, &ids[1], book("X1", "t"), Some("toBeRead")).unwrap();

        assert_eq!(list_library(&db, &ids[0]).unwrap()[0].status, BookStatus::Read);
        assert_eq!(list_library(&db, &ids[1]).unwrap()[0].status, BookStatus::ToBeRead);
    }
}
