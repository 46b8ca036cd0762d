use shelf_db::{Connection, Database, queries};
use shelf_types::api::{FriendLibrary, PendingRequest};
use shelf_types::models::{FriendRequest, RequestStatus, UserSummary};
use tracing::{debug, error, info};

use crate::{CoreError, Result, canonical_id};

/// First pending request from `from`, if any. Duplicate pending requests
/// from the same sender are legal; the oldest one is always acted on first.
pub fn first_pending<'a>(requests: &'a mut [FriendRequest], from: &str) -> Option<&'a mut FriendRequest> {
    requests
        .iter_mut()
        .find(|r| r.from == from && r.status == RequestStatus::Pending)
}

fn no_pending() -> CoreError {
    CoreError::not_found("Request not found")
}

fn ensure_user(conn: &Connection, id: &str) -> Result<()> {
    if queries::user_exists(conn, id)? {
        Ok(())
    } else {
        Err(CoreError::not_found("User not found"))
    }
}

/// Appends a pending request from `requester_id` to the target's list.
///
/// Duplicates are not rejected: a second request while one is pending, or a
/// request to someone who is already a friend, is stored like any other.
pub fn send_request(db: &Database, requester_id: &str, target_id: &str) -> Result<i64> {
    let target = canonical_id(target_id);
    if target.as_deref() == Some(requester_id) {
        return Err(CoreError::invalid("Cannot friend yourself"));
    }
    let target = target.ok_or_else(|| CoreError::not_found("User not found"))?;

    let request_id = db.transaction(|tx| {
        ensure_user(tx, requester_id)?;
        ensure_user(tx, &target)?;
        Ok::<_, CoreError>(queries::insert_friend_request(tx, &target, requester_id)?)
    })?;

    info!(from = requester_id, to = %target, request_id, "Friend request sent");
    Ok(request_id)
}

/// Pending requests addressed to `user_id`, oldest first.
pub fn list_pending_requests(db: &Database, user_id: &str) -> Result<Vec<PendingRequest>> {
    let rows = db.with_conn(|conn| queries::pending_requests_for(conn, user_id))?;

    let pending = rows
        .into_iter()
        .map(|row| -> anyhow::Result<PendingRequest> {
            Ok(PendingRequest {
                requested_at: queries::parse_timestamp(&row.created_at)?,
                from_user_id: row.from_id,
                username: row.username,
                profile_pic: row.profile_pic,
            })
        })
        .collect::<anyhow::Result<Vec<_>>>()?;

    Ok(pending)
}

/// Accepts the oldest pending request from `from_id` and makes the two users
/// friends. The status change and both friend-set inserts commit together or
/// not at all.
pub fn accept_request(db: &Database, user_id: &str, from_id: &str) -> Result<()> {
    let from = canonical_id(from_id).ok_or_else(no_pending)?;

    let result: Result<()> = db.transaction(|tx| {
        let mut requests = queries::friend_requests_for(tx, user_id)?;
        let request = first_pending(&mut requests, &from).ok_or_else(no_pending)?;
        request
            .transition(RequestStatus::Accepted)
            .map_err(|e| CoreError::not_found(e.to_string()))?;
        queries::save_friend_request_status(tx, request)?;

        let added_here = queries::add_friend(tx, user_id, &from)?;
        let added_there = queries::add_friend(tx, &from, user_id)?;
        debug!(user_id, from = %from, added_here, added_there, "Friend sets updated");
        Ok(())
    });

    match &result {
        Ok(()) => info!(user_id, from = %from, "Friend request accepted"),
        Err(CoreError::Internal(e)) => error!(
            user_id,
            from = %from,
            "Accepting friend request failed, friendship pair rolled back: {:#}",
            e
        ),
        Err(_) => {}
    }
    result
}

/// Rejects the oldest pending request from `from_id`. The sender is free to
/// ask again later.
pub fn reject_request(db: &Database, user_id: &str, from_id: &str) -> Result<()> {
    let from = canonical_id(from_id).ok_or_else(no_pending)?;

    db.transaction(|tx| {
        let mut requests = queries::friend_requests_for(tx, user_id)?;
        let request = first_pending(&mut requests, &from).ok_or_else(no_pending)?;
        request
            .transition(RequestStatus::Rejected)
            .map_err(|e| CoreError::not_found(e.to_string()))?;
        queries::save_friend_request_status(tx, request)?;
        Ok::<_, CoreError>(())
    })?;

    info!(user_id, from = %from, "Friend request rejected");
    Ok(())
}

pub fn list_friends(db: &Database, user_id: &str) -> Result<Vec<UserSummary>> {
    Ok(db.with_conn(|conn| queries::friends_of(conn, user_id))?)
}

/// A friend's public profile and full library. Only the caller's own friend
/// set is consulted, so any id that is not in it, existing or not, is
/// forbidden.
pub fn view_friend_library(db: &Database, user_id: &str, friend_id: &str) -> Result<FriendLibrary> {
    let forbidden = || CoreError::forbidden("Not friends");
    let friend = canonical_id(friend_id).ok_or_else(forbidden)?;

    db.transaction(|tx| -> Result<FriendLibrary> {
        if !queries::is_friend(tx, user_id, &friend)? {
            return Err(forbidden());
        }
        let row = queries::user_by_id(tx, &friend)?.ok_or_else(forbidden)?;
        let library = queries::library_for(tx, &friend)?;

        Ok(FriendLibrary {
            id: row.id,
            username: row.username,
            profile_pic: row.profile_pic,
            library,
        })
    })
}
