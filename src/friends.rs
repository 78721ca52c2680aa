//! Friend management workflows: search, request, respond, remove.

use chrono::Utc;
use log::debug;

use crate::engine::graph::accepted_friend_ids;
use crate::errors::{StoreError, StoreResult};
use crate::model::{Friendship, FriendshipStatus, Notification, NotificationKind, UserProfile};
use crate::store::DataStore;

/// How the recipient answered a pending friend request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestResponse {
    Accept,
    Decline,
}

/// Profiles whose name starts with `query` (case-insensitive), excluding the
/// viewer and anyone already connected to them - pending requests in either
/// direction count as connected. An empty query returns nothing.
pub async fn search_users<S: DataStore>(store: &S, viewer_id: &str, query: &str) -> StoreResult<Vec<UserProfile>> {
    let query = query.trim().to_lowercase();
    if query.is_empty() {
        return Ok(Vec::new());
    }

    let records = store.friendships(viewer_id).await?;
    let matches = store.search_profiles(&query).await?;
    Ok(matches
        .into_iter()
        .filter(|p| p.user_id != viewer_id)
        .filter(|p| !records.iter().any(|f| f.involves(&p.user_id)))
        .collect())
}

/// Send a friend request from `sender` to `recipient_id`: a pending
/// friendship record plus a notification for the recipient.
///
/// Fails if a record between the pair already exists, in either direction and
/// any status.
pub async fn send_friend_request<S: DataStore>(
    store: &S,
    sender: &UserProfile,
    recipient_id: &str,
) -> StoreResult<Friendship> {
    let existing = store.friendships(&sender.user_id).await?;
    if existing.iter().any(|f| f.involves(recipient_id)) {
        return Err(StoreError::invalid("a friendship with this user already exists"));
    }

    let now = Utc::now();
    let friendship = Friendship::request(sender.user_id.clone(), recipient_id, now)?;
    store.insert_friendship(friendship.clone()).await?;
    store
        .insert_notification(Notification::new(recipient_id, NotificationKind::FriendRequest, sender, now))
        .await?;
    debug!("friend request {} -> {recipient_id}", sender.user_id);
    Ok(friendship)
}

/// Answer a pending request addressed to `responder`.
///
/// Accept flips the record to accepted; decline deletes it - declined pairs
/// leave no terminal record and can request again later. Either way the
/// requester is notified and the triggering notification, when given, is
/// marked read.
pub async fn respond_to_request<S: DataStore>(
    store: &S,
    responder: &UserProfile,
    friendship_id: &str,
    response: RequestResponse,
    notification_id: Option<&str>,
) -> StoreResult<()> {
    let records = store.friendships(&responder.user_id).await?;
    let record = records
        .iter()
        .find(|f| f.id == friendship_id)
        .ok_or_else(|| StoreError::NotFound {
            entity_id: Some(friendship_id.to_string()),
        })?;
    if record.status != FriendshipStatus::Pending {
        return Err(StoreError::invalid("friendship is not pending"));
    }
    if record.requester_id == responder.user_id {
        return Err(StoreError::invalid("only the recipient can answer a request"));
    }
    let requester_id = record.requester_id.clone();

    let kind = match response {
        RequestResponse::Accept => {
            store.set_friendship_status(friendship_id, FriendshipStatus::Accepted).await?;
            NotificationKind::FriendRequestAccepted
        }
        RequestResponse::Decline => {
            store.delete_friendship(friendship_id).await?;
            NotificationKind::FriendRequestDeclined
        }
    };
    store
        .insert_notification(Notification::new(requester_id, kind, responder, Utc::now()))
        .await?;

    if let Some(notification_id) = notification_id {
        store.mark_notification_read(notification_id).await?;
    }
    Ok(())
}

/// Remove an accepted friend by deleting the friendship record. Removal is
/// silent: no notification is produced.
pub async fn remove_friend<S: DataStore>(store: &S, viewer_id: &str, friend_id: &str) -> StoreResult<()> {
    let records = store.friendships(viewer_id).await?;
    let record = records
        .iter()
        .find(|f| f.status == FriendshipStatus::Accepted && f.involves(friend_id))
        .ok_or_else(|| StoreError::NotFound {
            entity_id: Some(friend_id.to_string()),
        })?;
    store.delete_friendship(&record.id).await
}

/// Number of accepted friends, for profile stats.
pub async fn accepted_friend_count<S: DataStore>(store: &S, viewer_id: &str) -> StoreResult<usize> {
    let records = store.friendships(viewer_id).await?;
    Ok(accepted_friend_ids(&records, viewer_id).len())
}
