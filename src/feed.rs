//! Home feed: recent posts by the viewer's accepted friends.

use std::collections::HashMap;
use std::collections::hash_map::Entry;

use chrono::{DateTime, Duration, Utc};
use log::warn;

use crate::engine::graph::accepted_friend_ids;
use crate::model::{Post, UserId, UserProfile};
use crate::store::DataStore;

/// Size of the trailing feed window.
const FEED_WINDOW_HOURS: i64 = 24;

/// One feed row: a post joined with its author's profile.
#[derive(Debug, Clone, PartialEq)]
pub struct FeedItem {
    pub post: Post,
    pub author: UserProfile,
}

/// Posts by the viewer's accepted friends from the trailing 24-hour window,
/// newest first, each joined with its author's profile.
///
/// Posts with a pending creation timestamp fall outside any window and are
/// dropped; so are posts whose author profile cannot be resolved. An empty
/// friend set returns an empty feed without touching the posts collection.
///
/// Reads are fail-soft: an unreachable store renders as an empty feed with a
/// warning, never as an error.
pub async fn load_feed<S: DataStore>(store: &S, viewer_id: &str, now: DateTime<Utc>) -> Vec<FeedItem> {
    let records = match store.friendships(viewer_id).await {
        Ok(records) => records,
        Err(err) => {
            warn!("feed friendship query failed for {viewer_id}: {err}");
            return Vec::new();
        }
    };
    let friend_ids = accepted_friend_ids(&records, viewer_id);
    if friend_ids.is_empty() {
        return Vec::new();
    }

    let cutoff = now - Duration::hours(FEED_WINDOW_HOURS);
    let posts = match store.posts_by_owners(&friend_ids).await {
        Ok(posts) => posts,
        Err(err) => {
            warn!("feed post query failed for {viewer_id}: {err}");
            return Vec::new();
        }
    };

    let mut items = Vec::new();
    let mut authors: HashMap<UserId, Option<UserProfile>> = HashMap::new();
    for post in posts {
        let Some(created_at) = post.created_at else {
            continue;
        };
        if created_at < cutoff {
            continue;
        }
        let author = match authors.entry(post.owner_id.clone()) {
            Entry::Occupied(entry) => entry.get().clone(),
            Entry::Vacant(entry) => {
                let looked_up = match store.profile(&post.owner_id).await {
                    Ok(profile) => profile,
                    Err(err) => {
                        warn!("feed author lookup failed for {}: {err}", post.owner_id);
                        None
                    }
                };
                entry.insert(looked_up.clone());
                looked_up
            }
        };
        if let Some(author) = author {
            items.push(FeedItem { post, author });
        }
    }

    items.sort_by(|a, b| b.post.created_at.cmp(&a.post.created_at));
    items
}
