//! Friend list composer: joins friend profiles with computed streaks.

use std::collections::HashMap;

use crate::model::{UserId, UserProfile};

/// One row of the friends list.
#[derive(Debug, Clone, PartialEq)]
pub struct FriendView {
    pub user_id: UserId,
    pub name: String,
    pub avatar_url: Option<String>,
    pub streak: u32,
}

/// One entry per id in `friend_ids` that has a resolvable profile; ids
/// without a profile are silently dropped (soft-fail, not an error). Streaks
/// default to 0. Sorted by streak descending, stable over input order.
pub fn compose(
    friend_ids: &[UserId],
    profiles: &HashMap<UserId, UserProfile>,
    streaks: &HashMap<UserId, u32>,
) -> Vec<FriendView> {
    let mut views: Vec<FriendView> = friend_ids
        .iter()
        .filter_map(|id| profiles.get(id))
        .map(|profile| FriendView {
            user_id: profile.user_id.clone(),
            name: profile.name.clone(),
            avatar_url: profile.avatar_url.clone(),
            streak: streaks.get(&profile.user_id).copied().unwrap_or(0),
        })
        .collect();
    views.sort_by(|a, b| b.streak.cmp(&a.streak));
    views
}
