//! Leaderboard builder: friends plus self, ranked by total post count.

use std::collections::HashMap;

use crate::model::{UserId, UserProfile};

/// One ranked leaderboard row.
#[derive(Debug, Clone, PartialEq)]
pub struct LeaderboardEntry {
    pub user_id: UserId,
    pub name: String,
    pub avatar_url: Option<String>,
    pub post_count: u64,
    pub is_self: bool,
}

/// Rank `friends` plus exactly one entry for `viewer` by post count,
/// descending. Counts absent from `post_counts` default to 0.
///
/// The sort is stable, so ties keep input order: friends in the order given,
/// the viewer appended after all friends. The composer layer guarantees the
/// viewer is not also present in `friends`.
pub fn build(
    friends: &[UserProfile],
    post_counts: &HashMap<UserId, u64>,
    viewer: &UserProfile,
) -> Vec<LeaderboardEntry> {
    let count_of = |id: &str| post_counts.get(id).copied().unwrap_or(0);

    let mut entries: Vec<LeaderboardEntry> = friends
        .iter()
        .map(|friend| LeaderboardEntry {
            user_id: friend.user_id.clone(),
            name: friend.name.clone(),
            avatar_url: friend.avatar_url.clone(),
            post_count: count_of(&friend.user_id),
            is_self: false,
        })
        .collect();
    entries.push(LeaderboardEntry {
        user_id: viewer.user_id.clone(),
        name: viewer.name.clone(),
        avatar_url: viewer.avatar_url.clone(),
        post_count: count_of(&viewer.user_id),
        is_self: true,
    });

    entries.sort_by(|a, b| b.post_count.cmp(&a.post_count));
    entries
}
