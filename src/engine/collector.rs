//! Activity collector: groups a post snapshot into per-user counts and
//! creation-date lists.

use std::collections::HashMap;

use chrono::{DateTime, Utc};

use crate::engine::streak::streak_for;
use crate::model::{Post, UserId};

/// Per-user activity derived from one post snapshot. Date lists carry no
/// ordering guarantee; ordering is the streak calculator's concern.
#[derive(Debug, Clone, Default)]
pub struct ActivityRollup {
    pub post_counts: HashMap<UserId, u64>,
    pub post_dates: HashMap<UserId, Vec<DateTime<Utc>>>,
}

impl ActivityRollup {
    pub fn count_for(&self, user_id: &str) -> u64 {
        self.post_counts.get(user_id).copied().unwrap_or(0)
    }

    /// Current streak per user with recorded activity.
    pub fn streaks(&self, now: &DateTime<Utc>) -> HashMap<UserId, u32> {
        self.post_dates
            .iter()
            .map(|(user_id, dates)| (user_id.clone(), streak_for(dates, now)))
            .collect()
    }
}

/// Group `posts` by owner, restricted to `owner_ids`.
///
/// Posts whose creation instant has not committed yet (pending server
/// timestamp) are skipped entirely. An empty `owner_ids` yields an empty
/// rollup; note that call sites must already short-circuit the empty set
/// before querying the store at all.
pub fn collect(owner_ids: &[UserId], posts: &[Post]) -> ActivityRollup {
    let mut rollup = ActivityRollup::default();
    for post in posts {
        if !owner_ids.iter().any(|o| *o == post.owner_id) {
            continue;
        }
        let Some(created_at) = post.created_at else {
            continue;
        };
        *rollup.post_counts.entry(post.owner_id.clone()).or_insert(0) += 1;
        rollup.post_dates.entry(post.owner_id.clone()).or_default().push(created_at);
    }
    rollup
}
