//! Relationship adapter: derives the accepted-friend id set for a viewer
//! from raw friendship records.

use std::collections::HashSet;

use crate::model::{Friendship, FriendshipStatus, UserId};

/// Other-participant ids across all records involving `self_id` with status
/// accepted, in record order, deduplicated.
///
/// Duplicate accepted records for the same pair can exist (concurrent
/// request sends are not merged by the store); set semantics here keep each
/// friend id contributing once regardless.
pub fn accepted_friend_ids(records: &[Friendship], self_id: &str) -> Vec<UserId> {
    let mut seen = HashSet::new();
    let mut ids = Vec::new();
    for record in records {
        if record.status != FriendshipStatus::Accepted {
            continue;
        }
        let Some(other) = record.other_participant(self_id) else {
            continue;
        };
        if seen.insert(other.to_string()) {
            ids.push(other.to_string());
        }
    }
    ids
}
