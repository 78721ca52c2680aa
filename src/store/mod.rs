//! Store adapters.
//!
//! The hosted document store is an external collaborator; this module defines
//! the read/write surface the rest of the crate consumes, plus the two
//! backends: an in-process [`MemoryStore`] and a Redis-backed [`RedisStore`].
//!
//! Live reads are [`Subscription`]s over `tokio::sync::watch` channels: every
//! change event delivers the full current result set, publication overwrites
//! the previous value (last-write-wins), and dropping the subscription tears
//! down its feeder. That matches the push-snapshot model the engine is
//! specified against.

mod memory;
mod redis_store;

pub use memory::MemoryStore;
pub use redis_store::RedisStore;

use std::future::Future;

use chrono::{DateTime, Utc};
use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::errors::StoreResult;
use crate::model::{Chat, ChatMessage, Comment, Friendship, FriendshipStatus, Notification, Post, UserId, UserProfile};

/// A live query result.
///
/// Holds the current snapshot and signals on change. Dropping the
/// subscription releases the backend listener: any feeder task is aborted and
/// watcher registrations are garbage-collected by the store on its next write.
pub struct Subscription<T> {
    receiver: watch::Receiver<T>,
    feeder: Option<JoinHandle<()>>,
}

impl<T: Clone> Subscription<T> {
    /// Wrap a bare watch receiver (backends that push directly into the
    /// channel and need no feeder task).
    pub fn from_receiver(receiver: watch::Receiver<T>) -> Self {
        Self { receiver, feeder: None }
    }

    /// Wrap a receiver fed by a background task; the task is aborted when the
    /// subscription is dropped.
    pub fn with_feeder(receiver: watch::Receiver<T>, feeder: JoinHandle<()>) -> Self {
        Self {
            receiver,
            feeder: Some(feeder),
        }
    }

    /// The latest snapshot, marking it seen.
    pub fn current(&mut self) -> T {
        self.receiver.borrow_and_update().clone()
    }

    /// Wait for the next change. Returns `false` once the backend side is
    /// gone and no further snapshots will arrive.
    pub async fn changed(&mut self) -> bool {
        self.receiver.changed().await.is_ok()
    }
}

impl<T> Drop for Subscription<T> {
    fn drop(&mut self) {
        if let Some(feeder) = self.feeder.take() {
            feeder.abort();
        }
    }
}

/// Read/write surface of the document store.
///
/// Futures are `Send` so the live coordinator can drive them from spawned
/// tasks. Implementations are cheap to clone (shared handles underneath).
///
/// Callers must never invoke [`DataStore::watch_posts_by_owners`] or
/// [`DataStore::posts_by_owners`] with an empty owner list; an "IN empty
/// list" query is undefined at the backend. Every call site short-circuits
/// the empty set instead.
pub trait DataStore: Clone + Send + Sync + 'static {
    /// Live stream of all friendship records involving `participant_id`,
    /// pending and accepted alike.
    fn watch_friendships(
        &self,
        participant_id: &str,
    ) -> impl Future<Output = StoreResult<Subscription<Vec<Friendship>>>> + Send;

    /// Live stream of all posts owned by any of `owner_ids` (non-empty).
    fn watch_posts_by_owners(
        &self,
        owner_ids: &[UserId],
    ) -> impl Future<Output = StoreResult<Subscription<Vec<Post>>>> + Send;

    /// Point read of one profile.
    fn profile(&self, user_id: &str) -> impl Future<Output = StoreResult<Option<UserProfile>>> + Send;

    /// Profiles whose lowercase search key starts with `name_prefix`.
    fn search_profiles(&self, name_prefix: &str) -> impl Future<Output = StoreResult<Vec<UserProfile>>> + Send;

    /// All friendship records involving `participant_id`.
    fn friendships(&self, participant_id: &str) -> impl Future<Output = StoreResult<Vec<Friendship>>> + Send;

    /// Point read of one post.
    fn post(&self, post_id: &str) -> impl Future<Output = StoreResult<Option<Post>>> + Send;

    /// All posts owned by any of `owner_ids` (non-empty).
    fn posts_by_owners(&self, owner_ids: &[UserId]) -> impl Future<Output = StoreResult<Vec<Post>>> + Send;

    /// Unread notifications for a user, unordered.
    fn unread_notifications(&self, user_id: &str) -> impl Future<Output = StoreResult<Vec<Notification>>> + Send;

    /// Chats involving a user, unordered.
    fn chats(&self, participant_id: &str) -> impl Future<Output = StoreResult<Vec<Chat>>> + Send;

    /// Messages of one chat, in append order.
    fn messages(&self, chat_id: &str) -> impl Future<Output = StoreResult<Vec<ChatMessage>>> + Send;

    /// Comments of one post, in append order.
    fn comments(&self, post_id: &str) -> impl Future<Output = StoreResult<Vec<Comment>>> + Send;

    /// Create or replace a profile.
    fn put_profile(&self, profile: UserProfile) -> impl Future<Output = StoreResult<()>> + Send;

    fn insert_friendship(&self, friendship: Friendship) -> impl Future<Output = StoreResult<()>> + Send;

    fn set_friendship_status(
        &self,
        friendship_id: &str,
        status: FriendshipStatus,
    ) -> impl Future<Output = StoreResult<()>> + Send;

    fn delete_friendship(&self, friendship_id: &str) -> impl Future<Output = StoreResult<()>> + Send;

    fn insert_post(&self, post: Post) -> impl Future<Output = StoreResult<()>> + Send;

    /// Idempotent like-membership update: `liked` adds `user_id` to the
    /// post's `liked_by` set, `!liked` removes it, and `likes` is re-derived
    /// from the set's size either way.
    fn set_like_state(
        &self,
        post_id: &str,
        user_id: &str,
        liked: bool,
    ) -> impl Future<Output = StoreResult<()>> + Send;

    fn insert_notification(&self, notification: Notification) -> impl Future<Output = StoreResult<()>> + Send;

    fn mark_notification_read(&self, notification_id: &str) -> impl Future<Output = StoreResult<()>> + Send;

    fn insert_chat(&self, chat: Chat) -> impl Future<Output = StoreResult<()>> + Send;

    /// Append a comment to a post and bring the post's `comment_count` in
    /// step with the comment list in the same operation.
    fn append_comment(&self, post_id: &str, comment: Comment) -> impl Future<Output = StoreResult<()>> + Send;

    /// Append a message to a chat and refresh the chat's `last_message` and
    /// `updated_at` in the same operation.
    fn append_message(
        &self,
        chat_id: &str,
        message: ChatMessage,
        updated_at: DateTime<Utc>,
    ) -> impl Future<Output = StoreResult<()>> + Send;
}
