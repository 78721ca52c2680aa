//! In-process store backend.
//!
//! Fully live: every mutation recomputes the snapshots of the registered
//! watchers and pushes them through their watch channels. Used by the test
//! suites and usable as an embedded backend for single-process deployments.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use chrono::{DateTime, Utc};
use tokio::sync::watch;

use crate::errors::{StoreError, StoreResult};
use crate::model::{Chat, ChatMessage, Comment, Friendship, FriendshipStatus, Notification, Post, UserId, UserProfile};
use crate::store::{DataStore, Subscription};

struct FriendshipWatcher {
    participant_id: String,
    tx: watch::Sender<Vec<Friendship>>,
}

struct PostWatcher {
    owner_ids: Vec<UserId>,
    tx: watch::Sender<Vec<Post>>,
}

#[derive(Default)]
struct Inner {
    profiles: HashMap<String, UserProfile>,
    friendships: HashMap<String, Friendship>,
    posts: HashMap<String, Post>,
    notifications: HashMap<String, Notification>,
    chats: HashMap<String, Chat>,
    messages: HashMap<String, Vec<ChatMessage>>,
    comments: HashMap<String, Vec<Comment>>,
    friendship_watchers: Vec<FriendshipWatcher>,
    post_watchers: Vec<PostWatcher>,
}

/// In-memory [`DataStore`] with live subscriptions.
#[derive(Clone, Default)]
pub struct MemoryStore {
    inner: Arc<Mutex<Inner>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Number of live (friendship, post) watchers. Closed watchers are pruned
    /// first, so this reflects what a subsequent write would actually notify.
    pub fn active_watchers(&self) -> (usize, usize) {
        let mut inner = self.lock();
        inner.friendship_watchers.retain(|w| !w.tx.is_closed());
        inner.post_watchers.retain(|w| !w.tx.is_closed());
        (inner.friendship_watchers.len(), inner.post_watchers.len())
    }
}

fn friendships_for(friendships: &HashMap<String, Friendship>, participant_id: &str) -> Vec<Friendship> {
    let mut records: Vec<Friendship> = friendships
        .values()
        .filter(|f| f.involves(participant_id))
        .cloned()
        .collect();
    records.sort_by(|a, b| (a.created_at, &a.id).cmp(&(b.created_at, &b.id)));
    records
}

fn posts_for(posts: &HashMap<String, Post>, owner_ids: &[UserId]) -> Vec<Post> {
    let mut records: Vec<Post> = posts
        .values()
        .filter(|p| owner_ids.iter().any(|o| *o == p.owner_id))
        .cloned()
        .collect();
    records.sort_by(|a, b| (a.created_at, &a.id).cmp(&(b.created_at, &b.id)));
    records
}

fn notify_friendship_watchers(inner: &mut Inner) {
    let Inner {
        friendships,
        friendship_watchers,
        ..
    } = inner;
    friendship_watchers.retain(|w| {
        if w.tx.is_closed() {
            return false;
        }
        w.tx.send(friendships_for(friendships, &w.participant_id)).is_ok()
    });
}

fn notify_post_watchers(inner: &mut Inner) {
    let Inner { posts, post_watchers, .. } = inner;
    post_watchers.retain(|w| {
        if w.tx.is_closed() {
            return false;
        }
        w.tx.send(posts_for(posts, &w.owner_ids)).is_ok()
    });
}

impl DataStore for MemoryStore {
    async fn watch_friendships(&self, participant_id: &str) -> StoreResult<Subscription<Vec<Friendship>>> {
        let mut inner = self.lock();
        let snapshot = friendships_for(&inner.friendships, participant_id);
        let (tx, rx) = watch::channel(snapshot);
        inner.friendship_watchers.push(FriendshipWatcher {
            participant_id: participant_id.to_string(),
            tx,
        });
        Ok(Subscription::from_receiver(rx))
    }

    async fn watch_posts_by_owners(&self, owner_ids: &[UserId]) -> StoreResult<Subscription<Vec<Post>>> {
        if owner_ids.is_empty() {
            return Err(StoreError::invalid("watch_posts_by_owners called with an empty owner list"));
        }
        let mut inner = self.lock();
        let snapshot = posts_for(&inner.posts, owner_ids);
        let (tx, rx) = watch::channel(snapshot);
        inner.post_watchers.push(PostWatcher {
            owner_ids: owner_ids.to_vec(),
            tx,
        });
        Ok(Subscription::from_receiver(rx))
    }

    async fn profile(&self, user_id: &str) -> StoreResult<Option<UserProfile>> {
        Ok(self.lock().profiles.get(user_id).cloned())
    }

    async fn search_profiles(&self, name_prefix: &str) -> StoreResult<Vec<UserProfile>> {
        let needle = name_prefix.to_lowercase();
        let mut matches: Vec<UserProfile> = self
            .lock()
            .profiles
            .values()
            .filter(|p| p.name_search.starts_with(&needle))
            .cloned()
            .collect();
        matches.sort_by(|a, b| a.name_search.cmp(&b.name_search));
        Ok(matches)
    }

    async fn friendships(&self, participant_id: &str) -> StoreResult<Vec<Friendship>> {
        Ok(friendships_for(&self.lock().friendships, participant_id))
    }

    async fn post(&self, post_id: &str) -> StoreResult<Option<Post>> {
        Ok(self.lock().posts.get(post_id).cloned())
    }

    async fn posts_by_owners(&self, owner_ids: &[UserId]) -> StoreResult<Vec<Post>> {
        if owner_ids.is_empty() {
            return Err(StoreError::invalid("posts_by_owners called with an empty owner list"));
        }
        Ok(posts_for(&self.lock().posts, owner_ids))
    }

    async fn unread_notifications(&self, user_id: &str) -> StoreResult<Vec<Notification>> {
        Ok(self
            .lock()
            .notifications
            .values()
            .filter(|n| n.user_id == user_id && !n.read)
            .cloned()
            .collect())
    }

    async fn chats(&self, participant_id: &str) -> StoreResult<Vec<Chat>> {
        Ok(self
            .lock()
            .chats
            .values()
            .filter(|c| c.involves(participant_id))
            .cloned()
            .collect())
    }

    async fn messages(&self, chat_id: &str) -> StoreResult<Vec<ChatMessage>> {
        Ok(self.lock().messages.get(chat_id).cloned().unwrap_or_default())
    }

    async fn comments(&self, post_id: &str) -> StoreResult<Vec<Comment>> {
        Ok(self.lock().comments.get(post_id).cloned().unwrap_or_default())
    }

    async fn put_profile(&self, profile: UserProfile) -> StoreResult<()> {
        self.lock().profiles.insert(profile.user_id.clone(), profile);
        Ok(())
    }

    async fn insert_friendship(&self, friendship: Friendship) -> StoreResult<()> {
        let mut inner = self.lock();
        inner.friendships.insert(friendship.id.clone(), friendship);
        notify_friendship_watchers(&mut inner);
        Ok(())
    }

    async fn set_friendship_status(&self, friendship_id: &str, status: FriendshipStatus) -> StoreResult<()> {
        let mut inner = self.lock();
        match inner.friendships.get_mut(friendship_id) {
            Some(f) => f.status = status,
            None => {
                return Err(StoreError::NotFound {
                    entity_id: Some(friendship_id.to_string()),
                });
            }
        }
        notify_friendship_watchers(&mut inner);
        Ok(())
    }

    async fn delete_friendship(&self, friendship_id: &str) -> StoreResult<()> {
        let mut inner = self.lock();
        if inner.friendships.remove(friendship_id).is_some() {
            notify_friendship_watchers(&mut inner);
        }
        Ok(())
    }

    async fn insert_post(&self, post: Post) -> StoreResult<()> {
        let mut inner = self.lock();
        inner.posts.insert(post.id.clone(), post);
        notify_post_watchers(&mut inner);
        Ok(())
    }

    async fn set_like_state(&self, post_id: &str, user_id: &str, liked: bool) -> StoreResult<()> {
        let mut inner = self.lock();
        match inner.posts.get_mut(post_id) {
            Some(post) => {
                if liked {
                    if !post.liked_by_user(user_id) {
                        post.liked_by.push(user_id.to_string());
                    }
                } else {
                    post.liked_by.retain(|u| u != user_id);
                }
                post.likes = post.liked_by.len() as i64;
            }
            None => {
                return Err(StoreError::NotFound {
                    entity_id: Some(post_id.to_string()),
                });
            }
        }
        notify_post_watchers(&mut inner);
        Ok(())
    }

    async fn append_comment(&self, post_id: &str, comment: Comment) -> StoreResult<()> {
        let mut inner = self.lock();
        if !inner.posts.contains_key(post_id) {
            return Err(StoreError::NotFound {
                entity_id: Some(post_id.to_string()),
            });
        }
        let thread = inner.comments.entry(post_id.to_string()).or_default();
        thread.push(comment);
        let count = thread.len() as i64;
        if let Some(post) = inner.posts.get_mut(post_id) {
            post.comment_count = count;
        }
        notify_post_watchers(&mut inner);
        Ok(())
    }

    async fn insert_notification(&self, notification: Notification) -> StoreResult<()> {
        self.lock().notifications.insert(notification.id.clone(), notification);
        Ok(())
    }

    async fn mark_notification_read(&self, notification_id: &str) -> StoreResult<()> {
        match self.lock().notifications.get_mut(notification_id) {
            Some(n) => {
                n.read = true;
                Ok(())
            }
            None => Err(StoreError::NotFound {
                entity_id: Some(notification_id.to_string()),
            }),
        }
    }

    async fn insert_chat(&self, chat: Chat) -> StoreResult<()> {
        self.lock().chats.insert(chat.id.clone(), chat);
        Ok(())
    }

    async fn append_message(&self, chat_id: &str, message: ChatMessage, updated_at: DateTime<Utc>) -> StoreResult<()> {
        let mut inner = self.lock();
        let last = crate::model::LastMessage {
            text: message.text.clone(),
            sender_id: message.sender_id.clone(),
            timestamp: message.created_at,
        };
        match inner.chats.get_mut(chat_id) {
            Some(chat) => {
                chat.last_message = Some(last);
                chat.updated_at = updated_at;
            }
            None => {
                return Err(StoreError::NotFound {
                    entity_id: Some(chat_id.to_string()),
                });
            }
        }
        inner.messages.entry(chat_id.to_string()).or_default().push(message);
        Ok(())
    }
}
