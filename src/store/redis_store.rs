//! Redis-backed store.
//!
//! Records are JSON documents under `{prefix}:social:{collection}:{id}`, with
//! a set of ids per collection and a pub/sub channel per collection carrying
//! change notifications. Live subscriptions re-run their query on every
//! notification and push the fresh snapshot through the watch channel.
//!
//! Requires a Redis with the JSON module loaded.

use chrono::{DateTime, Utc};
use futures::StreamExt;
use log::warn;
use redis::{AsyncCommands, aio::ConnectionManager, cmd};
use serde::{Serialize, de::DeserializeOwned};
use tokio::sync::watch;

use crate::errors::{StoreError, StoreResult};
use crate::keys::KeyContext;
use crate::model::{
    Chat, ChatMessage, Comment, Friendship, FriendshipStatus, LastMessage, Notification, Post, UserId, UserProfile,
};
use crate::store::{DataStore, Subscription};

const SERVICE: &str = "social";

const USERS: &str = "users";
const FRIENDSHIPS: &str = "friendships";
const POSTS: &str = "posts";
const NOTIFICATIONS: &str = "notifications";
const CHATS: &str = "chats";

/// Redis-backed [`DataStore`].
#[derive(Clone)]
pub struct RedisStore {
    client: redis::Client,
    conn: ConnectionManager,
    prefix: String,
}

impl RedisStore {
    /// Connect to a Redis instance. The prefix namespaces every key so
    /// multiple deployments can share one instance.
    pub async fn connect(url: &str, prefix: impl Into<String>) -> StoreResult<Self> {
        let client = redis::Client::open(url).map_err(StoreError::from)?;
        let conn = ConnectionManager::new(client.clone()).await?;
        Ok(Self {
            client,
            conn,
            prefix: prefix.into(),
        })
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    fn keys(&self) -> KeyContext<'_> {
        KeyContext::new(&self.prefix, SERVICE)
    }

    async fn read_doc<T: DeserializeOwned>(&self, collection: &str, id: &str) -> StoreResult<Option<T>> {
        let key = self.keys().entity(collection, id);
        let mut conn = self.conn.clone();
        let raw: Option<String> = cmd("JSON.GET").arg(&key).query_async(&mut conn).await?;
        match raw {
            Some(raw) => Ok(Some(serde_json::from_str(&raw)?)),
            None => Ok(None),
        }
    }

    async fn write_doc<T: Serialize>(&self, collection: &str, id: &str, doc: &T) -> StoreResult<()> {
        let ctx = self.keys();
        let payload = serde_json::to_string(doc)?;
        let mut conn = self.conn.clone();
        let _: () = cmd("JSON.SET")
            .arg(ctx.entity(collection, id))
            .arg("$")
            .arg(payload)
            .query_async(&mut conn)
            .await?;
        let _: i64 = conn.sadd(ctx.index(collection), id).await?;
        self.publish(collection, id).await
    }

    async fn delete_doc(&self, collection: &str, id: &str) -> StoreResult<()> {
        let ctx = self.keys();
        let mut conn = self.conn.clone();
        let _: i64 = conn.del(ctx.entity(collection, id)).await?;
        let _: i64 = conn.srem(ctx.index(collection), id).await?;
        self.publish(collection, id).await
    }

    async fn publish(&self, collection: &str, id: &str) -> StoreResult<()> {
        let channel = self.keys().channel(collection);
        let mut conn = self.conn.clone();
        let _: i64 = conn.publish(channel, id).await?;
        Ok(())
    }

    async fn load_collection<T: DeserializeOwned>(&self, collection: &str) -> StoreResult<Vec<T>> {
        let mut conn = self.conn.clone();
        load_collection(&mut conn, &self.prefix, collection).await
    }
}

/// Load and decode every document of a collection. Malformed documents are
/// logged and skipped rather than failing the whole read.
async fn load_collection<T: DeserializeOwned>(
    conn: &mut ConnectionManager,
    prefix: &str,
    collection: &str,
) -> StoreResult<Vec<T>> {
    let ctx = KeyContext::new(prefix, SERVICE);
    let ids: Vec<String> = conn.smembers(ctx.index(collection)).await?;
    let mut docs = Vec::with_capacity(ids.len());
    for id in ids {
        let raw: Option<String> = cmd("JSON.GET")
            .arg(ctx.entity(collection, &id))
            .query_async(conn)
            .await?;
        let Some(raw) = raw else { continue };
        match serde_json::from_str::<T>(&raw) {
            Ok(doc) => docs.push(doc),
            Err(err) => warn!("skipping malformed {collection} document {id}: {err}"),
        }
    }
    Ok(docs)
}

fn sort_friendships(mut records: Vec<Friendship>) -> Vec<Friendship> {
    records.sort_by(|a, b| (a.created_at, &a.id).cmp(&(b.created_at, &b.id)));
    records
}

fn sort_posts(mut records: Vec<Post>) -> Vec<Post> {
    records.sort_by(|a, b| (a.created_at, &a.id).cmp(&(b.created_at, &b.id)));
    records
}

impl DataStore for RedisStore {
    async fn watch_friendships(&self, participant_id: &str) -> StoreResult<Subscription<Vec<Friendship>>> {
        let initial = self.friendships(participant_id).await?;
        let (tx, rx) = watch::channel(initial);

        let client = self.client.clone();
        let mut conn = self.conn.clone();
        let prefix = self.prefix.clone();
        let participant = participant_id.to_string();
        let channel = self.keys().channel(FRIENDSHIPS);

        let feeder = tokio::spawn(async move {
            let mut pubsub = match client.get_async_pubsub().await {
                Ok(p) => p,
                Err(err) => {
                    warn!("friendship watch could not open pub/sub: {err}");
                    return;
                }
            };
            if let Err(err) = pubsub.subscribe(&channel).await {
                warn!("friendship watch could not subscribe: {err}");
                return;
            }
            let mut messages = pubsub.on_message();
            while messages.next().await.is_some() {
                let snapshot = match load_collection::<Friendship>(&mut conn, &prefix, FRIENDSHIPS).await {
                    Ok(all) => sort_friendships(all.into_iter().filter(|f| f.involves(&participant)).collect()),
                    Err(err) => {
                        warn!("friendship refresh failed, keeping previous snapshot: {err}");
                        continue;
                    }
                };
                if tx.send(snapshot).is_err() {
                    break;
                }
            }
        });

        Ok(Subscription::with_feeder(rx, feeder))
    }

    async fn watch_posts_by_owners(&self, owner_ids: &[UserId]) -> StoreResult<Subscription<Vec<Post>>> {
        if owner_ids.is_empty() {
            return Err(StoreError::invalid("watch_posts_by_owners called with an empty owner list"));
        }
        let initial = self.posts_by_owners(owner_ids).await?;
        let (tx, rx) = watch::channel(initial);

        let client = self.client.clone();
        let mut conn = self.conn.clone();
        let prefix = self.prefix.clone();
        let owners = owner_ids.to_vec();
        let channel = self.keys().channel(POSTS);

        let feeder = tokio::spawn(async move {
            let mut pubsub = match client.get_async_pubsub().await {
                Ok(p) => p,
                Err(err) => {
                    warn!("post watch could not open pub/sub: {err}");
                    return;
                }
            };
            if let Err(err) = pubsub.subscribe(&channel).await {
                warn!("post watch could not subscribe: {err}");
                return;
            }
            let mut messages = pubsub.on_message();
            while messages.next().await.is_some() {
                let snapshot = match load_collection::<Post>(&mut conn, &prefix, POSTS).await {
                    Ok(all) => sort_posts(
                        all.into_iter()
                            .filter(|p| owners.iter().any(|o| *o == p.owner_id))
                            .collect(),
                    ),
                    Err(err) => {
                        warn!("post refresh failed, keeping previous snapshot: {err}");
                        continue;
                    }
                };
                if tx.send(snapshot).is_err() {
                    break;
                }
            }
        });

        Ok(Subscription::with_feeder(rx, feeder))
    }

    async fn profile(&self, user_id: &str) -> StoreResult<Option<UserProfile>> {
        self.read_doc(USERS, user_id).await
    }

    async fn search_profiles(&self, name_prefix: &str) -> StoreResult<Vec<UserProfile>> {
        let needle = name_prefix.to_lowercase();
        let mut matches: Vec<UserProfile> = self
            .load_collection::<UserProfile>(USERS)
            .await?
            .into_iter()
            .filter(|p| p.name_search.starts_with(&needle))
            .collect();
        matches.sort_by(|a, b| a.name_search.cmp(&b.name_search));
        Ok(matches)
    }

    async fn friendships(&self, participant_id: &str) -> StoreResult<Vec<Friendship>> {
        let all = self.load_collection::<Friendship>(FRIENDSHIPS).await?;
        Ok(sort_friendships(
            all.into_iter().filter(|f| f.involves(participant_id)).collect(),
        ))
    }

    async fn post(&self, post_id: &str) -> StoreResult<Option<Post>> {
        self.read_doc(POSTS, post_id).await
    }

    async fn posts_by_owners(&self, owner_ids: &[UserId]) -> StoreResult<Vec<Post>> {
        if owner_ids.is_empty() {
            return Err(StoreError::invalid("posts_by_owners called with an empty owner list"));
        }
        let all = self.load_collection::<Post>(POSTS).await?;
        Ok(sort_posts(
            all.into_iter()
                .filter(|p| owner_ids.iter().any(|o| *o == p.owner_id))
                .collect(),
        ))
    }

    async fn unread_notifications(&self, user_id: &str) -> StoreResult<Vec<Notification>> {
        let all = self.load_collection::<Notification>(NOTIFICATIONS).await?;
        Ok(all.into_iter().filter(|n| n.user_id == user_id && !n.read).collect())
    }

    async fn chats(&self, participant_id: &str) -> StoreResult<Vec<Chat>> {
        let all = self.load_collection::<Chat>(CHATS).await?;
        Ok(all.into_iter().filter(|c| c.involves(participant_id)).collect())
    }

    async fn messages(&self, chat_id: &str) -> StoreResult<Vec<ChatMessage>> {
        let key = self.keys().messages(chat_id);
        let mut conn = self.conn.clone();
        let raw: Vec<String> = conn.lrange(key, 0, -1).await?;
        let mut out = Vec::with_capacity(raw.len());
        for entry in raw {
            match serde_json::from_str::<ChatMessage>(&entry) {
                Ok(msg) => out.push(msg),
                Err(err) => warn!("skipping malformed chat message in {chat_id}: {err}"),
            }
        }
        Ok(out)
    }

    async fn comments(&self, post_id: &str) -> StoreResult<Vec<Comment>> {
        let key = self.keys().comments(post_id);
        let mut conn = self.conn.clone();
        let raw: Vec<String> = conn.lrange(key, 0, -1).await?;
        let mut out = Vec::with_capacity(raw.len());
        for entry in raw {
            match serde_json::from_str::<Comment>(&entry) {
                Ok(comment) => out.push(comment),
                Err(err) => warn!("skipping malformed comment on {post_id}: {err}"),
            }
        }
        Ok(out)
    }

    async fn put_profile(&self, profile: UserProfile) -> StoreResult<()> {
        let id = profile.user_id.clone();
        self.write_doc(USERS, &id, &profile).await
    }

    async fn insert_friendship(&self, friendship: Friendship) -> StoreResult<()> {
        let id = friendship.id.clone();
        self.write_doc(FRIENDSHIPS, &id, &friendship).await
    }

    async fn set_friendship_status(&self, friendship_id: &str, status: FriendshipStatus) -> StoreResult<()> {
        let mut friendship: Friendship =
            self.read_doc(FRIENDSHIPS, friendship_id)
                .await?
                .ok_or_else(|| StoreError::NotFound {
                    entity_id: Some(friendship_id.to_string()),
                })?;
        friendship.status = status;
        self.write_doc(FRIENDSHIPS, friendship_id, &friendship).await
    }

    async fn delete_friendship(&self, friendship_id: &str) -> StoreResult<()> {
        self.delete_doc(FRIENDSHIPS, friendship_id).await
    }

    async fn insert_post(&self, post: Post) -> StoreResult<()> {
        let id = post.id.clone();
        self.write_doc(POSTS, &id, &post).await
    }

    async fn set_like_state(&self, post_id: &str, user_id: &str, liked: bool) -> StoreResult<()> {
        let mut post: Post = self.read_doc(POSTS, post_id).await?.ok_or_else(|| StoreError::NotFound {
            entity_id: Some(post_id.to_string()),
        })?;
        if liked {
            if !post.liked_by_user(user_id) {
                post.liked_by.push(user_id.to_string());
            }
        } else {
            post.liked_by.retain(|u| u != user_id);
        }
        post.likes = post.liked_by.len() as i64;
        self.write_doc(POSTS, post_id, &post).await
    }

    async fn append_comment(&self, post_id: &str, comment: Comment) -> StoreResult<()> {
        let mut post: Post = self.read_doc(POSTS, post_id).await?.ok_or_else(|| StoreError::NotFound {
            entity_id: Some(post_id.to_string()),
        })?;

        let key = self.keys().comments(post_id);
        let payload = serde_json::to_string(&comment)?;
        let mut conn = self.conn.clone();
        // RPUSH returns the list length, which is the authoritative count.
        let count: i64 = conn.rpush(key, payload).await?;

        post.comment_count = count;
        self.write_doc(POSTS, post_id, &post).await
    }

    async fn insert_notification(&self, notification: Notification) -> StoreResult<()> {
        let id = notification.id.clone();
        self.write_doc(NOTIFICATIONS, &id, &notification).await
    }

    async fn mark_notification_read(&self, notification_id: &str) -> StoreResult<()> {
        let mut notification: Notification =
            self.read_doc(NOTIFICATIONS, notification_id)
                .await?
                .ok_or_else(|| StoreError::NotFound {
                    entity_id: Some(notification_id.to_string()),
                })?;
        notification.read = true;
        self.write_doc(NOTIFICATIONS, notification_id, &notification).await
    }

    async fn insert_chat(&self, chat: Chat) -> StoreResult<()> {
        let id = chat.id.clone();
        self.write_doc(CHATS, &id, &chat).await
    }

    async fn append_message(&self, chat_id: &str, message: ChatMessage, updated_at: DateTime<Utc>) -> StoreResult<()> {
        let mut chat: Chat = self.read_doc(CHATS, chat_id).await?.ok_or_else(|| StoreError::NotFound {
            entity_id: Some(chat_id.to_string()),
        })?;
        chat.last_message = Some(LastMessage {
            text: message.text.clone(),
            sender_id: message.sender_id.clone(),
            timestamp: message.created_at,
        });
        chat.updated_at = updated_at;

        let key = self.keys().messages(chat_id);
        let payload = serde_json::to_string(&message)?;
        let mut conn = self.conn.clone();
        let _: i64 = conn.rpush(key, payload).await?;

        self.write_doc(CHATS, chat_id, &chat).await
    }
}
