//! Record types for the Platemates collections.
//!
//! These are the tagged, validated shapes of the loosely structured documents
//! the hosted store holds. Decoding happens at the store-adapter boundary;
//! unknown or missing fields resolve to the documented defaults here
//! (`#[serde(default)]`), never deeper in the pipeline.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::errors::{ValidationError, ValidationIssue};
use crate::id::generate_record_id;

/// User ids are opaque strings handed out by the store.
pub type UserId = String;

/// Maximum length of a post description, in characters.
pub const MAX_DESCRIPTION_CHARS: usize = 100;

/// A registered user's profile.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct UserProfile {
    pub user_id: UserId,

    /// Display name.
    pub name: String,

    /// Lowercased copy of `name`, kept for prefix search.
    pub name_search: String,

    #[serde(default)]
    pub avatar_url: Option<String>,

    pub created_at: DateTime<Utc>,
}

impl UserProfile {
    /// Build a new profile. The display name must be non-empty after trimming.
    pub fn new(
        name: impl Into<String>,
        avatar_url: Option<String>,
        created_at: DateTime<Utc>,
    ) -> Result<Self, ValidationError> {
        let name = name.into().trim().to_string();
        if name.is_empty() {
            return Err(ValidationError::single("name", "validation.required", "display name is required"));
        }
        Ok(Self {
            user_id: generate_record_id(),
            name_search: name.to_lowercase(),
            name,
            avatar_url,
            created_at,
        })
    }
}

/// Friendship status. Decline has no terminal state: declining deletes the
/// record, so only pending and accepted ever persist.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FriendshipStatus {
    Pending,
    Accepted,
}

/// A friendship record between exactly two users.
///
/// `participants` is order-insignificant for querying; `requester_id` marks
/// which of the two sent the request. At most one record should exist per
/// unordered pair, but the store does not enforce that atomically - derived
/// state dedupes instead (see the engine's graph module).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Friendship {
    pub id: String,
    pub participants: [UserId; 2],
    pub requester_id: UserId,
    pub status: FriendshipStatus,
    pub created_at: DateTime<Utc>,
}

impl Friendship {
    /// Build a pending request from `requester` to `recipient`.
    pub fn request(
        requester_id: impl Into<UserId>,
        recipient_id: impl Into<UserId>,
        created_at: DateTime<Utc>,
    ) -> Result<Self, ValidationError> {
        let requester_id = requester_id.into();
        let recipient_id = recipient_id.into();
        if requester_id == recipient_id {
            return Err(ValidationError::single(
                "participants",
                "validation.participants",
                "a friendship needs two distinct users",
            ));
        }
        Ok(Self {
            id: generate_record_id(),
            participants: [requester_id.clone(), recipient_id],
            requester_id,
            status: FriendshipStatus::Pending,
            created_at,
        })
    }

    /// Whether `user_id` is one of the two participants.
    pub fn involves(&self, user_id: &str) -> bool {
        self.participants.iter().any(|p| p == user_id)
    }

    /// The participant that is not `user_id`, if `user_id` is involved at all.
    pub fn other_participant(&self, user_id: &str) -> Option<&str> {
        if !self.involves(user_id) {
            return None;
        }
        self.participants.iter().map(String::as_str).find(|p| *p != user_id)
    }
}

/// A food photo post.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Post {
    pub id: String,
    pub owner_id: UserId,

    /// Creation instant. `None` while a pending server timestamp has not
    /// committed; such posts are skipped by the activity collector.
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,

    pub image_url: String,

    /// Caption, at most [`MAX_DESCRIPTION_CHARS`] characters.
    pub description: String,

    /// Like count, kept equal to `liked_by.len()`.
    #[serde(default)]
    pub likes: i64,

    /// Ordered set of user ids that liked this post.
    #[serde(default)]
    pub liked_by: Vec<UserId>,

    /// Comment-thread length, kept in step by the store's comment append.
    #[serde(default)]
    pub comment_count: i64,

    #[serde(default)]
    pub share_count: i64,
}

impl Post {
    /// Build a new post, validating the caption.
    ///
    /// `created_at` is `None` when the caller defers to a server-assigned
    /// timestamp that has not materialized yet.
    pub fn new(
        owner_id: impl Into<UserId>,
        image_url: impl Into<String>,
        description: impl Into<String>,
        created_at: Option<DateTime<Utc>>,
    ) -> Result<Self, ValidationError> {
        let description = description.into().trim().to_string();
        let mut issues = Vec::new();
        if description.is_empty() {
            issues.push(ValidationIssue::new(
                "description",
                "validation.required",
                "a description is required",
            ));
        }
        if description.chars().count() > MAX_DESCRIPTION_CHARS {
            issues.push(ValidationIssue::new(
                "description",
                "validation.length",
                format!("description must be at most {MAX_DESCRIPTION_CHARS} characters"),
            ));
        }
        let image_url = image_url.into();
        if image_url.is_empty() {
            issues.push(ValidationIssue::new("image_url", "validation.required", "an image is required"));
        }
        if !issues.is_empty() {
            return Err(ValidationError::new(issues));
        }
        Ok(Self {
            id: generate_record_id(),
            owner_id: owner_id.into(),
            created_at,
            image_url,
            description,
            likes: 0,
            liked_by: Vec::new(),
            comment_count: 0,
            share_count: 0,
        })
    }

    pub fn liked_by_user(&self, user_id: &str) -> bool {
        self.liked_by.iter().any(|u| u == user_id)
    }
}

/// The kinds of notification the friend workflows produce.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum NotificationKind {
    FriendRequest,
    FriendRequestAccepted,
    FriendRequestDeclined,
}

/// A notification delivered to one user.
///
/// Sender name and avatar are denormalized at creation time so the
/// notification list renders without extra profile lookups.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Notification {
    pub id: String,
    pub user_id: UserId,
    pub kind: NotificationKind,
    pub sender_id: UserId,
    pub sender_name: String,
    #[serde(default)]
    pub sender_avatar: Option<String>,
    #[serde(default)]
    pub read: bool,
    pub created_at: DateTime<Utc>,
}

impl Notification {
    pub fn new(
        recipient_id: impl Into<UserId>,
        kind: NotificationKind,
        sender: &UserProfile,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: generate_record_id(),
            user_id: recipient_id.into(),
            kind,
            sender_id: sender.user_id.clone(),
            sender_name: sender.name.clone(),
            sender_avatar: sender.avatar_url.clone(),
            read: false,
            created_at,
        }
    }
}

/// A comment on a post.
///
/// Author name and avatar are denormalized at creation time, like
/// [`Notification`], so the comment thread renders without profile lookups.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Comment {
    pub id: String,
    pub author_id: UserId,
    pub author_name: String,
    #[serde(default)]
    pub author_avatar: Option<String>,
    pub text: String,
    /// `None` while a pending server timestamp has not committed.
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

impl Comment {
    pub fn new(author: &UserProfile, text: impl Into<String>, created_at: Option<DateTime<Utc>>) -> Self {
        Self {
            id: generate_record_id(),
            author_id: author.user_id.clone(),
            author_name: author.name.clone(),
            author_avatar: author.avatar_url.clone(),
            text: text.into(),
            created_at,
        }
    }
}

/// Snapshot of the newest message in a chat, denormalized onto the chat
/// record so the conversation list renders without loading messages.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LastMessage {
    pub text: String,
    pub sender_id: UserId,
    #[serde(default)]
    pub timestamp: Option<DateTime<Utc>>,
}

/// A direct chat between two users.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Chat {
    pub id: String,
    pub participants: [UserId; 2],
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(default)]
    pub last_message: Option<LastMessage>,
}

impl Chat {
    pub fn direct(
        a: impl Into<UserId>,
        b: impl Into<UserId>,
        created_at: DateTime<Utc>,
    ) -> Result<Self, ValidationError> {
        let a = a.into();
        let b = b.into();
        if a == b {
            return Err(ValidationError::single(
                "participants",
                "validation.participants",
                "a direct chat needs two distinct users",
            ));
        }
        Ok(Self {
            id: generate_record_id(),
            participants: [a, b],
            created_at,
            updated_at: created_at,
            last_message: None,
        })
    }

    pub fn involves(&self, user_id: &str) -> bool {
        self.participants.iter().any(|p| p == user_id)
    }

    pub fn other_participant(&self, user_id: &str) -> Option<&str> {
        if !self.involves(user_id) {
            return None;
        }
        self.participants.iter().map(String::as_str).find(|p| *p != user_id)
    }
}

/// A single message inside a chat.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ChatMessage {
    pub id: String,
    pub sender_id: UserId,
    pub text: String,
    /// `None` while a pending server timestamp has not committed.
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

impl ChatMessage {
    pub fn new(sender_id: impl Into<UserId>, text: impl Into<String>, created_at: Option<DateTime<Utc>>) -> Self {
        Self {
            id: generate_record_id(),
            sender_id: sender_id.into(),
            text: text.into(),
            created_at,
        }
    }
}
