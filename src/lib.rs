//! Platemates core library.
//!
//! The friend-activity engine for a food-photo network: friendship records in
//! a hosted document store are turned into a live friends list (with posting
//! streaks) and a post-count leaderboard, recomputed as friendships and posts
//! change. The surrounding social workflows - feed, friend requests,
//! likes, notifications, direct chats, session tracking - live alongside it.

pub mod chat;
pub mod comments;
pub mod engagement;
pub mod engine;
pub mod errors;
pub mod feed;
pub mod friends;
pub mod id;
pub mod keys;
pub mod model;
pub mod notifications;
pub mod session;
pub mod store;

pub use engine::{Engine, EngineOutput};
pub use engine::leaderboard::LeaderboardEntry;
pub use engine::roster::FriendView;
pub use errors::{StoreError, StoreResult, ValidationError, ValidationIssue};
pub use model::{
    Chat, ChatMessage, Comment, Friendship, FriendshipStatus, LastMessage, Notification, NotificationKind, Post,
    UserId, UserProfile,
};
pub use session::{SessionController, SessionState};
pub use store::{DataStore, MemoryStore, RedisStore, Subscription};

pub use redis;
