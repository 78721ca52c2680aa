//! Direct messaging: one chat per user pair, post sharing as messages.

use chrono::Utc;
use log::warn;

use crate::errors::{StoreError, StoreResult};
use crate::model::{Chat, ChatMessage, Post, UserProfile};
use crate::store::DataStore;

/// One row of the conversation list: a chat joined with the other
/// participant's profile.
#[derive(Debug, Clone, PartialEq)]
pub struct ChatView {
    pub chat: Chat,
    pub other: UserProfile,
}

/// Chats involving `viewer_id`, most recently active first, each joined with
/// the other participant's profile. Chats whose counterpart profile cannot be
/// resolved are dropped.
pub async fn list_chats<S: DataStore>(store: &S, viewer_id: &str) -> StoreResult<Vec<ChatView>> {
    let chats = store.chats(viewer_id).await?;
    let mut views = Vec::with_capacity(chats.len());
    for chat in chats {
        let Some(other_id) = chat.other_participant(viewer_id).map(str::to_string) else {
            continue;
        };
        match store.profile(&other_id).await {
            Ok(Some(other)) => views.push(ChatView { chat, other }),
            Ok(None) => {}
            Err(err) => warn!("chat counterpart lookup failed for {other_id}: {err}"),
        }
    }
    views.sort_by(|a, b| b.chat.updated_at.cmp(&a.chat.updated_at));
    Ok(views)
}

/// The single direct chat between `viewer_id` and `other_id`, created on
/// first use.
pub async fn ensure_direct_chat<S: DataStore>(store: &S, viewer_id: &str, other_id: &str) -> StoreResult<Chat> {
    let chats = store.chats(viewer_id).await?;
    if let Some(existing) = chats.into_iter().find(|c| c.involves(other_id)) {
        return Ok(existing);
    }
    let chat = Chat::direct(viewer_id, other_id, Utc::now())?;
    store.insert_chat(chat.clone()).await?;
    Ok(chat)
}

/// Send a text message into a chat. The chat's `last_message` snapshot and
/// `updated_at` move forward with the append.
pub async fn send_message<S: DataStore>(
    store: &S,
    chat_id: &str,
    sender_id: &str,
    text: &str,
) -> StoreResult<ChatMessage> {
    let text = text.trim();
    if text.is_empty() {
        return Err(StoreError::invalid("a message needs text"));
    }
    let now = Utc::now();
    let message = ChatMessage::new(sender_id, text, Some(now));
    store.append_message(chat_id, message.clone(), now).await?;
    Ok(message)
}

/// Messages of one chat in append order.
pub async fn messages<S: DataStore>(store: &S, chat_id: &str) -> StoreResult<Vec<ChatMessage>> {
    store.messages(chat_id).await
}

/// Share a post with each of `friend_ids` by dropping a link message into the
/// pair's direct chat (created on demand). Returns how many friends received
/// the share.
pub async fn share_post<S: DataStore>(
    store: &S,
    sender: &UserProfile,
    post: &Post,
    friend_ids: &[String],
) -> StoreResult<usize> {
    let text = format!("{} shared a plate: {}", sender.name, post.image_url);
    let mut delivered = 0;
    for friend_id in friend_ids {
        let chat = ensure_direct_chat(store, &sender.user_id, friend_id).await?;
        let now = Utc::now();
        let message = ChatMessage::new(sender.user_id.clone(), text.clone(), Some(now));
        store.append_message(&chat.id, message, now).await?;
        delivered += 1;
    }
    Ok(delivered)
}
