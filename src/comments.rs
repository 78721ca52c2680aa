//! Comment threads on posts.

use chrono::Utc;

use crate::errors::{StoreError, StoreResult};
use crate::model::{Comment, UserProfile};
use crate::store::DataStore;

/// Comments of one post in creation order.
pub async fn comments_for<S: DataStore>(store: &S, post_id: &str) -> StoreResult<Vec<Comment>> {
    store.comments(post_id).await
}

/// Add a comment to a post. The author's name and avatar are denormalized
/// onto the comment, and the post's `comment_count` moves with the append.
pub async fn add_comment<S: DataStore>(
    store: &S,
    post_id: &str,
    author: &UserProfile,
    text: &str,
) -> StoreResult<Comment> {
    let text = text.trim();
    if text.is_empty() {
        return Err(StoreError::invalid("a comment needs text"));
    }
    let comment = Comment::new(author, text, Some(Utc::now()));
    store.append_comment(post_id, comment.clone()).await?;
    Ok(comment)
}
