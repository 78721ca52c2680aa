//! Post creation and likes.

use chrono::Utc;

use crate::errors::{StoreError, StoreResult};
use crate::model::Post;
use crate::store::DataStore;

/// Create a post owned by `owner_id`. Caption and image are validated by
/// [`Post::new`]; the creation instant is assigned here rather than deferred.
pub async fn create_post<S: DataStore>(
    store: &S,
    owner_id: &str,
    image_url: &str,
    description: &str,
) -> StoreResult<Post> {
    let post = Post::new(owner_id, image_url, description, Some(Utc::now()))?;
    store.insert_post(post.clone()).await?;
    Ok(post)
}

/// Toggle `user_id`'s like on a post and return the new liked state.
///
/// The membership write is idempotent and the count is derived from the
/// `liked_by` set, so replayed toggles cannot drift the counter.
pub async fn toggle_like<S: DataStore>(store: &S, post_id: &str, user_id: &str) -> StoreResult<bool> {
    let post = store.post(post_id).await?.ok_or_else(|| StoreError::NotFound {
        entity_id: Some(post_id.to_string()),
    })?;
    let liked = !post.liked_by_user(user_id);
    store.set_like_state(post_id, user_id, liked).await?;
    Ok(liked)
}
