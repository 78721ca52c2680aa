//! Notification inbox.

use crate::errors::StoreResult;
use crate::model::Notification;
use crate::store::DataStore;

/// Unread notifications for `user_id`, newest first.
pub async fn unread<S: DataStore>(store: &S, user_id: &str) -> StoreResult<Vec<Notification>> {
    let mut items = store.unread_notifications(user_id).await?;
    items.sort_by(|a, b| b.created_at.cmp(&a.created_at));
    Ok(items)
}

/// Mark one notification as read.
pub async fn mark_read<S: DataStore>(store: &S, notification_id: &str) -> StoreResult<()> {
    store.mark_notification_read(notification_id).await
}
