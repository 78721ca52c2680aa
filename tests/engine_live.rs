//! Live coordinator tests: output recomputation across friendship and post
//! changes, and subscription lifecycle on stop.

use std::time::Duration;

use chrono::Utc;
use platemates::model::{FriendshipStatus, Post, UserProfile};
use platemates::store::{DataStore, MemoryStore};
use platemates::{Engine, EngineOutput};
use tokio::sync::watch;
use tokio::time::timeout;

async fn seeded_user(store: &MemoryStore, name: &str) -> UserProfile {
    let _ = env_logger::builder().is_test(true).try_init();
    let mut profile = UserProfile::new(name, None, Utc::now()).unwrap();
    profile.user_id = name.to_lowercase();
    store.put_profile(profile.clone()).await.unwrap();
    profile
}

async fn accepted_pair(store: &MemoryStore, a: &UserProfile, b: &UserProfile) {
    let request = platemates::Friendship::request(a.user_id.clone(), b.user_id.clone(), Utc::now()).unwrap();
    let id = request.id.clone();
    store.insert_friendship(request).await.unwrap();
    store.set_friendship_status(&id, FriendshipStatus::Accepted).await.unwrap();
}

/// Wait for the next published output.
async fn next_output(rx: &mut watch::Receiver<EngineOutput>) -> EngineOutput {
    timeout(Duration::from_secs(2), rx.changed())
        .await
        .expect("engine publication timed out")
        .expect("engine output channel closed");
    rx.borrow_and_update().clone()
}

/// Wait until a published output satisfies `pred`, skipping intermediate
/// snapshots from overlapping recomputations.
async fn output_matching(
    rx: &mut watch::Receiver<EngineOutput>,
    pred: impl Fn(&EngineOutput) -> bool,
) -> EngineOutput {
    let current = rx.borrow_and_update().clone();
    if pred(&current) {
        return current;
    }
    loop {
        let next = next_output(rx).await;
        if pred(&next) {
            return next;
        }
    }
}

#[tokio::test]
async fn friendless_viewer_gets_a_self_only_leaderboard() {
    let store = MemoryStore::new();
    let maya = seeded_user(&store, "Maya").await;

    let engine = Engine::start(store.clone(), maya.clone());
    let mut rx = engine.output();

    let output = output_matching(&mut rx, |o| !o.leaderboard.is_empty()).await;
    assert!(output.friends.is_empty());
    assert_eq!(output.leaderboard.len(), 1);
    assert!(output.leaderboard[0].is_self);
    assert_eq!(output.leaderboard[0].post_count, 0);

    engine.stop().await;
}

#[tokio::test]
async fn a_friends_post_moves_the_leaderboard() {
    let store = MemoryStore::new();
    let maya = seeded_user(&store, "Maya").await;
    let ravi = seeded_user(&store, "Ravi").await;
    accepted_pair(&store, &maya, &ravi).await;

    let engine = Engine::start(store.clone(), maya.clone());
    let mut rx = engine.output();

    let output = output_matching(&mut rx, |o| o.friends.len() == 1).await;
    assert_eq!(output.friends[0].name, "Ravi");
    assert_eq!(output.friends[0].streak, 0);

    store
        .insert_post(Post::new(&ravi.user_id, "https://img/1.jpg", "katsu", Some(Utc::now())).unwrap())
        .await
        .unwrap();

    let output = output_matching(&mut rx, |o| {
        o.leaderboard.first().is_some_and(|top| top.post_count == 1)
    })
    .await;
    assert_eq!(output.leaderboard[0].name, "Ravi");
    assert!(!output.leaderboard[0].is_self);
    // A post today starts a streak of 1.
    assert_eq!(output.friends[0].streak, 1);

    engine.stop().await;
}

#[tokio::test]
async fn accepting_a_request_adds_the_friend_live() {
    let store = MemoryStore::new();
    let maya = seeded_user(&store, "Maya").await;
    let ravi = seeded_user(&store, "Ravi").await;

    let engine = Engine::start(store.clone(), maya.clone());
    let mut rx = engine.output();
    output_matching(&mut rx, |o| o.leaderboard.len() == 1).await;

    // A pending request is not a friend yet.
    let request = platemates::Friendship::request(ravi.user_id.clone(), maya.user_id.clone(), Utc::now()).unwrap();
    let request_id = request.id.clone();
    store.insert_friendship(request).await.unwrap();
    let output = output_matching(&mut rx, |o| !o.leaderboard.is_empty()).await;
    assert!(output.friends.is_empty());

    store
        .set_friendship_status(&request_id, FriendshipStatus::Accepted)
        .await
        .unwrap();
    let output = output_matching(&mut rx, |o| o.friends.len() == 1).await;
    assert_eq!(output.friends[0].user_id, ravi.user_id);
    assert_eq!(output.leaderboard.len(), 2);

    engine.stop().await;
}

#[tokio::test]
async fn removing_a_friend_drops_their_activity() {
    let store = MemoryStore::new();
    let maya = seeded_user(&store, "Maya").await;
    let ravi = seeded_user(&store, "Ravi").await;
    accepted_pair(&store, &maya, &ravi).await;
    store
        .insert_post(Post::new(&ravi.user_id, "https://img/1.jpg", "bao", Some(Utc::now())).unwrap())
        .await
        .unwrap();

    let engine = Engine::start(store.clone(), maya.clone());
    let mut rx = engine.output();
    output_matching(&mut rx, |o| o.friends.len() == 1).await;

    let records = store.friendships(&maya.user_id).await.unwrap();
    store.delete_friendship(&records[0].id).await.unwrap();

    let output = output_matching(&mut rx, |o| o.friends.is_empty()).await;
    assert_eq!(output.leaderboard.len(), 1);
    assert!(output.leaderboard[0].is_self);

    engine.stop().await;
}

/// Wrapper that stalls the activity subscription whenever the owner set
/// contains `slow_owner`, so a friendship change can supersede the first
/// subscription while it is still being installed.
#[derive(Clone)]
struct SlowActivityStore {
    inner: MemoryStore,
    slow_owner: String,
    delay: Duration,
}

impl DataStore for SlowActivityStore {
    async fn watch_posts_by_owners(
        &self,
        owner_ids: &[String],
    ) -> platemates::StoreResult<platemates::Subscription<Vec<Post>>> {
        if owner_ids.iter().any(|o| *o == self.slow_owner) {
            tokio::time::sleep(self.delay).await;
        }
        self.inner.watch_posts_by_owners(owner_ids).await
    }

    async fn watch_friendships(
        &self,
        participant_id: &str,
    ) -> platemates::StoreResult<platemates::Subscription<Vec<platemates::Friendship>>> {
        self.inner.watch_friendships(participant_id).await
    }
    async fn profile(&self, user_id: &str) -> platemates::StoreResult<Option<UserProfile>> {
        self.inner.profile(user_id).await
    }
    async fn search_profiles(&self, name_prefix: &str) -> platemates::StoreResult<Vec<UserProfile>> {
        self.inner.search_profiles(name_prefix).await
    }
    async fn friendships(&self, participant_id: &str) -> platemates::StoreResult<Vec<platemates::Friendship>> {
        self.inner.friendships(participant_id).await
    }
    async fn post(&self, post_id: &str) -> platemates::StoreResult<Option<Post>> {
        self.inner.post(post_id).await
    }
    async fn posts_by_owners(&self, owner_ids: &[String]) -> platemates::StoreResult<Vec<Post>> {
        self.inner.posts_by_owners(owner_ids).await
    }
    async fn unread_notifications(&self, user_id: &str) -> platemates::StoreResult<Vec<platemates::Notification>> {
        self.inner.unread_notifications(user_id).await
    }
    async fn chats(&self, participant_id: &str) -> platemates::StoreResult<Vec<platemates::Chat>> {
        self.inner.chats(participant_id).await
    }
    async fn messages(&self, chat_id: &str) -> platemates::StoreResult<Vec<platemates::ChatMessage>> {
        self.inner.messages(chat_id).await
    }
    async fn comments(&self, post_id: &str) -> platemates::StoreResult<Vec<platemates::Comment>> {
        self.inner.comments(post_id).await
    }
    async fn put_profile(&self, profile: UserProfile) -> platemates::StoreResult<()> {
        self.inner.put_profile(profile).await
    }
    async fn insert_friendship(&self, friendship: platemates::Friendship) -> platemates::StoreResult<()> {
        self.inner.insert_friendship(friendship).await
    }
    async fn set_friendship_status(
        &self,
        friendship_id: &str,
        status: FriendshipStatus,
    ) -> platemates::StoreResult<()> {
        self.inner.set_friendship_status(friendship_id, status).await
    }
    async fn delete_friendship(&self, friendship_id: &str) -> platemates::StoreResult<()> {
        self.inner.delete_friendship(friendship_id).await
    }
    async fn insert_post(&self, post: Post) -> platemates::StoreResult<()> {
        self.inner.insert_post(post).await
    }
    async fn set_like_state(&self, post_id: &str, user_id: &str, liked: bool) -> platemates::StoreResult<()> {
        self.inner.set_like_state(post_id, user_id, liked).await
    }
    async fn insert_notification(&self, notification: platemates::Notification) -> platemates::StoreResult<()> {
        self.inner.insert_notification(notification).await
    }
    async fn mark_notification_read(&self, notification_id: &str) -> platemates::StoreResult<()> {
        self.inner.mark_notification_read(notification_id).await
    }
    async fn insert_chat(&self, chat: platemates::Chat) -> platemates::StoreResult<()> {
        self.inner.insert_chat(chat).await
    }
    async fn append_comment(&self, post_id: &str, comment: platemates::Comment) -> platemates::StoreResult<()> {
        self.inner.append_comment(post_id, comment).await
    }
    async fn append_message(
        &self,
        chat_id: &str,
        message: platemates::ChatMessage,
        updated_at: chrono::DateTime<Utc>,
    ) -> platemates::StoreResult<()> {
        self.inner.append_message(chat_id, message, updated_at).await
    }
}

#[tokio::test]
async fn superseded_friend_set_never_reaches_the_output() {
    let inner = MemoryStore::new();
    let maya = seeded_user(&inner, "Maya").await;
    let xavier = seeded_user(&inner, "Xavier").await;
    let yuki = seeded_user(&inner, "Yuki").await;

    // Friend set #1 is {Xavier}; his activity query is the slow one.
    accepted_pair(&inner, &maya, &xavier).await;
    inner
        .insert_post(Post::new(&xavier.user_id, "https://img/x.jpg", "stale khinkali", Some(Utc::now())).unwrap())
        .await
        .unwrap();
    inner
        .insert_post(Post::new(&yuki.user_id, "https://img/y.jpg", "fresh onigiri", Some(Utc::now())).unwrap())
        .await
        .unwrap();

    let store = SlowActivityStore {
        inner: inner.clone(),
        slow_owner: xavier.user_id.clone(),
        delay: Duration::from_millis(200),
    };

    let engine = Engine::start(store, maya.clone());
    let mut rx = engine.output();

    // Supersede {Xavier} with {Yuki} while his subscription is still stalled.
    tokio::time::sleep(Duration::from_millis(20)).await;
    let records = inner.friendships(&maya.user_id).await.unwrap();
    inner.delete_friendship(&records[0].id).await.unwrap();
    accepted_pair(&inner, &maya, &yuki).await;

    let output = output_matching(&mut rx, |o| o.friends.len() == 1).await;
    assert_eq!(output.friends[0].user_id, yuki.user_id);

    // Let the stalled query's window elapse; nothing from Xavier may surface.
    let deadline = tokio::time::Instant::now() + Duration::from_millis(400);
    while tokio::time::Instant::now() < deadline {
        let current = rx.borrow_and_update().clone();
        assert!(
            current.friends.iter().all(|f| f.user_id != xavier.user_id),
            "superseded friend set leaked into the friends list"
        );
        assert!(
            current.leaderboard.iter().all(|e| e.user_id != xavier.user_id),
            "superseded friend set leaked into the leaderboard"
        );
        tokio::time::sleep(Duration::from_millis(10)).await;
    }

    engine.stop().await;
}

#[tokio::test]
async fn stop_releases_store_watchers() {
    let store = MemoryStore::new();
    let maya = seeded_user(&store, "Maya").await;

    let engine = Engine::start(store.clone(), maya.clone());
    let mut rx = engine.output();
    output_matching(&mut rx, |o| !o.leaderboard.is_empty()).await;
    assert_eq!(store.active_watchers(), (1, 1));

    engine.stop().await;

    // The aborted activity task may take a moment to drop its subscription.
    let deadline = tokio::time::Instant::now() + Duration::from_secs(2);
    loop {
        if store.active_watchers() == (0, 0) {
            break;
        }
        assert!(tokio::time::Instant::now() < deadline, "watchers were not released");
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
}

#[tokio::test]
async fn dropping_the_engine_also_tears_down() {
    let store = MemoryStore::new();
    let maya = seeded_user(&store, "Maya").await;

    let engine = Engine::start(store.clone(), maya.clone());
    let mut rx = engine.output();
    output_matching(&mut rx, |o| !o.leaderboard.is_empty()).await;
    drop(engine);

    let deadline = tokio::time::Instant::now() + Duration::from_secs(2);
    loop {
        if store.active_watchers() == (0, 0) {
            break;
        }
        assert!(tokio::time::Instant::now() < deadline, "watchers were not released");
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
}
