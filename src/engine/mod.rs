//! Friend-activity aggregation engine.
//!
//! The pipeline stages are pure functions (graph → collector → streak →
//! roster/leaderboard); [`Engine`] wires them to the store's live
//! subscriptions and republishes `{friends, leaderboard}` whenever the
//! underlying data changes.
//!
//! The coordinator is an explicit state machine: idle until started,
//! subscribed to the viewer's friendship records, and - once a friend set is
//! known - subscribed to that set's activity. Every friendship change tears
//! down the previous activity subscription *before* installing the next one,
//! and a generation token discards any stale in-flight recomputation whose id
//! set has been superseded, so a slow response can never overwrite a fresher
//! result.

pub mod collector;
pub mod graph;
pub mod leaderboard;
pub mod roster;
pub mod streak;

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use chrono::Utc;
use log::warn;
use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::engine::collector::collect;
use crate::engine::graph::accepted_friend_ids;
use crate::engine::leaderboard::{LeaderboardEntry, build};
use crate::engine::roster::{FriendView, compose};
use crate::model::{Post, UserId, UserProfile};
use crate::store::DataStore;

/// Result published to the view layer. Publication is last-write-wins: each
/// recomputation overwrites the previous value, and no ordering is promised
/// between two rapid change events beyond the final state reflecting the
/// last fully processed one.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EngineOutput {
    pub friends: Vec<FriendView>,
    pub leaderboard: Vec<LeaderboardEntry>,
}

/// Generation-guarded output channel shared by the coordinator's activity
/// tasks.
///
/// The generation comparison and the send happen under one lock, so an
/// aborted-but-mid-poll stale task that read a matching generation can never
/// interleave its send after a fresher task's.
struct Publisher {
    tx: watch::Sender<EngineOutput>,
    generation: AtomicU64,
    gate: Mutex<()>,
}

impl Publisher {
    fn new(tx: watch::Sender<EngineOutput>) -> Self {
        Self {
            tx,
            generation: AtomicU64::new(0),
            gate: Mutex::new(()),
        }
    }

    /// Supersede all outstanding generations and return the new one.
    fn next_generation(&self) -> u64 {
        self.generation.fetch_add(1, Ordering::SeqCst) + 1
    }

    /// Publish `output` unless `generation` has been superseded. Returns
    /// whether the value was sent.
    fn publish(&self, generation: u64, output: EngineOutput) -> bool {
        let _gate = self.gate.lock().unwrap_or_else(PoisonError::into_inner);
        if self.generation.load(Ordering::SeqCst) != generation {
            return false;
        }
        let _ = self.tx.send(output);
        true
    }
}

/// Live recomputation coordinator for one viewer session.
///
/// Holds both subscriptions for its lifetime; [`Engine::stop`] (or dropping
/// the handle) releases them and returns the coordinator to idle.
pub struct Engine {
    output: watch::Receiver<EngineOutput>,
    shutdown: watch::Sender<bool>,
    task: JoinHandle<()>,
}

impl Engine {
    /// Start the coordinator for `viewer`. The returned handle's output
    /// receiver begins at [`EngineOutput::default`] and updates as snapshots
    /// arrive.
    pub fn start<S: DataStore>(store: S, viewer: UserProfile) -> Self {
        let (out_tx, out_rx) = watch::channel(EngineOutput::default());
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let task = tokio::spawn(run(store, viewer, out_tx, shutdown_rx));
        Self {
            output: out_rx,
            shutdown: shutdown_tx,
            task,
        }
    }

    /// A receiver for the published `{friends, leaderboard}` result.
    pub fn output(&self) -> watch::Receiver<EngineOutput> {
        self.output.clone()
    }

    /// Stop the coordinator and release both subscriptions. Resolves once
    /// the coordinator has fully wound down.
    pub async fn stop(self) {
        let _ = self.shutdown.send(true);
        let _ = self.task.await;
    }
}

async fn run<S: DataStore>(
    store: S,
    viewer: UserProfile,
    out: watch::Sender<EngineOutput>,
    mut shutdown: watch::Receiver<bool>,
) {
    let publisher = Arc::new(Publisher::new(out));

    let mut friendships = match store.watch_friendships(&viewer.user_id).await {
        Ok(sub) => sub,
        Err(err) => {
            // Fail-soft: an unreachable relationship query renders as an
            // empty result, never as a crash.
            warn!("friendship subscription failed for {}: {err}", viewer.user_id);
            let _ = publisher.tx.send(EngineOutput::default());
            return;
        }
    };

    let mut activity: Option<JoinHandle<()>> = None;

    loop {
        let records = friendships.current();
        let friend_ids = accepted_friend_ids(&records, &viewer.user_id);

        // Teardown before install: the superseded activity subscription must
        // be gone before the new one exists, so two subscriptions never feed
        // the shared output at once.
        if let Some(task) = activity.take() {
            task.abort();
        }
        let current = publisher.next_generation();

        activity = Some(tokio::spawn(activity_loop(
            store.clone(),
            viewer.clone(),
            friend_ids,
            Arc::clone(&publisher),
            current,
        )));

        tokio::select! {
            changed = friendships.changed() => {
                if !changed {
                    break;
                }
            }
            _ = shutdown.changed() => break,
        }
    }

    if let Some(task) = activity.take() {
        task.abort();
    }
}

/// One activity subscription's lifetime: recompute and publish on every post
/// snapshot until superseded, torn down, or the store side closes.
async fn activity_loop<S: DataStore>(
    store: S,
    viewer: UserProfile,
    friend_ids: Vec<UserId>,
    publisher: Arc<Publisher>,
    my_generation: u64,
) {
    // The viewer is always part of the owner set, so it is never empty and
    // the store's non-empty-owner-list contract holds.
    let mut owners = friend_ids.clone();
    owners.push(viewer.user_id.clone());

    let mut posts = match store.watch_posts_by_owners(&owners).await {
        Ok(sub) => sub,
        Err(err) => {
            warn!("activity subscription failed for {}: {err}", viewer.user_id);
            publisher.publish(my_generation, EngineOutput::default());
            return;
        }
    };

    loop {
        let snapshot = posts.current();
        let result = recompute(&store, &viewer, &friend_ids, &snapshot).await;

        // Generation guard: profile lookups above may have raced with a
        // friendship change; a superseded id set must not publish.
        if !publisher.publish(my_generation, result) {
            return;
        }

        if !posts.changed().await {
            break;
        }
    }
}

async fn recompute<S: DataStore>(
    store: &S,
    viewer: &UserProfile,
    friend_ids: &[UserId],
    posts: &[Post],
) -> EngineOutput {
    let mut owners = friend_ids.to_vec();
    owners.push(viewer.user_id.clone());

    let rollup = collect(&owners, posts);
    let now = Utc::now();
    let streaks = rollup.streaks(&now);

    let mut profiles = HashMap::new();
    for id in friend_ids {
        match store.profile(id).await {
            Ok(Some(profile)) => {
                profiles.insert(id.clone(), profile);
            }
            // A friend id with no resolvable profile is excluded, not an error.
            Ok(None) => {}
            Err(err) => warn!("profile lookup failed for {id}: {err}"),
        }
    }

    let friends = compose(friend_ids, &profiles, &streaks);

    // Leaderboard input keeps the adapter's friend order; self is appended
    // inside the builder, after all friends.
    let ordered: Vec<UserProfile> = friend_ids.iter().filter_map(|id| profiles.get(id).cloned()).collect();
    let leaderboard = build(&ordered, &rollup.post_counts, viewer);

    EngineOutput { friends, leaderboard }
}
