use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::errors::{CustomResult, Error};
use crate::modules::feed::{
    DeleteMessage, EntryMessage, LeaderboardFeed, LeaderboardSnapshot, Subscription,
};

/// in-process leaderboard transport over tokio channels, used by the replay
/// runner and the tests. snapshots are registered per scope up front and
/// live events are fanned out to every subscriber whose scope matches.
#[derive(Clone)]
pub struct ChannelFeed {
    state: Arc<Mutex<ChannelFeedState>>,
}

/// the publishing side of a [`ChannelFeed`], playing the role of the
/// external event producer
#[derive(Clone)]
pub struct FeedPublisher {
    state: Arc<Mutex<ChannelFeedState>>,
}

struct Subscriber<T> {
    id: u64,
    event_id: String,
    track_id: Option<String>,
    sender: mpsc::UnboundedSender<T>,
}

impl<T> Subscriber<T> {
    /// a subscriber without a track filter receives every track of its event
    fn matches(&self, event_id: &str, track_id: &str) -> bool {
        self.event_id == event_id
            && self
                .track_id
                .as_deref()
                .map(|track| track == track_id)
                .unwrap_or(true)
    }
}

#[derive(Default)]
struct ChannelFeedState {
    snapshots: HashMap<String, LeaderboardSnapshot>,
    next_subscriber_id: u64,
    inserts: Vec<Subscriber<EntryMessage>>,
    updates: Vec<Subscriber<EntryMessage>>,
    deletes: Vec<Subscriber<DeleteMessage>>,
}

fn scope_key(event_id: &str, track_id: Option<&str>) -> String {
    format!("{}::{}", event_id, track_id.unwrap_or("*"))
}

impl ChannelFeed {
    pub fn new() -> ChannelFeed {
        ChannelFeed {
            state: Arc::new(Mutex::new(ChannelFeedState::default())),
        }
    }

    /// register the snapshot `fetch_leaderboard` answers for a scope.
    /// `track_id` None registers the combined scope of the event.
    pub fn set_snapshot(
        &self,
        event_id: &str,
        track_id: Option<&str>,
        snapshot: LeaderboardSnapshot,
    ) {
        self.lock()
            .snapshots
            .insert(scope_key(event_id, track_id), snapshot);
    }

    pub fn publisher(&self) -> FeedPublisher {
        FeedPublisher {
            state: Arc::clone(&self.state),
        }
    }

    fn lock(&self) -> MutexGuard<ChannelFeedState> {
        self.state.lock().expect("channel feed state poisoned")
    }

    fn subscribe<T: Send + 'static>(
        state: &Arc<Mutex<ChannelFeedState>>,
        event_id: &str,
        track_id: Option<&str>,
        select: fn(&mut ChannelFeedState) -> &mut Vec<Subscriber<T>>,
    ) -> Subscription<T> {
        let (sender, receiver) = mpsc::unbounded_channel();

        let mut guard = state.lock().expect("channel feed state poisoned");
        let id = guard.next_subscriber_id;
        guard.next_subscriber_id += 1;
        select(&mut guard).push(Subscriber {
            id,
            event_id: event_id.to_string(),
            track_id: track_id.map(str::to_string),
            sender,
        });
        drop(guard);

        // dropping the subscription deregisters the sender again
        let state = Arc::clone(state);
        Subscription::new(receiver, move || {
            if let Ok(mut guard) = state.lock() {
                select(&mut guard).retain(|subscriber| subscriber.id != id);
            }
        })
    }
}

impl Default for ChannelFeed {
    fn default() -> ChannelFeed {
        ChannelFeed::new()
    }
}

#[async_trait]
impl LeaderboardFeed for ChannelFeed {
    async fn fetch_leaderboard(
        &self,
        event_id: &str,
        track_id: Option<&str>,
    ) -> CustomResult<LeaderboardSnapshot> {
        let key = scope_key(event_id, track_id);
        self.lock()
            .snapshots
            .get(&key)
            .cloned()
            .ok_or(Error::SnapshotFetchError {
                message: format!("no leaderboard registered for scope {}", key),
            })
    }

    async fn subscribe_inserts(
        &self,
        event_id: &str,
        track_id: Option<&str>,
    ) -> CustomResult<Subscription<EntryMessage>> {
        Ok(ChannelFeed::subscribe(
            &self.state,
            event_id,
            track_id,
            |state| &mut state.inserts,
        ))
    }

    async fn subscribe_updates(
        &self,
        event_id: &str,
        track_id: Option<&str>,
    ) -> CustomResult<Subscription<EntryMessage>> {
        Ok(ChannelFeed::subscribe(
            &self.state,
            event_id,
            track_id,
            |state| &mut state.updates,
        ))
    }

    async fn subscribe_deletes(
        &self,
        event_id: &str,
        track_id: Option<&str>,
    ) -> CustomResult<Subscription<DeleteMessage>> {
        Ok(ChannelFeed::subscribe(
            &self.state,
            event_id,
            track_id,
            |state| &mut state.deletes,
        ))
    }
}

impl FeedPublisher {
    pub fn publish_insert(&self, entry: EntryMessage) {
        let guard = self.lock();
        for subscriber in &guard.inserts {
            if subscriber.matches(&entry.event_id, &entry.track_id) {
                // a closed receiver just means that scope was torn down
                let _ = subscriber.sender.send(entry.clone());
            }
        }
    }

    pub fn publish_update(&self, entry: EntryMessage) {
        let guard = self.lock();
        for subscriber in &guard.updates {
            if subscriber.matches(&entry.event_id, &entry.track_id) {
                let _ = subscriber.sender.send(entry.clone());
            }
        }
    }

    pub fn publish_delete(&self, event_id: &str, track_id: &str, username: &str) {
        let message = DeleteMessage {
            username: Some(username.to_string()),
        };

        let guard = self.lock();
        for subscriber in &guard.deletes {
            if subscriber.matches(event_id, track_id) {
                let _ = subscriber.sender.send(message.clone());
            }
        }
    }

    fn lock(&self) -> MutexGuard<ChannelFeedState> {
        self.state.lock().expect("channel feed state poisoned")
    }
}
