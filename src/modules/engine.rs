use std::sync::{Arc, Mutex, MutexGuard};

use chrono::{Duration, Utc};
use log::{info, warn};
use tokio::task::JoinHandle;

use crate::errors::CustomResult;
use crate::modules::config::EngineConfig;
use crate::modules::feed::{
    DeleteMessage, EntryMessage, LeaderboardConfig, LeaderboardFeed, Subscription,
};
use crate::modules::helpers::ranking::RaceFormat;
use crate::modules::models::entry::LeaderboardEntry;
use crate::modules::models::scope::ReconciliationScope;
use crate::modules::models::summary::RaceSummary;
use crate::modules::projection::LeaderboardProjection;

/// the live engine behind one display: owns the ranked projection, the
/// transient race summary and the lifecycle of the event subscriptions.
///
/// all mutations run either inside `set_scope` or inside the single router
/// task it spawns, one event at a time; nothing else writes the shared
/// state. every `set_scope` call bumps a generation token so a snapshot or
/// event belonging to a scope that has since been switched away from is
/// discarded instead of contaminating the new scope.
pub struct LeaderboardEngine<F: LeaderboardFeed> {
    feed: F,
    config: EngineConfig,
    inner: Arc<Mutex<EngineInner>>,
}

#[derive(Default)]
struct EngineInner {
    generation: u64,
    projection: Option<LeaderboardProjection>,
    display_config: Option<LeaderboardConfig>,
    summary: Option<RaceSummary>,
    router: Option<JoinHandle<()>>,
}

impl<F: LeaderboardFeed> LeaderboardEngine<F> {
    pub fn new(feed: F, config: EngineConfig) -> LeaderboardEngine<F> {
        LeaderboardEngine {
            feed,
            config,
            inner: Arc::new(Mutex::new(EngineInner::default())),
        }
    }

    /// # bind the engine to a new scope
    /// tears down the previous scope's streams, clears the board, fetches a
    /// fresh snapshot and goes live on the new scope's insert, update and
    /// delete streams. the combined track subscribes without a track filter
    /// so the merge rule sees every track's events.
    ///
    /// a snapshot that resolves after a newer `set_scope` call is discarded.
    /// a failed fetch leaves the board empty for this scope and is returned
    /// to the caller; retrying is the caller's decision.
    ///
    /// ## Arguments
    /// * `event_id` - The event to track
    /// * `track_id` - The track to track, or `combined`
    pub async fn set_scope(&self, event_id: &str, track_id: &str) -> CustomResult<()> {
        let scope = ReconciliationScope::new(event_id, track_id);
        info!(target: "modules/engine:set_scope", "switching scope to {}", scope);

        let generation = {
            let mut inner = self.lock();
            inner.generation += 1;
            if let Some(router) = inner.router.take() {
                // aborting drops the router's subscriptions, which cancels
                // them upstream
                router.abort();
            }
            inner.projection = Some(LeaderboardProjection::new(
                scope.clone(),
                RaceFormat::default(),
            ));
            inner.display_config = None;
            inner.summary = None;
            inner.generation
        };

        let snapshot = self
            .feed
            .fetch_leaderboard(&scope.event_id, scope.effective_track_id())
            .await?;

        {
            let mut inner = self.lock();
            if inner.generation != generation {
                info!(
                    target: "modules/engine:set_scope",
                    "discarding stale snapshot for superseded scope {}", scope
                );
                return Ok(());
            }

            let projection = inner
                .projection
                .as_mut()
                .expect("projection exists for the bound scope");
            projection.set_format(snapshot.config.race_format);

            let mut entries: Vec<LeaderboardEntry> = Vec::new();
            for message in snapshot.entries {
                match LeaderboardEntry::try_from(message) {
                    Ok(entry) => entries.push(entry),
                    Err(error) => {
                        warn!(
                            target: "modules/engine:set_scope",
                            "skipping malformed snapshot entry: {}", error
                        );
                    }
                }
            }
            projection.apply_snapshot(entries);
            inner.display_config = Some(snapshot.config);
        }

        let inserts = self
            .feed
            .subscribe_inserts(&scope.event_id, scope.effective_track_id())
            .await?;
        let updates = self
            .feed
            .subscribe_updates(&scope.event_id, scope.effective_track_id())
            .await?;
        let deletes = self
            .feed
            .subscribe_deletes(&scope.event_id, scope.effective_track_id())
            .await?;

        let mut inner = self.lock();
        if inner.generation != generation {
            // a newer scope owns the engine; dropping the subscriptions
            // cancels them again
            return Ok(());
        }
        inner.router = Some(tokio::spawn(route_events(
            Arc::clone(&self.inner),
            generation,
            self.config.summary_display_ms,
            inserts,
            updates,
            deletes,
        )));

        info!(target: "modules/engine:set_scope", "scope {} is live", scope);
        Ok(())
    }

    /// the scope the engine is currently bound to, if any
    pub fn scope(&self) -> Option<ReconciliationScope> {
        self.lock()
            .projection
            .as_ref()
            .map(|projection| projection.scope().clone())
    }

    /// read-only snapshot of the current ordering, best entry first
    pub fn entries(&self) -> Vec<LeaderboardEntry> {
        self.lock()
            .projection
            .as_ref()
            .map(|projection| projection.entries().to_vec())
            .unwrap_or_default()
    }

    pub fn display_config(&self) -> Option<LeaderboardConfig> {
        self.lock().display_config.clone()
    }

    /// the most recent race summary, whether or not it is still visible
    pub fn summary(&self) -> Option<RaceSummary> {
        self.lock().summary.clone()
    }

    /// whether the current summary is still inside its display window.
    /// expiry is a timestamp comparison; the projection itself is never
    /// touched to clear a summary.
    pub fn summary_visible(&self) -> bool {
        self.lock()
            .summary
            .as_ref()
            .map(|summary| summary.is_visible(Utc::now()))
            .unwrap_or(false)
    }

    /// tear the engine down: no further events are applied afterwards
    pub fn shutdown(&self) {
        let mut inner = self.lock();
        inner.generation += 1;
        if let Some(router) = inner.router.take() {
            router.abort();
        }
    }

    fn lock(&self) -> MutexGuard<EngineInner> {
        self.inner.lock().expect("engine state poisoned")
    }
}

impl<F: LeaderboardFeed> Drop for LeaderboardEngine<F> {
    fn drop(&mut self) {
        self.shutdown();
    }
}

/// route live events into the projection until a stream dies or the scope
/// is torn down. runs as the only writer besides `set_scope` itself.
async fn route_events(
    inner: Arc<Mutex<EngineInner>>,
    generation: u64,
    summary_display_ms: i64,
    mut inserts: Subscription<EntryMessage>,
    mut updates: Subscription<EntryMessage>,
    mut deletes: Subscription<DeleteMessage>,
) {
    loop {
        tokio::select! {
            message = inserts.recv() => match message {
                Some(message) => apply_entry_event(&inner, generation, summary_display_ms, message, "insert"),
                None => {
                    warn!(target: "modules/engine:route_events", "insert stream closed, leaderboard is no longer live");
                    break;
                }
            },
            message = updates.recv() => match message {
                Some(message) => apply_entry_event(&inner, generation, summary_display_ms, message, "update"),
                None => {
                    warn!(target: "modules/engine:route_events", "update stream closed, leaderboard is no longer live");
                    break;
                }
            },
            message = deletes.recv() => match message {
                Some(message) => apply_delete_event(&inner, generation, message),
                None => {
                    warn!(target: "modules/engine:route_events", "delete stream closed, leaderboard is no longer live");
                    break;
                }
            },
        }
    }
}

/// apply one insert/update event and derive the race summary for it.
/// runs to completion under the lock; an event handler never suspends
/// mid-mutation, so two events for the same username cannot interleave.
fn apply_entry_event(
    inner: &Mutex<EngineInner>,
    generation: u64,
    summary_display_ms: i64,
    message: EntryMessage,
    stream: &str,
) {
    let entry = match LeaderboardEntry::try_from(message) {
        Ok(entry) => entry,
        Err(error) => {
            warn!(
                target: "modules/engine:apply_entry_event",
                "dropping malformed {} event: {}", stream, error
            );
            return;
        }
    };

    let mut inner = inner.lock().expect("engine state poisoned");
    if inner.generation != generation {
        return;
    }

    let summary = {
        let projection = match inner.projection.as_mut() {
            Some(projection) => projection,
            None => return,
        };

        let username = entry.username.clone();
        let outcome = match projection.apply_upsert(entry) {
            Ok(outcome) => outcome,
            Err(error) => {
                warn!(
                    target: "modules/engine:apply_entry_event",
                    "dropping {} event for {}: {}", stream, username, error
                );
                return;
            }
        };

        // under the combined scope the merge rule may have kept the stored
        // entry; the summary always describes what is on the board
        let survivor = projection.entries()[outcome.rank - 1].clone();
        RaceSummary::summarize(
            &survivor,
            outcome.prior_rank,
            projection.entries(),
            projection.format(),
            Utc::now() + Duration::milliseconds(summary_display_ms),
        )
    };

    inner.summary = Some(summary);
}

fn apply_delete_event(inner: &Mutex<EngineInner>, generation: u64, message: DeleteMessage) {
    let username = match message.username {
        Some(username) if !username.is_empty() => username,
        _ => {
            warn!(
                target: "modules/engine:apply_delete_event",
                "dropping delete event without a username"
            );
            return;
        }
    };

    let mut inner = inner.lock().expect("engine state poisoned");
    if inner.generation != generation {
        return;
    }

    if let Some(projection) = inner.projection.as_mut() {
        // deletes do not touch the pending summary
        projection.apply_delete(&username);
    }
}
