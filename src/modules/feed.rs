use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

use crate::errors::{CustomResult, Error};
use crate::modules::helpers::ranking::RaceFormat;
use crate::modules::models::average_window::AverageWindow;
use crate::modules::models::entry::LeaderboardEntry;

/// display configuration delivered with a leaderboard snapshot
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct LeaderboardConfig {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub footer: String,
    #[serde(rename = "raceFormat", default)]
    pub race_format: RaceFormat,
}

/// the one-shot answer to a leaderboard query: display config plus the
/// current entries in the transport's order
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct LeaderboardSnapshot {
    pub config: LeaderboardConfig,
    pub entries: Vec<EntryMessage>,
}

/// one leaderboard entry as it travels over the wire. the username may be
/// absent on a malformed message, which is why conversion into the domain
/// entry is fallible.
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct EntryMessage {
    pub username: Option<String>,
    #[serde(rename = "eventId", default)]
    pub event_id: String,
    #[serde(rename = "trackId", default)]
    pub track_id: String,
    #[serde(rename = "fastestLapTime")]
    pub fastest_lap_time: Option<i64>,
    #[serde(rename = "fastestAverageLap")]
    pub fastest_average_lap: Option<AverageWindow>,
    #[serde(rename = "avgLapTime")]
    pub avg_lap_time: Option<f64>,
    #[serde(rename = "avgLapsPerAttempt")]
    pub avg_laps_per_attempt: Option<f64>,
    #[serde(rename = "numberOfValidLaps", default)]
    pub number_of_valid_laps: i32,
    #[serde(rename = "numberOfInvalidLaps", default)]
    pub number_of_invalid_laps: i32,
    #[serde(rename = "mostConsecutiveLaps", default)]
    pub most_consecutive_laps: i32,
    #[serde(rename = "lapCompletionRatio")]
    pub lap_completion_ratio: Option<f64>,
    #[serde(rename = "countryCode")]
    pub country_code: Option<String>,
    #[serde(rename = "racedByProxy", default)]
    pub raced_by_proxy: bool,
}

impl TryFrom<EntryMessage> for LeaderboardEntry {
    type Error = Error;

    fn try_from(message: EntryMessage) -> CustomResult<LeaderboardEntry> {
        let username = match message.username {
            Some(username) if !username.is_empty() => username,
            _ => return Err(Error::MissingUsernameError),
        };

        Ok(LeaderboardEntry {
            username,
            event_id: message.event_id,
            track_id: message.track_id,
            fastest_lap_time: message.fastest_lap_time,
            fastest_average_lap: message.fastest_average_lap,
            avg_lap_time: message.avg_lap_time,
            avg_laps_per_attempt: message.avg_laps_per_attempt,
            number_of_valid_laps: message.number_of_valid_laps,
            number_of_invalid_laps: message.number_of_invalid_laps,
            most_consecutive_laps: message.most_consecutive_laps,
            lap_completion_ratio: message.lap_completion_ratio,
            country_code: message.country_code,
            raced_by_proxy: message.raced_by_proxy,
        })
    }
}

impl From<LeaderboardEntry> for EntryMessage {
    fn from(entry: LeaderboardEntry) -> EntryMessage {
        EntryMessage {
            username: Some(entry.username),
            event_id: entry.event_id,
            track_id: entry.track_id,
            fastest_lap_time: entry.fastest_lap_time,
            fastest_average_lap: entry.fastest_average_lap,
            avg_lap_time: entry.avg_lap_time,
            avg_laps_per_attempt: entry.avg_laps_per_attempt,
            number_of_valid_laps: entry.number_of_valid_laps,
            number_of_invalid_laps: entry.number_of_invalid_laps,
            most_consecutive_laps: entry.most_consecutive_laps,
            lap_completion_ratio: entry.lap_completion_ratio,
            country_code: entry.country_code,
            raced_by_proxy: entry.raced_by_proxy,
        }
    }
}

/// a delete event only carries the username to take off the board
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct DeleteMessage {
    pub username: Option<String>,
}

/// a live event stream bound to one scope.
///
/// the subscription owns its upstream registration: dropping it runs the
/// cancel guard, so tearing down a scope (or aborting the router task that
/// holds the receivers) always unsubscribes, error paths included.
pub struct Subscription<T> {
    receiver: mpsc::UnboundedReceiver<T>,
    _guard: CancelGuard,
}

impl<T> Subscription<T> {
    pub fn new(
        receiver: mpsc::UnboundedReceiver<T>,
        on_cancel: impl FnOnce() + Send + 'static,
    ) -> Subscription<T> {
        Subscription {
            receiver,
            _guard: CancelGuard {
                cancel: Some(Box::new(on_cancel)),
            },
        }
    }

    /// next event on the stream, or None once the stream is dead
    pub async fn recv(&mut self) -> Option<T> {
        self.receiver.recv().await
    }
}

struct CancelGuard {
    cancel: Option<Box<dyn FnOnce() + Send>>,
}

impl Drop for CancelGuard {
    fn drop(&mut self) {
        if let Some(cancel) = self.cancel.take() {
            cancel();
        }
    }
}

/// the transport collaborator that delivers snapshots and the three live
/// event streams. `track_id` is None for the combined scope, so the stream
/// carries events for every track of the event.
#[async_trait]
pub trait LeaderboardFeed: Send + Sync {
    async fn fetch_leaderboard(
        &self,
        event_id: &str,
        track_id: Option<&str>,
    ) -> CustomResult<LeaderboardSnapshot>;

    async fn subscribe_inserts(
        &self,
        event_id: &str,
        track_id: Option<&str>,
    ) -> CustomResult<Subscription<EntryMessage>>;

    async fn subscribe_updates(
        &self,
        event_id: &str,
        track_id: Option<&str>,
    ) -> CustomResult<Subscription<EntryMessage>>;

    async fn subscribe_deletes(
        &self,
        event_id: &str,
        track_id: Option<&str>,
    ) -> CustomResult<Subscription<DeleteMessage>>;
}
