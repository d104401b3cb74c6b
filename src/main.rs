use std::env;
use std::fs;
use std::time::Duration;

use dotenvy::dotenv;
use log::{error, info};
use serde::Deserialize;

use live_leaderboard::errors::{CustomResult, Error};
use live_leaderboard::modules::channel_feed::ChannelFeed;
use live_leaderboard::modules::config::EngineConfig;
use live_leaderboard::modules::engine::LeaderboardEngine;
use live_leaderboard::modules::feed::{EntryMessage, LeaderboardFeed, LeaderboardSnapshot};
use live_leaderboard::modules::helpers::logging::setup_logging;
use live_leaderboard::modules::models::scope::ReconciliationScope;

/// a recorded session: the snapshot a scope starts from plus the live
/// events to replay against it
#[derive(Deserialize, Debug)]
struct ReplayFile {
    #[serde(rename = "eventId")]
    event_id: String,
    #[serde(rename = "trackId")]
    track_id: String,
    snapshot: LeaderboardSnapshot,
    events: Vec<ReplayEvent>,
}

#[derive(Deserialize, Debug)]
#[serde(tag = "type", rename_all = "lowercase")]
enum ReplayEvent {
    Insert { entry: EntryMessage },
    Update { entry: EntryMessage },
    Delete {
        username: String,
        #[serde(rename = "trackId")]
        track_id: String,
    },
}

fn load_replay_file(path: &str) -> CustomResult<ReplayFile> {
    let contents = fs::read_to_string(path).map_err(|_| Error::FileDoesNotExistError {
        path: path.to_string(),
    })?;

    serde_json::from_str(&contents).map_err(|error| Error::MalformedFeedFileError {
        message: error.to_string(),
    })
}

#[tokio::main]
async fn main() {
    dotenv().ok();
    setup_logging().expect("failed to setup logging");

    let path = env::args().nth(1).unwrap_or_else(|| "./replay.json".to_string());
    let replay = match load_replay_file(&path) {
        Ok(replay) => replay,
        Err(Error::FileDoesNotExistError { path }) => {
            error!(target: "main", "replay file does not exist: {}", path);
            return;
        }
        Err(error) => {
            error!(target: "main", "could not load replay file: {}", error);
            return;
        }
    };

    let scope = ReconciliationScope::new(&replay.event_id, &replay.track_id);

    let feed = ChannelFeed::new();
    let publisher = feed.publisher();
    feed.set_snapshot(
        &scope.event_id,
        scope.effective_track_id(),
        replay.snapshot,
    );

    let engine = LeaderboardEngine::new(feed, EngineConfig::from_env());
    if let Err(error) = engine.set_scope(&replay.event_id, &replay.track_id).await {
        error!(target: "main", "could not go live on scope {}: {}", scope, error);
        return;
    }

    log_board(&engine);

    for event in replay.events {
        match event {
            ReplayEvent::Insert { entry } => publisher.publish_insert(entry),
            ReplayEvent::Update { entry } => publisher.publish_update(entry),
            ReplayEvent::Delete { username, track_id } => {
                publisher.publish_delete(&scope.event_id, &track_id, &username)
            }
        }

        // let the router apply the event before reading the board back
        tokio::time::sleep(Duration::from_millis(250)).await;
        log_board(&engine);
    }

    engine.shutdown();
}

fn log_board<F: LeaderboardFeed>(engine: &LeaderboardEngine<F>) {
    if let Some(config) = engine.display_config() {
        info!(target: "main", "=== {} ===", config.title);
    }

    for (index, entry) in engine.entries().iter().enumerate() {
        info!(
            target: "main",
            "{:>2}. {} ({}) fastest: {:?} avg: {:?}",
            index + 1,
            entry.username,
            entry.track_id,
            entry.fastest_lap_time,
            entry.fastest_average_lap.as_ref().map(|window| window.avg_time),
        );
    }

    if engine.summary_visible() {
        if let Some(summary) = engine.summary() {
            info!(
                target: "main",
                "summary: {} is P{} (was P{}), gap to fastest: {:?}",
                summary.entry.username,
                summary.overall_rank,
                summary.consistency,
                summary.gap_to_fastest,
            );
        }
    }
}
