use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::modules::helpers::ranking::RaceFormat;
use crate::modules::models::entry::LeaderboardEntry;

/// transient highlight of the most recent leaderboard change, shown to the
/// audience next to the board. superseded by the next insert/update and
/// expired by `expires_at` rather than an imperative timer, so a newer
/// summary always wins over a pending expiry.
#[derive(Serialize, Deserialize, PartialEq, Debug, Clone)]
pub struct RaceSummary {
    #[serde(flatten)]
    pub entry: LeaderboardEntry,
    /// 1-based position in the current ordering
    pub overall_rank: usize,
    /// the entry's rank before this change; a first-time entrant has no
    /// prior position, so it equals the current rank
    pub consistency: usize,
    /// difference between this entry's comparison time and the leader's,
    /// None when the format's data is absent
    pub gap_to_fastest: Option<i64>,
    pub expires_at: DateTime<Utc>,
}

impl RaceSummary {
    /// # summarize a just-changed entry
    /// derives rank, consistency and gap-to-leader for the entry that just
    /// arrived, against the freshly sorted board. only invoked for insert
    /// and update events: deletes and snapshot application do not produce
    /// a highlight.
    ///
    /// ## Arguments
    /// * `entry` - The entry the event landed on
    /// * `prior_rank` - The entry's rank before the event, if it had one
    /// * `entries` - The current ordering, containing `entry`
    /// * `format` - The active race format
    /// * `expires_at` - When this summary falls off the screen
    ///
    /// ## Returns
    /// * `RaceSummary` - The derived summary
    pub fn summarize(
        entry: &LeaderboardEntry,
        prior_rank: Option<usize>,
        entries: &[LeaderboardEntry],
        format: RaceFormat,
        expires_at: DateTime<Utc>,
    ) -> RaceSummary {
        let overall_rank = entries
            .iter()
            .position(|stored| stored.username == entry.username)
            .map(|index| index + 1)
            .expect("summarized entry is always on the board");

        let gap_to_fastest = if overall_rank == 1 {
            Some(0)
        } else {
            RaceSummary::gap(entry, &entries[0], format)
        };

        RaceSummary {
            entry: entry.clone(),
            overall_rank,
            consistency: prior_rank.unwrap_or(overall_rank),
            gap_to_fastest,
            expires_at,
        }
    }

    /// whether the summary is still inside its display window
    pub fn is_visible(&self, now: DateTime<Utc>) -> bool {
        now < self.expires_at
    }

    fn gap(entry: &LeaderboardEntry, leader: &LeaderboardEntry, format: RaceFormat) -> Option<i64> {
        match format {
            RaceFormat::Fastest => match (entry.fastest_lap_time, leader.fastest_lap_time) {
                (Some(own), Some(best)) => Some(own - best),
                _ => None,
            },
            RaceFormat::Average => match (entry.ranked_average(), leader.ranked_average()) {
                (Some(own), Some(best)) => Some(own - best),
                _ => None,
            },
        }
    }
}
