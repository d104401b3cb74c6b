use serde::{Deserialize, Serialize};

use crate::modules::models::average_window::AverageWindow;

/// one racer's best result within a reconciliation scope. there is at most
/// one entry per username in a projection; an update replaces the whole
/// entry rather than patching fields.
#[derive(Serialize, Deserialize, PartialEq, Debug, Clone)]
pub struct LeaderboardEntry {
    pub username: String,
    pub event_id: String,
    /// the physical track this result was driven on. under the combined
    /// scope this still names the source track, which is what the
    /// keep-the-faster merge rule compares.
    pub track_id: String,
    /// best single lap in milliseconds, None when the racer has no valid lap
    pub fastest_lap_time: Option<i64>,
    pub fastest_average_lap: Option<AverageWindow>,
    pub avg_lap_time: Option<f64>,
    pub avg_laps_per_attempt: Option<f64>,
    pub number_of_valid_laps: i32,
    pub number_of_invalid_laps: i32,
    pub most_consecutive_laps: i32,
    pub lap_completion_ratio: Option<f64>,
    pub country_code: Option<String>,
    pub raced_by_proxy: bool,
}

impl LeaderboardEntry {
    /// the average-lap time this entry can be ranked on, if it has one.
    /// a dnf window is not a rankable average.
    pub fn ranked_average(&self) -> Option<i64> {
        self.fastest_average_lap
            .as_ref()
            .filter(|window| window.is_ranked())
            .map(|window| window.avg_time)
    }
}
