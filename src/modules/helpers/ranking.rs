use std::cmp::Ordering;

use serde::{Deserialize, Serialize};

use crate::modules::models::entry::LeaderboardEntry;

/// which lap result a race ranks its entries on
#[derive(Serialize, Deserialize, PartialEq, Eq, Debug, Clone, Copy)]
#[serde(rename_all = "lowercase")]
pub enum RaceFormat {
    Fastest,
    Average,
}

impl Default for RaceFormat {
    fn default() -> RaceFormat {
        RaceFormat::Fastest
    }
}

pub struct Ranking {}

impl Ranking {
    /// # compare two leaderboard entries
    /// orders entries for the given race format, ascending by the format's
    /// comparison time. entries without a comparable time sort after
    /// entries that have one. ties compare equal on purpose: the projection
    /// sorts with a stable sort, so tied racers keep their prior relative
    /// order instead of being reshuffled by a secondary key.
    ///
    /// ## Arguments
    /// * `a` - The left entry
    /// * `b` - The right entry
    /// * `format` - The active race format
    ///
    /// ## Returns
    /// * `Ordering` - How `a` ranks against `b`
    pub fn compare(a: &LeaderboardEntry, b: &LeaderboardEntry, format: RaceFormat) -> Ordering {
        match format {
            RaceFormat::Fastest => Ranking::compare_optional(a.fastest_lap_time, b.fastest_lap_time),
            RaceFormat::Average => Ranking::compare_optional(a.ranked_average(), b.ranked_average()),
        }
    }

    fn compare_optional(a: Option<i64>, b: Option<i64>) -> Ordering {
        match (a, b) {
            (Some(a), Some(b)) => a.cmp(&b),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => Ordering::Equal,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::modules::models::average_window::AverageWindow;

    fn entry(username: &str, fastest: Option<i64>) -> LeaderboardEntry {
        LeaderboardEntry {
            username: username.to_string(),
            event_id: "event".to_string(),
            track_id: "track-A".to_string(),
            fastest_lap_time: fastest,
            fastest_average_lap: None,
            avg_lap_time: None,
            avg_laps_per_attempt: None,
            number_of_valid_laps: 0,
            number_of_invalid_laps: 0,
            most_consecutive_laps: 0,
            lap_completion_ratio: None,
            country_code: None,
            raced_by_proxy: false,
        }
    }

    fn with_average(username: &str, window: Option<AverageWindow>) -> LeaderboardEntry {
        let mut entry = entry(username, None);
        entry.fastest_average_lap = window;
        entry
    }

    fn window(avg_time: i64) -> AverageWindow {
        AverageWindow {
            start_lap_id: 1,
            end_lap_id: 3,
            avg_time,
            dnf: false,
        }
    }

    #[test]
    fn fastest_format_orders_by_fastest_lap() {
        let a = entry("a", Some(20000));
        let b = entry("b", Some(21000));
        assert_eq!(Ranking::compare(&a, &b, RaceFormat::Fastest), Ordering::Less);
        assert_eq!(Ranking::compare(&b, &a, RaceFormat::Fastest), Ordering::Greater);
    }

    #[test]
    fn missing_fastest_lap_sorts_last() {
        let a = entry("a", Some(20000));
        let b = entry("b", None);
        assert_eq!(Ranking::compare(&a, &b, RaceFormat::Fastest), Ordering::Less);
        assert_eq!(Ranking::compare(&b, &a, RaceFormat::Fastest), Ordering::Greater);
    }

    #[test]
    fn equal_times_compare_equal() {
        let a = entry("a", Some(20000));
        let b = entry("b", Some(20000));
        assert_eq!(Ranking::compare(&a, &b, RaceFormat::Fastest), Ordering::Equal);
    }

    #[test]
    fn average_format_orders_by_window_average() {
        let a = with_average("a", Some(window(61000)));
        let b = with_average("b", Some(window(60000)));
        assert_eq!(Ranking::compare(&a, &b, RaceFormat::Average), Ordering::Greater);
    }

    #[test]
    fn missing_average_window_sorts_last() {
        let a = with_average("a", Some(window(61000)));
        let b = with_average("b", None);
        assert_eq!(Ranking::compare(&a, &b, RaceFormat::Average), Ordering::Less);
        assert_eq!(
            Ranking::compare(&b, &a, RaceFormat::Average),
            Ordering::Greater
        );
    }

    #[test]
    fn dnf_window_sorts_like_a_missing_one() {
        // the dnf sentinel carries avg_time 0 and must not rank first
        let dnf = AverageWindow {
            start_lap_id: 0,
            end_lap_id: 0,
            avg_time: 0,
            dnf: true,
        };
        let a = with_average("a", Some(window(61000)));
        let b = with_average("b", Some(dnf));
        assert_eq!(Ranking::compare(&a, &b, RaceFormat::Average), Ordering::Less);
    }
}
