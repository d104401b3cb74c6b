use serde::{Deserialize, Serialize};

use crate::modules::helpers::math::Math;
use crate::modules::models::lap::Lap;

/// how many consecutive laps make up an average window when nothing else
/// is configured
pub const DEFAULT_WINDOW_SIZE: usize = 3;

/// one candidate "average lap" result: the mean time over a fixed-size run
/// of consecutive valid laps. `dnf` marks the sentinel used when a racer
/// never completed a fully valid window.
#[derive(Serialize, Deserialize, PartialEq, Debug, Clone)]
pub struct AverageWindow {
    #[serde(rename = "startLapId")]
    pub start_lap_id: i64,
    #[serde(rename = "endLapId")]
    pub end_lap_id: i64,
    #[serde(rename = "avgTime")]
    pub avg_time: i64,
    pub dnf: bool,
}

impl AverageWindow {
    /// # compute all valid average windows
    /// slide a window of exactly `window_size` consecutive laps across the
    /// lap sequence (by position, not by lap id) and keep every window in
    /// which all laps are valid. the window average is the arithmetic mean
    /// of the lap times, rounded to the nearest millisecond.
    ///
    /// ## Arguments
    /// * `laps` - The ordered lap sequence to slide over
    /// * `window_size` - The amount of consecutive laps per window
    ///
    /// ## Returns
    /// * `Vec<AverageWindow>` - All fully valid windows, in start order
    pub fn compute(laps: &[Lap], window_size: usize) -> Vec<AverageWindow> {
        let mut windows: Vec<AverageWindow> = Vec::new();
        if window_size == 0 || laps.len() < window_size {
            return windows;
        }

        for window in laps.windows(window_size) {
            if window.iter().any(|lap| !lap.is_valid) {
                continue;
            }

            let times: Vec<f64> = window.iter().map(|lap| lap.time as f64).collect();
            windows.push(AverageWindow {
                start_lap_id: window[0].lap_id,
                end_lap_id: window[window_size - 1].lap_id,
                avg_time: Math::mean(&times).round() as i64,
                dnf: false,
            });
        }

        windows
    }

    /// # pick the fastest average window
    /// the best window is the one with the lowest average time. when no
    /// valid window exists the racer did not finish a full window and the
    /// dnf sentinel is returned.
    ///
    /// ## Arguments
    /// * `windows` - The windows to pick from
    ///
    /// ## Returns
    /// * `AverageWindow` - The fastest window, or the dnf sentinel
    pub fn fastest_of(windows: &[AverageWindow]) -> AverageWindow {
        windows
            .iter()
            .min_by_key(|window| window.avg_time)
            .cloned()
            .unwrap_or(AverageWindow {
                start_lap_id: 0,
                end_lap_id: 0,
                avg_time: 0,
                dnf: true,
            })
    }

    /// true when this window holds a real average a racer can be ranked on
    pub fn is_ranked(&self) -> bool {
        !self.dnf
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lap(lap_id: i64, time: i64, is_valid: bool) -> Lap {
        Lap {
            lap_id,
            time,
            is_valid,
            resets: 0,
            car_name: String::new(),
        }
    }

    #[test]
    fn no_windows_when_too_few_laps() {
        let laps = vec![lap(1, 100, true), lap(2, 110, true)];
        assert!(AverageWindow::compute(&laps, 3).is_empty());
    }

    #[test]
    fn invalid_lap_poisons_every_window_it_touches() {
        let laps = vec![
            lap(1, 100, true),
            lap(2, 110, true),
            lap(3, 90, false),
            lap(4, 95, true),
            lap(5, 105, true),
        ];
        // lap 3 is invalid, so all three possible windows of size 3 are out
        assert!(AverageWindow::compute(&laps, 3).is_empty());
    }

    #[test]
    fn windows_of_two_around_an_invalid_lap() {
        let laps = vec![
            lap(1, 100, true),
            lap(2, 110, true),
            lap(3, 90, false),
            lap(4, 95, true),
            lap(5, 105, true),
        ];
        let windows = AverageWindow::compute(&laps, 2);
        assert_eq!(
            windows,
            vec![
                AverageWindow {
                    start_lap_id: 1,
                    end_lap_id: 2,
                    avg_time: 105,
                    dnf: false
                },
                AverageWindow {
                    start_lap_id: 4,
                    end_lap_id: 5,
                    avg_time: 100,
                    dnf: false
                },
            ]
        );
    }

    #[test]
    fn average_is_rounded_to_nearest_millisecond() {
        let laps = vec![lap(1, 100, true), lap(2, 101, true)];
        let windows = AverageWindow::compute(&laps, 2);
        assert_eq!(windows[0].avg_time, 101); // 100.5 rounds up
    }

    #[test]
    fn window_bounds_use_lap_ids_not_positions() {
        let laps = vec![lap(17, 100, true), lap(19, 102, true), lap(23, 104, true)];
        let windows = AverageWindow::compute(&laps, 3);
        assert_eq!(windows[0].start_lap_id, 17);
        assert_eq!(windows[0].end_lap_id, 23);
    }

    #[test]
    fn fastest_of_picks_lowest_average() {
        let laps = vec![
            lap(1, 100, true),
            lap(2, 110, true),
            lap(3, 90, true),
            lap(4, 95, true),
        ];
        let windows = AverageWindow::compute(&laps, 2);
        let fastest = AverageWindow::fastest_of(&windows);
        assert_eq!(fastest.start_lap_id, 3);
        assert_eq!(fastest.avg_time, 93); // (90 + 95) / 2 = 92.5
        assert!(!fastest.dnf);
    }

    #[test]
    fn fastest_of_nothing_is_dnf() {
        let fastest = AverageWindow::fastest_of(&[]);
        assert!(fastest.dnf);
        assert_eq!(fastest.avg_time, 0);
        assert_eq!(fastest.start_lap_id, 0);
        assert_eq!(fastest.end_lap_id, 0);
    }
}
