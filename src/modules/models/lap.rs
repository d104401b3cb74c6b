use serde::{Deserialize, Serialize};

use crate::modules::helpers::math::Math;

/// a single completed or attempted lap, as recorded by the timekeeping
/// subsystem. laps are immutable once recorded; the engine only reads them.
#[derive(Serialize, Deserialize, PartialEq, Debug, Clone)]
pub struct Lap {
    #[serde(rename = "lapId")]
    pub lap_id: i64,
    /// lap time in milliseconds
    pub time: i64,
    #[serde(rename = "isValid")]
    pub is_valid: bool,
    #[serde(default)]
    pub resets: i32,
    #[serde(rename = "carName", default)]
    pub car_name: String,
}

impl Lap {
    /// # filter the valid laps
    /// keep only the laps the timekeeper marked as valid
    ///
    /// ## Arguments
    /// * `laps` - The laps to filter
    ///
    /// ## Returns
    /// * `Vec<Lap>` - The valid laps
    pub fn filter_valid(laps: &[Lap]) -> Vec<Lap> {
        laps.iter()
            .filter(|lap| lap.is_valid)
            .cloned()
            .collect()
    }

    /// # get the stats of the laps
    /// get the stats of the laps passed to the function.
    /// returns None when the list is empty
    ///
    /// ## Arguments
    /// * `laps` - The laps to get the stats for
    ///
    /// ## Returns
    /// * `Option<LapsStats>` - The stats of the laps
    pub fn get_stats_of_laps(laps: &[Lap]) -> Option<LapsStats> {
        if laps.is_empty() {
            return None;
        }

        let mut fastest_lap_time = i64::MAX;
        let mut lap_times: Vec<f64> = Vec::new();
        for lap in laps {
            if lap.time < fastest_lap_time {
                fastest_lap_time = lap.time;
            }

            lap_times.push(lap.time as f64);
        }

        Some(LapsStats {
            avg_lap_time: Math::mean(&lap_times),
            median_lap_time: Math::median(&lap_times),
            standard_deviation: Math::standard_deviation(&lap_times),
            fastest_lap_time,
        })
    }
}

#[derive(Clone, Serialize, Deserialize, Debug)]
pub struct LapsStats {
    pub avg_lap_time: f64,
    pub median_lap_time: f64,
    pub standard_deviation: f64,
    pub fastest_lap_time: i64,
}
