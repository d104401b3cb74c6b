use std::env;
use dotenvy::dotenv;

use crate::modules::models::average_window::DEFAULT_WINDOW_SIZE;

/// how long a race summary stays on screen before it expires, in ms
pub const DEFAULT_SUMMARY_DISPLAY_MS: i64 = 12000;

/// runtime settings for the engine and the timekeeping tools, read from the
/// environment with sane fallbacks
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// amount of consecutive laps in an average window
    pub window_size: usize,
    /// display lifetime of a race summary in milliseconds
    pub summary_display_ms: i64,
}

impl EngineConfig {
    pub fn from_env() -> EngineConfig {
        dotenv().ok();

        let window_size = env::var("AVERAGE_WINDOW_SIZE")
            .ok()
            .and_then(|value| value.parse::<usize>().ok())
            .filter(|size| *size > 0)
            .unwrap_or(DEFAULT_WINDOW_SIZE);

        let summary_display_ms = env::var("SUMMARY_DISPLAY_MS")
            .ok()
            .and_then(|value| value.parse::<i64>().ok())
            .filter(|ms| *ms > 0)
            .unwrap_or(DEFAULT_SUMMARY_DISPLAY_MS);

        EngineConfig {
            window_size,
            summary_display_ms,
        }
    }
}

impl Default for EngineConfig {
    fn default() -> EngineConfig {
        EngineConfig {
            window_size: DEFAULT_WINDOW_SIZE,
            summary_display_ms: DEFAULT_SUMMARY_DISPLAY_MS,
        }
    }
}
