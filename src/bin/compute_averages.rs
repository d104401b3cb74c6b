use std::env;
use std::fs;

use dotenvy::dotenv;
use log::error;

use live_leaderboard::errors::{CustomResult, Error};
use live_leaderboard::modules::config::EngineConfig;
use live_leaderboard::modules::helpers::logging::setup_logging;
use live_leaderboard::modules::models::average_window::AverageWindow;
use live_leaderboard::modules::models::lap::Lap;

/// timekeeping-side tool: read an ordered lap list from a json file and
/// print the lap stats and every valid average window, plus the fastest
/// one a racer can be ranked on
fn load_laps(path: &str) -> CustomResult<Vec<Lap>> {
    let contents = fs::read_to_string(path).map_err(|_| Error::FileDoesNotExistError {
        path: path.to_string(),
    })?;

    serde_json::from_str(&contents).map_err(|error| Error::MalformedFeedFileError {
        message: error.to_string(),
    })
}

fn main() {
    dotenv().ok();
    setup_logging().expect("failed to setup logging");

    let path = env::args().nth(1).unwrap_or_else(|| "./laps.json".to_string());
    let laps = match load_laps(&path) {
        Ok(laps) => laps,
        Err(Error::FileDoesNotExistError { path }) => {
            error!(target: "compute_averages", "lap file does not exist: {}", path);
            return;
        }
        Err(error) => {
            error!(target: "compute_averages", "could not load lap file: {}", error);
            return;
        }
    };

    let config = EngineConfig::from_env();

    let valid_laps = Lap::filter_valid(&laps);
    println!(
        "{} laps recorded, {} valid",
        laps.len(),
        valid_laps.len()
    );

    if let Some(stats) = Lap::get_stats_of_laps(&valid_laps) {
        println!(
            "valid laps: fastest {} ms, avg {:.1} ms, median {:.1} ms, stddev {:.1} ms",
            stats.fastest_lap_time,
            stats.avg_lap_time,
            stats.median_lap_time,
            stats.standard_deviation,
        );
    }

    let windows = AverageWindow::compute(&laps, config.window_size);
    println!(
        "{} valid window(s) of {} consecutive laps:",
        windows.len(),
        config.window_size
    );
    for window in &windows {
        println!(
            "  laps {:>3} - {:>3}: avg {} ms",
            window.start_lap_id, window.end_lap_id, window.avg_time
        );
    }

    let fastest = AverageWindow::fastest_of(&windows);
    if fastest.dnf {
        println!("no fully valid window driven: DNF");
    } else {
        println!(
            "fastest average: {} ms over laps {} - {}",
            fastest.avg_time, fastest.start_lap_id, fastest.end_lap_id
        );
    }
}
