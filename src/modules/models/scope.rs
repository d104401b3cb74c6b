use std::fmt;

use serde::{Deserialize, Serialize};

/// virtual track id meaning "union across all tracks of the event"
pub const COMBINED_TRACK: &str = "combined";

/// the (event, track) pair the engine is currently subscribed to
#[derive(Serialize, Deserialize, PartialEq, Eq, Debug, Clone)]
pub struct ReconciliationScope {
    pub event_id: String,
    pub track_id: String,
}

impl ReconciliationScope {
    pub fn new(event_id: &str, track_id: &str) -> ReconciliationScope {
        ReconciliationScope {
            event_id: event_id.to_string(),
            track_id: track_id.to_string(),
        }
    }

    pub fn is_combined(&self) -> bool {
        self.track_id == COMBINED_TRACK
    }

    /// the track id to hand the transport layer. the combined scope
    /// subscribes without a track filter so events of every track arrive
    /// and the merge rule can pick between them.
    pub fn effective_track_id(&self) -> Option<&str> {
        if self.is_combined() {
            None
        } else {
            Some(&self.track_id)
        }
    }
}

impl fmt::Display for ReconciliationScope {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}/{}", self.event_id, self.track_id)
    }
}
