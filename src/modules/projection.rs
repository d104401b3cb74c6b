use log::warn;

use crate::errors::{CustomResult, Error};
use crate::modules::helpers::ranking::{RaceFormat, Ranking};
use crate::modules::models::entry::LeaderboardEntry;
use crate::modules::models::scope::ReconciliationScope;

/// the ranks an upsert produced: where the entry sits now and where it sat
/// before the operation, if it was already on the board
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpsertOutcome {
    /// 1-based rank after the operation
    pub rank: usize,
    /// 1-based rank before the operation, None for a first-time entrant
    pub prior_rank: Option<usize>,
}

/// the current ranked list of entries for one reconciliation scope.
///
/// the list is kept sorted for the active race format after every mutation
/// and holds at most one entry per username. mutations are applied one
/// event at a time in arrival order; the engine never batches them.
pub struct LeaderboardProjection {
    scope: ReconciliationScope,
    format: RaceFormat,
    entries: Vec<LeaderboardEntry>,
}

impl LeaderboardProjection {
    pub fn new(scope: ReconciliationScope, format: RaceFormat) -> LeaderboardProjection {
        LeaderboardProjection {
            scope,
            format,
            entries: Vec::new(),
        }
    }

    pub fn scope(&self) -> &ReconciliationScope {
        &self.scope
    }

    pub fn format(&self) -> RaceFormat {
        self.format
    }

    /// switch the active race format and re-rank the board for it
    pub fn set_format(&mut self, format: RaceFormat) {
        self.format = format;
        self.sort();
    }

    /// the current ordering, best entry first
    pub fn entries(&self) -> &[LeaderboardEntry] {
        &self.entries
    }

    /// 1-based rank of a username in the current ordering
    pub fn rank_of(&self, username: &str) -> Option<usize> {
        self.entries
            .iter()
            .position(|entry| entry.username == username)
            .map(|index| index + 1)
    }

    /// # replace the board with a fresh snapshot
    /// entries are folded in one by one through `apply_upsert` in the
    /// snapshot's given order, so the combined-track merge rule applies
    /// uniformly to snapshot data and live events. malformed entries are
    /// skipped with a warning.
    ///
    /// ## Arguments
    /// * `entries` - The snapshot entries, in the order the transport gave them
    pub fn apply_snapshot(&mut self, entries: Vec<LeaderboardEntry>) {
        self.entries.clear();
        for entry in entries {
            if let Err(error) = self.apply_upsert(entry) {
                warn!(target: "modules/projection:apply_snapshot", "skipping snapshot entry: {}", error);
            }
        }
    }

    /// # insert or replace one entry
    /// locates the entry with the same username. outside the combined scope
    /// the incoming entry always wins. under the combined scope a result
    /// from a different source track only wins when the stored one is not
    /// strictly faster, so a slower cross-track result can never overwrite
    /// a faster one. the board is re-sorted afterwards with a stable sort.
    ///
    /// ## Arguments
    /// * `entry` - The incoming entry, replacing any stored one wholesale
    ///
    /// ## Returns
    /// * `UpsertOutcome` - The entry's new rank and its rank before the operation
    pub fn apply_upsert(&mut self, entry: LeaderboardEntry) -> CustomResult<UpsertOutcome> {
        if entry.username.is_empty() {
            return Err(Error::MissingUsernameError);
        }

        let username = entry.username.clone();
        let existing_index = self
            .entries
            .iter()
            .position(|stored| stored.username == username);
        let prior_rank = existing_index.map(|index| index + 1);

        match existing_index {
            Some(index) => {
                if !self.keep_existing(&self.entries[index], &entry) {
                    self.entries[index] = entry;
                }
            }
            None => self.entries.push(entry),
        }

        self.sort();

        let rank = self
            .rank_of(&username)
            .expect("upserted entry is always on the board");

        Ok(UpsertOutcome { rank, prior_rank })
    }

    /// # remove one entry
    /// removes the entry with the given username. deleting a username that
    /// is not on the board is a no-op; the remaining entries keep their
    /// order and shift up implicitly.
    ///
    /// ## Arguments
    /// * `username` - The username to remove
    pub fn apply_delete(&mut self, username: &str) {
        self.entries.retain(|entry| entry.username != username);
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// combined-scope merge rule: keep the stored entry when the incoming
    /// result comes from a different track and the stored one is strictly
    /// faster on raw lap time
    fn keep_existing(&self, stored: &LeaderboardEntry, incoming: &LeaderboardEntry) -> bool {
        if !self.scope.is_combined() || stored.track_id == incoming.track_id {
            return false;
        }

        match (stored.fastest_lap_time, incoming.fastest_lap_time) {
            (Some(stored_time), Some(incoming_time)) => stored_time < incoming_time,
            // a stored result with a lap beats an incoming one without
            (Some(_), None) => true,
            _ => false,
        }
    }

    fn sort(&mut self) {
        let format = self.format;
        // Vec::sort_by is stable: tied entries keep their prior relative order
        self.entries.sort_by(|a, b| Ranking::compare(a, b, format));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::modules::models::scope::COMBINED_TRACK;

    fn entry(username: &str, track_id: &str, fastest: Option<i64>) -> LeaderboardEntry {
        LeaderboardEntry {
            username: username.to_string(),
            event_id: "summer-gp".to_string(),
            track_id: track_id.to_string(),
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

    fn track_projection() -> LeaderboardProjection {
        LeaderboardProjection::new(
            ReconciliationScope::new("summer-gp", "track-A"),
            RaceFormat::Fastest,
        )
    }

    fn combined_projection() -> LeaderboardProjection {
        LeaderboardProjection::new(
            ReconciliationScope::new("summer-gp", COMBINED_TRACK),
            RaceFormat::Fastest,
        )
    }

    fn usernames(projection: &LeaderboardProjection) -> Vec<&str> {
        projection
            .entries()
            .iter()
            .map(|entry| entry.username.as_str())
            .collect()
    }

    #[test]
    fn upserts_keep_the_board_sorted() {
        let mut projection = track_projection();
        projection.apply_upsert(entry("carol", "track-A", Some(22000))).unwrap();
        projection.apply_upsert(entry("alice", "track-A", Some(20000))).unwrap();
        projection.apply_upsert(entry("bob", "track-A", Some(21000))).unwrap();

        assert_eq!(usernames(&projection), vec!["alice", "bob", "carol"]);
    }

    #[test]
    fn upsert_reports_new_and_prior_rank() {
        let mut projection = track_projection();
        projection.apply_upsert(entry("alice", "track-A", Some(10000))).unwrap();
        let outcome = projection
            .apply_upsert(entry("bob", "track-A", Some(12000)))
            .unwrap();
        assert_eq!(outcome, UpsertOutcome { rank: 2, prior_rank: None });

        // bob improves past alice
        let outcome = projection
            .apply_upsert(entry("bob", "track-A", Some(9000)))
            .unwrap();
        assert_eq!(
            outcome,
            UpsertOutcome {
                rank: 1,
                prior_rank: Some(2)
            }
        );
        assert_eq!(usernames(&projection), vec!["bob", "alice"]);
    }

    #[test]
    fn one_entry_per_username() {
        let mut projection = track_projection();
        for time in [22000, 21000, 23000] {
            projection.apply_upsert(entry("alice", "track-A", Some(time))).unwrap();
        }

        assert_eq!(projection.entries().len(), 1);
        assert_eq!(projection.entries()[0].fastest_lap_time, Some(23000));
    }

    #[test]
    fn empty_username_is_rejected_without_touching_state() {
        let mut projection = track_projection();
        projection.apply_upsert(entry("alice", "track-A", Some(20000))).unwrap();

        let result = projection.apply_upsert(entry("", "track-A", Some(1)));
        assert!(matches!(result, Err(Error::MissingUsernameError)));
        assert_eq!(usernames(&projection), vec!["alice"]);
    }

    #[test]
    fn combined_scope_keeps_the_faster_cross_track_result() {
        let mut projection = combined_projection();
        projection.apply_upsert(entry("alice", "track-A", Some(20000))).unwrap();

        // a slower result from another track must not overwrite the stored one
        let outcome = projection
            .apply_upsert(entry("alice", "track-B", Some(25000)))
            .unwrap();
        assert_eq!(outcome.rank, 1);
        assert_eq!(outcome.prior_rank, Some(1));
        assert_eq!(projection.entries()[0].track_id, "track-A");
        assert_eq!(projection.entries()[0].fastest_lap_time, Some(20000));
    }

    #[test]
    fn combined_scope_takes_the_faster_cross_track_result() {
        let mut projection = combined_projection();
        projection.apply_upsert(entry("alice", "track-A", Some(25000))).unwrap();
        projection.apply_upsert(entry("alice", "track-B", Some(20000))).unwrap();

        assert_eq!(projection.entries()[0].track_id, "track-B");
        assert_eq!(projection.entries()[0].fastest_lap_time, Some(20000));
    }

    #[test]
    fn combined_scope_same_track_always_replaces() {
        let mut projection = combined_projection();
        projection.apply_upsert(entry("alice", "track-A", Some(20000))).unwrap();
        projection.apply_upsert(entry("alice", "track-A", Some(25000))).unwrap();

        assert_eq!(projection.entries()[0].fastest_lap_time, Some(25000));
    }

    #[test]
    fn physical_scope_never_merges() {
        let mut projection = track_projection();
        projection.apply_upsert(entry("alice", "track-A", Some(20000))).unwrap();
        projection.apply_upsert(entry("alice", "track-B", Some(25000))).unwrap();

        assert_eq!(projection.entries()[0].fastest_lap_time, Some(25000));
    }

    #[test]
    fn snapshot_folds_through_the_merge_rule() {
        let mut projection = combined_projection();
        projection.apply_snapshot(vec![
            entry("alice", "track-A", Some(20000)),
            entry("bob", "track-A", Some(21000)),
            entry("alice", "track-B", Some(25000)),
        ]);

        assert_eq!(usernames(&projection), vec!["alice", "bob"]);
        assert_eq!(projection.entries()[0].track_id, "track-A");
    }

    #[test]
    fn snapshot_replaces_previous_contents() {
        let mut projection = track_projection();
        projection.apply_upsert(entry("old", "track-A", Some(1000))).unwrap();
        projection.apply_snapshot(vec![entry("new", "track-A", Some(2000))]);

        assert_eq!(usernames(&projection), vec!["new"]);
    }

    #[test]
    fn delete_is_idempotent() {
        let mut projection = track_projection();
        projection.apply_upsert(entry("alice", "track-A", Some(20000))).unwrap();

        projection.apply_delete("nobody");
        assert_eq!(usernames(&projection), vec!["alice"]);

        projection.apply_delete("alice");
        projection.apply_delete("alice");
        assert!(projection.entries().is_empty());
    }

    #[test]
    fn tied_entries_keep_their_prior_order() {
        let mut projection = track_projection();
        projection.apply_upsert(entry("first", "track-A", Some(20000))).unwrap();
        projection.apply_upsert(entry("second", "track-A", Some(20000))).unwrap();
        projection.apply_upsert(entry("third", "track-A", Some(20000))).unwrap();

        assert_eq!(usernames(&projection), vec!["first", "second", "third"]);

        // an unrelated re-sort must not shuffle the tie
        projection.apply_upsert(entry("slow", "track-A", Some(30000))).unwrap();
        assert_eq!(usernames(&projection), vec!["first", "second", "third", "slow"]);
    }

    #[test]
    fn format_switch_re_ranks_the_board() {
        use crate::modules::models::average_window::AverageWindow;

        let mut projection = track_projection();
        let mut fast_single = entry("single", "track-A", Some(19000));
        fast_single.fastest_average_lap = None;
        let mut consistent = entry("consistent", "track-A", Some(20000));
        consistent.fastest_average_lap = Some(AverageWindow {
            start_lap_id: 1,
            end_lap_id: 3,
            avg_time: 20500,
            dnf: false,
        });

        projection.apply_upsert(fast_single).unwrap();
        projection.apply_upsert(consistent).unwrap();
        assert_eq!(usernames(&projection), vec!["single", "consistent"]);

        projection.set_format(RaceFormat::Average);
        // the entry without an average window drops behind the one with one
        assert_eq!(usernames(&projection), vec!["consistent", "single"]);
    }
}
