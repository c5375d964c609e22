use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

use tracing::debug;

use crate::match_record::MatchRecord;
use crate::team_stats::{TeamSnapshot, aggregate};

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct SnapshotKey {
    team: String,
    league: String,
    finished: usize,
}

/// Memoized team snapshots keyed by how many finished matches they cover.
///
/// Entries are never mutated: a history with one more finished match maps to a
/// new key, so readers only ever see complete snapshots.
#[derive(Debug, Default)]
pub struct SnapshotCache {
    entries: RwLock<HashMap<SnapshotKey, Arc<TeamSnapshot>>>,
}

impl SnapshotCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get_or_aggregate(
        &self,
        team: &str,
        league: &str,
        matches: &[MatchRecord],
    ) -> Arc<TeamSnapshot> {
        let finished = matches
            .iter()
            .filter(|m| m.is_finished() && m.league == league && m.involves(team))
            .count();
        let key = SnapshotKey {
            team: team.to_string(),
            league: league.to_string(),
            finished,
        };

        {
            let guard = self.entries.read().unwrap_or_else(PoisonError::into_inner);
            if let Some(hit) = guard.get(&key) {
                debug!(team, league, finished, "snapshot cache hit");
                return Arc::clone(hit);
            }
        }

        debug!(team, league, finished, "snapshot cache miss");
        let snapshot = Arc::new(aggregate(team, league, matches));
        let mut guard = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        // Another writer may have filled the slot meanwhile; both values are equal.
        Arc::clone(guard.entry(key).or_insert(snapshot))
    }

    pub fn len(&self) -> usize {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        self.entries
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::match_record::MatchState;

    fn finished(round: u32, hg: u32, ag: u32) -> MatchRecord {
        let mut m = MatchRecord::new("Liga", round, "A", "B");
        m.home_goals = Some(hg);
        m.away_goals = Some(ag);
        m.state = MatchState::Finished;
        m
    }

    #[test]
    fn reuses_entry_until_history_grows() {
        let cache = SnapshotCache::new();
        let mut matches = vec![finished(1, 1, 0)];
        let first = cache.get_or_aggregate("A", "Liga", &matches);
        let again = cache.get_or_aggregate("A", "Liga", &matches);
        assert!(Arc::ptr_eq(&first, &again));

        matches.push(finished(2, 0, 0));
        let grown = cache.get_or_aggregate("A", "Liga", &matches);
        assert_eq!(grown.played, 2);
        assert_eq!(first.played, 1);
        assert_eq!(cache.len(), 2);

        cache.clear();
        assert!(cache.is_empty());
    }
}
