//! The re-classifier ends a match two hours after kickoff; ingestion treats a
//! scraped result as in progress for three. Both live in [`LifecycleWindows`].

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::match_record::{MatchRecord, MatchState, ScoreLine};

pub const DEFAULT_MATCH_WINDOW_MINS: i64 = 120;
pub const DEFAULT_INGEST_WINDOW_MINS: i64 = 180;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LifecycleWindows {
    pub match_window: Duration,
    pub ingest_window: Duration,
}

impl Default for LifecycleWindows {
    fn default() -> Self {
        Self::from_minutes(DEFAULT_MATCH_WINDOW_MINS, DEFAULT_INGEST_WINDOW_MINS)
    }
}

impl LifecycleWindows {
    pub fn from_minutes(match_window: i64, ingest_window: i64) -> Self {
        Self {
            match_window: Duration::minutes(match_window),
            ingest_window: Duration::minutes(ingest_window),
        }
    }
}

/// State of a match at `now` with the default two-hour match window.
pub fn classify_state(
    kickoff: Option<DateTime<Utc>>,
    live_signal: bool,
    now: DateTime<Utc>,
) -> MatchState {
    classify_state_with(kickoff, live_signal, now, &LifecycleWindows::default())
}

pub fn classify_state_with(
    kickoff: Option<DateTime<Utc>>,
    live_signal: bool,
    now: DateTime<Utc>,
    windows: &LifecycleWindows,
) -> MatchState {
    if live_signal {
        return MatchState::Live;
    }
    let Some(kickoff) = kickoff else {
        return MatchState::Scheduled;
    };
    if now < kickoff {
        return MatchState::Scheduled;
    }
    if now - kickoff < windows.match_window {
        MatchState::Live
    } else {
        MatchState::Finished
    }
}

/// Initial state for a freshly scraped row. A live signal wins; a result with
/// no signal counts as in progress only inside the ingestion window.
pub fn classify_ingested(
    kickoff: Option<DateTime<Utc>>,
    live_signal: bool,
    score: Option<ScoreLine>,
    now: DateTime<Utc>,
    windows: &LifecycleWindows,
) -> (MatchState, Option<ScoreLine>) {
    match (score, live_signal) {
        (Some(score), true) => (MatchState::Live, Some(score)),
        (Some(score), false) => {
            let in_progress = kickoff
                .map(|k| now > k && now - k < windows.ingest_window)
                .unwrap_or(false);
            if in_progress {
                (MatchState::Live, Some(score))
            } else {
                (MatchState::Finished, Some(score))
            }
        }
        (None, true) => (MatchState::Live, Some(ScoreLine::new(0, 0))),
        (None, false) => (MatchState::Scheduled, None),
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Transition {
    pub id: Option<i64>,
    pub label: String,
    pub from: MatchState,
    pub to: MatchState,
}

/// Move a stored record forward. Finished and suspended matches never change,
/// nothing moves backwards, and only a live match can finish.
pub fn advance(
    record: &mut MatchRecord,
    live_signal: bool,
    now: DateTime<Utc>,
    windows: &LifecycleWindows,
) -> Option<Transition> {
    let from = record.state;
    if matches!(from, MatchState::Finished | MatchState::Suspended) {
        return None;
    }

    let target = classify_state_with(record.kickoff, live_signal, now, windows);
    let to = match (from, target) {
        (MatchState::Scheduled, MatchState::Live) => {
            record.home_goals.get_or_insert(0);
            record.away_goals.get_or_insert(0);
            MatchState::Live
        }
        (MatchState::Live, MatchState::Finished) => {
            if record.score().is_none() {
                warn!(
                    match_label = %record.label(),
                    "kickoff window passed without a result, state kept"
                );
                return None;
            }
            MatchState::Finished
        }
        (MatchState::Scheduled, MatchState::Finished) => {
            warn!(
                match_label = %record.label(),
                "kickoff window passed before the match was seen live, state kept"
            );
            return None;
        }
        _ => return None,
    };

    record.state = to;
    let transition = Transition {
        id: record.id,
        label: record.label(),
        from,
        to,
    };
    info!(
        match_label = %transition.label,
        from = %from,
        to = %to,
        "match state advanced"
    );
    Some(transition)
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ReclassifySummary {
    pub went_live: usize,
    pub finished: usize,
    pub transitions: Vec<Transition>,
}

/// Periodic pass over stored records. Stored rows carry no live signal.
pub fn reclassify_all(
    records: &mut [MatchRecord],
    now: DateTime<Utc>,
    windows: &LifecycleWindows,
) -> ReclassifySummary {
    let mut summary = ReclassifySummary::default();
    for record in records.iter_mut() {
        if let Some(t) = advance(record, false, now, windows) {
            match t.to {
                MatchState::Live => summary.went_live += 1,
                MatchState::Finished => summary.finished += 1,
                _ => {}
            }
            summary.transitions.push(t);
        }
    }
    debug!(
        live = summary.went_live,
        finished = summary.finished,
        "reclassify pass complete"
    );
    summary
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn kickoff() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 10, 5, 16, 0, 0).unwrap()
    }

    #[test]
    fn ninety_minutes_is_live_and_130_is_finished() {
        let k = kickoff();
        assert_eq!(
            classify_state(Some(k), false, k + Duration::minutes(90)),
            MatchState::Live
        );
        assert_eq!(
            classify_state(Some(k), false, k + Duration::minutes(130)),
            MatchState::Finished
        );
    }

    #[test]
    fn future_or_unknown_kickoff_is_scheduled_unless_live() {
        let k = kickoff();
        assert_eq!(
            classify_state(Some(k), false, k - Duration::minutes(1)),
            MatchState::Scheduled
        );
        assert_eq!(classify_state(None, false, k), MatchState::Scheduled);
        assert_eq!(
            classify_state(Some(k), true, k - Duration::hours(5)),
            MatchState::Live
        );
        assert_eq!(
            classify_state(Some(k), true, k + Duration::hours(5)),
            MatchState::Live
        );
    }

    #[test]
    fn classify_never_regresses_over_time() {
        let k = kickoff();
        let rank = |s: MatchState| match s {
            MatchState::Scheduled => 0,
            MatchState::Live => 1,
            _ => 2,
        };
        let mut last = 0;
        for minutes in (-60..300).step_by(10) {
            let state = classify_state(Some(k), false, k + Duration::minutes(minutes));
            assert!(rank(state) >= last);
            last = rank(state);
        }
    }

    #[test]
    fn ingestion_uses_its_own_window() {
        let k = kickoff();
        let w = LifecycleWindows::default();
        let score = Some(ScoreLine::new(1, 0));
        assert_eq!(
            classify_ingested(Some(k), false, score, k + Duration::minutes(150), &w).0,
            MatchState::Live
        );
        assert_eq!(
            classify_ingested(Some(k), false, score, k + Duration::minutes(200), &w).0,
            MatchState::Finished
        );
        assert_eq!(
            classify_ingested(None, false, score, k, &w).0,
            MatchState::Finished
        );
        assert_eq!(
            classify_ingested(Some(k), true, None, k, &w),
            (MatchState::Live, Some(ScoreLine::new(0, 0)))
        );
        assert_eq!(
            classify_ingested(Some(k), false, None, k, &w),
            (MatchState::Scheduled, None)
        );
    }

    #[test]
    fn advance_defaults_goals_then_finishes() {
        let k = kickoff();
        let w = LifecycleWindows::default();
        let mut m = MatchRecord::new("Liga", 7, "A", "B");
        m.kickoff = Some(k);

        let t = advance(&mut m, false, k + Duration::minutes(30), &w).unwrap();
        assert_eq!((t.from, t.to), (MatchState::Scheduled, MatchState::Live));
        assert_eq!(m.score(), Some(ScoreLine::new(0, 0)));

        m.home_goals = Some(2);
        let t = advance(&mut m, false, k + Duration::minutes(125), &w).unwrap();
        assert_eq!(t.to, MatchState::Finished);
        assert_eq!(m.score(), Some(ScoreLine::new(2, 0)));

        assert!(advance(&mut m, true, k + Duration::minutes(200), &w).is_none());
        assert_eq!(m.state, MatchState::Finished);
    }

    #[test]
    fn scheduled_match_with_score_does_not_jump_to_finished() {
        let k = kickoff();
        let mut m = MatchRecord::new("Liga", 8, "A", "B");
        m.kickoff = Some(k);
        m.home_goals = Some(0);
        m.away_goals = Some(0);
        assert!(advance(&mut m, false, k + Duration::minutes(130), &LifecycleWindows::default()).is_none());
        assert_eq!(m.state, MatchState::Scheduled);
    }

    #[test]
    fn stale_scheduled_match_without_result_stays_put() {
        let k = kickoff();
        let mut records = vec![MatchRecord::new("Liga", 1, "A", "B"), MatchRecord::new("Liga", 1, "C", "D")];
        records[0].kickoff = Some(k);
        records[1].kickoff = Some(k + Duration::minutes(100));
        let summary = reclassify_all(&mut records, k + Duration::minutes(150), &LifecycleWindows::default());
        assert_eq!(summary.went_live, 1);
        assert_eq!(summary.finished, 0);
        assert_eq!(records[0].state, MatchState::Scheduled);
        assert_eq!(records[1].state, MatchState::Live);
    }
}
