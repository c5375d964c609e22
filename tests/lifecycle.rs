use chrono::{DateTime, Duration, TimeZone, Utc};
use rusqlite::Connection;

use football_forecast::accuracy::{forecast_for_match, record_prediction};
use football_forecast::history_store;
use football_forecast::ingest::{ScrapedMatch, ingest_rows};
use football_forecast::lifecycle::{
    LifecycleWindows, advance, classify_ingested, classify_state, classify_state_with,
    reclassify_all,
};
use football_forecast::match_record::{MatchRecord, MatchState, ScoreLine};

fn kickoff() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 3, 1, 20, 0, 0).unwrap()
}

fn stored(state: MatchState) -> MatchRecord {
    let mut m = MatchRecord::new("Liga", 20, "Home", "Away");
    m.id = Some(42);
    m.kickoff = Some(kickoff());
    m.state = state;
    m
}

#[test]
fn match_day_timeline() {
    let k = kickoff();
    assert_eq!(classify_state(Some(k), false, k - Duration::minutes(5)), MatchState::Scheduled);
    assert_eq!(classify_state(Some(k), false, k), MatchState::Live);
    assert_eq!(classify_state(Some(k), false, k + Duration::minutes(119)), MatchState::Live);
    assert_eq!(classify_state(Some(k), false, k + Duration::minutes(120)), MatchState::Finished);
    assert_eq!(classify_state(None, false, k), MatchState::Scheduled);
    assert_eq!(classify_state(None, true, k), MatchState::Live);
}

#[test]
fn ingest_window_is_longer_unless_configured_equal() {
    let k = kickoff();
    let now = k + Duration::minutes(150);
    let score = Some(ScoreLine::new(2, 0));

    let (state, _) = classify_ingested(Some(k), false, score, now, &LifecycleWindows::default());
    assert_eq!(state, MatchState::Live);
    assert_eq!(
        classify_state_with(Some(k), false, now, &LifecycleWindows::default()),
        MatchState::Finished
    );

    let equal = LifecycleWindows::from_minutes(120, 120);
    let (state, kept) = classify_ingested(Some(k), false, score, now, &equal);
    assert_eq!(state, MatchState::Finished);
    assert_eq!(kept, score);
}

#[test]
fn stored_match_walks_forward_once() {
    let k = kickoff();
    let windows = LifecycleWindows::default();
    let mut record = stored(MatchState::Scheduled);

    let t = advance(&mut record, false, k + Duration::minutes(30), &windows).unwrap();
    assert_eq!((t.from, t.to), (MatchState::Scheduled, MatchState::Live));
    assert_eq!(record.score(), Some(ScoreLine::new(0, 0)));
    assert!(advance(&mut record, false, k + Duration::minutes(60), &windows).is_none());

    record.home_goals = Some(1);
    let t = advance(&mut record, false, k + Duration::minutes(130), &windows).unwrap();
    assert_eq!(t.to, MatchState::Finished);
    assert!(advance(&mut record, true, k + Duration::days(1), &windows).is_none());
    assert_eq!(record.state, MatchState::Finished);
}

#[test]
fn stale_match_without_result_is_left_alone() {
    let mut record = stored(MatchState::Scheduled);
    let later = kickoff() + Duration::hours(5);
    assert!(advance(&mut record, false, later, &LifecycleWindows::default()).is_none());
    assert_eq!(record.state, MatchState::Scheduled);

    let mut suspended = stored(MatchState::Suspended);
    assert!(advance(&mut suspended, true, later, &LifecycleWindows::default()).is_none());
}

#[test]
fn rescrape_without_result_does_not_undo_live() {
    let k = kickoff();
    let windows = LifecycleWindows::default();
    let row = ScrapedMatch {
        league: "Liga".to_string(),
        round: 21,
        home_team: "Home".to_string(),
        away_team: "Away".to_string(),
        kickoff: Some(k.to_rfc3339()),
        result: Some("-:-".to_string()),
        status: None,
    };

    let mut conn = Connection::open_in_memory().unwrap();
    history_store::init_schema(&conn).unwrap();
    let batch = ingest_rows(std::slice::from_ref(&row), k - Duration::hours(1), &windows);
    history_store::upsert_matches(&mut conn, &batch.records).unwrap();

    let mut stored = history_store::load_league(&conn, "Liga").unwrap();
    let summary = reclassify_all(&mut stored, k + Duration::minutes(30), &windows);
    assert_eq!(summary.went_live, 1);
    history_store::save_state(&conn, &stored[0]).unwrap();

    // Same placeholder row, no live marker, scraped mid-match.
    let batch = ingest_rows(std::slice::from_ref(&row), k + Duration::minutes(40), &windows);
    assert_eq!(batch.records[0].state, MatchState::Scheduled);
    history_store::upsert_matches(&mut conn, &batch.records).unwrap();

    let mut stored = history_store::load_league(&conn, "Liga").unwrap();
    assert_eq!(stored[0].state, MatchState::Live);
    assert_eq!(stored[0].score(), Some(ScoreLine::new(0, 0)));
    let f = forecast_for_match(&stored[0], &stored, 5);
    assert_eq!(record_prediction(&stored[0], &f), None);

    let summary = reclassify_all(&mut stored, k + Duration::minutes(130), &windows);
    assert_eq!(summary.finished, 1);
    assert_eq!(summary.transitions[0].from, MatchState::Live);
}

#[test]
fn scheduled_record_never_skips_live() {
    let mut record = stored(MatchState::Scheduled);
    record.home_goals = Some(0);
    record.away_goals = Some(0);
    let later = kickoff() + Duration::minutes(130);
    assert!(advance(&mut record, false, later, &LifecycleWindows::default()).is_none());
    assert_eq!(record.state, MatchState::Scheduled);
}
