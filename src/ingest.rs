use anyhow::{Context, Result};
use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::ForecastError;
use crate::lifecycle::{LifecycleWindows, classify_ingested};
use crate::match_record::{MatchRecord, ScoreLine};

const LIVE_MARKERS: &[&str] = &["live", "playing", "in_progress"];

/// One row as delivered by the scraper.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ScrapedMatch {
    pub league: String,
    pub round: u32,
    pub home_team: String,
    pub away_team: String,
    #[serde(default)]
    pub kickoff: Option<String>,
    /// Result cell text, e.g. `"2:1"` or the placeholder `"-:-"`.
    #[serde(default)]
    pub result: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
}

impl ScrapedMatch {
    pub fn live_signal(&self) -> bool {
        self.status.as_deref().is_some_and(is_live_status)
    }

    pub fn to_record(
        &self,
        now: DateTime<Utc>,
        windows: &LifecycleWindows,
    ) -> Result<MatchRecord, ForecastError> {
        let home = self.home_team.trim();
        let away = self.away_team.trim();
        let label = format!("{home} vs {away}");
        if home.is_empty() || away.is_empty() {
            return Err(ForecastError::malformed(label, "missing team name"));
        }
        if home == away {
            return Err(ForecastError::malformed(label, "team plays itself"));
        }

        let kickoff = match self.kickoff.as_deref().map(str::trim) {
            None | Some("") => None,
            Some(raw) => Some(
                parse_kickoff(raw)
                    .ok_or_else(|| ForecastError::malformed(&label, format!("bad kickoff {raw:?}")))?,
            ),
        };
        let score = self.result.as_deref().and_then(parse_result_text);
        let (state, score) = classify_ingested(kickoff, self.live_signal(), score, now, windows);

        let mut record = MatchRecord::new(self.league.trim(), self.round, home, away);
        record.kickoff = kickoff;
        record.state = state;
        record.home_goals = score.map(|s| s.home);
        record.away_goals = score.map(|s| s.away);
        Ok(record)
    }
}

pub fn is_live_status(status: &str) -> bool {
    let lowered = status.to_ascii_lowercase();
    LIVE_MARKERS.iter().any(|marker| lowered.contains(marker))
}

/// `None` when no result exists yet: empty text, the `-:-` placeholder, or
/// anything that is not two numbers around a colon.
pub fn parse_result_text(raw: &str) -> Option<ScoreLine> {
    let trimmed = raw.trim();
    if trimmed == "-:-" || !trimmed.contains(':') {
        return None;
    }
    trimmed.parse::<ScoreLine>().ok()
}

/// RFC 3339, or a naive `YYYY-MM-DD HH:MM[:SS]` read as UTC.
pub fn parse_kickoff(raw: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    ["%Y-%m-%d %H:%M:%S", "%Y-%m-%d %H:%M", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%dT%H:%M"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
        .map(|naive| naive.and_utc())
}

pub fn parse_rows(json: &str) -> Result<Vec<ScrapedMatch>> {
    serde_json::from_str(json).context("decode scraped match rows")
}

#[derive(Debug, Default)]
pub struct IngestBatch {
    pub records: Vec<MatchRecord>,
    pub rejected: Vec<String>,
}

pub fn ingest_rows(
    rows: &[ScrapedMatch],
    now: DateTime<Utc>,
    windows: &LifecycleWindows,
) -> IngestBatch {
    let mut batch = IngestBatch::default();
    for row in rows {
        match row.to_record(now, windows) {
            Ok(record) => {
                debug!(match_label = %record.label(), state = %record.state, "row classified");
                batch.records.push(record);
            }
            Err(err) => {
                warn!(error = %err, "rejecting scraped row");
                batch.rejected.push(err.to_string());
            }
        }
    }
    batch
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::match_record::MatchState;
    use chrono::TimeZone;

    fn row(result: Option<&str>, status: Option<&str>) -> ScrapedMatch {
        ScrapedMatch {
            league: "Liga".into(),
            round: 3,
            home_team: "A".into(),
            away_team: "B".into(),
            kickoff: Some("2024-05-04 18:00".into()),
            result: result.map(String::from),
            status: status.map(String::from),
        }
    }

    #[test]
    fn result_text_placeholders_mean_no_result() {
        assert_eq!(parse_result_text("2:1"), Some(ScoreLine::new(2, 1)));
        assert_eq!(parse_result_text(" 0 : 0 "), Some(ScoreLine::new(0, 0)));
        assert_eq!(parse_result_text("-:-"), None);
        assert_eq!(parse_result_text(""), None);
        assert_eq!(parse_result_text("a:b"), None);
        assert_eq!(parse_result_text("18:00 FT"), None);
    }

    #[test]
    fn oversized_result_text_is_no_result() {
        assert_eq!(parse_result_text("4294967295:1"), None);
        assert_eq!(parse_result_text("120:0"), None);
    }

    #[test]
    fn live_markers_are_case_insensitive() {
        assert!(is_live_status("LIVE"));
        assert!(is_live_status("match-in_progress"));
        assert!(is_live_status("isPlaying"));
        assert!(!is_live_status("finished"));
    }

    #[test]
    fn rows_classify_through_ingestion_window() {
        let w = LifecycleWindows::default();
        let kickoff = Utc.with_ymd_and_hms(2024, 5, 4, 18, 0, 0).unwrap();

        let soon = kickoff + chrono::Duration::minutes(100);
        let rec = row(Some("1:0"), None).to_record(soon, &w).unwrap();
        assert_eq!(rec.state, MatchState::Live);

        let later = kickoff + chrono::Duration::hours(4);
        let rec = row(Some("1:0"), None).to_record(later, &w).unwrap();
        assert_eq!(rec.state, MatchState::Finished);
        assert_eq!(rec.score(), Some(ScoreLine::new(1, 0)));

        let rec = row(Some("-:-"), Some("live")).to_record(later, &w).unwrap();
        assert_eq!(rec.state, MatchState::Live);
        assert_eq!(rec.score(), Some(ScoreLine::new(0, 0)));

        let rec = row(None, None).to_record(later, &w).unwrap();
        assert_eq!(rec.state, MatchState::Scheduled);
        assert_eq!(rec.home_goals, None);
    }

    #[test]
    fn bad_rows_are_rejected_not_fatal() {
        let w = LifecycleWindows::default();
        let mut bad = row(None, None);
        bad.away_team = "A".into();
        let mut odd_date = row(None, None);
        odd_date.kickoff = Some("next tuesday".into());
        let batch = ingest_rows(&[row(None, None), bad, odd_date], Utc::now(), &w);
        assert_eq!(batch.records.len(), 1);
        assert_eq!(batch.rejected.len(), 2);
    }
}
