use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::config::AccuracyConfig;
use crate::forecast::{Forecast, forecast};
use crate::form::recent_form;
use crate::markets::round_dp;
use crate::match_record::{MatchRecord, MatchState, Outcome, sort_recent_first};
use crate::snapshot_cache::SnapshotCache;
use crate::team_stats::aggregate;
use crate::verify::{VerificationResult, verify_match};

/// Forecast a stored match from its league's history.
pub fn forecast_for_match(
    record: &MatchRecord,
    history: &[MatchRecord],
    form_window: usize,
) -> Forecast {
    let league = record.league.as_str();
    let home = aggregate(&record.home_team, league, history);
    let away = aggregate(&record.away_team, league, history);
    let home_form = recent_form(&record.home_team, league, history, form_window);
    let away_form = recent_form(&record.away_team, league, history, form_window);
    forecast(&home, &away, &home_form, &away_form)
}

fn forecast_cached(
    cache: &SnapshotCache,
    record: &MatchRecord,
    history: &[MatchRecord],
    form_window: usize,
) -> Forecast {
    let league = record.league.as_str();
    let home = cache.get_or_aggregate(&record.home_team, league, history);
    let away = cache.get_or_aggregate(&record.away_team, league, history);
    let home_form = recent_form(&record.home_team, league, history, form_window);
    let away_form = recent_form(&record.away_team, league, history, form_window);
    forecast(&home, &away, &home_form, &away_form)
}

/// The pick to persist: only for scheduled matches that have none yet.
pub fn record_prediction(record: &MatchRecord, forecast: &Forecast) -> Option<Outcome> {
    if record.state == MatchState::Scheduled && record.prediction.is_none() {
        Some(forecast.result.pick)
    } else {
        None
    }
}

/// Whether the persisted pick came true, once, after the match finished.
pub fn settle_prediction(record: &MatchRecord) -> Option<bool> {
    if record.state != MatchState::Finished || record.prediction_hit.is_some() {
        return None;
    }
    let pick = record.prediction?;
    let score = record.score()?;
    Some(pick == score.outcome())
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct PredictionTally {
    pub settled: usize,
    pub hits: usize,
    pub hit_pct: f64,
}

pub fn prediction_tally(league: &str, history: &[MatchRecord]) -> PredictionTally {
    let settled = history
        .iter()
        .filter(|m| m.league == league && m.is_finished() && m.prediction.is_some())
        .filter_map(|m| m.prediction_hit)
        .collect::<Vec<_>>();
    let hits = settled.iter().filter(|hit| **hit).count();
    let hit_pct = if settled.is_empty() {
        0.0
    } else {
        round_dp(hits as f64 / settled.len() as f64 * 100.0, 1)
    };
    PredictionTally {
        settled: settled.len(),
        hits,
        hit_pct,
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LeagueAccuracy {
    pub league: String,
    pub overall_sampled: usize,
    pub avg_hit_pct: f64,
    pub top_sampled: usize,
    pub avg_top_pct: f64,
    pub tally: PredictionTally,
}

fn mean_1dp(values: &[f64]) -> f64 {
    if values.is_empty() {
        0.0
    } else {
        round_dp(values.iter().sum::<f64>() / values.len() as f64, 1)
    }
}

/// Re-forecasts the most recent finished matches against the full league
/// history and averages their hit rates.
pub fn league_accuracy(
    league: &str,
    history: &[MatchRecord],
    cfg: &AccuracyConfig,
) -> LeagueAccuracy {
    let mut finished = history
        .iter()
        .filter(|m| m.league == league && m.is_finished())
        .collect::<Vec<_>>();
    sort_recent_first(&mut finished);

    let sample = cfg.overall_sample.max(cfg.top_pick_sample);
    let cache = SnapshotCache::new();
    let results: Vec<Option<VerificationResult>> = finished
        .par_iter()
        .take(sample)
        .map(|record| {
            let f = forecast_cached(&cache, record, history, cfg.form_window);
            match verify_match(record, &f) {
                Ok(v) => Some(v),
                Err(err) => {
                    warn!(error = %err, "skipping match in accuracy sample");
                    None
                }
            }
        })
        .collect();

    let overall = results
        .iter()
        .take(cfg.overall_sample)
        .flatten()
        .map(|v| v.hit_pct)
        .collect::<Vec<_>>();
    let top = results
        .iter()
        .take(cfg.top_pick_sample)
        .flatten()
        .map(|v| v.top_pct)
        .collect::<Vec<_>>();

    let report = LeagueAccuracy {
        league: league.to_string(),
        overall_sampled: overall.len(),
        avg_hit_pct: mean_1dp(&overall),
        top_sampled: top.len(),
        avg_top_pct: mean_1dp(&top),
        tally: prediction_tally(league, history),
    };
    info!(
        league,
        overall = report.avg_hit_pct,
        top3 = report.avg_top_pct,
        "league accuracy computed"
    );
    report
}
