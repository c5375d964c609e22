use serde::{Deserialize, Serialize};

use crate::error::ForecastError;
use crate::forecast::Forecast;
use crate::markets::{GoalLine, Market, MarketFamily, round_dp};
use crate::match_record::{MatchRecord, MatchState, Outcome, ScoreLine};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarketCheck {
    pub family: MarketFamily,
    pub predicted: Market,
    /// What actually happened, for reports.
    pub actual: String,
    pub hit: bool,
    pub confidence: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VerificationResult {
    pub score: ScoreLine,
    pub checks: Vec<MarketCheck>,
    pub hits: usize,
    pub hit_pct: f64,
    pub top_picks: Vec<MarketCheck>,
    pub top_hits: usize,
    pub top_pct: f64,
}

impl VerificationResult {
    pub fn total(&self) -> usize {
        self.checks.len()
    }

    pub fn misses(&self) -> impl Iterator<Item = &MarketCheck> {
        self.checks.iter().filter(|c| !c.hit)
    }
}

fn describe_actual(family: MarketFamily, score: ScoreLine) -> String {
    let total = score.total();
    match family {
        MarketFamily::Result | MarketFamily::DoubleChance => match score.outcome() {
            Outcome::Home => "Home Win".to_string(),
            Outcome::Away => "Away Win".to_string(),
            Outcome::Draw => "Draw".to_string(),
        },
        MarketFamily::Goals(line) => {
            let side = if line.is_over(total) { "Over" } else { "Under" };
            format!("{side} {line} ({total} goals)")
        }
        MarketFamily::BothTeamsScore => {
            let yes = if score.both_scored() { "Yes" } else { "No" };
            format!("{yes} ({score})")
        }
        _ => score.to_string(),
    }
}

fn check(market: Market, confidence: f64, score: ScoreLine) -> MarketCheck {
    let family = market.family();
    MarketCheck {
        family,
        predicted: market,
        actual: describe_actual(family, score),
        hit: market.settles(score),
        confidence,
    }
}

fn pct(hits: usize, total: usize) -> f64 {
    if total == 0 {
        0.0
    } else {
        round_dp(hits as f64 / total as f64 * 100.0, 1)
    }
}

/// Score every market family's recommendation, then the ranked top picks,
/// against the real result.
pub fn verify(home_goals: u32, away_goals: u32, forecast: &Forecast) -> VerificationResult {
    let score = ScoreLine::new(home_goals, away_goals);
    let mut checks = Vec::with_capacity(9);

    let result = &forecast.result;
    checks.push(check(
        Market::Result(result.pick),
        result.probability(result.pick),
        score,
    ));

    let dc = &forecast.double_chance;
    checks.push(check(
        Market::DoubleChance(dc.pick),
        dc.probability(dc.pick),
        score,
    ));

    for line in GoalLine::ALL {
        let market = forecast.goals.line(line);
        let lean = market.lean();
        checks.push(check(
            Market::Goals(lean),
            market.probability(lean.side),
            score,
        ));
    }

    let btts = &forecast.btts;
    let btts_conf = if btts.pick { btts.yes } else { btts.no };
    checks.push(check(Market::BothTeamsScore(btts.pick), btts_conf, score));

    checks.push(check(Market::ExactScore(forecast.exact_score), 100.0, score));

    let top_picks = forecast
        .top_picks
        .iter()
        .map(|ranked| check(ranked.market, ranked.probability, score))
        .collect::<Vec<_>>();

    let hits = checks.iter().filter(|c| c.hit).count();
    let top_hits = top_picks.iter().filter(|c| c.hit).count();

    VerificationResult {
        score,
        hit_pct: pct(hits, checks.len()),
        hits,
        top_pct: pct(top_hits, top_picks.len()),
        top_hits,
        checks,
        top_picks,
    }
}

/// Verification for a stored match. Refuses matches that are not finished or
/// lack a full score rather than counting missing goals as zero.
pub fn verify_match(
    record: &MatchRecord,
    forecast: &Forecast,
) -> Result<VerificationResult, ForecastError> {
    if record.state != MatchState::Finished {
        return Err(ForecastError::NotFinished(record.label()));
    }
    let score = record
        .score()
        .ok_or_else(|| ForecastError::malformed(record.label(), "finished without a full score"))?;
    Ok(verify(score.home, score.away, forecast))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::forecast::forecast;
    use crate::form::FormSequence;
    use crate::markets::{GoalPick, GoalSide};
    use crate::team_stats::TeamSnapshot;

    fn forecast_with_over_45(over_pct: f64) -> Forecast {
        let mut home = TeamSnapshot::empty("A", "Liga");
        let mut away = TeamSnapshot::empty("B", "Liga");
        for snap in [&mut home, &mut away] {
            let split = &mut snap.goal_lines[GoalLine::FourHalf.index()];
            split.over_pct = over_pct;
            split.under_pct = 100.0 - over_pct;
        }
        forecast(&home, &away, &FormSequence::default(), &FormSequence::default())
    }

    fn goals_check(result: &VerificationResult, line: GoalLine) -> &MarketCheck {
        result
            .checks
            .iter()
            .find(|c| c.family == MarketFamily::Goals(line))
            .unwrap()
    }

    #[test]
    fn over_45_hits_on_five_goals() {
        let f = forecast_with_over_45(80.0);
        let v = verify(3, 2, &f);
        let check = goals_check(&v, GoalLine::FourHalf);
        assert_eq!(check.predicted, Market::Goals(GoalPick::over(GoalLine::FourHalf)));
        assert!(check.hit);
        assert_eq!(check.confidence, 80.0);
    }

    #[test]
    fn under_45_misses_on_five_goals() {
        let f = forecast_with_over_45(10.0);
        let v = verify(3, 2, &f);
        let check = goals_check(&v, GoalLine::FourHalf);
        assert_eq!(check.predicted.family(), MarketFamily::Goals(GoalLine::FourHalf));
        assert!(matches!(
            check.predicted,
            Market::Goals(GoalPick { side: GoalSide::Under, .. })
        ));
        assert!(!check.hit);
    }

    #[test]
    fn nine_checks_and_percentages() {
        let f = forecast_with_over_45(10.0);
        // Empty snapshots predict a home win, 1X, 0-0 and no BTTS.
        let v = verify(0, 0, &f);
        assert_eq!(v.total(), 9);
        let exact = v.checks.last().unwrap();
        assert_eq!(exact.family, MarketFamily::ExactScore);
        assert!(exact.hit);
        assert_eq!(exact.confidence, 100.0);
        let expected = round_dp(v.hits as f64 / 9.0 * 100.0, 1);
        assert_eq!(v.hit_pct, expected);
        assert_eq!(v.top_picks.len(), 3);
    }

    #[test]
    fn unfinished_or_scoreless_records_are_rejected() {
        let f = forecast_with_over_45(50.0);
        let mut m = MatchRecord::new("Liga", 1, "A", "B");
        assert!(matches!(
            verify_match(&m, &f),
            Err(ForecastError::NotFinished(_))
        ));
        m.state = MatchState::Finished;
        m.home_goals = Some(1);
        assert!(matches!(
            verify_match(&m, &f),
            Err(ForecastError::MalformedRecord { .. })
        ));
        m.away_goals = Some(1);
        assert!(verify_match(&m, &f).is_ok());
    }
}
