use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::error::ForecastError;

/// Highest goal count a parsed score may carry.
pub const MAX_GOALS: u32 = 99;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Outcome {
    Home,
    Draw,
    Away,
}

impl Outcome {
    pub fn as_str(self) -> &'static str {
        match self {
            Outcome::Home => "home",
            Outcome::Draw => "draw",
            Outcome::Away => "away",
        }
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Outcome {
    type Err = ForecastError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "home" | "1" => Ok(Outcome::Home),
            "draw" | "x" => Ok(Outcome::Draw),
            "away" | "2" => Ok(Outcome::Away),
            other => Err(ForecastError::malformed("outcome", format!("unknown outcome {other:?}"))),
        }
    }
}

pub fn classify_outcome(home_goals: u32, away_goals: u32) -> Outcome {
    match home_goals.cmp(&away_goals) {
        Ordering::Greater => Outcome::Home,
        Ordering::Less => Outcome::Away,
        Ordering::Equal => Outcome::Draw,
    }
}

/// Final or running score of a match, home side first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ScoreLine {
    pub home: u32,
    pub away: u32,
}

impl ScoreLine {
    pub fn new(home: u32, away: u32) -> Self {
        Self { home, away }
    }

    pub fn total(&self) -> u32 {
        self.home.saturating_add(self.away)
    }

    pub fn outcome(&self) -> Outcome {
        classify_outcome(self.home, self.away)
    }

    pub fn both_scored(&self) -> bool {
        self.home > 0 && self.away > 0
    }
}

impl fmt::Display for ScoreLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.home, self.away)
    }
}

/// Strict parse of `"2:1"` or `"2-1"`, each side at most [`MAX_GOALS`].
/// Placeholders such as `"-:-"` are errors here; callers that accept "no
/// result yet" check for them first.
impl FromStr for ScoreLine {
    type Err = ForecastError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let trimmed = raw.trim();
        let mut parts = trimmed.split([':', '-']);
        let (Some(home), Some(away), None) = (parts.next(), parts.next(), parts.next()) else {
            return Err(ForecastError::InvalidScore(raw.to_string()));
        };
        let goals = |part: &str| {
            part.trim()
                .parse::<u32>()
                .ok()
                .filter(|g| *g <= MAX_GOALS)
                .ok_or_else(|| ForecastError::InvalidScore(raw.to_string()))
        };
        Ok(ScoreLine {
            home: goals(home)?,
            away: goals(away)?,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum MatchState {
    #[default]
    Scheduled,
    Live,
    Finished,
    Suspended,
}

impl MatchState {
    pub fn as_str(self) -> &'static str {
        match self {
            MatchState::Scheduled => "scheduled",
            MatchState::Live => "live",
            MatchState::Finished => "finished",
            MatchState::Suspended => "suspended",
        }
    }
}

impl fmt::Display for MatchState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MatchState {
    type Err = ForecastError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "scheduled" => Ok(MatchState::Scheduled),
            "live" => Ok(MatchState::Live),
            "finished" => Ok(MatchState::Finished),
            "suspended" => Ok(MatchState::Suspended),
            other => Err(ForecastError::malformed("state", format!("unknown state {other:?}"))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchRecord {
    #[serde(default)]
    pub id: Option<i64>,
    pub league: String,
    pub round: u32,
    pub home_team: String,
    pub away_team: String,
    #[serde(default)]
    pub kickoff: Option<DateTime<Utc>>,
    #[serde(default)]
    pub home_goals: Option<u32>,
    #[serde(default)]
    pub away_goals: Option<u32>,
    #[serde(default)]
    pub state: MatchState,
    // Persisted 1X2 pick and whether it was later confirmed.
    #[serde(default)]
    pub prediction: Option<Outcome>,
    #[serde(default)]
    pub prediction_hit: Option<bool>,
}

impl MatchRecord {
    pub fn new(
        league: impl Into<String>,
        round: u32,
        home_team: impl Into<String>,
        away_team: impl Into<String>,
    ) -> Self {
        Self {
            id: None,
            league: league.into(),
            round,
            home_team: home_team.into(),
            away_team: away_team.into(),
            kickoff: None,
            home_goals: None,
            away_goals: None,
            state: MatchState::Scheduled,
            prediction: None,
            prediction_hit: None,
        }
    }

    pub fn score(&self) -> Option<ScoreLine> {
        match (self.home_goals, self.away_goals) {
            (Some(home), Some(away)) => Some(ScoreLine { home, away }),
            _ => None,
        }
    }

    pub fn is_finished(&self) -> bool {
        self.state == MatchState::Finished
    }

    pub fn involves(&self, team: &str) -> bool {
        self.home_team == team || self.away_team == team
    }

    pub fn kickoff_date(&self) -> Option<NaiveDate> {
        self.kickoff.map(|k| k.date_naive())
    }

    /// Goals for and against from `team`'s point of view. Missing counts read
    /// as 0, which only dampens aggregates built from incomplete rows.
    pub fn goals_for_against(&self, team: &str) -> (u32, u32) {
        let home = self.home_goals.unwrap_or(0);
        let away = self.away_goals.unwrap_or(0);
        if self.home_team == team {
            (home, away)
        } else {
            (away, home)
        }
    }

    pub fn opponent_of(&self, team: &str) -> &str {
        if self.home_team == team {
            &self.away_team
        } else {
            &self.home_team
        }
    }

    pub fn label(&self) -> String {
        match self.score() {
            Some(score) => format!(
                "{} {}-{} {}",
                self.home_team, score.home, score.away, self.away_team
            ),
            None => format!("{} vs {}", self.home_team, self.away_team),
        }
    }
}

/// Date descending, then round descending. Undated matches go last; the sort
/// is stable so equal keys keep their input order.
pub fn sort_recent_first(matches: &mut [&MatchRecord]) {
    matches.sort_by(|a, b| {
        let by_date = match (a.kickoff_date(), b.kickoff_date()) {
            (Some(x), Some(y)) => y.cmp(&x),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => Ordering::Equal,
        };
        by_date.then(b.round.cmp(&a.round))
    });
}

/// Finished matches of `team` in `league`, in input order.
pub fn finished_for_team<'a>(
    matches: &'a [MatchRecord],
    team: &str,
    league: &str,
) -> Vec<&'a MatchRecord> {
    matches
        .iter()
        .filter(|m| m.is_finished() && m.league == league && m.involves(team))
        .collect()
}
