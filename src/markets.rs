use std::fmt;

use serde::{Deserialize, Serialize};

use crate::match_record::{Outcome, ScoreLine};

/// An `N.5` total-goals line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum GoalLine {
    Half,
    OneHalf,
    TwoHalf,
    ThreeHalf,
    FourHalf,
}

impl GoalLine {
    pub const ALL: [GoalLine; 5] = [
        GoalLine::Half,
        GoalLine::OneHalf,
        GoalLine::TwoHalf,
        GoalLine::ThreeHalf,
        GoalLine::FourHalf,
    ];

    pub fn value(self) -> f64 {
        match self {
            GoalLine::Half => 0.5,
            GoalLine::OneHalf => 1.5,
            GoalLine::TwoHalf => 2.5,
            GoalLine::ThreeHalf => 3.5,
            GoalLine::FourHalf => 4.5,
        }
    }

    pub fn index(self) -> usize {
        match self {
            GoalLine::Half => 0,
            GoalLine::OneHalf => 1,
            GoalLine::TwoHalf => 2,
            GoalLine::ThreeHalf => 3,
            GoalLine::FourHalf => 4,
        }
    }

    pub fn is_over(self, total_goals: u32) -> bool {
        total_goals as f64 > self.value()
    }
}

impl fmt::Display for GoalLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.1}", self.value())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GoalSide {
    Over,
    Under,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GoalPick {
    pub side: GoalSide,
    pub line: GoalLine,
}

impl GoalPick {
    pub fn over(line: GoalLine) -> Self {
        Self {
            side: GoalSide::Over,
            line,
        }
    }

    pub fn under(line: GoalLine) -> Self {
        Self {
            side: GoalSide::Under,
            line,
        }
    }

    pub fn settles(self, total_goals: u32) -> bool {
        let over = self.line.is_over(total_goals);
        match self.side {
            GoalSide::Over => over,
            GoalSide::Under => !over,
        }
    }
}

impl fmt::Display for GoalPick {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.side {
            GoalSide::Over => write!(f, "Over {}", self.line),
            GoalSide::Under => write!(f, "Under {}", self.line),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DoubleChance {
    HomeOrDraw,
    HomeOrAway,
    DrawOrAway,
}

impl DoubleChance {
    pub const ALL: [DoubleChance; 3] = [
        DoubleChance::HomeOrDraw,
        DoubleChance::HomeOrAway,
        DoubleChance::DrawOrAway,
    ];

    pub fn covers(self, outcome: Outcome) -> bool {
        match self {
            DoubleChance::HomeOrDraw => outcome != Outcome::Away,
            DoubleChance::HomeOrAway => outcome != Outcome::Draw,
            DoubleChance::DrawOrAway => outcome != Outcome::Home,
        }
    }

    pub fn code(self) -> &'static str {
        match self {
            DoubleChance::HomeOrDraw => "1X",
            DoubleChance::HomeOrAway => "12",
            DoubleChance::DrawOrAway => "X2",
        }
    }
}

/// Winning margin: wide is two goals or more, narrow is exactly one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Margin {
    Wide,
    Narrow,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Market {
    Result(Outcome),
    DoubleChance(DoubleChance),
    Goals(GoalPick),
    BothTeamsScore(bool),
    ResultGoals(Outcome, GoalPick),
    DoubleChanceGoals(DoubleChance, GoalPick),
    Margin(Margin),
    ExactScore(ScoreLine),
}

impl Market {
    /// Whether the market wins given the final score.
    pub fn settles(&self, score: ScoreLine) -> bool {
        let outcome = score.outcome();
        let total = score.total();
        match *self {
            Market::Result(o) => o == outcome,
            Market::DoubleChance(dc) => dc.covers(outcome),
            Market::Goals(pick) => pick.settles(total),
            Market::BothTeamsScore(yes) => score.both_scored() == yes,
            Market::ResultGoals(o, pick) => o == outcome && pick.settles(total),
            Market::DoubleChanceGoals(dc, pick) => dc.covers(outcome) && pick.settles(total),
            Market::Margin(margin) => {
                let diff = score.home.abs_diff(score.away);
                match margin {
                    Margin::Wide => diff >= 2,
                    Margin::Narrow => diff == 1,
                }
            }
            Market::ExactScore(expected) => expected == score,
        }
    }

    pub fn family(&self) -> MarketFamily {
        match self {
            Market::Result(_) => MarketFamily::Result,
            Market::DoubleChance(_) => MarketFamily::DoubleChance,
            Market::Goals(pick) => MarketFamily::Goals(pick.line),
            Market::BothTeamsScore(_) => MarketFamily::BothTeamsScore,
            Market::ResultGoals(..) => MarketFamily::ResultGoals,
            Market::DoubleChanceGoals(..) => MarketFamily::DoubleChanceGoals,
            Market::Margin(_) => MarketFamily::Margin,
            Market::ExactScore(_) => MarketFamily::ExactScore,
        }
    }
}

fn result_label(outcome: Outcome) -> &'static str {
    match outcome {
        Outcome::Home => "Home",
        Outcome::Draw => "Draw",
        Outcome::Away => "Away",
    }
}

impl fmt::Display for Market {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Market::Result(Outcome::Draw) => f.write_str("Draw"),
            Market::Result(o) => write!(f, "{} Win", result_label(*o)),
            Market::DoubleChance(DoubleChance::HomeOrDraw) => f.write_str("1X (Home or Draw)"),
            Market::DoubleChance(DoubleChance::HomeOrAway) => f.write_str("12 (Home or Away)"),
            Market::DoubleChance(DoubleChance::DrawOrAway) => f.write_str("X2 (Draw or Away)"),
            Market::Goals(pick) => write!(f, "{pick}"),
            Market::BothTeamsScore(true) => f.write_str("Both Teams Score: Yes"),
            Market::BothTeamsScore(false) => f.write_str("Both Teams Score: No"),
            Market::ResultGoals(o, pick) => write!(f, "{} + {}", result_label(*o), pick),
            Market::DoubleChanceGoals(dc, pick) => write!(f, "{} + {}", dc.code(), pick),
            Market::Margin(Margin::Wide) => f.write_str("Wide Win Margin"),
            Market::Margin(Margin::Narrow) => f.write_str("Narrow Win Margin"),
            Market::ExactScore(score) => write!(f, "Exact Score {score}"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MarketFamily {
    Result,
    DoubleChance,
    Goals(GoalLine),
    BothTeamsScore,
    ResultGoals,
    DoubleChanceGoals,
    Margin,
    ExactScore,
}

impl fmt::Display for MarketFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MarketFamily::Result => f.write_str("Result 1X2"),
            MarketFamily::DoubleChance => f.write_str("Double Chance"),
            MarketFamily::Goals(line) => write!(f, "Over/Under {line}"),
            MarketFamily::BothTeamsScore => f.write_str("Both Teams Score"),
            MarketFamily::ResultGoals => f.write_str("Result + Goals"),
            MarketFamily::DoubleChanceGoals => f.write_str("Double Chance + Goals"),
            MarketFamily::Margin => f.write_str("Win Margin"),
            MarketFamily::ExactScore => f.write_str("Exact Score"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MarketEntry {
    pub market: Market,
    pub probability: f64,
    pub odds: f64,
}

impl MarketEntry {
    pub fn new(market: Market, probability: f64) -> Self {
        Self {
            market,
            probability,
            odds: odds(probability),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RankedMarket {
    pub position: usize,
    pub market: Market,
    pub probability: f64,
    pub odds: f64,
}

pub fn round_dp(value: f64, places: i32) -> f64 {
    let factor = 10f64.powi(places);
    (value * factor).round() / factor
}

/// `round(100 / p, 2)`, or 0 when the probability is not positive.
pub fn odds(probability: f64) -> f64 {
    if probability > 0.0 {
        round_dp(100.0 / probability, 2)
    } else {
        0.0
    }
}

/// First candidate whose value equals the maximum, so earlier entries win ties.
pub fn first_max<T: Copy>(candidates: &[(T, f64)]) -> Option<T> {
    let mut best: Option<(T, f64)> = None;
    for (item, value) in candidates {
        match best {
            Some((_, top)) if *value <= top => {}
            _ => best = Some((*item, *value)),
        }
    }
    best.map(|(item, _)| item)
}

/// Stable descending sort by probability; ties keep table order.
pub fn rank_top(table: &[MarketEntry], n: usize) -> Vec<RankedMarket> {
    let mut sorted = table.to_vec();
    sorted.sort_by(|a, b| b.probability.total_cmp(&a.probability));
    sorted
        .into_iter()
        .take(n)
        .enumerate()
        .map(|(idx, entry)| RankedMarket {
            position: idx + 1,
            market: entry.market,
            probability: entry.probability,
            odds: odds(entry.probability),
        })
        .collect()
}
