use serde::{Deserialize, Serialize};

use crate::form::FormSequence;
use crate::markets::{
    DoubleChance, GoalLine, GoalPick, GoalSide, Margin, Market, MarketEntry, RankedMarket,
    first_max, odds, rank_top, round_dp,
};
use crate::match_record::{Outcome, ScoreLine};
use crate::team_stats::TeamSnapshot;

const POINTS_WEIGHT: f64 = 0.4;
const FORM_WEIGHT: f64 = 0.3;
const GOAL_DIFF_WEIGHT: f64 = 0.2;
const WIN_RATE_WEIGHT: f64 = 0.01;
const HOME_ADVANTAGE: f64 = 0.3;
const DRAW_INFLATOR: f64 = 0.3;

const BTTS_CAP: f64 = 95.0;
// Scoring-rate multipliers carry a home/away asymmetry from the historical model.
const HOME_SCORING_FACTOR: f64 = 50.0;
const AWAY_SCORING_FACTOR: f64 = 45.0;
const LEAKY_DEFENCE: f64 = 1.2;
const LEAKY_DEFENCE_BONUS: f64 = 5.0;

const AWAY_EXACT_SCORE_FACTOR: f64 = 0.8;
const WIDE_MARGIN_POINTS_GAP: f64 = 1.0;

pub const TOP_PICKS: usize = 3;

const RESULT_GOAL_PICKS: [GoalPick; 6] = [
    GoalPick { side: GoalSide::Over, line: GoalLine::Half },
    GoalPick { side: GoalSide::Over, line: GoalLine::OneHalf },
    GoalPick { side: GoalSide::Over, line: GoalLine::TwoHalf },
    GoalPick { side: GoalSide::Under, line: GoalLine::TwoHalf },
    GoalPick { side: GoalSide::Under, line: GoalLine::ThreeHalf },
    GoalPick { side: GoalSide::Under, line: GoalLine::FourHalf },
];

const DOUBLE_CHANCE_GOAL_PICKS: [GoalPick; 4] = [
    GoalPick { side: GoalSide::Over, line: GoalLine::OneHalf },
    GoalPick { side: GoalSide::Over, line: GoalLine::TwoHalf },
    GoalPick { side: GoalSide::Under, line: GoalLine::ThreeHalf },
    GoalPick { side: GoalSide::Under, line: GoalLine::FourHalf },
];

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Priced {
    pub probability: f64,
    pub odds: f64,
}

impl Priced {
    pub fn new(probability: f64) -> Self {
        Self {
            probability,
            odds: odds(probability),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ResultMarket {
    pub home: f64,
    pub draw: f64,
    pub away: f64,
    pub pick: Outcome,
    pub confidence: f64,
}

impl ResultMarket {
    pub fn probability(&self, outcome: Outcome) -> f64 {
        match outcome {
            Outcome::Home => self.home,
            Outcome::Draw => self.draw,
            Outcome::Away => self.away,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DoubleChanceMarket {
    pub home_or_draw: f64,
    pub home_or_away: f64,
    pub draw_or_away: f64,
    pub pick: DoubleChance,
}

impl DoubleChanceMarket {
    pub fn probability(&self, dc: DoubleChance) -> f64 {
        match dc {
            DoubleChance::HomeOrDraw => self.home_or_draw,
            DoubleChance::HomeOrAway => self.home_or_away,
            DoubleChance::DrawOrAway => self.draw_or_away,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GoalLineMarket {
    pub line: GoalLine,
    pub over: f64,
    pub under: f64,
}

impl GoalLineMarket {
    /// Over when it is strictly more likely, otherwise under.
    pub fn lean(&self) -> GoalPick {
        if self.over > self.under {
            GoalPick::over(self.line)
        } else {
            GoalPick::under(self.line)
        }
    }

    pub fn probability(&self, side: GoalSide) -> f64 {
        match side {
            GoalSide::Over => self.over,
            GoalSide::Under => self.under,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GoalsMarket {
    pub lines: [GoalLineMarket; 5],
    pub pick: GoalPick,
}

impl GoalsMarket {
    pub fn line(&self, line: GoalLine) -> &GoalLineMarket {
        &self.lines[line.index()]
    }

    pub fn probability(&self, pick: GoalPick) -> f64 {
        self.line(pick.line).probability(pick.side)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BttsMarket {
    pub yes: f64,
    pub no: f64,
    pub pick: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MarginMarket {
    pub wide: f64,
    pub narrow: f64,
    pub pick: Margin,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Half {
    First,
    Second,
}

/// Fixed-shape heuristics reported next to the ranked markets. None of them
/// enter the ranking or the verifier.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SideMarkets {
    pub home_home: Priced,
    pub draw_home: Priced,
    pub home_draw: Priced,
    pub draw_draw: Priced,
    pub goal_first_half: Priced,
    pub goal_second_half: Priced,
    pub more_goals_first_half: Priced,
    pub more_goals_second_half: Priced,
    pub busier_half: Half,
    pub cards_over_3_5: Priced,
    pub cards_under_3_5: Priced,
    pub corners_over_9: Priced,
    pub corners_under_9: Priced,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Forecast {
    pub home_team: String,
    pub away_team: String,
    pub result: ResultMarket,
    pub double_chance: DoubleChanceMarket,
    pub goals: GoalsMarket,
    pub btts: BttsMarket,
    pub exact_score: ScoreLine,
    pub margin: MarginMarket,
    pub result_goals_pick: Market,
    pub double_chance_goals_pick: Market,
    pub side: SideMarkets,
    /// Every ranked market in declaration order.
    pub table: Vec<MarketEntry>,
    pub top_picks: Vec<RankedMarket>,
}

impl Forecast {
    pub fn probability(&self, market: &Market) -> Option<f64> {
        self.table
            .iter()
            .find(|entry| entry.market == *market)
            .map(|entry| entry.probability)
    }
}

/// Weighted strength of one side before normalization.
pub fn composite_score(snapshot: &TeamSnapshot, form: &FormSequence, home: bool) -> f64 {
    let base = POINTS_WEIGHT * snapshot.avg_points
        + FORM_WEIGHT * form.form_score()
        + GOAL_DIFF_WEIGHT * snapshot.goal_diff_per_match()
        + WIN_RATE_WEIGHT * snapshot.win_rate_pct();
    if home { base + HOME_ADVANTAGE } else { base }
}

fn round1(value: f64) -> f64 {
    round_dp(value, 1)
}

fn result_market(home_score: f64, away_score: f64) -> ResultMarket {
    // A heavily negative goal difference can push a score below zero, which
    // would produce a negative probability.
    let home_score = home_score.max(0.0);
    let away_score = away_score.max(0.0);
    let total = home_score + away_score + (home_score - away_score).abs() * DRAW_INFLATOR;

    let (mut home, mut away, mut draw) = if total > 0.0 {
        let home = round1(home_score / total * 100.0);
        let away = round1(away_score / total * 100.0);
        (home, away, round1(100.0 - home - away))
    } else {
        (0.0, 0.0, 100.0)
    };

    if draw < 0.0 {
        draw = 0.0;
        let both = home + away;
        home = round1(home / both * 100.0);
        away = round1(100.0 - home);
    }

    let pick = first_max(&[
        (Outcome::Home, home),
        (Outcome::Away, away),
        (Outcome::Draw, draw),
    ])
    .unwrap_or(Outcome::Home);
    let confidence = round1(home.max(draw).max(away));

    ResultMarket {
        home,
        draw,
        away,
        pick,
        confidence,
    }
}

fn double_chance_market(result: &ResultMarket) -> DoubleChanceMarket {
    let home_or_draw = round1(result.home + result.draw);
    let home_or_away = round1(result.home + result.away);
    let draw_or_away = round1(result.draw + result.away);
    let pick = first_max(&[
        (DoubleChance::HomeOrDraw, home_or_draw),
        (DoubleChance::DrawOrAway, draw_or_away),
        (DoubleChance::HomeOrAway, home_or_away),
    ])
    .unwrap_or(DoubleChance::HomeOrDraw);
    DoubleChanceMarket {
        home_or_draw,
        home_or_away,
        draw_or_away,
        pick,
    }
}

fn goals_market(home: &TeamSnapshot, away: &TeamSnapshot) -> GoalsMarket {
    let avg_goals = (home.avg_goals_for + away.avg_goals_for) / 2.0;

    let lines = GoalLine::ALL.map(|line| {
        let avg_over = (home.goal_line(line).over_pct + away.goal_line(line).over_pct) / 2.0;
        let over = if line == GoalLine::TwoHalf {
            let avg_under = 100.0 - avg_over;
            let mut boosted = avg_over;
            if avg_goals > 1.5 {
                boosted += 10.0;
            }
            if avg_goals > 2.0 {
                boosted += 5.0;
            }
            round1(boosted / (boosted + avg_under) * 100.0)
        } else {
            round1(avg_over)
        };
        GoalLineMarket {
            line,
            over,
            under: round1(100.0 - over),
        }
    });

    let mut candidates = Vec::with_capacity(10);
    candidates.extend(lines.iter().map(|l| (GoalPick::over(l.line), l.over)));
    candidates.extend(lines.iter().map(|l| (GoalPick::under(l.line), l.under)));
    let pick = first_max(&candidates).unwrap_or(GoalPick::over(GoalLine::Half));

    GoalsMarket { lines, pick }
}

fn btts_market(home: &TeamSnapshot, away: &TeamSnapshot) -> BttsMarket {
    let home_scores = (home.goals_for_per_match() * HOME_SCORING_FACTOR).min(BTTS_CAP);
    let away_scores = (away.goals_for_per_match() * AWAY_SCORING_FACTOR).min(BTTS_CAP);
    let mut yes = round1((home_scores * away_scores / 100.0).min(BTTS_CAP));
    if home.goals_against_per_match() > LEAKY_DEFENCE {
        yes += LEAKY_DEFENCE_BONUS;
    }
    if away.goals_against_per_match() > LEAKY_DEFENCE {
        yes += LEAKY_DEFENCE_BONUS;
    }
    let yes = round1(yes.min(BTTS_CAP));
    let no = round1(100.0 - yes);
    BttsMarket {
        yes,
        no,
        pick: yes > no,
    }
}

fn exact_score(home: &TeamSnapshot, away: &TeamSnapshot) -> ScoreLine {
    let home_goals = home.avg_goals_for.round_ties_even().max(0.0) as u32;
    let away_goals = (away.avg_goals_for * AWAY_EXACT_SCORE_FACTOR)
        .round_ties_even()
        .max(0.0) as u32;
    ScoreLine::new(home_goals, away_goals)
}

fn margin_market(home: &TeamSnapshot, away: &TeamSnapshot) -> MarginMarket {
    if (home.avg_points - away.avg_points).abs() > WIDE_MARGIN_POINTS_GAP {
        MarginMarket {
            wide: 65.0,
            narrow: 35.0,
            pick: Margin::Wide,
        }
    } else {
        MarginMarket {
            wide: 35.0,
            narrow: 65.0,
            pick: Margin::Narrow,
        }
    }
}

fn side_markets(result: &ResultMarket) -> SideMarkets {
    let more_first = 45.0;
    let more_second = 55.0;
    SideMarkets {
        home_home: Priced::new(round1(result.home * 0.7)),
        draw_home: Priced::new(round1(result.home * 0.3)),
        home_draw: Priced::new(round1(result.draw * 0.5)),
        draw_draw: Priced::new(round1(result.draw * 0.5)),
        goal_first_half: Priced::new(55.0),
        goal_second_half: Priced::new(60.0),
        more_goals_first_half: Priced::new(more_first),
        more_goals_second_half: Priced::new(more_second),
        busier_half: if more_second > more_first {
            Half::Second
        } else {
            Half::First
        },
        cards_over_3_5: Priced::new(48.0),
        cards_under_3_5: Priced::new(52.0),
        corners_over_9: Priced::new(52.0),
        corners_under_9: Priced::new(48.0),
    }
}

pub fn forecast(
    home: &TeamSnapshot,
    away: &TeamSnapshot,
    home_form: &FormSequence,
    away_form: &FormSequence,
) -> Forecast {
    let result = result_market(
        composite_score(home, home_form, true),
        composite_score(away, away_form, false),
    );
    let double_chance = double_chance_market(&result);
    let goals = goals_market(home, away);
    let btts = btts_market(home, away);
    let exact_score = exact_score(home, away);
    let margin = margin_market(home, away);

    let mut table = Vec::with_capacity(50);
    for outcome in [Outcome::Home, Outcome::Draw, Outcome::Away] {
        table.push(MarketEntry::new(Market::Result(outcome), result.probability(outcome)));
    }
    for dc in DoubleChance::ALL {
        table.push(MarketEntry::new(Market::DoubleChance(dc), double_chance.probability(dc)));
    }
    for line in &goals.lines {
        table.push(MarketEntry::new(Market::Goals(GoalPick::over(line.line)), line.over));
        table.push(MarketEntry::new(Market::Goals(GoalPick::under(line.line)), line.under));
    }
    table.push(MarketEntry::new(Market::BothTeamsScore(true), btts.yes));
    table.push(MarketEntry::new(Market::BothTeamsScore(false), btts.no));

    let mut result_goals = Vec::with_capacity(18);
    for outcome in [Outcome::Home, Outcome::Away, Outcome::Draw] {
        let base = result.probability(outcome);
        for pick in RESULT_GOAL_PICKS {
            let market = Market::ResultGoals(outcome, pick);
            let p = round1(base / 100.0 * goals.probability(pick));
            result_goals.push((market, p));
            table.push(MarketEntry::new(market, p));
        }
    }

    let mut dc_goals = Vec::with_capacity(12);
    for dc in DoubleChance::ALL {
        let base = double_chance.probability(dc);
        for pick in DOUBLE_CHANCE_GOAL_PICKS {
            let market = Market::DoubleChanceGoals(dc, pick);
            let p = round1(base / 100.0 * goals.probability(pick));
            dc_goals.push((market, p));
            table.push(MarketEntry::new(market, p));
        }
    }

    table.push(MarketEntry::new(Market::Margin(Margin::Wide), margin.wide));
    table.push(MarketEntry::new(Market::Margin(Margin::Narrow), margin.narrow));

    let fallback = Market::Result(result.pick);
    let result_goals_pick = first_max(&result_goals).unwrap_or(fallback);
    let double_chance_goals_pick = first_max(&dc_goals).unwrap_or(fallback);
    let top_picks = rank_top(&table, TOP_PICKS);

    Forecast {
        home_team: home.team.clone(),
        away_team: away.team.clone(),
        result,
        double_chance,
        goals,
        btts,
        exact_score,
        margin,
        result_goals_pick,
        double_chance_goals_pick,
        side: side_markets(&result),
        table,
        top_picks,
    }
}
