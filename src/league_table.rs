use serde::{Deserialize, Serialize};

use crate::form::recent_form;
use crate::markets::{GoalLine, round_dp};
use crate::match_record::{MAX_GOALS, MatchRecord, ScoreLine};
use crate::team_stats::aggregate;

const STREAK_LEN: usize = 5;
const TOP_SCORES: usize = 15;
const HISTOGRAM_CAP: u32 = 2 * MAX_GOALS;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StandingRow {
    pub position: usize,
    pub team: String,
    pub played: u32,
    pub wins: u32,
    pub draws: u32,
    pub losses: u32,
    pub goals_for: u32,
    pub goals_against: u32,
    pub goal_difference: i64,
    pub points: u32,
    /// Last five results, most recent first, e.g. `"WWDLW"`.
    pub streak: String,
}

/// Teams appearing in `league`, in first-seen order.
pub fn league_teams(league: &str, matches: &[MatchRecord]) -> Vec<String> {
    let mut teams: Vec<String> = Vec::new();
    for m in matches.iter().filter(|m| m.league == league) {
        for team in [&m.home_team, &m.away_team] {
            if !teams.iter().any(|t| t == team) {
                teams.push(team.clone());
            }
        }
    }
    teams
}

pub fn standings(league: &str, matches: &[MatchRecord]) -> Vec<StandingRow> {
    let mut rows = league_teams(league, matches)
        .into_iter()
        .map(|team| {
            let snap = aggregate(&team, league, matches);
            let streak = recent_form(&team, league, matches, STREAK_LEN).streak();
            StandingRow {
                position: 0,
                goal_difference: snap.goal_difference(),
                played: snap.played,
                wins: snap.wins,
                draws: snap.draws,
                losses: snap.losses,
                goals_for: snap.goals_for,
                goals_against: snap.goals_against,
                points: snap.points,
                streak,
                team,
            }
        })
        .collect::<Vec<_>>();

    rows.sort_by(|a, b| {
        b.points
            .cmp(&a.points)
            .then(b.goal_difference.cmp(&a.goal_difference))
            .then(b.goals_for.cmp(&a.goals_for))
    });
    for (idx, row) in rows.iter_mut().enumerate() {
        row.position = idx + 1;
    }
    rows
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LineShare {
    pub line: GoalLine,
    pub over: u32,
    pub under: u32,
    pub over_pct: f64,
    pub under_pct: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreCount {
    pub score: ScoreLine,
    pub count: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TeamMark {
    pub team: String,
    pub goals: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GoalProfile {
    pub league: String,
    pub total_matches: usize,
    pub finished: usize,
    pub completion_pct: f64,
    pub total_goals: u32,
    pub avg_goals: f64,
    /// Lines 1.5 through 4.5.
    pub lines: Vec<LineShare>,
    pub btts_yes: u32,
    pub btts_no: u32,
    pub btts_yes_pct: f64,
    pub btts_no_pct: f64,
    /// Index is the match total; value is how many matches ended with it.
    pub goals_histogram: Vec<u32>,
    pub common_scores: Vec<ScoreCount>,
    pub best_attack: Option<TeamMark>,
    pub best_defence: Option<TeamMark>,
}

fn pct(part: u32, whole: usize) -> f64 {
    if whole == 0 {
        0.0
    } else {
        round_dp(part as f64 / whole as f64 * 100.0, 1)
    }
}

pub fn goal_profile(league: &str, matches: &[MatchRecord]) -> GoalProfile {
    let in_league = matches.iter().filter(|m| m.league == league).collect::<Vec<_>>();
    let scores = in_league
        .iter()
        .filter(|m| m.is_finished())
        .map(|m| m.score().unwrap_or(ScoreLine::new(0, 0)))
        .collect::<Vec<_>>();
    let finished = scores.len();

    let total_goals = scores.iter().fold(0u32, |acc, s| acc.saturating_add(s.total()));
    let avg_goals = if finished == 0 {
        0.0
    } else {
        round_dp(total_goals as f64 / finished as f64, 2)
    };

    let lines = GoalLine::ALL[1..]
        .iter()
        .map(|&line| {
            let over = scores.iter().filter(|s| line.is_over(s.total())).count() as u32;
            let under = finished as u32 - over;
            LineShare {
                line,
                over,
                under,
                over_pct: pct(over, finished),
                under_pct: pct(under, finished),
            }
        })
        .collect();

    let btts_yes = scores.iter().filter(|s| s.both_scored()).count() as u32;
    let btts_no = finished as u32 - btts_yes;

    // Totals above the cap share the last bucket.
    let bucket = |s: &ScoreLine| s.total().min(HISTOGRAM_CAP) as usize;
    let max_total = scores.iter().map(bucket).max().unwrap_or(0);
    let mut goals_histogram = if finished == 0 {
        Vec::new()
    } else {
        vec![0u32; max_total + 1]
    };
    for s in &scores {
        goals_histogram[bucket(s)] += 1;
    }

    // First-seen order breaks ties between equally common scores.
    let mut common_scores: Vec<ScoreCount> = Vec::new();
    for s in &scores {
        match common_scores.iter_mut().find(|c| c.score == *s) {
            Some(entry) => entry.count += 1,
            None => common_scores.push(ScoreCount { score: *s, count: 1 }),
        }
    }
    common_scores.sort_by(|a, b| b.count.cmp(&a.count));
    common_scores.truncate(TOP_SCORES);

    let mut best_attack: Option<TeamMark> = None;
    let mut best_defence: Option<TeamMark> = None;
    for team in league_teams(league, matches) {
        let snap = aggregate(&team, league, matches);
        if best_attack.as_ref().is_none_or(|b| snap.goals_for > b.goals) {
            best_attack = Some(TeamMark {
                team: team.clone(),
                goals: snap.goals_for,
            });
        }
        if best_defence.as_ref().is_none_or(|b| snap.goals_against < b.goals) {
            best_defence = Some(TeamMark {
                team,
                goals: snap.goals_against,
            });
        }
    }

    GoalProfile {
        league: league.to_string(),
        total_matches: in_league.len(),
        finished,
        completion_pct: pct(finished as u32, in_league.len()),
        total_goals,
        avg_goals,
        lines,
        btts_yes,
        btts_no,
        btts_yes_pct: pct(btts_yes, finished),
        btts_no_pct: pct(btts_no, finished),
        goals_histogram,
        common_scores,
        best_attack,
        best_defence,
    }
}
