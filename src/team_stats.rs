use serde::{Deserialize, Serialize};

use crate::markets::{GoalLine, round_dp};
use crate::match_record::MatchRecord;

/// Counts for one side of the pitch (home or away appearances).
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct SideSplit {
    pub played: u32,
    pub wins: u32,
    pub goals_for: u32,
    pub goals_against: u32,
}

impl SideSplit {
    pub fn avg_goals_for(&self) -> f64 {
        ratio(self.goals_for, self.played, 2)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GoalLineSplit {
    pub line: GoalLine,
    pub over: u32,
    pub under: u32,
    pub over_pct: f64,
    pub under_pct: f64,
}

/// Aggregate over one team's finished matches in one league.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TeamSnapshot {
    pub team: String,
    pub league: String,
    pub played: u32,
    pub wins: u32,
    pub draws: u32,
    pub losses: u32,
    pub goals_for: u32,
    pub goals_against: u32,
    pub points: u32,
    pub home: SideSplit,
    pub away: SideSplit,
    /// Points per match, 2 dp.
    pub avg_points: f64,
    pub avg_goals_for: f64,
    pub avg_goals_against: f64,
    /// Win percentage, 1 dp.
    pub win_pct: f64,
    pub goal_lines: [GoalLineSplit; 5],
}

impl TeamSnapshot {
    pub fn empty(team: &str, league: &str) -> Self {
        aggregate(team, league, &[])
    }

    pub fn goal_difference(&self) -> i64 {
        self.goals_for as i64 - self.goals_against as i64
    }

    pub fn goal_line(&self, line: GoalLine) -> &GoalLineSplit {
        &self.goal_lines[line.index()]
    }

    // The rates below divide by max(played, 1) and are not rounded.

    pub fn goal_diff_per_match(&self) -> f64 {
        self.goal_difference() as f64 / self.played.max(1) as f64
    }

    pub fn win_rate_pct(&self) -> f64 {
        self.wins as f64 / self.played.max(1) as f64 * 100.0
    }

    pub fn goals_for_per_match(&self) -> f64 {
        self.goals_for as f64 / self.played.max(1) as f64
    }

    pub fn goals_against_per_match(&self) -> f64 {
        self.goals_against as f64 / self.played.max(1) as f64
    }
}

fn ratio(numerator: u32, denominator: u32, places: i32) -> f64 {
    if denominator == 0 {
        0.0
    } else {
        round_dp(numerator as f64 / denominator as f64, places)
    }
}

fn pct(numerator: u32, denominator: u32) -> f64 {
    if denominator == 0 {
        0.0
    } else {
        round_dp(numerator as f64 / denominator as f64 * 100.0, 1)
    }
}

/// Single pass over `matches`, keeping only finished matches of `team` in
/// `league`. An empty history gives an all-zero snapshot.
pub fn aggregate(team: &str, league: &str, matches: &[MatchRecord]) -> TeamSnapshot {
    let mut played = 0u32;
    let (mut wins, mut draws, mut losses) = (0u32, 0u32, 0u32);
    let (mut goals_for, mut goals_against) = (0u32, 0u32);
    let mut home = SideSplit::default();
    let mut away = SideSplit::default();
    let mut over = [0u32; 5];

    for m in matches
        .iter()
        .filter(|m| m.is_finished() && m.league == league && m.involves(team))
    {
        played += 1;
        let (scored, conceded) = m.goals_for_against(team);
        let side = if m.home_team == team {
            &mut home
        } else {
            &mut away
        };
        side.played += 1;
        side.goals_for = side.goals_for.saturating_add(scored);
        side.goals_against = side.goals_against.saturating_add(conceded);
        goals_for = goals_for.saturating_add(scored);
        goals_against = goals_against.saturating_add(conceded);

        if scored > conceded {
            wins += 1;
            side.wins += 1;
        } else if scored == conceded {
            draws += 1;
        } else {
            losses += 1;
        }

        let total = scored.saturating_add(conceded);
        for line in GoalLine::ALL {
            if line.is_over(total) {
                over[line.index()] += 1;
            }
        }
    }

    let points = wins * 3 + draws;
    let goal_lines = GoalLine::ALL.map(|line| {
        let over = over[line.index()];
        let under = played - over;
        GoalLineSplit {
            line,
            over,
            under,
            over_pct: pct(over, played),
            under_pct: pct(under, played),
        }
    });

    TeamSnapshot {
        team: team.to_string(),
        league: league.to_string(),
        played,
        wins,
        draws,
        losses,
        goals_for,
        goals_against,
        points,
        home,
        away,
        avg_points: ratio(points, played, 2),
        avg_goals_for: ratio(goals_for, played, 2),
        avg_goals_against: ratio(goals_against, played, 2),
        win_pct: pct(wins, played),
        goal_lines,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::match_record::MatchState;

    fn finished(round: u32, home: &str, away: &str, hg: u32, ag: u32) -> MatchRecord {
        let mut m = MatchRecord::new("Liga", round, home, away);
        m.home_goals = Some(hg);
        m.away_goals = Some(ag);
        m.state = MatchState::Finished;
        m
    }

    #[test]
    fn empty_history_is_all_zero() {
        let snap = aggregate("Nobody", "Liga", &[]);
        assert_eq!(snap.played, 0);
        assert_eq!(snap.avg_points, 0.0);
        assert_eq!(snap.win_pct, 0.0);
        assert!(snap.goal_lines.iter().all(|g| g.over_pct == 0.0 && g.under_pct == 0.0));
        assert_eq!(snap.goal_diff_per_match(), 0.0);
    }

    #[test]
    fn counts_split_by_side_and_line() {
        let matches = vec![
            finished(1, "A", "B", 2, 1),
            finished(2, "C", "A", 0, 0),
            finished(3, "A", "D", 1, 3),
            finished(4, "B", "C", 5, 0),
        ];
        let snap = aggregate("A", "Liga", &matches);
        assert_eq!(snap.played, 3);
        assert_eq!((snap.wins, snap.draws, snap.losses), (1, 1, 1));
        assert_eq!(snap.wins + snap.draws + snap.losses, snap.played);
        assert_eq!(snap.points, 4);
        assert_eq!(snap.avg_points, 1.33);
        assert_eq!(snap.home.played, 2);
        assert_eq!(snap.home.goals_for, 3);
        assert_eq!(snap.away.goals_against, 0);
        assert_eq!(snap.win_pct, 33.3);

        let half = snap.goal_line(GoalLine::Half);
        assert_eq!((half.over, half.under), (2, 1));
        let two = snap.goal_line(GoalLine::TwoHalf);
        assert_eq!((two.over, two.under), (2, 1));
        for g in &snap.goal_lines {
            assert!((g.over_pct + g.under_pct - 100.0).abs() <= 0.1);
        }
    }

    #[test]
    fn ignores_unfinished_and_other_leagues() {
        let mut live = finished(1, "A", "B", 1, 0);
        live.state = MatchState::Live;
        let mut other = finished(2, "A", "B", 1, 0);
        other.league = "Copa".into();
        let snap = aggregate("A", "Liga", &[live, other]);
        assert_eq!(snap.played, 0);
    }

    #[test]
    fn huge_goal_counts_saturate() {
        let matches = [finished(1, "A", "B", u32::MAX, 1), finished(2, "B", "A", 0, 5)];
        let snap = aggregate("A", "Liga", &matches);
        assert_eq!(snap.played, 2);
        assert_eq!(snap.goals_for, u32::MAX);
        assert_eq!(snap.home.goals_for, u32::MAX);
        assert_eq!(snap.goal_line(GoalLine::FourHalf).over, 2);
    }
}
