use std::fmt;

use serde::{Deserialize, Serialize};

use crate::match_record::{MatchRecord, finished_for_team, sort_recent_first};

pub const DEFAULT_FORM_WINDOW: usize = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FormResult {
    Win,
    Draw,
    Loss,
}

impl FormResult {
    pub fn points(self) -> u32 {
        match self {
            FormResult::Win => 3,
            FormResult::Draw => 1,
            FormResult::Loss => 0,
        }
    }

    pub fn letter(self) -> char {
        match self {
            FormResult::Win => 'W',
            FormResult::Draw => 'D',
            FormResult::Loss => 'L',
        }
    }
}

impl fmt::Display for FormResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            FormResult::Win => "win",
            FormResult::Draw => "draw",
            FormResult::Loss => "loss",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FormEntry {
    pub opponent: String,
    /// Team's goals first, e.g. `"1-2"` for an away loss.
    pub score: String,
    pub result: FormResult,
    pub round: u32,
}

/// Most recent first.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FormSequence {
    pub entries: Vec<FormEntry>,
}

impl FormSequence {
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Points per match over the sequence; 0 for an empty sequence.
    pub fn form_score(&self) -> f64 {
        let points: u32 = self.entries.iter().map(|e| e.result.points()).sum();
        points as f64 / self.entries.len().max(1) as f64
    }

    pub fn streak(&self) -> String {
        self.entries.iter().map(|e| e.result.letter()).collect()
    }
}

/// The `n` most recent finished matches of `team` in `league`, ordered by
/// date then round, both descending.
pub fn recent_form(team: &str, league: &str, matches: &[MatchRecord], n: usize) -> FormSequence {
    let mut finished = finished_for_team(matches, team, league);
    sort_recent_first(&mut finished);

    let entries = finished
        .into_iter()
        .take(n)
        .map(|m| {
            let (scored, conceded) = m.goals_for_against(team);
            let result = match scored.cmp(&conceded) {
                std::cmp::Ordering::Greater => FormResult::Win,
                std::cmp::Ordering::Equal => FormResult::Draw,
                std::cmp::Ordering::Less => FormResult::Loss,
            };
            FormEntry {
                opponent: m.opponent_of(team).to_string(),
                score: format!("{scored}-{conceded}"),
                result,
                round: m.round,
            }
        })
        .collect();

    FormSequence { entries }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::match_record::MatchState;
    use chrono::{TimeZone, Utc};

    fn finished(round: u32, day: u32, home: &str, away: &str, hg: u32, ag: u32) -> MatchRecord {
        let mut m = MatchRecord::new("Liga", round, home, away);
        m.kickoff = Some(Utc.with_ymd_and_hms(2024, 9, day, 20, 0, 0).unwrap());
        m.home_goals = Some(hg);
        m.away_goals = Some(ag);
        m.state = MatchState::Finished;
        m
    }

    #[test]
    fn takes_most_recent_n_with_round_tiebreak() {
        let matches = vec![
            finished(1, 1, "A", "B", 2, 0),
            finished(2, 8, "C", "A", 1, 1),
            finished(4, 15, "A", "D", 0, 1),
            finished(3, 15, "E", "A", 0, 3),
        ];
        let form = recent_form("A", "Liga", &matches, 3);
        let rounds = form.entries.iter().map(|e| e.round).collect::<Vec<_>>();
        assert_eq!(rounds, vec![4, 3, 2]);
        assert_eq!(form.streak(), "LWD");
        assert_eq!(form.entries[1].score, "3-0");
        assert_eq!(form.entries[1].opponent, "E");
        assert!((form.form_score() - 4.0 / 3.0).abs() < 1e-9);
    }

    #[test]
    fn empty_form_scores_zero() {
        let form = recent_form("A", "Liga", &[], DEFAULT_FORM_WINDOW);
        assert!(form.is_empty());
        assert_eq!(form.form_score(), 0.0);
    }
}
