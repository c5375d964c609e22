use chrono::{DateTime, Duration, Utc};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::match_record::{MatchRecord, MatchState};

const CHANCES_PER_MATCH: u32 = 6;
const HOME_BOOST: f64 = 1.15;

#[derive(Debug, Clone)]
pub struct SeasonSpec {
    pub league: String,
    pub teams: Vec<String>,
    pub start: DateTime<Utc>,
    pub days_between_rounds: i64,
    /// Rounds up to and including this one get a final score.
    pub played_rounds: u32,
    pub seed: u64,
}

impl SeasonSpec {
    pub fn new(league: &str, team_count: usize, start: DateTime<Utc>, seed: u64) -> Self {
        let teams = (1..=team_count).map(|i| format!("Team {i:02}")).collect::<Vec<_>>();
        let rounds = double_round_robin(teams.len()).len() as u32;
        Self {
            league: league.to_string(),
            teams,
            start,
            days_between_rounds: 7,
            played_rounds: rounds / 2,
            seed,
        }
    }
}

/// Circle-method pairings: `rounds[r]` lists `(home_idx, away_idx)`. The second
/// half mirrors the first with venues swapped. An odd team count gets a bye.
pub fn double_round_robin(team_count: usize) -> Vec<Vec<(usize, usize)>> {
    if team_count < 2 {
        return Vec::new();
    }
    let slots = team_count + team_count % 2;
    let mut ring = (0..slots).collect::<Vec<_>>();
    let mut first_half = Vec::with_capacity(slots - 1);
    for round in 0..slots - 1 {
        let mut pairs = Vec::with_capacity(slots / 2);
        for i in 0..slots / 2 {
            let (a, b) = (ring[i], ring[slots - 1 - i]);
            if a >= team_count || b >= team_count {
                continue;
            }
            pairs.push(if (round + i) % 2 == 0 { (a, b) } else { (b, a) });
        }
        first_half.push(pairs);
        ring[1..].rotate_right(1);
    }
    let second_half = first_half
        .iter()
        .map(|pairs| pairs.iter().map(|&(h, a)| (a, h)).collect::<Vec<_>>())
        .collect::<Vec<_>>();
    first_half.extend(second_half);
    first_half
}

fn goals(rng: &mut StdRng, strength: f64) -> u32 {
    let p = (strength * 0.25).clamp(0.02, 0.9);
    (0..CHANCES_PER_MATCH).filter(|_| rng.r#gen::<f64>() < p).count() as u32
}

pub fn generate_season(spec: &SeasonSpec) -> Vec<MatchRecord> {
    let mut rng = StdRng::seed_from_u64(spec.seed);
    let strengths = spec
        .teams
        .iter()
        .map(|_| rng.gen_range(0.6..1.6))
        .collect::<Vec<f64>>();

    let mut out = Vec::new();
    let mut next_id = 1i64;
    for (idx, pairs) in double_round_robin(spec.teams.len()).into_iter().enumerate() {
        let round = idx as u32 + 1;
        let kickoff = spec.start + Duration::days(spec.days_between_rounds * idx as i64);
        for (slot, (h, a)) in pairs.into_iter().enumerate() {
            let mut record =
                MatchRecord::new(&spec.league, round, &spec.teams[h], &spec.teams[a]);
            record.id = Some(next_id);
            next_id += 1;
            record.kickoff = Some(kickoff + Duration::hours(2 * slot as i64));
            if round <= spec.played_rounds {
                record.home_goals = Some(goals(&mut rng, strengths[h] * HOME_BOOST));
                record.away_goals = Some(goals(&mut rng, strengths[a]));
                record.state = MatchState::Finished;
            }
            out.push(record);
        }
    }
    out
}
