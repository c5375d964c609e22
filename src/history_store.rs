use std::path::Path;

use anyhow::{Context, Result, anyhow};
use chrono::{DateTime, Utc};
use rusqlite::{Connection, OptionalExtension, Row, params};

use crate::match_record::{MatchRecord, MatchState, Outcome};

pub fn open_db(path: &Path) -> Result<Connection> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).ok();
    }
    let conn =
        Connection::open(path).with_context(|| format!("open sqlite db {}", path.display()))?;
    init_schema(&conn)?;
    Ok(conn)
}

pub fn init_schema(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        r#"
        PRAGMA journal_mode = WAL;
        CREATE TABLE IF NOT EXISTS matches (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            league TEXT NOT NULL,
            round INTEGER NOT NULL,
            home_team TEXT NOT NULL,
            away_team TEXT NOT NULL,
            kickoff TEXT NULL,
            home_goals INTEGER NULL,
            away_goals INTEGER NULL,
            state TEXT NOT NULL,
            prediction TEXT NULL,
            prediction_hit INTEGER NULL,
            updated_at TEXT NOT NULL,
            UNIQUE(league, round, home_team, away_team)
        );
        CREATE INDEX IF NOT EXISTS idx_matches_league ON matches(league);
        CREATE INDEX IF NOT EXISTS idx_matches_state ON matches(state);
        "#,
    )
    .context("create sqlite schema")?;
    Ok(())
}

const SELECT_COLUMNS: &str = "SELECT id, league, round, home_team, away_team, kickoff, \
     home_goals, away_goals, state, prediction, prediction_hit FROM matches";

struct RawRow {
    id: i64,
    league: String,
    round: i64,
    home_team: String,
    away_team: String,
    kickoff: Option<String>,
    home_goals: Option<i64>,
    away_goals: Option<i64>,
    state: String,
    prediction: Option<String>,
    prediction_hit: Option<i64>,
}

impl RawRow {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            league: row.get(1)?,
            round: row.get(2)?,
            home_team: row.get(3)?,
            away_team: row.get(4)?,
            kickoff: row.get(5)?,
            home_goals: row.get(6)?,
            away_goals: row.get(7)?,
            state: row.get(8)?,
            prediction: row.get(9)?,
            prediction_hit: row.get(10)?,
        })
    }

    fn into_record(self) -> Result<MatchRecord> {
        let goals = |v: Option<i64>| -> Result<Option<u32>> {
            v.map(|g| u32::try_from(g).map_err(|_| anyhow!("negative goal count {g}")))
                .transpose()
        };
        let kickoff = self
            .kickoff
            .as_deref()
            .map(|raw| {
                DateTime::parse_from_rfc3339(raw)
                    .map(|dt| dt.with_timezone(&Utc))
                    .with_context(|| format!("decode kickoff {raw:?}"))
            })
            .transpose()?;
        let prediction = self
            .prediction
            .as_deref()
            .map(str::parse::<Outcome>)
            .transpose()?;

        Ok(MatchRecord {
            id: Some(self.id),
            league: self.league,
            round: u32::try_from(self.round).context("decode round")?,
            home_team: self.home_team,
            away_team: self.away_team,
            kickoff,
            home_goals: goals(self.home_goals)?,
            away_goals: goals(self.away_goals)?,
            state: self.state.parse::<MatchState>()?,
            prediction,
            prediction_hit: self.prediction_hit.map(|v| v != 0),
        })
    }
}

fn collect_rows(conn: &Connection, sql: &str, league: Option<&str>) -> Result<Vec<MatchRecord>> {
    let mut stmt = conn.prepare(sql).context("prepare load matches query")?;
    let rows = match league {
        Some(league) => stmt.query_map(params![league], RawRow::from_row),
        None => stmt.query_map([], RawRow::from_row),
    }
    .context("query load matches")?;

    let mut out = Vec::new();
    for row in rows {
        let raw = row.context("decode match row")?;
        out.push(raw.into_record()?);
    }
    Ok(out)
}

pub fn load_league(conn: &Connection, league: &str) -> Result<Vec<MatchRecord>> {
    let sql = format!("{SELECT_COLUMNS} WHERE league = ?1 ORDER BY round ASC, id ASC");
    collect_rows(conn, &sql, Some(league))
}

pub fn load_all(conn: &Connection) -> Result<Vec<MatchRecord>> {
    let sql = format!("{SELECT_COLUMNS} ORDER BY league ASC, round ASC, id ASC");
    collect_rows(conn, &sql, None)
}

pub fn load_match(conn: &Connection, id: i64) -> Result<Option<MatchRecord>> {
    let sql = format!("{SELECT_COLUMNS} WHERE id = ?1");
    let raw = conn
        .query_row(&sql, params![id], RawRow::from_row)
        .optional()
        .with_context(|| format!("load match {id}"))?;
    raw.map(RawRow::into_record).transpose()
}

pub fn leagues(conn: &Connection) -> Result<Vec<String>> {
    let mut stmt = conn
        .prepare("SELECT DISTINCT league FROM matches ORDER BY league ASC")
        .context("prepare leagues query")?;
    let rows = stmt
        .query_map([], |row| row.get::<_, String>(0))
        .context("query leagues")?;
    let mut out = Vec::new();
    for row in rows {
        out.push(row.context("decode league row")?);
    }
    Ok(out)
}

/// Insert or refresh scraped rows. A stored state never moves backwards, a
/// finished score is never overwritten, and a missing incoming score keeps
/// the stored one.
pub fn upsert_matches(conn: &mut Connection, records: &[MatchRecord]) -> Result<usize> {
    let tx = conn.transaction().context("begin upsert transaction")?;
    for record in records {
        upsert_match(&tx, record)?;
    }
    tx.commit().context("commit upsert transaction")?;
    Ok(records.len())
}

// State rank: scheduled < live < finished/suspended.
const UPSERT_SQL: &str = r#"
    INSERT INTO matches (
        league, round, home_team, away_team, kickoff,
        home_goals, away_goals, state, updated_at
    ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
    ON CONFLICT(league, round, home_team, away_team) DO UPDATE SET
        kickoff = COALESCE(excluded.kickoff, matches.kickoff),
        home_goals = CASE
            WHEN matches.state = 'finished' THEN matches.home_goals
            ELSE COALESCE(excluded.home_goals, matches.home_goals)
        END,
        away_goals = CASE
            WHEN matches.state = 'finished' THEN matches.away_goals
            ELSE COALESCE(excluded.away_goals, matches.away_goals)
        END,
        state = CASE
            WHEN (CASE matches.state WHEN 'scheduled' THEN 0 WHEN 'live' THEN 1 ELSE 2 END)
                >= (CASE excluded.state WHEN 'scheduled' THEN 0 WHEN 'live' THEN 1 ELSE 2 END)
            THEN matches.state
            ELSE excluded.state
        END,
        updated_at = excluded.updated_at
"#;

fn upsert_match(tx: &rusqlite::Transaction<'_>, m: &MatchRecord) -> Result<()> {
    tx.execute(
        UPSERT_SQL,
        params![
            m.league,
            m.round as i64,
            m.home_team,
            m.away_team,
            m.kickoff.map(|k| k.to_rfc3339()),
            m.home_goals.map(i64::from),
            m.away_goals.map(i64::from),
            m.state.as_str(),
            Utc::now().to_rfc3339(),
        ],
    )
    .with_context(|| format!("upsert match {}", m.label()))?;
    Ok(())
}

fn require_id(record: &MatchRecord) -> Result<i64> {
    record
        .id
        .ok_or_else(|| anyhow!("match {} has no storage id", record.label()))
}

pub fn save_state(conn: &Connection, record: &MatchRecord) -> Result<()> {
    let id = require_id(record)?;
    conn.execute(
        "UPDATE matches SET state = ?1, home_goals = ?2, away_goals = ?3, updated_at = ?4 WHERE id = ?5",
        params![
            record.state.as_str(),
            record.home_goals.map(i64::from),
            record.away_goals.map(i64::from),
            Utc::now().to_rfc3339(),
            id
        ],
    )
    .with_context(|| format!("save state for match {id}"))?;
    Ok(())
}

pub fn save_prediction(conn: &Connection, id: i64, pick: Outcome) -> Result<()> {
    conn.execute(
        "UPDATE matches SET prediction = ?1, updated_at = ?2 WHERE id = ?3 AND prediction IS NULL",
        params![pick.as_str(), Utc::now().to_rfc3339(), id],
    )
    .with_context(|| format!("save prediction for match {id}"))?;
    Ok(())
}

pub fn save_prediction_hit(conn: &Connection, id: i64, hit: bool) -> Result<()> {
    conn.execute(
        "UPDATE matches SET prediction_hit = ?1, updated_at = ?2 WHERE id = ?3 AND prediction_hit IS NULL",
        params![if hit { 1i64 } else { 0i64 }, Utc::now().to_rfc3339(), id],
    )
    .with_context(|| format!("save prediction result for match {id}"))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn memory_db() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        init_schema(&conn).unwrap();
        conn
    }

    fn record(state: MatchState, goals: Option<(u32, u32)>) -> MatchRecord {
        let mut m = MatchRecord::new("Liga", 5, "A", "B");
        m.kickoff = Some(Utc.with_ymd_and_hms(2024, 2, 10, 15, 30, 0).unwrap());
        m.state = state;
        m.home_goals = goals.map(|g| g.0);
        m.away_goals = goals.map(|g| g.1);
        m
    }

    #[test]
    fn upsert_round_trips_and_keeps_finished() {
        let mut conn = memory_db();
        upsert_matches(&mut conn, &[record(MatchState::Finished, Some((2, 2)))]).unwrap();
        upsert_matches(&mut conn, &[record(MatchState::Live, None)]).unwrap();

        let rows = load_league(&conn, "Liga").unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].state, MatchState::Finished);
        assert_eq!((rows[0].home_goals, rows[0].away_goals), (Some(2), Some(2)));
        assert_eq!(rows[0].kickoff, record(MatchState::Live, None).kickoff);
        assert_eq!(leagues(&conn).unwrap(), vec!["Liga".to_string()]);
    }

    #[test]
    fn rescrape_never_moves_state_back() {
        let mut conn = memory_db();
        upsert_matches(&mut conn, &[record(MatchState::Live, Some((0, 0)))]).unwrap();
        upsert_matches(&mut conn, &[record(MatchState::Scheduled, None)]).unwrap();
        let rows = load_league(&conn, "Liga").unwrap();
        assert_eq!(rows[0].state, MatchState::Live);

        upsert_matches(&mut conn, &[record(MatchState::Live, Some((1, 0)))]).unwrap();
        upsert_matches(&mut conn, &[record(MatchState::Finished, Some((1, 1)))]).unwrap();
        let rows = load_league(&conn, "Liga").unwrap();
        assert_eq!(rows[0].state, MatchState::Finished);
        assert_eq!((rows[0].home_goals, rows[0].away_goals), (Some(1), Some(1)));
    }

    #[test]
    fn late_rescrape_keeps_finished_score() {
        let mut conn = memory_db();
        upsert_matches(&mut conn, &[record(MatchState::Finished, Some((2, 2)))]).unwrap();
        upsert_matches(&mut conn, &[record(MatchState::Finished, Some((3, 1)))]).unwrap();
        let rows = load_league(&conn, "Liga").unwrap();
        assert_eq!((rows[0].home_goals, rows[0].away_goals), (Some(2), Some(2)));
    }

    #[test]
    fn prediction_written_once() {
        let mut conn = memory_db();
        upsert_matches(&mut conn, &[record(MatchState::Scheduled, None)]).unwrap();
        let id = load_all(&conn).unwrap()[0].id.unwrap();

        save_prediction(&conn, id, Outcome::Home).unwrap();
        save_prediction(&conn, id, Outcome::Away).unwrap();
        save_prediction_hit(&conn, id, true).unwrap();

        let stored = load_match(&conn, id).unwrap().unwrap();
        assert_eq!(stored.prediction, Some(Outcome::Home));
        assert_eq!(stored.prediction_hit, Some(true));
        assert!(load_match(&conn, id + 100).unwrap().is_none());
    }

    #[test]
    fn save_state_requires_id() {
        let conn = memory_db();
        assert!(save_state(&conn, &record(MatchState::Live, Some((0, 0)))).is_err());
    }
}
