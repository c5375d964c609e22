use std::fs;

use anyhow::{Context, Result, anyhow};
use chrono::Utc;

use football_forecast::cli_args::{arg_value, args, parse_arg, path_arg};
use football_forecast::config::{AppConfig, init_runtime};
use football_forecast::history_store;
use football_forecast::ingest::{ingest_rows, parse_rows};
use football_forecast::match_record::MatchRecord;
use football_forecast::synthetic::{SeasonSpec, generate_season};

fn main() -> Result<()> {
    init_runtime();
    let args = args();
    let cfg = AppConfig::from_env();

    let db_path = path_arg(&args, "--db")
        .or_else(|| cfg.db_path.clone())
        .context("unable to resolve sqlite path")?;

    let records: Vec<MatchRecord> = if let Some(teams) = parse_arg::<usize>(&args, "--synthetic") {
        let league = arg_value(&args, "--league").unwrap_or_else(|| "Synthetic League".to_string());
        let seed = parse_arg::<u64>(&args, "--seed").unwrap_or(7);
        let start = Utc::now() - chrono::Duration::weeks(20);
        let mut spec = SeasonSpec::new(&league, teams, start, seed);
        if let Some(played) = parse_arg::<u32>(&args, "--played-rounds") {
            spec.played_rounds = played;
        }
        generate_season(&spec)
            .into_iter()
            .map(|mut m| {
                m.id = None;
                m
            })
            .collect()
    } else {
        let rows_path = path_arg(&args, "--rows")
            .ok_or_else(|| anyhow!("usage: hist_ingest --rows FILE.json | --synthetic TEAMS [--db PATH]"))?;
        let raw = fs::read_to_string(&rows_path)
            .with_context(|| format!("read rows {}", rows_path.display()))?;
        let rows = parse_rows(&raw)?;
        let batch = ingest_rows(&rows, Utc::now(), &cfg.windows);
        if !batch.rejected.is_empty() {
            println!("rejected rows: {}", batch.rejected.len());
            for err in batch.rejected.iter().take(6) {
                println!("  - {err}");
            }
        }
        batch.records
    };

    let mut conn = history_store::open_db(&db_path)?;
    let upserted = history_store::upsert_matches(&mut conn, &records)?;

    println!("Ingest complete");
    println!("DB: {}", db_path.display());
    println!("Matches upserted: {upserted}");
    for league in history_store::leagues(&conn)? {
        let stored = history_store::load_league(&conn, &league)?;
        let finished = stored.iter().filter(|m| m.is_finished()).count();
        println!("league {league}: matches={} finished={finished}", stored.len());
    }
    Ok(())
}
