use std::collections::HashMap;
use std::collections::hash_map::Entry;

use anyhow::{Context, Result, anyhow};
use chrono::{DateTime, Utc};
use rusqlite::Connection;
use tracing::info;

use football_forecast::accuracy::{
    forecast_for_match, league_accuracy, record_prediction, settle_prediction,
};
use football_forecast::cli_args::{arg_value, args, has_flag, parse_arg, path_arg, subcommand};
use football_forecast::config::{AppConfig, init_runtime};
use football_forecast::forecast::Forecast;
use football_forecast::history_store;
use football_forecast::league_table::{goal_profile, standings};
use football_forecast::lifecycle::reclassify_all;
use football_forecast::match_record::{MatchRecord, MatchState};
use football_forecast::verify::verify_match;

const USAGE: &str = "usage: football_forecast <forecast|standings|accuracy|reclassify> [--db PATH] [--league NAME] [--match ID] [--form N] [--now RFC3339] [--json]";

fn main() -> Result<()> {
    init_runtime();
    let args = args();
    let cfg = AppConfig::from_env();

    let db_path = path_arg(&args, "--db")
        .or_else(|| cfg.db_path.clone())
        .context("unable to resolve sqlite path")?;
    let conn = history_store::open_db(&db_path)?;
    let json = has_flag(&args, "--json");

    match subcommand(&args) {
        Some("forecast") => run_forecast(&conn, &args, &cfg, json),
        Some("standings") => run_standings(&conn, &args, json),
        Some("accuracy") => run_accuracy(&conn, &args, &cfg, json),
        Some("reclassify") => run_reclassify(&conn, &args, &cfg, json),
        _ => Err(anyhow!(USAGE)),
    }
}

fn league_arg(args: &[String]) -> Result<String> {
    arg_value(args, "--league").ok_or_else(|| anyhow!("--league is required\n{USAGE}"))
}

fn now_arg(args: &[String]) -> Result<DateTime<Utc>> {
    match arg_value(args, "--now") {
        Some(raw) => DateTime::parse_from_rfc3339(&raw)
            .map(|dt| dt.with_timezone(&Utc))
            .with_context(|| format!("invalid --now {raw:?}")),
        None => Ok(Utc::now()),
    }
}

fn print_json<T: serde::Serialize>(value: &T) -> Result<()> {
    println!(
        "{}",
        serde_json::to_string_pretty(value).context("encode json output")?
    );
    Ok(())
}

fn run_forecast(conn: &Connection, args: &[String], cfg: &AppConfig, json: bool) -> Result<()> {
    let form_window = parse_arg::<usize>(args, "--form").unwrap_or(cfg.accuracy.form_window);

    let targets: Vec<MatchRecord> = match parse_arg::<i64>(args, "--match") {
        Some(id) => vec![
            history_store::load_match(conn, id)?
                .ok_or_else(|| anyhow!("match {id} not found"))?,
        ],
        None => {
            let league = league_arg(args)?;
            history_store::load_league(conn, &league)?
                .into_iter()
                .filter(|m| m.state == MatchState::Scheduled)
                .collect()
        }
    };
    if targets.is_empty() {
        println!("No scheduled matches.");
        return Ok(());
    }

    let mut histories: HashMap<String, Vec<MatchRecord>> = HashMap::new();
    let mut forecasts = Vec::with_capacity(targets.len());
    for record in &targets {
        let history = match histories.entry(record.league.clone()) {
            Entry::Occupied(slot) => slot.into_mut(),
            Entry::Vacant(slot) => slot.insert(history_store::load_league(conn, &record.league)?),
        };
        let forecast = forecast_for_match(record, history, form_window);
        if let (Some(id), Some(pick)) = (record.id, record_prediction(record, &forecast)) {
            history_store::save_prediction(conn, id, pick)?;
            info!(match_id = id, pick = %pick, "prediction stored");
        }
        if !json {
            print_forecast(record, &forecast);
            if record.is_finished() {
                let verification = verify_match(record, &forecast)?;
                println!(
                    "  verified: {}/{} hits ({:.1}%), top-3 {}/{} ({:.1}%)",
                    verification.hits,
                    verification.total(),
                    verification.hit_pct,
                    verification.top_hits,
                    verification.top_picks.len(),
                    verification.top_pct
                );
            }
        }
        forecasts.push(forecast);
    }

    if json {
        print_json(&forecasts)?;
    }
    Ok(())
}

fn print_forecast(record: &MatchRecord, f: &Forecast) {
    println!("{} (round {}, {})", record.label(), record.round, record.state);
    println!(
        "  1X2: home {:.1}% draw {:.1}% away {:.1}% -> {}",
        f.result.home, f.result.draw, f.result.away, f.result.pick
    );
    println!(
        "  double chance: 1X {:.1}% 12 {:.1}% X2 {:.1}% -> {}",
        f.double_chance.home_or_draw,
        f.double_chance.home_or_away,
        f.double_chance.draw_or_away,
        f.double_chance.pick.code()
    );
    let lines = f
        .goals
        .lines
        .iter()
        .map(|l| format!("{} {:.1}/{:.1}", l.line, l.over, l.under))
        .collect::<Vec<_>>()
        .join("  ");
    println!("  over/under: {lines} -> {}", f.goals.pick);
    println!(
        "  btts: yes {:.1}% no {:.1}%  exact score: {}",
        f.btts.yes, f.btts.no, f.exact_score
    );
    for pick in &f.top_picks {
        println!(
            "  #{} {} {:.1}% (odds {:.2})",
            pick.position, pick.market, pick.probability, pick.odds
        );
    }
}

fn run_standings(conn: &Connection, args: &[String], json: bool) -> Result<()> {
    let league = league_arg(args)?;
    let matches = history_store::load_league(conn, &league)?;
    let table = standings(&league, &matches);
    let profile = goal_profile(&league, &matches);

    if json {
        return print_json(&serde_json::json!({ "standings": table, "goal_profile": profile }));
    }

    println!("{league}");
    println!(
        "{:>3} {:<24} {:>3} {:>3} {:>3} {:>3} {:>4} {:>4} {:>4} {:>4}  form",
        "#", "team", "P", "W", "D", "L", "GF", "GA", "GD", "Pts"
    );
    for row in &table {
        println!(
            "{:>3} {:<24} {:>3} {:>3} {:>3} {:>3} {:>4} {:>4} {:>4} {:>4}  {}",
            row.position,
            row.team,
            row.played,
            row.wins,
            row.draws,
            row.losses,
            row.goals_for,
            row.goals_against,
            row.goal_difference,
            row.points,
            row.streak
        );
    }
    println!(
        "played {}/{} ({:.1}%), {} goals, {:.2} per match, btts {:.1}%",
        profile.finished,
        profile.total_matches,
        profile.completion_pct,
        profile.total_goals,
        profile.avg_goals,
        profile.btts_yes_pct
    );
    for line in &profile.lines {
        println!(
            "  over {} {:.1}%  under {} {:.1}%",
            line.line, line.over_pct, line.line, line.under_pct
        );
    }
    if let Some(best) = &profile.best_attack {
        println!("best attack: {} ({} scored)", best.team, best.goals);
    }
    if let Some(best) = &profile.best_defence {
        println!("best defence: {} ({} conceded)", best.team, best.goals);
    }
    Ok(())
}

fn run_accuracy(conn: &Connection, args: &[String], cfg: &AppConfig, json: bool) -> Result<()> {
    let league = league_arg(args)?;
    let mut matches = history_store::load_league(conn, &league)?;

    let mut settled = 0usize;
    for record in matches.iter_mut() {
        if let (Some(id), Some(hit)) = (record.id, settle_prediction(record)) {
            history_store::save_prediction_hit(conn, id, hit)?;
            record.prediction_hit = Some(hit);
            settled += 1;
        }
    }
    if settled > 0 {
        info!(league = %league, settled, "predictions settled");
    }

    let report = league_accuracy(&league, &matches, &cfg.accuracy);
    if json {
        return print_json(&report);
    }
    println!("{league}");
    println!(
        "average hit rate: {:.1}% over {} matches",
        report.avg_hit_pct, report.overall_sampled
    );
    println!(
        "average top-3 hit rate: {:.1}% over {} matches",
        report.avg_top_pct, report.top_sampled
    );
    println!(
        "stored 1X2 picks: {}/{} ({:.1}%)",
        report.tally.hits, report.tally.settled, report.tally.hit_pct
    );
    Ok(())
}

fn run_reclassify(conn: &Connection, args: &[String], cfg: &AppConfig, json: bool) -> Result<()> {
    let now = now_arg(args)?;
    let mut records = match arg_value(args, "--league") {
        Some(league) => history_store::load_league(conn, &league)?,
        None => history_store::load_all(conn)?,
    };
    let summary = reclassify_all(&mut records, now, &cfg.windows);
    for record in records
        .iter()
        .filter(|r| summary.transitions.iter().any(|t| t.id == r.id))
    {
        history_store::save_state(conn, record)?;
    }

    if json {
        return print_json(&summary);
    }
    println!(
        "States updated: {} live, {} finished",
        summary.went_live, summary.finished
    );
    for t in &summary.transitions {
        println!("  {}: {} -> {}", t.label, t.from, t.to);
    }
    Ok(())
}
