use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};

use football_forecast::accuracy::forecast_for_match;
use football_forecast::cli_args::{args, has_flag, parse_arg, subcommand};
use football_forecast::config::init_runtime;
use football_forecast::form::DEFAULT_FORM_WINDOW;
use football_forecast::ingest::parse_result_text;
use football_forecast::match_record::{MatchRecord, MatchState};
use football_forecast::verify::verify;

#[derive(Debug, serde::Deserialize)]
struct BacktestCase {
    league: String,
    #[serde(default)]
    round: u32,
    home: String,
    away: String,
    /// Result text such as `"3:2"`; absent or `"-:-"` skips verification.
    #[serde(default)]
    result: Option<String>,
    #[serde(default)]
    history: Vec<MatchRecord>,
}

fn main() -> Result<()> {
    init_runtime();
    let args = args();
    let path = subcommand(&args)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("tests/fixtures/backtest_case.json"));
    let form_window = parse_arg::<usize>(&args, "--form").unwrap_or(DEFAULT_FORM_WINDOW);

    let raw = fs::read_to_string(&path)
        .with_context(|| format!("read backtest case {}", path.display()))?;
    let case: BacktestCase = serde_json::from_str(&raw).context("decode backtest case")?;

    // Offline: no database, history comes from the case file.
    let mut subject = MatchRecord::new(&case.league, case.round, &case.home, &case.away);
    subject.state = MatchState::Scheduled;
    let forecast = forecast_for_match(&subject, &case.history, form_window);
    let verification = case
        .result
        .as_deref()
        .and_then(parse_result_text)
        .map(|score| verify(score.home, score.away, &forecast));

    if has_flag(&args, "--json") {
        let out = serde_json::json!({ "forecast": forecast, "verification": verification });
        println!(
            "{}",
            serde_json::to_string_pretty(&out).context("encode json output")?
        );
        return Ok(());
    }

    println!("{} vs {} ({})", case.home, case.away, case.league);
    println!(
        "1X2: {:.1} / {:.1} / {:.1} -> {}",
        forecast.result.home, forecast.result.draw, forecast.result.away, forecast.result.pick
    );
    println!("exact score: {}", forecast.exact_score);
    for pick in &forecast.top_picks {
        println!(
            "#{} {} {:.1}% odds {:.2}",
            pick.position, pick.market, pick.probability, pick.odds
        );
    }
    if let Some(v) = verification {
        println!("actual {}: {}/{} hits ({:.1}%)", v.score, v.hits, v.total(), v.hit_pct);
        for check in &v.checks {
            let mark = if check.hit { "hit " } else { "miss" };
            println!(
                "  {mark} {:<22} {} ({})",
                check.family.to_string(),
                check.predicted,
                check.actual
            );
        }
        println!("top-3: {}/{} ({:.1}%)", v.top_hits, v.top_picks.len(), v.top_pct);
    }
    Ok(())
}
