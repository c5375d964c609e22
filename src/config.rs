use std::env;
use std::path::PathBuf;
use std::str::FromStr;

use tracing_subscriber::EnvFilter;

use crate::form::DEFAULT_FORM_WINDOW;
use crate::lifecycle::{DEFAULT_INGEST_WINDOW_MINS, DEFAULT_MATCH_WINDOW_MINS, LifecycleWindows};

const CACHE_DIR: &str = "football_forecast";
const DB_FILE: &str = "matches.sqlite";

/// Finished matches averaged for the overall hit rate.
pub const DEFAULT_ACCURACY_SAMPLE: usize = 15;

/// Finished matches averaged for the top-3 hit rate.
pub const DEFAULT_TOP_PICK_SAMPLE: usize = 30;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AccuracyConfig {
    pub form_window: usize,
    pub overall_sample: usize,
    pub top_pick_sample: usize,
}

impl Default for AccuracyConfig {
    fn default() -> Self {
        Self {
            form_window: DEFAULT_FORM_WINDOW,
            overall_sample: DEFAULT_ACCURACY_SAMPLE,
            top_pick_sample: DEFAULT_TOP_PICK_SAMPLE,
        }
    }
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub db_path: Option<PathBuf>,
    pub accuracy: AccuracyConfig,
    pub windows: LifecycleWindows,
}

fn parsed<T: FromStr>(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Option<T> {
    lookup(key).and_then(|v| v.trim().parse::<T>().ok())
}

impl AppConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Same as [`AppConfig::from_env`] with an arbitrary variable source.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let db_path = lookup("FORECAST_DB_PATH")
            .filter(|v| !v.trim().is_empty())
            .map(PathBuf::from)
            .or_else(|| default_db_path(&lookup));

        let form_window = parsed::<usize>(&lookup, "FORECAST_FORM_WINDOW")
            .unwrap_or(DEFAULT_FORM_WINDOW)
            .clamp(1, 20);

        let match_window = parsed::<i64>(&lookup, "FORECAST_MATCH_WINDOW_MINS")
            .unwrap_or(DEFAULT_MATCH_WINDOW_MINS)
            .clamp(60, 240);

        let ingest_window = parsed::<i64>(&lookup, "FORECAST_INGEST_WINDOW_MINS")
            .unwrap_or(DEFAULT_INGEST_WINDOW_MINS)
            .clamp(60, 360);

        let overall_sample = parsed::<usize>(&lookup, "FORECAST_ACCURACY_SAMPLE")
            .unwrap_or(DEFAULT_ACCURACY_SAMPLE)
            .max(1);

        let top_pick_sample = parsed::<usize>(&lookup, "FORECAST_TOP_PICK_SAMPLE")
            .unwrap_or(DEFAULT_TOP_PICK_SAMPLE)
            .max(1);

        Self {
            db_path,
            accuracy: AccuracyConfig {
                form_window,
                overall_sample,
                top_pick_sample,
            },
            windows: LifecycleWindows::from_minutes(match_window, ingest_window),
        }
    }
}

/// Binary start-up: `.env.local` then `.env`, and a stderr tracing
/// subscriber filtered by `RUST_LOG` (default `info`).
pub fn init_runtime() {
    let _ = dotenvy::from_filename(".env.local");
    let _ = dotenvy::from_filename(".env");
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

/// `$XDG_CACHE_HOME` or `$HOME/.cache`, resolved through `lookup`.
pub fn default_db_path(lookup: &impl Fn(&str) -> Option<String>) -> Option<PathBuf> {
    if let Some(base) = lookup("XDG_CACHE_HOME")
        && !base.trim().is_empty()
    {
        return Some(PathBuf::from(base).join(CACHE_DIR).join(DB_FILE));
    }
    let home = lookup("HOME").filter(|h| !h.trim().is_empty())?;
    Some(
        PathBuf::from(home)
            .join(".cache")
            .join(CACHE_DIR)
            .join(DB_FILE),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use std::collections::HashMap;

    fn config(vars: &[(&str, &str)]) -> AppConfig {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        AppConfig::from_lookup(|key| map.get(key).cloned())
    }

    #[test]
    fn defaults_when_unset() {
        let cfg = config(&[]);
        assert_eq!(cfg.accuracy, AccuracyConfig::default());
        assert_eq!(cfg.windows, LifecycleWindows::default());
    }

    #[test]
    fn clamps_and_ignores_garbage() {
        let cfg = config(&[
            ("FORECAST_FORM_WINDOW", "50"),
            ("FORECAST_MATCH_WINDOW_MINS", "10"),
            ("FORECAST_INGEST_WINDOW_MINS", "abc"),
            ("FORECAST_DB_PATH", "/tmp/x.sqlite"),
        ]);
        assert_eq!(cfg.accuracy.form_window, 20);
        assert_eq!(cfg.windows.match_window, Duration::minutes(60));
        assert_eq!(cfg.windows.ingest_window, Duration::minutes(180));
        assert_eq!(cfg.db_path, Some(PathBuf::from("/tmp/x.sqlite")));
    }

    #[test]
    fn db_path_falls_back_through_the_same_lookup() {
        let cfg = config(&[("XDG_CACHE_HOME", "/xdg"), ("HOME", "/home/u")]);
        assert_eq!(
            cfg.db_path,
            Some(PathBuf::from("/xdg/football_forecast/matches.sqlite"))
        );
        let cfg = config(&[("XDG_CACHE_HOME", " "), ("HOME", "/home/u")]);
        assert_eq!(
            cfg.db_path,
            Some(PathBuf::from("/home/u/.cache/football_forecast/matches.sqlite"))
        );
        assert_eq!(config(&[]).db_path, None);
    }
}
