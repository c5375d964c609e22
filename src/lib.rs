pub mod accuracy;
pub mod cli_args;
pub mod config;
pub mod error;
pub mod forecast;
pub mod form;
pub mod history_store;
pub mod ingest;
pub mod league_table;
pub mod lifecycle;
pub mod markets;
pub mod match_record;
pub mod snapshot_cache;
pub mod synthetic;
pub mod team_stats;
pub mod verify;

pub use error::ForecastError;
pub use forecast::{Forecast, forecast};
pub use form::{FormSequence, recent_form};
pub use lifecycle::classify_state;
pub use match_record::{MatchRecord, MatchState, Outcome, ScoreLine};
pub use team_stats::{TeamSnapshot, aggregate};
pub use verify::{VerificationResult, verify};
