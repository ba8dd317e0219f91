pub mod config;
pub mod error;
pub mod period;
pub mod types;

pub use config::{AppConfig, CollectSettings, HashtagTarget, LocationTarget, ProcessSettings, TargetsConfig};
pub use error::TrendError;
pub use period::{current_period, period_for, previous_period, week_number};
pub use types::*;
