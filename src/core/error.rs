use chrono::NaiveDate;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum StatsError {
    #[error("price series is empty; nothing to estimate returns from")]
    EmptySeries,

    #[error("price series is not chronological: {next} follows {previous}")]
    Unordered { previous: NaiveDate, next: NaiveDate },

    #[error("invalid closing price {close} on {date}")]
    InvalidClose { date: NaiveDate, close: f64 },
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ProjectionError {
    #[error("invalid contribution frequency '{0}' (expected daily, weekly, monthly or yearly)")]
    InvalidFrequency(String),

    #[error("cannot sample returns from Normal(mean={mean}, std_dev={std_dev})")]
    InvalidDistribution { mean: f64, std_dev: f64 },
}
