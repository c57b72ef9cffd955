mod analysis;
mod engine;
mod error;
mod stats;
mod types;

pub use analysis::{
    Analysis, BENCHMARK_ANNUAL_RETURN, HIGH_VOLATILITY, LOSS_PROBABILITY_THRESHOLD, Observation,
    SHORT_HORIZON_YEARS, analyze, summarize_outcomes,
};
pub use engine::{ReturnMatrix, compound, draw_returns, project, rng_for};
pub use error::{ProjectionError, StatsError};
pub use stats::{annual_returns, return_stats, summarize_history};
pub use types::{
    ContributionPlan, Frequency, HistoricalSummary, MAX_DRAWS, MAX_SIMULATIONS, MAX_YEARS,
    OutcomeSet, OutcomeSummary, PricePoint, PriceSeries, ReturnStats, SimulationParams,
    TRADING_DAYS_PER_WEEK, TRADING_DAYS_PER_YEAR, draw_count,
};
