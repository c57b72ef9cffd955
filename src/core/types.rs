use std::fmt;
use std::str::FromStr;

use chrono::NaiveDate;
use serde::Serialize;

use super::error::{ProjectionError, StatsError};

pub const TRADING_DAYS_PER_YEAR: f64 = 252.0;
pub const TRADING_DAYS_PER_WEEK: f64 = 5.0;

pub const MAX_YEARS: u32 = 200;
pub const MAX_SIMULATIONS: u32 = 1_000_000;
pub const MAX_DRAWS: u64 = 20_000_000;

#[derive(Copy, Clone, Debug, PartialEq, Serialize)]
pub struct PricePoint {
    pub date: NaiveDate,
    pub close: f64,
}

/// Chronologically ordered closing prices. Dates are strictly increasing and
/// every close is finite and positive.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct PriceSeries {
    points: Vec<PricePoint>,
}

impl PriceSeries {
    pub fn new(points: Vec<PricePoint>) -> Result<Self, StatsError> {
        for (idx, point) in points.iter().enumerate() {
            if !point.close.is_finite() || point.close <= 0.0 {
                return Err(StatsError::InvalidClose {
                    date: point.date,
                    close: point.close,
                });
            }
            if idx > 0 && points[idx - 1].date >= point.date {
                return Err(StatsError::Unordered {
                    previous: points[idx - 1].date,
                    next: point.date,
                });
            }
        }
        Ok(Self { points })
    }

    pub fn points(&self) -> &[PricePoint] {
        &self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn first(&self) -> Option<&PricePoint> {
        self.points.first()
    }

    pub fn last(&self) -> Option<&PricePoint> {
        self.points.last()
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReturnStats {
    pub mean: f64,
    pub std_dev: f64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoricalSummary {
    pub stats: ReturnStats,
    pub annual_returns: Vec<f64>,
    pub first_date: NaiveDate,
    pub last_date: NaiveDate,
    pub first_close: f64,
    pub last_close: f64,
}

impl HistoricalSummary {
    pub fn grew(&self) -> bool {
        self.first_close < self.last_close
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Frequency {
    Daily,
    Weekly,
    Monthly,
    Yearly,
}

impl Frequency {
    pub fn contributions_per_year(self) -> f64 {
        match self {
            Frequency::Daily => TRADING_DAYS_PER_YEAR,
            Frequency::Weekly => TRADING_DAYS_PER_YEAR / TRADING_DAYS_PER_WEEK,
            Frequency::Monthly => 12.0,
            Frequency::Yearly => 1.0,
        }
    }
}

impl FromStr for Frequency {
    type Err = ProjectionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "daily" => Ok(Frequency::Daily),
            "weekly" => Ok(Frequency::Weekly),
            "monthly" => Ok(Frequency::Monthly),
            "yearly" => Ok(Frequency::Yearly),
            _ => Err(ProjectionError::InvalidFrequency(s.trim().to_string())),
        }
    }
}

impl fmt::Display for Frequency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Frequency::Daily => "daily",
            Frequency::Weekly => "weekly",
            Frequency::Monthly => "monthly",
            Frequency::Yearly => "yearly",
        };
        f.write_str(name)
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "mode", rename_all = "camelCase")]
pub enum ContributionPlan {
    LumpSum,
    Periodic { amount: f64, frequency: Frequency },
}

impl ContributionPlan {
    pub fn annual_contribution(&self) -> f64 {
        match self {
            ContributionPlan::LumpSum => 0.0,
            ContributionPlan::Periodic { amount, frequency } => {
                amount * frequency.contributions_per_year()
            }
        }
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SimulationParams {
    pub principal: f64,
    pub contribution: ContributionPlan,
    pub years: u32,
    pub simulations: u32,
}

pub fn draw_count(years: u32, simulations: u32) -> u64 {
    u64::from(years) * u64::from(simulations)
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(transparent)]
pub struct OutcomeSet {
    values: Vec<f64>,
}

impl OutcomeSet {
    pub fn new(values: Vec<f64>) -> Self {
        Self { values }
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OutcomeSummary {
    pub mean: f64,
    pub median: f64,
    pub probability_of_loss: f64,
}
