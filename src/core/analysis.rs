use std::fmt;

use serde::{Serialize, Serializer};

use super::types::{HistoricalSummary, OutcomeSet, OutcomeSummary};

/// Long-run S&P 500 average annual return used as the comparison point.
pub const BENCHMARK_ANNUAL_RETURN: f64 = 0.07;
pub const HIGH_VOLATILITY: f64 = 0.20;
pub const SHORT_HORIZON_YEARS: u32 = 5;
pub const LOSS_PROBABILITY_THRESHOLD: f64 = 0.5;

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum Observation {
    AboveBenchmark,
    BelowBenchmark,
    HighVolatility,
    ShortHorizon,
    LongHorizonShortfall,
    HistoricalGrowth,
    HistoricalDecline,
    LikelyLoss,
    FavorableOutlook,
}

impl Observation {
    pub fn message(self) -> &'static str {
        match self {
            Observation::AboveBenchmark => {
                "The stock's average annual return is higher than typical benchmarks like the S&P 500. This might indicate a potentially higher reward but remember to evaluate the associated risks."
            }
            Observation::BelowBenchmark => {
                "The stock's average annual return is lower than benchmarks like the S&P 500. Consider understanding the reasons behind this before investing."
            }
            Observation::HighVolatility => {
                "The stock has high volatility, which means your investment might experience significant ups and downs. Ensure you're comfortable with this level of risk."
            }
            Observation::ShortHorizon => {
                "Although the average projected value seems promising, your time horizon is short. Stocks are typically volatile in the short term."
            }
            Observation::LongHorizonShortfall => {
                "Despite a longer time horizon, the average projected value is not promising. Diversifying or reconsidering your options might be a good idea."
            }
            Observation::HistoricalGrowth => {
                "Historically, this stock has shown growth from your start date till now. Past performance doesn't guarantee future results, but it provides context."
            }
            Observation::HistoricalDecline => {
                "The stock has declined in value from your chosen start date till now. It's important to understand why before making an investment decision."
            }
            Observation::LikelyLoss => {
                "There's a substantial probability of not achieving your principal amount based on the simulations. Diversifying your portfolio can help mitigate such risks."
            }
            Observation::FavorableOutlook => {
                "The simulations suggest a favorable outcome. Still, it's a good practice to diversify to protect against unforeseen market changes."
            }
        }
    }
}

impl fmt::Display for Observation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.message())
    }
}

impl Serialize for Observation {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.message())
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Analysis {
    pub summary: OutcomeSummary,
    pub observations: Vec<Observation>,
}

pub fn summarize_outcomes(outcomes: &OutcomeSet, principal: f64) -> OutcomeSummary {
    let values = outcomes.values();
    if values.is_empty() {
        return OutcomeSummary {
            mean: 0.0,
            median: 0.0,
            probability_of_loss: 0.0,
        };
    }

    let n = values.len() as f64;
    let losses = values.iter().filter(|&&v| v < principal).count();
    let mut sorted = values.to_vec();
    OutcomeSummary {
        mean: values.iter().sum::<f64>() / n,
        median: percentile(&mut sorted, 50.0),
        probability_of_loss: losses as f64 / n,
    }
}

pub fn analyze(
    history: &HistoricalSummary,
    outcomes: &OutcomeSet,
    principal: f64,
    years: u32,
) -> Analysis {
    let summary = summarize_outcomes(outcomes, principal);
    let mut observations = Vec::with_capacity(5);

    if history.stats.mean > BENCHMARK_ANNUAL_RETURN {
        observations.push(Observation::AboveBenchmark);
    } else {
        observations.push(Observation::BelowBenchmark);
    }

    if history.stats.std_dev > HIGH_VOLATILITY {
        observations.push(Observation::HighVolatility);
    }

    if years < SHORT_HORIZON_YEARS && summary.mean > principal {
        observations.push(Observation::ShortHorizon);
    } else if years >= SHORT_HORIZON_YEARS && summary.mean < principal {
        observations.push(Observation::LongHorizonShortfall);
    }

    if history.grew() {
        observations.push(Observation::HistoricalGrowth);
    } else {
        observations.push(Observation::HistoricalDecline);
    }

    if summary.probability_of_loss > LOSS_PROBABILITY_THRESHOLD {
        observations.push(Observation::LikelyLoss);
    } else {
        observations.push(Observation::FavorableOutlook);
    }

    Analysis {
        summary,
        observations,
    }
}

pub(crate) fn percentile(values: &mut [f64], p: f64) -> f64 {
    if values.is_empty() {
        return 0.0;
    }

    values.sort_by(|a, b| a.total_cmp(b));

    let n = values.len();
    if n == 1 {
        return values[0];
    }

    let rank = (p / 100.0) * (n as f64 - 1.0);
    let lower = rank.floor() as usize;
    let upper = rank.ceil() as usize;

    if lower == upper {
        values[lower]
    } else {
        let w = rank - lower as f64;
        values[lower] * (1.0 - w) + values[upper] * w
    }
}
