use serde::Serialize;
use thiserror::Error;
use tracing::{debug, info};

use crate::chart::HistogramChart;
use crate::core::{
    Analysis, HistoricalSummary, OutcomeSet, ProjectionError, SimulationParams, StatsError,
    analyze, project, rng_for, summarize_history,
};
use crate::data::{DateRange, FetchError, PriceSource};

#[derive(Debug, Clone, PartialEq)]
pub struct ProjectionRequest {
    pub ticker: String,
    pub range: DateRange,
    pub params: SimulationParams,
    pub seed: Option<u64>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectionReport {
    pub ticker: String,
    pub range: DateRange,
    pub params: SimulationParams,
    pub history: HistoricalSummary,
    #[serde(skip)]
    pub outcomes: OutcomeSet,
    pub analysis: Analysis,
    pub chart: HistogramChart,
}

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("error fetching data: {0}")]
    Fetch(#[from] FetchError),

    #[error("cannot estimate historical returns: {0}")]
    Stats(#[from] StatsError),

    #[error("cannot run projection: {0}")]
    Projection(#[from] ProjectionError),
}

pub async fn run_projection<S: PriceSource>(
    source: &S,
    request: &ProjectionRequest,
) -> Result<ProjectionReport, PipelineError> {
    info!(
        ticker = %request.ticker,
        start = %request.range.start,
        end = %request.range.end,
        source = source.name(),
        "fetching price history"
    );
    let prices = source.fetch(&request.ticker, request.range).await?;
    debug!(points = prices.len(), "price history received");

    let history = summarize_history(&prices)?;
    let params = request.params;
    let mut rng = rng_for(request.seed);
    let outcomes = project(&history.stats, &params, &mut rng)?;
    let analysis = analyze(&history, &outcomes, params.principal, params.years);
    let chart = HistogramChart::new(&request.ticker, params.years, &outcomes, params.principal);
    info!(
        simulations = outcomes.len(),
        mean = analysis.summary.mean,
        probability_of_loss = analysis.summary.probability_of_loss,
        "projection complete"
    );

    Ok(ProjectionReport {
        ticker: request.ticker.clone(),
        range: request.range,
        params,
        history,
        outcomes,
        analysis,
        chart,
    })
}

#[cfg(test)]
pub(crate) mod testing {
    use std::sync::Mutex;

    use chrono::NaiveDate;

    use super::*;
    use crate::core::{PricePoint, PriceSeries};

    pub(crate) struct StaticSource {
        prices: Vec<(NaiveDate, f64)>,
        pub(crate) requests: Mutex<Vec<String>>,
    }

    impl StaticSource {
        pub(crate) fn new(prices: Vec<(NaiveDate, f64)>) -> Self {
            Self {
                prices,
                requests: Mutex::new(Vec::new()),
            }
        }

        pub(crate) fn yearly(closes: &[f64]) -> Self {
            Self::new(
                closes
                    .iter()
                    .enumerate()
                    .map(|(i, &c)| {
                        let date = NaiveDate::from_ymd_opt(2010 + i as i32, 12, 31)
                            .expect("valid date");
                        (date, c)
                    })
                    .collect(),
            )
        }
    }

    impl PriceSource for StaticSource {
        fn name(&self) -> &str {
            "static"
        }

        async fn fetch(&self, ticker: &str, range: DateRange) -> Result<PriceSeries, FetchError> {
            crate::data::validate_request(ticker, range)?;
            if let Ok(mut requests) = self.requests.lock() {
                requests.push(ticker.to_string());
            }
            if ticker == "NOPE" {
                return Err(FetchError::SymbolNotFound {
                    symbol: ticker.to_string(),
                });
            }
            if ticker == "DOWN" {
                return Err(FetchError::Network("connection refused".into()));
            }
            let points = self
                .prices
                .iter()
                .filter(|(date, _)| *date >= range.start && *date < range.end)
                .map(|&(date, close)| PricePoint { date, close })
                .collect();
            PriceSeries::new(points).map_err(|e| FetchError::ResponseFormat(e.to_string()))
        }
    }
}
