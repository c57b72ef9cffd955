use std::time::Duration;

use chrono::NaiveDate;
use serde::Deserialize;
use tracing::{debug, warn};

use super::{DateRange, FetchError, PriceSource, validate_request};
use crate::core::{PricePoint, PriceSeries};

const DEFAULT_BASE_URL: &str = "https://query2.finance.yahoo.com";
const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36";

#[derive(Debug, Deserialize)]
struct ChartResponse {
    chart: ChartResult,
}

#[derive(Debug, Deserialize)]
struct ChartResult {
    result: Option<Vec<ChartData>>,
    error: Option<ChartError>,
}

#[derive(Debug, Deserialize)]
struct ChartError {
    code: String,
    description: String,
}

#[derive(Debug, Deserialize)]
struct ChartData {
    timestamp: Option<Vec<i64>>,
    indicators: Indicators,
}

#[derive(Debug, Deserialize)]
struct Indicators {
    quote: Vec<QuoteData>,
    adjclose: Option<Vec<AdjCloseData>>,
}

#[derive(Debug, Deserialize)]
struct QuoteData {
    close: Vec<Option<f64>>,
}

#[derive(Debug, Deserialize)]
struct AdjCloseData {
    adjclose: Vec<Option<f64>>,
}

#[derive(Debug, Clone)]
pub struct YahooSource {
    client: reqwest::Client,
    base_url: String,
}

impl YahooSource {
    pub fn new() -> Result<Self, FetchError> {
        Self::with_base_url(DEFAULT_BASE_URL)
    }

    pub fn with_base_url(base_url: &str) -> Result<Self, FetchError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| FetchError::Network(format!("failed to build HTTP client: {e}")))?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    fn chart_url(&self, symbol: &str, range: DateRange) -> String {
        let start_ts = day_start_timestamp(range.start);
        let end_ts = day_start_timestamp(range.end);
        format!(
            "{}/v8/finance/chart/{symbol}?period1={start_ts}&period2={end_ts}\
             &interval=1d&includeAdjustedClose=true",
            self.base_url
        )
    }
}

impl PriceSource for YahooSource {
    fn name(&self) -> &str {
        "Yahoo Finance"
    }

    async fn fetch(&self, ticker: &str, range: DateRange) -> Result<PriceSeries, FetchError> {
        validate_request(ticker, range)?;
        let symbol = ticker.trim().to_ascii_uppercase();
        let url = self.chart_url(&symbol, range);
        debug!(%symbol, %url, "requesting chart data");

        let resp = self.client.get(&url).send().await.map_err(|e| {
            warn!(%symbol, error = %e, "chart request failed");
            FetchError::Network(e.to_string())
        })?;

        let status = resp.status();
        if status == reqwest::StatusCode::NOT_FOUND {
            return Err(FetchError::SymbolNotFound { symbol });
        }
        if status.is_server_error() {
            return Err(FetchError::Unavailable(format!("HTTP {status} for {symbol}")));
        }
        if !status.is_success() {
            return Err(FetchError::Rejected(format!("HTTP {status} for {symbol}")));
        }

        let chart: ChartResponse = resp.json().await.map_err(|e| {
            FetchError::ResponseFormat(format!("failed to parse response for {symbol}: {e}"))
        })?;
        let points = parse_chart(&symbol, chart)?;
        if points.is_empty() {
            return Err(FetchError::NoData {
                symbol,
                start: range.start,
                end: range.end,
            });
        }
        debug!(%symbol, points = points.len(), "parsed chart data");

        PriceSeries::new(points).map_err(|e| FetchError::ResponseFormat(e.to_string()))
    }
}

fn day_start_timestamp(date: NaiveDate) -> i64 {
    date.and_time(chrono::NaiveTime::MIN).and_utc().timestamp()
}

fn parse_chart(symbol: &str, resp: ChartResponse) -> Result<Vec<PricePoint>, FetchError> {
    let result = resp.chart.result.ok_or_else(|| match resp.chart.error {
        Some(err) if err.code == "Not Found" => FetchError::SymbolNotFound {
            symbol: symbol.to_string(),
        },
        Some(err) => FetchError::Rejected(format!("{}: {}", err.code, err.description)),
        None => FetchError::ResponseFormat("empty result with no error".into()),
    })?;

    let Some(data) = result.into_iter().next() else {
        return Ok(Vec::new());
    };
    let Some(timestamps) = data.timestamp else {
        return Ok(Vec::new());
    };

    let closes = data
        .indicators
        .quote
        .into_iter()
        .next()
        .map(|q| q.close)
        .ok_or_else(|| FetchError::ResponseFormat("no quote data".into()))?;
    // Adjusted or raw for the whole series, never mixed per row.
    let column = data
        .indicators
        .adjclose
        .and_then(|v| v.into_iter().next())
        .map(|a| a.adjclose)
        .filter(|adj| adj.iter().any(Option::is_some))
        .unwrap_or(closes);

    let mut points: Vec<PricePoint> = Vec::with_capacity(timestamps.len());
    for (i, &ts) in timestamps.iter().enumerate() {
        let date = chrono::DateTime::from_timestamp(ts, 0)
            .map(|dt| dt.naive_utc().date())
            .ok_or_else(|| FetchError::ResponseFormat(format!("invalid timestamp: {ts}")))?;

        let Some(close) = column.get(i).copied().flatten() else {
            // holidays and halted sessions come back as nulls
            continue;
        };

        // Intraday refreshes can repeat the last session's date.
        match points.last_mut() {
            Some(last) if last.date == date => last.close = close,
            _ => points.push(PricePoint { date, close }),
        }
    }

    Ok(points)
}
