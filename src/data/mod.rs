mod yahoo;

use std::future::Future;

use chrono::NaiveDate;
use serde::Serialize;
use thiserror::Error;

use crate::core::PriceSeries;

pub use yahoo::YahooSource;

/// Half-open window `[start, end)` of trading days to request.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Serialize)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error("symbol not found: {symbol}")]
    SymbolNotFound { symbol: String },

    #[error("no price data for {symbol} between {start} and {end}")]
    NoData {
        symbol: String,
        start: NaiveDate,
        end: NaiveDate,
    },

    #[error("request rejected by data provider: {0}")]
    Rejected(String),

    #[error("network unreachable: {0}")]
    Network(String),

    #[error("data provider unavailable: {0}")]
    Unavailable(String),

    #[error("unexpected response format: {0}")]
    ResponseFormat(String),
}

impl FetchError {
    pub fn is_transient(&self) -> bool {
        matches!(self, FetchError::Network(_) | FetchError::Unavailable(_))
    }
}

pub trait PriceSource {
    fn name(&self) -> &str;

    fn fetch(
        &self,
        ticker: &str,
        range: DateRange,
    ) -> impl Future<Output = Result<PriceSeries, FetchError>> + Send;
}

pub(crate) fn validate_request(ticker: &str, range: DateRange) -> Result<(), FetchError> {
    if ticker.trim().is_empty() {
        return Err(FetchError::InvalidRequest("ticker must not be empty".into()));
    }
    if range.end <= range.start {
        return Err(FetchError::InvalidRequest(format!(
            "end date {} must be after start date {}",
            range.end, range.start
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).expect("valid date")
    }

    #[test]
    fn validate_request_rejects_blank_ticker() {
        let range = DateRange {
            start: date(2020, 1, 1),
            end: date(2021, 1, 1),
        };
        let err = validate_request("  ", range).expect_err("blank ticker");
        assert!(matches!(err, FetchError::InvalidRequest(_)));
        assert!(!err.is_transient());
    }

    #[test]
    fn validate_request_rejects_inverted_range() {
        let range = DateRange {
            start: date(2021, 1, 1),
            end: date(2021, 1, 1),
        };
        let err = validate_request("SPY", range).expect_err("empty range");
        assert!(err.to_string().contains("must be after"));
    }

    #[test]
    fn only_network_and_upstream_failures_are_transient() {
        assert!(FetchError::Network("timeout".into()).is_transient());
        assert!(FetchError::Unavailable("HTTP 503".into()).is_transient());
        assert!(
            !FetchError::SymbolNotFound {
                symbol: "NOPE".into()
            }
            .is_transient()
        );
        assert!(!FetchError::ResponseFormat("no timestamps".into()).is_transient());
    }
}
