use chrono::Datelike;

use super::error::StatsError;
use super::types::{HistoricalSummary, PriceSeries, ReturnStats};

// One entry per calendar year, empty years reuse the previous close. The
// first entry is 0.
pub fn annual_returns(series: &PriceSeries) -> Result<Vec<f64>, StatsError> {
    let samples = year_end_closes(series)?;
    let mut returns = Vec::with_capacity(samples.len());
    returns.push(0.0);
    for pair in samples.windows(2) {
        returns.push(pair[1] / pair[0] - 1.0);
    }
    Ok(returns)
}

pub fn return_stats(returns: &[f64]) -> Result<ReturnStats, StatsError> {
    if returns.is_empty() {
        return Err(StatsError::EmptySeries);
    }

    let n = returns.len() as f64;
    let mean = returns.iter().sum::<f64>() / n;
    if returns.len() == 1 {
        return Ok(ReturnStats { mean, std_dev: 0.0 });
    }

    let variance = returns.iter().map(|r| (r - mean).powi(2)).sum::<f64>() / (n - 1.0);
    Ok(ReturnStats {
        mean,
        std_dev: variance.max(0.0).sqrt(),
    })
}

pub fn summarize_history(series: &PriceSeries) -> Result<HistoricalSummary, StatsError> {
    let (Some(first), Some(last)) = (series.first(), series.last()) else {
        return Err(StatsError::EmptySeries);
    };
    let annual_returns = annual_returns(series)?;
    let stats = return_stats(&annual_returns)?;

    Ok(HistoricalSummary {
        stats,
        annual_returns,
        first_date: first.date,
        last_date: last.date,
        first_close: first.close,
        last_close: last.close,
    })
}

fn year_end_closes(series: &PriceSeries) -> Result<Vec<f64>, StatsError> {
    let (Some(first), Some(last)) = (series.first(), series.last()) else {
        return Err(StatsError::EmptySeries);
    };

    let first_year = first.date.year();
    let year_count = (last.date.year() - first_year + 1) as usize;
    let mut closes: Vec<Option<f64>> = vec![None; year_count];
    for point in series.points() {
        let idx = (point.date.year() - first_year) as usize;
        closes[idx] = Some(point.close);
    }

    // The first bucket always holds the first observation.
    let mut samples = Vec::with_capacity(year_count);
    let mut carried = first.close;
    for close in closes {
        if let Some(close) = close {
            carried = close;
        }
        samples.push(carried);
    }
    Ok(samples)
}
