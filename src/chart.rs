use std::io::{self, Write};

use serde::Serialize;

use crate::core::OutcomeSet;

pub const DEFAULT_BINS: usize = 30;
const BAR_WIDTH: usize = 50;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HistogramBin {
    pub lower: f64,
    pub upper: f64,
    pub loss: usize,
    pub profit: usize,
}

impl HistogramBin {
    pub fn total(&self) -> usize {
        self.loss + self.profit
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HistogramChart {
    pub title: String,
    pub x_label: String,
    pub y_label: String,
    pub principal: f64,
    pub mean: f64,
    pub loss_count: usize,
    pub profit_count: usize,
    pub bins: Vec<HistogramBin>,
}

impl HistogramChart {
    pub fn new(ticker: &str, years: u32, outcomes: &OutcomeSet, principal: f64) -> Self {
        Self::with_bins(ticker, years, outcomes, principal, DEFAULT_BINS)
    }

    pub fn with_bins(
        ticker: &str,
        years: u32,
        outcomes: &OutcomeSet,
        principal: f64,
        bin_count: usize,
    ) -> Self {
        let values = outcomes.values();
        let mean = if values.is_empty() {
            0.0
        } else {
            values.iter().sum::<f64>() / values.len() as f64
        };
        let loss_count = values.iter().filter(|&&v| v < principal).count();

        Self {
            title: format!("{ticker} Investment Projection over {years} Years"),
            x_label: "Projected Value".to_string(),
            y_label: "Frequency".to_string(),
            principal,
            mean,
            loss_count,
            profit_count: values.len() - loss_count,
            bins: build_bins(values, principal, bin_count.max(1)),
        }
    }

    pub fn mean_bin(&self) -> Option<usize> {
        let last = self.bins.len().checked_sub(1)?;
        self.bins
            .iter()
            .position(|b| self.mean >= b.lower && self.mean < b.upper)
            .or(Some(last))
    }
}

fn build_bins(values: &[f64], principal: f64, bin_count: usize) -> Vec<HistogramBin> {
    let finite = values.iter().copied().filter(|v| v.is_finite());
    let (min, max) = finite.fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| {
        (lo.min(v), hi.max(v))
    });
    if min > max {
        return Vec::new();
    }

    let bin_count = if max > min { bin_count } else { 1 };
    let width = if max > min { (max - min) / bin_count as f64 } else { 1.0 };
    let mut bins: Vec<HistogramBin> = (0..bin_count)
        .map(|i| HistogramBin {
            lower: min + width * i as f64,
            upper: if i + 1 == bin_count {
                max.max(min + width)
            } else {
                min + width * (i + 1) as f64
            },
            loss: 0,
            profit: 0,
        })
        .collect();

    for &v in values.iter().filter(|v| v.is_finite()) {
        let idx = (((v - min) / width) as usize).min(bin_count - 1);
        if v < principal {
            bins[idx].loss += 1;
        } else {
            bins[idx].profit += 1;
        }
    }
    bins
}

pub trait ChartSink {
    fn render(&mut self, chart: &HistogramChart) -> io::Result<()>;
}

pub struct TerminalChart<W> {
    out: W,
}

impl<W: Write> TerminalChart<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

impl<W: Write> ChartSink for TerminalChart<W> {
    fn render(&mut self, chart: &HistogramChart) -> io::Result<()> {
        writeln!(self.out, "\n{}", chart.title)?;
        writeln!(self.out, "{}", "=".repeat(chart.title.len()))?;
        if chart.bins.is_empty() {
            writeln!(self.out, "(no simulated outcomes)")?;
            return Ok(());
        }

        let peak = chart.bins.iter().map(HistogramBin::total).max().unwrap_or(0).max(1);
        let mean_bin = chart.mean_bin();
        for (idx, bin) in chart.bins.iter().enumerate() {
            let loss = scaled(bin.loss, peak);
            let profit = scaled(bin.profit, peak);
            let marker = if Some(idx) == mean_bin { " <- mean" } else { "" };
            writeln!(
                self.out,
                "{:>14.2} | {}{} {}{marker}",
                bin.lower,
                "-".repeat(loss),
                "+".repeat(profit),
                bin.total(),
            )?;
        }
        writeln!(
            self.out,
            "{} (x) vs {} (bars); '-' LOSS: {}, '+' PROFIT: {}, mean {:.2}",
            chart.x_label, chart.y_label, chart.loss_count, chart.profit_count, chart.mean
        )?;
        self.out.flush()
    }
}

fn scaled(count: usize, peak: usize) -> usize {
    if count == 0 {
        return 0;
    }
    ((count * BAR_WIDTH) as f64 / peak as f64).round().max(1.0) as usize
}

#[cfg(test)]
mod tests {
    use super::*;

    fn outcomes(values: &[f64]) -> OutcomeSet {
        OutcomeSet::new(values.to_vec())
    }

    #[test]
    fn chart_splits_at_principal_inclusive_profit() {
        let chart = HistogramChart::with_bins(
            "AAPL",
            10,
            &outcomes(&[500.0, 999.99, 1000.0, 1500.0]),
            1000.0,
            4,
        );
        assert_eq!(chart.title, "AAPL Investment Projection over 10 Years");
        assert_eq!(chart.loss_count, 2);
        assert_eq!(chart.profit_count, 2);
        assert_eq!(chart.bins.len(), 4);
        assert_eq!(chart.bins.iter().map(HistogramBin::total).sum::<usize>(), 4);
        assert_eq!(chart.bins[3].profit, 1);
        assert!((chart.mean - 999.9975).abs() < 1e-9);
    }

    #[test]
    fn identical_values_collapse_into_one_bin() {
        let chart = HistogramChart::new("SPY", 1, &outcomes(&[1000.0; 100]), 1000.0);
        assert_eq!(chart.bins.len(), 1);
        assert_eq!(chart.bins[0].profit, 100);
        assert_eq!(chart.mean_bin(), Some(0));
    }

    #[test]
    fn empty_outcomes_have_no_bins() {
        let chart = HistogramChart::new("SPY", 1, &outcomes(&[]), 1000.0);
        assert!(chart.bins.is_empty());
        assert_eq!(chart.mean_bin(), None);
    }

    #[test]
    fn terminal_chart_marks_mean_bin() {
        let chart =
            HistogramChart::with_bins("QQQ", 5, &outcomes(&[100.0, 200.0, 300.0]), 150.0, 3);
        let mut sink = TerminalChart::new(Vec::new());
        sink.render(&chart).expect("render");
        let text = String::from_utf8(sink.into_inner()).expect("utf8");

        assert!(text.contains("QQQ Investment Projection over 5 Years"));
        assert_eq!(text.matches("<- mean").count(), 1);
        assert!(text.contains("'-' LOSS: 1, '+' PROFIT: 2"));
    }
}
