use std::io::{self, BufRead, Write};

use chrono::NaiveDate;
use thiserror::Error;
use tracing::warn;

use crate::chart::{ChartSink, TerminalChart};
use crate::core::{
    ContributionPlan, Frequency, MAX_DRAWS, MAX_SIMULATIONS, MAX_YEARS, ProjectionError,
    SimulationParams, draw_count,
};
use crate::data::{DateRange, PriceSource};
use crate::pipeline::{PipelineError, ProjectionReport, ProjectionRequest, run_projection};

const DATE_FORMAT: &str = "%Y-%m-%d";

const WELCOME: &str = "\
WELCOME!
==============
This tool provides investment projections based on historical data to help you visualize potential outcomes. Remember, past performance doesn't dictate future results.
While these insights can be useful, they're not tailored financial advice. If you're making big financial decisions, having a chat with a financial advisor is always a good idea!
Have fun exploring and always invest wisely!
==============
";
const GOODBYE: &str = "\nThank you for using the investment projector. See you again!";

const ASK_TICKER: &str =
    "Which stock or index are you interested in? (e.g., AAPL for Apple or ^GSPC for S&P 500): ";
const ASK_START: &str = "From which date should we begin the backtest? (format: YYYY-MM-DD): ";
const ASK_END: &str =
    "Until which date should the backtest run? (format: YYYY-MM-DD, leave empty for today): ";
const ASK_MODE: &str =
    "Would you like to invest as a lump sum or periodically? (Enter 'lump sum' or 'periodic'): ";
const ASK_LUMP_PRINCIPAL: &str = "How much are you thinking of investing initially (in USD)? ";
const ASK_UPFRONT_PRINCIPAL: &str =
    "How much are you investing upfront (in USD), excluding any periodic contributions? ";
const ASK_CONTRIBUTION: &str = "How much will you invest periodically (in USD)? ";
const ASK_FREQUENCY: &str = "How often will you make this investment? (Enter 'daily', 'weekly', 'monthly', or 'yearly'): ";
const ASK_YEARS: &str = "Over how many years are you considering this investment? ";
const ASK_SIMULATIONS: &str = "To make our projections robust, we'll run several simulations. How many simulations would you like? (typically 1000 or more): ";
const ASK_AGAIN: &str = "\nWould you like to test another investment? Enter 'yes' to continue or any other key to exit: ";

#[derive(Debug, Error)]
pub enum InputError {
    #[error(transparent)]
    Io(#[from] io::Error),

    #[error("input closed")]
    EndOfInput,

    #[error("'{value}' is not a valid {field}")]
    InvalidNumber { field: &'static str, value: String },

    #[error("{field} must be {expected}, got {value}")]
    OutOfRange {
        field: &'static str,
        expected: String,
        value: String,
    },

    #[error("'{0}' is not a date in YYYY-MM-DD format")]
    InvalidDate(String),

    #[error("unknown investment mode '{0}' (enter 'lump sum' or 'periodic')")]
    InvalidMode(String),

    #[error(transparent)]
    Frequency(#[from] ProjectionError),
}

pub struct Console<R, W> {
    input: R,
    output: W,
}

impl<R: BufRead, W: Write> Console<R, W> {
    pub fn new(input: R, output: W) -> Self {
        Self { input, output }
    }

    pub fn into_output(self) -> W {
        self.output
    }

    fn prompt(&mut self, question: &str) -> Result<String, InputError> {
        write!(self.output, "{question}")?;
        self.output.flush()?;

        let mut line = String::new();
        if self.input.read_line(&mut line)? == 0 {
            return Err(InputError::EndOfInput);
        }
        Ok(line.trim().to_string())
    }

    pub fn read_request(
        &mut self,
        today: NaiveDate,
        seed: Option<u64>,
    ) -> Result<ProjectionRequest, InputError> {
        let ticker = self.prompt(ASK_TICKER)?;
        let start = parse_date(&self.prompt(ASK_START)?)?;
        let end = match self.prompt(ASK_END)? {
            answer if answer.is_empty() => today,
            answer => parse_date(&answer)?,
        };

        let mode = self.prompt(ASK_MODE)?.to_lowercase();
        let (principal, contribution) = match mode.as_str() {
            "lump sum" => {
                let principal = parse_amount("principal", &self.prompt(ASK_LUMP_PRINCIPAL)?)?;
                (principal, ContributionPlan::LumpSum)
            }
            "periodic" => {
                let principal =
                    parse_amount("principal", &self.prompt(ASK_UPFRONT_PRINCIPAL)?)?;
                let amount = parse_amount("contribution", &self.prompt(ASK_CONTRIBUTION)?)?;
                let frequency: Frequency = self.prompt(ASK_FREQUENCY)?.parse()?;
                (principal, ContributionPlan::Periodic { amount, frequency })
            }
            _ => return Err(InputError::InvalidMode(mode)),
        };

        let years = parse_count("number of years", &self.prompt(ASK_YEARS)?, MAX_YEARS)?;
        let simulations = parse_count(
            "simulation count",
            &self.prompt(ASK_SIMULATIONS)?,
            MAX_SIMULATIONS,
        )?;
        if draw_count(years, simulations) > MAX_DRAWS {
            return Err(InputError::OutOfRange {
                field: "years times simulations",
                expected: format!("at most {MAX_DRAWS}"),
                value: draw_count(years, simulations).to_string(),
            });
        }

        Ok(ProjectionRequest {
            ticker,
            range: DateRange { start, end },
            params: SimulationParams {
                principal,
                contribution,
                years,
                simulations,
            },
            seed,
        })
    }

    pub async fn run<S: PriceSource>(
        &mut self,
        source: &S,
        today: NaiveDate,
        seed: Option<u64>,
    ) -> io::Result<()> {
        writeln!(self.output, "{WELCOME}")?;

        loop {
            match self.read_request(today, seed) {
                Ok(request) => match run_projection(source, &request).await {
                    Ok(report) => {
                        print_report(&mut self.output, &report)?;
                    }
                    Err(err) => {
                        warn!(error = %err, ticker = %request.ticker, "projection failed");
                        print_pipeline_error(&mut self.output, &err)?;
                    }
                },
                Err(InputError::EndOfInput) => return Ok(()),
                Err(InputError::Io(err)) => return Err(err),
                Err(err) => writeln!(self.output, "\nInvalid input: {err}")?,
            }

            match self.prompt(ASK_AGAIN) {
                Ok(answer) if answer.eq_ignore_ascii_case("yes") => continue,
                Ok(_) => {
                    writeln!(self.output, "{GOODBYE}")?;
                    return Ok(());
                }
                Err(InputError::Io(err)) => return Err(err),
                Err(_) => return Ok(()),
            }
        }
    }
}

pub fn print_report<W: Write>(out: &mut W, report: &ProjectionReport) -> io::Result<()> {
    let stats = report.history.stats;
    writeln!(out)?;
    writeln!(out, "Average Annual Return: {:.2}%", stats.mean * 100.0)?;
    writeln!(out, "Standard Deviation of Returns: {:.2}%", stats.std_dev * 100.0)?;

    TerminalChart::new(&mut *out).render(&report.chart)?;

    let summary = report.analysis.summary;
    writeln!(out)?;
    writeln!(out, "Mean projected value: {:.2}", summary.mean)?;
    writeln!(out, "Median projected value: {:.2}", summary.median)?;
    writeln!(
        out,
        "Probability of ending below principal: {:.1}%",
        summary.probability_of_loss * 100.0
    )?;
    writeln!(out)?;
    for observation in &report.analysis.observations {
        writeln!(out, "{observation}")?;
    }
    Ok(())
}

fn print_pipeline_error<W: Write>(out: &mut W, err: &PipelineError) -> io::Result<()> {
    match err {
        PipelineError::Fetch(fetch) => {
            writeln!(
                out,
                "\nError fetching data. Please check your ticker and date inputs."
            )?;
            writeln!(out, "Details: {fetch}")?;
            if fetch.is_transient() {
                writeln!(out, "The data provider may be temporarily unreachable.")?;
            }
        }
        other => writeln!(out, "\n{other}")?,
    }
    Ok(())
}

fn parse_date(value: &str) -> Result<NaiveDate, InputError> {
    NaiveDate::parse_from_str(value, DATE_FORMAT).map_err(|_| InputError::InvalidDate(value.into()))
}

fn parse_amount(field: &'static str, value: &str) -> Result<f64, InputError> {
    let amount: f64 = value.parse().map_err(|_| InputError::InvalidNumber {
        field,
        value: value.into(),
    })?;
    if !amount.is_finite() || amount < 0.0 {
        return Err(InputError::OutOfRange {
            field,
            expected: "a non-negative amount".into(),
            value: value.into(),
        });
    }
    Ok(amount)
}

fn parse_count(field: &'static str, value: &str, max: u32) -> Result<u32, InputError> {
    let count: u32 = value.parse().map_err(|_| InputError::InvalidNumber {
        field,
        value: value.into(),
    })?;
    if count == 0 || count > max {
        return Err(InputError::OutOfRange {
            field,
            expected: format!("between 1 and {max}"),
            value: value.into(),
        });
    }
    Ok(count)
}
