use axum::{
    Router,
    extract::{Json, Query, State},
    http::{StatusCode, header},
    response::{Html, IntoResponse, Response},
    routing::get,
};
use chrono::{Local, NaiveDate};
use clap::{Args, Parser, Subcommand};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use tokio::net::TcpListener;
use tracing::{info, warn};

use crate::core::{
    ContributionPlan, Frequency, MAX_DRAWS, MAX_SIMULATIONS, MAX_YEARS, SimulationParams,
    draw_count,
};
use crate::data::{DateRange, FetchError, YahooSource};
use crate::pipeline::{PipelineError, ProjectionRequest, run_projection};

const INDEX_HTML: &str = include_str!("../../web/index.html");

const DEFAULT_TICKER: &str = "^GSPC";
const DEFAULT_PRINCIPAL: f64 = 10_000.0;
const DEFAULT_YEARS: u32 = 10;
const DEFAULT_SIMULATIONS: u32 = 1000;

#[derive(Parser, Debug)]
#[command(
    name = "projector",
    about = "Monte Carlo projection of an investment from a security's historical annual returns"
)]
pub struct Cli {
    #[arg(long, global = true, help = "Seed for reproducible simulations")]
    pub seed: Option<u64>,
    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Prompt for inputs and run projections until declined (default)
    Interactive,
    /// Run a single projection from command-line flags
    Run(RunArgs),
    /// Serve the projection API and web page
    Serve {
        #[arg(long, default_value_t = 8080)]
        port: u16,
    },
}

#[derive(Args, Debug, Clone)]
pub struct RunArgs {
    #[arg(long, help = "Ticker symbol, e.g. AAPL or ^GSPC")]
    pub ticker: String,
    #[arg(long, help = "First day of price history (YYYY-MM-DD)")]
    pub start: NaiveDate,
    #[arg(long, help = "Day after the last day of price history (YYYY-MM-DD), defaults to today")]
    pub end: Option<NaiveDate>,
    #[arg(long, help = "Initial investment in USD")]
    pub principal: f64,
    #[arg(
        long,
        default_value_t = 0.0,
        help = "Amount added at every contribution, in USD"
    )]
    pub contribution: f64,
    #[arg(long, help = "Contribution frequency: daily, weekly, monthly or yearly")]
    pub frequency: Option<String>,
    #[arg(long, help = "Projection horizon in years")]
    pub years: u32,
    #[arg(long, default_value_t = DEFAULT_SIMULATIONS)]
    pub simulations: u32,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct ProjectPayload {
    ticker: Option<String>,
    start: Option<String>,
    end: Option<String>,
    principal: Option<f64>,
    contribution: Option<f64>,
    frequency: Option<String>,
    years: Option<u32>,
    simulations: Option<u32>,
    seed: Option<u64>,
}

#[derive(Debug, Serialize)]
struct ErrorResponse {
    error: String,
}

#[derive(Clone)]
struct AppState {
    source: YahooSource,
    seed: Option<u64>,
}

pub fn build_request(
    args: RunArgs,
    today: NaiveDate,
    seed: Option<u64>,
) -> Result<ProjectionRequest, String> {
    let ticker = args.ticker.trim().to_string();
    if ticker.is_empty() {
        return Err("--ticker must not be empty".to_string());
    }

    let end = args.end.unwrap_or(today);
    if end <= args.start {
        return Err("--end must be after --start".to_string());
    }

    if !args.principal.is_finite() || args.principal < 0.0 {
        return Err("--principal must be >= 0".to_string());
    }

    if !args.contribution.is_finite() || args.contribution < 0.0 {
        return Err("--contribution must be >= 0".to_string());
    }

    if args.years == 0 {
        return Err("--years must be > 0".to_string());
    }

    if args.years > MAX_YEARS {
        return Err(format!("--years must be <= {MAX_YEARS}"));
    }

    if args.simulations == 0 {
        return Err("--simulations must be > 0".to_string());
    }

    if args.simulations > MAX_SIMULATIONS {
        return Err(format!("--simulations must be <= {MAX_SIMULATIONS}"));
    }

    if draw_count(args.years, args.simulations) > MAX_DRAWS {
        return Err(format!(
            "--years * --simulations must be <= {MAX_DRAWS}, got {}",
            draw_count(args.years, args.simulations)
        ));
    }

    let contribution = match args.frequency.as_deref() {
        Some(raw) => {
            let frequency = raw
                .parse::<Frequency>()
                .map_err(|e| format!("--frequency: {e}"))?;
            ContributionPlan::Periodic {
                amount: args.contribution,
                frequency,
            }
        }
        None if args.contribution > 0.0 => {
            return Err("--frequency is required when --contribution > 0".to_string());
        }
        None => ContributionPlan::LumpSum,
    };

    Ok(ProjectionRequest {
        ticker,
        range: DateRange {
            start: args.start,
            end,
        },
        params: SimulationParams {
            principal: args.principal,
            contribution,
            years: args.years,
            simulations: args.simulations,
        },
        seed,
    })
}

fn default_args_for_api() -> RunArgs {
    RunArgs {
        ticker: DEFAULT_TICKER.to_string(),
        start: NaiveDate::from_ymd_opt(2000, 1, 1).unwrap_or_default(),
        end: None,
        principal: DEFAULT_PRINCIPAL,
        contribution: 0.0,
        frequency: None,
        years: DEFAULT_YEARS,
        simulations: DEFAULT_SIMULATIONS,
    }
}

#[cfg(test)]
fn api_request_from_json(
    json: &str,
    today: NaiveDate,
    default_seed: Option<u64>,
) -> Result<ProjectionRequest, String> {
    let payload = serde_json::from_str::<ProjectPayload>(json)
        .map_err(|e| format!("Invalid API JSON payload: {e}"))?;
    api_request_from_payload(payload, today, default_seed)
}

fn api_request_from_payload(
    payload: ProjectPayload,
    today: NaiveDate,
    default_seed: Option<u64>,
) -> Result<ProjectionRequest, String> {
    let mut args = default_args_for_api();

    if let Some(v) = payload.ticker {
        args.ticker = v;
    }
    if let Some(v) = payload.start {
        args.start = parse_api_date("--start", &v)?;
    }
    if let Some(v) = payload.end.filter(|v| !v.trim().is_empty()) {
        args.end = Some(parse_api_date("--end", &v)?);
    }
    if let Some(v) = payload.principal {
        args.principal = v;
    }
    if let Some(v) = payload.contribution {
        args.contribution = v;
    }
    if let Some(v) = payload.frequency.filter(|v| !v.trim().is_empty()) {
        args.frequency = Some(v);
    }
    if let Some(v) = payload.years {
        args.years = v;
    }
    if let Some(v) = payload.simulations {
        args.simulations = v;
    }

    build_request(args, today, payload.seed.or(default_seed))
}

fn parse_api_date(flag: &str, value: &str) -> Result<NaiveDate, String> {
    value
        .trim()
        .parse::<NaiveDate>()
        .map_err(|_| format!("{flag} must be a YYYY-MM-DD date, got '{value}'"))
}

pub async fn run_http_server(port: u16, seed: Option<u64>) -> std::io::Result<()> {
    let source = YahooSource::new().map_err(std::io::Error::other)?;
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let app = Router::new()
        .route("/", get(index_handler))
        .route("/index.html", get(index_handler))
        .route(
            "/api/project",
            get(project_get_handler).post(project_post_handler),
        )
        .fallback(not_found_handler)
        .with_state(AppState { source, seed });

    let listener = TcpListener::bind(addr).await?;
    info!(%addr, "projection API listening");
    println!("Projection API listening on http://{addr}");
    println!("Local access: http://127.0.0.1:{port}/");

    axum::serve(listener, app).await
}

async fn index_handler() -> impl IntoResponse {
    with_cache_control(Html(INDEX_HTML))
}

async fn not_found_handler() -> Response {
    error_response(StatusCode::NOT_FOUND, "Not found")
}

async fn project_get_handler(
    State(state): State<AppState>,
    Query(payload): Query<ProjectPayload>,
) -> Response {
    project_handler_impl(&state, payload).await
}

async fn project_post_handler(
    State(state): State<AppState>,
    Json(payload): Json<ProjectPayload>,
) -> Response {
    project_handler_impl(&state, payload).await
}

async fn project_handler_impl(state: &AppState, payload: ProjectPayload) -> Response {
    let today = Local::now().date_naive();
    let request = match api_request_from_payload(payload, today, state.seed) {
        Ok(request) => request,
        Err(msg) => return error_response(StatusCode::BAD_REQUEST, &msg),
    };

    match run_projection(&state.source, &request).await {
        Ok(report) => json_response(StatusCode::OK, report),
        Err(err) => {
            warn!(ticker = %request.ticker, error = %err, "projection request failed");
            error_response(status_for(&err), &err.to_string())
        }
    }
}

fn status_for(err: &PipelineError) -> StatusCode {
    match err {
        PipelineError::Fetch(FetchError::SymbolNotFound { .. }) => StatusCode::NOT_FOUND,
        PipelineError::Fetch(fetch) if fetch.is_transient() => StatusCode::BAD_GATEWAY,
        PipelineError::Fetch(FetchError::ResponseFormat(_)) => StatusCode::BAD_GATEWAY,
        PipelineError::Fetch(_) => StatusCode::BAD_REQUEST,
        PipelineError::Stats(_) => StatusCode::UNPROCESSABLE_ENTITY,
        PipelineError::Projection(_) => StatusCode::BAD_REQUEST,
    }
}

fn with_cache_control<R: IntoResponse>(response: R) -> Response {
    let mut response = response.into_response();
    response.headers_mut().insert(
        header::CACHE_CONTROL,
        header::HeaderValue::from_static("no-store"),
    );
    response
}

fn json_response<T: Serialize>(status: StatusCode, body: T) -> Response {
    with_cache_control((status, Json(body)))
}

fn error_response(status: StatusCode, msg: &str) -> Response {
    json_response(
        status,
        ErrorResponse {
            error: msg.to_string(),
        },
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{ProjectionError, StatsError};

    const EPS: f64 = 1e-6;

    fn assert_approx(actual: f64, expected: f64) {
        assert!(
            (actual - expected).abs() <= EPS,
            "expected {expected}, got {actual}"
        );
    }

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 6, 1).expect("valid date")
    }

    fn sample_args() -> RunArgs {
        default_args_for_api()
    }

    #[test]
    fn cli_parses_run_subcommand_with_global_seed() {
        let cli = Cli::try_parse_from([
            "projector",
            "--seed",
            "11",
            "run",
            "--ticker",
            "AAPL",
            "--start",
            "2015-01-01",
            "--principal",
            "5000",
            "--contribution",
            "200",
            "--frequency",
            "monthly",
            "--years",
            "7",
        ])
        .expect("valid command line");

        assert_eq!(cli.seed, Some(11));
        let Some(Command::Run(args)) = cli.command else {
            panic!("expected run subcommand");
        };
        assert_eq!(args.simulations, DEFAULT_SIMULATIONS);
        let request = build_request(args, today(), cli.seed).expect("valid request");
        assert_eq!(request.range.end, today());
        assert_eq!(
            request.params.contribution,
            ContributionPlan::Periodic {
                amount: 200.0,
                frequency: Frequency::Monthly
            }
        );
    }

    #[test]
    fn cli_defaults_to_interactive() {
        let cli = Cli::try_parse_from(["projector"]).expect("no arguments");
        assert!(cli.command.is_none());
        assert_eq!(cli.seed, None);
    }

    #[test]
    fn build_request_rejects_zero_years_and_simulations() {
        let mut args = sample_args();
        args.years = 0;
        let err = build_request(args, today(), None).expect_err("must reject zero years");
        assert!(err.contains("--years"));

        let mut args = sample_args();
        args.simulations = 0;
        let err = build_request(args, today(), None).expect_err("must reject zero simulations");
        assert!(err.contains("--simulations"));
    }

    #[test]
    fn build_request_caps_projection_size() {
        let mut args = sample_args();
        args.years = MAX_YEARS + 1;
        let err = build_request(args, today(), None).expect_err("too many years");
        assert!(err.contains("--years"));

        let mut args = sample_args();
        args.simulations = MAX_SIMULATIONS + 1;
        let err = build_request(args, today(), None).expect_err("too many simulations");
        assert!(err.contains("--simulations"));

        let mut args = sample_args();
        args.years = MAX_YEARS;
        args.simulations = MAX_SIMULATIONS;
        let err = build_request(args, today(), None).expect_err("matrix too large");
        assert!(err.contains("--years * --simulations"));

        let mut args = sample_args();
        args.years = MAX_YEARS;
        args.simulations = 100_000;
        assert!(build_request(args, today(), None).is_ok());
    }

    #[test]
    fn api_request_rejects_oversized_projection() {
        let err = api_request_from_json(
            r#"{"years": 4294967295, "simulations": 4294967295}"#,
            today(),
            None,
        )
        .expect_err("must not allocate an unbounded matrix");
        assert!(err.contains("--years"));
    }

    #[test]
    fn build_request_rejects_negative_amounts() {
        let mut args = sample_args();
        args.principal = -1.0;
        let err = build_request(args, today(), None).expect_err("negative principal");
        assert!(err.contains("--principal"));

        let mut args = sample_args();
        args.contribution = f64::NAN;
        let err = build_request(args, today(), None).expect_err("NaN contribution");
        assert!(err.contains("--contribution"));
    }

    #[test]
    fn build_request_requires_frequency_for_contributions() {
        let mut args = sample_args();
        args.contribution = 100.0;
        let err = build_request(args, today(), None).expect_err("missing frequency");
        assert!(err.contains("--frequency is required"));
    }

    #[test]
    fn build_request_rejects_unknown_frequency() {
        let mut args = sample_args();
        args.contribution = 100.0;
        args.frequency = Some("quarterly".to_string());
        let err = build_request(args, today(), None).expect_err("quarterly");
        assert!(err.contains("--frequency"));
        assert!(err.contains("quarterly"));
    }

    #[test]
    fn build_request_rejects_inverted_dates() {
        let mut args = sample_args();
        args.start = today();
        let err = build_request(args, today(), None).expect_err("end == start");
        assert!(err.contains("--end"));
    }

    #[test]
    fn api_request_from_json_parses_web_keys() {
        let json = r#"{
          "ticker": "MSFT",
          "start": "2012-03-01",
          "end": "2022-03-01",
          "principal": 2500,
          "contribution": 50,
          "frequency": "weekly",
          "years": 15,
          "simulations": 2000,
          "seed": 5
        }"#;
        let request = api_request_from_json(json, today(), None).expect("json should parse");

        assert_eq!(request.ticker, "MSFT");
        assert_eq!(
            request.range.start,
            NaiveDate::from_ymd_opt(2012, 3, 1).expect("valid date")
        );
        assert_eq!(
            request.range.end,
            NaiveDate::from_ymd_opt(2022, 3, 1).expect("valid date")
        );
        assert_approx(request.params.principal, 2500.0);
        assert_eq!(request.params.years, 15);
        assert_eq!(request.params.simulations, 2000);
        assert_eq!(request.seed, Some(5));
        assert_approx(request.params.contribution.annual_contribution(), 50.0 * 50.4);
    }

    #[test]
    fn api_request_uses_defaults_for_missing_keys() {
        let request = api_request_from_json("{}", today(), None).expect("defaults are valid");
        assert_eq!(request.ticker, DEFAULT_TICKER);
        assert_eq!(request.range.end, today());
        assert_eq!(request.params.contribution, ContributionPlan::LumpSum);
        assert_eq!(request.params.years, DEFAULT_YEARS);
    }

    #[test]
    fn api_request_falls_back_to_server_seed() {
        let request = api_request_from_json("{}", today(), Some(21)).expect("defaults");
        assert_eq!(request.seed, Some(21));

        let request =
            api_request_from_json(r#"{"seed": 3}"#, today(), Some(21)).expect("explicit seed");
        assert_eq!(request.seed, Some(3));
    }

    #[test]
    fn cli_accepts_seed_for_serve() {
        let cli = Cli::try_parse_from(["projector", "serve", "--seed", "8"]).expect("serve");
        assert_eq!(cli.seed, Some(8));
        assert!(matches!(cli.command, Some(Command::Serve { port: 8080 })));
    }

    #[test]
    fn api_request_rejects_bad_date() {
        let err = api_request_from_json(r#"{"start": "last year"}"#, today(), None)
            .expect_err("must reject free-form date");
        assert!(err.contains("--start"));
    }

    #[test]
    fn pipeline_errors_map_to_http_statuses() {
        let transient = PipelineError::Fetch(FetchError::Network("reset".into()));
        assert_eq!(status_for(&transient), StatusCode::BAD_GATEWAY);

        let missing = PipelineError::Fetch(FetchError::SymbolNotFound {
            symbol: "NOPE".into(),
        });
        assert_eq!(status_for(&missing), StatusCode::NOT_FOUND);

        let bad_input = PipelineError::Fetch(FetchError::InvalidRequest("empty".into()));
        assert_eq!(status_for(&bad_input), StatusCode::BAD_REQUEST);

        let empty = PipelineError::Stats(StatsError::EmptySeries);
        assert_eq!(status_for(&empty), StatusCode::UNPROCESSABLE_ENTITY);

        let frequency =
            PipelineError::Projection(ProjectionError::InvalidFrequency("hourly".into()));
        assert_eq!(status_for(&frequency), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn error_response_is_json_and_uncached() {
        let response = error_response(StatusCode::BAD_REQUEST, "--years must be > 0");
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            response.headers().get(header::CACHE_CONTROL),
            Some(&header::HeaderValue::from_static("no-store"))
        );
    }
}
