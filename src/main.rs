use std::io;

use anyhow::Context;
use chrono::Local;
use clap::Parser;
use projector::api::{Cli, Command, build_request, run_http_server};
use projector::console::{Console, print_report};
use projector::data::YahooSource;
use projector::pipeline::run_projection;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_writer(io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .init();

    let cli = Cli::parse();
    let today = Local::now().date_naive();

    match cli.command.unwrap_or(Command::Interactive) {
        Command::Interactive => {
            let source = YahooSource::new()?;
            let mut console = Console::new(io::stdin().lock(), io::stdout());
            console.run(&source, today, cli.seed).await?;
        }
        Command::Run(args) => {
            let request = build_request(args, today, cli.seed).map_err(anyhow::Error::msg)?;
            let source = YahooSource::new()?;
            let report = run_projection(&source, &request)
                .await
                .with_context(|| format!("projection for {} failed", request.ticker))?;
            print_report(&mut io::stdout().lock(), &report)?;
        }
        Command::Serve { port } => run_http_server(port, cli.seed).await?,
    }

    Ok(())
}
