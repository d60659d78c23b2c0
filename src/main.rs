use clap::Parser;
use presupuestos::args::{Args, Command};
use presupuestos::{commands, Config, Result};
use std::process::ExitCode;
use tracing::{debug, error, trace};
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();
    let log_level = args.common().log_level();
    init_logger(log_level);
    debug!("Log level set to {}", log_level.to_string().to_lowercase());

    match main_inner(args).await {
        Ok(_) => ExitCode::SUCCESS,
        Err(e) => {
            error!("Exiting with error: {e}");
            ExitCode::FAILURE
        }
    }
}

pub async fn main_inner(args: Args) -> Result<()> {
    trace!("{args:?}");
    let common = args.common();
    let home = common.home().path();
    let source_url = common.source_url();
    let json = common.json();

    let _: () = match args.command() {
        Command::Init => commands::init(home, source_url).await?.print(json),

        Command::Summary(filter_args) => {
            let config = Config::load(home).await?;
            commands::summary(&config, source_url, &filter_args.filter())
                .await?
                .print(json)
        }

        Command::Totals(totals_args) => {
            let config = Config::load(home).await?;
            commands::totals(
                &config,
                source_url,
                totals_args.by(),
                &totals_args.filters().filter(),
            )
            .await?
            .print(json)
        }

        Command::Top(top_args) => {
            let config = Config::load(home).await?;
            commands::top(
                &config,
                source_url,
                top_args.n(),
                &top_args.filters().filter(),
            )
            .await?
            .print(json)
        }

        Command::Filters => {
            let config = Config::load(home).await?;
            commands::filters(&config, source_url).await?.print(json)
        }
    };
    Ok(())
}

/// Initializes the tracing subscriber.
pub fn init_logger(level: LevelFilter) {
    let filter = match std::env::var("RUST_LOG").ok() {
        Some(_) => {
            // RUST_LOG exists; use it.
            EnvFilter::from_default_env()
        }
        None => {
            // RUST_LOG does not exist; use default log level for this crate only.
            EnvFilter::new(format!(
                "{}={},{}={}",
                env!("CARGO_CRATE_NAME"),
                level,
                env!("CARGO_BIN_NAME"),
                level
            ))
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}
