//! driftwatch CLI - OKR drift analysis
//!
//! Runs the HTTP service or a single command against the local databases.

use anyhow::Result;
use clap::{Parser, Subcommand};
use driftwatch::handlers::{analyze, reports, research, seed, status};
use driftwatch::{server, AppState, Config};
use std::net::SocketAddr;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "driftwatch", version, about = "OKR drift analysis service")]
struct Cli {
    /// YAML configuration file
    #[arg(short, long, global = true, env = "DRIFTWATCH_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the HTTP service
    Serve {
        /// Listen address, overriding the config file
        #[arg(short, long)]
        listen: Option<SocketAddr>,
    },
    /// Analyze one subject and store the report
    Analyze(analyze::AnalyzeArgs),
    /// List stored reports for a subject
    Reports(reports::ReportsArgs),
    /// Answer a research query
    Research(research::ResearchArgs),
    /// Load demo subjects and activity
    SeedDemo,
    /// Show database and knowledge index status
    Status,
}

fn init_tracing(config: &Config) {
    // Initialize tracing; RUST_LOG wins over the config file
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .or_else(|_| tracing_subscriber::EnvFilter::try_new(&config.log_level))
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();
}

async fn run(cli: Cli) -> Result<()> {
    let config = Config::load(cli.config.as_deref())?;
    init_tracing(&config);

    // Initialize application state
    let state = AppState::new(config).await?;

    let output = match cli.command {
        Command::Serve { listen } => {
            let addr = listen.unwrap_or(state.config.listen);
            server::serve(state, addr).await?;
            String::new()
        }
        Command::Analyze(args) => analyze::analyze(&state, args).await?,
        Command::Reports(args) => reports::reports(&state, args).await?,
        Command::Research(args) => research::research(&state, args).await?,
        Command::SeedDemo => seed::seed_demo(&state).await?,
        Command::Status => status::status(&state).await?,
    };

    if !output.is_empty() {
        println!("{}", output);
    }
    Ok(())
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    if let Err(e) = run(cli).await {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}
