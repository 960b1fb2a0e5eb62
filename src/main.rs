use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use clap::Subcommand;

use castcoach::analysis::{AnalysisService, AnalysisTarget};
use castcoach::config::AppConfig;
use castcoach::logging;

#[derive(Parser)]
#[command(name = "castcoach")]
#[command(about = "Farcaster influence analytics: metrics, themes, and coaching briefs")]
#[command(version)]
struct Cli {
    /// Enable verbose debug logging
    #[arg(short, long)]
    verbose: bool,

    /// Path to a config TOML file (defaults to config.toml)
    #[arg(short, long)]
    config: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the full analysis pipeline for one account
    Analyze {
        /// Account to analyze: a numeric fid or a username
        target: String,
        /// Lookback window in days
        #[arg(long)]
        days: Option<u32>,
        /// Maximum casts to fetch
        #[arg(long)]
        limit: Option<u32>,
        /// Abort the run after this many seconds
        #[arg(long, default_value = "300")]
        timeout_secs: u64,
        /// Pretty-print the report JSON
        #[arg(long)]
        pretty: bool,
    },
    /// Extract content features from a piece of text (offline helper)
    Features {
        /// The cast text to inspect
        text: String,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => AppConfig::from_file(path)
            .with_context(|| format!("failed to load config from {path}"))?,
        None => AppConfig::load().context("failed to load config")?,
    };

    if cli.verbose {
        logging::init_simple_logging()?;
    } else {
        logging::init_logging_with_config(Some(&config))?;
    }

    match cli.command {
        Commands::Analyze {
            target,
            days,
            limit,
            timeout_secs,
            pretty,
        } => {
            let mut config = config;
            if let Some(days) = days {
                config.analysis.days_back = days;
            }
            if let Some(limit) = limit {
                config.analysis.max_casts = limit;
            }

            let target = match target.parse::<u64>() {
                Ok(fid) => AnalysisTarget::Fid(fid),
                Err(_) => AnalysisTarget::Username(target.trim_start_matches('@').to_string()),
            };

            let service = AnalysisService::new(&config)?;
            let progress = |stage: &str, percent: u8| {
                eprintln!("[{percent:>3}%] {stage}");
            };

            let report = tokio::time::timeout(
                Duration::from_secs(timeout_secs),
                service.run(target, Some(&progress)),
            )
            .await
            .context("analysis timed out")??;

            let json = if pretty {
                serde_json::to_string_pretty(&report)?
            } else {
                serde_json::to_string(&report)?
            };
            println!("{json}");
        }
        Commands::Features { text } => {
            let cast = castcoach::models::Cast {
                hash: "0x0".to_string(),
                fid: 0,
                text,
                timestamp: chrono::Utc::now(),
                parent_hash: None,
                parent_fid: None,
                embeds: Vec::new(),
                mentions: Vec::new(),
            };
            let features = castcoach::analysis::extract_content_features(&cast);
            println!("{}", serde_json::to_string_pretty(&features)?);
        }
    }

    Ok(())
}
