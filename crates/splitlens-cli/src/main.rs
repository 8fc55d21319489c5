//! Splitlens CLI: entry point.
//!
//! # Commands
//!
//! - `splitlens analyze (--experiment ID | --file PATH)`: analyse one experiment and save the report
//! - `splitlens serve`: run the HTTP analysis service
//! - `splitlens status`: show configuration and credential pool status

mod analyze;
mod helpers;
mod server;
mod status;

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};

use splitlens_core::config::load_config;

// ─────────────────────────────────────────────
// CLI definition
// ─────────────────────────────────────────────

/// 🔬 Splitlens: AI analysis for A/B experiments
#[derive(Parser)]
#[command(name = "splitlens", version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Analyse one experiment and write the report
    Analyze {
        /// Amplitude experiment ID to fetch
        #[arg(short, long, required_unless_present = "file", conflicts_with = "file")]
        experiment: Option<String>,

        /// Local JSON file with the experiment data
        #[arg(short, long)]
        file: Option<PathBuf>,

        /// Report path (defaults to the configured report output)
        #[arg(short, long)]
        output: Option<String>,

        /// Use this completion API key instead of the server pool
        #[arg(long)]
        api_key: Option<String>,

        /// Enable debug logging
        #[arg(long, default_value_t = false)]
        logs: bool,
    },

    /// Start the HTTP analysis service
    Serve {
        /// Bind address (overrides config)
        #[arg(long)]
        host: Option<String>,

        /// Bind port (overrides config and PORT)
        #[arg(short, long)]
        port: Option<u16>,

        /// Enable debug logging
        #[arg(long, default_value_t = false)]
        logs: bool,

        /// Emit logs as JSON lines
        #[arg(long, default_value_t = false)]
        json_logs: bool,
    },

    /// Show configuration and credential status
    Status,
}

// ─────────────────────────────────────────────
// Entrypoint
// ─────────────────────────────────────────────

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Analyze {
            experiment,
            file,
            output,
            api_key,
            logs,
        } => {
            init_logging(LogMode::from_flag(logs), false);
            let config = load_config(None);
            let source = match (experiment, file) {
                (_, Some(path)) => analyze::ExperimentSource::File(path),
                (Some(id), None) => analyze::ExperimentSource::Amplitude(id),
                (None, None) => anyhow::bail!("either --experiment or --file is required"),
            };
            let output = helpers::expand_tilde(output.as_deref().unwrap_or(&config.report.output));
            analyze::run(&config, source, api_key, &output).await
        }
        Commands::Serve {
            host,
            port,
            logs,
            json_logs,
        } => {
            let mode = if logs { LogMode::Verbose } else { LogMode::Service };
            init_logging(mode, json_logs);
            let mut config = load_config(None);
            if let Some(host) = host {
                config.server.host = host;
            }
            if let Some(port) = port {
                config.server.port = port;
            }
            server::run(config).await
        }
        Commands::Status => status::run(),
    }
}

// ─────────────────────────────────────────────
// Logging
// ─────────────────────────────────────────────

#[derive(Clone, Copy)]
enum LogMode {
    Quiet,
    Service,
    Verbose,
}

impl LogMode {
    fn from_flag(verbose: bool) -> Self {
        if verbose {
            LogMode::Verbose
        } else {
            LogMode::Quiet
        }
    }

    fn default_directives(self) -> &'static str {
        match self {
            LogMode::Quiet => "warn",
            LogMode::Service => "info",
            LogMode::Verbose => "splitlens=debug,info",
        }
    }
}

/// Initialize tracing. `RUST_LOG` wins over the mode's default directives.
fn init_logging(mode: LogMode, json: bool) {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(mode.default_directives()));

    if json {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .json()
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(false)
            .compact()
            .init();
    }
}
