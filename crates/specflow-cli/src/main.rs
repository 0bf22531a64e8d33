mod cmd;
mod output;

use clap::{Parser, Subcommand};
use cmd::bundle::BundleSubcommand;
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "specflow",
    about = "OpenSpec workflow: upload specification bundles, collect suggestions, open pull requests",
    version,
    propagate_version = true
)]
struct Cli {
    /// Output as JSON
    #[arg(long, global = true, short = 'j')]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the HTTP API server
    Serve {
        /// Port to listen on (overrides config and PORT)
        #[arg(long)]
        port: Option<u16>,
        /// YAML config file
        #[arg(long, env = "SPECFLOW_CONFIG")]
        config: Option<PathBuf>,
    },

    /// Inspect a specification bundle offline
    Bundle {
        #[command(subcommand)]
        subcommand: BundleSubcommand,
    },
}

fn main() {
    let cli = Cli::parse();

    let default_level = match &cli.command {
        Commands::Serve { .. } => tracing::Level::INFO,
        _ => tracing::Level::WARN,
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env().add_directive(default_level.into()),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let result = match cli.command {
        Commands::Serve { port, config } => cmd::serve::run(config.as_deref(), port),
        Commands::Bundle { subcommand } => cmd::bundle::run(subcommand, cli.json),
    };

    if let Err(e) = result {
        eprintln!("error: {e:#}");
        std::process::exit(1);
    }
}
