//! EthTip - frictionless tips on Base through a wallet sub-account
//!
//! # WARNING
//! - Tips move real funds from the sub-account. Use `--dry-run` to try it out.
//! - The wallet may ask for approval the first time a sub-account spends.

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing::{error, info};

use ethtip::cli::commands;
use ethtip::config::Config;

/// EthTip - send tips without constant wallet pop-ups
#[derive(Parser)]
#[command(name = "ethtip")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to config file
    #[arg(short, long, default_value = "config.toml")]
    config: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start an interactive tipping session
    Run {
        /// Use a simulated wallet (no funds move)
        #[arg(long)]
        dry_run: bool,
    },

    /// Send a single tip and exit
    Tip {
        /// Recipient address (0x + 40 hex digits)
        recipient: String,

        /// Amount in the chain's native currency, e.g. "0.001"
        amount: String,

        /// Create a sub-account if the wallet has none for this app
        #[arg(long)]
        create_sub_account: bool,

        /// Use a simulated wallet (no funds move)
        #[arg(long)]
        dry_run: bool,
    },

    /// Check a recipient and amount without contacting the wallet
    Validate {
        recipient: String,
        amount: String,
    },

    /// Show current configuration (endpoint credentials masked)
    Config,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables from .env file
    dotenvy::dotenv().ok();

    // Logs go to stderr so prompts and results stay readable on stdout
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("ethtip=info".parse()?),
        )
        .with_target(true)
        .with_file(true)
        .with_line_number(true)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let config = match Config::load(&cli.config) {
        Ok(cfg) => cfg,
        Err(e) => {
            error!("Failed to load configuration: {}", e);
            std::process::exit(1);
        }
    };
    info!(
        "{} on {} (chain {})",
        config.app.name, config.chain.name, config.chain.id
    );

    let result = match cli.command {
        Commands::Run { dry_run } => commands::run(&config, dry_run).await,
        Commands::Tip {
            recipient,
            amount,
            create_sub_account,
            dry_run,
        } => commands::tip(&config, &recipient, &amount, create_sub_account, dry_run).await,
        Commands::Validate { recipient, amount } => {
            commands::validate(&config, &recipient, &amount)
        }
        Commands::Config => commands::show_config(&config),
    };

    if let Err(e) = result {
        error!("Command failed: {}", e);
        std::process::exit(1);
    }

    Ok(())
}
