// ============================================================================
// spartan-inventory — fetch a player's inventory from the Spartan backend
// ============================================================================
// Usage:
//   spartan-inventory fetch --identity '{"id":"abc"}'               Inventory only
//   spartan-inventory fetch --identity @gamer.json --armory --highlights
//   spartan-inventory url --armory                                   Show request URL
//
// SPARTAN_API_URL (or --api-url) selects the backend; .env is honored.
// ============================================================================

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use inventory_core::{FetchOptions, InventoryConfig, InventoryFetcher, PlayerIdentity};
use serde_json::json;
use tracing::info;

/// Spartan inventory fetch tool
#[derive(Parser)]
#[command(name = "spartan-inventory", version, about = "Fetch Spartan inventory and armory data")]
struct Cli {
    /// Backend base URL (overrides SPARTAN_API_URL)
    #[arg(long, global = true)]
    api_url: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Fetch once and print the result as JSON
    Fetch {
        /// Identity JSON, or @path to read it from a file
        #[arg(long)]
        identity: String,

        /// Include armory catalogs and currently equipped items
        #[arg(long)]
        armory: bool,

        /// Seed highlight selections from the armory (implies --armory)
        #[arg(long)]
        highlights: bool,
    },

    /// Print the request URL without sending anything
    Url {
        #[arg(long)]
        armory: bool,
    },
}

fn build_config(api_url: Option<&str>) -> InventoryConfig {
    let config = InventoryConfig::from_env();
    match api_url {
        Some(url) => config.with_base_url(url),
        None => config,
    }
}

fn read_identity(raw: &str) -> Result<PlayerIdentity> {
    let json = match raw.strip_prefix('@') {
        Some(path) => std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read identity file {}", path))?,
        None => raw.to_string(),
    };
    Ok(PlayerIdentity::from_json(&json)?)
}

fn options_for(armory: bool, highlights: bool) -> FetchOptions {
    FetchOptions {
        include_armory: armory || highlights,
        track_highlights: highlights,
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    if let Err(e) = dotenvy::dotenv() {
        eprintln!("Warning: Could not load .env file: {}", e);
    }

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("inventory_core=info".parse()?)
                .add_directive("spartan_inventory=info".parse()?),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = build_config(cli.api_url.as_deref());

    match cli.command {
        Commands::Fetch {
            identity,
            armory,
            highlights,
        } => cmd_fetch(config, &identity, options_for(armory, highlights)).await,
        Commands::Url { armory } => {
            println!("{}", config.spartan_url(armory));
            Ok(())
        }
    }
}

async fn cmd_fetch(config: InventoryConfig, identity: &str, options: FetchOptions) -> Result<()> {
    let identity = read_identity(identity)?;
    let fetcher = InventoryFetcher::new(identity, options, config)?;

    info!("Fetching from {}", fetcher.request_url());
    fetcher
        .try_fetch(false)
        .await
        .context("Failed to fetch Spartan inventory")?;

    let report = json!({
        "spartanInventory": fetcher.spartan_inventory().await,
        "armoryRow": fetcher.armory_row().await,
        "currentlyEquipped": options.include_armory.then_some(fetcher.currently_equipped().await),
        "highlightedItems": fetcher.highlight_selection().await,
    });
    println!("{}", serde_json::to_string_pretty(&report)?);

    Ok(())
}
