pub mod catalog;
pub mod config;
pub mod data;
pub mod error;
pub mod prepare;
pub mod render;
pub mod selection;
pub mod server;
pub mod session;
pub mod toggle;
pub mod types;

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Serve the interactive province map API
    Serve {
        #[arg(short, long, value_name = "FILE", default_value = "config.toml")]
        config: PathBuf,
    },
    /// Build the points-of-interest dataset from boundaries and a candidate source
    Prepare {
        #[arg(short, long, value_name = "FILE", default_value = "config.toml")]
        config: PathBuf,
    },
    /// Load and validate the reference data, then exit
    Check {
        #[arg(short, long, value_name = "FILE", default_value = "config.toml")]
        config: PathBuf,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    match &cli.command {
        Commands::Serve { config } => {
            info!("Serving map with config: {:?}", config);
            let mut app_config = config::AppConfig::load_or_default(config)?;
            app_config.apply_env()?;

            // Reference data is loaded once and shared read-only by every session.
            let catalog = data::load_catalog(&app_config.input)?;

            server::start_server(app_config, catalog).await?;
        }
        Commands::Prepare { config } => {
            info!("Preparing points of interest with config: {:?}", config);
            let app_config = config::AppConfig::load_from_file(config)?;
            let written = prepare::run(&app_config)?;
            println!("Wrote {} points of interest to {:?}", written, app_config.prepare.output);
        }
        Commands::Check { config } => {
            let app_config = config::AppConfig::load_or_default(config)?;
            let catalog = data::load_catalog(&app_config.input)?;
            println!(
                "{} regions ({} with boundaries), {} points of interest",
                catalog.regions().len(),
                catalog.boundary_count(),
                catalog.pois().len()
            );
        }
    }

    Ok(())
}
