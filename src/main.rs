pub mod types;
pub mod config;
pub mod data;
pub mod query;
pub mod projection;
pub mod render;
pub mod export;
pub mod server;

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing::info;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Serve the interactive school map dashboard
    Serve {
        #[arg(short, long, value_name = "FILE", default_value = "config.toml")]
        config: PathBuf,
    },
    /// List the region codes present in the spreadsheet
    Regions {
        #[arg(short, long, value_name = "FILE", default_value = "config.toml")]
        config: PathBuf,
    },
    /// Find schools whose name contains QUERY (case-insensitive)
    Search {
        query: String,
        #[arg(short, long, value_name = "FILE", default_value = "config.toml")]
        config: PathBuf,
    },
    /// Write a static map snapshot for one region
    Export {
        region: String,
        /// Zoom level, 1 to 20 (defaults to the configured zoom)
        #[arg(short, long)]
        zoom: Option<u8>,
        #[arg(short, long, value_name = "FILE", default_value = "config.toml")]
        config: PathBuf,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();

    match &cli.command {
        Commands::Serve { config } => {
            info!("Serving dashboard with config: {:?}", config);
            let app_config = config::AppConfig::load_from_file(config)?;
            let dataset = data::load_data(&app_config)?;

            server::start_server(app_config, dataset).await?;
        }
        Commands::Regions { config } => {
            let app_config = config::AppConfig::load_from_file(config)?;
            let dataset = data::load_data(&app_config)?;

            for region in query::distinct_regions(&dataset) {
                println!("{}", region);
            }
        }
        Commands::Search { query: text, config } => {
            let app_config = config::AppConfig::load_from_file(config)?;
            let dataset = data::load_data(&app_config)?;

            let results = query::search(&dataset, text);
            if results.is_empty() && !text.is_empty() {
                println!("{}", server::NO_RESULTS_MESSAGE);
            }
            for school in results {
                println!("{} - {}", school.name, school.address);
            }
        }
        Commands::Export { region, zoom, config } => {
            let app_config = config::AppConfig::load_from_file(config)?;
            let dataset = data::load_data(&app_config)?;

            let zoom = match zoom {
                Some(level) => types::Zoom::new(*level)?,
                None => app_config.map.default_zoom()?,
            };
            let schools = query::by_region(&dataset, region);
            let map = projection::project(&schools, zoom, region, &app_config.map);
            let path = export::export(&map, region, &app_config.output.snapshot_dir)?;

            println!("{}", path.display());
        }
    }

    Ok(())
}
