pub mod types;
pub mod config;
pub mod data;
pub mod classify;
pub mod legend;
pub mod render;
pub mod server;

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::EnvFilter;
use types::{RenderMode, Source, StationType};

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Render the station map to a standalone HTML file
    Render {
        #[arg(short, long, value_name = "FILE", default_value = "config.toml")]
        config: PathBuf,
        #[arg(short, long, value_enum, default_value_t = RenderMode::Rahat)]
        mode: RenderMode,
        /// Defaults to the configured export path
        #[arg(short, long, value_name = "FILE")]
        output: Option<PathBuf>,
    },
    /// Serve the interactive map
    Serve {
        #[arg(short, long, value_name = "FILE", default_value = "config.toml")]
        config: PathBuf,
    },
    /// Print marker counts per mode and station type
    Stats {
        #[arg(short, long, value_name = "FILE", default_value = "config.toml")]
        config: PathBuf,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Render { config, mode, output } => {
            info!("Rendering {:?} map with config: {:?}", mode, config);
            let app_config = config::AppConfig::load_from_file(&config)?;
            let cache = data::DataCache::new(app_config.input.clone());
            let dataset = cache.get()?;

            let canvas = render::build_canvas(&app_config.map, &dataset, mode);
            let path = output.unwrap_or_else(|| app_config.output.export_path.clone());
            canvas.save(&path)?;

            println!("{}", legend::legend_markdown());
        }
        Commands::Serve { config } => {
            info!("Serving map with config: {:?}", config);
            let app_config = config::AppConfig::load_from_file(&config)?;

            // Load once up front; a bad input file stops the server from starting.
            let cache = data::DataCache::new(app_config.input.clone());
            let dataset = cache.get()?;

            server::start_server(app_config, dataset).await?;
        }
        Commands::Stats { config } => {
            let app_config = config::AppConfig::load_from_file(&config)?;
            let dataset = data::DataCache::new(app_config.input.clone()).get()?;

            for mode in RenderMode::ALL {
                let markers = classify::markers_for_mode(&dataset.stations, mode);
                println!("{:<9} {:>6} markers", mode.label(), markers.len());
                for &source in mode.sources() {
                    for station_type in [StationType::Aws, StationType::Arg] {
                        let n = markers
                            .iter()
                            .filter(|m| m.source == source && m.station_type == station_type)
                            .count();
                        println!("  {:<5} {} {:>6}", source.to_string(), station_type, n);
                    }
                }
            }
            let skipped = |source: Source| {
                dataset.stations.len() - classify::emit_markers(&dataset.stations, source).len()
            };
            println!(
                "Rows without a Rahat marker: {}, without an IMD marker: {}",
                skipped(Source::Rahat),
                skipped(Source::Imd)
            );
        }
    }

    Ok(())
}
