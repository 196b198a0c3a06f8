use clap::{Parser, Subcommand};
use county_choropleth::{config, data, render, server};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Fetch the datasets and write the choropleth page
    Render {
        #[arg(short, long, value_name = "FILE", default_value = "config.toml")]
        config: PathBuf,
        /// Overrides `output.html` from the config
        #[arg(short, long, value_name = "FILE")]
        output: Option<PathBuf>,
    },
    /// Render the map and serve it with the county lookup API
    Serve {
        #[arg(short, long, value_name = "FILE", default_value = "config.toml")]
        config: PathBuf,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let cli = Cli::parse();

    let result = run(cli.command).await;
    if let Err(e) = &result {
        tracing::error!("run failed: {e:#}");
    }
    result
}

async fn run(command: Commands) -> anyhow::Result<()> {
    match command {
        Commands::Render { config, output } => {
            tracing::info!(?config, "Rendering choropleth");
            let app_config = config::AppConfig::load_or_default(&config)?;

            let datasets = data::fetch_datasets(&app_config.input).await?;
            let map = render::build_map(&app_config, &datasets)?;

            let output = output.unwrap_or(app_config.output.html);
            render::write_page(&output, &map)
        }
        Commands::Serve { config } => {
            tracing::info!(?config, "Serving choropleth");
            let app_config = config::AppConfig::load_or_default(&config)?;

            let datasets = data::fetch_datasets(&app_config.input).await?;
            let map = render::build_map(&app_config, &datasets)?;

            server::start_server(app_config.server.port, map).await
        }
    }
}
