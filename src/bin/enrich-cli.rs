use std::path::PathBuf;

use clap::Parser;

use artist_enricher::config::ApiCredentials;
use artist_enricher::enrichment::export::export_to_path;
use artist_enricher::enrichment::{enrich_with_timeout, SpotifyEnricher};
use artist_enricher::lifecycle::startup::load_app_config;
use artist_enricher::observability;

#[derive(Parser)]
#[command(name = "enrich-cli")]
#[command(about = "Enrich a local CSV of artists and export the results", long_about = None)]
struct Cli {
    /// CSV file with a "Performer 1 Name" column
    #[arg(default_value = "bandname.csv")]
    input: PathBuf,

    /// Where to write the enriched CSV
    #[arg(short, long, default_value = "artist_top_tracks.csv")]
    output: PathBuf,

    /// Optional TOML config file (enrichment section is used)
    #[arg(short, long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let config = load_app_config(cli.config.as_deref())?;
    observability::logging::init(&config.observability)?;

    let credentials = ApiCredentials::from_env()?;
    let enricher = SpotifyEnricher::new(config.enrichment.clone())?;
    let timeout = std::time::Duration::from_secs(config.enrichment.timeout_secs);

    let artists = enrich_with_timeout(&enricher, &cli.input, &credentials, timeout).await?;
    if artists.is_empty() {
        tracing::error!(input = %cli.input.display(), "No artist data found");
        return Ok(());
    }

    export_to_path(&artists, &cli.output)?;
    Ok(())
}
