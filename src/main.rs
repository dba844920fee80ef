use clap::Parser;
use rand::rngs::StdRng;
use rand::{RngExt, SeedableRng};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::info;

use lifetrack::routing::provider_from_config;
use lifetrack::{TrackConfig, TrackConverter, TrackError, logging};

#[derive(Parser, Debug)]
#[command(version, about = "Turn place-based life diaries into GPX tracks")]
struct Cli {
    /// Configuration file (TOML or JSON)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Prefer the Google Maps Directions API over TomTom
    #[arg(short, long)]
    google: bool,

    /// Seed for coordinate inference, for reproducible runs
    #[arg(short, long)]
    seed: Option<u64>,

    /// Enable debug logging
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            match e.downcast_ref::<TrackError>() {
                Some(track_error) => eprintln!("{}", track_error.user_message()),
                None => eprintln!("Error: {e:#}"),
            }
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let mut config = TrackConfig::load_from_path(cli.config)?;
    if cli.google {
        config.routing.prefer_google = true;
    }

    logging::init(&config.logging, cli.verbose)?;

    let seed = cli.seed.unwrap_or_else(|| rand::rng().random());
    info!("Using inference seed {}", seed);
    let mut rng = StdRng::seed_from_u64(seed);

    let provider = provider_from_config(&config.routing)?;
    let report = TrackConverter::new(&config, provider).run(&mut rng).await?;

    println!(
        "Wrote {} tracks from {} diaries into {}",
        report.track_count(),
        report.converted.len(),
        config.paths.output_path.display()
    );
    for path in &report.skipped {
        println!("Skipped {} (already converted)", path.display());
    }
    for (path, reason) in &report.failed {
        println!("Failed {}: {}", path.display(), reason);
    }

    Ok(())
}
