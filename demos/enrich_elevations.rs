//! Adds elevations to interim observations, resuming where the last run stopped.
//!
//! Usage: `cargo run --example enrich_elevations -- [interim.csv]`
//! Run it repeatedly; every run does at most `batch_limit` requests.

use eco_enrich::{
    default_store_dir, ensure_store_dir_exists, load_observations, CsvCheckpointStore,
    EnrichmentConfig, EnrichmentEngine, OpenMeteoElevation, CACHE_FILE_NAME,
    CHECKPOINT_FILE_NAME,
};
use std::env;
use std::path::PathBuf;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let input = env::args()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("data/interim/interim_observations.csv"));

    let store_dir = default_store_dir()?;
    ensure_store_dir_exists(&store_dir).await?;

    let cancel = CancellationToken::new();
    let ctrl_c = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            println!("Stopping after the current batch...");
            ctrl_c.cancel();
        }
    });

    let config = EnrichmentConfig::builder()
        .batch_size(100)
        .batch_limit(500)
        .duration_budget(Duration::from_secs(20 * 60))
        .build();

    let mut engine = EnrichmentEngine::builder()
        .provider(OpenMeteoElevation::builder().build()?)
        .store(CsvCheckpointStore::new(store_dir.join(CHECKPOINT_FILE_NAME)))
        .cache_path(store_dir.join(CACHE_FILE_NAME))
        .config(config)
        .cancel(cancel)
        .build();

    let candidates = load_observations(&input).await?;
    let report = engine.run(candidates).await?;
    println!("{report}");
    println!(
        "Checkpoint: {}",
        store_dir.join(CHECKPOINT_FILE_NAME).display()
    );
    Ok(())
}
