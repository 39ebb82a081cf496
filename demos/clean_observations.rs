//! Aggregates raw observation exports into a single cleaned interim file.
//!
//! Usage: `cargo run --example clean_observations -- <output.csv> <raw.csv>...`

use eco_enrich::{CleaningPipeline, EnrichError};
use std::env;
use std::path::PathBuf;

#[tokio::main]
async fn main() -> Result<(), EnrichError> {
    let mut args = env::args().skip(1).map(PathBuf::from);
    let output = args
        .next()
        .unwrap_or_else(|| PathBuf::from("data/interim/interim_observations.csv"));
    let mut inputs: Vec<PathBuf> = args.collect();
    if inputs.is_empty() {
        inputs.push(PathBuf::from("data/raw/observations_sample.csv"));
    }

    let cleaned = CleaningPipeline::aggregate(&inputs)
        .await?
        .enforce_unique_ids()
        .format_observation_dates()
        .write_interim(&output)
        .await?;

    println!("{} observations written to {}", cleaned.height(), output.display());
    println!("{}", cleaned.head(Some(5)));
    Ok(())
}
