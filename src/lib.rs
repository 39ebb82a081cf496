mod batching;
mod cache;
mod checkpoint;
mod engine;
mod error;
mod governor;
mod provider;
mod source;
mod types;
mod utils;

pub use error::EnrichError;
pub use utils::{default_store_dir, ensure_store_dir_exists, CACHE_FILE_NAME, CHECKPOINT_FILE_NAME};

pub use types::config::*;
pub use types::coordinate_key::*;
pub use types::record::*;

pub use governor::error::ConfigError;
pub use governor::interval_governor::IntervalGovernor;

pub use cache::error::CacheError;
pub use cache::proximity_cache::ProximityCache;

pub use batching::batcher::Batcher;

pub use checkpoint::error::CheckpointError;
pub use checkpoint::resolver::{resolve, resolve_with_store};
pub use checkpoint::store::{CheckpointStore, CsvCheckpointStore, ID_COLUMN};

pub use provider::error::{FailureKind, ProviderError};
pub use provider::open_meteo::{OpenMeteoElevation, OPEN_METEO_ELEVATION_URL};
pub use provider::EnrichmentProvider;

pub use engine::enrichment_engine::EnrichmentEngine;
pub use engine::progress::Progress;
pub use engine::state::{EngineState, RunOutcome, RunReport};

pub use source::cleaning::CleaningPipeline;
pub use source::error::SourceError;
pub use source::observations::load_observations;
