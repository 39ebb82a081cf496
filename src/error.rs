use crate::cache::error::CacheError;
use crate::checkpoint::error::CheckpointError;
use crate::governor::error::ConfigError;
use crate::provider::error::ProviderError;
use crate::source::error::SourceError;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum EnrichError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Cache(#[from] CacheError),

    #[error(transparent)]
    Checkpoint(#[from] CheckpointError),

    #[error(transparent)]
    Source(#[from] SourceError),

    #[error("Enrichment aborted after {batches_persisted} persisted batches")]
    Aborted {
        batches_persisted: usize,
        #[source]
        source: ProviderError,
    },

    #[error("Failed to create store directory '{0}'")]
    StoreDirCreation(PathBuf, #[source] std::io::Error),

    #[error("Failed to determine store directory")]
    StoreDirResolution,
}
