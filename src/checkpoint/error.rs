use polars::error::PolarsError;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CheckpointError {
    #[error("Failed to open checkpoint file '{0}'")]
    CheckpointOpen(PathBuf, #[source] std::io::Error),

    #[error("Failed to create checkpoint directory '{0}'")]
    CheckpointDirCreation(PathBuf, #[source] std::io::Error),

    #[error("Failed to read checkpoint file '{0}'")]
    CheckpointRead(PathBuf, #[source] PolarsError),

    #[error("Failed to append to checkpoint file '{0}'")]
    CheckpointWrite(PathBuf, #[source] PolarsError),

    #[error("Checkpoint file '{0}' has no '{1}' column")]
    MissingColumn(PathBuf, String),

    #[error("Failed to build checkpoint rows")]
    RowBuild(#[source] PolarsError),

    #[error("Background task failed to complete")]
    TaskJoin(#[from] tokio::task::JoinError),
}
