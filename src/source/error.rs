use polars::prelude::PolarsError;
use std::path::PathBuf;
use thiserror::Error;
use tokio::task::JoinError;

#[derive(Debug, Error)]
pub enum SourceError {
    #[error("No observation files given to aggregate")]
    NoInputs,

    #[error("Failed to read observations from '{0}'")]
    Read(PathBuf, #[source] PolarsError),

    #[error("Observation file '{0}' has no '{1}' column")]
    MissingColumn(PathBuf, String),

    #[error("Failed to transform observations")]
    Transform(#[source] PolarsError),

    #[error("Failed to create directory '{0}'")]
    DirCreation(PathBuf, #[source] std::io::Error),

    #[error("Failed to create file '{0}'")]
    FileCreate(PathBuf, #[source] std::io::Error),

    #[error("Failed to write observations to '{0}'")]
    Write(PathBuf, #[source] PolarsError),

    #[error("Background task failed")]
    TaskJoin(#[from] JoinError),
}
