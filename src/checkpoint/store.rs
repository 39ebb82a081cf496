//! Durable record of completed enrichment.

use crate::checkpoint::error::CheckpointError;
use crate::types::record::{Record, RecordId};
use log::{debug, info};
use polars::prelude::*;
use std::collections::HashSet;
use std::fs::OpenOptions;
use std::future::Future;
use std::path::{Path, PathBuf};
use tokio::{fs, task};

/// Name of the identity column of every checkpoint.
pub const ID_COLUMN: &str = "id";

/// Accessor for the persisted output of previous runs.
///
/// The store is append-only: rows are never rewritten, and its content decides
/// which candidates still need work. Only one engine may use a store at a time.
pub trait CheckpointStore {
    /// Ids already enriched, or `None` when nothing has ever been persisted.
    fn completed_ids(
        &self,
    ) -> impl Future<Output = Result<Option<HashSet<RecordId>>, CheckpointError>> + Send;

    /// Appends the enriched records and returns how many rows were written.
    /// Records without a result are skipped.
    fn append(
        &mut self,
        records: &[Record],
    ) -> impl Future<Output = Result<usize, CheckpointError>> + Send;
}

/// A checkpoint kept as a CSV file with columns `id,<result column>`.
///
/// The header is written once, when the file is created; later batches append
/// bare rows. The existence of the file is what marks a run as resumable.
#[derive(Debug, Clone)]
pub struct CsvCheckpointStore {
    path: PathBuf,
    result_column: String,
}

impl CsvCheckpointStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self::with_result_column(path, "elevation")
    }

    pub fn with_result_column(path: impl Into<PathBuf>, result_column: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            result_column: result_column.into(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_ids(path: &Path) -> Result<HashSet<RecordId>, CheckpointError> {
        // Every column is read as text so ids keep their exact spelling.
        let df = CsvReadOptions::default()
            .with_has_header(true)
            .with_infer_schema_length(Some(0))
            .try_into_reader_with_file_path(Some(path.to_path_buf()))
            .map_err(|e| CheckpointError::CheckpointRead(path.to_path_buf(), e))?
            .finish()
            .map_err(|e| CheckpointError::CheckpointRead(path.to_path_buf(), e))?;

        let ids = df.column(ID_COLUMN).map_err(|_| {
            CheckpointError::MissingColumn(path.to_path_buf(), ID_COLUMN.to_string())
        })?;
        let ids = ids
            .str()
            .map_err(|e| CheckpointError::CheckpointRead(path.to_path_buf(), e))?;
        Ok(ids.into_iter().flatten().map(RecordId::parse).collect())
    }

    fn write_rows(
        path: &Path,
        result_column: &str,
        ids: Vec<String>,
        values: Vec<f64>,
    ) -> Result<(), CheckpointError> {
        let mut df = df!(ID_COLUMN => ids, result_column => values)
            .map_err(CheckpointError::RowBuild)?;

        if let Some(dir) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(dir)
                .map_err(|e| CheckpointError::CheckpointDirCreation(dir.to_path_buf(), e))?;
        }
        let write_header = std::fs::metadata(path).map_or(true, |meta| meta.len() == 0);

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .map_err(|e| CheckpointError::CheckpointOpen(path.to_path_buf(), e))?;
        CsvWriter::new(&mut file)
            .include_header(write_header)
            .finish(&mut df)
            .map_err(|e| CheckpointError::CheckpointWrite(path.to_path_buf(), e))?;
        file.sync_all()
            .map_err(|e| CheckpointError::CheckpointOpen(path.to_path_buf(), e))?;
        Ok(())
    }
}

impl CheckpointStore for CsvCheckpointStore {
    async fn completed_ids(&self) -> Result<Option<HashSet<RecordId>>, CheckpointError> {
        let metadata = match fs::metadata(&self.path).await {
            Ok(metadata) => metadata,
            Err(_) => {
                info!(
                    "No checkpoint at {}, starting a fresh run",
                    self.path.display()
                );
                return Ok(None);
            }
        };
        if metadata.len() == 0 {
            return Ok(Some(HashSet::new()));
        }

        let path = self.path.clone();
        let ids = task::spawn_blocking(move || Self::read_ids(&path)).await??;
        info!(
            "Checkpoint {} already holds {} enriched records",
            self.path.display(),
            ids.len()
        );
        Ok(Some(ids))
    }

    async fn append(&mut self, records: &[Record]) -> Result<usize, CheckpointError> {
        let (ids, values): (Vec<String>, Vec<f64>) = records
            .iter()
            .filter_map(|record| record.elevation.map(|value| (record.id.to_string(), value)))
            .unzip();
        if ids.is_empty() {
            return Ok(0);
        }

        let written = ids.len();
        let path = self.path.clone();
        let result_column = self.result_column.clone();
        task::spawn_blocking(move || Self::write_rows(&path, &result_column, ids, values))
            .await??;
        debug!("Appended {} rows to {}", written, self.path.display());
        Ok(written)
    }
}
