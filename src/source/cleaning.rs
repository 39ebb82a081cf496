//! Turns raw observation exports into the interim observation file.
//!
//! Raw files are read with every column as text so that nothing is lost in
//! type inference; only `observed_on` is parsed, and rows where it is not a
//! strict `YYYY-MM-DD` date are dropped.

use crate::source::error::SourceError;
use log::info;
use polars::prelude::*;
use std::fs::File;
use std::path::{Path, PathBuf};
use tokio::task;

const OBSERVED_ON: &str = "observed_on";
const OBSERVATION_DATE_FORMAT: &str = "%Y-%m-%d";

/// Lazy chain of cleaning steps over aggregated observations.
///
/// # Examples
///
/// ```no_run
/// use eco_enrich::CleaningPipeline;
///
/// # #[tokio::main]
/// # async fn main() -> Result<(), eco_enrich::SourceError> {
/// let cleaned = CleaningPipeline::aggregate(&["data/raw/observations_1.csv".into()])
///     .await?
///     .enforce_unique_ids()
///     .format_observation_dates()
///     .write_interim("data/interim/interim_observations.csv".as_ref())
///     .await?;
/// println!("{} observations kept", cleaned.height());
/// # Ok(())
/// # }
/// ```
pub struct CleaningPipeline {
    frame: LazyFrame,
}

impl CleaningPipeline {
    pub fn from_frame(frame: DataFrame) -> Self {
        Self {
            frame: frame.lazy(),
        }
    }

    /// Reads and concatenates raw observation files in the given order.
    pub async fn aggregate(paths: &[PathBuf]) -> Result<Self, SourceError> {
        if paths.is_empty() {
            return Err(SourceError::NoInputs);
        }
        let mut frames = Vec::with_capacity(paths.len());
        for path in paths {
            let path = path.clone();
            let frame = task::spawn_blocking(move || read_raw(&path)).await??;
            frames.push(frame.lazy());
        }
        let frame = concat(frames, UnionArgs::default()).map_err(SourceError::Transform)?;
        info!("Aggregated {} raw observation files", paths.len());
        Ok(Self { frame })
    }

    /// Keeps the first row of every observation id.
    pub fn enforce_unique_ids(self) -> Self {
        Self {
            frame: self.frame.filter(col("id").is_first_distinct()),
        }
    }

    /// Parses `observed_on` as a date and drops rows where that fails.
    pub fn format_observation_dates(self) -> Self {
        let options = StrptimeOptions {
            format: Some(OBSERVATION_DATE_FORMAT.into()),
            strict: false,
            exact: true,
            cache: true,
        };
        let frame = self
            .frame
            .with_column(
                col(OBSERVED_ON)
                    .cast(DataType::String)
                    .str()
                    .to_date(options)
                    .alias(OBSERVED_ON),
            )
            .filter(col(OBSERVED_ON).is_not_null());
        Self { frame }
    }

    pub fn collect(self) -> Result<DataFrame, SourceError> {
        self.frame.collect().map_err(SourceError::Transform)
    }

    /// Runs the pipeline and writes the result as CSV, creating parent folders.
    pub async fn write_interim(self, path: &Path) -> Result<DataFrame, SourceError> {
        let mut frame = self.collect()?;
        let path = path.to_path_buf();
        task::spawn_blocking(move || {
            if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                std::fs::create_dir_all(parent)
                    .map_err(|e| SourceError::DirCreation(parent.to_path_buf(), e))?;
            }
            let file = File::create(&path).map_err(|e| SourceError::FileCreate(path.clone(), e))?;
            CsvWriter::new(file)
                .include_header(true)
                .finish(&mut frame)
                .map_err(|e| SourceError::Write(path.clone(), e))?;
            info!("Wrote {} interim observations to {:?}", frame.height(), path);
            Ok(frame)
        })
        .await?
    }
}

fn read_raw(path: &Path) -> Result<DataFrame, SourceError> {
    CsvReadOptions::default()
        .with_has_header(true)
        .with_infer_schema_length(Some(0))
        .try_into_reader_with_file_path(Some(path.to_path_buf()))
        .map_err(|e| SourceError::Read(path.to_path_buf(), e))?
        .finish()
        .map_err(|e| SourceError::Read(path.to_path_buf(), e))
}
