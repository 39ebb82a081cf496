use crate::source::error::SourceError;
use crate::types::record::{Record, RecordId};
use chrono::NaiveDate;
use log::{info, warn};
use polars::prelude::*;
use std::path::Path;
use tokio::task;

/// Loads interim observations as enrichment candidates, in file order.
///
/// `id`, `latitude` and `longitude` are required columns; `observed_on`,
/// `time_observed_at` and `time_zone` are carried along when present. Rows
/// without an id or with unparsable coordinates are skipped.
pub async fn load_observations(path: &Path) -> Result<Vec<Record>, SourceError> {
    let path = path.to_path_buf();
    let records = task::spawn_blocking(move || {
        let frame = CsvReadOptions::default()
            .with_has_header(true)
            .with_infer_schema_length(Some(0))
            .try_into_reader_with_file_path(Some(path.clone()))
            .map_err(|e| SourceError::Read(path.clone(), e))?
            .finish()
            .map_err(|e| SourceError::Read(path.clone(), e))?;
        frame_to_records(&frame, &path)
    })
    .await??;
    info!("Loaded {} candidate observations", records.len());
    Ok(records)
}

fn required<'a>(frame: &'a DataFrame, name: &str, path: &Path) -> Result<&'a Column, SourceError> {
    frame
        .column(name)
        .map_err(|_| SourceError::MissingColumn(path.to_path_buf(), name.to_string()))
}

fn text(frame: &DataFrame, name: &str) -> Result<Option<StringChunked>, SourceError> {
    match frame.column(name) {
        Ok(column) => {
            let column = column.cast(&DataType::String).map_err(SourceError::Transform)?;
            Ok(Some(column.str().map_err(SourceError::Transform)?.clone()))
        }
        Err(_) => Ok(None),
    }
}

fn degrees(column: &Column) -> Result<Float64Chunked, SourceError> {
    let column = column
        .cast(&DataType::Float64)
        .map_err(SourceError::Transform)?;
    Ok(column.f64().map_err(SourceError::Transform)?.clone())
}

fn frame_to_records(frame: &DataFrame, path: &Path) -> Result<Vec<Record>, SourceError> {
    let ids = required(frame, "id", path)?
        .cast(&DataType::String)
        .map_err(SourceError::Transform)?;
    let ids = ids.str().map_err(SourceError::Transform)?;
    let latitudes = degrees(required(frame, "latitude", path)?)?;
    let longitudes = degrees(required(frame, "longitude", path)?)?;
    let observed_on = text(frame, "observed_on")?;
    let time_observed_at = text(frame, "time_observed_at")?;
    let time_zone = text(frame, "time_zone")?;

    let mut records = Vec::with_capacity(frame.height());
    let mut skipped = 0usize;
    for row in 0..frame.height() {
        let (Some(id), Some(latitude), Some(longitude)) =
            (ids.get(row), latitudes.get(row), longitudes.get(row))
        else {
            skipped += 1;
            continue;
        };
        let mut record = Record::new(RecordId::parse(id), latitude, longitude);
        record.observed_on = observed_on
            .as_ref()
            .and_then(|dates| dates.get(row))
            .and_then(|date| NaiveDate::parse_from_str(date, "%Y-%m-%d").ok());
        record.time_observed_at = time_observed_at
            .as_ref()
            .and_then(|values| values.get(row))
            .map(str::to_string);
        record.time_zone = time_zone
            .as_ref()
            .and_then(|values| values.get(row))
            .map(str::to_string);
        records.push(record);
    }
    if skipped > 0 {
        warn!(
            "Skipped {} observations without id or valid coordinates in {:?}",
            skipped, path
        );
    }
    Ok(records)
}
