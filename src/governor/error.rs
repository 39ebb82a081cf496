use std::time::Duration;
use thiserror::Error;

/// A run configuration that can never be honoured. Detected before any request
/// is sent or anything is persisted.
#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("Batch size must be at least 1")]
    ZeroBatchSize,

    #[error("Batch limit must be at least 1")]
    ZeroBatchLimit,

    #[error("Batch size {batch_size} exceeds the provider limit of {max} locations per request")]
    BatchTooLarge { batch_size: usize, max: usize },

    #[error("Request interval {interval:?} is below the provider minimum of {minimum:?}")]
    IntervalBelowMinimum { interval: Duration, minimum: Duration },

    #[error("{requests} planned requests exceed the provider quota of {quota} per day")]
    QuotaExceeded { requests: usize, quota: usize },

    #[error("Backoff factor {0} must be a finite number greater than 1")]
    InvalidBackoffFactor(f64),

    #[error("Coordinate precision {precision} exceeds the maximum of {max}")]
    PrecisionTooHigh { precision: u8, max: u8 },
}
