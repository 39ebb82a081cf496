//! Configuration surface of an enrichment run.

use crate::types::coordinate_key::DEFAULT_PRECISION;
use bon::Builder;
use std::time::Duration;

/// Constraints imposed by the external provider.
///
/// The defaults describe the Open-Meteo elevation API for non-commercial use.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProviderLimits {
    /// Minimum spacing between two consecutive requests.
    pub min_interval: Duration,
    /// Maximum number of requests per day.
    pub daily_quota: usize,
    /// Maximum number of coordinates a single request may carry.
    pub max_locations_per_request: usize,
}

impl ProviderLimits {
    pub const OPEN_METEO: ProviderLimits = ProviderLimits {
        min_interval: Duration::from_secs(1),
        daily_quota: 10_000,
        max_locations_per_request: 100,
    };
}

impl Default for ProviderLimits {
    fn default() -> Self {
        Self::OPEN_METEO
    }
}

/// How often a single batch request may fail before the run is aborted.
///
/// Each budget counts the failures of its own kind for one batch, in total: a
/// throttling response does not reset the transient count or the other way
/// around. Both start from zero for the next batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Retries after timeouts, transport errors and 5xx responses.
    pub max_transient_retries: u32,
    /// Retries after throttling responses. `None` retries until the provider
    /// accepts the request, backing off each time.
    pub max_throttle_retries: Option<u32>,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_transient_retries: 5,
            max_throttle_retries: None,
        }
    }
}

/// All values a deployment can tune for an enrichment run.
///
/// # Examples
///
/// ```
/// use eco_enrich::EnrichmentConfig;
/// use std::time::Duration;
///
/// let config = EnrichmentConfig::builder()
///     .batch_size(50)
///     .batch_limit(200)
///     .duration_budget(Duration::from_secs(30 * 60))
///     .build();
/// assert_eq!(config.precision, 4);
/// assert_eq!(config.sentinel, 0.0);
/// ```
#[derive(Debug, Clone, PartialEq, Builder)]
pub struct EnrichmentConfig {
    /// Records per batch; every batch is at most one external request.
    #[builder(default = 100)]
    pub batch_size: usize,
    /// Maximum number of batches per run.
    #[builder(default = 500)]
    pub batch_limit: usize,
    /// Time over which `batch_limit` requests should be spread.
    #[builder(default = Duration::from_secs(20 * 60))]
    pub duration_budget: Duration,
    /// Decimal places of the proximity cache keys.
    #[builder(default = DEFAULT_PRECISION)]
    pub precision: u8,
    /// Provider value meaning "no data for this coordinate".
    #[builder(default = 0.0)]
    pub sentinel: f64,
    /// Multiplier applied to the request interval after throttling.
    #[builder(default = 1.1)]
    pub backoff_factor: f64,
    #[builder(default)]
    pub retry: RetryPolicy,
    #[builder(default)]
    pub limits: ProviderLimits,
}

impl Default for EnrichmentConfig {
    fn default() -> Self {
        Self::builder().build()
    }
}

impl EnrichmentConfig {
    /// Whether `value` is the provider's "no answer" sentinel.
    pub fn is_sentinel(&self, value: f64) -> bool {
        value == self.sentinel || (value.is_nan() && self.sentinel.is_nan())
    }

    /// Whether `value` carries no usable answer: the sentinel, NaN or an infinity.
    pub fn is_no_answer(&self, value: f64) -> bool {
        !value.is_finite() || self.is_sentinel(value)
    }
}
