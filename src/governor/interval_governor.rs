//! Paces outbound requests so a planned number of requests is spread over a
//! time budget, and slows down when the provider signals throttling.

use crate::governor::error::ConfigError;
use crate::types::config::ProviderLimits;
use log::{debug, warn};
use std::time::Duration;

/// Owns the pause between external requests for one run.
///
/// Every external request must be preceded by [`IntervalGovernor::wait`]. The
/// interval only ever grows within a run, and so does the issued request count.
#[derive(Debug, Clone)]
pub struct IntervalGovernor {
    interval: Duration,
    planned_requests: usize,
    requests_issued: usize,
    backoff_factor: f64,
}

impl IntervalGovernor {
    /// Computes the request interval for a run.
    ///
    /// Each request carries a full batch, so the collection target of
    /// `batch_size * batch_limit` records needs `batch_limit` requests, spread
    /// evenly over `duration_budget`.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] when the batch does not fit a single request, when
    /// the interval would fall below `limits.min_interval`, or when the planned
    /// requests exceed `limits.daily_quota`.
    ///
    /// # Examples
    ///
    /// ```
    /// use eco_enrich::{IntervalGovernor, ProviderLimits};
    /// use std::time::Duration;
    ///
    /// let governor = IntervalGovernor::configure(
    ///     100,
    ///     500,
    ///     Duration::from_secs(20 * 60),
    ///     ProviderLimits::OPEN_METEO,
    ///     1.1,
    /// )
    /// .unwrap();
    /// assert_eq!(governor.interval(), Duration::from_millis(2400));
    /// ```
    pub fn configure(
        batch_size: usize,
        batch_limit: usize,
        duration_budget: Duration,
        limits: ProviderLimits,
        backoff_factor: f64,
    ) -> Result<Self, ConfigError> {
        if batch_size == 0 {
            return Err(ConfigError::ZeroBatchSize);
        }
        if batch_limit == 0 {
            return Err(ConfigError::ZeroBatchLimit);
        }
        if batch_size > limits.max_locations_per_request {
            return Err(ConfigError::BatchTooLarge {
                batch_size,
                max: limits.max_locations_per_request,
            });
        }
        if !backoff_factor.is_finite() || backoff_factor <= 1.0 {
            return Err(ConfigError::InvalidBackoffFactor(backoff_factor));
        }

        // An unrepresentable target still plans one request per batch.
        let planned_requests = batch_size
            .checked_mul(batch_limit)
            .map_or(batch_limit, |collection_target| collection_target / batch_size);
        if planned_requests > limits.daily_quota {
            return Err(ConfigError::QuotaExceeded {
                requests: planned_requests,
                quota: limits.daily_quota,
            });
        }

        let interval = duration_budget / u32::try_from(planned_requests).unwrap_or(u32::MAX);
        if interval < limits.min_interval {
            return Err(ConfigError::IntervalBelowMinimum {
                interval,
                minimum: limits.min_interval,
            });
        }

        debug!(
            "Planned {} requests over {:?}: one request every {:?}",
            planned_requests, duration_budget, interval
        );
        Ok(Self {
            interval,
            planned_requests,
            requests_issued: 0,
            backoff_factor,
        })
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn planned_requests(&self) -> usize {
        self.planned_requests
    }

    pub fn requests_issued(&self) -> usize {
        self.requests_issued
    }

    /// Sleeps for the current interval and counts the request that follows.
    pub async fn wait(&mut self) {
        tokio::time::sleep(self.interval).await;
        self.requests_issued += 1;
    }

    /// Grows the interval by the backoff factor after a throttling response.
    pub fn backoff(&mut self) {
        let previous = self.interval;
        self.interval = self.interval.mul_f64(self.backoff_factor);
        warn!(
            "Provider throttled request, interval raised from {:?} to {:?}",
            previous, self.interval
        );
    }
}
