use crate::batching::batcher::Batcher;
use crate::cache::proximity_cache::ProximityCache;
use crate::checkpoint::resolver::resolve_with_store;
use crate::checkpoint::store::CheckpointStore;
use crate::engine::progress::Progress;
use crate::engine::state::{EngineState, RunOutcome, RunReport};
use crate::error::EnrichError;
use crate::governor::error::ConfigError;
use crate::governor::interval_governor::IntervalGovernor;
use crate::provider::error::{FailureKind, ProviderError};
use crate::provider::EnrichmentProvider;
use crate::types::config::EnrichmentConfig;
use crate::types::coordinate_key::MAX_PRECISION;
use crate::types::record::Record;
use bon::bon;
use log::{debug, info, warn};
use std::path::{Path, PathBuf};
use tokio_util::sync::CancellationToken;

/// Drives resumable, paced enrichment of a candidate set.
///
/// Every run resolves the candidates against the checkpoint, then works through
/// the remaining records in batches. Each batch is first answered from the
/// proximity cache, the rest is sent to the provider in a single paced request,
/// and the outcome is persisted (checkpoint first, then cache) before the next
/// batch starts. Interrupting a run loses at most the batch in flight.
///
/// # Examples
///
/// ```no_run
/// use eco_enrich::{CsvCheckpointStore, EnrichmentEngine, OpenMeteoElevation, Record};
///
/// # #[tokio::main]
/// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let mut engine = EnrichmentEngine::builder()
///     .provider(OpenMeteoElevation::builder().build()?)
///     .store(CsvCheckpointStore::new("interim/elevations.csv"))
///     .cache_path("interim/elevation_cache.json")
///     .build();
///
/// let report = engine.run(vec![Record::new(1, 52.52, 13.405)]).await?;
/// println!("{report}");
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct EnrichmentEngine<P, S> {
    provider: P,
    store: S,
    cache_path: PathBuf,
    config: EnrichmentConfig,
    cancel: CancellationToken,
    state: EngineState,
}

#[bon]
impl<P: EnrichmentProvider, S: CheckpointStore> EnrichmentEngine<P, S> {
    /// Creates an engine.
    ///
    /// * `.provider(P)`: Required. Source of the enrichment values.
    /// * `.store(S)`: Required. Checkpoint that makes runs resumable.
    /// * `.cache_path(impl Into<PathBuf>)`: Required. JSON file of the proximity cache.
    /// * `.config(EnrichmentConfig)`: Optional. Defaults to [`EnrichmentConfig::default`].
    /// * `.cancel(CancellationToken)`: Optional. Checked between batches.
    #[builder]
    pub fn new(
        provider: P,
        store: S,
        #[builder(into)] cache_path: PathBuf,
        #[builder(default)] config: EnrichmentConfig,
        cancel: Option<CancellationToken>,
    ) -> Self {
        Self {
            provider,
            store,
            cache_path,
            config,
            cancel: cancel.unwrap_or_default(),
            state: EngineState::Init,
        }
    }

    pub fn provider(&self) -> &P {
        &self.provider
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn cache_path(&self) -> &Path {
        &self.cache_path
    }

    pub fn config(&self) -> &EnrichmentConfig {
        &self.config
    }

    pub fn state(&self) -> EngineState {
        self.state
    }

    /// Enriches the candidates that the checkpoint does not cover yet.
    ///
    /// Configuration is validated before any file or network access. A provider
    /// failure that exhausts its retries ends the run with
    /// [`EnrichError::Aborted`]; every batch persisted before it stays valid and
    /// the next run resumes after it.
    pub async fn run(&mut self, candidates: Vec<Record>) -> Result<RunReport, EnrichError> {
        self.transition(EngineState::Init);
        let result = self.run_to_completion(candidates).await;
        match &result {
            Ok(report) => {
                self.transition(EngineState::Done);
                info!("{report}");
            }
            Err(e) => {
                self.transition(EngineState::Aborted);
                warn!("Enrichment stopped: {e}");
            }
        }
        result
    }

    fn configure_governor(&self) -> Result<IntervalGovernor, ConfigError> {
        if self.config.precision > MAX_PRECISION {
            return Err(ConfigError::PrecisionTooHigh {
                precision: self.config.precision,
                max: MAX_PRECISION,
            });
        }
        IntervalGovernor::configure(
            self.config.batch_size,
            self.config.batch_limit,
            self.config.duration_budget,
            self.config.limits,
            self.config.backoff_factor,
        )
    }

    async fn run_to_completion(&mut self, candidates: Vec<Record>) -> Result<RunReport, EnrichError> {
        let mut governor = self.configure_governor()?;

        self.transition(EngineState::Resolving);
        let working_set = resolve_with_store(candidates, &self.store).await?;
        let mut report = RunReport::new(working_set.len(), governor.interval());
        if working_set.is_empty() {
            report.outcome = RunOutcome::NoRemainingWork;
            return Ok(report);
        }

        let mut cache = ProximityCache::load(&self.cache_path, self.config.precision).await?;
        let mut batcher = Batcher::new(self.config.batch_size, Some(self.config.batch_limit));
        let mut progress = Progress::new(working_set.len());
        info!(
            "Enriching {} records in batches of {}, one request every {:?}",
            working_set.len(),
            self.config.batch_size,
            governor.interval()
        );

        let outcome = loop {
            self.transition(EngineState::BatchPending);
            if self.cancel.is_cancelled() {
                break RunOutcome::Cancelled;
            }
            let Some(batch) = batcher.next(&working_set) else {
                break if batcher.limit_reached(working_set.len()) {
                    RunOutcome::BatchLimitReached
                } else {
                    RunOutcome::Completed
                };
            };

            self.process_batch(batch.to_vec(), &mut cache, &mut governor, &mut report)
                .await?;
            report.unprocessed = working_set.len() - batcher.cursor();
            progress.advance(batch.len());
            info!("{}", progress.render(governor.interval()));
        };

        report.outcome = outcome;
        report.final_interval = governor.interval();
        Ok(report)
    }

    async fn process_batch(
        &mut self,
        mut batch: Vec<Record>,
        cache: &mut ProximityCache,
        governor: &mut IntervalGovernor,
        report: &mut RunReport,
    ) -> Result<(), EnrichError> {
        self.transition(EngineState::CacheReducing);
        let mut uncached = Vec::new();
        for (index, record) in batch.iter_mut().enumerate() {
            let cached = cache
                .lookup(record.latitude, record.longitude)
                .filter(|value| !self.config.is_no_answer(*value));
            match cached {
                Some(value) => {
                    record.elevation = Some(value);
                    report.cache_hits += 1;
                }
                None => uncached.push(index),
            }
        }
        debug!(
            "Batch {}: {} of {} records answered from cache",
            report.batches + 1,
            batch.len() - uncached.len(),
            batch.len()
        );

        let mut fresh = ProximityCache::new(cache.precision());
        if !uncached.is_empty() {
            self.transition(EngineState::Requesting);
            let latitudes: Vec<f64> = uncached.iter().map(|&i| batch[i].latitude).collect();
            let longitudes: Vec<f64> = uncached.iter().map(|&i| batch[i].longitude).collect();
            let values = self
                .request_with_retry(&latitudes, &longitudes, governor, report)
                .await?;

            self.transition(EngineState::Merging);
            for (&index, value) in uncached.iter().zip(values) {
                if self.config.is_no_answer(value) {
                    continue;
                }
                let record = &mut batch[index];
                record.elevation = Some(value);
                fresh.insert(record.latitude, record.longitude, value);
                report.fetched += 1;
            }
        }

        let (enriched, unanswered): (Vec<Record>, Vec<Record>) =
            batch.into_iter().partition(Record::is_enriched);
        if !unanswered.is_empty() {
            debug!(
                "No answer for {} records, they stay pending: {:?}",
                unanswered.len(),
                unanswered.iter().map(|r| r.id.to_string()).collect::<Vec<_>>()
            );
        }
        report.no_answer += unanswered.len();

        self.transition(EngineState::Persisting);
        report.persisted += self.store.append(&enriched).await?;
        if !fresh.is_empty() {
            let previous = std::mem::replace(cache, ProximityCache::new(fresh.precision()));
            *cache = previous.merge(fresh);
            cache.save(&self.cache_path).await?;
        }
        report.batches += 1;
        Ok(())
    }

    /// Issues one paced request, retrying it under the configured policy.
    async fn request_with_retry(
        &self,
        latitudes: &[f64],
        longitudes: &[f64],
        governor: &mut IntervalGovernor,
        report: &mut RunReport,
    ) -> Result<Vec<f64>, EnrichError> {
        let retry = self.config.retry;
        let mut throttled = 0u32;
        let mut transient = 0u32;
        loop {
            governor.wait().await;
            report.requests = governor.requests_issued();

            let error = match self.provider.fetch(latitudes, longitudes).await {
                Ok(values) if values.len() == latitudes.len() => return Ok(values),
                Ok(values) => ProviderError::LengthMismatch {
                    expected: latitudes.len(),
                    found: values.len(),
                },
                Err(e) => e,
            };

            match error.kind() {
                FailureKind::Throttling => {
                    throttled += 1;
                    report.throttled += 1;
                    if retry.max_throttle_retries.is_some_and(|max| throttled > max) {
                        return Err(Self::abort(report, error));
                    }
                    governor.backoff();
                }
                FailureKind::Transient => {
                    transient += 1;
                    report.transient_failures += 1;
                    if transient > retry.max_transient_retries {
                        return Err(Self::abort(report, error));
                    }
                    warn!(
                        "Transient provider failure ({}/{} retries): {}",
                        transient, retry.max_transient_retries, error
                    );
                }
                FailureKind::Fatal => return Err(Self::abort(report, error)),
            }
        }
    }

    fn abort(report: &RunReport, source: ProviderError) -> EnrichError {
        EnrichError::Aborted {
            batches_persisted: report.batches,
            source,
        }
    }

    fn transition(&mut self, next: EngineState) {
        if self.state != next {
            debug!("Engine state {:?} -> {:?}", self.state, next);
        }
        self.state = next;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::checkpoint::store::CsvCheckpointStore;
    use crate::types::config::{ProviderLimits, RetryPolicy};
    use crate::types::record::RecordId;
    use reqwest::StatusCode;
    use std::collections::{HashSet, VecDeque};
    use std::sync::Mutex;
    use std::time::Duration;
    use tempfile::{tempdir, TempDir};

    type Answer = fn(f64, f64) -> f64;

    /// Answers from a function of the coordinate, after replaying scripted
    /// failures. `None` in the script means "answer normally".
    struct ScriptedProvider {
        answer: Answer,
        script: Mutex<VecDeque<Option<ProviderError>>>,
        calls: Mutex<Vec<Vec<(f64, f64)>>>,
        cancel_after_first: Option<CancellationToken>,
    }

    impl ScriptedProvider {
        fn new(answer: Answer) -> Self {
            Self {
                answer,
                script: Mutex::new(VecDeque::new()),
                calls: Mutex::new(Vec::new()),
                cancel_after_first: None,
            }
        }

        fn with_script(mut self, script: Vec<Option<ProviderError>>) -> Self {
            self.script = Mutex::new(script.into());
            self
        }

        fn calls(&self) -> Vec<Vec<(f64, f64)>> {
            self.calls.lock().unwrap().clone()
        }
    }

    impl EnrichmentProvider for ScriptedProvider {
        async fn fetch(&self, latitudes: &[f64], longitudes: &[f64]) -> Result<Vec<f64>, ProviderError> {
            self.calls
                .lock()
                .unwrap()
                .push(latitudes.iter().copied().zip(longitudes.iter().copied()).collect());
            if let Some(token) = &self.cancel_after_first {
                token.cancel();
            }
            if let Some(Some(error)) = self.script.lock().unwrap().pop_front() {
                return Err(error);
            }
            Ok(latitudes
                .iter()
                .zip(longitudes)
                .map(|(lat, lon)| (self.answer)(*lat, *lon))
                .collect())
        }
    }

    // Everything south of the equator is "sea".
    fn land_above_equator(latitude: f64, _longitude: f64) -> f64 {
        if latitude < 0.0 {
            0.0
        } else {
            (latitude * 10.0).round()
        }
    }

    // A broken provider: no number at all south of the equator.
    fn nan_below_equator(latitude: f64, _longitude: f64) -> f64 {
        if latitude < 0.0 {
            f64::NAN
        } else {
            (latitude * 10.0).round()
        }
    }

    fn relaxed(batch_size: usize, batch_limit: usize) -> EnrichmentConfig {
        EnrichmentConfig::builder()
            .batch_size(batch_size)
            .batch_limit(batch_limit)
            .duration_budget(Duration::from_millis(batch_limit as u64))
            .limits(ProviderLimits {
                min_interval: Duration::ZERO,
                daily_quota: 10_000,
                max_locations_per_request: 100,
            })
            .build()
    }

    fn engine(
        dir: &TempDir,
        provider: ScriptedProvider,
        config: EnrichmentConfig,
    ) -> EnrichmentEngine<ScriptedProvider, CsvCheckpointStore> {
        EnrichmentEngine::builder()
            .provider(provider)
            .store(CsvCheckpointStore::new(dir.path().join("checkpoint.csv")))
            .cache_path(dir.path().join("cache.json"))
            .config(config)
            .build()
    }

    async fn persisted_ids(dir: &TempDir) -> HashSet<RecordId> {
        CsvCheckpointStore::new(dir.path().join("checkpoint.csv"))
            .completed_ids()
            .await
            .unwrap()
            .unwrap_or_default()
    }

    fn spread(count: i64, start_id: i64) -> Vec<Record> {
        (0..count)
            .map(|i| Record::new(start_id + i, 10.0 + i as f64, 5.0))
            .collect()
    }

    #[tokio::test]
    async fn test_cache_and_sentinel_scenario() {
        let dir = tempdir().unwrap();
        let mut seeded = ProximityCache::new(4);
        seeded.insert(45.1234, 7.5, 812.0);
        seeded.save(&dir.path().join("cache.json")).await.unwrap();

        let candidates = vec![
            // Two records on the cached coordinate.
            Record::new(1, 45.1234, 7.5),
            Record::new(2, 45.12341, 7.50001),
            // Four records on one uncached coordinate.
            Record::new(3, 46.0, 8.0),
            Record::new(4, 46.00001, 8.0),
            Record::new(5, 46.0, 8.00002),
            Record::new(6, 45.99999, 7.99998),
            // One record out at sea.
            Record::new(7, -12.0, 140.0),
        ];

        let provider = ScriptedProvider::new(land_above_equator);
        let mut engine = engine(&dir, provider, relaxed(10, 5));
        let report = engine.run(candidates).await.unwrap();

        let calls = engine.provider().calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].len(), 5);
        assert!(calls[0].iter().all(|(lat, _)| *lat > 45.5 || *lat < 0.0));

        assert_eq!(report.outcome, RunOutcome::Completed);
        assert_eq!(report.batches, 1);
        assert_eq!(report.requests, 1);
        assert_eq!(report.cache_hits, 2);
        assert_eq!(report.fetched, 4);
        assert_eq!(report.no_answer, 1);
        assert_eq!(report.persisted, 6);
        assert_eq!(engine.state(), EngineState::Done);

        let ids = persisted_ids(&dir).await;
        assert_eq!(ids.len(), 6);
        assert!(!ids.contains(&RecordId::Int(7)));

        let cache = ProximityCache::load(&dir.path().join("cache.json"), 4)
            .await
            .unwrap();
        assert_eq!(cache.lookup(45.1234, 7.5), Some(812.0));
        assert_eq!(cache.lookup(46.0, 8.0), Some(460.0));
        assert_eq!(cache.lookup(-12.0, 140.0), None);
    }

    #[tokio::test]
    async fn test_unanswered_records_are_retried_next_run() {
        let dir = tempdir().unwrap();
        let candidates = vec![Record::new(1, 46.0, 8.0), Record::new(2, -12.0, 140.0)];

        let mut first = engine(&dir, ScriptedProvider::new(land_above_equator), relaxed(10, 5));
        first.run(candidates.clone()).await.unwrap();

        let mut second = engine(&dir, ScriptedProvider::new(land_above_equator), relaxed(10, 5));
        let report = second.run(candidates).await.unwrap();
        assert_eq!(report.working_set, 1);
        assert_eq!(second.provider().calls(), vec![vec![(-12.0, 140.0)]]);
        assert_eq!(persisted_ids(&dir).await.len(), 1);
    }

    #[tokio::test]
    async fn test_non_finite_answers_are_not_persisted() {
        let dir = tempdir().unwrap();
        let candidates = vec![
            Record::new(1, 46.0, 8.0),
            Record::new(2, -12.0, 140.0),
            Record::new(3, -33.9, 151.2),
        ];

        let mut first = engine(&dir, ScriptedProvider::new(nan_below_equator), relaxed(10, 5));
        let report = first.run(candidates.clone()).await.unwrap();
        assert_eq!(report.fetched, 1);
        assert_eq!(report.no_answer, 2);
        assert_eq!(report.persisted, 1);

        let rows = std::fs::read_to_string(dir.path().join("checkpoint.csv")).unwrap();
        assert!(!rows.to_lowercase().contains("nan"));
        let cache = ProximityCache::load(&dir.path().join("cache.json"), 4)
            .await
            .unwrap();
        assert_eq!(cache.len(), 1);

        // The stores stay readable, so the next run resumes with the unanswered records.
        fn surveyed(latitude: f64, _longitude: f64) -> f64 {
            latitude.abs() * 10.0
        }
        let mut second = engine(&dir, ScriptedProvider::new(surveyed), relaxed(10, 5));
        let report = second.run(candidates).await.unwrap();
        assert_eq!(report.working_set, 2);
        assert_eq!(report.persisted, 2);
        assert_eq!(persisted_ids(&dir).await.len(), 3);
    }

    #[tokio::test]
    async fn test_second_run_is_idempotent() {
        let dir = tempdir().unwrap();
        let candidates = spread(12, 100);

        let mut first = engine(&dir, ScriptedProvider::new(land_above_equator), relaxed(5, 10));
        let report = first.run(candidates.clone()).await.unwrap();
        assert_eq!(report.outcome, RunOutcome::Completed);
        assert_eq!(report.batches, 3);
        assert_eq!(report.persisted, 12);

        let mut second = engine(&dir, ScriptedProvider::new(land_above_equator), relaxed(5, 10));
        let report = second.run(candidates).await.unwrap();
        assert_eq!(report.outcome, RunOutcome::NoRemainingWork);
        assert_eq!(report.requests, 0);
        assert!(second.provider().calls().is_empty());

        let rows = std::fs::read_to_string(dir.path().join("checkpoint.csv")).unwrap();
        assert_eq!(rows.lines().count(), 13);
    }

    #[tokio::test]
    async fn test_batch_limit_truncates_and_resumes() {
        let dir = tempdir().unwrap();
        let candidates = spread(25, 1);

        let mut first = engine(&dir, ScriptedProvider::new(land_above_equator), relaxed(10, 2));
        let report = first.run(candidates.clone()).await.unwrap();
        assert_eq!(report.outcome, RunOutcome::BatchLimitReached);
        assert_eq!(report.persisted, 20);
        assert_eq!(report.unprocessed, 5);
        assert_eq!(first.provider().calls().len(), 2);

        let mut second = engine(&dir, ScriptedProvider::new(land_above_equator), relaxed(10, 2));
        let report = second.run(candidates).await.unwrap();
        assert_eq!(report.outcome, RunOutcome::Completed);
        assert_eq!(report.working_set, 5);
        assert_eq!(persisted_ids(&dir).await.len(), 25);
    }

    #[tokio::test]
    async fn test_throttling_retries_same_batch_with_backoff() {
        let dir = tempdir().unwrap();
        let throttled = || {
            Some(ProviderError::Throttled {
                url: "test".to_string(),
                status: StatusCode::TOO_MANY_REQUESTS,
            })
        };
        let provider =
            ScriptedProvider::new(land_above_equator).with_script(vec![throttled(), throttled()]);

        let config = relaxed(5, 10);
        let mut engine = engine(&dir, provider, config);
        let report = engine.run(spread(5, 1)).await.unwrap();

        let calls = engine.provider().calls();
        assert_eq!(calls.len(), 3);
        assert!(calls.windows(2).all(|pair| pair[0] == pair[1]));
        assert_eq!(report.throttled, 2);
        assert_eq!(report.requests, 3);
        assert_eq!(report.persisted, 5);
        assert!(report.final_interval > Duration::from_millis(1));
    }

    #[tokio::test]
    async fn test_transient_failures_abort_after_budget() {
        let dir = tempdir().unwrap();
        let unavailable = || {
            Some(ProviderError::Unavailable {
                url: "test".to_string(),
                status: StatusCode::SERVICE_UNAVAILABLE,
            })
        };
        let provider = ScriptedProvider::new(land_above_equator).with_script(vec![
            None,
            unavailable(),
            unavailable(),
            unavailable(),
        ]);
        let mut config = relaxed(5, 10);
        config.retry = RetryPolicy {
            max_transient_retries: 2,
            max_throttle_retries: None,
        };

        let mut engine = engine(&dir, provider, config);
        let error = engine.run(spread(15, 1)).await.unwrap_err();
        assert!(matches!(
            error,
            EnrichError::Aborted {
                batches_persisted: 1,
                ..
            }
        ));
        assert_eq!(engine.state(), EngineState::Aborted);
        assert_eq!(engine.provider().calls().len(), 4);

        let ids = persisted_ids(&dir).await;
        assert_eq!(ids.len(), 5);
        assert!((1..=5).all(|id| ids.contains(&RecordId::Int(id))));

        let mut resumed = self::engine(&dir, ScriptedProvider::new(land_above_equator), relaxed(5, 10));
        let report = resumed.run(spread(15, 1)).await.unwrap();
        assert_eq!(report.working_set, 10);
        assert_eq!(persisted_ids(&dir).await.len(), 15);
    }

    #[tokio::test]
    async fn test_fatal_error_aborts_without_retry() {
        let dir = tempdir().unwrap();
        let provider = ScriptedProvider::new(land_above_equator).with_script(vec![Some(
            ProviderError::Rejected {
                url: "test".to_string(),
                status: StatusCode::BAD_REQUEST,
                reason: "Latitude must be in range of -90 to 90°.".to_string(),
            },
        )]);

        let mut engine = engine(&dir, provider, relaxed(5, 10));
        let error = engine.run(spread(5, 1)).await.unwrap_err();
        assert!(matches!(
            error,
            EnrichError::Aborted {
                batches_persisted: 0,
                ..
            }
        ));
        assert_eq!(engine.provider().calls().len(), 1);
        assert!(!dir.path().join("checkpoint.csv").exists());
    }

    #[tokio::test]
    async fn test_invalid_config_fails_before_any_work() {
        let dir = tempdir().unwrap();
        let config = EnrichmentConfig::builder()
            .batch_size(100)
            .batch_limit(500)
            .duration_budget(Duration::from_secs(5 * 60))
            .build();

        let mut engine = engine(&dir, ScriptedProvider::new(land_above_equator), config);
        let error = engine.run(spread(5, 1)).await.unwrap_err();
        assert!(matches!(
            error,
            EnrichError::Config(ConfigError::IntervalBelowMinimum { .. })
        ));
        assert_eq!(engine.state(), EngineState::Aborted);
        assert!(engine.provider().calls().is_empty());
        assert!(!dir.path().join("checkpoint.csv").exists());
        assert!(!dir.path().join("cache.json").exists());
    }

    #[tokio::test]
    async fn test_precision_above_maximum_is_rejected() {
        let dir = tempdir().unwrap();
        let mut config = relaxed(5, 10);
        config.precision = MAX_PRECISION + 1;

        let mut engine = engine(&dir, ScriptedProvider::new(land_above_equator), config);
        let error = engine.run(spread(5, 1)).await.unwrap_err();
        assert!(matches!(
            error,
            EnrichError::Config(ConfigError::PrecisionTooHigh { .. })
        ));
    }

    #[tokio::test]
    async fn test_earlier_batch_answers_later_batch() {
        let dir = tempdir().unwrap();
        let candidates = vec![
            Record::new(1, 46.0, 8.0),
            Record::new(2, 47.0, 8.0),
            Record::new(3, 46.00001, 8.0),
            Record::new(4, 47.00001, 8.0),
        ];

        let mut engine = engine(&dir, ScriptedProvider::new(land_above_equator), relaxed(2, 10));
        let report = engine.run(candidates).await.unwrap();
        assert_eq!(report.batches, 2);
        assert_eq!(report.requests, 1);
        assert_eq!(report.cache_hits, 2);
        assert_eq!(report.persisted, 4);
    }

    #[tokio::test]
    async fn test_cached_sentinel_counts_as_missing() {
        let dir = tempdir().unwrap();
        let mut seeded = ProximityCache::new(4);
        seeded.insert(46.0, 8.0, 0.0);
        seeded.save(&dir.path().join("cache.json")).await.unwrap();

        let mut engine = engine(&dir, ScriptedProvider::new(land_above_equator), relaxed(5, 10));
        let report = engine.run(vec![Record::new(1, 46.0, 8.0)]).await.unwrap();
        assert_eq!(report.cache_hits, 0);
        assert_eq!(report.fetched, 1);
        assert_eq!(engine.provider().calls().len(), 1);
    }

    #[tokio::test]
    async fn test_cancellation_between_batches() {
        let dir = tempdir().unwrap();
        let token = CancellationToken::new();
        let mut provider = ScriptedProvider::new(land_above_equator);
        provider.cancel_after_first = Some(token.clone());

        let mut engine = EnrichmentEngine::builder()
            .provider(provider)
            .store(CsvCheckpointStore::new(dir.path().join("checkpoint.csv")))
            .cache_path(dir.path().join("cache.json"))
            .config(relaxed(5, 10))
            .cancel(token)
            .build();
        let report = engine.run(spread(15, 1)).await.unwrap();

        assert_eq!(report.outcome, RunOutcome::Cancelled);
        assert_eq!(report.batches, 1);
        assert_eq!(report.unprocessed, 10);
        assert_eq!(persisted_ids(&dir).await.len(), 5);
    }
}
