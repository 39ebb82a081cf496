//! Lifecycle states and the summary of an enrichment run.

use std::fmt;
use std::time::Duration;

/// Where the engine is in its per-batch cycle.
///
/// `BatchPending` through `Persisting` repeat once per batch. `Aborted` is only
/// entered from `Init` (bad configuration) or `Requesting` (provider failure).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineState {
    Init,
    Resolving,
    BatchPending,
    CacheReducing,
    Requesting,
    Merging,
    Persisting,
    Done,
    Aborted,
}

/// Why a run ended without error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunOutcome {
    /// Every record of the working set went through a batch.
    Completed,
    /// The configured number of batches was used up before the data.
    BatchLimitReached,
    /// Stopped between batches on request.
    Cancelled,
    /// The checkpoint already covered every candidate.
    NoRemainingWork,
}

impl fmt::Display for RunOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let message = match self {
            RunOutcome::Completed => "Enrichment complete: working set exhausted",
            RunOutcome::BatchLimitReached => {
                "Batch limit reached: remaining records resume on the next run"
            }
            RunOutcome::Cancelled => "Enrichment cancelled between batches",
            RunOutcome::NoRemainingWork => "No more work: every candidate is already enriched",
        };
        f.write_str(message)
    }
}

/// Counters describing one run.
#[derive(Debug, Clone, PartialEq)]
pub struct RunReport {
    pub outcome: RunOutcome,
    /// Records left after checkpoint resolution.
    pub working_set: usize,
    /// Batches fully processed and persisted.
    pub batches: usize,
    /// External requests issued, retries included.
    pub requests: usize,
    /// Records answered by the proximity cache.
    pub cache_hits: usize,
    /// Records answered by the provider.
    pub fetched: usize,
    /// Records the provider had no answer for; they stay out of the checkpoint.
    pub no_answer: usize,
    /// Rows appended to the checkpoint.
    pub persisted: usize,
    pub throttled: usize,
    pub transient_failures: usize,
    /// Records of the working set that no batch reached.
    pub unprocessed: usize,
    /// Request interval at the end of the run, after any backoff.
    pub final_interval: Duration,
}

impl RunReport {
    pub(crate) fn new(working_set: usize, interval: Duration) -> Self {
        Self {
            outcome: RunOutcome::Completed,
            working_set,
            batches: 0,
            requests: 0,
            cache_hits: 0,
            fetched: 0,
            no_answer: 0,
            persisted: 0,
            throttled: 0,
            transient_failures: 0,
            unprocessed: working_set,
            final_interval: interval,
        }
    }
}

impl fmt::Display for RunReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} ({} batches, {} requests, {} cache hits, {} fetched, {} without answer, {} persisted, {} unprocessed)",
            self.outcome,
            self.batches,
            self.requests,
            self.cache_hits,
            self.fetched,
            self.no_answer,
            self.persisted,
            self.unprocessed
        )
    }
}
