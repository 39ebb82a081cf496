//! Computes the work that remains after previous runs.

use crate::checkpoint::error::CheckpointError;
use crate::checkpoint::store::CheckpointStore;
use crate::types::record::{Record, RecordId};
use log::info;
use std::collections::HashSet;

/// Returns the candidates whose ids are not in `persisted`, in candidate order.
///
/// `None` means nothing was ever persisted, so every candidate remains. Repeated
/// candidate ids are collapsed to their first occurrence, which keeps every id at
/// most once in the checkpoint.
///
/// # Examples
///
/// ```
/// use eco_enrich::{resolve, Record, RecordId};
/// use std::collections::HashSet;
///
/// let candidates = vec![Record::new(1, 0.0, 0.0), Record::new(2, 0.0, 0.0)];
/// let persisted: HashSet<RecordId> = [RecordId::Int(1)].into_iter().collect();
/// let remaining = resolve(candidates, Some(&persisted));
/// assert_eq!(remaining.len(), 1);
/// assert_eq!(remaining[0].id, RecordId::Int(2));
/// ```
pub fn resolve(candidates: Vec<Record>, persisted: Option<&HashSet<RecordId>>) -> Vec<Record> {
    let mut seen: HashSet<RecordId> = HashSet::with_capacity(candidates.len());
    candidates
        .into_iter()
        .filter(|record| persisted.map_or(true, |done| !done.contains(&record.id)))
        .filter(|record| seen.insert(record.id.clone()))
        .collect()
}

/// Resolves the working set against the ids persisted in `store`.
pub async fn resolve_with_store<S: CheckpointStore>(
    candidates: Vec<Record>,
    store: &S,
) -> Result<Vec<Record>, CheckpointError> {
    let candidate_count = candidates.len();
    let persisted = store.completed_ids().await?;
    let working_set = resolve(candidates, persisted.as_ref());
    info!(
        "{} of {} candidate records still need enrichment",
        working_set.len(),
        candidate_count
    );
    Ok(working_set)
}
