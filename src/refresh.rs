//! Full refresh of the cached snapshot
//!
//! Downloads the dataset, stamps it with the current instant and persists it.
//! A failed write is logged and otherwise ignored: the caller still gets the
//! fresh data, and the next query simply refreshes again.

use tracing::{info, warn};

use crate::cache::CacheStore;
use crate::data::{CacheRecord, RangesError, RangesSource};

/// Fetches the dataset and replaces the cached snapshot
///
/// # Returns
/// * `Ok(CacheRecord)` - The new snapshot, whether or not it reached disk
/// * `Err(RangesError)` - If the download or payload was unusable
pub async fn refresh<S: RangesSource>(
    source: &S,
    store: &CacheStore,
) -> Result<CacheRecord, RangesError> {
    let entries = source.fetch_prefixes().await?;
    let record = CacheRecord::new(entries);

    info!(entries = record.entries.len(), path = %store.path().display(), "writing new cache file");
    if let Err(err) = store.write(&record).await {
        warn!(error = %err, path = %store.path().display(), "could not persist refreshed cache");
    }

    Ok(record)
}
