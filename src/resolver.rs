//! Query resolution over the cached snapshot
//!
//! The resolver walks a fixed chain of stages until it holds a usable
//! snapshot:
//!
//! ```text
//! NoRecord ──► Stale ──► Refreshing ──► Ready
//! Loaded ──┬─► Ready
//!          └─► Stale ──► Refreshing ──► Ready
//! ```
//!
//! Local failures (missing, unreadable or malformed file, stale or
//! unverifiable timestamp) only move the chain forward. The full download in
//! `Refreshing` is the last stage, so its failure is the one error a query
//! can return.
//!
//! Nothing is locked between reading a stale snapshot and writing its
//! replacement. Concurrent queries may each refresh; the last write wins.

use thiserror::Error;
use tracing::debug;

use crate::cache::{Access, CacheStore, StoreError};
use crate::config::Config;
use crate::data::{CacheRecord, RangesClient, RangesError, RangesSource};
use crate::filter::Filter;
use crate::freshness;
use crate::refresh;

/// Errors surfaced to callers of the resolver
#[derive(Debug, Error)]
pub enum QueryError {
    /// The dataset had to be downloaded and the download failed
    #[error("could not fetch AWS IP ranges: {0}")]
    Fetch(#[from] RangesError),

    /// The cache-only path found no usable snapshot
    #[error("cache does not exist or is not readable")]
    CacheUnavailable(#[source] StoreError),
}

/// Position of a query in the fallback chain
#[derive(Debug, Clone, PartialEq)]
pub enum Stage {
    /// No snapshot could be loaded
    NoRecord,
    /// A snapshot was loaded but not yet verified
    Loaded(CacheRecord),
    /// The snapshot is missing or out of date
    Stale,
    /// A full download is due
    Refreshing,
    /// A usable snapshot is in hand
    Ready(CacheRecord),
}

impl Stage {
    fn name(&self) -> &'static str {
        match self {
            Stage::NoRecord => "no-record",
            Stage::Loaded(_) => "loaded",
            Stage::Stale => "stale",
            Stage::Refreshing => "refreshing",
            Stage::Ready(_) => "ready",
        }
    }
}

/// Serves filtered views of the cached AWS IP ranges
pub struct Resolver<S = RangesClient> {
    store: CacheStore,
    source: S,
}

impl Resolver<RangesClient> {
    /// Creates a resolver that talks to `config.url`
    pub fn new(config: &Config) -> Self {
        Self::with_source(config, RangesClient::with_url(config.url.clone()))
    }
}

impl<S: RangesSource> Resolver<S> {
    /// Creates a resolver with a custom ranges source
    pub fn with_source(config: &Config, source: S) -> Self {
        Self {
            store: CacheStore::with_path(config.cache_path.clone()),
            source,
        }
    }

    /// Returns the prefixes matching `filter`, refreshing the cache if needed
    ///
    /// This is the only operation that downloads the dataset or writes the
    /// cache file.
    pub async fn query(&self, filter: &Filter) -> Result<Vec<String>, QueryError> {
        let mut stage = self.load(Access::READ_WRITE).await;
        loop {
            debug!(stage = stage.name(), "resolving query");
            stage = match stage {
                Stage::Ready(record) => return Ok(filter.apply(&record.entries)),
                other => self.advance(other).await?,
            };
        }
    }

    /// Returns true if the cached snapshot is current
    ///
    /// Never downloads the dataset; any failure reads as `false`.
    pub async fn is_up_to_date(&self) -> bool {
        let stage = self.load(Access::READ).await;
        matches!(self.advance(stage).await, Ok(Stage::Ready(_)))
    }

    /// Returns the prefixes matching `filter` from the cache file alone
    ///
    /// Never touches the network and never checks freshness.
    pub async fn get_from_cache(&self, filter: &Filter) -> Result<Vec<String>, QueryError> {
        let record = self
            .open(Access::READ)
            .await
            .map_err(QueryError::CacheUnavailable)?;
        Ok(filter.apply(&record.entries))
    }

    /// Removes the cache file, leaving an empty one if removal fails
    pub async fn delete_cache(&self) {
        self.store.delete().await;
    }

    /// Moves the chain one stage forward
    ///
    /// Only `Refreshing` can fail.
    async fn advance(&self, stage: Stage) -> Result<Stage, QueryError> {
        let next = match stage {
            Stage::NoRecord => self.verify(None).await,
            Stage::Loaded(record) => self.verify(Some(record)).await,
            Stage::Stale => Stage::Refreshing,
            Stage::Refreshing => Stage::Ready(refresh::refresh(&self.source, &self.store).await?),
            ready @ Stage::Ready(_) => ready,
        };
        Ok(next)
    }

    /// Ready if the snapshot passes the freshness check, otherwise Stale
    async fn verify(&self, record: Option<CacheRecord>) -> Stage {
        let fresh = freshness::is_fresh(&self.source, record.as_ref()).await;
        match record {
            Some(record) if fresh => Stage::Ready(record),
            _ => Stage::Stale,
        }
    }

    /// Loads the snapshot, treating any failure as no snapshot
    async fn load(&self, access: Access) -> Stage {
        match self.open(access).await {
            Ok(record) => Stage::Loaded(record),
            Err(err) => {
                debug!(error = %err, "no usable cache file");
                Stage::NoRecord
            }
        }
    }

    /// Existence, access and parse checks, in that order
    async fn open(&self, access: Access) -> Result<CacheRecord, StoreError> {
        if !self.store.exists().await {
            return Err(StoreError::NotFound);
        }
        self.store.check_access(access).await?;
        debug!("cache file access check passed");
        self.store.read().await
    }
}
