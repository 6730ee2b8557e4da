//! Freshness check for the cached snapshot
//!
//! Decides whether a snapshot can be served as-is by comparing its timestamp
//! with the `Last-Modified` value of a HEAD request, so a query never pays for
//! a full download just to learn the cache is current.

use chrono::{DateTime, NaiveDateTime, Utc};
use thiserror::Error;
use tracing::debug;

use crate::data::{CacheRecord, RangesError, RangesSource};

/// Why a snapshot was judged stale
#[derive(Debug, Error)]
pub enum Staleness {
    /// There is no usable snapshot
    #[error("cache file does not contain a valid record")]
    NoRecord,

    /// The snapshot claims to come from the future
    #[error("cache timestamp {0} is in the future")]
    FutureTimestamp(DateTime<Utc>),

    /// The HEAD request failed
    #[error("freshness probe failed: {0}")]
    Probe(#[from] RangesError),

    /// The HEAD response carried no `Last-Modified` header
    #[error("HEAD response did not have a last-modified header")]
    MissingLastModified,

    /// The `Last-Modified` header is not a valid HTTP date
    #[error("unparseable last-modified header: {0:?}")]
    InvalidLastModified(String),

    /// The remote dataset changed after the snapshot was taken
    #[error("cache from {local} is older than remote {remote}")]
    Outdated {
        local: DateTime<Utc>,
        remote: DateTime<Utc>,
    },
}

/// Returns true if `record` is current; every failure counts as stale
pub async fn is_fresh<S: RangesSource>(source: &S, record: Option<&CacheRecord>) -> bool {
    match check(source, record).await {
        Ok(()) => {
            debug!("cache is up to date");
            true
        }
        Err(reason) => {
            debug!(%reason, "cache is stale");
            false
        }
    }
}

/// Checks `record` against the remote dataset and reports why it is stale
///
/// The network is only contacted once the local timestamp is known to be no
/// later than now.
pub async fn check<S: RangesSource>(
    source: &S,
    record: Option<&CacheRecord>,
) -> Result<(), Staleness> {
    let record = record.ok_or(Staleness::NoRecord)?;
    let local = record.timestamp;

    if local > Utc::now() {
        return Err(Staleness::FutureTimestamp(local));
    }

    let header = source
        .last_modified()
        .await?
        .ok_or(Staleness::MissingLastModified)?;
    let remote = parse_http_date(&header).ok_or(Staleness::InvalidLastModified(header))?;

    if remote > local {
        return Err(Staleness::Outdated { local, remote });
    }
    Ok(())
}

/// Obsolete HTTP date layouts: RFC 850 and asctime, both implicitly GMT
const LEGACY_HTTP_DATE_FORMATS: [&str; 2] = ["%A, %d-%b-%y %H:%M:%S GMT", "%a %b %e %H:%M:%S %Y"];

/// Parses an HTTP date (`Tue, 05 Mar 2024 18:53:12 GMT`)
///
/// The obsolete RFC 850 and asctime forms and RFC 3339 values are accepted
/// too. Anything else yields `None`.
pub fn parse_http_date(value: &str) -> Option<DateTime<Utc>> {
    let value = value.trim();
    if let Ok(date) = DateTime::parse_from_rfc2822(value).or_else(|_| DateTime::parse_from_rfc3339(value)) {
        return Some(date.with_timezone(&Utc));
    }

    LEGACY_HTTP_DATE_FORMATS
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(value, format).ok())
        .map(|naive| naive.and_utc())
}
