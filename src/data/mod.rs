//! Core data models for the AWS IP ranges cache
//!
//! This module contains the persisted snapshot type and the individual prefix
//! records it carries, plus the client used to fetch them from AWS.

pub mod ranges;

pub use ranges::{RangesClient, RangesError, RangesSource, AWS_IP_RANGES_URL};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// One record of the published dataset
///
/// AWS adds fields to `ip-ranges.json` over time, so a prefix is kept as an
/// open map rather than a fixed struct. Every field is available for filtering;
/// `service` and `ip_prefix` get typed accessors.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Prefix(Map<String, Value>);

impl Prefix {
    /// Returns the raw value stored under `key`
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    /// The owning AWS service (e.g. `S3`, `EC2`, `AMAZON`)
    pub fn service(&self) -> Option<&str> {
        self.get("service").and_then(Value::as_str)
    }

    /// The IPv4 CIDR block of this record
    pub fn ip_prefix(&self) -> Option<&str> {
        self.get("ip_prefix").and_then(Value::as_str)
    }
}

impl From<Map<String, Value>> for Prefix {
    fn from(fields: Map<String, Value>) -> Self {
        Self(fields)
    }
}

/// The locally persisted snapshot of the dataset
///
/// A record only exists in a fully parsed form: a file whose timestamp is
/// missing or not a valid instant fails to deserialize and is treated as if
/// there were no record at all.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheRecord {
    /// When the snapshot was produced
    pub timestamp: DateTime<Utc>,
    /// The dataset records, in the order AWS published them
    #[serde(alias = "prefixes")]
    pub entries: Vec<Prefix>,
}

impl CacheRecord {
    /// Creates a record stamped with the current instant
    pub fn new(entries: Vec<Prefix>) -> Self {
        Self::with_timestamp(Utc::now(), entries)
    }

    /// Creates a record with an explicit timestamp
    pub fn with_timestamp(timestamp: DateTime<Utc>, entries: Vec<Prefix>) -> Self {
        Self { timestamp, entries }
    }
}
