//! Fake ranges sources for unit tests

use std::sync::atomic::{AtomicUsize, Ordering};

use serde_json::{json, Value};

use crate::data::{Prefix, RangesError, RangesSource};

/// Builds a prefix from a JSON object literal
pub fn prefix(value: Value) -> Prefix {
    serde_json::from_value(value).expect("prefix literal should be an object")
}

/// A small dataset with two services across two regions
pub fn sample_prefixes() -> Vec<Prefix> {
    vec![
        prefix(json!({ "ip_prefix": "52.95.245.0/24", "region": "us-east-1", "service": "S3" })),
        prefix(json!({ "ip_prefix": "3.5.140.0/22", "region": "ap-northeast-2", "service": "AMAZON" })),
        prefix(json!({ "ip_prefix": "52.219.0.0/20", "region": "eu-west-1", "service": "S3" })),
        prefix(json!({ "ip_prefix": "18.206.0.0/16", "region": "us-east-1", "service": "EC2" })),
        prefix(json!({ "ip_prefix": "54.231.0.0/16", "region": "us-east-1", "service": "S3" })),
    ]
}

/// A source that answers from canned data and counts calls
pub struct FakeSource {
    last_modified: Option<String>,
    prefixes: Option<Vec<Prefix>>,
    probe_fails: bool,
    probes: AtomicUsize,
    fetches: AtomicUsize,
}

impl FakeSource {
    /// Probe reports `last_modified`; fetch returns `sample_prefixes()`
    pub fn new(last_modified: Option<&str>) -> Self {
        Self {
            last_modified: last_modified.map(str::to_string),
            prefixes: Some(sample_prefixes()),
            probe_fails: false,
            probes: AtomicUsize::new(0),
            fetches: AtomicUsize::new(0),
        }
    }

    /// Fetch fails with a missing-field error
    pub fn failing_fetch(mut self) -> Self {
        self.prefixes = None;
        self
    }

    /// Probe fails as if the endpoint were unreachable
    pub fn failing_probe(mut self) -> Self {
        self.probe_fails = true;
        self
    }

    pub fn probe_count(&self) -> usize {
        self.probes.load(Ordering::SeqCst)
    }

    pub fn fetch_count(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }
}

impl RangesSource for FakeSource {
    async fn last_modified(&self) -> Result<Option<String>, RangesError> {
        self.probes.fetch_add(1, Ordering::SeqCst);
        if self.probe_fails {
            return Err(RangesError::Parse(
                serde_json::from_str::<Value>("").unwrap_err(),
            ));
        }
        Ok(self.last_modified.clone())
    }

    async fn fetch_prefixes(&self) -> Result<Vec<Prefix>, RangesError> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        self.prefixes
            .clone()
            .ok_or_else(|| RangesError::MissingField("prefixes".to_string()))
    }
}

/// A source that fails the test if it is ever called
pub struct UnreachableSource;

impl RangesSource for UnreachableSource {
    async fn last_modified(&self) -> Result<Option<String>, RangesError> {
        panic!("network probe must not be issued");
    }

    async fn fetch_prefixes(&self) -> Result<Vec<Prefix>, RangesError> {
        panic!("network fetch must not be issued");
    }
}
