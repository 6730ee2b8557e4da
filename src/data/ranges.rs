//! AWS ip-ranges.json client
//!
//! This module provides the two remote operations the cache needs: a cheap
//! metadata probe (a HEAD request reporting `Last-Modified`) and a full fetch
//! of the published prefixes.

use std::future::Future;

use reqwest::header::LAST_MODIFIED;
use reqwest::Client;
use serde::Deserialize;
use thiserror::Error;

use super::Prefix;

/// Where AWS publishes its IP address ranges
pub const AWS_IP_RANGES_URL: &str = "https://ip-ranges.amazonaws.com/ip-ranges.json";

/// Errors that can occur when talking to the ranges endpoint
#[derive(Debug, Error)]
pub enum RangesError {
    /// HTTP request failed
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Failed to parse JSON response
    #[error("Failed to parse JSON response: {0}")]
    Parse(#[from] serde_json::Error),

    /// Missing expected field in response
    #[error("Missing expected field in response: {0}")]
    MissingField(String),
}

/// The remote dataset as seen by the cache
///
/// `RangesClient` is the production implementation; tests substitute fakes
/// that count or forbid calls.
pub trait RangesSource: Send + Sync {
    /// Issues a metadata-only request and returns the raw `Last-Modified` value, if any
    fn last_modified(&self) -> impl Future<Output = Result<Option<String>, RangesError>> + Send;

    /// Downloads the full dataset and returns its prefixes
    fn fetch_prefixes(&self) -> impl Future<Output = Result<Vec<Prefix>, RangesError>> + Send;
}

/// Response body of ip-ranges.json
///
/// Only `prefixes` is needed. It is optional here so an absent array is
/// reported as a missing field rather than a generic parse failure.
#[derive(Debug, Deserialize)]
struct RangesDocument {
    prefixes: Option<Vec<Prefix>>,
}

/// Client for the AWS ip-ranges endpoint
#[derive(Debug, Clone)]
pub struct RangesClient {
    http_client: Client,
    url: String,
}

impl Default for RangesClient {
    fn default() -> Self {
        Self::new()
    }
}

impl RangesClient {
    /// Create a new RangesClient pointed at the public AWS endpoint
    pub fn new() -> Self {
        Self::with_url(AWS_IP_RANGES_URL)
    }

    /// Create a new RangesClient for a custom URL (mirrors, testing)
    pub fn with_url(url: impl Into<String>) -> Self {
        Self {
            http_client: Client::new(),
            url: url.into(),
        }
    }

    /// The URL this client reads from
    pub fn url(&self) -> &str {
        &self.url
    }
}

impl RangesSource for RangesClient {
    async fn last_modified(&self) -> Result<Option<String>, RangesError> {
        let response = self
            .http_client
            .head(&self.url)
            .send()
            .await?
            .error_for_status()?;

        Ok(response
            .headers()
            .get(LAST_MODIFIED)
            .map(|value| String::from_utf8_lossy(value.as_bytes()).into_owned()))
    }

    async fn fetch_prefixes(&self) -> Result<Vec<Prefix>, RangesError> {
        let response = self
            .http_client
            .get(&self.url)
            .send()
            .await?
            .error_for_status()?;
        let text = response.text().await?;

        parse_document(&text)
    }
}

/// Parses an ip-ranges.json body into its prefixes
fn parse_document(text: &str) -> Result<Vec<Prefix>, RangesError> {
    let document: RangesDocument = serde_json::from_str(text)?;
    document
        .prefixes
        .ok_or_else(|| RangesError::MissingField("prefixes".to_string()))
}
