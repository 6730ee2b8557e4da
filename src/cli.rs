//! Command-line interface parsing for awsips
//!
//! This module handles parsing of CLI arguments using clap, and turns the
//! positional service name and `--field KEY=VALUE` options into a `Filter`.

use std::collections::BTreeMap;
use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use serde_json::Value;
use thiserror::Error;

use crate::filter::Filter;

/// Error types for CLI argument parsing
#[derive(Debug, Error)]
pub enum CliError {
    /// A `--field` value is not of the form KEY=VALUE
    #[error("Invalid field filter: '{0}'. Expected KEY=VALUE, e.g. region=us-east-1")]
    InvalidField(String),
}

/// awsips - Look up AWS IP prefixes by service or any published field
#[derive(Parser, Debug)]
#[command(name = "awsips")]
#[command(about = "Look up AWS IP prefixes from a locally cached ip-ranges.json")]
#[command(version)]
pub struct Cli {
    /// Print diagnostics about cache decisions to stderr
    #[arg(long, global = true)]
    pub debug: bool,

    /// Cache file location (default: XDG cache dir, e.g. ~/.cache/awsips/ip-ranges.json)
    #[arg(long, value_name = "PATH", global = true)]
    pub cache_file: Option<PathBuf>,

    /// URL of ip-ranges.json
    #[arg(long, value_name = "URL", global = true)]
    pub url: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

/// What to do with the cache
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Print matching prefixes, refreshing the cache if it is out of date
    Query(FilterArgs),
    /// Print matching prefixes from the cache only, without any network access
    Cached(FilterArgs),
    /// Report whether the cache is up to date (exit status 1 if not)
    Check,
    /// Delete the cache file
    Purge,
}

/// Filter selection shared by `query` and `cached`
#[derive(Args, Debug, Default)]
pub struct FilterArgs {
    /// Service name, case-insensitive (e.g. s3, ec2, cloudfront)
    pub service: Option<String>,

    /// Exact match on any field, repeatable
    ///
    /// Examples:
    ///   awsips query --field region=us-east-1 s3
    ///   awsips query --field network_border_group=us-west-2-lax-1
    #[arg(long = "field", value_name = "KEY=VALUE")]
    pub fields: Vec<String>,
}

/// Splits `KEY=VALUE` at the first `=`
///
/// # Returns
/// * `Ok((key, value))` if the key is non-empty
/// * `Err(CliError::InvalidField)` otherwise
pub fn parse_field_arg(s: &str) -> Result<(String, String), CliError> {
    match s.split_once('=') {
        Some((key, value)) if !key.trim().is_empty() => {
            Ok((key.trim().to_string(), value.to_string()))
        }
        _ => Err(CliError::InvalidField(s.to_string())),
    }
}

impl FilterArgs {
    /// Builds the filter described by these arguments
    ///
    /// A lone service name gives a service filter. Any `--field` gives a field
    /// filter, with the service name (if any) added as a normalized `service`
    /// field. No arguments at all matches every prefix.
    pub fn to_filter(&self) -> Result<Filter, CliError> {
        if self.fields.is_empty() {
            return Ok(match &self.service {
                Some(service) => Filter::Service(service.clone()),
                None => Filter::all(),
            });
        }

        let mut fields = BTreeMap::new();
        for arg in &self.fields {
            let (key, value) = parse_field_arg(arg)?;
            fields.insert(key, Value::String(value));
        }
        if let Some(service) = &self.service {
            fields.insert(
                "service".to_string(),
                Value::String(Filter::normalize_service(service)),
            );
        }
        Ok(Filter::Fields(fields))
    }
}
