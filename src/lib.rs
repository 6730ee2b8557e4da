//! awsips library
//!
//! Keeps a local copy of AWS's `ip-ranges.json`, checks it against the
//! published `Last-Modified` date before use, and filters its prefixes.

pub mod cache;
pub mod cli;
pub mod config;
pub mod data;
pub mod filter;
pub mod freshness;
pub mod logging;
pub mod refresh;
pub mod resolver;

#[cfg(test)]
mod testing;

pub use config::Config;
pub use filter::Filter;
pub use resolver::{QueryError, Resolver};
