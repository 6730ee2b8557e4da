//! Cache module for the on-disk ranges snapshot
//!
//! This module provides the storage accessor for the single cache file. It
//! knows nothing about freshness; the resolver decides what a missing,
//! unreadable or malformed file means for a query.

mod store;

pub use store::{Access, CacheStore, StoreError};
