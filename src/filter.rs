//! Prefix filtering
//!
//! A query selects prefixes either by service name or by an equality map over
//! arbitrary fields, and yields the matching `ip_prefix` values.

use std::collections::BTreeMap;

use serde_json::Value;

use crate::data::Prefix;

/// Predicate applied to every record of a snapshot
#[derive(Debug, Clone, PartialEq)]
pub enum Filter {
    /// Match the `service` field; the name is trimmed and uppercased first
    Service(String),
    /// Match every listed field exactly; unlisted fields are ignored
    Fields(BTreeMap<String, Value>),
}

impl Filter {
    /// A filter that keeps every record
    pub fn all() -> Self {
        Filter::Fields(BTreeMap::new())
    }

    /// Normalizes a service name the way service filters compare it
    pub fn normalize_service(name: &str) -> String {
        name.trim().to_uppercase()
    }

    /// Returns true if `prefix` satisfies this filter
    pub fn matches(&self, prefix: &Prefix) -> bool {
        match self {
            Filter::Service(name) => prefix.service() == Some(Self::normalize_service(name).as_str()),
            Filter::Fields(fields) => fields
                .iter()
                .all(|(key, expected)| prefix.get(key) == Some(expected)),
        }
    }

    /// Returns the `ip_prefix` of each matching record, in snapshot order
    ///
    /// Matching records without a string `ip_prefix` contribute nothing.
    pub fn apply(&self, entries: &[Prefix]) -> Vec<String> {
        entries
            .iter()
            .filter(|prefix| self.matches(prefix))
            .filter_map(|prefix| prefix.ip_prefix().map(str::to_string))
            .collect()
    }
}

impl From<&str> for Filter {
    fn from(service: &str) -> Self {
        Filter::Service(service.to_string())
    }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for Filter {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Filter::Fields(
            iter.into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }
}
