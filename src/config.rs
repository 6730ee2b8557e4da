//! Runtime configuration
//!
//! Everything the resolver needs to know about its environment is carried in
//! a `Config` value handed to it at construction.

use std::path::PathBuf;

use crate::cache::CacheStore;
use crate::cli::Cli;
use crate::data::AWS_IP_RANGES_URL;

/// Settings for a resolver instance
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Location of the cache file
    pub cache_path: PathBuf,
    /// URL of ip-ranges.json
    pub url: String,
    /// Whether diagnostic output is enabled
    pub debug: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            cache_path: CacheStore::default_path(),
            url: AWS_IP_RANGES_URL.to_string(),
            debug: false,
        }
    }
}

impl Config {
    /// Creates a Config from parsed CLI arguments, filling in defaults
    pub fn from_cli(cli: &Cli) -> Self {
        let defaults = Config::default();
        Self {
            cache_path: cli.cache_file.clone().unwrap_or(defaults.cache_path),
            url: cli.url.clone().unwrap_or(defaults.url),
            debug: cli.debug,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[test]
    fn test_config_default() {
        let config = Config::default();
        assert_eq!(config.url, AWS_IP_RANGES_URL);
        assert!(!config.debug);
        assert!(config.cache_path.file_name().is_some());
    }

    #[test]
    fn test_config_from_cli_defaults() {
        let cli = Cli::parse_from(["awsips", "check"]);
        assert_eq!(Config::from_cli(&cli), Config::default());
    }

    #[test]
    fn test_config_from_cli_overrides() {
        let cli = Cli::parse_from([
            "awsips",
            "--debug",
            "--cache-file",
            "/tmp/ranges.json",
            "--url",
            "http://mirror.local/ip-ranges.json",
            "purge",
        ]);
        let config = Config::from_cli(&cli);

        assert!(config.debug);
        assert_eq!(config.cache_path, PathBuf::from("/tmp/ranges.json"));
        assert_eq!(config.url, "http://mirror.local/ip-ranges.json");
    }
}
