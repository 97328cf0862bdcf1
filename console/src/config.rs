//! Configuration management for the console.

use practice_engine::RetryPolicy;
use std::env;
use std::path::PathBuf;
use std::time::Duration;

/// Backend address used when `PRACTICE_API_URL` is not set.
pub const DEFAULT_API_URL: &str = "http://localhost:5000/api";

/// Local storage directory used when `PRACTICE_DATA_DIR` is not set.
pub const DEFAULT_DATA_DIR: &str = ".practice-console";

/// Console configuration loaded from environment variables.
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    /// Base address of the REST API
    pub api_url: String,
    /// Directory holding local fallback storage
    pub data_dir: PathBuf,
    /// Client-side request timeout; `None` leaves it to the transport
    pub http_timeout: Option<Duration>,
    /// Which failed creates are kept locally
    pub retry_policy: RetryPolicy,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            data_dir: PathBuf::from(DEFAULT_DATA_DIR),
            http_timeout: None,
            retry_policy: RetryPolicy::default(),
        }
    }
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration through an arbitrary variable lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let api_url = lookup("PRACTICE_API_URL").unwrap_or_else(|| DEFAULT_API_URL.to_string());
        if !(api_url.starts_with("http://") || api_url.starts_with("https://")) {
            return Err(ConfigError::InvalidApiUrl(api_url));
        }

        let data_dir = lookup("PRACTICE_DATA_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_DATA_DIR));

        let http_timeout = lookup("PRACTICE_HTTP_TIMEOUT_SECS")
            .map(|v| v.trim().parse::<u64>().map_err(|_| ConfigError::InvalidTimeout))
            .transpose()?
            .filter(|secs| *secs > 0)
            .map(Duration::from_secs);

        let retry_policy = match lookup("PRACTICE_FALLBACK_ON_5XX").as_deref().map(str::trim) {
            None | Some("") | Some("0") | Some("false") => RetryPolicy::TransportOr500,
            Some("1") | Some("true") => RetryPolicy::TransportOr5xx,
            Some(_) => return Err(ConfigError::InvalidFlag("PRACTICE_FALLBACK_ON_5XX")),
        };

        Ok(Self {
            api_url,
            data_dir,
            http_timeout,
            retry_policy,
        })
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("PRACTICE_API_URL must be an http(s) URL, got '{0}'")]
    InvalidApiUrl(String),

    #[error("Invalid PRACTICE_HTTP_TIMEOUT_SECS value")]
    InvalidTimeout,

    #[error("{0} must be true/false or 1/0")]
    InvalidFlag(&'static str),
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn defaults_when_unset() {
        let config = Config::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config, Config::default());
        assert_eq!(config.api_url, "http://localhost:5000/api");
    }

    #[test]
    fn reads_every_variable() {
        let config = Config::from_lookup(lookup(&[
            ("PRACTICE_API_URL", "https://admin.example.com/api"),
            ("PRACTICE_DATA_DIR", "/var/lib/practice"),
            ("PRACTICE_HTTP_TIMEOUT_SECS", "15"),
            ("PRACTICE_FALLBACK_ON_5XX", "true"),
        ]))
        .unwrap();

        assert_eq!(config.api_url, "https://admin.example.com/api");
        assert_eq!(config.data_dir, PathBuf::from("/var/lib/practice"));
        assert_eq!(config.http_timeout, Some(Duration::from_secs(15)));
        assert_eq!(config.retry_policy, RetryPolicy::TransportOr5xx);
    }

    #[test]
    fn zero_timeout_means_none() {
        let config =
            Config::from_lookup(lookup(&[("PRACTICE_HTTP_TIMEOUT_SECS", "0")])).unwrap();
        assert_eq!(config.http_timeout, None);
    }

    #[test]
    fn rejects_bad_values() {
        assert_eq!(
            Config::from_lookup(lookup(&[("PRACTICE_HTTP_TIMEOUT_SECS", "soon")])),
            Err(ConfigError::InvalidTimeout)
        );
        assert_eq!(
            Config::from_lookup(lookup(&[("PRACTICE_FALLBACK_ON_5XX", "maybe")])),
            Err(ConfigError::InvalidFlag("PRACTICE_FALLBACK_ON_5XX"))
        );
        assert!(matches!(
            Config::from_lookup(lookup(&[("PRACTICE_API_URL", "localhost:5000")])),
            Err(ConfigError::InvalidApiUrl(_))
        ));
    }
}
