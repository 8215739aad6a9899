//! API client configuration.
//!
//! Values come from the process environment, after loading an optional `.env`
//! file. The loader never reads the environment itself; the shell builds an
//! `ApiConfig` and injects the resulting client.

use std::time::Duration;

use crate::error::AppError;

pub const DEFAULT_API_URL: &str = "https://api.coingecko.com/api/v3";

const ENV_API_URL: &str = "COINGECKO_API_URL";
const ENV_API_KEY: &str = "COINGECKO_API_KEY";
const ENV_TIMEOUT: &str = "MC_HTTP_TIMEOUT_SECS";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiConfig {
    /// Base URL without a trailing slash.
    pub base_url: String,
    /// Demo API key, sent as `x-cg-demo-api-key`.
    pub api_key: Option<String>,
    /// `None` leaves the transport without a timeout.
    pub timeout: Option<Duration>,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_API_URL.to_string(),
            api_key: None,
            timeout: None,
        }
    }
}

impl ApiConfig {
    pub fn from_env() -> Result<Self, AppError> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary key lookup (environment, map, ...).
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, AppError> {
        let base_url = lookup(ENV_API_URL)
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
            .unwrap_or_else(|| DEFAULT_API_URL.to_string());

        if !(base_url.starts_with("http://") || base_url.starts_with("https://")) {
            return Err(AppError::new(
                2,
                format!("{ENV_API_URL} must be an http(s) URL (got '{base_url}')."),
            ));
        }

        let api_key = lookup(ENV_API_KEY)
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty());

        let timeout = match lookup(ENV_TIMEOUT).map(|v| v.trim().to_string()) {
            None => None,
            Some(raw) if raw.is_empty() => None,
            Some(raw) => {
                let secs = raw.parse::<u64>().map_err(|e| {
                    AppError::new(2, format!("Invalid {ENV_TIMEOUT} '{raw}': {e}"))
                })?;
                (secs > 0).then(|| Duration::from_secs(secs))
            }
        };

        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
            timeout,
        })
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_when_unset() {
        let config = ApiConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config, ApiConfig::default());
    }

    #[test]
    fn reads_overrides_and_trims_trailing_slash() {
        let config = ApiConfig::from_lookup(lookup(&[
            ("COINGECKO_API_URL", "https://example.test/api/v3/"),
            ("COINGECKO_API_KEY", " demo-key "),
            ("MC_HTTP_TIMEOUT_SECS", "15"),
        ]))
        .unwrap();
        assert_eq!(config.base_url, "https://example.test/api/v3");
        assert_eq!(config.api_key.as_deref(), Some("demo-key"));
        assert_eq!(config.timeout, Some(Duration::from_secs(15)));
    }

    #[test]
    fn zero_timeout_means_none() {
        let config = ApiConfig::from_lookup(lookup(&[("MC_HTTP_TIMEOUT_SECS", "0")])).unwrap();
        assert_eq!(config.timeout, None);
    }

    #[test]
    fn rejects_bad_values() {
        let err = ApiConfig::from_lookup(lookup(&[("MC_HTTP_TIMEOUT_SECS", "soon")])).unwrap_err();
        assert_eq!(err.exit_code(), 2);

        let err = ApiConfig::from_lookup(lookup(&[("COINGECKO_API_URL", "ftp://x")])).unwrap_err();
        assert_eq!(err.exit_code(), 2);
    }
}
