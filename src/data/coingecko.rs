//! CoinGecko `market_chart` integration.

use reqwest::Url;
use reqwest::blocking::{Client, Request};
use reqwest::header::{ACCEPT, HeaderMap, HeaderName, HeaderValue};

use crate::config::ApiConfig;
use crate::error::{AppError, LoadError};

const API_KEY_HEADER: &str = "x-cg-demo-api-key";

/// Request window for a market chart. The loader always uses [`MarketChartQuery::FIXED`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MarketChartQuery {
    pub vs_currency: &'static str,
    pub days: u32,
    pub interval: &'static str,
    pub precision: u32,
}

impl MarketChartQuery {
    /// Ten daily samples quoted in USD, rounded to whole units.
    pub const FIXED: MarketChartQuery = MarketChartQuery {
        vs_currency: "usd",
        days: 10,
        interval: "daily",
        precision: 0,
    };

    pub fn pairs(&self) -> [(&'static str, String); 4] {
        [
            ("vs_currency", self.vs_currency.to_string()),
            ("days", self.days.to_string()),
            ("interval", self.interval.to_string()),
            ("precision", self.precision.to_string()),
        ]
    }
}

/// Anything that can return the raw body of a market-chart request.
///
/// Implementations report every transport-level failure (connect, timeout,
/// non-2xx status, unreadable body) as [`LoadError::Transport`]. Shape checks
/// are left to the caller.
pub trait MarketChartSource: Send + Sync {
    fn fetch_market_chart(&self, coin_id: &str, query: &MarketChartQuery) -> Result<String, LoadError>;
}

pub struct CoinGeckoClient {
    client: Client,
    base_url: Url,
}

impl CoinGeckoClient {
    pub fn new(config: &ApiConfig) -> Result<Self, AppError> {
        let base_url = Url::parse(&config.base_url)
            .map_err(|e| AppError::new(2, format!("Invalid API base URL '{}': {e}", config.base_url)))?;
        if base_url.cannot_be_a_base() {
            return Err(AppError::new(
                2,
                format!("API base URL '{}' cannot carry a path.", config.base_url),
            ));
        }

        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
        if let Some(key) = &config.api_key {
            let value = HeaderValue::from_str(key)
                .map_err(|e| AppError::new(2, format!("Invalid API key header value: {e}")))?;
            headers.insert(HeaderName::from_static(API_KEY_HEADER), value);
        }

        let client = Client::builder()
            .user_agent(concat!("market-chart/", env!("CARGO_PKG_VERSION")))
            .default_headers(headers)
            .timeout(config.timeout)
            .build()
            .map_err(|e| AppError::new(2, format!("Failed to build HTTP client: {e}")))?;

        Ok(Self { client, base_url })
    }

    /// Build (without sending) the request for `coin_id`.
    pub fn request(&self, coin_id: &str, query: &MarketChartQuery) -> Result<Request, LoadError> {
        let url = self.market_chart_url(coin_id)?;
        self.client
            .get(url)
            .query(&query.pairs())
            .build()
            .map_err(|e| LoadError::transport(format!("failed to build request: {e}")))
    }

    fn market_chart_url(&self, coin_id: &str) -> Result<Url, LoadError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| LoadError::transport("base URL cannot carry a path"))?
            .pop_if_empty()
            .extend(["coins", coin_id, "market_chart"]);
        Ok(url)
    }
}

impl MarketChartSource for CoinGeckoClient {
    fn fetch_market_chart(&self, coin_id: &str, query: &MarketChartQuery) -> Result<String, LoadError> {
        let req = self.request(coin_id, query)?;
        tracing::debug!(url = %req.url(), "requesting market chart");

        let resp = self
            .client
            .execute(req)
            .map_err(|e| LoadError::transport(format!("request failed: {e}")))?;

        let status = resp.status();
        if !status.is_success() {
            return Err(LoadError::transport(format!("request failed with status {status}")));
        }

        resp.text()
            .map_err(|e| LoadError::transport(format!("failed to read response body: {e}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client(base_url: &str) -> CoinGeckoClient {
        let config = ApiConfig {
            base_url: base_url.to_string(),
            ..ApiConfig::default()
        };
        CoinGeckoClient::new(&config).unwrap()
    }

    #[test]
    fn request_targets_market_chart_with_fixed_query() {
        let req = client("https://api.example.test/api/v3")
            .request("bitcoin", &MarketChartQuery::FIXED)
            .unwrap();

        assert_eq!(req.method(), reqwest::Method::GET);
        assert_eq!(
            req.url().as_str(),
            "https://api.example.test/api/v3/coins/bitcoin/market_chart?vs_currency=usd&days=10&interval=daily&precision=0"
        );
    }

    #[test]
    fn coin_id_is_a_single_path_segment() {
        let req = client("https://api.example.test/api/v3")
            .request("foo/bar", &MarketChartQuery::FIXED)
            .unwrap();
        assert_eq!(req.url().path(), "/api/v3/coins/foo%2Fbar/market_chart");
    }

    #[test]
    fn api_key_becomes_default_header() {
        let config = ApiConfig {
            api_key: Some("demo".to_string()),
            ..ApiConfig::default()
        };
        assert!(CoinGeckoClient::new(&config).is_ok());

        let bad = ApiConfig {
            api_key: Some("bad\nkey".to_string()),
            ..ApiConfig::default()
        };
        let err = CoinGeckoClient::new(&bad).err().unwrap();
        assert_eq!(err.exit_code(), 2);
    }
}
