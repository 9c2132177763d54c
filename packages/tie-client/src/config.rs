//! Client configuration.
//!
//! Everything a query reads but never mutates: tokens, endpoints, page size,
//! retry timing and aggregator options. A `TieClient` holds one of these for
//! its whole lifetime, so clients with different tokens can run side by side.

use crate::aggregator::AggregatorOptions;
use crate::error::{Result, TieError};
use crate::retry::RetryPolicy;

pub const DEFAULT_API_URL: &str = "https://tie.dcso.de/api/v1/";
pub const DEFAULT_PINGBACK_URL: &str = "https://tie-fb.xyz/api/v1/";
pub const DEFAULT_PAGE_LIMIT: usize = 1000;

#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Bearer token for the query API
    pub auth_token: String,
    /// Bearer token for pingback submissions
    pub pingback_token: Option<String>,
    /// Query API base URL, with trailing slash
    pub api_url: String,
    /// Pingback API base URL, with trailing slash
    pub pingback_url: String,
    /// IOCs requested per page
    pub page_limit: usize,
    pub retry: RetryPolicy,
    pub aggregator: AggregatorOptions,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            auth_token: String::new(),
            pingback_token: None,
            api_url: DEFAULT_API_URL.to_string(),
            pingback_url: DEFAULT_PINGBACK_URL.to_string(),
            page_limit: DEFAULT_PAGE_LIMIT,
            retry: RetryPolicy::default(),
            aggregator: AggregatorOptions::default(),
        }
    }
}

impl ClientConfig {
    pub fn new(auth_token: impl Into<String>) -> Self {
        Self {
            auth_token: auth_token.into(),
            ..Default::default()
        }
    }

    /// Create from environment variables `TIE_TOKEN` and `TIE_PINGBACK_TOKEN`.
    pub fn from_env() -> Result<Self> {
        let token = std::env::var("TIE_TOKEN")
            .map_err(|_| TieError::Config("TIE_TOKEN not set".into()))?;

        let mut config = Self::new(token);
        config.pingback_token = std::env::var("TIE_PINGBACK_TOKEN").ok();
        Ok(config)
    }

    pub fn with_pingback_token(mut self, token: impl Into<String>) -> Self {
        self.pingback_token = Some(token.into());
        self
    }

    /// Set the query API base URL. A trailing slash is added when missing.
    pub fn with_api_url(mut self, url: impl Into<String>) -> Self {
        self.api_url = with_trailing_slash(url.into());
        self
    }

    pub fn with_pingback_url(mut self, url: impl Into<String>) -> Self {
        self.pingback_url = with_trailing_slash(url.into());
        self
    }

    pub fn with_page_limit(mut self, limit: usize) -> Self {
        self.page_limit = limit;
        self
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn with_bloom_fp_rate(mut self, rate: f64) -> Self {
        self.aggregator.bloom_fp_rate = rate;
        self
    }

    /// Reject settings that would make every request fail.
    pub fn validate(&self) -> Result<()> {
        if self.auth_token.is_empty() {
            return Err(TieError::Config("auth token is empty".into()));
        }
        if self.page_limit == 0 {
            return Err(TieError::Config("page limit must be positive".into()));
        }
        if self.retry.max_attempts == 0 {
            return Err(TieError::Config("retry policy allows no attempts".into()));
        }
        let rate = self.aggregator.bloom_fp_rate;
        if !(rate > 0.0 && rate < 1.0) {
            return Err(TieError::Config(format!(
                "bloom false positive rate must be in (0, 1), got {}",
                rate
            )));
        }
        Ok(())
    }
}

fn with_trailing_slash(mut url: String) -> String {
    if !url.ends_with('/') {
        url.push('/');
    }
    url
}
