use async_trait::async_trait;
use governor::{DefaultDirectRateLimiter, Quota, RateLimiter};
use nonzero_ext::nonzero;
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use shared_utils::env::get_secret_env_var;
use snafu::ResultExt;
use tracing::{debug, info};

use crate::{
    models::raw_row::RawRow,
    providers::{
        ApiSnafu, ClientBuildSnafu, DataProvider, MissingEnvVarSnafu, ProviderError,
        ProviderInitError, ReqwestSnafu,
        alpha_vantage::{
            params::{construct_params, validate_symbol},
            response::check_body,
        },
    },
    retry::RetryPolicy,
    schema::normalize_csv,
};

const BASE_URL: &str = "https://www.alphavantage.co/query";

/// Environment variable holding the API key.
pub const API_KEY_ENV: &str = "ALPHAVANTAGE_API_KEY";

pub struct AlphaVantageProvider {
    client: Client,
    api_key: SecretString,
    base_url: String,
    retry: RetryPolicy,
    limiter: DefaultDirectRateLimiter,
}

impl AlphaVantageProvider {
    /// Creates a new Alpha Vantage provider.
    ///
    /// Reads the API key from the `ALPHAVANTAGE_API_KEY` environment variable.
    /// Requests are throttled client-side to the free tier's 5 calls per minute.
    pub fn new() -> Result<Self, ProviderInitError> {
        let api_key = get_secret_env_var(API_KEY_ENV).context(MissingEnvVarSnafu)?;
        Self::with_api_key(api_key)
    }

    /// Creates a provider with an explicit key instead of the environment.
    pub fn with_api_key(api_key: SecretString) -> Result<Self, ProviderInitError> {
        let client = Client::builder().build().context(ClientBuildSnafu)?;

        Ok(Self {
            client,
            api_key,
            base_url: BASE_URL.to_string(),
            retry: RetryPolicy::default(),
            limiter: RateLimiter::direct(Quota::per_minute(nonzero!(5u32))),
        })
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    async fn fetch_body(&self, query: &[(String, String)]) -> Result<String, ProviderError> {
        self.limiter.until_ready().await;

        let response = self
            .client
            .get(&self.base_url)
            .query(query)
            .query(&[("apikey", self.api_key.expose_secret())])
            .send()
            .await
            .context(ReqwestSnafu)?;

        let status = response.status();
        if !status.is_success() {
            let error_msg = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown API error".to_string());
            return ApiSnafu {
                message: format!("{status}: {error_msg}"),
                status: Some(status.as_u16()),
            }
            .fail();
        }

        response.text().await.context(ReqwestSnafu)
    }
}

#[async_trait]
impl DataProvider for AlphaVantageProvider {
    async fn fetch_daily_rows(&self, symbol: &str) -> Result<Vec<RawRow>, ProviderError> {
        validate_symbol(symbol)?;

        let query = construct_params(symbol);
        let this = self;
        let query_ref = query.as_slice();
        let body = self
            .retry
            .run(move || this.fetch_body(query_ref))
            .await?;
        debug!(symbol, bytes = body.len(), "received Alpha Vantage payload");

        let rows = normalize_csv(check_body(&body)?, None)?;
        info!(symbol, rows = rows.len(), "fetched daily rows from Alpha Vantage");
        Ok(rows)
    }
}
