//! Daily candles from exchange CSV dumps.
//!
//! Files are published per pair as `<base>/Binance_<BASE><QUOTE>_d.csv` style
//! downloads (CryptoDataDownload layout). The exchange schema names and orders
//! its columns differently from the canonical row, and reports volume in both
//! the base and the quote currency; [`normalize_csv`] picks the base-asset
//! volume and reorders the fields.

use async_trait::async_trait;
use reqwest::Client;
use snafu::ResultExt;
use tracing::info;

use crate::{
    models::raw_row::RawRow,
    providers::{
        ApiSnafu, ClientBuildSnafu, DataProvider, ProviderError, ProviderInitError, ReqwestSnafu,
        ValidationSnafu,
    },
    retry::RetryPolicy,
    schema::normalize_csv,
};

const BASE_URL: &str = "https://www.cryptodatadownload.com/cdd";
const DEFAULT_QUOTE: &str = "USDT";

pub struct CryptoCsvProvider {
    client: Client,
    base_url: String,
    exchange: String,
    quote: String,
    retry: RetryPolicy,
}

impl CryptoCsvProvider {
    pub fn new() -> Result<Self, ProviderInitError> {
        let client = Client::builder()
            .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
            .build()
            .context(ClientBuildSnafu)?;

        Ok(Self {
            client,
            base_url: BASE_URL.to_string(),
            exchange: "Binance".to_string(),
            quote: DEFAULT_QUOTE.to_string(),
            retry: RetryPolicy::default(),
        })
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn with_quote(mut self, quote: impl Into<String>) -> Self {
        self.quote = quote.into().trim().to_uppercase();
        self
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Download URL for the daily file of `symbol` against the configured quote.
    pub fn url_for(&self, symbol: &str) -> String {
        format!(
            "{}/{}_{}{}_d.csv",
            self.base_url.trim_end_matches('/'),
            self.exchange,
            symbol.trim().to_uppercase(),
            self.quote
        )
    }

    async fn fetch_body(&self, url: &str) -> Result<String, ProviderError> {
        let response = self.client.get(url).send().await.context(ReqwestSnafu)?;
        let status = response.status();
        if !status.is_success() {
            return ApiSnafu {
                message: format!("{status} for {url}"),
                status: Some(status.as_u16()),
            }
            .fail();
        }
        response.text().await.context(ReqwestSnafu)
    }
}

#[async_trait]
impl DataProvider for CryptoCsvProvider {
    async fn fetch_daily_rows(&self, symbol: &str) -> Result<Vec<RawRow>, ProviderError> {
        let base = symbol.trim().to_uppercase();
        if base.is_empty() || !base.chars().all(|c| c.is_ascii_alphanumeric()) {
            return ValidationSnafu {
                message: format!("invalid crypto symbol: {symbol:?}"),
            }
            .fail();
        }

        let url = self.url_for(&base);
        let this = self;
        let url_ref = url.as_str();
        let body = self.retry.run(move || this.fetch_body(url_ref)).await?;

        let rows = normalize_csv(&body, Some(&base))?;
        info!(symbol = %base, quote = %self.quote, rows = rows.len(), "fetched exchange daily rows");
        Ok(rows)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn url_uses_pair_and_daily_suffix() {
        let p = CryptoCsvProvider::new().unwrap().with_quote("usd");
        assert_eq!(
            p.url_for(" btc"),
            "https://www.cryptodatadownload.com/cdd/Binance_BTCUSD_d.csv"
        );

        let p = p.with_base_url("http://mirror.local/");
        assert_eq!(p.url_for("eth"), "http://mirror.local/Binance_ETHUSD_d.csv");
    }

    #[tokio::test]
    async fn rejects_non_alphanumeric_symbols() {
        let p = CryptoCsvProvider::new().unwrap();
        let err = p.fetch_daily_rows("BTC/../x").await.unwrap_err();
        assert!(matches!(err, ProviderError::Validation { .. }));
    }
}
