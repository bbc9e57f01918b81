//! Provider abstraction for daily OHLCV sources.
//!
//! This module defines the [`DataProvider`] trait, the single interface the
//! analytics layer uses to obtain raw daily rows, whatever the upstream is
//! (Alpha Vantage for stocks, an exchange CSV dump for crypto, a local file).
//!
//! Each concrete provider handles its vendor-specific transport and schema and
//! returns rows already normalized to the canonical
//! `[date, open, high, low, close, volume]` shape ([`RawRow`]).
//!
//! The trait is async and object safe, so callers can pick a provider at
//! runtime through [`build_provider`].
//!
//! # Example
//!
//! ```rust
//! use async_trait::async_trait;
//! use market_data_ingestor::models::raw_row::RawRow;
//! use market_data_ingestor::providers::{DataProvider, ProviderError};
//!
//! struct FixedProvider;
//!
//! #[async_trait]
//! impl DataProvider for FixedProvider {
//!     async fn fetch_daily_rows(&self, _symbol: &str) -> Result<Vec<RawRow>, ProviderError> {
//!         Ok(vec![RawRow::from(["2024-01-02", "10", "12", "9", "11", "100"])])
//!     }
//! }
//! ```

pub mod alpha_vantage;
pub mod crypto_csv;
pub mod csv_file;

use std::path::PathBuf;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use shared_utils::env::MissingEnvVarError;
use snafu::{Backtrace, Snafu};

use crate::{
    models::raw_row::RawRow,
    providers::{
        alpha_vantage::AlphaVantageProvider, crypto_csv::CryptoCsvProvider,
        csv_file::CsvFileProvider,
    },
    retry::RetryPolicy,
};

/// Trait for fetching the full daily history of one symbol.
#[async_trait]
pub trait DataProvider {
    /// Fetches every daily row the source has for `symbol`.
    ///
    /// # Returns
    ///
    /// * `Ok(Vec<RawRow>)` - rows in canonical field order. Order by date is
    ///   not guaranteed; consumers sort.
    /// * `Err(ProviderError)` - transport, vendor or schema failure.
    async fn fetch_daily_rows(&self, symbol: &str) -> Result<Vec<RawRow>, ProviderError>;
}

/// Errors that can occur during the creation of a provider instance
#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum ProviderInitError {
    /// missed environment variable.
    #[snafu(display("Missing environment variable: {source}"))]
    MissingEnvVar {
        source: MissingEnvVarError,
        backtrace: Backtrace,
    },

    /// failed to init reqwest client
    #[snafu(display("Failed to build HTTP client: {source}"))]
    ClientBuild {
        source: reqwest::Error,
        backtrace: Backtrace,
    },

    /// A setting the chosen provider needs was not supplied.
    #[snafu(display("Provider setting `{name}` is required"))]
    MissingSetting {
        name: String,
        backtrace: Backtrace,
    },
}

/// Errors that can occur within a `DataProvider` implementation.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum ProviderError {
    /// An error during an API request (e.g., network failure, timeout).
    #[snafu(display("API request failed: {source}"))]
    Reqwest {
        source: reqwest::Error,
        backtrace: Backtrace,
    },

    /// The provider's API returned an error (bad status or an error payload).
    #[snafu(display("API error: {message}"))]
    Api {
        message: String,
        /// HTTP status, when the error came from a non-success response.
        status: Option<u16>,
        backtrace: Backtrace,
    },

    /// The request parameters were invalid for this specific provider.
    #[snafu(display("Invalid parameters for provider: {message}"))]
    Validation {
        message: String,
        backtrace: Backtrace,
    },

    /// The payload did not have a recognizable daily OHLCV layout.
    #[snafu(display("Unrecognized CSV layout: {message}"))]
    Schema {
        message: String,
        backtrace: Backtrace,
    },

    /// The payload could not be read as CSV at all.
    #[snafu(display("Malformed CSV payload: {source}"))]
    Csv {
        source: csv::Error,
        backtrace: Backtrace,
    },

    /// A local source file could not be read.
    #[snafu(display("Failed to read {}: {source}", path.display()))]
    Io {
        path: PathBuf,
        source: std::io::Error,
        backtrace: Backtrace,
    },
}

impl ProviderError {
    /// Whether retrying the same request may succeed (timeouts, connection
    /// failures, throttling and server-side errors).
    pub fn is_retryable(&self) -> bool {
        match self {
            ProviderError::Reqwest { source, .. } => source.is_timeout() || source.is_connect(),
            ProviderError::Api {
                status: Some(status),
                ..
            } => *status == 429 || *status >= 500,
            _ => false,
        }
    }
}

/// Which upstream to use (serde snake_case).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProviderId {
    /// Alpha Vantage daily time series (stocks).
    AlphaVantage,
    /// Exchange daily CSV dumps (crypto).
    CryptoCsv,
    /// A CSV file on disk.
    CsvFile,
}

/// Provider-specific knobs. Unused fields are ignored by providers that don't need them.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ProviderSettings {
    /// Path template for [`ProviderId::CsvFile`]; `{symbol}` is substituted.
    pub path: Option<String>,
    /// Quote currency for [`ProviderId::CryptoCsv`] (defaults to `USDT`).
    pub quote: Option<String>,
    /// Overrides the provider's base URL (mirrors, tests).
    pub base_url: Option<String>,
    /// Retry behavior for HTTP providers.
    #[serde(default)]
    pub retry: RetryPolicy,
}

/// Build and return a boxed data provider corresponding to the supplied ProviderId.
pub fn build_provider(
    id: ProviderId,
    settings: &ProviderSettings,
) -> Result<Box<dyn DataProvider + Send + Sync>, ProviderInitError> {
    match id {
        ProviderId::AlphaVantage => {
            let mut p = AlphaVantageProvider::new()?.with_retry(settings.retry.clone());
            if let Some(url) = &settings.base_url {
                p = p.with_base_url(url.clone());
            }
            Ok(Box::new(p))
        }
        ProviderId::CryptoCsv => {
            let mut p = CryptoCsvProvider::new()?.with_retry(settings.retry.clone());
            if let Some(quote) = &settings.quote {
                p = p.with_quote(quote.clone());
            }
            if let Some(url) = &settings.base_url {
                p = p.with_base_url(url.clone());
            }
            Ok(Box::new(p))
        }
        ProviderId::CsvFile => {
            let path = settings
                .path
                .clone()
                .ok_or_else(|| MissingSettingSnafu { name: "path" }.build())?;
            Ok(Box::new(CsvFileProvider::new(path)))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FixedProvider;
    struct EmptyProvider;

    #[async_trait]
    impl DataProvider for FixedProvider {
        async fn fetch_daily_rows(&self, _symbol: &str) -> Result<Vec<RawRow>, ProviderError> {
            Ok(vec![RawRow::from(["2024-01-02", "10", "12", "9", "11", "100"])])
        }
    }

    #[async_trait]
    impl DataProvider for EmptyProvider {
        async fn fetch_daily_rows(&self, _symbol: &str) -> Result<Vec<RawRow>, ProviderError> {
            Ok(vec![])
        }
    }

    // Runtime selection only works through `Box<dyn DataProvider>`.
    fn get_provider(name: &str) -> Box<dyn DataProvider + Send + Sync> {
        if name == "fixed" {
            Box::new(FixedProvider)
        } else {
            Box::new(EmptyProvider)
        }
    }

    #[tokio::test]
    async fn test_dynamic_provider() {
        let provider = get_provider("fixed");
        let rows = provider.fetch_daily_rows("AAPL").await.unwrap();
        assert_eq!(rows.len(), 1);

        let provider = get_provider("other");
        assert!(provider.fetch_daily_rows("AAPL").await.unwrap().is_empty());
    }

    #[test]
    fn csv_file_provider_requires_path() {
        let err = build_provider(ProviderId::CsvFile, &ProviderSettings::default())
            .err()
            .expect("missing path must fail");
        assert!(err.to_string().contains("path"));
    }

    #[test]
    fn retryable_classification() {
        let throttled = ApiSnafu {
            message: "slow down",
            status: Some(429u16),
        }
        .build();
        assert!(throttled.is_retryable());

        let server = ApiSnafu {
            message: "bad gateway",
            status: Some(502u16),
        }
        .build();
        assert!(server.is_retryable());

        let denied = ApiSnafu {
            message: "invalid key",
            status: Some(401u16),
        }
        .build();
        assert!(!denied.is_retryable());

        let payload = ApiSnafu {
            message: "Invalid API call",
            status: None::<u16>,
        }
        .build();
        assert!(!payload.is_retryable());
    }

    #[test]
    fn provider_id_uses_snake_case() {
        let id: ProviderId = serde_json::from_str("\"alpha_vantage\"").unwrap();
        assert_eq!(id, ProviderId::AlphaVantage);
        assert_eq!(
            serde_json::to_string(&ProviderId::CryptoCsv).unwrap(),
            "\"crypto_csv\""
        );
    }
}
