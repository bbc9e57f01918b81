//! Analysis configuration: TOML parsing, validation, and loading.
//!
//! Every table is optional; an empty file yields the defaults:
//!
//! ```toml
//! [weights]
//! open = 0.3
//! high = 0.2
//! low = 0.2
//! close = 0.3
//! # mid = 0.1
//!
//! [similarity]
//! metric = "euclidean"   # or "pearson"
//! # target_year = 2024   # defaults to the most recent year in the data
//!
//! [daily_changes]
//! exclude_incomplete_start_year = true
//!
//! [provider]
//! kind = "csv_file"      # alpha_vantage | crypto_csv | csv_file
//! path = "data/{symbol}.csv"
//! ```
//!
//! Credentials never live here; the Alpha Vantage key is read from the
//! environment.
//!
//! Entrypoints: [`load_config_str`] and [`load_config_path`].

use anyhow::Context;
use market_data_ingestor::{
    providers::{ProviderId, ProviderSettings},
    retry::RetryPolicy,
};
use serde::{Deserialize, Serialize};
use toml::from_str;

use crate::{report::AnalysisOptions, similarity::SimilarityMetric, volume_profile::VolumeWeights};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AnalysisConfig {
    pub weights: VolumeWeights,
    pub similarity: SimilarityCfg,
    pub daily_changes: DailyChangesCfg,
    /// Where rows come from. The CLI can override or supply this.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub provider: Option<ProviderCfg>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SimilarityCfg {
    pub metric: SimilarityMetric,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target_year: Option<i32>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DailyChangesCfg {
    /// Drop the first year of the history (it usually starts mid-year).
    pub exclude_incomplete_start_year: bool,
}

impl Default for DailyChangesCfg {
    fn default() -> Self {
        Self {
            exclude_incomplete_start_year: true,
        }
    }
}

/// Provider selection plus the settings the chosen provider reads.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ProviderCfg {
    pub kind: ProviderId,
    /// Path template for `csv_file`; `{symbol}` is substituted.
    pub path: Option<String>,
    /// Quote currency for `crypto_csv`.
    pub quote: Option<String>,
    pub base_url: Option<String>,
    #[serde(default)]
    pub retry: RetryPolicy,
}

impl ProviderCfg {
    pub fn new(kind: ProviderId) -> Self {
        Self {
            kind,
            path: None,
            quote: None,
            base_url: None,
            retry: RetryPolicy::default(),
        }
    }

    pub fn settings(&self) -> ProviderSettings {
        ProviderSettings {
            path: self.path.clone(),
            quote: self.quote.clone(),
            base_url: self.base_url.clone(),
            retry: self.retry.clone(),
        }
    }
}

impl AnalysisConfig {
    /// Analysis knobs for one run.
    pub fn options(&self) -> AnalysisOptions {
        AnalysisOptions {
            weights: self.weights,
            metric: self.similarity.metric,
            target_year: self.similarity.target_year,
            exclude_incomplete_start_year: self.daily_changes.exclude_incomplete_start_year,
        }
    }

    /// Checks that serde alone can't express.
    pub fn validate(&self) -> anyhow::Result<()> {
        self.weights.validate().context("invalid [weights]")?;
        if let Some(provider) = &self.provider {
            if provider.kind == ProviderId::CsvFile && provider.path.is_none() {
                anyhow::bail!("[provider] kind = \"csv_file\" requires `path`");
            }
        }
        Ok(())
    }
}

/// Parse and validate a configuration from TOML text.
pub fn load_config_str(toml_str: &str) -> anyhow::Result<AnalysisConfig> {
    let config: AnalysisConfig = from_str(toml_str).context("failed to parse config TOML")?;
    config.validate()?;
    Ok(config)
}

/// Read a configuration file from disk, then parse and validate it.
///
/// See [`load_config_str`].
pub fn load_config_path(path: impl AsRef<std::path::Path>) -> anyhow::Result<AnalysisConfig> {
    let text = std::fs::read_to_string(path.as_ref())
        .with_context(|| format!("read config file {}", path.as_ref().display()))?;
    load_config_str(&text).with_context(|| format!("load config {}", path.as_ref().display()))
}
