//! Daily rows from a CSV file on disk, for offline analysis and fixtures.

use std::path::PathBuf;

use async_trait::async_trait;
use snafu::ResultExt;
use tracing::info;

use crate::{
    models::raw_row::RawRow,
    providers::{DataProvider, IoSnafu, ProviderError},
    schema::normalize_csv,
};

/// Reads `path_template` with `{symbol}` replaced by the requested symbol.
///
/// Any layout [`normalize_csv`] understands is accepted.
pub struct CsvFileProvider {
    path_template: String,
}

impl CsvFileProvider {
    pub fn new(path_template: impl Into<String>) -> Self {
        Self {
            path_template: path_template.into(),
        }
    }

    pub fn path_for(&self, symbol: &str) -> PathBuf {
        PathBuf::from(self.path_template.replace("{symbol}", symbol.trim()))
    }
}

#[async_trait]
impl DataProvider for CsvFileProvider {
    async fn fetch_daily_rows(&self, symbol: &str) -> Result<Vec<RawRow>, ProviderError> {
        let path = self.path_for(symbol);
        let text = tokio::fs::read_to_string(&path)
            .await
            .context(IoSnafu { path: path.clone() })?;

        let rows = normalize_csv(&text, Some(symbol))?;
        info!(path = %path.display(), rows = rows.len(), "loaded daily rows from file");
        Ok(rows)
    }
}
