use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use market_data_ingestor::providers::{ProviderId, build_provider};
use price_analytics::{
    config::{AnalysisConfig, ProviderCfg, load_config_path},
    errors::AnalysisError,
    report::analyze_rows,
    similarity::SimilarityMetric,
};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(version, about = "Daily OHLCV price analytics")]
struct Cli {
    #[command(subcommand)]
    cmd: Cmd,
}

#[derive(Subcommand)]
enum Cmd {
    /// Fetch a symbol's daily history and print the analysis
    Analyze(AnalyzeCmd),
}

#[derive(Clone, Copy, ValueEnum)]
enum Source {
    /// Alpha Vantage daily series (needs ALPHAVANTAGE_API_KEY)
    Stock,
    /// Exchange daily CSV dump
    Crypto,
    /// Local CSV file, see --file
    File,
}

impl From<Source> for ProviderId {
    fn from(source: Source) -> Self {
        match source {
            Source::Stock => ProviderId::AlphaVantage,
            Source::Crypto => ProviderId::CryptoCsv,
            Source::File => ProviderId::CsvFile,
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
enum Format {
    Text,
    Json,
}

#[derive(Args)]
struct AnalyzeCmd {
    /// Ticker or coin symbol (e.g. "AAPL", "BTC")
    #[arg(long)]
    symbol: String,

    /// Where to get rows from; overrides [provider] in the config
    #[arg(long, value_enum)]
    source: Option<Source>,

    /// CSV path for --source file; `{symbol}` is substituted
    #[arg(long, value_name = "PATH")]
    file: Option<String>,

    /// TOML config file
    #[arg(long, value_name = "FILE")]
    config: Option<String>,

    /// Similarity metric: euclidean or pearson
    #[arg(long)]
    metric: Option<String>,

    /// Year to match against history (default: latest year in the data)
    #[arg(long)]
    target_year: Option<i32>,

    /// Keep the first (usually partial) year in the daily changes
    #[arg(long)]
    keep_start_year: bool,

    #[arg(long, value_enum, default_value = "text")]
    format: Format,
}

/// Merges command-line overrides into the loaded config.
fn resolve_config(cmd: &AnalyzeCmd) -> Result<AnalysisConfig> {
    let mut config = match &cmd.config {
        Some(path) => load_config_path(path)?,
        None => AnalysisConfig::default(),
    };

    if let Some(metric) = &cmd.metric {
        config.similarity.metric = metric.parse::<SimilarityMetric>()?;
    }
    if cmd.target_year.is_some() {
        config.similarity.target_year = cmd.target_year;
    }
    if cmd.keep_start_year {
        config.daily_changes.exclude_incomplete_start_year = false;
    }

    if let Some(source) = cmd.source {
        let kind = ProviderId::from(source);
        let mut provider = match config.provider.take() {
            Some(existing) if existing.kind == kind => existing,
            _ => ProviderCfg::new(kind),
        };
        if cmd.file.is_some() {
            provider.path = cmd.file.clone();
        }
        config.provider = Some(provider);
    } else if let Some(file) = &cmd.file {
        let mut provider = ProviderCfg::new(ProviderId::CsvFile);
        provider.path = Some(file.clone());
        config.provider = Some(provider);
    }

    config.validate()?;
    Ok(config)
}

async fn analyze(cmd: AnalyzeCmd) -> Result<()> {
    let config = resolve_config(&cmd)?;
    let provider_cfg = config
        .provider
        .clone()
        .unwrap_or_else(|| ProviderCfg::new(ProviderId::AlphaVantage));

    let provider = build_provider(provider_cfg.kind, &provider_cfg.settings())
        .with_context(|| format!("failed to set up {:?} provider", provider_cfg.kind))?;

    info!(symbol = %cmd.symbol, provider = ?provider_cfg.kind, "fetching daily rows");
    let rows = provider
        .fetch_daily_rows(&cmd.symbol)
        .await
        .with_context(|| format!("failed to fetch rows for {}", cmd.symbol))?;

    let report = match analyze_rows(&cmd.symbol, &rows, &config.options()) {
        Ok(report) => report,
        Err(err @ AnalysisError::NotEnoughData { .. }) => {
            warn!(symbol = %cmd.symbol, "{err}; nothing to analyze");
            return Ok(());
        }
        Err(err) => return Err(err).context("analysis failed"),
    };

    match cmd.format {
        Format::Text => print!("{report}"),
        Format::Json => println!("{}", serde_json::to_string_pretty(&report)?),
    }
    eprintln!(
        "Time to process data: {:.2} seconds",
        report.elapsed.as_secs_f64()
    );
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match cli.cmd {
        Cmd::Analyze(cmd) => analyze(cmd).await,
    }
}
