use std::io::Write;

use market_data_ingestor::providers::{
    DataProvider, ProviderError, ProviderId, ProviderSettings, build_provider,
    csv_file::CsvFileProvider,
};
use tempfile::TempDir;

fn write_file(dir: &TempDir, name: &str, contents: &str) {
    let mut f = std::fs::File::create(dir.path().join(name)).expect("create fixture");
    f.write_all(contents.as_bytes()).expect("write fixture");
}

#[tokio::test]
async fn reads_exchange_dump_through_registry() {
    let dir = TempDir::new().expect("tempdir");
    write_file(
        &dir,
        "ETH.csv",
        "https://www.CryptoDataDownload.com\n\
         Unix,Date,Symbol,Open,High,Low,Close,Volume ETH,Volume USDT,tradecount\n\
         1704240000000,2024-01-03 00:00:00,ETHUSDT,2370.1,2386.0,2100.0,2209.7,723113.2,1624318521.4,1309451\n\
         1704153600000,2024-01-02 00:00:00,ETHUSDT,2352.0,2431.0,2341.2,2355.3,386716.9,921213843.8,837221\n",
    );

    let template = dir.path().join("{symbol}.csv").to_string_lossy().to_string();
    let settings = ProviderSettings {
        path: Some(template),
        ..Default::default()
    };
    let provider = build_provider(ProviderId::CsvFile, &settings).expect("provider");

    let rows = provider.fetch_daily_rows("ETH").await.expect("rows");
    assert_eq!(rows.len(), 2);
    // Input order is preserved; sorting is the consumer's job.
    assert_eq!(rows[0].date, "2024-01-03");
    assert_eq!(
        rows[1].fields(),
        ["2024-01-02", "2352.0", "2431.0", "2341.2", "2355.3", "386716"]
    );
}

#[tokio::test]
async fn missing_file_is_io_error() {
    let dir = TempDir::new().expect("tempdir");
    let provider = CsvFileProvider::new(dir.path().join("{symbol}.csv").to_string_lossy());

    let err = provider.fetch_daily_rows("NOPE").await.unwrap_err();
    assert!(matches!(err, ProviderError::Io { .. }));
    assert!(err.to_string().contains("NOPE.csv"));
}

#[tokio::test]
async fn canonical_file_round_trips() {
    let dir = TempDir::new().expect("tempdir");
    write_file(
        &dir,
        "SPY.csv",
        "date,open,high,low,close,volume\n2023-01-02,10,12,9,11,100\n2023-01-03,11,13,10,12,200\n",
    );
    let provider = CsvFileProvider::new(dir.path().join("SPY.csv").to_string_lossy());

    let rows = provider.fetch_daily_rows("SPY").await.expect("rows");
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0].fields(), ["2023-01-02", "10", "12", "9", "11", "100"]);
}
