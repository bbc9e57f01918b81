use std::io::Write;

use market_data_ingestor::providers::{DataProvider, csv_file::CsvFileProvider};
use price_analytics::{
    config::load_config_str,
    errors::AnalysisError,
    record::parse_rows,
    report::{AnalysisOptions, analyze_rows},
    similarity::SimilarityMetric,
};
use tempfile::TempDir;

fn write_file(dir: &TempDir, name: &str, contents: &str) {
    let mut f = std::fs::File::create(dir.path().join(name)).expect("create fixture");
    f.write_all(contents.as_bytes()).expect("write fixture");
}

fn provider(dir: &TempDir) -> CsvFileProvider {
    CsvFileProvider::new(dir.path().join("{symbol}.csv").to_string_lossy().to_string())
}

// 2021 starts in December; 2022 and 2024 move identically over their first
// three days, 2023 goes the other way.
const HISTORY: &str = "\
date,open,high,low,close,volume
2021-12-30,9,10,8,9,50
2021-12-31,9,10,8,10,50
2022-01-03,10,11,9,10,100
2022-01-04,10,12,10,11,100
2022-01-05,11,13,11,12,100
2022-01-06,12,14,12,13,100
2023-01-03,20,21,19,20,100
2023-01-04,20,20,17,18,100
2023-01-05,18,18,15,16,100
2024-01-02,40,41,39,40,100
2024-01-03,40,45,40,44,oops
2024-01-03,40,45,40,44,100
2024-01-04,44,49,44,48,100
";

#[tokio::test]
async fn file_to_report() {
    let dir = TempDir::new().expect("tempdir");
    write_file(&dir, "ACME.csv", HISTORY);

    let rows = provider(&dir).fetch_daily_rows("ACME").await.expect("rows");
    assert_eq!(rows.len(), 13);

    let options = load_config_str("").expect("defaults").options();
    let report = analyze_rows("ACME", &rows, &options).expect("report");

    assert_eq!(report.rows_used, 12);
    assert_eq!(report.rows_rejected, 1);

    let changes = &report.yearly_changes;
    assert_eq!(changes.excluded_year, Some(2021));
    assert_eq!(changes.changes.keys().copied().collect::<Vec<_>>(), [2022, 2023, 2024]);
    for curve in changes.changes.values() {
        assert_eq!(curve[0], 0.0);
    }

    let sim = &report.similarity;
    assert_eq!(sim.target_year, 2024);
    assert_eq!(sim.target_sequence, vec![0.0, 10.0, 20.0]);
    assert_eq!(sim.matched_year, Some(2022));
    assert_eq!(sim.score, Some(0.0));
    // The whole matched year, not just the compared prefix.
    assert_eq!(sim.matched_sequence.as_ref().map(Vec::len), Some(4));

    // Volume profile levels all come from the rows that were kept.
    assert!(report.volume_profile.get(9.0).is_some());
    assert!(report.monthly_bias.get(12).is_some());
}

#[tokio::test]
async fn pearson_over_file() {
    let dir = TempDir::new().expect("tempdir");
    write_file(&dir, "ACME.csv", HISTORY);
    let rows = provider(&dir).fetch_daily_rows("ACME").await.expect("rows");

    let options = AnalysisOptions {
        metric: SimilarityMetric::Pearson,
        target_year: Some(2024),
        ..Default::default()
    };
    let report = analyze_rows("ACME", &rows, &options).expect("report");
    // 2022 rises like 2024 does; 2023 falls.
    assert_eq!(report.similarity.matched_year, Some(2022));
    assert!((report.similarity.score.expect("score") - 1.0).abs() < 1e-12);
    assert!(report.similarity.skipped.is_empty());
}

#[tokio::test]
async fn single_year_has_no_comparison() {
    let dir = TempDir::new().expect("tempdir");
    write_file(
        &dir,
        "ONE.csv",
        "2024-01-02,10,12,9,11,100\n2024-01-03,11,13,10,12,200\n2024-01-04,12,14,11,13,300\n",
    );
    let rows = provider(&dir).fetch_daily_rows("ONE").await.expect("rows");

    let options = AnalysisOptions {
        exclude_incomplete_start_year: false,
        ..Default::default()
    };
    let report = analyze_rows("ONE", &rows, &options).expect("report");
    assert_eq!(report.similarity.matched_year, None);
    assert_eq!(report.similarity.matched_sequence, None);
}

#[tokio::test]
async fn too_few_rows_is_refused() {
    let dir = TempDir::new().expect("tempdir");
    write_file(
        &dir,
        "TINY.csv",
        "date,open,high,low,close,volume\n2024-01-02,10,12,9,11,100\n2024-01-03,x,13,10,12,200\n",
    );
    let rows = provider(&dir).fetch_daily_rows("TINY").await.expect("rows");
    let err = analyze_rows("TINY", &rows, &AnalysisOptions::default()).unwrap_err();
    assert_eq!(err, AnalysisError::NotEnoughData { usable: 1, required: 3 });
}

#[tokio::test]
async fn fractional_stock_volume_is_rejected() {
    let dir = TempDir::new().expect("tempdir");
    write_file(
        &dir,
        "AAPL.csv",
        "timestamp,open,high,low,close,volume\n\
         2024-01-05,181.99,182.76,180.17,181.18,100.5\n\
         2024-01-04,182.15,183.09,180.88,181.91,71983570\n\
         2024-01-03,184.22,185.88,183.43,184.25,58414460\n\
         2024-01-02,187.15,188.44,183.89,185.64,82488674\n",
    );
    let rows = provider(&dir).fetch_daily_rows("AAPL").await.expect("rows");
    assert_eq!(rows[0].volume, "100.5");

    let parsed = parse_rows(&rows);
    assert_eq!(parsed.records.len(), 3);
    assert_eq!(
        parsed.rejected,
        vec![(
            0,
            AnalysisError::MalformedRow {
                field: "volume",
                value: "100.5".to_string(),
            }
        )]
    );

    let options = AnalysisOptions {
        exclude_incomplete_start_year: false,
        ..Default::default()
    };
    let report = analyze_rows("AAPL", &rows, &options).expect("report");
    assert_eq!(report.rows_used, 3);
    assert_eq!(report.rows_rejected, 1);
}

#[tokio::test]
async fn analysis_is_repeatable() {
    let dir = TempDir::new().expect("tempdir");
    write_file(&dir, "ACME.csv", HISTORY);
    let rows = provider(&dir).fetch_daily_rows("ACME").await.expect("rows");
    let options = AnalysisOptions::default();

    let mut first = analyze_rows("ACME", &rows, &options).expect("first");
    let mut second = analyze_rows("ACME", &rows, &options).expect("second");
    first.elapsed = Default::default();
    second.elapsed = Default::default();
    assert_eq!(first, second);
}
