//! CSV directory provider driven through the concurrent fetch and analyzer.

use std::path::Path;
use stratfolio_core::data::{fetch_all, CsvProvider, DataError, MarketDataProvider};
use stratfolio_core::domain::Ticker;
use stratfolio_core::{analyze, BiasBounds};

fn t(s: &str) -> Ticker {
    Ticker::parse(s).unwrap()
}

fn write_history(dir: &Path, symbol: &str, closes: &[f64]) {
    let mut text = String::from("date,open,high,low,close,volume\n");
    for (i, close) in closes.iter().enumerate() {
        text.push_str(&format!(
            "2024-02-{:02},{close},{},{},{close},{}\n",
            i + 5,
            close + 1.0,
            close - 1.0,
            100_000 + i * 1_000
        ));
    }
    std::fs::write(dir.join(format!("{symbol}.csv")), text).unwrap();
}

#[test]
fn csv_directory_feeds_analysis() {
    let dir = tempfile::tempdir().unwrap();
    write_history(dir.path(), "MSFT", &[400.0, 404.0, 402.0, 410.0, 415.0, 411.0]);
    write_history(dir.path(), "JNJ", &[155.0, 154.0, 153.5, 156.0, 157.0, 158.0]);
    std::fs::write(
        dir.path().join("fundamentals.csv"),
        "ticker,market_cap,pe_ratio,dividend_yield,fifty_two_week_high,fifty_two_week_low,average_volume\n\
         MSFT,3100000000000,36.1,0.007,430.8,309.4,21000000\n",
    )
    .unwrap();

    let provider = CsvProvider::new(dir.path());
    let tickers = [t("MSFT"), t("JNJ"), t("V")];
    let results = fetch_all(&provider, &tickers, 5, 2);

    let msft = results[&t("MSFT")].as_ref().unwrap();
    assert_eq!(msft.bars.len(), 5);
    assert_eq!(msft.bars[0].close, 404.0);
    assert!(msft.fundamentals.is_some());

    let jnj = results[&t("JNJ")].as_ref().unwrap();
    assert!(jnj.fundamentals.is_none());

    assert!(matches!(results[&t("V")], Err(DataError::NotFound { .. })));

    let score = analyze(
        &msft.ticker,
        &msft.bars,
        msft.fundamentals.as_ref(),
        BiasBounds::default(),
    )
    .unwrap();
    // market cap above the top of the range saturates the cap component
    assert!(score.bias_factor > 1.0);
    assert_eq!(score.last_close, 411.0);
}

#[test]
fn provider_reports_its_source() {
    let dir = tempfile::tempdir().unwrap();
    let provider = CsvProvider::new(dir.path());
    assert_eq!(provider.name(), "csv_import");
    assert_eq!(provider.source().label(), "csv_import");
}
