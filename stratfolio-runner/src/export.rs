//! Report export: JSON and CSV artifact generation.
//!
//! - **JSON**: the full `PortfolioReport`, schema-versioned
//! - **CSV**: per-ticker allocations, and a dated history of portfolio value
//!   alongside each ticker's close
//!
//! Artifacts are one-shot outputs written to a timestamped directory.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use chrono::NaiveDate;

use crate::plan::{PortfolioReport, SCHEMA_VERSION};

// ─── JSON export ────────────────────────────────────────────────────

/// Serialize a `PortfolioReport` to pretty JSON.
pub fn export_json(report: &PortfolioReport) -> Result<String> {
    serde_json::to_string_pretty(report).context("failed to serialize PortfolioReport to JSON")
}

/// Deserialize a `PortfolioReport` from JSON, rejecting unknown schema versions.
pub fn import_json(json: &str) -> Result<PortfolioReport> {
    let report: PortfolioReport =
        serde_json::from_str(json).context("failed to deserialize PortfolioReport from JSON")?;
    if report.schema_version > SCHEMA_VERSION {
        bail!(
            "unsupported schema version {} (max supported: {})",
            report.schema_version,
            SCHEMA_VERSION
        );
    }
    Ok(report)
}

// ─── CSV export ─────────────────────────────────────────────────────

/// One row per allocated ticker, then one row per excluded ticker.
///
/// Columns: ticker, status, weight, allocated, shares, reference_price,
/// invested, score, mean_return, volatility, bias_factor, period_return, note
pub fn export_allocations_csv(report: &PortfolioReport) -> Result<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);

    wtr.write_record([
        "ticker",
        "status",
        "weight",
        "allocated",
        "shares",
        "reference_price",
        "invested",
        "score",
        "mean_return",
        "volatility",
        "bias_factor",
        "period_return",
        "note",
    ])?;

    let opt = |v: Option<f64>, digits: usize| {
        v.map(|x| format!("{x:.digits$}")).unwrap_or_default()
    };

    for (ticker, a) in &report.allocation.allocations {
        let s = report.scores.get(ticker);
        wtr.write_record(&[
            ticker.to_string(),
            "allocated".to_string(),
            format!("{:.6}", a.weight),
            format!("{:.2}", a.allocated.as_dollars()),
            a.shares.map(|n| n.to_string()).unwrap_or_default(),
            opt(a.reference_price, 4),
            format!("{:.2}", a.invested.as_dollars()),
            opt(s.map(|s| s.score), 6),
            opt(s.map(|s| s.mean_return), 6),
            opt(s.map(|s| s.volatility), 6),
            opt(s.map(|s| s.bias_factor), 4),
            opt(s.map(|s| s.period_return), 6),
            String::new(),
        ])?;
    }

    for e in &report.allocation.exclusions {
        let mut row = vec![String::new(); 13];
        row[0] = e.ticker.to_string();
        row[1] = "excluded".to_string();
        row[2] = "0".to_string();
        row[3] = "0.00".to_string();
        row[6] = "0.00".to_string();
        row[12] = e.reason.to_string();
        wtr.write_record(&row)?;
    }

    let data = wtr.into_inner().context("failed to flush CSV writer")?;
    String::from_utf8(data).context("CSV output is not valid UTF-8")
}

/// Dated history: portfolio value plus each ticker's close (empty where the
/// ticker has no bar that day).
pub fn export_history_csv(report: &PortfolioReport) -> Result<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);

    let tickers: Vec<_> = report.history.keys().collect();
    let mut header = vec!["date".to_string(), "portfolio_value".to_string()];
    header.extend(tickers.iter().map(|t| t.to_string()));
    wtr.write_record(&header)?;

    let dates: BTreeSet<NaiveDate> = report
        .history
        .values()
        .flatten()
        .map(|b| b.date)
        .chain(report.value_history.iter().map(|p| p.date))
        .collect();

    for date in dates {
        let mut row = vec![date.to_string()];
        row.push(
            report
                .value_history
                .iter()
                .find(|p| p.date == date)
                .map(|p| format!("{:.2}", p.value))
                .unwrap_or_default(),
        );
        for ticker in &tickers {
            row.push(
                report.history[*ticker]
                    .iter()
                    .find(|b| b.date == date)
                    .map(|b| format!("{:.4}", b.close))
                    .unwrap_or_default(),
            );
        }
        wtr.write_record(&row)?;
    }

    let data = wtr.into_inner().context("failed to flush CSV writer")?;
    String::from_utf8(data).context("CSV output is not valid UTF-8")
}

// ─── Artifact bundle ────────────────────────────────────────────────

/// Save the artifact set for one report.
///
/// Creates `allocation_{fingerprint prefix}_{timestamp}/` under `output_dir`
/// containing `report.json`, `allocations.csv` and `history.csv`.
///
/// Returns the path to the created directory.
pub fn save_artifacts(report: &PortfolioReport, output_dir: &Path) -> Result<PathBuf> {
    let prefix: String = report.fingerprint.chars().take(8).collect();
    let dirname = format!(
        "allocation_{}_{}",
        prefix,
        chrono::Local::now().format("%Y%m%d_%H%M%S")
    );
    let run_dir = output_dir.join(dirname);
    std::fs::create_dir_all(&run_dir)
        .with_context(|| format!("failed to create artifact dir: {}", run_dir.display()))?;

    let json = export_json(report)?;
    std::fs::write(run_dir.join("report.json"), &json)?;

    let allocations_csv = export_allocations_csv(report)?;
    std::fs::write(run_dir.join("allocations.csv"), &allocations_csv)?;

    let history_csv = export_history_csv(report)?;
    std::fs::write(run_dir.join("history.csv"), &history_csv)?;

    tracing::info!(dir = %run_dir.display(), "artifacts written");
    Ok(run_dir)
}
