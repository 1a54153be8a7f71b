//! Plain-text rendering of reports and the strategy catalog.

use std::fmt::Write as _;

use stratfolio_core::StrategyCatalog;

use crate::plan::PortfolioReport;

/// Strategy names and their tickers, one per line.
pub fn render_catalog(catalog: &StrategyCatalog) -> String {
    let mut out = String::new();
    let width = catalog.names().map(str::len).max().unwrap_or(0);
    for name in catalog.names() {
        let tickers: Vec<&str> = catalog
            .tickers(name)
            .unwrap_or_default()
            .iter()
            .map(|t| t.as_str())
            .collect();
        let _ = writeln!(out, "{name:<width$}  {}", tickers.join(", "));
    }
    out
}

/// Allocation table, exclusions, cash.
pub fn render_summary(report: &PortfolioReport) -> String {
    let mut out = String::with_capacity(2048);
    let alloc = &report.allocation;

    let _ = writeln!(out, "=== Portfolio Allocation ===");
    let _ = writeln!(out, "Capital:        {}", report.capital);
    let _ = writeln!(out, "Strategies:     {}", report.strategies.join(", "));
    let _ = writeln!(out, "Data:           {}", report.source.label());
    if report.is_synthetic() {
        let _ = writeln!(out, "                ** SYNTHETIC DATA, NOT MARKET PRICES **");
    }
    let _ = writeln!(out, "Fingerprint:    {}", &report.fingerprint);
    let _ = writeln!(out);

    let _ = writeln!(
        out,
        "{:<8} {:>8} {:>14} {:>8} {:>11} {:>14} {:>9} {:>8}",
        "Ticker", "Weight", "Allocated", "Shares", "Price", "Invested", "Score", "ROI"
    );
    let _ = writeln!(out, "{}", "-".repeat(87));
    for (ticker, a) in &alloc.allocations {
        let score = report.scores.get(ticker);
        let _ = writeln!(
            out,
            "{:<8} {:>7.2}% {:>14} {:>8} {:>11} {:>14} {:>9} {:>8}",
            ticker.as_str(),
            a.weight * 100.0,
            a.allocated.to_string(),
            a.shares.map(|n| n.to_string()).unwrap_or_else(|| "-".into()),
            a.reference_price
                .map(|p| format!("{p:.2}"))
                .unwrap_or_else(|| "-".into()),
            a.invested.to_string(),
            score
                .map(|s| format!("{:.4}", s.score))
                .unwrap_or_else(|| "-".into()),
            score
                .map(|s| format!("{:.2}%", s.period_return * 100.0))
                .unwrap_or_else(|| "-".into()),
        );
    }
    let _ = writeln!(out, "{}", "-".repeat(87));
    let _ = writeln!(
        out,
        "{:<8} {:>7.2}% {:>14} {:>8} {:>11} {:>14}",
        "Total",
        alloc.weight_sum() * 100.0,
        alloc.total_allocated().to_string(),
        "",
        "",
        alloc.total_invested().to_string(),
    );
    let _ = writeln!(out);
    let _ = writeln!(out, "Uninvested cash: {}", alloc.uninvested_cash);
    let _ = writeln!(out, "  of which rounding: {}", alloc.rounding_remainder);

    if !alloc.exclusions.is_empty() {
        let _ = writeln!(out);
        let _ = writeln!(out, "--- Excluded ---");
        for e in &alloc.exclusions {
            let _ = writeln!(out, "  {}: {}", e.ticker, e.reason);
        }
    }
    out
}

/// Per-ticker fundamentals and the most recent `last_n` bars.
pub fn render_details(report: &PortfolioReport, last_n: usize) -> String {
    let mut out = String::with_capacity(4096);

    let _ = writeln!(out, "=== Fundamentals ===");
    let _ = writeln!(
        out,
        "{:<8} {:>10} {:>8} {:>8} {:>10} {:>10} {:>10}",
        "Ticker", "Mkt Cap", "P/E", "Yield", "52w High", "52w Low", "Avg Vol"
    );
    for ticker in &report.tickers {
        let Some(f) = report.fundamentals.get(ticker) else {
            let _ = writeln!(out, "{:<8} (unavailable)", ticker.as_str());
            continue;
        };
        let _ = writeln!(
            out,
            "{:<8} {:>10} {:>8} {:>8} {:>10} {:>10} {:>10}",
            ticker.as_str(),
            f.market_cap.map(human_number).unwrap_or_else(|| "-".into()),
            f.pe_ratio
                .map(|v| format!("{v:.2}"))
                .unwrap_or_else(|| "-".into()),
            f.dividend_yield
                .map(|v| format!("{:.2}%", v * 100.0))
                .unwrap_or_else(|| "-".into()),
            f.fifty_two_week_high
                .map(|v| format!("{v:.2}"))
                .unwrap_or_else(|| "-".into()),
            f.fifty_two_week_low
                .map(|v| format!("{v:.2}"))
                .unwrap_or_else(|| "-".into()),
            f.average_volume
                .map(|v| human_number(v as f64))
                .unwrap_or_else(|| "-".into()),
        );
    }

    for ticker in &report.tickers {
        let Some(bars) = report.history.get(ticker) else {
            continue;
        };
        let _ = writeln!(out);
        let _ = writeln!(out, "--- {ticker}: last {} day(s) ---", last_n.min(bars.len()));
        let _ = writeln!(
            out,
            "{:<10} {:>10} {:>10} {:>10} {:>10} {:>12}",
            "Date", "Open", "High", "Low", "Close", "Volume"
        );
        let skip = bars.len().saturating_sub(last_n);
        for b in &bars[skip..] {
            let _ = writeln!(
                out,
                "{:<10} {:>10.2} {:>10.2} {:>10.2} {:>10.2} {:>12}",
                b.date.to_string(),
                b.open,
                b.high,
                b.low,
                b.close,
                b.volume
            );
        }
    }

    if !report.value_history.is_empty() {
        let _ = writeln!(out);
        let _ = writeln!(out, "=== Portfolio Value ===");
        for p in &report.value_history {
            let _ = writeln!(out, "{}  {:>14.2}", p.date, p.value);
        }
    }
    out
}

/// 2_900_000_000_000 → "2.90T".
pub fn human_number(v: f64) -> String {
    let abs = v.abs();
    let (scaled, suffix) = if abs >= 1e12 {
        (v / 1e12, "T")
    } else if abs >= 1e9 {
        (v / 1e9, "B")
    } else if abs >= 1e6 {
        (v / 1e6, "M")
    } else if abs >= 1e3 {
        (v / 1e3, "K")
    } else {
        return format!("{v:.0}");
    };
    format!("{scaled:.2}{suffix}")
}
