//! Reporting and export: JSON, CSV, and Markdown artifact generation.
//!
//! Provides three export formats for comparison results:
//! - **JSON**: full round-trip serialization with schema versioning
//! - **CSV**: per-bar ledgers and trade logs for external analysis tools
//! - **Markdown**: human-readable side-by-side report
//!
//! All persisted artifacts include a `schema_version` field. Unknown versions
//! are rejected on load.

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use rust_decimal::Decimal;
use swinglab_core::{BacktestRun, Ledger, LedgerRow, Variant};

use crate::runner::{ComparisonResult, SCHEMA_VERSION};

// ─── JSON export ────────────────────────────────────────────────────

/// Serialize a `ComparisonResult` to pretty JSON.
pub fn export_json(result: &ComparisonResult) -> Result<String> {
    serde_json::to_string_pretty(result).context("failed to serialize ComparisonResult to JSON")
}

/// Deserialize a `ComparisonResult` from JSON, rejecting unknown schema versions.
pub fn import_json(json: &str) -> Result<ComparisonResult> {
    let result: ComparisonResult =
        serde_json::from_str(json).context("failed to deserialize ComparisonResult from JSON")?;
    if result.schema_version > SCHEMA_VERSION {
        bail!(
            "unsupported schema version {} (max supported: {})",
            result.schema_version,
            SCHEMA_VERSION
        );
    }
    Ok(result)
}

// ─── CSV export ─────────────────────────────────────────────────────

const LEDGER_COLUMNS: [&str; 14] = [
    "date",
    "close",
    "reference_price",
    "action",
    "shares",
    "cash",
    "total_asset",
    "premium_income_cumulative",
    "shares_traded",
    "is_exercised",
    "option_type",
    "option_event",
    "strike",
    "premium_per_share",
];

fn ledger_record(row: &LedgerRow) -> Vec<String> {
    vec![
        row.date.to_string(),
        row.close.to_string(),
        row.reference_price.to_string(),
        row.action.label().to_string(),
        row.shares.to_string(),
        row.cash.to_string(),
        row.total_asset.to_string(),
        row.premium_income_cumulative.to_string(),
        row.shares_traded.to_string(),
        row.is_exercised.to_string(),
        row.option_type.label().to_string(),
        row.option_event.label().to_string(),
        opt_decimal(row.strike),
        opt_decimal(row.premium_per_share),
    ]
}

fn opt_decimal(value: Option<Decimal>) -> String {
    value.map(|v| v.to_string()).unwrap_or_default()
}

fn write_rows<'a>(rows: impl Iterator<Item = &'a LedgerRow>) -> Result<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);
    wtr.write_record(LEDGER_COLUMNS)?;
    for row in rows {
        wtr.write_record(ledger_record(row))?;
    }
    let data = wtr.into_inner().context("failed to flush CSV writer")?;
    String::from_utf8(data).context("CSV output is not valid UTF-8")
}

/// Export every ledger row, one per bar.
pub fn export_ledger_csv(ledger: &Ledger) -> Result<String> {
    write_rows(ledger.rows().iter())
}

/// Export only rows with a trade or an exercise.
pub fn export_trade_log_csv(ledger: &Ledger) -> Result<String> {
    write_rows(ledger.trade_log())
}

// ─── Artifact bundle ────────────────────────────────────────────────

/// Save the full artifact set for one comparison.
///
/// Creates a directory named `{symbol}_{timestamp}/` under `output_dir`
/// containing:
/// - `manifest.json`: the full `ComparisonResult`
/// - `swing_ledger.csv`, `option_ledger.csv`: bar-by-bar ledgers
/// - `swing_trades.csv`, `option_trades.csv`: trade logs
/// - `report.md`: the Markdown report
///
/// Returns the path to the created directory.
pub fn save_artifacts(result: &ComparisonResult, output_dir: &Path) -> Result<PathBuf> {
    let symbol = result
        .provenance
        .as_ref()
        .map(|p| p.symbol.as_str())
        .unwrap_or("series");
    let dirname = format!("{}_{}", symbol, chrono::Local::now().format("%Y%m%d_%H%M%S"));
    let run_dir = output_dir.join(dirname);
    std::fs::create_dir_all(&run_dir)
        .with_context(|| format!("failed to create artifact dir: {}", run_dir.display()))?;

    write_file(&run_dir, "manifest.json", &export_json(result)?)?;
    write_file(&run_dir, "swing_ledger.csv", &export_ledger_csv(&result.swing.ledger)?)?;
    write_file(
        &run_dir,
        "option_ledger.csv",
        &export_ledger_csv(&result.covered_option.ledger)?,
    )?;
    write_file(&run_dir, "swing_trades.csv", &export_trade_log_csv(&result.swing.ledger)?)?;
    write_file(
        &run_dir,
        "option_trades.csv",
        &export_trade_log_csv(&result.covered_option.ledger)?,
    )?;
    write_file(&run_dir, "report.md", &generate_report(result))?;

    Ok(run_dir)
}

fn write_file(dir: &Path, name: &str, contents: &str) -> Result<()> {
    let path = dir.join(name);
    std::fs::write(&path, contents).with_context(|| format!("failed to write {}", path.display()))
}

/// Load a `ComparisonResult` from an artifact directory's manifest.json.
///
/// Rejects unknown schema versions.
pub fn load_artifacts(dir: &Path) -> Result<ComparisonResult> {
    let manifest_path = dir.join("manifest.json");
    let json = std::fs::read_to_string(&manifest_path)
        .with_context(|| format!("failed to read {}", manifest_path.display()))?;
    import_json(&json)
}

// ─── Markdown reports ───────────────────────────────────────────────

/// Generate the Markdown report for a comparison.
pub fn generate_report(result: &ComparisonResult) -> String {
    let mut md = String::with_capacity(4096);
    let p = &result.params;

    md.push_str("# Swing vs Covered Option Backtest\n\n");

    // Metadata
    md.push_str("## Metadata\n\n");
    md.push_str("| Field | Value |\n");
    md.push_str("| --- | --- |\n");
    if let Some(prov) = &result.provenance {
        md.push_str(&format!("| Symbol | {} |\n", prov.symbol));
        md.push_str(&format!(
            "| Period | {} to {} |\n",
            prov.first_date, prov.last_date
        ));
        md.push_str(&format!("| Bars | {} |\n", prov.bar_count));
        md.push_str(&format!("| Data Source | {} |\n", prov.source.label()));
        md.push_str(&format!("| Dataset Hash | {} |\n", prov.dataset_hash));
        if prov.has_synthetic {
            md.push_str("| Data | **SYNTHETIC** |\n");
        }
    }
    if let Some(run_id) = &result.run_id {
        md.push_str(&format!("| Run ID | {run_id} |\n"));
    }
    md.push_str(&format!("| Initial Shares | {} |\n", p.initial_shares));
    md.push_str(&format!("| Trade Shares | {} |\n", p.trade_shares));
    md.push_str(&format!(
        "| Threshold | {:.2}% |\n",
        p.threshold * Decimal::ONE_HUNDRED
    ));
    md.push_str(&format!(
        "| Premium Rate | {:.2}% |\n",
        p.premium_rate * Decimal::ONE_HUNDRED
    ));
    md.push_str(&format!("| Initial Cash | ${:.2} |\n", p.initial_cash));
    md.push('\n');

    // Headline comparison
    md.push_str("## Returns\n\n");
    md.push_str("| Strategy | Final Value | Total Return | Excess vs Buy & Hold |\n");
    md.push_str("| --- | --- | --- | --- |\n");
    md.push_str(&format!(
        "| Swing | ${:.2} | {:.2}% | {:+.2} pp |\n",
        result.swing.summary.final_value,
        result.swing.summary.total_return_pct,
        result.swing_excess_pct
    ));
    md.push_str(&format!(
        "| Covered Option | ${:.2} | {:.2}% | {:+.2} pp |\n",
        result.covered_option.summary.final_value,
        result.covered_option.summary.total_return_pct,
        result.option_excess_pct
    ));
    md.push_str(&format!(
        "| Buy & Hold | ${:.2} | {:.2}% | n/a |\n",
        result.baseline.final_value, result.baseline.return_pct
    ));
    md.push('\n');
    md.push_str(&format!(
        "{} outperformed by {:.2} percentage points.\n\n",
        variant_title(result.better_variant()),
        result.return_gap_pct()
    ));

    md.push_str(&run_section(&result.swing));
    md.push_str(&run_section(&result.covered_option));

    md
}

fn variant_title(variant: Variant) -> &'static str {
    match variant {
        Variant::Swing => "Swing",
        Variant::CoveredOption => "Covered Option",
    }
}

fn run_section(run: &BacktestRun) -> String {
    let s = &run.summary;
    let mut md = String::with_capacity(1024);
    md.push_str(&format!("## {}\n\n", variant_title(run.variant)));
    md.push_str("| Metric | Value |\n");
    md.push_str("| --- | --- |\n");
    md.push_str(&format!("| Final Shares | {} |\n", s.final_shares));
    md.push_str(&format!("| Final Cash | ${:.2} |\n", s.final_cash));

    match run.variant {
        Variant::Swing => {
            md.push_str(&format!(
                "| Buy Signals | {} ({} filled) |\n",
                s.buy_signals, s.executed_buys
            ));
            md.push_str(&format!(
                "| Sell Signals | {} ({} filled) |\n",
                s.sell_signals, s.executed_sells
            ));
        }
        Variant::CoveredOption => {
            md.push_str(&format!("| Puts Written | {} |\n", s.puts_written));
            md.push_str(&format!("| Calls Written | {} |\n", s.calls_written));
            md.push_str(&format!(
                "| Exercised | {} ({:.1}%) |\n",
                s.exercise_count,
                s.exercise_rate_pct()
            ));
            md.push_str(&format!("| Expired | {} |\n", s.expired_count));
            md.push_str(&format!(
                "| Premium Income | ${:.2} |\n",
                s.cumulative_premium_income
            ));
        }
    }
    md.push('\n');

    let trades: Vec<&LedgerRow> = run.ledger.trade_log().collect();
    if !trades.is_empty() {
        md.push_str("### Trade Log\n\n");
        md.push_str("| Date | Close | Action | Event | Shares Traded | Shares | Cash |\n");
        md.push_str("| --- | --- | --- | --- | --- | --- | --- |\n");
        for row in trades {
            md.push_str(&format!(
                "| {} | {} | {} | {} | {} | {} | {:.2} |\n",
                row.date,
                row.close,
                row.action.label(),
                row.option_event.label(),
                row.shares_traded,
                row.shares,
                row.cash
            ));
        }
        md.push('\n');
    }
    md
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runner::run_comparison;
    use chrono::NaiveDate;
    use rust_decimal_macros::dec;
    use swinglab_core::{Bar, PriceSeries, StrategyParams};

    fn result() -> ComparisonResult {
        let d = |m, day| NaiveDate::from_ymd_opt(2024, m, day).unwrap();
        let series = PriceSeries::new(vec![
            Bar::new(d(1, 2), dec!(100)),
            Bar::new(d(1, 3), dec!(111)),
            Bar::new(d(1, 4), dec!(100)),
            Bar::new(d(1, 31), dec!(89)),
            Bar::new(d(2, 1), dec!(90)),
        ])
        .unwrap();
        run_comparison(&series, &StrategyParams::default()).unwrap()
    }

    #[test]
    fn json_round_trip() {
        let r = result();
        let json = export_json(&r).unwrap();
        assert!(json.contains("\"schema_version\": 1"));
        assert_eq!(import_json(&json).unwrap(), r);
    }

    #[test]
    fn future_schema_rejected() {
        let mut value: serde_json::Value = serde_json::from_str(&export_json(&result()).unwrap()).unwrap();
        value["schema_version"] = serde_json::json!(SCHEMA_VERSION + 1);
        let err = import_json(&value.to_string()).unwrap_err();
        assert!(err.to_string().contains("unsupported schema version"));
    }

    #[test]
    fn ledger_csv_has_one_line_per_bar() {
        let r = result();
        let csv = export_ledger_csv(&r.swing.ledger).unwrap();
        let mut lines = csv.lines();
        assert_eq!(lines.next().unwrap(), LEDGER_COLUMNS.join(","));
        assert_eq!(lines.count(), r.swing.ledger.len());
    }

    #[test]
    fn trade_log_keeps_only_trades() {
        let r = result();
        let csv = export_trade_log_csv(&r.swing.ledger).unwrap();
        // Header, the sell at 111, the buy at 89.
        assert_eq!(csv.lines().count(), 3);
        assert!(csv.contains("2024-01-03,111,111,sell,900"));
        assert!(csv.contains(",buy,"));
    }

    #[test]
    fn option_csv_carries_strike() {
        let r = result();
        let csv = export_trade_log_csv(&r.covered_option.ledger).unwrap();
        assert!(csv.contains("write_call"));
        assert!(csv.contains("122.1"));
    }

    #[test]
    fn report_has_all_sections() {
        let md = generate_report(&result());
        assert!(md.contains("# Swing vs Covered Option Backtest"));
        assert!(md.contains("## Returns"));
        assert!(md.contains("## Swing"));
        assert!(md.contains("## Covered Option"));
        assert!(md.contains("| Buy & Hold |"));
        assert!(md.contains("percentage points"));
    }
}
