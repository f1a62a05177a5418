//! SwingLab Runner: data resolution, comparison runs, and artifacts.
//!
//! This crate builds on `swinglab-core` to provide:
//! - TOML backtest configuration with content-addressed run ids
//! - Series loading with cache/download/synthetic fallback
//! - Parallel swing vs covered option comparison against buy-and-hold
//! - JSON, CSV and Markdown export

pub mod config;
pub mod data_loader;
pub mod export;
pub mod runner;

pub use config::{BacktestConfig, ConfigError, RunId, StrategySection};
pub use data_loader::{download_series, load_series, LoadError, LoadOptions, LoadedSeries};
pub use export::{
    export_json, export_ledger_csv, export_trade_log_csv, generate_report, import_json,
    load_artifacts, save_artifacts,
};
pub use runner::{
    run_comparison, run_from_config, ComparisonResult, DataProvenance, RunError, SCHEMA_VERSION,
};
