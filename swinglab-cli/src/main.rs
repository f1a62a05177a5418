//! SwingLab CLI: run, download, and cache management commands.
//!
//! Commands:
//! - `run`: compare swing vs covered option from a TOML config or flags
//! - `download`: fetch daily closes and store them in the cache
//! - `cache status`: list cached series with age and staleness
//! - `cache clean`: remove cached series older than a cutoff

use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use rust_decimal::Decimal;
use tracing_subscriber::EnvFilter;

use swinglab_core::data::{AlphaVantageProvider, BarCache, CircuitBreaker, CsvProvider, DataProvider};
use swinglab_runner::{
    download_series, run_from_config, save_artifacts, BacktestConfig, ComparisonResult,
    LoadOptions, StrategySection,
};

const API_KEY_ENV: &str = "ALPHAVANTAGE_API_KEY";

#[derive(Parser)]
#[command(
    name = "swinglab",
    about = "SwingLab CLI: swing trading vs covered option writing backtests"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run both strategies and the buy-and-hold baseline over one symbol.
    Run {
        /// Path to a TOML config file.
        #[arg(long, conflicts_with = "symbol")]
        config: Option<PathBuf>,

        /// Symbol to test when no config file is given.
        #[arg(long)]
        symbol: Option<String>,

        /// Start date (YYYY-MM-DD). Defaults to 2023-01-01.
        #[arg(long)]
        start: Option<NaiveDate>,

        /// End date (YYYY-MM-DD). Defaults to 2024-01-01.
        #[arg(long)]
        end: Option<NaiveDate>,

        /// Relative move that fires a signal, e.g. 0.10 for 10%.
        #[arg(long, default_value_t = 0.10)]
        threshold: f64,

        /// Premium per share as a fraction of the close.
        #[arg(long, default_value_t = 0.05)]
        premium_rate: f64,

        #[arg(long, default_value_t = 1000)]
        initial_shares: i64,

        /// Shares per swing trade and per written option.
        #[arg(long, default_value_t = 100)]
        trade_shares: i64,

        #[arg(long, default_value_t = 100_000.0)]
        initial_cash: f64,

        /// Offline mode: no network access.
        #[arg(long, default_value_t = false)]
        offline: bool,

        /// Use synthetic data as fallback.
        #[arg(long, default_value_t = false)]
        synthetic: bool,

        /// Ignore any cached copy and fetch again.
        #[arg(long, default_value_t = false)]
        force: bool,

        /// Read `{SYMBOL}.csv` files from this directory instead of Alpha Vantage.
        #[arg(long)]
        data_dir: Option<PathBuf>,

        /// Cache directory. Defaults to ./data.
        #[arg(long, default_value = "data")]
        cache_dir: PathBuf,

        /// Output directory for the artifact bundle.
        #[arg(long, default_value = "results")]
        output_dir: PathBuf,
    },
    /// Download daily closes and store them in the cache.
    Download {
        /// Symbols to download (e.g., AAPL MSFT NVDA).
        #[arg(required = true)]
        symbols: Vec<String>,

        /// Start date (YYYY-MM-DD). Defaults to 2023-01-01.
        #[arg(long)]
        start: Option<NaiveDate>,

        /// End date (YYYY-MM-DD). Defaults to 2024-01-01.
        #[arg(long)]
        end: Option<NaiveDate>,

        /// Read `{SYMBOL}.csv` files from this directory instead of Alpha Vantage.
        #[arg(long)]
        data_dir: Option<PathBuf>,

        /// Cache directory. Defaults to ./data.
        #[arg(long, default_value = "data")]
        cache_dir: PathBuf,
    },
    /// Cache management commands.
    Cache {
        #[command(subcommand)]
        action: CacheAction,
    },
}

#[derive(Subcommand)]
enum CacheAction {
    /// List cached series.
    Status {
        /// Cache directory. Defaults to ./data.
        #[arg(long, default_value = "data")]
        cache_dir: PathBuf,
    },
    /// Remove cached series older than the given number of days.
    Clean {
        #[arg(long, default_value_t = 7)]
        max_age_days: i64,

        /// Cache directory. Defaults to ./data.
        #[arg(long, default_value = "data")]
        cache_dir: PathBuf,

        /// Actually delete (without this flag, only previews what would be removed).
        #[arg(long, default_value_t = false)]
        confirm: bool,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Run {
            config,
            symbol,
            start,
            end,
            threshold,
            premium_rate,
            initial_shares,
            trade_shares,
            initial_cash,
            offline,
            synthetic,
            force,
            data_dir,
            cache_dir,
            output_dir,
        } => {
            let backtest_config = match config {
                Some(path) => BacktestConfig::from_file(&path)?,
                None => {
                    let Some(symbol) = symbol else {
                        bail!("one of --config or --symbol is required");
                    };
                    let config = BacktestConfig::new(
                        symbol,
                        start.unwrap_or_else(default_start),
                        end.unwrap_or_else(default_end),
                        StrategySection {
                            initial_shares,
                            trade_shares,
                            threshold,
                            premium_rate,
                            initial_cash,
                        },
                    );
                    config.validate()?;
                    config
                }
            };
            let opts = LoadOptions {
                offline,
                synthetic,
                force,
                ..LoadOptions::new(
                    backtest_config.backtest.start_date,
                    backtest_config.backtest.end_date,
                )
            };
            run_backtest_cmd(&backtest_config, &opts, data_dir.as_deref(), &cache_dir, &output_dir)
        }
        Commands::Download {
            symbols,
            start,
            end,
            data_dir,
            cache_dir,
        } => run_download(
            &symbols,
            start.unwrap_or_else(default_start),
            end.unwrap_or_else(default_end),
            data_dir.as_deref(),
            &cache_dir,
        ),
        Commands::Cache { action } => match action {
            CacheAction::Status { cache_dir } => run_cache_status(&cache_dir),
            CacheAction::Clean {
                max_age_days,
                cache_dir,
                confirm,
            } => run_cache_clean(&cache_dir, max_age_days, confirm),
        },
    }
}

fn default_start() -> NaiveDate {
    NaiveDate::from_ymd_opt(2023, 1, 1).unwrap_or(NaiveDate::MIN)
}

fn default_end() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 1, 1).unwrap_or(NaiveDate::MIN)
}

/// CSV files when `data_dir` is set, Alpha Vantage otherwise.
fn build_provider(data_dir: Option<&Path>) -> Result<Box<dyn DataProvider>> {
    if let Some(dir) = data_dir {
        return Ok(Box::new(CsvProvider::new(dir)));
    }
    let api_key = std::env::var(API_KEY_ENV).unwrap_or_else(|_| {
        tracing::warn!("{API_KEY_ENV} is not set; using the 'demo' key");
        "demo".to_string()
    });
    let provider = AlphaVantageProvider::new(api_key, Arc::new(CircuitBreaker::default_provider()))
        .context("failed to set up Alpha Vantage provider")?;
    Ok(Box::new(provider))
}

fn run_backtest_cmd(
    config: &BacktestConfig,
    opts: &LoadOptions,
    data_dir: Option<&Path>,
    cache_dir: &Path,
    output_dir: &Path,
) -> Result<()> {
    let cache = BarCache::new(cache_dir);
    let provider = if opts.offline {
        None
    } else {
        Some(build_provider(data_dir)?)
    };

    let result = run_from_config(config, &cache, provider.as_deref(), opts)?;

    print_summary(&result);

    let run_dir = save_artifacts(&result, output_dir)?;
    println!("Artifacts saved to: {}", run_dir.display());

    Ok(())
}

fn run_download(
    symbols: &[String],
    start: NaiveDate,
    end: NaiveDate,
    data_dir: Option<&Path>,
    cache_dir: &Path,
) -> Result<()> {
    let provider = build_provider(data_dir)?;
    let cache = BarCache::new(cache_dir);

    let mut failed = 0usize;
    for (i, symbol) in symbols.iter().enumerate() {
        let symbol = symbol.trim().to_uppercase();
        print!("[{}/{}] {symbol} ... ", i + 1, symbols.len());
        let _ = std::io::stdout().flush();
        match download_series(&symbol, &cache, provider.as_ref(), start, end) {
            Ok(meta) => println!("{} bars ({} to {})", meta.bar_count, start, end),
            Err(e) => {
                println!("failed");
                eprintln!("Error for {symbol}: {e}");
                failed += 1;
            }
        }
    }

    if failed > 0 {
        bail!("{failed} of {} downloads failed", symbols.len());
    }
    Ok(())
}

fn run_cache_status(cache_dir: &Path) -> Result<()> {
    let cache = BarCache::new(cache_dir);
    let entries = cache.status()?;

    if entries.is_empty() {
        println!("Cache is empty: {}", cache_dir.display());
        return Ok(());
    }

    let total_size: u64 = entries.iter().map(|e| file_size(&e.data_path)).sum();

    println!("Cache: {}", cache_dir.display());
    println!("Entries: {}", entries.len());
    println!("Total size: {}", format_size(total_size));
    println!();
    println!(
        "{:<8} {:<25} {:<10} {:<14} {:<20} {:>10}",
        "Symbol", "Date Range", "Bars", "Source", "Cached At", "Size"
    );
    println!("{}", "-".repeat(92));
    for e in &entries {
        println!(
            "{:<8} {:<25} {:<10} {:<14} {:<20} {:>10}{}",
            e.meta.symbol,
            format!("{} to {}", e.meta.start_date, e.meta.end_date),
            e.meta.bar_count,
            e.meta.source.label(),
            e.meta.cached_at.format("%Y-%m-%d %H:%M"),
            format_size(file_size(&e.data_path)),
            if e.is_stale { "  (stale)" } else { "" }
        );
    }

    Ok(())
}

fn run_cache_clean(cache_dir: &Path, max_age_days: i64, confirm: bool) -> Result<()> {
    if max_age_days < 0 {
        bail!("--max-age-days must be non-negative");
    }
    let cache = BarCache::new(cache_dir).with_max_age(chrono::Duration::days(max_age_days));
    let stale: Vec<_> = cache.status()?.into_iter().filter(|e| e.is_stale).collect();

    if stale.is_empty() {
        println!("No entries older than {max_age_days} days to remove.");
        return Ok(());
    }

    println!("Found {} entry(ies) older than {max_age_days} days:", stale.len());
    for e in &stale {
        println!(
            "  {} {} to {} ({})",
            e.meta.symbol,
            e.meta.start_date,
            e.meta.end_date,
            format_size(file_size(&e.data_path))
        );
    }

    if !confirm {
        println!();
        println!("Dry run: pass --confirm to actually delete.");
        return Ok(());
    }

    let removed = cache.clean_stale()?;
    println!("Done. Removed {} entry(ies).", removed.len());
    Ok(())
}

fn file_size(path: &Path) -> u64 {
    std::fs::metadata(path).map(|m| m.len()).unwrap_or(0)
}

fn format_size(bytes: u64) -> String {
    if bytes < 1024 {
        format!("{bytes} B")
    } else if bytes < 1024 * 1024 {
        format!("{:.1} KB", bytes as f64 / 1024.0)
    } else {
        format!("{:.1} MB", bytes as f64 / (1024.0 * 1024.0))
    }
}

fn pct(value: Decimal) -> String {
    format!("{:.2}%", value)
}

fn print_summary(result: &ComparisonResult) {
    let swing = &result.swing.summary;
    let option = &result.covered_option.summary;

    println!();
    println!("=== Backtest Result ===");
    if let Some(prov) = &result.provenance {
        println!("Symbol:          {}", prov.symbol);
        println!("Period:          {} to {}", prov.first_date, prov.last_date);
        println!("Bars:            {}", prov.bar_count);
        println!("Data Source:     {}", prov.source.label());
    }
    println!(
        "Threshold:       {}",
        pct(result.params.threshold * Decimal::ONE_HUNDRED)
    );
    println!();
    println!("--- Swing ---");
    println!("Final Value:     {:.2}", swing.final_value);
    println!("Total Return:    {}", pct(swing.total_return_pct));
    println!(
        "Buys / Sells:    {} / {} ({} / {} filled)",
        swing.buy_signals, swing.sell_signals, swing.executed_buys, swing.executed_sells
    );
    println!();
    println!("--- Covered Option ---");
    println!("Final Value:     {:.2}", option.final_value);
    println!("Total Return:    {}", pct(option.total_return_pct));
    println!(
        "Puts / Calls:    {} / {}",
        option.puts_written, option.calls_written
    );
    println!(
        "Exercised:       {} ({})",
        option.exercise_count,
        pct(option.exercise_rate_pct())
    );
    println!("Premium Income:  {:.2}", option.cumulative_premium_income);
    println!();
    println!("--- Buy & Hold ---");
    println!("Final Value:     {:.2}", result.baseline.final_value);
    println!("Total Return:    {}", pct(result.baseline.return_pct));
    println!();
    println!(
        "Better strategy: {} (by {:.2} pp)",
        result.better_variant().name(),
        result.return_gap_pct()
    );
    if result.provenance.as_ref().is_some_and(|p| p.has_synthetic) {
        println!();
        println!("WARNING: Results based on SYNTHETIC data");
    }
    println!();
}
