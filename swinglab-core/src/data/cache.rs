//! On-disk cache of downloaded price series.
//!
//! Layout: `{cache_dir}/{SYMBOL}/{start}_{end}.csv` plus a
//! `{start}_{end}.meta.json` sidecar holding the fetch time, bar count, data
//! hash and source.
//!
//! - Writes are atomic (write to .tmp, rename into place).
//! - Entries older than `max_age` are ignored on load and removed by
//!   [`BarCache::clean_stale`].
//! - A bar count or hash that disagrees with the sidecar is treated as a
//!   corrupt entry: it is reported as a miss and quarantined.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::csv_import::{read_bars, write_bars};
use super::provider::{DataError, DataSource};
use crate::domain::Bar;

/// Default expiry for cached downloads.
pub const DEFAULT_MAX_AGE_DAYS: i64 = 7;

/// Metadata sidecar for one cached series.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheMeta {
    pub symbol: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub bar_count: usize,
    pub data_hash: String,
    pub source: DataSource,
    pub cached_at: NaiveDateTime,
}

/// One cache entry as seen by `status`.
#[derive(Debug, Clone)]
pub struct CacheEntry {
    pub meta: CacheMeta,
    pub data_path: PathBuf,
    pub is_stale: bool,
}

/// Stable hash of a bar sequence.
pub fn hash_bars(bars: &[Bar]) -> String {
    let mut hasher = blake3::Hasher::new();
    for bar in bars {
        hasher.update(bar.date.to_string().as_bytes());
        hasher.update(b",");
        hasher.update(bar.close.normalize().to_string().as_bytes());
        hasher.update(b"\n");
    }
    hasher.finalize().to_hex().to_string()
}

/// The price series cache.
pub struct BarCache {
    cache_dir: PathBuf,
    max_age: chrono::Duration,
}

impl BarCache {
    pub fn new(cache_dir: impl Into<PathBuf>) -> Self {
        Self {
            cache_dir: cache_dir.into(),
            max_age: chrono::Duration::days(DEFAULT_MAX_AGE_DAYS),
        }
    }

    pub fn with_max_age(mut self, max_age: chrono::Duration) -> Self {
        self.max_age = max_age;
        self
    }

    /// Root directory of the cache.
    pub fn cache_dir(&self) -> &Path {
        &self.cache_dir
    }

    fn symbol_dir(&self, symbol: &str) -> PathBuf {
        self.cache_dir.join(symbol.to_uppercase())
    }

    fn data_path(&self, symbol: &str, start: NaiveDate, end: NaiveDate) -> PathBuf {
        self.symbol_dir(symbol).join(format!("{start}_{end}.csv"))
    }

    fn meta_path(&self, symbol: &str, start: NaiveDate, end: NaiveDate) -> PathBuf {
        self.symbol_dir(symbol).join(format!("{start}_{end}.meta.json"))
    }

    fn is_stale(&self, meta: &CacheMeta, now: NaiveDateTime) -> bool {
        now - meta.cached_at > self.max_age
    }

    /// Store `bars` for `(symbol, start, end)`, replacing any earlier entry.
    pub fn write(
        &self,
        symbol: &str,
        start: NaiveDate,
        end: NaiveDate,
        bars: &[Bar],
        source: DataSource,
    ) -> Result<CacheMeta, DataError> {
        self.write_at(symbol, start, end, bars, source, now())
    }

    pub fn write_at(
        &self,
        symbol: &str,
        start: NaiveDate,
        end: NaiveDate,
        bars: &[Bar],
        source: DataSource,
        cached_at: NaiveDateTime,
    ) -> Result<CacheMeta, DataError> {
        if bars.is_empty() {
            return Err(DataError::Cache("no bars to cache".into()));
        }

        fs::create_dir_all(self.symbol_dir(symbol))
            .map_err(|e| DataError::Cache(format!("failed to create dir: {e}")))?;

        let path = self.data_path(symbol, start, end);
        let tmp_path = path.with_extension("csv.tmp");
        let file = fs::File::create(&tmp_path)
            .map_err(|e| DataError::Cache(format!("failed to create {}: {e}", tmp_path.display())))?;
        write_bars(file, bars)?;
        fs::rename(&tmp_path, &path).map_err(|e| {
            let _ = fs::remove_file(&tmp_path);
            DataError::Cache(format!("atomic rename failed: {e}"))
        })?;

        let meta = CacheMeta {
            symbol: symbol.to_uppercase(),
            start_date: start,
            end_date: end,
            bar_count: bars.len(),
            data_hash: hash_bars(bars),
            source,
            cached_at,
        };
        let meta_json = serde_json::to_string_pretty(&meta)
            .map_err(|e| DataError::Cache(format!("meta serialization: {e}")))?;
        fs::write(self.meta_path(symbol, start, end), meta_json)
            .map_err(|e| DataError::Cache(format!("meta write: {e}")))?;

        debug!(symbol, %start, %end, bars = bars.len(), "cached price series");
        Ok(meta)
    }

    /// Load a fresh entry, or `None` on a miss, a stale entry, or a corrupt one.
    pub fn load(
        &self,
        symbol: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Option<Vec<Bar>>, DataError> {
        self.load_at(symbol, start, end, now())
    }

    pub fn load_at(
        &self,
        symbol: &str,
        start: NaiveDate,
        end: NaiveDate,
        now: NaiveDateTime,
    ) -> Result<Option<Vec<Bar>>, DataError> {
        let meta_path = self.meta_path(symbol, start, end);
        let data_path = self.data_path(symbol, start, end);
        if !meta_path.exists() || !data_path.exists() {
            return Ok(None);
        }

        let meta = match read_meta(&meta_path) {
            Ok(meta) => meta,
            Err(e) => {
                warn!(path = %meta_path.display(), error = %e, "unreadable cache metadata");
                quarantine(&meta_path);
                return Ok(None);
            }
        };

        if self.is_stale(&meta, now) {
            debug!(symbol, cached_at = %meta.cached_at, "cache entry is stale");
            return Ok(None);
        }

        let file = fs::File::open(&data_path)?;
        let bars = match read_bars(file) {
            Ok(bars) => bars,
            Err(e) => {
                warn!(path = %data_path.display(), error = %e, "unreadable cache data");
                quarantine(&data_path);
                return Ok(None);
            }
        };

        if bars.len() != meta.bar_count || hash_bars(&bars) != meta.data_hash {
            warn!(path = %data_path.display(), "cache entry does not match its metadata");
            quarantine(&data_path);
            return Ok(None);
        }

        Ok(Some(bars))
    }

    /// All entries currently in the cache, sorted by symbol and range.
    pub fn status(&self) -> Result<Vec<CacheEntry>, DataError> {
        self.status_at(now())
    }

    pub fn status_at(&self, now: NaiveDateTime) -> Result<Vec<CacheEntry>, DataError> {
        let mut entries = Vec::new();
        if !self.cache_dir.exists() {
            return Ok(entries);
        }

        for sym_dir in fs::read_dir(&self.cache_dir)? {
            let sym_dir = sym_dir?.path();
            if !sym_dir.is_dir() {
                continue;
            }
            for file in fs::read_dir(&sym_dir)? {
                let path = file?.path();
                let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
                    continue;
                };
                let Some(stem) = name.strip_suffix(".meta.json") else {
                    continue;
                };
                let Ok(meta) = read_meta(&path) else {
                    continue;
                };
                entries.push(CacheEntry {
                    is_stale: self.is_stale(&meta, now),
                    data_path: sym_dir.join(format!("{stem}.csv")),
                    meta,
                });
            }
        }

        entries.sort_by(|a, b| {
            (&a.meta.symbol, a.meta.start_date, a.meta.end_date)
                .cmp(&(&b.meta.symbol, b.meta.start_date, b.meta.end_date))
        });
        Ok(entries)
    }

    /// Remove stale entries. Returns what was removed.
    pub fn clean_stale(&self) -> Result<Vec<CacheMeta>, DataError> {
        self.clean_stale_at(now())
    }

    pub fn clean_stale_at(&self, now: NaiveDateTime) -> Result<Vec<CacheMeta>, DataError> {
        let mut removed = Vec::new();
        for entry in self.status_at(now)?.into_iter().filter(|e| e.is_stale) {
            self.remove(&entry.meta)?;
            removed.push(entry.meta);
        }
        Ok(removed)
    }

    /// Remove every entry. Returns how many entries were removed.
    pub fn clear(&self) -> Result<usize, DataError> {
        let entries = self.status()?;
        for entry in &entries {
            self.remove(&entry.meta)?;
        }
        Ok(entries.len())
    }

    fn remove(&self, meta: &CacheMeta) -> Result<(), DataError> {
        for path in [
            self.data_path(&meta.symbol, meta.start_date, meta.end_date),
            self.meta_path(&meta.symbol, meta.start_date, meta.end_date),
        ] {
            if path.exists() {
                fs::remove_file(&path)?;
            }
        }
        Ok(())
    }
}

fn now() -> NaiveDateTime {
    chrono::Local::now().naive_local()
}

fn read_meta(path: &Path) -> Result<CacheMeta, DataError> {
    let text = fs::read_to_string(path)?;
    serde_json::from_str(&text).map_err(|e| DataError::Cache(format!("meta parse: {e}")))
}

fn quarantine(path: &Path) {
    let mut target = path.as_os_str().to_owned();
    target.push(".quarantined");
    let _ = fs::rename(path, target);
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn d(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, day).unwrap()
    }

    fn at(day: u32) -> NaiveDateTime {
        d(day).and_hms_opt(12, 0, 0).unwrap()
    }

    fn bars() -> Vec<Bar> {
        vec![Bar::new(d(2), dec!(100.5)), Bar::new(d(3), dec!(101))]
    }

    #[test]
    fn write_then_load_fresh() {
        let dir = tempfile::tempdir().unwrap();
        let cache = BarCache::new(dir.path());
        let meta = cache
            .write_at("spy", d(1), d(31), &bars(), DataSource::AlphaVantage, at(1))
            .unwrap();
        assert_eq!(meta.symbol, "SPY");
        assert_eq!(meta.bar_count, 2);

        let loaded = cache.load_at("SPY", d(1), d(31), at(5)).unwrap();
        assert_eq!(loaded, Some(bars()));
    }

    #[test]
    fn stale_entry_is_a_miss_and_cleanable() {
        let dir = tempfile::tempdir().unwrap();
        let cache = BarCache::new(dir.path());
        cache
            .write_at("SPY", d(1), d(31), &bars(), DataSource::AlphaVantage, at(1))
            .unwrap();

        assert_eq!(cache.load_at("SPY", d(1), d(31), at(9)).unwrap(), None);

        let status = cache.status_at(at(9)).unwrap();
        assert_eq!(status.len(), 1);
        assert!(status[0].is_stale);

        let removed = cache.clean_stale_at(at(9)).unwrap();
        assert_eq!(removed.len(), 1);
        assert!(cache.status_at(at(9)).unwrap().is_empty());
    }

    #[test]
    fn tampered_data_is_quarantined() {
        let dir = tempfile::tempdir().unwrap();
        let cache = BarCache::new(dir.path());
        cache
            .write_at("SPY", d(1), d(31), &bars(), DataSource::CsvImport, at(1))
            .unwrap();
        let data = cache.data_path("SPY", d(1), d(31));
        fs::write(&data, "date,close\n2024-01-02,1\n2024-01-03,2\n").unwrap();

        assert_eq!(cache.load_at("SPY", d(1), d(31), at(2)).unwrap(), None);
        assert!(!data.exists());
    }

    #[test]
    fn empty_write_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let cache = BarCache::new(dir.path());
        assert!(cache
            .write("SPY", d(1), d(31), &[], DataSource::AlphaVantage)
            .is_err());
    }

    #[test]
    fn hash_ignores_trailing_zeros() {
        let a = vec![Bar::new(d(2), dec!(100.50))];
        let b = vec![Bar::new(d(2), dec!(100.5))];
        assert_eq!(hash_bars(&a), hash_bars(&b));
    }
}
