//! CSV price files.
//!
//! A price file has a header row with at least `date` and `close` columns
//! (`Date`/`Close` are accepted too); any other columns are ignored. Row order
//! is preserved so that an unsorted file is rejected by series validation
//! instead of being silently reordered.

use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use std::str::FromStr;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::provider::{clip_to_range, DataError, DataProvider, DataSource, FetchResult};
use crate::domain::Bar;

// Closes are read as text so that the decimal digits survive exactly.
#[derive(Debug, Deserialize)]
struct CsvRow {
    #[serde(alias = "Date")]
    date: NaiveDate,
    #[serde(alias = "Close")]
    close: String,
}

#[derive(Debug, Serialize)]
struct CsvOutRow {
    date: NaiveDate,
    close: Decimal,
}

/// Read `date,close` rows from any reader.
pub fn read_bars<R: Read>(reader: R) -> Result<Vec<Bar>, DataError> {
    let mut rdr = csv::ReaderBuilder::new().trim(csv::Trim::All).from_reader(reader);
    let mut bars = Vec::new();
    for row in rdr.deserialize::<CsvRow>() {
        let row = row?;
        let close = Decimal::from_str(&row.close).map_err(|_| DataError::InvalidClose {
            date: row.date,
            value: row.close.clone(),
        })?;
        bars.push(Bar::new(row.date, close));
    }
    Ok(bars)
}

/// Write bars as `date,close` rows.
pub fn write_bars<W: Write>(writer: W, bars: &[Bar]) -> Result<(), DataError> {
    let mut wtr = csv::Writer::from_writer(writer);
    for bar in bars {
        wtr.serialize(CsvOutRow {
            date: bar.date,
            close: bar.close,
        })?;
    }
    wtr.flush()?;
    Ok(())
}

/// Provider that reads `{dir}/{SYMBOL}.csv`.
pub struct CsvProvider {
    dir: PathBuf,
}

impl CsvProvider {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn path_for(&self, symbol: &str) -> PathBuf {
        self.dir.join(format!("{}.csv", symbol.to_uppercase()))
    }

    /// Read a price file directly, without range clipping.
    pub fn read_file(path: &Path) -> Result<Vec<Bar>, DataError> {
        let file = std::fs::File::open(path)?;
        read_bars(file)
    }
}

impl DataProvider for CsvProvider {
    fn name(&self) -> &str {
        "csv_import"
    }

    fn fetch(
        &self,
        symbol: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<FetchResult, DataError> {
        let path = self.path_for(symbol);
        if !path.exists() {
            return Err(DataError::NotFound {
                symbol: symbol.to_string(),
            });
        }
        let bars = clip_to_range(symbol, Self::read_file(&path)?, start, end)?;
        Ok(FetchResult {
            symbol: symbol.to_string(),
            bars,
            source: DataSource::CsvImport,
        })
    }

    fn is_available(&self) -> bool {
        self.dir.is_dir()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn reads_with_extra_columns_and_capitalized_headers() {
        let data = "Date,Open,Close,Volume\n2024-01-02,1,100.5,10\n2024-01-03,1,101,10\n";
        let bars = read_bars(data.as_bytes()).unwrap();
        assert_eq!(bars.len(), 2);
        assert_eq!(bars[0].close, dec!(100.5));
        assert_eq!(bars[1].date, NaiveDate::from_ymd_opt(2024, 1, 3).unwrap());
    }

    #[test]
    fn bad_close_is_rejected() {
        let data = "date,close\n2024-01-02,abc\n";
        assert!(matches!(
            read_bars(data.as_bytes()),
            Err(DataError::InvalidClose { ref value, .. }) if value == "abc"
        ));
    }

    #[test]
    fn bad_date_is_csv_error() {
        let data = "date,close\n01/02/2024,100\n";
        assert!(matches!(read_bars(data.as_bytes()), Err(DataError::Csv(_))));
    }

    #[test]
    fn write_then_read_preserves_order() {
        let d = |day| NaiveDate::from_ymd_opt(2024, 1, day).unwrap();
        let bars = vec![Bar::new(d(3), dec!(2)), Bar::new(d(2), dec!(1))];
        let mut buf = Vec::new();
        write_bars(&mut buf, &bars).unwrap();
        assert!(String::from_utf8(buf.clone()).unwrap().starts_with("date,close\n"));
        assert_eq!(read_bars(buf.as_slice()).unwrap(), bars);
    }
}
