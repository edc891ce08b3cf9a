//! CSV file data adapter.
//!
//! One file per instrument, named `<CODE>_<EXCHANGE>.csv`, with a
//! `date,open,high,low,close,volume` header and ISO dates.

use crate::domain::error::VoltraderError;
use crate::domain::ohlcv::OhlcvBar;
use crate::ports::data_port::DataPort;
use chrono::NaiveDate;
use std::fs;
use std::path::PathBuf;

pub struct CsvAdapter {
    base_path: PathBuf,
}

impl CsvAdapter {
    pub fn new(base_path: PathBuf) -> Self {
        Self { base_path }
    }

    fn csv_path(&self, code: &str, exchange: &str) -> PathBuf {
        self.base_path.join(format!("{}_{}.csv", code, exchange))
    }

    fn read_bars(&self, code: &str, exchange: &str) -> Result<Vec<OhlcvBar>, VoltraderError> {
        let path = self.csv_path(code, exchange);
        let content = fs::read_to_string(&path).map_err(|e| VoltraderError::Data {
            reason: format!("failed to read {}: {}", path.display(), e),
        })?;

        let mut rdr = csv::Reader::from_reader(content.as_bytes());
        let mut bars = Vec::new();

        for result in rdr.records() {
            let record = result.map_err(|e| VoltraderError::Data {
                reason: format!("CSV parse error in {}: {}", path.display(), e),
            })?;

            let date = NaiveDate::parse_from_str(get_field(&record, 0, "date", &path)?, "%Y-%m-%d")
                .map_err(|e| VoltraderError::Data {
                    reason: format!("invalid date in {}: {}", path.display(), e),
                })?;

            let volume: i64 = get_field(&record, 5, "volume", &path)?
                .parse()
                .map_err(|e| VoltraderError::Data {
                    reason: format!("invalid volume value in {}: {}", path.display(), e),
                })?;

            bars.push(OhlcvBar {
                code: code.to_string(),
                exchange: exchange.to_string(),
                date,
                open: parse_price(&record, 1, "open", &path)?,
                high: parse_price(&record, 2, "high", &path)?,
                low: parse_price(&record, 3, "low", &path)?,
                close: parse_price(&record, 4, "close", &path)?,
                volume,
            });
        }

        bars.sort_by_key(|b| b.date);
        Ok(bars)
    }
}

fn get_field<'r>(
    record: &'r csv::StringRecord,
    idx: usize,
    name: &str,
    path: &std::path::Path,
) -> Result<&'r str, VoltraderError> {
    record.get(idx).ok_or_else(|| VoltraderError::Data {
        reason: format!("missing {} column in {}", name, path.display()),
    })
}

fn parse_price(
    record: &csv::StringRecord,
    idx: usize,
    name: &str,
    path: &std::path::Path,
) -> Result<f64, VoltraderError> {
    get_field(record, idx, name, path)?
        .parse()
        .map_err(|e| VoltraderError::Data {
            reason: format!("invalid {} value in {}: {}", name, path.display(), e),
        })
}

impl DataPort for CsvAdapter {
    fn fetch_ohlcv(
        &self,
        code: &str,
        exchange: &str,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> Result<Vec<OhlcvBar>, VoltraderError> {
        let bars = self.read_bars(code, exchange)?;
        Ok(bars
            .into_iter()
            .filter(|b| b.date >= start_date && b.date <= end_date)
            .collect())
    }

    fn list_symbols(&self, exchange: &str) -> Result<Vec<String>, VoltraderError> {
        let entries = fs::read_dir(&self.base_path).map_err(|e| VoltraderError::Data {
            reason: format!(
                "failed to read directory {}: {}",
                self.base_path.display(),
                e
            ),
        })?;

        let suffix = format!("_{}.csv", exchange);
        let mut symbols = Vec::new();

        for entry in entries {
            let entry = entry.map_err(|e| VoltraderError::Data {
                reason: format!("directory entry error: {}", e),
            })?;

            let name = entry.file_name();
            let name_str = name.to_string_lossy();

            if let Some(code) = name_str.strip_suffix(&suffix) {
                symbols.push(code.to_string());
            }
        }

        symbols.sort();
        Ok(symbols)
    }

    fn get_data_range(
        &self,
        code: &str,
        exchange: &str,
    ) -> Result<Option<(NaiveDate, NaiveDate, usize)>, VoltraderError> {
        let bars = match self.read_bars(code, exchange) {
            Ok(bars) => bars,
            Err(_) => return Ok(None),
        };
        match (bars.first(), bars.last()) {
            (Some(first), Some(last)) => Ok(Some((first.date, last.date, bars.len()))),
            _ => Ok(None),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn setup_test_data() -> (TempDir, PathBuf) {
        let dir = TempDir::new().unwrap();
        let path = dir.path().to_path_buf();

        let csv_content = "date,open,high,low,close,volume\n\
            2024-01-17,110.0,120.0,105.0,115.0,55000\n\
            2024-01-15,100.0,110.0,90.0,105.0,50000\n\
            2024-01-16,105.0,115.0,100.0,110.0,60000\n";

        fs::write(path.join("GOOG_NASDAQ.csv"), csv_content).unwrap();
        fs::write(
            path.join("MSFT_NASDAQ.csv"),
            "date,open,high,low,close,volume\n",
        )
        .unwrap();
        fs::write(
            path.join("DBS_SGX.csv"),
            "date,open,high,low,close,volume\n",
        )
        .unwrap();

        (dir, path)
    }

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    #[test]
    fn fetch_sorts_by_date() {
        let (_dir, path) = setup_test_data();
        let adapter = CsvAdapter::new(path);

        let bars = adapter
            .fetch_ohlcv("GOOG", "NASDAQ", date("2024-01-01"), date("2024-12-31"))
            .unwrap();

        assert_eq!(bars.len(), 3);
        assert_eq!(bars[0].date, date("2024-01-15"));
        assert_eq!(bars[2].date, date("2024-01-17"));
        assert_eq!(bars[0].code, "GOOG");
        assert!((bars[0].close - 105.0).abs() < f64::EPSILON);
        assert_eq!(bars[0].volume, 50000);
    }

    #[test]
    fn fetch_filters_date_range() {
        let (_dir, path) = setup_test_data();
        let adapter = CsvAdapter::new(path);

        let bars = adapter
            .fetch_ohlcv("GOOG", "NASDAQ", date("2024-01-16"), date("2024-01-16"))
            .unwrap();

        assert_eq!(bars.len(), 1);
        assert_eq!(bars[0].date, date("2024-01-16"));
    }

    #[test]
    fn fetch_missing_file_is_error() {
        let (_dir, path) = setup_test_data();
        let adapter = CsvAdapter::new(path);

        let result = adapter.fetch_ohlcv("NONE", "NASDAQ", date("2024-01-01"), date("2024-12-31"));
        assert!(matches!(result, Err(VoltraderError::Data { .. })));
    }

    #[test]
    fn fetch_rejects_malformed_rows() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().to_path_buf();
        fs::write(
            path.join("BAD_NASDAQ.csv"),
            "date,open,high,low,close,volume\n2024-01-15,abc,110,90,105,50000\n",
        )
        .unwrap();

        let adapter = CsvAdapter::new(path);
        let result = adapter.fetch_ohlcv("BAD", "NASDAQ", date("2024-01-01"), date("2024-12-31"));
        assert!(matches!(result, Err(VoltraderError::Data { .. })));
    }

    #[test]
    fn list_symbols_filters_by_exchange() {
        let (_dir, path) = setup_test_data();
        let adapter = CsvAdapter::new(path);

        let symbols = adapter.list_symbols("NASDAQ").unwrap();
        assert_eq!(symbols, vec!["GOOG", "MSFT"]);

        let symbols = adapter.list_symbols("SGX").unwrap();
        assert_eq!(symbols, vec!["DBS"]);
    }

    #[test]
    fn data_range_reports_span() {
        let (_dir, path) = setup_test_data();
        let adapter = CsvAdapter::new(path);

        let range = adapter.get_data_range("GOOG", "NASDAQ").unwrap().unwrap();
        assert_eq!(range, (date("2024-01-15"), date("2024-01-17"), 3));
    }

    #[test]
    fn data_range_empty_file_is_none() {
        let (_dir, path) = setup_test_data();
        let adapter = CsvAdapter::new(path);

        assert!(adapter.get_data_range("MSFT", "NASDAQ").unwrap().is_none());
        assert!(adapter.get_data_range("NONE", "NASDAQ").unwrap().is_none());
    }
}
