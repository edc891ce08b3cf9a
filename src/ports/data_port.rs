//! Data access port trait.
//!
//! The data collaborator owns acquisition and persistence of price history;
//! the core only ever sees time-ordered bars through this trait.

use crate::domain::error::VoltraderError;
use crate::domain::ohlcv::OhlcvBar;
use chrono::NaiveDate;

pub trait DataPort {
    fn fetch_ohlcv(
        &self,
        code: &str,
        exchange: &str,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> Result<Vec<OhlcvBar>, VoltraderError>;

    fn list_symbols(&self, exchange: &str) -> Result<Vec<String>, VoltraderError>;

    fn get_data_range(
        &self,
        code: &str,
        exchange: &str,
    ) -> Result<Option<(NaiveDate, NaiveDate, usize)>, VoltraderError>;
}
