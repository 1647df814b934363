//! Monthly time series and the positional train/test split.

use crate::error::{Error, Result};
use chrono::{Datelike, Months, NaiveDate};

/// Seasonal period of monthly data.
pub const MONTHS_PER_YEAR: usize = 12;

/// Normalize a date to the first day of its month.
pub fn first_of_month(date: NaiveDate) -> NaiveDate {
    date.with_day(1).unwrap_or(date)
}

/// Add `n` calendar months to a first-of-month date.
pub fn add_months(date: NaiveDate, n: usize) -> Result<NaiveDate> {
    let n = u32::try_from(n)
        .map_err(|_| Error::InvalidParameter(format!("month offset {} too large", n)))?;
    date.checked_add_months(Months::new(n))
        .ok_or_else(|| Error::InvalidDate(format!("{} + {} months", date, n)))
}

/// Check that sorted months follow each other without a gap.
pub fn months_are_contiguous(months: &[NaiveDate]) -> bool {
    months.windows(2).all(|w| {
        let (a, b) = (w[0], w[1]);
        let next_year = if a.month() == 12 { a.year() + 1 } else { a.year() };
        let next_month = if a.month() == 12 { 1 } else { a.month() + 1 };
        b.year() == next_year && b.month() == next_month
    })
}

/// A gap-free monthly series starting at `start`.
///
/// Values are never NaN: construction rejects missing observations.
#[derive(Debug, Clone, PartialEq)]
pub struct MonthlySeries {
    name: String,
    start: NaiveDate,
    values: Vec<f64>,
}

impl MonthlySeries {
    /// Create a series from its first month and consecutive values.
    pub fn new(name: impl Into<String>, start: NaiveDate, values: Vec<f64>) -> Result<Self> {
        if values.is_empty() {
            return Err(Error::EmptyData);
        }
        if values.iter().any(|v| !v.is_finite()) {
            return Err(Error::MissingValues);
        }
        Ok(Self {
            name: name.into(),
            start: first_of_month(start),
            values,
        })
    }

    /// Create a series from explicit months, which must be contiguous.
    pub fn from_months(
        name: impl Into<String>,
        months: &[NaiveDate],
        values: Vec<f64>,
    ) -> Result<Self> {
        if months.len() != values.len() {
            return Err(Error::DimensionMismatch {
                expected: months.len(),
                got: values.len(),
            });
        }
        let start = *months.first().ok_or(Error::EmptyData)?;
        if !months_are_contiguous(months) {
            return Err(Error::InvalidParameter(
                "months must be consecutive without gaps".to_string(),
            ));
        }
        Self::new(name, start, values)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn start(&self) -> NaiveDate {
        self.start
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Month of the observation at `index`.
    pub fn month_at(&self, index: usize) -> Result<NaiveDate> {
        add_months(self.start, index)
    }

    /// All months, in order.
    pub fn months(&self) -> Vec<NaiveDate> {
        (0..self.len())
            .filter_map(|i| self.start.checked_add_months(Months::new(i as u32)))
            .collect()
    }

    /// Last observed month.
    pub fn end(&self) -> Result<NaiveDate> {
        self.month_at(self.len() - 1)
    }

    /// Calendar month (1-12) of the observation at `index`.
    pub fn month_of_year(&self, index: usize) -> u32 {
        (self.start.month0() + (index % MONTHS_PER_YEAR) as u32) % MONTHS_PER_YEAR as u32 + 1
    }

    /// Sub-series over `[start, end)`.
    pub fn slice(&self, start: usize, end: usize) -> Result<MonthlySeries> {
        if start >= end || end > self.len() {
            return Err(Error::InvalidParameter(format!(
                "invalid slice {}..{} of series with {} observations",
                start,
                end,
                self.len()
            )));
        }
        Ok(Self {
            name: self.name.clone(),
            start: self.month_at(start)?,
            values: self.values[start..end].to_vec(),
        })
    }

    /// Same months, values replaced by `f(value)`.
    ///
    /// Fails if the mapped values are not finite (e.g. a log of zero).
    pub fn map_values<F>(&self, f: F) -> Result<MonthlySeries>
    where
        F: Fn(f64) -> f64,
    {
        Self::new(
            self.name.clone(),
            self.start,
            self.values.iter().map(|&v| f(v)).collect(),
        )
    }

    /// Split into a training prefix and a test suffix of `test_len` points.
    pub fn split(&self, test_len: usize) -> Result<TrainTestSplit> {
        if test_len == 0 {
            return Err(Error::InvalidParameter(
                "test length must be positive".to_string(),
            ));
        }
        if self.len() <= test_len {
            return Err(Error::InsufficientData {
                needed: test_len + 1,
                got: self.len(),
            });
        }
        let cut = self.len() - test_len;
        Ok(TrainTestSplit {
            train: self.slice(0, cut)?,
            test: self.slice(cut, self.len())?,
        })
    }
}

/// Positional partition of a series into training prefix and test suffix.
#[derive(Debug, Clone, PartialEq)]
pub struct TrainTestSplit {
    pub train: MonthlySeries,
    pub test: MonthlySeries,
}

impl TrainTestSplit {
    /// Forecast horizon implied by the test suffix.
    pub fn horizon(&self) -> usize {
        self.test.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn month(y: i32, m: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, 1).unwrap()
    }

    fn make_series(n: usize) -> MonthlySeries {
        MonthlySeries::new("test", month(2000, 1), (0..n).map(|i| i as f64).collect()).unwrap()
    }

    #[test]
    fn months_advance_across_years() {
        let s = make_series(14);
        assert_eq!(s.month_at(11).unwrap(), month(2000, 12));
        assert_eq!(s.month_at(12).unwrap(), month(2001, 1));
        assert_eq!(s.end().unwrap(), month(2001, 2));
        assert_eq!(s.months().len(), 14);
    }

    #[test]
    fn month_of_year_wraps_from_mid_year_start() {
        let s = MonthlySeries::new("x", month(1982, 4), vec![1.0; 24]).unwrap();
        assert_eq!(s.month_of_year(0), 4);
        assert_eq!(s.month_of_year(8), 12);
        assert_eq!(s.month_of_year(9), 1);
        assert_eq!(s.month_of_year(21), 1);
    }

    #[test]
    fn start_is_normalized_to_first_of_month() {
        let s = MonthlySeries::new("x", NaiveDate::from_ymd_opt(2010, 3, 31).unwrap(), vec![1.0])
            .unwrap();
        assert_eq!(s.start(), month(2010, 3));
    }

    #[test]
    fn rejects_missing_and_empty_values() {
        assert!(matches!(
            MonthlySeries::new("x", month(2000, 1), vec![1.0, f64::NAN]),
            Err(Error::MissingValues)
        ));
        assert!(matches!(
            MonthlySeries::new("x", month(2000, 1), vec![]),
            Err(Error::EmptyData)
        ));
    }

    #[test]
    fn from_months_rejects_gaps() {
        let months = vec![month(2000, 1), month(2000, 2), month(2000, 4)];
        assert!(MonthlySeries::from_months("x", &months, vec![1.0, 2.0, 3.0]).is_err());

        let months = vec![month(2000, 11), month(2000, 12), month(2001, 1)];
        let s = MonthlySeries::from_months("x", &months, vec![1.0, 2.0, 3.0]).unwrap();
        assert_eq!(s.start(), month(2000, 11));
    }

    #[test]
    fn split_is_positional() {
        let s = make_series(100);
        let split = s.split(24).unwrap();
        assert_eq!(split.train.len(), 76);
        assert_eq!(split.test.len(), 24);
        assert_eq!(split.horizon(), 24);
        assert_eq!(split.test.values()[0], 76.0);
        assert_eq!(split.test.start(), s.month_at(76).unwrap());
    }

    #[test]
    fn split_requires_longer_series() {
        let s = make_series(24);
        assert!(matches!(
            s.split(24),
            Err(Error::InsufficientData { needed: 25, got: 24 })
        ));
        assert!(s.split(0).is_err());
    }

    #[test]
    fn map_values_keeps_calendar() {
        let s = make_series(5);
        let doubled = s.map_values(|v| v * 2.0).unwrap();
        assert_eq!(doubled.start(), s.start());
        assert_eq!(doubled.values(), &[0.0, 2.0, 4.0, 6.0, 8.0]);
        assert!(s.map_values(f64::ln).is_err());
    }
}
