use chrono::{Days, NaiveDate};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::str::FromStr;

use crate::errors::{DataError, HvError, HvResult};
use crate::validation_error;

/// Equity ticker symbol, trimmed and upper-cased
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Ticker(String);

impl Ticker {
    pub fn new(raw: &str) -> HvResult<Self> {
        let symbol = raw.trim().to_uppercase();
        if symbol.is_empty() {
            return Err(validation_error!("Ticker must not be empty"));
        }
        Ok(Self(symbol))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Ticker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for Ticker {
    type Err = HvError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ticker::new(s)
    }
}

impl TryFrom<String> for Ticker {
    type Error = HvError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Ticker::new(&value)
    }
}

impl From<Ticker> for String {
    fn from(ticker: Ticker) -> Self {
        ticker.0
    }
}

/// Number of calendar days of history preceding the as-of date
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LookbackWindow(u32);

impl LookbackWindow {
    pub fn new(days: u32) -> HvResult<Self> {
        if days == 0 {
            return Err(validation_error!("Lookback window must be a positive number of days"));
        }
        Ok(Self(days))
    }

    pub fn days(&self) -> u32 {
        self.0
    }

    /// First calendar date of the window ending at `end`. Fails when the
    /// window reaches back past the earliest representable date.
    pub fn start_from(&self, end: NaiveDate) -> HvResult<NaiveDate> {
        end.checked_sub_days(Days::new(u64::from(self.0))).ok_or_else(|| {
            validation_error!("Lookback window of {} days before {} is out of the supported date range", self.0, end)
        })
    }
}

impl Default for LookbackWindow {
    fn default() -> Self {
        Self(365)
    }
}

impl fmt::Display for LookbackWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}d", self.0)
    }
}

/// Confidence level (alpha) of a risk estimate, strictly inside (0, 1)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ConfidenceLevel(f64);

impl ConfidenceLevel {
    pub fn new(alpha: f64) -> HvResult<Self> {
        if !(alpha > 0.0 && alpha < 1.0) {
            return Err(validation_error!(
                "Confidence level must lie strictly between 0 and 1, got {}",
                alpha
            ));
        }
        Ok(Self(alpha))
    }

    pub fn value(&self) -> f64 {
        self.0
    }

    /// Probability mass of the loss tail, `1 - alpha`.
    pub fn tail_probability(&self) -> f64 {
        1.0 - self.0
    }
}

impl Default for ConfidenceLevel {
    fn default() -> Self {
        Self(0.95)
    }
}

/// A single adjusted closing price observation
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PricePoint {
    pub date: NaiveDate,
    pub price: f64,
}

impl PricePoint {
    pub fn new(date: NaiveDate, price: f64) -> Self {
        Self { date, price }
    }

    pub fn is_usable(&self) -> bool {
        self.price.is_finite() && self.price > 0.0
    }
}

/// Dates a ticker lacks relative to the union of every ticker's dates
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CoverageGap {
    pub ticker: Ticker,
    /// Union dates with no usable price for this ticker.
    pub missing: usize,
    /// Size of the date union.
    pub total: usize,
}

impl CoverageGap {
    pub fn coverage(&self) -> f64 {
        1.0 - self.missing as f64 / self.total as f64
    }
}

impl fmt::Display for CoverageGap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} lacks {} of {} dates", self.ticker, self.missing, self.total)
    }
}

/// Date-aligned adjusted closing prices, one fully populated column per ticker
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceMatrix {
    dates: Vec<NaiveDate>,
    tickers: Vec<Ticker>,
    columns: Vec<Vec<f64>>,
}

impl PriceMatrix {
    /// Tickers must price at least this share of the date union to be aligned.
    pub const MIN_COVERAGE: f64 = 0.5;

    /// Tickers missing some of the dates seen across all series, in input
    /// order. Fully covered tickers are omitted.
    pub fn coverage_gaps(series: &[(Ticker, Vec<PricePoint>)]) -> Vec<CoverageGap> {
        let per_ticker: Vec<BTreeSet<NaiveDate>> = series
            .iter()
            .map(|(_, points)| points.iter().filter(|p| p.is_usable()).map(|p| p.date).collect())
            .collect();
        let total = per_ticker.iter().flatten().collect::<BTreeSet<_>>().len();

        series
            .iter()
            .zip(&per_ticker)
            .filter(|(_, dates)| dates.len() < total)
            .map(|((ticker, _), dates)| CoverageGap {
                ticker: ticker.clone(),
                missing: total - dates.len(),
                total,
            })
            .collect()
    }

    /// Build a matrix from already aligned columns.
    pub fn from_columns(
        dates: Vec<NaiveDate>,
        tickers: Vec<Ticker>,
        columns: Vec<Vec<f64>>,
    ) -> HvResult<Self> {
        if tickers.len() != columns.len() {
            return Err(validation_error!(
                "Got {} tickers but {} price columns",
                tickers.len(),
                columns.len()
            ));
        }
        if dates.windows(2).any(|w| w[0] >= w[1]) {
            return Err(validation_error!("Price dates must be strictly ascending"));
        }

        let incomplete: Vec<String> = tickers
            .iter()
            .zip(&columns)
            .filter(|(_, column)| {
                column.is_empty()
                    || column.len() != dates.len()
                    || column.iter().any(|p| !(p.is_finite() && *p > 0.0))
            })
            .map(|(ticker, _)| ticker.to_string())
            .collect();
        if !incomplete.is_empty() {
            return Err(DataError::unavailable(incomplete, "price column is empty or incomplete").into());
        }

        Ok(Self {
            dates,
            tickers,
            columns,
        })
    }

    /// Inner-join per-ticker series on date.
    ///
    /// A date survives only when every ticker has a usable price on it. Tickers
    /// with no usable observation at all are reported together, as are
    /// tickers covering less than [`Self::MIN_COVERAGE`] of the date union;
    /// if no date is shared, all tickers are reported.
    pub fn align(series: Vec<(Ticker, Vec<PricePoint>)>) -> HvResult<Self> {
        if series.is_empty() {
            return Err(validation_error!("At least one ticker is required"));
        }
        let sparse: Vec<CoverageGap> = Self::coverage_gaps(&series)
            .into_iter()
            .filter(|gap| gap.missing < gap.total && gap.coverage() < Self::MIN_COVERAGE)
            .collect();

        let mut by_ticker = Vec::with_capacity(series.len());
        let mut missing = Vec::new();
        for (ticker, points) in series {
            let prices: BTreeMap<NaiveDate, f64> = points
                .into_iter()
                .filter(PricePoint::is_usable)
                .map(|p| (p.date, p.price))
                .collect();
            if prices.is_empty() {
                missing.push(ticker.to_string());
            }
            by_ticker.push((ticker, prices));
        }
        if !missing.is_empty() {
            return Err(DataError::unavailable(missing, "no price observations in range").into());
        }
        if !sparse.is_empty() {
            let reason = sparse.iter().map(ToString::to_string).collect::<Vec<_>>().join("; ");
            let tickers = sparse.into_iter().map(|gap| gap.ticker.to_string()).collect();
            return Err(DataError::unavailable(tickers, format!("too many missing dates: {}", reason)).into());
        }

        let dates: Vec<NaiveDate> = by_ticker[0]
            .1
            .keys()
            .copied()
            .filter(|date| by_ticker.iter().all(|(_, prices)| prices.contains_key(date)))
            .collect();
        if dates.is_empty() {
            let all = by_ticker.iter().map(|(t, _)| t.to_string()).collect();
            return Err(DataError::unavailable(all, "no common trading dates after alignment").into());
        }

        let (tickers, columns) = by_ticker
            .into_iter()
            .map(|(ticker, prices)| {
                let column = dates.iter().map(|d| prices[d]).collect();
                (ticker, column)
            })
            .unzip();

        Ok(Self {
            dates,
            tickers,
            columns,
        })
    }

    pub fn dates(&self) -> &[NaiveDate] {
        &self.dates
    }

    pub fn tickers(&self) -> &[Ticker] {
        &self.tickers
    }

    pub fn columns(&self) -> &[Vec<f64>] {
        &self.columns
    }

    pub fn column(&self, ticker: &Ticker) -> Option<&[f64]> {
        self.tickers
            .iter()
            .position(|t| t == ticker)
            .map(|i| self.columns[i].as_slice())
    }

    /// Number of dated rows.
    pub fn len(&self) -> usize {
        self.dates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.dates.is_empty()
    }
}

/// Simple period-over-period returns of a portfolio value series
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReturnSeries {
    dates: Vec<NaiveDate>,
    values: Vec<f64>,
}

impl ReturnSeries {
    /// Percentage change of `values`; the first observation has no return and
    /// is omitted, so the series is one shorter than its input.
    pub fn from_values(dates: &[NaiveDate], values: &[f64]) -> Self {
        let (dates, values) = dates
            .iter()
            .skip(1)
            .copied()
            .zip(values.windows(2).map(|w| w[1] / w[0] - 1.0))
            .unzip();
        Self { dates, values }
    }

    pub fn dates(&self) -> &[NaiveDate] {
        &self.dates
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }

    pub fn iter(&self) -> impl Iterator<Item = (NaiveDate, f64)> + '_ {
        self.dates.iter().copied().zip(self.values.iter().copied())
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, d).unwrap()
    }

    fn points(values: &[(u32, f64)]) -> Vec<PricePoint> {
        values.iter().map(|&(d, p)| PricePoint::new(day(d), p)).collect()
    }

    #[test]
    fn test_ticker_normalization() {
        let ticker = Ticker::new("  aapl ").unwrap();
        assert_eq!(ticker.as_str(), "AAPL");
        assert_eq!(ticker.to_string(), "AAPL");
        assert!(Ticker::new("   ").unwrap_err().is_validation());
    }

    #[test]
    fn test_ticker_serde_validates() {
        let ticker: Ticker = serde_json::from_str("\" msft\"").unwrap();
        assert_eq!(ticker.as_str(), "MSFT");
        assert!(serde_json::from_str::<Ticker>("\"\"").is_err());
    }

    #[test]
    fn test_lookback_window() {
        assert!(LookbackWindow::new(0).unwrap_err().is_validation());
        let window = LookbackWindow::new(30).unwrap();
        assert_eq!(window.start_from(NaiveDate::from_ymd_opt(2024, 3, 1).unwrap()).unwrap(), NaiveDate::from_ymd_opt(2024, 1, 31).unwrap());
    }

    #[test]
    fn test_lookback_past_date_range_is_validation_error() {
        let window = LookbackWindow::new(u32::MAX).unwrap();
        let err = window.start_from(NaiveDate::from_ymd_opt(2024, 3, 1).unwrap()).unwrap_err();
        assert!(err.is_validation());
    }

    #[test]
    fn test_confidence_level_bounds() {
        assert!(ConfidenceLevel::new(0.95).is_ok());
        assert!(ConfidenceLevel::new(0.0).is_err());
        assert!(ConfidenceLevel::new(1.0).is_err());
        assert!(ConfidenceLevel::new(f64::NAN).is_err());
        let alpha = ConfidenceLevel::new(0.8).unwrap();
        assert!((alpha.tail_probability() - 0.2).abs() < 1e-12);
    }

    #[test]
    fn test_align_inner_joins_dates() {
        let a = Ticker::new("AAA").unwrap();
        let b = Ticker::new("BBB").unwrap();
        let matrix = PriceMatrix::align(vec![
            (a.clone(), points(&[(2, 10.0), (3, 11.0), (4, 12.0)])),
            (b.clone(), points(&[(3, 20.0), (4, 21.0), (5, 22.0)])),
        ])
        .unwrap();

        assert_eq!(matrix.dates(), &[day(3), day(4)]);
        assert_eq!(matrix.column(&a).unwrap(), &[11.0, 12.0]);
        assert_eq!(matrix.column(&b).unwrap(), &[20.0, 21.0]);
    }

    #[test]
    fn test_align_reports_every_missing_ticker() {
        let err = PriceMatrix::align(vec![
            (Ticker::new("AAA").unwrap(), points(&[(2, 10.0)])),
            (Ticker::new("BAD").unwrap(), vec![]),
            (Ticker::new("NAN").unwrap(), points(&[(2, f64::NAN)])),
        ])
        .unwrap_err();

        assert!(err.is_data_unavailable());
        assert_eq!(err.unavailable_tickers(), ["BAD".to_string(), "NAN".to_string()]);
    }

    #[test]
    fn test_align_without_common_dates() {
        let err = PriceMatrix::align(vec![
            (Ticker::new("AAA").unwrap(), points(&[(2, 10.0)])),
            (Ticker::new("BBB").unwrap(), points(&[(3, 10.0)])),
        ])
        .unwrap_err();

        assert_eq!(err.unavailable_tickers().len(), 2);
    }

    #[test]
    fn test_coverage_gaps_count_missing_dates() {
        let a = Ticker::new("AAA").unwrap();
        let b = Ticker::new("BBB").unwrap();
        let series = vec![
            (a, points(&[(2, 10.0), (3, 11.0), (4, 12.0), (5, 13.0)])),
            (b.clone(), points(&[(3, 20.0), (4, f64::NAN), (5, 22.0)])),
        ];

        let gaps = PriceMatrix::coverage_gaps(&series);
        assert_eq!(gaps, vec![CoverageGap { ticker: b, missing: 2, total: 4 }]);
        assert_eq!(gaps[0].to_string(), "BBB lacks 2 of 4 dates");

        // half covered is still enough
        let matrix = PriceMatrix::align(series).unwrap();
        assert_eq!(matrix.dates(), &[day(3), day(5)]);
    }

    #[test]
    fn test_align_rejects_sparse_ticker() {
        let dense: Vec<(u32, f64)> = (1..=10).map(|d| (d, 10.0 + d as f64)).collect();
        let err = PriceMatrix::align(vec![
            (Ticker::new("AAA").unwrap(), points(&dense)),
            (Ticker::new("BBB").unwrap(), points(&[(2, 20.0), (3, 21.0), (4, 22.0)])),
        ])
        .unwrap_err();

        assert!(err.is_data_unavailable());
        assert_eq!(err.unavailable_tickers(), ["BBB".to_string()]);
        assert!(err.to_string().contains("BBB lacks 7 of 10 dates"));
    }

    #[test]
    fn test_from_columns_rejects_incomplete_column() {
        let err = PriceMatrix::from_columns(
            vec![day(2), day(3)],
            vec![Ticker::new("AAA").unwrap()],
            vec![vec![1.0]],
        )
        .unwrap_err();
        assert!(err.is_data_unavailable());
    }

    #[test]
    fn test_return_series_pct_change() {
        let series = ReturnSeries::from_values(&[day(2), day(3), day(4)], &[100.0, 110.0, 99.0]);

        assert_eq!(series.len(), 2);
        assert_eq!(series.dates(), &[day(3), day(4)]);
        assert!((series.values()[0] - 0.10).abs() < 1e-12);
        assert!((series.values()[1] + 0.10).abs() < 1e-12);
    }

    #[test]
    fn test_return_series_single_observation_is_empty() {
        let series = ReturnSeries::from_values(&[day(2)], &[100.0]);
        assert!(series.is_empty());
    }
}
