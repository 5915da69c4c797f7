use async_trait::async_trait;
use chrono::{Datelike, Duration, NaiveDate, Weekday};
use csv::ReaderBuilder;
use hv_types::{validation_error, DataError, HvResult, PriceMatrix, PricePoint, Ticker};
use parking_lot::RwLock;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::Deserialize;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};

/// Source of adjusted closing price histories (HTTP APIs, local files, etc.)
#[async_trait]
pub trait PriceSource: Send + Sync + std::fmt::Debug {
    /// Fetch the adjusted closes of one ticker within `[start, end]`, oldest first
    async fn fetch_series(
        &self,
        ticker: &Ticker,
        start: NaiveDate,
        end: NaiveDate,
    ) -> HvResult<Vec<PricePoint>>;

    /// Get source name
    fn name(&self) -> &str;

    /// Get source configuration
    fn config(&self) -> serde_json::Value;

    /// Fetch every ticker and align the results into a [`PriceMatrix`].
    ///
    /// Failures are collected across all tickers and reported together as a
    /// single data-unavailable error.
    async fn fetch_prices(
        &self,
        tickers: &[Ticker],
        start: NaiveDate,
        end: NaiveDate,
    ) -> HvResult<PriceMatrix> {
        if tickers.is_empty() {
            return Err(validation_error!("At least one ticker is required"));
        }
        if start > end {
            return Err(validation_error!("Start date {} is after end date {}", start, end));
        }

        tracing::debug!("Fetching {} tickers from {} ({} to {})", tickers.len(), self.name(), start, end);

        let mut series = Vec::with_capacity(tickers.len());
        let mut failed = Vec::new();
        let mut reasons = Vec::new();

        for ticker in tickers {
            match self.fetch_series(ticker, start, end).await {
                Ok(points) => series.push((ticker.clone(), points)),
                Err(e) => {
                    tracing::warn!("Price fetch for {} from {} failed: {}", ticker, self.name(), e);
                    failed.push(ticker.to_string());
                    reasons.push(format!("{}: {}", ticker, e));
                }
            }
        }

        if !failed.is_empty() {
            return Err(DataError::unavailable(failed, reasons.join("; ")).into());
        }

        for gap in PriceMatrix::coverage_gaps(&series) {
            tracing::warn!(
                "{} from {}: {:.1}% coverage, its missing dates are dropped from every ticker",
                gap,
                self.name(),
                gap.coverage() * 100.0
            );
        }

        let matrix = PriceMatrix::align(series)?;
        tracing::debug!("Aligned {} price rows from {}", matrix.len(), self.name());
        Ok(matrix)
    }
}

/// CSV price source for loading local files, one file per ticker
#[derive(Debug)]
pub struct CsvPriceSource {
    pub name: String,
    pub data_directory: PathBuf,
    pub file_pattern: String,
}

#[derive(Debug, Deserialize)]
struct CsvRecord {
    #[serde(alias = "Date", alias = "date")]
    timestamp: String,
    #[serde(rename = "Adj Close", alias = "adj_close", alias = "adjclose", default)]
    adj_close: Option<f64>,
    #[serde(alias = "Close", alias = "close", default)]
    close: Option<f64>,
}

impl CsvPriceSource {
    pub fn new<P: AsRef<Path>>(data_directory: P) -> Self {
        Self {
            name: "CSV Source".to_string(),
            data_directory: data_directory.as_ref().to_path_buf(),
            file_pattern: "{ticker}.csv".to_string(),
        }
    }

    pub fn with_pattern(mut self, pattern: &str) -> Self {
        self.file_pattern = pattern.to_string();
        self
    }

    fn get_file_path(&self, ticker: &Ticker) -> PathBuf {
        let filename = self.file_pattern.replace("{ticker}", ticker.as_str());
        self.data_directory.join(filename)
    }

    fn parse_date(raw: &str) -> HvResult<NaiveDate> {
        let raw = raw.trim();
        NaiveDate::parse_from_str(raw, "%Y-%m-%d")
            .or_else(|_| chrono::DateTime::parse_from_rfc3339(raw).map(|dt| dt.date_naive()))
            .or_else(|_| chrono::NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S").map(|dt| dt.date()))
            .map_err(|e| {
                DataError::ParseError {
                    message: format!("Date parsing error for '{}': {}", raw, e),
                }
                .into()
            })
    }
}

#[async_trait]
impl PriceSource for CsvPriceSource {
    async fn fetch_series(
        &self,
        ticker: &Ticker,
        start: NaiveDate,
        end: NaiveDate,
    ) -> HvResult<Vec<PricePoint>> {
        let file_path = self.get_file_path(ticker);

        if !file_path.exists() {
            return Err(DataError::SourceNotFound(file_path.to_string_lossy().to_string()).into());
        }

        let file = std::fs::File::open(&file_path)?;
        let mut reader = ReaderBuilder::new().has_headers(true).from_reader(file);

        let mut points = Vec::new();

        for result in reader.deserialize() {
            let record: CsvRecord = result.map_err(|e| DataError::ParseError {
                message: format!("CSV parsing error in {}: {}", file_path.display(), e),
            })?;

            let date = Self::parse_date(&record.timestamp)?;
            if date < start || date > end {
                continue;
            }
            if let Some(price) = record.adj_close.or(record.close) {
                points.push(PricePoint::new(date, price));
            }
        }

        points.sort_by_key(|p| p.date);
        tracing::debug!("Loaded {} prices for {} from {}", points.len(), ticker, file_path.display());
        Ok(points)
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn config(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "csv",
            "directory": self.data_directory,
            "pattern": self.file_pattern
        })
    }
}

/// Deterministic synthetic prices for demos and offline runs
#[derive(Debug)]
pub struct SamplePriceSource {
    pub name: String,
}

impl SamplePriceSource {
    pub fn new() -> Self {
        Self {
            name: "Sample Source".to_string(),
        }
    }

    fn seed_for(ticker: &Ticker) -> u64 {
        // FNV-1a, stable across runs and toolchains
        ticker
            .as_str()
            .bytes()
            .fold(0xcbf2_9ce4_8422_2325u64, |hash, b| (hash ^ u64::from(b)).wrapping_mul(0x0100_0000_01b3))
    }
}

impl Default for SamplePriceSource {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PriceSource for SamplePriceSource {
    async fn fetch_series(
        &self,
        ticker: &Ticker,
        start: NaiveDate,
        end: NaiveDate,
    ) -> HvResult<Vec<PricePoint>> {
        let seed = Self::seed_for(ticker);
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        let mut price = 50.0 + (seed % 200) as f64;

        let mut points = Vec::new();
        let mut date = start;
        while date <= end {
            if !matches!(date.weekday(), Weekday::Sat | Weekday::Sun) {
                points.push(PricePoint::new(date, price));
                price *= 1.0 + rng.gen_range(-0.02..0.02);
            }
            date += Duration::days(1);
        }

        Ok(points)
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn config(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "sample"
        })
    }
}

/// In-memory price source backed by fixed series, useful for tests and embedding
#[derive(Debug, Default)]
pub struct MemoryPriceSource {
    series: RwLock<HashMap<Ticker, Vec<PricePoint>>>,
    fetches: AtomicUsize,
}

impl MemoryPriceSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_series(self, ticker: Ticker, points: Vec<PricePoint>) -> Self {
        self.insert(ticker, points);
        self
    }

    /// Insert or replace the series served for `ticker`.
    pub fn insert(&self, ticker: Ticker, points: Vec<PricePoint>) {
        self.series.write().insert(ticker, points);
    }

    /// Number of `fetch_series` calls served so far.
    pub fn fetch_count(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PriceSource for MemoryPriceSource {
    async fn fetch_series(
        &self,
        ticker: &Ticker,
        start: NaiveDate,
        end: NaiveDate,
    ) -> HvResult<Vec<PricePoint>> {
        self.fetches.fetch_add(1, Ordering::SeqCst);

        let series = self.series.read();
        let points = series.get(ticker).ok_or_else(|| DataError::SourceNotFound(ticker.to_string()))?;
        let mut points: Vec<PricePoint> = points
            .iter()
            .filter(|p| p.date >= start && p.date <= end)
            .copied()
            .collect();
        points.sort_by_key(|p| p.date);
        Ok(points)
    }

    fn name(&self) -> &str {
        "Memory Source"
    }

    fn config(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "memory",
            "tickers": self.series.read().keys().map(|t| t.to_string()).collect::<Vec<_>>()
        })
    }
}
