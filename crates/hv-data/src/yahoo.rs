//! Yahoo Finance chart API source.
//!
//! Queries the v8 chart endpoint for daily bars and reads the `adjclose`
//! indicator, falling back to `close` when adjusted prices are absent.

use async_trait::async_trait;
use chrono::{DateTime, Duration, NaiveDate};
use hv_types::{config_error, DataError, HvResult, PricePoint, Ticker};
use serde::Deserialize;

use crate::providers::PriceSource;

pub const DEFAULT_YAHOO_URL: &str = "https://query1.finance.yahoo.com/v8/finance/chart";

const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36";

#[derive(Debug, Deserialize)]
struct ChartResponse {
    chart: Chart,
}

#[derive(Debug, Deserialize)]
struct Chart {
    result: Option<Vec<ChartData>>,
    error: Option<ChartError>,
}

#[derive(Debug, Deserialize)]
struct ChartError {
    code: String,
    description: String,
}

#[derive(Debug, Deserialize)]
struct ChartData {
    meta: Option<ChartMeta>,
    #[serde(default)]
    timestamp: Vec<i64>,
    indicators: Indicators,
}

#[derive(Debug, Deserialize)]
struct ChartMeta {
    gmtoffset: Option<i64>,
}

#[derive(Debug, Deserialize)]
struct Indicators {
    #[serde(default)]
    quote: Vec<QuoteData>,
    adjclose: Option<Vec<AdjClose>>,
}

#[derive(Debug, Deserialize)]
struct QuoteData {
    #[serde(default)]
    close: Vec<Option<f64>>,
}

#[derive(Debug, Deserialize)]
struct AdjClose {
    #[serde(default)]
    adjclose: Vec<Option<f64>>,
}

/// Yahoo Finance daily adjusted-close source
#[derive(Debug)]
pub struct YahooPriceSource {
    pub name: String,
    pub base_url: String,
    pub timeout: std::time::Duration,
    client: reqwest::Client,
}

impl YahooPriceSource {
    pub fn new(base_url: &str, timeout: std::time::Duration) -> HvResult<Self> {
        let client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(timeout)
            .build()
            .map_err(|e| config_error!("Failed to build HTTP client: {}", e))?;

        Ok(Self {
            name: "Yahoo Finance".to_string(),
            base_url: base_url.trim_end_matches('/').to_string(),
            timeout,
            client,
        })
    }

    fn build_url(&self, ticker: &Ticker, start: NaiveDate, end: NaiveDate) -> String {
        // period2 is exclusive, so push it to the start of the following day
        let period1 = start.and_hms_opt(0, 0, 0).unwrap_or_default().and_utc().timestamp();
        let period2 = (end + Duration::days(1))
            .and_hms_opt(0, 0, 0)
            .unwrap_or_default()
            .and_utc()
            .timestamp();

        format!(
            "{}/{}?period1={}&period2={}&interval=1d&events=div%2Csplit",
            self.base_url,
            ticker.as_str(),
            period1,
            period2
        )
    }

    fn unavailable(ticker: &Ticker, reason: String) -> hv_types::HvError {
        DataError::unavailable(vec![ticker.to_string()], reason).into()
    }

    /// Parse a chart response body into dated adjusted closes.
    pub(crate) fn parse_chart(
        ticker: &Ticker,
        body: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> HvResult<Vec<PricePoint>> {
        let response: ChartResponse = serde_json::from_str(body).map_err(|e| DataError::ParseError {
            message: format!("Failed to parse chart response for {}: {}", ticker, e),
        })?;

        if let Some(error) = response.chart.error {
            return Err(Self::unavailable(
                ticker,
                format!("API error [{}]: {}", error.code, error.description),
            ));
        }

        let data = response
            .chart
            .result
            .and_then(|results| results.into_iter().next())
            .ok_or_else(|| Self::unavailable(ticker, "empty chart response".to_string()))?;

        let offset = data.meta.and_then(|m| m.gmtoffset).unwrap_or(0);
        let adjusted = data.indicators.adjclose.and_then(|a| a.into_iter().next()).map(|a| a.adjclose);
        let closes = data.indicators.quote.into_iter().next().map(|q| q.close);
        let prices = adjusted.or(closes).unwrap_or_default();

        let mut points: Vec<PricePoint> = data
            .timestamp
            .iter()
            .zip(prices)
            .filter_map(|(&ts, price)| {
                let date = DateTime::from_timestamp(ts + offset, 0)?.date_naive();
                Some(PricePoint::new(date, price?))
            })
            .filter(|p| p.date >= start && p.date <= end)
            .collect();

        points.sort_by_key(|p| p.date);
        points.dedup_by_key(|p| p.date);
        Ok(points)
    }
}

#[async_trait]
impl PriceSource for YahooPriceSource {
    async fn fetch_series(
        &self,
        ticker: &Ticker,
        start: NaiveDate,
        end: NaiveDate,
    ) -> HvResult<Vec<PricePoint>> {
        tracing::info!("Fetching {} from Yahoo Finance ({} to {})", ticker, start, end);

        let url = self.build_url(ticker, start, end);
        let response = self.client.get(&url).send().await.map_err(|e| {
            if e.is_timeout() {
                Self::unavailable(ticker, format!("request timed out after {}s", self.timeout.as_secs()))
            } else {
                Self::unavailable(ticker, format!("HTTP request failed: {}", e))
            }
        })?;

        let status = response.status();
        let body = response.text().await.map_err(|e| {
            if e.is_timeout() {
                Self::unavailable(ticker, format!("response timed out after {}s", self.timeout.as_secs()))
            } else {
                Self::unavailable(ticker, format!("Failed to read response: {}", e))
            }
        })?;

        // Yahoo reports unknown symbols as a 404 with a chart error body
        if !status.is_success() && !body.contains("\"chart\"") {
            return Err(Self::unavailable(ticker, format!("HTTP error: {}", status)));
        }

        let points = Self::parse_chart(ticker, &body, start, end)?;
        tracing::info!("Retrieved {} prices from Yahoo Finance for {}", points.len(), ticker);
        Ok(points)
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn config(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "yahoo",
            "base_url": self.base_url,
            "timeout_secs": self.timeout.as_secs()
        })
    }
}
