//! Portfolio model.
//!
//! A [`Portfolio`] owns its raw inputs (tickers, lookback window, optional
//! weights, as-of date) and two derived slots: the fetched [`PriceMatrix`] and
//! the portfolio [`ReturnSeries`]. Each slot is filled on first access and
//! cleared by every setter.

use chrono::{NaiveDate, Utc};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use std::collections::HashSet;

use hv_data::PriceSource;
use hv_types::{validation_error, DataError, HvError, HvResult, LookbackWindow, PriceMatrix, ReturnSeries, Ticker};

#[derive(Debug, Clone, PartialEq)]
pub struct Portfolio {
    tickers: Vec<Ticker>,
    lookback_window: LookbackWindow,
    weights: Option<Vec<Decimal>>,
    as_of: Option<NaiveDate>,
    prices: Option<PriceMatrix>,
    returns: Option<ReturnSeries>,
}

impl Portfolio {
    /// Build a portfolio. Without weights every ticker gets `1/N`.
    pub fn new(
        tickers: Vec<Ticker>,
        lookback_window: LookbackWindow,
        weights: Option<Vec<Decimal>>,
    ) -> HvResult<Self> {
        Self::validate(&tickers, weights.as_deref())?;
        Ok(Self {
            tickers,
            lookback_window,
            weights,
            as_of: None,
            prices: None,
            returns: None,
        })
    }

    /// Weights must match the tickers one to one and sum to exactly one.
    fn validate(tickers: &[Ticker], weights: Option<&[Decimal]>) -> HvResult<()> {
        if tickers.is_empty() {
            return Err(validation_error!("Portfolio needs at least one ticker"));
        }

        let mut seen = HashSet::with_capacity(tickers.len());
        if let Some(dup) = tickers.iter().find(|t| !seen.insert(*t)) {
            return Err(validation_error!("Ticker {} appears more than once", dup));
        }

        if let Some(weights) = weights {
            if weights.len() != tickers.len() {
                return Err(validation_error!(
                    "Weight vector and tickers list must have same length ({} weights, {} tickers)",
                    weights.len(),
                    tickers.len()
                ));
            }
            let total: Decimal = weights.iter().sum();
            if total != Decimal::ONE {
                return Err(validation_error!("Weights must sum to one, got {}", total));
            }
        }

        Ok(())
    }

    fn invalidate(&mut self) {
        self.prices = None;
        self.returns = None;
    }

    pub fn tickers(&self) -> &[Ticker] {
        &self.tickers
    }

    pub fn set_tickers(&mut self, tickers: Vec<Ticker>) -> HvResult<()> {
        Self::validate(&tickers, self.weights.as_deref())?;
        self.tickers = tickers;
        self.invalidate();
        Ok(())
    }

    pub fn lookback_window(&self) -> LookbackWindow {
        self.lookback_window
    }

    pub fn set_lookback_window(&mut self, lookback_window: LookbackWindow) {
        self.lookback_window = lookback_window;
        self.invalidate();
    }

    pub fn weights(&self) -> Option<&[Decimal]> {
        self.weights.as_deref()
    }

    pub fn set_weights(&mut self, weights: Option<Vec<Decimal>>) -> HvResult<()> {
        Self::validate(&self.tickers, weights.as_deref())?;
        self.weights = weights;
        self.invalidate();
        Ok(())
    }

    /// Replace tickers and weights together, for changes that would fail the
    /// length check one setter at a time.
    pub fn set_composition(&mut self, tickers: Vec<Ticker>, weights: Option<Vec<Decimal>>) -> HvResult<()> {
        Self::validate(&tickers, weights.as_deref())?;
        self.tickers = tickers;
        self.weights = weights;
        self.invalidate();
        Ok(())
    }

    /// Last day of the price query; `None` means today.
    pub fn as_of(&self) -> Option<NaiveDate> {
        self.as_of
    }

    pub fn set_as_of(&mut self, as_of: Option<NaiveDate>) {
        self.as_of = as_of;
        self.invalidate();
    }

    pub fn is_equally_weighted(&self) -> bool {
        self.weights.is_none()
    }

    /// `[end - lookback, end]` where `end` is the as-of date or today (UTC).
    /// Fails when the window starts before the earliest representable date.
    pub fn date_range(&self) -> HvResult<(NaiveDate, NaiveDate)> {
        let end = self.as_of.unwrap_or_else(|| Utc::now().date_naive());
        Ok((self.lookback_window.start_from(end)?, end))
    }

    /// Weights as floats, `1/N` each for an equally weighted portfolio.
    pub fn effective_weights(&self) -> HvResult<Vec<f64>> {
        match &self.weights {
            None => {
                let n = self.tickers.len() as f64;
                Ok(vec![1.0 / n; self.tickers.len()])
            }
            Some(weights) => weights
                .iter()
                .map(|w| w.to_f64().ok_or_else(|| validation_error!("Weight {} is not representable", w)))
                .collect(),
        }
    }

    /// Whether the return series is currently cached.
    pub fn is_cached(&self) -> bool {
        self.returns.is_some()
    }

    pub fn cached_prices(&self) -> Option<&PriceMatrix> {
        self.prices.as_ref()
    }

    pub fn cached_returns(&self) -> Option<&ReturnSeries> {
        self.returns.as_ref()
    }

    /// Adjusted closes for the lookback window, fetched on first use.
    pub async fn prices(&mut self, source: &dyn PriceSource) -> HvResult<&PriceMatrix> {
        let prices = match self.prices.take() {
            Some(prices) => prices,
            None => {
                let (start, end) = self.date_range()?;
                source.fetch_prices(&self.tickers, start, end).await?
            }
        };
        Ok(self.prices.insert(prices))
    }

    /// Simple returns of the portfolio value, computed on first use.
    pub async fn returns(&mut self, source: &dyn PriceSource) -> HvResult<&ReturnSeries> {
        let returns = match self.returns.take() {
            Some(returns) => returns,
            None => {
                let weights = self.effective_weights()?;
                let tickers = self.tickers.clone();
                let prices = self.prices(source).await?;
                Self::compute_returns(&tickers, prices, &weights)?
            }
        };
        Ok(self.returns.insert(returns))
    }

    fn compute_returns(tickers: &[Ticker], prices: &PriceMatrix, weights: &[f64]) -> HvResult<ReturnSeries> {
        let columns = tickers
            .iter()
            .map(|t| {
                prices
                    .column(t)
                    .ok_or_else(|| HvError::from(DataError::unavailable(vec![t.to_string()], "missing from price matrix")))
            })
            .collect::<HvResult<Vec<&[f64]>>>()?;

        // A lone ticker is its own portfolio, no weighting applied
        let values: Vec<f64> = if columns.len() == 1 {
            columns[0].to_vec()
        } else {
            (0..prices.len())
                .map(|row| columns.iter().zip(weights).map(|(col, w)| w * col[row]).sum::<f64>())
                .collect()
        };

        Ok(ReturnSeries::from_values(prices.dates(), &values))
    }
}
