//! Empirical Value-at-Risk and Expected Shortfall.
//!
//! [`RiskMeasures`] takes an immutable snapshot of a return sample. VaR is the
//! `1 - alpha` quantile of that sample (lower tail, so returns are signed and
//! losses negative); ES is the mean of the returns strictly below VaR. Both
//! are computed once and cached for the life of the value.

use std::cell::OnceCell;

use hv_data::PriceSource;
use hv_types::{ConfidenceLevel, HvResult, ReturnSeries, RiskError};

use crate::histogram::ReturnHistogram;
use crate::portfolio::Portfolio;

/// Quantile of an ascending sample with linear interpolation between order
/// statistics at rank `p * (n - 1)`. `None` for an empty sample.
pub fn empirical_quantile(sorted: &[f64], p: f64) -> Option<f64> {
    if sorted.is_empty() {
        return None;
    }
    if sorted.len() == 1 {
        return Some(sorted[0]);
    }

    let rank = p.clamp(0.0, 1.0) * (sorted.len() as f64 - 1.0);
    let lo = rank.floor() as usize;
    let hi = rank.ceil() as usize;
    if lo == hi {
        Some(sorted[lo])
    } else {
        let w = rank - lo as f64;
        Some(sorted[lo] + w * (sorted[hi] - sorted[lo]))
    }
}

#[derive(Debug, Clone)]
pub struct RiskMeasures {
    /// Finite returns, ascending.
    sample: Vec<f64>,
    confidence_level: ConfidenceLevel,
    var: OnceCell<f64>,
    es: OnceCell<f64>,
}

impl RiskMeasures {
    /// Snapshot a return sample. Non-finite observations are dropped.
    pub fn new(returns: &[f64], confidence_level: ConfidenceLevel) -> Self {
        let mut sample: Vec<f64> = returns.iter().copied().filter(|r| r.is_finite()).collect();
        sample.sort_by(|a, b| a.total_cmp(b));

        Self {
            sample,
            confidence_level,
            var: OnceCell::new(),
            es: OnceCell::new(),
        }
    }

    pub fn from_series(returns: &ReturnSeries, confidence_level: ConfidenceLevel) -> Self {
        Self::new(returns.values(), confidence_level)
    }

    /// Snapshot the portfolio's current returns, fetching prices if needed.
    /// Later changes to the portfolio do not affect the snapshot.
    pub async fn from_portfolio(
        portfolio: &mut Portfolio,
        source: &dyn PriceSource,
        confidence_level: ConfidenceLevel,
    ) -> HvResult<Self> {
        let returns = portfolio.returns(source).await?;
        Ok(Self::from_series(returns, confidence_level))
    }

    pub fn confidence_level(&self) -> ConfidenceLevel {
        self.confidence_level
    }

    /// The finite returns the measures are computed from, ascending.
    pub fn sample(&self) -> &[f64] {
        &self.sample
    }

    pub fn observations(&self) -> usize {
        self.sample.len()
    }

    /// Historical VaR: the `1 - alpha` quantile of the return sample.
    pub fn var(&self) -> HvResult<f64> {
        if let Some(var) = self.var.get() {
            return Ok(*var);
        }

        let var = empirical_quantile(&self.sample, self.confidence_level.tail_probability()).ok_or_else(|| {
            RiskError::InsufficientData {
                message: "no finite returns to estimate VaR from".to_string(),
            }
        })?;
        Ok(*self.var.get_or_init(|| var))
    }

    /// Historical ES: the mean of all returns strictly below VaR.
    pub fn es(&self) -> HvResult<f64> {
        if let Some(es) = self.es.get() {
            return Ok(*es);
        }

        let var = self.var()?;
        let tail = &self.sample[..self.sample.partition_point(|&r| r < var)];
        if tail.is_empty() {
            return Err(RiskError::InsufficientData {
                message: format!(
                    "no returns below the VaR cutoff {:.6} across {} observations",
                    var,
                    self.sample.len()
                ),
            }
            .into());
        }

        let es = tail.iter().sum::<f64>() / tail.len() as f64;
        Ok(*self.es.get_or_init(|| es))
    }

    /// Histogram of the sample with VaR and (when defined) ES markers.
    pub fn histogram(&self, bins: usize) -> HvResult<ReturnHistogram> {
        let var = self.var()?;
        let es = self.es().ok();
        ReturnHistogram::new(&self.sample, bins, var, es)
    }
}
