use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use hv_types::HvResult;

use crate::measures::RiskMeasures;
use crate::portfolio::Portfolio;

/// Summary of one risk computation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskReport {
    pub tickers: Vec<String>,
    /// `None` for an equally weighted portfolio.
    pub weights: Option<Vec<Decimal>>,
    pub confidence_level: f64,
    pub lookback_days: u32,
    pub start: NaiveDate,
    pub end: NaiveDate,
    pub observations: usize,
    pub var: f64,
    pub es: f64,
}

impl RiskReport {
    /// Fails if either measure is undefined for the sample.
    pub fn build(portfolio: &Portfolio, measures: &RiskMeasures) -> HvResult<Self> {
        let (start, end) = portfolio.date_range()?;
        Ok(Self {
            tickers: portfolio.tickers().iter().map(|t| t.to_string()).collect(),
            weights: portfolio.weights().map(|w| w.to_vec()),
            confidence_level: measures.confidence_level().value(),
            lookback_days: portfolio.lookback_window().days(),
            start,
            end,
            observations: measures.observations(),
            var: measures.var()?,
            es: measures.es()?,
        })
    }

    pub fn weighting_label(&self) -> String {
        match &self.weights {
            None => "equally-weighted".to_string(),
            Some(weights) => {
                let parts: Vec<String> = weights.iter().map(|w| w.to_string()).collect();
                format!("[{}]", parts.join(", "))
            }
        }
    }
}
