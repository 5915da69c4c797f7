//! Free-text portfolio requests.
//!
//! Interactive front ends collect the portfolio as plain strings: a
//! comma-separated ticker list, an optional comma-separated weight list, the
//! lookback in days and the confidence level. [`FormInput::parse`] turns those
//! into validated values; every malformed field is a validation error.

use rust_decimal::Decimal;
use std::str::FromStr;

use hv_types::{validation_error, ConfidenceLevel, HvResult, LookbackWindow, Ticker};

use crate::portfolio::Portfolio;

/// Raw form fields as typed by the user.
#[derive(Debug, Clone, Copy, Default)]
pub struct FormInput<'a> {
    pub tickers: &'a str,
    pub lookback: &'a str,
    /// `None` selects equal weighting.
    pub weights: Option<&'a str>,
    pub alpha: &'a str,
}

/// A validated request for one risk computation.
#[derive(Debug, Clone, PartialEq)]
pub struct PortfolioRequest {
    pub tickers: Vec<Ticker>,
    pub weights: Option<Vec<Decimal>>,
    pub lookback_window: LookbackWindow,
    pub confidence_level: ConfidenceLevel,
}

impl PortfolioRequest {
    pub fn portfolio(&self) -> HvResult<Portfolio> {
        Portfolio::new(self.tickers.clone(), self.lookback_window, self.weights.clone())
    }
}

impl FormInput<'_> {
    pub fn parse(&self) -> HvResult<PortfolioRequest> {
        let request = PortfolioRequest {
            tickers: parse_tickers(self.tickers)?,
            weights: self.weights.map(parse_weights).transpose()?,
            lookback_window: parse_lookback(self.lookback)?,
            confidence_level: parse_confidence(self.alpha)?,
        };
        // surface weight/ticker mismatches at parse time
        request.portfolio()?;
        Ok(request)
    }
}

pub fn parse_tickers(raw: &str) -> HvResult<Vec<Ticker>> {
    raw.split(',').map(Ticker::new).collect()
}

pub fn parse_weight(raw: &str) -> HvResult<Decimal> {
    let raw = raw.trim();
    Decimal::from_str(raw)
        .or_else(|_| Decimal::from_scientific(raw))
        .map_err(|_| validation_error!("Invalid weight '{}': expected a number", raw))
}

pub fn parse_weights(raw: &str) -> HvResult<Vec<Decimal>> {
    raw.split(',').map(parse_weight).collect()
}

pub fn parse_lookback(raw: &str) -> HvResult<LookbackWindow> {
    let days: u32 = raw
        .trim()
        .parse()
        .map_err(|_| validation_error!("Invalid lookback '{}': expected a whole number of days", raw.trim()))?;
    LookbackWindow::new(days)
}

pub fn parse_confidence(raw: &str) -> HvResult<ConfidenceLevel> {
    let alpha: f64 = raw
        .trim()
        .parse()
        .map_err(|_| validation_error!("Invalid confidence level '{}': expected a number", raw.trim()))?;
    ConfidenceLevel::new(alpha)
}
