//! Historical risk model for HistVaR.
//!
//! Provides:
//! - [`Portfolio`]: tickers, lookback and weights, with lazily derived prices
//!   and returns that are invalidated whenever an input changes
//! - [`RiskMeasures`]: empirical VaR and expected shortfall over a snapshot of
//!   portfolio returns
//! - [`ReturnHistogram`] and [`RiskReport`] for presenting a run
//! - [`FormInput`] parsing of free-text portfolio requests

pub mod histogram;
pub mod measures;
pub mod portfolio;
pub mod report;
pub mod request;

pub use histogram::{bins_for_lookback, ReturnHistogram};
pub use measures::{empirical_quantile, RiskMeasures};
pub use portfolio::Portfolio;
pub use report::RiskReport;
pub use request::{FormInput, PortfolioRequest};
