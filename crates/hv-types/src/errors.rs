use thiserror::Error;

/// Main error type for the HistVaR system
#[derive(Error, Debug)]
pub enum HvError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Data error: {0}")]
    Data(#[from] DataError),

    #[error("Risk error: {0}")]
    Risk(#[from] RiskError),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl HvError {
    pub fn is_validation(&self) -> bool {
        matches!(self, HvError::Validation(_))
    }

    pub fn is_data_unavailable(&self) -> bool {
        matches!(self, HvError::Data(DataError::Unavailable { .. }))
    }

    pub fn is_insufficient_data(&self) -> bool {
        matches!(self, HvError::Risk(RiskError::InsufficientData { .. }))
    }

    /// Tickers named by a data-unavailable error, empty for every other kind.
    pub fn unavailable_tickers(&self) -> &[String] {
        match self {
            HvError::Data(DataError::Unavailable { tickers, .. }) => tickers,
            _ => &[],
        }
    }
}

/// Price data errors
#[derive(Error, Debug)]
pub enum DataError {
    #[error("No usable price data for tickers {tickers:?}: {reason}")]
    Unavailable { tickers: Vec<String>, reason: String },

    #[error("Data source not found: {0}")]
    SourceNotFound(String),

    #[error("Data parsing error: {message}")]
    ParseError { message: String },
}

impl DataError {
    pub fn unavailable<S: Into<String>>(tickers: Vec<String>, reason: S) -> Self {
        DataError::Unavailable {
            tickers,
            reason: reason.into(),
        }
    }
}

/// Risk measure errors
#[derive(Error, Debug)]
pub enum RiskError {
    #[error("Insufficient data: {message}")]
    InsufficientData { message: String },
}

/// Result type alias for HistVaR operations
pub type HvResult<T> = Result<T, HvError>;

/// Macro for creating validation errors
#[macro_export]
macro_rules! validation_error {
    ($($arg:tt)*) => {
        $crate::HvError::Validation(format!($($arg)*))
    };
}

/// Macro for creating configuration errors
#[macro_export]
macro_rules! config_error {
    ($($arg:tt)*) => {
        $crate::HvError::Config(format!($($arg)*))
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let error = DataError::unavailable(vec!["ENI".into(), "XYZ".into()], "empty response");

        assert!(error.to_string().contains("ENI"));
        assert!(error.to_string().contains("XYZ"));
        assert!(error.to_string().contains("empty response"));
    }

    #[test]
    fn test_error_conversion() {
        let data_error = DataError::unavailable(vec!["AAPL".into()], "timeout");
        let hv_error: HvError = data_error.into();

        assert!(hv_error.is_data_unavailable());
        assert!(!hv_error.is_validation());
        assert_eq!(hv_error.unavailable_tickers(), ["AAPL".to_string()]);
    }

    #[test]
    fn test_parse_error_is_not_unavailable() {
        let hv_error: HvError = DataError::ParseError {
            message: "bad row".into(),
        }
        .into();
        assert!(!hv_error.is_data_unavailable());
        assert!(hv_error.unavailable_tickers().is_empty());
    }

    #[test]
    fn test_risk_error_kind() {
        let hv_error: HvError = RiskError::InsufficientData {
            message: "empty tail".into(),
        }
        .into();
        assert!(hv_error.is_insufficient_data());
    }

    #[test]
    fn test_macros() {
        let validation_err = validation_error!("Invalid value: {}", 42);
        assert!(validation_err.is_validation());
        let config_err = config_error!("Missing required field: {}", "source");
        assert!(matches!(config_err, HvError::Config(_)));
    }
}
