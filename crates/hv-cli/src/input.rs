//! Tickers file parsing.
//!
//! The file is CSV: tickers in the first column and, optionally, portfolio
//! weights in the second. An optional header row is recognised and skipped.

use rust_decimal::Decimal;
use std::fs::File;
use std::io::Read;
use std::path::Path;

use hv_risk::request::parse_weight;
use hv_types::{validation_error, HvResult, Ticker};

const TICKER_HEADERS: [&str; 3] = ["ticker", "tickers", "symbol"];

/// Tickers and optional weights read from a tickers file.
#[derive(Debug, Clone, PartialEq)]
pub struct TickersFile {
    pub tickers: Vec<Ticker>,
    pub weights: Option<Vec<Decimal>>,
}

pub fn read_tickers_file(path: &Path) -> HvResult<TickersFile> {
    let file = File::open(path)?;
    parse_tickers_csv(file)
}

pub fn parse_tickers_csv<R: Read>(reader: R) -> HvResult<TickersFile> {
    let mut csv = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(reader);

    let mut rows = Vec::new();
    for record in csv.records() {
        let record = record.map_err(|e| validation_error!("Malformed tickers file: {}", e))?;
        let cells: Vec<String> = record.iter().map(str::to_string).collect();
        if cells.iter().all(|c| c.is_empty()) {
            continue;
        }
        rows.push(cells);
    }

    let Some(first) = rows.first() else {
        return Err(validation_error!("Tickers file contains no tickers"));
    };
    let has_weights = cell(first, 1).is_some();
    if is_header(first) {
        rows.remove(0);
    }
    if rows.is_empty() {
        return Err(validation_error!("Tickers file contains no tickers"));
    }

    let mut tickers = Vec::with_capacity(rows.len());
    let mut weights = Vec::with_capacity(rows.len());
    for (i, row) in rows.iter().enumerate() {
        let raw = cell(row, 0).ok_or_else(|| validation_error!("Row {} has no ticker", i + 1))?;
        tickers.push(Ticker::new(raw)?);

        if has_weights {
            let raw = cell(row, 1).ok_or_else(|| validation_error!("Row {} ({}) has no weight", i + 1, raw))?;
            weights.push(parse_weight(raw)?);
        }
    }

    Ok(TickersFile {
        tickers,
        weights: has_weights.then_some(weights),
    })
}

fn cell(row: &[String], index: usize) -> Option<&str> {
    row.get(index).map(String::as_str).filter(|c| !c.is_empty())
}

fn is_header(row: &[String]) -> bool {
    match cell(row, 1) {
        Some(second) => parse_weight(second).is_err(),
        None => cell(row, 0).is_some_and(|first| TICKER_HEADERS.contains(&first.to_lowercase().as_str())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn names(file: &TickersFile) -> Vec<&str> {
        file.tickers.iter().map(|t| t.as_str()).collect()
    }

    #[test]
    fn reads_weights_with_header() {
        let file = parse_tickers_csv("Ticker,Weight\neni,0.4\nAAPL,0.6\n".as_bytes()).unwrap();
        assert_eq!(names(&file), vec!["ENI", "AAPL"]);
        assert_eq!(file.weights, Some(vec![dec!(0.4), dec!(0.6)]));
    }

    #[test]
    fn reads_weights_without_header() {
        let file = parse_tickers_csv("ENI, 0.4\nAAPL, 0.6\n".as_bytes()).unwrap();
        assert_eq!(names(&file), vec!["ENI", "AAPL"]);
        assert_eq!(file.weights, Some(vec![dec!(0.4), dec!(0.6)]));
    }

    #[test]
    fn single_column_means_equal_weights() {
        let file = parse_tickers_csv("Symbol\nENI\n\nAAPL\nMSFT\n".as_bytes()).unwrap();
        assert_eq!(names(&file), vec!["ENI", "AAPL", "MSFT"]);
        assert!(file.weights.is_none());

        let bare = parse_tickers_csv("ENI\nAAPL\n".as_bytes()).unwrap();
        assert_eq!(names(&bare), vec!["ENI", "AAPL"]);
    }

    #[test]
    fn missing_weight_is_rejected() {
        let err = parse_tickers_csv("Ticker,Weight\nENI,0.4\nAAPL\n".as_bytes()).unwrap_err();
        assert!(err.is_validation());
        assert!(err.to_string().contains("AAPL"));
    }

    #[test]
    fn non_numeric_weight_is_rejected() {
        let err = parse_tickers_csv("ENI,0.4\nAAPL,lots\n".as_bytes()).unwrap_err();
        assert!(err.is_validation());
    }

    #[test]
    fn empty_file_is_rejected() {
        assert!(parse_tickers_csv("".as_bytes()).unwrap_err().is_validation());
        assert!(parse_tickers_csv("Ticker,Weight\n".as_bytes()).unwrap_err().is_validation());
    }

    #[test]
    fn missing_file_is_an_io_error() {
        let err = read_tickers_file(Path::new("/nonexistent/tickers.csv")).unwrap_err();
        assert!(matches!(err, hv_types::HvError::Io(_)));
    }
}
