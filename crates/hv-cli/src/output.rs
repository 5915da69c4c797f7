//! Output formatting utilities.

use std::io::Write;

use hv_risk::{ReturnHistogram, RiskReport};

use crate::cli::OutputFormat;

const RULE: &str = "****************************************";
const BAR_WIDTH: usize = 40;

pub fn write_report<W: Write>(out: &mut W, report: &RiskReport, format: OutputFormat) -> anyhow::Result<()> {
    match format {
        OutputFormat::Text => write_text(out, report)?,
        OutputFormat::Json => writeln!(out, "{}", serde_json::to_string_pretty(report)?)?,
    }
    Ok(())
}

fn write_text<W: Write>(out: &mut W, report: &RiskReport) -> std::io::Result<()> {
    let alpha = format_percent(report.confidence_level);

    writeln!(out)?;
    writeln!(out, "**************** RESULT ****************")?;
    writeln!(out, "{}", RULE)?;
    writeln!(out)?;
    writeln!(out, "Stocks in the portfolio: [{}]", report.tickers.join(", "))?;
    writeln!(out, "Portfolio weights: {}", report.weighting_label())?;
    writeln!(out, "Portfolio Var (alpha={}): {}", alpha, format_percent(report.var))?;
    writeln!(out, "Portfolio ES (alpha={}): {}", alpha, format_percent(report.es))?;
    writeln!(out)?;
    writeln!(out, "{}", RULE)?;
    writeln!(out, "{}", RULE)?;
    writeln!(out)
}

/// Horizontal bar chart of the histogram, marking the bins holding VaR and ES.
pub fn write_histogram<W: Write>(out: &mut W, histogram: &ReturnHistogram) -> std::io::Result<()> {
    let peak = histogram.counts.iter().copied().max().unwrap_or(0).max(1);
    let var_bin = histogram.bin_of(histogram.var);

    writeln!(out, "Return distribution ({} observations)", histogram.total())?;
    for (i, &count) in histogram.counts.iter().enumerate() {
        let (lo, hi) = histogram.edges(i);
        let bar = "#".repeat((count * BAR_WIDTH).div_ceil(peak));

        let mut markers = Vec::new();
        if let Some(es) = histogram.es.filter(|&es| histogram.bin_of(es) == i) {
            markers.push(format!("ES {}", format_percent(es)));
        }
        if var_bin == i {
            markers.push(format!("VaR {}", format_percent(histogram.var)));
        }
        let markers = if markers.is_empty() {
            String::new()
        } else {
            format!("  <- {}", markers.join(", "))
        };

        writeln!(
            out,
            "{:>8} .. {:>8} | {:<width$} {:>4}{}",
            format_percent(lo),
            format_percent(hi),
            bar,
            count,
            markers,
            width = BAR_WIDTH
        )?;
    }
    Ok(())
}

/// Formats a fraction as a percentage with two decimals.
pub fn format_percent(value: f64) -> String {
    format!("{:.2}%", value * 100.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn report() -> RiskReport {
        RiskReport {
            tickers: vec!["ENI".to_string(), "AAPL".to_string()],
            weights: None,
            confidence_level: 0.95,
            lookback_days: 365,
            start: NaiveDate::from_ymd_opt(2023, 6, 30).unwrap(),
            end: NaiveDate::from_ymd_opt(2024, 6, 30).unwrap(),
            observations: 250,
            var: -0.023_14,
            es: -0.031,
        }
    }

    fn render(format: OutputFormat) -> String {
        let mut buf = Vec::new();
        write_report(&mut buf, &report(), format).unwrap();
        String::from_utf8(buf).unwrap()
    }

    #[test]
    fn formats_percentages() {
        assert_eq!(format_percent(0.95), "95.00%");
        assert_eq!(format_percent(-0.023_14), "-2.31%");
    }

    #[test]
    fn text_report_has_result_lines() {
        let text = render(OutputFormat::Text);
        assert!(text.contains("**************** RESULT ****************"));
        assert!(text.contains("Stocks in the portfolio: [ENI, AAPL]"));
        assert!(text.contains("Portfolio weights: equally-weighted"));
        assert!(text.contains("Portfolio Var (alpha=95.00%): -2.31%"));
        assert!(text.contains("Portfolio ES (alpha=95.00%): -3.10%"));
    }

    #[test]
    fn json_report_round_trips() {
        let parsed: RiskReport = serde_json::from_str(&render(OutputFormat::Json)).unwrap();
        assert_eq!(parsed, report());
    }

    #[test]
    fn histogram_marks_cutoffs() {
        let sample = [-0.08, -0.05, -0.02, 0.01, 0.03];
        let histogram = ReturnHistogram::new(&sample, 2, -0.056, Some(-0.08)).unwrap();

        let mut buf = Vec::new();
        write_histogram(&mut buf, &histogram).unwrap();
        let text = String::from_utf8(buf).unwrap();
        let lines: Vec<&str> = text.lines().collect();

        assert_eq!(lines.len(), 3);
        assert!(lines[0].contains("5 observations"));
        assert!(lines[1].contains("<- ES -8.00%, VaR -5.60%"));
        assert!(!lines[2].contains("<-"));
    }
}
