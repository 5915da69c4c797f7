//! Return distribution histogram with VaR/ES cutoff markers.

use serde::{Deserialize, Serialize};

use hv_types::{validation_error, HvResult, LookbackWindow, RiskError};

/// Default bin count for a lookback window: `round(sqrt(days))`, at least one.
pub fn bins_for_lookback(window: LookbackWindow) -> usize {
    (f64::from(window.days()).sqrt().round() as usize).max(1)
}

/// Equal-width bins over a return sample.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReturnHistogram {
    /// Lower edge of the first bin.
    pub min: f64,
    /// Upper edge of the last bin.
    pub max: f64,
    pub counts: Vec<usize>,
    pub var: f64,
    pub es: Option<f64>,
}

impl ReturnHistogram {
    pub fn new(sample: &[f64], bins: usize, var: f64, es: Option<f64>) -> HvResult<Self> {
        if bins == 0 {
            return Err(validation_error!("Histogram needs at least one bin"));
        }

        let finite = sample.iter().copied().filter(|r| r.is_finite());
        let (min, max) = finite.clone().fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), r| (lo.min(r), hi.max(r)));
        if min > max {
            return Err(RiskError::InsufficientData {
                message: "no finite returns to bin".to_string(),
            }
            .into());
        }

        let mut histogram = Self {
            min,
            max,
            counts: vec![0; bins],
            var,
            es,
        };
        for r in finite {
            let bin = histogram.bin_of(r);
            histogram.counts[bin] += 1;
        }
        Ok(histogram)
    }

    pub fn bins(&self) -> usize {
        self.counts.len()
    }

    pub fn bin_width(&self) -> f64 {
        (self.max - self.min) / self.counts.len() as f64
    }

    /// Bin index of `value`, clamped to the outer bins.
    pub fn bin_of(&self, value: f64) -> usize {
        let width = self.bin_width();
        if width <= 0.0 {
            return 0;
        }
        let idx = ((value - self.min) / width).floor();
        (idx.max(0.0) as usize).min(self.counts.len() - 1)
    }

    /// `(lower, upper)` edges of bin `i`.
    pub fn edges(&self, i: usize) -> (f64, f64) {
        let width = self.bin_width();
        (self.min + width * i as f64, self.min + width * (i + 1) as f64)
    }

    pub fn total(&self) -> usize {
        self.counts.iter().sum()
    }

    /// Probability densities per bin (area sums to one); all mass in the
    /// single bin when the sample has zero spread.
    pub fn densities(&self) -> Vec<f64> {
        let total = self.total() as f64;
        let width = self.bin_width();
        self.counts
            .iter()
            .map(|&c| {
                if width > 0.0 {
                    c as f64 / (total * width)
                } else {
                    c as f64 / total
                }
            })
            .collect()
    }
}
