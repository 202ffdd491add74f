use log::debug;
use serde::{Deserialize, Serialize};

use super::MetricResult;
use crate::record::BuildRecord;

/// Running summary of build durations.
///
/// Keeps the count, the sum and the sum of squares as exact integers, so the standard
/// deviation is the same whatever order the records were added in, and adding records
/// one at a time gives exactly the batch result for the same set. Durations large
/// enough to overflow those integers fall back to floating-point sums.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct DispersionAccumulator {
    count: u64,
    sums: Sums,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
enum Sums {
    Exact { sum: u128, sum_sq: u128 },
    /// Entered for good once an exact sum no longer fits in a u128
    Approximate { sum: f64, sum_sq: f64 },
}

impl Default for Sums {
    fn default() -> Self {
        Self::Exact { sum: 0, sum_sq: 0 }
    }
}

impl Sums {
    #[allow(clippy::cast_precision_loss)]
    fn with(self, duration: u64) -> Self {
        match self {
            Self::Exact { sum, sum_sq } => {
                let duration = u128::from(duration);
                // u64::MAX² still fits in a u128, only the running totals can overflow
                match sum.checked_add(duration).zip(sum_sq.checked_add(duration * duration)) {
                    Some((sum, sum_sq)) => Self::Exact { sum, sum_sq },
                    None => Self::Approximate {
                        sum: sum as f64 + duration as f64,
                        sum_sq: sum_sq as f64 + (duration * duration) as f64,
                    },
                }
            }
            Self::Approximate { sum, sum_sq } => {
                let duration = duration as f64;
                Self::Approximate {
                    sum: sum + duration,
                    sum_sq: sum_sq + duration * duration,
                }
            }
        }
    }

    #[allow(clippy::cast_precision_loss)]
    fn as_f64(self) -> (f64, f64) {
        match self {
            Self::Exact { sum, sum_sq } => (sum as f64, sum_sq as f64),
            Self::Approximate { sum, sum_sq } => (sum, sum_sq),
        }
    }
}

impl DispersionAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Summarizes a complete set of records at once.
    pub fn from_records<'a, I>(records: I) -> Self
    where
        I: IntoIterator<Item = &'a BuildRecord>,
    {
        records.into_iter().fold(Self::new(), Self::with)
    }

    /// Returns the summary extended by one record.
    #[must_use]
    pub fn with(self, record: &BuildRecord) -> Self {
        Self {
            count: self.count + 1,
            sums: self.sums.with(record.duration_ms),
        }
    }

    /// Adds one record in place.
    pub fn add(&mut self, record: &BuildRecord) {
        *self = self.with(record);
    }

    pub fn count(&self) -> u64 {
        self.count
    }

    #[allow(clippy::cast_precision_loss)]
    pub fn mean_ms(&self) -> f64 {
        if self.count == 0 {
            0.0
        } else {
            self.sums.as_f64().0 / self.count as f64
        }
    }

    /// Sample standard deviation of the durations, truncated to whole milliseconds.
    ///
    /// Fewer than two records have no spread and yield zero.
    pub fn std_dev_ms(&self) -> u64 {
        if self.count < 2 {
            return 0;
        }
        let Sums::Exact { sum, sum_sq } = self.sums else {
            return self.approximate_std_dev_ms();
        };
        let n = u128::from(self.count);

        // n * Σx² - (Σx)² is n² times the population variance and never negative
        let exact = n
            .checked_mul(sum_sq)
            .zip(sum.checked_mul(sum))
            .and_then(|(scaled_sq, sum_squared)| scaled_sq.checked_sub(sum_squared))
            .and_then(|spread| n.checked_mul(n - 1).map(|denominator| spread / denominator));

        match exact {
            Some(variance) => u64::try_from(isqrt(variance)).unwrap_or(u64::MAX),
            None => self.approximate_std_dev_ms(),
        }
    }

    /// Floating-point fallback for sums too large for exact integer arithmetic.
    #[allow(
        clippy::cast_precision_loss,
        clippy::cast_possible_truncation,
        clippy::cast_sign_loss
    )]
    fn approximate_std_dev_ms(&self) -> u64 {
        let (sum, sum_sq) = self.sums.as_f64();
        let n = self.count as f64;
        let mean = sum / n;
        let variance = ((sum_sq / n) - mean * mean).max(0.0) * n / (n - 1.0);
        variance.sqrt() as u64
    }

    /// Materializes the current summary as a named metric.
    #[allow(clippy::cast_possible_truncation, clippy::cast_possible_wrap)]
    pub fn to_result(&self, name: &str) -> MetricResult {
        MetricResult {
            name: name.to_string(),
            value: i64::try_from(self.std_dev_ms()).unwrap_or(i64::MAX),
            occurrences: self.count as usize,
        }
    }
}

/// Standard deviation of the durations of a complete record set.
pub fn compute<'a, I>(name: &str, records: I) -> MetricResult
where
    I: IntoIterator<Item = &'a BuildRecord>,
{
    let acc = DispersionAccumulator::from_records(records);
    let result = acc.to_result(name);
    debug!(
        "{} occurrences: {}, mean: {:.0} ms, std dev: {} ms",
        result.name,
        acc.count(),
        acc.mean_ms(),
        result.value
    );
    result
}

/// Dispersion after each build of a chronologically sorted history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrendPoint {
    pub number: u64,
    pub occurrences: usize,
    pub value: i64,
}

/// Computes the dispersion of every growing prefix of `records` in a single pass.
pub fn dispersion_trend(records: &[BuildRecord]) -> Vec<TrendPoint> {
    records
        .iter()
        .scan(DispersionAccumulator::new(), |acc, record| {
            acc.add(record);
            let result = acc.to_result("trend");
            Some(TrendPoint {
                number: record.number,
                occurrences: result.occurrences,
                value: result.value,
            })
        })
        .collect()
}

/// Integer square root, rounded down.
#[allow(
    clippy::cast_precision_loss,
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss
)]
fn isqrt(value: u128) -> u128 {
    if value < 2 {
        return value;
    }
    // f64 gets within a few units; correct the estimate in both directions
    let mut root = (value as f64).sqrt() as u128;
    while root.checked_mul(root).map_or(true, |sq| sq > value) {
        root -= 1;
    }
    while (root + 1).checked_mul(root + 1).is_some_and(|sq| sq <= value) {
        root += 1;
    }
    root
}
