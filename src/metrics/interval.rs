use chrono::{DateTime, Utc};
use log::debug;

use super::MetricResult;
use crate::record::{BuildRecord, Outcome};

/// Which kind of interval is measured between builds.
///
/// Both kinds share one chain-detection scan and only differ in which outcomes open
/// and close an interval.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IntervalKind {
    /// Mean time to repair: opens on the first non-success build, closes on the next success.
    Repair,
    /// Mean time to fail: opens on the first success, closes on the next strict failure.
    Fail,
}

impl IntervalKind {
    fn opens(self, outcome: Outcome) -> bool {
        match self {
            Self::Repair => !outcome.is_success(),
            Self::Fail => outcome.is_success(),
        }
    }

    fn closes(self, outcome: Outcome) -> bool {
        match self {
            Self::Repair => outcome.is_success(),
            Self::Fail => outcome == Outcome::Failure,
        }
    }

    /// Runs a single forward pass over chronologically sorted records.
    ///
    /// Callers sort by build number first; the scan itself does not reorder.
    pub fn compute<'a, I>(self, name: &str, records: I) -> MetricResult
    where
        I: IntoIterator<Item = &'a BuildRecord>,
    {
        let scan = records
            .into_iter()
            .fold(IntervalScan::default(), |scan, record| scan.observe(self, record));

        let result = MetricResult {
            name: name.to_string(),
            value: scan.mean_ms(),
            occurrences: scan.occurrences,
        };
        debug!(
            "{} occurrences: {}, mean: {} ms",
            result.name, result.occurrences, result.value
        );
        result
    }
}

/// Running state of an interval scan.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
struct IntervalScan {
    pending_start: Option<DateTime<Utc>>,
    total_ms: i64,
    occurrences: usize,
}

impl IntervalScan {
    fn observe(self, kind: IntervalKind, record: &BuildRecord) -> Self {
        match self.pending_start {
            // Repeated opening outcomes do not restart an open interval
            None if kind.opens(record.outcome) => Self {
                pending_start: Some(record.start_time),
                ..self
            },
            Some(start) if kind.closes(record.outcome) => Self {
                pending_start: None,
                total_ms: self
                    .total_ms
                    .saturating_add((record.start_time - start).num_milliseconds()),
                occurrences: self.occurrences + 1,
            },
            _ => self,
        }
    }

    #[allow(clippy::cast_possible_wrap)]
    fn mean_ms(&self) -> i64 {
        if self.occurrences == 0 {
            0
        } else {
            self.total_ms / self.occurrences as i64
        }
    }
}
