mod dispersion;
mod interval;

use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::record::BuildRecord;
use crate::window::Window;

pub use dispersion::{dispersion_trend, TrendPoint};
use interval::IntervalKind;

/// One computed aggregate metric.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetricResult {
    /// Stored key, e.g. `mttrLast7days`
    pub name: String,
    /// Mean interval or standard deviation in milliseconds, zero when undefined
    pub value: i64,
    /// Number of intervals (or builds, for dispersion) behind `value`
    pub occurrences: usize,
}

/// The aggregate metrics tracked for every job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MetricFamily {
    Mttr,
    Mttf,
    StdDev,
}

impl MetricFamily {
    pub const ALL: [MetricFamily; 3] = [MetricFamily::Mttr, MetricFamily::Mttf, MetricFamily::StdDev];

    /// Prefix of every stored key in this family.
    pub fn key_prefix(self) -> &'static str {
        match self {
            Self::Mttr => "mttr",
            Self::Mttf => "mttf",
            Self::StdDev => "stddev",
        }
    }

    /// Name of the property file holding this family's values.
    pub fn file_name(self) -> &'static str {
        match self {
            Self::Mttr => "mttr.properties",
            Self::Mttf => "mttf.properties",
            Self::StdDev => "stddev.properties",
        }
    }

    pub fn title(self) -> &'static str {
        match self {
            Self::Mttr => "Mean Time To Repair",
            Self::Mttf => "Mean Time To Fail",
            Self::StdDev => "Duration Std Deviation",
        }
    }

    pub fn key(self, window: Window) -> String {
        format!("{}{}", self.key_prefix(), window.key_suffix())
    }

    /// Computes this family's metric over chronologically sorted records.
    pub fn compute<'a, I>(self, name: &str, records: I) -> MetricResult
    where
        I: IntoIterator<Item = &'a BuildRecord>,
    {
        match self {
            Self::Mttr => IntervalKind::Repair.compute(name, records),
            Self::Mttf => IntervalKind::Fail.compute(name, records),
            Self::StdDev => dispersion::compute(name, records),
        }
    }
}

/// All metrics of one job, per family and window.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricsReport {
    pub computed_at: DateTime<Utc>,
    pub total_builds: usize,
    pub families: IndexMap<MetricFamily, IndexMap<Window, MetricResult>>,
}

impl MetricsReport {
    pub fn get(&self, family: MetricFamily, window: Window) -> Option<&MetricResult> {
        self.families.get(&family).and_then(|w| w.get(&window))
    }

    /// Results of one family in window order.
    pub fn results(&self, family: MetricFamily) -> Vec<&MetricResult> {
        self.families
            .get(&family)
            .map(|windows| windows.values().collect())
            .unwrap_or_default()
    }
}

/// Runs every metric family over every window.
///
/// Records are sorted by build number before windowing, so the order they were read
/// or appended in does not matter.
pub fn compute_all(records: &[BuildRecord], now: DateTime<Utc>) -> MetricsReport {
    let mut sorted = records.to_vec();
    sorted.sort();

    let windows: Vec<(Window, Vec<&BuildRecord>)> = Window::ALL
        .iter()
        .map(|&window| (window, window.filter(&sorted, now)))
        .collect();

    let families = MetricFamily::ALL
        .iter()
        .map(|&family| {
            let results = windows
                .iter()
                .map(|(window, selected)| {
                    let name = family.key(*window);
                    (*window, family.compute(&name, selected.iter().copied()))
                })
                .collect();
            (family, results)
        })
        .collect();

    MetricsReport {
        computed_at: now,
        total_builds: sorted.len(),
        families,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::Outcome;
    use chrono::Duration;

    fn now() -> DateTime<Utc> {
        DateTime::from_timestamp_millis(1_700_000_000_000).unwrap()
    }

    fn build(number: u64, start: DateTime<Utc>, duration_ms: u64, outcome: Outcome) -> BuildRecord {
        BuildRecord::new(number, start, duration_ms, outcome)
    }

    fn history() -> Vec<BuildRecord> {
        let now = now();
        vec![
            // Only in all-time
            build(1, now - Duration::days(60), 1_000, Outcome::Failure),
            build(2, now - Duration::days(50), 1_000, Outcome::Success),
            // Last 30 days
            build(3, now - Duration::days(20), 2_000, Outcome::Failure),
            build(4, now - Duration::days(19), 2_000, Outcome::Success),
            // Last 7 days
            build(5, now - Duration::days(3), 1_500, Outcome::Failure),
            build(6, now - Duration::days(3) + Duration::seconds(2), 2_500, Outcome::Success),
        ]
    }

    #[test]
    fn keys_combine_family_and_window() {
        assert_eq!(MetricFamily::Mttr.key(Window::Last7Days), "mttrLast7days");
        assert_eq!(MetricFamily::Mttf.key(Window::Last30Days), "mttfLast30days");
        assert_eq!(MetricFamily::StdDev.key(Window::AllTime), "stddevAllBuilds");
    }

    #[test]
    fn computes_nine_results() {
        let report = compute_all(&history(), now());

        assert_eq!(report.total_builds, 6);
        assert_eq!(report.families.len(), 3);
        for family in MetricFamily::ALL {
            assert_eq!(report.results(family).len(), 3, "{family:?} windows");
        }
    }

    #[test]
    fn windows_bound_the_mttr() {
        let report = compute_all(&history(), now());

        let last7 = report.get(MetricFamily::Mttr, Window::Last7Days).unwrap();
        assert_eq!(last7.name, "mttrLast7days");
        assert_eq!(last7.value, 2_000);
        assert_eq!(last7.occurrences, 1);

        let last30 = report.get(MetricFamily::Mttr, Window::Last30Days).unwrap();
        assert_eq!(last30.occurrences, 2);
        assert_eq!(last30.value, (86_400_000 + 2_000) / 2);

        let all = report.get(MetricFamily::Mttr, Window::AllTime).unwrap();
        assert_eq!(all.occurrences, 3);
    }

    #[test]
    fn dispersion_per_window() {
        let report = compute_all(&history(), now());

        let last7 = report.get(MetricFamily::StdDev, Window::Last7Days).unwrap();
        assert_eq!(last7.value, 707);
        assert_eq!(last7.occurrences, 2);

        let all = report.get(MetricFamily::StdDev, Window::AllTime).unwrap();
        assert_eq!(all.occurrences, 6);
    }

    #[test]
    fn append_order_does_not_matter() {
        let mut shuffled = history();
        shuffled.reverse();
        shuffled.swap(0, 3);

        let expected = compute_all(&history(), now());
        let actual = compute_all(&shuffled, now());

        for family in MetricFamily::ALL {
            assert_eq!(actual.results(family), expected.results(family));
        }
    }

    #[test]
    fn empty_history_defaults_to_zero() {
        let report = compute_all(&[], now());

        assert_eq!(report.total_builds, 0);
        for family in MetricFamily::ALL {
            for result in report.results(family) {
                assert_eq!(result.value, 0, "{}", result.name);
                assert_eq!(result.occurrences, 0, "{}", result.name);
            }
        }
    }

    #[test]
    fn family_compute_dispatches() {
        let now = now();
        let builds = vec![
            build(1, now, 1_500, Outcome::Success),
            build(2, now + Duration::seconds(1), 2_500, Outcome::Failure),
            build(3, now + Duration::seconds(2), 2_500, Outcome::Failure),
            build(4, now + Duration::seconds(3), 1_500, Outcome::Success),
        ];

        assert_eq!(MetricFamily::Mttr.compute("r", &builds).value, 2_000);
        assert_eq!(MetricFamily::Mttf.compute("f", &builds).value, 1_000);
        assert_eq!(MetricFamily::StdDev.compute("d", &builds).value, 577);
    }
}
