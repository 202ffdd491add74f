use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::record::BuildRecord;

/// Trailing time period bounding which builds contribute to a metric.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Window {
    Last7Days,
    Last30Days,
    AllTime,
}

impl Window {
    /// Every window, in the order metrics are computed and stored.
    pub const ALL: [Window; 3] = [Window::Last7Days, Window::Last30Days, Window::AllTime];

    /// Length of the trailing period, `None` for all time.
    pub fn period(self) -> Option<Duration> {
        match self {
            Self::Last7Days => Some(Duration::days(7)),
            Self::Last30Days => Some(Duration::days(30)),
            Self::AllTime => None,
        }
    }

    /// Suffix appended to a metric family prefix to form a stored key.
    pub fn key_suffix(self) -> &'static str {
        match self {
            Self::Last7Days => "Last7days",
            Self::Last30Days => "Last30days",
            Self::AllTime => "AllBuilds",
        }
    }

    pub fn title(self) -> &'static str {
        match self {
            Self::Last7Days => "Last 7 Days",
            Self::Last30Days => "Last 30 Days",
            Self::AllTime => "All Builds",
        }
    }

    /// Selects the records that started strictly after `now - period`.
    ///
    /// Input order is preserved. [`Window::AllTime`] keeps every record.
    pub fn filter<'a>(self, records: &'a [BuildRecord], now: DateTime<Utc>) -> Vec<&'a BuildRecord> {
        match self.period() {
            None => records.iter().collect(),
            Some(period) => {
                let cutoff = now - period;
                records.iter().filter(|r| r.start_time > cutoff).collect()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::Outcome;

    fn started_at(number: u64, start_time: DateTime<Utc>) -> BuildRecord {
        BuildRecord::new(number, start_time, 1_000, Outcome::Success)
    }

    fn fixed_now() -> DateTime<Utc> {
        DateTime::from_timestamp_millis(1_700_000_000_000).unwrap()
    }

    #[test]
    fn excludes_records_older_than_period() {
        let now = fixed_now();
        let records = vec![
            started_at(1, now - Duration::days(8)),
            started_at(2, now - Duration::days(6)),
        ];

        let selected = Window::Last7Days.filter(&records, now);

        let numbers: Vec<u64> = selected.iter().map(|r| r.number).collect();
        assert_eq!(numbers, vec![2], "Only the 6-day-old build is inside 7 days");
    }

    #[test]
    fn boundary_is_exclusive() {
        let now = fixed_now();
        let records = vec![started_at(1, now - Duration::days(7))];

        assert!(
            Window::Last7Days.filter(&records, now).is_empty(),
            "A build exactly at the cutoff is outside the window"
        );
    }

    #[test]
    fn thirty_days_keeps_more_than_seven() {
        let now = fixed_now();
        let records = vec![
            started_at(1, now - Duration::days(40)),
            started_at(2, now - Duration::days(20)),
            started_at(3, now - Duration::days(1)),
        ];

        assert_eq!(Window::Last7Days.filter(&records, now).len(), 1);
        assert_eq!(Window::Last30Days.filter(&records, now).len(), 2);
    }

    #[test]
    fn all_time_is_identity() {
        let now = fixed_now();
        let records = vec![
            started_at(1, now - Duration::days(4_000)),
            started_at(2, now),
        ];

        assert_eq!(Window::AllTime.filter(&records, now).len(), 2);
    }

    #[test]
    fn preserves_input_order() {
        let now = fixed_now();
        let records = vec![
            started_at(3, now - Duration::days(1)),
            started_at(1, now - Duration::days(2)),
            started_at(2, now - Duration::days(3)),
        ];

        let numbers: Vec<u64> = Window::Last7Days
            .filter(&records, now)
            .iter()
            .map(|r| r.number)
            .collect();
        assert_eq!(numbers, vec![3, 1, 2]);
    }

    #[test]
    fn empty_input_yields_empty_output() {
        for window in Window::ALL {
            assert!(window.filter(&[], fixed_now()).is_empty());
        }
    }

    #[test]
    fn key_suffixes_are_stable() {
        let suffixes: Vec<&str> = Window::ALL.iter().map(|w| w.key_suffix()).collect();
        assert_eq!(suffixes, vec!["Last7days", "Last30days", "AllBuilds"]);
    }
}
