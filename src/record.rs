use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::RecordParseError;

/// Final result of a completed build.
///
/// Mirrors the host's closed result set. Only [`Outcome::Success`] ends a repair
/// interval and only [`Outcome::Failure`] ends a fail interval; the remaining codes
/// count as "not success" for repair purposes and are inert for fail purposes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Outcome {
    Success,
    Failure,
    Unstable,
    Aborted,
    NotBuilt,
}

impl Outcome {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Success => "SUCCESS",
            Self::Failure => "FAILURE",
            Self::Unstable => "UNSTABLE",
            Self::Aborted => "ABORTED",
            Self::NotBuilt => "NOT_BUILT",
        }
    }

    pub fn is_success(self) -> bool {
        self == Self::Success
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Outcome {
    type Err = RecordParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "SUCCESS" => Ok(Self::Success),
            // Older logs spell the failure code FAILED
            "FAILURE" | "FAILED" => Ok(Self::Failure),
            "UNSTABLE" => Ok(Self::Unstable),
            "ABORTED" => Ok(Self::Aborted),
            "NOT_BUILT" => Ok(Self::NotBuilt),
            _ => Err(RecordParseError::UnknownOutcome(s.trim().to_string())),
        }
    }
}

/// One completed build of a job.
///
/// Records are identified by their build `number` alone: two records with the same
/// number compare equal, hash equally and sort together, whatever their other fields.
/// The number is also the chronological ordering key; `start_time` may collide or
/// arrive out of order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BuildRecord {
    /// Build number, unique within a job's history
    pub number: u64,
    /// When the build started
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub start_time: DateTime<Utc>,
    /// Build duration in milliseconds
    pub duration_ms: u64,
    /// Final build result
    pub outcome: Outcome,
}

impl BuildRecord {
    pub fn new(number: u64, start_time: DateTime<Utc>, duration_ms: u64, outcome: Outcome) -> Self {
        Self {
            number,
            start_time,
            duration_ms,
            outcome,
        }
    }

    /// Builds a record from a start time expressed in epoch milliseconds.
    ///
    /// # Errors
    ///
    /// Returns `RecordParseError::InvalidTimestamp` if chrono cannot represent the instant.
    pub fn from_millis(
        number: u64,
        start_millis: i64,
        duration_ms: u64,
        outcome: Outcome,
    ) -> Result<Self, RecordParseError> {
        let start_time = DateTime::from_timestamp_millis(start_millis)
            .ok_or(RecordParseError::InvalidTimestamp(start_millis))?;
        Ok(Self::new(number, start_time, duration_ms, outcome))
    }

    pub fn start_millis(&self) -> i64 {
        self.start_time.timestamp_millis()
    }

    /// Parses one history log line: `number,startTimeMillis,durationMillis,outcome`.
    ///
    /// # Errors
    ///
    /// Returns a `RecordParseError` describing the first problem found in the line.
    pub fn parse_line(line: &str) -> Result<Self, RecordParseError> {
        let fields: Vec<&str> = line.trim().split(',').map(str::trim).collect();
        let [number, start, duration, outcome] = fields.as_slice() else {
            return Err(RecordParseError::FieldCount {
                found: fields.len(),
            });
        };

        let number = parse_field::<u64>("number", number)?;
        let start = parse_field::<i64>("startTime", start)?;
        let duration = parse_field::<u64>("duration", duration)?;
        let outcome = outcome.parse::<Outcome>()?;

        Self::from_millis(number, start, duration, outcome)
    }

    /// Renders the record as a history log line, without the trailing newline.
    pub fn to_line(&self) -> String {
        format!(
            "{},{},{},{}",
            self.number,
            self.start_millis(),
            self.duration_ms,
            self.outcome
        )
    }
}

fn parse_field<T: FromStr>(field: &'static str, value: &str) -> Result<T, RecordParseError> {
    value.parse::<T>().map_err(|_| RecordParseError::InvalidNumber {
        field,
        value: value.to_string(),
    })
}

impl PartialEq for BuildRecord {
    fn eq(&self, other: &Self) -> bool {
        self.number == other.number
    }
}

impl Eq for BuildRecord {}

impl Hash for BuildRecord {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.number.hash(state);
    }
}

impl PartialOrd for BuildRecord {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for BuildRecord {
    fn cmp(&self, other: &Self) -> Ordering {
        self.number.cmp(&other.number)
    }
}

impl fmt::Display for BuildRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{} {}", self.number, self.outcome)
    }
}
