use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use log::info;

use crate::error::{BuildPulseError, Result};
use crate::history::HistoryLog;
use crate::metrics::{compute_all, dispersion_trend, MetricsReport, TrendPoint};
use crate::record::{BuildRecord, Outcome};
use crate::store::MetricStore;

/// Default name of a job's history log inside its directory.
pub const DEFAULT_HISTORY_FILE: &str = "all_builds.mr";

/// Reliability tracking for a single job.
///
/// A job owns a directory holding its history log and the property files of its latest
/// metrics. Each read-compute-write cycle must be serialized per job by the caller: the
/// tracker takes no lock of its own.
#[derive(Debug, Clone)]
pub struct JobTracker {
    job_dir: PathBuf,
    history: HistoryLog,
    store: MetricStore,
}

impl JobTracker {
    pub fn new(job_dir: impl Into<PathBuf>, history_file: &str) -> Self {
        let job_dir = job_dir.into();
        Self {
            history: HistoryLog::new(job_dir.join(history_file)),
            store: MetricStore::new(&job_dir),
            job_dir,
        }
    }

    /// Tracker for `job` under the storage `root`, e.g. `group/app` → `root/group-app`.
    ///
    /// # Errors
    ///
    /// Returns `BuildPulseError::InvalidJobName` if the job does not map to a directory
    /// strictly inside `root`.
    pub fn for_job(root: &Path, job: &str, history_file: &str) -> Result<Self> {
        Ok(Self::new(root.join(job_slug(job)?), history_file))
    }

    /// Tracker for `job` under the platform data directory.
    ///
    /// - Linux: `~/.local/share/buildpulse/{job-slug}`
    /// - macOS: `~/Library/Application Support/buildpulse/{job-slug}`
    ///
    /// # Errors
    ///
    /// Returns `BuildPulseError::NoStorageDir` if the platform has no data directory, or
    /// `BuildPulseError::InvalidJobName` as [`JobTracker::for_job`] does.
    pub fn in_data_dir(job: &str, history_file: &str) -> Result<Self> {
        let root = default_root().ok_or(BuildPulseError::NoStorageDir)?;
        Self::for_job(&root, job, history_file)
    }

    pub fn job_dir(&self) -> &Path {
        &self.job_dir
    }

    pub fn history(&self) -> &HistoryLog {
        &self.history
    }

    pub fn store(&self) -> &MetricStore {
        &self.store
    }

    /// Handles a freshly completed build.
    ///
    /// Appends the build to the history log, re-reads the whole history, computes every
    /// metric for every window and stores the results.
    ///
    /// # Errors
    ///
    /// Returns an error if the history log or property files cannot be written.
    pub fn on_completed(&self, record: &BuildRecord, now: DateTime<Utc>) -> Result<MetricsReport> {
        info!(
            "Recording build {record} in: {}",
            self.history.path().display()
        );
        self.history.append(record)?;
        self.recompute(now)
    }

    /// Records a build given in raw log units (epoch milliseconds).
    ///
    /// # Errors
    ///
    /// Returns `BuildPulseError::InvalidRecord` if the start time is out of range, or an
    /// I/O error if the history log or property files cannot be written.
    pub fn record_build(
        &self,
        number: u64,
        start_millis: i64,
        duration_ms: u64,
        outcome: Outcome,
        now: DateTime<Utc>,
    ) -> Result<MetricsReport> {
        let record = BuildRecord::from_millis(number, start_millis, duration_ms, outcome)?;
        self.on_completed(&record, now)
    }

    /// Recomputes and stores every metric from the current history log.
    ///
    /// # Errors
    ///
    /// Returns an error if the property files cannot be written.
    pub fn recompute(&self, now: DateTime<Utc>) -> Result<MetricsReport> {
        let records = self.history.load();
        let report = compute_all(&records, now);
        self.store.write_report(&report)?;

        info!(
            "Computed metrics over {} builds in: {}",
            report.total_builds,
            self.job_dir.display()
        );
        Ok(report)
    }

    /// Seeds the history log with a job's existing builds.
    ///
    /// Does nothing and returns `false` when a log already exists, unless `force` is set.
    ///
    /// # Errors
    ///
    /// Returns an error if the history log cannot be written.
    pub fn backfill(&self, records: &[BuildRecord], force: bool) -> Result<bool> {
        if self.history.exists() && !force {
            info!(
                "History log already exists, skipping backfill: {}",
                self.history.path().display()
            );
            return Ok(false);
        }

        let mut sorted = records.to_vec();
        sorted.sort();
        self.history.rewrite(&sorted)?;
        info!(
            "Backfilled {} builds into: {}",
            sorted.len(),
            self.history.path().display()
        );
        Ok(true)
    }

    /// Duration dispersion after each build of the history.
    pub fn trend(&self) -> Vec<TrendPoint> {
        dispersion_trend(&self.history.load())
    }
}

/// Default storage root: `{data_dir}/buildpulse`.
pub fn default_root() -> Option<PathBuf> {
    dirs::data_dir().map(|dir| dir.join("buildpulse"))
}

/// Directory name for a job, e.g. "group/project" → "group-project".
///
/// # Errors
///
/// Returns `BuildPulseError::InvalidJobName` for names that flatten to nothing, `.` or
/// `..`, which would resolve to the storage root or its parent.
pub fn job_slug(job: &str) -> Result<String> {
    let slug = job.trim_matches(['/', '\\']).replace(['/', '\\'], "-");
    match slug.as_str() {
        "" | "." | ".." => Err(BuildPulseError::InvalidJobName(job.to_string())),
        _ => Ok(slug),
    }
}
