use std::fmt::Write as _;
use std::fs;
use std::path::{Path, PathBuf};

use indexmap::IndexMap;
use log::{debug, warn};

use crate::error::Result;
use crate::metrics::{MetricFamily, MetricResult, MetricsReport};
use crate::window::Window;

/// Property files holding a job's latest metric values.
///
/// Each family lives in its own file inside the job directory (`mttr.properties`,
/// `mttf.properties`, `stddev.properties`) as `key=value` lines with values in
/// milliseconds. Every write replaces the family's file.
#[derive(Debug, Clone)]
pub struct MetricStore {
    dir: PathBuf,
}

impl MetricStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn path(&self, family: MetricFamily) -> PathBuf {
        self.dir.join(family.file_name())
    }

    /// Writes one family's results, one `name=value` line each, in the given order.
    ///
    /// # Errors
    ///
    /// Returns an error if the job directory or property file cannot be written.
    pub fn write(&self, family: MetricFamily, results: &[&MetricResult]) -> Result<()> {
        fs::create_dir_all(&self.dir)?;

        let content = results.iter().fold(String::new(), |mut out, result| {
            let _ = writeln!(out, "{}={}", result.name, result.value);
            out
        });
        let path = self.path(family);
        fs::write(&path, content)?;

        debug!("Saved {} metrics to: {}", results.len(), path.display());
        Ok(())
    }

    /// Writes every family of a report.
    ///
    /// # Errors
    ///
    /// Returns an error if any property file cannot be written.
    pub fn write_report(&self, report: &MetricsReport) -> Result<()> {
        for family in MetricFamily::ALL {
            self.write(family, &report.results(family))?;
        }
        Ok(())
    }

    /// Reads one family's stored values.
    ///
    /// A missing or unreadable file yields an empty map; malformed lines are skipped.
    pub fn read(&self, family: MetricFamily) -> IndexMap<String, i64> {
        let path = self.path(family);
        match fs::read_to_string(&path) {
            Ok(content) => parse_properties(&content, &path),
            Err(e) => {
                if path.exists() {
                    warn!("Failed to read property file {}: {e}", path.display());
                } else {
                    debug!("No property file at: {}", path.display());
                }
                IndexMap::new()
            }
        }
    }

    /// Reads a single stored value, `None` when it was never computed.
    pub fn value(&self, family: MetricFamily, window: Window) -> Option<i64> {
        self.read(family).get(&family.key(window)).copied()
    }

    /// Every family and window key with its stored value, defaulting to zero.
    pub fn metric_map(&self) -> IndexMap<String, i64> {
        MetricFamily::ALL
            .into_iter()
            .flat_map(|family| {
                let stored = self.read(family);
                Window::ALL.into_iter().map(move |window| {
                    let key = family.key(window);
                    let value = stored.get(&key).copied().unwrap_or(0);
                    (key, value)
                })
            })
            .collect()
    }
}

fn parse_properties(content: &str, source: &Path) -> IndexMap<String, i64> {
    content
        .lines()
        .map(str::trim)
        .enumerate()
        .filter(|(_, line)| !line.is_empty() && !line.starts_with('#'))
        .filter_map(|(index, line)| {
            let parsed = line.split_once('=').and_then(|(key, value)| {
                let value = value.trim().parse::<i64>().ok()?;
                Some((key.trim().to_string(), value))
            });
            if parsed.is_none() {
                warn!(
                    "Skipping malformed property on line {} in {}",
                    index + 1,
                    source.display()
                );
            }
            parsed
        })
        .collect()
}
