use std::fs::{self, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use log::{debug, warn};

use crate::error::Result;
use crate::record::BuildRecord;

/// Append-only history of a job's completed builds.
///
/// One `number,startTimeMillis,durationMillis,outcome` line per build, appended in
/// completion order. The log is a shared mutable file: callers must make sure only
/// one writer touches a given job's log at a time.
#[derive(Debug, Clone)]
pub struct HistoryLog {
    path: PathBuf,
}

impl HistoryLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn exists(&self) -> bool {
        self.path.exists()
    }

    /// Reads every valid record, sorted by build number.
    ///
    /// Never fails: a missing or unreadable log is an empty history, and malformed
    /// lines are skipped with a warning. Later duplicates of a build number are dropped.
    pub fn load(&self) -> Vec<BuildRecord> {
        let content = match fs::read(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!("No history log at: {}", self.path.display());
                return vec![];
            }
            Err(e) => {
                warn!(
                    "Failed to read history log {}: {e}, treating as empty",
                    self.path.display()
                );
                return vec![];
            }
        };

        let mut records = parse_records(&content, &self.path);
        records.sort();

        let before = records.len();
        records.dedup();
        if records.len() < before {
            warn!(
                "Dropped {} duplicate build numbers from {}",
                before - records.len(),
                self.path.display()
            );
        }

        debug!(
            "Loaded {} builds from: {}",
            records.len(),
            self.path.display()
        );
        records
    }

    /// Appends one record, creating the log and its directory when missing.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory cannot be created or the file cannot be written.
    pub fn append(&self, record: &BuildRecord) -> Result<()> {
        self.ensure_parent()?;

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        writeln!(file, "{}", record.to_line())?;

        debug!("Appended build {record} to: {}", self.path.display());
        Ok(())
    }

    /// Replaces the whole log with `records`, in the given order.
    ///
    /// Used to backfill a job's history the first time it is tracked.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory cannot be created or the file cannot be written.
    pub fn rewrite(&self, records: &[BuildRecord]) -> Result<()> {
        self.ensure_parent()?;

        let content: String = records
            .iter()
            .map(|r| r.to_line() + "\n")
            .collect();
        fs::write(&self.path, content)?;

        debug!(
            "Wrote {} builds to: {}",
            records.len(),
            self.path.display()
        );
        Ok(())
    }

    fn ensure_parent(&self) -> Result<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        Ok(())
    }
}

// Lines are decoded one at a time so a corrupt line cannot hide the rest of the log
fn parse_records(content: &[u8], source: &Path) -> Vec<BuildRecord> {
    content
        .split(|&byte| byte == b'\n')
        .enumerate()
        .filter(|(_, line)| !line.trim_ascii().is_empty())
        .filter_map(|(index, line)| {
            let parsed = std::str::from_utf8(line)
                .map_err(|e| e.to_string())
                .and_then(|line| BuildRecord::parse_line(line).map_err(|e| e.to_string()));
            match parsed {
                Ok(record) => Some(record),
                Err(e) => {
                    warn!(
                        "Skipping malformed line {} in {}: {e}",
                        index + 1,
                        source.display()
                    );
                    None
                }
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::Outcome;
    use tempfile::TempDir;

    fn record(number: u64, start: i64, duration: u64, outcome: Outcome) -> BuildRecord {
        BuildRecord::from_millis(number, start, duration, outcome).unwrap()
    }

    fn numbers(records: &[BuildRecord]) -> Vec<u64> {
        records.iter().map(|r| r.number).collect()
    }

    #[cfg(test)]
    mod load {
        use super::*;

        #[test]
        fn missing_log_is_empty_history() {
            let temp_dir = TempDir::new().unwrap();
            let log = HistoryLog::new(temp_dir.path().join("all_builds.mr"));

            assert!(!log.exists());
            assert!(log.load().is_empty());
        }

        #[test]
        fn unreadable_log_is_empty_history() {
            let temp_dir = TempDir::new().unwrap();
            // A directory cannot be read as a file
            let log = HistoryLog::new(temp_dir.path());

            assert!(log.load().is_empty());
        }

        #[test]
        fn sorts_by_build_number() {
            let temp_dir = TempDir::new().unwrap();
            let path = temp_dir.path().join("all_builds.mr");
            fs::write(&path, "3,300,10,SUCCESS\n1,100,10,FAILURE\n2,200,10,SUCCESS\n").unwrap();

            let records = HistoryLog::new(&path).load();

            assert_eq!(numbers(&records), vec![1, 2, 3]);
        }

        #[test]
        fn skips_malformed_lines() {
            let temp_dir = TempDir::new().unwrap();
            let path = temp_dir.path().join("all_builds.mr");
            fs::write(
                &path,
                "1,100,10,FAILURE\nblah\n2,abc,10,SUCCESS\n3,300,10\n\n4,400,10,null\n5,500,10,SUCCESS\n",
            )
            .unwrap();

            let records = HistoryLog::new(&path).load();

            assert_eq!(
                numbers(&records),
                vec![1, 5],
                "Only the well-formed lines should survive"
            );
        }

        #[test]
        fn skips_lines_with_invalid_utf8() {
            let temp_dir = TempDir::new().unwrap();
            let path = temp_dir.path().join("all_builds.mr");
            fs::write(
                &path,
                b"1,100,10,FAILURE\n2,200,10,\xff\xfeSUCCESS\n3,300,10,SUCCESS\n",
            )
            .unwrap();

            let records = HistoryLog::new(&path).load();

            assert_eq!(
                numbers(&records),
                vec![1, 3],
                "A corrupt line must not discard its neighbours"
            );
        }

        #[test]
        fn accepts_crlf_line_endings() {
            let temp_dir = TempDir::new().unwrap();
            let path = temp_dir.path().join("all_builds.mr");
            fs::write(&path, "1,100,10,FAILURE\r\n2,200,10,SUCCESS\r\n").unwrap();

            let records = HistoryLog::new(&path).load();

            assert_eq!(numbers(&records), vec![1, 2]);
        }

        #[test]
        fn drops_duplicate_build_numbers() {
            let temp_dir = TempDir::new().unwrap();
            let path = temp_dir.path().join("all_builds.mr");
            fs::write(&path, "1,100,10,FAILURE\n2,200,10,SUCCESS\n1,100,10,FAILURE\n").unwrap();

            let records = HistoryLog::new(&path).load();

            assert_eq!(numbers(&records), vec![1, 2]);
        }
    }

    #[cfg(test)]
    mod append {
        use super::*;

        #[test]
        fn creates_log_and_directory() {
            let temp_dir = TempDir::new().unwrap();
            let path = temp_dir.path().join("group-job").join("all_builds.mr");
            let log = HistoryLog::new(&path);

            log.append(&record(123, 5678, 5000, Outcome::Failure)).unwrap();

            assert_eq!(fs::read_to_string(&path).unwrap(), "123,5678,5000,FAILURE\n");
        }

        #[test]
        fn appends_to_existing_log() {
            let temp_dir = TempDir::new().unwrap();
            let path = temp_dir.path().join("all_builds.mr");
            fs::write(&path, "1,100,10,SUCCESS\n2,200,10,SUCCESS\n").unwrap();

            HistoryLog::new(&path)
                .append(&record(123, 5678, 5000, Outcome::Failure))
                .unwrap();

            let content = fs::read_to_string(&path).unwrap();
            let lines: Vec<&str> = content.lines().collect();
            assert_eq!(lines.len(), 3, "The file should have 3 lines");
            assert_eq!(lines[2], "123,5678,5000,FAILURE");
        }

        #[test]
        fn appended_records_load_back() {
            let temp_dir = TempDir::new().unwrap();
            let log = HistoryLog::new(temp_dir.path().join("all_builds.mr"));

            log.append(&record(2, 200, 20, Outcome::Success)).unwrap();
            log.append(&record(1, 100, 10, Outcome::Unstable)).unwrap();

            let records = log.load();
            assert_eq!(numbers(&records), vec![1, 2]);
            assert_eq!(records[0].outcome, Outcome::Unstable);
            assert_eq!(records[1].duration_ms, 20);
        }
    }

    #[cfg(test)]
    mod rewrite {
        use super::*;

        #[test]
        fn writes_whole_history() {
            let temp_dir = TempDir::new().unwrap();
            let path = temp_dir.path().join("all_builds.mr");
            let log = HistoryLog::new(&path);

            log.rewrite(&[
                record(34, 12, 56, Outcome::Failure),
                record(89, 67, 10, Outcome::Success),
            ])
            .unwrap();

            let content = fs::read_to_string(&path).unwrap();
            let lines: Vec<&str> = content.lines().collect();
            assert_eq!(lines, vec!["34,12,56,FAILURE", "89,67,10,SUCCESS"]);
        }

        #[test]
        fn replaces_previous_content() {
            let temp_dir = TempDir::new().unwrap();
            let path = temp_dir.path().join("all_builds.mr");
            fs::write(&path, "blah\nblah\n").unwrap();

            HistoryLog::new(&path)
                .rewrite(&[record(1, 1, 1, Outcome::Aborted)])
                .unwrap();

            assert_eq!(fs::read_to_string(&path).unwrap(), "1,1,1,ABORTED\n");
        }
    }
}
