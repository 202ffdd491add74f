use anyhow::{Context, Result};
use chrono::Utc;
use clap::{Parser, Subcommand};
use log::info;
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::config::{Config, OutputFormat};
use crate::output;
use crate::record::{BuildRecord, Outcome};
use crate::tracker::JobTracker;

#[derive(Parser)]
#[command(name = "buildpulse")]
#[command(author, version, about = "Build Reliability Metrics", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Configuration file (defaults to ./buildpulse.{toml,json,yaml,yml})
    #[arg(short, long, global = true, env = "BUILDPULSE_CONFIG")]
    config: Option<PathBuf>,

    /// Directory holding one sub-directory per job
    #[arg(short, long, global = true, env = "BUILDPULSE_ROOT")]
    root: Option<PathBuf>,

    #[arg(short, long, global = true, value_enum)]
    format: Option<OutputFormat>,

    #[arg(short, long, global = true)]
    output: Option<PathBuf>,

    #[arg(short, long, global = true, default_value_t = false)]
    pretty: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Record a completed build and recompute the job's metrics
    Record {
        #[arg(short, long)]
        job: String,

        #[arg(short, long)]
        number: u64,

        /// Build start time in epoch milliseconds (defaults to now)
        #[arg(short, long)]
        start: Option<i64>,

        /// Build duration in milliseconds
        #[arg(short, long)]
        duration: u64,

        /// SUCCESS, FAILURE, UNSTABLE, ABORTED or NOT_BUILT
        #[arg(short = 'O', long)]
        outcome: Outcome,
    },
    /// Recompute and store the job's metrics from its history log
    Compute {
        #[arg(short, long)]
        job: String,
    },
    /// Show the job's stored metrics without recomputing them
    Show {
        #[arg(short, long)]
        job: String,
    },
    /// Show how build duration dispersion evolved over the job's history
    Trend {
        #[arg(short, long)]
        job: String,
    },
    /// Write a configuration file holding the default settings
    Init {
        #[arg(default_value = "buildpulse.toml")]
        path: PathBuf,

        /// Overwrite an existing file
        #[arg(long, default_value_t = false)]
        force: bool,
    },
    /// Seed a job's history log from a JSON array of builds
    Import {
        #[arg(short, long)]
        job: String,

        #[arg(long)]
        from: PathBuf,

        /// Replace an existing history log
        #[arg(long, default_value_t = false)]
        force: bool,
    },
}

impl Cli {
    fn tracker(&self, config: &Config, job: &str) -> Result<JobTracker> {
        let history_file = &config.storage.history_file;
        let tracker = match self.root.as_ref().or(config.storage.root.as_ref()) {
            Some(root) => JobTracker::for_job(root, job, history_file)?,
            None => JobTracker::in_data_dir(job, history_file)?,
        };
        info!("Using job directory: {}", tracker.job_dir().display());
        Ok(tracker)
    }

    fn emit(
        &self,
        config: &Config,
        summary: impl FnOnce() -> String,
        export: impl FnOnce(OutputFormat, bool, &mut dyn Write) -> Result<()>,
    ) -> Result<()> {
        let format = self.format.unwrap_or(config.output.format);
        let pretty = self.pretty || config.output.pretty;

        let mut buffer = Vec::new();
        match format {
            OutputFormat::Summary => writeln!(buffer, "{}", summary())?,
            _ => export(format, pretty, &mut buffer)?,
        }

        if let Some(output_path) = &self.output {
            std::fs::write(output_path, &buffer)
                .with_context(|| format!("Failed to write output: {}", output_path.display()))?;
            info!("Metrics written to: {}", output_path.display());
        } else {
            std::io::stdout().write_all(&buffer)?;
        }

        Ok(())
    }

    fn execute_record(
        &self,
        config: &Config,
        job: &str,
        number: u64,
        start_millis: i64,
        duration_ms: u64,
        outcome: Outcome,
    ) -> Result<()> {
        let tracker = self.tracker(config, job)?;
        let report =
            tracker.record_build(number, start_millis, duration_ms, outcome, Utc::now())?;

        self.emit(
            config,
            || output::render_summary(job, &report),
            |format, pretty, out| output::export_report(&report, format, pretty, out),
        )
    }

    fn execute_compute(&self, config: &Config, job: &str) -> Result<()> {
        let tracker = self.tracker(config, job)?;
        let report = tracker.recompute(Utc::now())?;

        self.emit(
            config,
            || output::render_summary(job, &report),
            |format, pretty, out| output::export_report(&report, format, pretty, out),
        )
    }

    fn execute_show(&self, config: &Config, job: &str) -> Result<()> {
        let tracker = self.tracker(config, job)?;
        let store = tracker.store();

        self.emit(
            config,
            || output::render_stored(job, store),
            |format, pretty, out| output::export_stored(&store.metric_map(), format, pretty, out),
        )
    }

    fn execute_trend(&self, config: &Config, job: &str) -> Result<()> {
        let tracker = self.tracker(config, job)?;
        let points = tracker.trend();

        self.emit(
            config,
            || output::render_trend(job, &points),
            |format, pretty, out| output::export_trend(&points, format, pretty, out),
        )
    }

    fn execute_import(&self, config: &Config, job: &str, from: &Path, force: bool) -> Result<()> {
        let contents = std::fs::read_to_string(from)
            .with_context(|| format!("Failed to read builds file: {}", from.display()))?;
        let records: Vec<BuildRecord> = serde_json::from_str(&contents)
            .with_context(|| format!("Failed to parse builds file: {}", from.display()))?;

        let tracker = self.tracker(config, job)?;
        if tracker.backfill(&records, force)? {
            eprintln!(
                "Imported {} builds into {}",
                records.len(),
                tracker.history().path().display()
            );
        } else {
            eprintln!(
                "History already exists at {}, use --force to replace it",
                tracker.history().path().display()
            );
        }
        Ok(())
    }

    fn execute_init(&self, path: &Path, force: bool) -> Result<()> {
        if path.exists() && !force {
            anyhow::bail!(
                "Config file already exists: {} (use --force to overwrite)",
                path.display()
            );
        }

        let mut config = Config::default();
        config.storage.root = self.root.clone();
        if let Some(format) = self.format {
            config.output.format = format;
        }
        config.output.pretty = self.pretty;

        config.save(path)?;
        eprintln!("Wrote default configuration to {}", path.display());
        Ok(())
    }

    pub fn execute(&self) -> Result<()> {
        let load_config = || Config::load(self.config.as_deref());

        match &self.command {
            Commands::Record {
                job,
                number,
                start,
                duration,
                outcome,
            } => {
                let start_millis = start.unwrap_or_else(|| Utc::now().timestamp_millis());
                self.execute_record(
                    &load_config()?,
                    job,
                    *number,
                    start_millis,
                    *duration,
                    *outcome,
                )
            }
            Commands::Compute { job } => self.execute_compute(&load_config()?, job),
            Commands::Show { job } => self.execute_show(&load_config()?, job),
            Commands::Trend { job } => self.execute_trend(&load_config()?, job),
            Commands::Import { job, from, force } => {
                self.execute_import(&load_config()?, job, from, *force)
            }
            Commands::Init { path, force } => self.execute_init(path, *force),
        }
    }
}
