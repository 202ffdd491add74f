use std::fmt::Write;

use comfy_table::Cell;

use crate::metrics::{MetricFamily, MetricResult, MetricsReport, TrendPoint};
use crate::store::MetricStore;
use crate::window::Window;

use super::duration::format_duration;
use super::styling::{emphasis, job_name, label, section_icon, section_title};
use super::tables::{
    color_coded_fail_cell, color_coded_repair_cell, create_cyan_header, create_table,
    not_available_cell, plain_duration_cell,
};

fn add_section_header(output: &mut String, emoji: &str, title: &str) {
    let _ = writeln!(output, "{} {}", section_icon(emoji), section_title(title));
}

fn window_header() -> Vec<Cell> {
    let mut labels = vec!["Metric"];
    labels.extend(Window::ALL.iter().map(|w| w.title()));
    create_cyan_header(&labels)
}

fn occurrence_detail(family: MetricFamily, occurrences: usize) -> String {
    let unit = match (family, occurrences) {
        (MetricFamily::StdDev, 1) => "build",
        (MetricFamily::StdDev, _) => "builds",
        (_, 1) => "interval",
        (_, _) => "intervals",
    };
    format!("{occurrences} {unit}")
}

fn value_cell(family: MetricFamily, value: i64, detail: &str) -> Cell {
    match family {
        MetricFamily::Mttr => color_coded_repair_cell(value, detail),
        MetricFamily::Mttf => color_coded_fail_cell(value, detail),
        MetricFamily::StdDev => plain_duration_cell(value, detail),
    }
}

fn result_cell(family: MetricFamily, result: Option<&MetricResult>) -> Cell {
    match result {
        Some(r) if r.occurrences > 0 => value_cell(
            family,
            r.value,
            &occurrence_detail(family, r.occurrences),
        ),
        _ => not_available_cell(),
    }
}

/// Renders a human-readable summary of a job's reliability metrics.
///
/// Displays one table with a row per metric family and a column per window:
/// - Mean Time To Repair: green up to 1 hour, yellow up to 1 day, red beyond
/// - Mean Time To Fail: green from 7 days, yellow from 1 day, red below
/// - Duration Std Deviation: uncolored
///
/// A window without a single completed interval shows `N/A`.
pub fn render_summary(job: &str, report: &MetricsReport) -> String {
    let mut output = String::new();

    add_section_header(&mut output, "📊", "Overview");
    let _ = writeln!(
        output,
        "  {} {}\n  {} {}\n  {} {}\n",
        label("Job:"),
        job_name(job),
        label("Builds analyzed:"),
        emphasis(report.total_builds),
        label("Computed at:"),
        label(report.computed_at.format("%Y-%m-%d %H:%M UTC"))
    );

    if report.total_builds == 0 {
        let _ = writeln!(output, "{}", emphasis("No build history found."));
        return output;
    }

    add_section_header(&mut output, "⏱️", "Reliability");

    let mut table = create_table();
    table.set_header(window_header());
    for family in MetricFamily::ALL {
        let mut row = vec![Cell::new(family.title())];
        row.extend(
            Window::ALL
                .iter()
                .map(|&window| result_cell(family, report.get(family, window))),
        );
        table.add_row(row);
    }
    let _ = writeln!(output, "{table}");

    output
}

/// Renders the metric values last stored for a job, without recomputing them.
pub fn render_stored(job: &str, store: &MetricStore) -> String {
    let mut output = String::new();

    add_section_header(&mut output, "💾", "Stored Metrics");
    let _ = writeln!(output, "  {} {}\n", label("Job:"), job_name(job));

    let mut table = create_table();
    table.set_header(window_header());
    for family in MetricFamily::ALL {
        let mut row = vec![Cell::new(family.title())];
        row.extend(Window::ALL.iter().map(|&window| {
            store
                .value(family, window)
                .map_or_else(not_available_cell, |value| {
                    value_cell(family, value, &family.key(window))
                })
        }));
        table.add_row(row);
    }
    let _ = writeln!(output, "{table}");

    output
}

/// Renders how the duration dispersion evolved build after build.
pub fn render_trend(job: &str, points: &[TrendPoint]) -> String {
    let mut output = String::new();

    add_section_header(&mut output, "📈", "Duration Dispersion Trend");
    let _ = writeln!(output, "  {} {}\n", label("Job:"), job_name(job));

    if points.is_empty() {
        let _ = writeln!(output, "{}", emphasis("No build history found."));
        return output;
    }

    let mut table = create_table();
    table.set_header(create_cyan_header(&["Build", "Builds", "Std Deviation"]));
    for point in points {
        table.add_row(vec![
            Cell::new(format!("#{}", point.number)),
            Cell::new(point.occurrences),
            Cell::new(format_duration(point.value)),
        ]);
    }
    let _ = writeln!(output, "{table}");

    output
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metrics::compute_all;
    use crate::record::{BuildRecord, Outcome};
    use chrono::{DateTime, Duration, Utc};

    fn now() -> DateTime<Utc> {
        DateTime::from_timestamp_millis(1_700_000_000_000).unwrap()
    }

    fn report() -> MetricsReport {
        let now = now();
        let records = vec![
            BuildRecord::new(1, now - Duration::seconds(30), 1_500, Outcome::Success),
            BuildRecord::new(2, now - Duration::seconds(20), 2_500, Outcome::Failure),
            BuildRecord::new(3, now - Duration::seconds(10), 2_000, Outcome::Success),
        ];
        compute_all(&records, now)
    }

    #[test]
    fn summary_lists_every_family() {
        console::set_colors_enabled(false);
        let rendered = render_summary("group/app", &report());

        assert!(rendered.contains("group/app"));
        assert!(rendered.contains("Mean Time To Repair"));
        assert!(rendered.contains("Mean Time To Fail"));
        assert!(rendered.contains("Duration Std Deviation"));
        assert!(rendered.contains("10.0 sec"), "MTTR of 10 seconds: {rendered}");
        assert!(rendered.contains("1 interval"));
        assert!(rendered.contains("3 builds"));
    }

    #[test]
    fn summary_without_history() {
        console::set_colors_enabled(false);
        let rendered = render_summary("empty", &compute_all(&[], now()));

        assert!(rendered.contains("No build history found."));
        assert!(!rendered.contains("Mean Time To Repair"));
    }

    #[test]
    fn stored_values_missing_show_not_available() {
        console::set_colors_enabled(false);
        let temp_dir = tempfile::TempDir::new().unwrap();
        let store = MetricStore::new(temp_dir.path());

        let rendered = render_stored("job", &store);

        assert!(rendered.contains("N/A"));
    }

    #[test]
    fn stored_values_are_rendered() {
        console::set_colors_enabled(false);
        let temp_dir = tempfile::TempDir::new().unwrap();
        let store = MetricStore::new(temp_dir.path());
        store.write_report(&report()).unwrap();

        let rendered = render_stored("job", &store);

        assert!(rendered.contains("10.0 sec"));
        assert!(rendered.contains("mttrLast7days"));
    }

    #[test]
    fn trend_has_one_row_per_build() {
        console::set_colors_enabled(false);
        let points = vec![
            TrendPoint {
                number: 1,
                occurrences: 1,
                value: 0,
            },
            TrendPoint {
                number: 2,
                occurrences: 2,
                value: 707,
            },
        ];

        let rendered = render_trend("job", &points);

        assert!(rendered.contains("#1"));
        assert!(rendered.contains("#2"));
        assert!(rendered.contains("707 ms"));
    }
}
