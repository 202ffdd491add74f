use anyhow::Result;
use indexmap::IndexMap;
use serde::Serialize;
use std::io::Write;

use crate::config::OutputFormat;
use crate::metrics::{MetricFamily, MetricsReport, TrendPoint};
use crate::window::Window;

/// Exports a metrics report in a machine-readable format.
///
/// - JSON: the whole report, grouped by family then window
/// - CSV: one row per family and window
///
/// Summary output is rendered by the `summary` module instead.
pub fn export_report(
    report: &MetricsReport,
    format: OutputFormat,
    pretty: bool,
    output: &mut dyn Write,
) -> Result<()> {
    match format {
        OutputFormat::Summary => {
            unreachable!("Summary format should be handled in CLI")
        }
        OutputFormat::Json => export_json(report, pretty, output),
        OutputFormat::Csv => export_report_csv(report, output),
    }
}

/// Exports stored metric values (`key → milliseconds`).
pub fn export_stored(
    values: &IndexMap<String, i64>,
    format: OutputFormat,
    pretty: bool,
    output: &mut dyn Write,
) -> Result<()> {
    match format {
        OutputFormat::Summary => {
            unreachable!("Summary format should be handled in CLI")
        }
        OutputFormat::Json => export_json(values, pretty, output),
        OutputFormat::Csv => {
            writeln!(output, "key,value_ms")?;
            for (key, value) in values {
                writeln!(output, "{key},{value}")?;
            }
            Ok(())
        }
    }
}

/// Exports a dispersion trend, one point per build.
pub fn export_trend(
    points: &[TrendPoint],
    format: OutputFormat,
    pretty: bool,
    output: &mut dyn Write,
) -> Result<()> {
    match format {
        OutputFormat::Summary => {
            unreachable!("Summary format should be handled in CLI")
        }
        OutputFormat::Json => export_json(points, pretty, output),
        OutputFormat::Csv => {
            writeln!(output, "number,occurrences,std_dev_ms")?;
            for point in points {
                writeln!(
                    output,
                    "{},{},{}",
                    point.number, point.occurrences, point.value
                )?;
            }
            Ok(())
        }
    }
}

fn export_json<T: Serialize + ?Sized>(
    value: &T,
    pretty: bool,
    output: &mut dyn Write,
) -> Result<()> {
    let json = if pretty {
        serde_json::to_string_pretty(value)?
    } else {
        serde_json::to_string(value)?
    };
    writeln!(output, "{json}")?;
    Ok(())
}

fn export_report_csv(report: &MetricsReport, output: &mut dyn Write) -> Result<()> {
    writeln!(output, "family,window,key,value_ms,occurrences")?;

    for family in MetricFamily::ALL {
        for window in Window::ALL {
            if let Some(result) = report.get(family, window) {
                writeln!(
                    output,
                    "{},{},{},{},{}",
                    family.key_prefix(),
                    window.key_suffix(),
                    result.name,
                    result.value,
                    result.occurrences
                )?;
            }
        }
    }

    Ok(())
}
