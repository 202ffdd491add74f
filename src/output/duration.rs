const SECOND_MS: f64 = 1_000.0;
const MINUTE_MS: f64 = 60.0 * SECOND_MS;
const HOUR_MS: f64 = 60.0 * MINUTE_MS;
const DAY_MS: f64 = 24.0 * HOUR_MS;

/// Renders milliseconds in the largest fitting unit, e.g. `5.2 sec` or `1.3 days`.
#[allow(clippy::cast_precision_loss)]
pub fn format_duration(ms: i64) -> String {
    let sign = if ms < 0 { "-" } else { "" };
    let abs = ms.unsigned_abs();
    if abs < 1_000 {
        return format!("{sign}{abs} ms");
    }

    let value = abs as f64;
    let (amount, unit) = if value < MINUTE_MS {
        (value / SECOND_MS, "sec")
    } else if value < HOUR_MS {
        (value / MINUTE_MS, "min")
    } else if value < DAY_MS {
        (value / HOUR_MS, "hr")
    } else {
        (value / DAY_MS, "days")
    };
    format!("{sign}{amount:.1} {unit}")
}
