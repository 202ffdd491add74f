use comfy_table::modifiers::UTF8_ROUND_CORNERS;
use comfy_table::presets::UTF8_FULL;
use comfy_table::{Cell, Color as TableColor, ContentArrangement, Table};

use super::duration::format_duration;

const HOUR_MS: i64 = 3_600_000;
const DAY_MS: i64 = 24 * HOUR_MS;

/// Table and cell creation helpers
pub fn create_table() -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .apply_modifier(UTF8_ROUND_CORNERS)
        .set_content_arrangement(ContentArrangement::Dynamic);
    table
}

pub fn create_cyan_header(labels: &[&str]) -> Vec<Cell> {
    labels
        .iter()
        .map(|label| Cell::new(*label).fg(TableColor::Cyan))
        .collect()
}

pub fn not_available_cell() -> Cell {
    Cell::new("N/A").fg(TableColor::DarkGrey)
}

/// Time to repair: shorter is better.
pub fn color_coded_repair_cell(ms: i64, detail: &str) -> Cell {
    let text = format!("{}\n{detail}", format_duration(ms));
    if ms <= HOUR_MS {
        Cell::new(text).fg(TableColor::Green)
    } else if ms <= DAY_MS {
        Cell::new(text).fg(TableColor::Yellow)
    } else {
        Cell::new(text).fg(TableColor::Red)
    }
}

/// Time to fail: longer is better.
pub fn color_coded_fail_cell(ms: i64, detail: &str) -> Cell {
    let text = format!("{}\n{detail}", format_duration(ms));
    if ms >= 7 * DAY_MS {
        Cell::new(text).fg(TableColor::Green)
    } else if ms >= DAY_MS {
        Cell::new(text).fg(TableColor::Yellow)
    } else {
        Cell::new(text).fg(TableColor::Red)
    }
}

pub fn plain_duration_cell(ms: i64, detail: &str) -> Cell {
    Cell::new(format!("{}\n{detail}", format_duration(ms)))
}
