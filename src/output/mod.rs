mod duration;
mod exports;
mod styling;
mod summary;
mod tables;

pub use exports::{export_report, export_stored, export_trend};
pub use summary::{render_stored, render_summary, render_trend};

use styling::{label, tool_name};

/// Prints the `buildpulse` banner to stderr, keeping stdout clean for exports.
///
/// Names the three tracked metrics so a bare `buildpulse` run says what it measures.
pub fn print_banner() {
    eprintln!(
        "\n{} {}\n  {}\n",
        tool_name("📈 buildpulse"),
        label(env!("CARGO_PKG_VERSION")),
        label("MTTR · MTTF · build duration spread, per job")
    );
}
