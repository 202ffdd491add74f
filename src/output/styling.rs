use std::fmt::Display;

use console::{style, StyledObject};

// One helper per role a piece of text plays in the report, not per colour

/// Field names in overview blocks, e.g. `Job:`.
pub fn label(text: impl Display) -> StyledObject<String> {
    style(text.to_string()).dim()
}

pub fn job_name(text: impl Display) -> StyledObject<String> {
    style(text.to_string()).cyan()
}

/// Counts and notices the reader should not miss.
pub fn emphasis(text: impl Display) -> StyledObject<String> {
    style(text.to_string()).bright().yellow()
}

pub fn section_title(text: impl Display) -> StyledObject<String> {
    style(text.to_string()).bright().underlined()
}

pub fn section_icon(text: impl Display) -> StyledObject<String> {
    style(text.to_string()).bright()
}

pub fn tool_name(text: impl Display) -> StyledObject<String> {
    style(text.to_string()).magenta().bold()
}
