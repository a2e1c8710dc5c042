//! Terminal styling.

use colored::Colorize;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Style {
    Greeting,
    Prompt,
    Answer,
}

/// Decorate `text` for `style`. With `enabled == false` the text is returned
/// unchanged.
#[must_use]
pub fn paint(style: Style, text: &str, enabled: bool) -> String {
    if !enabled {
        return text.to_string();
    }

    match style {
        Style::Greeting => text.bright_blue().to_string(),
        Style::Prompt => text.bright_cyan().to_string(),
        Style::Answer => text.bright_green().to_string(),
    }
}
