//! CLI presentation: text and json formatters per command family.

mod modules;
mod run;

pub use modules::{format_modules_json, format_modules_text};
pub use run::format_run_summary_text;

use owo_colors::OwoColorize;

/// Bold, underlined section heading.
pub(crate) fn format_section_heading(title: &str) -> String {
    format!("{}", title.bold().underline())
}
