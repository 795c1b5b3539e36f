//! CLI domain: parse, route, output, and presentation only.
//! Orchestration lives in the pipeline; the route table only wires inputs to it.

mod output;
mod parse;
mod presentation;
mod route;

pub use output::map_error;
pub use parse::{Cli, Commands};
pub use presentation::{format_modules_json, format_modules_text, format_run_summary_text};
pub use route::RunContext;
