//! CLI output: error mapping from pipeline errors to a stable CLI surface.

use crate::config::GENERATED_PACKAGE;
use crate::error::PipelineError;

/// Map pipeline errors to a string for CLI output.
pub fn map_error(e: &PipelineError) -> String {
    match e {
        PipelineError::MissingConfigKey(key) if key == GENERATED_PACKAGE => format!(
            "Error: {}\nSet '{}' in the configuration file or pass --package.",
            e, GENERATED_PACKAGE
        ),
        PipelineError::ModuleFailed { module, source } => {
            format!("Error: optimization module '{}' failed: {}", module, source)
        }
        _ => format!("Error: {}", e),
    }
}
