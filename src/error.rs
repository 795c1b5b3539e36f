//! Error types for the build-time optimization pipeline.

use std::path::PathBuf;
use thiserror::Error;

/// Fatal pipeline errors. Any of these aborts the run.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("Missing mandatory configuration key: {0}")]
    MissingConfigKey(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Unknown runtime profile: {0}")]
    UnknownProfile(String),

    #[error("Module '{0}' is registered more than once")]
    DuplicateModule(String),

    #[error("Module '{module}' depends on unknown module '{dependency}'")]
    UnknownDependency { module: String, dependency: String },

    #[error("Circular module dependency detected: {}", format_cycle(.0))]
    CyclicDependency(Vec<String>),

    #[error("Module '{module}' failed: {source}")]
    ModuleFailed {
        module: String,
        #[source]
        source: Box<PipelineError>,
    },

    #[error("Generated artifact name collision: {0}")]
    ArtifactNameCollision(String),

    #[error("Generation context already finished")]
    AlreadyFinished,

    #[error("Failed to write resource {path:?}: {source}")]
    ResourceWrite {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid application manifest: {0}")]
    Manifest(String),

    #[error("Generation failed: {0}")]
    GenerationFailed(String),

    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),
}

impl From<config::ConfigError> for PipelineError {
    fn from(err: config::ConfigError) -> Self {
        PipelineError::ConfigError(err.to_string())
    }
}

/// Format a cycle path for display: `a -> b -> a`.
fn format_cycle(cycle: &[String]) -> String {
    if cycle.is_empty() {
        return "empty cycle".to_string();
    }
    let mut result = cycle.join(" -> ");
    if let Some(first) = cycle.first() {
        result.push_str(" -> ");
        result.push_str(first);
    }
    result
}

/// Candidate loading failures. Never fatal: recorded as diagnostics.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum LoadError {
    #[error("type {0} not found")]
    NotFound(String),

    #[error("missing dependency {dependency} required by {candidate}")]
    MissingDependency {
        candidate: String,
        dependency: String,
    },
}

/// Probe construction failures during availability checks.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("unable to construct probe for {candidate}: {reason}")]
pub struct ProbeError {
    pub candidate: String,
    pub reason: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cycle_display_closes_loop() {
        let err = PipelineError::CyclicDependency(vec!["a".to_string(), "b".to_string()]);
        assert_eq!(
            err.to_string(),
            "Circular module dependency detected: a -> b -> a"
        );
    }

    #[test]
    fn test_module_failed_keeps_source() {
        let err = PipelineError::ModuleFailed {
            module: "cached.environment".to_string(),
            source: Box::new(PipelineError::ArtifactNameCollision("x.Y".to_string())),
        };
        assert!(err.to_string().contains("cached.environment"));
        assert!(err.to_string().contains("x.Y"));
    }
}
