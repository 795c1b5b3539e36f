//! Artifact sink: materializes a run's output.
//!
//! Layout under the output directory:
//!
//! ```text
//! resources/                      deferred resource writes
//! sources/<namespace path>/*.json one structured unit per file
//! logs/<category>.log             diagnostics, one message per line
//! logs/resource-filter.txt        resources packaging must drop
//! run-summary.json
//! ```

use crate::context::GenerationOutput;
use crate::error::PipelineError;
use crate::pipeline::RunSummary;
use std::path::{Path, PathBuf};
use tracing::debug;

pub trait ArtifactSink: Send + Sync {
    /// Directory deferred resource writes are flushed into.
    fn resources_dir(&self) -> PathBuf;

    fn accept(&self, output: &GenerationOutput, summary: &RunSummary) -> Result<(), PipelineError>;
}

/// Writes everything below one output directory.
#[derive(Debug, Clone)]
pub struct DirectorySink {
    root: PathBuf,
}

impl DirectorySink {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn sources_dir(&self) -> PathBuf {
        self.root.join("sources")
    }

    pub fn logs_dir(&self) -> PathBuf {
        self.root.join("logs")
    }

    fn write(&self, path: &Path, content: impl AsRef<[u8]>) -> Result<(), PipelineError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|source| PipelineError::ResourceWrite {
                path: parent.to_path_buf(),
                source,
            })?;
        }
        std::fs::write(path, content).map_err(|source| PipelineError::ResourceWrite {
            path: path.to_path_buf(),
            source,
        })
    }

    fn to_json<T: serde::Serialize>(value: &T) -> Result<String, PipelineError> {
        serde_json::to_string_pretty(value)
            .map_err(|e| PipelineError::GenerationFailed(format!("Failed to serialize output: {}", e)))
    }
}

impl ArtifactSink for DirectorySink {
    fn resources_dir(&self) -> PathBuf {
        self.root.join("resources")
    }

    fn accept(&self, output: &GenerationOutput, summary: &RunSummary) -> Result<(), PipelineError> {
        let sources = self.sources_dir();
        for unit in &output.units {
            let mut path = sources.clone();
            path.extend(unit.namespace.split('.').filter(|s| !s.is_empty()));
            path.push(format!("{}.json", unit.name));
            self.write(&path, Self::to_json(unit)?)?;
        }

        let logs = self.logs_dir();
        for (category, messages) in &output.diagnostics {
            let mut content = messages.join("\n");
            content.push('\n');
            self.write(&logs.join(format!("{}.log", category.to_lowercase())), content)?;
        }

        let mut filter: String = output
            .excluded_resources
            .iter()
            .map(|r| format!("{}\n", r))
            .collect();
        if filter.is_empty() {
            filter.push('\n');
        }
        self.write(&logs.join("resource-filter.txt"), filter)?;

        self.write(&self.root.join("run-summary.json"), Self::to_json(summary)?)?;
        debug!(root = %self.root.display(), units = output.units.len(), "Materialized run output");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::artifact::SourceUnit;
    use crate::types::Profile;
    use std::collections::BTreeMap;
    use tempfile::TempDir;

    #[test]
    fn test_layout() {
        let temp_dir = TempDir::new().unwrap();
        let sink = DirectorySink::new(temp_dir.path());
        let mut diagnostics = BTreeMap::new();
        diagnostics.insert(
            "ServiceLoading".to_string(),
            vec!["first".to_string(), "second".to_string()],
        );
        let output = GenerationOutput {
            namespace: "com.example".to_string(),
            profile: Some(Profile::Dynamic),
            units: vec![SourceUnit::new("com.example", "GreeterFactory")],
            diagnostics,
            excluded_resources: ["application.yml".to_string()].into_iter().collect(),
            ..Default::default()
        };
        let summary = RunSummary::from_output(&output, Profile::Dynamic);
        sink.accept(&output, &summary).unwrap();

        let unit_path = temp_dir
            .path()
            .join("sources/com/example/GreeterFactory.json");
        let unit: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(unit_path).unwrap()).unwrap();
        assert_eq!(unit["name"], "GreeterFactory");

        assert_eq!(
            std::fs::read_to_string(temp_dir.path().join("logs/serviceloading.log")).unwrap(),
            "first\nsecond\n"
        );
        assert_eq!(
            std::fs::read_to_string(temp_dir.path().join("logs/resource-filter.txt")).unwrap(),
            "application.yml\n"
        );
        let written: RunSummary = serde_json::from_str(
            &std::fs::read_to_string(temp_dir.path().join("run-summary.json")).unwrap(),
        )
        .unwrap();
        assert_eq!(written.units, vec!["com.example.GreeterFactory"]);
        assert_eq!(written.diagnostics["ServiceLoading"], 2);
    }
}
