//! CLI route: single route table and run context. Dispatches to the pipeline
//! and presentation.

use crate::analyzer::EnvironmentAnalyzer;
use crate::cli::parse::Commands;
use crate::cli::presentation::{format_modules_json, format_modules_text, format_run_summary_text};
use crate::config::{ConfigLoader, GENERATED_PACKAGE, RUNTIME};
use crate::error::PipelineError;
use crate::model::ApplicationManifest;
use crate::pipeline::Pipeline;
use crate::registry::ModuleRegistry;
use crate::sink::DirectorySink;
use crate::types::Profile;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info};

/// Runtime context for CLI execution: the pipeline over a module registry.
pub struct RunContext {
    pipeline: Pipeline,
}

impl RunContext {
    /// Context over the standard module catalogue.
    pub fn new() -> Self {
        Self::with_registry(ModuleRegistry::with_standard_modules())
    }

    pub fn with_registry(registry: ModuleRegistry) -> Self {
        Self {
            pipeline: Pipeline::new(registry),
        }
    }

    pub fn pipeline(&self) -> &Pipeline {
        &self.pipeline
    }

    /// Execute a CLI command via the single route table.
    pub fn execute(&self, command: &Commands) -> Result<String, PipelineError> {
        match command {
            Commands::Run {
                application,
                output,
                config,
                package,
                runtime,
            } => self.handle_run(
                application,
                output,
                config.as_deref(),
                package.as_deref(),
                *runtime,
            ),
            Commands::Modules { runtime, format } => self.handle_modules(*runtime, format),
            Commands::ExportConfig { runtime, file } => self.handle_export_config(*runtime, file),
        }
    }

    fn handle_run(
        &self,
        application: &Path,
        output: &Path,
        config: Option<&Path>,
        package: Option<&str>,
        runtime: Option<Profile>,
    ) -> Result<String, PipelineError> {
        let mut overrides: Vec<(String, String)> = Vec::new();
        if let Some(package) = package {
            overrides.push((GENERATED_PACKAGE.to_string(), package.to_string()));
        }
        if let Some(runtime) = runtime {
            overrides.push((RUNTIME.to_string(), runtime.slug().to_string()));
        }
        let config = ConfigLoader::load(config, &overrides)?;
        debug!(keys = config.len(), "Configuration ready");

        let manifest = ApplicationManifest::load(application)?;
        let (snapshot, model) = manifest.into_parts();
        info!(
            application = %application.display(),
            output = %output.display(),
            "Loaded application manifest"
        );

        let sink = DirectorySink::new(PathBuf::from(output));
        let summary = self.pipeline.run(
            Arc::new(config),
            Arc::new(EnvironmentAnalyzer::new(snapshot)),
            Arc::new(model),
            &sink,
        )?;
        Ok(format_run_summary_text(&summary, output))
    }

    fn handle_modules(&self, runtime: Profile, format: &str) -> Result<String, PipelineError> {
        let descriptors = self.pipeline.registry().list(runtime)?;
        match format {
            "json" => format_modules_json(runtime, &descriptors),
            _ => Ok(format_modules_text(runtime, &descriptors)),
        }
    }

    fn handle_export_config(&self, runtime: Profile, file: &Path) -> Result<String, PipelineError> {
        let registry = self.pipeline.registry();
        registry.export_configuration(runtime, file)?;
        let count = registry.list(runtime)?.len();
        info!(runtime = %runtime, file = %file.display(), modules = count, "Exported configuration");
        Ok(format!(
            "Wrote sample configuration for {} module(s) ({}) to {}",
            count,
            runtime,
            file.display()
        ))
    }
}

impl Default for RunContext {
    fn default() -> Self {
        Self::new()
    }
}
