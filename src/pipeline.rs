//! One-shot pipeline run.
//!
//! Order of a run: read the target namespace and profile, build the context,
//! schedule (every registry error surfaces before a module runs), run each
//! module, synthesize the entry point, flush deferred writes, hand the output
//! to the sink. Any error aborts the run; deferred writes queued before the
//! failure are dropped with the context.

use crate::analyzer::EnvironmentAnalyzer;
use crate::config::{Configuration, GENERATED_PACKAGE};
use crate::context::{GenerationContext, GenerationOutput};
use crate::error::PipelineError;
use crate::model::Application;
use crate::optimizers::entry_point;
use crate::registry::ModuleRegistry;
use crate::sink::ArtifactSink;
use crate::types::Profile;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info};

/// What a run produced, in summary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunSummary {
    pub namespace: String,
    pub profile: Profile,
    pub executed_modules: Vec<String>,
    /// Qualified names of generated units, in registration order.
    pub units: Vec<String>,
    pub excluded_resources: BTreeSet<String>,
    pub build_time_init: BTreeSet<String>,
    /// Message count per diagnostics category.
    pub diagnostics: BTreeMap<String, usize>,
    /// RFC 3339 UTC timestamp.
    pub generated_at: String,
}

impl RunSummary {
    pub fn from_output(output: &GenerationOutput, profile: Profile) -> Self {
        Self {
            namespace: output.namespace.clone(),
            profile,
            executed_modules: output.executed_modules.clone(),
            units: output.units.iter().map(|u| u.qualified_name()).collect(),
            excluded_resources: output.excluded_resources.clone(),
            build_time_init: output.build_time_init.clone(),
            diagnostics: output
                .diagnostics
                .iter()
                .map(|(category, messages)| (category.clone(), messages.len()))
                .collect(),
            generated_at: Utc::now().to_rfc3339(),
        }
    }
}

pub struct Pipeline {
    registry: ModuleRegistry,
}

impl Pipeline {
    pub fn new(registry: ModuleRegistry) -> Self {
        Self { registry }
    }

    /// Pipeline over the standard module catalogue.
    pub fn standard() -> Self {
        Self::new(ModuleRegistry::with_standard_modules())
    }

    pub fn registry(&self) -> &ModuleRegistry {
        &self.registry
    }

    /// Run every scheduled module and flush resources under `resources_dir`.
    pub fn generate(
        &self,
        config: Arc<dyn Configuration>,
        analyzer: Arc<EnvironmentAnalyzer>,
        application: Arc<dyn Application>,
        resources_dir: &Path,
    ) -> Result<GenerationOutput, PipelineError> {
        let namespace = config.require(GENERATED_PACKAGE)?;
        let profile = config.profile()?;
        let modules = self.registry.schedule(profile, config.as_ref())?;
        info!(
            %profile,
            namespace = %namespace,
            modules = modules.len(),
            "Starting optimization run"
        );

        let mut ctx = GenerationContext::new(namespace, profile, config, analyzer, application);
        for module in &modules {
            debug!(module = %module.id(), "Running module");
            module
                .generate(&mut ctx)
                .map_err(|source| PipelineError::ModuleFailed {
                    module: module.id().to_string(),
                    source: Box::new(source),
                })?;
            ctx.mark_executed(module.id());
        }

        entry_point::synthesize(&mut ctx)?;
        ctx.finish(resources_dir)?;
        info!(units = ctx.units().len(), "Optimization run complete");
        Ok(ctx.into_output())
    }

    /// Full run: generate, then hand the output to `sink`.
    pub fn run(
        &self,
        config: Arc<dyn Configuration>,
        analyzer: Arc<EnvironmentAnalyzer>,
        application: Arc<dyn Application>,
        sink: &dyn ArtifactSink,
    ) -> Result<RunSummary, PipelineError> {
        let resources_dir = sink.resources_dir();
        let output = self.generate(config, analyzer, application, &resources_dir)?;
        let profile = output.profile.unwrap_or(Profile::Dynamic);
        let summary = RunSummary::from_output(&output, profile);
        sink.accept(&output, &summary)?;
        Ok(summary)
    }
}
