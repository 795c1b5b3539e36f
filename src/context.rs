//! Generation context: the per-run blackboard every module reads and writes.
//!
//! Modules run one at a time and receive `&mut GenerationContext`. The only
//! state touched concurrently is the diagnostics log, which availability
//! checks append to from worker threads.

use crate::analyzer::EnvironmentAnalyzer;
use crate::artifact::{runtime, ArtifactRef, MethodSpec, SourceUnit, Statement};
use crate::config::Configuration;
use crate::discovery::SubstitutionMap;
use crate::error::PipelineError;
use crate::model::Application;
use crate::types::Profile;
use parking_lot::Mutex;
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::debug;

/// Final state handed to deferred resource writers.
#[derive(Debug, Clone, Copy)]
pub struct FinishView<'a> {
    pub namespace: &'a str,
    pub build_time_init: &'a BTreeSet<String>,
    pub excluded_resources: &'a BTreeSet<String>,
}

/// Writer invoked at `finish` with the absolute resource path.
pub type ResourceWriter =
    Box<dyn FnOnce(&Path, &FinishView<'_>) -> std::io::Result<()> + Send + Sync + 'static>;

struct DeferredWrite {
    path: String,
    writer: ResourceWriter,
}

/// Categorized, append-only diagnostics log. Safe for concurrent append.
#[derive(Debug, Default)]
pub struct Diagnostics {
    entries: Mutex<BTreeMap<String, Vec<String>>>,
}

impl Diagnostics {
    pub fn add(&self, category: &str, message: impl Into<String>) {
        self.entries
            .lock()
            .entry(category.to_string())
            .or_default()
            .push(message.into());
    }

    pub fn messages(&self, category: &str) -> Vec<String> {
        self.entries
            .lock()
            .get(category)
            .cloned()
            .unwrap_or_default()
    }

    pub fn snapshot(&self) -> BTreeMap<String, Vec<String>> {
        self.entries.lock().clone()
    }

    pub fn counts(&self) -> BTreeMap<String, usize> {
        self.entries
            .lock()
            .iter()
            .map(|(category, messages)| (category.clone(), messages.len()))
            .collect()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }
}

/// Published by the environment-deduction module.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DeducedEnvironment {
    pub deduce_environment: bool,
}

/// Body of a static optimization loader: the `load` statements plus any
/// helper methods they call.
#[derive(Debug, Clone, Default)]
pub struct LoaderBody {
    pub statements: Vec<Statement>,
    pub helpers: Vec<MethodSpec>,
}

impl From<Vec<Statement>> for LoaderBody {
    fn from(statements: Vec<Statement>) -> Self {
        Self {
            statements,
            helpers: Vec::new(),
        }
    }
}

/// Everything a run produced, detached from the context.
#[derive(Debug, Clone, Default)]
pub struct GenerationOutput {
    pub namespace: String,
    pub profile: Option<Profile>,
    pub units: Vec<SourceUnit>,
    pub diagnostics: BTreeMap<String, Vec<String>>,
    pub excluded_resources: BTreeSet<String>,
    pub build_time_init: BTreeSet<String>,
    pub executed_modules: Vec<String>,
}

pub struct GenerationContext {
    namespace: String,
    profile: Profile,
    config: Arc<dyn Configuration>,
    analyzer: Arc<EnvironmentAnalyzer>,
    application: Arc<dyn Application>,
    diagnostics: Diagnostics,
    excluded_resources: BTreeSet<String>,
    build_time_init: BTreeSet<String>,
    deferred_writes: Vec<DeferredWrite>,
    units: Vec<SourceUnit>,
    unit_names: BTreeSet<String>,
    static_initializers: Vec<MethodSpec>,
    substitutions: Option<SubstitutionMap>,
    deduced_environment: Option<DeducedEnvironment>,
    executed_modules: Vec<String>,
    finished: bool,
}

impl GenerationContext {
    pub fn new(
        namespace: impl Into<String>,
        profile: Profile,
        config: Arc<dyn Configuration>,
        analyzer: Arc<EnvironmentAnalyzer>,
        application: Arc<dyn Application>,
    ) -> Self {
        Self {
            namespace: namespace.into(),
            profile,
            config,
            analyzer,
            application,
            diagnostics: Diagnostics::default(),
            excluded_resources: BTreeSet::new(),
            build_time_init: BTreeSet::new(),
            deferred_writes: Vec::new(),
            units: Vec::new(),
            unit_names: BTreeSet::new(),
            static_initializers: Vec::new(),
            substitutions: None,
            deduced_environment: None,
            executed_modules: Vec::new(),
            finished: false,
        }
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    pub fn profile(&self) -> Profile {
        self.profile
    }

    pub fn config(&self) -> &dyn Configuration {
        self.config.as_ref()
    }

    pub fn analyzer(&self) -> &EnvironmentAnalyzer {
        &self.analyzer
    }

    pub fn application(&self) -> &dyn Application {
        self.application.as_ref()
    }

    pub fn diagnostics(&self) -> &Diagnostics {
        &self.diagnostics
    }

    pub fn add_diagnostic(&self, category: &str, message: impl Into<String>) {
        self.diagnostics.add(category, message);
    }

    pub fn units(&self) -> &[SourceUnit] {
        &self.units
    }

    pub fn unit(&self, name: &str) -> Option<&SourceUnit> {
        self.units.iter().find(|u| u.name == name)
    }

    pub fn static_initializers(&self) -> &[MethodSpec] {
        &self.static_initializers
    }

    pub fn excluded_resources(&self) -> &BTreeSet<String> {
        &self.excluded_resources
    }

    pub fn build_time_init(&self) -> &BTreeSet<String> {
        &self.build_time_init
    }

    pub fn executed_modules(&self) -> &[String] {
        &self.executed_modules
    }

    pub fn is_finished(&self) -> bool {
        self.finished
    }

    pub(crate) fn mark_executed(&mut self, module_id: &str) {
        self.executed_modules.push(module_id.to_string());
    }

    fn ensure_open(&self) -> Result<(), PipelineError> {
        if self.finished {
            Err(PipelineError::AlreadyFinished)
        } else {
            Ok(())
        }
    }

    /// Append a generated unit. Qualified names must be unique per run.
    pub fn register_unit(&mut self, unit: SourceUnit) -> Result<ArtifactRef, PipelineError> {
        self.ensure_open()?;
        let qualified = unit.qualified_name();
        if !self.unit_names.insert(qualified.clone()) {
            return Err(PipelineError::ArtifactNameCollision(qualified));
        }
        debug!(unit = %qualified, "Registered generated unit");
        let artifact = unit.artifact_ref();
        self.units.push(unit);
        Ok(artifact)
    }

    /// Record a static initializer called from the entry point.
    pub fn register_static_initializer(&mut self, method: MethodSpec) -> Result<(), PipelineError> {
        self.ensure_open()?;
        if self.static_initializers.iter().any(|m| m.name == method.name) {
            return Err(PipelineError::ArtifactNameCollision(format!(
                "static initializer {}",
                method.name
            )));
        }
        self.static_initializers.push(method);
        Ok(())
    }

    /// Generate an optimization loader unit for `kind` and register it with
    /// the runtime's loader service.
    pub fn register_static_optimization<F>(
        &mut self,
        class_name: &str,
        kind: &str,
        body: F,
    ) -> Result<ArtifactRef, PipelineError>
    where
        F: FnOnce() -> LoaderBody,
    {
        self.ensure_open()?;
        let LoaderBody {
            statements,
            helpers,
        } = body();
        let unit = SourceUnit::new(self.namespace.clone(), class_name)
            .implementing(format!("{}<{}>", runtime::OPTIMIZATION_LOADER, kind))
            .with_method(MethodSpec::new("load").returns(kind).body(statements))
            .with_methods(helpers);
        self.require_build_time_init(kind);
        let artifact = self.register_unit(unit)?;
        self.register_service_implementation(runtime::OPTIMIZATION_LOADER, class_name)?;
        Ok(artifact)
    }

    /// Queue a resource write, run at `finish` in registration order.
    pub fn register_resource<F>(&mut self, path: impl Into<String>, writer: F) -> Result<(), PipelineError>
    where
        F: FnOnce(&Path, &FinishView<'_>) -> std::io::Result<()> + Send + Sync + 'static,
    {
        self.ensure_open()?;
        self.deferred_writes.push(DeferredWrite {
            path: path.into(),
            writer: Box::new(writer),
        });
        Ok(())
    }

    /// Append `<namespace>.<simple_name>` to the service manifest of
    /// `service_type`.
    pub fn register_service_implementation(
        &mut self,
        service_type: &str,
        simple_name: &str,
    ) -> Result<(), PipelineError> {
        let line = format!("{}.{}", self.namespace, simple_name);
        self.register_resource(service_file_path(service_type), move |path, _| {
            let mut file = std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)?;
            writeln!(file, "{}", line)
        })
    }

    /// Replace the service manifest of `service_type` with a single entry.
    pub fn write_service_file(&mut self, service_type: &str, simple_name: &str) -> Result<(), PipelineError> {
        let line = format!("{}.{}\n", self.namespace, simple_name);
        self.register_resource(service_file_path(service_type), move |path, _| {
            std::fs::write(path, line)
        })
    }

    pub fn exclude_resource(&mut self, path: impl Into<String>) {
        self.excluded_resources.insert(path.into());
    }

    pub fn require_build_time_init(&mut self, name: impl Into<String>) {
        self.build_time_init.insert(name.into());
    }

    /// Run `f` and return, alongside its result, clones of the units it
    /// registered. The units stay registered.
    pub fn track_units<T, F>(&mut self, f: F) -> Result<(T, Vec<SourceUnit>), PipelineError>
    where
        F: FnOnce(&mut Self) -> Result<T, PipelineError>,
    {
        let before = self.units.len();
        let value = f(self)?;
        Ok((value, self.units[before..].to_vec()))
    }

    pub fn publish_substitutions(&mut self, map: SubstitutionMap) {
        self.substitutions = Some(map);
    }

    pub fn substitutions(&self) -> Option<&SubstitutionMap> {
        self.substitutions.as_ref()
    }

    pub fn publish_deduced_environment(&mut self, value: DeducedEnvironment) {
        self.deduced_environment = Some(value);
    }

    pub fn deduced_environment(&self) -> Option<DeducedEnvironment> {
        self.deduced_environment
    }

    /// Run every deferred resource write once, under `resources_dir`.
    ///
    /// A file left by an earlier run is removed before the first writer of
    /// this run touches it, so appending writers always start empty.
    pub fn finish(&mut self, resources_dir: &Path) -> Result<(), PipelineError> {
        self.ensure_open()?;
        self.finished = true;

        let writes = std::mem::take(&mut self.deferred_writes);
        debug!(count = writes.len(), dir = %resources_dir.display(), "Flushing deferred resource writes");
        let view = FinishView {
            namespace: &self.namespace,
            build_time_init: &self.build_time_init,
            excluded_resources: &self.excluded_resources,
        };
        let mut touched: BTreeSet<PathBuf> = BTreeSet::new();
        for DeferredWrite { path, writer } in writes {
            let target: PathBuf = resources_dir.join(&path);
            if let Some(parent) = target.parent() {
                std::fs::create_dir_all(parent).map_err(|source| PipelineError::ResourceWrite {
                    path: parent.to_path_buf(),
                    source,
                })?;
            }
            if touched.insert(target.clone()) {
                remove_stale(&target).map_err(|source| PipelineError::ResourceWrite {
                    path: target.clone(),
                    source,
                })?;
            }
            writer(&target, &view).map_err(|source| PipelineError::ResourceWrite {
                path: target.clone(),
                source,
            })?;
        }
        Ok(())
    }

    pub fn into_output(self) -> GenerationOutput {
        GenerationOutput {
            namespace: self.namespace,
            profile: Some(self.profile),
            units: self.units,
            diagnostics: self.diagnostics.snapshot(),
            excluded_resources: self.excluded_resources,
            build_time_init: self.build_time_init,
            executed_modules: self.executed_modules,
        }
    }
}

fn remove_stale(path: &Path) -> std::io::Result<()> {
    match std::fs::remove_file(path) {
        Err(err) if err.kind() != std::io::ErrorKind::NotFound => Err(err),
        _ => Ok(()),
    }
}

/// Relative path of a service-registration manifest.
pub fn service_file_path(service_type: &str) -> String {
    format!("META-INF/services/{}", service_type)
}
