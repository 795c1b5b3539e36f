//! Service discovery and substitution engine.
//!
//! For each configured capability the engine walks the discovered candidates
//! in order, filters rejected and duplicate names, applies registered
//! substitutions, then loads and evaluates the remaining candidates in
//! parallel. The surviving set is classified, sorted and rendered by one of
//! the two table renderers (see [`table`]).
//!
//! Every drop is soft: a diagnostic under the `serviceloading` category and
//! nothing else. Only context errors (name collisions, a finished context)
//! escape [`DiscoveryEngine::run`].

pub mod availability;
pub mod modules;
pub mod substitution;
pub mod table;

pub use availability::{analyzer_for, DeepAnalyzer, DefaultAnalyzer, RequirementsAnalyzer};
pub use modules::ServiceLoaderModule;
pub use substitution::{StructuredConfigSubstitution, Substitution};
pub use table::{
    AheadOfTimeRenderer, DynamicRenderer, LazyServiceTable, ServiceCandidate, ServiceTable,
    ServiceTableSpec, StaticServiceTable, TableRenderer,
};

use crate::analyzer::EnvironmentAnalyzer;
use crate::artifact::SourceUnit;
use crate::codegen::DEFAULT_MAX_UNIT_SIZE;
use crate::config::Configuration;
use crate::context::{Diagnostics, GenerationContext};
use crate::error::PipelineError;
use crate::model::Application;
use rayon::prelude::*;
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Diagnostics category of the discovery engine.
pub const CATEGORY: &str = "serviceloading";

pub const SERVICE_TYPES: &str = "service.types";
pub const REJECTED: &str = "serviceloading.rejected.impls";
pub const FORCE_INCLUDE: &str = "serviceloading.force.include.impls";
pub const POSSIBLE_ENVIRONMENTS: &str = "possible.environments";
pub const MAX_UNIT_SIZE_KEY: &str = "serviceloading.max.unit.size";

/// Units generated in place of discovered candidates, keyed by the
/// capability the candidate was discovered under.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SubstitutionMap {
    entries: BTreeMap<String, Vec<SourceUnit>>,
}

impl SubstitutionMap {
    pub fn add(&mut self, capability: &str, units: Vec<SourceUnit>) {
        self.entries
            .entry(capability.to_string())
            .or_default()
            .extend(units);
    }

    /// Substitutes for a capability; empty when there are none.
    pub fn get(&self, capability: &str) -> &[SourceUnit] {
        self.entries
            .get(capability)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn capabilities(&self) -> impl Iterator<Item = &String> {
        self.entries.keys()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Total number of substitute units.
    pub fn len(&self) -> usize {
        self.entries.values().map(Vec::len).sum()
    }
}

/// Engine options read from configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscoverySettings {
    pub service_types: Vec<String>,
    pub rejected: BTreeSet<String>,
    pub force_include: BTreeSet<String>,
    pub possible_environments: Vec<String>,
    pub max_unit_size: usize,
}

impl Default for DiscoverySettings {
    fn default() -> Self {
        Self {
            service_types: Vec::new(),
            rejected: BTreeSet::new(),
            force_include: BTreeSet::new(),
            possible_environments: Vec::new(),
            max_unit_size: DEFAULT_MAX_UNIT_SIZE,
        }
    }
}

impl DiscoverySettings {
    pub fn from_config(config: &dyn Configuration) -> Result<Self, PipelineError> {
        let max_unit_size = config.integer(MAX_UNIT_SIZE_KEY, DEFAULT_MAX_UNIT_SIZE as i64)?;
        let max_unit_size = usize::try_from(max_unit_size)
            .ok()
            .filter(|size| *size > 0)
            .ok_or_else(|| {
                PipelineError::ConfigError(format!(
                    "{} must be a positive integer, got {}",
                    MAX_UNIT_SIZE_KEY, max_unit_size
                ))
            })?;
        Ok(Self {
            service_types: config.string_list(SERVICE_TYPES),
            rejected: config.string_list(REJECTED).into_iter().collect(),
            force_include: config.string_list(FORCE_INCLUDE).into_iter().collect(),
            possible_environments: config.string_list(POSSIBLE_ENVIRONMENTS),
            max_unit_size,
        })
    }
}

/// Result of a discovery run.
#[derive(Debug, Clone, Default)]
pub struct DiscoveryResult {
    /// Capability to its sorted candidates, in `service.types` order of
    /// discovery but keyed for deterministic iteration.
    pub tables: BTreeMap<String, Vec<ServiceCandidate>>,
    pub substitutions: SubstitutionMap,
}

impl DiscoveryResult {
    pub fn table_specs(&self) -> Vec<ServiceTableSpec> {
        self.tables
            .iter()
            .map(|(capability, candidates)| ServiceTableSpec::new(capability.clone(), candidates))
            .collect()
    }

    pub fn names(&self, capability: &str) -> Vec<&str> {
        self.tables
            .get(capability)
            .map(|candidates| candidates.iter().map(|c| c.name.as_str()).collect())
            .unwrap_or_default()
    }
}

enum Outcome {
    Dropped,
    /// Failed its requirements; may disable a configuration scope.
    Unavailable { scope: Option<String> },
    Kept(ServiceCandidate),
}

pub struct DiscoveryEngine {
    settings: DiscoverySettings,
    substitutions: BTreeMap<String, Arc<dyn Substitution>>,
}

impl DiscoveryEngine {
    pub fn new(settings: DiscoverySettings) -> Self {
        Self {
            settings,
            substitutions: BTreeMap::new(),
        }
    }

    pub fn settings(&self) -> &DiscoverySettings {
        &self.settings
    }

    /// Register a substitution for the candidate it replaces. A later
    /// registration for the same candidate wins.
    pub fn register_substitution(&mut self, substitution: Arc<dyn Substitution>) {
        debug!(candidate = %substitution.replaces(), "Registered substitution");
        self.substitutions
            .insert(substitution.replaces().to_string(), substitution);
    }

    pub fn run(&self, ctx: &mut GenerationContext) -> Result<DiscoveryResult, PipelineError> {
        let mut substitutions = SubstitutionMap::default();
        let mut generated: BTreeMap<String, Vec<SourceUnit>> = BTreeMap::new();
        let mut disabled_scopes: BTreeSet<String> = BTreeSet::new();
        let mut tables: BTreeMap<String, Vec<ServiceCandidate>> = BTreeMap::new();

        for capability in &self.settings.service_types {
            ctx.add_diagnostic(
                CATEGORY,
                format!("Starting service discovery for type {}", capability),
            );
            let mut seen = BTreeSet::new();
            let mut pending = Vec::new();

            for name in ctx.application().discover(capability) {
                if self.settings.rejected.contains(&name) {
                    ctx.add_diagnostic(CATEGORY, format!("Rejecting {} by configuration", name));
                    continue;
                }
                if !seen.insert(name.clone()) {
                    debug!(capability = %capability, candidate = %name, "Skipping duplicate candidate");
                    continue;
                }
                if let Some(substitution) = self.substitutions.get(&name) {
                    let units = match generated.get(&name) {
                        Some(units) => units.clone(),
                        None => {
                            let ((), units) =
                                ctx.track_units(|ctx| substitution.generate(ctx))?;
                            generated.insert(name.clone(), units.clone());
                            units
                        }
                    };
                    if !units.is_empty() {
                        debug!(
                            capability = %capability,
                            candidate = %name,
                            units = units.len(),
                            "Substituted candidate"
                        );
                        substitutions.add(capability, units);
                        continue;
                    }
                }
                pending.push(name);
            }

            let outcomes: Vec<Outcome> = {
                let application = ctx.application();
                let analyzer = ctx.analyzer();
                let diagnostics = ctx.diagnostics();
                pending
                    .par_iter()
                    .map(|name| self.evaluate(capability, name, application, analyzer, diagnostics))
                    .collect()
            };

            let mut kept = Vec::new();
            for outcome in outcomes {
                match outcome {
                    Outcome::Kept(candidate) => kept.push(candidate),
                    Outcome::Unavailable { scope: Some(scope) } => {
                        disabled_scopes.insert(scope);
                    }
                    Outcome::Unavailable { scope: None } | Outcome::Dropped => {}
                }
            }
            tables.entry(capability.clone()).or_default().extend(kept);
        }

        for scope in &disabled_scopes {
            for candidates in tables.values_mut() {
                candidates.retain(|candidate| {
                    if is_within(scope, &candidate.name) {
                        ctx.add_diagnostic(
                            CATEGORY,
                            format!(
                                "Disabling {} because it belongs to {} which is disabled",
                                candidate.name, scope
                            ),
                        );
                        false
                    } else {
                        true
                    }
                });
            }
        }

        for candidates in tables.values_mut() {
            candidates.sort();
            candidates.dedup_by(|a, b| a.name == b.name);
        }

        info!(
            capabilities = tables.len(),
            candidates = tables.values().map(Vec::len).sum::<usize>(),
            substitutes = substitutions.len(),
            "Service discovery complete"
        );
        Ok(DiscoveryResult {
            tables,
            substitutions,
        })
    }

    fn evaluate(
        &self,
        capability: &str,
        name: &str,
        application: &dyn Application,
        analyzer: &EnvironmentAnalyzer,
        diagnostics: &Diagnostics,
    ) -> Outcome {
        let loaded = match application.load(name) {
            Ok(loaded) => loaded,
            Err(err) => {
                diagnostics.add(
                    CATEGORY,
                    format!(
                        "Skipping service {} implementation {} because of missing dependencies: {}",
                        capability, name, err
                    ),
                );
                return Outcome::Dropped;
            }
        };

        let available =
            analyzer_for(&loaded).is_available(&loaded, capability, analyzer, diagnostics);
        let forced = !available && self.settings.force_include.contains(name);
        if forced {
            warn!(candidate = %name, "Forcing inclusion of unavailable candidate");
            diagnostics.add(
                CATEGORY,
                format!(
                    "Forcing inclusion of {} despite it not matching bean requirements",
                    name
                ),
            );
        } else if !available {
            diagnostics.add(
                CATEGORY,
                format!("Skipping {} because it doesn't match bean requirements", name),
            );
            return Outcome::Unavailable {
                scope: loaded.configuration_scope,
            };
        }

        match loaded.implementation {
            Some(implementation) => Outcome::Kept(ServiceCandidate {
                name: name.to_string(),
                implementation,
                available,
                forced,
            }),
            None => {
                diagnostics.add(
                    CATEGORY,
                    format!(
                        "Skipping {}: not a valid provider, it has neither a factory method nor a public no-arg constructor",
                        name
                    ),
                );
                Outcome::Dropped
            }
        }
    }
}

/// Whether a qualified name lies within a namespace scope.
fn is_within(scope: &str, name: &str) -> bool {
    name.strip_prefix(scope)
        .is_some_and(|rest| rest.starts_with('.'))
}
