//! Analyzed application model.
//!
//! The pipeline sees the application through three narrow seams: service
//! discovery (capability name to ordered candidate names), candidate loading,
//! and type lookup. [`ApplicationModel`] implements all three from a manifest
//! produced by an external analysis step.

use crate::analyzer::{EnvironmentSnapshot, Probe, ProbeFactory, Requirements};
use crate::error::{LoadError, PipelineError, ProbeError};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;
use std::sync::Arc;

/// Yields candidate implementation names for a capability, in discovery order.
pub trait ServiceDiscovery: Send + Sync {
    fn discover(&self, capability: &str) -> Vec<String>;
}

/// Resolves a candidate name to a loaded candidate.
pub trait CandidateLoader: Send + Sync {
    fn load(&self, name: &str) -> Result<LoadedCandidate, LoadError>;
}

pub trait TypeLookup: Send + Sync {
    fn has_type(&self, name: &str) -> bool;
}

/// Everything the pipeline needs from the analyzed application.
pub trait Application: ServiceDiscovery + CandidateLoader + TypeLookup {}

impl<T> Application for T where T: ServiceDiscovery + CandidateLoader + TypeLookup {}

/// How a provider instance is obtained.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ImplementationKind {
    FactoryMethod,
    NoArgConstructor,
}

/// A candidate that resolved successfully.
#[derive(Clone)]
pub struct LoadedCandidate {
    pub name: String,
    /// `None` when the type offers neither a factory method nor a public
    /// no-argument constructor.
    pub implementation: Option<ImplementationKind>,
    /// Present when the candidate carries requirement metadata.
    pub probe: Option<ProbeFactory>,
    /// Namespace scope this candidate configures, if any.
    pub configuration_scope: Option<String>,
}

impl fmt::Debug for LoadedCandidate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoadedCandidate")
            .field("name", &self.name)
            .field("implementation", &self.implementation)
            .field("has_probe", &self.probe.is_some())
            .field("configuration_scope", &self.configuration_scope)
            .finish()
    }
}

/// Static description of one type in the analyzed application.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TypeDescriptor {
    #[serde(default)]
    pub factory_method: bool,
    #[serde(default)]
    pub public_no_arg_constructor: bool,
    #[serde(default)]
    pub requirements: Option<Requirements>,
    /// Transitive dependency that cannot be resolved; loading fails.
    #[serde(default)]
    pub missing_dependency: Option<String>,
    /// Reason probe construction fails, if it does.
    #[serde(default)]
    pub probe_failure: Option<String>,
    #[serde(default)]
    pub configuration_scope: Option<String>,
}

impl TypeDescriptor {
    pub fn implementation(&self) -> Option<ImplementationKind> {
        if self.factory_method {
            Some(ImplementationKind::FactoryMethod)
        } else if self.public_no_arg_constructor {
            Some(ImplementationKind::NoArgConstructor)
        } else {
            None
        }
    }
}

/// On-disk description of the analyzed application.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ApplicationManifest {
    #[serde(default)]
    pub environment: EnvironmentSnapshot,
    #[serde(default)]
    pub services: BTreeMap<String, Vec<String>>,
    #[serde(default)]
    pub types: BTreeMap<String, TypeDescriptor>,
}

impl ApplicationManifest {
    /// Load a manifest; `.toml` files are read as TOML, anything else as JSON.
    pub fn load(path: &Path) -> Result<Self, PipelineError> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            PipelineError::Manifest(format!("Failed to read {}: {}", path.display(), e))
        })?;
        let is_toml = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.eq_ignore_ascii_case("toml"))
            .unwrap_or(false);
        if is_toml {
            toml::from_str(&content).map_err(|e| {
                PipelineError::Manifest(format!("Failed to parse {}: {}", path.display(), e))
            })
        } else {
            serde_json::from_str(&content).map_err(|e| {
                PipelineError::Manifest(format!("Failed to parse {}: {}", path.display(), e))
            })
        }
    }

    pub fn into_parts(self) -> (EnvironmentSnapshot, ApplicationModel) {
        (
            self.environment,
            ApplicationModel {
                services: self.services,
                types: self.types,
            },
        )
    }
}

/// In-memory application model.
#[derive(Debug, Clone, Default)]
pub struct ApplicationModel {
    services: BTreeMap<String, Vec<String>>,
    types: BTreeMap<String, TypeDescriptor>,
}

impl ApplicationModel {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare a discovered candidate for a capability. Discovery order is
    /// preserved, duplicates included.
    pub fn add_service(&mut self, capability: &str, candidate: &str) -> &mut Self {
        self.services
            .entry(capability.to_string())
            .or_default()
            .push(candidate.to_string());
        self
    }

    pub fn add_type(&mut self, name: &str, descriptor: TypeDescriptor) -> &mut Self {
        self.types.insert(name.to_string(), descriptor);
        self
    }

    pub fn type_descriptor(&self, name: &str) -> Option<&TypeDescriptor> {
        self.types.get(name)
    }
}

impl ServiceDiscovery for ApplicationModel {
    fn discover(&self, capability: &str) -> Vec<String> {
        self.services.get(capability).cloned().unwrap_or_default()
    }
}

impl TypeLookup for ApplicationModel {
    fn has_type(&self, name: &str) -> bool {
        self.types.contains_key(name)
    }
}

impl CandidateLoader for ApplicationModel {
    fn load(&self, name: &str) -> Result<LoadedCandidate, LoadError> {
        let descriptor = self
            .types
            .get(name)
            .ok_or_else(|| LoadError::NotFound(name.to_string()))?;
        if let Some(dependency) = &descriptor.missing_dependency {
            return Err(LoadError::MissingDependency {
                candidate: name.to_string(),
                dependency: dependency.clone(),
            });
        }

        let probe = descriptor.requirements.clone().map(|requirements| {
            let candidate = name.to_string();
            let failure = descriptor.probe_failure.clone();
            let factory: ProbeFactory = Arc::new(move || match &failure {
                Some(reason) => Err(ProbeError {
                    candidate: candidate.clone(),
                    reason: reason.clone(),
                }),
                None => Ok(Probe {
                    candidate: candidate.clone(),
                    requirements: requirements.clone(),
                }),
            });
            factory
        });

        Ok(LoadedCandidate {
            name: name.to_string(),
            implementation: descriptor.implementation(),
            probe,
            configuration_scope: descriptor.configuration_scope.clone(),
        })
    }
}
