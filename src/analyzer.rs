//! Environment analysis: a snapshot of the target application's runtime state
//! and the predicate deciding whether a conditioned component is usable.
//!
//! Availability checks construct a [`Probe`] through a factory closure and
//! evaluate it against the snapshot; no reflection is involved.

use crate::error::ProbeError;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

/// Reactive type names detected in the application.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReactiveTypes {
    #[serde(default)]
    pub reactive: Vec<String>,
    #[serde(default)]
    pub single: Vec<String>,
    #[serde(default)]
    pub completable: Vec<String>,
}

/// Runtime state of the analyzed application.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EnvironmentSnapshot {
    #[serde(default)]
    pub active_environments: BTreeSet<String>,
    #[serde(default)]
    pub packages: Vec<String>,
    /// Whether the application deduces its environment at startup.
    #[serde(default)]
    pub deduce_environment: Option<bool>,
    #[serde(default)]
    pub properties: BTreeMap<String, serde_json::Value>,
    #[serde(default)]
    pub environment_variables: BTreeMap<String, String>,
    /// Parsed configuration resources keyed by resource name (`application`,
    /// `application-test`, ...).
    #[serde(default)]
    pub config_resources: BTreeMap<String, BTreeMap<String, serde_json::Value>>,
    #[serde(default)]
    pub reactive_types: ReactiveTypes,
}

impl EnvironmentSnapshot {
    /// Property value rendered as a string. Strings are returned unquoted.
    pub fn property(&self, name: &str) -> Option<String> {
        self.properties.get(name).map(|value| match value {
            serde_json::Value::String(s) => s.clone(),
            other => other.to_string(),
        })
    }
}

/// Condition on a single property.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PropertyRequirement {
    pub name: String,
    /// Required value; presence alone suffices when unset.
    #[serde(default)]
    pub value: Option<String>,
    /// Satisfied when the property is absent or differs from this value.
    #[serde(default)]
    pub not_equals: Option<String>,
}

/// Declarative requirements attached to a candidate.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Requirements {
    /// At least one of these environments must be active.
    #[serde(default)]
    pub env: Vec<String>,
    /// None of these environments may be active.
    #[serde(default)]
    pub not_env: Vec<String>,
    #[serde(default)]
    pub properties: Vec<PropertyRequirement>,
    #[serde(default)]
    pub missing_properties: Vec<String>,
}

/// Throwaway instance built for one availability check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Probe {
    pub candidate: String,
    pub requirements: Requirements,
}

/// Constructs a probe for a candidate; failure means the candidate cannot be
/// instantiated in the analyzed environment.
pub type ProbeFactory = Arc<dyn Fn() -> Result<Probe, ProbeError> + Send + Sync>;

/// Evaluates a constructed probe against an environment snapshot.
pub trait AvailabilityPredicate: Send + Sync {
    fn evaluate(&self, probe: &Probe, snapshot: &EnvironmentSnapshot) -> bool;
}

impl<F> AvailabilityPredicate for F
where
    F: Fn(&Probe, &EnvironmentSnapshot) -> bool + Send + Sync,
{
    fn evaluate(&self, probe: &Probe, snapshot: &EnvironmentSnapshot) -> bool {
        self(probe, snapshot)
    }
}

/// Default predicate: checks environments and property conditions.
#[derive(Debug, Clone, Copy, Default)]
pub struct RequirementsPredicate;

impl AvailabilityPredicate for RequirementsPredicate {
    fn evaluate(&self, probe: &Probe, snapshot: &EnvironmentSnapshot) -> bool {
        let req = &probe.requirements;
        let active = &snapshot.active_environments;

        if !req.env.is_empty() && !req.env.iter().any(|e| active.contains(e)) {
            return false;
        }
        if req.not_env.iter().any(|e| active.contains(e)) {
            return false;
        }
        if req
            .missing_properties
            .iter()
            .any(|name| snapshot.properties.contains_key(name))
        {
            return false;
        }
        req.properties.iter().all(|p| {
            let current = snapshot.property(&p.name);
            if let Some(excluded) = &p.not_equals {
                return current.as_deref() != Some(excluded.as_str());
            }
            match (&p.value, current) {
                (_, None) => false,
                (None, Some(_)) => true,
                (Some(expected), Some(actual)) => *expected == actual,
            }
        })
    }
}

/// Snapshot plus predicate, shared read-only by every module of a run.
#[derive(Clone)]
pub struct EnvironmentAnalyzer {
    snapshot: EnvironmentSnapshot,
    predicate: Arc<dyn AvailabilityPredicate>,
}

impl std::fmt::Debug for EnvironmentAnalyzer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EnvironmentAnalyzer")
            .field("snapshot", &self.snapshot)
            .finish_non_exhaustive()
    }
}

impl EnvironmentAnalyzer {
    pub fn new(snapshot: EnvironmentSnapshot) -> Self {
        Self::with_predicate(snapshot, Arc::new(RequirementsPredicate))
    }

    pub fn with_predicate(
        snapshot: EnvironmentSnapshot,
        predicate: Arc<dyn AvailabilityPredicate>,
    ) -> Self {
        Self {
            snapshot,
            predicate,
        }
    }

    pub fn snapshot(&self) -> &EnvironmentSnapshot {
        &self.snapshot
    }

    pub fn active_profile_names(&self) -> &BTreeSet<String> {
        &self.snapshot.active_environments
    }

    pub fn is_available(&self, probe: &Probe) -> bool {
        self.predicate.evaluate(probe, &self.snapshot)
    }

    /// Predicate closure bound to this analyzer's snapshot.
    pub fn availability_predicate(&self) -> impl Fn(&Probe) -> bool + Send + Sync + '_ {
        move |probe| self.is_available(probe)
    }
}
