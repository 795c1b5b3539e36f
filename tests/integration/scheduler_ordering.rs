//! Integration tests for module scheduling over the standard catalogue

use super::test_utils::greeter_manifest;
use prebake::analyzer::EnvironmentAnalyzer;
use prebake::config::{AotConfig, GENERATED_PACKAGE};
use prebake::context::{DeducedEnvironment, GenerationContext};
use prebake::error::PipelineError;
use prebake::module::{Module, ModuleDescriptor};
use prebake::pipeline::Pipeline;
use prebake::registry::ModuleRegistry;
use prebake::types::{Profile, ProfileSet};
use std::sync::Arc;
use tempfile::TempDir;

const ALL_ON: &[(&str, &str)] = &[
    ("sealed.property.source.enabled", "true"),
    ("cached.environment.enabled", "true"),
    ("precompute.environment.properties.enabled", "true"),
    ("deduce.environment.enabled", "true"),
    ("known.missing.types.enabled", "true"),
    ("scan.reactive.types.enabled", "true"),
    ("native.image.config.enabled", "true"),
    ("logging.static.config.enabled", "true"),
];

fn ids(modules: &[Arc<dyn Module>]) -> Vec<String> {
    modules.iter().map(|m| m.id().to_string()).collect()
}

fn position(order: &[String], id: &str) -> usize {
    order.iter().position(|m| m == id).unwrap()
}

#[test]
fn test_standard_schedule_per_profile() {
    let registry = ModuleRegistry::with_standard_modules();
    let config = AotConfig::from_pairs(ALL_ON.iter().copied());

    let dynamic = ids(&registry.schedule(Profile::Dynamic, &config).unwrap());
    assert!(dynamic.contains(&"serviceloading.jit".to_string()));
    assert!(!dynamic.contains(&"serviceloading.native".to_string()));
    assert!(!dynamic.contains(&"native.image.config".to_string()));
    assert!(position(&dynamic, "serviceloading.jit") < position(&dynamic, "sealed.property.source"));

    let native = ids(&registry.schedule(Profile::AheadOfTime, &config).unwrap());
    assert!(native.contains(&"native.image.config".to_string()));
    assert!(!native.contains(&"serviceloading.jit".to_string()));
    assert!(position(&native, "serviceloading.native") < position(&native, "sealed.property.source"));
}

#[test]
fn test_schedule_is_stable_across_calls() {
    let registry = ModuleRegistry::with_standard_modules();
    let config = AotConfig::from_pairs(ALL_ON.iter().copied());
    let first = ids(&registry.schedule(Profile::AheadOfTime, &config).unwrap());
    for _ in 0..5 {
        assert_eq!(ids(&registry.schedule(Profile::AheadOfTime, &config).unwrap()), first);
    }
}

#[test]
fn test_disabling_the_loader_leaves_dependents_scheduled() {
    let registry = ModuleRegistry::with_standard_modules();
    let config = AotConfig::from_pairs([
        ("serviceloading.jit.enabled", "false"),
        ("sealed.property.source.enabled", "true"),
    ]);
    let order = ids(&registry.schedule(Profile::Dynamic, &config).unwrap());
    assert_eq!(order, vec!["sealed.property.source"]);
}

/// Reads what `deduce.environment` published; must be scheduled after it.
struct DeductionReader {
    descriptor: ModuleDescriptor,
}

impl Module for DeductionReader {
    fn descriptor(&self) -> &ModuleDescriptor {
        &self.descriptor
    }

    fn generate(&self, ctx: &mut GenerationContext) -> Result<(), PipelineError> {
        match ctx.deduced_environment() {
            Some(DeducedEnvironment { deduce_environment: true }) => Ok(()),
            other => Err(PipelineError::GenerationFailed(format!(
                "expected a deduced environment, got {:?}",
                other
            ))),
        }
    }
}

#[test]
fn test_custom_module_sees_dependency_output() {
    let temp_dir = TempDir::new().unwrap();
    let mut registry = ModuleRegistry::with_standard_modules();
    registry
        .register(Arc::new(DeductionReader {
            // "a." sorts before "deduce." so only the dependency orders it
            descriptor: ModuleDescriptor::new("a.reader")
                .depends_on("deduce.environment")
                .profiles(ProfileSet::BOTH)
                .enabled_by_default(true),
        }))
        .unwrap();

    let mut manifest = greeter_manifest();
    manifest.environment.deduce_environment = Some(true);
    let (snapshot, model) = manifest.into_parts();
    let output = Pipeline::new(registry)
        .generate(
            Arc::new(AotConfig::from_pairs([
                (GENERATED_PACKAGE, "gen"),
                ("deduce.environment.enabled", "true"),
            ])),
            Arc::new(EnvironmentAnalyzer::new(snapshot)),
            Arc::new(model),
            temp_dir.path(),
        )
        .unwrap();

    assert_eq!(
        output.executed_modules,
        vec!["deduce.environment", "a.reader", "serviceloading.jit"]
    );
}

#[test]
fn test_unknown_dependency_fails_before_any_module_runs() {
    let temp_dir = TempDir::new().unwrap();
    let mut registry = ModuleRegistry::with_standard_modules();
    registry
        .register(Arc::new(DeductionReader {
            descriptor: ModuleDescriptor::new("orphan")
                .depends_on("not.registered")
                .enabled_by_default(true),
        }))
        .unwrap();
    let (snapshot, model) = greeter_manifest().into_parts();
    let err = Pipeline::new(registry)
        .generate(
            Arc::new(AotConfig::from_pairs([(GENERATED_PACKAGE, "gen")])),
            Arc::new(EnvironmentAnalyzer::new(snapshot)),
            Arc::new(model),
            temp_dir.path(),
        )
        .unwrap_err();
    assert!(matches!(err, PipelineError::UnknownDependency { ref module, .. } if module == "orphan"));
    assert!(std::fs::read_dir(temp_dir.path()).unwrap().next().is_none());
}
