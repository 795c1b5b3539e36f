//! Integration tests for full pipeline runs materialized through the directory sink

use super::test_utils::{greeter_manifest, run};
use prebake::config::GENERATED_PACKAGE;
use prebake::discovery::SERVICE_TYPES;
use prebake::error::PipelineError;
use prebake::optimizers::native_image::properties_path;
use prebake::pipeline::RunSummary;
use prebake::types::Profile;
use tempfile::TempDir;

fn read(path: std::path::PathBuf) -> String {
    std::fs::read_to_string(&path).unwrap_or_else(|e| panic!("{}: {}", path.display(), e))
}

#[test]
fn test_dynamic_run_layout() {
    let temp_dir = TempDir::new().unwrap();
    let out = temp_dir.path();
    let summary = run(
        &[
            (GENERATED_PACKAGE, "com.example.gen"),
            (SERVICE_TYPES, "a.Greeter"),
            ("cached.environment.enabled", "true"),
            ("logging.static.config.enabled", "true"),
        ],
        greeter_manifest(),
        out,
    )
    .unwrap();

    assert_eq!(summary.profile, Profile::Dynamic);
    assert_eq!(
        summary.executed_modules,
        vec![
            "cached.environment",
            "logging.static.config",
            "serviceloading.jit"
        ]
    );
    assert!(summary
        .units
        .contains(&"com.example.gen.AotApplicationConfigurer".to_string()));
    assert!(summary.excluded_resources.contains("logback.xml"));

    let sources = out.join("sources/com/example/gen");
    let configurer: serde_json::Value =
        serde_json::from_str(&read(sources.join("AotApplicationConfigurer.json"))).unwrap();
    assert_eq!(configurer["static_init"].as_array().unwrap().len(), 1);
    assert!(sources.join("GreeterFactory.json").exists());
    assert!(sources.join("StaticServicesLoader.json").exists());

    let configurers = read(out.join("resources/META-INF/services/prebake.runtime.ApplicationConfigurer"));
    assert_eq!(configurers.trim(), "com.example.gen.AotApplicationConfigurer");
    let loaders = read(out.join("resources/META-INF/services/prebake.runtime.OptimizationLoader"));
    assert!(loaders.contains("com.example.gen.StaticServicesLoader"));
    assert!(out
        .join("resources/META-INF/services/prebake.runtime.LoggingConfigurator")
        .exists());

    assert!(read(out.join("logs/serviceloading.log"))
        .starts_with("Starting service discovery for type a.Greeter\n"));
    assert_eq!(read(out.join("logs/resource-filter.txt")), "logback.xml\n");

    let written: RunSummary = serde_json::from_str(&read(out.join("run-summary.json"))).unwrap();
    assert_eq!(written.units, summary.units);
    assert_eq!(written.namespace, "com.example.gen");
}

#[test]
fn test_native_run_writes_image_properties() {
    let temp_dir = TempDir::new().unwrap();
    let out = temp_dir.path();
    let summary = run(
        &[
            (GENERATED_PACKAGE, "gen"),
            ("runtime", "native"),
            (SERVICE_TYPES, "a.Greeter,a.Codec"),
            ("native.image.config.enabled", "true"),
            ("scan.reactive.types.enabled", "true"),
        ],
        greeter_manifest(),
        out,
    )
    .unwrap();
    assert_eq!(summary.profile, Profile::AheadOfTime);

    let properties = read(out.join("resources").join(properties_path("gen")));
    assert!(properties.starts_with(
        "Args=--initialize-at-build-time=prebake.runtime.ApplicationConfigurer \\\n"
    ));
    assert!(properties.contains("--initialize-at-build-time=gen.AotApplicationConfigurer"));
    // registered by loaders that run after native.image.config
    assert!(properties.contains("--initialize-at-build-time=prebake.runtime.StaticServices"));
    assert!(properties.contains("--initialize-at-build-time=prebake.runtime.Publishers"));
    assert!(properties.contains("-H:ServiceLoaderFeatureExcludeServices=a.Greeter"));
    assert!(properties.contains("-H:ServiceLoaderFeatureExcludeServices=a.Codec"));
    assert!(properties.ends_with("\n\n"));
}

#[test]
fn test_environment_properties_and_missing_types() {
    let temp_dir = TempDir::new().unwrap();
    let out = temp_dir.path();
    let summary = run(
        &[
            (GENERATED_PACKAGE, "gen"),
            ("precompute.environment.properties.enabled", "true"),
            ("known.missing.types.enabled", "true"),
            ("known.missing.types.list", "a.A,io.Absent"),
        ],
        greeter_manifest(),
        out,
    )
    .unwrap();
    assert!(summary
        .units
        .contains(&"gen.EnvironmentPropertiesOptimizationLoader".to_string()));

    let env_loader = read(out.join("sources/gen/EnvironmentPropertiesOptimizationLoader.json"));
    assert!(env_loader.contains("app.port"));
    assert!(env_loader.contains("app-port"));

    let missing = read(out.join("sources/gen/KnownMissingTypesOptimizationLoader.json"));
    assert!(missing.contains("io.Absent"));
    assert!(!missing.contains("\"a.A\""));
}

#[test]
fn test_failed_run_leaves_output_untouched() {
    let temp_dir = TempDir::new().unwrap();
    let out = temp_dir.path().join("out");
    let err = run(
        &[
            (GENERATED_PACKAGE, "gen"),
            ("runtime", "wasm"),
        ],
        greeter_manifest(),
        &out,
    )
    .unwrap_err();
    assert!(matches!(err, PipelineError::UnknownProfile(ref p) if p == "wasm"));
    assert!(!out.exists());
}

#[test]
fn test_rerun_into_same_output_does_not_duplicate_registrations() {
    let temp_dir = TempDir::new().unwrap();
    let out = temp_dir.path();
    let overrides = [
        (GENERATED_PACKAGE, "gen"),
        (SERVICE_TYPES, "a.Greeter"),
        ("cached.environment.enabled", "true"),
    ];
    run(&overrides, greeter_manifest(), out).unwrap();
    let first_loaders = read(out.join("resources/META-INF/services/prebake.runtime.OptimizationLoader"));
    run(&overrides, greeter_manifest(), out).unwrap();

    let configurers = read(out.join("resources/META-INF/services/prebake.runtime.ApplicationConfigurer"));
    assert_eq!(configurers, "gen.AotApplicationConfigurer\n");
    let loaders = read(out.join("resources/META-INF/services/prebake.runtime.OptimizationLoader"));
    assert_eq!(loaders, first_loaders);
}
