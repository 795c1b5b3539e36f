//! Shared test utilities for integration tests
//!
//! Provides manifest fixtures, a one-call pipeline runner, and serialized
//! access to the `PREBAKE__*` environment so that configuration tests do not
//! race each other.

use prebake::analyzer::EnvironmentAnalyzer;
use prebake::config::{AotConfig, Configuration};
use prebake::context::GenerationOutput;
use prebake::error::PipelineError;
use prebake::model::ApplicationManifest;
use prebake::pipeline::{Pipeline, RunSummary};
use prebake::sink::DirectorySink;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

/// Global mutex to serialize environment variable access across all tests
static ENV_MUTEX: Mutex<()> = Mutex::new(());

/// Run `f` with the given environment variables set, restoring the previous
/// values afterwards.
pub fn with_env_vars<F, R>(vars: &[(&str, &str)], f: F) -> R
where
    F: FnOnce() -> R,
{
    let _guard = ENV_MUTEX.lock().unwrap_or_else(|e| e.into_inner());
    let previous: Vec<(String, Option<String>)> = vars
        .iter()
        .map(|(key, _)| (key.to_string(), std::env::var(key).ok()))
        .collect();
    for (key, value) in vars {
        std::env::set_var(key, value);
    }

    let result = f();

    for (key, value) in previous {
        match value {
            Some(v) => std::env::set_var(&key, v),
            None => std::env::remove_var(&key),
        }
    }
    result
}

/// Greeter application: four candidates for `a.Greeter`, one of them
/// conditioned on the `cloud` environment, plus a codec capability.
pub const GREETER_MANIFEST: &str = r#"{
    "environment": {
        "active_environments": ["test"],
        "properties": { "logger.levels.a": "DEBUG" },
        "environment_variables": { "APP_PORT": "8080" },
        "config_resources": {
            "application": { "server.port": 8080, "app.tags": ["x", "y"] },
            "application-test": { "app.name": "greeter-test" }
        }
    },
    "services": {
        "a.Greeter": ["a.B", "a.A", "a.A", "a.C"],
        "a.Codec": ["a.JsonCodec", "a.Missing"],
        "prebake.runtime.PropertySourceLoader": ["prebake.runtime.YamlPropertySourceLoader"]
    },
    "types": {
        "a.A": { "public_no_arg_constructor": true },
        "a.B": { "factory_method": true },
        "a.C": {
            "public_no_arg_constructor": true,
            "requirements": { "env": ["cloud"] }
        },
        "a.JsonCodec": { "public_no_arg_constructor": true },
        "prebake.runtime.YamlPropertySourceLoader": { "public_no_arg_constructor": true }
    }
}"#;

pub fn write_manifest(dir: &Path, content: &str) -> PathBuf {
    let path = dir.join("application.json");
    std::fs::write(&path, content).unwrap();
    path
}

pub fn greeter_manifest() -> ApplicationManifest {
    serde_json::from_str(GREETER_MANIFEST).unwrap()
}

fn parts(
    pairs: &[(&str, &str)],
    manifest: ApplicationManifest,
) -> (
    Arc<dyn Configuration>,
    Arc<EnvironmentAnalyzer>,
    Arc<prebake::model::ApplicationModel>,
) {
    let (snapshot, model) = manifest.into_parts();
    (
        Arc::new(AotConfig::from_pairs(pairs.iter().copied())),
        Arc::new(EnvironmentAnalyzer::new(snapshot)),
        Arc::new(model),
    )
}

/// Run the standard pipeline up to (not including) the sink.
pub fn generate(
    pairs: &[(&str, &str)],
    manifest: ApplicationManifest,
    resources_dir: &Path,
) -> Result<GenerationOutput, PipelineError> {
    let (config, analyzer, model) = parts(pairs, manifest);
    Pipeline::standard().generate(config, analyzer, model, resources_dir)
}

/// Full standard run into `output`.
pub fn run(
    pairs: &[(&str, &str)],
    manifest: ApplicationManifest,
    output: &Path,
) -> Result<RunSummary, PipelineError> {
    let (config, analyzer, model) = parts(pairs, manifest);
    Pipeline::standard().run(config, analyzer, model, &DirectorySink::new(output))
}
