//! Integration tests for the CLI route table

use super::test_utils::{write_manifest, GREETER_MANIFEST};
use clap::Parser;
use prebake::cli::{map_error, Cli, RunContext};
use prebake::config::ConfigLoader;
use prebake::config::Configuration;
use tempfile::TempDir;

fn execute(args: &[&str]) -> Result<String, prebake::error::PipelineError> {
    let cli = Cli::try_parse_from(args).unwrap();
    RunContext::new().execute(&cli.command)
}

#[test]
fn test_export_config_round_trips_through_loader() {
    let temp_dir = TempDir::new().unwrap();
    let file = temp_dir.path().join("prebake.toml");
    let message = execute(&[
        "prebake",
        "export-config",
        "--runtime",
        "native",
        "--file",
        file.to_str().unwrap(),
    ])
    .unwrap();
    assert!(message.starts_with("Wrote sample configuration"));

    let content = std::fs::read_to_string(&file).unwrap();
    assert!(content.starts_with("# "));
    assert!(content.contains("native.image.config.enabled = true"));
    assert!(content.contains("yaml.to.static.config.enabled = false"));
    // option shared by several modules is emitted once
    assert_eq!(content.matches("\nservice.types = ").count(), 1);

    let config = ConfigLoader::load_from_file(&file).unwrap();
    assert!(config.is_feature_enabled("serviceloading.native"));
    assert!(config.is_feature_enabled("logging.static.config"));
    assert!(!config.is_feature_enabled("yaml.to.static.config"));
}

#[test]
fn test_modules_json_lists_execution_order() {
    let output = execute(&["prebake", "modules", "--runtime", "jit", "--format", "json"]).unwrap();
    let json: serde_json::Value = serde_json::from_str(&output).unwrap();
    let ids: Vec<&str> = json["modules"]
        .as_array()
        .unwrap()
        .iter()
        .map(|m| m["id"].as_str().unwrap())
        .collect();
    assert_eq!(json["runtime"], "jit");
    assert!(!ids.contains(&"native.image.config"));
    let loader = ids.iter().position(|id| *id == "serviceloading.jit").unwrap();
    let sealed = ids.iter().position(|id| *id == "sealed.property.source").unwrap();
    assert!(loader < sealed);
}

#[test]
fn test_modules_text_table() {
    let output = execute(&["prebake", "modules"]).unwrap();
    assert!(output.contains("Modules (jit)"));
    assert!(output.contains("serviceloading.jit"));
}

#[test]
fn test_run_command_end_to_end() {
    let temp_dir = TempDir::new().unwrap();
    let manifest = write_manifest(temp_dir.path(), GREETER_MANIFEST);
    let config_file = temp_dir.path().join("prebake.toml");
    std::fs::write(
        &config_file,
        "[service]\ntypes = \"a.Greeter\"\n[serviceloading.rejected]\nimpls = \"a.A\"\n",
    )
    .unwrap();
    let output_dir = temp_dir.path().join("out");

    let text = execute(&[
        "prebake",
        "run",
        "--application",
        manifest.to_str().unwrap(),
        "--output",
        output_dir.to_str().unwrap(),
        "--config",
        config_file.to_str().unwrap(),
        "--package",
        "gen",
        "--runtime",
        "native",
    ])
    .unwrap();
    assert!(text.contains("Runtime: native"));
    assert!(text.contains("gen.GreeterFactory"));

    let factory = std::fs::read_to_string(output_dir.join("sources/gen/GreeterFactory.json")).unwrap();
    assert!(factory.contains("a.B"));
    assert!(!factory.contains("\"a.A\""));
}

#[test]
fn test_run_error_is_mapped_for_display() {
    let temp_dir = TempDir::new().unwrap();
    let manifest = write_manifest(temp_dir.path(), "{ not json");
    let err = execute(&[
        "prebake",
        "run",
        "--application",
        manifest.to_str().unwrap(),
        "--output",
        temp_dir.path().join("out").to_str().unwrap(),
        "--package",
        "gen",
    ])
    .unwrap_err();
    assert!(map_error(&err).starts_with("Error: Invalid application manifest"));
}
