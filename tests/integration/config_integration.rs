//! Integration tests for the layered configuration loader

use super::test_utils::with_env_vars;
use prebake::config::{ConfigLoader, Configuration, GENERATED_PACKAGE};
use prebake::discovery::DiscoverySettings;
use prebake::error::PipelineError;
use prebake::logging::LoggingConfig;
use prebake::types::Profile;
use tempfile::TempDir;

#[test]
fn test_nested_tables_flatten_to_dotted_keys() {
    let temp_dir = TempDir::new().unwrap();
    let config_file = temp_dir.path().join("prebake.toml");
    std::fs::write(
        &config_file,
        r#"
runtime = "native"

[generated]
package = "com.example.gen"

[serviceloading.native]
enabled = true

[serviceloading]
rejected.impls = "a.A, a.B"
max.unit.size = 500

[service]
types = ["a.Greeter", "a.Codec"]
"#,
    )
    .unwrap();

    let config = ConfigLoader::load_from_file(&config_file).unwrap();
    assert_eq!(config.require(GENERATED_PACKAGE).unwrap(), "com.example.gen");
    assert_eq!(config.profile().unwrap(), Profile::AheadOfTime);
    assert!(config.is_feature_enabled("serviceloading.native"));

    let settings = DiscoverySettings::from_config(&config).unwrap();
    assert_eq!(settings.service_types, vec!["a.Greeter", "a.Codec"]);
    assert!(settings.rejected.contains("a.A"));
    assert!(settings.rejected.contains("a.B"));
    assert_eq!(settings.max_unit_size, 500);
}

#[test]
fn test_properties_file() {
    let temp_dir = TempDir::new().unwrap();
    let config_file = temp_dir.path().join("prebake.properties");
    std::fs::write(
        &config_file,
        "generated.package = gen\nservice.types = a.Greeter;a.Codec\n",
    )
    .unwrap();
    let config = ConfigLoader::load_from_file(&config_file).unwrap();
    assert_eq!(config.require(GENERATED_PACKAGE).unwrap(), "gen");
    assert_eq!(config.string_list("service.types"), vec!["a.Greeter", "a.Codec"]);
}

#[test]
fn test_precedence_file_then_environment_then_overrides() {
    let temp_dir = TempDir::new().unwrap();
    let config_file = temp_dir.path().join("prebake.toml");
    std::fs::write(
        &config_file,
        "runtime = \"native\"\n[generated]\npackage = \"from.file\"\n[logging]\nlevel = \"warn\"\n",
    )
    .unwrap();

    with_env_vars(
        &[
            ("PREBAKE__GENERATED__PACKAGE", "from.env"),
            ("PREBAKE__LOGGING__LEVEL", "trace"),
        ],
        || {
            let config = ConfigLoader::load(
                Some(&config_file),
                &[("runtime".to_string(), "jit".to_string())],
            )
            .unwrap();
            assert_eq!(config.require(GENERATED_PACKAGE).unwrap(), "from.env");
            assert_eq!(config.profile().unwrap(), Profile::Dynamic);
            assert_eq!(LoggingConfig::from_configuration(&config).level, "trace");
        },
    );
}

#[test]
fn test_defaults_without_file() {
    let config = with_env_vars(&[], || ConfigLoader::load(None, &[]).unwrap());
    assert_eq!(config.profile().unwrap(), Profile::Dynamic);
    assert!(matches!(
        config.require(GENERATED_PACKAGE),
        Err(PipelineError::MissingConfigKey(_))
    ));
}

#[test]
fn test_missing_file_is_an_error() {
    let temp_dir = TempDir::new().unwrap();
    let err = ConfigLoader::load_from_file(&temp_dir.path().join("absent.toml")).unwrap_err();
    assert!(matches!(err, PipelineError::ConfigError(_)));
}
