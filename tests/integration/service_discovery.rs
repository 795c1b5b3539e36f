//! Integration tests for service discovery through the standard loader modules

use super::test_utils::{generate, greeter_manifest};
use prebake::artifact::{Expr, Statement};
use prebake::config::GENERATED_PACKAGE;
use prebake::discovery::substitution::STRUCTURED_CONFIG_ID;
use prebake::discovery::{CATEGORY, FORCE_INCLUDE, MAX_UNIT_SIZE_KEY, REJECTED, SERVICE_TYPES};
use prebake::error::PipelineError;
use tempfile::TempDir;

fn put_keys(statements: &[Statement]) -> Vec<String> {
    statements
        .iter()
        .filter_map(|statement| match statement {
            Statement::Expr(Expr::Call { args, .. }) => match args.first() {
                Some(Expr::Str(name)) => Some(name.clone()),
                _ => None,
            },
            _ => None,
        })
        .collect()
}

#[test]
fn test_dynamic_table_keeps_sorted_available_candidates() {
    let temp_dir = TempDir::new().unwrap();
    let output = generate(
        &[
            (GENERATED_PACKAGE, "gen"),
            (SERVICE_TYPES, "a.Greeter,a.Codec"),
            (REJECTED, "a.A"),
        ],
        greeter_manifest(),
        temp_dir.path(),
    )
    .unwrap();

    let factory = output
        .units
        .iter()
        .find(|u| u.name == "GreeterFactory")
        .unwrap();
    let load0 = factory.method("load0").unwrap();
    assert_eq!(put_keys(&load0.body), vec!["a.B"]);
    assert!(factory.method("findAll").is_some());

    let codec = output.units.iter().find(|u| u.name == "CodecFactory").unwrap();
    assert_eq!(put_keys(&codec.method("load0").unwrap().body), vec!["a.JsonCodec"]);

    let log = &output.diagnostics[CATEGORY];
    assert!(log.contains(&"Starting service discovery for type a.Greeter".to_string()));
    assert!(log.contains(&"Rejecting a.A by configuration".to_string()));
    assert!(log.contains(&"Skipping a.C because it doesn't match bean requirements".to_string()));
    assert!(log.contains(
        &"Skipping service a.Codec implementation a.Missing because of missing dependencies: type a.Missing not found"
            .to_string()
    ));
    assert!(output
        .build_time_init
        .contains("prebake.runtime.StaticServices"));
}

#[test]
fn test_force_include_on_ahead_of_time_profile() {
    let temp_dir = TempDir::new().unwrap();
    let output = generate(
        &[
            (GENERATED_PACKAGE, "gen"),
            ("runtime", "native"),
            (SERVICE_TYPES, "a.Greeter"),
            (FORCE_INCLUDE, "a.C"),
        ],
        greeter_manifest(),
        temp_dir.path(),
    )
    .unwrap();

    assert_eq!(output.executed_modules, vec!["serviceloading.native"]);
    let factory = output
        .units
        .iter()
        .find(|u| u.name == "GreeterFactory")
        .unwrap();
    let body = &factory.method("load0").unwrap().body;
    assert_eq!(put_keys(body), vec!["a.A", "a.B", "a.C"]);
    // a.B only offers a factory method
    assert!(body.contains(&Statement::Expr(Expr::call_on(
        Expr::ident("ENTRIES"),
        "put",
        vec![Expr::str("a.B"), Expr::method_ref("a.B", "provider")],
    ))));
    assert!(output.diagnostics[CATEGORY].contains(
        &"Forcing inclusion of a.C despite it not matching bean requirements".to_string()
    ));
}

#[test]
fn test_small_unit_size_splits_loaders() {
    let temp_dir = TempDir::new().unwrap();
    let output = generate(
        &[
            (GENERATED_PACKAGE, "gen"),
            (SERVICE_TYPES, "a.Greeter"),
            (MAX_UNIT_SIZE_KEY, "1"),
        ],
        greeter_manifest(),
        temp_dir.path(),
    )
    .unwrap();
    let factory = output
        .units
        .iter()
        .find(|u| u.name == "GreeterFactory")
        .unwrap();
    assert!(factory.method("load0").is_some());
    assert!(factory.method("load1").is_some());
    assert_eq!(
        &factory.static_init[..2],
        &[
            Statement::Expr(Expr::call("load0", vec![])),
            Statement::Expr(Expr::call("load1", vec![])),
        ]
    );
}

#[test]
fn test_invalid_unit_size_fails_the_run() {
    let temp_dir = TempDir::new().unwrap();
    let err = generate(
        &[
            (GENERATED_PACKAGE, "gen"),
            (SERVICE_TYPES, "a.Greeter"),
            (MAX_UNIT_SIZE_KEY, "0"),
        ],
        greeter_manifest(),
        temp_dir.path(),
    )
    .unwrap_err();
    assert!(matches!(err, PipelineError::ModuleFailed { ref module, .. } if module == "serviceloading.jit"));
}

#[test]
fn test_structured_configuration_substitution() {
    let temp_dir = TempDir::new().unwrap();
    let enabled = format!("{}.enabled", STRUCTURED_CONFIG_ID);
    let output = generate(
        &[
            (GENERATED_PACKAGE, "gen"),
            (SERVICE_TYPES, "prebake.runtime.PropertySourceLoader"),
            (enabled.as_str(), "true"),
            ("map.property.order.application-test", "10"),
        ],
        greeter_manifest(),
        temp_dir.path(),
    )
    .unwrap();

    let names: Vec<&str> = output.units.iter().map(|u| u.name.as_str()).collect();
    assert!(names.contains(&"ApplicationStaticPropertySource"));
    assert!(names.contains(&"ApplicationTestStaticPropertySource"));
    // the replaced loader never reaches the table
    let loaders = output
        .units
        .iter()
        .find(|u| u.name == "PropertySourceLoaderFactory")
        .unwrap();
    assert!(loaders.method("load0").is_none());
    assert!(output.excluded_resources.contains("application.yml"));
    assert!(output.excluded_resources.contains("application-test.yml"));

    let test_source = output
        .units
        .iter()
        .find(|u| u.name == "ApplicationTestStaticPropertySource")
        .unwrap();
    assert_eq!(
        test_source.method("getOrder").unwrap().body,
        vec![Statement::Return(Expr::Int(10))]
    );
    let default_source = output
        .units
        .iter()
        .find(|u| u.name == "ApplicationStaticPropertySource")
        .unwrap();
    assert_eq!(
        default_source.method("getOrder").unwrap().body,
        vec![Statement::Return(Expr::Int(i32::MIN as i64))]
    );
}

#[test]
fn test_disabled_scope_spans_capabilities() {
    let temp_dir = TempDir::new().unwrap();
    let manifest: prebake::model::ApplicationManifest = serde_json::from_str(
        r#"{
            "services": {
                "x.Configuration": ["cfg.cloud.CloudConfiguration"],
                "x.Bean": ["cfg.cloud.Storage", "cfg.local.Storage"]
            },
            "types": {
                "cfg.cloud.CloudConfiguration": {
                    "public_no_arg_constructor": true,
                    "requirements": { "env": ["cloud"] },
                    "configuration_scope": "cfg.cloud"
                },
                "cfg.cloud.Storage": { "public_no_arg_constructor": true },
                "cfg.local.Storage": { "public_no_arg_constructor": true }
            }
        }"#,
    )
    .unwrap();
    let output = generate(
        &[
            (GENERATED_PACKAGE, "gen"),
            (SERVICE_TYPES, "x.Configuration,x.Bean"),
        ],
        manifest,
        temp_dir.path(),
    )
    .unwrap();

    let bean = output.units.iter().find(|u| u.name == "BeanFactory").unwrap();
    assert_eq!(put_keys(&bean.method("load0").unwrap().body), vec!["cfg.local.Storage"]);
    assert!(output.diagnostics[CATEGORY].contains(
        &"Disabling cfg.cloud.Storage because it belongs to cfg.cloud which is disabled".to_string()
    ));
}
