//! Entry point synthesis.
//!
//! Runs after every scheduled module: one configurer unit whose static block
//! calls each registered static initializer, and whose `configure` method
//! records which optimizations were applied.

use crate::artifact::{runtime, ArtifactRef, Expr, MethodSpec, SourceUnit, Statement};
use crate::codegen::MapGenerator;
use crate::context::GenerationContext;
use crate::error::PipelineError;
use serde_json::{json, Value};
use std::collections::BTreeMap;

pub const CONFIGURER_NAME: &str = "AotApplicationConfigurer";

/// Properties set on the application by the generated configurer.
pub fn diagnostic_properties(ctx: &GenerationContext) -> BTreeMap<String, Value> {
    let mut values = BTreeMap::new();
    values.insert("prebake.enabled".to_string(), Value::Bool(true));
    values.insert(
        "prebake.runtime".to_string(),
        Value::String(ctx.profile().slug().to_string()),
    );
    values.insert(
        "prebake.optimizations".to_string(),
        json!(ctx.executed_modules()),
    );
    values
}

fn initializer_call(method: &MethodSpec) -> Statement {
    let call = Expr::call(method.name.clone(), vec![]);
    match method.returns {
        Some(_) => Statement::Let {
            name: format!("_{}", method.name),
            value: call,
        },
        None => Statement::Expr(call),
    }
}

/// Register the configurer unit and its service entry.
pub fn synthesize(ctx: &mut GenerationContext) -> Result<ArtifactRef, PipelineError> {
    let initializers = ctx.static_initializers().to_vec();
    let static_init: Vec<Statement> = initializers.iter().map(initializer_call).collect();

    let mut generator = MapGenerator::new();
    let properties = diagnostic_properties(ctx);
    let map = generator.generate_map(properties.iter());
    let configure = MethodSpec::new("configure")
        .param("builder", runtime::CONTEXT_BUILDER)
        .statement(Statement::Expr(Expr::call_on(
            Expr::ident("builder"),
            "properties",
            vec![map],
        )));

    let unit = SourceUnit::new(ctx.namespace(), CONFIGURER_NAME)
        .implementing(runtime::APPLICATION_CONFIGURER)
        .with_static_init(static_init)
        .with_methods(initializers)
        .with_method(configure)
        .with_methods(generator.into_helpers());

    let artifact = ctx.register_unit(unit)?;
    ctx.register_service_implementation(runtime::APPLICATION_CONFIGURER, CONFIGURER_NAME)?;
    Ok(artifact)
}
