//! Candidate substitutions.
//!
//! A substitution replaces one discovered candidate with precomputed units.
//! The structured-configuration substitution turns the configuration file
//! loader into one static property source per configuration resource.

use crate::artifact::{runtime, Expr, MethodSpec, SourceUnit, Statement};
use crate::codegen::{type_name_fragment, MapGenerator};
use crate::context::GenerationContext;
use crate::error::PipelineError;
use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet};
use tracing::debug;

/// Feature id of the structured-configuration substitution.
pub const STRUCTURED_CONFIG_ID: &str = "yaml.to.static.config";
/// Candidate the structured-configuration substitution replaces.
pub const STRUCTURED_CONFIG_LOADER_KEY: &str = "yaml.to.static.config.loader";
pub const DEFAULT_STRUCTURED_CONFIG_LOADER: &str = "prebake.runtime.YamlPropertySourceLoader";
/// Prefix of the per-resource property source order keys.
pub const ORDER_KEY_PREFIX: &str = "map.property.order.";
pub const HIGHEST_PRECEDENCE: i32 = i32::MIN;

/// Replaces a single candidate with generated units.
pub trait Substitution: Send + Sync {
    /// Qualified name of the candidate this substitution replaces.
    fn replaces(&self) -> &str;

    /// Register replacement units on the context. Registering none means the
    /// candidate is evaluated normally.
    fn generate(&self, ctx: &mut GenerationContext) -> Result<(), PipelineError>;
}

/// Static property sources for configuration resources present in the
/// environment snapshot.
#[derive(Debug, Clone)]
pub struct StructuredConfigSubstitution {
    loader: String,
    resources: Vec<String>,
}

impl StructuredConfigSubstitution {
    pub fn new(loader: impl Into<String>, resources: Vec<String>) -> Self {
        Self {
            loader: loader.into(),
            resources,
        }
    }

    /// `application`, then `application-<env>` for each active environment,
    /// then for each possible environment other than `default`. Duplicates
    /// keep their first position.
    pub fn resource_names(active: &BTreeSet<String>, possible: &[String]) -> Vec<String> {
        let mut names = vec!["application".to_string()];
        let candidates = active
            .iter()
            .chain(possible.iter().filter(|env| env.as_str() != "default"))
            .map(|env| format!("application-{}", env));
        for name in candidates {
            if !names.contains(&name) {
                names.push(name);
            }
        }
        names
    }

    pub fn resources(&self) -> &[String] {
        &self.resources
    }
}

impl Substitution for StructuredConfigSubstitution {
    fn replaces(&self) -> &str {
        &self.loader
    }

    fn generate(&self, ctx: &mut GenerationContext) -> Result<(), PipelineError> {
        for resource in &self.resources {
            let Some(values) = ctx
                .analyzer()
                .snapshot()
                .config_resources
                .get(resource)
                .cloned()
            else {
                continue;
            };
            let order_key = format!("{}{}", ORDER_KEY_PREFIX, resource);
            let order = ctx.config().integer(&order_key, HIGHEST_PRECEDENCE as i64)?;
            let order = i32::try_from(order).map_err(|_| {
                PipelineError::ConfigError(format!(
                    "Value {} for key '{}' is out of range",
                    order, order_key
                ))
            })?;
            debug!(resource = %resource, order, "Generating static property source");
            let unit = property_source_unit(ctx.namespace(), resource, order, &values);
            ctx.register_unit(unit)?;
            ctx.exclude_resource(format!("{}.yml", resource));
        }
        Ok(())
    }
}

/// Static property source holding `values`. Named
/// `<ResourceName>StaticPropertySource`.
pub fn property_source_unit(
    namespace: &str,
    resource: &str,
    order: i32,
    values: &BTreeMap<String, Value>,
) -> SourceUnit {
    let mut generator = MapGenerator::new();
    let map = generator.generate_map(values.iter());
    SourceUnit::new(
        namespace,
        format!("{}StaticPropertySource", type_name_fragment(resource)),
    )
    .implementing(runtime::PROPERTY_SOURCE)
    .with_method(
        MethodSpec::new("getName")
            .returns("String")
            .statement(Statement::Return(Expr::str(resource))),
    )
    .with_method(
        MethodSpec::new("getOrder")
            .returns("int")
            .statement(Statement::Return(Expr::Int(order as i64))),
    )
    .with_method(
        MethodSpec::new("values")
            .returns("Map")
            .statement(Statement::Return(map)),
    )
    .with_methods(generator.into_helpers())
}
