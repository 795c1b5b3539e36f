//! Static logging configuration.
//!
//! Replaces the logging configuration resource with a generated configurator
//! carrying the logger levels found in the application properties.

use crate::artifact::{runtime, Expr, MethodSpec, SourceUnit, Statement};
use crate::codegen::MapGenerator;
use crate::context::GenerationContext;
use crate::error::PipelineError;
use crate::module::{Module, ModuleDescriptor, OptionSpec};
use serde_json::Value;
use std::collections::BTreeMap;

pub const ID: &str = "logging.static.config";
pub const RESOURCE_KEY: &str = "logging.config.resource";
pub const DEFAULT_RESOURCE: &str = "logback.xml";
pub const CONFIGURATOR_NAME: &str = "StaticLoggingConfiguration";
const LEVELS_PREFIX: &str = "logger.levels.";

pub struct LoggingConfigModule {
    descriptor: ModuleDescriptor,
}

impl LoggingConfigModule {
    pub fn new() -> Self {
        Self {
            descriptor: ModuleDescriptor::new(ID)
                .description("Replaces the logging configuration file with static configuration")
                .option(OptionSpec::new(
                    RESOURCE_KEY,
                    "Logging configuration resource replaced by the static configuration",
                    DEFAULT_RESOURCE,
                )),
        }
    }
}

impl Default for LoggingConfigModule {
    fn default() -> Self {
        Self::new()
    }
}

impl Module for LoggingConfigModule {
    fn descriptor(&self) -> &ModuleDescriptor {
        &self.descriptor
    }

    fn generate(&self, ctx: &mut GenerationContext) -> Result<(), PipelineError> {
        let resource = ctx
            .config()
            .optional_string(RESOURCE_KEY)
            .unwrap_or_else(|| DEFAULT_RESOURCE.to_string());

        let levels: BTreeMap<String, Value> = ctx
            .analyzer()
            .snapshot()
            .properties
            .iter()
            .filter_map(|(key, value)| {
                key.strip_prefix(LEVELS_PREFIX)
                    .map(|logger| (logger.to_string(), value.clone()))
            })
            .collect();

        let mut generator = MapGenerator::new();
        let levels_map = generator.generate_map(levels.iter());
        let unit = SourceUnit::new(ctx.namespace(), CONFIGURATOR_NAME)
            .implementing(runtime::LOGGING_CONFIGURATOR)
            .with_method(
                MethodSpec::new("configure")
                    .param("context", "LoggingContext")
                    .statement(Statement::Expr(Expr::call_on(
                        Expr::ident("context"),
                        "reset",
                        vec![],
                    )))
                    .statement(Statement::Expr(Expr::call_on(
                        Expr::ident("context"),
                        "applyLevels",
                        vec![levels_map],
                    ))),
            )
            .with_methods(generator.into_helpers());

        ctx.register_unit(unit)?;
        ctx.register_service_implementation(runtime::LOGGING_CONFIGURATOR, CONFIGURATOR_NAME)?;
        ctx.exclude_resource(resource);
        Ok(())
    }
}
