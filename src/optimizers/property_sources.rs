//! Constant property sources assembled from discovery substitutes.

use crate::artifact::{runtime, Expr, Statement};
use crate::context::GenerationContext;
use crate::discovery::modules::{AHEAD_OF_TIME_ID, DYNAMIC_ID};
use crate::error::PipelineError;
use crate::module::{Module, ModuleDescriptor, OptionSpec};
use tracing::debug;

pub const ID: &str = "sealed.property.source";
pub const LOADER_TYPE_KEY: &str = "property.source.loader.type";
pub const DEFAULT_LOADER_TYPE: &str = "prebake.runtime.PropertySourceLoader";
const LOADER_NAME: &str = "AotConstantPropertySources";

pub struct ConstantPropertySourcesModule {
    descriptor: ModuleDescriptor,
}

impl ConstantPropertySourcesModule {
    pub fn new() -> Self {
        Self {
            descriptor: ModuleDescriptor::new(ID)
                .description("Precomputes property sources at build time")
                .depends_on(DYNAMIC_ID)
                .depends_on(AHEAD_OF_TIME_ID)
                .option(OptionSpec::new(
                    LOADER_TYPE_KEY,
                    "The capability whose substitutes become constant property sources",
                    DEFAULT_LOADER_TYPE,
                )),
        }
    }
}

impl Default for ConstantPropertySourcesModule {
    fn default() -> Self {
        Self::new()
    }
}

impl Module for ConstantPropertySourcesModule {
    fn descriptor(&self) -> &ModuleDescriptor {
        &self.descriptor
    }

    fn generate(&self, ctx: &mut GenerationContext) -> Result<(), PipelineError> {
        let loader_type = ctx
            .config()
            .optional_string(LOADER_TYPE_KEY)
            .unwrap_or_else(|| DEFAULT_LOADER_TYPE.to_string());
        let sources: Vec<String> = ctx
            .substitutions()
            .map(|map| {
                map.get(&loader_type)
                    .iter()
                    .map(|unit| unit.qualified_name())
                    .collect()
            })
            .unwrap_or_default();
        debug!(count = sources.len(), "Sealing property sources");

        ctx.register_static_optimization(LOADER_NAME, runtime::CONSTANT_PROPERTY_SOURCES, || {
            let mut statements = vec![Statement::Let {
                name: "propertySources".to_string(),
                value: Expr::new_instance("ArrayList", vec![]),
            }];
            statements.extend(sources.iter().map(|source| {
                Statement::Expr(Expr::call_on(
                    Expr::ident("propertySources"),
                    "add",
                    vec![Expr::new_instance(source.clone(), vec![])],
                ))
            }));
            statements.push(Statement::Return(Expr::new_instance(
                runtime::CONSTANT_PROPERTY_SOURCES,
                vec![Expr::ident("propertySources")],
            )));
            statements.into()
        })?;
        Ok(())
    }
}
