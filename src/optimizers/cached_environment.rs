use crate::artifact::{runtime, Expr, MethodSpec, Statement};
use crate::context::GenerationContext;
use crate::error::PipelineError;
use crate::module::{Module, ModuleDescriptor};

pub const ID: &str = "cached.environment";

/// Treats environment values as immutable after startup.
pub struct CachedEnvironmentModule {
    descriptor: ModuleDescriptor,
}

impl CachedEnvironmentModule {
    pub fn new() -> Self {
        Self {
            descriptor: ModuleDescriptor::new(ID).description(
                "Caches environment property values: environment properties will be deemed immutable after application startup.",
            ),
        }
    }
}

impl Default for CachedEnvironmentModule {
    fn default() -> Self {
        Self::new()
    }
}

impl Module for CachedEnvironmentModule {
    fn descriptor(&self) -> &ModuleDescriptor {
        &self.descriptor
    }

    fn generate(&self, ctx: &mut GenerationContext) -> Result<(), PipelineError> {
        ctx.register_static_initializer(
            MethodSpec::new_static("enableEnvironmentCaching").statement(Statement::Expr(
                Expr::call_static(runtime::ENVIRONMENT, "cacheEnvironment", vec![]),
            )),
        )
    }
}
