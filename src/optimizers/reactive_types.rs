use crate::artifact::{runtime, Expr, Statement};
use crate::context::GenerationContext;
use crate::error::PipelineError;
use crate::module::{Module, ModuleDescriptor};

pub const ID: &str = "scan.reactive.types";
const LOADER_NAME: &str = "PublishersOptimizationsLoader";

/// Records the known reactive types at build time.
pub struct ReactiveTypesModule {
    descriptor: ModuleDescriptor,
}

impl ReactiveTypesModule {
    pub fn new() -> Self {
        Self {
            descriptor: ModuleDescriptor::new(ID)
                .description("Scans reactive types at build time instead of runtime"),
        }
    }
}

impl Default for ReactiveTypesModule {
    fn default() -> Self {
        Self::new()
    }
}

fn type_list(types: &[String]) -> Expr {
    Expr::List(types.iter().map(|t| Expr::type_ref(t.replace('$', "."))).collect())
}

impl Module for ReactiveTypesModule {
    fn descriptor(&self) -> &ModuleDescriptor {
        &self.descriptor
    }

    fn generate(&self, ctx: &mut GenerationContext) -> Result<(), PipelineError> {
        let types = ctx.analyzer().snapshot().reactive_types.clone();
        ctx.register_static_optimization(LOADER_NAME, runtime::PUBLISHERS, || {
            vec![Statement::Return(Expr::new_instance(
                runtime::PUBLISHERS,
                vec![
                    type_list(&types.reactive),
                    type_list(&types.single),
                    type_list(&types.completable),
                ],
            ))]
            .into()
        })?;
        Ok(())
    }
}
