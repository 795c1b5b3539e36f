use crate::artifact::{runtime, Expr, Statement};
use crate::context::GenerationContext;
use crate::error::PipelineError;
use crate::module::{Module, ModuleDescriptor, OptionSpec};
use tracing::debug;

pub const ID: &str = "known.missing.types";
pub const TYPES_KEY: &str = "known.missing.types.list";
const LOADER_NAME: &str = "KnownMissingTypesOptimizationLoader";

/// Resolves type-existence checks at build time.
pub struct KnownMissingTypesModule {
    descriptor: ModuleDescriptor,
}

impl KnownMissingTypesModule {
    pub fn new() -> Self {
        Self {
            descriptor: ModuleDescriptor::new(ID)
                .description("Checks of existence of some types at build time instead of runtime")
                .option(OptionSpec::new(
                    TYPES_KEY,
                    "A list of types that the analyzer needs to check for existence (comma separated)",
                    "io.reactivex.Observable,reactor.core.publisher.Flux,kotlinx.coroutines.flow.Flow",
                )),
        }
    }
}

impl Default for KnownMissingTypesModule {
    fn default() -> Self {
        Self::new()
    }
}

impl Module for KnownMissingTypesModule {
    fn descriptor(&self) -> &ModuleDescriptor {
        &self.descriptor
    }

    fn generate(&self, ctx: &mut GenerationContext) -> Result<(), PipelineError> {
        let missing: Vec<String> = ctx
            .config()
            .string_list(TYPES_KEY)
            .into_iter()
            .filter(|name| !ctx.application().has_type(name))
            .collect();
        debug!(missing = missing.len(), "Resolved known missing types");

        ctx.register_static_optimization(LOADER_NAME, runtime::KNOWN_MISSING_TYPES, || {
            let mut statements = vec![Statement::Let {
                name: "knownMissingTypes".to_string(),
                value: Expr::new_instance("HashSet", vec![]),
            }];
            statements.extend(missing.iter().map(|name| {
                Statement::Expr(Expr::call_on(
                    Expr::ident("knownMissingTypes"),
                    "add",
                    vec![Expr::str(name.clone())],
                ))
            }));
            statements.push(Statement::Return(Expr::new_instance(
                runtime::KNOWN_MISSING_TYPES,
                vec![Expr::ident("knownMissingTypes")],
            )));
            statements.into()
        })?;
        Ok(())
    }
}
