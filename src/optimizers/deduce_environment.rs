use crate::artifact::{runtime, Expr, MethodSpec, SourceUnit, Statement};
use crate::context::{DeducedEnvironment, GenerationContext};
use crate::error::PipelineError;
use crate::module::{Module, ModuleDescriptor};

pub const ID: &str = "deduce.environment";
pub const CONFIGURER_NAME: &str = "DeducedEnvironmentConfigurer";
const LOWEST_PRECEDENCE: i64 = i32::MAX as i64;

/// Fixes the active environments at build time.
pub struct DeduceEnvironmentModule {
    descriptor: ModuleDescriptor,
}

impl DeduceEnvironmentModule {
    pub fn new() -> Self {
        Self {
            descriptor: ModuleDescriptor::new(ID)
                .description("Deduces the environment at build time instead of runtime"),
        }
    }
}

impl Default for DeduceEnvironmentModule {
    fn default() -> Self {
        Self::new()
    }
}

fn string_list<'a>(values: impl IntoIterator<Item = &'a String>) -> Expr {
    Expr::List(values.into_iter().map(|v| Expr::str(v.clone())).collect())
}

impl Module for DeduceEnvironmentModule {
    fn descriptor(&self) -> &ModuleDescriptor {
        &self.descriptor
    }

    fn generate(&self, ctx: &mut GenerationContext) -> Result<(), PipelineError> {
        let snapshot = ctx.analyzer().snapshot();
        let Some(deduce) = snapshot.deduce_environment else {
            return Ok(());
        };
        let builder = || Expr::ident("builder");
        let mut configure = MethodSpec::new("configure")
            .param("builder", runtime::CONTEXT_BUILDER)
            .statement(Statement::Expr(Expr::call_on(
                builder(),
                "deduceEnvironment",
                vec![Expr::Bool(false)],
            )));
        if !snapshot.active_environments.is_empty() {
            configure = configure.statement(Statement::Expr(Expr::call_on(
                builder(),
                "defaultEnvironments",
                vec![string_list(&snapshot.active_environments)],
            )));
        }
        if !snapshot.packages.is_empty() {
            configure = configure.statement(Statement::Expr(Expr::call_on(
                builder(),
                "packages",
                vec![string_list(&snapshot.packages)],
            )));
        }
        let unit = SourceUnit::new(ctx.namespace(), CONFIGURER_NAME)
            .implementing(runtime::ENVIRONMENT_CONFIGURER)
            .with_method(configure)
            .with_method(
                MethodSpec::new("getOrder")
                    .returns("int")
                    .statement(Statement::Return(Expr::Int(LOWEST_PRECEDENCE))),
            );

        ctx.publish_deduced_environment(DeducedEnvironment {
            deduce_environment: deduce,
        });
        if deduce {
            ctx.register_unit(unit)?;
            ctx.write_service_file(runtime::ENVIRONMENT_CONFIGURER, CONFIGURER_NAME)?;
        }
        Ok(())
    }
}
