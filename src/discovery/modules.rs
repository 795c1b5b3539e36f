//! The two service-loading modules, one per profile.

use super::substitution::{
    StructuredConfigSubstitution, Substitution, DEFAULT_STRUCTURED_CONFIG_LOADER,
    STRUCTURED_CONFIG_ID, STRUCTURED_CONFIG_LOADER_KEY,
};
use super::table::{AheadOfTimeRenderer, DynamicRenderer, TableRenderer};
use super::{
    DiscoveryEngine, DiscoverySettings, FORCE_INCLUDE, MAX_UNIT_SIZE_KEY, POSSIBLE_ENVIRONMENTS,
    REJECTED, SERVICE_TYPES,
};
use crate::artifact::{runtime, Expr, Statement};
use crate::context::{GenerationContext, LoaderBody};
use crate::error::PipelineError;
use crate::module::{Module, ModuleDescriptor, OptionSpec};
use crate::types::ProfileSet;
use std::sync::Arc;
use tracing::debug;

pub const DYNAMIC_ID: &str = "serviceloading.jit";
pub const AHEAD_OF_TIME_ID: &str = "serviceloading.native";

const DESCRIPTION: &str =
    "Scans for service types ahead-of-time, avoiding classpath scanning at startup";
const STATIC_SERVICES_LOADER: &str = "StaticServicesLoader";
const SAMPLE_SERVICE_TYPES: &str = "prebake.runtime.PropertySourceLoader,prebake.runtime.BeanConfiguration,prebake.runtime.BeanDefinitionReference,prebake.runtime.TypeConverterRegistrar,prebake.runtime.ApplicationContextConfigurer";

pub struct ServiceLoaderModule {
    descriptor: ModuleDescriptor,
    renderer: Box<dyn TableRenderer>,
}

impl ServiceLoaderModule {
    /// Lazy tables for the dynamic-load profile.
    pub fn dynamic() -> Self {
        Self::new(DYNAMIC_ID, ProfileSet::DYNAMIC_ONLY, Box::new(DynamicRenderer))
    }

    /// Statically bound tables for the ahead-of-time profile.
    pub fn ahead_of_time() -> Self {
        Self::new(
            AHEAD_OF_TIME_ID,
            ProfileSet::AHEAD_OF_TIME_ONLY,
            Box::new(AheadOfTimeRenderer),
        )
    }

    fn new(id: &str, profiles: ProfileSet, renderer: Box<dyn TableRenderer>) -> Self {
        let descriptor = ModuleDescriptor::new(id)
            .description(DESCRIPTION)
            .profiles(profiles)
            .enabled_by_default(true)
            .sub_module(STRUCTURED_CONFIG_ID)
            .option(OptionSpec::new(
                SERVICE_TYPES,
                "The list of service types to be scanned (comma separated)",
                SAMPLE_SERVICE_TYPES,
            ))
            .option(OptionSpec::new(
                REJECTED,
                "A list of implementation types which shouldn't be included in the final application (comma separated)",
                "com.Misc,org.Bar",
            ))
            .option(OptionSpec::new(
                FORCE_INCLUDE,
                "A list of service implementations to be forcefully included, even if they are not available (comma separated)",
                "com.Misc,org.Bar",
            ))
            .option(OptionSpec::new(
                POSSIBLE_ENVIRONMENTS,
                "The list of environments which may be active at runtime (comma separated)",
                "dev,prod",
            ))
            .option(OptionSpec::new(
                MAX_UNIT_SIZE_KEY,
                "Maximum size of a generated table unit before it is split into sub-loaders",
                "30000",
            ))
            .option(OptionSpec::new(
                STRUCTURED_CONFIG_LOADER_KEY,
                "The configuration file loader replaced by static property sources",
                DEFAULT_STRUCTURED_CONFIG_LOADER,
            ));
        Self {
            descriptor,
            renderer,
        }
    }
}

impl Module for ServiceLoaderModule {
    fn descriptor(&self) -> &ModuleDescriptor {
        &self.descriptor
    }

    fn generate(&self, ctx: &mut GenerationContext) -> Result<(), PipelineError> {
        let settings = DiscoverySettings::from_config(ctx.config())?;
        let max_unit_size = settings.max_unit_size;

        let structured_config = ctx
            .config()
            .is_feature_enabled(STRUCTURED_CONFIG_ID)
            .then(|| {
                let loader = ctx
                    .config()
                    .optional_string(STRUCTURED_CONFIG_LOADER_KEY)
                    .unwrap_or_else(|| DEFAULT_STRUCTURED_CONFIG_LOADER.to_string());
                let resources = StructuredConfigSubstitution::resource_names(
                    ctx.analyzer().active_profile_names(),
                    &settings.possible_environments,
                );
                StructuredConfigSubstitution::new(loader, resources)
            });

        let mut engine = DiscoveryEngine::new(settings);
        if let Some(substitution) = structured_config {
            debug!(candidate = %substitution.replaces(), "Structured configuration substitution enabled");
            engine.register_substitution(Arc::new(substitution));
        }

        let result = engine.run(ctx)?;
        ctx.publish_substitutions(result.substitutions.clone());

        let mut factories = Vec::new();
        for spec in result.table_specs() {
            let unit = self.renderer.render(ctx.namespace(), &spec, max_unit_size);
            debug!(
                capability = %spec.capability,
                entries = spec.len(),
                factory = %unit.name,
                "Rendered service table"
            );
            factories.push((spec.capability.clone(), unit.name.clone()));
            ctx.register_unit(unit)?;
        }

        ctx.register_static_optimization(STATIC_SERVICES_LOADER, runtime::STATIC_SERVICES, || {
            static_services_body(&factories)
        })?;
        Ok(())
    }
}

/// `services = new HashMap(); services.put(cap, new Factory()); ...`
fn static_services_body(factories: &[(String, String)]) -> LoaderBody {
    let mut statements = vec![Statement::Let {
        name: "services".to_string(),
        value: Expr::new_instance("HashMap", vec![]),
    }];
    statements.extend(factories.iter().map(|(capability, factory)| {
        Statement::Expr(Expr::call_on(
            Expr::ident("services"),
            "put",
            vec![
                Expr::str(capability.clone()),
                Expr::new_instance(factory.clone(), vec![]),
            ],
        ))
    }));
    statements.push(Statement::Return(Expr::new_instance(
        runtime::STATIC_SERVICES,
        vec![Expr::ident("services")],
    )));
    statements.into()
}
