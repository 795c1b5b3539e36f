//! Native-image build arguments.
//!
//! The properties file is written at finish so that it lists every type
//! registered for build-time initialization, including those registered by
//! modules running after this one.

use super::entry_point::CONFIGURER_NAME;
use crate::artifact::runtime;
use crate::config::enabled_key;
use crate::context::GenerationContext;
use crate::discovery::modules::AHEAD_OF_TIME_ID;
use crate::discovery::SERVICE_TYPES;
use crate::error::PipelineError;
use crate::module::{Module, ModuleDescriptor, OptionSpec};
use crate::types::ProfileSet;
use std::collections::BTreeSet;

pub const ID: &str = "native.image.config";
const NEXT_LINE: &str = " \\";

pub struct NativeImageConfigModule {
    descriptor: ModuleDescriptor,
}

impl NativeImageConfigModule {
    pub fn new() -> Self {
        Self {
            descriptor: ModuleDescriptor::new(ID)
                .description("Generates native-image configuration files required to load the optimizations")
                .profiles(ProfileSet::AHEAD_OF_TIME_ONLY)
                .option(OptionSpec::new(
                    SERVICE_TYPES,
                    "The list of service types to be scanned (comma separated)",
                    "prebake.runtime.Service1,prebake.runtime.Service2",
                )),
        }
    }
}

impl Default for NativeImageConfigModule {
    fn default() -> Self {
        Self::new()
    }
}

/// Path of the properties file for a namespace.
pub fn properties_path(namespace: &str) -> String {
    format!("META-INF/native-image/{}/native-image.properties", namespace)
}

/// Content of `native-image.properties`.
pub fn render_properties(
    namespace: &str,
    build_time_init: &BTreeSet<String>,
    excluded_services: &[String],
) -> String {
    let mut lines = vec![
        format!("Args=--initialize-at-build-time={}", runtime::APPLICATION_CONFIGURER),
        format!("     --initialize-at-build-time={}.{}", namespace, CONFIGURER_NAME),
    ];
    lines.extend(
        build_time_init
            .iter()
            .map(|name| format!("     --initialize-at-build-time={}", name)),
    );
    lines.extend(
        excluded_services
            .iter()
            .map(|service| format!("     -H:ServiceLoaderFeatureExcludeServices={}", service)),
    );
    let mut out = lines.join(&format!("{}\n", NEXT_LINE));
    out.push_str("\n\n");
    out
}

impl Module for NativeImageConfigModule {
    fn descriptor(&self) -> &ModuleDescriptor {
        &self.descriptor
    }

    fn generate(&self, ctx: &mut GenerationContext) -> Result<(), PipelineError> {
        let static_services = ctx.config().boolean(&enabled_key(AHEAD_OF_TIME_ID), true);
        let excluded: Vec<String> = if static_services {
            ctx.config().string_list(SERVICE_TYPES)
        } else {
            Vec::new()
        };
        ctx.register_resource(properties_path(ctx.namespace()), move |path, view| {
            std::fs::write(
                path,
                render_properties(view.namespace, view.build_time_init, &excluded),
            )
        })
    }
}
