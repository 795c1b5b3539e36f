//! Standard optimization module catalogue.

pub mod cached_environment;
pub mod deduce_environment;
pub mod entry_point;
pub mod environment_properties;
pub mod known_missing_types;
pub mod logging_config;
pub mod native_image;
pub mod property_sources;
pub mod reactive_types;

use crate::discovery::ServiceLoaderModule;
use crate::module::Module;
use std::sync::Arc;

pub use cached_environment::CachedEnvironmentModule;
pub use deduce_environment::DeduceEnvironmentModule;
pub use environment_properties::EnvironmentPropertiesModule;
pub use known_missing_types::KnownMissingTypesModule;
pub use logging_config::LoggingConfigModule;
pub use native_image::NativeImageConfigModule;
pub use property_sources::ConstantPropertySourcesModule;
pub use reactive_types::ReactiveTypesModule;

/// Every built-in module, one instance each.
pub fn standard_modules() -> Vec<Arc<dyn Module>> {
    vec![
        Arc::new(ServiceLoaderModule::dynamic()),
        Arc::new(ServiceLoaderModule::ahead_of_time()),
        Arc::new(ConstantPropertySourcesModule::new()),
        Arc::new(CachedEnvironmentModule::new()),
        Arc::new(EnvironmentPropertiesModule::new()),
        Arc::new(DeduceEnvironmentModule::new()),
        Arc::new(KnownMissingTypesModule::new()),
        Arc::new(ReactiveTypesModule::new()),
        Arc::new(NativeImageConfigModule::new()),
        Arc::new(LoggingConfigModule::new()),
    ]
}
