//! Merge rules: defaults, override order, conflict handling.
//!
//! Later sources win. Order: defaults, configuration file, `PREBAKE__*`
//! environment variables, explicit overrides.

use config::builder::DefaultState;
use config::Config;
use config::ConfigBuilder;
use config::ConfigError;

/// Create a Config builder with merge policy defaults applied.
///
/// Module toggles are not defaulted here: the registry owns module defaults
/// and a missing `<id>.enabled` key means the module keeps its own default.
pub fn builder_with_defaults() -> Result<ConfigBuilder<DefaultState>, ConfigError> {
    Config::builder().set_default(crate::config::RUNTIME, "jit")
}

/// Apply explicit key/value overrides on top of every other source.
pub fn apply_overrides(
    mut builder: ConfigBuilder<DefaultState>,
    overrides: &[(String, String)],
) -> Result<ConfigBuilder<DefaultState>, ConfigError> {
    for (key, value) in overrides {
        builder = builder.set_override(key.as_str(), value.as_str())?;
    }
    Ok(builder)
}
