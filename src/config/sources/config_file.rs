//! Configuration file source. The format follows the file extension:
//! `.toml`, `.json`, `.yaml`/`.yml`, and `.properties`/`.ini` (flat
//! `key = value` lines).

use config::builder::DefaultState;
use config::ConfigBuilder;
use config::ConfigError;
use config::File;
use config::FileFormat;
use std::path::Path;
use tracing::debug;

/// File format for a configuration path, chosen from its extension.
pub fn format_for(path: &Path) -> FileFormat {
    match path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .as_deref()
    {
        Some("json") => FileFormat::Json,
        Some("yaml") | Some("yml") => FileFormat::Yaml,
        Some("properties") | Some("ini") => FileFormat::Ini,
        _ => FileFormat::Toml,
    }
}

/// Add a required configuration file source to the builder.
pub fn add_to_builder(
    builder: ConfigBuilder<DefaultState>,
    path: &Path,
) -> Result<ConfigBuilder<DefaultState>, ConfigError> {
    if !path.is_file() {
        return Err(ConfigError::Message(format!(
            "Configuration file not found: {}",
            path.display()
        )));
    }
    let name = path.to_str().ok_or_else(|| {
        ConfigError::Message(format!(
            "Configuration path is not valid UTF-8: {}",
            path.display()
        ))
    })?;
    debug!(config_path = %path.display(), "Adding configuration file source");
    Ok(builder.add_source(File::new(name, format_for(path)).required(true)))
}
