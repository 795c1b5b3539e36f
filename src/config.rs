//! Configuration System
//!
//! Read-only key/value configuration consumed by the pipeline and its modules.
//! Values are loaded hierarchically (defaults, file, environment, explicit
//! overrides) through the `config` crate and flattened into dotted keys so that
//! nested tables and literal dotted keys are interchangeable.

use crate::error::PipelineError;
use crate::types::Profile;
use serde::Serialize;
use std::collections::BTreeMap;

mod facade;
mod merge;
mod sources;

pub use facade::ConfigLoader;

/// Key holding the target runtime profile.
pub const RUNTIME: &str = "runtime";
/// Key holding the namespace generated artifacts are placed in.
pub const GENERATED_PACKAGE: &str = "generated.package";

/// A flattened configuration value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum ConfigValue {
    Scalar(String),
    List(Vec<String>),
}

/// Read-only configuration lookup.
///
/// Implementations must be side-effect free: modules may query the same key
/// any number of times.
pub trait Configuration: Send + Sync {
    /// Raw value for a key, if present.
    fn raw(&self, key: &str) -> Option<&ConfigValue>;

    fn contains_key(&self, key: &str) -> bool {
        self.raw(key).is_some()
    }

    /// Value for a key that must be present and non-empty.
    fn require(&self, key: &str) -> Result<String, PipelineError> {
        match self.optional_string(key) {
            Some(value) if !value.trim().is_empty() => Ok(value),
            _ => Err(PipelineError::MissingConfigKey(key.to_string())),
        }
    }

    fn optional_string(&self, key: &str) -> Option<String> {
        match self.raw(key)? {
            ConfigValue::Scalar(value) => Some(value.clone()),
            ConfigValue::List(values) => Some(values.join(",")),
        }
    }

    /// List value: scalars are split on `,` and `;`, entries trimmed and
    /// empties dropped. Missing keys yield an empty list.
    fn string_list(&self, key: &str) -> Vec<String> {
        match self.raw(key) {
            None => Vec::new(),
            Some(ConfigValue::List(values)) => values
                .iter()
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
                .collect(),
            Some(ConfigValue::Scalar(value)) => split_list(value),
        }
    }

    /// Boolean value; only a case-insensitive `true` is true.
    fn boolean(&self, key: &str, default: bool) -> bool {
        match self.optional_string(key) {
            Some(value) => value.trim().eq_ignore_ascii_case("true"),
            None => default,
        }
    }

    fn integer(&self, key: &str, default: i64) -> Result<i64, PipelineError> {
        match self.optional_string(key) {
            None => Ok(default),
            Some(value) => value.trim().parse::<i64>().map_err(|_| {
                PipelineError::ConfigError(format!(
                    "Value '{}' for key '{}' is not an integer",
                    value, key
                ))
            }),
        }
    }

    /// Features are disabled unless `<id>.enabled` is set to true.
    fn is_feature_enabled(&self, feature_id: &str) -> bool {
        self.boolean(&enabled_key(feature_id), false)
    }

    fn profile(&self) -> Result<Profile, PipelineError> {
        match self.optional_string(RUNTIME) {
            None => Ok(Profile::Dynamic),
            Some(value) => value
                .parse::<Profile>()
                .map_err(|_| PipelineError::UnknownProfile(value)),
        }
    }
}

/// Configuration key toggling a module or feature.
pub fn enabled_key(feature_id: &str) -> String {
    format!("{}.enabled", feature_id)
}

fn split_list(value: &str) -> Vec<String> {
    value
        .split([',', ';'])
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

/// Immutable, flattened configuration snapshot.
#[derive(Debug, Clone, Default, Serialize)]
pub struct AotConfig {
    values: BTreeMap<String, ConfigValue>,
}

impl AotConfig {
    /// Build a configuration from explicit key/value pairs.
    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let values = pairs
            .into_iter()
            .map(|(k, v)| {
                (
                    normalize_key(&k.into()),
                    ConfigValue::Scalar(v.into()),
                )
            })
            .collect();
        Self { values }
    }

    pub(crate) fn from_values(values: BTreeMap<String, ConfigValue>) -> Self {
        let values = values
            .into_iter()
            .map(|(k, v)| (normalize_key(&k), v))
            .collect();
        Self { values }
    }

    /// Copy of this configuration with additional entries taking precedence.
    pub fn with_overrides<I, K, V>(&self, pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let mut values = self.values.clone();
        for (k, v) in pairs {
            values.insert(normalize_key(&k.into()), ConfigValue::Scalar(v.into()));
        }
        Self { values }
    }

    pub fn keys(&self) -> impl Iterator<Item = &String> {
        self.values.keys()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl Configuration for AotConfig {
    fn raw(&self, key: &str) -> Option<&ConfigValue> {
        self.values.get(&normalize_key(key))
    }
}

fn normalize_key(key: &str) -> String {
    key.trim().to_ascii_lowercase()
}
