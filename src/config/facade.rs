//! Configuration loader: builds the layered `config::Config` and flattens it
//! into an [`AotConfig`].

use super::merge::merge_policy;
use super::sources::{config_file, environment};
use super::{AotConfig, ConfigValue};
use crate::error::PipelineError;
use config::{Value, ValueKind};
use std::collections::{BTreeMap, HashMap};
use std::path::Path;
use tracing::debug;

pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration from defaults, an optional file, the environment,
    /// and explicit overrides (highest precedence).
    pub fn load(
        file: Option<&Path>,
        overrides: &[(String, String)],
    ) -> Result<AotConfig, PipelineError> {
        let mut builder = merge_policy::builder_with_defaults()?;
        if let Some(path) = file {
            builder = config_file::add_to_builder(builder, path)?;
        }
        builder = environment::add_to_builder(builder);
        builder = merge_policy::apply_overrides(builder, overrides)?;

        let settings = builder.build()?;
        let table: HashMap<String, Value> = settings.try_deserialize()?;

        let mut values = BTreeMap::new();
        for (key, value) in table {
            flatten_into(&key, value, &mut values)?;
        }
        debug!(keys = values.len(), "Configuration loaded");
        Ok(AotConfig::from_values(values))
    }

    pub fn load_from_file(path: &Path) -> Result<AotConfig, PipelineError> {
        Self::load(Some(path), &[])
    }
}

fn flatten_into(
    prefix: &str,
    value: Value,
    out: &mut BTreeMap<String, ConfigValue>,
) -> Result<(), PipelineError> {
    match value.kind {
        ValueKind::Nil => {}
        ValueKind::Table(table) => {
            for (key, nested) in table {
                flatten_into(&format!("{}.{}", prefix, key), nested, out)?;
            }
        }
        ValueKind::Array(items) => {
            let mut list = Vec::with_capacity(items.len());
            for item in items {
                list.push(item.into_string()?);
            }
            out.insert(prefix.to_string(), ConfigValue::List(list));
        }
        kind => {
            let scalar = Value::new(None, kind).into_string()?;
            out.insert(prefix.to_string(), ConfigValue::Scalar(scalar));
        }
    }
    Ok(())
}
