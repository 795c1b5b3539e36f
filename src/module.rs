//! Optimization module contract and descriptive metadata.

use crate::context::GenerationContext;
use crate::error::PipelineError;
use crate::types::ProfileSet;
use serde::Serialize;

/// A configuration key a module reads. Descriptive only, never enforced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OptionSpec {
    pub key: String,
    pub description: String,
    pub sample: String,
}

impl OptionSpec {
    pub fn new(
        key: impl Into<String>,
        description: impl Into<String>,
        sample: impl Into<String>,
    ) -> Self {
        Self {
            key: key.into(),
            description: description.into(),
            sample: sample.into(),
        }
    }

    /// Sample configuration lines: description comments, then `key = "sample"`.
    pub fn to_sample(&self) -> String {
        let mut out = String::new();
        for line in self.description.lines() {
            out.push_str("# ");
            out.push_str(line);
            out.push('\n');
        }
        out.push_str(&self.key);
        out.push_str(" = ");
        out.push_str(&toml::Value::String(self.sample.clone()).to_string());
        out
    }
}

/// Static metadata of a module.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ModuleDescriptor {
    pub id: String,
    pub description: String,
    /// Module ids that must run first.
    pub dependencies: Vec<String>,
    /// Feature ids toggled independently inside this module.
    pub sub_modules: Vec<String>,
    pub options: Vec<OptionSpec>,
    pub profiles: ProfileSet,
    /// Used when `<id>.enabled` is not configured.
    pub enabled_by_default: bool,
}

impl ModuleDescriptor {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            description: String::new(),
            dependencies: Vec::new(),
            sub_modules: Vec::new(),
            options: Vec::new(),
            profiles: ProfileSet::BOTH,
            enabled_by_default: false,
        }
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn depends_on(mut self, id: impl Into<String>) -> Self {
        self.dependencies.push(id.into());
        self
    }

    pub fn sub_module(mut self, id: impl Into<String>) -> Self {
        self.sub_modules.push(id.into());
        self
    }

    pub fn option(mut self, option: OptionSpec) -> Self {
        self.options.push(option);
        self
    }

    pub fn profiles(mut self, profiles: ProfileSet) -> Self {
        self.profiles = profiles;
        self
    }

    pub fn enabled_by_default(mut self, enabled: bool) -> Self {
        self.enabled_by_default = enabled;
        self
    }
}

/// A unit of build-time optimization logic.
///
/// Modules run sequentially and may freely mutate the context; they need not
/// be reentrant.
pub trait Module: Send + Sync {
    fn descriptor(&self) -> &ModuleDescriptor;

    fn generate(&self, ctx: &mut GenerationContext) -> Result<(), PipelineError>;

    fn id(&self) -> &str {
        &self.descriptor().id
    }
}
