//! Module registry and execution scheduler.
//!
//! Scheduling filters modules by profile and `<id>.enabled`, then orders them
//! with Kahn's algorithm over declared dependencies. The ready set is kept in
//! id order, so the result is deterministic regardless of registration order.
//! Cycles and references to unregistered modules are rejected before any
//! module runs.

use crate::config::{enabled_key, Configuration};
use crate::error::PipelineError;
use crate::module::{Module, ModuleDescriptor};
use crate::types::Profile;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::path::Path;
use std::sync::Arc;
use tracing::debug;

#[derive(Default, Clone)]
pub struct ModuleRegistry {
    modules: BTreeMap<String, Arc<dyn Module>>,
}

impl ModuleRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry holding the standard module catalogue.
    pub fn with_standard_modules() -> Self {
        let mut registry = Self::new();
        for module in crate::optimizers::standard_modules() {
            // ids in the catalogue are distinct
            registry.modules.insert(module.id().to_string(), module);
        }
        registry
    }

    pub fn register(&mut self, module: Arc<dyn Module>) -> Result<(), PipelineError> {
        let id = module.id().to_string();
        if self.modules.contains_key(&id) {
            return Err(PipelineError::DuplicateModule(id));
        }
        self.modules.insert(id, module);
        Ok(())
    }

    pub fn get(&self, id: &str) -> Option<&Arc<dyn Module>> {
        self.modules.get(id)
    }

    pub fn len(&self) -> usize {
        self.modules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.modules.is_empty()
    }

    /// Whether a module is switched on by configuration.
    pub fn is_enabled(descriptor: &ModuleDescriptor, config: &dyn Configuration) -> bool {
        config.boolean(&enabled_key(&descriptor.id), descriptor.enabled_by_default)
    }

    /// Enabled modules applicable to `profile`, in execution order.
    pub fn schedule(
        &self,
        profile: Profile,
        config: &dyn Configuration,
    ) -> Result<Vec<Arc<dyn Module>>, PipelineError> {
        self.validate()?;

        let selected: BTreeSet<&str> = self
            .modules
            .values()
            .filter(|m| {
                let descriptor = m.descriptor();
                if !descriptor.profiles.contains(profile) {
                    debug!(module = %descriptor.id, %profile, "Module not applicable to profile");
                    return false;
                }
                if !Self::is_enabled(descriptor, config) {
                    debug!(module = %descriptor.id, "Module disabled by configuration");
                    return false;
                }
                true
            })
            .map(|m| m.id())
            .collect();

        let order = self.topological_order(&selected)?;
        Ok(order
            .into_iter()
            .filter_map(|id| self.modules.get(id).cloned())
            .collect())
    }

    /// Descriptors applicable to `profile` in execution order, ignoring
    /// configuration toggles.
    pub fn list(&self, profile: Profile) -> Result<Vec<&ModuleDescriptor>, PipelineError> {
        self.validate()?;
        let applicable: BTreeSet<&str> = self
            .modules
            .values()
            .filter(|m| m.descriptor().profiles.contains(profile))
            .map(|m| m.id())
            .collect();
        let order = self.topological_order(&applicable)?;
        Ok(order
            .into_iter()
            .filter_map(|id| self.modules.get(id).map(|m| m.descriptor()))
            .collect())
    }

    /// Sample configuration for every module applicable to `profile`.
    pub fn render_configuration(&self, profile: Profile) -> Result<String, PipelineError> {
        let mut out = String::new();
        let mut emitted: BTreeSet<&str> = BTreeSet::new();
        for descriptor in self.list(profile)? {
            for line in descriptor.description.lines() {
                out.push_str("# ");
                out.push_str(line);
                out.push('\n');
            }
            out.push_str(&format!("{} = true\n", enabled_key(&descriptor.id)));
            for sub in &descriptor.sub_modules {
                let key = enabled_key(sub);
                if emitted.insert(sub.as_str()) {
                    out.push_str(&format!("{} = false\n", key));
                }
            }
            for option in &descriptor.options {
                if !emitted.insert(option.key.as_str()) {
                    continue;
                }
                out.push_str(&option.to_sample());
                out.push('\n');
            }
            out.push('\n');
        }
        Ok(out)
    }

    pub fn export_configuration(&self, profile: Profile, path: &Path) -> Result<(), PipelineError> {
        let content = self.render_configuration(profile)?;
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(|source| PipelineError::ResourceWrite {
                    path: parent.to_path_buf(),
                    source,
                })?;
            }
        }
        std::fs::write(path, content).map_err(|source| PipelineError::ResourceWrite {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Whole-graph checks: unknown dependencies and cycles.
    fn validate(&self) -> Result<(), PipelineError> {
        for module in self.modules.values() {
            for dependency in &module.descriptor().dependencies {
                if !self.modules.contains_key(dependency) {
                    return Err(PipelineError::UnknownDependency {
                        module: module.id().to_string(),
                        dependency: dependency.clone(),
                    });
                }
            }
        }
        let all: BTreeSet<&str> = self.modules.keys().map(String::as_str).collect();
        self.topological_order(&all).map(|_| ())
    }

    /// Kahn's algorithm restricted to `nodes`. Dependencies outside the set
    /// impose no ordering.
    fn topological_order<'a>(&'a self, nodes: &BTreeSet<&'a str>) -> Result<Vec<&'a str>, PipelineError> {
        let mut in_degree: BTreeMap<&str, usize> = nodes.iter().map(|n| (*n, 0)).collect();
        let mut dependents: BTreeMap<&str, Vec<&str>> = BTreeMap::new();

        for &node in nodes {
            for dependency in self.dependencies_of(node) {
                if nodes.contains(&dependency) {
                    *in_degree.entry(node).or_insert(0) += 1;
                    dependents.entry(dependency).or_default().push(node);
                } else {
                    debug!(
                        module = node,
                        dependency, "Dependency not scheduled; no ordering constraint"
                    );
                }
            }
        }

        let mut ready: BTreeSet<&str> = in_degree
            .iter()
            .filter(|(_, degree)| **degree == 0)
            .map(|(node, _)| *node)
            .collect();
        let mut order = Vec::with_capacity(nodes.len());

        while let Some(node) = ready.pop_first() {
            order.push(node);
            if let Some(children) = dependents.get(node) {
                for &child in children {
                    if let Some(degree) = in_degree.get_mut(child) {
                        *degree -= 1;
                        if *degree == 0 {
                            ready.insert(child);
                        }
                    }
                }
            }
        }

        if order.len() < nodes.len() {
            let remaining: BTreeSet<&str> = nodes
                .iter()
                .copied()
                .filter(|n| !order.contains(n))
                .collect();
            return Err(PipelineError::CyclicDependency(self.find_cycle(&remaining)));
        }
        Ok(order)
    }

    fn dependencies_of<'a>(&'a self, id: &str) -> impl Iterator<Item = &'a str> {
        self.modules
            .get(id)
            .map(|m| m.descriptor().dependencies.as_slice())
            .unwrap_or(&[])
            .iter()
            .map(String::as_str)
    }

    fn find_cycle(&self, nodes: &BTreeSet<&str>) -> Vec<String> {
        #[derive(Clone, Copy, PartialEq)]
        enum Mark {
            Visiting,
            Done,
        }

        fn visit<'a>(
            registry: &'a ModuleRegistry,
            node: &'a str,
            nodes: &BTreeSet<&str>,
            marks: &mut HashMap<&'a str, Mark>,
            stack: &mut Vec<&'a str>,
        ) -> Option<Vec<String>> {
            marks.insert(node, Mark::Visiting);
            stack.push(node);
            let mut deps: Vec<&str> = registry
                .dependencies_of(node)
                .filter(|d| nodes.contains(d))
                .collect();
            deps.sort_unstable();
            for dep in deps {
                match marks.get(dep) {
                    Some(Mark::Visiting) => {
                        let start = stack.iter().position(|n| *n == dep).unwrap_or(0);
                        return Some(stack[start..].iter().map(|s| s.to_string()).collect());
                    }
                    Some(Mark::Done) => {}
                    None => {
                        if let Some(cycle) = visit(registry, dep, nodes, marks, stack) {
                            return Some(cycle);
                        }
                    }
                }
            }
            stack.pop();
            marks.insert(node, Mark::Done);
            None
        }

        let mut marks = HashMap::new();
        let mut stack = Vec::new();
        for &start in nodes {
            if marks.contains_key(start) {
                continue;
            }
            if let Some(cycle) = visit(self, start, nodes, &mut marks, &mut stack) {
                return cycle;
            }
        }
        nodes.iter().map(|s| s.to_string()).collect()
    }
}
