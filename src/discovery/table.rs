//! Service tables: the rendered output of discovery.
//!
//! A [`ServiceTableSpec`] is the sorted, classified candidate set for one
//! capability. Two renderers turn it into a factory unit, one per profile:
//!
//! - [`DynamicRenderer`] records candidate names only; the generated code
//!   resolves them lazily at startup, in parallel.
//! - [`AheadOfTimeRenderer`] binds every name to its factory method or
//!   constructor reference at build time.
//!
//! Both generated shapes answer `findAll(predicate)` identically.
//! [`LazyServiceTable`] and [`StaticServiceTable`] model that runtime
//! behavior so it can be exercised directly.

use crate::artifact::{runtime, Expr, FieldSpec, MethodSpec, SourceUnit, Statement};
use crate::codegen::{split_by_size, SubLoaders};
use crate::model::ImplementationKind;
use crate::types::simple_name_of;
use rayon::prelude::*;
use serde::Serialize;
use std::collections::BTreeSet;
use std::sync::{Arc, OnceLock};

/// Per-entry cost beyond the candidate name, in characters.
const ENTRY_OVERHEAD: usize = 32;

const ENTRIES_FIELD: &str = "ENTRIES";

/// A candidate that survived discovery.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub struct ServiceCandidate {
    pub name: String,
    pub implementation: ImplementationKind,
    /// Result of the availability check. False for force-included candidates.
    pub available: bool,
    pub forced: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TableEntry {
    pub name: String,
    pub implementation: ImplementationKind,
}

/// Sorted, deduplicated table for one capability.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ServiceTableSpec {
    pub capability: String,
    pub entries: Vec<TableEntry>,
}

impl ServiceTableSpec {
    pub fn new(capability: impl Into<String>, candidates: &[ServiceCandidate]) -> Self {
        let mut entries: Vec<TableEntry> = candidates
            .iter()
            .map(|c| TableEntry {
                name: c.name.clone(),
                implementation: c.implementation,
            })
            .collect();
        entries.sort_by(|a, b| a.name.cmp(&b.name));
        entries.dedup_by(|a, b| a.name == b.name);
        Self {
            capability: capability.into(),
            entries,
        }
    }

    /// Name of the generated factory unit: `<SimpleName>Factory`.
    pub fn factory_name(&self) -> String {
        format!("{}Factory", simple_name_of(&self.capability))
    }

    pub fn names(&self) -> Vec<&str> {
        self.entries.iter().map(|e| e.name.as_str()).collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries split into sub-loader segments under `max_unit_size`.
    pub fn segments(&self, max_unit_size: usize) -> Vec<Vec<&TableEntry>> {
        split_by_size(self.entries.iter(), max_unit_size, |entry| {
            entry.name.len() + ENTRY_OVERHEAD
        })
    }
}

/// Renders a table spec into a factory unit.
pub trait TableRenderer: Send + Sync {
    fn render(&self, namespace: &str, spec: &ServiceTableSpec, max_unit_size: usize) -> SourceUnit;
}

fn factory_skeleton(namespace: &str, spec: &ServiceTableSpec) -> SourceUnit {
    SourceUnit::new(namespace, spec.factory_name())
        .implementing(format!("{}<{}>", runtime::SERVICE_TABLE, spec.capability))
        .with_field(FieldSpec {
            name: ENTRIES_FIELD.to_string(),
            type_name: "Map".to_string(),
            is_static: true,
            initializer: Some(Expr::new_instance("LinkedHashMap", vec![])),
        })
}

fn entries_ident() -> Expr {
    Expr::ident(ENTRIES_FIELD)
}

fn find_all(strategy: &str) -> MethodSpec {
    MethodSpec::new("findAll")
        .param("predicate", "Predicate<String>")
        .returns("Stream")
        .statement(Statement::Return(Expr::call_static(
            runtime::SERVICE_TABLE,
            strategy,
            vec![entries_ident(), Expr::ident("predicate")],
        )))
}

/// Dynamic-load profile: names only, resolved lazily and in parallel.
#[derive(Debug, Clone, Copy, Default)]
pub struct DynamicRenderer;

impl TableRenderer for DynamicRenderer {
    fn render(&self, namespace: &str, spec: &ServiceTableSpec, max_unit_size: usize) -> SourceUnit {
        let segments: Vec<Vec<Statement>> = spec
            .segments(max_unit_size)
            .into_iter()
            .map(|segment| {
                segment
                    .into_iter()
                    .map(|entry| {
                        Statement::Expr(Expr::call_on(
                            entries_ident(),
                            "put",
                            vec![Expr::str(entry.name.clone()), Expr::Null],
                        ))
                    })
                    .collect()
            })
            .collect();
        let loaders = SubLoaders::build("load", &[], segments);

        let mut static_init = loaders.calls.clone();
        static_init.push(Statement::Expr(Expr::call_static(
            runtime::SERVICE_TABLE,
            "preloadParallel",
            vec![entries_ident()],
        )));

        factory_skeleton(namespace, spec)
            .with_static_init(static_init)
            .with_methods(loaders.methods)
            .with_method(find_all("findLazy"))
    }
}

/// Ahead-of-time profile: each entry statically bound to its provider.
#[derive(Debug, Clone, Copy, Default)]
pub struct AheadOfTimeRenderer;

impl AheadOfTimeRenderer {
    fn binding(entry: &TableEntry) -> Expr {
        match entry.implementation {
            ImplementationKind::FactoryMethod => Expr::method_ref(entry.name.clone(), "provider"),
            ImplementationKind::NoArgConstructor => Expr::method_ref(entry.name.clone(), "new"),
        }
    }
}

impl TableRenderer for AheadOfTimeRenderer {
    fn render(&self, namespace: &str, spec: &ServiceTableSpec, max_unit_size: usize) -> SourceUnit {
        let segments: Vec<Vec<Statement>> = spec
            .segments(max_unit_size)
            .into_iter()
            .map(|segment| {
                segment
                    .into_iter()
                    .map(|entry| {
                        Statement::Expr(Expr::call_on(
                            entries_ident(),
                            "put",
                            vec![Expr::str(entry.name.clone()), Self::binding(entry)],
                        ))
                    })
                    .collect()
            })
            .collect();
        let loaders = SubLoaders::build("load", &[], segments);

        factory_skeleton(namespace, spec)
            .with_static_init(loaders.calls.clone())
            .with_methods(loaders.methods)
            .with_method(find_all("findStatic"))
    }
}

/// One `find` result: the candidate name and how it is instantiated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedEntry {
    pub name: String,
    pub implementation: ImplementationKind,
}

/// Runtime query surface shared by both table shapes.
pub trait ServiceTable: Send + Sync {
    /// Matching entries in table order. Names outside the table are never
    /// resolved.
    fn find(&self, predicate: &(dyn Fn(&str) -> bool + Sync)) -> Vec<ResolvedEntry>;

    fn contains(&self, name: &str) -> bool;
}

/// Resolves a name at runtime; `None` means the type could not be loaded.
pub type Resolver = Arc<dyn Fn(&str) -> Option<ImplementationKind> + Send + Sync>;

/// Lazily resolved table. Each name resolves at most once, on first use.
pub struct LazyServiceTable {
    names: Vec<String>,
    known: BTreeSet<String>,
    resolved: Vec<OnceLock<Option<ImplementationKind>>>,
    resolver: Resolver,
}

impl LazyServiceTable {
    pub fn new(names: Vec<String>, resolver: Resolver) -> Self {
        let known = names.iter().cloned().collect();
        let resolved = names.iter().map(|_| OnceLock::new()).collect();
        Self {
            names,
            known,
            resolved,
            resolver,
        }
    }

    /// Table whose resolver answers from the spec itself.
    pub fn from_spec(spec: &ServiceTableSpec) -> Self {
        let entries: Vec<TableEntry> = spec.entries.clone();
        let resolver: Resolver = Arc::new(move |name| {
            entries
                .iter()
                .find(|e| e.name == name)
                .map(|e| e.implementation)
        });
        Self::new(spec.names().into_iter().map(str::to_string).collect(), resolver)
    }

    fn resolve(&self, index: usize) -> Option<ImplementationKind> {
        *self.resolved[index].get_or_init(|| (self.resolver)(&self.names[index]))
    }

    /// Resolve every entry in parallel, as the generated startup code does.
    pub fn preload(&self) {
        (0..self.names.len()).into_par_iter().for_each(|i| {
            self.resolve(i);
        });
    }

    pub fn resolved_count(&self) -> usize {
        self.resolved.iter().filter(|cell| cell.get().is_some()).count()
    }
}

impl ServiceTable for LazyServiceTable {
    fn find(&self, predicate: &(dyn Fn(&str) -> bool + Sync)) -> Vec<ResolvedEntry> {
        let matching: Vec<usize> = (0..self.names.len())
            .filter(|&i| predicate(&self.names[i]))
            .collect();
        // indexed collect keeps table order whatever the completion order
        let resolved: Vec<Option<ResolvedEntry>> = matching
            .par_iter()
            .map(|&i| {
                self.resolve(i).map(|implementation| ResolvedEntry {
                    name: self.names[i].clone(),
                    implementation,
                })
            })
            .collect();
        resolved.into_iter().flatten().collect()
    }

    fn contains(&self, name: &str) -> bool {
        self.known.contains(name)
    }
}

/// Eagerly bound table.
pub struct StaticServiceTable {
    entries: Vec<ResolvedEntry>,
}

impl StaticServiceTable {
    pub fn from_spec(spec: &ServiceTableSpec) -> Self {
        Self {
            entries: spec
                .entries
                .iter()
                .map(|e| ResolvedEntry {
                    name: e.name.clone(),
                    implementation: e.implementation,
                })
                .collect(),
        }
    }
}

impl ServiceTable for StaticServiceTable {
    fn find(&self, predicate: &(dyn Fn(&str) -> bool + Sync)) -> Vec<ResolvedEntry> {
        self.entries
            .iter()
            .filter(|e| predicate(&e.name))
            .cloned()
            .collect()
    }

    fn contains(&self, name: &str) -> bool {
        self.entries.iter().any(|e| e.name == name)
    }
}
