//! Property-based tests for determinism guarantees

use prebake::config::AotConfig;
use prebake::context::GenerationContext;
use prebake::discovery::{
    LazyServiceTable, ServiceCandidate, ServiceTable, ServiceTableSpec, StaticServiceTable,
};
use prebake::error::PipelineError;
use prebake::model::ImplementationKind;
use prebake::module::{Module, ModuleDescriptor};
use prebake::registry::ModuleRegistry;
use prebake::types::Profile;
use proptest::prelude::*;
use std::sync::Arc;

struct NoopModule {
    descriptor: ModuleDescriptor,
}

impl Module for NoopModule {
    fn descriptor(&self) -> &ModuleDescriptor {
        &self.descriptor
    }

    fn generate(&self, _ctx: &mut GenerationContext) -> Result<(), PipelineError> {
        Ok(())
    }
}

/// Acyclic graph: module `i` may only depend on modules with a lower index.
fn dag() -> impl Strategy<Value = Vec<Vec<usize>>> {
    (1usize..12).prop_flat_map(|n| {
        (0..n)
            .map(|i| proptest::collection::vec(0..i.max(1), 0..=i.min(3)))
            .collect::<Vec<_>>()
            .prop_map(|deps| {
                deps.into_iter()
                    .enumerate()
                    .map(|(i, d)| d.into_iter().filter(|&j| j < i).collect())
                    .collect()
            })
    })
}

fn module_id(i: usize) -> String {
    format!("m{:02}", i)
}

fn registry_for(graph: &[Vec<usize>], registration_order: &[usize]) -> ModuleRegistry {
    let mut registry = ModuleRegistry::new();
    for &i in registration_order {
        let mut descriptor = ModuleDescriptor::new(module_id(i)).enabled_by_default(true);
        for &dep in &graph[i] {
            descriptor = descriptor.depends_on(module_id(dep));
        }
        registry
            .register(Arc::new(NoopModule { descriptor }))
            .unwrap();
    }
    registry
}

fn schedule_ids(registry: &ModuleRegistry) -> Vec<String> {
    registry
        .schedule(Profile::Dynamic, &AotConfig::default())
        .unwrap()
        .iter()
        .map(|m| m.id().to_string())
        .collect()
}

fn implementation(flag: bool) -> ImplementationKind {
    if flag {
        ImplementationKind::FactoryMethod
    } else {
        ImplementationKind::NoArgConstructor
    }
}

fn candidates() -> impl Strategy<Value = Vec<ServiceCandidate>> {
    proptest::collection::vec(("[a-c]\\.[A-Z][a-z]{0,3}", any::<bool>()), 0..20).prop_map(
        |entries| {
            entries
                .into_iter()
                .map(|(name, flag)| ServiceCandidate {
                    name,
                    implementation: implementation(flag),
                    available: true,
                    forced: false,
                })
                .collect()
        },
    )
}

proptest! {
    /// Registration order never changes the schedule, and every dependency
    /// runs before its dependents.
    #[test]
    fn test_schedule_independent_of_registration_order(
        (graph, shuffled) in dag().prop_flat_map(|graph| {
            let order: Vec<usize> = (0..graph.len()).collect();
            (Just(graph), Just(order).prop_shuffle())
        })
    ) {
        let in_order: Vec<usize> = (0..graph.len()).collect();
        let expected = schedule_ids(&registry_for(&graph, &in_order));
        let actual = schedule_ids(&registry_for(&graph, &shuffled));
        prop_assert_eq!(&expected, &actual);

        for (i, deps) in graph.iter().enumerate() {
            let at = actual.iter().position(|id| *id == module_id(i)).unwrap();
            for &dep in deps {
                let dep_at = actual.iter().position(|id| *id == module_id(dep)).unwrap();
                prop_assert!(dep_at < at);
            }
        }
    }

    /// Tables are sorted and deduplicated whatever the discovery order.
    #[test]
    fn test_table_order_independent_of_discovery_order(
        (list, shuffled) in candidates().prop_flat_map(|list| {
            (Just(list.clone()), Just(list).prop_shuffle())
        })
    ) {
        let spec = ServiceTableSpec::new("a.Greeter", &list);
        let names = spec.names();
        let mut expected: Vec<&str> = names.clone();
        expected.sort();
        expected.dedup();
        prop_assert_eq!(&names, &expected);

        let other = ServiceTableSpec::new("a.Greeter", &shuffled);
        prop_assert_eq!(spec.names(), other.names());
    }

    /// Lazy and static tables answer every query identically.
    #[test]
    fn test_table_shapes_agree(list in candidates(), prefix in "[a-c]?") {
        let spec = ServiceTableSpec::new("a.Greeter", &list);
        let lazy = LazyServiceTable::from_spec(&spec);
        let eager = StaticServiceTable::from_spec(&spec);
        let predicate = |name: &str| name.starts_with(prefix.as_str());

        prop_assert_eq!(lazy.find(&predicate), eager.find(&predicate));
        for name in spec.names() {
            prop_assert!(lazy.contains(name));
            prop_assert!(eager.contains(name));
        }
        prop_assert!(!lazy.contains("z.Unknown"));
    }
}
