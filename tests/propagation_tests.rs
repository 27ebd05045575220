use proptest::prelude::*;
use zzprop::*;

/// Deterministic modifiers whose result does not depend on order within a
/// kind (override ties and random samples are left out).
fn deterministic_modifier() -> impl Strategy<Value = Modifier> {
    prop_oneof![
        (-100.0..100.0f64).prop_map(Modifier::additive),
        (-0.9..2.0f64).prop_map(Modifier::percent_additive),
        (0.1..4.0f64).prop_map(Modifier::multiplicative),
        (-50.0..0.0f64, 0.0..500.0f64).prop_map(|(min, max)| Modifier::clamp(min, max)),
    ]
}

fn approx_eq(a: f64, b: f64) -> bool {
    (a - b).abs() <= 1e-6 * a.abs().max(b.abs()).max(1.0)
}

proptest! {
    #[test]
    fn prop_insertion_order_does_not_change_value(
        base in -1000.0..1000.0f64,
        modifiers in proptest::collection::vec(deterministic_modifier(), 0..12),
    ) {
        let mut graph = PropertyGraph::new();
        let forward = graph.create_property("forward", base);
        let backward = graph.create_property("backward", base);

        graph.add_modifiers(forward, modifiers.iter().copied()).unwrap();
        graph.add_modifiers(backward, modifiers.iter().rev().copied()).unwrap();

        let a = graph.value(forward).unwrap();
        let b = graph.value(backward).unwrap();
        prop_assert!(approx_eq(a, b), "{} != {}", a, b);
    }

    #[test]
    fn prop_clearing_modifiers_returns_base(
        base in -1000.0..1000.0f64,
        modifiers in proptest::collection::vec(deterministic_modifier(), 1..8),
    ) {
        let mut graph = PropertyGraph::new();
        let hp = graph.create_property("hp", base);
        graph.add_modifiers(hp, modifiers).unwrap();
        graph.value(hp).unwrap();

        graph.clear_modifiers(hp).unwrap();
        prop_assert_eq!(graph.value(hp).unwrap(), graph.base_value(hp).unwrap());
    }

    #[test]
    fn prop_graph_stays_acyclic(
        edges in proptest::collection::vec((0..8usize, 0..8usize), 0..40),
    ) {
        let mut graph = PropertyGraph::new();
        let keys: Vec<PropertyKey> = (0..8)
            .map(|i| graph.create_property(format!("p{i}"), i as f64))
            .collect();

        for (node, dependency) in edges {
            let (node, dependency) = (keys[node], keys[dependency]);
            let before_node = graph.dependencies(node).unwrap();
            let before_dependency = graph.dependents(dependency).unwrap();

            let upstream_cycle = graph
                .dependency_graph()
                .would_create_cycle(dependency, node)
                .unwrap();
            match graph.add_dependency(node, dependency) {
                Ok(()) => prop_assert!(upstream_cycle.is_none()),
                Err(PropertyError::Cycle { path }) => {
                    prop_assert!(upstream_cycle.is_some());
                    prop_assert_eq!(path.first(), path.last());
                    prop_assert_eq!(graph.dependencies(node).unwrap(), before_node);
                    prop_assert_eq!(graph.dependents(dependency).unwrap(), before_dependency);
                }
                Err(other) => prop_assert!(false, "unexpected error {}", other),
            }
        }

        // every edge is visible from both ends and none closes a loop
        for &key in &keys {
            for dependency in graph.dependencies(key).unwrap() {
                prop_assert!(graph.dependents(dependency).unwrap().contains(&key));
                prop_assert!(graph
                    .dependency_graph()
                    .would_create_cycle(key, dependency)
                    .unwrap()
                    .is_some());
            }
        }
    }

    #[test]
    fn prop_chain_cascade_matches_direct_computation(
        start in 1.0..100.0f64,
        factors in proptest::collection::vec(0.5..2.0f64, 1..6),
    ) {
        let mut graph = PropertyGraph::new();
        let root = graph.create_property("root", 0.0);
        let mut previous = root;
        let mut chain = Vec::new();
        for (i, factor) in factors.iter().copied().enumerate() {
            let next = graph.create_property(format!("link{i}"), 0.0);
            graph
                .add_dependency_with(next, previous, move |_, v| v * factor)
                .unwrap();
            chain.push(next);
            previous = next;
        }

        graph.set_base_value(root, start).unwrap();

        let mut expected = start;
        for (key, factor) in chain.iter().zip(&factors) {
            expected *= factor;
            let actual = graph.property(*key).unwrap().cached_value();
            prop_assert!((actual - expected).abs() < 1e-3, "{} != {}", actual, expected);
        }
    }
}
