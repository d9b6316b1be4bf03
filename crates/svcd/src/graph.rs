//! # Dependency Graph Solver
//!
//! Turns the registered services into a total initialization order and a per-event-type
//! subscriber list, using Kahn's algorithm.
//!
//! ## Tie-break
//! When several services are ready at once, the one registered first goes first. The order
//! is therefore a pure function of the registration sequence, which matters because it is
//! also the delivery order between independent subscribers of the same event type.
//!
//! ## Errors
//! Validation happens before sorting, so a dependency on an id nobody registered is reported
//! as [`ConfigError::MissingDependency`] instead of looking like a cycle.

use crate::error::ConfigError;
use crate::service::{EventType, ServiceId};
use std::cmp::Reverse;
use std::collections::{BTreeMap, BinaryHeap, HashMap, HashSet};

/// What the solver needs to know about one service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceNode {
    pub id: ServiceId,
    pub dependencies: Vec<ServiceId>,
    pub subscriptions: Vec<EventType>,
}

/// Output of [`solve`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Solution {
    /// Every service exactly once, dependencies first.
    pub order: Vec<ServiceId>,
    /// Subscribers per event type, each list in `order` order.
    pub subscribers: BTreeMap<EventType, Vec<ServiceId>>,
}

/// Solves the dependency graph of `nodes`, given in registration order.
pub fn solve(nodes: &[ServiceNode]) -> Result<Solution, ConfigError> {
    let mut index: HashMap<ServiceId, usize> = HashMap::with_capacity(nodes.len());
    for (i, node) in nodes.iter().enumerate() {
        if index.insert(node.id, i).is_some() {
            return Err(ConfigError::DuplicateService(node.id));
        }
    }

    // in_degree[i]: distinct unresolved dependencies of node i
    // dependents[i]: nodes that depend on node i, in registration order
    let mut in_degree = vec![0usize; nodes.len()];
    let mut dependents: Vec<Vec<usize>> = vec![Vec::new(); nodes.len()];
    for (i, node) in nodes.iter().enumerate() {
        let mut seen = HashSet::new();
        for dep in &node.dependencies {
            let &d = index.get(dep).ok_or(ConfigError::MissingDependency {
                service: node.id,
                missing: *dep,
            })?;
            if seen.insert(d) {
                in_degree[i] += 1;
                dependents[d].push(i);
            }
        }
    }

    let mut ready: BinaryHeap<Reverse<usize>> = in_degree
        .iter()
        .enumerate()
        .filter(|(_, n)| **n == 0)
        .map(|(i, _)| Reverse(i))
        .collect();

    let mut sorted = Vec::with_capacity(nodes.len());
    while let Some(Reverse(i)) = ready.pop() {
        sorted.push(i);
        for &d in &dependents[i] {
            in_degree[d] -= 1;
            if in_degree[d] == 0 {
                ready.push(Reverse(d));
            }
        }
    }

    if sorted.len() < nodes.len() {
        return Err(ConfigError::Cycle(find_cycle(nodes, &index, &in_degree)));
    }

    let mut subscribers: BTreeMap<EventType, Vec<ServiceId>> = BTreeMap::new();
    for &i in &sorted {
        let node = &nodes[i];
        let mut seen = HashSet::new();
        for ty in &node.subscriptions {
            if seen.insert(ty) {
                subscribers.entry(ty.clone()).or_default().push(node.id);
            }
        }
    }

    Ok(Solution {
        order: sorted.into_iter().map(|i| nodes[i].id).collect(),
        subscribers,
    })
}

/// Extracts one concrete cycle from the nodes Kahn's algorithm could not remove.
///
/// Every such node still has a dependency that is itself unremoved, so walking those edges
/// from any of them must revisit a node.
fn find_cycle(
    nodes: &[ServiceNode],
    index: &HashMap<ServiceId, usize>,
    in_degree: &[usize],
) -> Vec<ServiceId> {
    let blocked = |i: usize| in_degree[i] > 0;
    let Some(start) = (0..nodes.len()).find(|&i| blocked(i)) else {
        return Vec::new();
    };

    let mut path = vec![start];
    let mut position: HashMap<usize, usize> = HashMap::from([(start, 0)]);
    let mut current = start;
    loop {
        let next = nodes[current]
            .dependencies
            .iter()
            .filter_map(|dep| index.get(dep).copied())
            .find(|&d| blocked(d));
        let Some(next) = next else {
            return path.iter().map(|&i| nodes[i].id).collect();
        };
        if let Some(&at) = position.get(&next) {
            let mut cycle: Vec<ServiceId> = path[at..].iter().map(|&i| nodes[i].id).collect();
            cycle.push(nodes[next].id);
            return cycle;
        }
        position.insert(next, path.len());
        path.push(next);
        current = next;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn node(id: i64, deps: &[i64]) -> ServiceNode {
        ServiceNode {
            id: ServiceId(id),
            dependencies: deps.iter().copied().map(ServiceId).collect(),
            subscriptions: Vec::new(),
        }
    }

    fn subscribed(mut n: ServiceNode, types: &[&'static str]) -> ServiceNode {
        n.subscriptions = types.iter().map(|&t| EventType::from(t)).collect();
        n
    }

    fn ids(raw: &[i64]) -> Vec<ServiceId> {
        raw.iter().copied().map(ServiceId).collect()
    }

    fn assert_topological(nodes: &[ServiceNode], order: &[ServiceId]) {
        assert_eq!(order.len(), nodes.len());
        let pos: HashMap<ServiceId, usize> =
            order.iter().enumerate().map(|(i, id)| (*id, i)).collect();
        assert_eq!(pos.len(), nodes.len(), "every service exactly once");
        for n in nodes {
            for d in &n.dependencies {
                assert!(pos[d] < pos[&n.id], "{d} must precede {}", n.id);
            }
        }
    }

    #[test]
    fn scenario_a_orders_dependencies_first() {
        // Registered out of order on purpose.
        let nodes = vec![
            node(2, &[0, 1]),
            node(3, &[2]),
            node(0, &[]),
            node(1, &[0]),
        ];
        let solution = solve(&nodes).unwrap();
        assert_eq!(solution.order, ids(&[0, 1, 2, 3]));

        let reversed: Vec<_> = solution.order.iter().rev().copied().collect();
        assert_eq!(reversed, ids(&[3, 2, 1, 0]));
    }

    #[test]
    fn subscribers_follow_solved_order() {
        let nodes = vec![
            subscribed(node(3, &[2]), &["X"]),
            subscribed(node(2, &[]), &["X", "Y", "X"]),
            subscribed(node(1, &[]), &["Y"]),
        ];
        let solution = solve(&nodes).unwrap();
        // 3 was registered before 1, so it wins the tie once 2 releases it.
        assert_eq!(solution.order, ids(&[2, 3, 1]));
        assert_eq!(solution.subscribers[&EventType::from("X")], ids(&[2, 3]));
        assert_eq!(solution.subscribers[&EventType::from("Y")], ids(&[2, 1]));
        assert_eq!(solution.subscribers.len(), 2);
    }

    #[test]
    fn independent_services_keep_registration_order() {
        let nodes = vec![node(9, &[]), node(4, &[]), node(7, &[]), node(1, &[4])];
        let solution = solve(&nodes).unwrap();
        assert_eq!(solution.order, ids(&[9, 4, 7, 1]));
    }

    #[test]
    fn diamond_is_topological() {
        let nodes = vec![
            node(4, &[2, 3]),
            node(3, &[1]),
            node(2, &[1]),
            node(1, &[]),
            node(5, &[4, 1]),
        ];
        let solution = solve(&nodes).unwrap();
        assert_topological(&nodes, &solution.order);
        assert_eq!(solution.order, ids(&[1, 3, 2, 4, 5]));
    }

    #[test]
    fn repeated_dependency_counts_once() {
        let nodes = vec![node(1, &[0, 0]), node(0, &[])];
        assert_eq!(solve(&nodes).unwrap().order, ids(&[0, 1]));
    }

    #[test]
    fn empty_input_is_empty_solution() {
        assert_eq!(solve(&[]).unwrap(), Solution::default());
    }

    #[test]
    fn scenario_c_two_node_cycle() {
        let nodes = vec![node(1, &[2]), node(2, &[1])];
        assert_eq!(
            solve(&nodes),
            Err(ConfigError::Cycle(ids(&[1, 2, 1])))
        );
    }

    #[test]
    fn cycle_behind_valid_prefix_is_isolated() {
        let nodes = vec![
            node(0, &[]),
            node(1, &[0, 3]),
            node(2, &[1]),
            node(3, &[2]),
            node(4, &[0]),
        ];
        assert_eq!(solve(&nodes), Err(ConfigError::Cycle(ids(&[1, 3, 2, 1]))));
    }

    #[test]
    fn self_dependency_is_a_cycle() {
        let nodes = vec![node(5, &[5])];
        assert_eq!(solve(&nodes), Err(ConfigError::Cycle(ids(&[5, 5]))));
    }

    #[test]
    fn scenario_d_unknown_dependency_is_not_a_cycle() {
        let nodes = vec![node(0, &[]), node(1, &[0, 9])];
        assert_eq!(
            solve(&nodes),
            Err(ConfigError::MissingDependency {
                service: ServiceId(1),
                missing: ServiceId(9),
            })
        );
    }

    #[test]
    fn duplicate_ids_are_rejected() {
        let nodes = vec![node(0, &[]), node(0, &[])];
        assert_eq!(
            solve(&nodes),
            Err(ConfigError::DuplicateService(ServiceId(0)))
        );
    }

    #[test]
    fn chains_of_every_length_are_topological() {
        for len in 1..40i64 {
            // Each node depends on the next one, registered in reverse of the solved order.
            let nodes: Vec<_> = (0..len)
                .map(|i| {
                    if i + 1 < len {
                        node(i, &[i + 1])
                    } else {
                        node(i, &[])
                    }
                })
                .collect();
            let order = solve(&nodes).unwrap().order;
            assert_topological(&nodes, &order);
            assert_eq!(order.first(), Some(&ServiceId(len - 1)));
        }
    }
}
