use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::stable_graph::StableDiGraph;
use petgraph::Direction;
use rustc_hash::{FxHashMap, FxHashSet};

/// Assign a weight to each node in `keys`, such that installing in order of decreasing weight
/// installs dependencies before their dependents (where the graph is acyclic).
///
/// Leaves are stripped layer by layer first, each layer weighted by the number of nodes left in
/// the graph. What remains (the root, and any cycles) is weighted by the length of the longest
/// cycle-free path from the root.
pub(crate) fn topological_weights<N>(
    graph: &DiGraph<N, ()>,
    root: NodeIndex,
    keys: &FxHashSet<NodeIndex>,
) -> FxHashMap<NodeIndex, usize> {
    let mut weights = FxHashMap::default();

    // Indices in a `StableGraph` survive node removal, and match those of the source graph.
    let mut remaining = StableDiGraph::<(), ()>::with_capacity(graph.node_count(), graph.edge_count());
    for _ in graph.node_indices() {
        remaining.add_node(());
    }
    for edge in graph.raw_edges() {
        remaining.add_edge(edge.source(), edge.target(), ());
    }

    loop {
        let leaves = remaining
            .node_indices()
            .filter(|&node| node != root)
            .filter(|&node| {
                remaining
                    .neighbors_directed(node, Direction::Outgoing)
                    .next()
                    .is_none()
            })
            .collect::<Vec<_>>();
        if leaves.is_empty() {
            break;
        }
        let weight = remaining.node_count() - 1;
        for leaf in leaves {
            if keys.contains(&leaf) {
                weights.insert(leaf, weight);
            }
            remaining.remove_node(leaf);
        }
    }

    // Depth-first from the root, never revisiting a node already on the current path.
    let mut path = FxHashSet::default();
    let mut stack = Vec::new();
    path.insert(root);
    stack.push((root, children(&remaining, root), 0));
    while let Some((node, children_of_node, next)) = stack.last_mut() {
        if let Some(&child) = children_of_node.get(*next) {
            *next += 1;
            if path.insert(child) {
                stack.push((child, children(&remaining, child), 0));
            }
            continue;
        }

        let node = *node;
        stack.pop();
        path.remove(&node);
        if keys.contains(&node) {
            let weight = weights.entry(node).or_insert(0);
            *weight = (*weight).max(path.len());
        }
    }

    weights
}

fn children(graph: &StableDiGraph<(), ()>, node: NodeIndex) -> Vec<NodeIndex> {
    graph.neighbors_directed(node, Direction::Outgoing).collect()
}
