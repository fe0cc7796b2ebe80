use super::{Graph, NodeId};
use crate::config::GeneratorConfig;
use crate::error::Result;
use crate::geometry::Vec2;
use rand::Rng;
use rand::seq::SliceRandom;

/// Builds a random connected graph.
///
/// The node count is drawn from `[min_nodes, max_nodes]` and the edge target
/// from the edge range clamped to what a simple graph on that many nodes can
/// hold. A random spanning tree goes in first, so the result is connected
/// whenever it has at least one node; remaining edges are spread over the
/// nodes until the target is met.
pub fn generate<R: Rng>(config: &GeneratorConfig, rng: &mut R) -> Result<Graph> {
    config.validate()?;
    let mut graph = Graph::new();

    let n = rng.random_range(config.min_nodes..=config.max_nodes);
    let limit = n * n.saturating_sub(1) / 2;
    let target = rng.random_range(config.min_edges.min(limit)..=config.max_edges.min(limit));

    for _ in 0..n {
        let pos = Vec2::new(
            (0.5 - rng.random::<f64>()) * config.width,
            (0.5 - rng.random::<f64>()) * config.height,
        );
        graph.add_node(pos)?;
    }
    if n == 0 {
        return Ok(graph);
    }

    let mut order: Vec<NodeId> = graph.node_ids().collect();
    order.shuffle(rng);
    spanning_tree(&mut graph, &order, rng)?;

    let mut remaining = target.saturating_sub(n - 1);
    let mut i = 0;
    while remaining > 0 && graph.edge_count() < limit {
        let mut budget = rng.random_range(0..=remaining.min(n - 1));
        for j in 0..n {
            if budget == 0 {
                break;
            }
            if j != i && graph.add_edge(order[i], order[j])? {
                budget -= 1;
                remaining -= 1;
            }
        }
        i = (i + 1) % n;
    }

    graph.calc_metrics();
    Ok(graph)
}

/// Connects each node, in reverse `order`, to a random node already in the tree.
fn spanning_tree<R: Rng>(graph: &mut Graph, order: &[NodeId], rng: &mut R) -> Result<()> {
    let mut out_tree = order.to_vec();
    let Some(root) = out_tree.pop() else {
        return Ok(());
    };
    let mut in_tree = vec![root];
    while let Some(source) = out_tree.pop() {
        let target = in_tree[rng.random_range(0..in_tree.len())];
        graph.add_edge(source, target)?;
        in_tree.push(source);
    }
    Ok(())
}
