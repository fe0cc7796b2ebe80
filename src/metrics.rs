//! Aesthetic metric evaluators.
//!
//! Every evaluator is a pure function of the graph model. The `*_total`
//! forms compute a metric over the whole drawing; the per-node and per-edge
//! forms return the terms a single element takes part in, which is what the
//! incremental cache in [`crate::graph`] needs to apply `new - old` deltas.

use crate::geometry::{Vec2, angle_from_base, point_segment_distance, segment_intersection};
use crate::graph::{EdgeKey, Graph, NodeId};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{Index, IndexMut};

/// Distances are clamped to this floor before squaring so coincident
/// elements cannot blow the occlusion sums up.
pub const MIN_DISTANCE: f64 = 10.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum MetricKey {
    NodeOcclusion,
    NodeEdgeOcclusion,
    EdgeLength,
    EdgeCrossing,
    AngularResolution,
}

impl MetricKey {
    pub const ALL: [MetricKey; 5] = [
        MetricKey::NodeOcclusion,
        MetricKey::NodeEdgeOcclusion,
        MetricKey::EdgeLength,
        MetricKey::EdgeCrossing,
        MetricKey::AngularResolution,
    ];

    pub fn name(self) -> &'static str {
        match self {
            MetricKey::NodeOcclusion => "nodeOcclusion",
            MetricKey::NodeEdgeOcclusion => "nodeEdgeOcclusion",
            MetricKey::EdgeLength => "edgeLength",
            MetricKey::EdgeCrossing => "edgeCrossing",
            MetricKey::AngularResolution => "angularResolution",
        }
    }
}

impl fmt::Display for MetricKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// One value per metric key.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct PerMetric<T> {
    pub node_occlusion: T,
    pub node_edge_occlusion: T,
    pub edge_length: T,
    pub edge_crossing: T,
    pub angular_resolution: T,
}

/// Raw metric sums: the aggregate cache, per-node contributions and
/// normalized scores all share this shape.
pub type Metrics = PerMetric<f64>;

impl<T> PerMetric<T> {
    pub fn from_fn(mut f: impl FnMut(MetricKey) -> T) -> Self {
        Self {
            node_occlusion: f(MetricKey::NodeOcclusion),
            node_edge_occlusion: f(MetricKey::NodeEdgeOcclusion),
            edge_length: f(MetricKey::EdgeLength),
            edge_crossing: f(MetricKey::EdgeCrossing),
            angular_resolution: f(MetricKey::AngularResolution),
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (MetricKey, &T)> {
        MetricKey::ALL.into_iter().map(move |key| (key, &self[key]))
    }
}

impl<T> Index<MetricKey> for PerMetric<T> {
    type Output = T;

    fn index(&self, key: MetricKey) -> &T {
        match key {
            MetricKey::NodeOcclusion => &self.node_occlusion,
            MetricKey::NodeEdgeOcclusion => &self.node_edge_occlusion,
            MetricKey::EdgeLength => &self.edge_length,
            MetricKey::EdgeCrossing => &self.edge_crossing,
            MetricKey::AngularResolution => &self.angular_resolution,
        }
    }
}

impl<T> IndexMut<MetricKey> for PerMetric<T> {
    fn index_mut(&mut self, key: MetricKey) -> &mut T {
        match key {
            MetricKey::NodeOcclusion => &mut self.node_occlusion,
            MetricKey::NodeEdgeOcclusion => &mut self.node_edge_occlusion,
            MetricKey::EdgeLength => &mut self.edge_length,
            MetricKey::EdgeCrossing => &mut self.edge_crossing,
            MetricKey::AngularResolution => &mut self.angular_resolution,
        }
    }
}

impl Metrics {
    /// Relative comparison, with an absolute floor of `tolerance` near zero.
    pub fn approx_eq(&self, other: &Metrics, tolerance: f64) -> bool {
        MetricKey::ALL.into_iter().all(|key| {
            let (a, b) = (self[key], other[key]);
            (a - b).abs() <= tolerance * a.abs().max(b.abs()).max(1.0)
        })
    }
}

fn inverse_square(distance: f64) -> f64 {
    let d = distance.max(MIN_DISTANCE);
    1.0 / (d * d)
}

/// Node-node occlusion terms of `id`: sum of `1/d^2` against every other node.
pub fn node_occlusion(graph: &Graph, id: NodeId) -> f64 {
    let p = graph.pos(id);
    graph
        .node_ids()
        .filter(|&other| other != id)
        .map(|other| inverse_square(p.distance(graph.pos(other))))
        .sum()
}

/// Sum of `1/d^2` over unordered node pairs.
pub fn node_occlusion_total(graph: &Graph) -> f64 {
    let points: Vec<Vec2> = graph.node_ids().map(|id| graph.pos(id)).collect();
    let mut total = 0.0;
    for (i, a) in points.iter().enumerate() {
        for b in &points[i + 1..] {
            total += inverse_square(a.distance(*b));
        }
    }
    total
}

/// Occlusion of `id` against every edge it is not an endpoint of.
pub fn node_edge_occlusion_for_node(graph: &Graph, id: NodeId) -> f64 {
    let p = graph.pos(id);
    graph
        .edges()
        .filter(|edge| !edge.touches(id))
        .map(|edge| inverse_square(point_segment_distance(p, graph.pos(edge.a), graph.pos(edge.b))))
        .sum()
}

/// Occlusion of `edge` against every node that is not one of its endpoints.
pub fn node_edge_occlusion_for_edge(graph: &Graph, edge: EdgeKey) -> f64 {
    let (a, b) = (graph.pos(edge.a), graph.pos(edge.b));
    graph
        .node_ids()
        .filter(|&id| !edge.touches(id))
        .map(|id| inverse_square(point_segment_distance(graph.pos(id), a, b)))
        .sum()
}

pub fn node_edge_occlusion_total(graph: &Graph) -> f64 {
    graph
        .edges()
        .map(|edge| node_edge_occlusion_for_edge(graph, edge))
        .sum()
}

/// Squared deviation of the edge's length from `target`.
pub fn edge_length(graph: &Graph, edge: EdgeKey, target: f64) -> f64 {
    let len = graph.pos(edge.a).distance(graph.pos(edge.b));
    (len - target) * (len - target)
}

pub fn edge_length_total(graph: &Graph, target: f64) -> f64 {
    graph.edges().map(|edge| edge_length(graph, edge, target)).sum()
}

/// Whether two edges properly cross. Edges sharing an endpoint never do.
pub fn edges_cross(graph: &Graph, e: EdgeKey, f: EdgeKey) -> bool {
    if e.shares_endpoint(f) {
        return false;
    }
    // fixed argument order keeps boundary cases symmetric
    let (e, f) = if e <= f { (e, f) } else { (f, e) };
    segment_intersection(graph.pos(e.a), graph.pos(e.b), graph.pos(f.a), graph.pos(f.b)).is_some()
}

/// Every other edge that `edge` crosses.
pub fn edge_crossings(graph: &Graph, edge: EdgeKey) -> Vec<EdgeKey> {
    graph
        .edges()
        .filter(|&other| other != edge && edges_cross(graph, edge, other))
        .collect()
}

/// Consecutive angular gaps, in degrees, between the edges around `id`.
///
/// Neighbors are sorted by their angle from the first neighbor; the sort is
/// stable so exact ties keep insertion order. The last gap wraps around to
/// the base. Nodes with fewer than two neighbors have no gaps.
pub fn angular_gaps(graph: &Graph, id: NodeId) -> Vec<f64> {
    let neighbors = graph.neighbor_slice(id);
    if neighbors.len() < 2 {
        return Vec::new();
    }
    let center = graph.pos(id);
    let base = graph.pos(neighbors[0]) - center;
    let mut angles: Vec<f64> = neighbors
        .iter()
        .map(|&n| angle_from_base(base, graph.pos(n) - center))
        .collect();
    angles.sort_by(|a, b| a.total_cmp(b));

    let mut gaps: Vec<f64> = angles.windows(2).map(|w| w[1] - w[0]).collect();
    gaps.push(360.0 - angles[angles.len() - 1] + angles[0]);
    gaps
}

/// Sum of squared deviations of the gaps around `id` from `360 / degree`.
pub fn angular_resolution(graph: &Graph, id: NodeId) -> f64 {
    let gaps = angular_gaps(graph, id);
    if gaps.is_empty() {
        return 0.0;
    }
    let ideal = 360.0 / gaps.len() as f64;
    gaps.iter().map(|gap| (gap - ideal) * (gap - ideal)).sum()
}

pub fn angular_resolution_total(graph: &Graph) -> f64 {
    graph.node_ids().map(|id| angular_resolution(graph, id)).sum()
}

/// Largest value `angular_resolution` can take for a node of `degree`: all
/// edges stacked on one direction, leaving a single 360 degree gap.
pub fn angular_resolution_bound(degree: usize) -> f64 {
    if degree < 2 {
        return 0.0;
    }
    360.0 * 360.0 * (1.0 - 1.0 / degree as f64)
}
