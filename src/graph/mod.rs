//! Mutable node-link model with an incrementally maintained metric cache.
//!
//! The cache holds one aggregate sum per metric. Structural edits (adding or
//! removing nodes and edges, changing metric parameters) mark the model
//! dirty and the next read recomputes everything. Node moves instead apply
//! the difference of the moved node's footprint: the set of metric terms
//! whose value depends on that node's position, each counted once.

mod crossings;
mod generate;
mod serialize;
mod slots;

pub use generate::generate;
pub use serialize::{SerializedGraph, read_graph, write_graph};
pub use slots::NodeId;

use crate::config::{MetricParams, Weights};
use crate::error::{Error, ObjectiveDiagnostic, Result};
use crate::geometry::{Bounds, Vec2};
use crate::metrics::{self, MetricKey, Metrics};
use crate::normalize::Normalizer;
use crossings::CrossingCache;
use indexmap::IndexSet;
use slots::SlotMap;
use tracing::trace;

/// Relative tolerance between the incremental cache and a full recompute.
pub const CACHE_TOLERANCE: f64 = 1e-6;

/// Undirected edge, endpoints stored in ascending id order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct EdgeKey {
    pub a: NodeId,
    pub b: NodeId,
}

impl EdgeKey {
    pub fn new(x: NodeId, y: NodeId) -> Self {
        if x <= y { Self { a: x, b: y } } else { Self { a: y, b: x } }
    }

    pub fn touches(self, id: NodeId) -> bool {
        self.a == id || self.b == id
    }

    pub fn shares_endpoint(self, other: EdgeKey) -> bool {
        self.touches(other.a) || self.touches(other.b)
    }

    pub fn other(self, id: NodeId) -> NodeId {
        if self.a == id { self.b } else { self.a }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    Computed,
    Dirty,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MoveOutcome {
    /// The node now sits at this position.
    Moved(Vec2),
    /// The destination was outside the bounds; nothing changed.
    OutOfBounds,
}

#[derive(Debug, Clone)]
struct NodeData {
    pos: Vec2,
    neighbors: IndexSet<NodeId>,
}

/// Every metric term that depends on one node's position.
struct Footprint {
    metrics: Metrics,
    crossings: Vec<(EdgeKey, Vec<EdgeKey>)>,
}

#[derive(Debug, Clone)]
pub struct Graph {
    nodes: SlotMap<NodeData>,
    edge_count: usize,
    bounds: Bounds,
    weights: Weights,
    params: MetricParams,
    cache: Metrics,
    crossings: CrossingCache,
    normalizer: Normalizer,
    nodes_with_angles: usize,
    status: Status,
}

impl Default for Graph {
    fn default() -> Self {
        Self::new()
    }
}

impl Graph {
    pub fn new() -> Self {
        Self {
            nodes: SlotMap::default(),
            edge_count: 0,
            bounds: Bounds::default(),
            weights: Weights::default(),
            params: MetricParams::default(),
            cache: Metrics::default(),
            crossings: CrossingCache::default(),
            normalizer: Normalizer::new(),
            nodes_with_angles: 0,
            status: Status::Computed,
        }
    }

    pub fn with_config(weights: Weights, params: MetricParams) -> Result<Self> {
        let mut graph = Self::new();
        graph.set_weights(weights)?;
        graph.set_metric_params(params)?;
        Ok(graph)
    }

    // ---- reads -------------------------------------------------------------

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edge_count
    }

    pub fn status(&self) -> Status {
        self.status
    }

    pub fn bounds(&self) -> Bounds {
        self.bounds
    }

    pub fn weights(&self) -> Weights {
        self.weights
    }

    pub fn metric_params(&self) -> MetricParams {
        self.params
    }

    pub fn normalizer(&self) -> &Normalizer {
        &self.normalizer
    }

    /// Number of nodes with at least two neighbors as of the last recompute.
    pub fn nodes_with_angles(&self) -> usize {
        self.nodes_with_angles
    }

    /// Live node ids in slot order.
    pub fn node_ids(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.nodes.iter().map(|(id, _)| id)
    }

    pub fn contains_node(&self, id: NodeId) -> bool {
        self.nodes.contains(id)
    }

    pub fn node_position(&self, id: NodeId) -> Option<Vec2> {
        self.nodes.get(id).map(|n| n.pos)
    }

    pub fn neighbors(&self, id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        self.nodes
            .get(id)
            .into_iter()
            .flat_map(|n| n.neighbors.iter().copied())
    }

    pub fn degree(&self, id: NodeId) -> usize {
        self.nodes.get(id).map_or(0, |n| n.neighbors.len())
    }

    pub fn has_edge(&self, a: NodeId, b: NodeId) -> bool {
        self.nodes
            .get(a)
            .is_some_and(|n| n.neighbors.contains(&b))
    }

    /// Every edge once, ordered by its lower endpoint.
    pub fn edges(&self) -> impl Iterator<Item = EdgeKey> + '_ {
        self.nodes.iter().flat_map(|(id, node)| {
            node.neighbors
                .iter()
                .filter(move |&&n| id < n)
                .map(move |&n| EdgeKey::new(id, n))
        })
    }

    /// Edge density `2E / (V(V-1))`, zero below two nodes.
    pub fn density(&self) -> f64 {
        let v = self.node_count();
        if v < 2 {
            return 0.0;
        }
        2.0 * self.edge_count as f64 / (v as f64 * (v as f64 - 1.0))
    }

    /// Minimal rectangle around the drawing, independent of the stored bounds.
    pub fn bounding_box(&self) -> Option<Bounds> {
        Bounds::enclosing(self.nodes.iter().map(|(_, n)| n.pos))
    }

    /// The cache as last maintained. May be stale while dirty.
    pub fn cached_metrics(&self) -> Metrics {
        self.cache
    }

    pub(crate) fn pos(&self, id: NodeId) -> Vec2 {
        self.nodes.get(id).map_or(Vec2::ZERO, |n| n.pos)
    }

    pub(crate) fn neighbor_slice(&self, id: NodeId) -> &indexmap::set::Slice<NodeId> {
        match self.nodes.get(id) {
            Some(n) => n.neighbors.as_slice(),
            None => indexmap::set::Slice::new(),
        }
    }

    fn incident_edges(&self, id: NodeId) -> Vec<EdgeKey> {
        self.neighbors(id).map(|n| EdgeKey::new(id, n)).collect()
    }

    fn require(&self, id: NodeId) -> Result<()> {
        if self.nodes.contains(id) {
            Ok(())
        } else {
            Err(Error::invalid(format!("unknown node {id}")))
        }
    }

    // ---- structural mutation -----------------------------------------------

    pub fn add_node(&mut self, pos: Vec2) -> Result<NodeId> {
        if !pos.is_finite() {
            return Err(Error::invalid(format!("node position ({}, {}) is not finite", pos.x, pos.y)));
        }
        let id = self.nodes.insert(NodeData {
            pos,
            neighbors: IndexSet::new(),
        });
        self.bounds.include(pos);
        self.status = Status::Dirty;
        Ok(id)
    }

    /// Removes `id` and its incident edges.
    pub fn remove_node(&mut self, id: NodeId) -> Result<()> {
        self.require(id)?;
        for edge in self.incident_edges(id) {
            self.detach_edge(edge);
        }
        self.nodes.remove(id);
        self.status = Status::Dirty;
        Ok(())
    }

    /// Adds an undirected edge. Returns false if it already existed.
    pub fn add_edge(&mut self, a: NodeId, b: NodeId) -> Result<bool> {
        self.require(a)?;
        self.require(b)?;
        if a == b {
            return Err(Error::invalid(format!("self loop on node {a}")));
        }
        if self.has_edge(a, b) {
            return Ok(false);
        }
        self.link(a, b);
        self.status = Status::Dirty;
        Ok(true)
    }

    /// Removes an undirected edge. Returns false if it was absent.
    pub fn remove_edge(&mut self, a: NodeId, b: NodeId) -> Result<bool> {
        self.require(a)?;
        self.require(b)?;
        if !self.has_edge(a, b) {
            return Ok(false);
        }
        self.detach_edge(EdgeKey::new(a, b));
        self.status = Status::Dirty;
        Ok(true)
    }

    fn link(&mut self, a: NodeId, b: NodeId) {
        let mut added = false;
        if let Some(n) = self.nodes.get_mut(a) {
            added = n.neighbors.insert(b);
        }
        if let Some(n) = self.nodes.get_mut(b) {
            n.neighbors.insert(a);
        }
        if added {
            self.edge_count += 1;
        }
    }

    fn detach_edge(&mut self, edge: EdgeKey) {
        if let Some(n) = self.nodes.get_mut(edge.a) {
            n.neighbors.shift_remove(&edge.b);
        }
        if let Some(n) = self.nodes.get_mut(edge.b) {
            n.neighbors.shift_remove(&edge.a);
        }
        let dropped = self.crossings.remove_edge(edge);
        self.cache.edge_crossing -= dropped as f64;
        self.edge_count -= 1;
    }

    /// Removes every node and edge, forgets normalization history and
    /// restores the default bounds. Weights and metric parameters stay.
    pub fn clear(&mut self) {
        self.nodes.clear();
        self.edge_count = 0;
        self.bounds = Bounds::default();
        self.cache = Metrics::default();
        self.crossings.clear();
        self.normalizer.reset();
        self.nodes_with_angles = 0;
        self.status = Status::Computed;
    }

    pub fn set_weights(&mut self, weights: Weights) -> Result<()> {
        weights.validate()?;
        self.weights = weights;
        self.status = Status::Dirty;
        Ok(())
    }

    pub fn set_metric_params(&mut self, params: MetricParams) -> Result<()> {
        params.validate()?;
        self.params = params;
        self.status = Status::Dirty;
        Ok(())
    }

    /// Replaces the bounds, grown as needed to cover every node.
    pub fn set_bounds(&mut self, bounds: Bounds) -> Result<()> {
        let finite = [bounds.x_min, bounds.x_max, bounds.y_min, bounds.y_max]
            .iter()
            .all(|v| v.is_finite());
        if !finite || bounds.x_min > bounds.x_max || bounds.y_min > bounds.y_max {
            return Err(Error::invalid(format!("malformed bounds {bounds:?}")));
        }
        self.bounds = bounds;
        for (_, node) in self.nodes.iter() {
            self.bounds.include(node.pos);
        }
        Ok(())
    }

    pub(crate) fn set_normalizer(&mut self, normalizer: Normalizer) {
        self.normalizer = normalizer;
    }

    // ---- metric computation ------------------------------------------------

    /// Full recomputation without touching the cache.
    fn recompute(&self) -> (Metrics, CrossingCache) {
        let mut crossings = CrossingCache::default();
        let edges: Vec<EdgeKey> = self.edges().collect();
        for (i, &e) in edges.iter().enumerate() {
            for &f in &edges[i + 1..] {
                if metrics::edges_cross(self, e, f) {
                    crossings.insert(e, f);
                }
            }
        }
        let totals = Metrics {
            node_occlusion: metrics::node_occlusion_total(self),
            node_edge_occlusion: metrics::node_edge_occlusion_total(self),
            edge_length: metrics::edge_length_total(self, self.params.target_edge_length),
            edge_crossing: crossings.pairs() as f64,
            angular_resolution: metrics::angular_resolution_total(self),
        };
        (totals, crossings)
    }

    /// Recomputes every metric from scratch and marks the model computed.
    pub fn calc_metrics(&mut self) -> Metrics {
        let (totals, crossings) = self.recompute();
        self.cache = totals;
        self.crossings = crossings;
        self.nodes_with_angles = self.node_ids().filter(|&id| self.degree(id) >= 2).count();
        debug_assert!(
            self.cache.angular_resolution
                <= self
                    .node_ids()
                    .map(|id| metrics::angular_resolution_bound(self.degree(id)))
                    .sum::<f64>()
                    * (1.0 + CACHE_TOLERANCE)
                    + CACHE_TOLERANCE
        );
        self.status = Status::Computed;
        trace!(
            nodes = self.node_count(),
            edges = self.edge_count,
            crossings = self.crossings.pairs(),
            "recomputed metrics"
        );
        self.cache
    }

    fn ensure_computed(&mut self) {
        if self.status == Status::Dirty {
            self.calc_metrics();
        }
    }

    /// Raw metric sums, recomputed first if the model is dirty.
    pub fn metrics(&mut self) -> Metrics {
        self.ensure_computed();
        self.cache
    }

    fn footprint(&self, id: NodeId) -> Footprint {
        let incident = self.incident_edges(id);
        let mut m = Metrics {
            node_occlusion: metrics::node_occlusion(self, id),
            node_edge_occlusion: metrics::node_edge_occlusion_for_node(self, id),
            edge_length: 0.0,
            edge_crossing: 0.0,
            angular_resolution: metrics::angular_resolution(self, id),
        };
        let mut crossings = Vec::with_capacity(incident.len());
        for &edge in &incident {
            m.node_edge_occlusion += metrics::node_edge_occlusion_for_edge(self, edge);
            m.edge_length += metrics::edge_length(self, edge, self.params.target_edge_length);
            let crossed = metrics::edge_crossings(self, edge);
            m.edge_crossing += crossed.len() as f64;
            crossings.push((edge, crossed));
        }
        for n in self.neighbors(id) {
            m.angular_resolution += metrics::angular_resolution(self, n);
        }
        Footprint {
            metrics: m,
            crossings,
        }
    }

    /// Sum of every metric term that depends on `id`'s position.
    pub fn calc_node_metrics(&self, id: NodeId) -> Result<Metrics> {
        self.require(id)?;
        Ok(self.footprint(id).metrics)
    }

    // ---- moves -------------------------------------------------------------

    /// Displaces `id` by `v`, updating the cache incrementally.
    ///
    /// Without `expand_bounds` a destination outside the bounds is rejected
    /// and the model is left untouched. With it the bounds grow to cover the
    /// destination.
    pub fn move_node(&mut self, id: NodeId, v: Vec2, expand_bounds: bool) -> Result<MoveOutcome> {
        let origin = self
            .node_position(id)
            .ok_or_else(|| Error::invalid(format!("unknown node {id}")))?;
        let dest = origin + v;
        if !dest.is_finite() {
            return Err(Error::invalid(format!("move of {id} leaves the finite plane")));
        }
        if !expand_bounds && !self.bounds.contains(dest) {
            return Ok(MoveOutcome::OutOfBounds);
        }
        self.ensure_computed();

        let before = self.footprint(id).metrics;
        if let Some(node) = self.nodes.get_mut(id) {
            node.pos = dest;
        }
        let after = self.footprint(id);
        for key in MetricKey::ALL {
            self.cache[key] += after.metrics[key] - before[key];
        }
        for (edge, crossed) in after.crossings {
            self.crossings.replace(edge, crossed);
        }
        debug_assert_eq!(self.cache.edge_crossing, self.crossings.pairs() as f64);
        if expand_bounds {
            self.bounds.include(dest);
        }
        Ok(MoveOutcome::Moved(dest))
    }

    /// Absolute form of [`Graph::move_node`].
    pub fn set_node_position(
        &mut self,
        id: NodeId,
        pos: Vec2,
        expand_bounds: bool,
    ) -> Result<MoveOutcome> {
        let origin = self
            .node_position(id)
            .ok_or_else(|| Error::invalid(format!("unknown node {id}")))?;
        self.move_node(id, pos - origin, expand_bounds)
    }

    /// Objective the model would have after displacing `id` by `v`, or
    /// `None` when the destination is out of bounds.
    ///
    /// The trial is scored against the current normalizer history without
    /// adding to it. Position, cache and crossing relation are restored
    /// before returning, whatever the outcome.
    pub fn test_move(&mut self, id: NodeId, v: Vec2) -> Result<Option<f64>> {
        let origin = self
            .node_position(id)
            .ok_or_else(|| Error::invalid(format!("unknown node {id}")))?;
        if !self.bounds.contains(origin + v) {
            return Ok(None);
        }
        self.ensure_computed();

        let saved_cache = self.cache;
        let saved_crossings: Vec<(EdgeKey, _)> = self
            .incident_edges(id)
            .into_iter()
            .map(|edge| (edge, self.crossings.crossed_by(edge)))
            .collect();

        let trial = match self.move_node(id, v, false) {
            Ok(MoveOutcome::Moved(_)) => self.trial_objective().map(Some),
            Ok(MoveOutcome::OutOfBounds) => Ok(None),
            Err(err) => Err(err),
        };

        if let Some(node) = self.nodes.get_mut(id) {
            node.pos = origin;
        }
        self.cache = saved_cache;
        for (edge, crossed) in saved_crossings {
            self.crossings.replace(edge, crossed);
        }
        trial
    }

    // ---- objective ---------------------------------------------------------

    /// Largest value each raw metric can reach for the current node count,
    /// edge count, angled nodes and bounds.
    pub fn metric_ceilings(&self) -> Metrics {
        let n = self.node_count() as f64;
        let e = self.edge_count as f64;
        let closest = metrics::MIN_DISTANCE * metrics::MIN_DISTANCE;
        let diagonal = self.bounds.width().hypot(self.bounds.height());
        let target = self.params.target_edge_length;
        let worst_edge = target.max(diagonal - target);
        Metrics {
            node_occlusion: n * (n - 1.0).max(0.0) / 2.0 / closest,
            node_edge_occlusion: e * (n - 2.0).max(0.0) / closest,
            edge_length: e * worst_edge * worst_edge,
            edge_crossing: e * (e - 1.0).max(0.0) / 2.0,
            angular_resolution: self.nodes_with_angles as f64 * 360.0 * 360.0,
        }
    }

    /// Normalized scores against the current history, without recording.
    pub fn normalized_metrics(&mut self) -> Metrics {
        self.ensure_computed();
        self.normalizer.score_all(&self.cache, &self.metric_ceilings())
    }

    /// Weighted sum of normalized metrics. Records the current raw values in
    /// the normalizer history.
    pub fn objective(&mut self) -> Result<f64> {
        self.ensure_computed();
        let ceilings = self.metric_ceilings();
        let normalized = self.normalizer.normalize_all(&self.cache, &ceilings);
        self.weigh(normalized)
    }

    fn trial_objective(&self) -> Result<f64> {
        let normalized = self.normalizer.score_all(&self.cache, &self.metric_ceilings());
        self.weigh(normalized)
    }

    fn weigh(&self, normalized: Metrics) -> Result<f64> {
        let value = self.weights.apply(&normalized);
        if !value.is_finite() || value < 0.0 {
            return Err(Error::InvalidObjective(Box::new(ObjectiveDiagnostic {
                value,
                raw: self.cache,
                normalized,
                weights: self.weights,
            })));
        }
        Ok(value)
    }

    /// Compares the incremental cache against a full recomputation.
    pub fn debug_check_consistency(&self) -> bool {
        if self.status == Status::Dirty {
            return true;
        }
        let (totals, crossings) = self.recompute();
        let pairs_match = crossings.iter_pairs().eq(self.crossings.iter_pairs());
        pairs_match && totals.approx_eq(&self.cache, CACHE_TOLERANCE)
    }
}
