use super::{CACHE_TOLERANCE, Graph, NodeId};
use crate::config::{MetricParams, Weights};
use crate::error::{Error, Result};
use crate::geometry::{Bounds, Vec2};
use crate::metrics::Metrics;
use crate::normalize::Normalizer;
use indexmap::IndexSet;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs::File;
use std::io::{self, BufWriter, Read, Write};
use std::path::Path;
use tracing::warn;

/// On-disk form of a [`Graph`]. Nodes are numbered densely in slot order and
/// `adjacency[i]` lists the neighbors of node `i` in insertion order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct SerializedGraph {
    pub nodes: Vec<Vec2>,
    pub adjacency: Vec<Vec<usize>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metrics: Option<Metrics>,
    #[serde(default)]
    pub normalizer: Normalizer,
    #[serde(default)]
    pub bounds: Bounds,
    #[serde(default)]
    pub weights: Weights,
    #[serde(default)]
    pub metric_params: MetricParams,
}

impl Graph {
    /// Serializable snapshot. A dirty model exports freshly recomputed
    /// metrics without updating its own cache.
    pub fn export(&self) -> SerializedGraph {
        let ids: Vec<NodeId> = self.node_ids().collect();
        let dense: HashMap<NodeId, usize> = ids.iter().enumerate().map(|(i, &id)| (id, i)).collect();
        let metrics = match self.status {
            super::Status::Computed => self.cache,
            super::Status::Dirty => self.recompute().0,
        };
        SerializedGraph {
            nodes: ids.iter().map(|&id| self.pos(id)).collect(),
            adjacency: ids
                .iter()
                .map(|&id| self.neighbors(id).filter_map(|n| dense.get(&n).copied()).collect())
                .collect(),
            metrics: Some(metrics),
            normalizer: self.normalizer.clone(),
            bounds: self.bounds,
            weights: self.weights,
            metric_params: self.params,
        }
    }

    /// Rebuilds a model from its serialized form.
    ///
    /// The adjacency must be in range, loop-free and symmetric. Metrics are
    /// always recomputed; a stored cache that disagrees is reported and
    /// discarded.
    pub fn import(data: SerializedGraph) -> Result<Graph> {
        let n = data.nodes.len();
        if data.adjacency.len() != n {
            return Err(Error::invalid(format!(
                "adjacency has {} rows for {n} nodes",
                data.adjacency.len()
            )));
        }
        let rows: Vec<IndexSet<usize>> = data
            .adjacency
            .iter()
            .map(|row| row.iter().copied().collect())
            .collect();
        for (i, row) in rows.iter().enumerate() {
            for &j in row {
                if j >= n {
                    return Err(Error::invalid(format!("node {i} lists neighbor {j} of {n}")));
                }
                if j == i {
                    return Err(Error::invalid(format!("node {i} lists itself as a neighbor")));
                }
                if !rows[j].contains(&i) {
                    return Err(Error::invalid(format!(
                        "edge {i}-{j} is missing its reverse entry"
                    )));
                }
            }
        }

        let mut graph = Graph::with_config(data.weights, data.metric_params)?;
        let ids = data
            .nodes
            .iter()
            .map(|&pos| graph.add_node(pos))
            .collect::<Result<Vec<_>>>()?;
        // rows are symmetric, so filling each node's own set keeps the stored order
        for (i, row) in rows.iter().enumerate() {
            if let Some(node) = graph.nodes.get_mut(ids[i]) {
                node.neighbors = row.iter().map(|&j| ids[j]).collect();
            }
        }
        graph.edge_count = rows.iter().map(IndexSet::len).sum::<usize>() / 2;
        graph.set_bounds(data.bounds)?;
        graph.set_normalizer(data.normalizer);

        let recomputed = graph.calc_metrics();
        if let Some(stored) = data.metrics {
            if !stored.approx_eq(&recomputed, CACHE_TOLERANCE) {
                warn!(?stored, ?recomputed, "stored metrics disagree with the drawing, using recomputed values");
            }
        }
        Ok(graph)
    }
}

/// Reads a serialized graph from `path`, or stdin when absent or `-`.
pub fn read_graph(path: Option<&Path>) -> anyhow::Result<Graph> {
    let content = match path {
        Some(path) if path != Path::new("-") => std::fs::read_to_string(path)?,
        _ => {
            let mut buf = String::new();
            io::stdin().read_to_string(&mut buf)?;
            buf
        }
    };
    let data: SerializedGraph = serde_json::from_str(&content)?;
    Ok(Graph::import(data)?)
}

/// Writes `graph` as pretty JSON to `path`, or stdout when absent.
pub fn write_graph(graph: &Graph, path: Option<&Path>) -> anyhow::Result<()> {
    let data = graph.export();
    match path {
        Some(path) => {
            let writer = BufWriter::new(File::create(path)?);
            serde_json::to_writer_pretty(writer, &data)?;
        }
        None => {
            let mut stdout = io::stdout().lock();
            serde_json::to_writer_pretty(&mut stdout, &data)?;
            writeln!(stdout)?;
        }
    }
    Ok(())
}
