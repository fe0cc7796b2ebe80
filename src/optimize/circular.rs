use super::{CancelFlag, Optimizer, RunStats, StepOutcome};
use crate::config::CircularParams;
use crate::error::Result;
use crate::geometry::Vec2;
use crate::graph::Graph;
use std::f64::consts::TAU;
use tracing::debug;

/// Pulls nodes toward evenly spaced points on a circle about the origin.
///
/// Node `i` of `n` (slot order) targets the angle `2*pi*i/n`. Every iteration
/// moves each node `1/step` of the way there, growing the bounds as needed.
/// The objective is never evaluated.
pub struct CircularLayout<'g> {
    graph: &'g mut Graph,
    radius: f64,
    step: f64,
    max_iterations: usize,
    iteration: usize,
    cancel: CancelFlag,
}

impl<'g> CircularLayout<'g> {
    pub fn new(graph: &'g mut Graph, params: &CircularParams) -> Self {
        Self {
            graph,
            radius: params.radius,
            step: params.step,
            max_iterations: params.max_iterations,
            iteration: 0,
            cancel: CancelFlag::new(),
        }
    }

    pub fn with_cancel(mut self, cancel: CancelFlag) -> Self {
        self.cancel = cancel;
        self
    }

    /// Iterations done since the last completed run.
    pub fn iteration(&self) -> usize {
        self.iteration
    }

    fn target(&self, i: usize, n: usize) -> Vec2 {
        let angle = TAU * i as f64 / n as f64;
        Vec2::new(self.radius * angle.cos(), self.radius * angle.sin())
    }
}

impl Optimizer for CircularLayout<'_> {
    fn name(&self) -> &'static str {
        "circular"
    }

    fn step(&mut self) -> Result<StepOutcome> {
        let ids: Vec<_> = self.graph.node_ids().collect();
        let n = ids.len();
        for (i, id) in ids.into_iter().enumerate() {
            if self.cancel.is_cancelled() {
                return Ok(StepOutcome::Cancelled);
            }
            let pos = self.graph.node_position(id).unwrap_or_default();
            let v = (self.target(i, n) - pos) * (1.0 / self.step);
            self.graph.move_node(id, v, true)?;
        }
        self.iteration += 1;
        Ok(StepOutcome::Continue)
    }

    fn run(&mut self) -> Result<RunStats> {
        let mut cancelled = false;
        while self.iteration < self.max_iterations {
            if self.cancel.is_cancelled() || self.step()? == StepOutcome::Cancelled {
                cancelled = true;
                break;
            }
        }
        let stats = RunStats {
            iterations: self.iteration,
            evaluated_solutions: 0,
            converged: false,
            cancelled,
        };
        debug!(iterations = stats.iterations, cancelled, "circular layout run");
        self.iteration = 0;
        Ok(stats)
    }
}
