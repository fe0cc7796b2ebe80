use super::{CancelFlag, Optimizer, RunStats, StepOutcome};
use crate::config::HillClimbingParams;
use crate::error::Result;
use crate::geometry::Vec2;
use crate::graph::Graph;
use tracing::debug;

/// Local search over eight compass moves of fixed length.
///
/// Each pass visits every node once and tries all eight displacements. The
/// move with the lowest objective is applied if it beats staying put; ties
/// go to the earliest direction in scan order. The search stops when a whole
/// pass leaves the objective unchanged.
pub struct HillClimbing<'g> {
    graph: &'g mut Graph,
    vectors: [Vec2; 8],
    max_iterations: usize,
    iteration: usize,
    evaluated: u64,
    done: bool,
    cancel: CancelFlag,
}

impl<'g> HillClimbing<'g> {
    pub fn new(graph: &'g mut Graph, params: &HillClimbingParams) -> Self {
        let base = Vec2::new(params.square_size, 0.0);
        let vectors = std::array::from_fn(|k| base.rotate(45.0 * k as f64));
        Self {
            graph,
            vectors,
            max_iterations: params.iterations,
            iteration: 0,
            evaluated: 0,
            done: false,
            cancel: CancelFlag::new(),
        }
    }

    pub fn with_cancel(mut self, cancel: CancelFlag) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn directions(&self) -> &[Vec2; 8] {
        &self.vectors
    }

    pub fn evaluated_solutions(&self) -> u64 {
        self.evaluated
    }
}

impl Optimizer for HillClimbing<'_> {
    fn name(&self) -> &'static str {
        "hillClimbing"
    }

    fn step(&mut self) -> Result<StepOutcome> {
        let start = self.graph.objective()?;
        let ids: Vec<_> = self.graph.node_ids().collect();
        for id in ids {
            let mut best = self.graph.objective()?;
            let mut choice = None;
            for (k, &v) in self.vectors.iter().enumerate() {
                if self.cancel.is_cancelled() {
                    return Ok(StepOutcome::Cancelled);
                }
                if let Some(trial) = self.graph.test_move(id, v)? {
                    self.evaluated += 1;
                    if trial < best {
                        best = trial;
                        choice = Some(k);
                    }
                }
            }
            if let Some(k) = choice {
                self.graph.move_node(id, self.vectors[k], false)?;
            }
        }
        debug_assert!(self.graph.debug_check_consistency());

        let end = self.graph.objective()?;
        self.iteration += 1;
        debug!(pass = self.iteration, start, end, "hill climbing pass");
        if end == start {
            self.done = true;
            return Ok(StepOutcome::Converged);
        }
        Ok(StepOutcome::Continue)
    }

    fn run(&mut self) -> Result<RunStats> {
        self.iteration = 0;
        self.done = false;
        let mut cancelled = false;
        while self.iteration < self.max_iterations && !self.done {
            if self.cancel.is_cancelled() {
                cancelled = true;
                break;
            }
            if self.step()? == StepOutcome::Cancelled {
                cancelled = true;
                break;
            }
        }
        Ok(RunStats {
            iterations: self.iteration,
            evaluated_solutions: self.evaluated,
            converged: self.done,
            cancelled,
        })
    }
}
