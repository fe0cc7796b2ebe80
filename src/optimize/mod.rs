//! Layout optimizers over a [`Graph`].
//!
//! Optimizers borrow the model mutably for the length of a run; a run is a
//! plain blocking call. Callers that want it off-thread hand a cloned graph
//! to a worker and keep a [`CancelFlag`] to stop it.

mod circular;
mod hill_climbing;

pub use circular::CircularLayout;
pub use hill_climbing::HillClimbing;

use crate::config::{Algorithm, LayoutConfig};
use crate::error::{Error, Result};
use crate::graph::Graph;
use crate::metrics::Metrics;
use serde::Serialize;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::info;

/// Shared stop request, checked between passes and between nodes.
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

/// What one call to [`Optimizer::step`] did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepOutcome {
    Continue,
    Converged,
    Cancelled,
}

/// Bookkeeping returned by [`Optimizer::run`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RunStats {
    pub iterations: usize,
    pub evaluated_solutions: u64,
    pub converged: bool,
    pub cancelled: bool,
}

pub trait Optimizer {
    fn name(&self) -> &'static str;

    /// One pass over every node.
    fn step(&mut self) -> Result<StepOutcome>;

    /// Steps until the iteration cap, convergence or cancellation.
    fn run(&mut self) -> Result<RunStats>;
}

/// Final state handed back to the caller of [`run_layout`].
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RunReport {
    pub algorithm: Algorithm,
    pub iterations: usize,
    pub evaluated_solutions: u64,
    pub converged: bool,
    pub cancelled: bool,
    pub objective: f64,
    pub metrics: Metrics,
}

/// Runs the optimizer selected by `config` on `graph` in place.
pub fn run_layout(graph: &mut Graph, config: &LayoutConfig, cancel: &CancelFlag) -> Result<RunReport> {
    config.validate()?;
    let stats = match config.algorithm {
        Algorithm::HillClimbing => {
            HillClimbing::new(graph, &config.hill_climbing)
                .with_cancel(cancel.clone())
                .run()?
        }
        Algorithm::Circular => {
            CircularLayout::new(graph, &config.circular)
                .with_cancel(cancel.clone())
                .run()?
        }
        Algorithm::Tabu => return Err(Error::UnsupportedAlgorithm(Algorithm::Tabu.name())),
    };
    let objective = graph.objective()?;
    let report = RunReport {
        algorithm: config.algorithm,
        iterations: stats.iterations,
        evaluated_solutions: stats.evaluated_solutions,
        converged: stats.converged,
        cancelled: stats.cancelled,
        objective,
        metrics: graph.metrics(),
    };
    info!(
        algorithm = config.algorithm.name(),
        iterations = report.iterations,
        evaluated = report.evaluated_solutions,
        converged = report.converged,
        cancelled = report.cancelled,
        objective = report.objective,
        "layout finished"
    );
    Ok(report)
}
