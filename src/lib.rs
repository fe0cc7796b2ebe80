pub mod batch;
#[cfg(feature = "cli")]
pub mod cli;
pub mod config;
pub mod error;
pub mod geometry;
pub mod graph;
pub mod metrics;
pub mod normalize;
pub mod optimize;
pub mod report;

#[cfg(feature = "cli")]
pub use cli::run;
pub use config::{Config, Weights, load_config};
pub use error::{Error, Result};
pub use geometry::{Bounds, Vec2};
pub use graph::{Graph, MoveOutcome, NodeId};
pub use metrics::{MetricKey, Metrics};
pub use optimize::{CancelFlag, Optimizer, RunReport, run_layout};
