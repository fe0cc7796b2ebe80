//! One layout over many saved graphs.
//!
//! Every file gets its own model and optimizer on a rayon worker; the only
//! thing the runs share is the cancel flag.

use crate::config::Config;
use crate::graph::{Graph, read_graph, write_graph};
use crate::optimize::{CancelFlag, run_layout};
use crate::report::{BatchRow, GraphSummary, RowStatus};
use rayon::prelude::*;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{info, warn};

#[derive(Debug, Clone, Default)]
pub struct BatchOptions {
    /// Raise the shared cancel flag on the first failure.
    pub fail_fast: bool,
    /// Where to write each optimized graph as `<stem>.optimized.json`.
    pub out_dir: Option<PathBuf>,
}

/// Rows come back in the order of `paths`.
pub fn run_batch(
    paths: &[PathBuf],
    config: &Config,
    options: &BatchOptions,
    cancel: &CancelFlag,
) -> Vec<BatchRow> {
    let rows: Vec<BatchRow> = paths
        .par_iter()
        .map(|path| {
            let row = run_one(path, config, options, cancel);
            if row.status == RowStatus::Failed && options.fail_fast {
                cancel.cancel();
            }
            row
        })
        .collect();
    let failed = rows.iter().filter(|r| r.status == RowStatus::Failed).count();
    info!(files = rows.len(), failed, "batch finished");
    rows
}

fn run_one(path: &Path, config: &Config, options: &BatchOptions, cancel: &CancelFlag) -> BatchRow {
    let filename = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string());
    let mut row = BatchRow {
        status: RowStatus::Done,
        filename,
        execution_ms: 0,
        evaluated_solutions: 0,
        iterations: 0,
        layout: config.layout.algorithm,
        before: None,
        after: None,
        error: None,
    };
    if cancel.is_cancelled() {
        row.status = RowStatus::Cancelled;
        return row;
    }

    let started = Instant::now();
    let result = (|| -> anyhow::Result<()> {
        let mut graph = read_graph(Some(path))?;
        graph.set_weights(config.weights)?;
        graph.set_metric_params(config.metrics)?;
        row.before = Some(GraphSummary::capture(&mut graph)?);

        let report = run_layout(&mut graph, &config.layout, cancel)?;
        row.evaluated_solutions = report.evaluated_solutions;
        row.iterations = report.iterations;
        if report.cancelled {
            row.status = RowStatus::Cancelled;
        }
        row.after = Some(GraphSummary::capture(&mut graph)?);
        if let Some(dir) = &options.out_dir {
            write_graph(&graph, Some(output_path(dir, path).as_path()))?;
        }
        Ok(())
    })();
    row.execution_ms = started.elapsed().as_millis() as u64;

    if let Err(err) = result {
        warn!(file = %path.display(), error = %err, "batch entry failed");
        row.status = RowStatus::Failed;
        row.error = Some(format!("{err:#}"));
    }
    row
}

fn output_path(dir: &Path, input: &Path) -> PathBuf {
    let stem = input
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("graph");
    dir.join(format!("{stem}.optimized.json"))
}

/// Optimizes a deep copy of `graph`, leaving the original untouched.
pub fn optimize_copy(graph: &Graph, config: &Config, cancel: &CancelFlag) -> crate::Result<Graph> {
    let mut copy = graph.clone();
    run_layout(&mut copy, &config.layout, cancel)?;
    Ok(copy)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{Algorithm, GeneratorConfig};
    use crate::graph::generate;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn small_config(algorithm: Algorithm) -> Config {
        let mut config = Config::default();
        config.layout.algorithm = algorithm;
        config.layout.hill_climbing.iterations = 3;
        config.layout.circular.max_iterations = 20;
        config
    }

    fn write_fixture(dir: &Path, name: &str, seed: u64) -> PathBuf {
        let generator = GeneratorConfig {
            min_nodes: 6,
            max_nodes: 6,
            min_edges: 8,
            max_edges: 8,
            ..GeneratorConfig::default()
        };
        let graph = generate(&generator, &mut StdRng::seed_from_u64(seed)).unwrap();
        let path = dir.join(name);
        write_graph(&graph, Some(path.as_path())).unwrap();
        path
    }

    #[test]
    fn rows_follow_input_order_and_report_both_sides() {
        let dir = tempfile::tempdir().unwrap();
        let paths = vec![
            write_fixture(dir.path(), "a.json", 1),
            write_fixture(dir.path(), "b.json", 2),
        ];
        let rows = run_batch(
            &paths,
            &small_config(Algorithm::HillClimbing),
            &BatchOptions::default(),
            &CancelFlag::new(),
        );
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].filename, "a.json");
        assert_eq!(rows[1].filename, "b.json");
        for row in &rows {
            assert_eq!(row.status, RowStatus::Done);
            let before = row.before.as_ref().unwrap();
            let after = row.after.as_ref().unwrap();
            assert_eq!(before.nodes, after.nodes);
            assert_eq!(after.edges, 8);
            assert!(row.evaluated_solutions > 0);
        }
    }

    #[test]
    fn bad_file_fails_alone() {
        let dir = tempfile::tempdir().unwrap();
        let good = write_fixture(dir.path(), "good.json", 3);
        let bad = dir.path().join("bad.json");
        std::fs::write(&bad, "{ not json").unwrap();
        let rows = run_batch(
            &[bad, good],
            &small_config(Algorithm::Circular),
            &BatchOptions::default(),
            &CancelFlag::new(),
        );
        assert_eq!(rows[0].status, RowStatus::Failed);
        assert!(rows[0].error.is_some());
        assert_eq!(rows[1].status, RowStatus::Done);
    }

    #[test]
    fn fail_fast_raises_the_shared_flag() {
        let dir = tempfile::tempdir().unwrap();
        let bad = dir.path().join("bad.json");
        std::fs::write(&bad, "[]").unwrap();
        let flag = CancelFlag::new();
        let options = BatchOptions {
            fail_fast: true,
            out_dir: None,
        };
        let rows = run_batch(&[bad], &Config::default(), &options, &flag);
        assert_eq!(rows[0].status, RowStatus::Failed);
        assert!(flag.is_cancelled());
    }

    #[test]
    fn cancelled_batch_skips_everything() {
        let dir = tempfile::tempdir().unwrap();
        let paths = vec![write_fixture(dir.path(), "a.json", 4)];
        let flag = CancelFlag::new();
        flag.cancel();
        let rows = run_batch(&paths, &Config::default(), &BatchOptions::default(), &flag);
        assert_eq!(rows[0].status, RowStatus::Cancelled);
        assert!(rows[0].before.is_none());
    }

    #[test]
    fn optimized_graphs_land_in_out_dir() {
        let dir = tempfile::tempdir().unwrap();
        let out = tempfile::tempdir().unwrap();
        let paths = vec![write_fixture(dir.path(), "ring.json", 5)];
        let options = BatchOptions {
            fail_fast: false,
            out_dir: Some(out.path().to_path_buf()),
        };
        run_batch(&paths, &small_config(Algorithm::Circular), &options, &CancelFlag::new());
        let written = read_graph(Some(out.path().join("ring.optimized.json").as_path())).unwrap();
        assert_eq!(written.node_count(), 6);
    }

    #[test]
    fn in_memory_copy_leaves_original_alone() {
        let generator = GeneratorConfig::default();
        let graph = generate(&generator, &mut StdRng::seed_from_u64(6)).unwrap();
        let optimized =
            optimize_copy(&graph, &small_config(Algorithm::Circular), &CancelFlag::new()).unwrap();
        assert_ne!(graph.export().nodes, optimized.export().nodes);
        assert_eq!(graph.node_count(), optimized.node_count());
    }
}
