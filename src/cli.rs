use crate::batch::{BatchOptions, run_batch};
use crate::config::{Algorithm, Config, load_config};
use crate::graph::{generate, read_graph, write_graph};
use crate::optimize::{CancelFlag, RunReport, run_layout};
use crate::report::{GraphSummary, RowStatus, render_table, write_json_report};
use anyhow::Result;
use clap::{Args as ClapArgs, Parser, Subcommand, ValueEnum};
use rand::SeedableRng;
use rand::rngs::StdRng;
use serde::Serialize;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(
    name = "gaopt",
    version,
    about = "Aesthetic metrics and layout optimization for node-link drawings"
)]
pub struct Args {
    /// Config file (.json or .json5)
    #[arg(short = 'c', long = "configFile", global = true)]
    pub config: Option<PathBuf>,

    /// More log output (-v info, -vv debug); RUST_LOG wins when set
    #[arg(short = 'v', long = "verbose", action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Write a random connected graph
    Generate {
        /// Seed for a reproducible graph
        #[arg(long)]
        seed: Option<u64>,

        /// Output file. Defaults to stdout.
        #[arg(short = 'o', long = "output")]
        output: Option<PathBuf>,
    },
    /// Print counts, density, metrics and objective of a graph
    Metrics {
        /// Input graph or '-' for stdin
        #[arg(short = 'i', long = "input")]
        input: Option<PathBuf>,
    },
    /// Run one optimizer over a graph
    Optimize {
        /// Input graph or '-' for stdin
        #[arg(short = 'i', long = "input")]
        input: Option<PathBuf>,

        /// Optimized graph. Defaults to stdout.
        #[arg(short = 'o', long = "output")]
        output: Option<PathBuf>,

        /// Before/after summary as JSON
        #[arg(long = "report")]
        report: Option<PathBuf>,

        #[command(flatten)]
        layout: LayoutArgs,
    },
    /// Run one optimizer over many graphs in parallel
    Batch {
        /// Graph files
        #[arg(required = true)]
        files: Vec<PathBuf>,

        /// Also write every row as JSON
        #[arg(long = "json")]
        json: Option<PathBuf>,

        /// Directory for the optimized graphs
        #[arg(long = "out-dir")]
        out_dir: Option<PathBuf>,

        /// Stop the remaining runs after the first failure
        #[arg(long = "fail-fast")]
        fail_fast: bool,

        #[command(flatten)]
        layout: LayoutArgs,
    },
}

#[derive(ClapArgs, Debug, Default)]
pub struct LayoutArgs {
    /// Layout algorithm
    #[arg(short = 'l', long = "layout", value_enum)]
    pub layout: Option<LayoutKind>,

    /// Hill climbing pass cap
    #[arg(long = "iterations")]
    pub iterations: Option<usize>,

    /// Hill climbing move length
    #[arg(long = "square-size")]
    pub square_size: Option<f64>,

    /// Circular layout radius
    #[arg(long = "radius")]
    pub radius: Option<f64>,
}

#[derive(ValueEnum, Debug, Clone, Copy)]
pub enum LayoutKind {
    HillClimbing,
    Circular,
    Tabu,
}

impl From<LayoutKind> for Algorithm {
    fn from(kind: LayoutKind) -> Self {
        match kind {
            LayoutKind::HillClimbing => Algorithm::HillClimbing,
            LayoutKind::Circular => Algorithm::Circular,
            LayoutKind::Tabu => Algorithm::Tabu,
        }
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct OptimizeReport {
    before: GraphSummary,
    run: RunReport,
    after: GraphSummary,
}

pub fn run() -> Result<()> {
    let args = Args::parse();
    init_tracing(args.verbose);
    let mut config = load_config(args.config.as_deref())?;

    match args.command {
        Command::Generate { seed, output } => {
            let seed = seed.or(config.generator.seed);
            let mut rng = match seed {
                Some(seed) => StdRng::seed_from_u64(seed),
                None => StdRng::from_rng(&mut rand::rng()),
            };
            let mut graph = generate(&config.generator, &mut rng)?;
            graph.set_weights(config.weights)?;
            graph.set_metric_params(config.metrics)?;
            graph.metrics();
            write_graph(&graph, output.as_deref())?;
        }
        Command::Metrics { input } => {
            let mut graph = read_graph(input.as_deref())?;
            apply_config(&mut graph, &config)?;
            write_json_report(None, &GraphSummary::capture(&mut graph)?)?;
        }
        Command::Optimize {
            input,
            output,
            report,
            layout,
        } => {
            apply_layout_args(&mut config, &layout)?;
            let mut graph = read_graph(input.as_deref())?;
            apply_config(&mut graph, &config)?;
            let before = GraphSummary::capture(&mut graph)?;
            let run = run_layout(&mut graph, &config.layout, &CancelFlag::new())?;
            let after = GraphSummary::capture(&mut graph)?;
            eprintln!(
                "{}: objective {:.3} -> {:.3} after {} iterations",
                config.layout.algorithm.name(),
                before.objective,
                after.objective,
                run.iterations
            );
            if let Some(path) = report.as_deref() {
                write_json_report(Some(path), &OptimizeReport { before, run, after })?;
            }
            write_graph(&graph, output.as_deref())?;
        }
        Command::Batch {
            files,
            json,
            out_dir,
            fail_fast,
            layout,
        } => {
            apply_layout_args(&mut config, &layout)?;
            let options = BatchOptions { fail_fast, out_dir };
            let rows = run_batch(&files, &config, &options, &CancelFlag::new());
            print!("{}", render_table(&rows));
            if let Some(path) = json.as_deref() {
                write_json_report(Some(path), &rows)?;
            }
            let failed = rows.iter().filter(|r| r.status == RowStatus::Failed).count();
            if failed > 0 {
                return Err(anyhow::anyhow!("{failed} of {} graphs failed", rows.len()));
            }
        }
    }
    Ok(())
}

fn init_tracing(verbose: u8) {
    let default = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

fn apply_config(graph: &mut crate::graph::Graph, config: &Config) -> Result<()> {
    graph.set_weights(config.weights)?;
    graph.set_metric_params(config.metrics)?;
    Ok(())
}

fn apply_layout_args(config: &mut Config, args: &LayoutArgs) -> Result<()> {
    if let Some(kind) = args.layout {
        config.layout.algorithm = kind.into();
    }
    if let Some(iterations) = args.iterations {
        config.layout.hill_climbing.iterations = iterations;
    }
    if let Some(square_size) = args.square_size {
        config.layout.hill_climbing.square_size = square_size;
    }
    if let Some(radius) = args.radius {
        config.layout.circular.radius = radius;
    }
    config.layout.validate()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn layout_flags_override_config() {
        let mut config = Config::default();
        let args = LayoutArgs {
            layout: Some(LayoutKind::Circular),
            iterations: Some(7),
            square_size: None,
            radius: Some(120.0),
        };
        apply_layout_args(&mut config, &args).unwrap();
        assert_eq!(config.layout.algorithm, Algorithm::Circular);
        assert_eq!(config.layout.hill_climbing.iterations, 7);
        assert_eq!(config.layout.hill_climbing.square_size, 100.0);
        assert_eq!(config.layout.circular.radius, 120.0);
    }

    #[test]
    fn invalid_flag_values_are_rejected() {
        let mut config = Config::default();
        let args = LayoutArgs {
            square_size: Some(-5.0),
            ..LayoutArgs::default()
        };
        assert!(apply_layout_args(&mut config, &args).is_err());
    }

    #[test]
    fn parses_subcommands() {
        let args = Args::try_parse_from([
            "gaopt", "-v", "optimize", "-i", "g.json", "--layout", "circular", "--radius", "300",
        ])
        .unwrap();
        assert_eq!(args.verbose, 1);
        match args.command {
            Command::Optimize { input, layout, .. } => {
                assert_eq!(input, Some(PathBuf::from("g.json")));
                assert!(matches!(layout.layout, Some(LayoutKind::Circular)));
                assert_eq!(layout.radius, Some(300.0));
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn batch_requires_files() {
        assert!(Args::try_parse_from(["gaopt", "batch"]).is_err());
    }
}
