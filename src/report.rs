use crate::config::Algorithm;
use crate::error::Result;
use crate::graph::Graph;
use crate::metrics::{MetricKey, Metrics};
use serde::Serialize;
use std::fmt::Write as _;
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;

/// Digits after the decimal point in rendered tables.
const DIGITS: usize = 3;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GraphSummary {
    pub nodes: usize,
    pub edges: usize,
    pub density: f64,
    pub metrics: Metrics,
    pub normalized: Metrics,
    pub objective: f64,
}

impl GraphSummary {
    /// Summarises the current drawing. Evaluating the objective records the
    /// state in the normalizer history.
    pub fn capture(graph: &mut Graph) -> Result<Self> {
        let objective = graph.objective()?;
        Ok(Self {
            nodes: graph.node_count(),
            edges: graph.edge_count(),
            density: graph.density(),
            metrics: graph.metrics(),
            normalized: graph.normalized_metrics(),
            objective,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum RowStatus {
    Done,
    Failed,
    Cancelled,
}

/// One file of a batch run.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchRow {
    pub status: RowStatus,
    pub filename: String,
    pub execution_ms: u64,
    pub evaluated_solutions: u64,
    pub iterations: usize,
    pub layout: Algorithm,
    pub before: Option<GraphSummary>,
    pub after: Option<GraphSummary>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Writes `value` as pretty JSON to `path`, or stdout when absent.
pub fn write_json_report<T: Serialize>(path: Option<&Path>, value: &T) -> anyhow::Result<()> {
    match path {
        Some(path) => {
            let writer = BufWriter::new(File::create(path)?);
            serde_json::to_writer_pretty(writer, value)?;
        }
        None => {
            let mut stdout = io::stdout().lock();
            serde_json::to_writer_pretty(&mut stdout, value)?;
            writeln!(stdout)?;
        }
    }
    Ok(())
}

fn fixed(value: f64) -> String {
    format!("{:.*}", DIGITS, value)
}

/// Aligned text table of batch rows, metrics taken after the run.
pub fn render_table(rows: &[BatchRow]) -> String {
    let mut header: Vec<String> = [
        "status", "file", "ms", "evaluated", "layout", "nodes", "edges", "density",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect();
    header.extend(MetricKey::ALL.iter().map(|k| k.name().to_string()));
    header.push("objective".to_string());

    let mut table = vec![header];
    for row in rows {
        let status = match row.status {
            RowStatus::Done => "done",
            RowStatus::Failed => "failed",
            RowStatus::Cancelled => "cancelled",
        };
        let mut cells = vec![
            status.to_string(),
            row.filename.clone(),
            row.execution_ms.to_string(),
            row.evaluated_solutions.to_string(),
            row.layout.name().to_string(),
        ];
        match row.after.as_ref().or(row.before.as_ref()) {
            Some(summary) => {
                cells.push(summary.nodes.to_string());
                cells.push(summary.edges.to_string());
                cells.push(fixed(summary.density));
                cells.extend(MetricKey::ALL.iter().map(|&k| fixed(summary.metrics[k])));
                let before = row.before.as_ref().map_or(String::from("-"), |b| fixed(b.objective));
                cells.push(format!("{before} -> {}", fixed(summary.objective)));
            }
            None => {
                cells.extend(std::iter::repeat_n(String::from("-"), 3 + MetricKey::ALL.len() + 1));
            }
        }
        table.push(cells);
    }

    let columns = table[0].len();
    let widths: Vec<usize> = (0..columns)
        .map(|c| table.iter().map(|r| r[c].len()).max().unwrap_or(0))
        .collect();
    let mut out = String::new();
    for cells in &table {
        let line: Vec<String> = cells
            .iter()
            .zip(&widths)
            .map(|(cell, &w)| format!("{cell:<w$}"))
            .collect();
        let _ = writeln!(out, "{}", line.join("  ").trim_end());
    }
    for row in rows {
        if let Some(err) = &row.error {
            let _ = writeln!(out, "{}: {err}", row.filename);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::Vec2;

    fn summary() -> GraphSummary {
        let mut g = Graph::new();
        let a = g.add_node(Vec2::new(0.0, 0.0)).unwrap();
        let b = g.add_node(Vec2::new(100.0, 0.0)).unwrap();
        g.add_edge(a, b).unwrap();
        GraphSummary::capture(&mut g).unwrap()
    }

    #[test]
    fn capture_counts_and_scores() {
        let s = summary();
        assert_eq!(s.nodes, 2);
        assert_eq!(s.edges, 1);
        assert_eq!(s.density, 1.0);
        assert_eq!(s.metrics.edge_length, 10_000.0);
        assert!(s.normalized.edge_length > 0.0 && s.normalized.edge_length < 1.0);
        let sum: f64 = s.normalized.iter().map(|(_, v)| *v).sum();
        assert!((s.objective - sum).abs() < 1e-12);
    }

    #[test]
    fn table_has_header_and_three_digit_cells() {
        let row = BatchRow {
            status: RowStatus::Done,
            filename: "g.json".into(),
            execution_ms: 12,
            evaluated_solutions: 40,
            iterations: 3,
            layout: Algorithm::HillClimbing,
            before: Some(summary()),
            after: Some(summary()),
            error: None,
        };
        let text = render_table(&[row]);
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].starts_with("status"));
        assert!(lines[0].contains("angularResolution"));
        assert!(lines[1].contains("hillClimbing"));
        assert!(lines[1].contains("10000.000"));
    }

    #[test]
    fn failed_rows_show_their_error() {
        let row = BatchRow {
            status: RowStatus::Failed,
            filename: "bad.json".into(),
            execution_ms: 0,
            evaluated_solutions: 0,
            iterations: 0,
            layout: Algorithm::Circular,
            before: None,
            after: None,
            error: Some("boom".into()),
        };
        let text = render_table(&[row]);
        assert!(text.contains("failed"));
        assert!(text.contains("bad.json: boom"));
    }

    #[test]
    fn json_report_is_written() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("summary.json");
        write_json_report(Some(path.as_path()), &summary()).unwrap();
        let text = std::fs::read_to_string(&path).unwrap();
        assert!(text.contains("\"nodeEdgeOcclusion\""));
        assert!(text.contains("\"density\""));
    }
}
