use crate::error::{Error, Result};
use crate::metrics::{MetricKey, Metrics};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Objective weights, one per metric. A zero weight takes the metric out of
/// the search without skipping its computation.
///
/// Without a weights block every metric weighs 1. Inside a block, a key that
/// is left out weighs 0.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct Weights {
    #[serde(default)]
    pub node_occlusion: f64,
    #[serde(default)]
    pub node_edge_occlusion: f64,
    #[serde(default)]
    pub edge_length: f64,
    #[serde(default)]
    pub edge_crossing: f64,
    #[serde(default)]
    pub angular_resolution: f64,
}

impl Default for Weights {
    fn default() -> Self {
        Self {
            node_occlusion: 1.0,
            node_edge_occlusion: 1.0,
            edge_length: 1.0,
            edge_crossing: 1.0,
            angular_resolution: 1.0,
        }
    }
}

impl Weights {
    pub fn get(&self, key: MetricKey) -> f64 {
        match key {
            MetricKey::NodeOcclusion => self.node_occlusion,
            MetricKey::NodeEdgeOcclusion => self.node_edge_occlusion,
            MetricKey::EdgeLength => self.edge_length,
            MetricKey::EdgeCrossing => self.edge_crossing,
            MetricKey::AngularResolution => self.angular_resolution,
        }
    }

    /// Weighted sum of normalized scores.
    pub fn apply(&self, normalized: &Metrics) -> f64 {
        MetricKey::ALL
            .into_iter()
            .map(|key| self.get(key) * normalized[key])
            .sum()
    }

    pub fn validate(&self) -> Result<()> {
        for key in MetricKey::ALL {
            let w = self.get(key);
            if !w.is_finite() || w < 0.0 {
                return Err(Error::invalid(format!(
                    "weight {key} must be a finite non-negative number, got {w}"
                )));
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase", deny_unknown_fields)]
pub struct MetricParams {
    pub target_edge_length: f64,
}

impl Default for MetricParams {
    fn default() -> Self {
        Self {
            target_edge_length: 200.0,
        }
    }
}

impl MetricParams {
    pub fn validate(&self) -> Result<()> {
        if !self.target_edge_length.is_finite() || self.target_edge_length <= 0.0 {
            return Err(Error::invalid(format!(
                "targetEdgeLength must be positive, got {}",
                self.target_edge_length
            )));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Algorithm {
    #[default]
    HillClimbing,
    Circular,
    Tabu,
}

impl Algorithm {
    pub fn name(self) -> &'static str {
        match self {
            Algorithm::HillClimbing => "hillClimbing",
            Algorithm::Circular => "circular",
            Algorithm::Tabu => "tabu",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase", deny_unknown_fields)]
pub struct HillClimbingParams {
    /// Length of each of the eight candidate moves.
    pub square_size: f64,
    pub iterations: usize,
}

impl Default for HillClimbingParams {
    fn default() -> Self {
        Self {
            square_size: 100.0,
            iterations: 500,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase", deny_unknown_fields)]
pub struct CircularParams {
    pub radius: f64,
    pub max_iterations: usize,
    /// Each iteration closes `1/step` of the remaining distance to the target.
    pub step: f64,
}

impl Default for CircularParams {
    fn default() -> Self {
        Self {
            radius: 450.0,
            max_iterations: 1000,
            step: 30.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase", deny_unknown_fields)]
pub struct LayoutConfig {
    pub algorithm: Algorithm,
    pub hill_climbing: HillClimbingParams,
    pub circular: CircularParams,
}

impl LayoutConfig {
    pub fn validate(&self) -> Result<()> {
        let hc = &self.hill_climbing;
        if !hc.square_size.is_finite() || hc.square_size <= 0.0 {
            return Err(Error::invalid(format!(
                "squareSize must be positive, got {}",
                hc.square_size
            )));
        }
        let c = &self.circular;
        if !c.radius.is_finite() || c.radius <= 0.0 {
            return Err(Error::invalid(format!(
                "radius must be positive, got {}",
                c.radius
            )));
        }
        if !c.step.is_finite() || c.step < 1.0 {
            return Err(Error::invalid(format!(
                "step must be at least 1, got {}",
                c.step
            )));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase", deny_unknown_fields)]
pub struct GeneratorConfig {
    pub min_nodes: usize,
    pub max_nodes: usize,
    pub min_edges: usize,
    pub max_edges: usize,
    pub width: f64,
    pub height: f64,
    pub seed: Option<u64>,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            min_nodes: 10,
            max_nodes: 10,
            min_edges: 15,
            max_edges: 15,
            width: 1000.0,
            height: 1000.0,
            seed: None,
        }
    }
}

impl GeneratorConfig {
    pub fn validate(&self) -> Result<()> {
        if self.min_nodes > self.max_nodes {
            return Err(Error::invalid(format!(
                "minNodes ({}) exceeds maxNodes ({})",
                self.min_nodes, self.max_nodes
            )));
        }
        if self.min_edges > self.max_edges {
            return Err(Error::invalid(format!(
                "minEdges ({}) exceeds maxEdges ({})",
                self.min_edges, self.max_edges
            )));
        }
        if !self.width.is_finite() || self.width < 0.0 || !self.height.is_finite() || self.height < 0.0
        {
            return Err(Error::invalid("generator width and height must be finite and non-negative"));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase", deny_unknown_fields)]
pub struct Config {
    pub weights: Weights,
    pub metrics: MetricParams,
    pub layout: LayoutConfig,
    pub generator: GeneratorConfig,
}

impl Config {
    pub fn validate(&self) -> Result<()> {
        self.weights.validate()?;
        self.metrics.validate()?;
        self.layout.validate()?;
        self.generator.validate()
    }
}

pub fn load_config(path: Option<&Path>) -> anyhow::Result<Config> {
    let Some(path) = path else {
        return Ok(Config::default());
    };

    let contents = std::fs::read_to_string(path)?;
    let config: Config = if path.extension().is_some_and(|ext| ext == "json5") {
        json5::from_str(&contents)?
    } else {
        serde_json::from_str(&contents)?
    };
    config.validate()?;
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn missing_path_gives_defaults() {
        let config = load_config(None).unwrap();
        assert_eq!(config, Config::default());
        assert_eq!(config.layout.hill_climbing.square_size, 100.0);
        assert_eq!(config.metrics.target_edge_length, 200.0);
    }

    #[test]
    fn partial_file_keeps_other_defaults() {
        let config: Config =
            serde_json::from_str(r#"{ "layout": { "algorithm": "circular" } }"#).unwrap();
        assert_eq!(config.layout.algorithm, Algorithm::Circular);
        assert_eq!(config.layout.circular.radius, 450.0);
        assert_eq!(config.weights, Weights::default());
    }

    #[test]
    fn keys_missing_from_weights_block_weigh_zero() {
        let config: Config =
            serde_json::from_str(r#"{ "weights": { "edgeLength": 2.0 } }"#).unwrap();
        assert_eq!(
            config.weights,
            Weights {
                node_occlusion: 0.0,
                node_edge_occlusion: 0.0,
                edge_length: 2.0,
                edge_crossing: 0.0,
                angular_resolution: 0.0,
            }
        );
        assert!(
            serde_json::from_str::<Config>(r#"{ "weights": { "edgeLenght": 2.0 } }"#).is_err()
        );
    }

    #[test]
    fn absent_weights_block_weighs_everything_equally() {
        let config: Config = serde_json::from_str("{}").unwrap();
        assert_eq!(config.weights, Weights::default());
    }

    #[test]
    fn unknown_keys_are_rejected() {
        assert!(serde_json::from_str::<Config>(r#"{ "weight": {} }"#).is_err());
        assert!(
            serde_json::from_str::<Config>(r#"{ "metrics": { "targetLength": 5 } }"#).is_err()
        );
    }

    #[test]
    fn json5_files_are_accepted() {
        let mut file = tempfile::Builder::new().suffix(".json5").tempfile().unwrap();
        writeln!(
            file,
            "{{ layout: {{ hillClimbing: {{ iterations: 3, }} }}, generator: {{ seed: 7 }} }}"
        )
        .unwrap();
        let config = load_config(Some(file.path())).unwrap();
        assert_eq!(config.layout.hill_climbing.iterations, 3);
        assert_eq!(config.generator.seed, Some(7));
    }

    #[test]
    fn validation_rejects_bad_values() {
        let mut config = Config::default();
        config.weights.edge_crossing = -1.0;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.metrics.target_edge_length = 0.0;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.generator.min_nodes = 20;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.layout.hill_climbing.square_size = f64::NAN;
        assert!(config.validate().is_err());
    }

    #[test]
    fn weighted_sum_uses_every_key() {
        let w = Weights {
            node_occlusion: 1.0,
            node_edge_occlusion: 2.0,
            edge_length: 3.0,
            edge_crossing: 4.0,
            angular_resolution: 5.0,
        };
        let scores = Metrics::from_fn(|_| 1.0);
        assert_eq!(w.apply(&scores), 15.0);
    }
}
