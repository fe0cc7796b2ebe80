use crate::config::Weights;
use crate::metrics::Metrics;
use std::fmt;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("invalid parameters: {0}")]
    InvalidParameters(String),
    #[error("{0}")]
    InvalidObjective(Box<ObjectiveDiagnostic>),
    #[error("the {0} optimizer has no implementation")]
    UnsupportedAlgorithm(&'static str),
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    pub(crate) fn invalid(reason: impl Into<String>) -> Self {
        Error::InvalidParameters(reason.into())
    }
}

/// Everything needed to understand a non-finite or negative objective.
#[derive(Debug, Clone)]
pub struct ObjectiveDiagnostic {
    pub value: f64,
    pub raw: Metrics,
    pub normalized: Metrics,
    pub weights: Weights,
}

impl fmt::Display for ObjectiveDiagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "invalid weights or metrics (objective = {})", self.value)?;
        writeln!(f, "raw metrics:\n {}", to_json(&self.raw))?;
        writeln!(f, "normalized metrics:\n {}", to_json(&self.normalized))?;
        write!(f, "weights:\n {}", to_json(&self.weights))
    }
}

fn to_json<T: serde::Serialize>(value: &T) -> String {
    serde_json::to_string(value).unwrap_or_else(|err| format!("<unserializable: {err}>"))
}
