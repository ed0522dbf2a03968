//! Error and diagnostic types.

use serde::Serialize;
use thiserror::Error;

/// Errors raised while loading reference tables or configuration.
///
/// These never surface from an expansion call: a dataset that fails to load is
/// disabled and the lookups depending on it simply return no match.
#[derive(Error, Debug)]
pub enum ReferenceError {
    #[error("failed to read reference file: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse reference table: {0}")]
    Csv(#[from] csv::Error),
    #[error("{dataset}: missing required columns {columns:?}")]
    MissingColumns { dataset: &'static str, columns: Vec<&'static str> },
    #[error("invalid configuration: {0}")]
    InvalidConfig(#[from] serde_json::Error),
}

/// Non-fatal issues found while expanding a route line.
///
/// The offending token is dropped or passed through literally, and expansion
/// carries on with the rest of the line.
#[derive(Error, Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ResolutionIssue {
    #[error("no point found for '{name}'")]
    UnresolvedPoint { name: String },
    #[error("point '{name}' is {distance_km:.0} km from its neighbours (limit {limit_km:.0} km)")]
    UnreliableCandidate {
        name: String,
        distance_km: f64,
        limit_km: f64,
    },
    #[error("procedure '{token}' could not be expanded")]
    UnknownProcedure { token: String },
    #[error("no playbook route matched 'PB.{directive}'")]
    UnknownPlaybook { directive: String },
    #[error("airway '{airway}' has no usable segment between '{from}' and '{to}'")]
    UnknownAirwayAdjacency { airway: String, from: String, to: String },
}

impl ResolutionIssue {
    /// The token the issue is about, used to report each name once.
    pub fn subject(&self) -> &str {
        match self {
            ResolutionIssue::UnresolvedPoint { name } => name,
            ResolutionIssue::UnreliableCandidate { name, .. } => name,
            ResolutionIssue::UnknownProcedure { token } => token,
            ResolutionIssue::UnknownPlaybook { directive } => directive,
            ResolutionIssue::UnknownAirwayAdjacency { airway, .. } => airway,
        }
    }
}
