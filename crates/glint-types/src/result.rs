//! Candidate configurations and the final generation result.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::table::ConfigTable;

/// A single candidate configuration parsed from one model response:
/// hyperparameter name → numeric value. Only names present in the task
/// context survive validation.
pub type Candidate = HashMap<String, f64>;

/// Final output of one acquisition call: validated, deduplicated candidate
/// configurations plus accounting metadata. The engine retains no
/// reference after returning it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationResult {
    /// Validated candidate configurations, one row each, in natural
    /// (unwarped) hyperparameter units.
    pub candidates: ConfigTable,
    /// Accumulated monetary cost of every model request across all
    /// attempts, including failed ones.
    pub total_cost: f64,
    /// Wall time spent inside the acquisition call.
    pub elapsed_seconds: f64,
    pub generated_at: DateTime<Utc>,
    /// Number of generation attempts consumed (1 when the first attempt
    /// met the quorum).
    pub attempts: usize,
    /// True when the degenerate fallback fired and `candidates` holds raw,
    /// unvalidated parses.
    pub fallback: bool,
}
