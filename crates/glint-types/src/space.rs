//! Hyperparameter constraint definitions and the per-run task context.

use serde::{Deserialize, Serialize};

/// The kind of a hyperparameter dimension.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ParamKind {
    /// Whole numbers only.
    Int,
    /// Continuous values.
    Float,
    /// One of an explicit, ordered list of allowed values.
    Ordinal,
}

/// Value-space transform applied before modeling and inverted on the way out.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ParamTransform {
    #[default]
    None,
    /// Base-10 logarithmic warping.
    Log,
}

/// The allowed region for a hyperparameter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ParamDomain {
    /// Inclusive `[low, high]` range for int/float dimensions.
    Bounds { low: f64, high: f64 },
    /// Explicit ordered list of allowed values for ordinal dimensions.
    Values(Vec<f64>),
}

impl ParamDomain {
    /// A domain that cannot describe any value. Degenerate domains are
    /// skipped (with a warning) when rendering prompt range lines; they
    /// never panic.
    pub fn is_degenerate(&self) -> bool {
        match self {
            Self::Bounds { low, high } => !low.is_finite() || !high.is_finite() || low > high,
            Self::Values(values) => values.is_empty() || values.iter().any(|v| !v.is_finite()),
        }
    }
}

/// Full constraint for one hyperparameter. Immutable for the lifetime of
/// an optimization run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParamConstraint {
    pub kind: ParamKind,
    pub transform: ParamTransform,
    pub domain: ParamDomain,
}

/// Whether we are maximizing or minimizing the objective.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Direction {
    Maximize,
    Minimize,
}

impl Default for Direction {
    fn default() -> Self {
        Self::Minimize
    }
}

/// Contextual description of one search problem: an ordered mapping from
/// hyperparameter name to its constraint, plus an optional free-text task
/// description. Insertion order is the canonical column order.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct TaskContext {
    params: Vec<(String, ParamConstraint)>,
    description: Option<String>,
}

impl TaskContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn add_int(self, name: impl Into<String>, low: i64, high: i64) -> Self {
        self.add(
            name,
            ParamKind::Int,
            ParamTransform::None,
            ParamDomain::Bounds {
                low: low as f64,
                high: high as f64,
            },
        )
    }

    pub fn add_log_int(self, name: impl Into<String>, low: i64, high: i64) -> Self {
        self.add(
            name,
            ParamKind::Int,
            ParamTransform::Log,
            ParamDomain::Bounds {
                low: low as f64,
                high: high as f64,
            },
        )
    }

    pub fn add_float(self, name: impl Into<String>, low: f64, high: f64) -> Self {
        self.add(
            name,
            ParamKind::Float,
            ParamTransform::None,
            ParamDomain::Bounds { low, high },
        )
    }

    pub fn add_log_float(self, name: impl Into<String>, low: f64, high: f64) -> Self {
        self.add(
            name,
            ParamKind::Float,
            ParamTransform::Log,
            ParamDomain::Bounds { low, high },
        )
    }

    pub fn add_ordinal(self, name: impl Into<String>, values: Vec<f64>) -> Self {
        self.add(
            name,
            ParamKind::Ordinal,
            ParamTransform::None,
            ParamDomain::Values(values),
        )
    }

    pub fn add(
        mut self,
        name: impl Into<String>,
        kind: ParamKind,
        transform: ParamTransform,
        domain: ParamDomain,
    ) -> Self {
        self.params.push((
            name.into(),
            ParamConstraint {
                kind,
                transform,
                domain,
            },
        ));
        self
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    pub fn constraint(&self, name: &str) -> Option<&ParamConstraint> {
        self.params
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, c)| c)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.constraint(name).is_some()
    }

    /// Hyperparameter names in canonical (insertion) order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.params.iter().map(|(n, _)| n.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &ParamConstraint)> {
        self.params.iter().map(|(n, c)| (n.as_str(), c))
    }

    pub fn len(&self) -> usize {
        self.params.len()
    }

    pub fn is_empty(&self) -> bool {
        self.params.is_empty()
    }
}
