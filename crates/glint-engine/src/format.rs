//! Few-shot example rendering with type-aware numeric precision.

use glint_types::{ConfigTable, Direction, ParamConstraint, ParamDomain, ParamKind, ParamTransform, TaskContext};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;

/// One rendered observation: the configuration row as query text and,
/// when performance values were supplied, the answer text.
#[derive(Debug, Clone, PartialEq)]
pub struct FewShotExample {
    pub query: String,
    pub answer: Option<String>,
}

/// Formatting knobs shared by every row of one rendering pass.
#[derive(Debug, Clone, Copy)]
pub struct FormatOptions {
    pub direction: Direction,
    /// `Some(seed)` permutes rows reproducibly; `None` sorts rows by
    /// performance, best last (nearest the query).
    pub seed: Option<u64>,
    /// Render real hyperparameter names; `false` substitutes `X1..Xn`.
    pub use_feature_semantics: bool,
    /// Permute column order under a fixed seed.
    pub shuffle_features: bool,
    /// Whether the configuration values have been warped into transform
    /// space (changes how log-transformed ints render and compare).
    pub warped: bool,
}

impl Default for FormatOptions {
    fn default() -> Self {
        Self {
            direction: Direction::Minimize,
            seed: None,
            use_feature_semantics: true,
            shuffle_features: false,
            warped: false,
        }
    }
}

/// Count significant decimal places of `n`, capped at 10.
pub fn count_decimals(n: f64) -> usize {
    let rendered = format!("{n:.10}");
    match rendered.split_once('.') {
        Some((_, frac)) => frac.trim_end_matches('0').len(),
        None => 0,
    }
}

/// Decimal precision implied by a constraint's lower bound. Ordinal
/// domains take their precision from the second allowed value when one
/// exists (the smallest non-trivial step in common grids).
fn domain_precision(domain: &ParamDomain) -> usize {
    match domain {
        ParamDomain::Bounds { low, .. } => count_decimals(*low),
        ParamDomain::Values(values) => values
            .get(1)
            .or_else(|| values.first())
            .map(|v| count_decimals(*v))
            .unwrap_or(0),
    }
}

/// Render one configuration value. The rule is keyed by
/// `(kind, transform, warped)`:
///
/// - int, unless log-warped: bare integer
/// - float, ordinal, or any log-warped value: decimal precision of
///   `max(1, decimals(lower_bound), decimals(value))`
///
/// The asymmetry keeps the model looking at exactly the granularity the
/// constraint definition implies, never silently rounded below it.
pub(crate) fn render_value(constraint: &ParamConstraint, warped: bool, value: f64) -> String {
    let log_warped = warped && constraint.transform == ParamTransform::Log;
    match constraint.kind {
        ParamKind::Int if !log_warped => format!("{}", value.round() as i64),
        _ => {
            let dp = count_decimals(value)
                .max(domain_precision(&constraint.domain))
                .max(1);
            format!("{value:.dp$}")
        }
    }
}

/// Render observed configurations (and optionally their performance
/// values) into an ordered sequence of few-shot examples.
pub fn format_examples(
    ctx: &TaskContext,
    configs: &ConfigTable,
    fvals: Option<&[f64]>,
    opts: &FormatOptions,
) -> Vec<FewShotExample> {
    let mut row_order: Vec<usize> = (0..configs.n_rows()).collect();
    match (opts.seed, fvals) {
        (Some(seed), _) => {
            row_order.shuffle(&mut StdRng::seed_from_u64(seed));
        }
        (None, Some(fvals)) => {
            // Best last, so the strongest examples sit nearest the query.
            row_order.sort_by(|&a, &b| match opts.direction {
                Direction::Minimize => fvals[b].total_cmp(&fvals[a]),
                Direction::Maximize => fvals[a].total_cmp(&fvals[b]),
            });
        }
        (None, None) => {}
    }

    let mut column_order: Vec<usize> = (0..configs.columns().len()).collect();
    if opts.shuffle_features {
        // Fixed seed: the column permutation is stable across calls.
        column_order.shuffle(&mut StdRng::seed_from_u64(0));
    }

    row_order
        .iter()
        .map(|&row_idx| {
            let row = configs.row(row_idx);
            let fields: Vec<String> = column_order
                .iter()
                .enumerate()
                .filter_map(|(position, &col_idx)| {
                    let name = &configs.columns()[col_idx];
                    let constraint = ctx.constraint(name)?;
                    let label = if opts.use_feature_semantics {
                        name.clone()
                    } else {
                        format!("X{}", position + 1)
                    };
                    Some(format!(
                        "{label}: {}",
                        render_value(constraint, opts.warped, row[col_idx])
                    ))
                })
                .collect();
            FewShotExample {
                query: format!("## {} ##", fields.join(", ")),
                answer: fvals.map(|f| format!("{:.6}", f[row_idx])),
            }
        })
        .collect()
}
