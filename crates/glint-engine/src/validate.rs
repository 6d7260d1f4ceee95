//! Candidate validation: no-repeat filtering, constraint checks, and
//! survivor deduplication.

use std::collections::HashMap;
use tracing::debug;

use glint_types::{Candidate, ParamConstraint, ParamDomain, ParamKind, ParamTransform, TaskContext};

/// Absolute tolerance for matching ordinal values.
const ORDINAL_TOLERANCE: f64 = 1e-2;

fn round_to(value: f64, precision: u32) -> f64 {
    let factor = 10f64.powi(precision as i32);
    (value * factor).round() / factor
}

/// A candidate rounded to fixed precision and flattened into a sorted,
/// comparable key.
fn rounded_key(candidate: &HashMap<String, f64>, precision: u32) -> Vec<(String, f64)> {
    let mut key: Vec<(String, f64)> = candidate
        .iter()
        .map(|(name, value)| (name.clone(), round_to(*value, precision)))
        .collect();
    key.sort_by(|a, b| a.0.cmp(&b.0));
    key
}

fn value_satisfies(value: f64, constraint: &ParamConstraint, warped: bool) -> bool {
    match (&constraint.kind, &constraint.domain) {
        (ParamKind::Int, ParamDomain::Bounds { low, high }) => {
            if warped && constraint.transform == ParamTransform::Log {
                let (low, high) = (low.log10(), high.log10());
                low <= value && value <= high
            } else {
                *low <= value && value <= *high && value == value.trunc()
            }
        }
        (ParamKind::Float, ParamDomain::Bounds { low, high }) => {
            if warped && constraint.transform == ParamTransform::Log {
                let (low, high) = (low.log10(), high.log10());
                low <= value && value <= high
            } else {
                *low <= value && value <= *high
            }
        }
        (ParamKind::Ordinal, ParamDomain::Values(allowed)) => allowed
            .iter()
            .any(|&x| (value - x).abs() <= ORDINAL_TOLERANCE),
        // Kind/domain mismatch can only come from a hand-built constraint;
        // nothing satisfies it.
        _ => false,
    }
}

/// Filter raw parsed candidates against the observation history and the
/// task's constraints.
///
/// 1. Drop any candidate whose values, rounded to `precision` decimals,
///    exactly match a rounded observed configuration (no-repeat
///    invariant).
/// 2. Require the candidate to carry exactly the task's hyperparameters,
///    each value satisfying its constraint (log-space bounds when the
///    constraint is log-transformed and `warped` is set; ordinal
///    membership within an absolute tolerance).
/// 3. Drop duplicate candidates among the survivors, first occurrence
///    wins.
pub fn filter_candidates(
    ctx: &TaskContext,
    observed: &[HashMap<String, f64>],
    candidates: Vec<Candidate>,
    precision: u32,
    warped: bool,
) -> Vec<Candidate> {
    let rounded_observed: Vec<Vec<(String, f64)>> = observed
        .iter()
        .map(|row| rounded_key(row, precision))
        .collect();

    let mut survivors: Vec<Candidate> = Vec::new();
    let mut seen: Vec<Vec<(String, f64)>> = Vec::new();

    for candidate in candidates {
        let key = rounded_key(&candidate, precision);
        if rounded_observed.contains(&key) {
            debug!("dropping candidate equal to an observed configuration");
            continue;
        }

        let complete = candidate.len() == ctx.len()
            && candidate.iter().all(|(name, value)| {
                ctx.constraint(name)
                    .is_some_and(|c| value_satisfies(*value, c, warped))
            });
        if !complete {
            debug!("dropping candidate violating constraints");
            continue;
        }

        if seen.contains(&key) {
            continue;
        }
        seen.push(key);
        survivors.push(candidate);
    }
    survivors
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ctx() -> TaskContext {
        TaskContext::new()
            .add_int("n_estimators", 50, 300)
            .add_float("ccp_alpha", 0.0, 0.01)
    }

    fn candidate(n: f64, alpha: f64) -> Candidate {
        let mut c = Candidate::new();
        c.insert("n_estimators".into(), n);
        c.insert("ccp_alpha".into(), alpha);
        c
    }

    #[test]
    fn observed_duplicates_are_dropped() {
        let observed = vec![candidate(100.0, 0.002)];
        let survivors = filter_candidates(
            &ctx(),
            &observed,
            vec![candidate(100.0, 0.002), candidate(120.0, 0.003)],
            6,
            false,
        );
        assert_eq!(survivors.len(), 1);
        assert_eq!(survivors[0]["n_estimators"], 120.0);
    }

    #[test]
    fn rounding_bound_controls_repeat_detection() {
        let observed = vec![candidate(100.0, 0.0020001)];
        // At 6 decimals the two alphas collapse to the same value.
        let near = vec![candidate(100.0, 0.0020002)];
        assert!(filter_candidates(&ctx(), &observed, near.clone(), 6, false).is_empty());
        // At 8 decimals they stay distinct.
        assert_eq!(filter_candidates(&ctx(), &observed, near, 8, false).len(), 1);
    }

    #[test]
    fn out_of_range_candidates_are_dropped() {
        let survivors = filter_candidates(
            &ctx(),
            &[],
            vec![
                candidate(400.0, 0.003), // int above bounds
                candidate(120.5, 0.003), // non-integral int
                candidate(120.0, 0.05),  // float above bounds
                candidate(120.0, 0.003), // valid
            ],
            6,
            false,
        );
        assert_eq!(survivors.len(), 1);
        assert_eq!(survivors[0]["n_estimators"], 120.0);
    }

    #[test]
    fn unknown_or_missing_keys_reject_candidate() {
        let mut extra = candidate(120.0, 0.003);
        extra.insert("mystery".into(), 1.0);

        let mut missing = Candidate::new();
        missing.insert("n_estimators".into(), 120.0);

        let survivors = filter_candidates(&ctx(), &[], vec![extra, missing], 6, false);
        assert!(survivors.is_empty());
    }

    #[test]
    fn log_space_bounds_when_warped() {
        let ctx = TaskContext::new().add_log_float("lr", 1e-4, 1e-1);
        let mut warped_candidate = Candidate::new();
        // log10(1e-2) = -2, inside [-4, -1]
        warped_candidate.insert("lr".into(), -2.0);

        let survivors = filter_candidates(&ctx, &[], vec![warped_candidate.clone()], 6, true);
        assert_eq!(survivors.len(), 1);

        // The same value is far outside the natural-unit bounds.
        let survivors = filter_candidates(&ctx, &[], vec![warped_candidate], 6, false);
        assert!(survivors.is_empty());
    }

    #[test]
    fn ordinal_tolerance() {
        let ctx = TaskContext::new().add_ordinal("subsample", vec![0.5, 0.75, 1.0]);
        let mut close = Candidate::new();
        close.insert("subsample".into(), 0.745);
        let mut far = Candidate::new();
        far.insert("subsample".into(), 0.70);

        let survivors = filter_candidates(&ctx, &[], vec![close, far], 6, false);
        assert_eq!(survivors.len(), 1);
        assert!((survivors[0]["subsample"] - 0.745).abs() < 1e-12);
    }

    #[test]
    fn survivor_duplicates_collapse() {
        let survivors = filter_candidates(
            &ctx(),
            &[],
            vec![
                candidate(120.0, 0.003),
                candidate(120.0, 0.003),
                candidate(130.0, 0.004),
            ],
            6,
            false,
        );
        assert_eq!(survivors.len(), 2);
    }
}
