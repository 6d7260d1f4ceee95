//! Desired-performance target computation.

use glint_types::Direction;
use rand::Rng;
use tracing::{debug, warn};

/// Descending ladder of exploration parameters tried when the initial
/// target falls outside the safe numeric band.
const ALPHA_LADDER: [f64; 5] = [0.1, 1e-2, 1e-3, 1e-4, 1e-5];

/// Targets at or below this are degenerate for minimization (zero or
/// negative values are meaningless to request from the backend).
const MIN_TARGET: f64 = 1e-5;
/// Targets at or above this are degenerate for maximization.
const MAX_TARGET: f64 = 1.0 - 1e-4;

const MAX_ADJUST_ITERATIONS: usize = 10;

/// Target statistics threaded explicitly through the acquisition call
/// chain: the (possibly shrunk) exploration parameter, the extreme
/// observed values under the optimization direction, and the desired
/// performance value the prompts will ask for.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TargetContext {
    pub alpha: f64,
    pub best: f64,
    pub worst: f64,
    pub desired: f64,
}

impl TargetContext {
    /// The target value to place in one prompt variant. With jitter
    /// enabled, draws uniformly between the desired value and the best
    /// observed value so repeated variants do not all chase the identical
    /// literal number. Deliberately unseeded.
    pub fn jittered(&self, jitter: bool) -> f64 {
        if !jitter {
            return self.desired;
        }
        let low = self.desired.min(self.best);
        let high = self.desired.max(self.best);
        if low == high {
            return self.desired;
        }
        rand::rng().random_range(low..high)
    }
}

/// Derive the desired performance value from the observation history.
///
/// The initial target sits `alpha · range` beyond the best observation in
/// the improving direction. If that lands outside the safe band, `alpha`
/// is shrunk through [`ALPHA_LADDER`] until the target is usable; when no
/// smaller ladder value remains the target is clamped near the best
/// observation instead.
///
/// A non-positive `alpha` is silently replaced with `1e-3`.
pub fn compute_target(fvals: &[f64], alpha: f64, direction: Direction) -> TargetContext {
    debug_assert!(!fvals.is_empty(), "caller must reject empty observations");

    let mut alpha = if alpha <= 0.0 { 1e-3 } else { alpha.abs() };

    let (best, worst) = match direction {
        Direction::Minimize => (
            fvals.iter().copied().fold(f64::INFINITY, f64::min),
            fvals.iter().copied().fold(f64::NEG_INFINITY, f64::max),
        ),
        Direction::Maximize => (
            fvals.iter().copied().fold(f64::NEG_INFINITY, f64::max),
            fvals.iter().copied().fold(f64::INFINITY, f64::min),
        ),
    };
    let range = (worst - best).abs();

    let initial = |alpha: f64| match direction {
        Direction::Minimize => best - alpha * range,
        Direction::Maximize => best + alpha * range,
    };
    let out_of_band = |desired: f64| match direction {
        Direction::Minimize => desired <= MIN_TARGET,
        Direction::Maximize => desired >= MAX_TARGET,
    };

    let mut desired = initial(alpha);
    let mut iteration = 0;
    while out_of_band(desired) && iteration < MAX_ADJUST_ITERATIONS {
        match ALPHA_LADDER.iter().find(|&&candidate| candidate < alpha) {
            Some(&candidate) => {
                alpha = candidate;
                desired = initial(alpha);
            }
            None => {
                // Ladder exhausted: clamp near the best observation.
                desired = match direction {
                    Direction::Minimize => MIN_TARGET.max(best * 0.9),
                    Direction::Maximize => MAX_TARGET.min(best * 1.05),
                };
                warn!(
                    ?direction,
                    best, desired, "cannot shrink alpha further; clamping target"
                );
                break;
            }
        }
        iteration += 1;
    }

    debug!(
        ?direction,
        best, worst, range, alpha, desired, "computed desired performance target"
    );

    TargetContext {
        alpha,
        best,
        worst,
        desired,
    }
}
