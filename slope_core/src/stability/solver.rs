//! # Factor-of-Safety Solver
//!
//! Bishop's simplified method: moment equilibrium about the circle center,
//! solved by fixed-point iteration because the drained resisting force of
//! each slice depends on the factor of safety through m_alpha.
//!
//! The iteration always terminates: either the update falls below the
//! tolerance or the iteration cap is reached. Hitting the cap is not an
//! error; the last value is returned with `converged = false` and callers
//! must treat it as low-confidence rather than silently trusting it.

use serde::{Deserialize, Serialize};

use crate::errors::{StabilityError, StabilityResult};
use crate::slices::Lamella;
use crate::stability::{AnalysisSettings, TrialCircle};

/// Result of one factor-of-safety iteration run.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SolverOutcome {
    pub factor_of_safety: f64,
    /// False when the iteration cap was hit before the update settled
    pub converged: bool,
    pub iterations: usize,
}

/// Iterate F_{k+1} = r * sum(T_i(F_k)) / sum(W_i * (x_ci - cx)), F_0 = 1.
///
/// The driving-moment sum is independent of F and computed once; a
/// near-zero sum means the safety factor is undefined (a mass balanced
/// around the center drives nothing), as does a non-finite update.
pub fn solve_bishop(
    circle: &TrialCircle,
    lamellas: &[Lamella],
    settings: &AnalysisSettings,
) -> StabilityResult<SolverOutcome> {
    if lamellas.is_empty() {
        return Err(StabilityError::undefined_safety_factor(
            "no slices to balance",
        ));
    }

    let driving: f64 = lamellas
        .iter()
        .map(|l| l.weight * (l.x_centroid - circle.x_center))
        .sum();
    if driving.abs() < 1e-9 {
        return Err(StabilityError::undefined_safety_factor(
            "driving moment sum is zero",
        ));
    }

    let mut f: f64 = 1.0;
    let mut f_prev: f64 = 0.0;
    let mut iterations = 0;

    while (f - f_prev).abs() > settings.tolerance {
        f_prev = f;
        let resisting: f64 = lamellas.iter().map(|l| l.shear_force(f_prev)).sum();
        f = circle.radius * resisting / driving;
        if !f.is_finite() {
            return Err(StabilityError::undefined_safety_factor(
                "iteration produced a non-finite value",
            ));
        }
        iterations += 1;
        if iterations >= settings.max_iterations {
            break;
        }
    }

    Ok(SolverOutcome {
        factor_of_safety: f,
        converged: (f - f_prev).abs() <= settings.tolerance,
        iterations,
    })
}
