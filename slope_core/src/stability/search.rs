//! # Grid-Search Driver
//!
//! Configuration and reporting types for sweeping trial circles over a 3-D
//! parameter grid: x-center, y-center, and a depth tangent the radius is
//! derived from (radius = y_center - tangent).
//!
//! Progress goes through the [`ProgressReporter`] trait so a caller can hook
//! up a terminal bar, a GUI channel, or nothing at all; the computation loop
//! itself stays free of display code. The driver lives on
//! [`StabilityAnalysis::grid_search`](crate::stability::StabilityAnalysis::grid_search).

use serde::{Deserialize, Serialize};

use crate::errors::StabilityError;
use crate::stability::registry::RankedSurface;
use crate::stability::TrialCircle;

/// Search box: center bounds plus the tangent range bounding circle depth.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SearchBox {
    pub x_from: f64,
    pub x_to: f64,
    pub y_from: f64,
    pub y_to: f64,
    /// Shallowest tangent elevation (largest allowed circle bottom)
    pub upper_tangent: f64,
    /// Deepest tangent elevation
    pub lower_tangent: f64,
}

impl SearchBox {
    /// Closed rectangle polyline of the center grid, for display alongside
    /// the ranked surfaces.
    pub fn outline(&self) -> (Vec<f64>, Vec<f64>) {
        (
            vec![self.x_from, self.x_to, self.x_to, self.x_from, self.x_from],
            vec![self.y_from, self.y_from, self.y_to, self.y_to, self.y_from],
        )
    }
}

/// Grid resolution per axis. Each count is clamped to at least 2 so every
/// range keeps both of its endpoints.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GridIncrements {
    pub n_x: usize,
    pub n_y: usize,
    pub n_r: usize,
}

impl GridIncrements {
    pub(crate) fn clamped(&self) -> (usize, usize, usize) {
        (self.n_x.max(2), self.n_y.max(2), self.n_r.max(2))
    }

    pub fn total_trials(&self) -> usize {
        let (n_x, n_y, n_r) = self.clamped();
        n_x * n_y * n_r
    }
}

/// Injectable progress sink for long-running searches.
///
/// All methods default to no-ops, so implementors override only what they
/// display.
pub trait ProgressReporter {
    fn on_begin(&mut self, _total: usize) {}
    fn on_trial(&mut self, _completed: usize, _total: usize) {}
    fn on_finish(&mut self) {}
}

/// Reporter that ignores everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoProgress;

impl ProgressReporter for NoProgress {}

/// Outcome of one trial circle.
///
/// Failures are local: a failed trial is recorded here and the search moves
/// on to the next circle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", content = "details")]
pub enum TrialStatus {
    /// Surface found and solved
    Computed {
        factor_of_safety: f64,
        converged: bool,
    },
    /// The circle does not penetrate the terrain
    NoSurface,
    /// Geometry or solver failure for this circle
    Failed { error: StabilityError },
}

/// Per-trial record of a grid search.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrialRecord {
    pub circle: TrialCircle,
    pub status: TrialStatus,
}

/// Aggregate result of a grid search: the search-box outline for display,
/// every trial's status, and the registry ranking after all trials ran.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GridSearchReport {
    pub outline_x: Vec<f64>,
    pub outline_y: Vec<f64>,
    pub trials: Vec<TrialRecord>,
    pub ranking: Vec<RankedSurface>,
}

impl GridSearchReport {
    /// Count of trials that produced a solved surface.
    pub fn computed_count(&self) -> usize {
        self.trials
            .iter()
            .filter(|t| matches!(t.status, TrialStatus::Computed { .. }))
            .count()
    }
}
