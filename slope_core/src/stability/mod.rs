//! # Stability Analysis
//!
//! The limit-equilibrium pipeline: intersect a trial circle with the
//! stratigraphy, decompose the sliding mass into slices, iterate Bishop's
//! simplified method for the factor of safety, and file the result in the
//! registry. [`StabilityAnalysis`] drives the pipeline for single circles
//! and for grid searches over many trial circles.
//!
//! ## Example
//!
//! ```rust
//! use slope_core::model::{Polyline, SoilModel, SoilProperties};
//! use slope_core::stability::{StabilityAnalysis, TrialCircle};
//!
//! let mut model = SoilModel::new();
//! model.add_layer(
//!     Polyline::new(vec![-50.0, 0.0, 20.0, 70.0], vec![0.0, 0.0, 10.0, 10.0]).unwrap(),
//!     SoilProperties { gamma: 19.0, a: 10.0, phi_deg: 29.0, cu: 32.0, undrained: true },
//! );
//!
//! let mut analysis = StabilityAnalysis::new(&model);
//! let status = analysis.analyze_circle(
//!     TrialCircle { x_center: 9.03, y_center: 20.09, radius: 25.09 },
//!     true,
//! );
//! println!("{:?}", status);
//! ```

pub mod intersect;
pub mod registry;
pub mod search;
pub mod solver;

use serde::{Deserialize, Serialize};

use crate::errors::StabilityError;
use crate::model::SoilModel;
use crate::slices::{build_lamellas, Lamella};

pub use registry::{RankedSurface, SurfaceRegistry};
pub use search::{
    GridIncrements, GridSearchReport, NoProgress, ProgressReporter, SearchBox, TrialRecord,
    TrialStatus,
};
pub use solver::{solve_bishop, SolverOutcome};

/// A candidate circular slip surface. Also the registry key: two trials
/// with bit-identical center and radius are the same trial.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TrialCircle {
    pub x_center: f64,
    pub y_center: f64,
    pub radius: f64,
}

/// Hashable bit-exact registry key of a trial circle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CircleKey([u64; 3]);

impl TrialCircle {
    pub fn key(&self) -> CircleKey {
        CircleKey([
            self.x_center.to_bits(),
            self.y_center.to_bits(),
            self.radius.to_bits(),
        ])
    }

    /// y on the lower half of the circle at `x`, clamped to the center
    /// height at the circle's horizontal extremes.
    pub fn lower_y_at(&self, x: f64) -> f64 {
        let dx = x - self.x_center;
        self.y_center - (self.radius * self.radius - dx * dx).max(0.0).sqrt()
    }

    fn validate(&self) -> Result<(), StabilityError> {
        if !self.x_center.is_finite() || !self.y_center.is_finite() || !self.radius.is_finite() {
            return Err(StabilityError::invalid_input(
                "circle",
                format!("({}, {}, {})", self.x_center, self.y_center, self.radius),
                "Circle parameters must be finite",
            ));
        }
        if self.radius <= 0.0 {
            return Err(StabilityError::invalid_input(
                "radius",
                self.radius.to_string(),
                "Radius must be positive",
            ));
        }
        Ok(())
    }
}

/// One computed failure surface: the portion of a trial circle beneath the
/// terrain, its slices, and the solved factor of safety.
///
/// `xs`/`ys` are the strictly increasing slice boundaries on the circle.
/// `undrained` is set when any slice's governing base layer is undrained.
/// `converged` qualifies the factor of safety; a false value means the
/// solver hit its iteration cap and the factor is low-confidence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FailureSurface {
    pub circle: TrialCircle,
    pub xs: Vec<f64>,
    pub ys: Vec<f64>,
    pub lamellas: Vec<Lamella>,
    pub factor_of_safety: Option<f64>,
    pub converged: bool,
    pub iterations: usize,
    pub undrained: bool,
}

/// Tuning knobs of the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AnalysisSettings {
    /// Minimum number of slice boundaries per failure surface; sparse
    /// surfaces are densified along the arc up to this count
    pub min_slice_count: usize,
    /// Convergence tolerance on the factor-of-safety update
    pub tolerance: f64,
    /// Iteration cap of the fixed-point solver
    pub max_iterations: usize,
}

impl Default for AnalysisSettings {
    fn default() -> Self {
        Self {
            min_slice_count: 30,
            tolerance: 1e-4,
            max_iterations: 100,
        }
    }
}

/// Pipeline driver bound to one read-only soil model.
#[derive(Debug)]
pub struct StabilityAnalysis<'a> {
    model: &'a SoilModel,
    settings: AnalysisSettings,
    registry: SurfaceRegistry,
}

impl<'a> StabilityAnalysis<'a> {
    pub fn new(model: &'a SoilModel) -> Self {
        Self::with_settings(model, AnalysisSettings::default())
    }

    pub fn with_settings(model: &'a SoilModel, settings: AnalysisSettings) -> Self {
        Self {
            model,
            settings,
            registry: SurfaceRegistry::new(),
        }
    }

    pub fn settings(&self) -> &AnalysisSettings {
        &self.settings
    }

    pub fn registry(&self) -> &SurfaceRegistry {
        &self.registry
    }

    /// Run the full pipeline for one trial circle.
    ///
    /// Never panics or aborts a surrounding search: every failure comes back
    /// as a [`TrialStatus`], and only solved surfaces enter the registry.
    /// `clear_previous` empties the registry first (manual queries often
    /// want a fresh slate; grid searches never do).
    pub fn analyze_circle(&mut self, circle: TrialCircle, clear_previous: bool) -> TrialStatus {
        if clear_previous {
            self.registry.clear();
        }
        if let Err(error) = circle.validate() {
            return TrialStatus::Failed { error };
        }

        let traced =
            match intersect::trace_failure_surface(self.model, &circle, self.settings.min_slice_count)
            {
                Ok(Some(traced)) => traced,
                Ok(None) => return TrialStatus::NoSurface,
                Err(error) => return TrialStatus::Failed { error },
            };
        let (xs, ys) = traced;

        let lamellas = match build_lamellas(self.model, &xs, &ys) {
            Ok(lamellas) => lamellas,
            Err(error) => return TrialStatus::Failed { error },
        };
        let undrained = lamellas.iter().any(|l| l.strength.undrained);

        let outcome = match solver::solve_bishop(&circle, &lamellas, &self.settings) {
            Ok(outcome) => outcome,
            Err(error) => return TrialStatus::Failed { error },
        };

        self.registry.insert(FailureSurface {
            circle,
            xs,
            ys,
            lamellas,
            factor_of_safety: Some(outcome.factor_of_safety),
            converged: outcome.converged,
            iterations: outcome.iterations,
            undrained,
        });

        TrialStatus::Computed {
            factor_of_safety: outcome.factor_of_safety,
            converged: outcome.converged,
        }
    }

    /// Sweep trial circles over the search grid and rank the results.
    ///
    /// Centers step linearly across the box; the radius of each trial is
    /// y_center minus a tangent elevation stepped from lower to upper.
    /// Trials run independently; a failed trial is recorded and the sweep
    /// continues.
    pub fn grid_search(
        &mut self,
        search: &SearchBox,
        increments: &GridIncrements,
        clear_previous: bool,
        progress: &mut dyn ProgressReporter,
    ) -> GridSearchReport {
        if clear_previous {
            self.registry.clear();
        }

        let (n_x, n_y, n_r) = increments.clamped();
        let x_incr = (search.x_to - search.x_from) / (n_x - 1) as f64;
        let y_incr = (search.y_to - search.y_from) / (n_y - 1) as f64;
        let t_incr = (search.upper_tangent - search.lower_tangent) / (n_r - 1) as f64;

        let total = n_x * n_y * n_r;
        let mut circles = Vec::with_capacity(total);
        for i in 0..n_x {
            let x_center = search.x_from + i as f64 * x_incr;
            for j in 0..n_y {
                let y_center = search.y_from + j as f64 * y_incr;
                for k in 0..n_r {
                    let radius = y_center - (search.lower_tangent + k as f64 * t_incr);
                    circles.push(TrialCircle {
                        x_center,
                        y_center,
                        radius,
                    });
                }
            }
        }

        progress.on_begin(total);
        let mut trials = Vec::with_capacity(total);
        for (done, circle) in circles.into_iter().enumerate() {
            let status = self.analyze_circle(circle, false);
            trials.push(TrialRecord { circle, status });
            progress.on_trial(done + 1, total);
        }
        progress.on_finish();

        let (outline_x, outline_y) = search.outline();
        GridSearchReport {
            outline_x,
            outline_y,
            trials,
            ranking: self.registry.ranking(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Polyline, SoilProperties};

    fn reference_model(undrained: bool) -> SoilModel {
        // Slope height 10, crest length 20, bedrock depth 10; gamma 19,
        // a 10, phi 29, cu 32.
        let mut model = SoilModel::new();
        model.add_layer(
            Polyline::new(vec![-50.0, 0.0, 20.0, 70.0], vec![0.0, 0.0, 10.0, 10.0]).unwrap(),
            SoilProperties {
                gamma: 19.0,
                a: 10.0,
                phi_deg: 29.0,
                cu: 32.0,
                undrained,
            },
        );
        model.set_bedrock(Polyline::new(vec![-50.0, 70.0], vec![-10.0, -10.0]).unwrap());
        model
    }

    fn reference_circle() -> TrialCircle {
        TrialCircle {
            x_center: 9.03,
            y_center: 20.09,
            radius: 25.09,
        }
    }

    #[test]
    fn test_reference_case_undrained() {
        let model = reference_model(true);
        let mut analysis = StabilityAnalysis::new(&model);
        let status = analysis.analyze_circle(reference_circle(), true);

        let TrialStatus::Computed {
            factor_of_safety,
            converged,
        } = status
        else {
            panic!("expected a computed surface, got {:?}", status);
        };
        assert!(converged);
        assert!(
            (factor_of_safety - 1.063).abs() < 0.002,
            "FoS = {}",
            factor_of_safety
        );

        let surface = analysis.registry().get(&reference_circle()).unwrap();
        assert!(surface.undrained);
        assert!(surface.xs.len() >= 30);
        assert!(surface.xs.windows(2).all(|w| w[1] > w[0]));
        assert_eq!(surface.lamellas.len(), surface.xs.len() - 1);
    }

    #[test]
    fn test_reference_case_drained_with_groundwater() {
        let mut model = reference_model(false);
        model.set_groundwater(
            Polyline::new(
                vec![
                    -12.1576, 0.0, 2.5, 7.5, 12.5, 17.5, 23.0, 28.0, 30.3490, 39.5625,
                ],
                vec![
                    0.0, 0.0, 0.2474, 0.6829, 1.0396, 1.3177, 1.5331, 1.6468, 1.6733, 1.7433,
                ],
            )
            .unwrap(),
        );

        let mut analysis = StabilityAnalysis::new(&model);
        let status = analysis.analyze_circle(reference_circle(), true);

        let TrialStatus::Computed {
            factor_of_safety,
            converged,
        } = status
        else {
            panic!("expected a computed surface, got {:?}", status);
        };
        assert!(converged);
        assert!(
            (factor_of_safety - 1.957).abs() < 0.01,
            "FoS = {}",
            factor_of_safety
        );
        assert!(!analysis.registry().get(&reference_circle()).unwrap().undrained);
    }

    #[test]
    fn test_circle_above_terrain_reports_no_surface() {
        let model = reference_model(true);
        let mut analysis = StabilityAnalysis::new(&model);
        let status = analysis.analyze_circle(
            TrialCircle {
                x_center: 10.0,
                y_center: 50.0,
                radius: 5.0,
            },
            true,
        );
        assert_eq!(status, TrialStatus::NoSurface);
        assert!(analysis.registry().is_empty());
    }

    #[test]
    fn test_invalid_circle_reports_failure() {
        let model = reference_model(true);
        let mut analysis = StabilityAnalysis::new(&model);
        let status = analysis.analyze_circle(
            TrialCircle {
                x_center: 10.0,
                y_center: 20.0,
                radius: -1.0,
            },
            true,
        );
        assert!(matches!(status, TrialStatus::Failed { .. }));
    }

    #[test]
    fn test_clear_previous_flag() {
        let model = reference_model(true);
        let mut analysis = StabilityAnalysis::new(&model);
        analysis.analyze_circle(reference_circle(), false);
        assert_eq!(analysis.registry().len(), 1);

        // Second circle without clearing keeps both
        analysis.analyze_circle(
            TrialCircle {
                x_center: 11.57,
                y_center: 30.0,
                radius: 33.0,
            },
            false,
        );
        assert_eq!(analysis.registry().len(), 2);

        // Clearing leaves only the fresh result
        analysis.analyze_circle(reference_circle(), true);
        assert_eq!(analysis.registry().len(), 1);
    }

    fn reference_search() -> (SearchBox, GridIncrements) {
        (
            SearchBox {
                x_from: -1.0,
                x_to: 21.0,
                y_from: 11.0,
                y_to: 36.0,
                upper_tangent: -0.5,
                lower_tangent: -10.0,
            },
            GridIncrements {
                n_x: 3,
                n_y: 3,
                n_r: 2,
            },
        )
    }

    #[test]
    fn test_grid_search_runs_all_trials() {
        let model = reference_model(true);
        let mut analysis = StabilityAnalysis::new(&model);
        let (search, increments) = reference_search();
        let report = analysis.grid_search(&search, &increments, true, &mut NoProgress);

        assert_eq!(report.trials.len(), 18);
        assert_eq!(report.ranking.len(), analysis.registry().len());
        assert!(report.computed_count() > 0);

        // Rank 0 is the critical surface
        let critical = analysis.registry().critical().unwrap();
        assert_eq!(report.ranking[0].circle, critical.circle);
        assert_eq!(
            Some(report.ranking[0].factor_of_safety),
            critical.factor_of_safety
        );
    }

    #[test]
    fn test_grid_search_is_deterministic() {
        let model = reference_model(true);
        let (search, increments) = reference_search();

        let mut first = StabilityAnalysis::new(&model);
        let report_a = first.grid_search(&search, &increments, true, &mut NoProgress);
        let mut second = StabilityAnalysis::new(&model);
        let report_b = second.grid_search(&search, &increments, true, &mut NoProgress);

        assert_eq!(report_a.trials, report_b.trials);
        assert_eq!(report_a.ranking, report_b.ranking);
    }

    #[test]
    fn test_grid_search_continues_past_failed_trials() {
        let model = reference_model(true);
        let mut analysis = StabilityAnalysis::new(&model);
        // Upper tangent above the lowest centers: some trials get a
        // non-positive radius and fail, the rest still compute.
        let search = SearchBox {
            x_from: -1.0,
            x_to: 21.0,
            y_from: 5.0,
            y_to: 30.0,
            upper_tangent: 8.0,
            lower_tangent: -10.0,
        };
        let increments = GridIncrements {
            n_x: 2,
            n_y: 2,
            n_r: 2,
        };
        let report = analysis.grid_search(&search, &increments, true, &mut NoProgress);

        assert_eq!(report.trials.len(), 8);
        assert!(report
            .trials
            .iter()
            .any(|t| matches!(t.status, TrialStatus::Failed { .. })));
        assert!(report.computed_count() > 0);
    }

    #[derive(Default)]
    struct CountingReporter {
        begun_with: Option<usize>,
        trials_seen: usize,
        finished: bool,
    }

    impl ProgressReporter for CountingReporter {
        fn on_begin(&mut self, total: usize) {
            self.begun_with = Some(total);
        }
        fn on_trial(&mut self, completed: usize, total: usize) {
            self.trials_seen = completed;
            assert!(completed <= total);
        }
        fn on_finish(&mut self) {
            self.finished = true;
        }
    }

    #[test]
    fn test_progress_reporter_sees_every_trial() {
        let model = reference_model(true);
        let mut analysis = StabilityAnalysis::new(&model);
        let (search, increments) = reference_search();

        let mut reporter = CountingReporter::default();
        analysis.grid_search(&search, &increments, true, &mut reporter);

        assert_eq!(reporter.begun_with, Some(18));
        assert_eq!(reporter.trials_seen, 18);
        assert!(reporter.finished);
    }

    /// Equality up to one unit in the last place, tolerating float-parse
    /// rounding differences across serde_json builds.
    fn within_one_ulp(a: f64, b: f64) -> bool {
        (a.to_bits() as i64).abs_diff(b.to_bits() as i64) <= 1
    }

    #[test]
    fn test_surface_record_serializes() {
        let model = reference_model(true);
        let mut analysis = StabilityAnalysis::new(&model);
        analysis.analyze_circle(reference_circle(), true);

        let surface = analysis.registry().get(&reference_circle()).unwrap();
        let json = serde_json::to_string(surface).unwrap();
        let roundtrip: FailureSurface = serde_json::from_str(&json).unwrap();

        assert_eq!(roundtrip.converged, surface.converged);
        assert_eq!(roundtrip.iterations, surface.iterations);
        assert_eq!(roundtrip.undrained, surface.undrained);
        assert_eq!(roundtrip.lamellas.len(), surface.lamellas.len());
        assert!(within_one_ulp(
            roundtrip.factor_of_safety.unwrap(),
            surface.factor_of_safety.unwrap()
        ));
        assert_eq!(roundtrip.xs.len(), surface.xs.len());
        for (a, b) in roundtrip.xs.iter().zip(surface.xs.iter()) {
            assert!(within_one_ulp(*a, *b));
        }
        for (a, b) in roundtrip.ys.iter().zip(surface.ys.iter()) {
            assert!(within_one_ulp(*a, *b));
        }

        // Each slice exposes a closed outline polygon for display
        let (ox, oy) = surface.lamellas[0].outline();
        assert_eq!(ox.len(), 5);
        assert_eq!(ox.first(), ox.last());
        assert_eq!(oy.first(), oy.last());
    }
}
