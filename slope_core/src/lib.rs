//! # slope_core - Slope Stability Calculation Engine
//!
//! `slope_core` evaluates the stability of layered 2-D soil cross-sections
//! against sliding along circular failure surfaces, using Bishop's
//! simplified method of slices. A grid-search driver sweeps trial circles
//! over a parameter box to locate the critical (minimum factor-of-safety)
//! surface.
//!
//! ## Design Philosophy
//!
//! - **Model once, query many**: the soil model is immutable during
//!   analysis; every trial circle is computed fresh from it
//! - **JSON-First**: all inputs and results implement Serialize/Deserialize
//!   for storage, reporting, and rendering frontends
//! - **Rich Errors**: structured error types, not just strings
//! - **Failures stay local**: one bad trial circle never aborts a search,
//!   and a non-converged solve is flagged, not hidden
//!
//! ## Quick Start
//!
//! ```rust
//! use slope_core::model::{Polyline, SoilModel, SoilProperties};
//! use slope_core::stability::{
//!     GridIncrements, NoProgress, SearchBox, StabilityAnalysis,
//! };
//!
//! // Slope of height 10 rising over a 20 m run, undrained clay on bedrock
//! let mut model = SoilModel::new();
//! model.add_layer(
//!     Polyline::new(vec![-50.0, 0.0, 20.0, 70.0], vec![0.0, 0.0, 10.0, 10.0]).unwrap(),
//!     SoilProperties { gamma: 19.0, a: 10.0, phi_deg: 29.0, cu: 32.0, undrained: true },
//! );
//! model.set_bedrock(Polyline::new(vec![-50.0, 70.0], vec![-10.0, -10.0]).unwrap());
//!
//! // Sweep trial circles and pull out the critical surface
//! let mut analysis = StabilityAnalysis::new(&model);
//! let report = analysis.grid_search(
//!     &SearchBox {
//!         x_from: -1.0,
//!         x_to: 21.0,
//!         y_from: 11.0,
//!         y_to: 36.0,
//!         upper_tangent: -0.5,
//!         lower_tangent: -10.0,
//!     },
//!     &GridIncrements { n_x: 4, n_y: 4, n_r: 3 },
//!     true,
//!     &mut NoProgress,
//! );
//!
//! let critical = analysis.registry().critical().unwrap();
//! println!("critical FoS = {:?} at rank 0 of {}", critical.factor_of_safety, report.ranking.len());
//! ```
//!
//! ## Modules
//!
//! - [`model`] - Layered stratigraphy, groundwater and bedrock lines
//! - [`slices`] - Slice ("lamella") decomposition of the sliding mass
//! - [`stability`] - Intersection, solver, registry, and grid search
//! - [`errors`] - Structured error types

pub mod errors;
pub mod model;
pub mod slices;
pub mod stability;

// Re-export commonly used types at crate root for convenience
pub use errors::{StabilityError, StabilityResult};
pub use model::{Polyline, SoilModel, SoilProperties};
pub use stability::{
    AnalysisSettings, FailureSurface, StabilityAnalysis, TrialCircle, TrialStatus,
};
