//! # Error Types
//!
//! Structured error types for slope_core. Every failure carries enough
//! context to identify the offending trial circle or slice programmatically,
//! so a grid search can log a trial as failed and keep going.
//!
//! Two conditions deliberately are *not* errors (see the stability module):
//!
//! - A trial circle that never penetrates the terrain produces "no surface".
//! - A solver that exhausts its iteration budget still returns the last
//!   factor of safety, flagged as not converged.
//!
//! ## Example
//!
//! ```rust
//! use slope_core::errors::{StabilityError, StabilityResult};
//!
//! fn validate_radius(radius: f64) -> StabilityResult<()> {
//!     if radius <= 0.0 {
//!         return Err(StabilityError::invalid_input(
//!             "radius",
//!             radius.to_string(),
//!             "Radius must be positive",
//!         ));
//!     }
//!     Ok(())
//! }
//! ```

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Result type alias for slope_core operations
pub type StabilityResult<T> = Result<T, StabilityError>;

/// Structured error type for stability calculations.
#[derive(Error, Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", content = "details")]
pub enum StabilityError {
    /// An input value is invalid (out of range, non-finite, etc.)
    #[error("Invalid input for '{field}': {value} - {reason}")]
    InvalidInput {
        field: String,
        value: String,
        reason: String,
    },

    /// The soil model has no layers, so there is no terrain to intersect
    #[error("Soil model has no layers")]
    MissingTerrain,

    /// A slice could not be built (zero width, zero weight, base above
    /// terrain after breakpoint insertion, ...)
    #[error("Degenerate slice on [{x_left}, {x_right}]: {reason}")]
    DegenerateSlice {
        x_left: f64,
        x_right: f64,
        reason: String,
    },

    /// The factor-of-safety quotient is undefined (driving-moment sum near
    /// zero, or the iteration produced a non-finite value)
    #[error("Undefined safety factor: {reason}")]
    UndefinedSafetyFactor { reason: String },
}

impl StabilityError {
    /// Create an InvalidInput error
    pub fn invalid_input(
        field: impl Into<String>,
        value: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        StabilityError::InvalidInput {
            field: field.into(),
            value: value.into(),
            reason: reason.into(),
        }
    }

    /// Create a DegenerateSlice error
    pub fn degenerate_slice(x_left: f64, x_right: f64, reason: impl Into<String>) -> Self {
        StabilityError::DegenerateSlice {
            x_left,
            x_right,
            reason: reason.into(),
        }
    }

    /// Create an UndefinedSafetyFactor error
    pub fn undefined_safety_factor(reason: impl Into<String>) -> Self {
        StabilityError::UndefinedSafetyFactor {
            reason: reason.into(),
        }
    }

    /// Get a short error code for programmatic handling
    pub fn error_code(&self) -> &'static str {
        match self {
            StabilityError::InvalidInput { .. } => "INVALID_INPUT",
            StabilityError::MissingTerrain => "MISSING_TERRAIN",
            StabilityError::DegenerateSlice { .. } => "DEGENERATE_SLICE",
            StabilityError::UndefinedSafetyFactor { .. } => "UNDEFINED_SAFETY_FACTOR",
        }
    }
}
