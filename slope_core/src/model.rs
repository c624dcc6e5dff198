//! # Soil Model
//!
//! Layered 2-D cross-section geometry: an ordered stratigraphy of soil
//! layers, an optional groundwater line, and an optional bedrock line.
//!
//! ## Conventions
//!
//! - Every polyline runs left to right with strictly increasing x.
//! - Layers are ordered top to bottom and must not cross each other. This is
//!   a modelling precondition, not runtime-checked.
//! - Elevation lookups outside a polyline's horizontal extent extrapolate
//!   along the nearest boundary segment. Models should therefore extend past
//!   any trial circle of interest; the policy keeps queries total instead of
//!   failing at the edges.
//! - Bedrock is stored as a degenerate layer (near-zero unit weight,
//!   effectively infinite undrained strength). It takes part in intersection
//!   and containment queries as the deepest stratum, so trial surfaces that
//!   cut into rock pick up its strength and drop out of the critical ranking.
//!
//! The model is built once and is read-only during analysis.

use serde::{Deserialize, Serialize};

use crate::errors::{StabilityError, StabilityResult};

/// Default unit weight of water (kN/m3)
pub const GAMMA_WATER: f64 = 10.0;

/// Bedrock placeholder unit weight (kN/m3)
const BEDROCK_GAMMA: f64 = 0.01;

/// Bedrock placeholder undrained strength (kPa)
const BEDROCK_CU: f64 = 999_999.0;

/// Open polyline with strictly increasing x coordinates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Polyline {
    x: Vec<f64>,
    y: Vec<f64>,
}

impl Polyline {
    /// Build a polyline from parallel coordinate lists.
    ///
    /// Requires at least two vertices, finite coordinates, and strictly
    /// increasing x.
    pub fn new(x: Vec<f64>, y: Vec<f64>) -> StabilityResult<Self> {
        if x.len() != y.len() {
            return Err(StabilityError::invalid_input(
                "x/y",
                format!("{}/{}", x.len(), y.len()),
                "Coordinate lists must have equal length",
            ));
        }
        if x.len() < 2 {
            return Err(StabilityError::invalid_input(
                "x",
                x.len().to_string(),
                "Polyline needs at least two vertices",
            ));
        }
        if x.iter().chain(y.iter()).any(|v| !v.is_finite()) {
            return Err(StabilityError::invalid_input(
                "x/y",
                "non-finite".to_string(),
                "Coordinates must be finite",
            ));
        }
        if x.windows(2).any(|w| w[1] <= w[0]) {
            return Err(StabilityError::invalid_input(
                "x",
                format!("{:?}", x),
                "x coordinates must be strictly increasing",
            ));
        }
        Ok(Self { x, y })
    }

    /// Vertex x coordinates
    pub fn xs(&self) -> &[f64] {
        &self.x
    }

    /// Vertex y coordinates
    pub fn ys(&self) -> &[f64] {
        &self.y
    }

    /// Index of the segment containing `x`, clamped to the nearest boundary
    /// segment when `x` lies outside the defined range.
    fn segment_index(&self, x: f64) -> usize {
        if x <= self.x[0] {
            return 0;
        }
        for i in 0..self.x.len() - 1 {
            if self.x[i] <= x && x <= self.x[i + 1] {
                return i;
            }
        }
        self.x.len() - 2
    }

    /// Elevation at `x` by piecewise-linear interpolation.
    ///
    /// Outside the defined x-range the nearest boundary segment is
    /// extrapolated rather than returning an error.
    pub fn y_at(&self, x: f64) -> f64 {
        let i = self.segment_index(x);
        let (x1, x2) = (self.x[i], self.x[i + 1]);
        let (y1, y2) = (self.y[i], self.y[i + 1]);
        (y2 - y1) / (x2 - x1) * (x - x1) + y1
    }

    /// Indexes of vertices strictly between `x_from` and `x_to`. Breakpoint
    /// insertion and dip checks want interior vertices only; the interval
    /// endpoints are already boundaries in their own right.
    pub fn vertex_indexes_between(&self, x_from: f64, x_to: f64) -> Vec<usize> {
        self.x
            .iter()
            .enumerate()
            .filter(|(_, &x)| x_from < x && x < x_to)
            .map(|(i, _)| i)
            .collect()
    }
}

/// Material parameters of one soil layer.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SoilProperties {
    /// Unit weight (kN/m3)
    pub gamma: f64,
    /// Effective cohesion intercept (kPa)
    pub a: f64,
    /// Effective friction angle (degrees)
    pub phi_deg: f64,
    /// Undrained shear strength (kPa)
    pub cu: f64,
    /// Use undrained strength (cu) instead of effective-stress parameters
    pub undrained: bool,
}

impl SoilProperties {
    /// tan(phi) with phi given in degrees
    pub fn tan_phi(&self) -> f64 {
        self.phi_deg.to_radians().tan()
    }
}

/// One soil layer: the polyline of its top boundary plus material properties.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SoilLayer {
    pub line: Polyline,
    pub properties: SoilProperties,
}

/// Groundwater table polyline with the unit weight of water.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Groundwater {
    pub line: Polyline,
    pub gamma_w: f64,
}

/// Axis-aligned bounding box of all model polylines, maintained for
/// consumers that frame a view around the model.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
pub struct Bounds {
    pub x_min: f64,
    pub x_max: f64,
    pub y_min: f64,
    pub y_max: f64,
}

impl Bounds {
    fn grow(&mut self, line: &Polyline) {
        for &x in line.xs() {
            self.x_min = self.x_min.min(x);
            self.x_max = self.x_max.max(x);
        }
        for &y in line.ys() {
            self.y_min = self.y_min.min(y);
            self.y_max = self.y_max.max(y);
        }
    }
}

/// Layered soil cross-section.
///
/// Layers are held top to bottom; index 0 is the terrain surface. The
/// optional bedrock line is exposed as one extra stratum below the last
/// soil layer.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SoilModel {
    layers: Vec<SoilLayer>,
    groundwater: Option<Groundwater>,
    bedrock: Option<SoilLayer>,
    bounds: Bounds,
}

impl SoilModel {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a layer below the ones already present.
    pub fn add_layer(&mut self, line: Polyline, properties: SoilProperties) {
        self.bounds.grow(&line);
        self.layers.push(SoilLayer { line, properties });
    }

    /// Set the groundwater table with the default unit weight of water.
    pub fn set_groundwater(&mut self, line: Polyline) {
        self.bounds.grow(&line);
        self.groundwater = Some(Groundwater {
            line,
            gamma_w: GAMMA_WATER,
        });
    }

    /// Set the bedrock line. Modelled as a degenerate bottom stratum:
    /// negligible weight, effectively infinite undrained strength.
    pub fn set_bedrock(&mut self, line: Polyline) {
        self.bounds.grow(&line);
        self.bedrock = Some(SoilLayer {
            line,
            properties: SoilProperties {
                gamma: BEDROCK_GAMMA,
                a: 0.0,
                phi_deg: 0.0,
                cu: BEDROCK_CU,
                undrained: true,
            },
        });
    }

    pub fn groundwater(&self) -> Option<&Groundwater> {
        self.groundwater.as_ref()
    }

    pub fn bedrock(&self) -> Option<&SoilLayer> {
        self.bedrock.as_ref()
    }

    pub fn bounds(&self) -> Bounds {
        self.bounds
    }

    /// The terrain surface (topmost layer), if any layer exists.
    pub fn terrain(&self) -> Option<&SoilLayer> {
        self.layers.first()
    }

    /// Number of strata: soil layers plus bedrock when present.
    pub fn stratum_count(&self) -> usize {
        self.layers.len() + usize::from(self.bedrock.is_some())
    }

    /// Stratum by index; soil layers first, bedrock last.
    pub fn stratum(&self, index: usize) -> Option<&SoilLayer> {
        if index < self.layers.len() {
            self.layers.get(index)
        } else if index == self.layers.len() {
            self.bedrock.as_ref()
        } else {
            None
        }
    }

    /// Iterate strata top to bottom, bedrock included.
    pub fn strata(&self) -> impl Iterator<Item = &SoilLayer> {
        self.layers.iter().chain(self.bedrock.iter())
    }

    /// Index of the deepest stratum whose top boundary lies at or above the
    /// point. `None` when the point is above the terrain surface.
    pub fn layer_index_at(&self, x: f64, y: f64) -> Option<usize> {
        for (i, stratum) in self.strata().enumerate() {
            if stratum.line.y_at(x) < y {
                return if i == 0 { None } else { Some(i - 1) };
            }
        }
        match self.stratum_count() {
            0 => None,
            n => Some(n - 1),
        }
    }
}
