//! # Slice Geometry Builder
//!
//! Decomposes the soil mass above a failure surface into vertical slices
//! ("lamellas"). Each slice spans two adjacent x-boundaries of the surface
//! and is split into one quadrilateral soil volume per stratum penetrated,
//! from the terrain down to the layer the failure surface currently crosses.
//!
//! Slice corner numbering (vertical left/right edges, x1 == x4, x2 == x3):
//!
//! ```text
//!                 x2,y2
//! x1,y1      __--o
//!       o--``    |
//!       |        |
//!       |        |
//!       o--__    |
//! x4,y4      ``--o
//!                 x3,y3
//! ```
//!
//! The bottom soil volume is closed by the failure-surface elevations at the
//! slice's two x values; every other volume is closed by the next stratum
//! boundary down. Summed volume areas therefore reproduce the slice's own
//! outline area exactly, a property the tests rely on.

use serde::{Deserialize, Serialize};

use crate::errors::{StabilityError, StabilityResult};
use crate::model::SoilModel;

/// Area and centroid of a closed polygon via the shoelace formula.
///
/// The returned area is unsigned; the centroid is independent of vertex
/// orientation. Near-zero areas fall back to the vertex mean so degenerate
/// slivers do not produce NaN centroids.
pub fn polygon_area_centroid(x: &[f64], y: &[f64]) -> (f64, f64, f64) {
    let n = x.len();
    debug_assert_eq!(n, y.len());

    let mut cross_sum = 0.0;
    let mut cx_sum = 0.0;
    let mut cy_sum = 0.0;
    for i in 0..n {
        let j = (i + 1) % n;
        let cross = x[i] * y[j] - x[j] * y[i];
        cross_sum += cross;
        cx_sum += (x[i] + x[j]) * cross;
        cy_sum += (y[i] + y[j]) * cross;
    }

    let signed_area = cross_sum / 2.0;
    if signed_area.abs() < 1e-12 {
        let cx = x.iter().sum::<f64>() / n as f64;
        let cy = y.iter().sum::<f64>() / n as f64;
        return (0.0, cx, cy);
    }

    let cx = cx_sum / (6.0 * signed_area);
    let cy = cy_sum / (6.0 * signed_area);
    (signed_area.abs(), cx, cy)
}

/// A closed quadrilateral of one stratum inside a slice.
///
/// References its stratum by index instead of holding the model, so volumes
/// stay plain serializable data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SoilVolume {
    pub layer_index: usize,
    /// Corner x coordinates in outline order (top-left, top-right,
    /// bottom-right, bottom-left)
    pub x: [f64; 4],
    /// Corner y coordinates, parallel to `x`
    pub y: [f64; 4],
    pub area: f64,
    pub x_centroid: f64,
    pub y_centroid: f64,
    /// gamma * area
    pub weight: f64,
}

impl SoilVolume {
    fn new(layer_index: usize, gamma: f64, x: [f64; 4], y: [f64; 4]) -> Self {
        let (area, x_centroid, y_centroid) = polygon_area_centroid(&x, &y);
        Self {
            layer_index,
            x,
            y,
            area,
            x_centroid,
            y_centroid,
            weight: gamma * area,
        }
    }
}

/// Shear-strength state at a slice base, taken from the layer the failure
/// surface crosses in this slice.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BaseStrength {
    pub undrained: bool,
    /// Undrained shear strength (kPa)
    pub cu: f64,
    /// Effective cohesion intercept (kPa)
    pub a: f64,
    pub tan_phi: f64,
    /// Total base stress p = W / dx
    pub p: f64,
    /// Effective base stress p' = p - u
    pub p_prime: f64,
    /// Drained resisting force T = (p' + a) * tan(phi) * dx
    pub t: f64,
}

/// One vertical slice of the sliding mass.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Lamella {
    pub x_left: f64,
    pub x_right: f64,
    /// Terrain elevation at the left/right edge
    pub y_top_left: f64,
    pub y_top_right: f64,
    /// Failure-surface elevation at the left/right edge
    pub y_base_left: f64,
    pub y_base_right: f64,
    pub dx: f64,
    /// Base inclination: tan(alpha) and cos(alpha)
    pub tan_alpha: f64,
    pub cos_alpha: f64,
    /// Base length dx / cos(alpha)
    pub base_length: f64,
    /// Midpoint of the base chord; pore pressure is evaluated here
    pub base_mid_x: f64,
    pub base_mid_y: f64,
    /// Per-stratum volumes, terrain first, governing base layer last
    pub volumes: Vec<SoilVolume>,
    pub area: f64,
    pub weight: f64,
    /// Weight-weighted centroid of all volumes
    pub x_centroid: f64,
    pub y_centroid: f64,
    /// Pore pressure u at the base midpoint (kPa)
    pub pore_pressure: f64,
    pub strength: BaseStrength,
}

impl Lamella {
    /// Build one slice between two failure-surface points.
    ///
    /// `(x_left, y_base_left)` and `(x_right, y_base_right)` are adjacent
    /// points of the surface polyline, left to right.
    pub fn build(
        model: &SoilModel,
        x_left: f64,
        y_base_left: f64,
        x_right: f64,
        y_base_right: f64,
    ) -> StabilityResult<Self> {
        let dx = x_right - x_left;
        if dx <= 0.0 {
            return Err(StabilityError::degenerate_slice(
                x_left,
                x_right,
                "slice width must be positive",
            ));
        }
        let terrain = model.terrain().ok_or(StabilityError::MissingTerrain)?;

        let y_top_left = terrain.line.y_at(x_left);
        let y_top_right = terrain.line.y_at(x_right);

        let base_mid_x = (x_left + x_right) / 2.0;
        let base_mid_y = (y_base_left + y_base_right) / 2.0;

        let tan_alpha = (y_base_right - y_base_left) / dx;
        let cos_alpha = tan_alpha.atan().cos();
        let base_length = dx / cos_alpha;

        let bottom_index = model.layer_index_at(base_mid_x, base_mid_y).ok_or_else(|| {
            StabilityError::degenerate_slice(x_left, x_right, "slice base lies above terrain")
        })?;

        let mut volumes = Vec::with_capacity(bottom_index + 1);
        for i in 0..=bottom_index {
            let stratum = model
                .stratum(i)
                .ok_or(StabilityError::MissingTerrain)?;
            let y1 = stratum.line.y_at(x_left);
            let y2 = stratum.line.y_at(x_right);
            let (y3, y4) = if i == bottom_index {
                (y_base_right, y_base_left)
            } else {
                let below = model
                    .stratum(i + 1)
                    .ok_or(StabilityError::MissingTerrain)?;
                (below.line.y_at(x_right), below.line.y_at(x_left))
            };
            volumes.push(SoilVolume::new(
                i,
                stratum.properties.gamma,
                [x_left, x_right, x_right, x_left],
                [y1, y2, y3, y4],
            ));
        }

        let area: f64 = volumes.iter().map(|v| v.area).sum();
        let weight: f64 = volumes.iter().map(|v| v.weight).sum();
        if weight <= 0.0 {
            return Err(StabilityError::degenerate_slice(
                x_left,
                x_right,
                "slice carries no weight",
            ));
        }
        let x_centroid = volumes.iter().map(|v| v.x_centroid * v.weight).sum::<f64>() / weight;
        let y_centroid = volumes.iter().map(|v| v.y_centroid * v.weight).sum::<f64>() / weight;

        let pore_pressure = match model.groundwater() {
            Some(gw) => {
                let head = gw.line.y_at(base_mid_x) - base_mid_y;
                if head >= 0.0 {
                    head * gw.gamma_w
                } else {
                    0.0
                }
            }
            None => 0.0,
        };

        // Base strength comes from the deepest volume's stratum
        let base = model
            .stratum(volumes[volumes.len() - 1].layer_index)
            .ok_or(StabilityError::MissingTerrain)?
            .properties;
        let p = weight / dx;
        let p_prime = p - pore_pressure;
        let tan_phi = base.tan_phi();
        let strength = BaseStrength {
            undrained: base.undrained,
            cu: base.cu,
            a: base.a,
            tan_phi,
            p,
            p_prime,
            t: (p_prime + base.a) * tan_phi * dx,
        };

        Ok(Self {
            x_left,
            x_right,
            y_top_left,
            y_top_right,
            y_base_left,
            y_base_right,
            dx,
            tan_alpha,
            cos_alpha,
            base_length,
            base_mid_x,
            base_mid_y,
            volumes,
            area,
            weight,
            x_centroid,
            y_centroid,
            pore_pressure,
            strength,
        })
    }

    /// Resisting shear force for the current factor-of-safety estimate.
    ///
    /// Undrained bases resist cu * base_length independent of F; drained
    /// bases use Bishop's m_alpha correction.
    pub fn shear_force(&self, f: f64) -> f64 {
        if self.strength.undrained {
            return self.strength.cu * self.base_length;
        }
        let m_alpha = (1.0 + self.strength.tan_phi * self.tan_alpha / f) * self.cos_alpha;
        self.strength.t / m_alpha
    }

    /// Closed outline polygon for rendering (terrain top, surface bottom).
    pub fn outline(&self) -> (Vec<f64>, Vec<f64>) {
        (
            vec![self.x_left, self.x_right, self.x_right, self.x_left, self.x_left],
            vec![
                self.y_top_left,
                self.y_top_right,
                self.y_base_right,
                self.y_base_left,
                self.y_top_left,
            ],
        )
    }
}

/// Build the full slice list for a failure-surface polyline.
pub fn build_lamellas(
    model: &SoilModel,
    xs: &[f64],
    ys: &[f64],
) -> StabilityResult<Vec<Lamella>> {
    let mut lamellas = Vec::with_capacity(xs.len().saturating_sub(1));
    for i in 0..xs.len().saturating_sub(1) {
        lamellas.push(Lamella::build(model, xs[i], ys[i], xs[i + 1], ys[i + 1])?);
    }
    Ok(lamellas)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Polyline, SoilProperties};

    fn props(gamma: f64, undrained: bool) -> SoilProperties {
        SoilProperties {
            gamma,
            a: 10.0,
            phi_deg: 29.0,
            cu: 32.0,
            undrained,
        }
    }

    fn two_layer_model() -> SoilModel {
        let mut model = SoilModel::new();
        model.add_layer(
            Polyline::new(vec![-50.0, 50.0], vec![10.0, 10.0]).unwrap(),
            props(19.0, true),
        );
        model.add_layer(
            Polyline::new(vec![-50.0, 50.0], vec![5.0, 5.0]).unwrap(),
            props(21.0, false),
        );
        model
    }

    #[test]
    fn test_shoelace_square() {
        let (area, cx, cy) = polygon_area_centroid(&[0.0, 2.0, 2.0, 0.0], &[0.0, 0.0, 2.0, 2.0]);
        assert!((area - 4.0).abs() < 1e-12);
        assert!((cx - 1.0).abs() < 1e-12);
        assert!((cy - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_shoelace_orientation_independent() {
        // Same square, clockwise
        let (area, cx, cy) = polygon_area_centroid(&[0.0, 0.0, 2.0, 2.0], &[0.0, 2.0, 2.0, 0.0]);
        assert!((area - 4.0).abs() < 1e-12);
        assert!((cx - 1.0).abs() < 1e-12);
        assert!((cy - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_shoelace_degenerate() {
        let (area, cx, _) = polygon_area_centroid(&[0.0, 1.0, 1.0, 0.0], &[3.0, 3.0, 3.0, 3.0]);
        assert_eq!(area, 0.0);
        assert!((cx - 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_rectangular_slice_weight() {
        let model = two_layer_model();
        // Flat base at y = 0 through both layers
        let lamella = Lamella::build(&model, 0.0, 0.0, 2.0, 0.0).unwrap();

        assert_eq!(lamella.volumes.len(), 2);
        // Upper volume: 2 x 5 at gamma 19; lower: 2 x 5 at gamma 21
        assert!((lamella.area - 20.0).abs() < 1e-9);
        assert!((lamella.weight - (19.0 + 21.0) * 10.0).abs() < 1e-9);
        // Base strength from the lower (drained) layer
        assert!(!lamella.strength.undrained);
    }

    #[test]
    fn test_area_conservation() {
        let model = two_layer_model();
        // Inclined base crossing only the lower layer
        let lamella = Lamella::build(&model, 0.0, 1.0, 2.0, 0.5).unwrap();

        let (ox, oy) = lamella.outline();
        let (outline_area, _, _) = polygon_area_centroid(&ox[..4], &oy[..4]);
        let volume_sum: f64 = lamella.volumes.iter().map(|v| v.area).sum();

        assert!((volume_sum - outline_area).abs() / outline_area < 1e-6);
        assert!((lamella.area - outline_area).abs() / outline_area < 1e-6);
    }

    #[test]
    fn test_pore_pressure_from_groundwater() {
        let mut model = two_layer_model();
        model.set_groundwater(Polyline::new(vec![-50.0, 50.0], vec![4.0, 4.0]).unwrap());

        // Base midpoint at y = 0, groundwater at 4 -> u = 4 * 10
        let wet = Lamella::build(&model, 0.0, 0.0, 2.0, 0.0).unwrap();
        assert!((wet.pore_pressure - 40.0).abs() < 1e-9);
        assert!((wet.strength.p_prime - (wet.strength.p - 40.0)).abs() < 1e-9);

        // Base midpoint above the groundwater line -> dry
        let dry = Lamella::build(&model, 0.0, 4.5, 2.0, 4.5).unwrap();
        assert_eq!(dry.pore_pressure, 0.0);
    }

    #[test]
    fn test_undrained_shear_is_constant() {
        let mut model = SoilModel::new();
        model.add_layer(
            Polyline::new(vec![-50.0, 50.0], vec![10.0, 10.0]).unwrap(),
            props(19.0, true),
        );
        let lamella = Lamella::build(&model, 0.0, 1.0, 2.0, 0.0).unwrap();

        let t1 = lamella.shear_force(0.5);
        let t2 = lamella.shear_force(2.0);
        assert!((t1 - t2).abs() < 1e-12);
        assert!((t1 - 32.0 * lamella.base_length).abs() < 1e-9);
    }

    #[test]
    fn test_drained_shear_depends_on_f() {
        let model = two_layer_model();
        let lamella = Lamella::build(&model, 0.0, 1.0, 2.0, 0.0).unwrap();
        assert!(!lamella.strength.undrained);

        let t1 = lamella.shear_force(1.0);
        let t2 = lamella.shear_force(2.0);
        assert!((t1 - t2).abs() > 1e-9);
    }

    #[test]
    fn test_zero_width_slice_rejected() {
        let model = two_layer_model();
        let err = Lamella::build(&model, 1.0, 0.0, 1.0, 0.0).unwrap_err();
        assert_eq!(err.error_code(), "DEGENERATE_SLICE");
    }

    #[test]
    fn test_build_lamellas_pairs() {
        let model = two_layer_model();
        let xs = [0.0, 1.0, 2.0, 3.0];
        let ys = [0.0, -0.2, -0.2, 0.0];
        let lamellas = build_lamellas(&model, &xs, &ys).unwrap();
        assert_eq!(lamellas.len(), 3);
        assert!((lamellas[1].tan_alpha - 0.0).abs() < 1e-12);
        assert!(lamellas[0].tan_alpha < 0.0);
    }
}
