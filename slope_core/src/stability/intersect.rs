//! # Circle-Stratigraphy Intersector
//!
//! Finds where a trial circle cuts the layered cross-section and turns the
//! penetrating arc into the x/y polyline of a failure surface:
//!
//! 1. Intersect the circle with every stratum boundary polyline.
//! 2. Filter consecutive terrain intersections down to "dip" intervals where
//!    the circle actually runs below ground.
//! 3. Insert slice breakpoints inside the accepted interval so no slice
//!    spans a layer transition except at its own base.
//! 4. Densify along the arc up to the configured minimum slice count.
//!
//! A circle can in principle dip below undulating terrain more than once.
//! Only the first (leftmost) dip becomes the circle's failure surface; the
//! registry keys one record per trial circle.

use crate::errors::{StabilityError, StabilityResult};
use crate::model::{Polyline, SoilLayer, SoilModel};
use crate::stability::TrialCircle;

/// Absolute tolerance for merging duplicate slice boundaries.
const BOUNDARY_EPS: f64 = 1e-9;

/// Intersections of a circle with one line segment.
///
/// Non-vertical segments substitute the segment's line equation into the
/// circle equation, giving a quadratic in x with a = 1 + M^2. Vertical
/// segments solve directly for the two y roots at the fixed x. Tangencies
/// are reported as double roots. Only points inside the segment's inclusive
/// x/y bounds are returned.
pub fn segment_circle_intersections(
    x1: f64,
    y1: f64,
    x2: f64,
    y2: f64,
    circle: &TrialCircle,
) -> Vec<(f64, f64)> {
    let (cx, cy, r) = (circle.x_center, circle.y_center, circle.radius);

    let mut candidates: Vec<(f64, f64)> = Vec::new();

    if x1 == x2 {
        // Vertical segment
        if x1 >= cx - r && x1 <= cx + r {
            if x1 == cx - r || x1 == cx + r {
                candidates.push((x1, cy));
                candidates.push((x1, cy));
            } else {
                let dy = (r * r - (x1 - cx) * (x1 - cx)).sqrt();
                candidates.push((x1, cy - dy));
                candidates.push((x1, cy + dy));
            }
        }
    } else {
        let m = (y2 - y1) / (x2 - x1);
        let a = 1.0 + m * m;
        let b = 2.0 * (y1 * m - x1 * m * m - cy * m - cx);
        let c = (x1 * m) * (x1 * m) + y1 * y1 + cy * cy + cx * cx - r * r
            + 2.0 * (m * (x1 * cy - x1 * y1) - y1 * cy);

        let disc = b * b - 4.0 * a * c;
        if disc == 0.0 {
            // Tangential double root
            let rx = -b / (2.0 * a);
            let ry = m * (rx - x1) + y1;
            candidates.push((rx, ry));
            candidates.push((rx, ry));
        } else if disc > 0.0 {
            let sq = disc.sqrt();
            let rx_1 = (-b - sq) / (2.0 * a);
            let rx_2 = (-b + sq) / (2.0 * a);
            candidates.push((rx_1, m * (rx_1 - x1) + y1));
            candidates.push((rx_2, m * (rx_2 - x1) + y1));
        }
    }

    let (x_lo, x_hi) = (x1.min(x2), x1.max(x2));
    let (y_lo, y_hi) = (y1.min(y2), y1.max(y2));
    candidates
        .into_iter()
        .filter(|&(x, y)| x_lo <= x && x <= x_hi && y_lo <= y && y <= y_hi)
        .collect()
}

/// All intersections of a circle with a polyline, ascending in x.
pub fn polyline_circle_intersections(line: &Polyline, circle: &TrialCircle) -> Vec<(f64, f64)> {
    let xs = line.xs();
    let ys = line.ys();
    let mut points = Vec::new();
    for i in 0..xs.len() - 1 {
        points.extend(segment_circle_intersections(
            xs[i],
            ys[i],
            xs[i + 1],
            ys[i + 1],
            circle,
        ));
    }
    points.sort_by(|a, b| a.0.total_cmp(&b.0));
    points
}

/// Does the circle run below the terrain inside the interval between two
/// terrain intersection points?
///
/// Checked at the first terrain vertex strictly inside the interval, or at
/// the interval midpoint when the terrain is straight there. Arcs that stay
/// above ground between their crossings are not failure surfaces.
fn penetrates_terrain(
    terrain: &SoilLayer,
    p1: (f64, f64),
    p2: (f64, f64),
    circle: &TrialCircle,
) -> bool {
    let (x1, y1) = p1;
    let (x2, y2) = p2;
    if x2 - x1 <= 0.0 {
        return false;
    }

    let inside = terrain.line.vertex_indexes_between(x1, x2);
    let (xs, ys) = match inside.first() {
        Some(&i) => (terrain.line.xs()[i], terrain.line.ys()[i]),
        None => {
            let xm = (x1 + x2) / 2.0;
            (xm, (xm - x1) * (y2 - y1) / (x2 - x1) + y1)
        }
    };

    ys > circle.lower_y_at(xs)
}

/// Slice boundary x values inside one dip interval.
///
/// Starts from the interval endpoints, adds every stratum's circle
/// intersections strictly inside the interval, and adds each stratum's
/// polyline vertices between consecutive intersection pairs (the stretches
/// where the surface has dipped into that stratum). Sorted ascending with
/// near-duplicates merged, so slice widths stay strictly positive.
fn slice_boundaries(
    model: &SoilModel,
    x_from: f64,
    x_to: f64,
    per_stratum: &[Vec<(f64, f64)>],
) -> Vec<f64> {
    let mut boundaries = vec![x_from, x_to];

    for (stratum, intersections) in model.strata().zip(per_stratum.iter()) {
        let inside: Vec<f64> = intersections
            .iter()
            .map(|&(x, _)| x)
            .filter(|&x| x_from <= x && x <= x_to)
            .collect();

        for &x in &inside {
            if x_from < x && x < x_to {
                boundaries.push(x);
            }
        }
        for pair in inside.chunks(2) {
            if let [a, b] = pair {
                for i in stratum.line.vertex_indexes_between(*a, *b) {
                    boundaries.push(stratum.line.xs()[i]);
                }
            }
        }
    }

    sort_dedup(&mut boundaries);
    boundaries
}

fn sort_dedup(values: &mut Vec<f64>) {
    values.sort_by(|a, b| a.total_cmp(b));
    values.dedup_by(|a, b| (*a - *b).abs() <= BOUNDARY_EPS);
}

/// Insert extra points along the arc until the boundary count reaches the
/// minimum slice count. Equal angular steps between the dip endpoint angles
/// (via atan2 from the circle center). Additive only; existing breakpoints
/// are never removed.
///
/// An arc point can land on an existing breakpoint and get merged away by
/// the dedup, so the insertion repeats until the count holds. A pass that
/// adds nothing (every point merged) stops the loop.
fn densify(
    boundaries: &mut Vec<f64>,
    start: (f64, f64),
    end: (f64, f64),
    circle: &TrialCircle,
    min_slice_count: usize,
) {
    let v1 = (start.0 - circle.x_center, start.1 - circle.y_center);
    let v2 = (end.0 - circle.x_center, end.1 - circle.y_center);

    let dot = v1.0 * v2.0 + v1.1 * v2.1;
    let norms = (v1.0 * v1.0 + v1.1 * v1.1).sqrt() * (v2.0 * v2.0 + v2.1 * v2.1).sqrt();
    let opening = (dot / norms).clamp(-1.0, 1.0).acos();
    let start_theta = v1.1.atan2(v1.0);

    while boundaries.len() < min_slice_count {
        let before = boundaries.len();
        let n_new = min_slice_count - before + 1;
        let delta_theta = opening / (n_new as f64 + 1.0);

        for k in 1..=n_new {
            let theta = start_theta + delta_theta * k as f64;
            boundaries.push(circle.radius * theta.cos() + circle.x_center);
        }
        sort_dedup(boundaries);
        if boundaries.len() <= before {
            break;
        }
    }
}

/// Trace the failure surface of one trial circle.
///
/// Returns `Ok(None)` when the circle never penetrates the terrain (no
/// surface is not an error). Otherwise the result is the strictly increasing
/// x sequence of slice boundaries with the circle-bottom y at each x.
pub fn trace_failure_surface(
    model: &SoilModel,
    circle: &TrialCircle,
    min_slice_count: usize,
) -> StabilityResult<Option<(Vec<f64>, Vec<f64>)>> {
    let terrain = model.terrain().ok_or(StabilityError::MissingTerrain)?;

    let per_stratum: Vec<Vec<(f64, f64)>> = model
        .strata()
        .map(|s| polyline_circle_intersections(&s.line, circle))
        .collect();

    let terrain_icts = &per_stratum[0];
    if terrain_icts.len() < 2 {
        return Ok(None);
    }

    // First accepted dip wins; one surface per circle.
    let dip = (0..terrain_icts.len() - 1)
        .find(|&i| penetrates_terrain(terrain, terrain_icts[i], terrain_icts[i + 1], circle));
    let Some(i) = dip else {
        return Ok(None);
    };
    let start = terrain_icts[i];
    let end = terrain_icts[i + 1];

    let mut xs = slice_boundaries(model, start.0, end.0, &per_stratum);
    densify(&mut xs, start, end, circle, min_slice_count);

    let ys: Vec<f64> = xs.iter().map(|&x| circle.lower_y_at(x)).collect();
    Ok(Some((xs, ys)))
}
