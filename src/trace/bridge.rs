//! Bridging across removed or invalid samples
//!
//! A bridge replaces the values at a set of indices with a curve through
//! the nearest valid sample on each side. `forbidden` index sets are sorted
//! slices (edit actions keep their indices sorted).

use crate::types::{is_valid, ConnectMethod};

/// First valid, non-forbidden index scanning from `start` by `step`.
///
/// `start` may lie outside the series (e.g. `-1`), in which case there is
/// no neighbor.
pub fn find_neighbor(values: &[f64], start: isize, step: isize, forbidden: &[usize]) -> Option<usize> {
    let n = values.len() as isize;
    let mut idx = start;
    while (0..n).contains(&idx) {
        let i = idx as usize;
        if forbidden.binary_search(&i).is_err() && is_valid(values[i]) {
            return Some(i);
        }
        idx += step;
    }
    None
}

/// Straight line from `values[left]` to `values[right]`, evaluated at the
/// times of `indices`
pub fn linear_bridge(
    time: &[f64],
    values: &[f64],
    indices: &[usize],
    left: usize,
    right: usize,
) -> Vec<f64> {
    let span = time[right] - time[left];
    let left_val = values[left];
    if span == 0.0 {
        return vec![left_val; indices.len()];
    }
    let right_val = values[right];
    indices
        .iter()
        .map(|&idx| {
            let u = (time[idx] - time[left]) / span;
            (1.0 - u) * left_val + u * right_val
        })
        .collect()
}

/// Slope-preserving cubic Hermite bridge.
///
/// Endpoint values come from the clean series. Tangents are one-sided
/// differences on the raw series, taken from each endpoint outward (away
/// from the gap) to its next valid sample. A missing tangent uses the
/// secant slope. A tangent pointing against the secant direction is zeroed
/// so the curve cannot overshoot, and a flat secant zeroes both.
pub fn cubic_hermite_bridge(
    time: &[f64],
    clean: &[f64],
    raw: &[f64],
    indices: &[usize],
    left: usize,
    right: usize,
    forbidden: &[usize],
) -> Vec<f64> {
    let span = time[right] - time[left];
    if span <= 0.0 {
        return linear_bridge(time, clean, indices, left, right);
    }

    let left_val = clean[left];
    let right_val = clean[right];
    if !(is_valid(left_val) && is_valid(right_val)) {
        return vec![f64::NAN; indices.len()];
    }

    let secant = (right_val - left_val) / span;
    let mut slope_left = estimate_slope(time, raw, left, -1, forbidden).unwrap_or(secant);
    let mut slope_right = estimate_slope(time, raw, right, 1, forbidden).unwrap_or(secant);

    if is_close(right_val, left_val) {
        slope_left = 0.0;
        slope_right = 0.0;
    } else {
        let sign = (right_val - left_val).signum();
        if slope_left * sign < 0.0 {
            slope_left = 0.0;
        }
        if slope_right * sign < 0.0 {
            slope_right = 0.0;
        }
    }

    indices
        .iter()
        .map(|&idx| {
            let u = ((time[idx] - time[left]) / span).clamp(0.0, 1.0);
            let u2 = u * u;
            let u3 = u2 * u;
            let h00 = 2.0 * u3 - 3.0 * u2 + 1.0;
            let h10 = u3 - 2.0 * u2 + u;
            let h01 = -2.0 * u3 + 3.0 * u2;
            let h11 = u3 - u2;
            h00 * left_val + h10 * span * slope_left + h01 * right_val + h11 * span * slope_right
        })
        .collect()
}

/// Bridge `indices` between `left` and `right` with the given method.
///
/// A cubic bridge that yields any non-finite value is replaced by a linear
/// one.
#[allow(clippy::too_many_arguments)]
pub fn bridge_segment(
    time: &[f64],
    clean: &[f64],
    raw: &[f64],
    indices: &[usize],
    left: usize,
    right: usize,
    method: ConnectMethod,
    forbidden: &[usize],
) -> Vec<f64> {
    match method {
        ConnectMethod::Cubic => {
            let bridged = cubic_hermite_bridge(time, clean, raw, indices, left, right, forbidden);
            if bridged.iter().all(|v| v.is_finite()) {
                bridged
            } else {
                linear_bridge(time, clean, indices, left, right)
            }
        }
        ConnectMethod::Linear => linear_bridge(time, clean, indices, left, right),
    }
}

fn estimate_slope(
    time: &[f64],
    values: &[f64],
    anchor: usize,
    direction: isize,
    forbidden: &[usize],
) -> Option<f64> {
    let neighbor = find_neighbor(values, anchor as isize + direction, direction, forbidden)?;
    let dt = time[anchor] - time[neighbor];
    if dt == 0.0 {
        return None;
    }
    Some((values[anchor] - values[neighbor]) / dt)
}

// Absolute 1e-8, relative 1e-5
fn is_close(a: f64, b: f64) -> bool {
    (a - b).abs() <= 1e-8 + 1e-5 * b.abs()
}
