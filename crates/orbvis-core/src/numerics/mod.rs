pub mod smoothing;

pub use smoothing::{SmoothingError, gaussian_filter1d};

fn kahan_add(sum: &mut f64, correction: &mut f64, value: f64) {
    let corrected = value - *correction;
    let next = *sum + corrected;
    *correction = (next - *sum) - corrected;
    *sum = next;
}

pub fn stable_sum(values: &[f64]) -> f64 {
    let mut sum = 0.0;
    let mut correction = 0.0;

    for &value in values {
        kahan_add(&mut sum, &mut correction, value);
    }

    sum
}

pub fn sub3(lhs: [f64; 3], rhs: [f64; 3]) -> [f64; 3] {
    [lhs[0] - rhs[0], lhs[1] - rhs[1], lhs[2] - rhs[2]]
}

pub fn dot3(lhs: [f64; 3], rhs: [f64; 3]) -> f64 {
    lhs[0] * rhs[0] + lhs[1] * rhs[1] + lhs[2] * rhs[2]
}

pub fn cross3(lhs: [f64; 3], rhs: [f64; 3]) -> [f64; 3] {
    [
        lhs[1] * rhs[2] - lhs[2] * rhs[1],
        lhs[2] * rhs[0] - lhs[0] * rhs[2],
        lhs[0] * rhs[1] - lhs[1] * rhs[0],
    ]
}

pub fn norm3(vector: [f64; 3]) -> f64 {
    dot3(vector, vector).sqrt()
}

fn squared_distance3(lhs: [f64; 3], rhs: [f64; 3]) -> f64 {
    let delta = sub3(lhs, rhs);
    dot3(delta, delta)
}

pub fn distance3(lhs: [f64; 3], rhs: [f64; 3]) -> f64 {
    squared_distance3(lhs, rhs).sqrt()
}

/// Unit vector along `vector`, or `None` for a zero-length input.
pub fn unit3(vector: [f64; 3]) -> Option<[f64; 3]> {
    let norm = norm3(vector);
    if norm == 0.0 || !norm.is_finite() {
        return None;
    }
    Some([vector[0] / norm, vector[1] / norm, vector[2] / norm])
}

/// Component-wise absolute comparison of two coordinates.
pub fn coords_within(lhs: [f64; 3], rhs: [f64; 3], abs_tol: f64) -> bool {
    lhs.iter()
        .zip(rhs.iter())
        .all(|(left, right)| (left - right).abs() <= abs_tol)
}

/// Whether the larger of `lhs`/`rhs` is `n` times the smaller for an integer
/// `1 <= n <= max_multiple`, within a relative tolerance on the ratio.
pub fn is_integer_multiple(lhs: f64, rhs: f64, max_multiple: u32, rel_tol: f64) -> bool {
    let (large, small) = if lhs >= rhs { (lhs, rhs) } else { (rhs, lhs) };
    if small <= 0.0 || !small.is_finite() || !large.is_finite() {
        return false;
    }

    let ratio = large / small;
    let nearest = ratio.round();
    nearest >= 1.0
        && nearest <= f64::from(max_multiple)
        && (ratio - nearest).abs() <= rel_tol * nearest
}

pub fn linear_grid(start: f64, end: f64, count: usize) -> Option<Vec<f64>> {
    if count < 2 {
        return None;
    }

    let step = (end - start) / ((count - 1) as f64);
    let mut grid = Vec::with_capacity(count);
    for index in 0..count {
        grid.push(start + step * (index as f64));
    }

    if let Some(last) = grid.last_mut() {
        *last = end;
    }

    Some(grid)
}

#[cfg(test)]
mod tests {
    use super::{
        coords_within, cross3, distance3, is_integer_multiple, linear_grid, norm3, stable_sum,
        unit3,
    };

    #[test]
    fn stable_sum_reduces_order_loss_for_large_and_small_values() {
        let input = [1.0e16, 1.0, -1.0e16];
        assert_eq!(stable_sum(&input), 0.0);
    }

    #[test]
    fn distance_helpers_handle_three_dimensional_geometry() {
        let distance = distance3([0.0, 0.0, 0.0], [2.0, 3.0, 6.0]);
        assert!((distance - 7.0).abs() < 1.0e-12);
        assert!((norm3([3.0, 4.0, 0.0]) - 5.0).abs() < 1.0e-12);
    }

    #[test]
    fn cross_product_vanishes_for_parallel_vectors() {
        assert_eq!(cross3([1.0, 0.0, 0.0], [2.0, 0.0, 0.0]), [0.0, 0.0, 0.0]);
        assert_eq!(cross3([1.0, 0.0, 0.0], [0.0, 1.0, 0.0]), [0.0, 0.0, 1.0]);
    }

    #[test]
    fn unit_vector_rejects_zero_length() {
        assert_eq!(unit3([0.0, 0.0, 0.0]), None);
        let unit = unit3([0.0, 0.0, 2.5]).expect("unit vector");
        assert_eq!(unit, [0.0, 0.0, 1.0]);
    }

    #[test]
    fn coords_within_is_component_wise() {
        assert!(coords_within([0.5, 0.0, 0.0], [0.5 + 1.0e-9, 0.0, 0.0], 1.0e-8));
        assert!(!coords_within([0.5, 0.0, 0.0], [0.5, 1.0e-6, 0.0], 1.0e-8));
    }

    #[test]
    fn integer_multiple_accepts_small_ratios_in_either_direction() {
        assert!(is_integer_multiple(0.01, 0.01, 3, 1.0e-2));
        assert!(is_integer_multiple(0.02, 0.01, 3, 1.0e-2));
        assert!(is_integer_multiple(0.01, 0.03, 3, 1.0e-2));
        assert!(!is_integer_multiple(0.015, 0.01, 3, 1.0e-2));
        assert!(!is_integer_multiple(0.5, 0.01, 3, 1.0e-2));
        assert!(!is_integer_multiple(0.0, 0.01, 3, 1.0e-2));
    }

    #[test]
    fn linear_grid_is_inclusive_and_rejects_invalid_counts() {
        assert_eq!(linear_grid(0.0, 1.0, 1), None);
        let grid = linear_grid(0.0, 2.0, 5).expect("grid");
        assert_eq!(grid, vec![0.0, 0.5, 1.0, 1.5, 2.0]);
    }
}
