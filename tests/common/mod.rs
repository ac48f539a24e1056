//! Common test utilities and helpers

#![allow(dead_code)] // Test utilities may not all be used in every test file

pub mod builders;

/// Assert two floats are approximately equal
pub fn assert_float_eq(a: f64, b: f64, epsilon: f64) {
    assert!(
        (a - b).abs() < epsilon,
        "Expected {} to be approximately equal to {} (epsilon: {})",
        a,
        b,
        epsilon
    );
}

/// Assert two series are equal, treating NaN as equal to NaN
pub fn assert_series_eq(actual: &[f64], expected: &[f64]) {
    assert_eq!(actual.len(), expected.len(), "series lengths differ");
    for (i, (a, e)) in actual.iter().zip(expected).enumerate() {
        assert!(
            (a.is_nan() && e.is_nan()) || a == e,
            "Series differ at index {}: {} vs {}",
            i,
            a,
            e
        );
    }
}
