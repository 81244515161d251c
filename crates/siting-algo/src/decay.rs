//! Bounded Gaussian distance decay.
//!
//! The spatial-interaction weight between a demand point and a candidate site
//! falls off as a Gaussian of their distance and is cut to exactly zero at the
//! capture range:
//!
//! ```text
//! w(d) = exp(-d² / (2·h²))   for d <  capture_range
//! w(d) = 0                   for d >= capture_range
//! ```
//!
//! Dense urban areas use a narrow kernel (h = 1 km, capture 3 km), rural areas a
//! wide one (h = 3 km, capture 5 km).

use faer::Mat;

/// Decay weight for a single distance.
#[inline]
pub fn gaussian_weight(distance: f64, bandwidth: f64, capture_range: f64) -> f64 {
    if distance >= capture_range {
        0.0
    } else {
        (-(distance * distance) / (2.0 * bandwidth * bandwidth)).exp()
    }
}

/// Apply [`gaussian_weight`] to every entry of a demand × candidate distance matrix.
pub fn gaussian_decay(distances: &Mat<f64>, bandwidth: f64, capture_range: f64) -> Mat<f64> {
    Mat::from_fn(distances.nrows(), distances.ncols(), |i, j| {
        gaussian_weight(distances.read(i, j), bandwidth, capture_range)
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_weight_at_zero_distance_is_one() {
        assert_eq!(gaussian_weight(0.0, 1500.0, 4000.0), 1.0);
    }

    #[test]
    fn test_weight_is_non_increasing() {
        let mut previous = f64::INFINITY;
        for step in 0..=60 {
            let d = step as f64 * 100.0;
            let w = gaussian_weight(d, 1500.0, 4000.0);
            assert!(w <= previous, "weight increased at d={d}");
            previous = w;
        }
    }

    #[test]
    fn test_hard_cutoff_at_capture_range() {
        assert_eq!(gaussian_weight(4000.0, 1500.0, 4000.0), 0.0);
        assert_eq!(gaussian_weight(4000.1, 1500.0, 4000.0), 0.0);
        assert!(gaussian_weight(3999.9, 1500.0, 4000.0) > 0.0);
    }

    #[test]
    fn test_one_bandwidth_gives_exp_minus_half() {
        let w = gaussian_weight(2.0, 2.0, 10.0);
        assert!((w - (-0.5f64).exp()).abs() < 1e-12);
    }

    #[test]
    fn test_matrix_keeps_shape() {
        let distances = Mat::from_fn(3, 2, |i, j| (i * 2 + j) as f64);
        let weights = gaussian_decay(&distances, 1.0, 4.0);
        assert_eq!(weights.nrows(), 3);
        assert_eq!(weights.ncols(), 2);
        assert_eq!(weights.read(0, 0), 1.0);
        // distance 4 and 5 are at/after the cutoff
        assert_eq!(weights.read(2, 0), 0.0);
        assert_eq!(weights.read(2, 1), 0.0);
    }
}
