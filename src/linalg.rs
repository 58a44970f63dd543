//! Points and symmetric 2×2 covariance matrices.
//!
//! Everything the 2D engine needs is closed-form at this size: determinant,
//! inverse, quadratic form, eigen decomposition. The matrix is stored as its
//! three free entries:
//!
//! ```text
//! Σ = | xx  xy |
//!     | xy  yy |
//! ```

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Smallest variance a covariance may carry on its diagonal.
pub const MIN_VARIANCE: f64 = 0.01;

/// Largest |correlation| the positive-definite projection leaves behind when it
/// has to shrink the off-diagonal entry.
pub const MAX_CORRELATION: f64 = 0.99;

/// A point in the plane.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Point2D {
    /// Horizontal coordinate.
    pub x: f64,
    /// Vertical coordinate.
    pub y: f64,
}

impl Point2D {
    /// Create a point.
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// Symmetric 2×2 matrix, used as a covariance.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Covariance2 {
    /// Variance along x.
    pub xx: f64,
    /// Variance along y.
    pub yy: f64,
    /// Covariance between x and y.
    pub xy: f64,
}

/// Eigen decomposition of a symmetric 2×2 matrix.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Eigen2 {
    /// Larger eigenvalue.
    pub major: f64,
    /// Smaller eigenvalue.
    pub minor: f64,
    /// Angle (radians) of the major eigenvector, measured from the x axis.
    pub angle: f64,
}

/// Confidence ellipse of a bivariate normal, ready to draw.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Ellipse {
    /// Semi-axis along the major eigenvector.
    pub semi_major: f64,
    /// Semi-axis along the minor eigenvector.
    pub semi_minor: f64,
    /// Rotation of the major axis in radians.
    pub angle: f64,
}

impl Default for Covariance2 {
    fn default() -> Self {
        Self::identity()
    }
}

impl Covariance2 {
    /// Create a covariance from its free entries (no projection applied).
    pub fn new(xx: f64, yy: f64, xy: f64) -> Self {
        Self { xx, yy, xy }
    }

    /// Identity matrix.
    pub fn identity() -> Self {
        Self::new(1.0, 1.0, 0.0)
    }

    /// Isotropic covariance `v·I`.
    pub fn isotropic(variance: f64) -> Self {
        Self::new(variance, variance, 0.0)
    }

    /// `xx·yy - xy²`.
    pub fn determinant(&self) -> f64 {
        self.xx * self.yy - self.xy * self.xy
    }

    /// Sum of the diagonal.
    pub fn trace(&self) -> f64 {
        self.xx + self.yy
    }

    /// Both diagonals positive and determinant positive.
    pub fn is_positive_definite(&self) -> bool {
        self.xx > 0.0 && self.yy > 0.0 && self.determinant() > 0.0
    }

    /// Matrix inverse, or `None` when the matrix is singular or not finite.
    pub fn inverse(&self) -> Option<Covariance2> {
        let det = self.determinant();
        if !(det > 0.0) || !det.is_finite() {
            return None;
        }
        Some(Covariance2::new(self.yy / det, self.xx / det, -self.xy / det))
    }

    /// `vᵀ M v` for `v = (dx, dy)`.
    pub fn quad_form(&self, dx: f64, dy: f64) -> f64 {
        self.xx * dx * dx + 2.0 * self.xy * dx * dy + self.yy * dy * dy
    }

    /// `S · M · S` where `self` is `S`.
    ///
    /// Symmetric whenever both factors are, which is all the gradient needs.
    pub fn conjugate(&self, middle: &Covariance2) -> Covariance2 {
        let (a, b, c) = (self.xx, self.xy, self.yy);
        let (p, q, r) = (middle.xx, middle.xy, middle.yy);
        let m00 = a * p + b * q;
        let m01 = a * q + b * r;
        let m10 = b * p + c * q;
        let m11 = b * q + c * r;
        Covariance2::new(m00 * a + m01 * b, m10 * b + m11 * c, m00 * b + m01 * c)
    }

    /// Correlation coefficient `xy / √(xx·yy)`, clamped to [-1, 1].
    ///
    /// Returns `0.0` when either variance is non-positive.
    pub fn correlation(&self) -> f64 {
        let denom = (self.xx * self.yy).sqrt();
        if !(denom > 0.0) {
            return 0.0;
        }
        (self.xy / denom).clamp(-1.0, 1.0)
    }

    /// Eigenvalues (descending) and the major-axis angle.
    pub fn eigen(&self) -> Eigen2 {
        let half_trace = 0.5 * self.trace();
        let half_diff = 0.5 * (self.xx - self.yy);
        let disc = (half_diff * half_diff + self.xy * self.xy).sqrt();
        Eigen2 {
            major: half_trace + disc,
            minor: half_trace - disc,
            angle: 0.5 * (2.0 * self.xy).atan2(self.xx - self.yy),
        }
    }

    /// Ellipse covering `n_std` standard deviations along each principal axis.
    pub fn ellipse(&self, n_std: f64) -> Ellipse {
        let eig = self.eigen();
        Ellipse {
            semi_major: n_std * eig.major.max(0.0).sqrt(),
            semi_minor: n_std * eig.minor.max(0.0).sqrt(),
            angle: eig.angle,
        }
    }

    /// Project onto the positive-definite cone.
    ///
    /// Diagonals are clamped to `min_variance`; if the determinant is still
    /// non-positive, `xy` is shrunk to `MAX_CORRELATION · √(xx·yy)` keeping its
    /// sign. Non-finite entries are replaced (diagonals by `min_variance`,
    /// `xy` by 0) so the postcondition holds for any input.
    pub fn project_positive_definite(self, min_variance: f64) -> Covariance2 {
        let clamp_diag = |v: f64| {
            if v.is_finite() {
                v.max(min_variance)
            } else {
                min_variance
            }
        };
        let xx = clamp_diag(self.xx);
        let yy = clamp_diag(self.yy);
        let mut xy = if self.xy.is_finite() { self.xy } else { 0.0 };

        if xx * yy - xy * xy <= 0.0 {
            xy = xy.signum() * MAX_CORRELATION * (xx * yy).sqrt();
        }

        Covariance2 { xx, yy, xy }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_inverse_roundtrip() {
        let m = Covariance2::new(2.0, 3.0, 0.5);
        let inv = m.inverse().unwrap();
        // M · M⁻¹ = I
        let i00 = m.xx * inv.xx + m.xy * inv.xy;
        let i01 = m.xx * inv.xy + m.xy * inv.yy;
        let i11 = m.xy * inv.xy + m.yy * inv.yy;
        assert!((i00 - 1.0).abs() < 1e-12);
        assert!(i01.abs() < 1e-12);
        assert!((i11 - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_singular_has_no_inverse() {
        assert!(Covariance2::new(1.0, 1.0, 1.0).inverse().is_none());
        assert!(Covariance2::new(0.0, 1.0, 0.0).inverse().is_none());
    }

    #[test]
    fn test_projection_restores_positive_definiteness() {
        let cases = [
            Covariance2::new(-1.0, 0.0, 5.0),
            Covariance2::new(1.0, 1.0, 1.0),
            Covariance2::new(1.0, 4.0, -3.0),
            Covariance2::new(f64::NAN, f64::INFINITY, f64::NAN),
        ];
        for c in cases {
            let p = c.project_positive_definite(MIN_VARIANCE);
            assert!(p.is_positive_definite(), "{c:?} -> {p:?}");
            assert!(p.xx >= MIN_VARIANCE && p.yy >= MIN_VARIANCE);
            assert!(p.correlation().abs() <= 1.0);
        }
    }

    #[test]
    fn test_projection_keeps_valid_matrix() {
        let c = Covariance2::new(2.0, 1.0, 0.3);
        assert_eq!(c.project_positive_definite(MIN_VARIANCE), c);
    }

    #[test]
    fn test_projection_keeps_sign_of_correlation() {
        let p = Covariance2::new(1.0, 1.0, -2.0).project_positive_definite(MIN_VARIANCE);
        assert!(p.xy < 0.0);
        assert!((p.correlation() + MAX_CORRELATION).abs() < 1e-12);
    }

    #[test]
    fn test_eigen_diagonal() {
        let e = Covariance2::new(4.0, 1.0, 0.0).eigen();
        assert!((e.major - 4.0).abs() < 1e-12);
        assert!((e.minor - 1.0).abs() < 1e-12);
        assert!(e.angle.abs() < 1e-12);

        let el = Covariance2::new(4.0, 1.0, 0.0).ellipse(2.0);
        assert!((el.semi_major - 4.0).abs() < 1e-12);
        assert!((el.semi_minor - 2.0).abs() < 1e-12);
    }

    #[test]
    fn test_eigen_correlated_axis_is_diagonal() {
        let e = Covariance2::new(1.0, 1.0, 0.5).eigen();
        assert!((e.major - 1.5).abs() < 1e-12);
        assert!((e.minor - 0.5).abs() < 1e-12);
        assert!((e.angle - std::f64::consts::FRAC_PI_4).abs() < 1e-12);
    }

    #[test]
    fn test_conjugate_with_identity() {
        let s = Covariance2::new(2.0, 3.0, 0.5);
        assert_eq!(s.conjugate(&Covariance2::identity()).xx, 2.0 * 2.0 + 0.5 * 0.5);
        let id = Covariance2::identity().conjugate(&s);
        assert_eq!(id, s);
    }
}
