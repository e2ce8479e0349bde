use approx::abs_diff_eq;
use serde::{Deserialize, Serialize};

use crate::geometry::point::Point3d;
use crate::geometry::vector::Vec3;

/// Tolerances for every approximate comparison made during a Boolean run.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Tolerance {
    /// Points closer than this are considered coincident.
    pub coincidence: f64,
    /// Angles smaller than this (radians) are considered zero.
    pub angular: f64,
    /// Tolerance on normalized curve parameters (`u` in `[0, 1]`).
    pub parametric: f64,
}

impl Default for Tolerance {
    fn default() -> Self {
        Self {
            coincidence: 1e-6,
            angular: 1e-9,
            parametric: 1e-6,
        }
    }
}

impl Tolerance {
    pub fn eq(&self, a: f64, b: f64) -> bool {
        abs_diff_eq!(a, b, epsilon = self.coincidence)
    }

    pub fn eq_zero(&self, a: f64) -> bool {
        self.eq(a, 0.0)
    }

    /// Compares two squared distances.
    pub fn eq_sq(&self, a: f64, b: f64) -> bool {
        abs_diff_eq!(a, b, epsilon = self.coincidence * self.coincidence)
    }

    pub fn ueq(&self, a: f64, b: f64) -> bool {
        abs_diff_eq!(a, b, epsilon = self.parametric)
    }

    pub fn ueq_zero(&self, u: f64) -> bool {
        self.ueq(u, 0.0)
    }

    pub fn ueq_one(&self, u: f64) -> bool {
        self.ueq(u, 1.0)
    }

    pub fn points_coincident(&self, a: &Point3d, b: &Point3d) -> bool {
        a.distance_squared_to(b) < self.coincidence * self.coincidence
    }

    pub fn veq(&self, a: &Vec3, b: &Vec3) -> bool {
        (*a - *b).length_squared() < self.coincidence * self.coincidence
    }
}

/// Default tolerance used by the free Boolean entry points.
pub fn default_tolerance() -> Tolerance {
    Tolerance::default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_points_within_coincidence_are_equal() {
        let tol = Tolerance::default();
        let a = Point3d::new(1.0, 2.0, 3.0);
        let b = Point3d::new(1.0 + 1e-8, 2.0, 3.0);
        let c = Point3d::new(1.0 + 1e-4, 2.0, 3.0);
        assert!(tol.points_coincident(&a, &b));
        assert!(!tol.points_coincident(&a, &c));
    }

    #[test]
    fn test_parametric_ends() {
        let tol = Tolerance::default();
        assert!(tol.ueq_zero(1e-9));
        assert!(tol.ueq_one(1.0 - 1e-9));
        assert!(!tol.ueq_one(0.999));
    }

    #[test]
    fn test_squared_comparison_scales_epsilon() {
        let tol = Tolerance::default();
        assert!(tol.eq_sq(4.0, 4.0 + 1e-13));
        assert!(!tol.eq_sq(4.0, 4.0 + 1e-6));
    }
}
