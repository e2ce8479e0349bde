use serde::{Deserialize, Serialize};

use super::point::Point3d;
use super::vector::Vec3;

/// Axis-aligned bounding box.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub min: Point3d,
    pub max: Point3d,
}

impl BoundingBox {
    pub fn new(min: Point3d, max: Point3d) -> Self {
        Self { min, max }
    }

    pub fn empty() -> Self {
        Self {
            min: Point3d::new(f64::INFINITY, f64::INFINITY, f64::INFINITY),
            max: Point3d::new(f64::NEG_INFINITY, f64::NEG_INFINITY, f64::NEG_INFINITY),
        }
    }

    pub fn from_points<'a>(points: impl IntoIterator<Item = &'a Point3d>) -> Self {
        let mut bb = Self::empty();
        for p in points {
            bb.expand_to_include(p);
        }
        bb
    }

    pub fn expand_to_include(&mut self, p: &Point3d) {
        self.min.x = self.min.x.min(p.x);
        self.min.y = self.min.y.min(p.y);
        self.min.z = self.min.z.min(p.z);
        self.max.x = self.max.x.max(p.x);
        self.max.y = self.max.y.max(p.y);
        self.max.z = self.max.z.max(p.z);
    }

    pub fn is_empty(&self) -> bool {
        self.min.x > self.max.x || self.min.y > self.max.y || self.min.z > self.max.z
    }

    pub fn expanded(&self, margin: f64) -> Self {
        let m = Vec3::new(margin, margin, margin);
        Self {
            min: self.min - m,
            max: self.max + m,
        }
    }

    pub fn intersects(&self, other: &Self) -> bool {
        !self.intersection(other).is_empty()
    }

    /// Overlap of two boxes; empty when they are disjoint.
    pub fn intersection(&self, other: &Self) -> Self {
        Self {
            min: Point3d::new(
                self.min.x.max(other.min.x),
                self.min.y.max(other.min.y),
                self.min.z.max(other.min.z),
            ),
            max: Point3d::new(
                self.max.x.min(other.max.x),
                self.max.y.min(other.max.y),
                self.max.z.min(other.max.z),
            ),
        }
    }

    /// Smallest extent along any axis; negative for an empty box.
    pub fn min_extent(&self) -> f64 {
        let s = self.max - self.min;
        s.x.min(s.y).min(s.z)
    }

    /// Clips the infinite line `origin + t * dir` against the box (slab
    /// method) and returns the `t` range inside it.
    pub fn clip_line(&self, origin: &Point3d, dir: &Vec3) -> Option<(f64, f64)> {
        let mut t0 = f64::NEG_INFINITY;
        let mut t1 = f64::INFINITY;
        let axes = [
            (origin.x, dir.x, self.min.x, self.max.x),
            (origin.y, dir.y, self.min.y, self.max.y),
            (origin.z, dir.z, self.min.z, self.max.z),
        ];
        for (o, d, lo, hi) in axes {
            if d.abs() < 1e-15 {
                if o < lo || o > hi {
                    return None;
                }
                continue;
            }
            let (mut a, mut b) = ((lo - o) / d, (hi - o) / d);
            if a > b {
                std::mem::swap(&mut a, &mut b);
            }
            t0 = t0.max(a);
            t1 = t1.min(b);
            if t0 > t1 {
                return None;
            }
        }
        Some((t0, t1))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    fn unit_box() -> BoundingBox {
        BoundingBox::new(Point3d::ORIGIN, Point3d::new(1.0, 1.0, 1.0))
    }

    #[test]
    fn test_touching_boxes_have_zero_extent_overlap() {
        let a = unit_box();
        let b = BoundingBox::new(Point3d::new(1.0, 1.0, 0.0), Point3d::new(2.0, 2.0, 1.0));
        let overlap = a.intersection(&b);
        assert!(a.intersects(&b));
        assert_abs_diff_eq!(overlap.min_extent(), 0.0);
    }

    #[test]
    fn test_disjoint_boxes() {
        let a = unit_box();
        let b = BoundingBox::new(Point3d::new(2.0, 0.0, 0.0), Point3d::new(3.0, 1.0, 1.0));
        assert!(!a.intersects(&b));
        assert!(a.intersection(&b).is_empty());
    }

    #[test]
    fn test_clip_line_through_box() {
        let (t0, t1) = unit_box()
            .clip_line(&Point3d::new(-1.0, 0.5, 0.5), &Vec3::X)
            .unwrap();
        assert_abs_diff_eq!(t0, 1.0, epsilon = 1e-12);
        assert_abs_diff_eq!(t1, 2.0, epsilon = 1e-12);
    }

    #[test]
    fn test_clip_line_missing_box() {
        let hit = unit_box().clip_line(&Point3d::new(-1.0, 2.0, 0.5), &Vec3::X);
        assert!(hit.is_none());
    }

    #[test]
    fn test_degenerate_box_clips_line_lying_in_it() {
        let flat = BoundingBox::new(Point3d::new(2.0, 1.0, 1.0), Point3d::new(2.0, 1.0, 2.0));
        let (t0, t1) = flat
            .expanded(1e-6)
            .clip_line(&Point3d::new(2.0, 1.0, 0.0), &Vec3::Z)
            .unwrap();
        assert!(t0 < 1.0 && t0 > 0.99);
        assert!(t1 > 2.0 && t1 < 2.01);
    }
}
