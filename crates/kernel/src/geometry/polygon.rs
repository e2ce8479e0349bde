//! Planar polygon queries in a surface's parameter space.

use super::point::Point2d;

/// Position of a point relative to a closed polygon.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PointClass {
    Inside,
    OnBoundary,
    Outside,
}

/// Answer of a point-in-region query. `inside` counts the boundary,
/// `strict_inside` does not.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Containment {
    pub inside: bool,
    pub strict_inside: bool,
}

/// Shoelace area; positive for counter-clockwise polygons. The closing
/// vertex is implied.
pub fn signed_area(poly: &[Point2d]) -> f64 {
    let n = poly.len();
    let mut twice = 0.0;
    for i in 0..n {
        let a = poly[i];
        let b = poly[(i + 1) % n];
        twice += a.x * b.y - b.x * a.y;
    }
    twice * 0.5
}

fn distance_to_segment(p: &Point2d, a: &Point2d, b: &Point2d) -> f64 {
    let (dx, dy) = (b.x - a.x, b.y - a.y);
    let len_sq = dx * dx + dy * dy;
    if len_sq < 1e-30 {
        return p.distance_to(a);
    }
    let t = (((p.x - a.x) * dx + (p.y - a.y) * dy) / len_sq).clamp(0.0, 1.0);
    p.distance_to(&Point2d::new(a.x + t * dx, a.y + t * dy))
}

/// Even-odd classification with an explicit boundary band of width `eps`.
pub fn classify(poly: &[Point2d], p: &Point2d, eps: f64) -> PointClass {
    let n = poly.len();
    if n < 2 {
        return PointClass::Outside;
    }
    let mut inside = false;
    for i in 0..n {
        let a = &poly[i];
        let b = &poly[(i + 1) % n];
        if distance_to_segment(p, a, b) < eps {
            return PointClass::OnBoundary;
        }
        if (a.y > p.y) != (b.y > p.y) {
            let x = a.x + (p.y - a.y) / (b.y - a.y) * (b.x - a.x);
            if p.x < x {
                inside = !inside;
            }
        }
    }
    if inside {
        PointClass::Inside
    } else {
        PointClass::Outside
    }
}

/// Classifies a point against an outer boundary with holes.
pub fn classify_in_region(
    outer: &[Point2d],
    holes: &[Vec<Point2d>],
    p: &Point2d,
    eps: f64,
) -> Containment {
    match classify(outer, p, eps) {
        PointClass::Outside => return Containment::default(),
        PointClass::OnBoundary => {
            return Containment {
                inside: true,
                strict_inside: false,
            };
        }
        PointClass::Inside => {}
    }
    let mut on_hole_boundary = false;
    for hole in holes {
        match classify(hole, p, eps) {
            PointClass::Inside => return Containment::default(),
            PointClass::OnBoundary => on_hole_boundary = true,
            PointClass::Outside => {}
        }
    }
    Containment {
        inside: true,
        strict_inside: !on_hole_boundary,
    }
}

/// Finds a point strictly inside the region by scanning horizontal lines
/// and taking the middle of the widest interior run.
pub fn pick_interior_point(outer: &[Point2d], holes: &[Vec<Point2d>], eps: f64) -> Option<Point2d> {
    let (y_min, y_max) = outer
        .iter()
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), p| {
            (lo.min(p.y), hi.max(p.y))
        });
    if !(y_max - y_min > eps) {
        return None;
    }
    const FRACTIONS: [f64; 9] = [0.5, 0.25, 0.75, 0.125, 0.375, 0.625, 0.875, 0.0625, 0.9375];
    for k in FRACTIONS {
        let y = y_min + k * (y_max - y_min);
        let mut xs = Vec::new();
        for poly in std::iter::once(outer).chain(holes.iter().map(|h| h.as_slice())) {
            let n = poly.len();
            for i in 0..n {
                let a = &poly[i];
                let b = &poly[(i + 1) % n];
                if (a.y > y) != (b.y > y) {
                    xs.push(a.x + (y - a.y) / (b.y - a.y) * (b.x - a.x));
                }
            }
        }
        xs.sort_by(f64::total_cmp);
        let best = xs
            .chunks_exact(2)
            .max_by(|l, r| (l[1] - l[0]).total_cmp(&(r[1] - r[0])));
        if let Some(run) = best {
            let candidate = Point2d::new((run[0] + run[1]) * 0.5, y);
            if classify_in_region(outer, holes, &candidate, eps).strict_inside {
                return Some(candidate);
            }
        }
    }
    None
}
