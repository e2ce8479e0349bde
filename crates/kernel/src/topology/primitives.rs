use std::collections::BTreeMap;
use std::f64::consts::{PI, TAU};

use tracing::{info, instrument};

use super::brep::*;
use crate::geometry::curves::{Circle3d, CurveSegment};
use crate::geometry::point::Point3d;
use crate::geometry::surfaces::{Plane, Sphere, Surface};
use crate::geometry::vector::Vec3;

/// Build an axis-aligned box shell between two opposite corners. Every
/// loop runs counter-clockwise about its outward normal.
#[instrument(skip(store))]
pub fn make_box(store: &mut EntityStore, min: Point3d, max: Point3d) -> ShellId {
    info!(min = ?[min.x, min.y, min.z], max = ?[max.x, max.y, max.z], "creating box primitive");
    let (x0, y0, z0) = (min.x, min.y, min.z);
    let (x1, y1, z1) = (max.x, max.y, max.z);
    let corners = [
        Point3d::new(x0, y0, z0),
        Point3d::new(x1, y0, z0),
        Point3d::new(x1, y1, z0),
        Point3d::new(x0, y1, z0),
        Point3d::new(x0, y0, z1),
        Point3d::new(x1, y0, z1),
        Point3d::new(x1, y1, z1),
        Point3d::new(x0, y1, z1),
    ];
    let vertices: Vec<VertexId> = corners.iter().map(|p| store.add_vertex(*p)).collect();

    let face_defs: [([usize; 4], Vec3); 6] = [
        ([0, 3, 2, 1], -Vec3::Z),
        ([4, 5, 6, 7], Vec3::Z),
        ([0, 4, 7, 3], -Vec3::X),
        ([1, 2, 6, 5], Vec3::X),
        ([0, 1, 5, 4], -Vec3::Y),
        ([3, 7, 6, 2], Vec3::Y),
    ];

    // Edge keyed by its (lower, higher) corner index pair.
    let mut edges: BTreeMap<(usize, usize), EdgeId> = BTreeMap::new();
    let mut faces = Vec::with_capacity(6);
    for (corner_ids, normal) in face_defs {
        let mut half_edges = Vec::with_capacity(4);
        for i in 0..4 {
            let (a, b) = (corner_ids[i], corner_ids[(i + 1) % 4]);
            let key = (a.min(b), a.max(b));
            let edge = *edges.entry(key).or_insert_with(|| {
                store.add_edge(
                    CurveSegment::line(corners[key.0], corners[key.1]),
                    vertices[key.0],
                    vertices[key.1],
                )
            });
            let (h1, h2) = store.edges[edge].half_edges;
            half_edges.push(if a < b { h1 } else { h2 });
        }
        let outer = store.add_loop(half_edges);
        let plane = Plane::new(corners[corner_ids[0]], normal);
        faces.push(store.add_face(Surface::Plane(plane), outer, Vec::new()));
    }
    store.add_shell(faces)
}

/// Build a sphere shell from two hemispherical faces joined along the
/// equator (normal +Z), which is split into two half-circle edges.
#[instrument(skip(store))]
pub fn make_sphere(store: &mut EntityStore, center: Point3d, radius: f64) -> ShellId {
    info!(center = ?[center.x, center.y, center.z], radius, "creating sphere primitive");
    let equator = Circle3d::with_axes(center, Vec3::Z, Vec3::X, radius);
    let v0 = store.add_vertex(equator.evaluate(0.0));
    let v1 = store.add_vertex(equator.evaluate(PI));
    let front = store.add_edge(CurveSegment::arc(equator, 0.0, PI), v0, v1);
    let back = store.add_edge(CurveSegment::arc(equator, PI, TAU), v1, v0);
    let (f1, f2) = store.edges[front].half_edges;
    let (b1, b2) = store.edges[back].half_edges;

    let upper_loop = store.add_loop(vec![f1, b1]);
    let lower_loop = store.add_loop(vec![b2, f2]);
    let upper = store.add_face(
        Surface::Sphere(Sphere::with_pole(center, radius, Vec3::Z)),
        upper_loop,
        Vec::new(),
    );
    let lower = store.add_face(
        Surface::Sphere(Sphere::with_pole(center, radius, -Vec3::Z)),
        lower_loop,
        Vec::new(),
    );
    store.add_shell(vec![upper, lower])
}
