//! End-to-end Boolean runs on boxes and spheres.

use brep_boolean::boolean::error::ErrorKind;
use brep_boolean::geometry::point::Point3d;
use brep_boolean::geometry::surfaces::SurfaceKind;
use brep_boolean::topology::brep::{EntityStore, ShellId};
use brep_boolean::topology::primitives::{make_box, make_sphere};
use brep_boolean::validation::ShellValidator;
use brep_boolean::{intersect, invert, subtract, union, BooleanError};

fn cube(store: &mut EntityStore, min: (f64, f64, f64), size: f64) -> ShellId {
    make_box(
        store,
        Point3d::new(min.0, min.1, min.2),
        Point3d::new(min.0 + size, min.1 + size, min.2 + size),
    )
}

fn assert_valid(store: &EntityStore, shell: ShellId) {
    let errors = ShellValidator::default().validate(store, shell);
    assert!(errors.is_empty(), "result shell invalid: {errors:?}");
}

fn surface_kinds(store: &EntityStore, shell: ShellId) -> (usize, usize) {
    let faces = &store.shells[shell].faces;
    let planes = faces
        .iter()
        .filter(|&&f| store.faces[f].surface.kind() == SurfaceKind::Plane)
        .count();
    (planes, faces.len() - planes)
}

/// Sphere of radius 1 at the origin and a box whose bottom face cuts the
/// sphere's upper hemisphere at `z = 0.5`.
fn sphere_and_box(store: &mut EntityStore) -> (ShellId, ShellId) {
    let sphere = make_sphere(store, Point3d::ORIGIN, 1.0);
    let slab = make_box(store, Point3d::new(-2.0, -2.0, 0.5), Point3d::new(2.0, 2.0, 3.0));
    (sphere, slab)
}

// ─── Box / box ──────────────────────────────────────────────────────────────

#[test]
fn corner_overlap_intersection_is_the_shared_cube() {
    let mut store = EntityStore::new();
    let a = cube(&mut store, (0.0, 0.0, 0.0), 2.0);
    let b = cube(&mut store, (1.0, 1.0, 1.0), 2.0);

    let result = intersect(&mut store, a, b).unwrap();
    assert_eq!(store.count_topology(result), (8, 12, 6));
    assert_valid(&store, result);

    for v in store.shell_vertices(result) {
        let p = store.vertex_point(v);
        for c in [p.x, p.y, p.z] {
            assert!((c - 1.0).abs() < 1e-9 || (c - 2.0).abs() < 1e-9, "vertex {p:?} off the shared cube");
        }
    }
}

#[test]
fn corner_overlap_union_and_subtract() {
    let mut store = EntityStore::new();
    let a = cube(&mut store, (0.0, 0.0, 0.0), 2.0);
    let b = cube(&mut store, (1.0, 1.0, 1.0), 2.0);

    let joined = union(&mut store, a, b).unwrap();
    assert_eq!(store.shells[joined].faces.len(), 12);
    assert_valid(&store, joined);

    let cut = subtract(&mut store, a, b).unwrap();
    assert_eq!(store.shells[cut].faces.len(), 9);
    assert_valid(&store, cut);
    assert!(store.shells[b].inverted);
}

#[test]
fn subtract_matches_intersection_with_inverted_copy() {
    let mut store = EntityStore::new();
    let a = cube(&mut store, (0.0, 0.0, 0.0), 2.0);
    let b = cube(&mut store, (1.0, 0.5, 1.5), 2.0);
    let via_subtract = subtract(&mut store, a, b).unwrap();

    let mut other = EntityStore::new();
    let a2 = cube(&mut other, (0.0, 0.0, 0.0), 2.0);
    let b2 = cube(&mut other, (1.0, 0.5, 1.5), 2.0);
    invert(&mut other, b2).unwrap();
    let via_intersect = intersect(&mut other, a2, b2).unwrap();

    assert_eq!(store.count_topology(via_subtract), other.count_topology(via_intersect));
}

#[test]
fn face_sharing_cubes_report_face_collision() {
    let mut store = EntityStore::new();
    let a = cube(&mut store, (0.0, 0.0, 0.0), 1.0);
    let b = cube(&mut store, (1.0, 0.0, 0.0), 1.0);

    let err = union(&mut store, a, b).unwrap_err();
    assert!(matches!(err, BooleanError::FaceCollision { .. }), "{err}");
    assert_eq!(err.code(), "BOOLEAN_INVALID_RESULT");
    assert_eq!(err.kind(), ErrorKind::UnsupportedCase);
    assert_eq!(err.related_entities().len(), 2);
}

#[test]
fn half_overlapping_cubes_report_face_collision() {
    let mut store = EntityStore::new();
    let a = cube(&mut store, (0.0, 0.0, 0.0), 1.0);
    let b = cube(&mut store, (0.5, 0.0, 0.0), 1.0);

    let err = intersect(&mut store, a, b).unwrap_err();
    assert!(matches!(err, BooleanError::FaceCollision { .. }), "{err}");
}

#[test]
fn edge_touching_cubes_have_empty_intersection() {
    let mut store = EntityStore::new();
    let a = cube(&mut store, (0.0, 0.0, 0.0), 1.0);
    let b = cube(&mut store, (1.0, 1.0, 0.0), 1.0);

    let err = intersect(&mut store, a, b).unwrap_err();
    assert!(matches!(err, BooleanError::EmptyResult));
    assert_eq!(err.code(), "BOOLEAN_EMPTY_RESULT");
}

#[test]
fn disjoint_union_keeps_nothing() {
    let mut store = EntityStore::new();
    let a = cube(&mut store, (0.0, 0.0, 0.0), 1.0);
    let b = cube(&mut store, (5.0, 0.0, 0.0), 1.0);

    assert!(matches!(union(&mut store, a, b), Err(BooleanError::EmptyResult)));
}

// ─── Box / sphere ───────────────────────────────────────────────────────────

#[test]
fn sphere_box_intersection_is_a_capped_disk() {
    let mut store = EntityStore::new();
    let (sphere, slab) = sphere_and_box(&mut store);

    let result = intersect(&mut store, sphere, slab).unwrap();
    assert_eq!(surface_kinds(&store, result), (1, 1));
    assert_eq!(store.count_topology(result), (1, 1, 2));
    assert_valid(&store, result);

    let edge = store.shell_edges(result)[0];
    let p = store.edges[edge].curve.middle_point();
    assert!((p.z - 0.5).abs() < 1e-9);
    assert!((p.x * p.x + p.y * p.y - 0.75).abs() < 1e-9);
}

#[test]
fn sphere_box_union_drills_both_operands() {
    let mut store = EntityStore::new();
    let (sphere, slab) = sphere_and_box(&mut store);

    let result = union(&mut store, sphere, slab).unwrap();
    assert_eq!(surface_kinds(&store, result), (6, 2));
    assert_valid(&store, result);
    let holed = store.shells[result]
        .faces
        .iter()
        .filter(|&&f| !store.faces[f].inner_loops.is_empty())
        .count();
    assert_eq!(holed, 2);
}

#[test]
fn box_minus_sphere_leaves_a_dent() {
    let mut store = EntityStore::new();
    let (sphere, slab) = sphere_and_box(&mut store);

    let result = subtract(&mut store, slab, sphere).unwrap();
    assert_eq!(surface_kinds(&store, result), (6, 1));
    assert_valid(&store, result);
}

/// Ball centred on the vertical box edge `x = y = 2`: its equator and both
/// side-plane sections cross the box's boundary.
fn box_and_edge_ball(store: &mut EntityStore) -> (ShellId, ShellId) {
    let cube = cube(store, (0.0, 0.0, 0.0), 2.0);
    let ball = make_sphere(store, Point3d::new(2.0, 2.0, 1.0), 0.5);
    (cube, ball)
}

/// Ball poking through the corner `(2, 2, 2)` with its equator just below
/// the top face, so the top-plane section stays on one hemisphere.
fn box_and_corner_ball(store: &mut EntityStore) -> (ShellId, ShellId) {
    let cube = cube(store, (0.0, 0.0, 0.0), 2.0);
    let ball = make_sphere(store, Point3d::new(1.95, 1.93, 1.9), 0.7);
    (cube, ball)
}

#[test]
fn edge_ball_intersection_is_a_quarter_ball() {
    let mut store = EntityStore::new();
    let (cube, ball) = box_and_edge_ball(&mut store);

    let result = intersect(&mut store, cube, ball).unwrap();
    assert_eq!(surface_kinds(&store, result), (2, 2));
    assert_valid(&store, result);
}

#[test]
fn edge_ball_union_and_subtract() {
    let mut store = EntityStore::new();
    let (cube, ball) = box_and_edge_ball(&mut store);
    let joined = union(&mut store, cube, ball).unwrap();
    assert_valid(&store, joined);

    let mut store = EntityStore::new();
    let (cube, ball) = box_and_edge_ball(&mut store);
    let cut = subtract(&mut store, cube, ball).unwrap();
    assert_valid(&store, cut);
}

#[test]
fn corner_ball_runs_for_every_operation() {
    let mut store = EntityStore::new();
    let (cube, ball) = box_and_corner_ball(&mut store);
    let common = intersect(&mut store, cube, ball).unwrap();
    assert_valid(&store, common);

    let joined = union(&mut store, cube, ball).unwrap();
    assert_valid(&store, joined);

    let cut = subtract(&mut store, cube, ball).unwrap();
    assert_valid(&store, cut);
}

// ─── Sphere / sphere ────────────────────────────────────────────────────────

#[test]
fn overlapping_balls_intersect_in_a_lens() {
    let mut store = EntityStore::new();
    let a = make_sphere(&mut store, Point3d::ORIGIN, 1.0);
    let b = make_sphere(&mut store, Point3d::new(0.3, 0.4, 1.2), 1.0);

    let result = intersect(&mut store, a, b).unwrap();
    assert_eq!(surface_kinds(&store, result), (0, 2));
    assert_eq!(store.count_topology(result), (1, 1, 2));
    assert_valid(&store, result);
}
