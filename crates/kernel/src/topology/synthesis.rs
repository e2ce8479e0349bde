use tracing::{debug, warn};

use super::brep::*;
use crate::geometry::kernel::loop_uv_polygon;
use crate::geometry::point::Point2d;
use crate::geometry::polygon::{classify, signed_area, PointClass};
use crate::tolerance::Tolerance;
use crate::traits::FaceSynthesizer;

/// Builds faces from detected loops by nesting clockwise loops (holes)
/// inside the smallest counter-clockwise loop that contains them.
#[derive(Debug, Clone, Copy, Default)]
pub struct NestingSynthesizer;

struct UvLoop {
    id: LoopId,
    polygon: Vec<Point2d>,
    area: f64,
}

impl FaceSynthesizer for NestingSynthesizer {
    fn loops_to_faces(
        &self,
        store: &mut EntityStore,
        origin: FaceId,
        loops: Vec<LoopId>,
        tol: &Tolerance,
    ) -> Vec<FaceId> {
        let surface = store.faces[origin].surface;
        if loops.len() == 1 {
            return vec![store.add_face(surface, loops[0], Vec::new())];
        }

        let (outers, holes): (Vec<UvLoop>, Vec<UvLoop>) = loops
            .into_iter()
            .map(|id| {
                let polygon = loop_uv_polygon(store, &surface, id);
                let area = signed_area(&polygon);
                UvLoop { id, polygon, area }
            })
            .partition(|l| l.area > 0.0);

        let mut nested: Vec<Vec<LoopId>> = vec![Vec::new(); outers.len()];
        let mut orphans = Vec::new();
        for hole in holes {
            let Some(probe) = hole.polygon.first() else {
                continue;
            };
            let container = outers
                .iter()
                .enumerate()
                .filter(|(_, o)| classify(&o.polygon, probe, tol.coincidence) != PointClass::Outside)
                .min_by(|(_, a), (_, b)| a.area.total_cmp(&b.area))
                .map(|(i, _)| i);
            match container {
                Some(i) => nested[i].push(hole.id),
                None => {
                    warn!(?origin, "hole loop has no enclosing outer loop, keeping it as a face");
                    orphans.push(hole.id);
                }
            }
        }

        let mut faces = Vec::with_capacity(outers.len() + orphans.len());
        for (outer, inner) in outers.iter().zip(nested) {
            faces.push(store.add_face(surface, outer.id, inner));
        }
        for orphan in orphans {
            faces.push(store.add_face(surface, orphan, Vec::new()));
        }
        debug!(?origin, faces = faces.len(), "synthesized faces");
        faces
    }
}
