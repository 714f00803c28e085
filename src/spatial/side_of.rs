//! Inside/outside classification against a closed triangulated surface

use crate::float_types::{Real, tolerance};
use crate::spatial::{ClosestPoint, SpatialIndex};
use nalgebra::{Point3, Vector3};
use std::sync::Arc;

/// Where a point lies relative to a closed surface
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BoundedSide {
    Inside,
    Outside,
    OnBoundary,
}

/// Ray directions tried in turn until one crosses the surface cleanly.
/// None of them is parallel to a coordinate plane or to a diagonal.
const GENERIC_DIRECTIONS: [[Real; 3]; 6] = [
    [0.318_309_886, 0.271_828_183, 0.908_248_290],
    [-0.618_033_989, 0.707_106_781, 0.343_145_751],
    [0.816_496_581, -0.408_248_290, 0.412_310_563],
    [-0.235_702_260, -0.942_809_042, 0.237_170_825],
    [0.577_215_665, 0.141_421_356, -0.804_133_968],
    [-0.447_213_595, -0.229_415_734, -0.864_664_717],
];

/// Parity-of-crossings classifier sharing a [`SpatialIndex`].
///
/// Only meaningful when the indexed surface is closed; the field decides
/// closedness once and never builds a classifier for open surfaces or soups.
#[derive(Debug, Clone)]
pub struct SideOfSurface {
    index: Arc<SpatialIndex>,
}

impl SideOfSurface {
    pub const fn new(index: Arc<SpatialIndex>) -> Self {
        SideOfSurface { index }
    }

    pub fn index(&self) -> &Arc<SpatialIndex> {
        &self.index
    }

    /// Classify `p`.
    ///
    /// Points within [`tolerance`] of the surface are `OnBoundary`. Otherwise
    /// a ray is cast along each generic direction until one avoids every edge,
    /// vertex and triangle plane, and the parity of its crossings decides.
    pub fn classify(&self, p: &Point3<Real>) -> BoundedSide {
        self.classify_near(p, &self.index.closest(p))
    }

    /// [`classify`](Self::classify) with the closest-point query already answered
    pub fn classify_near(&self, p: &Point3<Real>, closest: &ClosestPoint) -> BoundedSide {
        if closest.squared_distance.max(0.0).sqrt() <= tolerance() {
            return BoundedSide::OnBoundary;
        }

        for dir in GENERIC_DIRECTIONS {
            let dir = Vector3::from(dir);
            if let Some(crossings) = self.index.ray_crossings(p, &dir) {
                return if crossings % 2 == 1 {
                    BoundedSide::Inside
                } else {
                    BoundedSide::Outside
                };
            }
        }

        // Every ray grazed something; fall back on the side of the closest facet
        log::warn!("all classification rays were degenerate at {p}, using the closest facet normal");
        match self.index.primitive_normal(closest.primitive) {
            Some(normal) if normal.dot(&(p - closest.point)) < 0.0 => BoundedSide::Inside,
            _ => BoundedSide::Outside,
        }
    }

    pub fn is_inside(&self, p: &Point3<Real>) -> bool {
        self.classify(p) == BoundedSide::Inside
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::indexed_mesh::IndexedMesh;

    fn classifier(mesh: &IndexedMesh<()>) -> SideOfSurface {
        SideOfSurface::new(Arc::new(SpatialIndex::build(mesh).unwrap()))
    }

    #[test]
    fn cube_sides() {
        let side = classifier(&IndexedMesh::<()>::cube(2.0, None).triangulate());
        assert_eq!(side.classify(&Point3::new(1.0, 1.0, 1.0)), BoundedSide::Inside);
        assert_eq!(side.classify(&Point3::new(0.1, 1.9, 0.5)), BoundedSide::Inside);
        assert_eq!(side.classify(&Point3::new(3.0, 1.0, 1.0)), BoundedSide::Outside);
        assert_eq!(side.classify(&Point3::new(-0.5, -0.5, -0.5)), BoundedSide::Outside);
        assert_eq!(side.classify(&Point3::new(2.0, 1.0, 1.0)), BoundedSide::OnBoundary);
        assert_eq!(side.classify(&Point3::new(0.0, 0.0, 0.0)), BoundedSide::OnBoundary);
    }

    #[test]
    fn points_on_face_diagonals_are_not_misclassified() {
        // straight above or below the fan diagonal of the top face
        let side = classifier(&IndexedMesh::<()>::cube(2.0, None).triangulate());
        for p in [
            Point3::new(1.0, 1.0, 0.5),
            Point3::new(1.5, 1.5, 1.0),
            Point3::new(1.0, 1.0, 3.0),
        ] {
            let expected = if p.z < 2.0 {
                BoundedSide::Inside
            } else {
                BoundedSide::Outside
            };
            assert_eq!(side.classify(&p), expected, "{p}");
        }
    }

    #[test]
    fn icosahedron_sides() {
        let side = classifier(&IndexedMesh::<()>::icosahedron(1.0, None));
        assert!(side.is_inside(&Point3::origin()));
        assert!(side.is_inside(&Point3::new(0.3, -0.2, 0.4)));
        assert!(!side.is_inside(&Point3::new(0.0, 0.0, 1.2)));
        assert_eq!(
            side.classify(&Point3::new(0.0, 0.0, 1.2)),
            BoundedSide::Outside
        );
    }
}
