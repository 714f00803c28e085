//! Spatial queries over triangulated surfaces
//!
//! [`SpatialIndex`] answers closest-point queries and counts ray crossings,
//! [`SideOfSurface`] turns those crossings into an inside/outside answer.
//! Both are built from any [`TriangleSource`].

pub mod aabb_tree;
pub mod side_of;

pub use aabb_tree::{ClosestPoint, SpatialIndex};
pub use side_of::{BoundedSide, SideOfSurface};

use crate::errors::OffsetError;
use crate::float_types::Real;
use crate::indexed_mesh::IndexedMesh;
use crate::polygon_soup::PolygonSoup;
use crate::traits::TriangleSource;
use nalgebra::Point3;
use std::fmt::Debug;

#[inline]
fn centroid([a, b, c]: &[Point3<Real>; 3]) -> Point3<Real> {
    Point3::from((a.coords + b.coords + c.coords) / 3.0)
}

/// Each polygon is one primitive; meshes are expected to be triangulated first.
impl<S: Clone + Send + Sync + Debug> TriangleSource for IndexedMesh<S> {
    fn primitive_count(&self) -> usize {
        self.polygons.len()
    }

    fn reference_point(&self, id: usize) -> Result<Point3<Real>, OffsetError> {
        self.triangle(id).map(|tri| centroid(&tri))
    }

    fn triangle(&self, id: usize) -> Result<[Point3<Real>; 3], OffsetError> {
        let polygon = &self.polygons[id];
        let &[a, b, c] = polygon.indices.as_slice() else {
            return Err(OffsetError::NonTriangularPolygon {
                polygon: id,
                vertex_count: polygon.indices.len(),
            });
        };
        let vertex = |index: usize| {
            self.vertices
                .get(index)
                .map(|v| v.pos)
                .ok_or(OffsetError::IndexOutOfRange {
                    face: id,
                    index,
                    len: self.vertices.len(),
                })
        };
        Ok([vertex(a)?, vertex(b)?, vertex(c)?])
    }
}

impl TriangleSource for PolygonSoup {
    fn primitive_count(&self) -> usize {
        self.polygons.len()
    }

    fn reference_point(&self, id: usize) -> Result<Point3<Real>, OffsetError> {
        self.triangle(id).map(|tri| centroid(&tri))
    }

    fn triangle(&self, id: usize) -> Result<[Point3<Real>; 3], OffsetError> {
        let polygon = &self.polygons[id];
        let &[a, b, c] = polygon.as_slice() else {
            return Err(OffsetError::NonTriangularPolygon {
                polygon: id,
                vertex_count: polygon.len(),
            });
        };
        Ok([self.point(id, a)?, self.point(id, b)?, self.point(id, c)?])
    }
}
