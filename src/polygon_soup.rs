//! Polygon soups: points and index lists without any topological guarantee

use crate::errors::OffsetError;
use crate::float_types::{Real, parry3d::bounding_volume::Aabb};
use crate::indexed_mesh::IndexedMesh;
use nalgebra::Point3;
use std::fmt::Debug;

/// A bag of polygons over a shared point array.
///
/// Nothing is assumed about how the polygons connect: edges may be shared by
/// any number of faces and orientations may disagree. Only triangles can be
/// offset; other polygons are reported when the spatial index is built.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PolygonSoup {
    pub points: Vec<Point3<Real>>,
    pub polygons: Vec<Vec<usize>>,
}

impl PolygonSoup {
    pub const fn new(points: Vec<Point3<Real>>, polygons: Vec<Vec<usize>>) -> Self {
        PolygonSoup { points, polygons }
    }

    /// Copy the vertex positions and face indices of a mesh
    pub fn from_mesh<S: Clone + Send + Sync + Debug>(mesh: &IndexedMesh<S>) -> Self {
        PolygonSoup {
            points: mesh.vertices.iter().map(|v| v.pos).collect(),
            polygons: mesh.polygons.iter().map(|p| p.indices.clone()).collect(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.polygons.is_empty()
    }

    /// Axis aligned box over the points referenced by at least one polygon.
    ///
    /// Dangling indices are reported rather than skipped.
    pub fn bounding_box(&self) -> Result<Aabb, OffsetError> {
        let mut bounds: Option<(Point3<Real>, Point3<Real>)> = None;
        for (face, polygon) in self.polygons.iter().enumerate() {
            for &index in polygon {
                let p = self.point(face, index)?;
                bounds = Some(match bounds {
                    Some((mins, maxs)) => (mins.inf(&p), maxs.sup(&p)),
                    None => (p, p),
                });
            }
        }
        let (mins, maxs) = bounds.unwrap_or((Point3::origin(), Point3::origin()));
        Ok(Aabb::new(mins, maxs))
    }

    /// Point `index` as referenced by polygon `face`
    pub(crate) fn point(&self, face: usize, index: usize) -> Result<Point3<Real>, OffsetError> {
        self.points
            .get(index)
            .copied()
            .ok_or(OffsetError::IndexOutOfRange {
                face,
                index,
                len: self.points.len(),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_mesh_keeps_faces() {
        let cube = IndexedMesh::<()>::cube(1.0, None);
        let soup = PolygonSoup::from_mesh(&cube);
        assert_eq!(soup.points.len(), 8);
        assert_eq!(soup.polygons.len(), 6);
        let bb = soup.bounding_box().unwrap();
        assert_eq!(bb.mins, Point3::new(0.0, 0.0, 0.0));
        assert_eq!(bb.maxs, Point3::new(1.0, 1.0, 1.0));
    }

    #[test]
    fn bounding_box_ignores_unreferenced_points() {
        let soup = PolygonSoup::new(
            vec![
                Point3::new(0.0, 0.0, 0.0),
                Point3::new(1.0, 0.0, 0.0),
                Point3::new(0.0, 1.0, 0.0),
                Point3::new(50.0, 50.0, 50.0),
            ],
            vec![vec![0, 1, 2]],
        );
        assert_eq!(soup.bounding_box().unwrap().maxs, Point3::new(1.0, 1.0, 0.0));

        let dangling = PolygonSoup::new(soup.points.clone(), vec![vec![0, 1, 9]]);
        assert!(matches!(
            dangling.bounding_box(),
            Err(OffsetError::IndexOutOfRange { face: 0, index: 9, len: 4 })
        ));
    }
}
