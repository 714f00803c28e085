//! `IndexedMesh`: shared vertices plus polygons referencing them by index.
//!
//! This is the representation both accepted as input (the "surface mesh"
//! variant, with a well-defined [`IndexedMesh::is_closed`] predicate) and
//! produced as the result of every offset meshing job.

use crate::float_types::{
    Real,
    parry3d::bounding_volume::Aabb,
};
use crate::errors::OffsetError;
use nalgebra::{Point3, Vector3};
use std::{fmt::Debug, sync::OnceLock};

/// Manifold topology validation for IndexedMesh
pub mod manifold;

/// Plane operations for IndexedMesh polygons
pub mod plane;

/// Shape generation functions for IndexedMesh
pub mod shapes;

/// Vertex type for IndexedMesh
pub mod vertex;

pub use vertex::IndexedVertex;

/// An indexed polygon, defined by indices into a vertex array.
/// - `S` is the generic metadata type, stored as `Option<S>`.
#[derive(Debug, Clone)]
pub struct IndexedPolygon<S: Clone> {
    /// Indices into the vertex array
    pub indices: Vec<usize>,

    /// The plane on which this Polygon lies
    pub plane: plane::Plane,

    /// Generic metadata associated with the Polygon
    pub metadata: Option<S>,
}

impl<S: Clone + Send + Sync + Debug> IndexedPolygon<S> {
    /// Create an indexed polygon from indices
    pub fn new(indices: Vec<usize>, plane: plane::Plane, metadata: Option<S>) -> Self {
        debug_assert!(indices.len() >= 3, "degenerate polygon");

        IndexedPolygon {
            indices,
            plane,
            metadata,
        }
    }

    /// Reverses winding order and flips the plane normal
    pub fn flip(&mut self) {
        self.indices.reverse();
        self.plane.flip();
    }

    /// Return an iterator over paired indices each forming an edge of the polygon
    pub fn edges(&self) -> impl Iterator<Item = (usize, usize)> + '_ {
        self.indices
            .iter()
            .zip(self.indices.iter().cycle().skip(1))
            .map(|(&a, &b)| (a, b))
    }

    /// Fan triangulation from the first corner
    pub fn triangulate(&self) -> Vec<[usize; 3]> {
        if self.indices.len() < 3 {
            return Vec::new();
        }
        (1..self.indices.len() - 1)
            .map(|i| [self.indices[0], self.indices[i], self.indices[i + 1]])
            .collect()
    }
}

#[derive(Clone, Debug)]
pub struct IndexedMesh<S: Clone + Send + Sync + Debug> {
    /// Shared vertices
    pub vertices: Vec<IndexedVertex>,

    /// Indexed polygons for volumetric shapes
    pub polygons: Vec<IndexedPolygon<S>>,

    /// Lazily calculated AABB that spans `vertices`.
    pub bounding_box: OnceLock<Aabb>,

    /// Metadata
    pub metadata: Option<S>,
}

impl<S: Clone + Send + Sync + Debug> Default for IndexedMesh<S> {
    fn default() -> Self {
        Self::new()
    }
}

impl<S: Clone + Send + Sync + Debug> IndexedMesh<S> {
    /// Returns a new empty IndexedMesh
    pub const fn new() -> Self {
        IndexedMesh {
            vertices: Vec::new(),
            polygons: Vec::new(),
            bounding_box: OnceLock::new(),
            metadata: None,
        }
    }

    /// Build an IndexedMesh from a point array and triangles over it.
    ///
    /// Indices are trusted; callers validate them beforehand. Vertex normals
    /// are computed from the faces.
    pub fn from_triangles(
        points: Vec<Point3<Real>>,
        triangles: &[[usize; 3]],
        metadata: Option<S>,
    ) -> Self {
        let vertices: Vec<IndexedVertex> = points.into_iter().map(IndexedVertex::at).collect();
        let polygons = triangles
            .iter()
            .map(|&[a, b, c]| {
                let plane =
                    plane::Plane::from_points(vertices[a].pos, vertices[b].pos, vertices[c].pos);
                IndexedPolygon::new(vec![a, b, c], plane, metadata.clone())
            })
            .collect();

        let mut mesh = IndexedMesh {
            vertices,
            polygons,
            bounding_box: OnceLock::new(),
            metadata,
        };
        mesh.compute_vertex_normals();
        mesh
    }

    /// Number of shared vertices
    #[inline]
    pub fn vertex_count(&self) -> usize {
        self.vertices.len()
    }

    /// True when every polygon is a triangle
    pub fn is_triangulated(&self) -> bool {
        self.polygons.iter().all(|p| p.indices.len() == 3)
    }

    /// Check that every polygon index refers to a vertex and that every
    /// referenced position is finite.
    ///
    /// [`IndexedVertex::new`] zeroes non-finite coordinates, but `vertices` is
    /// public and may be filled directly, so meshes are checked here before
    /// any index is followed.
    pub fn validate(&self) -> Result<(), OffsetError> {
        for (face, polygon) in self.polygons.iter().enumerate() {
            for &index in &polygon.indices {
                let vertex = self.vertices.get(index).ok_or(OffsetError::IndexOutOfRange {
                    face,
                    index,
                    len: self.vertices.len(),
                })?;
                if !vertex.pos.coords.iter().all(|c| c.is_finite()) {
                    return Err(OffsetError::InvalidCoordinate(vertex.pos));
                }
            }
        }
        Ok(())
    }

    /// Triangulate each polygon, returning a mesh made only of triangles.
    ///
    /// Indices are followed unchecked; call [`validate`](Self::validate) first
    /// on meshes from outside the crate.
    pub fn triangulate(&self) -> IndexedMesh<S> {
        let polygons = self
            .polygons
            .iter()
            .flat_map(|poly| {
                poly.triangulate().into_iter().map(move |[a, b, c]| {
                    let plane = plane::Plane::from_points(
                        self.vertices[a].pos,
                        self.vertices[b].pos,
                        self.vertices[c].pos,
                    );
                    IndexedPolygon::new(vec![a, b, c], plane, poly.metadata.clone())
                })
            })
            .collect();

        IndexedMesh {
            vertices: self.vertices.clone(),
            polygons,
            bounding_box: OnceLock::new(),
            metadata: self.metadata.clone(),
        }
    }

    /// Iterate over the fan triangles of every polygon as vertex positions
    pub fn triangles(&self) -> impl Iterator<Item = [Point3<Real>; 3]> + '_ {
        self.polygons.iter().flat_map(move |poly| {
            poly.triangulate().into_iter().map(move |[a, b, c]| {
                [
                    self.vertices[a].pos,
                    self.vertices[b].pos,
                    self.vertices[c].pos,
                ]
            })
        })
    }

    /// Axis aligned bounding box of the vertices (cached after first call).
    /// An empty mesh has a degenerate box at the origin.
    pub fn bounding_box(&self) -> Aabb {
        *self.bounding_box.get_or_init(|| {
            let mut iter = self.vertices.iter();
            let Some(first) = iter.next() else {
                return Aabb::new(Point3::origin(), Point3::origin());
            };
            let (mins, maxs) = iter.fold((first.pos, first.pos), |(mins, maxs), v| {
                (mins.inf(&v.pos), maxs.sup(&v.pos))
            });
            Aabb::new(mins, maxs)
        })
    }

    /// Drop the cached bounding box after moving vertices
    pub fn invalidate_bounding_box(&mut self) {
        self.bounding_box = OnceLock::new();
    }

    /// **Mathematical Foundation: Manifold Closure Test**
    ///
    /// A mesh is closed if every undirected edge is shared by exactly two faces.
    /// An empty mesh is not closed.
    pub fn is_closed(&self) -> bool {
        if self.polygons.is_empty() {
            return false;
        }
        let edge_faces = manifold::edge_faces(self.polygons.iter().map(|p| p.indices.as_slice()));
        edge_faces.values().all(|faces| faces.len() == 2)
    }

    /// **Mathematical Foundation: Signed Volume**
    ///
    /// Sum over fan triangles of the signed tetrahedron volume against the
    /// origin:
    /// ```text
    /// V = (1/6) * Σ p0 · (p1 × p2)
    /// ```
    /// Positive when the faces of a closed mesh point outward.
    pub fn signed_volume(&self) -> Real {
        self.triangles()
            .map(|[p0, p1, p2]| p0.coords.dot(&p1.coords.cross(&p2.coords)))
            .sum::<Real>()
            / 6.0
    }

    /// Enclosed volume of a closed mesh, independent of orientation
    pub fn volume(&self) -> Real {
        self.signed_volume().abs()
    }

    /// Total area of all polygons
    pub fn surface_area(&self) -> Real {
        self.triangles()
            .map(|[p0, p1, p2]| (p1 - p0).cross(&(p2 - p0)).norm() * 0.5)
            .sum()
    }

    /// Whether the faces of this mesh point away from the enclosed volume.
    ///
    /// Only meaningful for closed meshes; open meshes always report `false`.
    pub fn is_outward_oriented(&self) -> bool {
        self.is_closed() && self.signed_volume() > 0.0
    }

    /// Reverse the winding of every polygon, along with planes and vertex normals
    pub fn reverse_face_orientations(&mut self) {
        for polygon in &mut self.polygons {
            polygon.flip();
        }
        for vertex in &mut self.vertices {
            vertex.flip();
        }
    }

    /// **Mathematical Foundation: Vertex Normal Computation with Indexed Connectivity**
    ///
    /// Computes vertex normals by averaging adjacent face normals, weighted by face area.
    pub fn compute_vertex_normals(&mut self) {
        self.vertices
            .iter_mut()
            .for_each(|vertex| vertex.normal = Vector3::zeros());

        for polygon in &self.polygons {
            for [a, b, c] in polygon.triangulate() {
                // Cross product length is twice the area, which is the weight we want
                let weighted =
                    (self.vertices[b].pos - self.vertices[a].pos)
                        .cross(&(self.vertices[c].pos - self.vertices[a].pos));
                for idx in [a, b, c] {
                    self.vertices[idx].normal += weighted;
                }
            }
        }

        self.vertices.iter_mut().for_each(|vertex| {
            let norm = vertex.normal.norm();
            if norm > Real::EPSILON {
                vertex.normal /= norm;
            }
        });
    }

    /// Inflate (or deflate, for negative `distance`) the mesh by moving every
    /// vertex along its normalized vertex normal.
    ///
    /// This is a purely local operation: unlike an offset surface it keeps
    /// the connectivity and may self-intersect for large distances.
    pub fn inflate(&mut self, distance: Real) {
        if self.vertices.iter().all(|v| v.normal == Vector3::zeros()) {
            self.compute_vertex_normals();
        }
        for vertex in &mut self.vertices {
            *vertex = vertex.displaced(distance);
        }
        for polygon in &mut self.polygons {
            let corners: Vec<IndexedVertex> =
                polygon.indices.iter().map(|&i| self.vertices[i]).collect();
            polygon.plane = plane::Plane::from_indexed_vertices(&corners);
        }
        self.invalidate_bounding_box();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validate_reports_dangling_indices_and_bad_positions() {
        let mut cube = IndexedMesh::<()>::cube(1.0, None);
        assert!(cube.validate().is_ok());

        cube.polygons[2].indices[3] = 99;
        assert!(matches!(
            cube.validate(),
            Err(OffsetError::IndexOutOfRange { face: 2, index: 99, len: 8 })
        ));

        let mut cube = IndexedMesh::<()>::cube(1.0, None);
        cube.vertices[5].pos.x = Real::INFINITY;
        assert!(matches!(cube.validate(), Err(OffsetError::InvalidCoordinate(_))));

        // unreferenced vertices are not checked
        let mut cube = IndexedMesh::<()>::cube(1.0, None);
        cube.vertices.push(IndexedVertex {
            pos: Point3::new(Real::NAN, 0.0, 0.0),
            normal: Vector3::zeros(),
        });
        assert!(cube.validate().is_ok());
    }

    #[test]
    fn cube_is_closed_and_outward() {
        let cube = IndexedMesh::<()>::cube(2.0, None);
        assert!(cube.is_closed());
        assert!(cube.is_outward_oriented());
        assert!((cube.signed_volume() - 8.0).abs() < 1e-9);
        assert!((cube.surface_area() - 24.0).abs() < 1e-9);
    }

    #[test]
    fn reversing_flips_the_sign_of_the_volume() {
        let mut ico = IndexedMesh::<()>::icosahedron(1.0, None);
        let before = ico.signed_volume();
        ico.reverse_face_orientations();
        assert!(before > 0.0);
        assert!((ico.signed_volume() + before).abs() < 1e-9);
        assert!(!ico.is_outward_oriented());
    }

    #[test]
    fn open_mesh_is_not_closed() {
        let mut cube = IndexedMesh::<()>::cube(1.0, None);
        cube.polygons.pop();
        assert!(!cube.is_closed());
        assert!(!cube.is_outward_oriented());
        assert!(!IndexedMesh::<()>::new().is_closed());
    }

    #[test]
    fn triangulate_keeps_area() {
        let cube = IndexedMesh::<()>::cube(1.0, None);
        let tris = cube.triangulate();
        assert!(tris.is_triangulated());
        assert_eq!(tris.polygons.len(), 12);
        assert!((tris.surface_area() - cube.surface_area()).abs() < 1e-9);
        assert!(tris.is_closed());
    }

    #[test]
    fn inflate_moves_vertices_outward() {
        let mut ico = IndexedMesh::<()>::icosahedron(1.0, None);
        ico.inflate(0.25);
        for v in &ico.vertices {
            assert!((v.pos.coords.norm() - 1.25).abs() < 1e-9);
        }
        assert!((ico.bounding_box().maxs.x - ico.vertices.iter().map(|v| v.pos.x).fold(Real::MIN, Real::max)).abs() < 1e-12);
    }
}
