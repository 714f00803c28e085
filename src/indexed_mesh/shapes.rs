//! Closed test solids as `IndexedMesh`s

use crate::errors::OffsetError;
use crate::float_types::Real;
use crate::indexed_mesh::plane::Plane;
use crate::indexed_mesh::{IndexedMesh, IndexedPolygon, IndexedVertex};
use nalgebra::{Point3, Vector3};
use std::fmt::Debug;

impl<S: Clone + Debug + Send + Sync> IndexedMesh<S> {
    /// **Mathematical Foundations for 3D Box Geometry with Indexed Connectivity**
    ///
    /// ## **Vertex Indexing Strategy**
    /// ```text
    ///     4-------5
    ///    /|      /|
    ///   0-------1 |
    ///   | |     | |
    ///   | 7-----|-6
    ///   |/      |/
    ///   3-------2
    /// ```
    ///
    /// ## **Face Connectivity (6 faces, each using 4 vertex indices)**
    /// - **Bottom**: [0,3,2,1] (z=0, normal -Z)
    /// - **Top**: [4,5,6,7] (z=height, normal +Z)
    /// - **Front**: [0,1,5,4] (y=0, normal -Y)
    /// - **Back**: [3,7,6,2] (y=length, normal +Y)
    /// - **Left**: [0,4,7,3] (x=0, normal -X)
    /// - **Right**: [1,2,6,5] (x=width, normal +X)
    pub fn cuboid(width: Real, length: Real, height: Real, metadata: Option<S>) -> IndexedMesh<S> {
        let vertices = vec![
            IndexedVertex::at(Point3::new(0.0, 0.0, 0.0)),
            IndexedVertex::at(Point3::new(width, 0.0, 0.0)),
            IndexedVertex::at(Point3::new(width, length, 0.0)),
            IndexedVertex::at(Point3::new(0.0, length, 0.0)),
            IndexedVertex::at(Point3::new(0.0, 0.0, height)),
            IndexedVertex::at(Point3::new(width, 0.0, height)),
            IndexedVertex::at(Point3::new(width, length, height)),
            IndexedVertex::at(Point3::new(0.0, length, height)),
        ];

        // CCW from outside
        let face_definitions = [
            (vec![0, 3, 2, 1], -Vector3::z()),
            (vec![4, 5, 6, 7], Vector3::z()),
            (vec![0, 1, 5, 4], -Vector3::y()),
            (vec![3, 7, 6, 2], Vector3::y()),
            (vec![0, 4, 7, 3], -Vector3::x()),
            (vec![1, 2, 6, 5], Vector3::x()),
        ];

        let polygons = face_definitions
            .into_iter()
            .map(|(indices, normal)| {
                let plane =
                    Plane::from_normal(normal, normal.dot(&vertices[indices[0]].pos.coords));
                IndexedPolygon::new(indices, plane, metadata.clone())
            })
            .collect();

        let mut mesh = IndexedMesh {
            vertices,
            polygons,
            bounding_box: std::sync::OnceLock::new(),
            metadata,
        };
        mesh.compute_vertex_normals();
        mesh
    }

    pub fn cube(width: Real, metadata: Option<S>) -> IndexedMesh<S> {
        Self::cuboid(width, width, width, metadata)
    }

    /// Build a mesh from explicit points and faces.
    ///
    /// Faces with fewer than three indices are skipped. A face referring to a
    /// missing point fails with [`OffsetError::IndexOutOfRange`], and a
    /// non-finite coordinate with [`OffsetError::InvalidCoordinate`].
    pub fn polyhedron(
        points: &[[Real; 3]],
        faces: &[&[usize]],
        metadata: Option<S>,
    ) -> Result<IndexedMesh<S>, OffsetError> {
        let mut vertices = Vec::with_capacity(points.len());
        for &[x, y, z] in points {
            let pos = Point3::new(x, y, z);
            if !(x.is_finite() && y.is_finite() && z.is_finite()) {
                return Err(OffsetError::InvalidCoordinate(pos));
            }
            vertices.push(IndexedVertex::at(pos));
        }

        let mut polygons = Vec::with_capacity(faces.len());
        for (face_idx, face) in faces.iter().enumerate() {
            if face.len() < 3 {
                continue;
            }
            if let Some(&index) = face.iter().find(|&&idx| idx >= points.len()) {
                return Err(OffsetError::IndexOutOfRange {
                    face: face_idx,
                    index,
                    len: points.len(),
                });
            }

            let corners: Vec<IndexedVertex> = face.iter().map(|&idx| vertices[idx]).collect();
            let plane = Plane::from_indexed_vertices(&corners);
            polygons.push(IndexedPolygon::new(face.to_vec(), plane, metadata.clone()));
        }

        let mut mesh = IndexedMesh {
            vertices,
            polygons,
            bounding_box: std::sync::OnceLock::new(),
            metadata,
        };
        mesh.compute_vertex_normals();
        Ok(mesh)
    }

    /// Regular octahedron with circumradius `radius`, centred at the origin
    pub fn octahedron(radius: Real, metadata: Option<S>) -> IndexedMesh<S> {
        let pts = [
            [radius, 0.0, 0.0],
            [-radius, 0.0, 0.0],
            [0.0, radius, 0.0],
            [0.0, -radius, 0.0],
            [0.0, 0.0, radius],
            [0.0, 0.0, -radius],
        ];
        let faces: [[usize; 3]; 8] = [
            [0, 2, 4],
            [2, 1, 4],
            [1, 3, 4],
            [3, 0, 4],
            [5, 2, 0],
            [5, 1, 2],
            [5, 3, 1],
            [5, 0, 3],
        ];
        Self::from_triangles(
            pts.iter().map(|&[x, y, z]| Point3::new(x, y, z)).collect(),
            &faces,
            metadata,
        )
    }

    /// Regular icosahedron with circumradius `radius`, centred at the origin
    pub fn icosahedron(radius: Real, metadata: Option<S>) -> IndexedMesh<S> {
        // golden ratio
        let phi: Real = (1.0 + (5.0 as Real).sqrt()) * 0.5;
        // normalise so the circum-radius is `radius`
        let inv_len = radius / (1.0 + phi * phi).sqrt();
        let a = inv_len;
        let b = phi * inv_len;

        let pts: [[Real; 3]; 12] = [
            [-a, b, 0.0],
            [a, b, 0.0],
            [-a, -b, 0.0],
            [a, -b, 0.0],
            [0.0, -a, b],
            [0.0, a, b],
            [0.0, -a, -b],
            [0.0, a, -b],
            [b, 0.0, -a],
            [b, 0.0, a],
            [-b, 0.0, -a],
            [-b, 0.0, a],
        ];

        // 20 faces (counter-clockwise when viewed from outside)
        let faces: [[usize; 3]; 20] = [
            [0, 11, 5],
            [0, 5, 1],
            [0, 1, 7],
            [0, 7, 10],
            [0, 10, 11],
            [1, 5, 9],
            [5, 11, 4],
            [11, 10, 2],
            [10, 7, 6],
            [7, 1, 8],
            [3, 9, 4],
            [3, 4, 2],
            [3, 2, 6],
            [3, 6, 8],
            [3, 8, 9],
            [4, 9, 5],
            [2, 4, 11],
            [6, 2, 10],
            [8, 6, 7],
            [9, 8, 1],
        ];

        Self::from_triangles(
            pts.iter().map(|&[x, y, z]| Point3::new(x, y, z)).collect(),
            &faces,
            metadata,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn icosahedron_has_exact_circumradius() {
        let ico = IndexedMesh::<()>::icosahedron(2.5, None);
        assert_eq!(ico.vertices.len(), 12);
        assert_eq!(ico.polygons.len(), 20);
        for v in &ico.vertices {
            assert!((v.pos.coords.norm() - 2.5).abs() < 1e-9);
            // vertex normals of a centred regular solid are radial
            assert!((v.normal - v.pos.coords / 2.5).norm() < 1e-9);
        }
        assert!(ico.is_outward_oriented());
    }

    #[test]
    fn octahedron_volume() {
        let octa = IndexedMesh::<()>::octahedron(1.0, None);
        assert!(octa.is_closed());
        assert!((octa.signed_volume() - 4.0 / 3.0).abs() < 1e-9);
    }

    #[test]
    fn polyhedron_rejects_bad_input() {
        let pts = [[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]];
        let err = IndexedMesh::<()>::polyhedron(&pts, &[&[0, 1, 3]], None).unwrap_err();
        assert!(matches!(
            err,
            OffsetError::IndexOutOfRange { face: 0, index: 3, len: 3 }
        ));

        let nan = [[0.0, 0.0, Real::NAN], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]];
        let err = IndexedMesh::<()>::polyhedron(&nan, &[&[0, 1, 2]], None).unwrap_err();
        assert!(matches!(err, OffsetError::InvalidCoordinate(_)));

        // degenerate faces are skipped
        let ok = IndexedMesh::<()>::polyhedron(&pts, &[&[0, 1], &[0, 1, 2]], None).unwrap();
        assert_eq!(ok.polygons.len(), 1);
    }
}
