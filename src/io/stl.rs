use crate::float_types::Real;
use crate::indexed_mesh::IndexedMesh;
use nalgebra::{Point3, Vector3};
use std::{fmt::Write as _, fmt::Debug, io::Cursor};

/// Facets of `mesh` with their face normals, fan-triangulating larger polygons
fn facets<S: Clone + Send + Sync + Debug>(
    mesh: &IndexedMesh<S>,
) -> impl Iterator<Item = (Vector3<Real>, [Point3<Real>; 3])> + '_ {
    mesh.polygons.iter().flat_map(move |polygon| {
        let normal = polygon.plane.normal();
        polygon
            .triangulate()
            .into_iter()
            .map(move |tri| (normal, tri.map(|i| mesh.vertices[i].pos)))
    })
}

/// Export to ASCII STL
/// Convert this mesh to an **ASCII STL** string with the given `name`.
///
/// ```rust
/// # use offmesh::indexed_mesh::IndexedMesh;
/// let mesh = IndexedMesh::<()>::cube(1.0, None);
/// let text = offmesh::io::to_stl_ascii(&mesh, "my_solid");
/// assert!(text.starts_with("solid my_solid"));
/// ```
pub fn to_stl_ascii<S: Clone + Send + Sync + Debug>(mesh: &IndexedMesh<S>, name: &str) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "solid {name}");

    for (n, tri) in facets(mesh) {
        let _ = writeln!(out, "  facet normal {:.6} {:.6} {:.6}", n.x, n.y, n.z);
        out.push_str("    outer loop\n");
        for p in &tri {
            let _ = writeln!(out, "      vertex {:.6} {:.6} {:.6}", p.x, p.y, p.z);
        }
        out.push_str("    endloop\n");
        out.push_str("  endfacet\n");
    }

    let _ = writeln!(out, "endsolid {name}");
    out
}

/// Export to BINARY STL (returns `Vec<u8>`)
///
/// The binary header carries no name, so `_name` is unused.
pub fn to_stl_binary<S: Clone + Send + Sync + Debug>(
    mesh: &IndexedMesh<S>,
    _name: &str,
) -> std::io::Result<Vec<u8>> {
    use stl_io::{Normal, Triangle, Vertex, write_stl};

    #[allow(clippy::unnecessary_cast)]
    let triangles: Vec<Triangle> = facets(mesh)
        .map(|(n, tri)| Triangle {
            normal: Normal::new([n.x as f32, n.y as f32, n.z as f32]),
            vertices: tri.map(|p| Vertex::new([p.x as f32, p.y as f32, p.z as f32])),
        })
        .collect();

    let mut cursor = Cursor::new(Vec::new());
    write_stl(&mut cursor, triangles.iter())?;
    Ok(cursor.into_inner())
}

impl<S: Clone + Debug + Send + Sync> IndexedMesh<S> {
    pub fn to_stl_ascii(&self, name: &str) -> String {
        self::to_stl_ascii(self, name)
    }

    pub fn to_stl_binary(&self, name: &str) -> std::io::Result<Vec<u8>> {
        self::to_stl_binary(self, name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ascii_lists_every_triangle() {
        let cube = IndexedMesh::<()>::cube(1.0, None);
        let text = cube.to_stl_ascii("cube");
        assert!(text.starts_with("solid cube\n"));
        assert!(text.ends_with("endsolid cube\n"));
        // six quads, two triangles each
        assert_eq!(text.matches("facet normal").count(), 12);
        assert_eq!(text.matches("vertex ").count(), 36);
    }

    #[test]
    fn binary_has_header_count_and_records() {
        let ico = IndexedMesh::<()>::icosahedron(1.0, None);
        let bytes = ico.to_stl_binary("ico").unwrap();
        assert_eq!(bytes.len(), 84 + 20 * 50);
        assert_eq!(u32::from_le_bytes([bytes[80], bytes[81], bytes[82], bytes[83]]), 20);
    }
}
