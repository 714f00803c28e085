//! Vertex storage shared by the polygons of an `IndexedMesh`

use crate::float_types::Real;
use nalgebra::{Point3, Vector3};

/// A mesh vertex: a position and a (possibly zero) normal.
#[derive(Debug, Clone, PartialEq, Copy)]
pub struct IndexedVertex {
    pub pos: Point3<Real>,
    pub normal: Vector3<Real>,
}

impl IndexedVertex {
    /// Create a new IndexedVertex with sanitized coordinates.
    ///
    /// Non-finite components become zero. Positions assigned directly to the
    /// public fields are not sanitized; [`IndexedMesh::validate`](crate::indexed_mesh::IndexedMesh::validate)
    /// reports them.
    #[inline]
    pub const fn new(mut pos: Point3<Real>, mut normal: Vector3<Real>) -> Self {
        // Sanitise position - const-compatible loop unrolling
        let [[x, y, z]]: &mut [[_; 3]; 1] = &mut pos.coords.data.0;
        if !x.is_finite() {
            *x = 0.0;
        }
        if !y.is_finite() {
            *y = 0.0;
        }
        if !z.is_finite() {
            *z = 0.0;
        }

        // Sanitise normal
        let [[nx, ny, nz]]: &mut [[_; 3]; 1] = &mut normal.data.0;
        if !nx.is_finite() {
            *nx = 0.0;
        }
        if !ny.is_finite() {
            *ny = 0.0;
        }
        if !nz.is_finite() {
            *nz = 0.0;
        }

        IndexedVertex { pos, normal }
    }

    /// A vertex at `pos` whose normal is computed later
    #[inline]
    pub const fn at(pos: Point3<Real>) -> Self {
        Self::new(pos, Vector3::new(0.0, 0.0, 0.0))
    }

    /// Flip vertex normal
    pub fn flip(&mut self) {
        self.normal = -self.normal;
    }

    /// Distance between vertex positions
    pub fn distance_to(&self, other: &IndexedVertex) -> Real {
        (self.pos - other.pos).norm()
    }

    /// Move the vertex `distance` along its normal.
    ///
    /// A zero normal leaves the vertex in place.
    pub fn displaced(&self, distance: Real) -> IndexedVertex {
        let len = self.normal.norm();
        if len <= Real::EPSILON {
            return *self;
        }
        let n = self.normal / len;
        IndexedVertex::new(self.pos + n * distance, n)
    }
}
