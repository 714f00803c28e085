//! Supporting planes of indexed polygons

use crate::float_types::Real;
use crate::indexed_mesh::vertex::IndexedVertex;
use nalgebra::{Point3, Vector3};

/// A plane `n·p = w` with unit normal `n`.
#[derive(Debug, Clone, PartialEq)]
pub struct Plane {
    /// Unit normal vector of the plane
    pub normal: Vector3<Real>,
    /// Distance from origin along normal (plane equation: n·p = w)
    pub w: Real,
}

impl Plane {
    /// Create a new plane from normal vector and distance
    pub fn from_normal(normal: Vector3<Real>, w: Real) -> Self {
        let normalized = normal.normalize();
        Plane {
            normal: normalized,
            w,
        }
    }

    /// Create a plane from three points
    /// The normal direction follows the right-hand rule: (p2-p1) × (p3-p1)
    pub fn from_points(p1: Point3<Real>, p2: Point3<Real>, p3: Point3<Real>) -> Self {
        let v1 = p2 - p1;
        let v2 = p3 - p1;
        let normal = v1.cross(&v2);

        if normal.norm_squared() < Real::EPSILON * Real::EPSILON {
            // Degenerate triangle, return default plane
            return Plane {
                normal: Vector3::z(),
                w: 0.0,
            };
        }

        let normal = normal.normalize();
        let w = normal.dot(&p1.coords);
        Plane { normal, w }
    }

    /// Plane of an arbitrary polygon, oriented by Newell's method so that it
    /// agrees with the polygon's winding even when the first corner is reflex.
    pub fn from_indexed_vertices(vertices: &[IndexedVertex]) -> Self {
        if vertices.len() < 3 {
            return Plane {
                normal: Vector3::z(),
                w: 0.0,
            };
        }
        if vertices.len() == 3 {
            return Self::from_points(vertices[0].pos, vertices[1].pos, vertices[2].pos);
        }

        let newell = vertices
            .iter()
            .zip(vertices.iter().cycle().skip(1))
            .fold(Vector3::zeros(), |acc, (curr, next)| {
                acc + curr.pos.coords.cross(&next.pos.coords)
            });
        if newell.norm_squared() < Real::EPSILON * Real::EPSILON {
            return Self::from_points(vertices[0].pos, vertices[1].pos, vertices[2].pos);
        }

        let normal = newell.normalize();
        let centroid = vertices.iter().map(|v| v.pos.coords).sum::<Vector3<Real>>()
            / vertices.len() as Real;
        Plane {
            w: normal.dot(&centroid),
            normal,
        }
    }

    /// Get the plane normal
    pub const fn normal(&self) -> Vector3<Real> {
        self.normal
    }

    /// Get the offset (distance from origin)
    pub const fn offset(&self) -> Real {
        self.w
    }

    /// Flip the plane (reverse normal and distance)
    pub fn flip(&mut self) {
        self.normal = -self.normal;
        self.w = -self.w;
    }

    /// Return a flipped copy of this plane
    pub fn flipped(&self) -> Self {
        Plane {
            normal: -self.normal,
            w: -self.w,
        }
    }

    /// Signed distance of `point` to the plane, positive on the normal side
    #[inline]
    pub fn signed_distance(&self, point: &Point3<Real>) -> Real {
        self.normal.dot(&point.coords) - self.w
    }
}
