//! Iso-surface meshing of implicit functions
//!
//! A [`Mesher`] turns the zero level set of an [`ImplicitFunction`], bounded by
//! a sphere, into a triangulated [`SurfaceComplex`] that honours a set of
//! [`MeshCriteria`]. The crate ships one engine, [`SurfaceNetsMesher`],
//! built on `fast-surface-nets`.

pub mod grid;
pub mod refine;
pub mod surface_nets;

#[cfg(not(feature = "parallel"))]
pub mod serial;

#[cfg(feature = "parallel")]
pub mod parallel;

pub use grid::{GridShape, SampleGrid};
pub use surface_nets::SurfaceNetsMesher;

use crate::cancel::CancelToken;
use crate::errors::OffsetError;
use crate::float_types::Real;
use crate::indexed_mesh::IndexedMesh;
use crate::traits::ImplicitFunction;
use nalgebra::Point3;
use std::fmt::Debug;

/// An ordered chain of points describing a sharp feature to preserve
pub type Polyline = Vec<Point3<Real>>;

/// Sphere enclosing the part of the level set to mesh
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingSphere {
    pub center: Point3<Real>,
    pub squared_radius: Real,
}

impl BoundingSphere {
    pub const fn new(center: Point3<Real>, squared_radius: Real) -> Self {
        BoundingSphere {
            center,
            squared_radius,
        }
    }

    pub fn radius(&self) -> Real {
        self.squared_radius.max(0.0).sqrt()
    }

    pub fn contains(&self, p: &Point3<Real>) -> bool {
        (p - self.center).norm_squared() <= self.squared_radius
    }
}

/// A feature polyline the mesh has to follow, with the surface patches it bounds
#[derive(Debug, Clone, PartialEq)]
pub struct RequiredEdge {
    pub polyline: Polyline,
    pub incident_patches: Vec<usize>,
}

/// Implicit function plus everything an engine needs to know about where and
/// how precisely to look for its zero level set.
#[derive(Debug)]
pub struct ImplicitDomain<'a, F: ImplicitFunction> {
    pub function: &'a F,
    pub bounding_sphere: BoundingSphere,
    /// Root finding stops once the bracket is below this fraction of the sphere radius
    pub relative_error_bound: Real,
    pub features: Vec<RequiredEdge>,
}

impl<'a, F: ImplicitFunction> ImplicitDomain<'a, F> {
    pub fn new(function: &'a F, bounding_sphere: BoundingSphere, relative_error_bound: Real) -> Self {
        ImplicitDomain {
            function,
            bounding_sphere,
            relative_error_bound,
            features: Vec::new(),
        }
    }

    /// Register polylines as required edges, not attached to any surface patch
    pub fn add_features<I>(&mut self, polylines: I)
    where
        I: IntoIterator<Item = Polyline>,
    {
        self.features.extend(
            polylines
                .into_iter()
                .filter(|polyline| !polyline.is_empty())
                .map(|polyline| RequiredEdge {
                    polyline,
                    incident_patches: Vec::new(),
                }),
        );
    }

    pub fn has_features(&self) -> bool {
        !self.features.is_empty()
    }

    #[inline]
    pub fn value(&self, p: &Point3<Real>) -> Real {
        self.function.value(p)
    }
}

/// Which vertices a facet may have
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FacetTopology {
    /// All three vertices on the surface
    VerticesOnSurface,
    /// All three vertices on the same surface patch
    #[default]
    VerticesOnSameSurfacePatch,
}

/// Quality bounds the output triangulation should meet
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MeshCriteria {
    /// Lower bound on facet angles, in degrees
    pub facet_angle: Real,
    /// Upper bound on the radius of facet surface Delaunay balls
    pub facet_size: Real,
    /// Upper bound on the distance between facet circumcentres and the surface
    pub facet_distance: Real,
    pub facet_topology: FacetTopology,
    /// Upper bound on feature edge length, only used when features are present
    pub edge_size: Option<Real>,
}

/// Topological guarantee requested from the engine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ManifoldOption {
    #[default]
    NonManifold,
    ManifoldWithBoundary,
    Manifold,
}

impl TryFrom<i32> for ManifoldOption {
    type Error = OffsetError;

    fn try_from(tag: i32) -> Result<Self, Self::Error> {
        match tag {
            0 => Ok(ManifoldOption::NonManifold),
            1 => Ok(ManifoldOption::ManifoldWithBoundary),
            2 => Ok(ManifoldOption::Manifold),
            other => Err(OffsetError::InvalidManifoldTag(other)),
        }
    }
}

/// Optional post-passes of the engine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RefineOptions {
    pub perturb: bool,
    pub exude: bool,
}

/// Boundary triangulation produced by an engine
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SurfaceComplex {
    pub points: Vec<Point3<Real>>,
    pub triangles: Vec<[usize; 3]>,
}

impl SurfaceComplex {
    pub fn number_of_vertices(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Extract the triangulation into a mesh with computed vertex normals
    pub fn into_mesh<S: Clone + Send + Sync + Debug>(self, metadata: Option<S>) -> IndexedMesh<S> {
        IndexedMesh::from_triangles(self.points, &self.triangles, metadata)
    }
}

/// Seam between the offset pipeline and an iso-surface meshing engine.
pub trait Mesher {
    /// Mesh the zero level set of `domain` under `criteria`.
    ///
    /// Engines poll `cancel` at safe points and return
    /// [`OffsetError::Cancelled`] once it is set. An empty complex is a
    /// valid answer when the level set does not cross the bounding sphere.
    fn refine<F: ImplicitFunction>(
        &self,
        domain: &ImplicitDomain<'_, F>,
        criteria: &MeshCriteria,
        manifold: ManifoldOption,
        options: &RefineOptions,
        cancel: &CancelToken,
    ) -> Result<SurfaceComplex, OffsetError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn manifold_tags() {
        assert_eq!(ManifoldOption::try_from(0).unwrap(), ManifoldOption::NonManifold);
        assert_eq!(
            ManifoldOption::try_from(1).unwrap(),
            ManifoldOption::ManifoldWithBoundary
        );
        assert_eq!(ManifoldOption::try_from(2).unwrap(), ManifoldOption::Manifold);
        assert!(matches!(
            ManifoldOption::try_from(3),
            Err(OffsetError::InvalidManifoldTag(3))
        ));
    }

    #[test]
    fn empty_polylines_are_not_registered() {
        let f = |p: &Point3<Real>| 1.0 - p.coords.norm();
        let mut domain = ImplicitDomain::new(&f, BoundingSphere::new(Point3::origin(), 4.0), 1e-7);
        domain.add_features(vec![Vec::new(), vec![Point3::origin(), Point3::new(1.0, 0.0, 0.0)]]);
        assert_eq!(domain.features.len(), 1);
        assert!(domain.features[0].incident_patches.is_empty());
        assert!(domain.bounding_sphere.contains(&Point3::new(0.0, 2.0, 0.0)));
        assert_eq!(domain.bounding_sphere.radius(), 2.0);
    }
}
