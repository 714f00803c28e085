use crate::errors::OffsetError;
use crate::float_types::Real;
use nalgebra::Point3;

/// Anything the spatial index can be built over.
///
/// A primitive is addressed by a dense id in `0..primitive_count()`. The index
/// only needs a representative point of each primitive (any point on it, used
/// to split the tree) and the full triangle.
pub trait TriangleSource {
    /// Number of triangle primitives.
    fn primitive_count(&self) -> usize;

    /// A point lying on primitive `id`.
    fn reference_point(&self, id: usize) -> Result<Point3<Real>, OffsetError>;

    /// The three corners of primitive `id`.
    fn triangle(&self, id: usize) -> Result<[Point3<Real>; 3], OffsetError>;
}

/// A scalar field over 3D space whose zero level set is meshed.
///
/// Implementations must be pure: the engine may evaluate the same point many
/// times and from several threads.
pub trait ImplicitFunction: Sync {
    fn value(&self, p: &Point3<Real>) -> Real;
}

impl<F> ImplicitFunction for F
where
    F: Fn(&Point3<Real>) -> Real + Sync,
{
    #[inline]
    fn value(&self, p: &Point3<Real>) -> Real {
        self(p)
    }
}
