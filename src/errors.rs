//! Errors raised while building offset meshes

use crate::float_types::Real;
use nalgebra::Point3;

/// All the ways an offset meshing job can fail.
///
/// An empty level set is *not* an error: the builder reports it as `Ok(None)`
/// and the job coordinator as [`MeshingOutcome::Empty`](crate::job::MeshingOutcome::Empty).
#[derive(Debug, thiserror::Error)]
pub enum OffsetError {
    /// (EmptySurface) The input has no triangle to build a spatial index over
    #[error("(EmptySurface) The input surface has no triangles")]
    EmptySurface,
    /// (NonTriangularPolygon) A polygon soup contains a polygon that is not a triangle
    #[error("(NonTriangularPolygon) Polygon {polygon} has {vertex_count} vertices, only triangles are supported")]
    NonTriangularPolygon { polygon: usize, vertex_count: usize },
    /// (IndexOutOfRange) A face refers to a point that does not exist
    #[error("(IndexOutOfRange) Face {face} refers to point {index}, but only {len} points exist")]
    IndexOutOfRange { face: usize, index: usize, len: usize },
    /// (InvalidCoordinate) A point has a NaN or infinite coordinate
    #[error("(InvalidCoordinate) The coordinate ({0}) has a NaN or infinite component")]
    InvalidCoordinate(Point3<Real>),
    /// (InvalidParameter) A meshing parameter is out of range
    #[error("(InvalidParameter) {name} = {value} is out of range: {reason}")]
    InvalidParameter {
        name: &'static str,
        value: Real,
        reason: &'static str,
    },
    /// (InvalidManifoldTag) The manifold tag is not one of 0, 1 or 2
    #[error("(InvalidManifoldTag) Manifold tag {0} is not one of 0 (non-manifold), 1 (manifold with boundary), 2 (manifold)")]
    InvalidManifoldTag(i32),
    /// (Cancelled) The job was cancelled before the mesh was produced
    #[error("(Cancelled) Offset meshing was cancelled")]
    Cancelled,
    /// (Busy) Another meshing job is still in progress
    #[error("(Busy) An offset meshing job is already in progress")]
    Busy,
    /// (CallbackAlreadyRegistered) A completion callback was registered twice
    #[error("(CallbackAlreadyRegistered) A completion callback is already registered for this job")]
    CallbackAlreadyRegistered,
    /// (WorkerPanicked) The meshing worker panicked
    #[error("(WorkerPanicked) The meshing worker panicked: {0}")]
    WorkerPanicked(String),
    /// (Io) Writing or spawning failed
    #[error("(Io) {0}")]
    Io(#[from] std::io::Error),
}

impl OffsetError {
    /// True for the errors caused by the input surface rather than by the job.
    pub const fn is_invalid_input(&self) -> bool {
        matches!(
            self,
            OffsetError::EmptySurface
                | OffsetError::NonTriangularPolygon { .. }
                | OffsetError::IndexOutOfRange { .. }
                | OffsetError::InvalidCoordinate(_)
                | OffsetError::InvalidParameter { .. }
                | OffsetError::InvalidManifoldTag(_)
        )
    }
}
