//! Offset surfaces of triangle meshes and polygon soups.
//!
//! The offset of a surface by a signed distance `d` is the zero level set of
//! `d - signed_distance(p)`. Distances come from an [AABB tree](spatial) over
//! the input triangles, the inside/outside sign from ray parity, and the
//! level set is meshed by a pluggable [`Mesher`](mesher::Mesher).
//!
//! Meshing is expensive, so [`MeshingCoordinator`] runs it on a background
//! thread, one job at a time, and delivers the result through a callback.
//!
//! # Features
//! #### Default
//! - **f64**: use f64 as Real
//! - [**stl-io**](https://en.wikipedia.org/wiki/STL_(file_format)): `.stl` export
//!
//! #### Optional
//! - **f32**: use f32 as Real, this conflicts with f64
//! - **parallel**: use rayon to sample the distance field

#![forbid(unsafe_code)]
#![deny(unused)]
#![warn(clippy::missing_const_for_fn, clippy::approx_constant, clippy::all)]

pub mod cancel;
pub mod errors;
pub mod float_types;
pub mod indexed_mesh;
pub mod io;
pub mod job;
pub mod mesher;
pub mod offset;
pub mod polygon_soup;
pub mod spatial;
pub mod traits;

#[cfg(any(all(feature = "f64", feature = "f32"), not(any(feature = "f64", feature = "f32"))))]
compile_error!("Either 'f64' or 'f32' feature must be specified, but not both");

pub use cancel::CancelToken;
pub use errors::OffsetError;
pub use indexed_mesh::IndexedMesh;
pub use job::{JobHandle, JobStatus, MeshingCoordinator, MeshingOutcome, OffsetRequest};
pub use mesher::{Mesher, surface_nets::SurfaceNetsMesher};
pub use offset::{OffsetField, OffsetParams, Surface, build_offset_mesh};
pub use polygon_soup::PolygonSoup;
pub use spatial::{BoundedSide, SideOfSurface, SpatialIndex};
