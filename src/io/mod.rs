//! Export of offset meshes to file formats.
//!
//! Formats sit behind cargo features; with `stl-io` disabled this module is
//! empty.

#[cfg(feature = "stl-io")]
mod stl;

#[cfg(feature = "stl-io")]
pub use stl::{to_stl_ascii, to_stl_binary};
