//! Offset surfaces of triangulated solids and polygon soups
//!
//! The offset of a surface by `d` is the zero level set of
//! `field(p) = d - signed_distance(p)`. [`OffsetField`] evaluates that field
//! and [`build_offset_mesh`] hands it to a [`Mesher`](crate::mesher::Mesher).

pub mod builder;
pub mod field;
pub mod params;

pub use builder::build_offset_mesh;
pub use field::OffsetField;
pub use params::OffsetParams;

pub use crate::mesher::Polyline;

use crate::errors::OffsetError;
use crate::float_types::parry3d::bounding_volume::Aabb;
use crate::indexed_mesh::IndexedMesh;
use crate::polygon_soup::PolygonSoup;
use std::fmt::Debug;

/// Input of an offset: a mesh with explicit topology or a polygon soup
#[derive(Debug, Clone)]
pub enum Surface<S: Clone + Send + Sync + Debug> {
    Mesh(IndexedMesh<S>),
    Soup(PolygonSoup),
}

impl<S: Clone + Send + Sync + Debug> Surface<S> {
    /// Number of polygons
    pub fn polygon_count(&self) -> usize {
        match self {
            Surface::Mesh(mesh) => mesh.polygons.len(),
            Surface::Soup(soup) => soup.polygons.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.polygon_count() == 0
    }

    /// Bounding box of the referenced points, failing on malformed input
    pub fn bounding_box(&self) -> Result<Aabb, OffsetError> {
        match self {
            Surface::Mesh(mesh) => {
                mesh.validate()?;
                Ok(mesh.bounding_box())
            },
            Surface::Soup(soup) => soup.bounding_box(),
        }
    }

    /// Only meshes can be closed; soups never are
    pub fn is_closed(&self) -> bool {
        match self {
            Surface::Mesh(mesh) => mesh.is_closed(),
            Surface::Soup(_) => false,
        }
    }

    /// Metadata carried over to the offset mesh
    pub fn metadata(&self) -> Option<S> {
        match self {
            Surface::Mesh(mesh) => mesh.metadata.clone(),
            Surface::Soup(_) => None,
        }
    }
}

impl<S: Clone + Send + Sync + Debug> From<IndexedMesh<S>> for Surface<S> {
    fn from(mesh: IndexedMesh<S>) -> Self {
        Surface::Mesh(mesh)
    }
}

impl<S: Clone + Send + Sync + Debug> From<PolygonSoup> for Surface<S> {
    fn from(soup: PolygonSoup) -> Self {
        Surface::Soup(soup)
    }
}
