//! Shifted signed distance field of a surface

use crate::errors::OffsetError;
use crate::float_types::Real;
use crate::indexed_mesh::IndexedMesh;
use crate::offset::Surface;
use crate::polygon_soup::PolygonSoup;
use crate::spatial::{BoundedSide, SideOfSurface, SpatialIndex};
use crate::traits::ImplicitFunction;
use nalgebra::Point3;
use std::{borrow::Cow, fmt::Debug, sync::Arc};

/// `offset - signed_distance(p)`, zero on the offset surface.
///
/// For closed meshes the distance is signed: negative inside, so the field
/// grows with depth. Open meshes and soups use the unsigned distance, which
/// makes the zero set a two-sided shell around the surface.
#[derive(Debug, Clone)]
pub struct OffsetField {
    index: Arc<SpatialIndex>,
    side: Option<SideOfSurface>,
    offset: Real,
}

impl OffsetField {
    /// Field of a mesh. Non-triangular polygons are fan-triangulated first;
    /// closedness is decided once, here.
    ///
    /// Dangling indices and non-finite positions are reported as errors.
    pub fn from_mesh<S: Clone + Send + Sync + Debug>(
        mesh: &IndexedMesh<S>,
        offset: Real,
    ) -> Result<Self, OffsetError> {
        mesh.validate()?;
        let triangulated: Cow<'_, IndexedMesh<S>> = if mesh.is_triangulated() {
            Cow::Borrowed(mesh)
        } else {
            Cow::Owned(mesh.triangulate())
        };
        let index = Arc::new(SpatialIndex::build(triangulated.as_ref())?);
        let side = mesh
            .is_closed()
            .then(|| SideOfSurface::new(Arc::clone(&index)));
        log::debug!(
            "offset field over {} triangles, {}",
            index.len(),
            if side.is_some() { "closed" } else { "open" }
        );
        Ok(OffsetField {
            index,
            side,
            offset,
        })
    }

    /// Field of a soup, never classified inside/outside
    pub fn from_soup(soup: &PolygonSoup, offset: Real) -> Result<Self, OffsetError> {
        Ok(OffsetField {
            index: Arc::new(SpatialIndex::build(soup)?),
            side: None,
            offset,
        })
    }

    pub fn from_surface<S: Clone + Send + Sync + Debug>(
        surface: &Surface<S>,
        offset: Real,
    ) -> Result<Self, OffsetError> {
        match surface {
            Surface::Mesh(mesh) => Self::from_mesh(mesh, offset),
            Surface::Soup(soup) => Self::from_soup(soup, offset),
        }
    }

    pub const fn offset(&self) -> Real {
        self.offset
    }

    /// Whether points are classified inside/outside (closed meshes only)
    pub const fn is_signed(&self) -> bool {
        self.side.is_some()
    }

    pub fn index(&self) -> &Arc<SpatialIndex> {
        &self.index
    }

    /// Value of the field at `p`
    pub fn evaluate(&self, p: &Point3<Real>) -> Real {
        let closest = self.index.closest(p);
        let distance = closest.squared_distance.max(0.0).sqrt();
        match &self.side {
            None => self.offset - distance,
            Some(side) => match side.classify_near(p, &closest) {
                BoundedSide::OnBoundary => self.offset,
                BoundedSide::Outside => self.offset - distance,
                BoundedSide::Inside => self.offset + distance,
            },
        }
    }
}

impl ImplicitFunction for OffsetField {
    #[inline]
    fn value(&self, p: &Point3<Real>) -> Real {
        self.evaluate(p)
    }
}
