//! Surface-nets meshing engine

use crate::cancel::CancelToken;
use crate::errors::OffsetError;
use crate::float_types::Real;
use crate::mesher::{
    ImplicitDomain, ManifoldOption, MeshCriteria, Mesher, RefineOptions, SampleGrid,
    SurfaceComplex, refine,
};
use crate::traits::ImplicitFunction;
use fast_surface_nets::{SurfaceNetsBuffer, surface_nets};

#[cfg(not(feature = "parallel"))]
use crate::mesher::serial::sample_grid;

#[cfg(feature = "parallel")]
use crate::mesher::parallel::sample_grid;

/// Meshes the level set by sampling it on a regular grid, extracting a
/// surface net and refining the result.
///
/// The grid spacing is `min(facet_size, 4 · facet_distance)`, reduced to the
/// edge size when features are present. Extracted vertices are projected onto
/// the level set and feature polylines get a vertex at every edge-size step.
/// Facets below the angle bound are then improved by edge flips, and facets
/// are removed as needed for the requested manifold option.
#[derive(Debug, Clone, Copy, Default)]
pub struct SurfaceNetsMesher;

impl SurfaceNetsMesher {
    pub const fn new() -> Self {
        Self
    }

    /// Grid spacing used for `criteria` on a domain with or without features
    pub fn spacing(criteria: &MeshCriteria, has_features: bool) -> Real {
        let mut h = criteria.facet_size.min(4.0 * criteria.facet_distance);
        if has_features {
            if let Some(edge_size) = criteria.edge_size {
                h = h.min(edge_size);
            }
        }
        h
    }
}

impl Mesher for SurfaceNetsMesher {
    fn refine<F: ImplicitFunction>(
        &self,
        domain: &ImplicitDomain<'_, F>,
        criteria: &MeshCriteria,
        manifold: ManifoldOption,
        options: &RefineOptions,
        cancel: &CancelToken,
    ) -> Result<SurfaceComplex, OffsetError> {
        let grid = SampleGrid::covering(
            &domain.bounding_sphere,
            Self::spacing(criteria, domain.has_features()),
        );
        log::debug!(
            "sampling {}x{}x{} grid, spacing {}",
            grid.shape.nx,
            grid.shape.ny,
            grid.shape.nz,
            grid.spacing
        );
        let values = sample_grid(domain, &grid, cancel)?;
        cancel.check()?;

        let mut buffer = SurfaceNetsBuffer::default();
        let max = [grid.shape.nx - 1, grid.shape.ny - 1, grid.shape.nz - 1];
        surface_nets(&values, &grid.shape, [0, 0, 0], max, &mut buffer);
        drop(values);

        if buffer.positions.is_empty() {
            log::debug!("level set does not cross the bounding sphere");
            return Ok(SurfaceComplex::default());
        }

        let mut complex = SurfaceComplex {
            points: buffer.positions.iter().map(|&p| grid.to_world(p)).collect(),
            triangles: buffer
                .indices
                .chunks_exact(3)
                .map(|tri| [tri[0] as usize, tri[1] as usize, tri[2] as usize])
                .collect(),
        };
        refine::compact(&mut complex);
        log::debug!(
            "surface net: {} vertices, {} facets",
            complex.points.len(),
            complex.triangles.len()
        );

        refine::project_to_level_set(domain, &mut complex, grid.spacing, cancel)?;

        // a surface-net vertex sits within one cell diagonal of any surface point
        let pinned = if domain.has_features() {
            let pinned = refine::snap_to_features(
                &mut complex,
                &domain.features,
                grid.spacing,
                grid.spacing * (3.0 as Real).sqrt(),
            );
            log::debug!("{} vertices pinned to features", pinned.len());
            pinned
        } else {
            Vec::new()
        };

        refine::improve_facet_angles(&mut complex, criteria.facet_angle, cancel)?;
        refine::enforce_manifold(&mut complex, manifold);

        if options.perturb {
            refine::perturb(domain, &mut complex, grid.spacing, &pinned, cancel)?;
        }
        if options.exude {
            let removed = refine::exude(&mut complex);
            log::debug!("exuded {removed} flat facets");
        }

        refine::compact(&mut complex);
        Ok(complex)
    }
}
