//! Offset mesh construction

use crate::cancel::CancelToken;
use crate::errors::OffsetError;
use crate::float_types::{BOUNDING_SPHERE_FACTOR, RELATIVE_ERROR_BOUND, Real};
use crate::indexed_mesh::IndexedMesh;
use crate::mesher::{BoundingSphere, ImplicitDomain, Mesher, Polyline, RefineOptions};
use crate::offset::{OffsetField, OffsetParams, Surface};
use std::{fmt::Debug, time::Instant};

/// Mesh the offset of `surface` by `params.offset`.
///
/// The field is meshed inside a sphere around the input's bounding box, of
/// radius `0.6 · diagonal + |offset|`, large enough to hold the whole offset
/// surface. Feature polylines become required edges of the domain.
///
/// Returns `Ok(None)` when the offset surface is empty, for instance when an
/// inset exceeds the inradius. A closed result is always oriented outward.
pub fn build_offset_mesh<S, M>(
    surface: &Surface<S>,
    params: &OffsetParams,
    features: &[Polyline],
    mesher: &M,
    cancel: &CancelToken,
) -> Result<Option<IndexedMesh<S>>, OffsetError>
where
    S: Clone + Send + Sync + Debug,
    M: Mesher,
{
    let start = Instant::now();
    if surface.is_empty() {
        return Err(OffsetError::EmptySurface);
    }

    let bbox = surface.bounding_box()?;
    let diagonal = (bbox.maxs - bbox.mins).norm();
    let has_features = features.iter().any(|polyline| !polyline.is_empty());
    params.validate(Some(diagonal), has_features)?;
    let manifold = params.manifold_option()?;

    let radius: Real = BOUNDING_SPHERE_FACTOR * diagonal + params.offset.abs();
    let sphere = BoundingSphere::new(bbox.center(), radius * radius);

    let field = OffsetField::from_surface(surface, params.offset)?;
    cancel.check()?;

    let mut domain = ImplicitDomain::new(&field, sphere, RELATIVE_ERROR_BOUND);
    domain.add_features(features.iter().cloned());
    let criteria = params.criteria(domain.has_features());
    let options = RefineOptions {
        perturb: false,
        exude: false,
    };
    log::debug!(
        "meshing offset {} (angle {}, size {}, distance {}, {:?})",
        params.offset,
        criteria.facet_angle,
        criteria.facet_size,
        criteria.facet_distance,
        manifold
    );

    let complex = mesher.refine(&domain, &criteria, manifold, &options, cancel)?;
    if complex.number_of_vertices() == 0 {
        log::info!(
            "no mesh produced for offset {} ({} ms)",
            params.offset,
            start.elapsed().as_millis()
        );
        return Ok(None);
    }
    cancel.check()?;

    let mut mesh = complex.into_mesh(surface.metadata());
    if mesh.is_closed() && mesh.signed_volume() < 0.0 {
        log::debug!("reversing inward-facing offset mesh");
        mesh.reverse_face_orientations();
    }

    log::info!(
        "done ({} ms, {} vertices)",
        start.elapsed().as_millis(),
        mesh.vertex_count()
    );
    Ok(Some(mesh))
}
