//! Test support library
//! Provides various helper functions & utilities for tests.
#![allow(dead_code)]

use offmesh::{
    IndexedMesh, SpatialIndex,
    float_types::Real,
    mesher::{ImplicitDomain, ManifoldOption, MeshCriteria, Mesher, RefineOptions, SurfaceComplex},
    traits::ImplicitFunction,
    CancelToken, OffsetError,
};
use std::{
    sync::{
        Arc,
        atomic::{AtomicUsize, Ordering},
    },
    thread,
    time::Duration,
};

/// Distance from `mesh`'s vertices to `surface`, as (min, max)
pub fn vertex_distance_range(mesh: &IndexedMesh<()>, surface: &SpatialIndex) -> (Real, Real) {
    mesh.vertices
        .iter()
        .map(|v| surface.closest_distance(&v.pos))
        .fold((Real::MAX, Real::MIN), |(lo, hi), d| (lo.min(d), hi.max(d)))
}

/// Parameters tight enough for a recognisable result, loose enough to run quickly
pub fn quick_params(offset: Real) -> offmesh::OffsetParams {
    offmesh::OffsetParams::default()
        .with_offset(offset)
        .with_facet_angle(25.0)
        .with_facet_size(0.1)
        .with_facet_distance(0.03)
}

/// Mesher that sleeps in small steps until cancelled or `steps` run out
#[derive(Debug, Clone)]
pub struct SlowMesher {
    pub steps: usize,
    pub polls: Arc<AtomicUsize>,
}

impl SlowMesher {
    pub fn new(steps: usize) -> Self {
        SlowMesher {
            steps,
            polls: Arc::new(AtomicUsize::new(0)),
        }
    }
}

impl Mesher for SlowMesher {
    fn refine<F: ImplicitFunction>(
        &self,
        _domain: &ImplicitDomain<'_, F>,
        _criteria: &MeshCriteria,
        _manifold: ManifoldOption,
        _options: &RefineOptions,
        cancel: &CancelToken,
    ) -> Result<SurfaceComplex, OffsetError> {
        for _ in 0..self.steps {
            self.polls.fetch_add(1, Ordering::SeqCst);
            cancel.check()?;
            thread::sleep(Duration::from_millis(5));
        }
        Ok(SurfaceComplex::default())
    }
}

/// Mesher that panics as soon as it is invoked
#[derive(Debug, Clone, Copy)]
pub struct PanickingMesher;

impl Mesher for PanickingMesher {
    fn refine<F: ImplicitFunction>(
        &self,
        _domain: &ImplicitDomain<'_, F>,
        _criteria: &MeshCriteria,
        _manifold: ManifoldOption,
        _options: &RefineOptions,
        _cancel: &CancelToken,
    ) -> Result<SurfaceComplex, OffsetError> {
        panic!("engine blew up");
    }
}
