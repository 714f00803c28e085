//! Parallel sampling of implicit functions on a grid

use crate::cancel::CancelToken;
use crate::errors::OffsetError;
use crate::mesher::{ImplicitDomain, SampleGrid};
use crate::traits::ImplicitFunction;
use rayon::prelude::*;

/// Sample `domain` at every grid node, z-slabs spread over the rayon pool.
///
/// Cancellation is polled before each slab.
pub fn sample_grid<F: ImplicitFunction>(
    domain: &ImplicitDomain<'_, F>,
    grid: &SampleGrid,
    cancel: &CancelToken,
) -> Result<Vec<f32>, OffsetError> {
    let nx = grid.shape.nx as usize;
    let mut values = vec![0.0_f32; grid.len()];

    values
        .par_chunks_mut(grid.slab_len())
        .enumerate()
        .try_for_each(|(iz, slab)| {
            cancel.check()?;
            for (i, value) in slab.iter_mut().enumerate() {
                let p = grid.point(i % nx, i / nx, iz);
                *value = SampleGrid::encode(domain.value(&p));
            }
            Ok::<(), OffsetError>(())
        })?;
    Ok(values)
}
