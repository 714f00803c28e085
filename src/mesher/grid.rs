//! Regular sampling grids for surface nets

use crate::float_types::Real;
use crate::mesher::BoundingSphere;
use nalgebra::{Point3, Vector3};

/// Upper bound on samples along one axis; coarser spacing is used beyond it
pub const MAX_SAMPLES_PER_AXIS: u32 = 384;

/// The shape describing our discrete grid for Surface Nets:
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GridShape {
    pub nx: u32,
    pub ny: u32,
    pub nz: u32,
}

impl fast_surface_nets::ndshape::Shape<3> for GridShape {
    type Coord = u32;

    #[inline]
    fn as_array(&self) -> [Self::Coord; 3] {
        [self.nx, self.ny, self.nz]
    }

    fn size(&self) -> Self::Coord {
        self.nx * self.ny * self.nz
    }

    fn usize(&self) -> usize {
        (self.nx * self.ny * self.nz) as usize
    }

    fn linearize(&self, coords: [Self::Coord; 3]) -> u32 {
        let [x, y, z] = coords;
        (z * self.ny + y) * self.nx + x
    }

    fn delinearize(&self, i: u32) -> [Self::Coord; 3] {
        let x = i % self.nx;
        let yz = i / self.nx;
        let y = yz % self.ny;
        let z = yz / self.ny;
        [x, y, z]
    }
}

/// A cubic-cell grid placed in space
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SampleGrid {
    pub origin: Point3<Real>,
    pub spacing: Real,
    pub shape: GridShape,
}

impl SampleGrid {
    /// Grid over the box of `sphere` with cells of at most `spacing`, one
    /// spare layer on every side so the level set never touches the border.
    ///
    /// The spacing grows when the grid would exceed [`MAX_SAMPLES_PER_AXIS`].
    pub fn covering(sphere: &BoundingSphere, spacing: Real) -> Self {
        let radius = sphere.radius();
        let mut spacing = spacing;
        let cells = |h: Real| ((2.0 * radius) / h).ceil() as u32 + 2;
        let needed = (2.0 * radius / spacing).ceil();
        if !needed.is_finite() || needed + 3.0 > MAX_SAMPLES_PER_AXIS as Real {
            let coarser = 2.0 * radius / (MAX_SAMPLES_PER_AXIS - 4) as Real;
            log::warn!(
                "grid spacing {spacing} needs more than {MAX_SAMPLES_PER_AXIS} samples per axis, using {coarser}"
            );
            spacing = coarser;
        }
        let n = cells(spacing) + 1;
        let half = (n - 1) as Real * spacing * 0.5;
        SampleGrid {
            origin: sphere.center - Vector3::repeat(half),
            spacing,
            shape: GridShape { nx: n, ny: n, nz: n },
        }
    }

    /// Number of samples in one z-slab
    #[inline]
    pub const fn slab_len(&self) -> usize {
        (self.shape.nx * self.shape.ny) as usize
    }

    #[inline]
    pub const fn len(&self) -> usize {
        (self.shape.nx * self.shape.ny * self.shape.nz) as usize
    }

    pub const fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// World position of sample `(ix, iy, iz)`
    #[inline]
    pub fn point(&self, ix: usize, iy: usize, iz: usize) -> Point3<Real> {
        self.origin + Vector3::new(ix as Real, iy as Real, iz as Real) * self.spacing
    }

    /// World position of a point given in (fractional) grid coordinates
    #[inline]
    pub fn to_world(&self, grid_pos: [f32; 3]) -> Point3<Real> {
        self.origin
            + Vector3::new(
                grid_pos[0] as Real,
                grid_pos[1] as Real,
                grid_pos[2] as Real,
            ) * self.spacing
    }

    /// Surface nets wants finite `f32` samples, negative inside
    #[inline]
    pub fn encode(value: Real) -> f32 {
        if value.is_finite() {
            -(value as f32)
        } else {
            1e10_f32
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fast_surface_nets::ndshape::Shape;

    #[test]
    fn linearize_round_trips() {
        let shape = GridShape { nx: 3, ny: 4, nz: 5 };
        assert_eq!(shape.usize(), 60);
        assert_eq!(shape.delinearize(shape.linearize([2, 3, 4])), [2, 3, 4]);
        assert_eq!(shape.linearize([1, 0, 0]), 1);
        assert_eq!(shape.linearize([0, 0, 1]), 12);
    }

    #[test]
    fn grid_covers_the_sphere() {
        let sphere = BoundingSphere::new(Point3::new(1.0, 2.0, 3.0), 4.0);
        let grid = SampleGrid::covering(&sphere, 0.25);
        let far = grid.point(
            grid.shape.nx as usize - 1,
            grid.shape.ny as usize - 1,
            grid.shape.nz as usize - 1,
        );
        for axis in 0..3 {
            assert!(grid.origin[axis] < sphere.center[axis] - 2.0);
            assert!(far[axis] > sphere.center[axis] + 2.0);
        }
        assert_eq!(grid.spacing, 0.25);
    }

    #[test]
    fn spacing_grows_for_huge_grids() {
        let sphere = BoundingSphere::new(Point3::origin(), 100.0);
        let grid = SampleGrid::covering(&sphere, 1e-3);
        assert!(grid.shape.nx <= MAX_SAMPLES_PER_AXIS);
        assert!(grid.spacing > 1e-3);
    }
}
