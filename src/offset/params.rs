//! Offset meshing parameters

use crate::errors::OffsetError;
use crate::float_types::Real;
use crate::mesher::{FacetTopology, ManifoldOption, MeshCriteria};

/// Smallest facet size accepted, as a fraction of the bounding-box diagonal
const MIN_FACET_SIZE_RATIO: Real = 1e-5;

/// Everything a caller chooses about an offset mesh.
///
/// Lengths are absolute; [`OffsetParams::from_diagonal`] derives sensible
/// values from the size of the input.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OffsetParams {
    /// Signed offset distance, positive outward
    pub offset: Real,
    /// Lower bound on facet angles, in degrees, within [1, 30]
    pub facet_angle: Real,
    pub facet_size: Real,
    pub facet_distance: Real,
    /// Upper bound on feature edge length, only used with feature polylines
    pub edge_size: Real,
    /// 0 non-manifold, 1 manifold with boundary, 2 manifold
    pub manifold_tag: i32,
}

impl Default for OffsetParams {
    fn default() -> Self {
        Self::from_diagonal(1.0)
    }
}

impl OffsetParams {
    /// Defaults scaled by the bounding-box diagonal of the input
    pub fn from_diagonal(diagonal: Real) -> Self {
        OffsetParams {
            offset: 0.1 * diagonal,
            facet_angle: 25.0,
            facet_size: 0.05 * diagonal,
            facet_distance: 0.005 * diagonal,
            edge_size: 0.05 * diagonal,
            manifold_tag: 0,
        }
    }

    pub const fn with_offset(mut self, offset: Real) -> Self {
        self.offset = offset;
        self
    }

    pub const fn with_facet_angle(mut self, degrees: Real) -> Self {
        self.facet_angle = degrees;
        self
    }

    pub const fn with_facet_size(mut self, size: Real) -> Self {
        self.facet_size = size;
        self
    }

    pub const fn with_facet_distance(mut self, distance: Real) -> Self {
        self.facet_distance = distance;
        self
    }

    pub const fn with_edge_size(mut self, size: Real) -> Self {
        self.edge_size = size;
        self
    }

    pub const fn with_manifold_tag(mut self, tag: i32) -> Self {
        self.manifold_tag = tag;
        self
    }

    pub fn manifold_option(&self) -> Result<ManifoldOption, OffsetError> {
        ManifoldOption::try_from(self.manifold_tag)
    }

    /// Check every parameter.
    ///
    /// The facet size is checked against `diagonal` when it is known and only
    /// for positivity otherwise. The edge size only matters with features.
    pub fn validate(&self, diagonal: Option<Real>, has_features: bool) -> Result<(), OffsetError> {
        let invalid = |name, value, reason| OffsetError::InvalidParameter {
            name,
            value,
            reason,
        };

        if !self.offset.is_finite() {
            return Err(invalid("offset", self.offset, "must be finite"));
        }
        if !(1.0..=30.0).contains(&self.facet_angle) {
            return Err(invalid(
                "facet_angle",
                self.facet_angle,
                "must be between 1 and 30 degrees",
            ));
        }
        if !(self.facet_size.is_finite() && self.facet_size > 0.0) {
            return Err(invalid("facet_size", self.facet_size, "must be positive"));
        }
        if let Some(diagonal) = diagonal.filter(|d| d.is_finite() && *d > 0.0) {
            if self.facet_size < MIN_FACET_SIZE_RATIO * diagonal || self.facet_size > diagonal {
                return Err(invalid(
                    "facet_size",
                    self.facet_size,
                    "must lie between 1e-5 and 1 times the bounding-box diagonal",
                ));
            }
        }
        if !(self.facet_distance.is_finite() && self.facet_distance > 0.0) {
            return Err(invalid(
                "facet_distance",
                self.facet_distance,
                "must be positive",
            ));
        }
        if has_features && !(self.edge_size.is_finite() && self.edge_size > 0.0) {
            return Err(invalid("edge_size", self.edge_size, "must be positive"));
        }
        self.manifold_option().map(|_| ())
    }

    /// Criteria handed to the engine
    pub fn criteria(&self, has_features: bool) -> MeshCriteria {
        MeshCriteria {
            facet_angle: self.facet_angle,
            facet_size: self.facet_size,
            facet_distance: self.facet_distance,
            facet_topology: FacetTopology::VerticesOnSameSurfacePatch,
            edge_size: has_features.then_some(self.edge_size),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_scale_with_the_diagonal() {
        let params = OffsetParams::from_diagonal(10.0);
        assert_eq!(params.offset, 1.0);
        assert_eq!(params.facet_size, 0.5);
        assert!((params.facet_distance - 0.05).abs() < 1e-12);
        assert_eq!(params.facet_angle, 25.0);
        assert_eq!(params.manifold_tag, 0);
        assert!(params.validate(Some(10.0), true).is_ok());
    }

    #[test]
    fn out_of_range_values_are_rejected() {
        let base = OffsetParams::default();
        let bad = [
            base.with_facet_angle(45.0),
            base.with_facet_angle(0.5),
            base.with_facet_size(0.0),
            base.with_facet_size(2.0),
            base.with_facet_distance(-1.0),
            base.with_offset(Real::NAN),
        ];
        for params in bad {
            assert!(
                matches!(
                    params.validate(Some(1.0), false),
                    Err(OffsetError::InvalidParameter { .. })
                ),
                "{params:?}"
            );
        }
        // only checked against the diagonal when one is known
        assert!(base.with_facet_size(2.0).validate(None, false).is_ok());
        // edge size only matters with features
        let no_edge = base.with_edge_size(0.0);
        assert!(no_edge.validate(Some(1.0), false).is_ok());
        assert!(no_edge.validate(Some(1.0), true).is_err());
    }

    #[test]
    fn manifold_tag_is_checked() {
        let params = OffsetParams::default().with_manifold_tag(7);
        assert!(matches!(
            params.validate(None, false),
            Err(OffsetError::InvalidManifoldTag(7))
        ));
        assert_eq!(
            OffsetParams::default().with_manifold_tag(2).manifold_option().unwrap(),
            ManifoldOption::Manifold
        );
    }

    #[test]
    fn criteria_carry_edge_size_only_with_features() {
        let params = OffsetParams::default();
        assert_eq!(params.criteria(false).edge_size, None);
        assert_eq!(params.criteria(true).edge_size, Some(0.05));
        assert_eq!(
            params.criteria(true).facet_topology,
            FacetTopology::VerticesOnSameSurfacePatch
        );
    }
}
