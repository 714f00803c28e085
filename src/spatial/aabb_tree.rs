//! Static AABB tree over triangles with closest-point and ray-crossing queries

use crate::errors::OffsetError;
use crate::float_types::{
    Real,
    tolerance,
    parry3d::{
        bounding_volume::{Aabb, BoundingVolume},
        query::{PointQuery, Ray, RayCast},
        shape::Triangle,
    },
};
use crate::traits::TriangleSource;
use nalgebra::{Point3, Vector3};

/// Primitives per leaf
const MAX_LEAF_SIZE: usize = 4;

/// Barycentric slack under which a ray is considered to graze an edge or vertex
const BARYCENTRIC_EPSILON: Real = 1e-6;

#[derive(Debug, Clone)]
enum Node {
    Leaf {
        aabb: Aabb,
        start: usize,
        end: usize,
    },
    Internal {
        aabb: Aabb,
        left: usize,
        right: usize,
    },
}

impl Node {
    const fn aabb(&self) -> &Aabb {
        match self {
            Node::Leaf { aabb, .. } | Node::Internal { aabb, .. } => aabb,
        }
    }
}

/// Result of a closest-point query.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClosestPoint {
    /// Closest point on the indexed surface
    pub point: Point3<Real>,
    /// Squared distance from the query point, clamped at zero
    pub squared_distance: Real,
    /// Id of the primitive holding `point`, as numbered by the source
    pub primitive: usize,
}

/// Outcome of intersecting one ray with one triangle
#[derive(Debug, Clone, Copy, PartialEq)]
enum RayHit {
    Miss,
    Crossing,
    /// Hits an edge or a vertex, lies in the triangle plane or starts on it
    Degenerate,
}

/// Immutable bounding volume hierarchy over a set of triangles.
///
/// The triangles are copied out of the source at build time, so the index
/// does not borrow the surface it was built from. All queries take `&self`
/// and the index is `Send + Sync`, so one index can serve many threads.
#[derive(Debug, Clone)]
pub struct SpatialIndex {
    nodes: Vec<Node>,
    triangles: Vec<Triangle>,
    primitive_ids: Vec<usize>,
}

struct BuildItem {
    id: usize,
    reference: Point3<Real>,
    triangle: Triangle,
    aabb: Aabb,
}

fn triangle_aabb(tri: &Triangle) -> Aabb {
    Aabb::new(tri.a.inf(&tri.b).inf(&tri.c), tri.a.sup(&tri.b).sup(&tri.c))
}

fn check_finite(p: &Point3<Real>) -> Result<(), OffsetError> {
    if p.coords.iter().all(|c| c.is_finite()) {
        Ok(())
    } else {
        Err(OffsetError::InvalidCoordinate(*p))
    }
}

impl SpatialIndex {
    /// Build the tree over every primitive of `source`.
    ///
    /// Fails with [`OffsetError::EmptySurface`] when there is nothing to index
    /// and propagates the source's own errors for malformed primitives.
    pub fn build<T: TriangleSource + ?Sized>(source: &T) -> Result<SpatialIndex, OffsetError> {
        let count = source.primitive_count();
        if count == 0 {
            return Err(OffsetError::EmptySurface);
        }

        let mut items = Vec::with_capacity(count);
        for id in 0..count {
            let [a, b, c] = source.triangle(id)?;
            for p in [&a, &b, &c] {
                check_finite(p)?;
            }
            let reference = source.reference_point(id)?;
            let triangle = Triangle::new(a, b, c);
            items.push(BuildItem {
                id,
                reference,
                aabb: triangle_aabb(&triangle),
                triangle,
            });
        }

        let mut index = SpatialIndex {
            nodes: Vec::with_capacity(2 * count / MAX_LEAF_SIZE + 1),
            triangles: Vec::with_capacity(count),
            primitive_ids: Vec::with_capacity(count),
        };
        index.build_recursive(&mut items);
        log::debug!(
            "spatial index built over {} triangles ({} nodes)",
            index.triangles.len(),
            index.nodes.len()
        );
        Ok(index)
    }

    /// Appends the subtree for `items` and returns the index of its root node
    fn build_recursive(&mut self, items: &mut [BuildItem]) -> usize {
        let aabb = items[1..]
            .iter()
            .fold(items[0].aabb, |acc, item| acc.merged(&item.aabb));

        if items.len() <= MAX_LEAF_SIZE {
            let start = self.triangles.len();
            for item in items.iter() {
                self.triangles.push(item.triangle);
                self.primitive_ids.push(item.id);
            }
            self.nodes.push(Node::Leaf {
                aabb,
                start,
                end: self.triangles.len(),
            });
            return self.nodes.len() - 1;
        }

        // Split on the median reference point along the longest axis of their spread
        let (lo, hi) = items[1..].iter().fold(
            (items[0].reference, items[0].reference),
            |(lo, hi), item| (lo.inf(&item.reference), hi.sup(&item.reference)),
        );
        let axis = (hi - lo).imax();
        let mid = items.len() / 2;
        items.select_nth_unstable_by(mid, |a, b| {
            a.reference[axis]
                .partial_cmp(&b.reference[axis])
                .unwrap_or(std::cmp::Ordering::Equal)
        });

        let slot = self.nodes.len();
        // placeholder, patched once both children exist
        self.nodes.push(Node::Leaf {
            aabb,
            start: 0,
            end: 0,
        });
        let (left_items, right_items) = items.split_at_mut(mid);
        let left = self.build_recursive(left_items);
        let right = self.build_recursive(right_items);
        self.nodes[slot] = Node::Internal { aabb, left, right };
        slot
    }

    /// Number of indexed triangles
    pub fn len(&self) -> usize {
        self.triangles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.triangles.is_empty()
    }

    /// Box enclosing every indexed triangle
    pub fn bounding_box(&self) -> Aabb {
        *self.nodes[0].aabb()
    }

    /// Closest point of the surface to `p`, with its squared distance and primitive
    pub fn closest(&self, p: &Point3<Real>) -> ClosestPoint {
        let mut best = ClosestPoint {
            point: self.triangles[0].a,
            squared_distance: Real::MAX,
            primitive: self.primitive_ids[0],
        };

        let mut stack = vec![0usize];
        while let Some(node_idx) = stack.pop() {
            let node = &self.nodes[node_idx];
            if box_squared_distance(node.aabb(), p) >= best.squared_distance {
                continue;
            }
            match *node {
                Node::Leaf { start, end, .. } => {
                    for i in start..end {
                        let projected = self.triangles[i].project_local_point(p, false).point;
                        let sq = (projected - p).norm_squared().max(0.0);
                        if sq < best.squared_distance {
                            best = ClosestPoint {
                                point: projected,
                                squared_distance: sq,
                                primitive: self.primitive_ids[i],
                            };
                        }
                    }
                },
                Node::Internal { left, right, .. } => {
                    // push the farther child first so the nearer one is visited first
                    let dl = box_squared_distance(self.nodes[left].aabb(), p);
                    let dr = box_squared_distance(self.nodes[right].aabb(), p);
                    if dl <= dr {
                        stack.push(right);
                        stack.push(left);
                    } else {
                        stack.push(left);
                        stack.push(right);
                    }
                },
            }
        }
        best
    }

    /// Closest point of the surface to `p`
    pub fn closest_point(&self, p: &Point3<Real>) -> Point3<Real> {
        self.closest(p).point
    }

    /// Squared distance from `p` to the surface, never negative
    pub fn closest_squared_distance(&self, p: &Point3<Real>) -> Real {
        self.closest(p).squared_distance
    }

    /// Distance from `p` to the surface
    pub fn closest_distance(&self, p: &Point3<Real>) -> Real {
        self.closest_squared_distance(p).max(0.0).sqrt()
    }

    /// Count the triangles crossed by the ray from `origin` along `dir`.
    ///
    /// Returns `None` when the ray touches an edge or a vertex, runs inside a
    /// triangle plane or starts on a triangle: the parity of such a count is
    /// meaningless and the caller should retry in another direction.
    pub fn ray_crossings(&self, origin: &Point3<Real>, dir: &Vector3<Real>) -> Option<usize> {
        let ray = Ray::new(*origin, *dir);
        let mut crossings = 0;
        let mut stack = vec![0usize];
        while let Some(node_idx) = stack.pop() {
            let node = &self.nodes[node_idx];
            if !node.aabb().intersects_local_ray(&ray, Real::MAX) {
                continue;
            }
            match *node {
                Node::Leaf { start, end, .. } => {
                    for tri in &self.triangles[start..end] {
                        match ray_triangle(origin, dir, tri) {
                            RayHit::Miss => {},
                            RayHit::Crossing => crossings += 1,
                            RayHit::Degenerate => return None,
                        }
                    }
                },
                Node::Internal { left, right, .. } => {
                    stack.push(left);
                    stack.push(right);
                },
            }
        }
        Some(crossings)
    }

    /// Unit normal of indexed primitive `primitive`, by the source's winding
    pub(crate) fn primitive_normal(&self, primitive: usize) -> Option<Vector3<Real>> {
        let slot = self.primitive_ids.iter().position(|&id| id == primitive)?;
        self.triangles[slot].normal().map(|n| n.into_inner())
    }
}

#[inline]
fn box_squared_distance(aabb: &Aabb, p: &Point3<Real>) -> Real {
    let d = aabb.distance_to_local_point(p, true);
    d * d
}

/// **Möller–Trumbore** ray/triangle test with degeneracy reporting.
fn ray_triangle(origin: &Point3<Real>, dir: &Vector3<Real>, tri: &Triangle) -> RayHit {
    let e1 = tri.b - tri.a;
    let e2 = tri.c - tri.a;
    let pvec = dir.cross(&e2);
    let det = e1.dot(&pvec);
    let scale = e1.norm() * e2.norm() * dir.norm();
    let s = origin - tri.a;

    if det.abs() <= BARYCENTRIC_EPSILON * scale {
        // Parallel to the plane: only a ray running inside the plane is a problem
        let normal = e1.cross(&e2);
        let n_len = normal.norm();
        if n_len <= Real::EPSILON || (s.dot(&normal) / n_len).abs() <= tolerance() {
            return RayHit::Degenerate;
        }
        return RayHit::Miss;
    }

    let inv_det = 1.0 / det;
    let u = s.dot(&pvec) * inv_det;
    let qvec = s.cross(&e1);
    let v = dir.dot(&qvec) * inv_det;
    let t = e2.dot(&qvec) * inv_det;

    if u < -BARYCENTRIC_EPSILON || v < -BARYCENTRIC_EPSILON || u + v > 1.0 + BARYCENTRIC_EPSILON {
        return RayHit::Miss;
    }
    if t * dir.norm() < -tolerance() {
        return RayHit::Miss;
    }
    if u <= BARYCENTRIC_EPSILON
        || v <= BARYCENTRIC_EPSILON
        || u + v >= 1.0 - BARYCENTRIC_EPSILON
        || t * dir.norm() <= tolerance()
    {
        return RayHit::Degenerate;
    }
    RayHit::Crossing
}
