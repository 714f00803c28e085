//! Passes that turn a raw surface-nets triangulation into one meeting the criteria
//!
//! Every pass works in place on a [`SurfaceComplex`]. Iteration orders are
//! fixed (sorted edges, ascending vertex ids) so the result only depends on
//! the input.

use crate::cancel::CancelToken;
use crate::errors::OffsetError;
use crate::float_types::{PI, Real, tolerance};
use crate::indexed_mesh::manifold::edge_faces;
use crate::mesher::{ImplicitDomain, ManifoldOption, RequiredEdge, SurfaceComplex};
use crate::traits::ImplicitFunction;
use nalgebra::{Point3, Vector3};
use std::collections::HashSet;

/// Vertices projected between two cancellation checks
const PROJECTION_BATCH: usize = 256;

/// Upper bound on edge-flip sweeps
const MAX_FLIP_PASSES: usize = 8;

/// Bracket search steps per grid cell along the gradient
const BRACKET_STEPS: usize = 8;

const MAX_BISECTIONS: usize = 64;

/// Central-difference gradient of the domain's function
fn gradient<F: ImplicitFunction>(
    domain: &ImplicitDomain<'_, F>,
    p: &Point3<Real>,
    eps: Real,
) -> Vector3<Real> {
    let mut g = Vector3::zeros();
    for axis in 0..3 {
        let mut offset = Vector3::zeros();
        offset[axis] = eps;
        g[axis] = (domain.value(&(p + offset)) - domain.value(&(p - offset))) / (2.0 * eps);
    }
    g
}

/// Move `p` onto the zero level set along the gradient.
///
/// The root is bracketed within two grid cells of `p` and bisected until the
/// bracket is shorter than `tol`. Points without a bracket stay where they are.
pub fn project_point<F: ImplicitFunction>(
    domain: &ImplicitDomain<'_, F>,
    p: &Point3<Real>,
    spacing: Real,
    tol: Real,
) -> Point3<Real> {
    let f0 = domain.value(p);
    if f0 == 0.0 || !f0.is_finite() {
        return *p;
    }
    let g = gradient(domain, p, spacing * 1e-2);
    let g_norm = g.norm();
    if !(g_norm > Real::EPSILON) {
        return *p;
    }
    // the function grows along the gradient
    let dir = if f0 > 0.0 { -g / g_norm } else { g / g_norm };
    let positive = f0 > 0.0;

    let step = spacing * 2.0 / BRACKET_STEPS as Real;
    let mut lo = 0.0;
    let mut hi = None;
    for i in 1..=BRACKET_STEPS {
        let t = step * i as Real;
        if (domain.value(&(p + dir * t)) > 0.0) != positive {
            hi = Some(t);
            break;
        }
        lo = t;
    }
    let Some(mut hi) = hi else {
        return *p;
    };

    for _ in 0..MAX_BISECTIONS {
        if hi - lo <= tol {
            break;
        }
        let mid = 0.5 * (lo + hi);
        if (domain.value(&(p + dir * mid)) > 0.0) == positive {
            lo = mid;
        } else {
            hi = mid;
        }
    }
    p + dir * (0.5 * (lo + hi))
}

/// Project every vertex onto the level set to `relative_error_bound · radius`
pub fn project_to_level_set<F: ImplicitFunction>(
    domain: &ImplicitDomain<'_, F>,
    complex: &mut SurfaceComplex,
    spacing: Real,
    cancel: &CancelToken,
) -> Result<(), OffsetError> {
    let radius = domain.bounding_sphere.radius();
    let tol = (domain.relative_error_bound * radius).max(Real::EPSILON * radius.max(1.0));
    for batch in complex.points.chunks_mut(PROJECTION_BATCH) {
        cancel.check()?;
        for p in batch {
            *p = project_point(domain, p, spacing, tol);
        }
    }
    Ok(())
}

/// Smallest interior angle of a triangle, in degrees
pub fn min_angle(a: &Point3<Real>, b: &Point3<Real>, c: &Point3<Real>) -> Real {
    let angle = |p: &Point3<Real>, q: &Point3<Real>, r: &Point3<Real>| {
        let u = q - p;
        let v = r - p;
        let denom = u.norm() * v.norm();
        if denom <= Real::EPSILON {
            return 0.0;
        }
        (u.dot(&v) / denom).clamp(-1.0, 1.0).acos()
    };
    let smallest = angle(a, b, c).min(angle(b, c, a)).min(angle(c, a, b));
    smallest * 180.0 / PI
}

#[inline]
fn triangle_normal(points: &[Point3<Real>], [a, b, c]: [usize; 3]) -> Vector3<Real> {
    (points[b] - points[a]).cross(&(points[c] - points[a]))
}

#[inline]
fn triangle_min_angle(points: &[Point3<Real>], [a, b, c]: [usize; 3]) -> Real {
    min_angle(&points[a], &points[b], &points[c])
}

#[inline]
const fn edge_key(u: usize, v: usize) -> (usize, usize) {
    if u < v { (u, v) } else { (v, u) }
}

/// Rotate `tri` so that it starts with the directed edge `from -> to`
fn rotate_to_edge(tri: [usize; 3], from: usize, to: usize) -> Option<[usize; 3]> {
    (0..3)
        .map(|k| [tri[k], tri[(k + 1) % 3], tri[(k + 2) % 3]])
        .find(|t| t[0] == from && t[1] == to)
}

/// Flip interior edges whose adjacent facets fall below `facet_angle` degrees.
///
/// A flip is applied only when it raises the smaller minimum angle of the
/// pair, keeps both facets on the same side and does not duplicate an edge.
/// Returns the number of flips.
pub fn improve_facet_angles(
    complex: &mut SurfaceComplex,
    facet_angle: Real,
    cancel: &CancelToken,
) -> Result<usize, OffsetError> {
    let mut total = 0;
    for _ in 0..MAX_FLIP_PASSES {
        cancel.check()?;

        let edge_map = edge_faces(complex.triangles.iter().map(|t| t.as_slice()));
        let mut edges: Vec<(usize, usize)> = edge_map
            .iter()
            .filter(|(_, faces)| faces.len() == 2)
            .map(|(&edge, _)| edge)
            .collect();
        edges.sort_unstable();

        let mut dirty = vec![false; complex.triangles.len()];
        let mut created: HashSet<(usize, usize)> = HashSet::new();
        let mut flipped = 0;

        for (u, v) in edges {
            let (f1, f2) = (edge_map[&(u, v)][0], edge_map[&(u, v)][1]);
            if dirty[f1] || dirty[f2] {
                continue;
            }
            let (t1, t2) = (complex.triangles[f1], complex.triangles[f2]);
            let Some([a, b, c]) = rotate_to_edge(t1, u, v).or_else(|| rotate_to_edge(t1, v, u))
            else {
                continue;
            };
            // inconsistently oriented pairs are left alone
            let Some([_, _, d]) = rotate_to_edge(t2, b, a) else {
                continue;
            };
            if c == d {
                continue;
            }

            let points = &complex.points;
            let current = triangle_min_angle(points, t1).min(triangle_min_angle(points, t2));
            if current >= facet_angle {
                continue;
            }
            let diagonal = edge_key(c, d);
            if edge_map.contains_key(&diagonal) || created.contains(&diagonal) {
                continue;
            }

            let new1 = [a, d, c];
            let new2 = [d, b, c];
            let old_normal = triangle_normal(points, t1) + triangle_normal(points, t2);
            if triangle_normal(points, new1).dot(&old_normal) <= 0.0
                || triangle_normal(points, new2).dot(&old_normal) <= 0.0
            {
                continue;
            }
            let improved = triangle_min_angle(points, new1).min(triangle_min_angle(points, new2));
            if improved <= current + 1e-6 {
                continue;
            }

            complex.triangles[f1] = new1;
            complex.triangles[f2] = new2;
            dirty[f1] = true;
            dirty[f2] = true;
            created.insert(diagonal);
            flipped += 1;
        }

        total += flipped;
        if flipped == 0 {
            break;
        }
    }
    log::debug!("{total} edge flips for facet angle {facet_angle}");
    Ok(total)
}

/// Points along `polyline` no more than `step` apart, both ends included
fn resample(polyline: &[Point3<Real>], step: Real) -> Vec<Point3<Real>> {
    let mut samples = Vec::new();
    for seg in polyline.windows(2) {
        let (a, b) = (seg[0], seg[1]);
        let n = ((b - a).norm() / step).ceil().max(1.0) as usize;
        samples.extend((0..n).map(|k| a + (b - a) * (k as Real / n as Real)));
    }
    samples.extend(polyline.last().copied());
    samples
}

/// Pin required edges into the complex.
///
/// Every polyline is resampled at `step`; for each sample the nearest vertex
/// not pinned yet, if within `max_distance`, is moved onto the sample.
/// Returns the ids of the pinned vertices in ascending order.
pub fn snap_to_features(
    complex: &mut SurfaceComplex,
    features: &[RequiredEdge],
    step: Real,
    max_distance: Real,
) -> Vec<usize> {
    let max2 = max_distance * max_distance;
    let mut pinned = vec![false; complex.points.len()];
    for edge in features {
        for sample in resample(&edge.polyline, step) {
            let mut best: Option<(usize, Real)> = None;
            for (i, p) in complex.points.iter().enumerate() {
                let d2 = (p - sample).norm_squared();
                if !pinned[i] && d2 <= max2 && best.is_none_or(|(_, b)| d2 < b) {
                    best = Some((i, d2));
                }
            }
            if let Some((i, _)) = best {
                complex.points[i] = sample;
                pinned[i] = true;
            }
        }
    }
    pinned
        .iter()
        .enumerate()
        .filter_map(|(i, &p)| p.then_some(i))
        .collect()
}

fn remove_triangles(complex: &mut SurfaceComplex, doomed: &HashSet<usize>) {
    let mut idx = 0;
    complex.triangles.retain(|_| {
        let keep = !doomed.contains(&idx);
        idx += 1;
        keep
    });
}

/// Remove facets until the complex honours `option`.
///
/// Facets on edges with more than two facets go first; for
/// [`ManifoldOption::Manifold`] facets with a boundary edge are then peeled
/// until none is left.
pub fn enforce_manifold(complex: &mut SurfaceComplex, option: ManifoldOption) {
    if option == ManifoldOption::NonManifold {
        return;
    }

    let edge_map = edge_faces(complex.triangles.iter().map(|t| t.as_slice()));
    let fins: HashSet<usize> = edge_map
        .values()
        .filter(|faces| faces.len() > 2)
        .flatten()
        .copied()
        .collect();
    if !fins.is_empty() {
        log::warn!("removing {} facets around non-manifold edges", fins.len());
        remove_triangles(complex, &fins);
    }

    if option == ManifoldOption::Manifold {
        let mut peeled = 0;
        loop {
            let edge_map = edge_faces(complex.triangles.iter().map(|t| t.as_slice()));
            let border: HashSet<usize> = edge_map
                .values()
                .filter(|faces| faces.len() == 1)
                .flatten()
                .copied()
                .collect();
            if border.is_empty() {
                break;
            }
            peeled += border.len();
            remove_triangles(complex, &border);
        }
        if peeled > 0 {
            log::warn!("peeled {peeled} facets with boundary edges");
        }
    }
}

/// One sweep of tangential Laplacian relaxation followed by reprojection
pub fn perturb<F: ImplicitFunction>(
    domain: &ImplicitDomain<'_, F>,
    complex: &mut SurfaceComplex,
    spacing: Real,
    pinned: &[usize],
    cancel: &CancelToken,
) -> Result<(), OffsetError> {
    let mut neighbours: Vec<Vec<usize>> = vec![Vec::new(); complex.points.len()];
    for &[a, b, c] in &complex.triangles {
        for (u, v) in [(a, b), (b, c), (c, a)] {
            if !neighbours[u].contains(&v) {
                neighbours[u].push(v);
            }
            if !neighbours[v].contains(&u) {
                neighbours[v].push(u);
            }
        }
    }

    let radius = domain.bounding_sphere.radius();
    let tol = (domain.relative_error_bound * radius).max(Real::EPSILON * radius.max(1.0));
    let mut relaxed = complex.points.clone();
    for (i, ring) in neighbours.iter().enumerate() {
        if i % PROJECTION_BATCH == 0 {
            cancel.check()?;
        }
        if ring.is_empty() || pinned.binary_search(&i).is_ok() {
            continue;
        }
        let p = complex.points[i];
        let centroid = ring.iter().map(|&j| complex.points[j].coords).sum::<Vector3<Real>>()
            / ring.len() as Real;
        let g = gradient(domain, &p, spacing * 1e-2);
        let mut shift = centroid - p.coords;
        if let Some(n) = g.try_normalize(Real::EPSILON) {
            shift -= n * n.dot(&shift);
        }
        relaxed[i] = project_point(domain, &(p + shift * 0.5), spacing, tol);
    }
    complex.points = relaxed;
    Ok(())
}

/// Drop facets with (numerically) zero area
pub fn exude(complex: &mut SurfaceComplex) -> usize {
    let eps = tolerance() * tolerance();
    let before = complex.triangles.len();
    let points = &complex.points;
    complex
        .triangles
        .retain(|&tri| triangle_normal(points, tri).norm() * 0.5 > eps);
    before - complex.triangles.len()
}

/// Drop facets with repeated vertices and vertices no facet uses, keeping
/// the relative order of the survivors.
pub fn compact(complex: &mut SurfaceComplex) {
    complex
        .triangles
        .retain(|&[a, b, c]| a != b && b != c && c != a);

    let mut remap = vec![usize::MAX; complex.points.len()];
    for tri in &complex.triangles {
        for &i in tri {
            remap[i] = 0;
        }
    }
    let mut points = Vec::with_capacity(complex.points.len());
    for (old, slot) in remap.iter_mut().enumerate() {
        if *slot == 0 {
            *slot = points.len();
            points.push(complex.points[old]);
        }
    }
    for tri in &mut complex.triangles {
        for i in tri.iter_mut() {
            *i = remap[*i];
        }
    }
    complex.points = points;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mesher::BoundingSphere;

    fn square_complex(apex_shift: Real) -> SurfaceComplex {
        // two sliver triangles sharing the long diagonal 0-2 of a thin rhombus
        SurfaceComplex {
            points: vec![
                Point3::new(0.0, 0.0, 0.0),
                Point3::new(1.0, -0.1 - apex_shift, 0.0),
                Point3::new(2.0, 0.0, 0.0),
                Point3::new(1.0, 0.1 + apex_shift, 0.0),
            ],
            triangles: vec![[0, 1, 2], [2, 3, 0]],
        }
    }

    #[test]
    fn min_angle_of_equilateral_and_right_triangles() {
        let a = Point3::new(0.0, 0.0, 0.0);
        let b = Point3::new(1.0, 0.0, 0.0);
        let c = Point3::new(0.5, (3.0 as Real).sqrt() / 2.0, 0.0);
        assert!((min_angle(&a, &b, &c) - 60.0).abs() < 1e-9);
        assert!((min_angle(&a, &b, &Point3::new(0.0, 1.0, 0.0)) - 45.0).abs() < 1e-9);
    }

    #[test]
    fn sliver_pair_is_flipped() {
        let mut complex = square_complex(0.0);
        let flips = improve_facet_angles(&mut complex, 25.0, &CancelToken::new()).unwrap();
        assert_eq!(flips, 1);
        // the short diagonal 1-3 now exists
        let map = edge_faces(complex.triangles.iter().map(|t| t.as_slice()));
        assert!(map.contains_key(&(1, 3)));
        assert!(!map.contains_key(&(0, 2)));
        // orientation kept
        for &tri in &complex.triangles {
            assert!(triangle_normal(&complex.points, tri).z > 0.0);
        }
    }

    #[test]
    fn good_triangles_are_left_alone() {
        let mut complex = square_complex(0.9);
        let before = complex.clone();
        let flips = improve_facet_angles(&mut complex, 20.0, &CancelToken::new()).unwrap();
        assert_eq!(flips, 0);
        assert_eq!(complex, before);
    }

    #[test]
    fn projection_lands_on_sphere() {
        let sphere = |p: &Point3<Real>| 1.0 - p.coords.norm();
        let domain = ImplicitDomain::new(&sphere, BoundingSphere::new(Point3::origin(), 4.0), 1e-7);
        let p = project_point(&domain, &Point3::new(0.9, 0.3, -0.1), 0.1, 1e-9);
        assert!((p.coords.norm() - 1.0).abs() < 1e-8);
    }

    #[test]
    fn manifold_repair() {
        // three facets around edge 0-1, plus a lone facet elsewhere
        let mut complex = SurfaceComplex {
            points: (0..8).map(|i| Point3::new(i as Real, (i * i) as Real, 0.0)).collect(),
            triangles: vec![[0, 1, 2], [1, 0, 3], [0, 1, 4], [5, 6, 7]],
        };
        enforce_manifold(&mut complex, ManifoldOption::ManifoldWithBoundary);
        assert_eq!(complex.triangles, vec![[5, 6, 7]]);

        enforce_manifold(&mut complex, ManifoldOption::Manifold);
        assert!(complex.triangles.is_empty());
        compact(&mut complex);
        assert!(complex.is_empty());
    }

    #[test]
    fn compact_drops_unused_vertices() {
        let mut complex = SurfaceComplex {
            points: vec![
                Point3::new(9.0, 9.0, 9.0),
                Point3::new(0.0, 0.0, 0.0),
                Point3::new(1.0, 0.0, 0.0),
                Point3::new(0.0, 1.0, 0.0),
            ],
            triangles: vec![[1, 2, 3], [1, 1, 2]],
        };
        compact(&mut complex);
        assert_eq!(complex.triangles, vec![[0, 1, 2]]);
        assert_eq!(complex.points[0], Point3::new(0.0, 0.0, 0.0));
        assert_eq!(complex.number_of_vertices(), 3);
    }

    #[test]
    fn every_feature_sample_pins_a_vertex() {
        // vertices half a cell away from the feature, as surface nets leaves them
        let points: Vec<Point3<Real>> = (0..11)
            .flat_map(|i| {
                let x = i as Real * 0.1;
                [Point3::new(x, 0.05, 0.05), Point3::new(x, -0.05, 0.05)]
            })
            .chain([Point3::new(0.5, 1.0, 0.0)])
            .collect();
        let mut complex = SurfaceComplex {
            points,
            triangles: Vec::new(),
        };
        let features = vec![RequiredEdge {
            polyline: vec![Point3::new(0.0, 0.0, 0.0), Point3::new(1.0, 0.0, 0.0)],
            incident_patches: Vec::new(),
        }];

        let pinned = snap_to_features(&mut complex, &features, 0.1, 0.1 * (3.0 as Real).sqrt());
        assert_eq!(pinned.len(), 11);
        assert!(pinned.windows(2).all(|w| w[0] < w[1]));
        for &i in &pinned {
            let p = complex.points[i];
            assert!(p.y.abs() < 1e-12 && p.z.abs() < 1e-12, "{p}");
        }
        // far vertices stay put
        assert_eq!(complex.points[22], Point3::new(0.5, 1.0, 0.0));
    }

    #[test]
    fn resampling_keeps_both_ends() {
        let samples = resample(&[Point3::origin(), Point3::new(0.25, 0.0, 0.0)], 0.1);
        assert_eq!(samples.len(), 4);
        assert_eq!(samples[0], Point3::origin());
        assert_eq!(samples[3], Point3::new(0.25, 0.0, 0.0));
        assert_eq!(resample(&[Point3::new(1.0, 2.0, 3.0)], 0.1).len(), 1);
    }
}
