//! Horizontal slicing of triangle meshes
//!
//! Each plane `z = const` is intersected with every triangle that spans it,
//! and the resulting segments are chained into outlines.  Outlines follow
//! the triangle winding, so the outer boundary of a solid with outward
//! facing triangles runs counter-clockwise seen from above.
use std::collections::{HashMap, HashSet};

use nalgebra::Point3;
use rayon::prelude::*;

use crate::geometry::{Mesh, Triangle};

/// Polyline through a slice; closed paths repeat their first point at the end
pub type Path = Vec<Point3<f64>>;

/// Every outline of a mesh at one plane height
#[derive(Debug, Clone, PartialEq)]
pub struct Slice {
    pub z: f64,
    pub paths: Vec<Path>,
}

impl Slice {
    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }
}

/// Rounds plane heights so that accumulated step error doesn't leak into
/// the output
fn round8(v: f64) -> f64 {
    (v * 1e8).round() / 1e8
}

/// Slices a mesh with planes `step` apart, starting at its lowest point
///
/// Slices are returned bottom to top.  Empty layers at either end of the
/// stack (e.g. the plane through a flat bottom face) are dropped.  A step
/// that isn't a positive finite number produces no slices.
pub fn slice_mesh(mesh: &Mesh, step: f64) -> Vec<Slice> {
    if !(step.is_finite() && step > 0.0) {
        return vec![];
    }
    let Some(bbox) = mesh.bounding_box() else {
        return vec![];
    };
    let count = (bbox.height() / step).ceil();
    if !count.is_finite() || count < 1.0 {
        return vec![];
    }
    let count = count as usize;

    let mut slices: Vec<Slice> = (0..count)
        .into_par_iter()
        .map(|i| {
            let z = round8(bbox.min.z + step * i as f64);
            slice_at(mesh, z)
        })
        .collect();

    let first = slices.iter().position(|s| !s.is_empty());
    let last = slices.iter().rposition(|s| !s.is_empty());
    match (first, last) {
        (Some(first), Some(last)) => {
            slices.truncate(last + 1);
            slices.drain(..first);
            slices
        }
        _ => vec![],
    }
}

/// Slices a mesh with a single plane
pub fn slice_at(mesh: &Mesh, z: f64) -> Slice {
    let segments: Vec<_> = mesh
        .triangles
        .iter()
        .filter(|t| t.min_z() < z && t.max_z() >= z)
        .filter_map(|t| intersect(t, z))
        .collect();
    Slice {
        z,
        paths: chain(&segments),
    }
}

/// Point where the edge `lo → hi` crosses the plane, where `lo` is below it
/// and `hi` is on or above it
///
/// Both triangles sharing an edge call this with the same endpoints in the
/// same order, so they get bit-identical points.
fn crossing(lo: &Point3<f64>, hi: &Point3<f64>, z: f64) -> Point3<f64> {
    let t = (z - lo.z) / (hi.z - lo.z);
    let mut p = lo + (hi - lo) * t;
    p.z = z;
    p
}

/// Intersects a triangle with the plane, returning the directed segment
///
/// A vertex counts as above the plane when `z_v >= z`, so every triangle
/// has either zero or two crossing edges and faces lying in the plane have
/// none.
fn intersect(t: &Triangle, z: f64) -> Option<(Point3<f64>, Point3<f64>)> {
    let mut enter = None;
    let mut exit = None;
    for i in 0..3 {
        let a = &t.vertices[i];
        let b = &t.vertices[(i + 1) % 3];
        match (a.z >= z, b.z >= z) {
            (true, false) => exit = Some(crossing(b, a, z)),
            (false, true) => enter = Some(crossing(a, b, z)),
            _ => (),
        }
    }
    let (start, end) = (exit?, enter?);
    (start != end).then_some((start, end))
}

/// Hash key for a point on the current plane, with `-0.0` folded into `0.0`
fn key(p: &Point3<f64>) -> (u64, u64) {
    ((p.x + 0.0).to_bits(), (p.y + 0.0).to_bits())
}

/// Links directed segments end-to-start into paths
///
/// Chains that can't be continued are emitted open; chains that return to
/// their first point end with a copy of it.
fn chain(segments: &[(Point3<f64>, Point3<f64>)]) -> Vec<Path> {
    let mut by_start: HashMap<(u64, u64), Vec<usize>> = HashMap::new();
    for (i, (a, _)) in segments.iter().enumerate() {
        by_start.entry(key(a)).or_default().push(i);
    }

    // Open chains must begin at a segment nothing leads into; start there
    // so that they come out whole
    let has_incoming: HashSet<_> =
        segments.iter().map(|(_, b)| key(b)).collect();
    let (heads, rest): (Vec<usize>, Vec<usize>) = (0..segments.len())
        .partition(|&i| !has_incoming.contains(&key(&segments[i].0)));

    let mut used = vec![false; segments.len()];
    let mut paths = vec![];
    for i in heads.into_iter().chain(rest) {
        if used[i] {
            continue;
        }
        used[i] = true;
        let (a, b) = segments[i];
        let first = key(&a);
        let mut path = vec![a, b];
        let mut tail = key(&b);
        while tail != first {
            let next = by_start
                .get(&tail)
                .and_then(|c| c.iter().copied().find(|&j| !used[j]));
            let Some(j) = next else {
                break;
            };
            used[j] = true;
            let p = segments[j].1;
            path.push(p);
            tail = key(&p);
        }
        if tail == first {
            // Use the exact starting point, so path[0] == path[last]
            if let Some(last) = path.last_mut() {
                *last = a;
            }
        }
        paths.push(path);
    }
    paths
}
