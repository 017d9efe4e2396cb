//! Geometry primitives for meshes and their bounds
use nalgebra::{Point3, Vector3};

/// A triangle face defined by three corner positions
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Triangle {
    pub vertices: [Point3<f64>; 3],
}

impl Triangle {
    pub fn new(v0: Point3<f64>, v1: Point3<f64>, v2: Point3<f64>) -> Self {
        Self {
            vertices: [v0, v1, v2],
        }
    }

    /// Calculate the face normal from the triangle's winding
    ///
    /// Degenerate triangles have no well-defined normal and return zero.
    pub fn normal(&self) -> Vector3<f64> {
        let [v0, v1, v2] = self.vertices;
        let n = (v1 - v0).cross(&(v2 - v0));
        n.try_normalize(0.0).unwrap_or_else(Vector3::zeros)
    }

    pub fn min_z(&self) -> f64 {
        self.vertices.iter().map(|v| v.z).fold(f64::INFINITY, f64::min)
    }

    pub fn max_z(&self) -> f64 {
        self.vertices
            .iter()
            .map(|v| v.z)
            .fold(f64::NEG_INFINITY, f64::max)
    }
}

/// Axis-aligned bounding box
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingBox {
    pub min: Point3<f64>,
    pub max: Point3<f64>,
}

impl BoundingBox {
    pub fn size(&self) -> Vector3<f64> {
        self.max - self.min
    }

    pub fn center(&self) -> Point3<f64> {
        nalgebra::center(&self.min, &self.max)
    }

    /// Extent along the vertical (Z) axis
    pub fn height(&self) -> f64 {
        self.max.z - self.min.z
    }
}

/// A 3D mesh composed of triangles
#[derive(Debug, Clone, Default)]
pub struct Mesh {
    pub triangles: Vec<Triangle>,
}

impl Mesh {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            triangles: Vec::with_capacity(capacity),
        }
    }

    pub fn add_triangle(&mut self, triangle: Triangle) {
        self.triangles.push(triangle);
    }

    pub fn is_empty(&self) -> bool {
        self.triangles.is_empty()
    }

    /// Returns the bounds of every vertex, or `None` for an empty mesh
    pub fn bounding_box(&self) -> Option<BoundingBox> {
        let mut points = self.triangles.iter().flat_map(|t| t.vertices.iter());
        let first = *points.next()?;
        let (min, max) = points.fold((first, first), |(lo, hi), p| {
            (lo.inf(p), hi.sup(p))
        });
        Some(BoundingBox { min, max })
    }

    /// Flattens the mesh into `x, y, z` triples, three per triangle
    pub fn vertex_buffer(&self) -> Vec<f32> {
        let mut out = Vec::with_capacity(self.triangles.len() * 9);
        for t in &self.triangles {
            for v in &t.vertices {
                out.extend_from_slice(&[v.x as f32, v.y as f32, v.z as f32]);
            }
        }
        out
    }

    /// Builds an axis-aligned box spanning `min` to `max`
    ///
    /// The box has 8 corners and 12 outward-facing triangles.
    pub fn cuboid(min: Point3<f64>, max: Point3<f64>) -> Self {
        let corner = |i: usize| {
            Point3::new(
                if i & 1 == 0 { min.x } else { max.x },
                if i & 2 == 0 { min.y } else { max.y },
                if i & 4 == 0 { min.z } else { max.z },
            )
        };
        // Corner indices of each face, counter-clockwise seen from outside
        const FACES: [[usize; 4]; 6] = [
            [0, 2, 3, 1], // bottom (-Z)
            [4, 5, 7, 6], // top (+Z)
            [0, 1, 5, 4], // front (-Y)
            [2, 6, 7, 3], // back (+Y)
            [0, 4, 6, 2], // left (-X)
            [1, 3, 7, 5], // right (+X)
        ];
        let mut mesh = Self::with_capacity(12);
        for [a, b, c, d] in FACES {
            mesh.add_triangle(Triangle::new(corner(a), corner(b), corner(c)));
            mesh.add_triangle(Triangle::new(corner(a), corner(c), corner(d)));
        }
        mesh
    }

    /// Create a unit cube spanning `[0, 1]` on every axis
    pub fn unit_cube() -> Self {
        Self::cuboid(Point3::origin(), Point3::new(1.0, 1.0, 1.0))
    }
}
