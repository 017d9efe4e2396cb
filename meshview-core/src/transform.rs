//! 3D transformation matrices
//!
//! Transforms are composed by pre-multiplication: the matrix built last is
//! applied last, so `T · R · S` scales first and translates last.
use nalgebra::{Matrix4, Unit, Vector3};

use crate::geometry::BoundingBox;

/// Span of the longest bounding box dimension after [`Transform::fit`]
pub const FIT_SPAN: f64 = 2.0;

/// Transform builder for 3D transformations
pub struct Transform;

impl Transform {
    /// Rotation of `angle` radians about `axis`, clockwise when seen from
    /// the tip of `axis` looking back at the origin
    ///
    /// This is the inverse of nalgebra's right-handed `from_axis_angle`.  A
    /// zero axis produces the identity.
    pub fn rotation(axis: Vector3<f64>, angle: f64) -> Matrix4<f64> {
        match Unit::try_new(axis, 0.0) {
            Some(axis) => Matrix4::from_axis_angle(&axis, -angle),
            None => Matrix4::identity(),
        }
    }

    /// Create a translation matrix
    pub fn translation(v: Vector3<f64>) -> Matrix4<f64> {
        Matrix4::new_translation(&v)
    }

    /// Create a uniform scale matrix
    pub fn scale(s: f64) -> Matrix4<f64> {
        Matrix4::new_scaling(s)
    }

    /// Centers a bounding box on the origin and scales it uniformly so that
    /// its longest side spans [`FIT_SPAN`] units
    ///
    /// Axes with zero extent are ignored when picking the scale; if every
    /// axis is degenerate the box is only centered.
    pub fn fit(bbox: &BoundingBox) -> Matrix4<f64> {
        let scale = bbox
            .size()
            .iter()
            .map(|&s| FIT_SPAN / s)
            .filter(|s| s.is_finite() && *s > 0.0)
            .fold(f64::INFINITY, f64::min);
        let scale = if scale.is_finite() { scale } else { 1.0 };
        Self::scale(scale) * Self::translation(-bbox.center().coords)
    }
}

/// Returns a unit vector perpendicular to `v`
///
/// Vectors along the Z axis map to `+Y`; the zero vector maps to zero.
pub fn perpendicular(v: &Vector3<f64>) -> Vector3<f64> {
    if v.x == 0.0 && v.y == 0.0 {
        if v.z == 0.0 {
            Vector3::zeros()
        } else {
            Vector3::y()
        }
    } else {
        Vector3::new(-v.y, v.x, 0.0).normalize()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use nalgebra::Point3;

    #[test]
    fn test_rotation_about_z() {
        let m = Transform::rotation(Vector3::z(), std::f64::consts::FRAC_PI_2);
        let p = m.transform_point(&Point3::new(1.0, 0.0, 0.0));
        assert_relative_eq!(p, Point3::new(0.0, -1.0, 0.0), epsilon = 1e-12);
    }

    #[test]
    fn test_rotation_about_x() {
        let m = Transform::rotation(Vector3::x(), std::f64::consts::FRAC_PI_2);
        let p = m.transform_point(&Point3::new(0.0, 1.0, 0.0));
        assert_relative_eq!(p, Point3::new(0.0, 0.0, -1.0), epsilon = 1e-12);

        // Negating the angle undoes the rotation
        let back = Transform::rotation(Vector3::x(), -std::f64::consts::FRAC_PI_2);
        assert_relative_eq!(back * m, Matrix4::identity(), epsilon = 1e-12);
    }

    #[test]
    fn test_zero_axis_rotation() {
        assert_eq!(
            Transform::rotation(Vector3::zeros(), 1.0),
            Matrix4::identity()
        );
    }

    #[test]
    fn test_composition_order() {
        // Scale first, then translate
        let m = Transform::translation(Vector3::new(1.0, 0.0, 0.0))
            * Transform::scale(2.0);
        let p = m.transform_point(&Point3::new(1.0, 1.0, 1.0));
        assert_eq!(p, Point3::new(3.0, 2.0, 2.0));
    }

    #[test]
    fn test_fit() {
        let bbox = BoundingBox {
            min: Point3::new(0.0, 0.0, 0.0),
            max: Point3::new(4.0, 2.0, 1.0),
        };
        let m = Transform::fit(&bbox);
        let lo = m.transform_point(&bbox.min);
        let hi = m.transform_point(&bbox.max);
        assert_relative_eq!(lo, Point3::new(-1.0, -0.5, -0.25));
        assert_relative_eq!(hi, Point3::new(1.0, 0.5, 0.25));
    }

    #[test]
    fn test_fit_flat() {
        let bbox = BoundingBox {
            min: Point3::new(0.0, 0.0, 3.0),
            max: Point3::new(1.0, 1.0, 3.0),
        };
        let m = Transform::fit(&bbox);
        let hi = m.transform_point(&bbox.max);
        assert_relative_eq!(hi, Point3::new(1.0, 1.0, 0.0));

        let point = BoundingBox {
            min: Point3::new(5.0, 5.0, 5.0),
            max: Point3::new(5.0, 5.0, 5.0),
        };
        let m = Transform::fit(&point);
        assert_relative_eq!(
            m.transform_point(&point.min),
            Point3::origin()
        );
    }

    #[test]
    fn test_perpendicular() {
        for v in [
            Vector3::new(1.0, 2.0, 3.0),
            Vector3::new(0.0, 0.0, -2.0),
            Vector3::new(-1.0, 0.0, 0.0),
        ] {
            let p = perpendicular(&v);
            assert_relative_eq!(p.norm(), 1.0);
            assert_relative_eq!(p.dot(&v), 0.0);
        }
        assert_eq!(perpendicular(&Vector3::zeros()), Vector3::zeros());
    }
}
