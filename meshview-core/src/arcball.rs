//! Arcball projection and rotation
//!
//! Cursor positions are lifted onto a virtual hemisphere facing the camera;
//! the rotation that carries one lifted point onto another is the drag's
//! rotation.  The camera looks along +Y with +Z up, so screen X maps to model
//! X, screen Y maps to model Z, and the height above the screen plane is the
//! `y` component.
use nalgebra::{Matrix4, Vector3};

use crate::input::{CursorPos, WindowSize};
use crate::transform::{perpendicular, Transform};

/// Tolerance for the degenerate cases in [`arcball_rotate`]
pub const EPSILON: f64 = 1e-9;

/// Cursor offsets are divided by this before being lifted onto the sphere,
/// so a full-window drag covers a small patch of it
const DAMPING: f64 = 4.0;

/// Maps a cursor position onto the unit arcball hemisphere
///
/// Positions that fall outside the sphere's silhouette are projected onto
/// its rim.
pub fn arcball_vector(pos: CursorPos, size: WindowSize) -> Vector3<f64> {
    let (x, y) = size.normalize(pos);
    let x = -x / DAMPING;
    let y = y / DAMPING;
    let q = x * x + y * y;
    if q <= 1.0 {
        Vector3::new(x, (1.0 - q).sqrt(), y)
    } else {
        Vector3::new(x, 0.0, y).normalize()
    }
}

/// Maps a cursor position onto the `y = 0` plane, for panning
pub fn screen_position(pos: CursorPos, size: WindowSize) -> Vector3<f64> {
    let (x, y) = size.normalize(pos);
    Vector3::new(x, 0.0, -y)
}

/// Builds the rotation for a drag from `start` to `current`
///
/// `sensitivity` multiplies the rotation angle, so values above one
/// overshoot the cursor.  Nearly identical (or nearly perpendicular) vectors
/// produce the identity; antiparallel vectors have no unique axis, so they
/// rotate by `π·sensitivity` about an arbitrary perpendicular.
pub fn arcball_rotate(
    start: &Vector3<f64>,
    current: &Vector3<f64>,
    sensitivity: f64,
) -> Matrix4<f64> {
    let dot = current.dot(start);
    if dot.abs() < EPSILON || (dot - 1.0).abs() < EPSILON {
        Matrix4::identity()
    } else if (dot + 1.0).abs() < EPSILON {
        Transform::rotation(
            perpendicular(start),
            std::f64::consts::PI * sensitivity,
        )
    } else {
        let angle = dot.acos();
        let axis = current.cross(start);
        Transform::rotation(axis, angle * sensitivity)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use nalgebra::{Point3, Rotation3};

    const SIZE: WindowSize = WindowSize {
        width: 800,
        height: 600,
    };

    fn rotation_part(m: &Matrix4<f64>) -> Rotation3<f64> {
        Rotation3::from_matrix(&m.fixed_view::<3, 3>(0, 0).clone_owned())
    }

    #[test]
    fn test_center_is_pole() {
        let v = arcball_vector(CursorPos::new(400.0, 300.0), SIZE);
        assert_eq!(v, Vector3::new(0.0, 1.0, 0.0));
    }

    #[test]
    fn test_arcball_vector_is_unit() {
        for (x, y) in [(0.0, 0.0), (800.0, 600.0), (123.0, 456.0)] {
            let v = arcball_vector(CursorPos::new(x, y), SIZE);
            assert_relative_eq!(v.norm(), 1.0, epsilon = 1e-12);
            assert!(v.y >= 0.0);
        }
    }

    #[test]
    fn test_arcball_vector_axes() {
        // Right of center is -X (the X axis is inverted), below is +Z
        let v = arcball_vector(CursorPos::new(800.0, 300.0), SIZE);
        assert_relative_eq!(v.x, -0.25);
        assert_eq!(v.z, 0.0);
        let v = arcball_vector(CursorPos::new(400.0, 600.0), SIZE);
        assert_eq!(v.x, 0.0);
        assert_relative_eq!(v.z, 0.25);
    }

    #[test]
    fn test_arcball_vector_rim() {
        // Far outside the window lands on the rim of the sphere
        let v = arcball_vector(CursorPos::new(-4000.0, 300.0), SIZE);
        assert_eq!(v.y, 0.0);
        assert_relative_eq!(v, Vector3::new(1.0, 0.0, 0.0));
    }

    #[test]
    fn test_arcball_vector_idempotent() {
        let pos = CursorPos::new(211.5, 97.25);
        assert_eq!(arcball_vector(pos, SIZE), arcball_vector(pos, SIZE));
    }

    #[test]
    fn test_screen_position() {
        let v = screen_position(CursorPos::new(600.0, 150.0), SIZE);
        assert_eq!(v, Vector3::new(0.5, 0.0, 0.5));
    }

    #[test]
    fn test_same_vector_is_identity() {
        let v = Vector3::new(0.1, 0.9, -0.2).normalize();
        for s in [0.5, 1.0, 20.0, 123.4] {
            assert_eq!(arcball_rotate(&v, &v, s), Matrix4::identity());
        }
    }

    #[test]
    fn test_perpendicular_is_identity() {
        let a = Vector3::new(1.0, 0.0, 0.0);
        let b = Vector3::new(0.0, 1.0, 0.0);
        assert_eq!(arcball_rotate(&a, &b, 20.0), Matrix4::identity());
    }

    #[test]
    fn test_antiparallel() {
        let start = Vector3::new(0.3, 0.8, -0.2).normalize();
        let current = -start;
        for s in [0.5, 0.25, 0.75] {
            let m = arcball_rotate(&start, &current, s);
            let r = rotation_part(&m);
            assert_relative_eq!(
                r.angle(),
                std::f64::consts::PI * s,
                epsilon = 1e-9
            );
            let axis = r.axis().unwrap();
            assert_relative_eq!(axis.dot(&start), 0.0, epsilon = 1e-9);
        }

        // A half turn flips the start vector
        let m = arcball_rotate(&start, &current, 1.0);
        assert_relative_eq!(m.transform_vector(&start), current, epsilon = 1e-9);
    }

    #[test]
    fn test_drag_right_turns_near_face_right() {
        let start = arcball_vector(CursorPos::new(400.0, 300.0), SIZE);
        let current = arcball_vector(CursorPos::new(500.0, 300.0), SIZE);
        let m = arcball_rotate(&start, &current, 1.0);
        assert_relative_eq!(m.transform_vector(&start), current, epsilon = 1e-12);

        // The camera sits on -Y, and screen right is +X
        let near = m.transform_point(&Point3::new(0.0, -1.0, 0.0));
        assert!(near.x > 0.0);
        assert_relative_eq!(near.z, 0.0, epsilon = 1e-12);

        // Dragging down pulls the near face down
        let current = arcball_vector(CursorPos::new(400.0, 400.0), SIZE);
        let m = arcball_rotate(&start, &current, 1.0);
        let near = m.transform_point(&Point3::new(0.0, -1.0, 0.0));
        assert!(near.z < 0.0);
        assert_relative_eq!(near.x, 0.0, epsilon = 1e-12);
    }

    #[test]
    fn test_general_rotation() {
        let start = arcball_vector(CursorPos::new(400.0, 300.0), SIZE);
        let current = arcball_vector(CursorPos::new(500.0, 320.0), SIZE);

        // With unit sensitivity the rotation carries start onto current
        let m = arcball_rotate(&start, &current, 1.0);
        let moved = m.transform_vector(&start);
        assert_relative_eq!(moved, current, epsilon = 1e-9);

        // Sensitivity scales the angle, not the axis
        let m2 = arcball_rotate(&start, &current, 2.0);
        let one = rotation_part(&m);
        let two = rotation_part(&m2);
        assert_relative_eq!(two.angle(), one.angle() * 2.0, epsilon = 1e-9);
        assert_relative_eq!(
            two.axis().unwrap(),
            one.axis().unwrap(),
            epsilon = 1e-9
        );
    }
}
