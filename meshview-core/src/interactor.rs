//! Camera interactors
//!
//! An [`Interactor`] turns cursor, button, key and scroll events into the
//! view matrix for the next frame.  The render loop only talks to the trait,
//! so camera modes can be swapped without touching it.
use std::f64::consts::{FRAC_PI_2, FRAC_PI_4, PI};

use log::debug;
use nalgebra::{Matrix4, Vector3};

use crate::arcball::{arcball_rotate, arcball_vector, screen_position};
use crate::input::{Action, Button, CursorPos, Key, Modifiers, WindowSize};
use crate::projection::Camera;
use crate::transform::Transform;

/// Zoom factor applied per scroll notch
pub const ZOOM_PER_NOTCH: f64 = 0.98;

/// Rotation applied by the left / right arrow keys (3°)
pub const NUDGE_ANGLE: f64 = PI / 60.0;

/// Input handler producing a camera matrix
pub trait Interactor {
    fn cursor_moved(&mut self, pos: CursorPos, size: WindowSize);
    fn button(
        &mut self,
        button: Button,
        action: Action,
        mods: Modifiers,
        pos: CursorPos,
        size: WindowSize,
    );
    fn key(&mut self, key: Key, action: Action, mods: Modifiers);
    fn scroll(&mut self, dy: f64);

    /// Full camera matrix (projection, placement and interaction) for a
    /// viewport with the given width / height ratio
    fn matrix(&self, aspect: f64) -> Matrix4<f64>;
}

/// Selects which [`Interactor`] drives the camera
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum CameraMode {
    #[default]
    Arcball,
    Turntable,
}

impl CameraMode {
    /// Builds the interactor, optionally overriding its default sensitivity
    pub fn build(self, sensitivity: Option<f64>) -> Box<dyn Interactor> {
        match self {
            Self::Arcball => {
                let mut a = Arcball::new();
                if let Some(s) = sensitivity {
                    a.sensitivity = s;
                }
                Box::new(a)
            }
            Self::Turntable => {
                let mut t = Turntable::new();
                if let Some(s) = sensitivity {
                    t.sensitivity = s;
                }
                Box::new(t)
            }
        }
    }
}

/// Uniform zoom for an accumulated scroll amount
fn zoom(scroll: f64) -> Matrix4<f64> {
    Transform::scale(ZOOM_PER_NOTCH.powf(scroll))
}

/// Canonical view for the number keys `1` through `7`
fn preset(n: u8) -> Option<Matrix4<f64>> {
    let m = match n {
        1 => Matrix4::identity(),
        2 => Transform::rotation(Vector3::z(), FRAC_PI_2),
        3 => Transform::rotation(Vector3::z(), PI),
        4 => Transform::rotation(Vector3::z(), -FRAC_PI_2),
        5 => Transform::rotation(Vector3::x(), FRAC_PI_2),
        6 => Transform::rotation(Vector3::x(), -FRAC_PI_2),
        7 => {
            Transform::rotation(Vector3::z(), FRAC_PI_4)
                * Transform::rotation(Vector3::new(1.0, 1.0, 0.0), -FRAC_PI_4)
        }
        _ => return None,
    };
    Some(m)
}

/// In-progress drag
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Gesture {
    Idle,
    /// Points on the arcball hemisphere
    Rotating {
        start: Vector3<f64>,
        current: Vector3<f64>,
    },
    /// Points on the screen plane
    Panning {
        start: Vector3<f64>,
        current: Vector3<f64>,
    },
}

////////////////////////////////////////////////////////////////////////////////

/// Arcball camera: drag to rotate, drag with a modifier to pan, scroll to zoom
///
/// Finished gestures are folded into the committed rotation and translation;
/// an in-progress gesture is layered on top of them when the matrix is built,
/// so the view tracks the cursor during a drag.
#[derive(Debug, Clone)]
pub struct Arcball {
    /// Multiplies the rotation angle of each drag
    pub sensitivity: f64,
    camera: Camera,
    rotation: Matrix4<f64>,
    translation: Vector3<f64>,
    scroll: f64,
    gesture: Gesture,
}

impl Default for Arcball {
    fn default() -> Self {
        Self::new()
    }
}

impl Arcball {
    pub const DEFAULT_SENSITIVITY: f64 = 20.0;

    pub fn new() -> Self {
        Self {
            sensitivity: Self::DEFAULT_SENSITIVITY,
            camera: Camera::default(),
            rotation: Matrix4::identity(),
            translation: Vector3::zeros(),
            scroll: 0.0,
            gesture: Gesture::Idle,
        }
    }

    /// Committed rotation, excluding any drag in progress
    pub fn rotation(&self) -> &Matrix4<f64> {
        &self.rotation
    }

    /// Committed translation, excluding any pan in progress
    pub fn translation(&self) -> &Vector3<f64> {
        &self.translation
    }

    pub fn scroll_amount(&self) -> f64 {
        self.scroll
    }

    pub fn gesture(&self) -> Gesture {
        self.gesture
    }

    /// Model-space part of the view: translation, rotation and zoom,
    /// including the drag in progress
    pub fn model_view(&self) -> Matrix4<f64> {
        let mut r = self.rotation;
        let mut t = self.translation;
        match self.gesture {
            Gesture::Rotating { start, current } => {
                r = arcball_rotate(&start, &current, self.sensitivity) * r;
            }
            Gesture::Panning { start, current } => t += current - start,
            Gesture::Idle => (),
        }
        Transform::translation(t) * r * zoom(self.scroll)
    }

    fn commit(&mut self) {
        match self.gesture {
            Gesture::Rotating { start, current } => {
                let m = arcball_rotate(&start, &current, self.sensitivity);
                self.rotation = m * self.rotation;
                debug!("committed rotation from {start:?} to {current:?}");
            }
            Gesture::Panning { start, current } => {
                self.translation += current - start;
                debug!("committed pan, translation is now {:?}", self.translation);
            }
            Gesture::Idle => (),
        }
        self.gesture = Gesture::Idle;
    }
}

impl Interactor for Arcball {
    fn cursor_moved(&mut self, pos: CursorPos, size: WindowSize) {
        match &mut self.gesture {
            Gesture::Rotating { current, .. } => {
                *current = arcball_vector(pos, size);
            }
            Gesture::Panning { current, .. } => {
                *current = screen_position(pos, size);
            }
            Gesture::Idle => (),
        }
    }

    fn button(
        &mut self,
        button: Button,
        action: Action,
        mods: Modifiers,
        pos: CursorPos,
        size: WindowSize,
    ) {
        if button != Button::Primary {
            return;
        }
        match action {
            Action::Press if mods.is_empty() => {
                let v = arcball_vector(pos, size);
                self.gesture = Gesture::Rotating {
                    start: v,
                    current: v,
                };
            }
            Action::Press => {
                let v = screen_position(pos, size);
                self.gesture = Gesture::Panning {
                    start: v,
                    current: v,
                };
            }
            Action::Release => self.commit(),
            Action::Repeat => (),
        }
    }

    fn key(&mut self, key: Key, action: Action, mods: Modifiers) {
        if !action.is_active() || !mods.is_empty() {
            return;
        }
        match key {
            Key::Digit(n) => {
                if let Some(r) = preset(n) {
                    self.rotation = r;
                    self.translation = Vector3::zeros();
                    self.scroll = 0.0;
                }
            }
            Key::Left => {
                self.rotation =
                    Transform::rotation(Vector3::z(), -NUDGE_ANGLE) * self.rotation;
            }
            Key::Right => {
                self.rotation =
                    Transform::rotation(Vector3::z(), NUDGE_ANGLE) * self.rotation;
            }
            _ => (),
        }
    }

    fn scroll(&mut self, dy: f64) {
        self.scroll += dy;
    }

    fn matrix(&self, aspect: f64) -> Matrix4<f64> {
        self.camera.matrix(&self.model_view(), aspect)
    }
}

////////////////////////////////////////////////////////////////////////////////

/// Turntable camera: horizontal drags spin about the vertical axis, vertical
/// drags tilt, and the tilt is limited so the model never flips over
#[derive(Debug, Clone)]
pub struct Turntable {
    /// Degrees of rotation per pixel of drag
    pub sensitivity: f64,
    camera: Camera,
    dx: f64,
    dy: f64,
    last: Option<CursorPos>,
    scroll: f64,
}

impl Default for Turntable {
    fn default() -> Self {
        Self::new()
    }
}

impl Turntable {
    pub const DEFAULT_SENSITIVITY: f64 = 0.5;

    pub fn new() -> Self {
        Self {
            sensitivity: Self::DEFAULT_SENSITIVITY,
            camera: Camera::default(),
            dx: 0.0,
            dy: 0.0,
            last: None,
            scroll: 0.0,
        }
    }

    /// Accumulated drag in pixels
    pub fn drag(&self) -> (f64, f64) {
        (self.dx, self.dy)
    }

    pub fn model_view(&self) -> Matrix4<f64> {
        let a1 = (-self.dx * self.sensitivity).to_radians();
        let a2 = (-self.dy * self.sensitivity).to_radians();
        let tilt_axis = Vector3::new(a1.cos(), a1.sin(), 0.0);
        Transform::rotation(Vector3::z(), a1)
            * Transform::rotation(tilt_axis, a2)
            * zoom(self.scroll)
    }
}

impl Interactor for Turntable {
    fn cursor_moved(&mut self, pos: CursorPos, _size: WindowSize) {
        if let Some(last) = self.last {
            let limit = 90.0 / self.sensitivity.abs();
            self.dx += pos.x - last.x;
            self.dy = (self.dy + pos.y - last.y).clamp(-limit, limit);
            self.last = Some(pos);
        }
    }

    fn button(
        &mut self,
        button: Button,
        action: Action,
        _mods: Modifiers,
        pos: CursorPos,
        _size: WindowSize,
    ) {
        if button != Button::Primary {
            return;
        }
        match action {
            Action::Press => self.last = Some(pos),
            Action::Release => self.last = None,
            Action::Repeat => (),
        }
    }

    fn key(&mut self, key: Key, action: Action, mods: Modifiers) {
        if !action.is_active() || !mods.is_empty() {
            return;
        }
        if let Key::Digit(1..=7) = key {
            self.dx = 0.0;
            self.dy = 0.0;
            self.scroll = 0.0;
        }
    }

    fn scroll(&mut self, dy: f64) {
        self.scroll += dy;
    }

    fn matrix(&self, aspect: f64) -> Matrix4<f64> {
        self.camera.matrix(&self.model_view(), aspect)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use nalgebra::Point3;

    const SIZE: WindowSize = WindowSize {
        width: 640,
        height: 480,
    };

    fn press(a: &mut impl Interactor, mods: Modifiers, x: f64, y: f64) {
        a.button(
            Button::Primary,
            Action::Press,
            mods,
            CursorPos::new(x, y),
            SIZE,
        );
    }

    fn release(a: &mut impl Interactor, x: f64, y: f64) {
        a.button(
            Button::Primary,
            Action::Release,
            Modifiers::NONE,
            CursorPos::new(x, y),
            SIZE,
        );
    }

    fn drag(a: &mut Arcball, mods: Modifiers, from: (f64, f64), to: (f64, f64)) {
        press(a, mods, from.0, from.1);
        a.cursor_moved(CursorPos::new(to.0, to.1), SIZE);
        release(a, to.0, to.1);
    }

    #[test]
    fn test_initial_matrix() {
        let a = Arcball::new();
        assert_eq!(a.model_view(), Matrix4::identity());
        assert_eq!(
            a.matrix(1.5),
            Camera::default().matrix(&Matrix4::identity(), 1.5)
        );
    }

    #[test]
    fn test_rotate_round_trip() {
        let mut a = Arcball::new();
        a.key(Key::Digit(2), Action::Press, Modifiers::NONE);
        let prior = *a.rotation();

        let (pa, pb) = ((300.0, 200.0), (340.0, 260.0));
        drag(&mut a, Modifiers::NONE, pa, pb);

        let va = arcball_vector(CursorPos::new(pa.0, pa.1), SIZE);
        let vb = arcball_vector(CursorPos::new(pb.0, pb.1), SIZE);
        let expected = arcball_rotate(&va, &vb, Arcball::DEFAULT_SENSITIVITY) * prior;
        assert_eq!(*a.rotation(), expected);
        assert_eq!(a.gesture(), Gesture::Idle);
        assert_eq!(*a.translation(), Vector3::zeros());
    }

    #[test]
    fn test_pan_round_trip() {
        let mut a = Arcball::new();
        drag(&mut a, Modifiers::SHIFT, (100.0, 100.0), (420.0, 60.0));
        let sa = screen_position(CursorPos::new(100.0, 100.0), SIZE);
        let sb = screen_position(CursorPos::new(420.0, 60.0), SIZE);
        assert_eq!(*a.translation(), sb - sa);
        assert_eq!(*a.rotation(), Matrix4::identity());

        // A second pan accumulates
        drag(&mut a, Modifiers::SHIFT, (420.0, 60.0), (100.0, 100.0));
        assert_relative_eq!(*a.translation(), Vector3::zeros(), epsilon = 1e-12);
    }

    #[test]
    fn test_gesture_in_progress() {
        let mut a = Arcball::new();
        press(&mut a, Modifiers::NONE, 320.0, 240.0);
        assert!(matches!(a.gesture(), Gesture::Rotating { .. }));
        let before = a.model_view();
        a.cursor_moved(CursorPos::new(360.0, 240.0), SIZE);

        // The drag shows up in the matrix but isn't committed yet
        assert_ne!(a.model_view(), before);
        assert_eq!(*a.rotation(), Matrix4::identity());

        let during = a.model_view();
        release(&mut a, 360.0, 240.0);
        assert_eq!(a.model_view(), during);
    }

    #[test]
    fn test_moves_while_idle_are_ignored() {
        let mut a = Arcball::new();
        a.cursor_moved(CursorPos::new(10.0, 10.0), SIZE);
        release(&mut a, 10.0, 10.0);
        assert_eq!(a.model_view(), Matrix4::identity());
    }

    #[test]
    fn test_other_buttons_are_ignored() {
        let mut a = Arcball::new();
        a.button(
            Button::Secondary,
            Action::Press,
            Modifiers::NONE,
            CursorPos::new(1.0, 1.0),
            SIZE,
        );
        assert_eq!(a.gesture(), Gesture::Idle);
    }

    #[test]
    fn test_presets_idempotent() {
        for n in 1..=7 {
            let mut a = Arcball::new();
            drag(&mut a, Modifiers::NONE, (100.0, 100.0), (200.0, 150.0));
            drag(&mut a, Modifiers::SHIFT, (100.0, 100.0), (200.0, 150.0));
            a.scroll(3.0);

            a.key(Key::Digit(n), Action::Press, Modifiers::NONE);
            let first = *a.rotation();
            assert_eq!(*a.translation(), Vector3::zeros());
            assert_eq!(a.scroll_amount(), 0.0);

            a.key(Key::Digit(n), Action::Repeat, Modifiers::NONE);
            assert_eq!(*a.rotation(), first);
            assert_eq!(*a.translation(), Vector3::zeros());
            assert_eq!(a.scroll_amount(), 0.0);
        }
    }

    fn pressed(n: u8) -> Matrix4<f64> {
        let mut a = Arcball::new();
        a.key(Key::Digit(n), Action::Press, Modifiers::NONE);
        *a.rotation()
    }

    #[test]
    fn test_preset_orientations() {
        let h = std::f64::consts::FRAC_1_SQRT_2;
        // (key, point, where the point ends up)
        let cases = [
            (1, Point3::new(1.0, 0.0, 0.0), Point3::new(1.0, 0.0, 0.0)),
            (2, Point3::new(1.0, 0.0, 0.0), Point3::new(0.0, -1.0, 0.0)),
            (3, Point3::new(1.0, 0.0, 0.0), Point3::new(-1.0, 0.0, 0.0)),
            (4, Point3::new(1.0, 0.0, 0.0), Point3::new(0.0, 1.0, 0.0)),
            (5, Point3::new(0.0, 1.0, 0.0), Point3::new(0.0, 0.0, -1.0)),
            (6, Point3::new(0.0, 1.0, 0.0), Point3::new(0.0, 0.0, 1.0)),
            // The top tips toward the camera
            (7, Point3::new(0.0, 0.0, 1.0), Point3::new(0.0, -h, h)),
        ];
        for (n, p, expected) in cases {
            let moved = pressed(n).transform_point(&p);
            assert_relative_eq!(moved, expected, epsilon = 1e-12);
        }
        assert_eq!(pressed(1), Matrix4::identity());
    }

    #[test]
    fn test_keys_need_no_modifier() {
        let mut a = Arcball::new();
        a.scroll(2.0);
        a.key(Key::Digit(3), Action::Press, Modifiers::SHIFT);
        a.key(Key::Digit(3), Action::Release, Modifiers::NONE);
        a.key(Key::Left, Action::Press, Modifiers::SHIFT);
        assert_eq!(*a.rotation(), Matrix4::identity());
        assert_eq!(a.scroll_amount(), 2.0);

        // Digits outside the preset range do nothing
        a.key(Key::Digit(8), Action::Press, Modifiers::NONE);
        assert_eq!(a.scroll_amount(), 2.0);
    }

    #[test]
    fn test_nudge() {
        let mut a = Arcball::new();
        drag(&mut a, Modifiers::SHIFT, (0.0, 0.0), (64.0, 48.0));
        a.scroll(-1.0);
        let t = *a.translation();

        a.key(Key::Right, Action::Press, Modifiers::NONE);
        assert_relative_eq!(
            *a.rotation(),
            Transform::rotation(Vector3::z(), NUDGE_ANGLE),
            epsilon = 1e-12
        );
        a.key(Key::Left, Action::Repeat, Modifiers::NONE);
        assert_relative_eq!(*a.rotation(), Matrix4::identity(), epsilon = 1e-12);

        // Nudging leaves pan and zoom alone
        assert_eq!(*a.translation(), t);
        assert_eq!(a.scroll_amount(), -1.0);
    }

    #[test]
    fn test_nudge_direction() {
        let near = Point3::new(0.0, -1.0, 0.0);
        let (s, c) = NUDGE_ANGLE.sin_cos();

        // Right swings the near face left, by three degrees
        let mut a = Arcball::new();
        a.key(Key::Right, Action::Press, Modifiers::NONE);
        let p = a.rotation().transform_point(&near);
        assert_relative_eq!(p, Point3::new(-s, -c, 0.0), epsilon = 1e-12);

        let mut a = Arcball::new();
        a.key(Key::Left, Action::Press, Modifiers::NONE);
        let p = a.rotation().transform_point(&near);
        assert_relative_eq!(p, Point3::new(s, -c, 0.0), epsilon = 1e-12);
    }

    #[test]
    fn test_scroll_associative() {
        let mut a = Arcball::new();
        a.scroll(1.5);
        a.scroll(2.0);
        let mut b = Arcball::new();
        b.scroll(3.5);
        assert_eq!(a.scroll_amount(), b.scroll_amount());
        assert_eq!(a.matrix(1.0), b.matrix(1.0));
    }

    #[test]
    fn test_zoom_during_gesture() {
        let mut a = Arcball::new();
        press(&mut a, Modifiers::NONE, 320.0, 240.0);
        a.scroll(4.0);
        assert_eq!(a.scroll_amount(), 4.0);
        a.cursor_moved(CursorPos::new(330.0, 250.0), SIZE);
        release(&mut a, 330.0, 250.0);
        assert_eq!(a.scroll_amount(), 4.0);

        let s = ZOOM_PER_NOTCH.powf(4.0);
        let m = Transform::scale(s);
        assert_relative_eq!(a.model_view(), a.rotation() * m, epsilon = 1e-12);
    }

    #[test]
    fn test_camera_mode() {
        let m = CameraMode::default().build(None);
        assert_eq!(m.matrix(1.0), Arcball::new().matrix(1.0));
        let m = CameraMode::Turntable.build(Some(1.0));
        assert_eq!(m.matrix(1.0), Turntable::new().matrix(1.0));
    }

    #[test]
    fn test_turntable_spin() {
        let mut t = Turntable::new();
        press(&mut t, Modifiers::NONE, 100.0, 100.0);
        t.cursor_moved(CursorPos::new(280.0, 100.0), SIZE);
        release(&mut t, 280.0, 100.0);
        assert_eq!(t.drag(), (180.0, 0.0));

        // 180 pixels at half a degree each is a quarter turn, and the near
        // face follows the cursor to the right
        let p = t.model_view().transform_point(&Point3::new(1.0, 0.0, 0.0));
        assert_relative_eq!(p, Point3::new(0.0, 1.0, 0.0), epsilon = 1e-12);
        let p = t.model_view().transform_point(&Point3::new(0.0, -1.0, 0.0));
        assert_relative_eq!(p, Point3::new(1.0, 0.0, 0.0), epsilon = 1e-12);

        // Moves after release are ignored
        t.cursor_moved(CursorPos::new(0.0, 0.0), SIZE);
        assert_eq!(t.drag(), (180.0, 0.0));
    }

    #[test]
    fn test_turntable_tilt() {
        let mut t = Turntable::new();
        press(&mut t, Modifiers::NONE, 0.0, 0.0);
        t.cursor_moved(CursorPos::new(0.0, 180.0), SIZE);

        // Dragging down a quarter turn brings the top toward the camera
        let p = t.model_view().transform_point(&Point3::new(0.0, 0.0, 1.0));
        assert_relative_eq!(p, Point3::new(0.0, -1.0, 0.0), epsilon = 1e-12);
        let p = t.model_view().transform_point(&Point3::new(0.0, -1.0, 0.0));
        assert_relative_eq!(p, Point3::new(0.0, 0.0, -1.0), epsilon = 1e-12);
    }

    #[test]
    fn test_turntable_tilt_limit() {
        let mut t = Turntable::new();
        press(&mut t, Modifiers::NONE, 0.0, 0.0);
        t.cursor_moved(CursorPos::new(0.0, 1000.0), SIZE);
        assert_eq!(t.drag(), (0.0, 180.0));
        t.cursor_moved(CursorPos::new(0.0, -1000.0), SIZE);
        assert_eq!(t.drag(), (0.0, -180.0));

        t.scroll(2.0);
        t.key(Key::Digit(1), Action::Press, Modifiers::NONE);
        assert_eq!(t.drag(), (0.0, 0.0));
        assert_eq!(t.model_view(), Matrix4::identity());
    }
}
