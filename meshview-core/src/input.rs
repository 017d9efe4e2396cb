//! Window-independent input vocabulary
//!
//! The front end translates its native events into these types, so the
//! interactors and the render loop driver can be exercised without a window.

/// Cursor position in pixels, with the origin at the top-left corner
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct CursorPos {
    pub x: f64,
    pub y: f64,
}

impl CursorPos {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// Window (or framebuffer) size in pixels
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WindowSize {
    pub width: u32,
    pub height: u32,
}

impl WindowSize {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// Width over height, or 1 for a collapsed (e.g. minimized) window
    pub fn aspect(&self) -> f64 {
        if self.width == 0 || self.height == 0 {
            1.0
        } else {
            self.width as f64 / self.height as f64
        }
    }

    /// Maps a cursor position into `[-1, 1]` on both axes
    ///
    /// `-1` is the left / top edge.  A collapsed window maps everything to
    /// the center instead of dividing by zero.
    pub fn normalize(&self, pos: CursorPos) -> (f64, f64) {
        if self.width == 0 || self.height == 0 {
            return (0.0, 0.0);
        }
        (
            pos.x / self.width as f64 * 2.0 - 1.0,
            pos.y / self.height as f64 * 2.0 - 1.0,
        )
    }
}

impl Default for WindowSize {
    fn default() -> Self {
        Self::new(1, 1)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Button {
    Primary,
    Secondary,
    Middle,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Press,
    Repeat,
    Release,
}

impl Action {
    /// Press and key-repeat both count as activating a key
    pub fn is_active(self) -> bool {
        matches!(self, Self::Press | Self::Repeat)
    }
}

/// Set of held modifier keys
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Modifiers {
    pub shift: bool,
    pub control: bool,
    pub alt: bool,
    pub logo: bool,
}

impl Modifiers {
    pub const NONE: Self = Self {
        shift: false,
        control: false,
        alt: false,
        logo: false,
    };

    pub const SHIFT: Self = Self {
        shift: true,
        ..Self::NONE
    };

    pub fn is_empty(&self) -> bool {
        *self == Self::NONE
    }
}

/// Keys the viewer responds to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Key {
    /// Number row key `0` through `9`
    Digit(u8),
    Left,
    Right,
    Up,
    Down,
    Other,
}
