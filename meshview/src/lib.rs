//! Meshview - interactive mesh and slice viewer
//!
//! Opens a window showing the mesh on the left and the selected slice
//! outline on the right.  Drag to rotate, drag with a modifier held to pan,
//! scroll to zoom, `1`-`7` for standard views, left / right to turn, up /
//! down to step through slices.  Dropping a file onto the window loads it.
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::Result;
use log::{error, info, warn};
use meshview_core::{
    Action, Button, CameraMode, CursorPos, Key, Loader, Modifiers, Viewer,
    ViewerConfig, WindowSize,
};
use winit::dpi::PhysicalSize;
use winit::event::{
    ElementState, Event, KeyEvent, MouseButton, MouseScrollDelta, WindowEvent,
};
use winit::event_loop::{ControlFlow, EventLoop};
use winit::keyboard::{KeyCode, ModifiersState, PhysicalKey};
use winit::window::{Window, WindowBuilder};

pub mod renderer;

pub use renderer::Renderer;

/// How often the loader is checked while no input arrives
const POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Startup settings for the viewer window
#[derive(Debug, Clone)]
pub struct Options {
    /// Model to load at startup
    pub path: Option<PathBuf>,
    pub camera: CameraMode,
    /// Overrides the interactor's default sensitivity
    pub sensitivity: Option<f64>,
    pub viewer: ViewerConfig,
    pub width: u32,
    pub height: u32,
    /// Pixel scroll distance that counts as one wheel notch
    pub scroll_pixels: f64,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            path: None,
            camera: CameraMode::default(),
            sensitivity: None,
            viewer: ViewerConfig::default(),
            width: 1280,
            height: 800,
            scroll_pixels: 40.0,
        }
    }
}

fn window_size(size: PhysicalSize<u32>) -> WindowSize {
    WindowSize::new(size.width, size.height)
}

fn map_button(button: MouseButton) -> Option<Button> {
    match button {
        MouseButton::Left => Some(Button::Primary),
        MouseButton::Right => Some(Button::Secondary),
        MouseButton::Middle => Some(Button::Middle),
        _ => None,
    }
}

fn map_modifiers(state: ModifiersState) -> Modifiers {
    Modifiers {
        shift: state.shift_key(),
        control: state.control_key(),
        alt: state.alt_key(),
        logo: state.super_key(),
    }
}

fn map_key(code: KeyCode) -> Key {
    match code {
        KeyCode::Digit0 => Key::Digit(0),
        KeyCode::Digit1 => Key::Digit(1),
        KeyCode::Digit2 => Key::Digit(2),
        KeyCode::Digit3 => Key::Digit(3),
        KeyCode::Digit4 => Key::Digit(4),
        KeyCode::Digit5 => Key::Digit(5),
        KeyCode::Digit6 => Key::Digit(6),
        KeyCode::Digit7 => Key::Digit(7),
        KeyCode::Digit8 => Key::Digit(8),
        KeyCode::Digit9 => Key::Digit(9),
        KeyCode::ArrowLeft => Key::Left,
        KeyCode::ArrowRight => Key::Right,
        KeyCode::ArrowUp => Key::Up,
        KeyCode::ArrowDown => Key::Down,
        _ => Key::Other,
    }
}

fn map_action(event: &KeyEvent) -> Action {
    match (event.state, event.repeat) {
        (ElementState::Released, _) => Action::Release,
        (ElementState::Pressed, true) => Action::Repeat,
        (ElementState::Pressed, false) => Action::Press,
    }
}

/// Scroll distance in wheel notches
fn scroll_lines(delta: MouseScrollDelta, scroll_pixels: f64) -> f64 {
    match delta {
        MouseScrollDelta::LineDelta(_, y) => f64::from(y),
        MouseScrollDelta::PixelDelta(p) => p.y / scroll_pixels,
    }
}

/// Window and event handling around a [`Viewer`]
struct App {
    window: Arc<Window>,
    viewer: Viewer<Renderer>,
    loader: Loader,
    mods: Modifiers,
    scroll_pixels: f64,
}

impl App {
    fn load(&mut self, path: PathBuf) {
        self.window.set_title(&path.display().to_string());
        if let Err(e) = self.loader.request(&path) {
            error!("{e}");
            self.window
                .set_title(&format!("{} ({e})", path.display()));
        }
    }

    /// Installs a finished load, or shows why it failed
    fn poll_loader(&mut self) {
        let Some(result) = self.loader.poll() else {
            return;
        };
        match result.outcome {
            Ok(model) => {
                self.window.set_title(&result.path.display().to_string());
                self.viewer.install(model);
            }
            Err(e) => {
                self.window
                    .set_title(&format!("{} ({e})", result.path.display()));
            }
        }
    }

    /// Handles one window event, returning `false` when the app should exit
    fn window_event(&mut self, event: WindowEvent) -> bool {
        match event {
            WindowEvent::CloseRequested => return false,
            WindowEvent::Resized(size) => self.viewer.resize(window_size(size)),
            WindowEvent::ModifiersChanged(m) => {
                self.mods = map_modifiers(m.state());
            }
            WindowEvent::CursorMoved { position, .. } => {
                self.viewer
                    .cursor_moved(CursorPos::new(position.x, position.y));
            }
            WindowEvent::MouseInput { state, button, .. } => {
                if let Some(button) = map_button(button) {
                    let action = match state {
                        ElementState::Pressed => Action::Press,
                        ElementState::Released => Action::Release,
                    };
                    self.viewer.button(button, action, self.mods);
                }
            }
            WindowEvent::MouseWheel { delta, .. } => {
                self.viewer.scroll(scroll_lines(delta, self.scroll_pixels));
            }
            WindowEvent::KeyboardInput { event, .. } => {
                let PhysicalKey::Code(code) = event.physical_key else {
                    return true;
                };
                if code == KeyCode::Escape
                    && event.state == ElementState::Pressed
                {
                    return false;
                }
                self.viewer.key(map_key(code), map_action(&event), self.mods);
            }
            WindowEvent::DroppedFile(path) => self.load(path),
            WindowEvent::RedrawRequested => match self.viewer.frame() {
                Ok(_) => (),
                Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => {
                    let size = window_size(self.window.inner_size());
                    self.viewer.resize(size);
                }
                Err(wgpu::SurfaceError::OutOfMemory) => {
                    error!("GPU is out of memory");
                    return false;
                }
                Err(wgpu::SurfaceError::Timeout) => warn!("surface timeout"),
            },
            _ => (),
        }
        true
    }
}

/// Opens the viewer window and runs until it is closed
///
/// Must be called from the main thread, which then owns the window and the
/// GPU context for the rest of the run.
pub fn run(options: Options) -> Result<()> {
    let event_loop = EventLoop::new()?;
    let title = options
        .path
        .as_ref()
        .map(|p| p.display().to_string())
        .unwrap_or_else(|| "meshview".to_owned());
    let window = Arc::new(
        WindowBuilder::new()
            .with_title(title)
            .with_inner_size(PhysicalSize::new(options.width, options.height))
            .build(&event_loop)?,
    );

    let renderer = pollster::block_on(Renderer::new(window.clone()))?;
    let size = renderer.surface_size();
    let interactor = options.camera.build(options.sensitivity);
    let viewer = Viewer::new(renderer, interactor, size, options.viewer);
    info!("window ready at {}x{}", size.width, size.height);

    let mut app = App {
        window,
        viewer,
        loader: Loader::new(options.viewer.divisions),
        mods: Modifiers::NONE,
        scroll_pixels: options.scroll_pixels,
    };
    if let Some(path) = options.path {
        app.load(path);
    }

    event_loop.run(move |event, elwt| match event {
        Event::WindowEvent { event, window_id } if window_id == app.window.id() => {
            if !app.window_event(event) {
                elwt.exit();
            }
        }
        Event::AboutToWait => {
            app.poll_loader();
            if app.viewer.needs_redraw() {
                app.window.request_redraw();
            }
            elwt.set_control_flow(ControlFlow::WaitUntil(
                Instant::now() + POLL_INTERVAL,
            ));
        }
        _ => (),
    })?;
    Ok(())
}
