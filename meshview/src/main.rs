//! Meshview - interactive mesh and slice viewer
//!
//! Controls:
//!   - Drag: rotate (hold any modifier to pan)
//!   - Scroll: zoom
//!   - 1-7: standard views
//!   - Left / Right: turn the model
//!   - Up / Down: step through slices
//!   - Drop a file on the window: load it
//!   - Esc: quit
use std::path::PathBuf;

use anyhow::{bail, Result};
use clap::{Parser, ValueEnum};
use env_logger::Env;
use meshview::Options;
use meshview_core::{CameraMode, ViewerConfig};

#[derive(ValueEnum, Clone, Copy, Debug)]
enum Camera {
    Arcball,
    Turntable,
}

impl From<Camera> for CameraMode {
    fn from(c: Camera) -> Self {
        match c {
            Camera::Arcball => CameraMode::Arcball,
            Camera::Turntable => CameraMode::Turntable,
        }
    }
}

#[derive(Parser, Debug)]
#[clap(version, about)]
struct Args {
    /// Mesh file to open (STL or OBJ)
    path: Option<PathBuf>,

    /// Camera interaction mode
    #[clap(short, long, value_enum, default_value_t = Camera::Arcball)]
    camera: Camera,

    /// Drag sensitivity (defaults to 20 for arcball, 0.5 for turntable)
    #[clap(short, long)]
    sensitivity: Option<f64>,

    /// Number of slices across the model height
    #[clap(short, long, default_value_t = 250)]
    divisions: u32,

    /// Initial window width
    #[clap(long, default_value_t = 1280)]
    width: u32,

    /// Initial window height
    #[clap(long, default_value_t = 800)]
    height: u32,

    /// Trackpad scroll distance, in pixels, that counts as one wheel notch
    #[clap(long, default_value_t = 40.0)]
    scroll_pixels: f64,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(Env::default().default_filter_or("info"))
        .init();
    let args = Args::parse();

    if args.divisions == 0 {
        bail!("--divisions must be at least 1");
    }
    if !(args.scroll_pixels.is_finite() && args.scroll_pixels > 0.0) {
        bail!("--scroll-pixels must be a positive number");
    }

    meshview::run(Options {
        path: args.path,
        camera: args.camera.into(),
        sensitivity: args.sensitivity,
        viewer: ViewerConfig {
            divisions: args.divisions,
            ..ViewerConfig::default()
        },
        width: args.width,
        height: args.height,
        scroll_pixels: args.scroll_pixels,
    })
}
