//! Skel mesh viewer.
//!
//! Uploads a triangle, cube or OBJ model through a staging buffer and
//! draws it spinning in front of a fly camera, with a depth buffer and a
//! per-frame camera uniform buffer.
//!
//! ## Usage
//!
//! ```bash
//! cargo run -p skel-mesh -- [OPTIONS]
//! ```
//!
//! ## Controls
//!
//! - `WASD`: move
//! - `Space` / `Shift`: up / down
//! - `Tab`: toggle cursor lock (mouse look while locked)
//! - `Escape`: quit

mod app;
mod params;

use skel_app::{run_app, AppConfig};

use crate::app::MeshViewer;
use crate::params::MeshParams;

const WIDTH: u32 = 1600;
const HEIGHT: u32 = 900;

fn main() -> anyhow::Result<()> {
    // Check for help flag before starting the app
    if std::env::args().any(|arg| arg == "-h" || arg == "--help") {
        print_help();
        return Ok(());
    }

    let params = MeshParams::from_args();

    run_app::<MeshViewer>(
        AppConfig::new("Skel - Mesh")
            .with_size(WIDTH, HEIGHT)
            .with_vsync(params.vsync)
            .with_clear_color(0.0, 0.2, 1.0)
            .with_depth(true),
    )
}

fn print_help() {
    eprintln!(
        "Skel mesh viewer

USAGE:
    cargo run -p skel-mesh -- [OPTIONS]

OPTIONS:
    --model <PATH>          OBJ file to load (default: {})
    --shape <SHAPE>         triangle, cube or obj (default: obj, or cube
                            when the default model is absent)
                            A missing or unreadable OBJ falls back to the cube.
    --vsync                 Present with FIFO instead of the lowest-latency mode
    -h, --help              Print this help message

CONTROLS:
    WASD                    Move
    Space / Shift           Move up / down
    Tab                     Toggle cursor lock for mouse look
    Escape                  Quit

ENVIRONMENT VARIABLES:
    RUST_LOG                Set log level (e.g., info, debug, trace)",
        params::DEFAULT_MODEL
    );
}
