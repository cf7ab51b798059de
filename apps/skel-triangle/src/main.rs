//! Skel triangle demo.
//!
//! Draws one triangle whose positions and colours live in the vertex
//! shader. There is no vertex buffer and no descriptor set.
//!
//! ## Usage
//!
//! ```bash
//! cargo run -p skel-triangle -- [--vsync]
//! ```
//!
//! Press Escape to quit. `RUST_LOG` sets the log level.

mod app;

use skel_app::{run_app, AppConfig};

use crate::app::Triangle;

const WIDTH: u32 = 1600;
const HEIGHT: u32 = 900;

fn main() -> anyhow::Result<()> {
    if std::env::args().any(|arg| arg == "-h" || arg == "--help") {
        print_help();
        return Ok(());
    }

    let vsync = std::env::args().any(|arg| arg == "--vsync");

    run_app::<Triangle>(
        AppConfig::new("Skel - Triangle")
            .with_size(WIDTH, HEIGHT)
            .with_vsync(vsync)
            .with_clear_color(0.0, 0.5, 0.8),
    )
}

fn print_help() {
    eprintln!(
        "Skel triangle demo

USAGE:
    cargo run -p skel-triangle -- [OPTIONS]

OPTIONS:
    --vsync                 Present with FIFO instead of the lowest-latency mode
    -h, --help              Print this help message

ENVIRONMENT VARIABLES:
    RUST_LOG                Set log level (e.g., info, debug, trace)"
    );
}
