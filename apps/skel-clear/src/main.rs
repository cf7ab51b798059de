//! Skel clear-screen demo.
//!
//! Opens a window and clears it every frame. No pipeline is bound; the
//! render pass's load op does all the work, so this exercises only the
//! swapchain and frame synchronization.
//!
//! ## Usage
//!
//! ```bash
//! cargo run -p skel-clear -- [--vsync]
//! ```
//!
//! Press Escape to quit. `RUST_LOG` sets the log level.

use skel_app::{run_app, AppConfig, AppContext, FrameContext, SkelApp};
use tracing::info;

const WIDTH: u32 = 1600;
const HEIGHT: u32 = 900;

struct Clear;

impl SkelApp for Clear {
    fn init(ctx: &mut AppContext) -> anyhow::Result<Self> {
        info!(
            "Clearing to {:?} at {}x{}",
            ctx.clear_color,
            ctx.width(),
            ctx.height()
        );
        Ok(Self)
    }

    fn update(&mut self, _ctx: &mut AppContext, _dt: f32) {}

    fn render(&mut self, _ctx: &AppContext, _frame: &mut FrameContext) -> anyhow::Result<()> {
        Ok(())
    }
}

fn main() -> anyhow::Result<()> {
    if std::env::args().any(|arg| arg == "-h" || arg == "--help") {
        print_help();
        return Ok(());
    }

    let vsync = std::env::args().any(|arg| arg == "--vsync");

    run_app::<Clear>(
        AppConfig::new("Skel - Clear")
            .with_size(WIDTH, HEIGHT)
            .with_vsync(vsync)
            .with_clear_color(0.0, 0.8, 0.5),
    )
}

fn print_help() {
    eprintln!(
        "Skel clear-screen demo

USAGE:
    cargo run -p skel-clear -- [OPTIONS]

OPTIONS:
    --vsync                 Present with FIFO instead of the lowest-latency mode
    -h, --help              Print this help message

ENVIRONMENT VARIABLES:
    RUST_LOG                Set log level (e.g., info, debug, trace)"
    );
}
