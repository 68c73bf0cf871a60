/// WF3D - Wireframe Dataset Generator
///
/// Rotates a cube through a grid of orientations, draws each frame in the
/// terminal and saves the vertex positions as an NPY array.
/// Controls:
///   - Q/ESC/Ctrl-C: Stop after the current frame

use clap::Parser;

mod cli;

fn main() -> eyre::Result<()> {
    let args = cli::Args::parse();
    args.init_logging()?;
    cli::exec(args)
}
