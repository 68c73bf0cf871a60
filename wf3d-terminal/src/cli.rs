use std::fs::File;
use std::path::PathBuf;

use eyre::{Result, WrapErr};
use wf3d_core::{
    recorder, Camera, Canvas, Compositor, DrawOrder, Mesh, NpyFileSink, NullPresenter,
    Presenter, ProjectionMode, RecordSink, Recorder, RecorderConfig, RotationSequence, Scene,
};
use wf3d_terminal::TerminalApp;

/// Wireframe dataset generator
///
/// Rotates a cube through every orientation on a fixed angular grid, shows
/// each frame in the terminal and records the vertex positions.
#[derive(Debug, clap::Parser)]
#[command(version)]
pub(crate) struct Args {
    #[command(flatten)]
    pub config: Config,

    #[command(subcommand)]
    pub subcommand: Subcommand,
}

/// Settings shared by every subcommand.
#[derive(Debug, clap::Args)]
pub(crate) struct Config {
    /// Canvas width.
    #[arg(long, env = "WF3D_WIDTH", default_value_t = 256, value_parser = clap::value_parser!(u32).range(1..))]
    pub width: u32,
    /// Canvas height.
    #[arg(long, env = "WF3D_HEIGHT", default_value_t = 256, value_parser = clap::value_parser!(u32).range(1..))]
    pub height: u32,
    /// Rotation step in radians.
    #[arg(short, long, env = "WF3D_STEP_SIZE", default_value_t = 0.3)]
    pub step_size: f64,
    /// Stop after this many frames.
    #[arg(short, long, env = "WF3D_LIMIT")]
    pub limit: Option<usize>,
    /// Frame rate cap. Unlimited by default.
    #[arg(short, long, env = "WF3D_FPS")]
    pub fps: Option<u32>,
    /// Cube edge length.
    #[arg(long, default_value_t = 100.0)]
    pub size: f64,
    /// Don't open the terminal view.
    #[arg(long)]
    pub headless: bool,
    /// Use a perspective projection with the viewer this far in front of
    /// the canvas.
    #[arg(long, value_name = "DISTANCE")]
    pub perspective: Option<f64>,
    /// Fill faces with flat color instead of shading them.
    #[arg(long)]
    pub no_shading: bool,
    /// Don't draw vertex markers.
    #[arg(long)]
    pub hide_vertices: bool,
    /// Write log output to this file. Without it, logging is off while the
    /// terminal view is open.
    #[arg(long, env = "WF3D_LOG_FILE", value_name = "PATH")]
    pub log_file: Option<PathBuf>,
}

#[derive(clap::Subcommand, Debug)]
pub(crate) enum Subcommand {
    /// Record every rotation and save the record as an NPY file.
    Generate {
        /// Directory to write the record to.
        #[arg(short, long, env = "WF3D_OUT_DIR", default_value = "data")]
        out_dir: PathBuf,
        /// Name of the cube; used for the file name.
        #[arg(short, long, default_value = "cube1")]
        name: String,
    },
    /// Show a previously recorded NPY file.
    Replay {
        /// Record to show.
        file: PathBuf,
    },
    /// Print the cube's vertices, edges and faces.
    Inspect,
}

/// Where log output goes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum LogDestination {
    Stderr,
    File(PathBuf),
    Off,
}

impl Args {
    /// The terminal view shares stderr's tty, so it never gets log lines.
    pub(crate) fn log_destination(&self) -> LogDestination {
        let terminal_view =
            !self.config.headless && !matches!(self.subcommand, Subcommand::Inspect);
        match (&self.config.log_file, terminal_view) {
            (Some(path), _) => LogDestination::File(path.clone()),
            (None, false) => LogDestination::Stderr,
            (None, true) => LogDestination::Off,
        }
    }

    /// Set up `env_logger` (filtered by `RUST_LOG`) for this run.
    pub(crate) fn init_logging(&self) -> Result<()> {
        let mut builder = env_logger::builder();
        builder.format_timestamp_millis();
        match self.log_destination() {
            LogDestination::Off => return Ok(()),
            LogDestination::Stderr => {}
            LogDestination::File(path) => {
                let file = File::create(&path)
                    .wrap_err_with(|| format!("error creating log file {}", path.display()))?;
                builder.target(env_logger::Target::Pipe(Box::new(file)));
            }
        }
        builder.try_init().wrap_err("error initializing logger")
    }
}

impl Config {
    fn canvas(&self) -> Canvas {
        Canvas::new(self.width, self.height)
    }

    fn compositor(&self) -> Compositor {
        let mode = match self.perspective {
            Some(viewer_distance) => ProjectionMode::Perspective { viewer_distance },
            None => ProjectionMode::Orthographic,
        };
        Compositor::new(Camera::new(self.canvas()).with_mode(mode))
            .with_order(DrawOrder::DepthSorted)
            .with_shading(!self.no_shading)
    }

    fn recorder(&self) -> Recorder {
        Recorder::new(RecorderConfig {
            canvas: self.canvas(),
            limit: self.limit,
            fps: self.fps,
        })
    }

    fn scene(&self, name: &str) -> Scene {
        let mut scene = Scene::new();
        scene.add(name, Mesh::cube(self.size));
        scene
    }

    /// Run `body` against the terminal view, or headless.
    fn with_presenter<T>(
        &self,
        total_frames: usize,
        body: impl FnOnce(&mut dyn Presenter) -> T,
    ) -> Result<T> {
        if self.headless {
            return Ok(body(&mut NullPresenter));
        }
        let mut app = TerminalApp::new(self.canvas(), total_frames)
            .wrap_err("error opening terminal")?;
        app.renderer_mut().show_vertices = !self.hide_vertices;
        app.run(|app| body(app)).wrap_err("error restoring terminal")
    }
}

pub(crate) fn exec(args: Args) -> Result<()> {
    let config = args.config;
    match args.subcommand {
        Subcommand::Generate { out_dir, name } => {
            let sequence = RotationSequence::new(config.step_size)?;
            let mut scene = config.scene(&name);
            let recorder = config.recorder();
            let compositor = config.compositor();
            let total = sequence.limited(config.limit).len();

            let record = config
                .with_presenter(total, |presenter| {
                    recorder.record(&mut scene, &sequence, &compositor, presenter)
                })?
                .wrap_err("error recording frames")?;

            let path = NpyFileSink::new(out_dir)
                .persist(&name, &record)
                .wrap_err("error saving record")?;
            println!("Saved {} frames to {}", record.frames(), path.display());
            Ok(())
        }

        Subcommand::Replay { file } => {
            let record = recorder::load_record(&file)
                .wrap_err_with(|| format!("error loading {}", file.display()))?;
            let mut scene = config.scene("replay");
            let recorder = config.recorder();
            let compositor = config.compositor();

            let frames = config
                .with_presenter(record.frames(), |presenter| {
                    recorder.replay(&mut scene, &record, &compositor, presenter)
                })?
                .wrap_err("error replaying frames")?;
            println!("Replayed {frames} of {} frames", record.frames());
            Ok(())
        }

        Subcommand::Inspect => {
            print!("{}", Mesh::cube(config.size));
            Ok(())
        }
    }
}
