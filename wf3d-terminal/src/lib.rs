/// Terminal presentation surface for the wireframe recorder
use crossterm::{
    cursor,
    event::{self, Event, KeyCode, KeyEvent, KeyModifiers},
    execute, queue,
    style::{Color, Print, ResetColor, SetForegroundColor},
    terminal,
};
use std::io::{self, stdout, Write};
use std::time::{Duration, Instant};
use wf3d_core::{Canvas, Presenter, RecordError, SceneComposite};

pub mod renderer;

pub use renderer::AsciiRenderer;

/// Presents recorder frames on the terminal's alternate screen.
///
/// Press Q, Esc or Ctrl-C to stop the run after the current frame.
pub struct TerminalApp {
    renderer: AsciiRenderer,
    total_frames: usize,
    active: bool,
    last_frame: Instant,
    frame_count: u32,
    fps: f32,
}

impl TerminalApp {
    pub fn new(canvas: Canvas, total_frames: usize) -> io::Result<Self> {
        let (width, height) = terminal::size()?;

        // The top row holds the status line.
        Ok(Self {
            renderer: AsciiRenderer::new(width as usize, height.saturating_sub(1) as usize, canvas),
            total_frames,
            active: false,
            last_frame: Instant::now(),
            frame_count: 0,
            fps: 0.0,
        })
    }

    pub fn renderer_mut(&mut self) -> &mut AsciiRenderer {
        &mut self.renderer
    }

    /// Run `body` with the terminal in raw mode on the alternate screen, and
    /// restore it afterwards.
    pub fn run<T>(&mut self, body: impl FnOnce(&mut Self) -> T) -> io::Result<T> {
        terminal::enable_raw_mode()?;
        execute!(stdout(), terminal::EnterAlternateScreen, cursor::Hide)?;
        self.active = true;

        let result = body(self);

        // Cleanup
        self.active = false;
        terminal::disable_raw_mode()?;
        execute!(stdout(), terminal::LeaveAlternateScreen, cursor::Show)?;

        Ok(result)
    }

    fn render(&mut self, frame: usize, composites: &[SceneComposite<'_>]) -> io::Result<()> {
        self.renderer.clear();
        for scene_composite in composites {
            self.renderer.render_composite(&scene_composite.composite);
        }

        let mut stdout = stdout();
        queue!(stdout, cursor::MoveTo(0, 1))?;
        self.renderer.draw(&mut stdout)?;

        // Status line
        queue!(
            stdout,
            cursor::MoveTo(0, 0),
            terminal::Clear(terminal::ClearType::CurrentLine),
            SetForegroundColor(Color::Yellow),
            Print(format!(
                "WF3D | frame {}/{} | FPS: {:.1} | Q=Quit",
                frame + 1,
                self.total_frames,
                self.fps
            )),
            ResetColor
        )?;

        stdout.flush()
    }

    fn update_fps(&mut self) {
        self.frame_count += 1;
        let now = Instant::now();
        if (now - self.last_frame).as_secs() >= 1 {
            self.fps = self.frame_count as f32 / (now - self.last_frame).as_secs_f32();
            self.frame_count = 0;
            self.last_frame = now;
        }
    }
}

impl Presenter for TerminalApp {
    fn present(&mut self, frame: usize, composites: &[SceneComposite<'_>]) -> Result<(), RecordError> {
        self.render(frame, composites)?;
        self.update_fps();
        Ok(())
    }

    fn stop_requested(&mut self) -> bool {
        if !self.active {
            return false;
        }
        while let Ok(true) = event::poll(Duration::from_millis(0)) {
            match event::read() {
                Ok(Event::Key(key)) if is_quit(&key) => return true,
                Ok(Event::Resize(width, height)) => {
                    let canvas = self.renderer.canvas();
                    let keep = (self.renderer.show_faces, self.renderer.show_vertices);
                    self.renderer =
                        AsciiRenderer::new(width as usize, height.saturating_sub(1) as usize, canvas);
                    (self.renderer.show_faces, self.renderer.show_vertices) = keep;
                }
                Ok(_) => {}
                Err(e) => {
                    log::warn!("failed to read terminal event: {e}");
                    return false;
                }
            }
        }
        false
    }
}

fn is_quit(key: &KeyEvent) -> bool {
    match key.code {
        KeyCode::Char('q') | KeyCode::Esc => true,
        KeyCode::Char('c') => key.modifiers.contains(KeyModifiers::CONTROL),
        _ => false,
    }
}
