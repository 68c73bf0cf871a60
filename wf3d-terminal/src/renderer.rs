/// ASCII rasterizer for terminal rendering
use crossterm::{
    style::{Color, Print, ResetColor, SetForegroundColor},
    QueueableCommand,
};
use nalgebra::Point2;
use std::io::Write;
use wf3d_core::{Canvas, Composite, Rgb};

/// Character luminosity ramp for depth/shading (darkest to lightest)
const LUMINOSITY_RAMP: &[char] = &[' ', '.', ':', '-', '=', '+', '*', '#', '%', '@'];

/// Fill character for unshaded faces
const SOLID: char = '#';

const MARKER: char = 'o';

/// Marker colors, one per vertex, cycling for larger meshes
const VERTEX_COLORS: &[Rgb] = &[
    Rgb::new(0, 255, 0),
    Rgb::new(255, 255, 0),
    Rgb::new(255, 0, 0),
    Rgb::new(150, 150, 255),
    Rgb::new(0, 255, 255),
    Rgb::new(0, 200, 255),
    Rgb::new(255, 200, 255),
    Rgb::new(200, 200, 255),
];

const BACKGROUND: Cell = Cell {
    character: ' ',
    color: Rgb::new(10, 10, 50),
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Cell {
    pub character: char,
    pub color: Rgb,
}

/// ASCII renderer that paints composites into a grid of terminal cells
pub struct AsciiRenderer {
    width: usize,
    height: usize,
    canvas: Canvas,
    cells: Vec<Cell>,
    pub show_faces: bool,
    pub show_vertices: bool,
}

impl AsciiRenderer {
    /// `width` and `height` are in terminal cells; `canvas` is the space the
    /// composites are projected into.
    pub fn new(width: usize, height: usize, canvas: Canvas) -> Self {
        Self {
            width,
            height,
            canvas,
            cells: vec![BACKGROUND; width * height],
            show_faces: true,
            show_vertices: true,
        }
    }

    pub fn canvas(&self) -> Canvas {
        self.canvas
    }

    pub fn clear(&mut self) {
        self.cells.fill(BACKGROUND);
    }

    pub fn cell(&self, x: usize, y: usize) -> Option<Cell> {
        if x < self.width && y < self.height {
            Some(self.cells[y * self.width + x])
        } else {
            None
        }
    }

    /// Paint one composite. Faces are drawn farthest first so nearer faces
    /// cover them, then vertex markers go on top.
    pub fn render_composite(&mut self, composite: &Composite) {
        if self.show_faces {
            for face in composite.back_to_front() {
                let character = match face.shade {
                    Some(shade) => {
                        let index = (shade * (LUMINOSITY_RAMP.len() - 1) as f64) as usize;
                        LUMINOSITY_RAMP[index.min(LUMINOSITY_RAMP.len() - 1)]
                    }
                    None => SOLID,
                };
                let cell = Cell {
                    character,
                    color: face.color,
                };
                let coords = face.screen.iter().map(|p| self.to_cells(p)).collect::<Vec<_>>();
                // Fan triangulation; faces are convex.
                for i in 1..coords.len().saturating_sub(1) {
                    self.rasterize_triangle([coords[0], coords[i], coords[i + 1]], cell);
                }
            }
        }

        if self.show_vertices {
            for marker in &composite.markers {
                let (x, y) = self.to_cells(&marker.screen);
                let (x, y) = (x.floor(), y.floor());
                if x >= 0.0 && y >= 0.0 && (x as usize) < self.width && (y as usize) < self.height {
                    self.cells[y as usize * self.width + x as usize] = Cell {
                        character: MARKER,
                        color: VERTEX_COLORS[marker.index % VERTEX_COLORS.len()],
                    };
                }
            }
        }
    }

    fn to_cells(&self, p: &Point2<f64>) -> (f64, f64) {
        (
            p.x * self.width as f64 / self.canvas.width as f64,
            p.y * self.height as f64 / self.canvas.height as f64,
        )
    }

    fn rasterize_triangle(&mut self, coords: [(f64, f64); 3], cell: Cell) {
        let [v0, v1, v2] = coords;

        // Bounding box
        let min_x = v0.0.min(v1.0).min(v2.0).floor() as i64;
        let max_x = v0.0.max(v1.0).max(v2.0).ceil() as i64;
        let min_y = v0.1.min(v1.1).min(v2.1).floor() as i64;
        let max_y = v0.1.max(v1.1).max(v2.1).ceil() as i64;

        // Clip to screen bounds
        let min_x = min_x.max(0);
        let max_x = max_x.min(self.width as i64 - 1);
        let min_y = min_y.max(0);
        let max_y = max_y.min(self.height as i64 - 1);

        for y in min_y..=max_y {
            for x in min_x..=max_x {
                let px = x as f64 + 0.5;
                let py = y as f64 + 0.5;

                if let Some((w0, w1, w2)) = barycentric(v0, v1, v2, (px, py)) {
                    if w0 >= 0.0 && w1 >= 0.0 && w2 >= 0.0 {
                        self.cells[y as usize * self.width + x as usize] = cell;
                    }
                }
            }
        }
    }

    pub fn draw<W: Write>(&self, writer: &mut W) -> std::io::Result<()> {
        let mut current = None;
        for y in 0..self.height {
            for x in 0..self.width {
                let cell = self.cells[y * self.width + x];
                if current != Some(cell.color) {
                    let Rgb { r, g, b } = cell.color;
                    writer.queue(SetForegroundColor(Color::Rgb { r, g, b }))?;
                    current = Some(cell.color);
                }
                writer.queue(Print(cell.character))?;
            }
            if y + 1 < self.height {
                writer.queue(Print("\r\n"))?;
            }
        }
        writer.queue(ResetColor)?;
        Ok(())
    }
}

/// Calculate barycentric coordinates for a point in a triangle
fn barycentric(
    v0: (f64, f64),
    v1: (f64, f64),
    v2: (f64, f64),
    p: (f64, f64),
) -> Option<(f64, f64, f64)> {
    let denom = (v1.1 - v2.1) * (v0.0 - v2.0) + (v2.0 - v1.0) * (v0.1 - v2.1);

    if denom.abs() < 1e-9 {
        return None;
    }

    let w0 = ((v1.1 - v2.1) * (p.0 - v2.0) + (v2.0 - v1.0) * (p.1 - v2.1)) / denom;
    let w1 = ((v2.1 - v0.1) * (p.0 - v2.0) + (v0.0 - v2.0) * (p.1 - v2.1)) / denom;
    let w2 = 1.0 - w0 - w1;

    Some((w0, w1, w2))
}
