/// Presentation layer: double-buffered, diff-based terminal renderer.
///
/// How it works:
///   1. Build the next frame into `front` buffer (array of Cell)
///   2. Compare each cell with `back` buffer (previous frame)
///   3. Only emit terminal commands for cells that changed
///   4. All commands are batched with `queue!`, flushed once at the end
///   5. Swap front/back
///
/// The world is y-up; the camera flips it so world row 0 is the lowest
/// visible terminal row. Each world pixel is two terminal columns wide.

use std::io::{self, BufWriter, Write};

use crossterm::{
    cursor::{self, MoveTo},
    execute, queue,
    style::{Color, Print, ResetColor, SetBackgroundColor, SetForegroundColor},
    terminal::{self, Clear, ClearType},
};

use crate::domain::sprite::{SpriteAtlas, SpriteSubject, Surface};
use crate::sim::level::{Level, Phase};

// ── Cell: the unit of the back-buffer ──

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
struct Cell {
    ch: char,
    fg: Color,
    bg: Color,
}

impl Cell {
    /// Explicit dark background for all "empty" terminal cells, so the gap
    /// between rows matches the cell color on VTE terminals.
    const BASE_BG: Color = Color::Rgb { r: 22, g: 22, b: 35 };

    const BLANK: Cell = Cell { ch: ' ', fg: Color::White, bg: Cell::BASE_BG };

    /// Sentinel cell used to invalidate the back buffer.
    /// Different from any real cell, so every position will be diff'd.
    const INVALID: Cell = Cell { ch: '?', fg: Color::Magenta, bg: Color::Magenta };

    fn new(ch: char, fg: Color, bg: Color) -> Self {
        let bg = match bg {
            Color::Reset => Self::BASE_BG,
            other => other,
        };
        Cell { ch, fg, bg }
    }
}

// ── FrameBuffer: a 2D grid of Cells ──

struct FrameBuffer {
    width: usize,
    height: usize,
    cells: Vec<Cell>,
}

impl FrameBuffer {
    fn new(w: usize, h: usize) -> Self {
        FrameBuffer { width: w, height: h, cells: vec![Cell::BLANK; w * h] }
    }

    fn resize(&mut self, w: usize, h: usize) {
        if self.width != w || self.height != h {
            self.width = w;
            self.height = h;
            self.cells = vec![Cell::BLANK; w * h];
        }
    }

    fn clear(&mut self) {
        self.cells.fill(Cell::BLANK);
    }

    fn set(&mut self, x: usize, y: usize, cell: Cell) {
        if x < self.width && y < self.height {
            self.cells[y * self.width + x] = cell;
        }
    }

    fn get(&self, x: usize, y: usize) -> Cell {
        if x < self.width && y < self.height {
            self.cells[y * self.width + x]
        } else {
            Cell::BLANK
        }
    }

    /// Write a string at (x, y) with given colors. Each char occupies 1 column.
    fn put_str(&mut self, x: usize, y: usize, s: &str, fg: Color, bg: Color) {
        for (cx, ch) in (x..self.width).zip(s.chars()) {
            self.set(cx, y, Cell::new(ch, fg, bg));
        }
    }

    fn fill_row(&mut self, y: usize, bg: Color) {
        for x in 0..self.width {
            self.set(x, y, Cell::new(' ', Color::White, bg));
        }
    }
}

// ── Camera ──

/// Terminal columns per world pixel.
const CELL_W: usize = 2;

const HUD_ROW: usize = 0;
const MAP_ROW: usize = 2;

const HUD_BG: Color = Color::Rgb { r: 20, g: 20, b: 60 };

/// Visible window onto the y-up world, in whole world units.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Camera {
    /// World X of the leftmost visible column
    pub x: i32,
    /// World Y of the lowest visible row
    pub y: i32,
    pub view_w: usize,
    pub view_h: usize,
}

impl Camera {
    /// Keep the target inside the middle of the view, clamped to the
    /// world bounds `[min, max)`. A world smaller than the view is centered.
    pub fn follow(&mut self, target: (i32, i32), min: (i32, i32), max: (i32, i32)) {
        if self.view_w == 0 || self.view_h == 0 {
            return;
        }
        self.x = follow_axis(self.x, self.view_w as i32, target.0, min.0, max.0);
        self.y = follow_axis(self.y, self.view_h as i32, target.1, min.1, max.1);
    }

    /// World cell to (column, row) inside the view. Row 0 is the top.
    pub fn project(&self, wx: i32, wy: i32) -> Option<(usize, usize)> {
        let vx = wx - self.x;
        let vy = wy - self.y;
        if vx < 0 || vy < 0 || vx >= self.view_w as i32 || vy >= self.view_h as i32 {
            return None;
        }
        Some((vx as usize, self.view_h - 1 - vy as usize))
    }
}

/// Dead zone: 20% margin on each side. Only scroll when the target leaves it.
fn follow_axis(pos: i32, view: i32, target: i32, min: i32, max: i32) -> i32 {
    let world = max - min;
    if world <= view {
        return min - (view - world) / 2;
    }
    let margin = view / 5;
    let mut pos = pos;
    if target < pos + margin {
        pos = target - margin;
    } else if target > pos + view - margin - 1 {
        pos = target - view + margin + 1;
    }
    pos.clamp(min, max - view)
}

/// Bounding box of everything placed in the level, in world cells.
fn level_bounds(level: &Level, atlas: &SpriteAtlas) -> ((i32, i32), (i32, i32)) {
    let subjects = level.props().iter().map(|p| p.subject()).chain(level.actor().map(|a| a.subject()));
    let mut min = (i32::MAX, i32::MAX);
    let mut max = (i32::MIN, i32::MIN);
    for s in subjects {
        let (w, h) = atlas
            .sprite(s.sheet, s.sprite)
            .map(|sp| (sp.width() as i32, sp.height() as i32))
            .unwrap_or((1, 1));
        let (x, y) = (s.position.x.round() as i32, s.position.y.round() as i32);
        min = (min.0.min(x), min.1.min(y));
        max = (max.0.max(x + w), max.1.max(y + h));
    }
    if min.0 > max.0 {
        return ((0, 0), (1, 1));
    }
    (min, max)
}

/// Sheet name to display color.
fn sheet_color(sheet: &str) -> Color {
    match sheet {
        "hero" => Color::Rgb { r: 255, g: 220, b: 90 },
        "girder" => Color::Rgb { r: 220, g: 60, b: 80 },
        "ladder" => Color::Rgb { r: 80, g: 200, b: 220 },
        "barrel" => Color::Rgb { r: 190, g: 120, b: 50 },
        "fire" => Color::Rgb { r: 255, g: 130, b: 20 },
        "conveyor" => Color::Rgb { r: 150, g: 150, b: 170 },
        "lift" => Color::Rgb { r: 120, g: 220, b: 120 },
        _ => Color::White,
    }
}

// ── Canvas: the Surface handed to the level ──

struct Canvas<'a> {
    buf: &'a mut FrameBuffer,
    atlas: &'a SpriteAtlas,
    camera: Camera,
}

impl Surface for Canvas<'_> {
    fn draw_sprite(&mut self, subject: &SpriteSubject) {
        let Some(sprite) = self.atlas.sprite(subject.sheet, subject.sprite) else { return };
        let fg = sheet_color(subject.sheet);
        let (ox, oy) = (subject.position.x.round() as i32, subject.position.y.round() as i32);
        for py in 0..sprite.height() as i32 {
            for px in 0..sprite.width() as i32 {
                let Some(glyph) = sprite.pixel(px, py, subject.mirrored) else { continue };
                let Some((col, row)) = self.camera.project(ox + px, oy + py) else { continue };
                for dx in 0..CELL_W {
                    self.buf.set(col * CELL_W + dx, MAP_ROW + row, Cell::new(glyph, fg, Color::Reset));
                }
            }
        }
    }
}

// ── Renderer ──

pub struct Renderer {
    writer: BufWriter<io::Stdout>,
    front: FrameBuffer,
    back: FrameBuffer,
    term_w: usize,
    term_h: usize,
    camera: Camera,
    last_phase: Option<Phase>,
}

impl Default for Renderer {
    fn default() -> Self {
        Renderer::new()
    }
}

impl Renderer {
    pub fn new() -> Self {
        Renderer {
            writer: BufWriter::with_capacity(16384, io::stdout()),
            front: FrameBuffer::new(0, 0),
            back: FrameBuffer::new(0, 0),
            term_w: 0,
            term_h: 0,
            camera: Camera::default(),
            last_phase: None,
        }
    }

    pub fn init(&mut self) -> io::Result<()> {
        terminal::enable_raw_mode()?;
        execute!(
            self.writer,
            terminal::EnterAlternateScreen,
            cursor::Hide,
            SetBackgroundColor(Cell::BASE_BG),
            Clear(ClearType::All)
        )?;

        let (tw, th) = terminal::size().unwrap_or((80, 24));
        self.term_w = tw as usize;
        self.term_h = th as usize;
        self.front.resize(self.term_w, self.term_h);
        self.back.resize(self.term_w, self.term_h);
        // Force full repaint on first frame: back ≠ front for every cell.
        self.back.cells.fill(Cell::INVALID);

        Ok(())
    }

    pub fn cleanup(&mut self) -> io::Result<()> {
        execute!(self.writer, ResetColor, cursor::Show, terminal::LeaveAlternateScreen)?;
        terminal::disable_raw_mode()
    }

    pub fn render(&mut self, level: &Level, atlas: &SpriteAtlas) -> io::Result<()> {
        // Detect terminal resize
        let (tw, th) = terminal::size().unwrap_or((80, 24));
        if tw as usize != self.term_w || th as usize != self.term_h {
            self.term_w = tw as usize;
            self.term_h = th as usize;
            self.front.resize(self.term_w, self.term_h);
            self.back.resize(self.term_w, self.term_h);
            // Force full repaint after resize.
            self.back.cells.fill(Cell::INVALID);
            queue!(self.writer, SetBackgroundColor(Cell::BASE_BG), Clear(ClearType::All))?;
        }

        // Detect phase change → clear for clean transition
        if self.last_phase != Some(level.phase()) {
            self.back.cells.fill(Cell::INVALID);
            queue!(self.writer, SetBackgroundColor(Cell::BASE_BG), Clear(ClearType::All))?;
            self.last_phase = Some(level.phase());
        }

        self.front.clear();
        match level.phase() {
            Phase::Playing => self.compose_level(level, atlas),
            Phase::Unloaded => self.compose_unloaded(),
        }

        self.flush_diff()?;

        // Swap: current front becomes next back
        std::mem::swap(&mut self.front, &mut self.back);

        Ok(())
    }

    // ── Diff flush: only write changed cells ──

    fn flush_diff(&mut self) -> io::Result<()> {
        let mut last_fg = Color::White;
        let mut last_bg = Cell::BASE_BG;
        let mut need_move = true;
        let mut last_x: usize = 0;
        let mut last_y: usize = 0;

        // Explicit base colors, never ResetColor: the terminal's own default
        // may differ from BASE_BG.
        queue!(self.writer, SetForegroundColor(Color::White), SetBackgroundColor(Cell::BASE_BG))?;

        for y in 0..self.front.height {
            for x in 0..self.front.width {
                let cell = self.front.get(x, y);
                if cell == self.back.get(x, y) {
                    need_move = true;
                    continue;
                }

                if need_move || x != last_x + 1 || y != last_y {
                    queue!(self.writer, MoveTo(x as u16, y as u16))?;
                    need_move = false;
                }

                if cell.fg != last_fg {
                    queue!(self.writer, SetForegroundColor(cell.fg))?;
                    last_fg = cell.fg;
                }
                if cell.bg != last_bg {
                    queue!(self.writer, SetBackgroundColor(cell.bg))?;
                    last_bg = cell.bg;
                }

                queue!(self.writer, Print(cell.ch))?;
                last_x = x;
                last_y = y;
            }
        }

        self.writer.flush()
    }

    // ── Compose: build front buffer content ──

    fn compose_level(&mut self, level: &Level, atlas: &SpriteAtlas) {
        // ── HUD row ──
        let hud = match level.actor() {
            Some(actor) => format!(
                " {}  │  {:<12} │  Health:{:<4} │  Deaths:{} ",
                level.name(),
                actor.state().name(),
                actor.health(),
                level.deaths(),
            ),
            None => format!(" {} ", level.name()),
        };
        self.front.fill_row(HUD_ROW, HUD_BG);
        self.front.put_str(0, HUD_ROW, &hud, Color::White, HUD_BG);

        // ── Map (camera viewport) ──
        let reserved_rows = MAP_ROW + 2; // HUD + gap + help
        self.camera.view_w = self.term_w / CELL_W;
        self.camera.view_h = self.term_h.saturating_sub(reserved_rows).max(1);
        let (min, max) = level_bounds(level, atlas);
        if let Some(actor) = level.actor() {
            let p = actor.position();
            self.camera.follow((p.x.round() as i32, p.y.round() as i32), min, max);
        }

        let mut canvas = Canvas { buf: &mut self.front, atlas, camera: self.camera };
        level.draw(&mut canvas);

        // ── Help bar ──
        let help_row = MAP_ROW + self.camera.view_h + 1;
        if help_row < self.front.height {
            let help = " Arrows:Run/Climb  Space:Jump  R:Restart  Q/Esc:Quit  │  Pad: A/B Jump  Start Restart";
            self.front.put_str(0, help_row, help, Color::DarkGrey, Color::Reset);
        }
    }

    fn compose_unloaded(&mut self) {
        let msg = "No level loaded";
        let row = self.front.height / 2;
        let col = self.front.width.saturating_sub(msg.len()) / 2;
        self.front.put_str(col, row, msg, Color::Grey, Color::Reset);
    }
}
