/// Presentation layer: double-buffered, diff-based terminal renderer.
///
/// How it works:
///   1. Build the next frame into `front` buffer (array of Cell)
///   2. Compare each cell with `back` buffer (previous frame)
///   3. Only emit terminal commands for cells that changed
///   4. All commands are batched with `queue!`, flushed once at the end
///   5. Swap front/back
///
/// The renderer only reads the game through `GameMachine` accessors. The
/// one thing it writes back is the camera viewport size (`fit_camera`),
/// which depends on the terminal.
///
/// ## Puzzle board mapping
///
/// Each 80-unit puzzle cell is drawn as `BOARD_CELL_COLS × BOARD_CELL_ROWS`
/// terminal cells. Mouse positions map back to the centre of the terminal
/// cell in board units, which lands inside every node's pick radius.

use std::io::{self, BufWriter, Write};

use crossterm::{
    cursor::{self, MoveTo},
    event::{
        DisableMouseCapture, EnableMouseCapture, KeyboardEnhancementFlags,
        PopKeyboardEnhancementFlags, PushKeyboardEnhancementFlags,
    },
    execute, queue,
    style::{Color, Print, ResetColor, SetBackgroundColor, SetForegroundColor},
    terminal::{self, Clear, ClearType},
};

use crate::domain::entity::Entity;
use crate::domain::object::ObjectKind;
use crate::domain::tile::Tile;
use crate::domain::tools::ToolType;
use crate::sim::event::GameOverCause;
use crate::sim::machine::{GameMachine, Phase, TitleItem, SELECT_COLUMNS};
use crate::sim::puzzle::{Outcome, WirePuzzle, CELL_UNITS, GRID_CELLS, WIRE_COLOR_NAMES};
use crate::sim::world::World;

// ── Cell: the unit of the back-buffer ──

#[derive(Clone, Copy, PartialEq, Eq)]
struct Cell {
    ch: [u8; 16],  // up to 16 bytes (supports ZWJ emoji sequences)
    ch_len: u8,
    fg: Color,
    bg: Color,
    wide: bool,    // occupies 2 terminal columns
    cont: bool,    // right half of a wide char (skip render)
}

impl Cell {
    /// Explicit dark background for every "empty" terminal cell, also used
    /// for `Clear`, so the inter-row gaps match on VTE terminals.
    const BASE_BG: Color = Color::Rgb { r: 16, g: 20, b: 28 };

    const BLANK: Cell = Cell {
        ch: [b' ', 0,0,0, 0,0,0,0, 0,0,0,0, 0,0,0,0],
        ch_len: 1,
        fg: Color::White,
        bg: Cell::BASE_BG,
        wide: false,
        cont: false,
    };

    const WIDE_CONT: Cell = Cell {
        ch: [0; 16],
        ch_len: 0,
        fg: Color::White,
        bg: Cell::BASE_BG,
        wide: false,
        cont: true,
    };

    /// Sentinel that differs from any real cell: forces a full repaint.
    const INVALID: Cell = Cell {
        ch: [b'?', 0,0,0, 0,0,0,0, 0,0,0,0, 0,0,0,0],
        ch_len: 1,
        fg: Color::Magenta,
        bg: Color::Magenta,
        wide: false,
        cont: false,
    };

    #[inline]
    fn norm_bg(bg: Color) -> Color {
        match bg {
            Color::Reset => Self::BASE_BG,
            other => other,
        }
    }

    fn from_char(c: char, fg: Color, bg: Color) -> Self {
        let mut cell = Self::BLANK;
        cell.ch_len = c.encode_utf8(&mut cell.ch).len() as u8;
        cell.fg = fg;
        cell.bg = Self::norm_bg(bg);
        cell
    }

    fn from_char_wide(c: char, bg: Color) -> Self {
        let mut cell = Self::from_char(c, Color::Reset, bg);
        cell.wide = true;
        cell
    }

    fn as_str(&self) -> &str {
        std::str::from_utf8(&self.ch[..self.ch_len as usize]).unwrap_or(" ")
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

    /// Write a string at (x, y). Each char occupies 1 column.
    fn put_str(&mut self, x: usize, y: usize, s: &str, fg: Color, bg: Color) {
        for (i, ch) in s.chars().enumerate() {
            if x + i >= self.width { break; }
            self.set(x + i, y, Cell::from_char(ch, fg, bg));
        }
    }

    /// Centered in the full buffer width.
    fn put_centered(&mut self, y: usize, s: &str, fg: Color, bg: Color) {
        let x = self.width.saturating_sub(s.chars().count()) / 2;
        self.put_str(x, y, s, fg, bg);
    }

    fn fill_row(&mut self, y: usize, bg: Color) {
        for x in 0..self.width {
            self.set(x, y, Cell::from_char(' ', Color::White, bg));
        }
    }

    fn fill_rect(&mut self, x: usize, y: usize, w: usize, h: usize, bg: Color) {
        for yy in y..y + h {
            for xx in x..x + w {
                self.set(xx, yy, Cell::from_char(' ', Color::White, bg));
            }
        }
    }

    fn put_wide(&mut self, x: usize, y: usize, c: char, bg: Color) {
        self.set(x, y, Cell::from_char_wide(c, bg));
        self.set(x + 1, y, Cell::WIDE_CONT);
    }
}

// ── Layout ──

/// Each map cell = 2 terminal columns.
const CELL_W: usize = 2;

const HUD_ROW: usize = 0;
const MAP_ROW: usize = 2;

/// Terminal cells per puzzle grid cell.
const BOARD_CELL_COLS: usize = 12;
const BOARD_CELL_ROWS: usize = 5;
const BOARD_COLS: usize = GRID_CELLS * BOARD_CELL_COLS;
const BOARD_ROWS: usize = GRID_CELLS * BOARD_CELL_ROWS;
const BOARD_TOP: usize = 4;

const HUD_BG: Color = Color::Rgb { r: 24, g: 32, b: 64 };
const MSG_BG: Color = Color::Rgb { r: 200, g: 180, b: 50 };
const GOOD: Color = Color::Rgb { r: 80, g: 255, b: 80 };
const WARN: Color = Color::Rgb { r: 255, g: 220, b: 50 };
const BAD: Color = Color::Rgb { r: 255, g: 70, b: 70 };
const DIM: Color = Color::DarkGrey;
const GOLD: Color = Color::Rgb { r: 255, g: 200, b: 50 };

/// On-screen puzzle buttons.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum PuzzleButton {
    Undo,
    Redo,
    Reset,
    Exit,
}

impl PuzzleButton {
    const ALL: [PuzzleButton; 4] =
        [PuzzleButton::Undo, PuzzleButton::Redo, PuzzleButton::Reset, PuzzleButton::Exit];

    fn label(self) -> &'static str {
        match self {
            PuzzleButton::Undo => "[ Undo Z ]",
            PuzzleButton::Redo => "[ Redo Y ]",
            PuzzleButton::Reset => "[ Reset R ]",
            PuzzleButton::Exit => "[ Exit Esc ]",
        }
    }
}

/// Where the puzzle board sits on screen; recomputed every frame.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct BoardLayout {
    pub left: usize,
    pub top: usize,
}

impl BoardLayout {
    fn for_width(term_w: usize) -> Self {
        BoardLayout { left: term_w.saturating_sub(BOARD_COLS) / 2, top: BOARD_TOP }
    }

    /// Terminal cell → board units. Outside the board: `None`, or the
    /// nearest edge when `clamp` is set.
    pub fn to_units(&self, col: usize, row: usize, clamp: bool) -> Option<(i32, i32)> {
        let inside = col >= self.left
            && col < self.left + BOARD_COLS
            && row >= self.top
            && row < self.top + BOARD_ROWS;
        if !inside && !clamp {
            return None;
        }
        let c = (col as i64 - self.left as i64).clamp(0, BOARD_COLS as i64 - 1) as i32;
        let r = (row as i64 - self.top as i64).clamp(0, BOARD_ROWS as i64 - 1) as i32;
        let x = (c * CELL_UNITS + CELL_UNITS / 2) / BOARD_CELL_COLS as i32;
        let y = (r * CELL_UNITS + CELL_UNITS / 2) / BOARD_CELL_ROWS as i32;
        Some((x, y))
    }

    /// Board units → terminal cell.
    pub fn to_cell(&self, x: i32, y: i32) -> (usize, usize) {
        let c = (x.max(0) as usize * BOARD_CELL_COLS) / CELL_UNITS as usize;
        let r = (y.max(0) as usize * BOARD_CELL_ROWS) / CELL_UNITS as usize;
        (self.left + c.min(BOARD_COLS - 1), self.top + r.min(BOARD_ROWS - 1))
    }

    fn buttons_row(&self) -> usize {
        self.top + BOARD_ROWS + 1
    }

    /// Button column spans, left to right.
    fn buttons(&self) -> impl Iterator<Item = (PuzzleButton, usize, usize)> {
        let mut x = self.left;
        PuzzleButton::ALL.into_iter().map(move |b| {
            let w = b.label().len();
            let at = x;
            x += w + 2;
            (b, at, w)
        })
    }

    pub fn button_at(&self, col: usize, row: usize) -> Option<PuzzleButton> {
        if row != self.buttons_row() {
            return None;
        }
        self.buttons()
            .find(|&(_, x, w)| col >= x && col < x + w)
            .map(|(b, _, _)| b)
    }
}

fn wire_color(color: usize) -> Color {
    match WIRE_COLOR_NAMES.get(color).copied() {
        Some("red") => Color::Rgb { r: 230, g: 60, b: 60 },
        Some("blue") => Color::Rgb { r: 70, g: 120, b: 255 },
        Some("green") => Color::Rgb { r: 60, g: 210, b: 90 },
        Some("yellow") => Color::Rgb { r: 240, g: 210, b: 40 },
        _ => Color::White,
    }
}

/// `m:ss`, rounded up so a running clock never shows 0:00 early.
fn clock(ms: u64) -> String {
    let secs = (ms + 999) / 1000;
    format!("{}:{:02}", secs / 60, secs % 60)
}

fn level_timer_color(ms: u64) -> Color {
    if ms > 60_000 { GOOD } else if ms > 30_000 { WARN } else { BAD }
}

fn puzzle_timer_color(ms: u64) -> Color {
    if ms > 10_000 { GOOD } else if ms > 5_000 { WARN } else { BAD }
}

fn tool_glyph(tool: ToolType) -> char {
    match tool {
        ToolType::Wrench => '🔧',
        ToolType::Pliers => '🔩',
        ToolType::Screwdriver => '🪛',
        ToolType::Tape => '🩹',
    }
}

// ── Renderer ──

pub struct Renderer {
    writer: BufWriter<io::Stdout>,
    front: FrameBuffer,
    back: FrameBuffer,
    term_w: usize,
    term_h: usize,
    last_phase: Option<Phase>,
    board: BoardLayout,
    enhanced_keys: bool,
}

impl Renderer {
    pub fn new() -> Self {
        Renderer {
            writer: BufWriter::with_capacity(16384, io::stdout()),
            front: FrameBuffer::new(0, 0),
            back: FrameBuffer::new(0, 0),
            term_w: 0,
            term_h: 0,
            last_phase: None,
            board: BoardLayout::for_width(80),
            enhanced_keys: false,
        }
    }

    /// Enter raw mode and the alternate screen. Returns whether the
    /// terminal reports key releases.
    pub fn init(&mut self) -> io::Result<bool> {
        terminal::enable_raw_mode()?;
        execute!(
            self.writer,
            terminal::EnterAlternateScreen,
            cursor::Hide,
            EnableMouseCapture,
            SetBackgroundColor(Cell::BASE_BG),
            Clear(ClearType::All)
        )?;

        self.enhanced_keys = terminal::supports_keyboard_enhancement().unwrap_or(false);
        if self.enhanced_keys {
            execute!(
                self.writer,
                PushKeyboardEnhancementFlags(KeyboardEnhancementFlags::REPORT_EVENT_TYPES)
            )?;
        }

        self.refresh_size();
        self.back.cells.fill(Cell::INVALID);
        Ok(self.enhanced_keys)
    }

    pub fn cleanup(&mut self) -> io::Result<()> {
        if self.enhanced_keys {
            execute!(self.writer, PopKeyboardEnhancementFlags)?;
        }
        execute!(
            self.writer,
            ResetColor,
            DisableMouseCapture,
            cursor::Show,
            terminal::LeaveAlternateScreen
        )?;
        terminal::disable_raw_mode()
    }

    /// Returns true when the terminal size changed.
    fn refresh_size(&mut self) -> bool {
        let (tw, th) = terminal::size().unwrap_or((80, 24));
        if tw as usize == self.term_w && th as usize == self.term_h {
            return false;
        }
        self.term_w = tw as usize;
        self.term_h = th as usize;
        self.front.resize(self.term_w, self.term_h);
        self.back.resize(self.term_w, self.term_h);
        self.back.cells.fill(Cell::INVALID);
        self.board = BoardLayout::for_width(self.term_w);
        true
    }

    pub fn board(&self) -> BoardLayout {
        self.board
    }

    /// Size the camera viewport to the terminal; recenters on the player
    /// when the viewport changes.
    pub fn fit_camera(&mut self, world: &mut World) {
        self.refresh_size();
        let reserved_rows = MAP_ROW + 4; // HUD + gap + message + help
        let view_w = (self.term_w / CELL_W).min(world.map.width).max(1);
        let view_h = self.term_h.saturating_sub(reserved_rows).min(world.map.height).max(1);
        let cam = &mut world.camera;
        if cam.view_w != view_w || cam.view_h != view_h {
            cam.view_w = view_w;
            cam.view_h = view_h;
            let (px, py) = world.player.pos();
            cam.center_on(px, py, world.map.width, world.map.height);
        }
    }

    pub fn render(&mut self, game: &GameMachine, now_ms: u64) -> io::Result<()> {
        if self.refresh_size() {
            queue!(self.writer, SetBackgroundColor(Cell::BASE_BG), Clear(ClearType::All))?;
        }

        // Phase change → clean transition
        if self.last_phase != Some(game.phase()) {
            self.back.cells.fill(Cell::INVALID);
            queue!(self.writer, SetBackgroundColor(Cell::BASE_BG), Clear(ClearType::All))?;
            self.last_phase = Some(game.phase());
        }

        self.front.clear();

        match game.phase() {
            Phase::Title => self.compose_title(game, now_ms),
            Phase::LevelSelect => self.compose_level_select(game),
            Phase::Playing => self.compose_game(game, now_ms),
            Phase::Paused => {
                self.compose_game(game, now_ms);
                self.compose_pause_overlay(game, now_ms);
            }
            Phase::Settings => {
                if game.settings_return() == Phase::WirePuzzle {
                    self.compose_puzzle(game, now_ms);
                } else {
                    self.compose_game(game, now_ms);
                }
                self.compose_settings_overlay(game);
            }
            Phase::WirePuzzle => self.compose_puzzle(game, now_ms),
            Phase::LevelComplete => {
                self.compose_game(game, now_ms);
                self.compose_level_complete(game);
            }
            Phase::GameOver => self.compose_game_over(game),
        }

        self.flush_diff()?;
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

        // Explicit base colors; ResetColor would fall back to the terminal default.
        queue!(self.writer, SetForegroundColor(Color::White), SetBackgroundColor(Cell::BASE_BG))?;

        for y in 0..self.front.height {
            let mut x = 0;
            while x < self.front.width {
                let cell = self.front.get(x, y);
                let prev = self.back.get(x, y);

                if cell.cont {
                    if cell != prev { need_move = true; }
                    x += 1;
                    continue;
                }

                let cont_changed = cell.wide
                    && x + 1 < self.front.width
                    && self.front.get(x + 1, y) != self.back.get(x + 1, y);

                if cell == prev && !cont_changed {
                    need_move = true;
                    x += 1;
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

                queue!(self.writer, Print(cell.as_str()))?;

                if cell.wide {
                    last_x = x + 1;
                    x += 2;
                } else {
                    last_x = x;
                    x += 1;
                }
                last_y = y;
            }
        }

        self.writer.flush()
    }

    // ══════════════════════════════════════════════════════════
    // World view
    // ══════════════════════════════════════════════════════════

    fn compose_hud(&mut self, game: &GameMachine, now_ms: u64) {
        let w = game.world();
        let prog = game.progression();
        self.front.fill_row(HUD_ROW, HUD_BG);

        let mut x = 1;
        let level = format!("Level {}/{}", prog.level(), prog.max_level());
        self.front.put_str(x, HUD_ROW, &level, Color::White, HUD_BG);
        x += level.len() + 2;

        // Hearts: 2 life points each.
        let hearts = (w.player.max_life + 1) / 2;
        for i in 0..hearts {
            let points = w.player.life.saturating_sub(i * 2).min(2);
            let (ch, fg) = match points {
                2 => ('♥', BAD),
                1 => ('♥', Color::Rgb { r: 120, g: 40, b: 40 }),
                _ => ('♡', DIM),
            };
            self.front.set(x, HUD_ROW, Cell::from_char(ch, fg, HUD_BG));
            x += 2;
        }
        x += 1;

        for tool in ToolType::ALL {
            if w.inventory.has(tool) {
                self.front.put_wide(x, HUD_ROW, tool_glyph(tool), HUD_BG);
            } else {
                self.front.put_str(x, HUD_ROW, "··", DIM, HUD_BG);
            }
            x += 3;
        }

        let post = if w.post().is_none() {
            ("Post: fixed".to_string(), GOOD)
        } else if w.inventory.is_complete() {
            ("Post: READY".to_string(), GOOD)
        } else {
            (format!("Post: need {}", w.inventory.missing()), DIM)
        };
        self.front.put_str(x + 1, HUD_ROW, &post.0, post.1, HUD_BG);
        x += post.0.len() + 3;

        let remaining = prog.remaining_ms(now_ms);
        let timer = format!("⏱ {}", clock(remaining));
        self.front.put_str(x, HUD_ROW, &timer, level_timer_color(remaining), HUD_BG);
        x += timer.chars().count() + 2;

        let boost = w.boost_remaining_ms(now_ms);
        if boost > 0 {
            let text = format!("Boost {}s", (boost + 999) / 1000);
            self.front.put_str(x, HUD_ROW, &text, Color::Cyan, HUD_BG);
        }
    }

    fn compose_game(&mut self, game: &GameMachine, now_ms: u64) {
        self.compose_hud(game, now_ms);

        let w = game.world();
        let cam = &w.camera;
        let buf_w = self.front.width;
        for vy in 0..cam.view_h {
            let row = MAP_ROW + vy;
            if row >= self.front.height { break; }
            let wy = cam.y + vy as i32;
            for vx in 0..cam.view_w {
                let col = vx * CELL_W;
                if col + 1 >= buf_w { break; }
                let wx = cam.x + vx as i32;
                if wx < 0 || wy < 0 || wx >= w.map.width as i32 || wy >= w.map.height as i32 {
                    continue;
                }
                self.compose_cell(w, wx as usize, wy as usize, col, row);
            }
        }

        let msg_row = MAP_ROW + cam.view_h + 1;
        if let Some(text) = game.advisory(now_ms) {
            if msg_row < self.front.height {
                self.front.fill_row(msg_row, MSG_BG);
                self.front.put_str(0, msg_row, &format!(" ◈ {} ", text), Color::Black, MSG_BG);
            }
        }

        let help_row = MAP_ROW + cam.view_h + 3;
        if help_row < self.front.height {
            let help = " ←→↑↓/WASD: Move  P: Pause  Esc: Settings  │  Pad: D-pad, Select, B";
            self.front.put_str(0, help_row, help, DIM, Color::Reset);
        }
    }

    /// Game cell (gx, gy) at terminal (col, row); 2 columns wide.
    fn compose_cell(&mut self, w: &World, gx: usize, gy: usize, col: usize, row: usize) {
        let (c0, c1, fg, bg) = tile_look(w.map.get(gx, gy));

        if w.player.pos() == (gx, gy) {
            self.front.put_wide(col, row, '👷', bg);
            return;
        }
        if w.npcs.iter().any(|n: &Entity| n.pos() == (gx, gy)) {
            self.front.put_wide(col, row, '🐕', bg);
            return;
        }
        if let Some(i) = w.object_at(gx, gy) {
            let glyph = match w.objects[i].kind {
                ObjectKind::Tool(t) => tool_glyph(t),
                ObjectKind::Post => '⚡',
                ObjectKind::Boots => '👢',
            };
            self.front.put_wide(col, row, glyph, bg);
            return;
        }

        self.front.set(col, row, Cell::from_char(c0, fg, bg));
        self.front.set(col + 1, row, Cell::from_char(c1, fg, bg));
    }

    // ══════════════════════════════════════════════════════════
    // Wire puzzle
    // ══════════════════════════════════════════════════════════

    fn compose_puzzle(&mut self, game: &GameMachine, now_ms: u64) {
        let p = game.puzzle();
        let board = self.board;

        self.front.fill_row(0, HUD_BG);
        self.front.put_str(2, 0, "REPAIR THE POWER LINE", GOLD, HUD_BG);
        let remaining = p.remaining_ms(now_ms);
        let timer = format!("⏱ {}", clock(remaining));
        self.front.put_str(26, 0, &timer, puzzle_timer_color(remaining), HUD_BG);
        let progress = format!("Wires {}/{}", p.connected_count(), p.wires().len());
        self.front.put_str(36, 0, &progress, Color::White, HUD_BG);

        self.front.put_centered(2, "Drag each wire from its terminal to the matching one.", DIM, Color::Reset);

        // Board frame
        let frame_bg = Color::Rgb { r: 30, g: 34, b: 44 };
        self.front.fill_rect(board.left, board.top, BOARD_COLS, BOARD_ROWS, frame_bg);

        for w in p.wires() {
            if w.connected {
                let from = p.nodes()[w.start].centre();
                let to = p.nodes()[w.end].centre();
                self.draw_line(board.to_cell(from.0, from.1), board.to_cell(to.0, to.1), wire_color(w.color), frame_bg);
            }
        }
        if let Some(d) = p.drag() {
            let w = p.wires()[d.wire];
            let from = p.nodes()[w.start].centre();
            self.draw_line(board.to_cell(from.0, from.1), board.to_cell(d.x, d.y), wire_color(w.color), frame_bg);
        }

        self.compose_nodes(p);
        self.compose_buttons(p);

        let banner_row = board.buttons_row() + 2;
        match p.outcome() {
            Outcome::Solved => {
                self.front.put_centered(banner_row, "⚡ POWER RESTORED! ⚡", GOOD, Color::Reset);
                self.front.put_centered(banner_row + 1, "+10s Speed Boost", Color::Cyan, Color::Reset);
                self.front.put_centered(banner_row + 2, "Returning to game...", DIM, Color::Reset);
            }
            Outcome::Failed => {
                self.front.put_centered(banner_row, "TIME'S UP!", BAD, Color::Reset);
                self.front.put_centered(banner_row + 1, "-1 Life", BAD, Color::Reset);
                self.front.put_centered(banner_row + 2, "Returning to game...", DIM, Color::Reset);
            }
            Outcome::InProgress => {
                if let Some(text) = game.advisory(now_ms) {
                    self.front.put_centered(banner_row, text, WARN, Color::Reset);
                }
            }
        }
    }

    fn compose_nodes(&mut self, p: &WirePuzzle) {
        let board = self.board;
        for node in p.nodes() {
            let (cx, cy) = node.centre();
            let (col, row) = board.to_cell(cx, cy);
            let Some(color) = node.color else { continue };
            let connected = p.wires().iter().any(|w| w.color == color && w.connected);
            let label = node.label().unwrap_or_default();
            let bg = wire_color(color);
            let fg = if connected { Color::White } else { Color::Black };
            let text = format!(" {} ", label);
            self.front.put_str(col.saturating_sub(2), row, &text, fg, bg);
        }
    }

    fn compose_buttons(&mut self, p: &WirePuzzle) {
        let board = self.board;
        let row = board.buttons_row();
        let live = !p.is_resolved();
        for (b, x, _) in board.buttons() {
            let enabled = live
                && match b {
                    PuzzleButton::Undo => p.can_undo(),
                    PuzzleButton::Redo => p.can_redo(),
                    PuzzleButton::Reset | PuzzleButton::Exit => true,
                };
            let (fg, bg) = if enabled {
                (Color::White, Color::Rgb { r: 50, g: 60, b: 90 })
            } else {
                (DIM, Color::Reset)
            };
            self.front.put_str(x, row, b.label(), fg, bg);
        }
    }

    /// Bresenham line of `•` in terminal cells.
    fn draw_line(&mut self, from: (usize, usize), to: (usize, usize), fg: Color, bg: Color) {
        let (mut x, mut y) = (from.0 as i64, from.1 as i64);
        let (x1, y1) = (to.0 as i64, to.1 as i64);
        let dx = (x1 - x).abs();
        let dy = -(y1 - y).abs();
        let sx = if x < x1 { 1 } else { -1 };
        let sy = if y < y1 { 1 } else { -1 };
        let mut err = dx + dy;
        loop {
            self.front.set(x as usize, y as usize, Cell::from_char('•', fg, bg));
            if x == x1 && y == y1 { break; }
            let e2 = 2 * err;
            if e2 >= dy { err += dy; x += sx; }
            if e2 <= dx { err += dx; y += sy; }
        }
    }

    // ══════════════════════════════════════════════════════════
    // Menus and overlays
    // ══════════════════════════════════════════════════════════

    fn compose_title(&mut self, game: &GameMachine, now_ms: u64) {
        let title = [
            r"  _      _              ___  _       ",
            r" | |    (_) _ _   ___  | __|(_)__ __ ",
            r" | |__  | || ' \ / -_) | _| | |\ \ / ",
            r" |____| |_||_||_|\___| |_|  |_|/_\_\ ",
        ];
        for (i, line) in title.iter().enumerate() {
            self.front.put_centered(2 + i, line, GOLD, Color::Reset);
        }
        self.front.put_centered(7, "⚡  Power Restoration  ⚡", GOOD, Color::Reset);

        let menu_base = 10;
        for (i, item) in TitleItem::ALL.iter().enumerate() {
            let selected = *item == game.title_item();
            let text = if selected { format!("▸ {} ◂", item.label()) } else { item.label().to_string() };
            let fg = if selected { GOOD } else { Color::White };
            self.front.put_centered(menu_base + i * 2, &text, fg, Color::Reset);
        }

        let help = [
            "Collect the four tools, then fix the broken post.",
            "↑↓ Select   Enter Confirm   Q Quit",
        ];
        for (i, line) in help.iter().enumerate() {
            self.front.put_centered(menu_base + 8 + i, line, DIM, Color::Reset);
        }

        if let Some(text) = game.advisory(now_ms) {
            let row = self.front.height.saturating_sub(1);
            self.front.fill_row(row, MSG_BG);
            self.front.put_str(0, row, &format!(" ◈ {} ", text), Color::Black, MSG_BG);
        }
    }

    fn compose_level_select(&mut self, game: &GameMachine) {
        let prog = game.progression();
        self.front.put_str(2, 1, "╔══════════════════════════════════════════════════╗", GOLD, Color::Reset);
        self.front.put_str(2, 2, "║                  LEVEL  SELECT                   ║", GOLD, Color::Reset);
        self.front.put_str(2, 3, "╚══════════════════════════════════════════════════╝", GOLD, Color::Reset);

        let cursor_bg = Color::Rgb { r: 30, g: 60, b: 30 };
        let cols = SELECT_COLUMNS as usize;
        for level in 1..=prog.max_level() {
            let i = level as usize - 1;
            let (gx, gy) = (i % cols, i / cols);
            let x = 4 + gx * 10;
            let y = 5 + gy * 3;
            let selected = level == game.selected_level();
            let (fg, bg) = if selected { (GOOD, cursor_bg) } else { (Color::White, Color::Reset) };
            self.front.fill_rect(x, y, 8, 2, Cell::norm_bg(bg));
            self.front.put_str(x + 1, y, &format!("Lv {:>2}", level), fg, bg);
            self.front.put_str(x + 1, y + 1, &clock(prog.budget_ms(level)), DIM, bg);
        }

        let rows = (prog.max_level() as usize + cols - 1) / cols;
        let footer = 5 + rows * 3 + 1;
        self.front.put_str(4, footer, "←→↑↓ Select   Enter Start   Esc Back", DIM, Color::Reset);
    }

    /// Centered dark box inside the map viewport; returns its top-left.
    fn overlay_box(&mut self, game: &GameMachine, w: usize, h: usize) -> (usize, usize) {
        let cam = &game.world().camera;
        let view_cols = (cam.view_w * CELL_W).max(w);
        let view_rows = cam.view_h.max(h);
        let x = view_cols.saturating_sub(w) / 2;
        let y = MAP_ROW + view_rows.saturating_sub(h) / 2;
        self.front.fill_rect(x, y, w, h, Color::Rgb { r: 40, g: 40, b: 48 });
        (x, y)
    }

    fn compose_pause_overlay(&mut self, game: &GameMachine, now_ms: u64) {
        let bg = Color::Rgb { r: 40, g: 40, b: 48 };
        let (x, y) = self.overlay_box(game, 34, 7);
        let blink = (now_ms / 400) % 2 == 0;
        let label = if blink { "▶  PAUSED  ◀" } else { "   PAUSED   " };
        self.front.put_str(x + 11, y + 1, label, WARN, bg);
        self.front.put_str(x + 3, y + 3, "P / Enter   Resume", Color::White, bg);
        self.front.put_str(x + 3, y + 4, "Esc         Settings", Color::White, bg);
    }

    fn compose_settings_overlay(&mut self, game: &GameMachine) {
        let bg = Color::Rgb { r: 40, g: 40, b: 48 };
        let (x, y) = self.overlay_box(game, 36, 9);
        self.front.put_str(x + 13, y + 1, "SETTINGS", WARN, bg);
        self.front.put_str(x + 3, y + 3, "R     Restart from level 1", Color::White, bg);
        self.front.put_str(x + 3, y + 4, "L     Back to lobby", Color::White, bg);
        self.front.put_str(x + 3, y + 5, "Q     Quit game", Color::White, bg);
        self.front.put_str(x + 3, y + 7, "Esc   Close", DIM, bg);
    }

    fn compose_level_complete(&mut self, game: &GameMachine) {
        let bg = Color::Rgb { r: 20, g: 50, b: 30 };
        let (x, y) = self.overlay_box(game, 36, 6);
        let prog = game.progression();
        let done = game.completed_level();
        let title = format!("LEVEL {} COMPLETE!", done);
        self.front.put_str(x + (36 - title.len()) / 2, y + 1, &title, GOOD, bg);
        let next = if done < prog.max_level() {
            format!("Next: level {}  ({})", done + 1, clock(prog.budget_ms(done + 1)))
        } else {
            "All lines restored!".to_string()
        };
        self.front.put_str(x + (36usize.saturating_sub(next.chars().count())) / 2, y + 3, &next, Color::White, bg);
    }

    fn compose_game_over(&mut self, game: &GameMachine) {
        let (headline, color, detail) = match game.game_over_cause() {
            Some(GameOverCause::Victory) => ("★ VICTORY! ★", GOLD, "Every power line in the district is back on."),
            Some(GameOverCause::OutOfLives) => ("✕ OUT OF LIVES ✕", BAD, "Too many failed repairs."),
            Some(GameOverCause::TimeOut) | None => ("✕ TIME'S UP ✕", BAD, "The blackout spread before the post was fixed."),
        };
        self.front.put_centered(4, "╔════════════════════════════════╗", color, Color::Reset);
        self.front.put_centered(5, &format!("║{:^32}║", headline), color, Color::Reset);
        self.front.put_centered(6, "╚════════════════════════════════╝", color, Color::Reset);
        self.front.put_centered(8, detail, Color::White, Color::Reset);
        let reached = format!("Reached level {}/{}", game.progression().level(), game.progression().max_level());
        self.front.put_centered(9, &reached, Color::White, Color::Reset);
        self.front.put_centered(12, "Enter / R   Play again from level 1", GOOD, Color::Reset);
        self.front.put_centered(13, "Esc         Back to title", DIM, Color::Reset);
        self.front.put_centered(14, "Q           Quit", DIM, Color::Reset);
    }
}

/// Two-column look for a tile: glyphs, fg, bg.
fn tile_look(tile: Tile) -> (char, char, Color, Color) {
    let grass = Color::Rgb { r: 34, g: 70, b: 34 };
    match tile.0 {
        1 | 2 => ('█', '█', Color::Rgb { r: 120, g: 120, b: 120 }, Color::Rgb { r: 70, g: 70, b: 70 }),
        4..=7 => ('▲', '▲', Color::Rgb { r: 150, g: 140, b: 120 }, grass),
        8..=11 => ('♣', '♣', Color::Rgb { r: 40, g: 160, b: 60 }, grass),
        12 => ('╬', '╬', Color::Rgb { r: 220, g: 200, b: 80 }, Color::Rgb { r: 60, g: 60, b: 60 }),
        _ if tile.is_pathway() => ('░', '░', Color::Rgb { r: 90, g: 90, b: 90 }, Color::Rgb { r: 55, g: 55, b: 55 }),
        _ if tile.is_blocked() => ('▓', '▓', Color::Rgb { r: 150, g: 100, b: 70 }, Color::Rgb { r: 90, g: 60, b: 40 }),
        _ if tile.0 % 7 == 3 => ('·', ' ', Color::Rgb { r: 220, g: 220, b: 120 }, grass),
        _ => (' ', ' ', Color::Reset, grass),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::puzzle::{NODE_CELLS, SELECT_RADIUS};

    #[test]
    fn every_node_is_pickable_from_its_drawn_cell() {
        let board = BoardLayout { left: 10, top: 4 };
        for (id, &(col, row)) in NODE_CELLS.iter().enumerate() {
            let cx = col as i32 * CELL_UNITS + CELL_UNITS / 2;
            let cy = row as i32 * CELL_UNITS + CELL_UNITS / 2;
            let (tc, tr) = board.to_cell(cx, cy);
            let (ux, uy) = board.to_units(tc, tr, false).unwrap();
            assert!((ux - cx).abs() < SELECT_RADIUS, "node {id} x");
            assert!((uy - cy).abs() < SELECT_RADIUS, "node {id} y");
        }
    }

    #[test]
    fn outside_the_board_only_maps_when_clamped() {
        let board = BoardLayout { left: 10, top: 4 };
        assert_eq!(board.to_units(0, 0, false), None);
        let (x, y) = board.to_units(0, 0, true).unwrap();
        assert!(x < CELL_UNITS && y < CELL_UNITS);
        let (x, y) = board.to_units(200, 200, true).unwrap();
        assert!(x > 3 * CELL_UNITS && y > 3 * CELL_UNITS);
    }

    #[test]
    fn buttons_are_hit_on_their_row_only() {
        let board = BoardLayout { left: 10, top: 4 };
        let row = board.buttons_row();
        assert_eq!(board.button_at(10, row), Some(PuzzleButton::Undo));
        let redo_x = 10 + PuzzleButton::Undo.label().len() + 2;
        assert_eq!(board.button_at(redo_x, row), Some(PuzzleButton::Redo));
        assert_eq!(board.button_at(redo_x - 1, row), None);
        assert_eq!(board.button_at(10, row + 1), None);
    }

    #[test]
    fn timer_colors_follow_thresholds() {
        assert_eq!(level_timer_color(60_001), GOOD);
        assert_eq!(level_timer_color(60_000), WARN);
        assert_eq!(level_timer_color(30_000), BAD);
        assert_eq!(puzzle_timer_color(10_001), GOOD);
        assert_eq!(puzzle_timer_color(5_001), WARN);
        assert_eq!(puzzle_timer_color(5_000), BAD);
    }

    #[test]
    fn clock_rounds_up() {
        assert_eq!(clock(420_000), "7:00");
        assert_eq!(clock(59_001), "1:00");
        assert_eq!(clock(1), "0:01");
        assert_eq!(clock(0), "0:00");
    }
}
