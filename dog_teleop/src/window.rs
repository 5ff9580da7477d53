//! Keyboard window and status panel using `minifb`.
//!
//! Layout:
//!
//! ```text
//! ┌──────────────────────────────────────────────┐
//! │  QUADRUPED TELEOP                  RUNNING   │
//! │  SPEED   [■][■][■][ ][ ][ ]  0.8 M/S         │
//! │  HEIGHT  [■][■][■][ ][ ]     0.25 M          │
//! │  VX=0.80, VY=0.00, WZ=0.00                   │
//! │  FORWARD                                     │
//! │──────────────────────────────────────────────│
//! │  key legend                                  │
//! └──────────────────────────────────────────────┘
//! ```
//!
//! minifb must be driven from the main thread, so the window only forwards
//! raw key transitions ([`KeyInput`]) and draws the latest [`StatusSnapshot`]
//! it was sent.  Everything else happens on the control loop's thread.

use std::sync::mpsc::{Receiver, Sender, TryRecvError};
use std::time::Duration;

use minifb::{Key, KeyRepeat, Window, WindowOptions};

use teleop_core::{RawKey, KEY_LEGEND};

use crate::control::LoopState;
use crate::display::StatusSnapshot;
use crate::listener::KeyInput;

// ════════════════════════════════════════════════════════════════════════════
// Layout constants
// ════════════════════════════════════════════════════════════════════════════

pub const WIN_W:    usize = 520;
pub const WIN_H:    usize = 340;
const MARGIN:       usize = 14;
const LINE_H:       usize = 22;
const SCALE:        usize = 2;
const BAR_W:        usize = 14;
const BAR_GAP:      usize = 4;
const LEGEND_Y:     usize = 170;
const BG_COLOR:     u32   = 0xFF1A1A2E;
const PANEL_BG:     u32   = 0xFF16213E;
const TEXT_COLOR:   u32   = 0xFFEEEEEE;
const DIM_COLOR:    u32   = 0xFF888888;
const BAR_ON:       u32   = 0xFFFFD700;  // gold
const BAR_OFF:      u32   = 0xFF0F3460;
const RUN_COLOR:    u32   = 0xFF55DD77;
const STOP_COLOR:   u32   = 0xFFFF5555;

// ════════════════════════════════════════════════════════════════════════════
// Canvas — the framebuffer and drawing primitives
// ════════════════════════════════════════════════════════════════════════════

/// ARGB framebuffer of `WIN_W × WIN_H` pixels.
pub struct Canvas {
    buf: Vec<u32>,
}

impl Default for Canvas {
    fn default() -> Self { Canvas { buf: vec![BG_COLOR; WIN_W * WIN_H] } }
}

impl Canvas {
    pub fn pixels(&self) -> &[u32] { &self.buf }

    pub fn pixel(&self, x: usize, y: usize) -> Option<u32> {
        (x < WIN_W && y < WIN_H).then(|| self.buf[y * WIN_W + x])
    }

    /// Draw the whole status panel.  `None` shows a waiting message.
    pub fn draw_status(&mut self, status: Option<&StatusSnapshot>) {
        self.buf.fill(BG_COLOR);
        self.fill_rect(0, 0, WIN_W, LEGEND_Y - 8, PANEL_BG);
        self.draw_label("QUADRUPED TELEOP", MARGIN, MARGIN, SCALE, TEXT_COLOR);

        let Some(s) = status else {
            self.draw_label("CONNECTING...", MARGIN, MARGIN + LINE_H, SCALE, DIM_COLOR);
            self.draw_legend();
            return;
        };

        // ── State badge ───────────────────────────────────────────────────
        let (badge, color) = match s.state {
            LoopState::Idle    => ("IDLE",    DIM_COLOR),
            LoopState::Running => ("RUNNING", RUN_COLOR),
            LoopState::Stopped => ("STOPPED", STOP_COLOR),
        };
        let bx = WIN_W - MARGIN - label_width(badge, SCALE);
        self.draw_label(badge, bx, MARGIN, SCALE, color);

        // ── Gears ─────────────────────────────────────────────────────────
        let mut y = MARGIN + LINE_H + 6;
        let bars_x = MARGIN + label_width("HEIGHT  ", SCALE);

        self.draw_label("SPEED", MARGIN, y, SCALE, TEXT_COLOR);
        let end = self.draw_gear_bar(bars_x, y, s.speed_gear, s.speed_gears);
        self.draw_label(&format!("{:.1} M/S", s.speed), end + 10, y, SCALE, TEXT_COLOR);
        y += LINE_H;

        self.draw_label("HEIGHT", MARGIN, y, SCALE, TEXT_COLOR);
        let end = self.draw_gear_bar(bars_x, y, s.height_gear, s.height_gears);
        self.draw_label(&format!("{:.2} M", s.height), end + 10, y, SCALE, TEXT_COLOR);
        y += LINE_H;

        // ── Velocity and held keys ────────────────────────────────────────
        self.draw_label(&s.velocity.to_string(), MARGIN, y, SCALE, TEXT_COLOR);
        y += LINE_H;

        let action = if s.held.is_empty() { "IDLE".to_string() } else { s.held.join(", ") };
        self.draw_label(&action, MARGIN, y, SCALE, BAR_ON);

        if s.write_failures > 0 {
            let text = format!("WRITE FAILURES: {}", s.write_failures);
            let fx = WIN_W - MARGIN - label_width(&text, 1);
            self.draw_label(&text, fx, y + 4, 1, STOP_COLOR);
        }

        self.draw_legend();
    }

    fn draw_legend(&mut self) {
        let col_w = (WIN_W - 2 * MARGIN) / 2;
        let rows = KEY_LEGEND.len().div_ceil(2);
        for (i, (keys, what)) in KEY_LEGEND.iter().enumerate() {
            let x = MARGIN + (i / rows) * col_w;
            let y = LEGEND_Y + (i % rows) * 10;
            self.draw_label(&format!("{:<10} {}", keys, what), x, y, 1, DIM_COLOR);
        }
    }

    /// `gears` boxes, the first `gear + 1` filled.  Returns the x past the last box.
    fn draw_gear_bar(&mut self, x: usize, y: usize, gear: usize, gears: usize) -> usize {
        let mut bx = x;
        for i in 0..gears {
            let color = if i <= gear { BAR_ON } else { BAR_OFF };
            self.fill_rect(bx, y, BAR_W, 5 * SCALE, color);
            bx += BAR_W + BAR_GAP;
        }
        bx
    }

    // ── Primitive drawing helpers ─────────────────────────────────────────

    fn fill_rect(&mut self, x: usize, y: usize, w: usize, h: usize, color: u32) {
        for row in y..(y + h).min(WIN_H) {
            for col in x..(x + w).min(WIN_W) {
                self.buf[row * WIN_W + col] = color;
            }
        }
    }

    /// 3×5 bitmap text, each font pixel drawn as a `scale × scale` block.
    fn draw_label(&mut self, text: &str, x: usize, y: usize, scale: usize, color: u32) {
        let advance = 4 * scale; // 3 wide + 1 gap
        let mut cx = x;
        for ch in text.chars() {
            if cx + advance > WIN_W { break; }
            let glyph = char_glyph(ch);
            for (row, &bits) in glyph.iter().enumerate() {
                for col in 0..3usize {
                    if bits & (1 << (2 - col)) != 0 {
                        self.fill_rect(cx + col * scale, y + row * scale, scale, scale, color);
                    }
                }
            }
            cx += advance;
        }
    }
}

fn label_width(text: &str, scale: usize) -> usize {
    text.chars().count() * 4 * scale
}

// ════════════════════════════════════════════════════════════════════════════
// StatusWindow
// ════════════════════════════════════════════════════════════════════════════

pub struct StatusWindow {
    window:    Window,
    canvas:    Canvas,
    key_tx:    Sender<KeyInput>,
    status_rx: Receiver<StatusSnapshot>,
    latest:    Option<StatusSnapshot>,
    focused:   bool,
    /// The control loop has hung up its status channel.
    loop_gone: bool,
}

impl StatusWindow {
    pub fn new(key_tx: Sender<KeyInput>, status_rx: Receiver<StatusSnapshot>) -> Result<Self, String> {
        let mut window = Window::new(
            "Quadruped Keyboard Teleop",
            WIN_W, WIN_H,
            WindowOptions {
                resize: false,
                ..WindowOptions::default()
            },
        ).map_err(|e| e.to_string())?;

        window.limit_update_rate(Some(Duration::from_millis(16))); // ~60fps

        Ok(StatusWindow {
            window,
            canvas: Canvas::default(),
            key_tx,
            status_rx,
            latest: None,
            focused: true,
            loop_gone: false,
        })
    }

    pub fn is_open(&self) -> bool { self.window.is_open() }

    /// True once the control loop has stopped or gone away.
    pub fn loop_finished(&self) -> bool {
        self.loop_gone || self.latest.as_ref().is_some_and(|s| s.state == LoopState::Stopped)
    }

    /// Forward key transitions.  Returns false when the window was closed.
    pub fn poll_input(&mut self) -> bool {
        if !self.window.is_open() {
            let _ = self.key_tx.send(KeyInput::Closed);
            return false;
        }

        let active = self.window.is_active();
        if self.focused && !active {
            let _ = self.key_tx.send(KeyInput::FocusLost);
        }
        self.focused = active;

        for key in self.window.get_keys_pressed(KeyRepeat::No) {
            if let Some(raw) = map_key(key) {
                let _ = self.key_tx.send(KeyInput::Down(raw));
            }
        }
        for key in self.window.get_keys_released() {
            if let Some(raw) = map_key(key) {
                let _ = self.key_tx.send(KeyInput::Up(raw));
            }
        }
        true
    }

    /// Take the newest status (if any) and draw one frame.
    pub fn render(&mut self) {
        loop {
            match self.status_rx.try_recv() {
                Ok(s) => self.latest = Some(s),
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Disconnected) => {
                    self.loop_gone = true;
                    break;
                }
            }
        }
        self.canvas.draw_status(self.latest.as_ref());
        self.window.update_with_buffer(self.canvas.pixels(), WIN_W, WIN_H).ok();
    }
}

/// minifb key → binding-table key.  Keys the table never binds are `None`.
pub fn map_key(key: Key) -> Option<RawKey> {
    let raw = match key {
        Key::W => RawKey::Char('w'),
        Key::A => RawKey::Char('a'),
        Key::S => RawKey::Char('s'),
        Key::D => RawKey::Char('d'),
        Key::Q => RawKey::Char('q'),
        Key::E => RawKey::Char('e'),
        Key::Z => RawKey::Char('z'),
        Key::X => RawKey::Char('x'),
        Key::R => RawKey::Char('r'),
        Key::Equal       => RawKey::Char('='),
        Key::NumPadPlus  => RawKey::Char('+'),
        Key::Minus       => RawKey::Char('-'),
        Key::NumPadMinus => RawKey::Char('-'),
        Key::Up     => RawKey::Up,
        Key::Down   => RawKey::Down,
        Key::Left   => RawKey::Left,
        Key::Right  => RawKey::Right,
        Key::Space  => RawKey::Space,
        Key::Escape => RawKey::Escape,
        _ => return None,
    };
    Some(raw)
}

// ────────────────────────────────────────────────────────────────────────────
// Minimal 3×5 bitmap font
// ────────────────────────────────────────────────────────────────────────────

fn char_glyph(c: char) -> [u8; 5] {
    match c {
        '0' => [0b111, 0b101, 0b101, 0b101, 0b111],
        '1' => [0b010, 0b110, 0b010, 0b010, 0b111],
        '2' => [0b111, 0b001, 0b111, 0b100, 0b111],
        '3' => [0b111, 0b001, 0b111, 0b001, 0b111],
        '4' => [0b101, 0b101, 0b111, 0b001, 0b001],
        '5' => [0b111, 0b100, 0b111, 0b001, 0b111],
        '6' => [0b111, 0b100, 0b111, 0b101, 0b111],
        '7' => [0b111, 0b001, 0b001, 0b001, 0b001],
        '8' => [0b111, 0b101, 0b111, 0b101, 0b111],
        '9' => [0b111, 0b101, 0b111, 0b001, 0b111],
        'a' | 'A' => [0b111, 0b101, 0b111, 0b101, 0b101],
        'b' | 'B' => [0b110, 0b101, 0b110, 0b101, 0b110],
        'c' | 'C' => [0b111, 0b100, 0b100, 0b100, 0b111],
        'd' | 'D' => [0b110, 0b101, 0b101, 0b101, 0b110],
        'e' | 'E' => [0b111, 0b100, 0b111, 0b100, 0b111],
        'f' | 'F' => [0b111, 0b100, 0b111, 0b100, 0b100],
        'g' | 'G' => [0b111, 0b100, 0b101, 0b101, 0b111],
        'h' | 'H' => [0b101, 0b101, 0b111, 0b101, 0b101],
        'i' | 'I' => [0b111, 0b010, 0b010, 0b010, 0b111],
        'j' | 'J' => [0b001, 0b001, 0b001, 0b101, 0b111],
        'k' | 'K' => [0b101, 0b101, 0b110, 0b101, 0b101],
        'l' | 'L' => [0b100, 0b100, 0b100, 0b100, 0b111],
        'm' | 'M' => [0b101, 0b111, 0b101, 0b101, 0b101],
        'n' | 'N' => [0b111, 0b101, 0b101, 0b101, 0b101],
        'o' | 'O' => [0b111, 0b101, 0b101, 0b101, 0b111],
        'p' | 'P' => [0b111, 0b101, 0b111, 0b100, 0b100],
        'q' | 'Q' => [0b111, 0b101, 0b101, 0b111, 0b001],
        'r' | 'R' => [0b110, 0b101, 0b110, 0b101, 0b101],
        's' | 'S' => [0b111, 0b100, 0b111, 0b001, 0b111],
        't' | 'T' => [0b111, 0b010, 0b010, 0b010, 0b010],
        'u' | 'U' => [0b101, 0b101, 0b101, 0b101, 0b111],
        'v' | 'V' => [0b101, 0b101, 0b101, 0b010, 0b010],
        'w' | 'W' => [0b101, 0b101, 0b101, 0b111, 0b101],
        'x' | 'X' => [0b101, 0b101, 0b010, 0b101, 0b101],
        'y' | 'Y' => [0b101, 0b101, 0b111, 0b010, 0b010],
        'z' | 'Z' => [0b111, 0b001, 0b010, 0b100, 0b111],
        '/' => [0b001, 0b001, 0b010, 0b100, 0b100],
        '-' => [0b000, 0b000, 0b111, 0b000, 0b000],
        '_' => [0b000, 0b000, 0b000, 0b000, 0b111],
        '.' => [0b000, 0b000, 0b000, 0b000, 0b010],
        ',' => [0b000, 0b000, 0b000, 0b010, 0b100],
        ':' => [0b000, 0b010, 0b000, 0b010, 0b000],
        '=' => [0b000, 0b111, 0b000, 0b111, 0b000],
        '+' => [0b000, 0b010, 0b111, 0b010, 0b000],
        ' ' => [0b000, 0b000, 0b000, 0b000, 0b000],
        _   => [0b000, 0b000, 0b010, 0b000, 0b000], // fallback dot
    }
}

// ════════════════════════════════════════════════════════════════════════════
// Tests
// ════════════════════════════════════════════════════════════════════════════
