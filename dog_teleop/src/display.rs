//! Status snapshot and the sinks that show it.
//!
//! The control loop builds a [`StatusSnapshot`] whenever a refresh is due
//! and hands it to a [`StatusSink`].  Sinks:
//!
//! * [`ChannelSink`] — forwards to the status window on the main thread.
//! * [`ConsoleSink`] — clears the terminal and prints (headless mode).
//! * [`LogSink`] — one `info` line per refresh.
//! * `Vec<StatusSnapshot>` — collects, for tests.

use std::fmt;
use std::io::{self, Write};
use std::sync::mpsc::Sender;

use tracing::info;

use teleop_core::{VelocityCommand, KEY_LEGEND};

use crate::control::LoopState;

// ════════════════════════════════════════════════════════════════════════════
// StatusSnapshot
// ════════════════════════════════════════════════════════════════════════════

#[derive(Clone, Debug, PartialEq)]
pub struct StatusSnapshot {
    pub state:          LoopState,
    /// Names of held movement keys, in symbol order.
    pub held:           Vec<&'static str>,
    pub speed_gear:     usize,
    pub speed_gears:    usize,
    pub speed:          f32,
    pub height_gear:    usize,
    pub height_gears:   usize,
    pub height:         f32,
    /// Last velocity actually dispatched.
    pub velocity:       VelocityCommand,
    pub write_failures: u64,
}

impl StatusSnapshot {
    pub fn speed_line(&self) -> String {
        format!("speed gear  {}/{} ({:.1} m/s)", self.speed_gear + 1, self.speed_gears, self.speed)
    }

    pub fn height_line(&self) -> String {
        format!("height gear {}/{} ({:.2} m)", self.height_gear + 1, self.height_gears, self.height)
    }

    pub fn velocity_line(&self) -> String {
        format!("velocity    {}", self.velocity)
    }

    pub fn action_line(&self) -> String {
        if self.held.is_empty() {
            "action      idle".to_string()
        } else {
            format!("action      {}", self.held.join(", "))
        }
    }
}

impl fmt::Display for StatusSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let rule = "=".repeat(50);
        writeln!(f, "{}", rule)?;
        writeln!(f, "       Quadruped Keyboard Teleop  [{}]", self.state)?;
        writeln!(f, "{}", rule)?;
        for (keys, what) in KEY_LEGEND {
            writeln!(f, "  {:<10} : {}", keys, what)?;
        }
        writeln!(f, "{}", rule)?;
        writeln!(f, "  {}", self.speed_line())?;
        writeln!(f, "  {}", self.height_line())?;
        writeln!(f, "  {}", self.velocity_line())?;
        writeln!(f, "  {}", self.action_line())?;
        if self.write_failures > 0 {
            writeln!(f, "  write failures: {}", self.write_failures)?;
        }
        write!(f, "{}", rule)
    }
}

// ════════════════════════════════════════════════════════════════════════════
// StatusSink
// ════════════════════════════════════════════════════════════════════════════

/// Anything that can show a status snapshot.  Must return quickly.
pub trait StatusSink {
    fn show(&mut self, status: &StatusSnapshot);
}

impl StatusSink for Vec<StatusSnapshot> {
    fn show(&mut self, status: &StatusSnapshot) { self.push(status.clone()); }
}

/// Sends each snapshot to another thread.  A closed receiver is ignored.
pub struct ChannelSink {
    tx: Sender<StatusSnapshot>,
}

impl ChannelSink {
    pub fn new(tx: Sender<StatusSnapshot>) -> Self { ChannelSink { tx } }
}

impl StatusSink for ChannelSink {
    fn show(&mut self, status: &StatusSnapshot) {
        let _ = self.tx.send(status.clone());
    }
}

/// Clear-and-redraw terminal display.
pub struct ConsoleSink;

impl StatusSink for ConsoleSink {
    fn show(&mut self, status: &StatusSnapshot) {
        let mut out = io::stdout().lock();
        // ANSI: clear screen, cursor home.
        let _ = writeln!(out, "\x1B[2J\x1B[H{}", status);
        let _ = out.flush();
    }
}

/// One log line per refresh.
pub struct LogSink;

impl StatusSink for LogSink {
    fn show(&mut self, status: &StatusSnapshot) {
        info!(
            state = %status.state,
            speed_gear = status.speed_gear,
            height_gear = status.height_gear,
            velocity = %status.velocity,
            held = ?status.held,
            "status"
        );
    }
}

// ════════════════════════════════════════════════════════════════════════════
// Tests
// ════════════════════════════════════════════════════════════════════════════
