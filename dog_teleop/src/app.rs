//! Top-level wiring.
//!
//! Windowed mode: the status window runs on the main thread (minifb needs
//! it), the [`ControlLoop`] on its own thread.  They share only the key
//! channel (window → loop, through a [`KeyListener`]) and the status
//! channel (loop → window).
//!
//! Headless mode: a [`ScriptedListener`] tour drives the loop and the
//! status goes to the terminal (or the log when stdout is not one).

use std::io::{self, IsTerminal};
use std::sync::mpsc;
use std::thread;
use std::time::Duration;

use tracing::info;

use dog_session::{SessionConnector, SessionError};
use teleop_core::TeleopConfig;

use crate::control::ControlLoop;
use crate::display::{ChannelSink, ConsoleSink, LogSink, StatusSink, StatusSnapshot};
use crate::error::TeleopError;
use crate::listener::{spawn_listener, InputListener, KeyInput, KeyListener, ScriptedListener};
use crate::window::StatusWindow;

pub const DEFAULT_HOST: &str = "192.168.118.29";

// ════════════════════════════════════════════════════════════════════════════
// AppConfig
// ════════════════════════════════════════════════════════════════════════════

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub host:      String,
    pub teleop:    TeleopConfig,
    /// No window: replay the scripted tour and print status to the terminal.
    pub headless:  bool,
    /// Hold time of each movement in the headless tour.
    pub tour_pace: Duration,
}

impl Default for AppConfig {
    fn default() -> Self {
        AppConfig {
            host:      DEFAULT_HOST.to_string(),
            teleop:    TeleopConfig::default(),
            headless:  false,
            tour_pace: Duration::from_millis(600),
        }
    }
}

// ════════════════════════════════════════════════════════════════════════════
// run() — entry point from main.rs
// ════════════════════════════════════════════════════════════════════════════

pub fn run<C>(cfg: AppConfig, connector: &C) -> Result<(), TeleopError>
where
    C: SessionConnector,
    C::Session: 'static,
{
    cfg.teleop.validate()?;
    if cfg.headless {
        let tour = ScriptedListener::tour(cfg.tour_pace);
        // Redrawing only makes sense on a terminal; otherwise log each refresh.
        if io::stdout().is_terminal() {
            drive(&cfg, connector, tour, ConsoleSink)?;
        } else {
            drive(&cfg, connector, tour, LogSink)?;
        }
        Ok(())
    } else {
        run_windowed(cfg, connector)
    }
}

/// Enter the session, attach it and run the loop on this thread until it
/// stops.  Returns the stopped loop.
pub fn drive<C, L, D>(
    cfg:       &AppConfig,
    connector: &C,
    listener:  L,
    sink:      D,
) -> Result<ControlLoop<C::Session, D>, TeleopError>
where
    C: SessionConnector,
    L: InputListener,
    D: StatusSink,
{
    let session = connector.enter(&cfg.host)?;
    info!(host = %cfg.host, "session entered");

    let events = spawn_listener(listener);
    let mut control = ControlLoop::new(cfg.teleop.clone(), sink);
    control.attach(session)?;
    control.run(&events);
    Ok(control)
}

fn run_windowed<C>(cfg: AppConfig, connector: &C) -> Result<(), TeleopError>
where
    C: SessionConnector,
    C::Session: 'static,
{
    // ── Window first, so a display failure never leaves a session open ──
    let (key_tx, key_rx) = mpsc::channel::<KeyInput>();
    let (status_tx, status_rx) = mpsc::channel::<StatusSnapshot>();
    let mut window = StatusWindow::new(key_tx, status_rx).map_err(TeleopError::Window)?;
    window.render();

    let session = connector.enter(&cfg.host)?;
    info!(host = %cfg.host, "session entered");

    // ── Control loop thread ───────────────────────────────────────────────
    let events = spawn_listener(KeyListener::new(key_rx));
    let teleop = cfg.teleop;
    let control = thread::spawn(move || -> Result<(), SessionError> {
        let mut control = ControlLoop::new(teleop, ChannelSink::new(status_tx));
        control.attach(session)?;
        control.run(&events);
        Ok(())
    });

    // ── Main loop ─────────────────────────────────────────────────────────
    while window.is_open() && !window.loop_finished() {
        if !window.poll_input() { break; }
        window.render();
    }
    window.render();

    // Closing the key channel ends the loop if nothing else did.
    drop(window);
    control.join().map_err(|_| TeleopError::LoopPanicked)??;
    info!("teleop finished");
    Ok(())
}

// ════════════════════════════════════════════════════════════════════════════
// Tests
// ════════════════════════════════════════════════════════════════════════════
