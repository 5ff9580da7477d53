//! # dog_teleop
//!
//! Keyboard teleoperation for a quadruped robot.  Held keys are superposed
//! into a body velocity, sent to the robot at a fixed rate, and only when it
//! changed by more than the command epsilon.
//!
//! ## Keys
//!
//! | Key | Action |
//! |---|---|
//! | `W` / `Up` | Forward |
//! | `S` / `Down` | Backward |
//! | `A` / `Left` | Strafe left |
//! | `D` / `Right` | Strafe right |
//! | `Q` / `E` | Turn left / right |
//! | `+` / `=`, `-` / `_` | Speed gear up / down |
//! | `Z` / `X` | Height gear up / down |
//! | `Space` | Emergency stop (held keys resume on the next tick) |
//! | `R` | Reset posture, gears and held keys |
//! | `Esc` | Quit |
//!
//! ## Threads
//!
//! * main: the status window ([`window::StatusWindow`]), forwarding raw keys.
//! * listener: [`listener::KeyListener`], raw keys → [`teleop_core::InputEvent`].
//! * control: [`control::ControlLoop`], the only owner of the input state
//!   and the robot session.
//!
//! Quitting, closing the window, or losing the session all end in the same
//! place: default posture, zero velocity, leave.

pub mod app;
pub mod control;
pub mod display;
pub mod error;
pub mod listener;
pub mod window;

pub use app::{drive, run, AppConfig, DEFAULT_HOST};
pub use control::{next_deadline, ControlLoop, LoopState};
pub use display::{ChannelSink, ConsoleSink, LogSink, StatusSink, StatusSnapshot};
pub use error::TeleopError;
pub use listener::{spawn_listener, InputListener, KeyInput, KeyListener, ScriptedListener};
