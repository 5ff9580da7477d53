//! # teleop_core
//!
//! The input-state-to-command core of a quadruped keyboard teleop.
//! Nothing in here does I/O; the session and the input sources live in
//! `dog_session` and `dog_teleop`.
//!
//! ## Pipeline
//!
//! ```text
//!  RawKey ──binding_for──▶ InputEvent ──▶ InputState ──snapshot──▶ resolve ──▶ CommandGate
//! ```
//!
//! ## Quick start
//!
//! ```rust
//! use teleop_core::{InputState, MovementSymbol, TeleopConfig, CommandGate, resolve};
//!
//! let cfg = TeleopConfig::default();
//! let mut input = InputState::new(&cfg);
//! let mut gate = CommandGate::new(cfg.command_epsilon);
//!
//! input.press(MovementSymbol::Forward);
//! let cmd = resolve(&input.snapshot(), &cfg);
//! assert_eq!(cmd.vx, 0.8);
//!
//! if let Some(out) = gate.offer(cmd) {
//!     // session.write_velocity(out)?;
//!     gate.commit(out);
//! }
//! assert_eq!(gate.offer(cmd), None);
//! ```

pub mod binding;
pub mod config;
pub mod input;
pub mod motion;

pub use binding::{binding_for, Action, Binding, MovementSymbol, RawKey, KEY_LEGEND};
pub use config::{ConfigError, TeleopConfig};
pub use input::{HeldSet, InputEvent, InputSnapshot, InputState};
pub use motion::{resolve, should_dispatch, CommandGate, Posture, VelocityCommand};
