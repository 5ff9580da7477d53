//! The robot session seam.
//!
//! The control loop talks to the robot only through [`RobotSession`].  A
//! [`SessionConnector`] opens one for a host.  Backends:
//!
//! * [`SimDog`](crate::sim::SimDog) — in-process simulation with a write
//!   journal, used by the binaries and the tests.
//! * A vendor SDK binding implements the same two traits.

use thiserror::Error;

use teleop_core::{Posture, VelocityCommand};

// ════════════════════════════════════════════════════════════════════════════
// SessionError
// ════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Error)]
pub enum SessionError {
    /// The session could not be entered.  Fatal to the caller.
    #[error("could not connect to robot at {host}: {reason}")]
    Connect { host: String, reason: String },

    /// A single write was rejected.  The session stays usable.
    #[error("{what} write rejected: {reason}")]
    Write { what: &'static str, reason: String },

    /// The session has already been left.
    #[error("session closed")]
    Closed,
}

impl SessionError {
    pub fn is_fatal(&self) -> bool {
        !matches!(self, SessionError::Write { .. })
    }
}

// ════════════════════════════════════════════════════════════════════════════
// UserMode
// ════════════════════════════════════════════════════════════════════════════

/// Controller mode on the robot side.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum UserMode {
    #[default]
    Idle,
    /// Accepts velocity and posture commands.
    Normal,
}

impl std::fmt::Display for UserMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            UserMode::Idle   => write!(f, "idle"),
            UserMode::Normal => write!(f, "normal"),
        }
    }
}

// ════════════════════════════════════════════════════════════════════════════
// Traits
// ════════════════════════════════════════════════════════════════════════════

/// An entered session with one robot.
///
/// Writes are fire-and-forget: a returned error means the write was
/// rejected, and nothing is retried here.
pub trait RobotSession: Send {
    fn set_user_mode(&mut self, mode: UserMode) -> Result<(), SessionError>;
    fn write_velocity(&mut self, cmd: VelocityCommand) -> Result<(), SessionError>;
    fn write_height(&mut self, height: f32) -> Result<(), SessionError>;
    fn write_posture(&mut self, posture: &Posture) -> Result<(), SessionError>;
    /// Close the session.  Further writes return [`SessionError::Closed`].
    fn leave(&mut self) -> Result<(), SessionError>;
}

/// Opens sessions.
pub trait SessionConnector {
    type Session: RobotSession;

    fn enter(&self, host: &str) -> Result<Self::Session, SessionError>;
}

impl<S: RobotSession + ?Sized> RobotSession for Box<S> {
    fn set_user_mode(&mut self, mode: UserMode) -> Result<(), SessionError> {
        (**self).set_user_mode(mode)
    }
    fn write_velocity(&mut self, cmd: VelocityCommand) -> Result<(), SessionError> {
        (**self).write_velocity(cmd)
    }
    fn write_height(&mut self, height: f32) -> Result<(), SessionError> {
        (**self).write_height(height)
    }
    fn write_posture(&mut self, posture: &Posture) -> Result<(), SessionError> {
        (**self).write_posture(posture)
    }
    fn leave(&mut self) -> Result<(), SessionError> {
        (**self).leave()
    }
}

// ════════════════════════════════════════════════════════════════════════════
// Tests
// ════════════════════════════════════════════════════════════════════════════
