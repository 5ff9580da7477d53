//! Scoped session ownership with a guaranteed final reset.
//!
//! [`SessionGuard`] owns an entered session.  Leaving it (explicitly via
//! [`shutdown`](SessionGuard::shutdown) or implicitly on drop) writes the
//! default posture, then a zero velocity, then leaves the session, exactly
//! once.

use tracing::{info, warn};

use teleop_core::{Posture, VelocityCommand};

use crate::session::{RobotSession, SessionError};

pub struct SessionGuard<S: RobotSession> {
    session:  S,
    posture:  Posture,
    released: bool,
}

impl<S: RobotSession> SessionGuard<S> {
    /// Take ownership of an entered session.  `posture` is what gets
    /// written on the way out.
    pub fn new(session: S, posture: Posture) -> Self {
        SessionGuard { session, posture, released: false }
    }

    /// Mutable access for regular writes.
    pub fn session_mut(&mut self) -> &mut S { &mut self.session }

    pub fn is_released(&self) -> bool { self.released }

    /// Reset posture, zero velocity, leave.  Later calls do nothing.
    ///
    /// Every step is attempted even if an earlier one fails; the first
    /// error is returned.
    pub fn shutdown(&mut self) -> Result<(), SessionError> {
        if self.released {
            return Ok(());
        }
        self.released = true;
        info!("resetting posture and leaving session");

        let posture = self.session.write_posture(&self.posture);
        let zero    = self.session.write_velocity(VelocityCommand::ZERO);
        let leave   = self.session.leave();
        posture.and(zero).and(leave)
    }
}

impl<S: RobotSession> Drop for SessionGuard<S> {
    fn drop(&mut self) {
        if let Err(e) = self.shutdown() {
            warn!("final reset failed: {}", e);
        }
    }
}

// ════════════════════════════════════════════════════════════════════════════
// Tests
// ════════════════════════════════════════════════════════════════════════════
