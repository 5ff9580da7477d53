//! Simulated robot backend.
//!
//! [`SimDog`] accepts every write the real session would, keeps the last
//! commanded state, and appends each accepted call to a journal.  The
//! journal lives behind a [`SimHandle`] that the caller keeps after the
//! session itself has been moved into the control loop.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tracing::debug;

use teleop_core::{Posture, VelocityCommand};

use crate::session::{RobotSession, SessionConnector, SessionError, UserMode};

// ════════════════════════════════════════════════════════════════════════════
// SessionWrite — journal entry
// ════════════════════════════════════════════════════════════════════════════

/// One accepted session call.
#[derive(Clone, Debug, PartialEq)]
pub enum SessionWrite {
    UserMode(UserMode),
    Velocity(VelocityCommand),
    Height(f32),
    Posture(Posture),
    Leave,
}

// ════════════════════════════════════════════════════════════════════════════
// SimState / SimHandle
// ════════════════════════════════════════════════════════════════════════════

/// Last commanded state of the simulated robot.
#[derive(Clone, Debug, Default)]
pub struct SimState {
    pub open:        bool,
    pub user_mode:   UserMode,
    pub velocity:    VelocityCommand,
    pub body_height: f32,
    pub roll:        f32,
    pub pitch:       f32,
    pub yaw:         f32,
    journal:         Vec<SessionWrite>,
    fail_next:       usize,
}

/// Shared view of a simulated robot.
#[derive(Clone, Debug, Default)]
pub struct SimHandle(Arc<Mutex<SimState>>);

impl SimHandle {
    fn lock(&self) -> MutexGuard<'_, SimState> {
        self.0.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Copy of the current state.
    pub fn state(&self) -> SimState { self.lock().clone() }

    pub fn journal(&self) -> Vec<SessionWrite> { self.lock().journal.clone() }

    pub fn clear_journal(&self) { self.lock().journal.clear(); }

    pub fn velocity(&self) -> VelocityCommand { self.lock().velocity }

    pub fn body_height(&self) -> f32 { self.lock().body_height }

    pub fn is_open(&self) -> bool { self.lock().open }

    pub fn velocity_writes(&self) -> Vec<VelocityCommand> {
        self.lock().journal.iter().filter_map(|w| match w {
            SessionWrite::Velocity(v) => Some(*v),
            _ => None,
        }).collect()
    }

    pub fn height_writes(&self) -> Vec<f32> {
        self.lock().journal.iter().filter_map(|w| match w {
            SessionWrite::Height(h) => Some(*h),
            _ => None,
        }).collect()
    }

    pub fn posture_writes(&self) -> usize {
        self.lock().journal.iter()
            .filter(|w| matches!(w, SessionWrite::Posture(_)))
            .count()
    }

    /// Reject the next `n` writes with [`SessionError::Write`].
    pub fn fail_next_writes(&self, n: usize) { self.lock().fail_next = n; }
}

// ════════════════════════════════════════════════════════════════════════════
// SimConnector
// ════════════════════════════════════════════════════════════════════════════

/// Connector for [`SimDog`]s sharing one [`SimHandle`].
#[derive(Clone, Debug, Default)]
pub struct SimConnector {
    handle:      SimHandle,
    unreachable: bool,
}

impl SimConnector {
    pub fn new() -> Self { Self::default() }

    /// A connector whose `enter` always fails, as if the host were down.
    pub fn unreachable() -> Self {
        SimConnector { unreachable: true, ..Self::default() }
    }

    pub fn handle(&self) -> SimHandle { self.handle.clone() }
}

impl SessionConnector for SimConnector {
    type Session = SimDog;

    fn enter(&self, host: &str) -> Result<SimDog, SessionError> {
        if host.trim().is_empty() {
            return Err(SessionError::Connect {
                host:   host.to_string(),
                reason: "empty host".to_string(),
            });
        }
        if self.unreachable {
            return Err(SessionError::Connect {
                host:   host.to_string(),
                reason: "host unreachable".to_string(),
            });
        }
        self.handle.lock().open = true;
        debug!(host, "sim session entered");
        Ok(SimDog { host: host.to_string(), handle: self.handle.clone() })
    }
}

// ════════════════════════════════════════════════════════════════════════════
// SimDog
// ════════════════════════════════════════════════════════════════════════════

/// An entered simulated session.
#[derive(Debug)]
pub struct SimDog {
    host:   String,
    handle: SimHandle,
}

impl SimDog {
    pub fn host(&self) -> &str { &self.host }

    /// Common gate for every write: closed check, then injected failure.
    fn accept(
        &self,
        what: &'static str,
        apply: impl FnOnce(&mut SimState) -> SessionWrite,
    ) -> Result<(), SessionError> {
        let mut st = self.handle.lock();
        if !st.open {
            return Err(SessionError::Closed);
        }
        if st.fail_next > 0 {
            st.fail_next -= 1;
            return Err(SessionError::Write { what, reason: "injected failure".to_string() });
        }
        let entry = apply(&mut *st);
        debug!(host = %self.host, ?entry, "sim write");
        st.journal.push(entry);
        Ok(())
    }
}

impl RobotSession for SimDog {
    fn set_user_mode(&mut self, mode: UserMode) -> Result<(), SessionError> {
        self.accept("user mode", |st| {
            st.user_mode = mode;
            SessionWrite::UserMode(mode)
        })
    }

    fn write_velocity(&mut self, cmd: VelocityCommand) -> Result<(), SessionError> {
        self.accept("velocity", |st| {
            st.velocity = cmd;
            SessionWrite::Velocity(cmd)
        })
    }

    fn write_height(&mut self, height: f32) -> Result<(), SessionError> {
        self.accept("height", |st| {
            st.body_height = height;
            SessionWrite::Height(height)
        })
    }

    fn write_posture(&mut self, posture: &Posture) -> Result<(), SessionError> {
        let p = *posture;
        self.accept("posture", |st| {
            st.body_height = p.body_height;
            st.roll        = p.roll;
            st.pitch       = p.pitch;
            st.yaw         = p.yaw;
            st.velocity    = p.velocity();
            SessionWrite::Posture(p)
        })
    }

    fn leave(&mut self) -> Result<(), SessionError> {
        let mut st = self.handle.lock();
        if !st.open {
            return Err(SessionError::Closed);
        }
        st.open = false;
        st.journal.push(SessionWrite::Leave);
        debug!(host = %self.host, "sim session left");
        Ok(())
    }
}

// ════════════════════════════════════════════════════════════════════════════
// Tests
// ════════════════════════════════════════════════════════════════════════════
