//! Velocity resolution and command debouncing.
//!
//! * [`resolve`] turns an [`InputSnapshot`] into a [`VelocityCommand`] by
//!   superposing the unit contribution of every held key.
//! * [`CommandGate`] drops commands that do not differ from the last one
//!   sent by more than an epsilon on some axis.

use crate::config::TeleopConfig;
use crate::input::InputSnapshot;

// ════════════════════════════════════════════════════════════════════════════
// VelocityCommand
// ════════════════════════════════════════════════════════════════════════════

/// Body-frame velocity: forward `vx` and left `vy` in m/s, yaw rate `wz` in rad/s.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct VelocityCommand {
    pub vx: f32,
    pub vy: f32,
    pub wz: f32,
}

impl VelocityCommand {
    pub const ZERO: VelocityCommand = VelocityCommand { vx: 0.0, vy: 0.0, wz: 0.0 };

    pub fn new(vx: f32, vy: f32, wz: f32) -> Self { VelocityCommand { vx, vy, wz } }

    pub fn is_zero(&self) -> bool { *self == VelocityCommand::ZERO }
}

impl std::fmt::Display for VelocityCommand {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "vx={:.2}, vy={:.2}, wz={:.2}", self.vx, self.vy, self.wz)
    }
}

// ════════════════════════════════════════════════════════════════════════════
// Posture
// ════════════════════════════════════════════════════════════════════════════

/// Full posture record written by a reset.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Posture {
    pub body_height: f32,
    pub roll:        f32,
    pub pitch:       f32,
    pub yaw:         f32,
    pub vx:          f32,
    pub vy:          f32,
    pub wz:          f32,
}

impl Default for Posture {
    fn default() -> Self {
        Posture {
            body_height: 0.23,
            roll:  0.0,
            pitch: 0.0,
            yaw:   0.0,
            vx:    0.0,
            vy:    0.0,
            wz:    0.0,
        }
    }
}

impl Posture {
    /// Velocity part of the record.
    pub fn velocity(&self) -> VelocityCommand {
        VelocityCommand::new(self.vx, self.vy, self.wz)
    }
}

// ════════════════════════════════════════════════════════════════════════════
// resolve
// ════════════════════════════════════════════════════════════════════════════

/// Sum the contributions of every held key.
///
/// Linear axes scale by the active speed gear's magnitude, yaw by
/// `max_turn_rate`.  Opposing keys cancel exactly; nothing is normalized or
/// clamped.
pub fn resolve(snapshot: &InputSnapshot, cfg: &TeleopConfig) -> VelocityCommand {
    let speed = cfg.speed_for(snapshot.speed_gear);
    let mut cmd = VelocityCommand::ZERO;
    for sym in snapshot.held.iter() {
        let (dvx, dvy, dwz) = sym.unit();
        cmd.vx += dvx * speed;
        cmd.vy += dvy * speed;
        cmd.wz += dwz * cfg.max_turn_rate;
    }
    cmd
}

// ════════════════════════════════════════════════════════════════════════════
// CommandGate
// ════════════════════════════════════════════════════════════════════════════

/// True iff some axis of `next` differs from `prev` by strictly more than `epsilon`.
pub fn should_dispatch(prev: &VelocityCommand, next: &VelocityCommand, epsilon: f32) -> bool {
    (next.vx - prev.vx).abs() > epsilon
        || (next.vy - prev.vy).abs() > epsilon
        || (next.wz - prev.wz).abs() > epsilon
}

/// Remembers the last dispatched command and filters redundant ones.
///
/// `last` is `None` when the robot's state is unknown (a stop or reset write
/// failed); the next offer then always dispatches.
#[derive(Clone, Copy, Debug)]
pub struct CommandGate {
    last:    Option<VelocityCommand>,
    epsilon: f32,
}

impl CommandGate {
    pub fn new(epsilon: f32) -> Self {
        CommandGate { last: Some(VelocityCommand::ZERO), epsilon }
    }

    /// The most recent command that went out (zero if unknown).
    pub fn last(&self) -> VelocityCommand { self.last.unwrap_or(VelocityCommand::ZERO) }

    /// Returns `Some(next)` when it should be sent.
    ///
    /// The gate does not record it; call [`commit`](Self::commit) once the
    /// write has actually succeeded so a failed write is retried next tick.
    pub fn offer(&self, next: VelocityCommand) -> Option<VelocityCommand> {
        match self.last {
            Some(prev) => should_dispatch(&prev, &next, self.epsilon).then_some(next),
            None       => Some(next),
        }
    }

    /// Record `cmd` as dispatched.
    pub fn commit(&mut self, cmd: VelocityCommand) { self.last = Some(cmd); }

    /// Back to zero (start, emergency stop, reset).
    pub fn clear(&mut self) { self.last = Some(VelocityCommand::ZERO); }

    /// Forget what the robot was told; the next offer dispatches unconditionally.
    pub fn invalidate(&mut self) { self.last = None; }
}

// ════════════════════════════════════════════════════════════════════════════
// Tests
// ════════════════════════════════════════════════════════════════════════════
