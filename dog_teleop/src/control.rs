//! The fixed-rate control loop.
//!
//! [`ControlLoop`] owns the [`InputState`], the [`CommandGate`], the entered
//! session and a status sink.  Input sources never touch any of it; they
//! send [`InputEvent`]s over a channel and [`ControlLoop::run`] applies them
//! between ticks.
//!
//! ```text
//!   Idle ──attach──▶ Running ──quit / listener gone / session closed──▶ Stopped
//! ```
//!
//! Each tick: snapshot → resolve → gate → velocity write → height write →
//! display refresh.  Entering `Stopped` resets posture, zeroes velocity and
//! leaves the session, exactly once.

use std::fmt;
use std::sync::mpsc::{Receiver, RecvTimeoutError};
use std::thread;
use std::time::{Duration, Instant};

use tracing::{debug, info, warn};

use dog_session::{RobotSession, SessionError, SessionGuard, UserMode};
use teleop_core::{
    resolve, Action, CommandGate, InputEvent, InputState, TeleopConfig, VelocityCommand,
};

use crate::display::{StatusSink, StatusSnapshot};

// ════════════════════════════════════════════════════════════════════════════
// LoopState
// ════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopState { Idle, Running, Stopped }

impl fmt::Display for LoopState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LoopState::Idle    => write!(f, "idle"),
            LoopState::Running => write!(f, "running"),
            LoopState::Stopped => write!(f, "stopped"),
        }
    }
}

// ════════════════════════════════════════════════════════════════════════════
// ControlLoop
// ════════════════════════════════════════════════════════════════════════════

pub struct ControlLoop<S: RobotSession, D: StatusSink> {
    cfg:   TeleopConfig,
    input: InputState,
    gate:  CommandGate,
    state: LoopState,

    // ── session ─────────────────────────────────────────────────────────
    session:        Option<SessionGuard<S>>,
    /// Height last accepted by the robot; `None` forces a write.
    last_height:    Option<f32>,
    /// Height set by the last posture reset; the gear height takes over
    /// again once the height gear moves.
    posture_height: Option<f32>,
    write_failures: u64,

    // ── display ─────────────────────────────────────────────────────────
    sink:          D,
    state_changed: bool,
    last_refresh:  Option<Instant>,
}

impl<S: RobotSession, D: StatusSink> ControlLoop<S, D> {
    pub fn new(cfg: TeleopConfig, sink: D) -> Self {
        ControlLoop {
            input: InputState::new(&cfg),
            gate:  CommandGate::new(cfg.command_epsilon),
            state: LoopState::Idle,
            session:        None,
            last_height:    None,
            posture_height: None,
            write_failures: 0,
            sink,
            state_changed: false,
            last_refresh:  None,
            cfg,
        }
    }

    // ── lifecycle ───────────────────────────────────────────────────────

    /// Take an entered session: select normal mode, wait for the robot to
    /// settle, render the first status and start running.
    ///
    /// On error the session is still reset and left (via its guard).
    pub fn attach(&mut self, session: S) -> Result<(), SessionError> {
        let mut guard = SessionGuard::new(session, self.cfg.default_posture);
        if self.state != LoopState::Idle {
            return Err(SessionError::Closed);
        }
        guard.session_mut().set_user_mode(UserMode::Normal)?;
        info!("user mode set to normal");

        if !self.cfg.settle().is_zero() {
            thread::sleep(self.cfg.settle());
        }

        self.session = Some(guard);
        self.state = LoopState::Running;
        self.refresh(Instant::now());
        Ok(())
    }

    /// Enter `Stopped`: final posture reset, zero velocity, leave.
    /// Calling it again does nothing.
    pub fn stop(&mut self) {
        if self.state == LoopState::Stopped {
            return;
        }
        self.state = LoopState::Stopped;
        if let Some(mut guard) = self.session.take() {
            if let Err(e) = guard.shutdown() {
                warn!("final reset failed: {}", e);
            }
        }
        self.gate.clear();
        info!("control loop stopped");
        self.refresh(Instant::now());
    }

    // ── events ──────────────────────────────────────────────────────────

    /// Apply one input event.  Ignored once stopped.
    pub fn handle_event(&mut self, event: InputEvent) {
        if self.state == LoopState::Stopped {
            return;
        }
        match event {
            InputEvent::Press(sym)      => self.input.press(sym),
            InputEvent::Release(sym)    => self.input.release(sym),
            InputEvent::Action(action)  => self.handle_action(action),
        }
    }

    fn handle_action(&mut self, action: Action) {
        debug!(action = action.name(), "action");
        match action {
            Action::SpeedUp    => self.state_changed |= self.input.adjust_speed(1),
            Action::SpeedDown  => self.state_changed |= self.input.adjust_speed(-1),
            Action::HeightUp   => self.step_height(1),
            Action::HeightDown => self.step_height(-1),
            Action::EmergencyStop => self.emergency_stop(),
            Action::ResetPosture  => self.reset_posture(),
            Action::Quit          => self.stop(),
        }
    }

    fn step_height(&mut self, delta: i32) {
        if self.input.adjust_height(delta) {
            self.posture_height = None;
            self.state_changed = true;
        }
    }

    /// Height the robot should be at: the reset posture's until the gear
    /// moves, the gear's otherwise.
    pub fn current_height(&self) -> f32 {
        self.posture_height
            .unwrap_or_else(|| self.cfg.height_for(self.input.height_gear()))
    }

    /// Zero the velocity now.  Held keys are left alone, so a key that is
    /// still down resumes motion on the next tick.
    pub fn emergency_stop(&mut self) {
        info!("emergency stop");
        self.gate.clear();
        self.state_changed = true;
        if let Some(Err(e)) = self.with_session(|s| s.write_velocity(VelocityCommand::ZERO)) {
            self.gate.invalidate();
            self.report("emergency stop", e);
        }
    }

    /// Write the default posture, clear held keys, restore default gears.
    pub fn reset_posture(&mut self) {
        info!("reset posture");
        let posture = self.cfg.default_posture;
        self.input.reset();
        self.gate.clear();
        self.posture_height = Some(posture.body_height);
        self.state_changed = true;
        match self.with_session(|s| s.write_posture(&posture)) {
            Some(Ok(()))  => self.last_height = Some(posture.body_height),
            Some(Err(e))  => {
                self.gate.invalidate();
                self.last_height = None;
                self.report("reset posture", e);
            }
            None => {}
        }
    }

    // ── tick ────────────────────────────────────────────────────────────

    /// One control period.  Does nothing unless running.
    pub fn tick(&mut self, now: Instant) {
        if self.state != LoopState::Running {
            return;
        }

        let snapshot = self.input.snapshot();
        let cmd = resolve(&snapshot, &self.cfg);

        if let Some(out) = self.gate.offer(cmd) {
            match self.with_session(|s| s.write_velocity(out)) {
                Some(Ok(())) => {
                    debug!(%out, "velocity dispatched");
                    self.gate.commit(out);
                    self.state_changed = true;
                }
                Some(Err(e)) => self.report("velocity", e),
                None => {}
            }
        }
        if self.state != LoopState::Running {
            return;
        }

        let height = self.current_height();
        if self.last_height != Some(height) {
            match self.with_session(|s| s.write_height(height)) {
                Some(Ok(()))  => self.last_height = Some(height),
                Some(Err(e))  => self.report("height", e),
                None => {}
            }
        }
        if self.state != LoopState::Running {
            return;
        }

        let due = self.last_refresh
            .map_or(true, |t| now.saturating_duration_since(t) >= self.cfg.refresh_period());
        if due || self.state_changed {
            self.refresh(now);
        }
    }

    /// Drive the loop until it stops.
    ///
    /// Events are drained between ticks; the wait for the next tick is a
    /// `recv_timeout` on `events`, so a quit is seen within one period.
    /// Missed ticks are skipped.  A closed channel stops the loop.
    pub fn run(&mut self, events: &Receiver<InputEvent>) {
        let period = self.cfg.tick_period();
        let mut next_tick = Instant::now();

        while self.state == LoopState::Running {
            loop {
                let now = Instant::now();
                if now >= next_tick {
                    break;
                }
                match events.recv_timeout(next_tick - now) {
                    Ok(event) => {
                        self.handle_event(event);
                        if self.state != LoopState::Running {
                            return;
                        }
                    }
                    Err(RecvTimeoutError::Timeout) => break,
                    Err(RecvTimeoutError::Disconnected) => {
                        info!("input source closed");
                        self.stop();
                        return;
                    }
                }
            }

            let now = Instant::now();
            self.tick(now);
            next_tick = next_deadline(next_tick, now, period);
        }
    }

    // ── helpers ─────────────────────────────────────────────────────────

    fn with_session<T>(
        &mut self,
        f: impl FnOnce(&mut S) -> Result<T, SessionError>,
    ) -> Option<Result<T, SessionError>> {
        self.session.as_mut().map(|g| f(g.session_mut()))
    }

    /// Log a failed write.  A fatal error means the session is gone.
    fn report(&mut self, what: &str, e: SessionError) {
        self.write_failures += 1;
        self.state_changed = true;
        if e.is_fatal() {
            warn!("{} failed, session lost: {}", what, e);
            self.stop();
        } else {
            warn!("{} failed: {}", what, e);
        }
    }

    fn refresh(&mut self, now: Instant) {
        let status = self.status();
        self.sink.show(&status);
        self.state_changed = false;
        self.last_refresh = Some(now);
    }

    // ── accessors ───────────────────────────────────────────────────────

    pub fn status(&self) -> StatusSnapshot {
        let snap = self.input.snapshot();
        StatusSnapshot {
            state:          self.state,
            held:           snap.held.iter().map(|s| s.name()).collect(),
            speed_gear:     snap.speed_gear,
            speed_gears:    self.input.speed_gears(),
            speed:          self.cfg.speed_for(snap.speed_gear),
            height_gear:    snap.height_gear,
            height_gears:   self.input.height_gears(),
            height:         self.current_height(),
            velocity:       self.gate.last(),
            write_failures: self.write_failures,
        }
    }

    pub fn state(&self)           -> LoopState        { self.state }
    pub fn input(&self)           -> &InputState      { &self.input }
    pub fn last_dispatched(&self) -> VelocityCommand  { self.gate.last() }
    pub fn last_height(&self)     -> Option<f32>      { self.last_height }
    pub fn write_failures(&self)  -> u64              { self.write_failures }
    pub fn sink(&self)            -> &D               { &self.sink }
}

/// Next tick boundary after `prev`.  If `now` is already past it, whole
/// periods are skipped rather than replayed.
pub fn next_deadline(prev: Instant, now: Instant, period: Duration) -> Instant {
    let next = prev + period;
    if next > now {
        return next;
    }
    let behind = now.duration_since(prev).as_nanos();
    let skipped = (behind / period.as_nanos().max(1)) as u32;
    prev + period * (skipped + 1)
}

// ════════════════════════════════════════════════════════════════════════════
// Tests
// ════════════════════════════════════════════════════════════════════════════

#[cfg(test)]
mod tests {
    use super::*;
    use dog_session::{SessionConnector, SessionWrite, SimConnector, SimHandle};
    use std::sync::mpsc;
    use teleop_core::{MovementSymbol::*, Posture};

    type TestLoop = ControlLoop<dog_session::SimDog, Vec<StatusSnapshot>>;

    fn test_config() -> TeleopConfig {
        TeleopConfig { settle_ms: 0, tick_period_ms: 10, ..TeleopConfig::default() }
    }

    fn running() -> (TestLoop, SimHandle) {
        let connector = SimConnector::new();
        let handle = connector.handle();
        let mut lp = ControlLoop::new(test_config(), Vec::new());
        lp.attach(connector.enter("sim").unwrap()).unwrap();
        (lp, handle)
    }

    fn approx(a: VelocityCommand, b: VelocityCommand) -> bool {
        (a.vx - b.vx).abs() < 1e-6 && (a.vy - b.vy).abs() < 1e-6 && (a.wz - b.wz).abs() < 1e-6
    }

    #[test]
    fn starts_idle_and_ignores_ticks() {
        let mut lp: TestLoop = ControlLoop::new(test_config(), Vec::new());
        assert_eq!(lp.state(), LoopState::Idle);
        lp.handle_event(InputEvent::Press(Forward));
        lp.tick(Instant::now());
        assert!(lp.sink().is_empty());
        assert!(lp.last_dispatched().is_zero());
    }

    #[test]
    fn attach_sets_normal_mode_and_renders_once() {
        let (lp, handle) = running();
        assert_eq!(lp.state(), LoopState::Running);
        assert_eq!(handle.journal(), vec![SessionWrite::UserMode(UserMode::Normal)]);
        assert_eq!(lp.sink().len(), 1);
        assert_eq!(lp.sink()[0].state, LoopState::Running);
    }

    #[test]
    fn failed_mode_write_still_leaves_the_session() {
        let connector = SimConnector::new();
        let handle = connector.handle();
        let session = connector.enter("sim").unwrap();
        handle.fail_next_writes(1);

        let mut lp: TestLoop = ControlLoop::new(test_config(), Vec::new());
        assert!(lp.attach(session).is_err());
        assert_eq!(lp.state(), LoopState::Idle);
        assert!(!handle.is_open());
    }

    #[test]
    fn forward_then_strafe_right_dispatches_both() {
        let (mut lp, handle) = running();
        let t0 = Instant::now();

        lp.handle_event(InputEvent::Press(Forward));
        lp.tick(t0);
        lp.handle_event(InputEvent::Release(Forward));
        lp.handle_event(InputEvent::Press(StrafeRight));
        lp.tick(t0 + Duration::from_millis(50));

        let v = handle.velocity_writes();
        assert_eq!(v.len(), 2);
        assert!(approx(v[0], VelocityCommand::new(0.8, 0.0, 0.0)));
        assert!(approx(v[1], VelocityCommand::new(0.0, -0.8, 0.0)));
    }

    #[test]
    fn unchanged_command_is_not_resent() {
        let (mut lp, handle) = running();
        let t0 = Instant::now();
        lp.handle_event(InputEvent::Press(TurnLeft));
        for i in 0..5 {
            lp.tick(t0 + Duration::from_millis(50 * i));
        }
        assert_eq!(handle.velocity_writes().len(), 1);
    }

    #[test]
    fn idle_ticks_send_no_velocity() {
        let (mut lp, handle) = running();
        let t0 = Instant::now();
        for i in 0..3 {
            lp.tick(t0 + Duration::from_millis(50 * i));
        }
        assert!(handle.velocity_writes().is_empty());
    }

    #[test]
    fn height_written_once_then_only_on_change() {
        let (mut lp, handle) = running();
        let t0 = Instant::now();
        lp.tick(t0);
        lp.tick(t0 + Duration::from_millis(50));
        assert_eq!(handle.height_writes(), vec![0.25]);

        lp.handle_event(InputEvent::Action(Action::HeightUp));
        lp.tick(t0 + Duration::from_millis(100));
        lp.tick(t0 + Duration::from_millis(150));
        assert_eq!(handle.height_writes(), vec![0.25, 0.30]);
    }

    #[test]
    fn height_up_three_times_saturates() {
        let (mut lp, handle) = running();
        for _ in 0..3 {
            lp.handle_event(InputEvent::Action(Action::HeightUp));
        }
        assert_eq!(lp.input().height_gear(), 4);
        lp.tick(Instant::now());
        assert_eq!(handle.body_height(), 0.35);
    }

    #[test]
    fn speed_gear_changes_resolved_magnitude() {
        let (mut lp, handle) = running();
        let t0 = Instant::now();
        lp.handle_event(InputEvent::Press(Forward));
        lp.handle_event(InputEvent::Action(Action::SpeedUp));
        lp.tick(t0);
        assert!(approx(handle.velocity(), VelocityCommand::new(1.2, 0.0, 0.0)));

        for _ in 0..10 {
            lp.handle_event(InputEvent::Action(Action::SpeedDown));
        }
        lp.tick(t0 + Duration::from_millis(50));
        assert!(approx(handle.velocity(), VelocityCommand::new(0.2, 0.0, 0.0)));
    }

    #[test]
    fn emergency_stop_clears_command_not_keys() {
        let (mut lp, handle) = running();
        let t0 = Instant::now();
        lp.handle_event(InputEvent::Press(Forward));
        lp.tick(t0);

        lp.handle_event(InputEvent::Action(Action::EmergencyStop));
        assert!(lp.last_dispatched().is_zero());
        assert!(handle.velocity().is_zero());
        assert!(lp.input().is_held(Forward));

        // Key still held: motion resumes on the next tick.
        lp.tick(t0 + Duration::from_millis(50));
        assert!(approx(handle.velocity(), VelocityCommand::new(0.8, 0.0, 0.0)));
    }

    #[test]
    fn emergency_stop_after_release_stays_stopped() {
        let (mut lp, handle) = running();
        let t0 = Instant::now();
        lp.handle_event(InputEvent::Press(Forward));
        lp.tick(t0);
        lp.handle_event(InputEvent::Release(Forward));
        lp.handle_event(InputEvent::Action(Action::EmergencyStop));
        let before = handle.velocity_writes().len();

        lp.tick(t0 + Duration::from_millis(50));
        assert_eq!(handle.velocity_writes().len(), before);
        assert!(handle.velocity().is_zero());
    }

    #[test]
    fn reset_posture_clears_state_and_writes_one_posture() {
        let (mut lp, handle) = running();
        let t0 = Instant::now();
        lp.handle_event(InputEvent::Press(Forward));
        lp.handle_event(InputEvent::Press(TurnLeft));
        lp.handle_event(InputEvent::Action(Action::SpeedUp));
        lp.handle_event(InputEvent::Action(Action::HeightDown));
        lp.tick(t0);

        lp.handle_event(InputEvent::Action(Action::ResetPosture));

        let snap = lp.input().snapshot();
        assert!(snap.held.is_empty());
        assert_eq!((snap.speed_gear, snap.height_gear), (2, 2));
        assert!(lp.last_dispatched().is_zero());
        assert_eq!(handle.posture_writes(), 1);
        assert!(handle.journal().contains(&SessionWrite::Posture(Posture::default())));
    }

    #[test]
    fn reset_height_holds_until_the_gear_moves() {
        let (mut lp, handle) = running();
        let t0 = Instant::now();
        lp.handle_event(InputEvent::Action(Action::ResetPosture));
        assert_eq!(lp.last_height(), Some(0.23));

        lp.tick(t0);
        lp.tick(t0 + Duration::from_millis(50));
        assert!(handle.height_writes().is_empty());
        assert_eq!(handle.body_height(), 0.23);
        assert_eq!(lp.status().height, 0.23);

        lp.handle_event(InputEvent::Action(Action::HeightUp));
        lp.tick(t0 + Duration::from_millis(100));
        assert_eq!(handle.height_writes(), vec![0.30]);
        assert_eq!(lp.current_height(), 0.30);
    }

    #[test]
    fn saturated_height_press_keeps_the_reset_height() {
        let connector = SimConnector::new();
        let handle = connector.handle();
        let cfg = TeleopConfig { default_height_gear: 4, ..test_config() };
        let mut lp: TestLoop = ControlLoop::new(cfg, Vec::new());
        lp.attach(connector.enter("sim").unwrap()).unwrap();

        lp.handle_event(InputEvent::Action(Action::ResetPosture));
        lp.handle_event(InputEvent::Action(Action::HeightUp));
        lp.tick(Instant::now());

        assert_eq!(lp.input().height_gear(), 4);
        assert_eq!(lp.current_height(), 0.23);
        assert!(handle.height_writes().is_empty());
    }

    #[test]
    fn release_of_unheld_key_is_harmless() {
        let (mut lp, handle) = running();
        lp.handle_event(InputEvent::Release(Backward));
        lp.tick(Instant::now());
        assert!(handle.velocity_writes().is_empty());
        assert_eq!(lp.write_failures(), 0);
    }

    #[test]
    fn quit_performs_final_reset_exactly_once() {
        let (mut lp, handle) = running();
        lp.handle_event(InputEvent::Press(Forward));
        lp.tick(Instant::now());
        handle.clear_journal();

        lp.handle_event(InputEvent::Action(Action::Quit));
        lp.stop();
        lp.handle_event(InputEvent::Action(Action::ResetPosture));
        lp.tick(Instant::now());

        assert_eq!(lp.state(), LoopState::Stopped);
        assert_eq!(
            handle.journal(),
            vec![
                SessionWrite::Posture(Posture::default()),
                SessionWrite::Velocity(VelocityCommand::ZERO),
                SessionWrite::Leave,
            ]
        );
        assert_eq!(lp.sink().last().map(|s| s.state), Some(LoopState::Stopped));
    }

    #[test]
    fn dropping_the_loop_resets_the_robot() {
        let (mut lp, handle) = running();
        lp.handle_event(InputEvent::Press(Forward));
        lp.tick(Instant::now());
        drop(lp);
        assert_eq!(handle.posture_writes(), 1);
        assert!(handle.velocity().is_zero());
        assert!(!handle.is_open());
    }

    #[test]
    fn failed_velocity_write_is_retried_next_tick() {
        let (mut lp, handle) = running();
        let t0 = Instant::now();
        lp.tick(t0);
        lp.handle_event(InputEvent::Press(Forward));

        handle.fail_next_writes(1);
        lp.tick(t0 + Duration::from_millis(50));
        assert_eq!(lp.state(), LoopState::Running);
        assert_eq!(lp.write_failures(), 1);
        assert!(lp.last_dispatched().is_zero());
        assert!(lp.input().is_held(Forward));

        lp.tick(t0 + Duration::from_millis(100));
        assert!(approx(handle.velocity(), VelocityCommand::new(0.8, 0.0, 0.0)));
        assert!(approx(lp.last_dispatched(), VelocityCommand::new(0.8, 0.0, 0.0)));
    }

    #[test]
    fn failed_height_write_is_retried_next_tick() {
        let (mut lp, handle) = running();
        let t0 = Instant::now();
        handle.fail_next_writes(1);
        lp.tick(t0);
        assert_eq!(lp.last_height(), None);
        lp.tick(t0 + Duration::from_millis(50));
        assert_eq!(handle.height_writes(), vec![0.25]);
    }

    #[test]
    fn failed_stop_write_resends_zero() {
        let (mut lp, handle) = running();
        let t0 = Instant::now();
        lp.handle_event(InputEvent::Press(Forward));
        lp.tick(t0);
        lp.handle_event(InputEvent::Release(Forward));

        handle.fail_next_writes(1);
        lp.handle_event(InputEvent::Action(Action::EmergencyStop));
        assert!(approx(handle.velocity(), VelocityCommand::new(0.8, 0.0, 0.0)));

        lp.tick(t0 + Duration::from_millis(50));
        assert!(handle.velocity().is_zero());
    }

    #[test]
    fn closed_session_stops_the_loop() {
        let connector = SimConnector::new();
        let handle = connector.handle();
        let mut lp: TestLoop = ControlLoop::new(test_config(), Vec::new());
        lp.attach(connector.enter("sim").unwrap()).unwrap();

        // Another client tears down the shared session.
        connector.enter("sim").unwrap().leave().unwrap();

        lp.handle_event(InputEvent::Press(Forward));
        lp.tick(Instant::now());

        assert_eq!(lp.state(), LoopState::Stopped);
        assert_eq!(lp.write_failures(), 1);
        assert!(handle.velocity_writes().is_empty());
        assert_eq!(lp.sink().last().map(|s| s.state), Some(LoopState::Stopped));
    }

    #[test]
    fn display_refresh_is_rate_limited() {
        let (mut lp, _handle) = running();
        let t0 = Instant::now();
        lp.tick(t0);
        let after_first = lp.sink().len();

        // Nothing changes: no refresh until 200 ms have passed.
        lp.tick(t0 + Duration::from_millis(50));
        lp.tick(t0 + Duration::from_millis(100));
        assert_eq!(lp.sink().len(), after_first);

        lp.tick(t0 + Duration::from_millis(250));
        assert_eq!(lp.sink().len(), after_first + 1);
    }

    #[test]
    fn gear_change_forces_refresh() {
        let (mut lp, _handle) = running();
        let t0 = Instant::now();
        lp.tick(t0);
        let n = lp.sink().len();

        lp.handle_event(InputEvent::Action(Action::SpeedUp));
        lp.tick(t0 + Duration::from_millis(50));
        assert_eq!(lp.sink().len(), n + 1);
        assert_eq!(lp.sink().last().unwrap().speed_gear, 3);
    }

    #[test]
    fn saturated_gear_does_not_force_refresh() {
        let (mut lp, _handle) = running();
        let t0 = Instant::now();
        for _ in 0..3 {
            lp.handle_event(InputEvent::Action(Action::SpeedUp));
        }
        lp.tick(t0);
        let n = lp.sink().len();

        lp.handle_event(InputEvent::Action(Action::SpeedUp));
        lp.tick(t0 + Duration::from_millis(50));
        assert_eq!(lp.sink().len(), n);
    }

    #[test]
    fn run_stops_on_quit_event() {
        let (mut lp, handle) = running();
        let (tx, rx) = mpsc::channel();
        tx.send(InputEvent::Press(Forward)).unwrap();
        tx.send(InputEvent::Action(Action::Quit)).unwrap();

        lp.run(&rx);

        assert_eq!(lp.state(), LoopState::Stopped);
        assert_eq!(handle.posture_writes(), 1);
        assert!(!handle.is_open());
    }

    #[test]
    fn run_stops_when_listener_disconnects() {
        let (mut lp, handle) = running();
        let (tx, rx) = mpsc::channel::<InputEvent>();
        drop(tx);

        lp.run(&rx);

        assert_eq!(lp.state(), LoopState::Stopped);
        assert_eq!(handle.posture_writes(), 1);
        assert!(handle.velocity().is_zero());
    }

    #[test]
    fn run_dispatches_held_key_between_events() {
        let (mut lp, handle) = running();
        let (tx, rx) = mpsc::channel();
        let feeder = thread::spawn(move || {
            tx.send(InputEvent::Press(Forward)).unwrap();
            thread::sleep(Duration::from_millis(60));
            tx.send(InputEvent::Release(Forward)).unwrap();
            thread::sleep(Duration::from_millis(60));
            tx.send(InputEvent::Action(Action::Quit)).unwrap();
        });

        lp.run(&rx);
        feeder.join().unwrap();

        let v = handle.velocity_writes();
        assert!(v.iter().any(|c| approx(*c, VelocityCommand::new(0.8, 0.0, 0.0))), "{:?}", v);
        assert_eq!(v.last(), Some(&VelocityCommand::ZERO));
        assert_eq!(lp.state(), LoopState::Stopped);
    }

    #[test]
    fn deadline_advances_by_one_period_when_on_time() {
        let t0 = Instant::now();
        let p = Duration::from_millis(50);
        assert_eq!(next_deadline(t0, t0 + Duration::from_millis(5), p), t0 + p);
    }

    #[test]
    fn deadline_skips_missed_ticks() {
        let t0 = Instant::now();
        let p = Duration::from_millis(50);
        // 170 ms late: ticks at 50, 100, 150 are skipped, next is 200.
        let next = next_deadline(t0, t0 + Duration::from_millis(170), p);
        assert_eq!(next, t0 + Duration::from_millis(200));
        // Exactly on a boundary also moves past it.
        let next = next_deadline(t0, t0 + Duration::from_millis(100), p);
        assert_eq!(next, t0 + Duration::from_millis(150));
    }
}
