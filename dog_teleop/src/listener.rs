//! Input sources.
//!
//! The public interface is [`InputEvent`] delivered over a `mpsc` channel.
//! The control loop doesn't know whether events came from the status window
//! or a script.

use std::sync::mpsc::{self, Receiver, Sender};
use std::thread;
use std::time::Duration;

use tracing::debug;

use teleop_core::{Action, HeldSet, InputEvent, MovementSymbol, RawKey};

// ════════════════════════════════════════════════════════════════════════════
// InputListener trait
// ════════════════════════════════════════════════════════════════════════════

/// Anything that can deliver [`InputEvent`]s over a channel.
///
/// `run` returns when the source is exhausted or the receiver is gone;
/// dropping `tx` is how the control loop learns the source has ended.
pub trait InputListener: Send + 'static {
    fn run(self: Box<Self>, tx: Sender<InputEvent>);
}

/// Spawn a listener on its own thread and return the receiving end.
pub fn spawn_listener<L: InputListener>(listener: L) -> Receiver<InputEvent> {
    let (tx, rx) = mpsc::channel();
    thread::spawn(move || Box::new(listener).run(tx));
    rx
}

// ════════════════════════════════════════════════════════════════════════════
// KeyListener — raw window keys through the binding table
// ════════════════════════════════════════════════════════════════════════════

/// Raw input from the status window.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum KeyInput {
    Down(RawKey),
    Up(RawKey),
    /// The window stopped receiving key events; anything held is released.
    FocusLost,
    /// The window was closed.
    Closed,
}

/// Translates [`KeyInput`] from the window into [`InputEvent`]s.
///
/// Keeps its own record of held symbols so a focus loss can release them:
/// a key that goes up while another window has focus is never reported.
pub struct KeyListener {
    pub rx: Receiver<KeyInput>,
}

impl KeyListener {
    pub fn new(rx: Receiver<KeyInput>) -> Self { KeyListener { rx } }
}

impl InputListener for KeyListener {
    fn run(self: Box<Self>, tx: Sender<InputEvent>) {
        let mut held = HeldSet::EMPTY;
        for input in self.rx {
            let events: Vec<InputEvent> = match input {
                KeyInput::Down(key) => InputEvent::from_key(key, true).into_iter().collect(),
                KeyInput::Up(key)   => InputEvent::from_key(key, false).into_iter().collect(),
                KeyInput::FocusLost => {
                    let released = held.iter().map(InputEvent::Release).collect();
                    held.clear();
                    released
                }
                KeyInput::Closed => {
                    let _ = tx.send(InputEvent::Action(Action::Quit));
                    return;
                }
            };
            for event in events {
                match event {
                    InputEvent::Press(sym)   => held.insert(sym),
                    InputEvent::Release(sym) => held.remove(sym),
                    InputEvent::Action(_)    => {}
                }
                debug!(?event, "key");
                if tx.send(event).is_err() { return; }
            }
        }
    }
}

// ════════════════════════════════════════════════════════════════════════════
// ScriptedListener — fixed timeline
// ════════════════════════════════════════════════════════════════════════════

/// Replays `(delay, event)` steps; each delay is measured from the previous step.
pub struct ScriptedListener {
    steps: Vec<(Duration, InputEvent)>,
}

impl ScriptedListener {
    pub fn new(steps: Vec<(Duration, InputEvent)>) -> Self { ScriptedListener { steps } }

    /// A short walk: forward, strafe, turn, gear changes, stop, reset, quit.
    ///
    /// `pace` is the hold time of each movement.
    pub fn tour(pace: Duration) -> Self {
        use MovementSymbol::*;
        let tap = Duration::from_millis(10);
        let press   = InputEvent::Press;
        let release = InputEvent::Release;
        let action  = InputEvent::Action;
        ScriptedListener::new(vec![
            (pace, press(Forward)),
            (pace, action(Action::SpeedUp)),
            (pace, release(Forward)),
            (tap,  press(StrafeLeft)),
            (pace, release(StrafeLeft)),
            (tap,  press(TurnRight)),
            (pace, release(TurnRight)),
            (tap,  action(Action::HeightUp)),
            (pace, press(Backward)),
            (pace, action(Action::EmergencyStop)),
            (tap,  release(Backward)),
            (pace, action(Action::ResetPosture)),
            (pace, action(Action::Quit)),
        ])
    }

    pub fn steps(&self) -> &[(Duration, InputEvent)] { &self.steps }
}

impl InputListener for ScriptedListener {
    fn run(self: Box<Self>, tx: Sender<InputEvent>) {
        for (delay, event) in self.steps {
            thread::sleep(delay);
            if tx.send(event).is_err() { return; }
        }
    }
}

// ════════════════════════════════════════════════════════════════════════════
// Tests
// ════════════════════════════════════════════════════════════════════════════

#[cfg(test)]
mod tests {
    use super::*;
    use teleop_core::MovementSymbol::*;

    fn translate(inputs: Vec<KeyInput>) -> Vec<InputEvent> {
        let (key_tx, key_rx) = mpsc::channel();
        for i in inputs { key_tx.send(i).unwrap(); }
        drop(key_tx);
        spawn_listener(KeyListener::new(key_rx)).iter().collect()
    }

    #[test]
    fn keys_go_through_the_binding_table() {
        let events = translate(vec![
            KeyInput::Down(RawKey::Char('w')),
            KeyInput::Down(RawKey::Char('=')),
            KeyInput::Up(RawKey::Char('=')),
            KeyInput::Down(RawKey::Char('p')),
            KeyInput::Up(RawKey::Char('w')),
        ]);
        assert_eq!(events, vec![
            InputEvent::Press(Forward),
            InputEvent::Action(Action::SpeedUp),
            InputEvent::Release(Forward),
        ]);
    }

    #[test]
    fn focus_loss_releases_held_keys() {
        let events = translate(vec![
            KeyInput::Down(RawKey::Left),
            KeyInput::Down(RawKey::Char('q')),
            KeyInput::FocusLost,
            KeyInput::FocusLost,
        ]);
        assert_eq!(events, vec![
            InputEvent::Press(StrafeLeft),
            InputEvent::Press(TurnLeft),
            InputEvent::Release(StrafeLeft),
            InputEvent::Release(TurnLeft),
        ]);
    }

    #[test]
    fn closing_the_window_quits_and_ends_the_stream() {
        let events = translate(vec![
            KeyInput::Down(RawKey::Up),
            KeyInput::Closed,
            KeyInput::Down(RawKey::Down),
        ]);
        assert_eq!(events, vec![
            InputEvent::Press(Forward),
            InputEvent::Action(Action::Quit),
        ]);
    }

    #[test]
    fn scripted_listener_replays_in_order() {
        let steps = vec![
            (Duration::ZERO,            InputEvent::Press(Forward)),
            (Duration::from_millis(5),  InputEvent::Release(Forward)),
            (Duration::ZERO,            InputEvent::Action(Action::Quit)),
        ];
        let rx = spawn_listener(ScriptedListener::new(steps.clone()));
        let got: Vec<_> = rx.iter().collect();
        let want: Vec<_> = steps.into_iter().map(|(_, e)| e).collect();
        assert_eq!(got, want);
    }

    #[test]
    fn tour_ends_with_quit_and_releases_everything() {
        let tour = ScriptedListener::tour(Duration::ZERO);
        assert_eq!(tour.steps().last().map(|s| s.1), Some(InputEvent::Action(Action::Quit)));

        let mut held = HeldSet::EMPTY;
        for (_, e) in tour.steps() {
            match e {
                InputEvent::Press(s)   => held.insert(*s),
                InputEvent::Release(s) => held.remove(*s),
                InputEvent::Action(_)  => {}
            }
        }
        assert!(held.is_empty());
    }
}
