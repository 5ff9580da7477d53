//! Key binding table — raw key identifiers to movement symbols and actions.
//!
//! The input adapter normalizes whatever its backend reports into a
//! [`RawKey`], then asks [`binding_for`] what that key means.  Keys with no
//! binding yield `None` and are dropped before they reach the input state.

// ════════════════════════════════════════════════════════════════════════════
// MovementSymbol
// ════════════════════════════════════════════════════════════════════════════

/// A logical movement direction held down by the operator.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum MovementSymbol {
    Forward     = 0,
    Backward    = 1,
    StrafeLeft  = 2,
    StrafeRight = 3,
    TurnLeft    = 4,
    TurnRight   = 5,
}

impl MovementSymbol {
    /// All six symbols, in bit order.
    pub const ALL: [MovementSymbol; 6] = [
        MovementSymbol::Forward,
        MovementSymbol::Backward,
        MovementSymbol::StrafeLeft,
        MovementSymbol::StrafeRight,
        MovementSymbol::TurnLeft,
        MovementSymbol::TurnRight,
    ];

    /// Unit contribution `(dvx, dvy, dwz)`.
    ///
    /// Left is positive `vy`, counter-clockwise is positive `wz`.
    pub fn unit(self) -> (f32, f32, f32) {
        match self {
            MovementSymbol::Forward     => ( 1.0,  0.0,  0.0),
            MovementSymbol::Backward    => (-1.0,  0.0,  0.0),
            MovementSymbol::StrafeLeft  => ( 0.0,  1.0,  0.0),
            MovementSymbol::StrafeRight => ( 0.0, -1.0,  0.0),
            MovementSymbol::TurnLeft    => ( 0.0,  0.0,  1.0),
            MovementSymbol::TurnRight   => ( 0.0,  0.0, -1.0),
        }
    }

    /// Human-readable name for the status display.
    pub fn name(self) -> &'static str {
        match self {
            MovementSymbol::Forward     => "forward",
            MovementSymbol::Backward    => "backward",
            MovementSymbol::StrafeLeft  => "strafe left",
            MovementSymbol::StrafeRight => "strafe right",
            MovementSymbol::TurnLeft    => "turn left",
            MovementSymbol::TurnRight   => "turn right",
        }
    }

    /// Bit used by [`HeldSet`](crate::input::HeldSet).
    pub(crate) fn bit(self) -> u8 { 1 << (self as u8) }
}

// ════════════════════════════════════════════════════════════════════════════
// Action
// ════════════════════════════════════════════════════════════════════════════

/// A discrete, one-shot operator action.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Action {
    SpeedUp,
    SpeedDown,
    HeightUp,
    HeightDown,
    EmergencyStop,
    ResetPosture,
    Quit,
}

impl Action {
    pub fn name(self) -> &'static str {
        match self {
            Action::SpeedUp       => "speed up",
            Action::SpeedDown     => "speed down",
            Action::HeightUp      => "height up",
            Action::HeightDown    => "height down",
            Action::EmergencyStop => "emergency stop",
            Action::ResetPosture  => "reset posture",
            Action::Quit          => "quit",
        }
    }
}

// ════════════════════════════════════════════════════════════════════════════
// RawKey / Binding
// ════════════════════════════════════════════════════════════════════════════

/// Backend-neutral key identifier.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum RawKey {
    /// A printable character as typed (case is folded during lookup).
    Char(char),
    Up,
    Down,
    Left,
    Right,
    Space,
    Escape,
}

/// What a bound key does.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Binding {
    /// Continuous: contributes while held.
    Move(MovementSymbol),
    /// One-shot: fires on press.
    Action(Action),
}

/// Look up the binding for a raw key.  Unbound keys return `None`.
pub fn binding_for(key: RawKey) -> Option<Binding> {
    use Binding::{Action as Act, Move};
    use MovementSymbol::*;

    let binding = match key {
        RawKey::Up     => Move(Forward),
        RawKey::Down   => Move(Backward),
        RawKey::Left   => Move(StrafeLeft),
        RawKey::Right  => Move(StrafeRight),
        RawKey::Space  => Act(Action::EmergencyStop),
        RawKey::Escape => Act(Action::Quit),
        RawKey::Char(c) => match c.to_ascii_lowercase() {
            'w'       => Move(Forward),
            's'       => Move(Backward),
            'a'       => Move(StrafeLeft),
            'd'       => Move(StrafeRight),
            'q'       => Move(TurnLeft),
            'e'       => Move(TurnRight),
            '+' | '=' => Act(Action::SpeedUp),
            '-' | '_' => Act(Action::SpeedDown),
            'z'       => Act(Action::HeightUp),
            'x'       => Act(Action::HeightDown),
            'r'       => Act(Action::ResetPosture),
            ' '       => Act(Action::EmergencyStop),
            _         => return None,
        },
    };
    Some(binding)
}

/// Key legend shown in the status display.
pub const KEY_LEGEND: &[(&str, &str)] = &[
    ("W / Up",    "forward"),
    ("S / Down",  "backward"),
    ("A / Left",  "strafe left"),
    ("D / Right", "strafe right"),
    ("Q",         "turn left"),
    ("E",         "turn right"),
    ("Space",     "emergency stop"),
    ("+ / =",     "speed up"),
    ("- / _",     "speed down"),
    ("Z",         "height up"),
    ("X",         "height down"),
    ("R",         "reset posture"),
    ("Esc",       "quit"),
];

// ════════════════════════════════════════════════════════════════════════════
// Tests
// ════════════════════════════════════════════════════════════════════════════
