//! Operator input state: held movement keys plus speed and height gears.
//!
//! [`InputState`] has a single owner (the control loop).  Input sources do
//! not touch it directly; they send [`InputEvent`]s over a channel and the
//! owner applies them between ticks, so every [`InputSnapshot`] the loop
//! reads is a complete, consistent view.

use crate::binding::{binding_for, Action, Binding, MovementSymbol, RawKey};
use crate::config::TeleopConfig;

// ════════════════════════════════════════════════════════════════════════════
// HeldSet — bitmask over the six movement symbols
// ════════════════════════════════════════════════════════════════════════════

/// Set of held movement symbols, one bit per symbol.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct HeldSet(u8);

impl HeldSet {
    pub const EMPTY: HeldSet = HeldSet(0);

    pub fn insert(&mut self, sym: MovementSymbol) { self.0 |= sym.bit(); }
    pub fn remove(&mut self, sym: MovementSymbol) { self.0 &= !sym.bit(); }
    pub fn contains(&self, sym: MovementSymbol) -> bool { self.0 & sym.bit() != 0 }
    pub fn clear(&mut self) { self.0 = 0; }
    pub fn is_empty(&self) -> bool { self.0 == 0 }
    pub fn len(&self) -> usize { self.0.count_ones() as usize }

    /// Held symbols in enum order.
    pub fn iter(&self) -> impl Iterator<Item = MovementSymbol> + '_ {
        MovementSymbol::ALL.into_iter().filter(move |s| self.contains(*s))
    }
}

impl FromIterator<MovementSymbol> for HeldSet {
    fn from_iter<I: IntoIterator<Item = MovementSymbol>>(iter: I) -> Self {
        let mut set = HeldSet::EMPTY;
        for sym in iter { set.insert(sym); }
        set
    }
}

// ════════════════════════════════════════════════════════════════════════════
// InputEvent — normalized event from any input source
// ════════════════════════════════════════════════════════════════════════════

/// A normalized input event delivered to the state owner.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum InputEvent {
    Press(MovementSymbol),
    Release(MovementSymbol),
    Action(Action),
}

impl InputEvent {
    /// Translate a raw key transition through the binding table.
    ///
    /// Action keys fire on press only; unbound keys yield `None`.
    pub fn from_key(key: RawKey, pressed: bool) -> Option<InputEvent> {
        match (binding_for(key)?, pressed) {
            (Binding::Move(sym), true)     => Some(InputEvent::Press(sym)),
            (Binding::Move(sym), false)    => Some(InputEvent::Release(sym)),
            (Binding::Action(action), true) => Some(InputEvent::Action(action)),
            (Binding::Action(_), false)    => None,
        }
    }
}

// ════════════════════════════════════════════════════════════════════════════
// InputSnapshot
// ════════════════════════════════════════════════════════════════════════════

/// Immutable copy of the input state taken once per tick.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct InputSnapshot {
    pub held:        HeldSet,
    pub speed_gear:  usize,
    pub height_gear: usize,
}

// ════════════════════════════════════════════════════════════════════════════
// InputState
// ════════════════════════════════════════════════════════════════════════════

/// Held keys and gear indices for one teleop session.
#[derive(Clone, Debug)]
pub struct InputState {
    held:                HeldSet,
    speed_gear:          usize,
    height_gear:         usize,
    speed_gears:         usize,
    height_gears:        usize,
    default_speed_gear:  usize,
    default_height_gear: usize,
}

impl InputState {
    /// Fresh state: nothing held, both gears at their configured defaults.
    ///
    /// `cfg` is expected to have passed [`TeleopConfig::validate`]; default
    /// gears are clamped into range regardless.
    pub fn new(cfg: &TeleopConfig) -> Self {
        let speed_gears  = cfg.speed_levels.len().max(1);
        let height_gears = cfg.height_levels.len().max(1);
        let default_speed_gear  = cfg.default_speed_gear.min(speed_gears - 1);
        let default_height_gear = cfg.default_height_gear.min(height_gears - 1);
        InputState {
            held: HeldSet::EMPTY,
            speed_gear: default_speed_gear,
            height_gear: default_height_gear,
            speed_gears,
            height_gears,
            default_speed_gear,
            default_height_gear,
        }
    }

    /// Mark a symbol held.  Pressing an already-held key changes nothing.
    pub fn press(&mut self, sym: MovementSymbol) { self.held.insert(sym); }

    /// Mark a symbol released.  Releasing a key that is not held is a no-op.
    pub fn release(&mut self, sym: MovementSymbol) { self.held.remove(sym); }

    pub fn is_held(&self, sym: MovementSymbol) -> bool { self.held.contains(sym) }

    /// Step the speed gear by `delta`, saturating at both ends.
    /// Returns `true` if the gear moved.
    pub fn adjust_speed(&mut self, delta: i32) -> bool {
        step_gear(&mut self.speed_gear, delta, self.speed_gears)
    }

    /// Step the height gear by `delta`, saturating at both ends.
    /// Returns `true` if the gear moved.
    pub fn adjust_height(&mut self, delta: i32) -> bool {
        step_gear(&mut self.height_gear, delta, self.height_gears)
    }

    /// Clear held keys and restore both gears to their defaults.
    pub fn reset(&mut self) {
        self.held.clear();
        self.speed_gear  = self.default_speed_gear;
        self.height_gear = self.default_height_gear;
    }

    pub fn speed_gear(&self)   -> usize { self.speed_gear }
    pub fn height_gear(&self)  -> usize { self.height_gear }
    pub fn speed_gears(&self)  -> usize { self.speed_gears }
    pub fn height_gears(&self) -> usize { self.height_gears }

    pub fn snapshot(&self) -> InputSnapshot {
        InputSnapshot {
            held:        self.held,
            speed_gear:  self.speed_gear,
            height_gear: self.height_gear,
        }
    }
}

fn step_gear(gear: &mut usize, delta: i32, count: usize) -> bool {
    let max = count.saturating_sub(1) as i64;
    let next = (*gear as i64 + delta as i64).clamp(0, max) as usize;
    let moved = next != *gear;
    *gear = next;
    moved
}

// ════════════════════════════════════════════════════════════════════════════
// Tests
// ════════════════════════════════════════════════════════════════════════════
