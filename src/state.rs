//! Decoder state: function keys, direction, speed and binary states.
//!
//! Every mutator compares with the stored value first and only marks the
//! state dirty on an actual change, so repeated packets from the command
//! station do not trigger rule re-evaluation.

use crate::traits::Direction;

/// Number of function keys (F0..=F68).
pub const FUNCTION_COUNT: usize = 69;

/// Binary states that can be on at the same time.
pub const MAX_BINARY_STATES: usize = 64;

/// Snapshot of everything rules can look at.
///
/// # Example
///
/// ```rust
/// use loco_aux::state::DecoderState;
///
/// let mut state = DecoderState::new();
/// state.clear_dirty();
///
/// assert!(state.set_function(3, true));
/// assert!(state.is_dirty());
///
/// state.clear_dirty();
/// assert!(!state.set_function(3, true)); // unchanged
/// assert!(!state.is_dirty());
/// ```
#[derive(Clone, Debug)]
pub struct DecoderState {
    functions: [bool; FUNCTION_COUNT],
    direction: Direction,
    speed: u16,
    /// Only `true` binary states are stored.
    binary_states: heapless::FnvIndexSet<u16, MAX_BINARY_STATES>,
    dirty: bool,
}

impl Default for DecoderState {
    fn default() -> Self {
        Self::new()
    }
}

impl DecoderState {
    /// All keys off, forward, stopped, no binary states. Starts dirty so
    /// the first tick evaluates the rules.
    pub fn new() -> Self {
        Self {
            functions: [false; FUNCTION_COUNT],
            direction: Direction::Forward,
            speed: 0,
            binary_states: heapless::FnvIndexSet::new(),
            dirty: true,
        }
    }

    /// Back to [`new`](Self::new).
    pub fn reset(&mut self) {
        *self = Self::new();
    }

    /// Set function key `number`. Returns true if the state changed.
    /// Numbers beyond F68 are ignored.
    pub fn set_function(&mut self, number: u8, on: bool) -> bool {
        match self.functions.get_mut(usize::from(number)) {
            Some(slot) if *slot != on => {
                *slot = on;
                self.dirty = true;
                true
            }
            _ => false,
        }
    }

    /// State of function key `number`; false beyond F68.
    pub fn function(&self, number: u16) -> bool {
        self.functions
            .get(usize::from(number))
            .copied()
            .unwrap_or(false)
    }

    /// Set the direction of travel. Returns true if it changed.
    pub fn set_direction(&mut self, direction: Direction) -> bool {
        if self.direction == direction {
            return false;
        }
        self.direction = direction;
        self.dirty = true;
        true
    }

    /// Direction of travel.
    pub fn direction(&self) -> Direction {
        self.direction
    }

    /// Set the speed step. Returns true if it changed.
    pub fn set_speed(&mut self, speed: u16) -> bool {
        if self.speed == speed {
            return false;
        }
        self.speed = speed;
        self.dirty = true;
        true
    }

    /// Speed step.
    pub fn speed(&self) -> u16 {
        self.speed
    }

    /// Set binary state `number`. Returns true if it changed.
    ///
    /// When [`MAX_BINARY_STATES`] states are already on, switching on
    /// another one is dropped with a warning.
    pub fn set_binary_state(&mut self, number: u16, on: bool) -> bool {
        let changed = if on {
            match self.binary_states.insert(number) {
                Ok(inserted) => inserted,
                Err(_) => {
                    log::warn!("binary state table full, state {number} dropped");
                    false
                }
            }
        } else {
            self.binary_states.remove(&number)
        };
        if changed {
            self.dirty = true;
        }
        changed
    }

    /// State of binary state `number`; false if never set.
    pub fn binary_state(&self, number: u16) -> bool {
        self.binary_states.contains(&number)
    }

    /// Number of binary states currently on.
    pub fn active_binary_states(&self) -> usize {
        self.binary_states.len()
    }

    /// Whether anything changed since the last [`clear_dirty`](Self::clear_dirty).
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Force the next tick to re-evaluate the rules.
    pub fn mark_dirty(&mut self) {
        self.dirty = true;
    }

    /// Acknowledge an evaluation pass.
    pub fn clear_dirty(&mut self) {
        self.dirty = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn clean() -> DecoderState {
        let mut state = DecoderState::new();
        state.clear_dirty();
        state
    }

    #[test]
    fn new_state_is_dirty_with_defaults() {
        let state = DecoderState::new();
        assert!(state.is_dirty());
        assert_eq!(state.direction(), Direction::Forward);
        assert_eq!(state.speed(), 0);
        assert!(!state.function(0));
        assert!(!state.binary_state(0));
    }

    // =========================================================================
    // Idempotence
    // =========================================================================

    #[test]
    fn equal_values_never_mark_dirty() {
        let mut state = clean();
        assert!(!state.set_function(0, false));
        assert!(!state.set_direction(Direction::Forward));
        assert!(!state.set_speed(0));
        assert!(!state.set_binary_state(12, false));
        assert!(!state.is_dirty());
    }

    #[test]
    fn changes_mark_dirty() {
        let mut state = clean();
        assert!(state.set_direction(Direction::Reverse));
        assert!(state.is_dirty());

        state.clear_dirty();
        assert!(state.set_speed(14));
        assert!(state.is_dirty());

        state.clear_dirty();
        assert!(state.set_binary_state(300, true));
        assert!(state.binary_state(300));
        assert!(!state.set_binary_state(300, true));
        assert!(state.set_binary_state(300, false));
        assert_eq!(state.active_binary_states(), 0);
    }

    // =========================================================================
    // Bounds
    // =========================================================================

    #[test]
    fn function_range_is_f0_to_f68() {
        let mut state = clean();
        assert!(state.set_function(68, true));
        assert!(state.function(68));
        assert!(!state.set_function(69, true));
        assert!(!state.function(69));
        assert!(!state.function(u16::MAX));
    }

    #[test]
    fn binary_state_table_full_drops_new_states() {
        let mut state = clean();
        for n in 0..MAX_BINARY_STATES as u16 {
            assert!(state.set_binary_state(n, true));
        }
        state.clear_dirty();
        assert!(!state.set_binary_state(1000, true));
        assert!(!state.binary_state(1000));
        assert!(!state.is_dirty());
    }

    #[test]
    fn reset_restores_defaults() {
        let mut state = clean();
        state.set_function(5, true);
        state.set_direction(Direction::Reverse);
        state.reset();
        assert!(!state.function(5));
        assert_eq!(state.direction(), Direction::Forward);
        assert!(state.is_dirty());
    }
}
