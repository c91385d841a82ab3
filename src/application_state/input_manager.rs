//! # Input Manager
//!
//! Turns per-tick [`InputIntents`] into the engine's [`PlayerAction`]:
//! - held movement and jump pass straight through
//! - break and place fire once per press, not every tick they are held
//! - selection changes update the [`BlockSelection`] before a placement reads it

use crate::engine_state::PlayerAction;

use super::input_state::{BlockSelection, InputIntents, RawInputState};

/// Tracks button state between ticks.
#[derive(Debug, Default)]
pub struct InputManager {
    /// Whether break was down on the previous tick
    break_old: bool,
    /// Whether place was down on the previous tick
    place_old: bool,
    pub selection: BlockSelection,
}

impl InputManager {
    /// Creates a new InputManager with every button released and dirt selected.
    pub fn new() -> Self {
        Self::default()
    }

    /// Translates one tick of intents into player actions.
    ///
    /// # Arguments
    /// * `intents` - What the input collaborator reported for this tick
    ///
    /// # Returns
    /// The actions for the engine's next tick
    pub fn translate(&mut self, intents: &InputIntents) -> PlayerAction {
        if let Some(change) = intents.selection {
            let selected = self.selection.apply(change);
            log::debug!("Selected {selected}");
        }

        let break_state = RawInputState::from_raw_states(self.break_old, intents.break_block);
        let place_state = RawInputState::from_raw_states(self.place_old, intents.place_block);
        self.break_old = intents.break_block;
        self.place_old = intents.place_block;

        PlayerAction {
            move_forward: intents.forward,
            move_backward: intents.backward,
            move_left: intents.left,
            move_right: intents.right,
            jump: intents.jump,
            rotate_view: intents.look_delta,
            break_block: break_state.is_just_pressed(),
            place_block: place_state
                .is_just_pressed()
                .then(|| self.selection.selected()),
        }
    }

    /// Releases every button, e.g. when input focus is lost.
    pub fn reset_inputs(&mut self) {
        self.break_old = false;
        self.place_old = false;
    }
}
