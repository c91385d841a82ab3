//! # Input State
//!
//! This module defines the device-independent intents delivered by the input
//! collaborator, and the block selection they drive.

use crate::engine_state::voxels::block::{
    block_type::{BlockType, BLOCK_TYPE_COUNT},
    BlockTypeSize,
};

/// Represents the state of a key or button.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RawInputState {
    /// Key/button is not pressed
    #[default]
    NotPressed,
    /// Key/button was just pressed this frame
    Pressed,
    /// Key/button has been held down for multiple frames
    Held,
    /// Key/button was just released this frame
    Released,
}

impl RawInputState {
    /// Determines if the input is actively down (either pressed or held)
    pub fn is_active(&self) -> bool {
        matches!(self, RawInputState::Pressed | RawInputState::Held)
    }

    /// Determines if the input was just pressed this frame
    pub fn is_just_pressed(&self) -> bool {
        matches!(self, RawInputState::Pressed)
    }

    /// Determines if the input was just released this frame
    pub fn is_just_released(&self) -> bool {
        matches!(self, RawInputState::Released)
    }

    /// Updates the input state based on the previous and current raw states
    pub fn from_raw_states(previous: bool, current: bool) -> Self {
        match (previous, current) {
            (false, true) => RawInputState::Pressed,
            (true, true) => RawInputState::Held,
            (true, false) => RawInputState::Released,
            (false, false) => RawInputState::NotPressed,
        }
    }
}

/// A request to change the selected block type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelectionChange {
    Next,
    Previous,
    Select(BlockType),
}

/// What the input collaborator reports for one tick.
///
/// Buttons are reported as held or not; the input manager turns presses into
/// one-shot requests.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct InputIntents {
    pub forward: bool,
    pub backward: bool,
    pub left: bool,
    pub right: bool,
    pub jump: bool,
    /// The break button is down
    pub break_block: bool,
    /// The place button is down
    pub place_block: bool,
    /// View movement since the last tick (x, y)
    pub look_delta: Option<(f64, f64)>,
    pub selection: Option<SelectionChange>,
}

/// The block type the player places, cycling through the placeable types.
///
/// Water is not placeable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockSelection {
    selected: BlockType,
}

impl Default for BlockSelection {
    fn default() -> Self {
        BlockSelection {
            selected: BlockType::DIRT,
        }
    }
}

impl BlockSelection {
    pub fn selected(&self) -> BlockType {
        self.selected
    }

    pub fn is_placeable(block_type: BlockType) -> bool {
        block_type != BlockType::WATER
    }

    /// Selects a type directly.
    ///
    /// # Returns
    /// `false` if the type is not placeable and the selection is unchanged.
    pub fn select(&mut self, block_type: BlockType) -> bool {
        if !Self::is_placeable(block_type) {
            return false;
        }
        self.selected = block_type;
        true
    }

    /// Moves to the next placeable type, wrapping around.
    pub fn next(&mut self) -> BlockType {
        self.step(1)
    }

    /// Moves to the previous placeable type, wrapping around.
    pub fn previous(&mut self) -> BlockType {
        self.step(BLOCK_TYPE_COUNT - 1)
    }

    pub fn apply(&mut self, change: SelectionChange) -> BlockType {
        match change {
            SelectionChange::Next => self.next(),
            SelectionChange::Previous => self.previous(),
            SelectionChange::Select(block_type) => {
                self.select(block_type);
                self.selected
            }
        }
    }

    fn step(&mut self, offset: BlockTypeSize) -> BlockType {
        let mut index = self.selected.index();
        for _ in 0..BLOCK_TYPE_COUNT {
            index = (index + offset) % BLOCK_TYPE_COUNT;
            if let Some(block_type) = BlockType::from_index(index) {
                if Self::is_placeable(block_type) {
                    self.selected = block_type;
                    break;
                }
            }
        }
        self.selected
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn press_transitions() {
        assert!(RawInputState::from_raw_states(false, true).is_just_pressed());
        assert!(RawInputState::from_raw_states(true, true).is_active());
        assert!(!RawInputState::from_raw_states(true, true).is_just_pressed());
        assert!(RawInputState::from_raw_states(true, false).is_just_released());
        assert_eq!(RawInputState::from_raw_states(false, false), RawInputState::NotPressed);
    }

    #[test]
    fn selection_cycles_and_skips_water() {
        let mut selection = BlockSelection::default();
        let mut seen = Vec::new();
        for _ in 0..8 {
            seen.push(selection.next());
        }
        assert!(!seen.contains(&BlockType::WATER));
        assert_eq!(seen.last(), Some(&BlockType::DIRT));

        assert_eq!(selection.previous(), BlockType::BRICK);
        assert_eq!(selection.previous(), BlockType::GLASS);
    }

    #[test]
    fn direct_selection() {
        let mut selection = BlockSelection::default();
        assert!(selection.select(BlockType::STONE));
        assert!(!selection.select(BlockType::WATER));
        assert_eq!(selection.apply(SelectionChange::Select(BlockType::WATER)), BlockType::STONE);
        assert_eq!(selection.apply(SelectionChange::Next), BlockType::WOOD);
    }
}
