//! # Block Side Module
//!
//! This module defines the different faces/sides of a voxel block.
//! Faces identify where a ray entered a block and where a new block is placed.

use super::BlockCoordinate;

/// Represents the six possible faces of a voxel block.
///
/// Each variant corresponds to a specific face and is assigned a unique integer value.
/// The values are the face indices reported by hit-testing collaborators.
///
/// The order is: [FRONT, BACK, BOTTOM, TOP, LEFT, RIGHT]
#[derive(PartialEq, Eq, Hash, Copy, Clone, Debug)]
pub enum BlockSide {
    /// The front face (facing positive Z)
    FRONT = 0,

    /// The back face (facing negative Z)
    BACK = 1,

    /// The bottom face (facing negative Y)
    BOTTOM = 2,

    /// The top face (facing positive Y)
    TOP = 3,

    /// The left face (facing negative X)
    LEFT = 4,

    /// The right face (facing positive X)
    RIGHT = 5,
}

impl BlockSide {
    /// Returns an array containing all six block faces in a consistent order.
    ///
    /// The order is: [FRONT, BACK, BOTTOM, TOP, LEFT, RIGHT]
    pub fn all() -> [BlockSide; 6] {
        [
            BlockSide::FRONT,
            BlockSide::BACK,
            BlockSide::BOTTOM,
            BlockSide::TOP,
            BlockSide::LEFT,
            BlockSide::RIGHT,
        ]
    }

    /// Looks up a face from the index carried in hit metadata.
    ///
    /// # Returns
    /// The face, or `None` for indices outside `0..6`.
    pub fn from_index(index: usize) -> Option<BlockSide> {
        BlockSide::all().get(index).copied()
    }

    /// The outward unit normal of this face in block units.
    pub fn normal(self) -> (i32, i32, i32) {
        match self {
            BlockSide::FRONT => (0, 0, 1),
            BlockSide::BACK => (0, 0, -1),
            BlockSide::BOTTOM => (0, -1, 0),
            BlockSide::TOP => (0, 1, 0),
            BlockSide::LEFT => (-1, 0, 0),
            BlockSide::RIGHT => (1, 0, 0),
        }
    }

    /// The face whose normal is the given axis-aligned unit offset.
    pub fn from_normal(normal: (i32, i32, i32)) -> Option<BlockSide> {
        BlockSide::all()
            .into_iter()
            .find(|side| side.normal() == normal)
    }

    /// The neighbouring block on the other side of this face.
    ///
    /// This is where a block is placed when the player targets this face.
    pub fn adjacent(self, coordinate: BlockCoordinate) -> BlockCoordinate {
        let (dx, dy, dz) = self.normal();
        coordinate.offset(dx, dy, dz)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn indices_match_discriminants() {
        for side in BlockSide::all() {
            assert_eq!(BlockSide::from_index(side as usize), Some(side));
        }
        assert_eq!(BlockSide::from_index(6), None);
    }

    #[test]
    fn normals_are_unique_and_invertible() {
        for side in BlockSide::all() {
            assert_eq!(BlockSide::from_normal(side.normal()), Some(side));
        }
        assert_eq!(BlockSide::from_normal((1, 1, 0)), None);
    }

    #[test]
    fn adjacent_steps_along_the_normal() {
        let origin = BlockCoordinate::new(2, 10, 2);
        assert_eq!(BlockSide::TOP.adjacent(origin), BlockCoordinate::new(2, 11, 2));
        assert_eq!(BlockSide::LEFT.adjacent(origin), BlockCoordinate::new(1, 10, 2));
    }
}
