//! # Block Type Module
//!
//! This module defines the different types of blocks in the voxel world.
//! It provides functionality for block type identification, conversion by name
//! (the persisted wire format) and by index (hotbar cycling).

use std::{fmt, str::FromStr};

use num_derive::FromPrimitive;
use serde::{Deserialize, Serialize};

use super::BlockTypeSize;

/// Enumerates all possible block types in the voxel world.
///
/// Air is deliberately absent: an empty cell is the absence of a block.
/// The `FromPrimitive` derive allows conversion from integers, which is used
/// when cycling the player's selected block.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, FromPrimitive, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BlockType {
    /// A basic dirt block, found just below the surface.
    DIRT,

    /// A grass block, the usual surface of land columns.
    GRASS,

    /// Stone, the bulk of every column and the surface of high ground.
    STONE,

    /// A wooden block, only ever placed by the player.
    WOOD,

    /// Leaves, transparent foliage.
    LEAVES,

    /// Sand, the surface of shore columns near sea level.
    SAND,

    /// Glass, transparent and solid.
    GLASS,

    /// Water, fills columns between the ground and sea level. Not solid.
    WATER,

    /// Brick, only ever placed by the player.
    BRICK,
}

/// Number of `BlockType` variants.
pub const BLOCK_TYPE_COUNT: BlockTypeSize = 9;

/// Error returned when a block type name is not recognised.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown block type `{0}`")]
pub struct UnknownBlockType(pub String);

impl BlockType {
    /// Converts a `BlockTypeSize` to a `BlockType`.
    ///
    /// # Returns
    /// The corresponding `BlockType`, or `None` if the index is out of range.
    pub fn from_index(btype: BlockTypeSize) -> Option<Self> {
        num::FromPrimitive::from_u8(btype)
    }

    /// The compact index of this block type.
    pub fn index(self) -> BlockTypeSize {
        self as BlockTypeSize
    }

    /// The lowercase name used by the persisted change format.
    pub fn name(self) -> &'static str {
        match self {
            BlockType::DIRT => "dirt",
            BlockType::GRASS => "grass",
            BlockType::STONE => "stone",
            BlockType::WOOD => "wood",
            BlockType::LEAVES => "leaves",
            BlockType::SAND => "sand",
            BlockType::GLASS => "glass",
            BlockType::WATER => "water",
            BlockType::BRICK => "brick",
        }
    }

    /// Whether light and sight pass through this block.
    pub fn is_transparent(self) -> bool {
        matches!(self, BlockType::LEAVES | BlockType::GLASS | BlockType::WATER)
    }

    /// Whether this block occupies space for collision and targeting.
    ///
    /// Water is the only non-solid block type.
    pub fn is_solid(self) -> bool {
        !matches!(self, BlockType::WATER)
    }
}

impl fmt::Display for BlockType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for BlockType {
    type Err = UnknownBlockType;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        (0..BLOCK_TYPE_COUNT)
            .filter_map(BlockType::from_index)
            .find(|block_type| block_type.name().eq_ignore_ascii_case(s))
            .ok_or_else(|| UnknownBlockType(s.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names_round_trip_through_from_str() {
        for index in 0..BLOCK_TYPE_COUNT {
            let block_type = BlockType::from_index(index).unwrap();
            assert_eq!(block_type.name().parse::<BlockType>(), Ok(block_type));
        }
        assert!(BlockType::from_index(BLOCK_TYPE_COUNT).is_none());
    }

    #[test]
    fn unknown_names_are_rejected() {
        assert_eq!(
            "air".parse::<BlockType>(),
            Err(UnknownBlockType("air".to_string()))
        );
    }

    #[test]
    fn serde_uses_lowercase_names() {
        assert_eq!(serde_json::to_string(&BlockType::STONE).unwrap(), "\"stone\"");
        let parsed: BlockType = serde_json::from_str("\"brick\"").unwrap();
        assert_eq!(parsed, BlockType::BRICK);
    }

    #[test]
    fn water_is_the_only_non_solid_type() {
        assert!(!BlockType::WATER.is_solid());
        assert!(BlockType::GLASS.is_solid());
        assert!(BlockType::GLASS.is_transparent());
        assert!(!BlockType::STONE.is_transparent());
    }
}
