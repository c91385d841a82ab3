//! # Block Module
//!
//! This module provides the core block-related functionality for the voxel world.
//! It includes block type definitions, block face handling, block coordinates and
//! the single conversion used whenever a continuous position crosses into the
//! integer block grid.

use std::fmt;

use block_type::BlockType;
use cgmath::Point3;
use serde::{Deserialize, Serialize};

pub mod block_side;
pub mod block_type;

/// The underlying integer type used to represent block types in compact form.
/// This is used when cycling through block types by index.
pub type BlockTypeSize = u8;

/// Converts one continuous world-space component into its block index.
///
/// This is the only place where `f32` positions are floored into integer block
/// coordinates. Every subsystem (movement, streaming, targeting, placement) goes
/// through this function or [`BlockCoordinate::from_world`].
///
/// # Arguments
/// * `value` - A world-space component
///
/// # Returns
/// `Some(floor(value))` for finite values inside the `i32` range, `None` for NaN,
/// infinities and values that would overflow.
pub fn block_coordinate_of(value: f32) -> Option<i32> {
    if !value.is_finite() {
        return None;
    }
    let floored = value.floor();
    if floored < i32::MIN as f32 || floored >= i32::MAX as f32 {
        return None;
    }
    Some(floored as i32)
}

/// An integer position of a single block in world space.
///
/// This is the identity key for all per-block operations: chunk membership,
/// change log entries, targeting and occupancy checks.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct BlockCoordinate {
    /// X position in blocks
    pub x: i32,
    /// Y position in blocks (up)
    pub y: i32,
    /// Z position in blocks
    pub z: i32,
}

impl BlockCoordinate {
    /// Creates a new block coordinate.
    pub const fn new(x: i32, y: i32, z: i32) -> Self {
        BlockCoordinate { x, y, z }
    }

    /// Returns the block containing a continuous world-space point.
    ///
    /// # Arguments
    /// * `position` - A point in world space
    ///
    /// # Returns
    /// The enclosing block, or `None` when any component is non-finite or out of range.
    pub fn from_world(position: Point3<f32>) -> Option<Self> {
        Some(BlockCoordinate {
            x: block_coordinate_of(position.x)?,
            y: block_coordinate_of(position.y)?,
            z: block_coordinate_of(position.z)?,
        })
    }

    /// Returns this coordinate shifted by the given integer offset.
    pub fn offset(&self, dx: i32, dy: i32, dz: i32) -> Self {
        BlockCoordinate {
            x: self.x.wrapping_add(dx),
            y: self.y.wrapping_add(dy),
            z: self.z.wrapping_add(dz),
        }
    }

    /// The world-space center of the block.
    pub fn center(&self) -> Point3<f32> {
        Point3::new(
            self.x as f32 + 0.5,
            self.y as f32 + 0.5,
            self.z as f32 + 0.5,
        )
    }
}

impl fmt::Display for BlockCoordinate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {}, {})", self.x, self.y, self.z)
    }
}

/// Represents a single block in the world.
///
/// Blocks are immutable values. A mutation replaces the block at a coordinate
/// wholesale, it never edits one in place. Air is not a block: it is the absence
/// of an entry.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct Block {
    /// The position of the block in world space
    pub coordinate: BlockCoordinate,
    /// The material of the block
    pub block_type: BlockType,
}

impl Block {
    /// Creates a new block of the specified type at the given coordinate.
    pub fn new(coordinate: BlockCoordinate, block_type: BlockType) -> Self {
        Block {
            coordinate,
            block_type,
        }
    }
}
