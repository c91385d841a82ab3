//! # Chunk Module
//!
//! This module provides the `Chunk` struct and related functionality for managing
//! 16x16x16 cubes of voxel data, together with the `ChunkCoordinate` that names them.
//!
//! ## Storage
//!
//! Chunks keep two views of the same block set:
//! - `solid_array`: A bit vector (1 bit per cell) marking which cells hold a block
//! - `blocks`: A map from block coordinate to block type, only for filled cells
//!
//! The bit vector gives O(1) occupancy checks for raycasts and collision, the map
//! gives O(1) typed lookups and is the set the change log merges into. Every
//! mutation goes through `insert`/`remove`, which keep the two in step.
//!
//! ### Partitioning
//! A block at world coordinate `(x, y, z)` belongs to exactly one chunk: the one at
//! `(x.div_euclid(16), y.div_euclid(16), z.div_euclid(16))`. Footprints of distinct
//! chunks never overlap.

use std::collections::HashMap;

use bitvec::prelude::BitVec;
use cgmath::Point3;
use serde::{Deserialize, Serialize};

use super::block::{block_type::BlockType, Block, BlockCoordinate};

pub mod chunk_creation;
pub mod chunk_iteration;

use chunk_iteration::ChunkBlockIterator;

/// The dimension (width, height, depth) of a chunk in blocks.
pub const CHUNK_DIMENSION: i32 = 16;
/// The number of blocks in a single 2D plane of a chunk (CHUNK_DIMENSION²).
pub const CHUNK_PLANE_SIZE: i32 = CHUNK_DIMENSION * CHUNK_DIMENSION;
/// The total number of blocks in a chunk (CHUNK_DIMENSION³).
pub const CHUNK_SIZE: i32 = CHUNK_PLANE_SIZE * CHUNK_DIMENSION;

/// Identifies a chunk in chunk space (not block coordinates).
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ChunkCoordinate {
    /// X position in chunks
    pub x: i32,
    /// Y position in chunks
    pub y: i32,
    /// Z position in chunks
    pub z: i32,
}

impl ChunkCoordinate {
    /// Creates a new chunk coordinate.
    pub const fn new(x: i32, y: i32, z: i32) -> Self {
        ChunkCoordinate { x, y, z }
    }

    /// Returns the chunk that owns a block coordinate.
    ///
    /// Uses Euclidean division so negative coordinates map correctly
    /// (block -1 lives in chunk -1, not chunk 0).
    pub fn of_block(coordinate: BlockCoordinate) -> Self {
        ChunkCoordinate {
            x: coordinate.x.div_euclid(CHUNK_DIMENSION),
            y: coordinate.y.div_euclid(CHUNK_DIMENSION),
            z: coordinate.z.div_euclid(CHUNK_DIMENSION),
        }
    }

    /// Returns the chunk containing a continuous world-space point.
    ///
    /// # Returns
    /// `None` if the point has a non-finite or out-of-range component.
    pub fn of_world(position: Point3<f32>) -> Option<Self> {
        BlockCoordinate::from_world(position).map(Self::of_block)
    }

    /// The block coordinate of this chunk's minimum corner.
    ///
    /// # Returns
    /// `None` if the origin does not fit in block space.
    pub fn origin(&self) -> Option<BlockCoordinate> {
        Some(BlockCoordinate::new(
            self.x.checked_mul(CHUNK_DIMENSION)?,
            self.y.checked_mul(CHUNK_DIMENSION)?,
            self.z.checked_mul(CHUNK_DIMENSION)?,
        ))
    }

    /// Whether a block coordinate falls inside this chunk's footprint.
    pub fn contains(&self, coordinate: BlockCoordinate) -> bool {
        ChunkCoordinate::of_block(coordinate) == *self
    }

    /// Squared Euclidean distance in the X-Z plane, in chunks.
    pub fn horizontal_distance_squared_to(&self, other: &ChunkCoordinate) -> i64 {
        let dx = self.x as i64 - other.x as i64;
        let dz = self.z as i64 - other.z as i64;
        dx * dx + dz * dz
    }

    /// Squared Euclidean distance in chunks, used to order loading work.
    pub fn distance_squared_to(&self, other: &ChunkCoordinate) -> i64 {
        let dy = self.y as i64 - other.y as i64;
        self.horizontal_distance_squared_to(other) + dy * dy
    }
}

/// Represents a 16x16x16 collection of voxel blocks in the world.
///
/// Chunks are the unit of generation and streaming. No two blocks in a chunk share
/// a coordinate, and every block lies inside the chunk's footprint.
#[derive(Clone, Debug, PartialEq)]
pub struct Chunk {
    /// The position of this chunk in chunk coordinates (not block coordinates).
    position: ChunkCoordinate,

    /// A bit vector where each bit represents whether the corresponding cell holds a block.
    ///
    /// The bits are stored in Y-Z-X order (x varies fastest), see [`local_index`].
    solid_array: BitVec,

    /// The block set of this chunk, keyed by coordinate.
    blocks: HashMap<BlockCoordinate, BlockType>,
}

/// Linear index of a chunk-relative cell inside `solid_array`.
///
/// # Arguments
/// * `cx`, `cy`, `cz` - Chunk-relative coordinates in `0..CHUNK_DIMENSION`
pub fn local_index(cx: i32, cy: i32, cz: i32) -> usize {
    (cx + CHUNK_DIMENSION * cz + CHUNK_PLANE_SIZE * cy) as usize
}

impl Chunk {
    /// Creates a new, completely empty chunk (all cells are air).
    ///
    /// # Arguments
    /// * `position` - The chunk coordinates of the new chunk
    pub fn empty(position: ChunkCoordinate) -> Self {
        Chunk {
            position,
            solid_array: BitVec::repeat(false, CHUNK_SIZE as usize),
            blocks: HashMap::new(),
        }
    }

    /// The chunk coordinate of this chunk.
    pub fn position(&self) -> ChunkCoordinate {
        self.position
    }

    /// Number of blocks in the chunk.
    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    /// Whether the chunk holds no blocks at all.
    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    /// Returns the chunk-relative cell index of a world coordinate, if it lies in this chunk.
    fn cell_of(&self, coordinate: BlockCoordinate) -> Option<usize> {
        if !self.position.contains(coordinate) {
            return None;
        }
        Some(local_index(
            coordinate.x.rem_euclid(CHUNK_DIMENSION),
            coordinate.y.rem_euclid(CHUNK_DIMENSION),
            coordinate.z.rem_euclid(CHUNK_DIMENSION),
        ))
    }

    /// Gets the block at the specified world coordinate.
    ///
    /// # Returns
    /// The block, or `None` for air or coordinates outside this chunk.
    pub fn get(&self, coordinate: BlockCoordinate) -> Option<Block> {
        self.block_type_at(coordinate)
            .map(|block_type| Block::new(coordinate, block_type))
    }

    /// Gets the type of the block at the specified world coordinate.
    pub fn block_type_at(&self, coordinate: BlockCoordinate) -> Option<BlockType> {
        self.blocks.get(&coordinate).copied()
    }

    /// Checks if the cell at the specified chunk-relative coordinates holds a block.
    ///
    /// # Returns
    /// `true` if the cell is filled, `false` if it's air or out of bounds.
    pub fn is_block_solid(&self, cx: i32, cy: i32, cz: i32) -> bool {
        let range = 0..CHUNK_DIMENSION;
        if !range.contains(&cx) || !range.contains(&cy) || !range.contains(&cz) {
            return false;
        }
        self.solid_array[local_index(cx, cy, cz)]
    }

    /// Inserts a block, replacing whatever occupied its coordinate.
    ///
    /// The block set is keyed by coordinate, so the last insert for a coordinate wins.
    ///
    /// # Returns
    /// `false` if the block lies outside this chunk's footprint and was not inserted.
    pub fn insert(&mut self, block: Block) -> bool {
        let Some(cell) = self.cell_of(block.coordinate) else {
            return false;
        };
        self.solid_array.set(cell, true);
        self.blocks.insert(block.coordinate, block.block_type);
        true
    }

    /// Removes the block at a coordinate.
    ///
    /// # Returns
    /// The type of the removed block, or `None` if the cell was already air.
    pub fn remove(&mut self, coordinate: BlockCoordinate) -> Option<BlockType> {
        let cell = self.cell_of(coordinate)?;
        self.solid_array.set(cell, false);
        self.blocks.remove(&coordinate)
    }

    /// Iterates over all blocks in Y-Z-X cell order.
    pub fn blocks(&self) -> ChunkBlockIterator<'_> {
        ChunkBlockIterator::new(self)
    }

    /// Checks that the occupancy bits and the block map describe the same set.
    pub fn is_consistent(&self) -> bool {
        self.solid_array.count_ones() == self.blocks.len()
            && self
                .blocks
                .keys()
                .all(|coordinate| self.cell_of(*coordinate).is_some_and(|cell| self.solid_array[cell]))
    }
}
