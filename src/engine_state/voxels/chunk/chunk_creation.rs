//! # Chunk Creation Module
//!
//! This module provides a cursor-based builder that fills a chunk cell by cell in
//! the same Y-Z-X order the chunk's occupancy bits use. Terrain generation pushes
//! one optional block type per cell and the builder keeps the bit vector and the
//! block map consistent as it goes.

use super::{Chunk, ChunkCoordinate, CHUNK_DIMENSION};
use crate::engine_state::voxels::block::{block_type::BlockType, Block, BlockCoordinate};

/// A builder for creating and populating a chunk one cell at a time.
///
/// Cells are visited with X varying fastest, then Z, then Y, so a full layer of the
/// chunk is written before moving up.
pub struct ChunkCreationIterator {
    /// The chunk being built
    chunk: Chunk,
    /// World coordinate of the chunk's minimum corner
    origin: BlockCoordinate,
    /// Current X position within the chunk (0..CHUNK_DIMENSION)
    local_x: i32,
    /// Current Y position within the chunk (0..CHUNK_DIMENSION)
    local_y: i32,
    /// Current Z position within the chunk (0..CHUNK_DIMENSION)
    local_z: i32,
    /// Whether every cell has been written
    finished: bool,
}

impl ChunkCreationIterator {
    /// Creates a new `ChunkCreationIterator` for building a chunk at the given position.
    ///
    /// # Arguments
    /// * `position` - The chunk coordinate of the chunk to create
    /// * `origin` - The block coordinate of the chunk's minimum corner
    pub fn new(position: ChunkCoordinate, origin: BlockCoordinate) -> Self {
        ChunkCreationIterator {
            chunk: Chunk::empty(position),
            origin,
            local_x: 0,
            local_y: 0,
            local_z: 0,
            finished: false,
        }
    }

    /// The world coordinate of the cell the next push will write.
    pub fn current_coordinate(&self) -> BlockCoordinate {
        self.origin.offset(self.local_x, self.local_y, self.local_z)
    }

    /// Whether all cells of the chunk have been written.
    pub fn is_finished(&self) -> bool {
        self.finished
    }

    /// Writes the current cell and advances the cursor.
    ///
    /// `None` leaves the cell as air. Pushing past the last cell is a no-op.
    pub fn push_block_type(&mut self, block_type: Option<BlockType>) {
        if self.finished {
            return;
        }

        if let Some(block_type) = block_type {
            let coordinate = self.current_coordinate();
            self.chunk.insert(Block::new(coordinate, block_type));
        }

        // Move to the next position
        self.local_x += 1;
        if self.local_x == CHUNK_DIMENSION {
            self.local_x = 0;
            self.local_z += 1;
            if self.local_z == CHUNK_DIMENSION {
                self.local_z = 0;
                self.local_y += 1;
                if self.local_y == CHUNK_DIMENSION {
                    self.finished = true;
                }
            }
        }
    }

    /// Finalizes the chunk creation and returns the constructed `Chunk`.
    ///
    /// Cells that were never pushed stay air.
    pub fn return_chunk(self) -> Chunk {
        self.chunk
    }
}
