//! # Chunk Iteration Module
//!
//! This module provides an iterator over all blocks in a chunk that walks the
//! occupancy bit vector, so air cells are skipped without touching the block map
//! and blocks come out in a stable Y-Z-X order (useful for renderers that want
//! deterministic geometry).

use bitvec::{order::Lsb0, slice::IterOnes};

use crate::engine_state::voxels::block::{Block, BlockCoordinate};

use super::{Chunk, CHUNK_DIMENSION, CHUNK_PLANE_SIZE};

/// An iterator over all blocks in a chunk.
///
/// It scans the set bits of the chunk's `solid_array` and resolves each one to the
/// block stored in the chunk's map.
pub struct ChunkBlockIterator<'a> {
    /// Reference to the chunk being iterated over
    chunk_ref: &'a Chunk,
    /// Remaining filled cells
    cells: IterOnes<'a, usize, Lsb0>,
    /// World coordinate of the chunk's minimum corner
    origin: Option<BlockCoordinate>,
}

impl<'a> ChunkBlockIterator<'a> {
    /// Creates a new `ChunkBlockIterator` for the given chunk.
    pub fn new(chunk_ref: &'a Chunk) -> Self {
        ChunkBlockIterator {
            chunk_ref,
            cells: chunk_ref.solid_array.iter_ones(),
            origin: chunk_ref.position.origin(),
        }
    }
}

impl Iterator for ChunkBlockIterator<'_> {
    type Item = Block;

    fn next(&mut self) -> Option<Block> {
        let origin = self.origin?;
        for cell in self.cells.by_ref() {
            let cell = cell as i32;
            let coordinate = origin.offset(
                cell % CHUNK_DIMENSION,
                cell / CHUNK_PLANE_SIZE,
                (cell / CHUNK_DIMENSION) % CHUNK_DIMENSION,
            );
            if let Some(block) = self.chunk_ref.get(coordinate) {
                return Some(block);
            }
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine_state::voxels::block::block_type::BlockType;
    use crate::engine_state::voxels::chunk::ChunkCoordinate;

    #[test]
    fn yields_every_block_once_in_layer_order() {
        let mut chunk = Chunk::empty(ChunkCoordinate::new(0, 0, 0));
        let placed = [
            BlockCoordinate::new(3, 2, 0),
            BlockCoordinate::new(0, 0, 1),
            BlockCoordinate::new(15, 15, 15),
            BlockCoordinate::new(1, 0, 0),
        ];
        for coordinate in placed {
            chunk.insert(Block::new(coordinate, BlockType::BRICK));
        }

        let visited: Vec<BlockCoordinate> = chunk.blocks().map(|block| block.coordinate).collect();
        assert_eq!(
            visited,
            vec![
                BlockCoordinate::new(1, 0, 0),
                BlockCoordinate::new(0, 0, 1),
                BlockCoordinate::new(3, 2, 0),
                BlockCoordinate::new(15, 15, 15),
            ]
        );
    }

    #[test]
    fn empty_chunk_yields_nothing() {
        let chunk = Chunk::empty(ChunkCoordinate::new(-3, 1, 2));
        assert_eq!(chunk.blocks().count(), 0);
    }
}
