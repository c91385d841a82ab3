//! # World Module
//!
//! This module provides the `World` struct, the chunk store. It owns every
//! materialized chunk and is the only place chunk data lives.
//!
//! ## Architecture
//!
//! The world uses sparse storage: only chunks the streaming controller asked for
//! are kept, in a hash map keyed by chunk coordinate. Chunks that leave the
//! visible set are moved into a bounded LRU cache instead of being dropped, so
//! walking back over old ground restores them without regenerating.
//!
//! The store does not generate or patch chunks itself. Callers hand it fully
//! materialized chunks (terrain plus change log) and keep cached copies patched
//! through [`World::cached_mut`].
//!
//! ## Performance Considerations
//!
//! - Chunk lookup is O(1) using a hash map
//! - Cache lookups do not refresh recency, only restores do

use std::{collections::HashMap, num::NonZeroUsize};

use lru::LruCache;

use super::{
    block::{block_type::BlockType, BlockCoordinate},
    chunk::{Chunk, ChunkCoordinate},
};

/// The chunk store of a voxel world.
pub struct World {
    /// Materialized chunks, keyed by chunk coordinate.
    chunks: HashMap<ChunkCoordinate, Chunk>,
    /// Recently evicted chunks. `None` when caching is disabled.
    evicted: Option<LruCache<ChunkCoordinate, Chunk>>,
}

impl World {
    /// Creates a new, empty world.
    ///
    /// # Arguments
    /// * `cache_capacity` - Number of evicted chunks to retain, 0 disables the cache
    pub fn new(cache_capacity: usize) -> Self {
        World {
            chunks: HashMap::new(),
            evicted: NonZeroUsize::new(cache_capacity).map(LruCache::new),
        }
    }

    /// Retrieves the chunk at the specified chunk coordinates.
    pub fn get(&self, position: &ChunkCoordinate) -> Option<&Chunk> {
        self.chunks.get(position)
    }

    pub fn get_mut(&mut self, position: &ChunkCoordinate) -> Option<&mut Chunk> {
        self.chunks.get_mut(position)
    }

    pub fn contains(&self, position: &ChunkCoordinate) -> bool {
        self.chunks.contains_key(position)
    }

    /// Inserts a chunk under its own position, replacing any previous entry.
    ///
    /// A cached copy of the same chunk is discarded so the store never holds two.
    ///
    /// # Returns
    /// The replaced chunk, if any.
    pub fn put(&mut self, chunk: Chunk) -> Option<Chunk> {
        let position = chunk.position();
        if let Some(cache) = self.evicted.as_mut() {
            cache.pop(&position);
        }
        self.chunks.insert(position, chunk)
    }

    /// Removes a chunk from the store entirely, bypassing the cache.
    pub fn remove(&mut self, position: &ChunkCoordinate) -> Option<Chunk> {
        self.chunks.remove(position)
    }

    /// Moves a chunk from the active set into the eviction cache.
    ///
    /// # Returns
    /// `true` if a chunk was active at `position`.
    pub fn evict(&mut self, position: &ChunkCoordinate) -> bool {
        let Some(chunk) = self.chunks.remove(position) else {
            return false;
        };
        self.cache(chunk);
        true
    }

    /// Stores a chunk directly in the eviction cache.
    ///
    /// Used for generation results that arrive after their coordinate left the
    /// visible set. Dropped if caching is disabled.
    pub fn cache(&mut self, chunk: Chunk) {
        if let Some(cache) = self.evicted.as_mut() {
            cache.put(chunk.position(), chunk);
        }
    }

    /// Removes and returns a cached chunk so it can be made active again.
    pub fn take_cached(&mut self, position: &ChunkCoordinate) -> Option<Chunk> {
        self.evicted.as_mut()?.pop(position)
    }

    /// Mutable access to a cached chunk without refreshing its recency.
    pub fn cached_mut(&mut self, position: &ChunkCoordinate) -> Option<&mut Chunk> {
        self.evicted.as_mut()?.peek_mut(position)
    }

    pub fn is_cached(&self, position: &ChunkCoordinate) -> bool {
        self.evicted
            .as_ref()
            .is_some_and(|cache| cache.contains(position))
    }

    /// Number of active chunks.
    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }

    pub fn cached_len(&self) -> usize {
        self.evicted.as_ref().map_or(0, LruCache::len)
    }

    /// Positions of all active chunks.
    pub fn positions(&self) -> impl Iterator<Item = &ChunkCoordinate> + '_ {
        self.chunks.keys()
    }

    /// The block type at a coordinate among active chunks.
    ///
    /// # Returns
    /// - `None` if the owning chunk is not materialized
    /// - `Some(None)` for air inside a materialized chunk
    pub fn block_type_at(&self, coordinate: BlockCoordinate) -> Option<Option<BlockType>> {
        self.chunks
            .get(&ChunkCoordinate::of_block(coordinate))
            .map(|chunk| chunk.block_type_at(coordinate))
    }
}
