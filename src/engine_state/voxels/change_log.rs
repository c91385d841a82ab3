//! # Change Log
//!
//! The append-only log of player block mutations layered on top of generated
//! terrain.
//!
//! The effective block at a coordinate is the generated block with every change
//! at that coordinate applied in log order, so the last change wins. The log keeps
//! a per-chunk index of entry positions so a chunk can be materialized without
//! scanning the whole history.
//!
//! The log is also the unit of persistence: entries convert to and from the
//! `{x, y, z, type, action}` records stored with a world.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use super::{
    block::{block_type::BlockType, Block, BlockCoordinate},
    chunk::{Chunk, ChunkCoordinate},
};

/// Whether a change adds or removes a block.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeAction {
    Place,
    Remove,
}

/// A single logged mutation.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct BlockChange {
    /// Position in the log. Strictly increasing in append order.
    pub sequence: u64,
    pub coordinate: BlockCoordinate,
    pub action: ChangeAction,
    /// The placed type, or for a remove the type that was removed.
    pub block_type: BlockType,
}

impl BlockChange {
    /// The block this change leaves behind, `None` for a remove.
    pub fn resulting_block(&self) -> Option<Block> {
        match self.action {
            ChangeAction::Place => Some(Block::new(self.coordinate, self.block_type)),
            ChangeAction::Remove => None,
        }
    }
}

/// A change as stored in a world record.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersistedChange {
    pub x: i32,
    pub y: i32,
    pub z: i32,
    /// Lowercase block type name. Kept as a string so records written by newer
    /// clients with unknown types still load.
    #[serde(rename = "type")]
    pub block_type: String,
    pub action: ChangeAction,
}

impl From<&BlockChange> for PersistedChange {
    fn from(change: &BlockChange) -> Self {
        PersistedChange {
            x: change.coordinate.x,
            y: change.coordinate.y,
            z: change.coordinate.z,
            block_type: change.block_type.name().to_string(),
            action: change.action,
        }
    }
}

/// Applies one change to a chunk in place.
///
/// # Returns
/// `false` if the change lies outside the chunk's footprint and was ignored.
pub fn apply_change(chunk: &mut Chunk, change: &BlockChange) -> bool {
    if !chunk.position().contains(change.coordinate) {
        return false;
    }
    match change.resulting_block() {
        Some(block) => chunk.insert(block),
        None => {
            chunk.remove(change.coordinate);
            true
        }
    }
}

/// Produces a new chunk with `changes` applied in order on top of `chunk`.
///
/// Removes subtract, places add or overwrite. Changes outside the chunk's
/// footprint are ignored. The input chunk is left untouched.
pub fn apply_changes<'a, I>(chunk: &Chunk, changes: I) -> Chunk
where
    I: IntoIterator<Item = &'a BlockChange>,
{
    let mut patched = chunk.clone();
    for change in changes {
        apply_change(&mut patched, change);
    }
    patched
}

/// The ordered log of block changes for one world.
#[derive(Debug, Default)]
pub struct ChangeLog {
    entries: Vec<BlockChange>,
    /// Entry indices per chunk, in log order.
    by_chunk: HashMap<ChunkCoordinate, Vec<usize>>,
    /// Highest y ever placed per (x, z) column.
    highest_placement: HashMap<(i32, i32), i32>,
    next_sequence: u64,
}

impl ChangeLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuilds a log from a persisted change list.
    ///
    /// Entries naming unknown block types are skipped with a warning, the rest
    /// keep their relative order.
    pub fn from_persisted(records: &[PersistedChange]) -> Self {
        let mut log = ChangeLog::new();
        for record in records {
            match record.block_type.parse::<BlockType>() {
                Ok(block_type) => {
                    log.append(
                        BlockCoordinate::new(record.x, record.y, record.z),
                        record.action,
                        block_type,
                    );
                }
                Err(err) => {
                    log::warn!(
                        "Skipping persisted change at ({}, {}, {}): {err}",
                        record.x,
                        record.y,
                        record.z
                    );
                }
            }
        }
        log
    }

    /// Appends a change and returns it with its assigned sequence number.
    pub fn append(
        &mut self,
        coordinate: BlockCoordinate,
        action: ChangeAction,
        block_type: BlockType,
    ) -> BlockChange {
        let change = BlockChange {
            sequence: self.next_sequence,
            coordinate,
            action,
            block_type,
        };
        self.next_sequence += 1;

        if action == ChangeAction::Place {
            let top = self
                .highest_placement
                .entry((coordinate.x, coordinate.z))
                .or_insert(coordinate.y);
            *top = (*top).max(coordinate.y);
        }
        self.by_chunk
            .entry(ChunkCoordinate::of_block(coordinate))
            .or_default()
            .push(self.entries.len());
        self.entries.push(change);
        change
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// All entries in log order.
    pub fn entries(&self) -> &[BlockChange] {
        &self.entries
    }

    /// Entries whose coordinate falls inside `position`'s footprint, in log order.
    pub fn changes_in_chunk(
        &self,
        position: ChunkCoordinate,
    ) -> impl Iterator<Item = &BlockChange> + '_ {
        self.by_chunk
            .get(&position)
            .into_iter()
            .flatten()
            .map(|&index| &self.entries[index])
    }

    /// The outcome of the last change at a coordinate.
    ///
    /// # Returns
    /// - `None` if no change touches the coordinate
    /// - `Some(None)` if the last change removed the block
    /// - `Some(Some(block_type))` if the last change placed `block_type`
    pub fn effective_at(&self, coordinate: BlockCoordinate) -> Option<Option<BlockType>> {
        self.changes_in_chunk(ChunkCoordinate::of_block(coordinate))
            .filter(|change| change.coordinate == coordinate)
            .last()
            .map(|change| change.resulting_block().map(|block| block.block_type))
    }

    /// The highest y at which any block was ever placed in a column.
    ///
    /// An upper bound for column scans, the block may since have been removed.
    pub fn highest_placement(&self, x: i32, z: i32) -> Option<i32> {
        self.highest_placement.get(&(x, z)).copied()
    }

    /// Materializes a chunk from raw generated terrain.
    pub fn materialize(&self, generated: &Chunk) -> Chunk {
        apply_changes(generated, self.changes_in_chunk(generated.position()))
    }

    /// The whole log in persisted form.
    pub fn to_persisted(&self) -> Vec<PersistedChange> {
        self.entries.iter().map(PersistedChange::from).collect()
    }
}
