//! # Chunk Generation Task
//!
//! This module defines the `ChunkGenerationTask` which generates the raw terrain
//! of one chunk on a worker. This task is scheduled by the streaming pass when a
//! visible chunk is neither active nor cached.
//!
//! The task only reads the shared, immutable terrain generator. Block changes
//! are applied when the result is merged on the main timeline, so a change made
//! while the chunk was generating is never lost.

use std::{
    any::Any,
    panic::{self, AssertUnwindSafe},
    sync::Arc,
};

use crate::engine_state::{
    error::GenerationError,
    task_management::task::{Task, TaskResult},
    voxels::{
        chunk::{Chunk, ChunkCoordinate},
        terrain::TerrainGenerator,
        world_state::WorldState,
    },
};

/// A task that generates chunk terrain off the simulation timeline.
pub struct ChunkGenerationTask {
    /// The shared terrain generator
    generator: Arc<TerrainGenerator>,
    /// The position of the chunk to generate (in chunk coordinates)
    position: ChunkCoordinate,
}

impl ChunkGenerationTask {
    /// Creates a new chunk generation task.
    ///
    /// # Arguments
    /// * `generator` - The world's terrain generator
    /// * `position` - The chunk coordinates where the chunk should be generated
    pub fn new(generator: Arc<TerrainGenerator>, position: ChunkCoordinate) -> Self {
        ChunkGenerationTask { generator, position }
    }
}

/// Extracts a readable message from a panic payload.
fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic payload".to_string()
    }
}

impl Task<WorldState> for ChunkGenerationTask {
    /// Generates the chunk.
    ///
    /// A panic inside generation is caught and reported as
    /// `GenerationError::Panicked` so one bad chunk cannot take down a worker.
    fn process(&self) -> Box<dyn TaskResult<WorldState> + Send> {
        let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
            self.generator.generate_chunk(self.position)
        }))
        .unwrap_or_else(|payload| Err(GenerationError::Panicked(panic_message(payload.as_ref()))));

        Box::new(ChunkGenerationTaskResult {
            position: self.position,
            outcome,
        })
    }
}

/// The result of a chunk generation task.
pub struct ChunkGenerationTaskResult {
    position: ChunkCoordinate,
    outcome: Result<Chunk, GenerationError>,
}

impl TaskResult<WorldState> for ChunkGenerationTaskResult {
    /// Merges the generated terrain into the world on the main timeline.
    fn handle_result(
        self: Box<Self>,
        world: &mut WorldState,
    ) -> Vec<Box<dyn Task<WorldState> + Send>> {
        world.merge_generated(self.position, self.outcome);
        Vec::new()
    }
}
