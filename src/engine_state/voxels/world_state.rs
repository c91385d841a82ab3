//! # World State
//!
//! The single-writer owner of everything that describes blocks: the chunk store,
//! the change log and the streaming bookkeeping. Only the simulation timeline
//! mutates it; generation workers hand their results to
//! [`WorldState::merge_generated`] through the task manager.
//!
//! ## Consistency
//!
//! Every materialized chunk equals its generated terrain with all logged changes
//! inside its footprint applied in order. This holds because:
//! - generated terrain is materialized against the log at merge time
//! - a new change patches the affected chunk whether it is active or cached
//! - chunks that are neither will be materialized against the full log later

use std::sync::Arc;

use super::{
    block::{block_coordinate_of, block_type::BlockType, BlockCoordinate},
    change_log::{apply_change, BlockChange, ChangeAction, ChangeLog},
    chunk::{Chunk, ChunkCoordinate, CHUNK_DIMENSION},
    streaming::{Completion, StreamingController},
    tasks::chunk_generation_task::ChunkGenerationTask,
    terrain::TerrainGenerator,
    world::World,
};
use crate::engine_state::{
    camera_state::collision::TerrainQuery,
    config::StreamingConfig,
    error::GenerationError,
    metrics::{Counter, MetricsSink},
    render::RenderEvent,
    task_management::TaskManager,
};

/// Chunk store, change log and streaming state of one world.
pub struct WorldState {
    generator: Arc<TerrainGenerator>,
    store: World,
    changes: ChangeLog,
    streaming: StreamingController,
    render_events: Vec<RenderEvent>,
    metrics: Arc<dyn MetricsSink>,
}

impl WorldState {
    pub fn new(
        generator: Arc<TerrainGenerator>,
        changes: ChangeLog,
        config: &StreamingConfig,
        metrics: Arc<dyn MetricsSink>,
    ) -> Self {
        WorldState {
            generator,
            store: World::new(config.cache_capacity),
            changes,
            streaming: StreamingController::new(config),
            render_events: Vec::new(),
            metrics,
        }
    }

    pub fn generator(&self) -> &Arc<TerrainGenerator> {
        &self.generator
    }

    pub fn store(&self) -> &World {
        &self.store
    }

    pub fn changes(&self) -> &ChangeLog {
        &self.changes
    }

    pub fn streaming(&self) -> &StreamingController {
        &self.streaming
    }

    /// Re-centers streaming on the viewpoint's chunk and hides chunks that left
    /// the visible set.
    ///
    /// # Returns
    /// `true` if the center changed.
    pub fn recenter(&mut self, center: ChunkCoordinate) -> bool {
        let Some(plan) = self.streaming.update_center(center) else {
            return false;
        };
        log::debug!(
            "Streaming centered on {center:?}: {} to load, {} to hide",
            plan.queued,
            plan.to_hide.len()
        );
        for position in plan.to_hide {
            if self.store.evict(&position) {
                self.metrics.increment(Counter::ChunksEvicted);
            }
            self.render_events.push(RenderEvent::ChunkHidden(position));
        }
        true
    }

    /// Runs one rate-limited streaming pass.
    ///
    /// Cached chunks are restored directly. Other pending chunks are published as
    /// generation tasks, at most `generation_budget()` per call.
    ///
    /// # Returns
    /// The number of generation tasks published.
    pub fn dispatch_pending(&mut self, tasks: &mut TaskManager<WorldState>) -> usize {
        let budget = self.streaming.generation_budget();
        let mut dispatched = 0;

        while dispatched < budget {
            let Some(position) = self.streaming.next_pending() else {
                break;
            };

            if let Some(chunk) = self.store.take_cached(&position) {
                self.store.put(chunk);
                self.streaming.mark_visible(position);
                self.metrics.increment(Counter::ChunksRestoredFromCache);
                self.render_events.push(RenderEvent::ChunkShown(position));
                continue;
            }

            if self.streaming.mark_in_flight(position) {
                tasks.publish_task(Box::new(ChunkGenerationTask::new(
                    Arc::clone(&self.generator),
                    position,
                )));
                dispatched += 1;
            }
        }
        dispatched
    }

    /// Merges a generation result on the main timeline.
    ///
    /// Successful terrain is materialized against the change log. Results for
    /// coordinates that are no longer desired go to the eviction cache. Failures
    /// are logged, counted and requeued.
    pub fn merge_generated(
        &mut self,
        position: ChunkCoordinate,
        outcome: Result<Chunk, GenerationError>,
    ) {
        match outcome {
            Ok(raw) => {
                let chunk = self.changes.materialize(&raw);
                self.metrics.increment(Counter::ChunksGenerated);
                match self.streaming.complete(position) {
                    Completion::Show => {
                        self.store.put(chunk);
                        self.render_events.push(RenderEvent::ChunkShown(position));
                    }
                    Completion::Stale => self.store.cache(chunk),
                }
            }
            Err(err) => {
                log::warn!("Generation of chunk {position:?} failed, will retry: {err}");
                self.metrics.increment(Counter::GenerationFailures);
                self.streaming.fail(position);
            }
        }
    }

    /// Appends a change to the log and patches whichever copy of the owning
    /// chunk exists.
    pub fn record_change(
        &mut self,
        coordinate: BlockCoordinate,
        action: ChangeAction,
        block_type: BlockType,
    ) -> BlockChange {
        let change = self.changes.append(coordinate, action, block_type);
        let position = ChunkCoordinate::of_block(coordinate);

        if let Some(chunk) = self.store.get_mut(&position) {
            apply_change(chunk, &change);
            self.render_events.push(RenderEvent::ChunkUpdated(position));
        } else if let Some(chunk) = self.store.cached_mut(&position) {
            apply_change(chunk, &change);
        }
        change
    }

    /// The effective block type at a coordinate: generated terrain plus changes.
    ///
    /// Uses the materialized chunk when there is one.
    pub fn effective_block_type(&self, coordinate: BlockCoordinate) -> Option<BlockType> {
        if let Some(block_type) = self.store.block_type_at(coordinate) {
            return block_type;
        }
        match self.changes.effective_at(coordinate) {
            Some(block_type) => block_type,
            None => self
                .generator
                .block_type(coordinate.x, coordinate.y, coordinate.z),
        }
    }

    /// Whether a solid block occupies the coordinate, counting unapplied changes.
    ///
    /// Water does not occupy its cell; placing into it replaces it.
    pub fn is_occupied(&self, coordinate: BlockCoordinate) -> bool {
        self.effective_block_type(coordinate)
            .is_some_and(BlockType::is_solid)
    }

    /// The materialized block set of a chunk.
    ///
    /// Returns the stored chunk when materialized, otherwise generates terrain
    /// and applies the log without storing anything.
    pub fn materialized_view(&self, position: ChunkCoordinate) -> Result<Chunk, GenerationError> {
        if let Some(chunk) = self.store.get(&position) {
            return Ok(chunk.clone());
        }
        let raw = self.generator.generate_chunk(position)?;
        Ok(self.changes.materialize(&raw))
    }

    /// The height of the walkable surface of a column.
    ///
    /// Scans down for the first solid block, starting from the highest of the
    /// generated height, the top of any materialized chunk in the column and any
    /// logged placement, so placed and removed blocks count. Water is not solid.
    ///
    /// # Returns
    /// One above the top solid block, or 0 for a column dug down to the floor.
    pub fn surface_height_at(&self, x: i32, z: i32) -> i32 {
        self.surface_height_below(x, z, i32::MAX)
    }

    /// Like [`surface_height_at`](Self::surface_height_at), but blocks above
    /// `ceiling` are ignored, as if the column ended there.
    pub fn surface_height_below(&self, x: i32, z: i32, ceiling: i32) -> i32 {
        let generated = self.generator.height(x, z);
        let column = ChunkCoordinate::of_block(BlockCoordinate::new(x, 0, z));
        let highest_chunk_top = self
            .store
            .positions()
            .filter(|p| p.x == column.x && p.z == column.z)
            .filter_map(|p| p.origin())
            .map(|origin| origin.y.saturating_add(CHUNK_DIMENSION - 1))
            .max();
        let start = [highest_chunk_top, self.changes.highest_placement(x, z)]
            .into_iter()
            .flatten()
            .fold(generated, i32::max)
            .min(ceiling);

        (0..=start)
            .rev()
            .find(|&y| {
                self.effective_block_type(BlockCoordinate::new(x, y, z))
                    .is_some_and(BlockType::is_solid)
            })
            .map_or(0, |y| y + 1)
    }

    /// Takes the render events accumulated since the last call.
    pub fn drain_render_events(&mut self) -> Vec<RenderEvent> {
        std::mem::take(&mut self.render_events)
    }
}

impl TerrainQuery for WorldState {
    fn surface_height(&self, x: f32, z: f32, ceiling: f32) -> Option<f32> {
        let x = block_coordinate_of(x)?;
        let z = block_coordinate_of(z)?;
        let ceiling = block_coordinate_of(ceiling)?;
        Some(self.surface_height_below(x, z, ceiling) as f32)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine_state::metrics::CounterMetrics;
    use crate::engine_state::camera_state::{
        camera::Camera,
        collision::{MovementIntent, MovementResolver},
        viewpoint::Viewpoint,
    };
    use crate::engine_state::config::MovementConfig;
    use crate::engine_state::voxels::terrain::SEA_LEVEL;
    use cgmath::Point3;
    use web_time::Duration;

    fn world_state(cache_capacity: usize) -> (WorldState, Arc<CounterMetrics>) {
        let metrics = Arc::new(CounterMetrics::new());
        let config = StreamingConfig {
            render_distance: 1,
            vertical_distance: 0,
            max_generations_per_tick: 2,
            cache_capacity,
        };
        let state = WorldState::new(
            Arc::new(TerrainGenerator::from_seed_string("abc")),
            ChangeLog::new(),
            &config,
            metrics.clone(),
        );
        (state, metrics)
    }

    fn settle(state: &mut WorldState, tasks: &mut TaskManager<WorldState>) {
        for _ in 0..16 {
            state.dispatch_pending(tasks);
            tasks.process_queued_tasks();
            tasks.process_completed_tasks(state);
        }
    }

    #[test]
    fn streaming_pass_is_rate_limited() {
        let (mut state, metrics) = world_state(0);
        let mut tasks = TaskManager::new(0);
        state.recenter(ChunkCoordinate::new(0, 0, 0));

        assert_eq!(state.dispatch_pending(&mut tasks), 2);
        tasks.process_queued_tasks();
        tasks.process_completed_tasks(&mut state);
        assert_eq!(state.store().len(), 2);
        assert_eq!(metrics.get(Counter::ChunksGenerated), 2);

        settle(&mut state, &mut tasks);
        assert_eq!(state.store().len(), 5);
        assert!(state.streaming().is_settled());
    }

    #[test]
    fn changes_during_generation_survive_the_merge() {
        let (mut state, _) = world_state(0);
        let mut tasks = TaskManager::new(0);
        state.recenter(ChunkCoordinate::new(0, 0, 0));
        state.dispatch_pending(&mut tasks);

        let at = BlockCoordinate::new(2, 15, 2);
        state.record_change(at, ChangeAction::Place, BlockType::BRICK);

        tasks.process_queued_tasks();
        tasks.process_completed_tasks(&mut state);
        let chunk = state.store().get(&ChunkCoordinate::new(0, 0, 0)).unwrap();
        assert_eq!(chunk.block_type_at(at), Some(BlockType::BRICK));
    }

    #[test]
    fn evicted_chunks_come_back_from_the_cache_with_changes() {
        let (mut state, metrics) = world_state(16);
        let mut tasks = TaskManager::new(0);
        state.recenter(ChunkCoordinate::new(0, 0, 0));
        settle(&mut state, &mut tasks);

        state.recenter(ChunkCoordinate::new(5, 0, 0));
        settle(&mut state, &mut tasks);
        assert!(state.store().is_cached(&ChunkCoordinate::new(0, 0, 0)));

        let at = BlockCoordinate::new(1, 15, 1);
        state.record_change(at, ChangeAction::Place, BlockType::GLASS);

        state.recenter(ChunkCoordinate::new(0, 0, 0));
        settle(&mut state, &mut tasks);
        assert_eq!(metrics.get(Counter::ChunksRestoredFromCache), 5);
        let chunk = state.store().get(&ChunkCoordinate::new(0, 0, 0)).unwrap();
        assert_eq!(chunk.block_type_at(at), Some(BlockType::GLASS));
        assert_eq!(
            *chunk,
            state
                .changes()
                .materialize(&state.generator().generate_chunk(ChunkCoordinate::new(0, 0, 0)).unwrap())
        );
    }

    #[test]
    fn failed_generation_is_retried() {
        let (mut state, metrics) = world_state(0);
        let mut tasks = TaskManager::new(0);
        state.recenter(ChunkCoordinate::new(0, 0, 0));
        let position = state.streaming.next_pending().unwrap();
        state.streaming.mark_in_flight(position);
        state.merge_generated(position, Err(GenerationError::Panicked("test".into())));
        assert_eq!(metrics.get(Counter::GenerationFailures), 1);

        settle(&mut state, &mut tasks);
        assert!(state.store().contains(&position));
    }

    #[test]
    fn surface_follows_placed_and_removed_blocks() {
        let (mut state, _) = world_state(0);
        let (x, z) = (3, 3);
        let generated = state.generator().height(x, z);
        let base = if generated < SEA_LEVEL { SEA_LEVEL } else { generated };
        let natural = state.surface_height_at(x, z);
        assert_eq!(natural, generated + 1);

        state.record_change(BlockCoordinate::new(x, base + 4, z), ChangeAction::Place, BlockType::STONE);
        assert_eq!(state.surface_height_at(x, z), base + 5);

        state.record_change(BlockCoordinate::new(x, generated, z), ChangeAction::Remove, BlockType::STONE);
        state.record_change(BlockCoordinate::new(x, base + 4, z), ChangeAction::Remove, BlockType::STONE);
        assert_eq!(state.surface_height_at(x, z), generated);
    }

    #[test]
    fn overhangs_do_not_lift_a_standing_player() {
        let (mut state, _) = world_state(0);
        let config = MovementConfig::default();
        let eye = config.eye_height;
        let mut resolver = MovementResolver::new(config);

        let (x, z) = (3, 3);
        let feet = state.surface_height_at(x, z);
        let mut viewpoint = Viewpoint::new(Point3::new(3.5, feet as f32 + eye, 3.5));
        viewpoint.grounded = true;

        state.record_change(BlockCoordinate::new(x, feet + 2, z), ChangeAction::Place, BlockType::STONE);
        assert_eq!(state.surface_height_at(x, z), feet + 3);
        assert_eq!(state.surface_height_below(x, z, feet), feet);

        for _ in 0..10 {
            resolver.step(
                &mut viewpoint,
                &MovementIntent::default(),
                &Camera::default(),
                Duration::from_millis(16),
                &state,
            );
        }
        assert!(viewpoint.grounded);
        assert!((viewpoint.position.y - (feet as f32 + eye)).abs() < 1e-4);
    }

    #[test]
    fn blocks_at_body_height_still_wall_off_a_column() {
        let (mut state, _) = world_state(0);
        let (x, z) = (3, 3);
        let feet = state.surface_height_at(x, z);
        state.record_change(BlockCoordinate::new(x + 1, feet + 1, z), ChangeAction::Place, BlockType::BRICK);

        let eye_level = feet as f32 + 1.6;
        assert_eq!(
            state.surface_height(x as f32 + 1.5, z as f32 + 0.5, eye_level),
            Some((feet + 2) as f32)
        );
    }

    #[test]
    fn materialized_view_does_not_store() {
        let (mut state, _) = world_state(0);
        let at = BlockCoordinate::new(2, 11, 2);
        state.record_change(at, ChangeAction::Place, BlockType::STONE);
        let view = state.materialized_view(ChunkCoordinate::new(0, 0, 0)).unwrap();
        assert_eq!(view.block_type_at(at), Some(BlockType::STONE));
        assert!(state.store().is_empty());
        assert!(state.drain_render_events().is_empty());
    }
}
