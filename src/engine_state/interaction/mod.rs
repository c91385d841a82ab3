//! # Interaction
//!
//! Turns break and place requests into change log entries.
//!
//! Each tick the engine casts a ray from the viewpoint through a [`HitTester`],
//! picks a [`TargetSelection`] and then validates requests against it:
//! - a target must exist within reach
//! - a global cooldown separates any two interactions
//! - the same coordinate cannot be hit twice within the guard window
//! - placements must land in an empty cell outside the player's body
//!
//! Rejections are not errors; they are counted and nothing changes.

use std::{collections::HashMap, sync::Arc};

use thiserror::Error;
use web_time::{Duration, Instant};

use crate::engine_state::{
    config::InteractionConfig,
    metrics::{Counter, MetricsSink},
    voxels::{
        block::{block_type::BlockType, BlockCoordinate},
        change_log::{BlockChange, ChangeAction},
        world_state::WorldState,
    },
};

pub mod hit_test;
pub mod targeting;

pub use hit_test::{HitTester, RayHit, VoxelRaycaster};
pub use targeting::{select_target, TargetSelection};

/// Why a request produced no change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum Rejection {
    #[error("no block targeted")]
    NoTarget,
    #[error("target is out of reach")]
    OutOfReach,
    #[error("interaction cooldown has not elapsed")]
    Cooldown,
    #[error("coordinate {0} was changed too recently")]
    SameBlock(BlockCoordinate),
    #[error("targeted block is no longer there")]
    NothingToBreak,
    #[error("placement cell {0} is occupied")]
    Occupied(BlockCoordinate),
    #[error("placement cell {0} overlaps the player")]
    InsidePlayer(BlockCoordinate),
}

/// Validates and applies break and place requests.
pub struct InteractionEngine {
    config: InteractionConfig,
    last_interaction: Option<Instant>,
    /// Last successful interaction per coordinate, within the guard window
    recent: HashMap<BlockCoordinate, Instant>,
    metrics: Arc<dyn MetricsSink>,
}

impl InteractionEngine {
    pub fn new(config: InteractionConfig, metrics: Arc<dyn MetricsSink>) -> Self {
        InteractionEngine {
            config,
            last_interaction: None,
            recent: HashMap::new(),
            metrics,
        }
    }

    pub fn reach(&self) -> f32 {
        self.config.reach
    }

    /// Removes the targeted block.
    ///
    /// # Arguments
    /// * `target` - This tick's target, if any
    /// * `world` - Receives the remove change
    /// * `now` - Current time for the cooldown and guard
    ///
    /// # Returns
    /// The logged change, or why nothing happened
    pub fn try_break(
        &mut self,
        target: Option<&TargetSelection>,
        world: &mut WorldState,
        now: Instant,
    ) -> Result<BlockChange, Rejection> {
        let result = self.validate_break(target, world, now).map(|(block, block_type)| {
            world.record_change(block, ChangeAction::Remove, block_type)
        });
        self.finish(result, Counter::BlocksBroken, now)
    }

    /// Places `selected` against the targeted face.
    ///
    /// # Arguments
    /// * `target` - This tick's target, if any
    /// * `selected` - The block type to place
    /// * `feet` - The block containing the player's feet
    /// * `world` - Receives the place change
    /// * `now` - Current time for the cooldown and guard
    ///
    /// # Returns
    /// The logged change, or why nothing happened
    pub fn try_place(
        &mut self,
        target: Option<&TargetSelection>,
        selected: BlockType,
        feet: Option<BlockCoordinate>,
        world: &mut WorldState,
        now: Instant,
    ) -> Result<BlockChange, Rejection> {
        let result = self
            .validate_place(target, feet, world, now)
            .map(|placement| world.record_change(placement, ChangeAction::Place, selected));
        self.finish(result, Counter::BlocksPlaced, now)
    }

    fn validate_break(
        &self,
        target: Option<&TargetSelection>,
        world: &WorldState,
        now: Instant,
    ) -> Result<(BlockCoordinate, BlockType), Rejection> {
        let target = self.check_target(target, now)?;
        self.check_guard(target.block, now)?;
        let block_type = world
            .effective_block_type(target.block)
            .ok_or(Rejection::NothingToBreak)?;
        Ok((target.block, block_type))
    }

    fn validate_place(
        &self,
        target: Option<&TargetSelection>,
        feet: Option<BlockCoordinate>,
        world: &WorldState,
        now: Instant,
    ) -> Result<BlockCoordinate, Rejection> {
        let target = self.check_target(target, now)?;
        let placement = target.placement;
        self.check_guard(placement, now)?;
        if world.is_occupied(placement) {
            return Err(Rejection::Occupied(placement));
        }
        if let Some(feet) = feet {
            if placement == feet || placement == feet.offset(0, 1, 0) {
                return Err(Rejection::InsidePlayer(placement));
            }
        }
        Ok(placement)
    }

    fn check_target<'t>(
        &self,
        target: Option<&'t TargetSelection>,
        now: Instant,
    ) -> Result<&'t TargetSelection, Rejection> {
        let target = target.ok_or(Rejection::NoTarget)?;
        if !(target.distance <= self.config.reach) {
            return Err(Rejection::OutOfReach);
        }
        if let Some(last) = self.last_interaction {
            if now.saturating_duration_since(last) < self.config.cooldown() {
                return Err(Rejection::Cooldown);
            }
        }
        Ok(target)
    }

    fn check_guard(&self, coordinate: BlockCoordinate, now: Instant) -> Result<(), Rejection> {
        match self.recent.get(&coordinate) {
            Some(&at) if now.saturating_duration_since(at) < self.config.same_block_guard() => {
                Err(Rejection::SameBlock(coordinate))
            }
            _ => Ok(()),
        }
    }

    /// Records bookkeeping and metrics for a request outcome.
    fn finish(
        &mut self,
        result: Result<BlockChange, Rejection>,
        success: Counter,
        now: Instant,
    ) -> Result<BlockChange, Rejection> {
        match &result {
            Ok(change) => {
                self.last_interaction = Some(now);
                let guard = self.config.same_block_guard();
                self.recent
                    .retain(|_, at| now.saturating_duration_since(*at) < guard);
                self.recent.insert(change.coordinate, now);
                self.metrics.increment(success);
                log::debug!("{:?} {} at {}", change.action, change.block_type, change.coordinate);
            }
            Err(rejection) => {
                self.metrics.increment(Counter::InteractionsRejected);
                log::trace!("Interaction rejected: {rejection}");
            }
        }
        result
    }

    /// Time left before the next interaction is allowed.
    pub fn cooldown_remaining(&self, now: Instant) -> Duration {
        self.last_interaction
            .map(|last| {
                self.config
                    .cooldown()
                    .saturating_sub(now.saturating_duration_since(last))
            })
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine_state::{
        config::StreamingConfig,
        metrics::CounterMetrics,
        voxels::{
            block::block_side::BlockSide, change_log::ChangeLog, terrain::TerrainGenerator,
        },
    };

    fn setup() -> (InteractionEngine, WorldState, Arc<CounterMetrics>) {
        let metrics = Arc::new(CounterMetrics::new());
        let world = WorldState::new(
            Arc::new(TerrainGenerator::from_seed_string("abc")),
            ChangeLog::new(),
            &StreamingConfig::default(),
            metrics.clone(),
        );
        let engine = InteractionEngine::new(InteractionConfig::default(), metrics.clone());
        (engine, world, metrics)
    }

    /// Targets the top of the surface block in column (x, z).
    fn surface_target(world: &WorldState, x: i32, z: i32, distance: f32) -> TargetSelection {
        let top = world.surface_height_at(x, z) - 1;
        let block = BlockCoordinate::new(x, top, z);
        TargetSelection {
            block,
            face: BlockSide::TOP,
            placement: BlockSide::TOP.adjacent(block),
            distance,
        }
    }

    #[test]
    fn break_removes_the_target() {
        let (mut engine, mut world, metrics) = setup();
        let target = surface_target(&world, 2, 2, 2.0);
        let change = engine.try_break(Some(&target), &mut world, Instant::now()).unwrap();
        assert_eq!(change.action, ChangeAction::Remove);
        assert!(!world.is_occupied(target.block));
        assert_eq!(metrics.get(Counter::BlocksBroken), 1);
    }

    #[test]
    fn out_of_reach_targets_change_nothing() {
        let (mut engine, mut world, metrics) = setup();
        let target = surface_target(&world, 2, 2, 5.5);
        assert_eq!(
            engine.try_break(Some(&target), &mut world, Instant::now()),
            Err(Rejection::OutOfReach)
        );
        assert!(world.changes().is_empty());
        assert_eq!(metrics.get(Counter::InteractionsRejected), 1);
    }

    #[test]
    fn repeated_breaks_on_one_coordinate_log_once() {
        let (mut engine, mut world, _) = setup();
        let target = surface_target(&world, 2, 2, 2.0);
        let start = Instant::now();
        assert!(engine.try_break(Some(&target), &mut world, start).is_ok());
        assert_eq!(
            engine.try_break(Some(&target), &mut world, start + Duration::from_millis(600)),
            Err(Rejection::SameBlock(target.block))
        );
        assert_eq!(world.changes().len(), 1);
    }

    #[test]
    fn cooldown_separates_interactions() {
        let (mut engine, mut world, _) = setup();
        let first = surface_target(&world, 2, 2, 2.0);
        let second = surface_target(&world, 4, 4, 2.0);
        let start = Instant::now();
        assert!(engine.try_break(Some(&first), &mut world, start).is_ok());
        assert_eq!(
            engine.try_break(Some(&second), &mut world, start + Duration::from_millis(100)),
            Err(Rejection::Cooldown)
        );
        assert!(engine
            .try_break(Some(&second), &mut world, start + Duration::from_millis(250))
            .is_ok());
        assert_eq!(world.changes().len(), 2);
    }

    #[test]
    fn placement_checks_occupancy_and_player_space() {
        let (mut engine, mut world, metrics) = setup();
        let target = surface_target(&world, 2, 2, 2.0);
        let start = Instant::now();

        let feet = Some(target.placement);
        assert_eq!(
            engine.try_place(Some(&target), BlockType::STONE, feet, &mut world, start),
            Err(Rejection::InsidePlayer(target.placement))
        );
        let head = Some(target.placement.offset(0, -1, 0));
        assert_eq!(
            engine.try_place(Some(&target), BlockType::STONE, head, &mut world, start),
            Err(Rejection::InsidePlayer(target.placement))
        );

        let elsewhere = Some(BlockCoordinate::new(20, 20, 20));
        let change = engine
            .try_place(Some(&target), BlockType::WOOD, elsewhere, &mut world, start)
            .unwrap();
        assert_eq!(change.coordinate, target.placement);
        assert_eq!(world.effective_block_type(target.placement), Some(BlockType::WOOD));

        let later = start + Duration::from_secs(2);
        assert_eq!(
            engine.try_place(Some(&target), BlockType::WOOD, elsewhere, &mut world, later),
            Err(Rejection::Occupied(target.placement))
        );
        assert_eq!(metrics.get(Counter::BlocksPlaced), 1);
        assert_eq!(metrics.get(Counter::InteractionsRejected), 3);
    }

    #[test]
    fn missing_target_is_rejected() {
        let (mut engine, mut world, _) = setup();
        assert_eq!(
            engine.try_place(None, BlockType::STONE, None, &mut world, Instant::now()),
            Err(Rejection::NoTarget)
        );
    }
}
