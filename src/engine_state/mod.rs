//! # Engine State Module
//!
//! The core engine module that owns one world session and advances it tick by tick.
//!
//! ## Key Components
//!
//! * `EngineState` - The main state container for the engine
//! * `camera_state` - Look orientation, movement and collision
//! * `voxels` - Terrain generation, chunks, the change log and streaming
//! * `interaction` - Targeting and block break/place
//! * `persistence` - World records and change synchronisation
//! * `task_management` - Manages background chunk generation workers
//!
//! ## Architecture
//!
//! Everything that mutates world state runs on one timeline, in this order per tick:
//!
//! 1. Take the player's intents
//! 2. Resolve movement and collision against the world's surface query
//! 3. Re-center streaming when the viewpoint changes chunk and dispatch generation
//! 4. Merge finished generation results
//! 5. Recompute the target
//! 6. Apply break and place requests
//! 7. Poll the change syncer
//! 8. Forward render events and report metrics
//!
//! Generation workers and the sync thread only ever receive copies, and their
//! results are merged back in steps 4 and 7.

use std::{mem, sync::Arc};

use cgmath::Point3;
use web_time::{Duration, Instant};

use camera_state::{
    camera::Camera,
    viewpoint::{Viewpoint, ViewpointObserver},
    CameraState, CameraUpdates,
};
use config::EngineConfig;
use error::{EngineError, GenerationError, PersistenceError};
use interaction::{select_target, HitTester, InteractionEngine, TargetSelection, VoxelRaycaster};
use metrics::{Counter, CounterMetrics, MetricsReporter, MetricsSink};
use persistence::{ChangeSyncer, PersistenceClient, WorldData};
use render::{dispatch_render_events, ChunkRenderer, RenderEvent};
use task_management::TaskManager;
use voxels::{
    block::{block_type::BlockType, BlockCoordinate},
    change_log::{BlockChange, ChangeAction, ChangeLog},
    chunk::{Chunk, ChunkCoordinate},
    terrain::TerrainGenerator,
    world_state::WorldState,
};

pub mod camera_state;
pub mod config;
pub mod error;
pub mod interaction;
pub mod metrics;
pub mod persistence;
pub mod render;
pub mod task_management;
pub mod voxels;

/// The main state container for one world session
///
/// This struct owns every subsystem and runs them in a fixed order each tick.
/// Collaborators (renderer, observers, persistence) are attached from outside.
///
/// # Examples
///
/// ```no_run
/// use std::sync::Arc;
/// use voxel_world::engine_state::{
///     config::EngineConfig, persistence::InMemoryPersistence, EngineState, PlayerAction,
/// };
/// use web_time::{Duration, Instant};
///
/// let store = Arc::new(InMemoryPersistence::new());
/// let mut engine = EngineState::create(EngineConfig::default(), store, "abc").unwrap();
///
/// loop {
///     engine.set_input_commands(PlayerAction::default());
///     engine.tick(Duration::from_millis(16), Instant::now());
/// }
/// ```
pub struct EngineState {
    config: EngineConfig,
    /// The world record this session was created from
    world_id: u64,
    seed: String,
    /// Camera state managing orientation, position and movement
    pub camera_state: CameraState,
    /// Intents for the next tick
    player_actions: PlayerAction,
    /// Chunk store, change log and streaming state
    world: WorldState,
    /// Task manager for chunk generation
    task_manager: TaskManager<WorldState>,
    interaction: InteractionEngine,
    /// The block under the crosshair after the last tick
    target: Option<TargetSelection>,
    syncer: ChangeSyncer,
    metrics: Arc<CounterMetrics>,
    reporter: Option<MetricsReporter>,
    renderer: Option<Box<dyn ChunkRenderer>>,
    /// Render events kept for `drain_render_events` when no renderer is attached
    render_events: Vec<RenderEvent>,
    observers: Vec<Box<dyn ViewpointObserver>>,
}

impl EngineState {
    /// Creates a new world record with `seed` and starts a session on it.
    ///
    /// # Arguments
    ///
    /// * `config` - Engine configuration, validated here
    /// * `client` - The persistence collaborator
    /// * `seed` - Generation seed for the new world
    ///
    /// # Returns
    ///
    /// A session with the viewpoint standing on the surface at the origin, or the
    /// setup failure
    pub fn create(
        config: EngineConfig,
        client: Arc<dyn PersistenceClient>,
        seed: &str,
    ) -> Result<Self, EngineError> {
        config.validate()?;
        let world = client.create_world(seed)?;
        log::info!("Created world {} with seed {:?}", world.id, world.seed);
        Ok(Self::from_world(config, client, world))
    }

    /// Loads an existing world record and starts a session on it.
    ///
    /// Its logged changes are replayed over the regenerated terrain.
    pub fn load(
        config: EngineConfig,
        client: Arc<dyn PersistenceClient>,
        world_id: u64,
    ) -> Result<Self, EngineError> {
        config.validate()?;
        let world = client.get_world(world_id)?;
        log::info!(
            "Loaded world {} with seed {:?} and {} changes",
            world.id,
            world.seed,
            world.changes.len()
        );
        Ok(Self::from_world(config, client, world))
    }

    fn from_world(config: EngineConfig, client: Arc<dyn PersistenceClient>, data: WorldData) -> Self {
        let metrics = Arc::new(CounterMetrics::new());
        let sink: Arc<dyn MetricsSink> = metrics.clone();

        let generator = Arc::new(TerrainGenerator::from_seed_string(&data.seed));
        let changes = ChangeLog::from_persisted(&data.changes);
        let world = WorldState::new(generator, changes, &config.streaming, sink.clone());

        let spawn = Point3::new(
            0.5,
            world.surface_height_at(0, 0) as f32 + config.movement.eye_height,
            0.5,
        );
        let camera_state = CameraState::new(spawn, &config.movement);

        let syncer = ChangeSyncer::new(data.id, client, config.sync.debounce(), sink.clone());
        let interaction = InteractionEngine::new(config.interaction.clone(), sink);
        let reporter = config
            .metrics
            .enabled
            .then(|| MetricsReporter::new(config.metrics.snapshot_interval()));

        EngineState {
            task_manager: TaskManager::new(config.worker_threads),
            world_id: data.id,
            seed: data.seed,
            camera_state,
            player_actions: PlayerAction::default(),
            world,
            interaction,
            target: None,
            syncer,
            metrics,
            reporter,
            renderer: None,
            render_events: Vec::new(),
            observers: Vec::new(),
            config,
        }
    }

    pub fn world_id(&self) -> u64 {
        self.world_id
    }

    pub fn seed(&self) -> &str {
        &self.seed
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn world(&self) -> &WorldState {
        &self.world
    }

    pub fn viewpoint(&self) -> &Viewpoint {
        &self.camera_state.viewpoint
    }

    pub fn camera(&self) -> &Camera {
        &self.camera_state.camera
    }

    /// The target computed by the last tick.
    pub fn target(&self) -> Option<&TargetSelection> {
        self.target.as_ref()
    }

    pub fn metrics(&self) -> &CounterMetrics {
        &self.metrics
    }

    pub fn syncer(&self) -> &ChangeSyncer {
        &self.syncer
    }

    /// Attaches a renderer. Events already buffered are handed to it on the next tick.
    pub fn set_renderer(&mut self, renderer: Box<dyn ChunkRenderer>) {
        self.renderer = Some(renderer);
    }

    pub fn add_observer(&mut self, observer: Box<dyn ViewpointObserver>) {
        self.observers.push(observer);
    }

    /// Sets the intents consumed by the next tick.
    ///
    /// # Arguments
    /// * `actions` - Movement, look and interaction requests
    pub fn set_input_commands(&mut self, actions: PlayerAction) {
        self.player_actions = actions;
    }

    /// Moves the viewpoint. Streaming follows on the next tick.
    pub fn teleport(&mut self, position: Point3<f32>) {
        self.camera_state.teleport(position);
    }

    /// Advances the session by one tick.
    ///
    /// # Arguments
    ///
    /// * `dt` - The time elapsed since the last tick
    /// * `now` - The current time, for cooldowns, debouncing and throttling
    pub fn tick(&mut self, dt: Duration, now: Instant) {
        let actions = mem::take(&mut self.player_actions);

        let CameraUpdates {
            new_chunk_position,
            notification,
        } = self.camera_state.update(&actions, dt, &self.world, now);

        if let Some(update) = notification {
            for observer in &mut self.observers {
                observer.viewpoint_changed(&update);
            }
            self.metrics.increment(Counter::ViewpointNotifications);
        }

        if let Some(center) = new_chunk_position {
            self.world.recenter(center);
        }
        self.process_tasks();

        self.target = self.compute_target();
        self.process_interactions(&actions, now);

        self.syncer.poll(now);

        let events = self.world.drain_render_events();
        match self.renderer.as_mut() {
            Some(renderer) => {
                let buffered = mem::take(&mut self.render_events);
                dispatch_render_events(&buffered, self.world.store(), &mut **renderer);
                dispatch_render_events(&events, self.world.store(), &mut **renderer);
            }
            None => self.render_events.extend(events),
        }

        if let Some(reporter) = self.reporter.as_mut() {
            reporter.poll(&self.metrics, now);
        }
    }

    /// Dispatches pending generation and merges finished results.
    ///
    /// This is called every tick so that chunk generation keeps flowing even
    /// when the viewpoint stands still.
    pub fn process_tasks(&mut self) {
        self.world.dispatch_pending(&mut self.task_manager);
        self.task_manager.process_queued_tasks();
        self.task_manager.process_completed_tasks(&mut self.world);
    }

    /// Casts from the viewpoint along the look direction.
    fn compute_target(&self) -> Option<TargetSelection> {
        let origin = self.camera_state.viewpoint.position;
        let direction = self.camera_state.camera.get_view_vec();
        let reach = self.interaction.reach();

        let raycaster;
        let tester: &dyn HitTester = match self.renderer.as_ref().and_then(|r| r.hit_tester()) {
            Some(tester) => tester,
            None => {
                raycaster = VoxelRaycaster::new(self.world.store());
                &raycaster
            }
        };
        let hits = tester.cast_ray(origin, direction, reach + 1.0);
        select_target(&hits, origin, reach)
    }

    fn process_interactions(&mut self, actions: &PlayerAction, now: Instant) {
        let target = self.target;
        if actions.break_block {
            if let Ok(change) = self.interaction.try_break(target.as_ref(), &mut self.world, now) {
                self.syncer.enqueue(&change, now);
            }
        }
        if let Some(selected) = actions.place_block {
            let feet = self.camera_state.feet_block();
            let placed =
                self.interaction
                    .try_place(target.as_ref(), selected, feet, &mut self.world, now);
            if let Ok(change) = placed {
                self.syncer.enqueue(&change, now);
            }
        }
    }

    /// Logs a change directly, bypassing targeting, and queues it for sync.
    ///
    /// The owning chunk is patched immediately if it is materialized.
    pub fn apply_block_change(
        &mut self,
        coordinate: BlockCoordinate,
        action: ChangeAction,
        block_type: BlockType,
        now: Instant,
    ) -> BlockChange {
        let change = self.world.record_change(coordinate, action, block_type);
        self.syncer.enqueue(&change, now);
        change
    }

    /// The materialized block set of any chunk, loaded or not.
    pub fn chunk_view(&self, position: ChunkCoordinate) -> Result<Chunk, GenerationError> {
        self.world.materialized_view(position)
    }

    /// Takes render events accumulated while no renderer was attached.
    pub fn drain_render_events(&mut self) -> Vec<RenderEvent> {
        mem::take(&mut self.render_events)
    }

    /// Whether every desired chunk is loaded and nothing is in flight.
    pub fn is_streaming_settled(&self) -> bool {
        self.world.streaming().is_settled()
    }

    /// Delivers every queued change, waiting for the collaborator.
    pub fn shutdown(&mut self) -> Result<(), PersistenceError> {
        log::info!("Shutting down world {}", self.world_id);
        self.syncer.flush()
    }
}

/// Represents player intents for one tick
///
/// Movement and look fields describe held input; `break_block` and
/// `place_block` are requests consumed by the tick they are submitted for.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct PlayerAction {
    /// Movement actions - true if key is pressed or held
    pub move_forward: bool,
    pub move_backward: bool,
    pub move_left: bool,
    pub move_right: bool,
    pub jump: bool,

    /// View rotation - Some if the view moved this tick
    pub rotate_view: Option<(f64, f64)>,

    /// Remove the targeted block
    pub break_block: bool,
    /// Place this block type against the targeted face
    pub place_block: Option<BlockType>,
}
