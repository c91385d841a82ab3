//! # Camera State Management
//!
//! This module handles the player's point of view:
//! - Look orientation from view input
//! - Walking, jumping and falling over terrain
//! - Chunk tracking for streaming
//! - Throttled change notifications for observers
//!
//! ## Core Components
//! - `Camera`: Yaw and pitch, with the derived look and walk vectors
//! - `Viewpoint`: Eye position, velocity and ground contact
//! - `MovementResolver`: Gravity and heightfield collision
//! - `ViewpointNotifier`: Rate limits observer updates

use cgmath::Point3;
use web_time::{Duration, Instant};

use crate::engine_state::{config::MovementConfig, voxels::chunk::ChunkCoordinate, PlayerAction};

use camera::Camera;
use collision::{MovementIntent, MovementResolver, TerrainQuery};
use viewpoint::{Viewpoint, ViewpointNotifier, ViewpointUpdate};

pub mod camera;
pub mod collision;
pub mod viewpoint;

/// Owns the camera, the viewpoint and the systems that move them.
///
/// # Fields
/// - `camera`: The current look orientation
/// - `viewpoint`: Eye position and motion
/// - `resolver`: Applies intents and collision each tick
/// - `notifier`: Decides when observers hear about changes
pub struct CameraState {
    pub camera: Camera,
    pub viewpoint: Viewpoint,
    resolver: MovementResolver,
    notifier: ViewpointNotifier,
    /// Chunk the viewpoint was in after the last update
    current_chunk: Option<ChunkCoordinate>,
}

impl CameraState {
    /// Creates a camera state at `position`, looking along +X.
    ///
    /// # Arguments
    /// * `position` - Initial eye position
    /// * `config` - Movement physics and notification throttling
    pub fn new(position: Point3<f32>, config: &MovementConfig) -> Self {
        let notifier = ViewpointNotifier::new(
            Duration::from_millis(config.notify_interval_ms),
            config.notify_min_displacement,
            config.notify_min_rotation,
        );
        CameraState {
            camera: Camera::default(),
            viewpoint: Viewpoint::new(position),
            resolver: MovementResolver::new(config.clone()),
            notifier,
            current_chunk: None,
        }
    }

    pub fn movement_config(&self) -> &MovementConfig {
        self.resolver.config()
    }

    /// Moves the viewpoint to `position`, dropping any velocity.
    pub fn teleport(&mut self, position: Point3<f32>) {
        self.viewpoint = Viewpoint::new(position);
    }

    /// The block the feet are in.
    pub fn feet_block(&self) -> Option<crate::engine_state::voxels::block::BlockCoordinate> {
        self.viewpoint.feet_block(self.resolver.config().eye_height)
    }

    /// Updates orientation and position for one tick.
    ///
    /// # Arguments
    /// * `actions` - The player's intents for this tick
    /// * `dt` - Time elapsed since the last update
    /// * `terrain` - Surface heights for collision
    /// * `now` - Current time, used to throttle notifications
    ///
    /// # Returns
    /// The chunk change and notification this tick produced, if any
    pub fn update(
        &mut self,
        actions: &PlayerAction,
        dt: Duration,
        terrain: &dyn TerrainQuery,
        now: Instant,
    ) -> CameraUpdates {
        if let Some((dx, dy)) = actions.rotate_view {
            let sensitivity = self.resolver.config().look_sensitivity;
            self.camera.rotate(dx as f32, dy as f32, sensitivity);
        }

        let intent = MovementIntent {
            forward: actions.move_forward,
            backward: actions.move_backward,
            left: actions.move_left,
            right: actions.move_right,
            jump: actions.jump,
        };
        self.resolver
            .step(&mut self.viewpoint, &intent, &self.camera, dt, terrain);

        let chunk = self.viewpoint.chunk();
        let new_chunk_position = if chunk != self.current_chunk {
            self.current_chunk = chunk;
            chunk
        } else {
            None
        };

        let update = ViewpointUpdate::new(&self.viewpoint, self.camera.yaw, self.camera.pitch);
        CameraUpdates {
            new_chunk_position,
            notification: self.notifier.poll(update, now),
        }
    }
}

/// Represents updates to the camera's state that affect game world interaction.
///
/// This is returned by `CameraState::update()` every tick.
#[derive(Debug, Default)]
pub struct CameraUpdates {
    /// The viewpoint's chunk, when it differs from the previous tick
    pub new_chunk_position: Option<ChunkCoordinate>,
    /// An update observers should hear about
    pub notification: Option<ViewpointUpdate>,
}
