//! The player's viewpoint and its change notifications.

use std::f32::consts::TAU;

use cgmath::{MetricSpace, Point3, Rad, Vector3, Zero};
use serde::Serialize;
use web_time::{Duration, Instant};

use crate::engine_state::voxels::{block::BlockCoordinate, chunk::ChunkCoordinate};

/// Position, velocity and ground contact of the player.
///
/// `position` is the eye; the feet are `eye_height` below it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewpoint {
    pub position: Point3<f32>,
    pub velocity: Vector3<f32>,
    pub grounded: bool,
}

impl Viewpoint {
    /// A viewpoint at rest and airborne, so the first tick settles it onto terrain.
    pub fn new(position: Point3<f32>) -> Self {
        Viewpoint {
            position,
            velocity: Vector3::zero(),
            grounded: false,
        }
    }

    /// The block containing the eye.
    pub fn block(&self) -> Option<BlockCoordinate> {
        BlockCoordinate::from_world(self.position)
    }

    /// The chunk containing the eye.
    pub fn chunk(&self) -> Option<ChunkCoordinate> {
        ChunkCoordinate::of_world(self.position)
    }

    /// The block containing the feet.
    pub fn feet_block(&self, eye_height: f32) -> Option<BlockCoordinate> {
        BlockCoordinate::from_world(Point3::new(
            self.position.x,
            self.position.y - eye_height,
            self.position.z,
        ))
    }
}

/// What observers are told when the viewpoint moves or turns.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ViewpointUpdate {
    pub position: [f32; 3],
    pub yaw: f32,
    pub pitch: f32,
    pub grounded: bool,
}

impl ViewpointUpdate {
    pub fn new(viewpoint: &Viewpoint, yaw: Rad<f32>, pitch: Rad<f32>) -> Self {
        ViewpointUpdate {
            position: viewpoint.position.into(),
            yaw: yaw.0,
            pitch: pitch.0,
            grounded: viewpoint.grounded,
        }
    }
}

/// Receives throttled viewpoint updates (UI, persistence).
pub trait ViewpointObserver {
    fn viewpoint_changed(&mut self, update: &ViewpointUpdate);
}

/// Throttles viewpoint updates to a maximum rate and a minimum change.
#[derive(Debug)]
pub struct ViewpointNotifier {
    interval: Duration,
    min_displacement: f32,
    min_rotation: f32,
    last_sent: Option<(Instant, ViewpointUpdate)>,
}

impl ViewpointNotifier {
    pub fn new(interval: Duration, min_displacement: f32, min_rotation: f32) -> Self {
        ViewpointNotifier {
            interval,
            min_displacement,
            min_rotation,
            last_sent: None,
        }
    }

    /// Decides whether `update` should be sent now.
    ///
    /// The first update is always sent. Later ones need both the interval to have
    /// passed and a displacement or rotation above the thresholds.
    pub fn poll(&mut self, update: ViewpointUpdate, now: Instant) -> Option<ViewpointUpdate> {
        if let Some((sent_at, sent)) = &self.last_sent {
            if now.saturating_duration_since(*sent_at) < self.interval {
                return None;
            }
            let moved = Point3::from(sent.position).distance(Point3::from(update.position));
            let turned = yaw_difference(sent.yaw, update.yaw).max((sent.pitch - update.pitch).abs());
            if moved < self.min_displacement && turned < self.min_rotation {
                return None;
            }
        }
        self.last_sent = Some((now, update));
        Some(update)
    }
}

/// Absolute angle between two yaws, in `[0, π]`.
fn yaw_difference(a: f32, b: f32) -> f32 {
    let d = (a - b).rem_euclid(TAU);
    d.min(TAU - d)
}
