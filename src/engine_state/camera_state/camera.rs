//! # Camera Implementation
//!
//! The player's look orientation. Position lives on the [`Viewpoint`](super::viewpoint::Viewpoint);
//! the camera only tracks yaw and pitch and derives the look and movement vectors
//! from them.
//!
//! Axis conventions:
//! - yaw 0 looks along +X, increasing yaw turns towards +Z
//! - pitch 0 is level, positive pitch looks up

use cgmath::*;
use std::f32::consts::FRAC_PI_2;

/// Safe limit for pitch to prevent gimbal lock
const SAFE_FRAC_PI_2: f32 = FRAC_PI_2 - 0.0001;

/// A first-person look orientation.
///
/// # Fields
/// - `yaw`: Horizontal rotation (around Y axis) in radians
/// - `pitch`: Vertical rotation (around X axis) in radians
/// - `view_vec`: Normalized look direction
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Camera {
    /// Horizontal rotation (around Y axis) in radians
    pub yaw: Rad<f32>,
    /// Vertical rotation (around X axis) in radians
    pub pitch: Rad<f32>,
    /// Normalized vector pointing where the camera looks
    view_vec: Vector3<f32>,
}

impl Camera {
    /// Creates a new camera with the specified orientation.
    ///
    /// # Arguments
    /// * `yaw` - Initial yaw. Can be any type that converts to `Rad<f32>`.
    /// * `pitch` - Initial pitch, clamped short of straight up or down.
    pub fn new<Y: Into<Rad<f32>>, P: Into<Rad<f32>>>(yaw: Y, pitch: P) -> Self {
        let mut camera = Self {
            yaw: yaw.into(),
            pitch: pitch.into(),
            view_vec: Vector3::unit_x(),
        };
        camera.clamp_and_refresh();
        camera
    }

    /// Gets the camera's forward direction vector.
    ///
    /// # Returns
    /// A normalized 3D vector representing the look direction
    pub fn get_view_vec(&self) -> Vector3<f32> {
        self.view_vec
    }

    /// The level forward and right vectors used for walking.
    pub fn horizontal_basis(&self) -> (Vector3<f32>, Vector3<f32>) {
        let (yaw_sin, yaw_cos) = self.yaw.0.sin_cos();
        let forward = Vector3::new(yaw_cos, 0.0, yaw_sin);
        let right = Vector3::new(-yaw_sin, 0.0, yaw_cos);
        (forward, right)
    }

    /// Applies a look delta.
    ///
    /// # Arguments
    /// * `delta_x` - Horizontal look input, positive turns right
    /// * `delta_y` - Vertical look input, positive looks down (screen convention)
    /// * `sensitivity` - Radians per unit of input
    pub fn rotate(&mut self, delta_x: f32, delta_y: f32, sensitivity: f32) {
        if !delta_x.is_finite() || !delta_y.is_finite() {
            return;
        }
        self.yaw += Rad(delta_x * sensitivity);
        self.pitch += Rad(-delta_y * sensitivity);
        self.clamp_and_refresh();
    }

    /// Clamps pitch and recomputes the view vector.
    fn clamp_and_refresh(&mut self) {
        if !self.yaw.0.is_finite() {
            self.yaw = Rad(0.0);
        }
        if !self.pitch.0.is_finite() {
            self.pitch = Rad(0.0);
        }

        // Keep yaw in one turn so rotation deltas stay comparable
        self.yaw = self.yaw.normalize();

        // Clamp pitch to prevent gimbal lock
        if self.pitch < -Rad(SAFE_FRAC_PI_2) {
            self.pitch = -Rad(SAFE_FRAC_PI_2);
        } else if self.pitch > Rad(SAFE_FRAC_PI_2) {
            self.pitch = Rad(SAFE_FRAC_PI_2);
        }

        self.view_vec = Vector3::new(
            self.pitch.cos() * self.yaw.cos(),
            self.pitch.sin(),
            self.pitch.cos() * self.yaw.sin(),
        )
        .normalize();
    }
}

impl Default for Camera {
    fn default() -> Self {
        Camera::new(Rad(0.0), Rad(0.0))
    }
}
