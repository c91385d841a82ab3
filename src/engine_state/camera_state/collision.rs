//! # Movement and Collision
//!
//! Moves the viewpoint over a heightfield. Terrain is queried through
//! [`TerrainQuery`] so the resolver never touches chunk storage directly.
//!
//! Each step:
//! 1. Clamp the delta time and build a normalized horizontal direction from the
//!    intent and camera yaw
//! 2. Apply jump and gravity to the vertical velocity
//! 3. Try the horizontal move and reject it if the destination column is too high
//!    for the current motion state
//! 4. Integrate vertically and snap onto the surface when the feet reach it
//!
//! Columns are queried up to a ceiling relative to the feet. Ground comes from
//! blocks starting no higher than a step above the feet, so an overhang never
//! lifts the body. Blocking uses everything up to eye height.

use cgmath::{InnerSpace, Vector3, Zero};
use web_time::Duration;

use super::{camera::Camera, viewpoint::Viewpoint};
use crate::engine_state::config::MovementConfig;

/// Rounding slack when comparing feet to surfaces.
const SURFACE_EPSILON: f32 = 1e-4;

/// Surface heights for collision. `None` means the column is unknown.
pub trait TerrainQuery {
    /// The top of the highest solid block in the column at `(x, z)` whose
    /// bottom is at or below `ceiling`.
    fn surface_height(&self, x: f32, z: f32, ceiling: f32) -> Option<f32>;
}

/// Directional intent for a single step.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MovementIntent {
    pub forward: bool,
    pub backward: bool,
    pub left: bool,
    pub right: bool,
    pub jump: bool,
}

impl MovementIntent {
    /// Whether any directional key is held.
    pub fn is_moving(&self) -> bool {
        self.forward || self.backward || self.left || self.right
    }
}

/// Applies intents, gravity and terrain collision to a [`Viewpoint`].
#[derive(Debug, Clone)]
pub struct MovementResolver {
    config: MovementConfig,
    /// Surface under the last successful query for the current column.
    last_surface: f32,
}

impl MovementResolver {
    pub fn new(config: MovementConfig) -> Self {
        let last_surface = config.fallback_surface_height;
        MovementResolver {
            config,
            last_surface,
        }
    }

    pub fn config(&self) -> &MovementConfig {
        &self.config
    }

    /// Queries a column, falling back to the last known surface on failure.
    fn surface_or_fallback(&self, terrain: &dyn TerrainQuery, x: f32, z: f32, ceiling: f32) -> f32 {
        match terrain.surface_height(x, z, ceiling) {
            Some(height) if height.is_finite() => height,
            _ => {
                log::debug!("Terrain query failed at ({x}, {z}), using {}", self.last_surface);
                self.last_surface
            }
        }
    }

    /// The horizontal velocity an intent produces.
    fn horizontal_velocity(&self, intent: &MovementIntent, camera: &Camera) -> Vector3<f32> {
        let (forward, right) = camera.horizontal_basis();
        let axis = |positive: bool, negative: bool| (positive as i8 - negative as i8) as f32;

        let direction = forward * axis(intent.forward, intent.backward)
            + right * axis(intent.right, intent.left);
        if direction.magnitude2() <= f32::EPSILON {
            return Vector3::zero();
        }
        direction.normalize() * self.config.walk_speed
    }

    /// Whether a horizontal move onto a column with surface `destination` is blocked.
    fn blocks_move(&self, viewpoint: &Viewpoint, feet: f32, destination: f32) -> bool {
        if viewpoint.grounded {
            return destination - feet > self.config.step_height + SURFACE_EPSILON;
        }

        let vertical = viewpoint.velocity.y;
        if vertical > 0.0 && self.config.gravity > 0.0 {
            let apex = feet + vertical * vertical / (2.0 * self.config.gravity);
            destination > apex + SURFACE_EPSILON
        } else if vertical > 0.0 {
            false
        } else {
            destination > feet + SURFACE_EPSILON
        }
    }

    /// Advances the viewpoint by one step.
    ///
    /// # Arguments
    /// * `viewpoint` - The viewpoint to move; its position is the eye
    /// * `intent` - Directional keys and jump for this step
    /// * `camera` - Supplies the yaw that orients the intent
    /// * `delta` - Time since the last step, clamped to `max_delta_seconds`
    /// * `terrain` - Surface heights to collide with
    pub fn step(
        &mut self,
        viewpoint: &mut Viewpoint,
        intent: &MovementIntent,
        camera: &Camera,
        delta: Duration,
        terrain: &dyn TerrainQuery,
    ) {
        let dt = delta.as_secs_f32().min(self.config.max_delta_seconds).max(0.0);
        let eye_height = self.config.eye_height;
        let mut feet = viewpoint.position.y - eye_height;

        let step_height = self.config.step_height;
        let here = self.surface_or_fallback(
            terrain,
            viewpoint.position.x,
            viewpoint.position.z,
            feet + step_height,
        );
        self.last_surface = here;

        // Ground fell away, or the feet were never on it
        if viewpoint.grounded && feet > here + SURFACE_EPSILON {
            viewpoint.grounded = false;
        }

        if viewpoint.grounded && intent.jump {
            viewpoint.velocity.y = self.config.jump_impulse;
            viewpoint.grounded = false;
        }
        if !viewpoint.grounded {
            viewpoint.velocity.y = (viewpoint.velocity.y - self.config.gravity * dt)
                .max(-self.config.max_fall_speed);
        }

        let horizontal = self.horizontal_velocity(intent, camera);
        viewpoint.velocity.x = horizontal.x;
        viewpoint.velocity.z = horizontal.z;

        let mut surface = here;
        if !horizontal.is_zero() {
            let next_x = viewpoint.position.x + horizontal.x * dt;
            let next_z = viewpoint.position.z + horizontal.z * dt;
            let obstacle = self.surface_or_fallback(terrain, next_x, next_z, feet + eye_height);

            if self.blocks_move(viewpoint, feet, obstacle) {
                viewpoint.velocity.x = 0.0;
                viewpoint.velocity.z = 0.0;
            } else {
                viewpoint.position.x = next_x;
                viewpoint.position.z = next_z;
                surface = self.surface_or_fallback(terrain, next_x, next_z, feet + step_height);
            }
        }

        if viewpoint.grounded {
            if surface > feet {
                // Step up
                feet = surface;
            } else if feet > surface + SURFACE_EPSILON {
                // Walked off an edge
                viewpoint.grounded = false;
            }
            viewpoint.velocity.y = 0.0;
        } else {
            feet += viewpoint.velocity.y * dt;
            if feet <= surface {
                feet = surface;
                viewpoint.velocity.y = 0.0;
                viewpoint.grounded = true;
            }
        }

        self.last_surface = surface;
        viewpoint.position.y = feet + eye_height;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cgmath::Point3;

    struct Flat(f32);

    impl TerrainQuery for Flat {
        fn surface_height(&self, _x: f32, _z: f32, _ceiling: f32) -> Option<f32> {
            Some(self.0)
        }
    }

    /// Ground at `low` for x < `edge`, `high` beyond.
    struct Ledge {
        edge: f32,
        low: f32,
        high: f32,
    }

    impl TerrainQuery for Ledge {
        fn surface_height(&self, x: f32, _z: f32, _ceiling: f32) -> Option<f32> {
            Some(if x < self.edge { self.low } else { self.high })
        }
    }

    /// Flat ground with a floating slab from `bottom` to `top` over it.
    struct Overhang {
        ground: f32,
        bottom: f32,
        top: f32,
    }

    impl TerrainQuery for Overhang {
        fn surface_height(&self, _x: f32, _z: f32, ceiling: f32) -> Option<f32> {
            Some(if ceiling >= self.bottom { self.top } else { self.ground })
        }
    }

    struct Unknown;

    impl TerrainQuery for Unknown {
        fn surface_height(&self, _x: f32, _z: f32, _ceiling: f32) -> Option<f32> {
            None
        }
    }

    const TICK: Duration = Duration::from_millis(16);

    fn settle(
        resolver: &mut MovementResolver,
        viewpoint: &mut Viewpoint,
        intent: MovementIntent,
        terrain: &dyn TerrainQuery,
        ticks: usize,
    ) {
        let camera = Camera::default();
        for _ in 0..ticks {
            resolver.step(viewpoint, &intent, &camera, TICK, terrain);
        }
    }

    #[test]
    fn falls_onto_flat_ground_and_stays_above_it() {
        let config = MovementConfig::default();
        let eye = config.eye_height;
        let mut resolver = MovementResolver::new(config);
        let mut viewpoint = Viewpoint::new(Point3::new(0.5, 15.0, 0.5));
        let camera = Camera::default();

        for _ in 0..200 {
            resolver.step(&mut viewpoint, &MovementIntent::default(), &camera, TICK, &Flat(10.0));
            assert!(viewpoint.position.y >= 10.0 + eye - 1e-3);
        }
        assert!(viewpoint.grounded);
        assert!((viewpoint.position.y - (10.0 + eye)).abs() < 1e-4);
        assert_eq!(viewpoint.velocity.y, 0.0);
    }

    #[test]
    fn walking_moves_along_the_view_direction() {
        let mut resolver = MovementResolver::new(MovementConfig::default());
        let mut viewpoint = Viewpoint::new(Point3::new(0.0, 11.6, 0.0));
        viewpoint.grounded = true;
        let intent = MovementIntent {
            forward: true,
            ..Default::default()
        };
        settle(&mut resolver, &mut viewpoint, intent, &Flat(10.0), 10);
        assert!(viewpoint.position.x > 0.5);
        assert!(viewpoint.position.z.abs() < 1e-4);
        assert!(viewpoint.grounded);
    }

    #[test]
    fn diagonal_speed_is_not_faster() {
        let config = MovementConfig::default();
        let speed = config.walk_speed;
        let resolver = MovementResolver::new(config);
        let intent = MovementIntent {
            forward: true,
            right: true,
            ..Default::default()
        };
        let velocity = resolver.horizontal_velocity(&intent, &Camera::default());
        assert!((velocity.magnitude() - speed).abs() < 1e-4);
    }

    #[test]
    fn grounded_step_up_is_limited() {
        let mut resolver = MovementResolver::new(MovementConfig::default());
        let wall = Ledge {
            edge: 1.0,
            low: 10.0,
            high: 12.0,
        };
        let mut viewpoint = Viewpoint::new(Point3::new(0.9, 11.6, 0.0));
        viewpoint.grounded = true;
        let intent = MovementIntent {
            forward: true,
            ..Default::default()
        };
        settle(&mut resolver, &mut viewpoint, intent, &wall, 20);
        assert!(viewpoint.position.x < 1.0);

        let step = Ledge {
            edge: 1.0,
            low: 10.0,
            high: 10.4,
        };
        let mut viewpoint = Viewpoint::new(Point3::new(0.9, 11.6, 0.0));
        viewpoint.grounded = true;
        settle(&mut resolver, &mut viewpoint, intent, &step, 20);
        assert!(viewpoint.position.x > 1.0);
        assert!((viewpoint.position.y - 12.0).abs() < 1e-4);
    }

    #[test]
    fn jumping_clears_a_one_block_ledge() {
        let mut resolver = MovementResolver::new(MovementConfig::default());
        let ledge = Ledge {
            edge: 1.0,
            low: 10.0,
            high: 11.0,
        };
        let mut viewpoint = Viewpoint::new(Point3::new(0.9, 11.6, 0.0));
        viewpoint.grounded = true;
        let intent = MovementIntent {
            forward: true,
            jump: true,
            ..Default::default()
        };
        settle(&mut resolver, &mut viewpoint, intent, &ledge, 60);
        assert!(viewpoint.position.x > 1.0);
        assert!(viewpoint.position.y >= 11.0 + 1.6 - 1e-3);
    }

    #[test]
    fn jumping_into_a_tall_wall_is_blocked() {
        let mut resolver = MovementResolver::new(MovementConfig::default());
        let wall = Ledge {
            edge: 1.0,
            low: 10.0,
            high: 13.0,
        };
        let mut viewpoint = Viewpoint::new(Point3::new(0.9, 11.6, 0.0));
        viewpoint.grounded = true;
        let intent = MovementIntent {
            forward: true,
            jump: true,
            ..Default::default()
        };
        let camera = Camera::default();
        for _ in 0..60 {
            resolver.step(&mut viewpoint, &intent, &camera, TICK, &wall);
            assert!(viewpoint.position.x < 1.0);
        }
        assert!(viewpoint.position.y < 13.0 + 1.6);
    }

    #[test]
    fn falling_against_a_wall_does_not_slide() {
        let mut resolver = MovementResolver::new(MovementConfig::default());
        let wall = Ledge {
            edge: 1.0,
            low: 10.0,
            high: 30.0,
        };
        let mut viewpoint = Viewpoint::new(Point3::new(0.9, 20.0, 0.0));
        let intent = MovementIntent {
            forward: true,
            ..Default::default()
        };
        let camera = Camera::default();
        for _ in 0..120 {
            resolver.step(&mut viewpoint, &intent, &camera, TICK, &wall);
            assert!(viewpoint.position.x < 1.0);
        }
        assert!(viewpoint.grounded);
        assert!((viewpoint.position.y - 11.6).abs() < 1e-4);
    }

    #[test]
    fn overhangs_neither_lift_nor_catch_the_player() {
        let mut resolver = MovementResolver::new(MovementConfig::default());
        let slab = Overhang {
            ground: 10.0,
            bottom: 12.0,
            top: 13.0,
        };
        let mut viewpoint = Viewpoint::new(Point3::new(0.5, 11.6, 0.5));
        viewpoint.grounded = true;

        settle(&mut resolver, &mut viewpoint, MovementIntent::default(), &slab, 10);
        assert!(viewpoint.grounded);
        assert!((viewpoint.position.y - 11.6).abs() < 1e-4);

        let jump = MovementIntent {
            jump: true,
            ..Default::default()
        };
        settle(&mut resolver, &mut viewpoint, jump, &slab, 1);
        assert!(!viewpoint.grounded);
        settle(&mut resolver, &mut viewpoint, MovementIntent::default(), &slab, 100);
        assert!(viewpoint.grounded);
        assert!((viewpoint.position.y - 11.6).abs() < 1e-4);
    }

    #[test]
    fn walking_off_an_edge_falls() {
        let mut resolver = MovementResolver::new(MovementConfig::default());
        let cliff = Ledge {
            edge: 1.0,
            low: 10.0,
            high: 4.0,
        };
        let mut viewpoint = Viewpoint::new(Point3::new(0.95, 11.6, 0.0));
        viewpoint.grounded = true;
        let intent = MovementIntent {
            forward: true,
            ..Default::default()
        };
        settle(&mut resolver, &mut viewpoint, intent, &cliff, 1);
        assert!(!viewpoint.grounded);
        settle(&mut resolver, &mut viewpoint, MovementIntent::default(), &cliff, 200);
        assert!(viewpoint.grounded);
        assert!((viewpoint.position.y - 5.6).abs() < 1e-4);
    }

    #[test]
    fn failed_queries_fall_back_to_a_safe_surface() {
        let config = MovementConfig::default();
        let fallback = config.fallback_surface_height;
        let mut resolver = MovementResolver::new(config);
        let mut viewpoint = Viewpoint::new(Point3::new(0.0, 40.0, 0.0));
        settle(&mut resolver, &mut viewpoint, MovementIntent::default(), &Unknown, 300);
        assert!(viewpoint.grounded);
        assert!((viewpoint.position.y - (fallback + 1.6)).abs() < 1e-4);
    }

    #[test]
    fn large_deltas_are_clamped() {
        let mut resolver = MovementResolver::new(MovementConfig::default());
        let mut viewpoint = Viewpoint::new(Point3::new(0.0, 11.6, 0.0));
        viewpoint.grounded = true;
        let intent = MovementIntent {
            forward: true,
            ..Default::default()
        };
        resolver.step(
            &mut viewpoint,
            &intent,
            &Camera::default(),
            Duration::from_secs(5),
            &Flat(10.0),
        );
        assert!(viewpoint.position.x <= 4.3 * 0.1 + 1e-4);
    }
}
