//! # Engine Configuration
//!
//! All tunable constants of the runtime, loaded from JSON. Every field has a
//! default, so a config file only needs to name what it changes:
//!
//! ```json
//! { "streaming": { "render_distance": 6 }, "interaction": { "reach": 4.5 } }
//! ```

use std::{fs, path::Path};

use serde::{Deserialize, Serialize};
use web_time::Duration;

use super::error::ConfigError;
use super::voxels::terrain::DEFAULT_HEIGHT;

/// Top-level engine configuration.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Chunk generation worker threads. 0 generates inline on the tick.
    pub worker_threads: usize,
    pub streaming: StreamingConfig,
    pub movement: MovementConfig,
    pub interaction: InteractionConfig,
    pub sync: SyncConfig,
    pub metrics: MetricsConfig,
}

/// Chunk visibility and loading limits.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StreamingConfig {
    /// Horizontal radius in chunks. Chunks with `dx² + dz² <= r²` are visible.
    pub render_distance: u32,
    /// Vertical band half-height in chunks. Chunks with `|dy| <= v` are visible.
    pub vertical_distance: u32,
    /// Chunk generations dispatched per tick.
    pub max_generations_per_tick: usize,
    /// Evicted chunks kept for restore. 0 disables the cache.
    pub cache_capacity: usize,
}

/// Player physics and observer throttling.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MovementConfig {
    /// Horizontal speed in units per second.
    pub walk_speed: f32,
    /// Downward acceleration in units per second².
    pub gravity: f32,
    /// Upward velocity applied on jump.
    pub jump_impulse: f32,
    pub max_fall_speed: f32,
    /// Largest terrain rise a grounded mover walks up without jumping.
    pub step_height: f32,
    /// Upper bound on a single tick's delta time, in seconds.
    pub max_delta_seconds: f32,
    /// Distance from the feet to the viewpoint.
    pub eye_height: f32,
    /// Surface height used before any terrain query has succeeded.
    pub fallback_surface_height: f32,
    /// Radians of rotation per unit of look input.
    pub look_sensitivity: f32,
    /// Minimum time between observer notifications.
    pub notify_interval_ms: u64,
    /// Displacement that makes a move worth reporting.
    pub notify_min_displacement: f32,
    /// Rotation in radians that makes a turn worth reporting.
    pub notify_min_rotation: f32,
}

/// Targeting and block interaction limits.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InteractionConfig {
    /// Maximum distance from the viewpoint to a targeted block's center.
    pub reach: f32,
    /// Minimum time between any two interactions.
    pub cooldown_ms: u64,
    /// Minimum time between two interactions on the same coordinate.
    pub same_block_guard_ms: u64,
}

/// Persistence synchronisation.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    /// Quiet period after the last change before a batch is sent.
    pub debounce_ms: u64,
}

/// Metrics snapshots.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MetricsConfig {
    pub enabled: bool,
    pub snapshot_interval_ms: u64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        EngineConfig {
            worker_threads: 2,
            streaming: StreamingConfig::default(),
            movement: MovementConfig::default(),
            interaction: InteractionConfig::default(),
            sync: SyncConfig::default(),
            metrics: MetricsConfig::default(),
        }
    }
}

impl Default for StreamingConfig {
    fn default() -> Self {
        StreamingConfig {
            render_distance: 4,
            vertical_distance: 1,
            max_generations_per_tick: 4,
            cache_capacity: 256,
        }
    }
}

impl Default for MovementConfig {
    fn default() -> Self {
        MovementConfig {
            walk_speed: 4.3,
            gravity: 20.0,
            jump_impulse: 7.0,
            max_fall_speed: 50.0,
            step_height: 0.5,
            max_delta_seconds: 0.1,
            eye_height: 1.6,
            fallback_surface_height: (DEFAULT_HEIGHT + 1) as f32,
            look_sensitivity: 0.002,
            notify_interval_ms: 100,
            notify_min_displacement: 0.1,
            notify_min_rotation: 0.01,
        }
    }
}

impl Default for InteractionConfig {
    fn default() -> Self {
        InteractionConfig {
            reach: 5.0,
            cooldown_ms: 250,
            same_block_guard_ms: 1000,
        }
    }
}

impl Default for SyncConfig {
    fn default() -> Self {
        SyncConfig { debounce_ms: 2000 }
    }
}

impl Default for MetricsConfig {
    fn default() -> Self {
        MetricsConfig {
            enabled: true,
            snapshot_interval_ms: 10_000,
        }
    }
}

impl EngineConfig {
    /// Parses and validates a JSON config.
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let config: EngineConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Reads, parses and validates a JSON config file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let json = fs::read_to_string(path)?;
        Self::from_json_str(&json)
    }

    /// Rejects values the engine cannot run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.streaming.max_generations_per_tick == 0 {
            return Err(ConfigError::Invalid(
                "streaming.max_generations_per_tick must be at least 1".into(),
            ));
        }
        if self.metrics.enabled && self.metrics.snapshot_interval_ms == 0 {
            return Err(ConfigError::Invalid(
                "metrics.snapshot_interval_ms must be positive".into(),
            ));
        }

        let m = &self.movement;
        let non_negative = [
            ("movement.walk_speed", m.walk_speed),
            ("movement.gravity", m.gravity),
            ("movement.jump_impulse", m.jump_impulse),
            ("movement.max_fall_speed", m.max_fall_speed),
            ("movement.step_height", m.step_height),
            ("movement.eye_height", m.eye_height),
            ("movement.look_sensitivity", m.look_sensitivity),
            ("movement.notify_min_displacement", m.notify_min_displacement),
            ("movement.notify_min_rotation", m.notify_min_rotation),
            ("interaction.reach", self.interaction.reach),
        ];
        for (name, value) in non_negative {
            if !value.is_finite() || value < 0.0 {
                return Err(ConfigError::Invalid(format!(
                    "{name} must be a finite non-negative number, got {value}"
                )));
            }
        }
        if !m.max_delta_seconds.is_finite() || m.max_delta_seconds <= 0.0 {
            return Err(ConfigError::Invalid(
                "movement.max_delta_seconds must be positive".into(),
            ));
        }
        if !m.fallback_surface_height.is_finite() {
            return Err(ConfigError::Invalid(
                "movement.fallback_surface_height must be finite".into(),
            ));
        }
        Ok(())
    }
}

impl MovementConfig {
    pub fn notify_interval(&self) -> Duration {
        Duration::from_millis(self.notify_interval_ms)
    }
}

impl InteractionConfig {
    pub fn cooldown(&self) -> Duration {
        Duration::from_millis(self.cooldown_ms)
    }

    pub fn same_block_guard(&self) -> Duration {
        Duration::from_millis(self.same_block_guard_ms)
    }
}

impl SyncConfig {
    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }
}

impl MetricsConfig {
    pub fn snapshot_interval(&self) -> Duration {
        Duration::from_millis(self.snapshot_interval_ms)
    }
}
