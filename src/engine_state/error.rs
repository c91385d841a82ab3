//! # Engine Errors
//!
//! Typed failures for the subsystems that can fail. Only [`EngineError`] ever
//! reaches the caller of the engine; the others are recovered inside the tick
//! (logged, counted, retried) and exist so that recovery code can match on them.

use std::io;

use thiserror::Error;

use super::voxels::chunk::ChunkCoordinate;

/// Failure while producing terrain for a single chunk.
#[derive(Debug, Error)]
pub enum GenerationError {
    /// The chunk's footprint does not fit in block coordinate space.
    #[error("chunk {0:?} lies outside the addressable block range")]
    CoordinateOutOfRange(ChunkCoordinate),

    /// A noise sample came back NaN or infinite.
    #[error("terrain sample at ({x}, {z}) was not finite")]
    NonFiniteSample { x: i32, z: i32 },

    /// The generation worker panicked.
    #[error("chunk generation panicked: {0}")]
    Panicked(String),
}

/// Failure talking to the persistence collaborator.
#[derive(Debug, Error)]
pub enum PersistenceError {
    #[error("world {0} does not exist")]
    WorldNotFound(u64),

    #[error("persistence I/O failed: {0}")]
    Io(#[from] io::Error),

    #[error("world record could not be (de)serialized: {0}")]
    Serialization(#[from] serde_json::Error),

    /// The collaborator refused the request.
    #[error("persistence request rejected: {0}")]
    Rejected(String),
}

/// Failure loading or validating an [`EngineConfig`](super::config::EngineConfig).
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not read config: {0}")]
    Io(#[from] io::Error),

    #[error("could not parse config: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Unrecoverable engine setup failure.
#[derive(Debug, Error)]
pub enum EngineError {
    /// No world record could be created or loaded.
    #[error("could not establish a world record: {0}")]
    Setup(#[from] PersistenceError),

    #[error(transparent)]
    Config(#[from] ConfigError),
}
