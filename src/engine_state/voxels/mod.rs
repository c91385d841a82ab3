//! # Voxel World Core
//!
//! This module contains the block-level model of the world: how terrain is
//! generated, how it is partitioned and stored, and how player changes are
//! layered on top of it.
//!
//! ## Architecture
//!
//! The voxel system is organized into several key components:
//!
//! * **Block**: Block coordinates, types and faces
//! * **Chunk**: Fixed-size cubes of blocks, the unit of generation and streaming
//! * **Seed / Terrain**: Deterministic height and block type per coordinate
//! * **Change Log**: Ordered place/remove mutations with last-write-wins semantics
//! * **World**: The chunk store plus a cache of evicted chunks
//! * **Streaming**: Which chunks should be materialized around the viewpoint
//! * **World State**: Ties the above together on the simulation timeline
//! * **Tasks**: Chunk generation off the main timeline
//!
//! ## Data Flow
//!
//! 1. The viewpoint moves into a new chunk and streaming computes the desired set
//! 2. Missing chunks are generated on workers
//! 3. Results are materialized against the change log and stored
//! 4. Changes patch stored chunks in place and are queued for persistence
//!
//! ## Thread Safety
//!
//! Only generation runs on other threads, and it only reads the immutable
//! terrain generator. Everything else is owned by the single simulation timeline.

pub mod block;
pub mod change_log;
pub mod chunk;
pub mod seed;
pub mod streaming;
pub mod tasks;
pub mod terrain;
pub mod world;
pub mod world_state;
