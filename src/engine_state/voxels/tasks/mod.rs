//! # Voxel Task System
//!
//! Tasks related to voxel world generation. They run on the task manager's
//! workers and merge their results into the `WorldState`.

pub mod chunk_generation_task;
