//! # Terrain Generator
//!
//! Deterministic procedural terrain: a pure function from (seed, coordinate) to
//! block presence and type.
//!
//! ## Height
//!
//! Column height is a base height plus three weighted octaves of 2D Perlin noise:
//! a low-frequency octave for hills and valleys, a mid-frequency octave for
//! rolling detail, and a high-frequency octave for surface roughness. The sum is
//! clamped to `[MIN_HEIGHT, MAX_HEIGHT]`.
//!
//! ## Block selection
//!
//! Within a column of height `h`:
//! - `y > h`: water up to `SEA_LEVEL`, air above it
//! - `y == h`: sand near sea level, stone above a noise-perturbed stone line, grass otherwise
//! - the `DIRT_DEPTH` blocks below the surface: dirt
//! - everything deeper: stone
//!
//! Nothing generates below `y = 0`.

use noise::NoiseFn;

use super::{
    block::block_type::BlockType,
    chunk::{chunk_creation::ChunkCreationIterator, Chunk, ChunkCoordinate, CHUNK_DIMENSION},
    seed::WorldSeed,
};
use crate::engine_state::error::GenerationError;

/// Water fills every empty cell at or below this height.
pub const SEA_LEVEL: i32 = 8;
/// Height of a column where all noise octaves sample zero.
pub const BASE_HEIGHT: i32 = 12;
/// Height substituted when a noise sample is unusable.
pub const DEFAULT_HEIGHT: i32 = BASE_HEIGHT;
pub const MIN_HEIGHT: i32 = 1;
pub const MAX_HEIGHT: i32 = 120;

/// (frequency, amplitude) of the low, mid and high frequency height octaves.
const HEIGHT_OCTAVES: [(f64, f64); 3] = [(0.01, 10.0), (0.05, 4.0), (0.2, 1.5)];
/// Surfaces at or below `SEA_LEVEL + SHORE_BAND` are sand.
const SHORE_BAND: i32 = 1;
/// Surfaces above this line (plus surface noise) are bare stone.
const STONE_LINE: f64 = 20.0;
const STONE_LINE_JITTER: f64 = 4.0;
const SURFACE_NOISE_SCALE: f64 = 0.1;
/// Number of dirt blocks directly below a surface block.
const DIRT_DEPTH: i32 = 2;

/// Generates terrain for a single world seed.
///
/// The generator holds only seed-derived noise fields and is safe to share
/// between generation workers.
#[derive(Clone, Debug)]
pub struct TerrainGenerator {
    seed: WorldSeed,
}

impl TerrainGenerator {
    /// Creates a generator for the given seed.
    pub fn new(seed: WorldSeed) -> Self {
        TerrainGenerator { seed }
    }

    /// Creates a generator directly from a seed string.
    pub fn from_seed_string(seed: &str) -> Self {
        Self::new(WorldSeed::from_string(seed))
    }

    pub fn seed(&self) -> &WorldSeed {
        &self.seed
    }

    /// Computes the column height at `(x, z)`.
    ///
    /// # Returns
    /// The clamped height, or `GenerationError::NonFiniteSample` if the noise sum
    /// is not finite.
    pub fn try_height(&self, x: i32, z: i32) -> Result<i32, GenerationError> {
        let (fx, fz) = (x as f64, z as f64);
        let [(low_f, low_a), (mid_f, mid_a), (high_f, high_a)] = HEIGHT_OCTAVES;

        let offset = self.seed.height_noise.get([fx * low_f, fz * low_f]) * low_a
            + self.seed.height_noise.get([fx * mid_f, fz * mid_f]) * mid_a
            + self.seed.detail_noise.get([fx * high_f, fz * high_f]) * high_a;

        if !offset.is_finite() {
            return Err(GenerationError::NonFiniteSample { x, z });
        }

        Ok((BASE_HEIGHT as f64 + offset)
            .round()
            .clamp(MIN_HEIGHT as f64, MAX_HEIGHT as f64) as i32)
    }

    /// Computes the column height at `(x, z)`, failing closed.
    ///
    /// An unusable sample is logged and replaced by `DEFAULT_HEIGHT`, so callers
    /// never see NaN-derived heights.
    pub fn height(&self, x: i32, z: i32) -> i32 {
        self.try_height(x, z).unwrap_or_else(|err| {
            log::warn!("{err}, using default height {DEFAULT_HEIGHT}");
            DEFAULT_HEIGHT
        })
    }

    /// The generated block type at a world coordinate, or `None` for air.
    pub fn block_type(&self, x: i32, y: i32, z: i32) -> Option<BlockType> {
        self.block_type_in_column(x, y, z, self.height(x, z))
    }

    /// Block selection for a cell in a column of known height.
    fn block_type_in_column(&self, x: i32, y: i32, z: i32, height: i32) -> Option<BlockType> {
        if y < 0 {
            return None;
        }

        if y > height {
            return (y <= SEA_LEVEL).then_some(BlockType::WATER);
        }

        if y == height {
            if height <= SEA_LEVEL + SHORE_BAND {
                return Some(BlockType::SAND);
            }
            let jitter = self.seed.surface_noise.get([
                x as f64 * SURFACE_NOISE_SCALE,
                y as f64 * SURFACE_NOISE_SCALE,
                z as f64 * SURFACE_NOISE_SCALE,
            ]) * STONE_LINE_JITTER;
            // NaN jitter compares false and falls through to grass
            return if height as f64 > STONE_LINE + jitter {
                Some(BlockType::STONE)
            } else {
                Some(BlockType::GRASS)
            };
        }

        if y >= height - DIRT_DEPTH {
            Some(BlockType::DIRT)
        } else {
            Some(BlockType::STONE)
        }
    }

    /// Generates the raw terrain of one chunk (no block changes applied).
    ///
    /// Heights are computed once per column, then cells are filled layer by layer.
    ///
    /// # Returns
    /// The chunk, or `GenerationError::CoordinateOutOfRange` if the chunk's
    /// footprint overflows block coordinate space.
    pub fn generate_chunk(&self, position: ChunkCoordinate) -> Result<Chunk, GenerationError> {
        let origin = position
            .origin()
            .ok_or(GenerationError::CoordinateOutOfRange(position))?;
        let last = CHUNK_DIMENSION - 1;

        let mut heights = [[0i32; CHUNK_DIMENSION as usize]; CHUNK_DIMENSION as usize];
        for (lz, row) in heights.iter_mut().enumerate() {
            for (lx, height) in row.iter_mut().enumerate() {
                *height = self.height(origin.x + lx as i32, origin.z + lz as i32);
            }
        }

        let mut cci = ChunkCreationIterator::new(position, origin);

        let ceiling = heights
            .iter()
            .flatten()
            .copied()
            .max()
            .unwrap_or(DEFAULT_HEIGHT)
            .max(SEA_LEVEL);
        if origin.y > ceiling || origin.y + last < 0 {
            return Ok(cci.return_chunk());
        }

        while !cci.is_finished() {
            let coordinate = cci.current_coordinate();
            let lx = (coordinate.x - origin.x) as usize;
            let lz = (coordinate.z - origin.z) as usize;
            let block_type = self.block_type_in_column(
                coordinate.x,
                coordinate.y,
                coordinate.z,
                heights[lz][lx],
            );
            cci.push_block_type(block_type);
        }

        Ok(cci.return_chunk())
    }
}
