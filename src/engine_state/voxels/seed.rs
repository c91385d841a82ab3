//! World seeds.
//!
//! A world is identified by an opaque seed string. The string is hashed to a
//! numeric seed and every noise field used by terrain generation derives from
//! that number with a fixed offset, so the same string always yields the same
//! terrain, across runs and across reloads from persistence.

use noise::Perlin;

/// Offset between the numeric seeds of independent noise fields.
const NOISE_SEED_STRIDE: u32 = 1000;

/// Hashes a seed string to a numeric seed.
///
/// Polynomial rolling hash over the UTF-8 bytes (multiplier 31, wrapping).
pub fn hash_seed(text: &str) -> u32 {
    text.bytes()
        .fold(0u32, |acc, b| acc.wrapping_mul(31).wrapping_add(b as u32))
}

/// Produces a fresh random seed string for new worlds.
pub fn random_seed_string() -> String {
    format!("{:016x}", fastrand::u64(..))
}

/// The seed of a world and the noise fields derived from it.
#[derive(Clone, Debug)]
pub struct WorldSeed {
    text: String,
    value: u32,
    /// Large and mid scale height octaves.
    pub height_noise: Perlin,
    /// High frequency height octave.
    pub detail_noise: Perlin,
    /// 3D field perturbing surface block selection.
    pub surface_noise: Perlin,
}

impl WorldSeed {
    /// Creates a world seed from its string form.
    pub fn from_string(text: &str) -> Self {
        let value = hash_seed(text);
        WorldSeed {
            text: text.to_string(),
            value,
            height_noise: Perlin::new(value),
            detail_noise: Perlin::new(value.wrapping_add(NOISE_SEED_STRIDE)),
            surface_noise: Perlin::new(value.wrapping_add(2 * NOISE_SEED_STRIDE)),
        }
    }

    /// The seed string as stored in the world record.
    pub fn text(&self) -> &str {
        &self.text
    }

    /// The hashed numeric seed.
    pub fn value(&self) -> u32 {
        self.value
    }
}
