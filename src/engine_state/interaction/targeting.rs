//! Target selection from raw ray hits.

use cgmath::{MetricSpace, Point3};

use super::hit_test::RayHit;
use crate::engine_state::voxels::block::{block_side::BlockSide, BlockCoordinate};

/// The block the player is looking at, recomputed every tick.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TargetSelection {
    pub block: BlockCoordinate,
    /// Face the ray entered through.
    pub face: BlockSide,
    /// Where a placed block would go: `block` offset by the face normal.
    pub placement: BlockCoordinate,
    /// Distance from the viewpoint to the center of `block`.
    pub distance: f32,
}

/// Picks the target among `hits`.
///
/// Hits without a block or a valid face index are dropped. The rest are ranked
/// by the distance from `viewpoint` to the block center rather than the ray
/// distance, and only candidates within `reach` qualify.
pub fn select_target(hits: &[RayHit], viewpoint: Point3<f32>, reach: f32) -> Option<TargetSelection> {
    hits.iter()
        .filter_map(|hit| {
            let block = hit.block?;
            let face = BlockSide::from_index(hit.face_index?)?;
            let distance = viewpoint.distance(block.center());
            Some(TargetSelection {
                block,
                face,
                placement: face.adjacent(block),
                distance,
            })
        })
        .filter(|target| target.distance.is_finite() && target.distance <= reach)
        .min_by(|a, b| a.distance.total_cmp(&b.distance))
}
