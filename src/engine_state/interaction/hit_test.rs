//! # Hit Testing
//!
//! Rays against the visible block set. A renderer that owns geometry implements
//! [`HitTester`] itself; [`VoxelRaycaster`] walks the materialized chunks
//! directly for headless use.

use cgmath::{InnerSpace, Point3, Vector3};

use crate::engine_state::voxels::{
    block::{block_side::BlockSide, BlockCoordinate},
    world::World,
};

/// One intersection reported by a hit tester.
///
/// Metadata is optional because a renderer may hit geometry it cannot map back
/// to a block. Such hits are never targeted.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RayHit {
    pub block: Option<BlockCoordinate>,
    /// Index of the face the ray entered through, see [`BlockSide::from_index`].
    pub face_index: Option<usize>,
    /// Distance along the ray to the hit.
    pub distance: f32,
}

/// Casts rays against whatever is currently shown.
pub trait HitTester {
    /// All hits along the ray up to `max_distance`, in any order.
    fn cast_ray(&self, origin: Point3<f32>, direction: Vector3<f32>, max_distance: f32)
        -> Vec<RayHit>;
}

/// DDA voxel traversal over the materialized chunks of a [`World`].
///
/// Reports the first solid block along the ray. Water is passed through.
pub struct VoxelRaycaster<'a> {
    world: &'a World,
}

impl<'a> VoxelRaycaster<'a> {
    pub fn new(world: &'a World) -> Self {
        VoxelRaycaster { world }
    }

    fn is_hit(&self, coordinate: BlockCoordinate) -> bool {
        matches!(
            self.world.block_type_at(coordinate),
            Some(Some(block_type)) if block_type.is_solid()
        )
    }
}

/// Per-axis traversal state.
struct Axis {
    step: i32,
    /// Ray distance to cross one cell along this axis
    delta: f32,
    /// Ray distance to the next cell boundary along this axis
    next: f32,
}

impl Axis {
    fn new(origin: f32, cell: i32, direction: f32) -> Self {
        if direction.abs() < 1e-10 {
            return Axis {
                step: 0,
                delta: f32::INFINITY,
                next: f32::INFINITY,
            };
        }
        let delta = (1.0 / direction).abs();
        let (step, next) = if direction > 0.0 {
            (1, ((cell as f32 + 1.0) - origin) * delta)
        } else {
            (-1, (origin - cell as f32) * delta)
        };
        Axis { step, delta, next }
    }
}

impl HitTester for VoxelRaycaster<'_> {
    fn cast_ray(
        &self,
        origin: Point3<f32>,
        direction: Vector3<f32>,
        max_distance: f32,
    ) -> Vec<RayHit> {
        let Some(mut cell) = BlockCoordinate::from_world(origin) else {
            return Vec::new();
        };
        let length = direction.magnitude();
        if !length.is_finite() || length <= f32::EPSILON || !max_distance.is_finite() {
            return Vec::new();
        }
        let direction = direction / length;

        let mut axes = [
            Axis::new(origin.x, cell.x, direction.x),
            Axis::new(origin.y, cell.y, direction.y),
            Axis::new(origin.z, cell.z, direction.z),
        ];

        // A ray starting inside a block has no entry face
        if self.is_hit(cell) {
            return vec![RayHit {
                block: Some(cell),
                face_index: None,
                distance: 0.0,
            }];
        }

        let max_steps = (max_distance.max(0.0) * 3.0).ceil() as usize + 3;
        for _ in 0..max_steps {
            // Step along the axis with the nearest boundary
            let index = if axes[0].next <= axes[1].next && axes[0].next <= axes[2].next {
                0
            } else if axes[1].next <= axes[2].next {
                1
            } else {
                2
            };
            let axis = &mut axes[index];
            let distance = axis.next;
            if distance > max_distance {
                break;
            }
            axis.next += axis.delta;

            let mut normal = (0, 0, 0);
            match index {
                0 => {
                    cell = cell.offset(axis.step, 0, 0);
                    normal.0 = -axis.step;
                }
                1 => {
                    cell = cell.offset(0, axis.step, 0);
                    normal.1 = -axis.step;
                }
                _ => {
                    cell = cell.offset(0, 0, axis.step);
                    normal.2 = -axis.step;
                }
            }

            if self.is_hit(cell) {
                return vec![RayHit {
                    block: Some(cell),
                    face_index: BlockSide::from_normal(normal).map(|side| side as usize),
                    distance,
                }];
            }
        }
        Vec::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine_state::voxels::{
        block::{block_type::BlockType, Block},
        chunk::{Chunk, ChunkCoordinate},
    };

    fn world_with(blocks: &[(BlockCoordinate, BlockType)]) -> World {
        let mut world = World::new(0);
        for &(coordinate, block_type) in blocks {
            let position = ChunkCoordinate::of_block(coordinate);
            if !world.contains(&position) {
                world.put(Chunk::empty(position));
            }
            if let Some(chunk) = world.get_mut(&position) {
                chunk.insert(Block::new(coordinate, block_type));
            }
        }
        world
    }

    #[test]
    fn hits_the_first_block_and_reports_the_entry_face() {
        let world = world_with(&[
            (BlockCoordinate::new(3, 0, 0), BlockType::STONE),
            (BlockCoordinate::new(5, 0, 0), BlockType::STONE),
        ]);
        let hits = VoxelRaycaster::new(&world).cast_ray(
            Point3::new(0.5, 0.5, 0.5),
            Vector3::unit_x(),
            10.0,
        );
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].block, Some(BlockCoordinate::new(3, 0, 0)));
        assert_eq!(hits[0].face_index, Some(BlockSide::LEFT as usize));
        assert!((hits[0].distance - 2.5).abs() < 1e-5);
    }

    #[test]
    fn looking_down_hits_the_top_face_across_chunks() {
        let world = world_with(&[(BlockCoordinate::new(-1, -2, -1), BlockType::GRASS)]);
        let hits = VoxelRaycaster::new(&world).cast_ray(
            Point3::new(-0.5, 1.5, -0.5),
            -Vector3::unit_y(),
            5.0,
        );
        assert_eq!(hits[0].block, Some(BlockCoordinate::new(-1, -2, -1)));
        assert_eq!(hits[0].face_index, Some(BlockSide::TOP as usize));
    }

    #[test]
    fn water_is_transparent_to_rays() {
        let world = world_with(&[
            (BlockCoordinate::new(0, 0, 1), BlockType::WATER),
            (BlockCoordinate::new(0, 0, 2), BlockType::SAND),
        ]);
        let hits = VoxelRaycaster::new(&world).cast_ray(
            Point3::new(0.5, 0.5, 0.5),
            Vector3::unit_z(),
            5.0,
        );
        assert_eq!(hits[0].block, Some(BlockCoordinate::new(0, 0, 2)));
        assert_eq!(hits[0].face_index, Some(BlockSide::BACK as usize));
    }

    #[test]
    fn misses_beyond_max_distance() {
        let world = world_with(&[(BlockCoordinate::new(8, 0, 0), BlockType::STONE)]);
        let hits = VoxelRaycaster::new(&world).cast_ray(
            Point3::new(0.5, 0.5, 0.5),
            Vector3::unit_x(),
            5.0,
        );
        assert!(hits.is_empty());
    }

    #[test]
    fn degenerate_rays_hit_nothing() {
        let world = world_with(&[(BlockCoordinate::new(1, 0, 0), BlockType::STONE)]);
        let raycaster = VoxelRaycaster::new(&world);
        assert!(raycaster
            .cast_ray(Point3::new(0.5, 0.5, 0.5), Vector3::new(0.0, 0.0, 0.0), 5.0)
            .is_empty());
        assert!(raycaster
            .cast_ray(Point3::new(f32::NAN, 0.5, 0.5), Vector3::unit_x(), 5.0)
            .is_empty());
    }
}
